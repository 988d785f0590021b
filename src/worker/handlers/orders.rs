//! `place_order` / `cancel_order` / `recheck_order` (§4.D).

use chrono::Utc;
use uuid::Uuid;

use crate::domain::audit::{OrderAuditRow, OrderMode, OrderStatus};
use crate::domain::command::ResponseData;
use crate::domain::order::OrderCommand;
use crate::error::HandlerError;
use crate::upstream::UpstreamSession;

use super::HandlerContext;

/// Place an order, validating locally first and rejecting "spurious"
/// exits whose direction doesn't match the live net position (§4.D, §8
/// invariant: an exit with no matching position is refused, never
/// silently flattened).
pub async fn place_order<S: UpstreamSession + 'static>(
    ctx: &HandlerContext<S>,
    cmd: OrderCommand,
    simulation: bool,
) -> Result<ResponseData, HandlerError> {
    cmd.validate().map_err(|e| HandlerError::Validation(e.to_string()))?;

    let contract = match ctx.resolve_symbol(&cmd.symbol).await {
        Ok(c) => c,
        Err(e) => {
            ctx.session_mgr.heal_from(&e);
            return Err(e.into());
        }
    };

    if let Some(expected_sign) = cmd.direction.expected_position_sign() {
        let position = match ctx.session().net_position(&contract.exchange_code).await {
            Ok(p) => p,
            Err(e) => {
                ctx.session_mgr.heal_from(&e);
                return Err(e.into());
            }
        };
        let actual_sign = position.signum() as i8;
        if position == 0 || actual_sign != expected_sign {
            return Err(HandlerError::NoAction(format!(
                "exit direction {:?} does not match current position (signed qty {position})",
                cmd.direction
            )));
        }
    }

    let side = cmd.direction.upstream_side();
    let upstream_order_id = match ctx
        .session()
        .place_order(&contract, side, cmd.quantity, cmd.price_type, cmd.price, cmd.order_kind)
        .await
    {
        Ok(id) => id,
        Err(e) => {
            ctx.session_mgr.heal_from(&e);
            return Err(e.into());
        }
    };

    let row = OrderAuditRow {
        id: Uuid::new_v4().to_string(),
        created_at: Utc::now(),
        mode: if simulation { OrderMode::Simulation } else { OrderMode::Live },
        symbol: cmd.symbol,
        exchange_code: contract.exchange_code,
        direction: cmd.direction,
        quantity: cmd.quantity,
        status: OrderStatus::Submitted,
        fill_quantity: 0,
        fill_price: None,
        upstream_order_id: upstream_order_id.clone(),
        failure_message: None,
    };
    // The row is written only after the upstream has accepted the order
    // (Open Question (a)): a crash before this point loses the audit
    // trail but never double-submits.
    if let Err(e) = ctx.audit.record(row).await {
        tracing::error!(error = %e, upstream_order_id, "failed to record order audit row");
    }

    Ok(ResponseData::OrderAccepted { upstream_order_id })
}

pub async fn cancel_order<S: UpstreamSession + 'static>(
    ctx: &HandlerContext<S>,
    order_id: String,
) -> Result<ResponseData, HandlerError> {
    let row = ctx
        .audit
        .get(&order_id)
        .await
        .map_err(|e| HandlerError::Validation(e.to_string()))?
        .ok_or_else(|| HandlerError::Validation(format!("no audit row for order {order_id}")))?;

    // Already terminal: no-op, never re-submit a cancel upstream (§4.D
    // "no-op if already terminal").
    if row.status.is_terminal() {
        return Ok(ResponseData::Unit);
    }

    match ctx.session().cancel_order(&order_id).await {
        Ok(()) => {
            if let Err(e) = ctx
                .audit
                .update_status(
                    &order_id,
                    OrderStatus::Cancelled,
                    row.fill_quantity,
                    row.fill_price,
                    None,
                )
                .await
            {
                tracing::error!(error = %e, order_id, "failed to update audit row after cancel");
            }
            Ok(ResponseData::Unit)
        }
        Err(e) => {
            ctx.session_mgr.heal_from(&e);
            Err(e.into())
        }
    }
}

pub async fn recheck_order<S: UpstreamSession + 'static>(
    ctx: &HandlerContext<S>,
    order_id: String,
) -> Result<ResponseData, HandlerError> {
    let status = match ctx.session().recheck_order(&order_id).await {
        Ok(s) => s,
        Err(e) => {
            ctx.session_mgr.heal_from(&e);
            return Err(e.into());
        }
    };

    let new_status = if status.terminal {
        if status.rejection_message.is_some() {
            OrderStatus::Rejected
        } else {
            OrderStatus::Filled
        }
    } else if status.filled_quantity > 0 {
        OrderStatus::PartiallyFilled
    } else {
        OrderStatus::Submitted
    };

    let updated = ctx
        .audit
        .update_status(
            &order_id,
            new_status,
            status.filled_quantity,
            status.average_fill_price,
            status.rejection_message,
        )
        .await
        .map_err(|e| HandlerError::Validation(e.to_string()))?;

    match updated {
        Some(audit) => Ok(ResponseData::OrderRecheck { audit }),
        None => Err(HandlerError::Validation(format!("no audit row for order {order_id}"))),
    }
}
