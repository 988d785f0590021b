//! Read-only account query handlers (§4.D): positions, margin, P&L,
//! trades, settlements, usage. Each is a thin, normalized pass-through
//! to the upstream session with healing on transient failure.

use crate::domain::command::ResponseData;
use crate::error::HandlerError;
use crate::upstream::UpstreamSession;

use super::HandlerContext;

pub async fn list_positions<S: UpstreamSession + 'static>(
    ctx: &HandlerContext<S>,
) -> Result<ResponseData, HandlerError> {
    match ctx.session().query_positions().await {
        Ok(v) => Ok(ResponseData::Positions(v)),
        Err(e) => {
            ctx.session_mgr.heal_from(&e);
            Err(e.into())
        }
    }
}

pub async fn query_margin<S: UpstreamSession + 'static>(
    ctx: &HandlerContext<S>,
) -> Result<ResponseData, HandlerError> {
    match ctx.session().query_margin().await {
        Ok(v) => Ok(ResponseData::Margin(v)),
        Err(e) => {
            ctx.session_mgr.heal_from(&e);
            Err(e.into())
        }
    }
}

pub async fn query_profit_loss<S: UpstreamSession + 'static>(
    ctx: &HandlerContext<S>,
) -> Result<ResponseData, HandlerError> {
    match ctx.session().query_profit_loss().await {
        Ok(v) => Ok(ResponseData::ProfitLoss(v)),
        Err(e) => {
            ctx.session_mgr.heal_from(&e);
            Err(e.into())
        }
    }
}

pub async fn list_trades<S: UpstreamSession + 'static>(
    ctx: &HandlerContext<S>,
) -> Result<ResponseData, HandlerError> {
    match ctx.session().query_trades().await {
        Ok(v) => Ok(ResponseData::Trades(v)),
        Err(e) => {
            ctx.session_mgr.heal_from(&e);
            Err(e.into())
        }
    }
}

pub async fn list_settlements<S: UpstreamSession + 'static>(
    ctx: &HandlerContext<S>,
) -> Result<ResponseData, HandlerError> {
    match ctx.session().query_settlements().await {
        Ok(v) => Ok(ResponseData::Settlements(v)),
        Err(e) => {
            ctx.session_mgr.heal_from(&e);
            Err(e.into())
        }
    }
}

pub async fn query_usage<S: UpstreamSession + 'static>(
    ctx: &HandlerContext<S>,
) -> Result<ResponseData, HandlerError> {
    match ctx.session().query_usage().await {
        Ok(v) => Ok(ResponseData::Usage(v)),
        Err(e) => {
            ctx.session_mgr.heal_from(&e);
            Err(e.into())
        }
    }
}
