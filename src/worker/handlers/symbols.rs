//! `list_symbols` / `symbol_info` / `symbol_snapshot` (§4.D).

use crate::domain::command::ResponseData;
use crate::error::HandlerError;
use crate::upstream::UpstreamSession;

use super::HandlerContext;

pub async fn list_symbols<S: UpstreamSession + 'static>(
    ctx: &HandlerContext<S>,
) -> Result<ResponseData, HandlerError> {
    Ok(ResponseData::Symbols(ctx.session().contract_catalog()))
}

pub async fn symbol_info<S: UpstreamSession + 'static>(
    ctx: &HandlerContext<S>,
    symbol: &str,
) -> Result<ResponseData, HandlerError> {
    ctx.session()
        .contract_catalog()
        .into_iter()
        .find(|s| s.symbol == symbol)
        .map(ResponseData::SymbolInfo)
        .ok_or_else(|| HandlerError::Validation(format!("unknown symbol: {symbol}")))
}

pub async fn symbol_snapshot<S: UpstreamSession + 'static>(
    ctx: &HandlerContext<S>,
    symbol: &str,
) -> Result<ResponseData, HandlerError> {
    let contract = match ctx.resolve_symbol(symbol).await {
        Ok(c) => c,
        Err(e) => {
            ctx.session_mgr.heal_from(&e);
            return Err(e.into());
        }
    };
    match ctx.session().symbol_snapshot(&contract).await {
        Ok(tick) => Ok(ResponseData::Snapshot(tick)),
        Err(e) => {
            ctx.session_mgr.heal_from(&e);
            Err(e.into())
        }
    }
}
