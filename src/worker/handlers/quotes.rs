//! `subscribe_quote` / `unsubscribe_quote` (§4.D, §4.E): the only two
//! commands that touch the quote fan-out pipeline's refcounted
//! subscription table rather than talking to the upstream session
//! directly.

use crate::domain::command::ResponseData;
use crate::error::HandlerError;
use crate::upstream::UpstreamSession;

use super::HandlerContext;

pub async fn subscribe_quote<S: UpstreamSession + 'static>(
    ctx: &HandlerContext<S>,
    symbol: &str,
) -> Result<ResponseData, HandlerError> {
    ctx.quotes.subscribe(symbol).await?;
    Ok(ResponseData::Unit)
}

pub async fn unsubscribe_quote<S: UpstreamSession + 'static>(
    ctx: &HandlerContext<S>,
    symbol: &str,
) -> Result<ResponseData, HandlerError> {
    ctx.quotes.unsubscribe(symbol).await?;
    Ok(ResponseData::Unit)
}
