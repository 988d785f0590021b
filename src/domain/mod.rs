//! Typed wire and domain model shared by the bus, worker, and quote
//! pipeline (§3). Closed enums and typed payloads replace the duck-typed
//! dictionaries the distilled spec's source relied on (§9 DESIGN NOTES).

pub mod audit;
pub mod command;
pub mod order;
pub mod quote;
pub mod subscription;

pub use audit::{OrderAuditRow, OrderAuditStore, OrderMode, OrderStatus};
pub use command::{CommandKind, CommandPayload, Request, RequestId, Response, ResponseData, ResponseStatus};
pub use order::{Direction, OrderCommand, OrderKind, OrderValidationError, PriceType, UpstreamSide};
pub use quote::{BidAsk, QuoteEvent, QuoteTick};
pub use subscription::SubscriptionEntry;
