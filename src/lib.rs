//! brokerd - a single-session brokerage bridge.
//!
//! One process holds the exclusive upstream brokerage connection and
//! exposes it to many callers through three pieces:
//!
//! - [`bus`] - the Correlation Bus: turns synchronous calls into
//!   correlated, queued work with at-most-once replies.
//! - [`worker`] - the Single-Session Worker: owns the upstream session,
//!   dispatches one command at a time, heals on transient failure.
//! - [`quotes`] / [`hub`] - the Quote Fan-Out Pipeline: upstream push
//!   callbacks, refcounted per alias, fanned out to many WebSocket
//!   clients.
//!
//! [`facade`] is the thin HTTP surface over the bus; [`domain`] and
//! [`upstream`] hold the shared types and the seam to the brokerage SDK.

pub mod bus;
pub mod config;
pub mod domain;
pub mod error;
pub mod facade;
pub mod hub;
pub mod logging;
pub mod quotes;
pub mod upstream;
pub mod worker;

pub use bus::Bus;
pub use config::AppConfig;
pub use error::{BusError, HandlerError};
