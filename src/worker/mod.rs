//! The Single-Session Worker (§4.B, §4.C, §4.D): owns the one upstream
//! session and serially dispatches every command the bus hands it.

pub mod dispatcher;
pub mod handlers;
pub mod session;

pub use dispatcher::Dispatcher;
pub use session::{RetryPolicy, WorkerSessionManager, WorkerState};
