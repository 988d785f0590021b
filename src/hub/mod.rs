//! The Streaming Hub (§4.F): the browser-facing half of the Quote
//! Fan-Out Pipeline. Treated as a thin collaborator around the
//! Correlation Bus — its only real job is turning `quote.<alias>` bus
//! broadcasts into per-client WebSocket frames, and client
//! subscribe/unsubscribe frames into bus commands.

pub mod connection;
pub mod handler;
pub mod messages;

pub use connection::{ClientId, Hub};
pub use handler::ws_handler;
pub use messages::{ClientFrame, ServerFrame};
