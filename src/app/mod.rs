//! Applications installed on nodes.
//!
//! An application is driven by three kinds of events: start, stop and its own
//! timers. It never touches the simulator or the network directly; every
//! callback receives an [`AppEnv`] that schedules timers and operates sockets
//! on its behalf.

mod application;
mod env;
mod events;
mod sender;
mod sink;

pub use application::{AppError, AppId, Application};
pub use env::{AppEnv, Scheduler, SimEnv};
pub use events::{AppStart, AppStop, AppTimer};
pub use sender::{RateLimitedSender, SenderConfig, SenderState, pacing_interval};
pub use sink::PacketSink;
