use std::any::Any;

use thiserror::Error;

use super::env::AppEnv;
use super::sender::SenderState;
use crate::proto::SocketError;

/// Application handle inside a [`NetWorld`](crate::net::NetWorld).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AppId(pub usize);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AppError {
    /// Activated before any configuration was stored.
    #[error("application is not configured")]
    NotConfigured,
    /// Lifecycle violation, e.g. activating twice.
    #[error("cannot activate in state {0:?}")]
    InvalidState(SenderState),
    #[error("data rate must be positive")]
    ZeroDataRate,
    #[error(transparent)]
    Socket(#[from] SocketError),
}

/// Start/stop lifecycle invoked by the world or a test harness.
pub trait Application: Any {
    fn name(&self) -> &str;

    fn activate(&mut self, env: &mut dyn AppEnv) -> Result<(), AppError>;

    fn deactivate(&mut self, env: &mut dyn AppEnv) -> Result<(), AppError>;

    /// A timer scheduled through [`Scheduler::schedule`](super::Scheduler::schedule) fired.
    fn on_timer(&mut self, _env: &mut dyn AppEnv) -> Result<(), AppError> {
        Ok(())
    }

    fn as_any(&self) -> &dyn Any;
}
