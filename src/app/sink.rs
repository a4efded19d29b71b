//! TCP packet sink: listens on one port and lets the stack count what arrives.

use std::any::Any;

use tracing::debug;

use super::application::{AppError, Application};
use super::env::AppEnv;
use crate::proto::{SockAddr, SocketId, TcpStack};

#[derive(Debug)]
pub struct PacketSink {
    name: String,
    socket: SocketId,
    port: u16,
    local: Option<SockAddr>,
    listening: bool,
}

impl PacketSink {
    pub fn new(name: impl Into<String>, socket: SocketId, port: u16) -> Self {
        Self {
            name: name.into(),
            socket,
            port,
            local: None,
            listening: false,
        }
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Listening address, once activated.
    pub fn local(&self) -> Option<SockAddr> {
        self.local
    }

    pub fn is_listening(&self) -> bool {
        self.listening
    }

    /// In-order bytes received on the listening address.
    pub fn total_rx(&self, tcp: &TcpStack) -> u64 {
        self.local.map(|addr| tcp.rx_bytes(addr)).unwrap_or(0)
    }
}

impl Application for PacketSink {
    fn name(&self) -> &str {
        &self.name
    }

    fn activate(&mut self, env: &mut dyn AppEnv) -> Result<(), AppError> {
        let addr = env.bind_port(self.socket, self.port)?;
        env.listen(self.socket)?;
        self.local = Some(addr);
        self.listening = true;
        debug!(name = %self.name, %addr, "sink listening");
        Ok(())
    }

    fn deactivate(&mut self, env: &mut dyn AppEnv) -> Result<(), AppError> {
        if self.listening {
            self.listening = false;
            env.close(self.socket)?;
        }
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
