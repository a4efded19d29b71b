//! The environment an application runs against.

use super::application::AppId;
use super::events::AppTimer;
use crate::net::Network;
use crate::proto::{Payload, SockAddr, SocketApi, SocketError, SocketId};
use crate::sim::{EventId, SimTime, Simulator};

/// Virtual clock and timers for the calling application.
pub trait Scheduler {
    fn now(&self) -> SimTime;

    /// Fire the application's `on_timer` after `delay`.
    fn schedule(&mut self, delay: SimTime) -> EventId;

    /// Cancel a timer. Cancelling a fired or already cancelled handle does nothing.
    fn cancel(&mut self, id: EventId);

    fn is_pending(&self, id: EventId) -> bool;
}

/// Everything an application callback may use.
pub trait AppEnv: Scheduler + SocketApi {}

impl<T: Scheduler + SocketApi + ?Sized> AppEnv for T {}

/// Live environment: the simulator plus the network, bound to one application.
pub struct SimEnv<'a> {
    sim: &'a mut Simulator,
    net: &'a mut Network,
    app: AppId,
}

impl<'a> SimEnv<'a> {
    pub fn new(sim: &'a mut Simulator, net: &'a mut Network, app: AppId) -> Self {
        Self { sim, net, app }
    }
}

impl Scheduler for SimEnv<'_> {
    fn now(&self) -> SimTime {
        self.sim.now()
    }

    fn schedule(&mut self, delay: SimTime) -> EventId {
        self.sim.schedule_in(delay, AppTimer { app: self.app })
    }

    fn cancel(&mut self, id: EventId) {
        self.sim.cancel(id);
    }

    fn is_pending(&self, id: EventId) -> bool {
        self.sim.is_pending(id)
    }
}

impl SocketApi for SimEnv<'_> {
    fn bind(&mut self, sock: SocketId) -> Result<SockAddr, SocketError> {
        self.net.tcp.bind(sock)
    }

    fn bind_port(&mut self, sock: SocketId, port: u16) -> Result<SockAddr, SocketError> {
        self.net.tcp.bind_port(sock, port)
    }

    fn listen(&mut self, sock: SocketId) -> Result<(), SocketError> {
        self.net.tcp.listen(sock)
    }

    fn connect(&mut self, sock: SocketId, peer: SockAddr) -> Result<(), SocketError> {
        let sim = &mut *self.sim;
        self.net.with_tcp(|tcp, net| tcp.connect(sock, peer, sim, net))
    }

    fn send(&mut self, sock: SocketId, payload: Payload) -> Result<u32, SocketError> {
        let sim = &mut *self.sim;
        let accepted = self.net.with_tcp(|tcp, net| tcp.send(sock, payload, sim, net))?;
        if let Some(node) = self.net.tcp.sockets.get(sock.0).map(|s| s.node) {
            self.net
                .viz_app_send(self.sim.now(), self.app.0, node, payload.size_bytes(), accepted);
        }
        Ok(accepted)
    }

    fn close(&mut self, sock: SocketId) -> Result<(), SocketError> {
        self.net.tcp.close(sock, self.sim)
    }
}
