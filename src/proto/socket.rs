//! Socket layer over the simulated TCP stack.
//!
//! Sockets live in the [`TcpStack`] and are addressed by [`SocketId`]. The
//! [`SocketApi`] trait is what applications see; the live implementation
//! wraps the simulator and the network, tests can substitute a fake.

use std::fmt;

use thiserror::Error;
use tracing::debug;

use super::tcp::{TcpConnId, TcpStack, TcpState};
use crate::net::{Network, NodeId};
use crate::sim::Simulator;

/// Socket handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SocketId(pub usize);

/// Transport endpoint: a node and a port on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SockAddr {
    pub node: NodeId,
    pub port: u16,
}

impl SockAddr {
    pub fn new(node: NodeId, port: u16) -> Self {
        Self { node, port }
    }
}

impl fmt::Display for SockAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}:{}", self.node.0, self.port)
    }
}

/// Opaque application payload of an exact size. Contents are never modelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Payload {
    size_bytes: u32,
}

impl Payload {
    pub fn with_size(size_bytes: u32) -> Self {
        Self { size_bytes }
    }

    pub fn size_bytes(&self) -> u32 {
        self.size_bytes
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocketState {
    Unbound,
    Bound(SockAddr),
    Listening(SockAddr),
    Connected { local: SockAddr, conn: TcpConnId },
    Closed,
}

#[derive(Debug, Clone)]
pub struct SocketEntry {
    pub node: NodeId,
    pub state: SocketState,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SocketError {
    #[error("unknown socket {0:?}")]
    UnknownSocket(SocketId),
    #[error("socket is already bound")]
    AlreadyBound,
    #[error("socket is not bound")]
    NotBound,
    #[error("address {0} already in use")]
    AddrInUse(SockAddr),
    #[error("socket is not connected")]
    NotConnected,
    #[error("socket is closed")]
    Closed,
    #[error("connection refused by {0}")]
    ConnectionRefused(SockAddr),
}

/// Socket operations available to applications.
///
/// Errors are returned to the caller as-is; nothing at this layer retries.
pub trait SocketApi {
    /// Bind to an ephemeral local port.
    fn bind(&mut self, sock: SocketId) -> Result<SockAddr, SocketError>;
    /// Bind to a specific local port.
    fn bind_port(&mut self, sock: SocketId, port: u16) -> Result<SockAddr, SocketError>;
    fn listen(&mut self, sock: SocketId) -> Result<(), SocketError>;
    fn connect(&mut self, sock: SocketId, peer: SockAddr) -> Result<(), SocketError>;
    /// Queue `payload` for transmission. Returns the number of bytes the send
    /// buffer accepted: the whole payload, or 0 when it does not fit.
    fn send(&mut self, sock: SocketId, payload: Payload) -> Result<u32, SocketError>;
    fn close(&mut self, sock: SocketId) -> Result<(), SocketError>;
}

impl TcpStack {
    /// Create an unbound TCP socket on `node`.
    pub fn create_socket(&mut self, node: NodeId) -> SocketId {
        let id = SocketId(self.sockets.len());
        self.sockets.push(SocketEntry {
            node,
            state: SocketState::Unbound,
        });
        id
    }

    pub fn socket_state(&self, sock: SocketId) -> Option<SocketState> {
        self.sockets.get(sock.0).map(|s| s.state)
    }

    fn entry_mut(&mut self, sock: SocketId) -> Result<&mut SocketEntry, SocketError> {
        self.sockets.get_mut(sock.0).ok_or(SocketError::UnknownSocket(sock))
    }

    pub fn bind(&mut self, sock: SocketId) -> Result<SockAddr, SocketError> {
        let node = self.unbound_node(sock)?;
        let addr = self.alloc_ephemeral(node);
        self.bound.insert(addr);
        self.entry_mut(sock)?.state = SocketState::Bound(addr);
        Ok(addr)
    }

    pub fn bind_port(&mut self, sock: SocketId, port: u16) -> Result<SockAddr, SocketError> {
        let node = self.unbound_node(sock)?;
        let addr = SockAddr::new(node, port);
        if !self.bound.insert(addr) {
            return Err(SocketError::AddrInUse(addr));
        }
        self.entry_mut(sock)?.state = SocketState::Bound(addr);
        Ok(addr)
    }

    fn unbound_node(&mut self, sock: SocketId) -> Result<NodeId, SocketError> {
        let entry = self.entry_mut(sock)?;
        match entry.state {
            SocketState::Unbound => Ok(entry.node),
            SocketState::Closed => Err(SocketError::Closed),
            _ => Err(SocketError::AlreadyBound),
        }
    }

    pub fn listen(&mut self, sock: SocketId) -> Result<(), SocketError> {
        let entry = self.entry_mut(sock)?;
        let addr = match entry.state {
            SocketState::Bound(addr) => addr,
            SocketState::Unbound => return Err(SocketError::NotBound),
            SocketState::Closed => return Err(SocketError::Closed),
            SocketState::Listening(_) | SocketState::Connected { .. } => return Err(SocketError::AlreadyBound),
        };
        entry.state = SocketState::Listening(addr);
        self.listeners.insert(addr, sock);
        debug!(%addr, "listening");
        Ok(())
    }

    /// Start the handshake towards `peer`. Data written before it completes waits in the send buffer.
    pub fn connect(&mut self, sock: SocketId, peer: SockAddr, sim: &mut Simulator, net: &mut Network) -> Result<(), SocketError> {
        let local = match self.entry_mut(sock)?.state {
            SocketState::Bound(addr) => addr,
            SocketState::Unbound => return Err(SocketError::NotBound),
            SocketState::Closed => return Err(SocketError::Closed),
            SocketState::Listening(_) | SocketState::Connected { .. } => return Err(SocketError::AlreadyBound),
        };
        let conn = self.open_conn(local, peer, sim, net);
        self.entry_mut(sock)?.state = SocketState::Connected { local, conn };
        Ok(())
    }

    pub fn send(&mut self, sock: SocketId, payload: Payload, sim: &mut Simulator, net: &mut Network) -> Result<u32, SocketError> {
        let conn_id = match self.entry_mut(sock)?.state {
            SocketState::Connected { conn, .. } => conn,
            SocketState::Closed => return Err(SocketError::Closed),
            _ => return Err(SocketError::NotConnected),
        };
        match self.get(conn_id).map(|c| (c.state(), c.peer)) {
            Some((TcpState::Refused, peer)) => return Err(SocketError::ConnectionRefused(peer)),
            Some((TcpState::Closed, _)) | None => return Err(SocketError::Closed),
            Some(_) => {}
        }
        Ok(self.write(conn_id, payload.size_bytes(), sim, net))
    }

    pub fn close(&mut self, sock: SocketId, sim: &mut Simulator) -> Result<(), SocketError> {
        let prev = std::mem::replace(&mut self.entry_mut(sock)?.state, SocketState::Closed);
        match prev {
            SocketState::Closed => return Err(SocketError::Closed),
            SocketState::Unbound => {}
            SocketState::Bound(addr) => {
                self.bound.remove(&addr);
            }
            SocketState::Listening(addr) => {
                self.bound.remove(&addr);
                self.listeners.remove(&addr);
                debug!(%addr, "listener closed");
            }
            SocketState::Connected { local, conn } => {
                self.bound.remove(&local);
                self.close_conn(conn, sim);
                debug!(%local, conn_id = conn, "connection closed");
            }
        }
        Ok(())
    }
}
