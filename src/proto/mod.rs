//! 传输层/协议模块
//!
//! 包含 TCP 的简化实现与其上的 socket 抽象（用于仿真实验）。

pub mod socket;
pub mod tcp;

// Transport tag types live in `net::transport`.
pub use socket::{Payload, SockAddr, SocketApi, SocketError, SocketId, SocketState};
pub use tcp::{TcpConfig, TcpConn, TcpConnId, TcpStack, TcpState};
