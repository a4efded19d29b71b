//! Transport-layer tags carried by packets.

/// Packet transport metadata.
///
/// `Packet` is a network-layer carrier; transport tags enable protocol simulation
/// without coupling the network to protocol implementations.
#[derive(Debug, Clone, Default)]
pub enum Transport {
    /// No transport metadata (default).
    #[default]
    None,
    /// TCP segment (simplified).
    Tcp(TcpSegment),
}

/// TCP segment (minimal fields for simulation).
///
/// Connections are demultiplexed by the packet's `flow_id`, so segments carry
/// no port numbers except the SYN, which names the listening port.
#[derive(Debug, Clone)]
pub enum TcpSegment {
    /// SYN towards `dst_port` on the packet's destination node.
    Syn { dst_port: u16 },
    /// SYN-ACK
    SynAck,
    /// ACK for handshake
    HandshakeAck,
    /// Data segment: `seq` is byte sequence number, `len` is payload bytes.
    Data { seq: u64, len: u32 },
    /// ACK segment: `ack` is next expected byte (cumulative).
    Ack { ack: u64 },
    /// Connection refused (no listener on the port).
    Rst,
}
