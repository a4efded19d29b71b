//! 数据包类型
//!
//! 定义网络数据包及其相关操作。

use super::id::NodeId;
use super::transport::Transport;

/// 网络数据包
///
/// 逐跳按目的地址查路由表转发，不预先携带完整路径。
#[derive(Debug, Clone)]
pub struct Packet {
    pub id: u64,
    pub flow_id: u64,
    pub size_bytes: u32,
    pub src: NodeId,
    pub dst: NodeId,
    pub hops: u32,
    pub transport: Transport,
}

impl Packet {
    pub fn new(id: u64, flow_id: u64, size_bytes: u32, src: NodeId, dst: NodeId) -> Self {
        Self {
            id,
            flow_id,
            size_bytes,
            src,
            dst,
            hops: 0,
            transport: Transport::None,
        }
    }

    /// 经过一跳
    pub fn advance(mut self) -> Self {
        self.hops = self.hops.saturating_add(1);
        self
    }
}
