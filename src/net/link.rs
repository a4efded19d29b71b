//! 链路类型
//!
//! 定义单向网络链路：串行化速率、传播时延、出口队列与可选的接收端错误模型。

use super::data_rate::DataRate;
use super::error_model::RateErrorModel;
use super::id::NodeId;
use crate::queue::{DropTailQueue, mem_from_pkt};
use crate::sim::SimTime;

/// 默认出口队列容量（包数），与常见点到点设备的默认 100 包一致
pub const DEFAULT_LINK_QUEUE_PKTS: u64 = 100;

/// 网络链路
#[derive(Debug)]
pub struct Link {
    pub from: NodeId,
    pub to: NodeId,
    pub latency: SimTime,
    pub rate: DataRate,
    /// 是否正在串行化一个包
    pub busy: bool,
    pub queue: DropTailQueue,
    /// 接收端（`to` 侧）错误模型
    pub error_model: Option<RateErrorModel>,
}

impl Link {
    /// 创建新链路
    pub fn new(from: NodeId, to: NodeId, latency: SimTime, rate: DataRate) -> Self {
        Self {
            from,
            to,
            latency,
            rate,
            busy: false,
            queue: DropTailQueue::new(mem_from_pkt(DEFAULT_LINK_QUEUE_PKTS)),
            error_model: None,
        }
    }

    /// 计算传输指定字节数所需的时间
    pub(crate) fn tx_time(&self, bytes: u32) -> SimTime {
        self.rate.tx_time(bytes)
    }
}
