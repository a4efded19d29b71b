//! 队列策略（Queue disciplines）
//!
//! 链路出口只使用 DropTail（尾丢弃）队列。

use crate::net::Packet;

mod drop_tail;

pub use drop_tail::DropTailQueue;

pub const DEFAULT_PKT_BYTES: u64 = 1500;

pub fn mem_from_pkt(pkts: u64) -> u64 {
    pkts.saturating_mul(DEFAULT_PKT_BYTES)
}

/// 入队结果：被丢弃时把包交还给调用方（用于统计/可视化）
pub type EnqueueResult = Result<(), Packet>;
