//! 统计信息
//!
//! 定义网络仿真统计数据结构。

use serde::Serialize;

/// 网络统计信息
#[derive(Debug, Default, Clone, Serialize)]
pub struct Stats {
    pub delivered_pkts: u64,
    pub delivered_bytes: u64,
    /// 队列满（DropTail）丢弃
    pub dropped_pkts: u64,
    pub dropped_bytes: u64,
    /// 接收端错误模型判定损坏而丢弃
    pub corrupted_pkts: u64,
    pub corrupted_bytes: u64,
    /// 没有路由可达
    pub unroutable_pkts: u64,
}
