//! 数据包轨迹记录（JSON，代替抓包文件）
//!
//! 设计目标：
//! - **结构化**：用 JSON 事件而不是解析文本日志
//! - **轻量**：事件存内存，仿真结束一次性写出
//! - **可过滤**：每条事件带 pkt/flow 标识

mod types;

pub use types::{VizEvent, VizEventKind, VizLinkInfo, VizLogger, VizNodeInfo, VizPacketKind, VizTcp};
