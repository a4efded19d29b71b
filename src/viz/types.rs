use serde::{Deserialize, Serialize};

/// 轨迹事件类型
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum VizEventKind {
    /// 仿真/拓扑元信息（作为 t=0 的第一条事件）
    Meta {
        nodes: Vec<VizNodeInfo>,
        links: Vec<VizLinkInfo>,
    },
    /// packet 出队并开始发送（链路序列化开始）
    TxStart {
        link_from: usize,
        link_to: usize,
        depart_ns: u64,
        arrive_ns: u64,
    },
    /// packet 在目的节点被标记为 delivered（统计+上层处理）
    Delivered { node: usize },
    /// DropTail 丢包
    Drop {
        link_from: usize,
        link_to: usize,
        q_bytes: u64,
        q_cap_bytes: u64,
    },
    /// 接收端错误模型判定损坏
    Corrupt { link_from: usize, link_to: usize },
    /// 应用向 socket 写入一个载荷
    AppSend {
        app: usize,
        node: usize,
        bytes: u32,
        accepted: u32,
    },
    /// TCP：发送数据段
    TcpSendData(VizTcp),
    /// TCP：发送 ACK
    TcpSendAck(VizTcp),
    /// TCP：收到 ACK（用于驱动 cwnd/继续发送）
    TcpRecvAck(VizTcp),
    /// TCP：RTO 超时触发重传
    TcpRto(VizTcp),
}

/// packet 的类别
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum VizPacketKind {
    Data,
    Ack,
    Control,
    Other,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VizNodeInfo {
    pub id: usize,
    pub name: String,
    /// host / router / access_point / station
    pub kind: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VizLinkInfo {
    pub from: usize,
    pub to: usize,
    /// 单向链路速率（bps）
    pub bandwidth_bps: u64,
    /// 单向传播时延（ns）
    pub latency_ns: u64,
    /// 队列容量（bytes）
    pub q_cap_bytes: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_rate: Option<f64>,
}

/// 与 TCP 有关的字段（seq/ack 等）
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct VizTcp {
    pub conn_id: u64,
    pub seq: Option<u64>,
    pub len: Option<u32>,
    pub ack: Option<u64>,
    /// 是否为重传（RTO/快速重传触发的 resend）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retrans: Option<bool>,
}

/// 一个可回放的事件（JSON）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VizEvent {
    /// 仿真时间（纳秒，和 `SimTime.0` 同口径）
    pub t_ns: u64,
    pub pkt_id: Option<u64>,
    pub flow_id: Option<u64>,
    pub pkt_bytes: Option<u32>,
    pub pkt_kind: Option<VizPacketKind>,
    #[serde(flatten)]
    pub kind: VizEventKind,
}

/// 一个简单的事件收集器（存内存，仿真结束写 JSON 文件）
#[derive(Debug, Default)]
pub struct VizLogger {
    pub events: Vec<VizEvent>,
}

impl VizLogger {
    pub fn push(&mut self, ev: VizEvent) {
        self.events.push(ev);
    }
}
