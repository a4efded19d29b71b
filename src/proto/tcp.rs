//! TCP（简化版）协议实现
//!
//! 目标：为 socket 提供一个字节流传输，足以让限速应用跑在有损、有瓶颈的链路上：
//! - 三次握手（SYN 丢失靠 RTO 重发；无监听端口时回 RST）
//! - 有界发送缓冲区：应用写入超过剩余空间的部分被拒收
//! - Reno 风格的拥塞控制（慢启动 + AIMD，3 dupACK 快速重传，NewReno 部分确认）
//! - 超时重传（RFC 6298 RTT 估计，指数退避，上下限截断）
//! - 接收端缓存乱序段，累计确认
//!
//! 注意：这是仿真用途的“极简 TCP”，不实现窗口通告/选择确认/FIN 挥手。
//! 关闭连接会丢弃未发送的数据。

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::Serialize;
use tracing::{debug, trace};

use super::socket::{SockAddr, SocketEntry, SocketId};
use crate::net::{NetWorld, Network, NodeId, TcpSegment, Transport};
use crate::sim::{Event, EventId, SimTime, Simulator, World};

/// 一个 TCP 连接的唯一标识（复用 `flow_id` 的语义）。
pub type TcpConnId = u64;

/// TCP/IP 头部开销（字节）
pub const TCP_HEADER_BYTES: u32 = 40;

/// 第一个临时端口
pub const EPHEMERAL_PORT_BASE: u16 = 49152;

#[derive(Debug, Clone)]
pub struct TcpConfig {
    /// MSS（数据段载荷大小，字节）
    pub mss: u32,
    /// ACK / 控制段大小（字节）
    pub ack_bytes: u32,
    /// 初始 cwnd（字节）
    pub init_cwnd_bytes: u64,
    /// 初始 ssthresh（字节）
    pub init_ssthresh_bytes: u64,
    /// 初始 RTO（尚无 RTT 样本时使用）
    pub init_rto: SimTime,
    /// 最小 RTO
    pub min_rto: SimTime,
    /// 最大 RTO（用于退避上限）
    pub max_rto: SimTime,
    /// 发送缓冲区容量（字节）：已写入但未被确认的数据上限
    pub snd_buf_bytes: u64,
}

impl Default for TcpConfig {
    fn default() -> Self {
        let mss = 1460;
        Self {
            mss,
            ack_bytes: TCP_HEADER_BYTES,
            init_cwnd_bytes: (mss as u64).saturating_mul(10),
            init_ssthresh_bytes: (mss as u64).saturating_mul(1_000),
            init_rto: SimTime::from_secs(1),
            min_rto: SimTime::from_millis(200),
            max_rto: SimTime::from_secs(60),
            snd_buf_bytes: 128 * 1024,
        }
    }
}

/// 连接状态（发送端视角）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TcpState {
    SynSent,
    Established,
    /// 本端已关闭
    Closed,
    /// 对端没有监听
    Refused,
}

#[derive(Debug, Clone)]
struct SentSeg {
    len: u32,
    sent_at: SimTime,
    retrans: bool,
}

#[derive(Debug, Clone)]
pub struct TcpConn {
    pub id: TcpConnId,
    pub local: SockAddr,
    pub peer: SockAddr,
    pub cfg: TcpConfig,
    state: TcpState,

    // sender
    /// 应用写入的字节流末尾
    snd_end: u64,
    next_seq: u64,
    last_acked: u64,
    cwnd_bytes: u64,
    ssthresh_bytes: u64,
    dup_acks: u32,
    in_recovery: bool,
    recover_seq: u64,
    rto: SimTime,
    srtt: Option<SimTime>,
    rttvar: SimTime,
    rto_event: Option<EventId>,
    inflight: BTreeMap<u64, SentSeg>, // seq -> segment

    // receiver
    accepted: bool,
    rcv_nxt: u64,
    ooo: BTreeMap<u64, u32>,

    // stats
    retransmits: u64,
    timeouts: u64,
}

impl TcpConn {
    pub fn new(id: TcpConnId, local: SockAddr, peer: SockAddr, cfg: TcpConfig) -> Self {
        let init_rto = cfg.init_rto;
        let cwnd = cfg.init_cwnd_bytes.max(cfg.mss as u64);
        let ssthresh = cfg.init_ssthresh_bytes.max(cfg.mss as u64);
        Self {
            id,
            local,
            peer,
            cfg,
            state: TcpState::SynSent,
            snd_end: 0,
            next_seq: 0,
            last_acked: 0,
            cwnd_bytes: cwnd,
            ssthresh_bytes: ssthresh,
            dup_acks: 0,
            in_recovery: false,
            recover_seq: 0,
            rto: init_rto,
            srtt: None,
            rttvar: SimTime::ZERO,
            rto_event: None,
            inflight: BTreeMap::new(),
            accepted: false,
            rcv_nxt: 0,
            ooo: BTreeMap::new(),
            retransmits: 0,
            timeouts: 0,
        }
    }

    pub fn state(&self) -> TcpState {
        self.state
    }

    pub fn bytes_acked(&self) -> u64 {
        self.last_acked
    }

    /// 已被应用写入（发送缓冲区接收）的字节数
    pub fn bytes_written(&self) -> u64 {
        self.snd_end
    }

    /// 接收端按序收到的字节数
    pub fn bytes_received(&self) -> u64 {
        self.rcv_nxt
    }

    pub fn cwnd_bytes(&self) -> u64 {
        self.cwnd_bytes
    }

    pub fn retransmits(&self) -> u64 {
        self.retransmits
    }

    pub fn timeouts(&self) -> u64 {
        self.timeouts
    }

    pub fn rto(&self) -> SimTime {
        self.rto
    }

    /// 发送缓冲区剩余空间
    pub fn send_buffer_free(&self) -> u64 {
        let used = self.snd_end.saturating_sub(self.last_acked);
        self.cfg.snd_buf_bytes.saturating_sub(used)
    }

    fn earliest_unacked_seq(&self) -> Option<u64> {
        self.inflight.keys().next().copied()
    }

    fn inflight_bytes(&self) -> u64 {
        self.inflight.values().map(|s| s.len as u64).sum()
    }

    /// 无退避的 RTO：有 RTT 样本时为 srtt + 4*rttvar，截断到 [min_rto, max_rto]
    fn base_rto(&self) -> SimTime {
        let raw = match self.srtt {
            Some(srtt) => srtt.saturating_add(SimTime(self.rttvar.0.saturating_mul(4).max(1))),
            None => self.cfg.init_rto,
        };
        raw.max(self.cfg.min_rto).min(self.cfg.max_rto)
    }

    fn on_rtt_sample(&mut self, r: SimTime) {
        match self.srtt {
            None => {
                self.srtt = Some(r);
                self.rttvar = SimTime(r.0 / 2);
            }
            Some(srtt) => {
                let err = srtt.0.abs_diff(r.0);
                self.rttvar = SimTime((3 * self.rttvar.0 + err) / 4);
                self.srtt = Some(SimTime((7 * srtt.0 + r.0) / 8));
            }
        }
        self.rto = self.base_rto();
    }
}

#[derive(Debug, Default)]
pub struct TcpStack {
    pub cfg: TcpConfig,
    conns: HashMap<TcpConnId, TcpConn>,
    pub(crate) sockets: Vec<SocketEntry>,
    /// 监听地址 -> 监听 socket
    pub(crate) listeners: HashMap<SockAddr, SocketId>,
    /// 已占用的本地地址
    pub(crate) bound: HashSet<SockAddr>,
    /// 每个监听地址累计按序收到的字节数（监听关闭后保留）
    rx_bytes: HashMap<SockAddr, u64>,
    next_conn_id: u64,
    next_ephemeral: u16,
}

impl TcpStack {
    pub fn get(&self, id: TcpConnId) -> Option<&TcpConn> {
        self.conns.get(&id)
    }

    pub fn conns(&self) -> impl Iterator<Item = &TcpConn> {
        self.conns.values()
    }

    /// 监听地址累计收到的字节数
    pub fn rx_bytes(&self, addr: SockAddr) -> u64 {
        self.rx_bytes.get(&addr).copied().unwrap_or(0)
    }

    pub(crate) fn alloc_ephemeral(&mut self, node: NodeId) -> SockAddr {
        loop {
            let port = EPHEMERAL_PORT_BASE.wrapping_add(self.next_ephemeral);
            self.next_ephemeral = self.next_ephemeral.wrapping_add(1) % (u16::MAX - EPHEMERAL_PORT_BASE);
            let addr = SockAddr::new(node, port);
            if !self.bound.contains(&addr) {
                return addr;
            }
        }
    }

    /// 建立新连接：发出 SYN 并启动重传定时器
    pub(crate) fn open_conn(&mut self, local: SockAddr, peer: SockAddr, sim: &mut Simulator, net: &mut Network) -> TcpConnId {
        self.next_conn_id = self.next_conn_id.wrapping_add(1);
        let id = self.next_conn_id;
        let mut conn = TcpConn::new(id, local, peer, self.cfg.clone());
        debug!(conn_id = id, %local, %peer, "TCP SYN");
        Self::emit(net, sim, &conn, local.node, peer.node, conn.cfg.ack_bytes, TcpSegment::Syn { dst_port: peer.port });
        Self::arm_rto(&mut conn, sim);
        self.conns.insert(id, conn);
        id
    }

    /// 关闭连接：停止定时器，丢弃未发送/未确认的数据
    pub(crate) fn close_conn(&mut self, id: TcpConnId, sim: &mut Simulator) {
        let Some(conn) = self.conns.get_mut(&id) else {
            return;
        };
        Self::disarm_rto(conn, sim);
        conn.inflight.clear();
        if conn.state != TcpState::Refused {
            conn.state = TcpState::Closed;
        }
    }

    /// 应用写入 `bytes` 字节；返回发送缓冲区实际接收的字节数（可能为 0）
    pub(crate) fn write(&mut self, id: TcpConnId, bytes: u32, sim: &mut Simulator, net: &mut Network) -> u32 {
        let Some(conn) = self.conns.get_mut(&id) else {
            return 0;
        };
        // 载荷整体写入，放不下时整体拒绝
        let accepted = if (bytes as u64) <= conn.send_buffer_free() { bytes } else { 0 };
        conn.snd_end = conn.snd_end.saturating_add(accepted as u64);
        trace!(conn_id = id, bytes, accepted, "应用写入发送缓冲区");
        if accepted > 0 && conn.state == TcpState::Established {
            self.send_data_if_possible(id, sim, net);
        }
        accepted
    }

    fn emit(net: &mut Network, sim: &mut Simulator, conn: &TcpConn, from: NodeId, to: NodeId, size: u32, seg: TcpSegment) {
        let mut pkt = net.make_packet(conn.id, size, from, to);
        pkt.transport = Transport::Tcp(seg);
        net.forward_from(from, pkt, sim);
    }

    fn arm_rto(conn: &mut TcpConn, sim: &mut Simulator) {
        if let Some(ev) = conn.rto_event.take() {
            sim.cancel(ev);
        }
        conn.rto_event = Some(sim.schedule_in(conn.rto, TcpRto { conn_id: conn.id }));
    }

    fn disarm_rto(conn: &mut TcpConn, sim: &mut Simulator) {
        if let Some(ev) = conn.rto_event.take() {
            sim.cancel(ev);
        }
    }

    fn retransmit_earliest(conn: &mut TcpConn, sim: &mut Simulator, net: &mut Network) {
        let Some(seq) = conn.earliest_unacked_seq() else {
            return;
        };
        let now = sim.now();
        let len = match conn.inflight.get_mut(&seq) {
            Some(seg) => {
                seg.retrans = true;
                seg.sent_at = now;
                seg.len
            }
            None => return,
        };
        conn.retransmits += 1;
        net.viz_tcp_send_data(now.0, conn.id, seq, len, true);
        Self::emit(net, sim, conn, conn.local.node, conn.peer.node, len + TCP_HEADER_BYTES, TcpSegment::Data { seq, len });
    }

    pub(crate) fn send_data_if_possible(&mut self, id: TcpConnId, sim: &mut Simulator, net: &mut Network) {
        let Some(conn) = self.conns.get_mut(&id) else {
            return;
        };
        if conn.state != TcpState::Established {
            return;
        }

        // 发送窗口：inflight bytes < cwnd
        let mut avail = conn.cwnd_bytes.saturating_sub(conn.inflight_bytes());

        while avail > 0 && conn.next_seq < conn.snd_end {
            let remain = conn.snd_end - conn.next_seq;
            let len = (conn.cfg.mss as u64).min(remain).min(avail) as u32;
            if len == 0 {
                break;
            }
            let seq = conn.next_seq;
            conn.next_seq = conn.next_seq.saturating_add(len as u64);
            avail = avail.saturating_sub(len as u64);

            net.viz_tcp_send_data(sim.now().0, conn.id, seq, len, false);
            conn.inflight.insert(
                seq,
                SentSeg {
                    len,
                    sent_at: sim.now(),
                    retrans: false,
                },
            );
            Self::emit(net, sim, conn, conn.local.node, conn.peer.node, len + TCP_HEADER_BYTES, TcpSegment::Data { seq, len });

            // 定时器未运行时启动
            if conn.rto_event.is_none() {
                Self::arm_rto(conn, sim);
            }
        }
    }

    fn send_ack(conn: &TcpConn, sim: &mut Simulator, net: &mut Network) {
        let ack = conn.rcv_nxt;
        net.viz_tcp_send_ack(sim.now().0, conn.id, ack);
        Self::emit(net, sim, conn, conn.peer.node, conn.local.node, conn.cfg.ack_bytes, TcpSegment::Ack { ack });
    }

    #[tracing::instrument(skip(self, seg, sim, net))]
    pub fn on_tcp_segment(
        &mut self,
        conn_id: TcpConnId,
        at: NodeId,
        from: NodeId,
        seg: TcpSegment,
        sim: &mut Simulator,
        net: &mut Network,
    ) {
        let Some(conn) = self.conns.get_mut(&conn_id) else {
            trace!("segment for unknown connection");
            return;
        };
        match seg {
            TcpSegment::Syn { dst_port } => {
                // 被动端：检查监听端口
                let addr = SockAddr::new(at, dst_port);
                if self.listeners.contains_key(&addr) {
                    conn.accepted = true;
                    debug!(%addr, "SYN accepted");
                    Self::emit(net, sim, conn, at, from, conn.cfg.ack_bytes, TcpSegment::SynAck);
                } else {
                    debug!(%addr, "no listener, RST");
                    Self::emit(net, sim, conn, at, from, conn.cfg.ack_bytes, TcpSegment::Rst);
                }
            }
            TcpSegment::SynAck => {
                if conn.state != TcpState::SynSent {
                    return;
                }
                conn.state = TcpState::Established;
                Self::disarm_rto(conn, sim);
                conn.rto = conn.base_rto();
                debug!("TCP established");
                Self::emit(net, sim, conn, at, from, conn.cfg.ack_bytes, TcpSegment::HandshakeAck);
                self.send_data_if_possible(conn_id, sim, net);
            }
            TcpSegment::HandshakeAck => {
                trace!("handshake complete at passive side");
            }
            TcpSegment::Rst => {
                if conn.state == TcpState::SynSent {
                    Self::disarm_rto(conn, sim);
                    conn.state = TcpState::Refused;
                    debug!("connection refused");
                }
            }
            TcpSegment::Data { seq, len } => {
                if !conn.accepted || !self.listeners.contains_key(&conn.peer) {
                    trace!("data without listener, discarded");
                    return;
                }

                let before = conn.rcv_nxt;
                if seq == conn.rcv_nxt {
                    conn.rcv_nxt = conn.rcv_nxt.saturating_add(len as u64);
                    // 合并此前缓存的乱序段
                    while let Some((&s, &l)) = conn.ooo.first_key_value() {
                        if s > conn.rcv_nxt {
                            break;
                        }
                        conn.ooo.remove(&s);
                        conn.rcv_nxt = conn.rcv_nxt.max(s.saturating_add(l as u64));
                    }
                } else if seq > conn.rcv_nxt {
                    conn.ooo.insert(seq, len);
                }
                let advanced = conn.rcv_nxt - before;
                if advanced > 0 {
                    *self.rx_bytes.entry(conn.peer).or_insert(0) += advanced;
                }
                // 无论是否乱序，都发累计 ACK（dupACK 体现为 ack 不前进）
                Self::send_ack(conn, sim, net);
            }
            TcpSegment::Ack { ack } => {
                if conn.state != TcpState::Established {
                    return;
                }

                // 记录“收到 ACK”这一事实（无论新 ACK 或 dupACK）
                net.viz_tcp_recv_ack(sim.now().0, conn.id, ack);
                let mss = conn.cfg.mss as u64;

                if ack > conn.last_acked {
                    conn.dup_acks = 0;
                    let newly_acked = ack - conn.last_acked;
                    conn.last_acked = ack;

                    // 移除已确认段，并取一个 RTT 样本（Karn：跳过重传段）
                    let now = sim.now();
                    let mut sample = None;
                    while let Some((&s, sent)) = conn.inflight.first_key_value() {
                        let end = s.saturating_add(sent.len as u64);
                        if end > ack {
                            break;
                        }
                        if end == ack && !sent.retrans {
                            sample = Some(now.saturating_sub(sent.sent_at));
                        }
                        conn.inflight.remove(&s);
                    }
                    match sample {
                        Some(r) => conn.on_rtt_sample(r),
                        None => conn.rto = conn.base_rto(),
                    }

                    if conn.in_recovery {
                        if ack >= conn.recover_seq {
                            conn.in_recovery = false;
                            conn.cwnd_bytes = conn.ssthresh_bytes;
                        } else {
                            // 部分确认：继续修复下一个空洞
                            Self::retransmit_earliest(conn, sim, net);
                        }
                    } else if conn.cwnd_bytes < conn.ssthresh_bytes {
                        conn.cwnd_bytes = conn.cwnd_bytes.saturating_add(newly_acked);
                    } else {
                        // AIMD：每个 ACK 让 cwnd 以 mss^2/cwnd 增长（至少 +1）
                        let inc = (mss.saturating_mul(mss) / conn.cwnd_bytes).max(1);
                        conn.cwnd_bytes = conn.cwnd_bytes.saturating_add(inc);
                    }

                    if conn.inflight.is_empty() {
                        Self::disarm_rto(conn, sim);
                    } else {
                        Self::arm_rto(conn, sim);
                    }

                    self.send_data_if_possible(conn_id, sim, net);
                } else if ack == conn.last_acked && !conn.inflight.is_empty() {
                    // dupACK
                    conn.dup_acks = conn.dup_acks.saturating_add(1);
                    let dup = conn.dup_acks;
                    if dup == 3 && !conn.in_recovery {
                        // 快速重传：重传 earliest unacked
                        conn.ssthresh_bytes = (conn.cwnd_bytes / 2).max(2 * mss);
                        conn.cwnd_bytes = conn.ssthresh_bytes.saturating_add(3 * mss);
                        conn.in_recovery = true;
                        conn.recover_seq = conn.next_seq;
                        Self::retransmit_earliest(conn, sim, net);
                    } else if dup > 3 && conn.in_recovery {
                        // 快速恢复：每个额外 dupACK 增加 cwnd 一个 MSS
                        conn.cwnd_bytes = conn.cwnd_bytes.saturating_add(mss);
                        self.send_data_if_possible(conn_id, sim, net);
                    }
                }
            }
        }
    }

    /// 重传定时器到期
    pub(crate) fn on_rto(&mut self, conn_id: TcpConnId, sim: &mut Simulator, net: &mut Network) {
        let Some(conn) = self.conns.get_mut(&conn_id) else {
            return;
        };
        conn.rto_event = None;
        let backoff = |rto: SimTime, max: SimTime| SimTime(rto.0.saturating_mul(2).min(max.0));

        match conn.state {
            TcpState::SynSent => {
                conn.timeouts += 1;
                conn.rto = backoff(conn.rto, conn.cfg.max_rto);
                debug!(conn_id, rto = ?conn.rto, "SYN timeout, resending");
                let (from, to, port) = (conn.local.node, conn.peer.node, conn.peer.port);
                Self::emit(net, sim, conn, from, to, conn.cfg.ack_bytes, TcpSegment::Syn { dst_port: port });
                Self::arm_rto(conn, sim);
            }
            TcpState::Established => {
                let Some(seq) = conn.earliest_unacked_seq() else {
                    return;
                };
                net.viz_tcp_rto(sim.now().0, conn_id, seq);

                // 超时：回到慢启动
                let mss = conn.cfg.mss as u64;
                conn.timeouts += 1;
                conn.ssthresh_bytes = (conn.cwnd_bytes / 2).max(2 * mss);
                conn.cwnd_bytes = mss;
                conn.dup_acks = 0;
                conn.in_recovery = false;
                conn.rto = backoff(conn.rto, conn.cfg.max_rto);
                debug!(conn_id, seq, rto = ?conn.rto, "RTO, retransmitting");

                Self::retransmit_earliest(conn, sim, net);
                Self::arm_rto(conn, sim);
            }
            TcpState::Closed | TcpState::Refused => {}
        }
    }
}

/// TCP RTO 事件
#[derive(Debug)]
pub struct TcpRto {
    pub conn_id: TcpConnId,
}

impl Event for TcpRto {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        let TcpRto { conn_id } = *self;
        let w = world
            .as_any_mut()
            .downcast_mut::<NetWorld>()
            .expect("world must be NetWorld");
        w.net.with_tcp(|tcp, net| tcp.on_rto(conn_id, sim, net));
    }
}
