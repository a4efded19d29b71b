//! 网络拓扑管理
//!
//! 定义网络拓扑结构，包含节点、链路、逐跳转发、链路队列与统计信息。

use std::collections::HashMap;

use rand::SeedableRng;
use rand::rngs::StdRng;

use super::data_rate::DataRate;
use super::link_events::{DeliverPacket, LinkReady};
use super::error_model::RateErrorModel;
use super::id::{LinkId, NodeId};
use super::link::Link;
use super::node::{Node, NodeKind};
use super::packet::Packet;
use super::routing::RoutingTable;
use super::stats::Stats;
use crate::proto::tcp::TcpStack;
use crate::sim::{SimTime, Simulator};
use crate::viz::VizLogger;
use tracing::{debug, trace, warn};

/// 未显式设置种子时使用的随机种子
pub const DEFAULT_SEED: u64 = 1;

/// 网络拓扑
pub struct Network {
    nodes: Vec<Node>,
    pub(crate) links: Vec<Link>,
    edges: HashMap<(NodeId, NodeId), LinkId>,
    routing: RoutingTable,
    next_pkt_id: u64,
    /// 全部随机性的唯一来源（错误模型等）
    rng: StdRng,
    pub stats: Stats,
    pub tcp: TcpStack,
    pub viz: Option<VizLogger>,
}

impl Default for Network {
    fn default() -> Self {
        Self {
            nodes: Vec::new(),
            links: Vec::new(),
            edges: HashMap::new(),
            routing: RoutingTable::new(),
            next_pkt_id: 0,
            rng: StdRng::seed_from_u64(DEFAULT_SEED),
            stats: Stats::default(),
            tcp: TcpStack::default(),
            viz: None,
        }
    }
}

impl Network {
    /// 重新设置随机种子
    pub fn reseed(&mut self, seed: u64) {
        self.rng = StdRng::seed_from_u64(seed);
    }

    /// 添加节点
    pub fn add_node(&mut self, name: impl Into<String>, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node::new(id, name, kind));
        self.routing.mark_dirty();
        id
    }

    /// 添加主机节点
    pub fn add_host(&mut self, name: impl Into<String>) -> NodeId {
        self.add_node(name, NodeKind::Host)
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// 连接两个节点（创建单向链路）
    pub fn connect(&mut self, from: NodeId, to: NodeId, latency: SimTime, rate: DataRate) -> LinkId {
        let id = LinkId(self.links.len());
        self.links.push(Link::new(from, to, latency, rate));
        self.edges.insert((from, to), id);
        self.routing.mark_dirty();
        id
    }

    /// 点到点连接：创建两个方向的链路，返回 (a->b, b->a)
    pub fn connect_p2p(&mut self, a: NodeId, b: NodeId, latency: SimTime, rate: DataRate) -> (LinkId, LinkId) {
        let ab = self.connect(a, b, latency, rate);
        let ba = self.connect(b, a, latency, rate);
        (ab, ba)
    }

    pub fn link_between(&self, from: NodeId, to: NodeId) -> Option<LinkId> {
        self.edges.get(&(from, to)).copied()
    }

    pub fn link(&self, id: LinkId) -> Option<&Link> {
        self.links.get(id.0)
    }

    /// 设置某条单向链路的出口队列容量；链路不存在时返回 false
    pub fn set_link_queue_capacity_bytes(&mut self, from: NodeId, to: NodeId, cap_bytes: u64) -> bool {
        let Some(id) = self.link_between(from, to) else {
            return false;
        };
        self.links[id.0].queue.set_capacity_bytes(cap_bytes);
        true
    }

    /// 在 `from -> to` 链路的接收端（`to` 侧）安装错误模型；链路不存在时返回 false
    pub fn set_receive_error_model(&mut self, from: NodeId, to: NodeId, model: RateErrorModel) -> bool {
        let Some(id) = self.link_between(from, to) else {
            return false;
        };
        self.links[id.0].error_model = Some(model);
        true
    }

    /// 按当前拓扑重建路由表（拓扑未变化时什么也不做）
    pub fn populate_routing_tables(&mut self) {
        if !self.routing.is_dirty() {
            return;
        }
        let n = self.nodes.len();
        let mut adj = vec![Vec::new(); n];
        let mut rev_adj = vec![Vec::new(); n];
        for l in &self.links {
            adj[l.from.0].push(l.to);
            rev_adj[l.to.0].push(l.from);
        }
        self.routing.ensure_built(&adj, &rev_adj);
        debug!(routes = self.routing.len(), "路由表已重建");
    }

    /// 查询下一跳
    pub fn next_hop(&mut self, from: NodeId, dst: NodeId) -> Option<NodeId> {
        self.populate_routing_tables();
        self.routing.next_hop(from, dst)
    }

    /// 创建数据包
    pub fn make_packet(&mut self, flow_id: u64, size_bytes: u32, src: NodeId, dst: NodeId) -> Packet {
        let id = self.next_pkt_id;
        self.next_pkt_id = self.next_pkt_id.wrapping_add(1);
        Packet::new(id, flow_id, size_bytes, src, dst)
    }

    /// 从指定节点转发数据包：查路由、入出口队列，链路空闲则立即开始发送
    #[tracing::instrument(skip(self, pkt, sim), fields(pkt_id = pkt.id, from = ?from, dst = ?pkt.dst))]
    pub fn forward_from(&mut self, from: NodeId, pkt: Packet, sim: &mut Simulator) {
        let Some(next) = self.next_hop(from, pkt.dst) else {
            warn!("no route, dropping packet");
            self.stats.unroutable_pkts += 1;
            return;
        };
        let Some(link_id) = self.link_between(from, next) else {
            warn!(next = ?next, "routing table points at a missing link");
            self.stats.unroutable_pkts += 1;
            return;
        };
        trace!(next = ?next, link_id = ?link_id, "查找下一跳");

        let now = sim.now();
        let link = &mut self.links[link_id.0];
        match link.queue.enqueue(pkt) {
            Ok(()) => {
                if !link.busy {
                    self.start_tx(link_id, sim);
                }
            }
            Err(pkt) => {
                let (from, to) = (link.from, link.to);
                let (q_bytes, q_cap) = (link.queue.bytes(), link.queue.capacity_bytes());
                debug!(q_bytes, q_cap, "🗑️ 队列已满，丢弃数据包");
                self.stats.dropped_pkts += 1;
                self.stats.dropped_bytes += pkt.size_bytes as u64;
                self.viz_drop(now, &pkt, from, to, q_bytes, q_cap);
            }
        }
    }

    /// 从链路队列取出一个包开始串行化
    fn start_tx(&mut self, link_id: LinkId, sim: &mut Simulator) {
        let now = sim.now();
        let link = &mut self.links[link_id.0];
        let Some(pkt) = link.queue.dequeue() else {
            link.busy = false;
            return;
        };
        link.busy = true;
        let tx_time = link.tx_time(pkt.size_bytes);
        let depart = now.saturating_add(tx_time);
        let arrive = depart.saturating_add(link.latency);
        let (from, to) = (link.from, link.to);

        trace!(
            now = ?now,
            tx_time = ?tx_time,
            depart = ?depart,
            arrive = ?arrive,
            "计算传输时间"
        );

        self.viz_tx_start(now, &pkt, from, to, depart, arrive);
        sim.schedule(depart, LinkReady { link: link_id });
        sim.schedule(
            arrive,
            DeliverPacket {
                link: link_id,
                to,
                pkt: pkt.advance(),
            },
        );
    }

    /// 链路完成一次发送
    pub(crate) fn on_link_ready(&mut self, link_id: LinkId, sim: &mut Simulator) {
        let link = &mut self.links[link_id.0];
        link.busy = false;
        if !link.queue.is_empty() {
            self.start_tx(link_id, sim);
        }
    }

    /// 数据包经 `link` 到达节点 `to`：先过接收端错误模型，再交付或继续转发
    #[tracing::instrument(skip(self, pkt, sim), fields(pkt_id = pkt.id, to = ?to))]
    pub fn deliver(&mut self, link: LinkId, to: NodeId, pkt: Packet, sim: &mut Simulator) {
        let l = &self.links[link.0];
        if let Some(em) = l.error_model {
            let (from, link_to) = (l.from, l.to);
            if em.is_corrupt(pkt.size_bytes, &mut self.rng) {
                debug!("💥 错误模型判定损坏，丢弃");
                self.stats.corrupted_pkts += 1;
                self.stats.corrupted_bytes += pkt.size_bytes as u64;
                self.viz_corrupt(sim.now(), &pkt, from, link_to);
                return;
            }
        }

        if pkt.dst == to {
            self.on_delivered(to, pkt, sim);
        } else {
            self.forward_from(to, pkt, sim);
        }
    }
}
