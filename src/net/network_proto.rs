//! Protocol dispatch hooks for the network.

use crate::proto::tcp::TcpStack;
use crate::sim::Simulator;
use tracing::{debug, trace};

use super::{Network, NodeId, Packet, Transport};

impl Network {
    /// 数据包送达目的地时的处理
    #[tracing::instrument(skip(self, pkt, sim), fields(pkt_id = pkt.id, flow_id = pkt.flow_id))]
    pub(crate) fn on_delivered(&mut self, at: NodeId, pkt: Packet, sim: &mut Simulator) {
        trace!("✅ 数据包送达目的地");

        self.viz_delivered(sim.now(), &pkt, at);

        self.stats.delivered_pkts += 1;
        self.stats.delivered_bytes += pkt.size_bytes as u64;

        debug!(
            size_bytes = pkt.size_bytes,
            delivered_pkts = self.stats.delivered_pkts,
            delivered_bytes = self.stats.delivered_bytes,
            "更新统计信息"
        );

        // 传输层处理（例如 TCP：目的端产生 ACK、源端处理 ACK 驱动继续发送）
        if let Transport::Tcp(seg) = pkt.transport {
            let conn_id = pkt.flow_id;
            let from = pkt.src;
            self.with_tcp(|tcp, net| tcp.on_tcp_segment(conn_id, at, from, seg, sim, net));
        }
    }

    /// 临时取出 TCP 协议栈，规避同时借用 `self` 与 `self.tcp`
    pub(crate) fn with_tcp<F, R>(&mut self, f: F) -> R
    where
        F: FnOnce(&mut TcpStack, &mut Network) -> R,
    {
        let mut tcp = std::mem::take(&mut self.tcp);
        let result = f(&mut tcp, self);
        self.tcp = tcp;
        result
    }
}
