//! Trace hooks for the network.

use crate::sim::SimTime;
use crate::viz::{VizEvent, VizEventKind, VizLinkInfo, VizNodeInfo, VizPacketKind, VizTcp};

use super::{NodeId, NodeKind, Network, Packet, TcpSegment, Transport};

impl Network {
    pub(crate) fn pkt_kind(pkt: &Packet) -> VizPacketKind {
        match &pkt.transport {
            Transport::Tcp(TcpSegment::Data { .. }) => VizPacketKind::Data,
            Transport::Tcp(TcpSegment::Ack { .. }) => VizPacketKind::Ack,
            Transport::Tcp(_) => VizPacketKind::Control,
            Transport::None => VizPacketKind::Other,
        }
    }

    fn viz_push(&mut self, ev: VizEvent) {
        if let Some(v) = &mut self.viz {
            v.push(ev);
        }
    }

    fn viz_pkt(&mut self, t: SimTime, pkt: &Packet, kind: VizEventKind) {
        self.viz_push(VizEvent {
            t_ns: t.0,
            pkt_id: Some(pkt.id),
            flow_id: Some(pkt.flow_id),
            pkt_bytes: Some(pkt.size_bytes),
            pkt_kind: Some(Self::pkt_kind(pkt)),
            kind,
        });
    }

    fn viz_tcp(&mut self, t_ns: u64, pkt_kind: VizPacketKind, tcp: VizTcp, kind: fn(VizTcp) -> VizEventKind) {
        self.viz_push(VizEvent {
            t_ns,
            pkt_id: None,
            flow_id: Some(tcp.conn_id),
            pkt_bytes: None,
            pkt_kind: Some(pkt_kind),
            kind: kind(tcp),
        });
    }

    /// 记录拓扑元信息；应在拓扑与队列容量设置完成后调用
    pub fn emit_viz_meta(&mut self) {
        if self.viz.is_none() {
            return;
        }
        let nodes = self
            .nodes()
            .iter()
            .map(|n| VizNodeInfo {
                id: n.id().0,
                name: n.name().to_string(),
                kind: match n.kind() {
                    NodeKind::Host => "host",
                    NodeKind::Router => "router",
                    NodeKind::AccessPoint => "access_point",
                    NodeKind::Station => "station",
                }
                .to_string(),
            })
            .collect::<Vec<_>>();
        let links = self
            .links
            .iter()
            .map(|l| VizLinkInfo {
                from: l.from.0,
                to: l.to.0,
                bandwidth_bps: l.rate.bps(),
                latency_ns: l.latency.0,
                q_cap_bytes: l.queue.capacity_bytes(),
                error_rate: l.error_model.map(|m| m.rate()),
            })
            .collect::<Vec<_>>();
        self.viz_push(VizEvent {
            t_ns: 0,
            pkt_id: None,
            flow_id: None,
            pkt_bytes: None,
            pkt_kind: None,
            kind: VizEventKind::Meta { nodes, links },
        });
    }

    pub(crate) fn viz_tx_start(
        &mut self,
        t: SimTime,
        pkt: &Packet,
        from: NodeId,
        to: NodeId,
        depart: SimTime,
        arrive: SimTime,
    ) {
        self.viz_pkt(
            t,
            pkt,
            VizEventKind::TxStart {
                link_from: from.0,
                link_to: to.0,
                depart_ns: depart.0,
                arrive_ns: arrive.0,
            },
        );
    }

    pub(crate) fn viz_drop(&mut self, t: SimTime, pkt: &Packet, from: NodeId, to: NodeId, q_bytes: u64, q_cap_bytes: u64) {
        self.viz_pkt(
            t,
            pkt,
            VizEventKind::Drop {
                link_from: from.0,
                link_to: to.0,
                q_bytes,
                q_cap_bytes,
            },
        );
    }

    pub(crate) fn viz_corrupt(&mut self, t: SimTime, pkt: &Packet, from: NodeId, to: NodeId) {
        self.viz_pkt(
            t,
            pkt,
            VizEventKind::Corrupt {
                link_from: from.0,
                link_to: to.0,
            },
        );
    }

    pub(crate) fn viz_delivered(&mut self, t: SimTime, pkt: &Packet, node: NodeId) {
        self.viz_pkt(t, pkt, VizEventKind::Delivered { node: node.0 });
    }

    pub(crate) fn viz_app_send(&mut self, t: SimTime, app: usize, node: NodeId, bytes: u32, accepted: u32) {
        self.viz_push(VizEvent {
            t_ns: t.0,
            pkt_id: None,
            flow_id: None,
            pkt_bytes: Some(bytes),
            pkt_kind: Some(VizPacketKind::Data),
            kind: VizEventKind::AppSend {
                app,
                node: node.0,
                bytes,
                accepted,
            },
        });
    }

    pub(crate) fn viz_tcp_send_data(&mut self, t_ns: u64, conn_id: u64, seq: u64, len: u32, retrans: bool) {
        let tcp = VizTcp {
            conn_id,
            seq: Some(seq),
            len: Some(len),
            ack: None,
            retrans: retrans.then_some(true),
        };
        self.viz_tcp(t_ns, VizPacketKind::Data, tcp, VizEventKind::TcpSendData);
    }

    pub(crate) fn viz_tcp_send_ack(&mut self, t_ns: u64, conn_id: u64, ack: u64) {
        let tcp = VizTcp {
            conn_id,
            ack: Some(ack),
            ..VizTcp::default()
        };
        self.viz_tcp(t_ns, VizPacketKind::Ack, tcp, VizEventKind::TcpSendAck);
    }

    pub(crate) fn viz_tcp_recv_ack(&mut self, t_ns: u64, conn_id: u64, ack: u64) {
        let tcp = VizTcp {
            conn_id,
            ack: Some(ack),
            ..VizTcp::default()
        };
        self.viz_tcp(t_ns, VizPacketKind::Ack, tcp, VizEventKind::TcpRecvAck);
    }

    pub(crate) fn viz_tcp_rto(&mut self, t_ns: u64, conn_id: u64, seq: u64) {
        let tcp = VizTcp {
            conn_id,
            seq: Some(seq),
            ..VizTcp::default()
        };
        self.viz_tcp(t_ns, VizPacketKind::Data, tcp, VizEventKind::TcpRto);
    }
}
