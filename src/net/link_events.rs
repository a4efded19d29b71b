//! 链路事件：发送完成（LinkReady）与传播完成（DeliverPacket）

use super::id::{LinkId, NodeId};
use super::net_world::NetWorld;
use super::network::Network;
use super::packet::Packet;
use crate::sim::{Event, Simulator, World};
use tracing::debug;

fn net_of(world: &mut dyn World) -> &mut Network {
    &mut world
        .as_any_mut()
        .downcast_mut::<NetWorld>()
        .expect("world must be NetWorld")
        .net
}

/// 事件：`link` 在 depart 时刻完成一次序列化，空出发送端口。
#[derive(Debug)]
pub struct LinkReady {
    pub link: LinkId,
}

impl Event for LinkReady {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        net_of(world).on_link_ready(self.link, sim);
    }
}

/// 事件：一个 packet 经 `link` 传播完毕，到达节点 `to`。
#[derive(Debug)]
pub struct DeliverPacket {
    pub link: LinkId,
    pub to: NodeId,
    pub pkt: Packet,
}

impl Event for DeliverPacket {
    #[tracing::instrument(skip(self, sim, world), fields(pkt_id = self.pkt.id, flow_id = self.pkt.flow_id, to = ?self.to))]
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        let DeliverPacket { link, to, pkt } = *self;
        debug!(size_bytes = pkt.size_bytes, dst = ?pkt.dst, hops = pkt.hops, now = %sim.now(), "arrived");
        net_of(world).deliver(link, to, pkt, sim);
    }
}
