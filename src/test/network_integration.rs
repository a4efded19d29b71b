use crate::net::{DataRate, ErrorUnit, NetWorld, NodeId, NodeKind, Packet, RateErrorModel};
use crate::sim::{Event, SimTime, Simulator, World};
use crate::viz::{VizEventKind, VizLogger};

fn expected_tx_time_ns(bytes: u32, rate: DataRate) -> u64 {
    let bits = bytes as u128 * 8;
    let bps = rate.bps() as u128;
    ((bits * 1_000_000_000 + bps - 1) / bps) as u64
}

fn tx_start_events(world: &NetWorld, from: NodeId, to: NodeId) -> Vec<(u64, u64, u64, u64)> {
    let Some(v) = &world.net.viz else {
        return Vec::new();
    };
    v.events
        .iter()
        .filter_map(|ev| match &ev.kind {
            VizEventKind::TxStart {
                link_from,
                link_to,
                depart_ns,
                arrive_ns,
            } if *link_from == from.0 && *link_to == to.0 => Some((ev.t_ns, ev.pkt_id?, *depart_ns, *arrive_ns)),
            _ => None,
        })
        .collect()
}

fn drop_events(world: &NetWorld, from: NodeId, to: NodeId) -> Vec<(u64, u64, u64)> {
    let Some(v) = &world.net.viz else {
        return Vec::new();
    };
    v.events
        .iter()
        .filter_map(|ev| match &ev.kind {
            VizEventKind::Drop {
                link_from,
                link_to,
                q_cap_bytes,
                ..
            } if *link_from == from.0 && *link_to == to.0 => Some((ev.t_ns, ev.pkt_id?, *q_cap_bytes)),
            _ => None,
        })
        .collect()
}

/// 在 `from` 节点注入一个包（走正常的查路由 + 入队流程）
struct Inject {
    from: NodeId,
    pkt: Packet,
}

impl Event for Inject {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        let Inject { from, pkt } = *self;
        let w = world
            .as_any_mut()
            .downcast_mut::<NetWorld>()
            .expect("world must be NetWorld");
        w.net.forward_from(from, pkt, sim);
    }
}

fn inject(sim: &mut Simulator, at: SimTime, from: NodeId, pkt: Packet) {
    sim.schedule(at, Inject { from, pkt });
}

fn build_two_host_link(latency: SimTime, rate: DataRate) -> (NetWorld, NodeId, NodeId) {
    let mut world = NetWorld::default();
    let h0 = world.net.add_host("h0");
    let h1 = world.net.add_host("h1");
    world.net.connect_p2p(h0, h1, latency, rate);
    world.net.viz = Some(VizLogger::default());
    (world, h0, h1)
}

#[test]
fn link_serializes_packets_and_spaces_tx_starts() {
    let latency = SimTime::from_millis(2);
    let rate = DataRate::from_mbps(5);
    let bytes = 1000_u32;
    let tx_ns = expected_tx_time_ns(bytes, rate);
    assert_eq!(tx_ns, 1_600_000);

    let mut sim = Simulator::default();
    let (mut world, h0, h1) = build_two_host_link(latency, rate);

    let p0 = world.net.make_packet(1, bytes, h0, h1);
    let p1 = world.net.make_packet(1, bytes, h0, h1);
    let (id0, id1) = (p0.id, p1.id);
    inject(&mut sim, SimTime::ZERO, h0, p0);
    inject(&mut sim, SimTime::ZERO, h0, p1);
    sim.run(&mut world);

    assert_eq!(world.net.stats.dropped_pkts, 0);
    assert_eq!(world.net.stats.delivered_pkts, 2);
    assert_eq!(world.net.stats.delivered_bytes, bytes as u64 * 2);

    let starts = tx_start_events(&world, h0, h1);
    assert_eq!(starts.len(), 2);
    assert_eq!(starts[0], (0, id0, tx_ns, tx_ns + latency.0));
    // 第二个包在链路空闲（第一个包离开）时开始发送
    assert_eq!(starts[1], (tx_ns, id1, 2 * tx_ns, 2 * tx_ns + latency.0));
    assert_eq!(sim.now(), SimTime(2 * tx_ns + latency.0));
}

#[test]
fn queue_drop_updates_stats_and_emits_viz_drop() {
    let rate = DataRate::from_gbps(1);
    let (mut world, h0, h1) = build_two_host_link(SimTime::from_micros(1), rate);
    assert!(world.net.set_link_queue_capacity_bytes(h0, h1, 100));
    assert!(!world.net.set_link_queue_capacity_bytes(h0, NodeId(9), 100));

    let mut sim = Simulator::default();
    let pkt = world.net.make_packet(1, 200, h0, h1);
    let id = pkt.id;
    inject(&mut sim, SimTime::ZERO, h0, pkt);
    sim.run(&mut world);

    assert_eq!(world.net.stats.dropped_pkts, 1);
    assert_eq!(world.net.stats.dropped_bytes, 200);
    assert_eq!(world.net.stats.delivered_pkts, 0);
    assert_eq!(drop_events(&world, h0, h1), vec![(0, id, 100)]);
    assert!(tx_start_events(&world, h0, h1).is_empty());
}

#[test]
fn packets_are_forwarded_hop_by_hop_through_a_router() {
    let mut world = NetWorld::default();
    let h0 = world.net.add_host("h0");
    let r = world.net.add_node("r", NodeKind::Router);
    let h1 = world.net.add_host("h1");
    let latency = SimTime::from_micros(10);
    let rate = DataRate::from_mbps(100);
    world.net.connect_p2p(h0, r, latency, rate);
    world.net.connect_p2p(r, h1, latency, rate);
    world.net.viz = Some(VizLogger::default());

    assert_eq!(world.net.next_hop(h0, h1), Some(r));
    assert_eq!(world.net.next_hop(r, h1), Some(h1));

    let mut sim = Simulator::default();
    let pkt = world.net.make_packet(7, 500, h0, h1);
    inject(&mut sim, SimTime::ZERO, h0, pkt);
    sim.run(&mut world);

    let tx = expected_tx_time_ns(500, rate);
    assert_eq!(world.net.stats.delivered_pkts, 1);
    assert_eq!(tx_start_events(&world, h0, r).len(), 1);
    let second = tx_start_events(&world, r, h1);
    assert_eq!(second.len(), 1);
    assert_eq!(second[0].0, tx + latency.0);
    assert_eq!(sim.now(), SimTime(2 * (tx + latency.0)));
}

#[test]
fn packet_without_route_is_counted_unroutable() {
    let mut world = NetWorld::default();
    let h0 = world.net.add_host("h0");
    let h1 = world.net.add_host("h1");
    let island = world.net.add_host("island");
    world.net.connect_p2p(h0, h1, SimTime::from_micros(1), DataRate::from_gbps(1));

    let mut sim = Simulator::default();
    let pkt = world.net.make_packet(1, 100, h0, island);
    inject(&mut sim, SimTime::ZERO, h0, pkt);
    sim.run(&mut world);

    assert_eq!(world.net.stats.unroutable_pkts, 1);
    assert_eq!(world.net.stats.delivered_pkts, 0);
}

#[test]
fn receive_error_model_drops_corrupted_packets_at_the_receiver() {
    let rate = DataRate::from_mbps(10);
    let (mut world, h0, h1) = build_two_host_link(SimTime::from_micros(5), rate);
    assert!(
        world
            .net
            .set_receive_error_model(h0, h1, RateErrorModel::new(1.0, ErrorUnit::Packet))
    );

    let mut sim = Simulator::default();
    for _ in 0..3 {
        let pkt = world.net.make_packet(1, 100, h0, h1);
        inject(&mut sim, SimTime::ZERO, h0, pkt);
    }
    // 反方向没有错误模型
    let back = world.net.make_packet(2, 100, h1, h0);
    inject(&mut sim, SimTime::ZERO, h1, back);
    sim.run(&mut world);

    assert_eq!(world.net.stats.corrupted_pkts, 3);
    assert_eq!(world.net.stats.corrupted_bytes, 300);
    assert_eq!(world.net.stats.delivered_pkts, 1);
    // 损坏的包仍然占用了链路
    assert_eq!(tx_start_events(&world, h0, h1).len(), 3);

    let corrupt = world
        .net
        .viz
        .as_ref()
        .expect("viz enabled")
        .events
        .iter()
        .filter(|ev| matches!(ev.kind, VizEventKind::Corrupt { .. }))
        .count();
    assert_eq!(corrupt, 3);
}

#[test]
fn error_model_outcomes_are_reproducible_for_a_seed() {
    let run = |seed: u64| {
        let (mut world, h0, h1) = build_two_host_link(SimTime::from_micros(1), DataRate::from_gbps(1));
        world.net.reseed(seed);
        world
            .net
            .set_receive_error_model(h0, h1, RateErrorModel::new(0.5, ErrorUnit::Packet));
        let mut sim = Simulator::default();
        for i in 0..64 {
            let pkt = world.net.make_packet(1, 100, h0, h1);
            inject(&mut sim, SimTime::from_micros(i), h0, pkt);
        }
        sim.run(&mut world);
        world.net.stats.corrupted_pkts
    };

    let a = run(42);
    assert_eq!(a, run(42));
    assert!(a > 0 && a < 64, "corrupted {a} of 64 at rate 0.5");
}

#[test]
fn link_ready_and_arrival_at_the_same_time_transmit_once_each() {
    let latency = SimTime::from_micros(1);
    let rate = DataRate::from_gbps(1);
    let bytes = 1000_u32;
    let depart1 = SimTime(expected_tx_time_ns(bytes, rate));

    let mut sim = Simulator::default();
    let (mut world, h0, h1) = build_two_host_link(latency, rate);
    let p0 = world.net.make_packet(1, bytes, h0, h1);
    let p1 = world.net.make_packet(1, bytes, h0, h1);
    inject(&mut sim, SimTime::ZERO, h0, p0);
    // 先于 LinkReady 调度，因此同一时刻先执行
    inject(&mut sim, depart1, h0, p1);
    sim.run(&mut world);

    assert_eq!(world.net.stats.delivered_pkts, 2);
    let starts = tx_start_events(&world, h0, h1);
    assert_eq!(starts.len(), 2);
    assert_eq!(starts[1].0, depart1.0);
}
