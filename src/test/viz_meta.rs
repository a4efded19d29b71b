use crate::net::{DataRate, ErrorUnit, NetWorld, NodeKind, RateErrorModel};
use crate::sim::SimTime;
use crate::viz::{VizEventKind, VizLogger};
use std::collections::HashMap;

#[test]
fn viz_meta_includes_nodes_links_queue_caps_and_error_rates() {
    let mut world = NetWorld::default();
    let h0 = world.net.add_host("h0");
    let ap = world.net.add_node("ap", NodeKind::AccessPoint);

    let latency = SimTime::from_micros(2);
    let rate = DataRate::from_mbps(54);

    world.net.connect_p2p(h0, ap, latency, rate);
    world.net.set_link_queue_capacity_bytes(h0, ap, 111);
    world.net.set_link_queue_capacity_bytes(ap, h0, 222);
    world
        .net
        .set_receive_error_model(h0, ap, RateErrorModel::new(0.001, ErrorUnit::Byte));

    world.net.viz = Some(VizLogger::default());
    world.net.emit_viz_meta();

    let events = &world.net.viz.as_ref().expect("viz enabled").events;
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].t_ns, 0);

    let (nodes, links) = match &events[0].kind {
        VizEventKind::Meta { nodes, links } => (nodes, links),
        _ => panic!("expected Meta event"),
    };

    assert_eq!(nodes.len(), 2);
    assert_eq!(nodes[0].name, "h0");
    assert_eq!(nodes[0].kind, "host");
    assert_eq!(nodes[1].id, ap.0);
    assert_eq!(nodes[1].kind, "access_point");

    let by_pair = links
        .iter()
        .map(|l| ((l.from, l.to), l))
        .collect::<HashMap<_, _>>();
    let up = by_pair.get(&(h0.0, ap.0)).expect("missing h0->ap");
    assert_eq!(up.bandwidth_bps, 54_000_000);
    assert_eq!(up.latency_ns, latency.0);
    assert_eq!(up.q_cap_bytes, 111);
    assert_eq!(up.error_rate, Some(0.001));

    let down = by_pair.get(&(ap.0, h0.0)).expect("missing ap->h0");
    assert_eq!(down.q_cap_bytes, 222);
    assert_eq!(down.error_rate, None);
}

#[test]
fn viz_events_serialize_with_a_kind_tag() {
    let mut world = NetWorld::default();
    world.net.add_host("h0");
    world.net.viz = Some(VizLogger::default());
    world.net.emit_viz_meta();

    let events = &world.net.viz.as_ref().expect("viz enabled").events;
    let v = serde_json::to_value(events).expect("serialize");
    assert_eq!(v[0]["kind"], "meta");
    assert_eq!(v[0]["nodes"][0]["name"], "h0");
}
