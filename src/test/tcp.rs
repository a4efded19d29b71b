use crate::app::{AppError, PacketSink, RateLimitedSender};
use crate::net::{DataRate, ErrorUnit, NetWorld, NodeId, NodeKind, RateErrorModel};
use crate::proto::{Payload, SockAddr, SocketError, SocketState, TcpState};
use crate::sim::{SimTime, Simulator};

/// h0 -- r -- h1，两段链路相同
fn line(rate: DataRate, latency: SimTime) -> (NetWorld, NodeId, NodeId, NodeId) {
    let mut world = NetWorld::default();
    let h0 = world.net.add_host("h0");
    let r = world.net.add_node("r", NodeKind::Router);
    let h1 = world.net.add_host("h1");
    world.net.connect_p2p(h0, r, latency, rate);
    world.net.connect_p2p(r, h1, latency, rate);
    (world, h0, r, h1)
}

#[test]
fn paced_sender_stream_arrives_complete_over_a_lossy_link() {
    let (mut world, h0, r, h1) = line(DataRate::from_mbps(10), SimTime::from_millis(1));
    world.net.reseed(3);
    world
        .net
        .set_receive_error_model(h0, r, RateErrorModel::new(0.05, ErrorUnit::Packet));

    let mut sim = Simulator::default();
    let end = SimTime::from_secs(10);

    let sink_sock = world.net.tcp.create_socket(h1);
    let sink = world.install_app(PacketSink::new("sink", sink_sock, 9000));
    world.start_app(&mut sim, sink, SimTime::ZERO);
    world.stop_app(&mut sim, sink, end);

    let sock = world.net.tcp.create_socket(h0);
    let mut app = RateLimitedSender::new("sender");
    app.configure(sock, SockAddr::new(h1, 9000), 1000, 200, DataRate::from_mbps(1));
    let sender = world.install_app(app);
    world.start_app(&mut sim, sender, SimTime::from_millis(1));
    world.stop_app(&mut sim, sender, end);

    sim.run_until(end, &mut world);

    assert!(world.app_errors.is_empty(), "{:?}", world.app_errors);
    let s = world.app_as::<RateLimitedSender>(sender).expect("sender");
    assert_eq!(s.packets_sent(), 200);
    assert_eq!(s.bytes_accepted(), 200_000);
    assert_eq!(s.config().map(|c| c.packet_count), Some(200));
    assert_eq!(world.app_count(), 2);

    let sink_app = world.app_as::<PacketSink>(sink).expect("sink");
    assert_eq!(sink_app.port(), 9000);
    assert_eq!(sink_app.local(), Some(SockAddr::new(h1, 9000)));
    assert!(!sink_app.is_listening());
    let received = sink_app.total_rx(&world.net.tcp);
    assert_eq!(received, 200_000);
    assert_eq!(world.net.tcp.rx_bytes(SockAddr::new(h1, 9000)), 200_000);

    assert!(world.net.stats.corrupted_pkts > 0);
    let conn = world.net.tcp.conns().next().expect("connection");
    assert_eq!(conn.bytes_acked(), 200_000);
    assert_eq!(conn.bytes_written(), 200_000);
    assert!(conn.retransmits() + conn.timeouts() > 0);
    assert_eq!(conn.state(), TcpState::Closed);
}

#[test]
fn connecting_to_a_port_without_listener_is_refused() {
    let (mut world, h0, _r, h1) = line(DataRate::from_mbps(10), SimTime::from_micros(100));
    let mut sim = Simulator::default();

    let sock = world.net.tcp.create_socket(h0);
    let mut app = RateLimitedSender::new("sender");
    app.configure(sock, SockAddr::new(h1, 1234), 1000, 100, DataRate::from_mbps(1));
    let sender = world.install_app(app);
    world.start_app(&mut sim, sender, SimTime::ZERO);
    sim.run_until(SimTime::from_secs(1), &mut world);

    // 第一个包写进了缓冲区；RST 到达后下一次发送失败，循环终止
    let s = world.app_as::<RateLimitedSender>(sender).expect("sender");
    assert_eq!(s.packets_sent(), 1);
    assert_eq!(s.pending_event(), None);
    assert_eq!(world.app_errors.len(), 1);
    assert_eq!(
        world.app_errors[0].error,
        AppError::Socket(SocketError::ConnectionRefused(SockAddr::new(h1, 1234)))
    );
    let conn = world.net.tcp.conns().next().expect("connection");
    assert_eq!(conn.state(), TcpState::Refused);
}

#[test]
fn full_send_buffer_rejects_whole_payloads() {
    let mut world = NetWorld::default();
    let h0 = world.net.add_host("h0");
    let far = world.net.add_host("far");
    let mut sim = Simulator::default();

    let sock = world.net.tcp.create_socket(h0);
    world.net.tcp.bind(sock).expect("bind");
    world
        .net
        .with_tcp(|tcp, net| tcp.connect(sock, SockAddr::new(far, 80), &mut sim, net))
        .expect("connect");

    let cap = world.net.tcp.cfg.snd_buf_bytes;
    let accepted: Vec<u32> = (0..100)
        .map(|_| {
            world
                .net
                .with_tcp(|tcp, net| tcp.send(sock, Payload::with_size(1460), &mut sim, net))
                .expect("send")
        })
        .collect();
    // 128KiB 放得下 89 个 1460B 载荷，第 90 个只剩 1132B 空间，整体拒绝
    let fits = (cap / 1460) as usize;
    assert_eq!(fits, 89);
    assert!(accepted[..fits].iter().all(|&a| a == 1460));
    assert!(accepted[fits..].iter().all(|&a| a == 0));
    let total: u64 = accepted.iter().map(|&a| a as u64).sum();
    assert_eq!(total, 89 * 1460);

    // 小载荷仍放得下剩余空间
    let small = world
        .net
        .with_tcp(|tcp, net| tcp.send(sock, Payload::with_size(1132), &mut sim, net))
        .expect("send");
    assert_eq!(small, 1132);
    let full = world
        .net
        .with_tcp(|tcp, net| tcp.send(sock, Payload::with_size(1), &mut sim, net))
        .expect("send");
    assert_eq!(full, 0);
    // 没有路由，SYN 未能发出
    assert!(world.net.stats.unroutable_pkts > 0);
}

#[test]
fn socket_api_reports_lifecycle_errors() {
    let mut world = NetWorld::default();
    let h0 = world.net.add_host("h0");
    let h1 = world.net.add_host("h1");
    world
        .net
        .connect_p2p(h0, h1, SimTime::from_micros(1), DataRate::from_gbps(1));
    let mut sim = Simulator::default();
    let tcp = &mut world.net.tcp;

    let a = tcp.create_socket(h1);
    assert_eq!(tcp.listen(a), Err(SocketError::NotBound));
    let addr = tcp.bind_port(a, 80).expect("bind");
    assert_eq!(addr, SockAddr::new(h1, 80));
    assert_eq!(tcp.bind(a), Err(SocketError::AlreadyBound));
    tcp.listen(a).expect("listen");
    assert_eq!(tcp.socket_state(a), Some(SocketState::Listening(addr)));

    let b = tcp.create_socket(h1);
    assert_eq!(tcp.bind_port(b, 80), Err(SocketError::AddrInUse(addr)));

    let c = tcp.create_socket(h0);
    let local = tcp.bind(c).expect("ephemeral bind");
    assert_eq!(local.node, h0);
    assert!(local.port >= crate::proto::tcp::EPHEMERAL_PORT_BASE);

    tcp.close(a, &mut sim).expect("close");
    assert_eq!(tcp.close(a, &mut sim), Err(SocketError::Closed));
    assert_eq!(tcp.listen(a), Err(SocketError::Closed));
    // 关闭后端口可以重新绑定
    assert_eq!(tcp.bind_port(b, 80), Ok(addr));

    let unknown = crate::proto::SocketId(99);
    assert_eq!(tcp.bind(unknown), Err(SocketError::UnknownSocket(unknown)));

    let d = world.net.tcp.create_socket(h0);
    world.net.tcp.bind(d).expect("bind");
    let err = world
        .net
        .with_tcp(|tcp, net| tcp.send(d, Payload::with_size(10), &mut sim, net));
    assert_eq!(err, Err(SocketError::NotConnected));
}

#[test]
fn retransmission_timer_recovers_from_tail_loss() {
    let (mut world, h0, r, h1) = line(DataRate::from_gbps(1), SimTime::from_micros(1));
    world.net.tcp.cfg.mss = 100;
    world.net.tcp.cfg.init_cwnd_bytes = 1_000;
    world.net.tcp.cfg.init_rto = SimTime::from_micros(50);
    world.net.tcp.cfg.min_rto = SimTime::from_micros(50);
    world.net.tcp.cfg.max_rto = SimTime::from_millis(1);
    // 出口队列只能容纳一个数据段：一次写入 3 段时最后一段被丢弃
    world.net.set_link_queue_capacity_bytes(h0, r, 140);
    let mut sim = Simulator::default();

    let l = world.net.tcp.create_socket(h1);
    world.net.tcp.bind_port(l, 7).expect("bind");
    world.net.tcp.listen(l).expect("listen");

    let s = world.net.tcp.create_socket(h0);
    world.net.tcp.bind(s).expect("bind");
    world
        .net
        .with_tcp(|tcp, net| tcp.connect(s, SockAddr::new(h1, 7), &mut sim, net))
        .expect("connect");
    sim.run_until(SimTime::from_micros(20), &mut world);
    let accepted = world
        .net
        .with_tcp(|tcp, net| tcp.send(s, Payload::with_size(300), &mut sim, net))
        .expect("send");
    assert_eq!(accepted, 300);

    sim.run_until(SimTime::from_millis(50), &mut world);

    assert!(world.net.stats.dropped_pkts > 0);
    assert_eq!(world.net.tcp.rx_bytes(SockAddr::new(h1, 7)), 300);
    let conn = world.net.tcp.conns().next().expect("connection");
    assert_eq!(conn.bytes_acked(), 300);
    assert!(conn.timeouts() > 0);
    assert!(conn.cwnd_bytes() >= 100);
    assert!(conn.rto() >= SimTime::from_micros(50) && conn.rto() <= SimTime::from_millis(1));
}
