//! Router / access-point scenarios.
//!
//! `single`: one rate-paced sender on n2 towards a sink on n3.
//! `all`: n2, n1 and every WiFi station each send to their own sink port on n3.
//!
//! A scenario is described by [`ScenarioConfig`] (JSON, every field
//! defaulted) and executed by [`run_scenario`], which returns a serializable
//! [`ScenarioReport`] and, on request, the packet trace.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::app::{AppId, PacketSink, RateLimitedSender};
use crate::net::{DataRate, NetWorld, NodeId, Stats};
use crate::proto::{SockAddr, SocketId, TcpConfig, TcpState};
use crate::sim::{SimTime, Simulator};
use crate::topo::wifi_router::{TopoError, WifiRouter, WifiRouterOpts, build_wifi_router};
use crate::viz::VizLogger;

#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error(transparent)]
    Topology(#[from] TopoError),
    #[error("read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parse scenario config: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid scenario: {0}")]
    Invalid(String),
}

/// Which senders are installed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum FlowSet {
    /// n2 -> n3
    #[default]
    Single,
    /// n2, n1 and every station -> n3, one sink port each
    All,
}

/// Optional TCP parameter overrides; unset fields keep the stack defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TcpOverrides {
    pub mss: Option<u32>,
    pub init_cwnd_pkts: Option<u64>,
    pub snd_buf_bytes: Option<u64>,
    pub init_rto: Option<SimTime>,
    pub min_rto: Option<SimTime>,
    pub max_rto: Option<SimTime>,
}

impl TcpOverrides {
    pub fn apply(&self, cfg: &mut TcpConfig) {
        if let Some(mss) = self.mss {
            cfg.mss = mss;
            cfg.init_cwnd_bytes = (mss as u64).saturating_mul(10);
            cfg.init_ssthresh_bytes = (mss as u64).saturating_mul(1_000);
        }
        if let Some(pkts) = self.init_cwnd_pkts {
            cfg.init_cwnd_bytes = pkts.max(1).saturating_mul(cfg.mss as u64);
        }
        if let Some(b) = self.snd_buf_bytes {
            cfg.snd_buf_bytes = b;
        }
        if let Some(t) = self.init_rto {
            cfg.init_rto = t;
        }
        if let Some(t) = self.min_rto {
            cfg.min_rto = t;
        }
        if let Some(t) = self.max_rto {
            cfg.max_rto = t;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScenarioConfig {
    pub flows: FlowSet,
    pub n_wifi: usize,
    /// Per-byte error rate on n0's receive side of the n0-n1 link.
    pub error_rate: f64,
    pub sim_time: SimTime,
    pub app_start: SimTime,
    pub packet_size: u32,
    pub packet_count: u32,
    pub data_rate: DataRate,
    /// Sink ports are `sink_base_port + flow index`.
    pub sink_base_port: u16,
    pub p2p_rate: DataRate,
    pub p2p_delay: SimTime,
    pub wifi_rate: DataRate,
    pub wifi_delay: SimTime,
    pub seed: u64,
    pub tcp: TcpOverrides,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        let topo = WifiRouterOpts::default();
        Self {
            flows: FlowSet::Single,
            n_wifi: topo.n_wifi,
            error_rate: topo.error_rate,
            sim_time: SimTime::from_secs(5),
            app_start: SimTime::from_secs(1),
            packet_size: 1460,
            packet_count: 1_000_000,
            data_rate: DataRate::from_mbps(100),
            sink_base_port: 8080,
            p2p_rate: topo.p2p_rate,
            p2p_delay: topo.p2p_delay,
            wifi_rate: topo.wifi_rate,
            wifi_delay: topo.wifi_delay,
            seed: crate::net::DEFAULT_SEED,
            tcp: TcpOverrides::default(),
        }
    }
}

impl ScenarioConfig {
    pub fn from_json_file(path: &Path) -> Result<Self, ScenarioError> {
        let raw = fs::read_to_string(path).map_err(|source| ScenarioError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_str(&raw)?)
    }

    fn topo_opts(&self) -> WifiRouterOpts {
        WifiRouterOpts {
            n_wifi: self.n_wifi,
            p2p_rate: self.p2p_rate,
            p2p_delay: self.p2p_delay,
            wifi_rate: self.wifi_rate,
            wifi_delay: self.wifi_delay,
            error_rate: self.error_rate,
        }
    }

    fn validate(&self) -> Result<(), ScenarioError> {
        if self.packet_size == 0 {
            return Err(ScenarioError::Invalid("packet_size must be positive".into()));
        }
        if self.app_start > self.sim_time {
            return Err(ScenarioError::Invalid(format!(
                "app_start {} is after sim_time {}",
                self.app_start, self.sim_time
            )));
        }
        Ok(())
    }
}

/// One sender/sink pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowPlan {
    pub src: NodeId,
    pub sink_port: u16,
}

/// Sender nodes and sink ports for the chosen flow set.
pub fn plan_flows(flows: FlowSet, topo: &WifiRouter, base_port: u16) -> Vec<FlowPlan> {
    let srcs = match flows {
        FlowSet::Single => vec![topo.pc2],
        FlowSet::All => topo.senders(),
    };
    srcs.into_iter()
        .enumerate()
        .map(|(i, src)| FlowPlan {
            src,
            sink_port: base_port.saturating_add(i as u16),
        })
        .collect()
}

#[derive(Debug, Clone, Serialize)]
pub struct FlowReport {
    pub src: usize,
    pub src_name: String,
    pub sink_port: u16,
    pub packets_sent: u32,
    /// Bytes the sender's socket accepted into its send buffer.
    pub bytes_accepted: u64,
    /// In-order bytes counted by the sink.
    pub bytes_received: u64,
    /// `bytes_received * 8` over the active period, bit/s.
    pub goodput_bps: f64,
    pub retransmits: u64,
    pub timeouts: u64,
    pub tcp_state: Option<TcpState>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AppErrorReport {
    pub app: usize,
    pub at_ns: u64,
    pub error: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScenarioReport {
    pub flows: Vec<FlowReport>,
    pub sim_time_ns: u64,
    pub app_start_ns: u64,
    pub events_executed: u64,
    pub net: Stats,
    pub app_errors: Vec<AppErrorReport>,
}

impl ScenarioReport {
    pub fn total_bytes_received(&self) -> u64 {
        self.flows.iter().map(|f| f.bytes_received).sum()
    }
}

#[derive(Debug)]
pub struct ScenarioRun {
    pub report: ScenarioReport,
    /// Packet trace, only when tracing was requested.
    pub trace: Option<VizLogger>,
}

struct InstalledFlow {
    plan: FlowPlan,
    sink: AppId,
    sender: AppId,
    peer: SockAddr,
}

/// Build the topology, install sinks and senders, run until `sim_time`.
#[tracing::instrument(skip(cfg), fields(flows = ?cfg.flows, n_wifi = cfg.n_wifi))]
pub fn run_scenario(cfg: &ScenarioConfig, trace: bool) -> Result<ScenarioRun, ScenarioError> {
    cfg.validate()?;

    let mut sim = Simulator::default();
    let mut world = NetWorld::default();
    world.net.reseed(cfg.seed);
    cfg.tcp.apply(&mut world.net.tcp.cfg);

    let topo = build_wifi_router(&mut world, &cfg.topo_opts())?;
    world.net.populate_routing_tables();

    if trace {
        world.net.viz = Some(VizLogger::default());
        world.net.emit_viz_meta();
    }

    let mut installed = Vec::new();
    for plan in plan_flows(cfg.flows, &topo, cfg.sink_base_port) {
        let sink_sock: SocketId = world.net.tcp.create_socket(topo.isp);
        let sink = world.install_app(PacketSink::new(
            format!("sink:{}", plan.sink_port),
            sink_sock,
            plan.sink_port,
        ));
        world.start_app(&mut sim, sink, SimTime::ZERO);
        world.stop_app(&mut sim, sink, cfg.sim_time);

        let peer = SockAddr::new(topo.isp, plan.sink_port);
        let sock = world.net.tcp.create_socket(plan.src);
        let mut app = RateLimitedSender::new(format!("sender:n{}", plan.src.0));
        app.configure(sock, peer, cfg.packet_size, cfg.packet_count, cfg.data_rate);
        let sender = world.install_app(app);
        world.start_app(&mut sim, sender, cfg.app_start);
        world.stop_app(&mut sim, sender, cfg.sim_time);

        installed.push(InstalledFlow {
            plan,
            sink,
            sender,
            peer,
        });
    }

    info!(flows = installed.len(), until = %cfg.sim_time, "running scenario");
    sim.run_until(cfg.sim_time, &mut world);

    let active_s = cfg.sim_time.saturating_sub(cfg.app_start).as_secs_f64();
    let flows = installed
        .iter()
        .map(|f| {
            let sender = world.app_as::<RateLimitedSender>(f.sender);
            let bytes_received = world
                .app_as::<PacketSink>(f.sink)
                .map(|s| s.total_rx(&world.net.tcp))
                .unwrap_or(0);
            let conn = world.net.tcp.conns().find(|c| c.peer == f.peer);
            FlowReport {
                src: f.plan.src.0,
                src_name: world
                    .net
                    .node(f.plan.src)
                    .map(|n| n.name().to_string())
                    .unwrap_or_default(),
                sink_port: f.plan.sink_port,
                packets_sent: sender.map(|s| s.packets_sent()).unwrap_or(0),
                bytes_accepted: sender.map(|s| s.bytes_accepted()).unwrap_or(0),
                bytes_received,
                goodput_bps: if active_s > 0.0 {
                    bytes_received as f64 * 8.0 / active_s
                } else {
                    0.0
                },
                retransmits: conn.map(|c| c.retransmits()).unwrap_or(0),
                timeouts: conn.map(|c| c.timeouts()).unwrap_or(0),
                tcp_state: conn.map(|c| c.state()),
            }
        })
        .collect::<Vec<_>>();

    for f in &flows {
        info!(
            src = %f.src_name,
            port = f.sink_port,
            sent = f.packets_sent,
            rx_bytes = f.bytes_received,
            goodput_mbps = f.goodput_bps / 1e6,
            "flow finished"
        );
    }

    let report = ScenarioReport {
        flows,
        sim_time_ns: cfg.sim_time.as_nanos(),
        app_start_ns: cfg.app_start.as_nanos(),
        events_executed: sim.executed_events(),
        net: world.net.stats.clone(),
        app_errors: world
            .app_errors
            .iter()
            .map(|e| AppErrorReport {
                app: e.app.0,
                at_ns: e.at.as_nanos(),
                error: e.error.to_string(),
            })
            .collect(),
    };

    Ok(ScenarioRun {
        report,
        trace: world.net.viz.take(),
    })
}
