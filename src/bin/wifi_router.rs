//! 路由器 / WiFi 接入点场景
//!
//! n1、n2、n3 经点到点链路接到路由器 n0，若干无线终端挂在 n0 上；
//! 限速 TCP 发送端向 n3 上的 sink 发包，运行结束打印每条流的收发统计。

use clap::Parser;
use pacesim::net::DataRate;
use pacesim::scenario::{FlowSet, ScenarioConfig, ScenarioError, run_scenario};
use pacesim::sim::SimTime;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(name = "wifi-router", about = "路由器/WiFi 接入点拓扑上的限速 TCP 发送仿真")]
struct Args {
    /// 场景配置 JSON；命令行参数覆盖其中的字段
    #[arg(long)]
    config: Option<PathBuf>,

    /// single：仅 n2 -> n3；all：n2、n1 与全部无线终端 -> n3
    #[arg(long, value_enum)]
    flows: Option<FlowSet>,

    /// 无线终端个数（不超过 18）
    #[arg(long)]
    n_wifi: Option<usize>,

    /// n0 接收 n1 流量时的字节错误率
    #[arg(long)]
    error_rate: Option<f64>,

    /// 仿真时长（秒）
    #[arg(long)]
    sim_time_s: Option<f64>,

    /// 发送端目标速率，例如 100Mbps
    #[arg(long)]
    data_rate: Option<DataRate>,

    /// 每个发送端的包数
    #[arg(long)]
    packet_count: Option<u32>,

    #[arg(long)]
    seed: Option<u64>,

    /// 输出 debug 级别日志（RUST_LOG 优先）
    #[arg(long, default_value_t = false)]
    verbose: bool,

    /// 输出运行报告 JSON
    #[arg(long)]
    report_json: Option<PathBuf>,

    /// 输出数据包轨迹 JSON；不填则不记录
    #[arg(long)]
    trace_json: Option<PathBuf>,
}

impl Args {
    fn scenario(&self) -> Result<ScenarioConfig, ScenarioError> {
        let mut cfg = match &self.config {
            Some(path) => ScenarioConfig::from_json_file(path)?,
            None => ScenarioConfig::default(),
        };
        if let Some(f) = self.flows {
            cfg.flows = f;
        }
        if let Some(n) = self.n_wifi {
            cfg.n_wifi = n;
        }
        if let Some(r) = self.error_rate {
            cfg.error_rate = r;
        }
        if let Some(s) = self.sim_time_s {
            cfg.sim_time = SimTime::from_secs_f64(s);
        }
        if let Some(r) = self.data_rate {
            cfg.data_rate = r;
        }
        if let Some(n) = self.packet_count {
            cfg.packet_count = n;
        }
        if let Some(s) = self.seed {
            cfg.seed = s;
        }
        Ok(cfg)
    }
}

fn main() -> ExitCode {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_file(true)
        .with_line_number(true)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let cfg = match args.scenario() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let run = match run_scenario(&cfg, args.trace_json.is_some()) {
        Ok(run) => run,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };

    if let (Some(path), Some(trace)) = (&args.trace_json, &run.trace) {
        let written = serde_json::to_string_pretty(&trace.events)
            .map_err(|e| e.to_string())
            .and_then(|json| fs::write(path, json).map_err(|e| e.to_string()));
        if let Err(e) = written {
            eprintln!("write {}: {e}", path.display());
            return ExitCode::FAILURE;
        }
        eprintln!("wrote trace events to {}", path.display());
    }

    if let Some(path) = &args.report_json {
        let written = serde_json::to_string_pretty(&run.report)
            .map_err(|e| e.to_string())
            .and_then(|json| fs::write(path, json).map_err(|e| e.to_string()));
        if let Err(e) = written {
            eprintln!("write {}: {e}", path.display());
            return ExitCode::FAILURE;
        }
    }

    let r = &run.report;
    for f in &r.flows {
        println!(
            "flow {} -> n3:{}  sent_pkts={} accepted_bytes={} rx_bytes={} goodput_mbps={:.3} retrans={} timeouts={}",
            f.src_name,
            f.sink_port,
            f.packets_sent,
            f.bytes_accepted,
            f.bytes_received,
            f.goodput_bps / 1e6,
            f.retransmits,
            f.timeouts,
        );
    }
    println!(
        "done @ {}\n  net: delivered_pkts={}, dropped_pkts={}, corrupted_pkts={}, unroutable_pkts={}, app_errors={}",
        SimTime(r.sim_time_ns),
        r.net.delivered_pkts,
        r.net.dropped_pkts,
        r.net.corrupted_pkts,
        r.net.unroutable_pkts,
        r.app_errors.len()
    );
    ExitCode::SUCCESS
}
