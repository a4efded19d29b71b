//! 路由器 / 无线接入点拓扑构建
//!
//! 拓扑结构：
//!
//! ```text
//!  s0 s1 ... s(n-1)      n0(router/AP) ---- n1
//!    \  |  /              |      \
//!     (无线)  ------------+       n2
//!                         |
//!                         n3 (ISP)
//! ```
//!
//! n1、n2、n3 各自通过点到点链路连到 n0；无线终端以普通链路挂在 n0 上
//! （不模拟 WiFi 物理层/MAC）。错误模型安装在 n1 -> n0 链路的 n0 接收端。

use thiserror::Error;

use crate::net::{DataRate, ErrorUnit, NetWorld, NodeId, NodeKind, RateErrorModel};
use crate::sim::SimTime;

/// 允许的最大无线终端数
pub const MAX_WIFI_STATIONS: usize = 18;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TopoError {
    #[error("n_wifi should be {max} or less, got {requested}")]
    TooManyStations { requested: usize, max: usize },
}

/// 路由器拓扑配置选项
#[derive(Debug, Clone)]
pub struct WifiRouterOpts {
    pub n_wifi: usize,
    pub p2p_rate: DataRate,
    pub p2p_delay: SimTime,
    pub wifi_rate: DataRate,
    pub wifi_delay: SimTime,
    /// n0 接收 n1 流量时的字节错误率；0 表示不安装错误模型
    pub error_rate: f64,
}

impl Default for WifiRouterOpts {
    fn default() -> Self {
        Self {
            n_wifi: 5,
            p2p_rate: DataRate::from_mbps(5),
            p2p_delay: SimTime::from_millis(2),
            wifi_rate: DataRate::from_mbps(54),
            wifi_delay: SimTime::from_micros(1),
            error_rate: 0.000001,
        }
    }
}

#[derive(Debug, Clone)]
pub struct WifiRouter {
    /// n0：路由器兼接入点
    pub router: NodeId,
    pub pc1: NodeId,
    pub pc2: NodeId,
    pub isp: NodeId,
    pub stations: Vec<NodeId>,
}

impl WifiRouter {
    /// 全部可作为发送端的节点，按 n2、n1、各无线终端的顺序
    pub fn senders(&self) -> Vec<NodeId> {
        let mut v = vec![self.pc2, self.pc1];
        v.extend(self.stations.iter().copied());
        v
    }
}

pub fn build_wifi_router(world: &mut NetWorld, opts: &WifiRouterOpts) -> Result<WifiRouter, TopoError> {
    if opts.n_wifi > MAX_WIFI_STATIONS {
        return Err(TopoError::TooManyStations {
            requested: opts.n_wifi,
            max: MAX_WIFI_STATIONS,
        });
    }

    let net = &mut world.net;
    let router = net.add_node("n0", NodeKind::Router);
    let pc1 = net.add_host("n1");
    let pc2 = net.add_host("n2");
    let isp = net.add_host("n3");

    for pc in [pc1, pc2, isp] {
        net.connect_p2p(router, pc, opts.p2p_delay, opts.p2p_rate);
    }

    let mut stations = Vec::with_capacity(opts.n_wifi);
    for i in 0..opts.n_wifi {
        let sta = net.add_node(format!("sta{i}"), NodeKind::Station);
        net.connect_p2p(router, sta, opts.wifi_delay, opts.wifi_rate);
        stations.push(sta);
    }

    if opts.error_rate > 0.0 {
        net.set_receive_error_model(pc1, router, RateErrorModel::new(opts.error_rate, ErrorUnit::Byte));
    }

    Ok(WifiRouter {
        router,
        pc1,
        pc2,
        isp,
        stations,
    })
}
