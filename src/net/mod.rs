//! 网络模拟模块
//!
//! 此模块包含网络模拟的核心组件，如节点、链路、数据包和网络拓扑。

// 子模块声明
mod id;
mod data_rate;
mod packet;
mod transport;
mod node;
mod link;
mod error_model;
mod stats;
mod network;
mod network_viz;
mod network_proto;
mod link_events;
mod net_world;
mod routing;

// 重新导出公共接口
pub use id::{NodeId, LinkId};
pub use data_rate::DataRate;
pub use packet::Packet;
pub use transport::{TcpSegment, Transport};
pub use node::{Node, NodeKind};
pub use link::{DEFAULT_LINK_QUEUE_PKTS, Link};
pub use error_model::{ErrorUnit, RateErrorModel};
pub use stats::Stats;
pub use network::{DEFAULT_SEED, Network};
pub use link_events::{DeliverPacket, LinkReady};
pub use net_world::{AppFailure, NetWorld};
pub use routing::RoutingTable;
