//! 拓扑构建

pub mod wifi_router;
