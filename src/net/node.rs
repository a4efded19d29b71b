//! 节点类型
//!
//! 节点只负责按路由表转发或在目的地交付，差异仅体现在类型标签上。

use super::id::NodeId;
use serde::Serialize;

/// 节点类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// 有线终端
    Host,
    /// 有线路由器（同时可兼任 AP）
    Router,
    /// 无线接入点
    AccessPoint,
    /// 无线终端
    Station,
}

/// 网络节点
#[derive(Debug, Clone)]
pub struct Node {
    id: NodeId,
    name: String,
    kind: NodeKind,
}

impl Node {
    pub fn new(id: NodeId, name: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            id,
            name: name.into(),
            kind,
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }
}
