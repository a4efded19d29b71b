//! 全局路由表
//!
//! 按最短跳数为每个 (from, dst) 预计算下一跳。存在多条等价路径时
//! 取编号最小的邻居，保证同一拓扑上每次运行的路径一致。
//! 拓扑变化后需 `mark_dirty`，下一次查询前重建。

use std::collections::{HashMap, VecDeque};

use super::id::NodeId;

#[derive(Debug, Clone)]
pub struct RoutingTable {
    dirty: bool,
    /// (from, dst) -> 下一跳
    next_hop: HashMap<(NodeId, NodeId), NodeId>,
}

impl Default for RoutingTable {
    fn default() -> Self {
        Self {
            dirty: true,
            next_hop: HashMap::new(),
        }
    }
}

impl RoutingTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// 确保路由表基于当前拓扑是最新的。
    ///
    /// `adj[from]` 为从 `from` 出发的所有出边邻居；
    /// `rev_adj[to]` 为所有能到达 `to` 的前驱节点集合。
    pub fn ensure_built(&mut self, adj: &[Vec<NodeId>], rev_adj: &[Vec<NodeId>]) {
        if !self.dirty {
            return;
        }

        let n = adj.len();
        self.next_hop.clear();

        // 对每个 dst 在反向图上做 BFS，得到到 dst 的最短跳数距离 dist[*]。
        // 然后对每个 from，在满足 dist[next] = dist[from] - 1 的邻居中取编号最小者。
        let mut dist: Vec<u32> = vec![u32::MAX; n];
        let mut q: VecDeque<NodeId> = VecDeque::new();

        for dst_idx in 0..n {
            dist.fill(u32::MAX);
            q.clear();

            let dst = NodeId(dst_idx);
            dist[dst_idx] = 0;
            q.push_back(dst);

            while let Some(v) = q.pop_front() {
                let dv = dist[v.0];
                for &pred in &rev_adj[v.0] {
                    if dist[pred.0] == u32::MAX {
                        dist[pred.0] = dv.saturating_add(1);
                        q.push_back(pred);
                    }
                }
            }

            for from_idx in 0..n {
                let from = NodeId(from_idx);
                let df = dist[from_idx];
                if from == dst || df == u32::MAX {
                    continue;
                }
                let best = adj[from_idx]
                    .iter()
                    .copied()
                    .filter(|nh| dist[nh.0] == df - 1)
                    .min();
                if let Some(nh) = best {
                    self.next_hop.insert((from, dst), nh);
                }
            }
        }

        self.dirty = false;
    }

    /// 获取 (from, dst) 的下一跳；不可达或 from == dst 时返回 None。
    pub fn next_hop(&self, from: NodeId, dst: NodeId) -> Option<NodeId> {
        self.next_hop.get(&(from, dst)).copied()
    }

    /// 已知路由条目数
    pub fn len(&self) -> usize {
        self.next_hop.len()
    }

    pub fn is_empty(&self) -> bool {
        self.next_hop.is_empty()
    }
}
