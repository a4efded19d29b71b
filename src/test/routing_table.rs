use crate::net::{NodeId, RoutingTable};

fn build_rev_adj(adj: &[Vec<NodeId>]) -> Vec<Vec<NodeId>> {
    let mut rev = vec![Vec::new(); adj.len()];
    for (from, nbrs) in adj.iter().enumerate() {
        for &to in nbrs {
            rev[to.0].push(NodeId(from));
        }
    }
    rev
}

fn diamond() -> Vec<Vec<NodeId>> {
    // 0 -> 1 -> 3
    //  \-> 2 ->/
    vec![
        vec![NodeId(2), NodeId(1)],
        vec![NodeId(3)],
        vec![NodeId(3)],
        vec![],
    ]
}

#[test]
fn routing_table_picks_lowest_id_among_equal_cost_next_hops() {
    let adj = diamond();
    let rev_adj = build_rev_adj(&adj);

    let mut rt = RoutingTable::new();
    assert!(rt.is_dirty());
    rt.ensure_built(&adj, &rev_adj);
    assert!(!rt.is_dirty());

    assert_eq!(rt.next_hop(NodeId(0), NodeId(3)), Some(NodeId(1)));
    assert_eq!(rt.next_hop(NodeId(0), NodeId(2)), Some(NodeId(2)));
    assert_eq!(rt.next_hop(NodeId(1), NodeId(3)), Some(NodeId(3)));
    assert_eq!(rt.next_hop(NodeId(2), NodeId(3)), Some(NodeId(3)));

    assert_eq!(rt.next_hop(NodeId(3), NodeId(0)), None);
    assert_eq!(rt.next_hop(NodeId(0), NodeId(0)), None);
    assert_eq!(rt.len(), 5);
}

#[test]
fn routing_table_prefers_fewer_hops_over_lower_ids() {
    // 0 -> 1 -> 2 -> 4, 0 -> 3 -> 4
    let adj = vec![
        vec![NodeId(1), NodeId(3)],
        vec![NodeId(2)],
        vec![NodeId(4)],
        vec![NodeId(4)],
        vec![],
    ];
    let rev_adj = build_rev_adj(&adj);
    let mut rt = RoutingTable::new();
    rt.ensure_built(&adj, &rev_adj);

    assert_eq!(rt.next_hop(NodeId(0), NodeId(4)), Some(NodeId(3)));
}

#[test]
fn routing_table_requires_mark_dirty_to_rebuild() {
    let mut adj = diamond();
    let mut rev_adj = build_rev_adj(&adj);

    let mut rt = RoutingTable::new();
    rt.ensure_built(&adj, &rev_adj);
    assert_eq!(rt.next_hop(NodeId(0), NodeId(3)), Some(NodeId(1)));

    // 删除 0->1 但不标记 dirty：仍是旧结果
    adj[0] = vec![NodeId(2)];
    rev_adj = build_rev_adj(&adj);
    rt.ensure_built(&adj, &rev_adj);
    assert_eq!(rt.next_hop(NodeId(0), NodeId(3)), Some(NodeId(1)));

    rt.mark_dirty();
    rt.ensure_built(&adj, &rev_adj);
    assert_eq!(rt.next_hop(NodeId(0), NodeId(3)), Some(NodeId(2)));
    assert_eq!(rt.next_hop(NodeId(0), NodeId(1)), None);
}
