use crate::bidirected::BidirectedGraph;
use crate::types::VertexEnd;
use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;

use VertexEnd::{Left, Right};

fn build(n: u64, edges: &[(u64, VertexEnd, u64, VertexEnd)]) -> BidirectedGraph {
    let mut g = BidirectedGraph::with_capacity(n as usize, edges.len());
    for id in 1..=n {
        g.add_vertex(id, "A".to_string());
    }
    for &(v1, e1, v2, e2) in edges {
        g.add_edge(v1, e1, v2, e2);
    }
    g.record_tips();
    g
}

/// `1+ -> 2+ -> ... -> n+`.
pub fn chain(n: u64) -> BidirectedGraph {
    let edges: Vec<_> = (1..n).map(|i| (i, Right, i + 1, Left)).collect();
    build(n, &edges)
}

/// A single bubble: `1+ -> {2+, 3+} -> 4+`.
pub fn bubble() -> BidirectedGraph {
    build(
        4,
        &[
            (1, Right, 2, Left),
            (2, Right, 4, Left),
            (1, Right, 3, Left),
            (3, Right, 4, Left),
        ],
    )
}

/// A bubble between 2 and 3 (direct edge against a detour through 5),
/// nested in a bubble between 1 and 4.
pub fn nested_bubble() -> BidirectedGraph {
    build(
        5,
        &[
            (1, Right, 2, Left),
            (2, Right, 3, Left),
            (2, Right, 5, Left),
            (5, Right, 3, Left),
            (3, Right, 4, Left),
            (1, Right, 4, Left),
        ],
    )
}

/// `1+ -> 2+ -> 2-`: the walk returns through the reverse strand of 2.
pub fn hairpin() -> BidirectedGraph {
    build(2, &[(1, Right, 2, Left), (2, Right, 2, Right)])
}

/// A repeat pass: `1+ -> 2+ -> 3+ -> 4+` with a back link `3+ -> 2+`.
pub fn tandem_repeat() -> BidirectedGraph {
    build(
        4,
        &[
            (1, Right, 2, Left),
            (2, Right, 3, Left),
            (3, Right, 2, Left),
            (3, Right, 4, Left),
        ],
    )
}

/// Two disconnected chains, `1..3` and `4..6`.
pub fn two_components() -> BidirectedGraph {
    build(
        6,
        &[
            (1, Right, 2, Left),
            (2, Right, 3, Left),
            (4, Right, 5, Left),
            (5, Right, 6, Left),
        ],
    )
}

/// Seven segments with adjacent and nested variation, including an
/// inversion-style link `4- -> 7+`; decomposes into `>1>7` over `>4>6`.
pub fn seven_segment() -> BidirectedGraph {
    build(
        7,
        &[
            (1, Right, 3, Left),
            (1, Right, 4, Left),
            (2, Right, 4, Left),
            (3, Right, 4, Left),
            (3, Left, 2, Left),
            (4, Right, 5, Left),
            (4, Right, 6, Left),
            (4, Left, 7, Left),
            (5, Right, 6, Left),
            (6, Right, 7, Left),
        ],
    )
}

/// A seeded random bidirected multigraph. Mixed-side self-loops are skipped
/// so every component has a biedged embedding.
pub fn random_bidirected(n: u64, m: usize, seed: u64) -> BidirectedGraph {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut g = BidirectedGraph::with_capacity(n as usize, m);

    for id in 1..=n {
        g.add_vertex(id, "A".to_string());
    }

    let mut added = 0;
    while added < m {
        let v1 = rng.random_range(1..=n);
        let v2 = rng.random_range(1..=n);
        let e1 = if rng.random_bool(0.5) { Left } else { Right };
        let e2 = if rng.random_bool(0.5) { Left } else { Right };
        if v1 == v2 && e1 != e2 {
            continue;
        }
        g.add_edge(v1, e1, v2, e2);
        added += 1;
    }

    g.record_tips();
    g
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builders_record_tips() {
        assert_eq!(chain(4).tips().len(), 2);
        assert_eq!(bubble().tips().len(), 2);
        assert_eq!(two_components().tips().len(), 4);
        // the hairpin has a single open end
        assert_eq!(hairpin().tips().len(), 1);
    }

    #[test]
    fn test_random_is_deterministic() {
        let a = random_bidirected(6, 9, 7);
        let b = random_bidirected(6, 9, 7);
        assert_eq!(a.edge_count(), b.edge_count());
        for e in 0..a.edge_count() {
            assert_eq!(a.edge(e), b.edge(e));
        }
    }
}
