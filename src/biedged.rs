use crate::bidirected::BidirectedGraph;
use crate::decompose::DecomposeError;
use crate::types::{EdgeColor, SideTag, UnGraph, VertexEnd};

/// A vertex of the biedged graph: the left or right side of a sequence
/// vertex, or the single dummy root.
#[derive(Clone, Debug)]
pub struct BiedgedVertex {
    seg_id: u64,
    tag: SideTag,
    black_edge: Option<usize>,
    gray_edges: Vec<usize>,
}

impl BiedgedVertex {
    pub fn seg_id(&self) -> u64 {
        self.seg_id
    }

    pub fn tag(&self) -> SideTag {
        self.tag
    }

    pub fn black_edge(&self) -> Option<usize> {
        self.black_edge
    }

    pub fn gray_edges(&self) -> &[usize] {
        &self.gray_edges
    }

    pub fn is_dummy(&self) -> bool {
        self.tag == SideTag::Dummy
    }
}

/// A black (sequence) or gray (adjacency) edge between two biedged vertices.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct BiedgedEdge {
    v1: usize,
    v2: usize,
    color: EdgeColor,
}

impl BiedgedEdge {
    pub fn v1(&self) -> usize {
        self.v1
    }

    pub fn v2(&self) -> usize {
        self.v2
    }

    pub fn color(&self) -> EdgeColor {
        self.color
    }

    pub fn other(&self, v_idx: usize) -> usize {
        if v_idx == self.v1 { self.v2 } else { self.v1 }
    }
}

/// The biedged rendition of one graph component.
///
/// Every sequence vertex is split into two side-vertices joined by a black
/// edge; adjacencies become gray edges. The dummy root (index 0) is wired by
/// a gray edge to every side with no adjacency, so the component is
/// single-entry/single-exit even when the bidirected graph has tips.
#[derive(Clone, Debug)]
pub struct BiedgedGraph {
    vertices: Vec<BiedgedVertex>,
    edges: Vec<BiedgedEdge>,
    tip_count: usize,
}

/// Index of the dummy root.
pub const DUMMY_IDX: usize = 0;

impl BiedgedGraph {
    /// Biedged index of the left side of the bidirected vertex at `v_idx`.
    pub fn left_of(v_idx: usize) -> usize {
        2 * v_idx + 1
    }

    /// Biedged index of the right side of the bidirected vertex at `v_idx`.
    pub fn right_of(v_idx: usize) -> usize {
        2 * v_idx + 2
    }

    /// The side-vertex paired with `b_idx` by a black edge.
    pub fn paired_side(b_idx: usize) -> usize {
        debug_assert!(b_idx != DUMMY_IDX);
        if b_idx % 2 == 1 { b_idx + 1 } else { b_idx - 1 }
    }

    /// Bidirected vertex index a side-vertex belongs to.
    pub fn seq_of(b_idx: usize) -> usize {
        debug_assert!(b_idx != DUMMY_IDX);
        (b_idx - 1) / 2
    }

    /// Builds the biedged graph of `g`.
    ///
    /// A mixed-side self-loop `(v,l)--(v,r)` has no biedged embedding and is
    /// rejected with [`DecomposeError::UnsupportedSelfLoop`].
    pub fn from_bidirected(g: &BidirectedGraph) -> Result<Self, DecomposeError> {
        let n = g.vtx_count();
        let mut bg = Self {
            vertices: Vec::with_capacity(2 * n + 1),
            edges: Vec::new(),
            tip_count: 0,
        };

        bg.vertices.push(BiedgedVertex {
            seg_id: u64::MAX,
            tag: SideTag::Dummy,
            black_edge: None,
            gray_edges: Vec::new(),
        });

        for v_idx in 0..n {
            let seg_id = g.v_idx_to_id(v_idx);
            bg.vertices.push(BiedgedVertex {
                seg_id,
                tag: SideTag::Left,
                black_edge: None,
                gray_edges: Vec::new(),
            });
            bg.vertices.push(BiedgedVertex {
                seg_id,
                tag: SideTag::Right,
                black_edge: None,
                gray_edges: Vec::new(),
            });
            bg.add_edge(Self::left_of(v_idx), Self::right_of(v_idx), EdgeColor::Black);
        }

        for e_idx in 0..g.edge_count() {
            let e = g.edge(e_idx);
            if e.is_mixed_self_loop() {
                let (v_idx, _) = e.v1();
                return Err(DecomposeError::UnsupportedSelfLoop {
                    segment: g.v_idx_to_id(v_idx),
                });
            }
            let (v1, end1) = e.v1();
            let (v2, end2) = e.v2();
            bg.add_edge(Self::side(v1, end1), Self::side(v2, end2), EdgeColor::Gray);
        }

        // wire every adjacency-free side to the dummy root
        for b_idx in 1..bg.vertices.len() {
            if bg.vertices[b_idx].gray_edges.is_empty() {
                bg.add_edge(DUMMY_IDX, b_idx, EdgeColor::Gray);
                bg.tip_count += 1;
            }
        }

        Ok(bg)
    }

    fn side(v_idx: usize, end: VertexEnd) -> usize {
        match end {
            VertexEnd::Left => Self::left_of(v_idx),
            VertexEnd::Right => Self::right_of(v_idx),
        }
    }

    fn add_edge(&mut self, v1: usize, v2: usize, color: EdgeColor) -> usize {
        let e_idx = self.edges.len();
        self.edges.push(BiedgedEdge { v1, v2, color });
        match color {
            EdgeColor::Black => {
                self.vertices[v1].black_edge = Some(e_idx);
                self.vertices[v2].black_edge = Some(e_idx);
            }
            EdgeColor::Gray => {
                self.vertices[v1].gray_edges.push(e_idx);
                if v1 != v2 {
                    self.vertices[v2].gray_edges.push(e_idx);
                }
            }
        }
        e_idx
    }

    pub fn vtx_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn vertex(&self, b_idx: usize) -> &BiedgedVertex {
        &self.vertices[b_idx]
    }

    pub fn edge(&self, e_idx: usize) -> &BiedgedEdge {
        &self.edges[e_idx]
    }

    /// Whether the underlying component had any tip side.
    pub fn has_tips(&self) -> bool {
        self.tip_count > 0
    }

    /// A petgraph view of the biedged graph, for DOT output and interop.
    ///
    /// Node labels are `<id>+` / `<id>-` for side-vertices and `d` for the
    /// dummy root.
    pub fn to_petgraph(&self) -> UnGraph {
        use petgraph::graph::NodeIndex;

        let mut graph = UnGraph::new_undirected();
        for v in &self.vertices {
            let label = match v.tag {
                SideTag::Dummy => "d".to_string(),
                SideTag::Left => format!("{}+", v.seg_id),
                SideTag::Right => format!("{}-", v.seg_id),
            };
            graph.add_node(label);
        }
        for e in &self.edges {
            graph.add_edge(NodeIndex::new(e.v1), NodeIndex::new(e.v2), e.color);
        }
        graph
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::graphs;
    use crate::types::VertexEnd;

    #[test]
    fn test_biedging_bijection() {
        let g = graphs::bubble();
        let bg = BiedgedGraph::from_bidirected(&g).unwrap();

        assert_eq!(bg.vtx_count(), 2 * g.vtx_count() + 1);

        // two side-vertices with matching id and opposite tags per sequence
        // vertex, joined by exactly one black edge
        let mut black = 0;
        for v_idx in 0..g.vtx_count() {
            let l = bg.vertex(BiedgedGraph::left_of(v_idx));
            let r = bg.vertex(BiedgedGraph::right_of(v_idx));
            assert_eq!(l.seg_id(), r.seg_id());
            assert_eq!(l.tag(), SideTag::Left);
            assert_eq!(r.tag(), SideTag::Right);
            assert_eq!(l.black_edge(), r.black_edge());
            black += 1;
        }
        assert_eq!(black, g.vtx_count());
    }

    #[test]
    fn test_tips_wired_to_dummy() {
        let g = graphs::bubble();
        let bg = BiedgedGraph::from_bidirected(&g).unwrap();

        for (end, v_id) in g.tips() {
            let v_idx = g.v_id_to_idx(*v_id).unwrap();
            let b_idx = match end {
                VertexEnd::Left => BiedgedGraph::left_of(v_idx),
                VertexEnd::Right => BiedgedGraph::right_of(v_idx),
            };
            let grays = bg.vertex(b_idx).gray_edges();
            assert_eq!(grays.len(), 1);
            assert_eq!(bg.edge(grays[0]).other(b_idx), DUMMY_IDX);
        }
        assert!(bg.has_tips());
    }

    #[test]
    fn test_mixed_self_loop_rejected() {
        let mut g = crate::bidirected::BidirectedGraph::new();
        g.add_vertex(1, "A".into());
        g.add_edge(1, VertexEnd::Left, 1, VertexEnd::Right);
        g.record_tips();

        let err = BiedgedGraph::from_bidirected(&g).unwrap_err();
        assert!(matches!(
            err,
            crate::decompose::DecomposeError::UnsupportedSelfLoop { segment: 1 }
        ));
    }

    #[test]
    fn test_same_side_self_loop_kept() {
        let g = graphs::hairpin();
        let bg = BiedgedGraph::from_bidirected(&g).unwrap();

        // the (2,r)--(2,r) loop is a gray edge from the side back to itself
        let r2 = BiedgedGraph::right_of(g.v_id_to_idx(2).unwrap());
        let loops = bg
            .vertex(r2)
            .gray_edges()
            .iter()
            .filter(|&&e| bg.edge(e).v1() == bg.edge(e).v2())
            .count();
        assert_eq!(loops, 1);
    }

    #[test]
    fn test_petgraph_view() {
        let g = graphs::chain(2);
        let bg = BiedgedGraph::from_bidirected(&g).unwrap();
        let pg = bg.to_petgraph();
        assert_eq!(pg.node_count(), bg.vtx_count());
        assert_eq!(pg.edge_count(), bg.edge_count());
    }
}
