use crate::biedged::{BiedgedGraph, DUMMY_IDX};
use crate::types::{EdgeColor, SideTag};
use fixedbitset::FixedBitSet;
use hashbrown::{HashMap, HashSet};

/// Type of a back edge in the spanning tree.
///
/// `Capping` and `Simplifying` edges are synthesised during classification;
/// a back edge's type is assigned at creation and never changes. Capping
/// back edges are never classified.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum BackEdgeType {
    Normal,
    Capping,
    Simplifying,
}

/// A tree edge from parent to child.
#[derive(Clone, Debug)]
pub struct TreeEdge {
    id: usize,
    parent: usize,
    child: usize,
    color: EdgeColor,
    class: usize,
}

impl TreeEdge {
    pub fn id(&self) -> usize {
        self.id
    }

    pub fn parent(&self) -> usize {
        self.parent
    }

    pub fn child(&self) -> usize {
        self.child
    }

    pub fn color(&self) -> EdgeColor {
        self.color
    }

    pub fn class(&self) -> usize {
        self.class
    }

    pub fn is_classified(&self) -> bool {
        self.class != usize::MAX
    }

    pub fn set_class(&mut self, c: usize) {
        self.class = c;
    }
}

/// An edge from a vertex to a strict ancestor.
#[derive(Clone, Debug)]
pub struct BackEdge {
    id: usize,
    src: usize,
    tgt: usize,
    ty: BackEdgeType,
    color: EdgeColor,
    class: usize,
}

impl BackEdge {
    pub fn id(&self) -> usize {
        self.id
    }

    pub fn src(&self) -> usize {
        self.src
    }

    pub fn tgt(&self) -> usize {
        self.tgt
    }

    pub fn ty(&self) -> BackEdgeType {
        self.ty
    }

    pub fn color(&self) -> EdgeColor {
        self.color
    }

    pub fn class(&self) -> usize {
        self.class
    }

    pub fn is_classified(&self) -> bool {
        self.class != usize::MAX
    }

    pub fn set_class(&mut self, c: usize) {
        debug_assert!(self.ty != BackEdgeType::Capping);
        self.class = c;
    }
}

/// A spanning-tree vertex. Its index in the tree equals its DFS number.
#[derive(Clone, Debug)]
pub struct StVertex {
    seg_id: u64,
    tag: SideTag,
    parent_edge: usize,
    child_edges: Vec<usize>,
    obe: Vec<usize>,
    ibe: Vec<usize>,
    hi: usize,
    pre: usize,
    post: usize,
}

impl StVertex {
    fn new(seg_id: u64, tag: SideTag) -> Self {
        Self {
            seg_id,
            tag,
            parent_edge: usize::MAX,
            child_edges: Vec::new(),
            obe: Vec::new(),
            ibe: Vec::new(),
            hi: usize::MAX,
            pre: usize::MAX,
            post: usize::MAX,
        }
    }

    pub fn seg_id(&self) -> u64 {
        self.seg_id
    }

    pub fn tag(&self) -> SideTag {
        self.tag
    }

    pub fn hi(&self) -> usize {
        self.hi
    }

    pub fn pre_order(&self) -> usize {
        self.pre
    }

    pub fn post_order(&self) -> usize {
        self.post
    }

    pub fn parent_edge(&self) -> usize {
        self.parent_edge
    }

    pub fn child_edges(&self) -> &[usize] {
        &self.child_edges
    }

    pub fn is_root(&self) -> bool {
        self.parent_edge == usize::MAX
    }

    pub fn is_leaf(&self) -> bool {
        self.child_edges.is_empty()
    }
}

/// Ordered DFS spanning tree over a biedged graph.
///
/// Side-vertices are added in pairs joined by their black tree edge, so a
/// sequence vertex always occupies two consecutive DFS numbers. Adjacencies
/// that close a cycle become normal back edges; classification later adds
/// capping and simplifying ones.
#[derive(Clone, Debug)]
pub struct SpanningTree {
    vertices: Vec<StVertex>,
    tree_edges: Vec<TreeEdge>,
    back_edges: Vec<BackEdge>,
    be_id_to_idx: HashMap<usize, usize>,
    class_count: usize,
}

impl SpanningTree {
    fn with_capacity(size: usize) -> Self {
        Self {
            vertices: Vec::with_capacity(size),
            tree_edges: Vec::with_capacity(size),
            back_edges: Vec::new(),
            be_id_to_idx: HashMap::new(),
            class_count: 0,
        }
    }

    /// Runs the DFS over `bg` and returns the classified-edge-free tree.
    ///
    /// The DFS starts at the dummy root when the component has tips;
    /// otherwise the dummy is unreachable and the walk starts at the left
    /// side of the first sequence vertex.
    pub fn from_biedged(bg: &BiedgedGraph) -> SpanningTree {
        let n = bg.vtx_count();
        let mut t = SpanningTree::with_capacity(n);

        let mut visited = FixedBitSet::with_capacity(n);
        let mut bi_to_tree = vec![usize::MAX; n];
        let mut connected: HashSet<(usize, usize)> = HashSet::new();
        let mut self_looped = FixedBitSet::with_capacity(n / 2 + 1);
        let mut stack: Vec<usize> = Vec::new();

        let key = |a: usize, b: usize| (a.min(b), a.max(b));

        // adds both sides of the sequence vertex that `b_idx` belongs to,
        // the discovered side first
        let discover = |b_idx: usize,
                        p_tree: usize,
                        p_color: EdgeColor,
                        t: &mut SpanningTree,
                        visited: &mut FixedBitSet,
                        bi_to_tree: &mut [usize],
                        connected: &mut HashSet<(usize, usize)>,
                        stack: &mut Vec<usize>| {
            let pair = BiedgedGraph::paired_side(b_idx);
            let a_tree = t.vertices.len();

            let v = bg.vertex(b_idx);
            t.vertices.push(StVertex::new(v.seg_id(), v.tag()));
            let w = bg.vertex(pair);
            t.vertices.push(StVertex::new(w.seg_id(), w.tag()));

            bi_to_tree[b_idx] = a_tree;
            bi_to_tree[pair] = a_tree + 1;
            visited.insert(b_idx);
            visited.insert(pair);

            if p_tree != usize::MAX {
                t.add_tree_edge(p_tree, a_tree, p_color);
                connected.insert(key(p_tree, a_tree));
            }
            t.add_tree_edge(a_tree, a_tree + 1, EdgeColor::Black);
            connected.insert(key(a_tree, a_tree + 1));

            stack.push(b_idx);
            stack.push(pair);
        };

        if bg.has_tips() {
            let dummy = bg.vertex(DUMMY_IDX);
            t.vertices.push(StVertex::new(dummy.seg_id(), dummy.tag()));
            bi_to_tree[DUMMY_IDX] = 0;
            visited.insert(DUMMY_IDX);
            stack.push(DUMMY_IDX);
        } else {
            discover(
                BiedgedGraph::left_of(0),
                usize::MAX,
                EdgeColor::Gray,
                &mut t,
                &mut visited,
                &mut bi_to_tree,
                &mut connected,
                &mut stack,
            );
        }

        while let Some(&b_idx) = stack.last() {
            let p_tree = bi_to_tree[b_idx];
            let mut found_new = false;

            for &e_idx in bg.vertex(b_idx).gray_edges() {
                let o_idx = bg.edge(e_idx).other(b_idx);

                if o_idx == b_idx {
                    // a same-side self-loop closes a cycle across the black
                    // edge of its sequence vertex
                    let seq = BiedgedGraph::seq_of(b_idx);
                    if !self_looped.contains(seq) {
                        self_looped.insert(seq);
                        let pair_tree = bi_to_tree[BiedgedGraph::paired_side(b_idx)];
                        let (src, tgt) = if p_tree > pair_tree {
                            (p_tree, pair_tree)
                        } else {
                            (pair_tree, p_tree)
                        };
                        t.add_back_edge(src, tgt, BackEdgeType::Normal, EdgeColor::Gray);
                    }
                    continue;
                }

                if !visited.contains(o_idx) {
                    discover(
                        o_idx,
                        p_tree,
                        EdgeColor::Gray,
                        &mut t,
                        &mut visited,
                        &mut bi_to_tree,
                        &mut connected,
                        &mut stack,
                    );
                    found_new = true;
                    break;
                }

                let o_tree = bi_to_tree[o_idx];
                if connected.insert(key(p_tree, o_tree)) {
                    debug_assert!(p_tree > o_tree);
                    t.add_back_edge(p_tree, o_tree, BackEdgeType::Normal, EdgeColor::Gray);
                }
            }

            if !found_new {
                stack.pop();
            }
        }

        t.assign_pre_post();
        t
    }

    /// Assigns preorder/postorder stamps off a shared counter, so a subtree
    /// of `k` vertices satisfies `post - pre == 2k - 1` at its root.
    fn assign_pre_post(&mut self) {
        let mut time = 0usize;
        let mut stack: Vec<(usize, usize)> = Vec::new();

        if self.vertices.is_empty() {
            return;
        }

        self.vertices[0].pre = time;
        time += 1;
        stack.push((0, 0));

        while let Some(&(v_idx, cursor)) = stack.last() {
            if cursor < self.vertices[v_idx].child_edges.len() {
                stack.last_mut().unwrap().1 += 1;
                let e_idx = self.vertices[v_idx].child_edges[cursor];
                let c_idx = self.tree_edges[e_idx].child;
                self.vertices[c_idx].pre = time;
                time += 1;
                stack.push((c_idx, 0));
            } else {
                self.vertices[v_idx].post = time;
                time += 1;
                stack.pop();
            }
        }
    }

    pub fn root_idx(&self) -> usize {
        0
    }

    pub fn vtx_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn tree_edge_count(&self) -> usize {
        self.tree_edges.len()
    }

    pub fn back_edge_count(&self) -> usize {
        self.back_edges.len()
    }

    pub fn vertex(&self, v_idx: usize) -> &StVertex {
        &self.vertices[v_idx]
    }

    pub fn is_root(&self, v_idx: usize) -> bool {
        v_idx == self.root_idx()
    }

    pub fn is_leaf(&self, v_idx: usize) -> bool {
        self.vertices[v_idx].is_leaf()
    }

    /// Whether `a` is a strict ancestor of `d`.
    pub fn is_desc(&self, a: usize, d: usize) -> bool {
        self.vertices[a].pre < self.vertices[d].pre
            && self.vertices[a].post > self.vertices[d].post
    }

    /// Child vertex indices, in DFS order.
    pub fn children(&self, v_idx: usize) -> Vec<usize> {
        self.vertices[v_idx]
            .child_edges
            .iter()
            .map(|&e| self.tree_edges[e].child)
            .collect()
    }

    pub fn child_edges(&self, v_idx: usize) -> &[usize] {
        &self.vertices[v_idx].child_edges
    }

    pub fn child_count(&self, v_idx: usize) -> usize {
        self.vertices[v_idx].child_edges.len()
    }

    /// Parent vertex index, `usize::MAX` for the root.
    pub fn parent(&self, v_idx: usize) -> usize {
        let e = self.vertices[v_idx].parent_edge;
        if e == usize::MAX {
            usize::MAX
        } else {
            self.tree_edges[e].parent
        }
    }

    pub fn parent_edge(&self, v_idx: usize) -> &TreeEdge {
        &self.tree_edges[self.vertices[v_idx].parent_edge]
    }

    pub fn parent_edge_mut(&mut self, v_idx: usize) -> &mut TreeEdge {
        &mut self.tree_edges[self.vertices[v_idx].parent_edge]
    }

    pub fn tree_edge(&self, e_idx: usize) -> &TreeEdge {
        &self.tree_edges[e_idx]
    }

    pub fn back_edge(&self, be_idx: usize) -> &BackEdge {
        &self.back_edges[be_idx]
    }

    pub fn back_edge_mut(&mut self, be_idx: usize) -> &mut BackEdge {
        &mut self.back_edges[be_idx]
    }

    pub fn back_edge_by_id(&self, be_id: usize) -> &BackEdge {
        &self.back_edges[self.be_id_to_idx[&be_id]]
    }

    pub fn back_edge_by_id_mut(&mut self, be_id: usize) -> &mut BackEdge {
        let be_idx = self.be_id_to_idx[&be_id];
        &mut self.back_edges[be_idx]
    }

    /// Outgoing back-edge indices of `v_idx` (edges whose source is here).
    pub fn obe_idxs(&self, v_idx: usize) -> &[usize] {
        &self.vertices[v_idx].obe
    }

    /// Incoming back-edge indices of `v_idx` (edges whose target is here).
    pub fn ibe_idxs(&self, v_idx: usize) -> &[usize] {
        &self.vertices[v_idx].ibe
    }

    pub fn obe_tgts(&self, v_idx: usize) -> Vec<usize> {
        self.vertices[v_idx]
            .obe
            .iter()
            .map(|&b| self.back_edges[b].tgt)
            .collect()
    }

    pub fn ibe_srcs(&self, v_idx: usize) -> Vec<usize> {
        self.vertices[v_idx]
            .ibe
            .iter()
            .map(|&b| self.back_edges[b].src)
            .collect()
    }

    pub fn set_hi(&mut self, v_idx: usize, val: usize) {
        self.vertices[v_idx].hi = val;
    }

    fn add_tree_edge(&mut self, frm: usize, to: usize, color: EdgeColor) {
        let e_idx = self.tree_edges.len();
        let id = e_idx + self.back_edges.len();
        self.tree_edges.push(TreeEdge {
            id,
            parent: frm,
            child: to,
            color,
            class: usize::MAX,
        });
        self.vertices[frm].child_edges.push(e_idx);
        self.vertices[to].parent_edge = e_idx;
    }

    /// Adds a back edge and registers it with both endpoints. Returns its
    /// index in the back-edge arena.
    pub fn add_back_edge(
        &mut self,
        frm: usize,
        to: usize,
        ty: BackEdgeType,
        color: EdgeColor,
    ) -> usize {
        let be_idx = self.back_edges.len();
        let id = be_idx + self.tree_edges.len();
        self.back_edges.push(BackEdge {
            id,
            src: frm,
            tgt: to,
            ty,
            color,
            class: usize::MAX,
        });
        self.be_id_to_idx.insert(id, be_idx);
        self.vertices[frm].obe.push(be_idx);
        self.vertices[to].ibe.push(be_idx);
        be_idx
    }

    /// Hands out the next equivalence-class id.
    pub fn new_class(&mut self) -> usize {
        let c = self.class_count;
        self.class_count += 1;
        c
    }

    pub fn class_count(&self) -> usize {
        self.class_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::biedged::BiedgedGraph;
    use crate::testing::graphs;

    fn build(g: &crate::bidirected::BidirectedGraph) -> SpanningTree {
        let bg = BiedgedGraph::from_bidirected(g).unwrap();
        SpanningTree::from_biedged(&bg)
    }

    #[test]
    fn test_covers_all_biedged_vertices() {
        let g = graphs::bubble();
        let bg = BiedgedGraph::from_bidirected(&g).unwrap();
        let t = SpanningTree::from_biedged(&bg);

        assert_eq!(t.vtx_count(), bg.vtx_count());
        // every non-root vertex hangs off a tree edge
        for v in 1..t.vtx_count() {
            assert!(t.vertex(v).parent_edge() != usize::MAX);
            assert!(t.parent(v) < v);
        }
    }

    #[test]
    fn test_bubble_shape() {
        let t = build(&graphs::bubble());

        assert_eq!(t.vtx_count(), 9);
        assert_eq!(t.tree_edge_count(), 8);
        assert_eq!(t.back_edge_count(), 2);

        // side pairs occupy consecutive DFS numbers joined by black edges
        let blacks = (0..t.tree_edge_count())
            .filter(|&e| t.tree_edge(e).color() == EdgeColor::Black)
            .count();
        assert_eq!(blacks, 4);
        for e in 0..t.tree_edge_count() {
            let te = t.tree_edge(e);
            if te.color() == EdgeColor::Black {
                assert_eq!(te.child(), te.parent() + 1);
                assert_eq!(
                    t.vertex(te.parent()).seg_id(),
                    t.vertex(te.child()).seg_id()
                );
            }
        }
    }

    #[test]
    fn test_back_edges_point_rootward() {
        for seed in 0..20 {
            let g = graphs::random_bidirected(8, 12, seed);
            for comp in g.componentize() {
                if comp.edge_count() == 0 {
                    continue;
                }
                let t = match BiedgedGraph::from_bidirected(&comp) {
                    Ok(bg) => SpanningTree::from_biedged(&bg),
                    Err(_) => continue,
                };
                for b in 0..t.back_edge_count() {
                    let be = t.back_edge(b);
                    assert!(be.src() > be.tgt(), "seed {}: {:?}", seed, be);
                }
            }
        }
    }

    #[test]
    fn test_pre_post_nesting() {
        let t = build(&graphs::nested_bubble());
        for v in 0..t.vtx_count() {
            for c in t.children(v) {
                assert!(t.is_desc(v, c));
                assert!(!t.is_desc(c, v));
            }
        }
        // a leaf spans exactly two stamps
        for v in 0..t.vtx_count() {
            if t.is_leaf(v) {
                assert_eq!(t.vertex(v).post_order() - t.vertex(v).pre_order(), 1);
            }
        }
    }

    #[test]
    fn test_hairpin_self_loop_back_edge() {
        let t = build(&graphs::hairpin());

        // the (2,r)--(2,r) loop becomes a back edge parallel to the black
        // edge of sequence vertex 2
        let found = (0..t.back_edge_count()).any(|b| {
            let be = t.back_edge(b);
            be.src() == be.tgt() + 1
                && t.vertex(be.src()).seg_id() == 2
                && t.vertex(be.tgt()).seg_id() == 2
        });
        assert!(found);
    }
}
