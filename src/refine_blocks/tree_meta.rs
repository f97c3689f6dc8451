use crate::spanning_tree::{BackEdgeType, SpanningTree};
use std::collections::{BinaryHeap, VecDeque};

/// Read-only derived data over a classified spanning tree: Euler tour with
/// an RMQ index for LCA queries, per-vertex depth, `lo`, and a
/// compressed-sparse-row store of the back edges bracketing each vertex.
#[derive(Clone, Debug)]
pub struct TreeMeta {
    /// Euler-tour vertex sequence.
    euler: Vec<usize>,
    /// Depth at each Euler-tour position.
    euler_depth: Vec<usize>,
    /// First Euler-tour position of each vertex.
    first: Vec<usize>,
    /// Sparse table of minimum positions over `euler_depth`.
    sparse: Vec<Vec<usize>>,
    /// Depth of each vertex (root = 0).
    pub depth: Vec<usize>,
    /// Deepest vertex reachable by a normal back edge that starts below `v`
    /// (in DFS order) and targets an ancestor of `v`; `usize::MAX` if none.
    pub lo: Vec<usize>,
    off: Vec<usize>,
    bracket_edges: Vec<usize>,
}

impl TreeMeta {
    pub fn build(st: &SpanningTree) -> Self {
        let mut tm = Self {
            euler: Vec::new(),
            euler_depth: Vec::new(),
            first: Vec::new(),
            sparse: Vec::new(),
            depth: Vec::new(),
            lo: Vec::new(),
            off: Vec::new(),
            bracket_edges: Vec::new(),
        };

        tm.compute_depth(st);
        tm.euler_tour(st);
        tm.build_sparse();
        tm.compute_lo(st);
        tm.collect_brackets(st);
        tm
    }

    fn compute_depth(&mut self, st: &SpanningTree) {
        let n = st.vtx_count();
        self.depth = vec![usize::MAX; n];

        let root = st.root_idx();
        let mut q = VecDeque::new();
        q.push_back(root);
        self.depth[root] = 0;

        while let Some(v_idx) = q.pop_front() {
            for c_idx in st.children(v_idx) {
                self.depth[c_idx] = self.depth[v_idx] + 1;
                q.push_back(c_idx);
            }
        }
    }

    fn euler_tour(&mut self, st: &SpanningTree) {
        let n = st.vtx_count();
        self.first = vec![usize::MAX; n];

        let mut stack: Vec<(usize, usize)> = vec![(st.root_idx(), 0)];
        while let Some(&(v_idx, cursor)) = stack.last() {
            if self.first[v_idx] == usize::MAX {
                self.first[v_idx] = self.euler.len();
            }
            self.euler.push(v_idx);
            self.euler_depth.push(self.depth[v_idx]);

            let child_edges = st.child_edges(v_idx);
            if cursor < child_edges.len() {
                stack.last_mut().unwrap().1 += 1;
                stack.push((st.tree_edge(child_edges[cursor]).child(), 0));
            } else {
                stack.pop();
            }
        }
    }

    fn build_sparse(&mut self) {
        let m = self.euler_depth.len();
        if m == 0 {
            return;
        }

        let levels = usize::BITS as usize - m.leading_zeros() as usize;
        self.sparse.push((0..m).collect());
        for k in 1..levels {
            let half = 1 << (k - 1);
            let prev = &self.sparse[k - 1];
            let mut row = Vec::with_capacity(m);
            for i in 0..m {
                let a = prev[i];
                let b = prev[(i + half).min(m - 1)];
                row.push(if self.euler_depth[a] <= self.euler_depth[b] {
                    a
                } else {
                    b
                });
            }
            self.sparse.push(row);
        }
    }

    /// Position of the minimum depth in `euler_depth[l..=r]`.
    fn rmq(&self, l: usize, r: usize) -> usize {
        debug_assert!(l <= r);
        let span = r - l + 1;
        let k = usize::BITS as usize - 1 - span.leading_zeros() as usize;
        let a = self.sparse[k][l];
        let b = self.sparse[k][r + 1 - (1 << k)];
        if self.euler_depth[a] <= self.euler_depth[b] {
            a
        } else {
            b
        }
    }

    /// Lowest common ancestor of a non-empty set of vertices.
    pub fn lca(&self, vtxs: &[usize]) -> usize {
        let mut l = usize::MAX;
        let mut r = 0;
        for &v in vtxs {
            let f = self.first[v];
            l = l.min(f);
            r = r.max(f);
        }
        self.euler[self.rmq(l, r)]
    }

    fn compute_lo(&mut self, st: &SpanningTree) {
        let n = st.vtx_count();
        self.lo = vec![usize::MAX; n];

        // targets of back edges whose source is below the sweep line,
        // prioritised by depth
        let mut pq: BinaryHeap<(usize, usize)> = BinaryHeap::new();

        for v_idx in (0..n).rev() {
            while let Some(&(_, tgt)) = pq.peek() {
                if tgt == v_idx {
                    pq.pop();
                } else {
                    break;
                }
            }

            if let Some(&(_, tgt)) = pq.peek() {
                self.lo[v_idx] = tgt;
            }

            for &be_idx in st.obe_idxs(v_idx) {
                let be = st.back_edge(be_idx);
                if be.ty() != BackEdgeType::Normal {
                    continue;
                }
                pq.push((self.depth[be.tgt()], be.tgt()));
            }
        }
    }

    /// Builds the CSR listing, per vertex, of the normal back edges whose
    /// source is a strict descendant and whose target a strict ancestor.
    fn collect_brackets(&mut self, st: &SpanningTree) {
        let n = st.vtx_count();

        let normal: Vec<usize> = (0..st.back_edge_count())
            .filter(|&b| st.back_edge(b).ty() == BackEdgeType::Normal)
            .collect();

        // counts via a difference on the tree: +1 at parent(src), -1 at tgt
        let mut diff = vec![0isize; n];
        for &be_idx in &normal {
            let be = st.back_edge(be_idx);
            if !st.is_root(be.src()) {
                diff[st.parent(be.src())] += 1;
            }
            diff[be.tgt()] -= 1;
        }

        let mut count = vec![0isize; n];
        for v_idx in (0..n).rev() {
            let mut subtotal = diff[v_idx];
            for c_idx in st.children(v_idx) {
                subtotal += count[c_idx];
            }
            count[v_idx] = subtotal;
        }

        self.off = vec![0; n + 1];
        for v_idx in 0..n {
            debug_assert!(count[v_idx] >= 0);
            self.off[v_idx + 1] = self.off[v_idx] + count[v_idx] as usize;
        }

        self.bracket_edges = vec![0; self.off[n]];
        let mut cursor = vec![0usize; n];
        for &be_idx in &normal {
            let be = st.back_edge(be_idx);
            if st.is_root(be.src()) {
                continue;
            }
            let mut v = st.parent(be.src());
            while !st.is_root(v) && v != be.tgt() {
                self.bracket_edges[self.off[v] + cursor[v]] = be_idx;
                cursor[v] += 1;
                v = st.parent(v);
            }
        }
    }

    /// Back-edge indices bracketing `v_idx`.
    pub fn brackets(&self, v_idx: usize) -> &[usize] {
        &self.bracket_edges[self.off[v_idx]..self.off[v_idx + 1]]
    }
}
