use crate::types::{Orientation, VertexEnd};
use fixedbitset::FixedBitSet;
use hashbrown::{HashMap, HashSet};

/// A reference haplotype placement: which path walks through a vertex, on
/// which strand, at which step.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct RefStep {
    pub path_id: usize,
    pub strand: Orientation,
    pub step: usize,
}

/// Metadata of a reference path (GFA `P` line).
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct PathMeta {
    pub id: usize,
    pub name: String,
    pub is_circular: bool,
}

/// A sequence vertex of the bidirected graph.
#[derive(Clone, Debug)]
pub struct Vertex {
    id: u64,
    label: String,
    edges_l: Vec<usize>,
    edges_r: Vec<usize>,
    refs: Vec<RefStep>,
}

impl Vertex {
    fn new(id: u64, label: String) -> Self {
        Self {
            id,
            label,
            edges_l: Vec::new(),
            edges_r: Vec::new(),
            refs: Vec::new(),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn edges_on(&self, end: VertexEnd) -> &[usize] {
        match end {
            VertexEnd::Left => &self.edges_l,
            VertexEnd::Right => &self.edges_r,
        }
    }

    pub fn refs(&self) -> &[RefStep] {
        &self.refs
    }
}

/// An undirected side-to-side edge `(v1, end1) -- (v2, end2)`.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Edge {
    v1: usize,
    end1: VertexEnd,
    v2: usize,
    end2: VertexEnd,
}

impl Edge {
    pub fn v1(&self) -> (usize, VertexEnd) {
        (self.v1, self.end1)
    }

    pub fn v2(&self) -> (usize, VertexEnd) {
        (self.v2, self.end2)
    }

    /// The endpoint reached by crossing this edge from `(v_idx, end)`.
    pub fn other(&self, v_idx: usize, end: VertexEnd) -> (VertexEnd, usize) {
        if self.v1 == self.v2 && self.end1 == self.end2 {
            // same-side self-loop, both endpoints coincide
            return (self.end1, self.v1);
        }
        if self.v1 == v_idx && self.end1 == end {
            (self.end2, self.v2)
        } else {
            (self.end1, self.v1)
        }
    }

    pub fn is_self_loop(&self) -> bool {
        self.v1 == self.v2
    }

    pub fn is_mixed_self_loop(&self) -> bool {
        self.v1 == self.v2 && self.end1 != self.end2
    }
}

/// A bidirected sequence graph: vertices with a nucleotide label and two
/// side-adjacency sets, plus the set of tip sides.
///
/// Constructed once (by [`crate::input`] or the builders in
/// [`crate::testing`]) and immutable through the rest of the pipeline.
#[derive(Clone, Debug, Default)]
pub struct BidirectedGraph {
    vertices: Vec<Vertex>,
    edges: Vec<Edge>,
    id_to_idx: HashMap<u64, usize>,
    tips: Vec<(VertexEnd, u64)>,
    paths: Vec<PathMeta>,
}

impl BidirectedGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(v_count: usize, e_count: usize) -> Self {
        Self {
            vertices: Vec::with_capacity(v_count),
            edges: Vec::with_capacity(e_count),
            id_to_idx: HashMap::with_capacity(v_count),
            tips: Vec::new(),
            paths: Vec::new(),
        }
    }

    pub fn vtx_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn vertex(&self, v_idx: usize) -> &Vertex {
        &self.vertices[v_idx]
    }

    pub fn edge(&self, e_idx: usize) -> &Edge {
        &self.edges[e_idx]
    }

    pub fn v_id_to_idx(&self, v_id: u64) -> Option<usize> {
        self.id_to_idx.get(&v_id).copied()
    }

    pub fn v_idx_to_id(&self, v_idx: usize) -> u64 {
        self.vertices[v_idx].id
    }

    pub fn tips(&self) -> &[(VertexEnd, u64)] {
        &self.tips
    }

    pub fn paths(&self) -> &[PathMeta] {
        &self.paths
    }

    pub fn add_vertex(&mut self, v_id: u64, label: String) -> usize {
        let v_idx = self.vertices.len();
        self.vertices.push(Vertex::new(v_id, label));
        self.id_to_idx.insert(v_id, v_idx);
        v_idx
    }

    pub fn add_edge(&mut self, v1_id: u64, end1: VertexEnd, v2_id: u64, end2: VertexEnd) -> usize {
        let v1 = self.id_to_idx[&v1_id];
        let v2 = self.id_to_idx[&v2_id];
        let e_idx = self.edges.len();
        self.edges.push(Edge { v1, end1, v2, end2 });

        match end1 {
            VertexEnd::Left => self.vertices[v1].edges_l.push(e_idx),
            VertexEnd::Right => self.vertices[v1].edges_r.push(e_idx),
        }
        // a same-side self-loop contributes one entry, not two
        if !(v1 == v2 && end1 == end2) {
            match end2 {
                VertexEnd::Left => self.vertices[v2].edges_l.push(e_idx),
                VertexEnd::Right => self.vertices[v2].edges_r.push(e_idx),
            }
        }

        e_idx
    }

    pub fn add_path(&mut self, name: String, is_circular: bool) -> usize {
        let id = self.paths.len();
        self.paths.push(PathMeta {
            id,
            name,
            is_circular,
        });
        id
    }

    pub fn add_ref(&mut self, v_id: u64, r: RefStep) {
        let v_idx = self.id_to_idx[&v_id];
        self.vertices[v_idx].refs.push(r);
    }

    pub fn add_tip(&mut self, end: VertexEnd, v_id: u64) {
        self.tips.push((end, v_id));
    }

    /// Scan every vertex side and record the ones with no incident edge as
    /// tips. Tips are kept sorted by `(end, id)`.
    pub fn record_tips(&mut self) {
        self.tips.clear();
        for v in &self.vertices {
            if v.edges_l.is_empty() {
                self.tips.push((VertexEnd::Left, v.id));
            }
            if v.edges_r.is_empty() {
                self.tips.push((VertexEnd::Right, v.id));
            }
        }
        self.tips.sort();
    }

    /// Splits the graph into its weakly-connected components.
    ///
    /// Vertex ids, labels, reference placements and tip sides are preserved;
    /// each component is a self-contained [`BidirectedGraph`].
    pub fn componentize(&self) -> Vec<BidirectedGraph> {
        let mut components = Vec::new();
        let mut visited = FixedBitSet::with_capacity(self.vtx_count());
        let mut stack = Vec::new();

        for start in 0..self.vtx_count() {
            if visited.contains(start) {
                continue;
            }

            let mut comp_vtxs = Vec::new();
            stack.push(start);
            visited.insert(start);
            comp_vtxs.push(start);

            while let Some(v_idx) = stack.pop() {
                let v = &self.vertices[v_idx];
                for &e_idx in v.edges_l.iter().chain(v.edges_r.iter()) {
                    let e = &self.edges[e_idx];
                    for adj in [e.v1, e.v2] {
                        if !visited.contains(adj) {
                            visited.insert(adj);
                            stack.push(adj);
                            comp_vtxs.push(adj);
                        }
                    }
                }
            }

            // keep id order stable inside the component
            radsort::sort(&mut comp_vtxs);

            let mut comp = BidirectedGraph::with_capacity(comp_vtxs.len(), 0);
            for p in &self.paths {
                comp.paths.push(p.clone());
            }
            for &v_idx in &comp_vtxs {
                let v = &self.vertices[v_idx];
                let new_idx = comp.add_vertex(v.id, v.label.clone());
                comp.vertices[new_idx].refs = v.refs.clone();
            }

            let mut added_edges: HashSet<usize> = HashSet::new();
            for &v_idx in &comp_vtxs {
                let v = &self.vertices[v_idx];
                for &e_idx in v.edges_l.iter().chain(v.edges_r.iter()) {
                    if !added_edges.insert(e_idx) {
                        continue;
                    }
                    let e = &self.edges[e_idx];
                    comp.add_edge(
                        self.v_idx_to_id(e.v1),
                        e.end1,
                        self.v_idx_to_id(e.v2),
                        e.end2,
                    );
                }
            }

            for &(end, v_id) in &self.tips {
                if let Some(v_idx) = self.v_id_to_idx(v_id) {
                    if comp_vtxs.binary_search(&v_idx).is_ok() {
                        comp.tips.push((end, v_id));
                    }
                }
            }

            components.push(comp);
        }

        components
    }
}
