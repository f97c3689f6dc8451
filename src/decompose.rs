use crate::bidirected::BidirectedGraph;
use crate::biedged::BiedgedGraph;
use crate::cycle_equiv::{self, HairpinBoundary};
use crate::pvst::Pvst;
use crate::spanning_tree::SpanningTree;
use crate::{flubble_tree, refine};
use log::{debug, warn};
use rayon::prelude::*;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;

/// Failures surfaced by the decomposition pipeline.
///
/// A failure aborts the offending component, not the whole job.
#[derive(Error, Debug)]
pub enum DecomposeError {
    #[error("malformed input at line {line}: {msg}")]
    InputMalformed { line: usize, msg: String },

    #[error("segment {segment} has an unsupported mixed-side self-loop")]
    UnsupportedSelfLoop { segment: u64 },

    #[error("component has no vertices")]
    EmptyComponent,

    #[error("decomposition cancelled")]
    Cancelled,

    #[error("io error")]
    Io(#[from] std::io::Error),
}

/// Explicit pipeline context; replaces any process-wide state.
#[derive(Debug)]
pub struct Context {
    /// Upper bound on worker threads for component-level parallelism.
    pub thread_count: usize,
    /// Whether hairpin boundaries are kept on the result.
    pub report_hairpins: bool,
    /// Checked between components; set to stop a running decomposition.
    pub cancelled: AtomicBool,
}

impl Default for Context {
    fn default() -> Self {
        Self {
            thread_count: 1,
            report_hairpins: true,
            cancelled: AtomicBool::new(false),
        }
    }
}

impl Context {
    pub fn with_threads(thread_count: usize) -> Self {
        Self {
            thread_count: thread_count.max(1),
            ..Self::default()
        }
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}

/// Everything derived from one component: the component itself (for walk
/// enumeration downstream), its refined PVST, and any hairpin boundaries.
#[derive(Debug)]
pub struct ComponentResult {
    pub component: BidirectedGraph,
    pub pvst: Pvst,
    pub hairpins: Vec<HairpinBoundary>,
}

/// Runs the full decomposition of one component:
/// biedging, spanning tree, cycle equivalence, flubble tree, refinement.
pub fn decompose_component(
    component: BidirectedGraph,
    ctx: &Context,
) -> Result<ComponentResult, DecomposeError> {
    if component.vtx_count() == 0 {
        return Err(DecomposeError::EmptyComponent);
    }

    debug!(
        "component: {} vertices, {} edges, {} tips",
        component.vtx_count(),
        component.edge_count(),
        component.tips().len()
    );

    let bg = BiedgedGraph::from_bidirected(&component)?;
    let mut st = SpanningTree::from_biedged(&bg);
    let mut hairpins = cycle_equiv::classify(&mut st);
    if !ctx.report_hairpins {
        hairpins.clear();
    }

    let mut pvst = flubble_tree::build(&st);
    refine::refine(&st, &mut pvst);

    Ok(ComponentResult {
        component,
        pvst,
        hairpins,
    })
}

/// Decomposes every weakly-connected component of `g`.
///
/// Components are independent: each worker owns one component and all of
/// its derived state, and a failed component is logged and skipped without
/// affecting the others. Results come back in component order.
pub fn decompose(g: &BidirectedGraph, ctx: &Context) -> Vec<Result<ComponentResult, DecomposeError>> {
    let components = g.componentize();
    debug!("decompose: {} components", components.len());

    let run = |component: BidirectedGraph| -> Result<ComponentResult, DecomposeError> {
        if ctx.is_cancelled() {
            return Err(DecomposeError::Cancelled);
        }
        decompose_component(component, ctx).inspect_err(|e| {
            warn!("skipping component: {}", e);
        })
    };

    if ctx.thread_count <= 1 {
        return components.into_iter().map(run).collect();
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(ctx.thread_count)
        .build()
        .expect("worker pool should build");

    pool.install(|| components.into_par_iter().map(run).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pvst::PvstVertex;
    use crate::testing::graphs;
    use crate::types::VertexEnd;

    #[test]
    fn test_two_components_two_pvsts() {
        let g = graphs::two_components();
        let ctx = Context::default();
        let results = decompose(&g, &ctx);

        assert_eq!(results.len(), 2);
        for r in &results {
            let r = r.as_ref().unwrap();
            // each chain yields a dummy-only tree and no hairpins
            assert_eq!(r.pvst.vtx_count(), 1);
            assert!(r.hairpins.is_empty());
        }
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let g = graphs::two_components();
        let seq = decompose(&g, &Context::default());
        let par = decompose(&g, &Context::with_threads(2));

        assert_eq!(seq.len(), par.len());
        for (a, b) in seq.iter().zip(par.iter()) {
            let (a, b) = (a.as_ref().unwrap(), b.as_ref().unwrap());
            assert_eq!(a.pvst.vtx_count(), b.pvst.vtx_count());
            assert_eq!(a.component.vtx_count(), b.component.vtx_count());
        }
    }

    #[test]
    fn test_mixed_self_loop_isolated() {
        // one bad component must not take down the good one
        let mut g = graphs::chain(3);
        g.add_vertex(9, "T".into());
        g.add_edge(9, VertexEnd::Left, 9, VertexEnd::Right);
        g.record_tips();

        let results = decompose(&g, &Context::default());
        assert_eq!(results.len(), 2);
        assert!(results[0].is_ok());
        assert!(matches!(
            results[1],
            Err(DecomposeError::UnsupportedSelfLoop { segment: 9 })
        ));
    }

    #[test]
    fn test_cancellation_between_components() {
        let g = graphs::two_components();
        let ctx = Context::default();
        ctx.cancel();
        let results = decompose(&g, &ctx);
        assert!(results.iter().all(|r| r.is_err()));
    }

    #[test]
    fn test_seven_segment_full_pipeline() {
        let g = graphs::seven_segment();
        let results = decompose(&g, &Context::default());
        assert_eq!(results.len(), 1);
        let r = results[0].as_ref().unwrap();

        let kinds: Vec<char> = r
            .pvst
            .iter_idx()
            .map(|v| r.pvst.vertex(v).kind_letter())
            .collect();
        assert_eq!(kinds, vec!['R', 'F', 'T', 'C']);

        // walk-enumeration interface: boundaries and their spanning-tree
        // realisation are exposed per region
        let f = r.pvst.vertex(1);
        assert_eq!(f.boundaries().unwrap().to_string(), ">1>7");
        let (ai, zi) = f.st_bounds().unwrap();
        assert!(ai < zi);
    }

    #[test]
    fn test_hairpin_reported() {
        let g = graphs::hairpin();
        let results = decompose(&g, &Context::default());
        let r = results[0].as_ref().unwrap();
        assert_eq!(r.hairpins.len(), 1);
        assert_eq!(r.hairpins[0].start, 2);

        let quiet = Context {
            report_hairpins: false,
            ..Context::default()
        };
        let results = decompose(&g, &quiet);
        assert!(results[0].as_ref().unwrap().hairpins.is_empty());
    }

    #[test]
    fn test_empty_graph() {
        let g = BidirectedGraph::new();
        let results = decompose(&g, &Context::default());
        assert!(results.is_empty());
    }

    #[test]
    fn test_original_flubbles_survive_refinement() {
        for seed in 0..10 {
            let g = graphs::random_bidirected(8, 11, seed);
            for r in decompose(&g, &Context::default()).into_iter().flatten() {
                for v in r.pvst.iter_idx() {
                    if matches!(
                        r.pvst.vertex(v),
                        PvstVertex::Concealed(_) | PvstVertex::Smothered(_)
                    ) {
                        continue;
                    }
                    assert!(v == r.pvst.root_idx() || r.pvst.parent(v) != usize::MAX);
                }
            }
        }
    }
}
