use crate::pvst::Pvst;
use crate::refine_blocks::tree_meta::TreeMeta;
use crate::refine_blocks::{concealed, parallel, smothered, tiny};
use crate::spanning_tree::SpanningTree;
use log::debug;

/// Refines a freshly built flubble tree in place: tags tiny and parallel
/// regions, then derives concealed regions and their smothered neighbours.
///
/// Refinement only inserts vertices and moves edges; every original flubble
/// stays reachable.
pub fn refine(st: &SpanningTree, pvst: &mut Pvst) {
    let tm = TreeMeta::build(st);

    tiny::find_tiny(st, pvst, &tm);
    parallel::find_parallel(st, pvst, &tm);
    concealed::find_concealed(st, pvst, &tm);
    smothered::find_smothered(st, pvst, &tm);

    debug!("refine: {} pvst vertices", pvst.vtx_count());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::biedged::BiedgedGraph;
    use crate::pvst::PvstVertex;
    use crate::testing::graphs;
    use crate::{cycle_equiv, flubble_tree};

    fn full(g: &crate::bidirected::BidirectedGraph) -> Pvst {
        let bg = BiedgedGraph::from_bidirected(g).unwrap();
        let mut st = SpanningTree::from_biedged(&bg);
        cycle_equiv::classify(&mut st);
        let mut pvst = flubble_tree::build(&st);
        refine(&st, &mut pvst);
        pvst
    }

    #[test]
    fn test_bubble_refines_to_tiny() {
        let pvst = full(&graphs::bubble());
        assert_eq!(pvst.vtx_count(), 2);
        assert!(matches!(pvst.vertex(1), PvstVertex::Tiny(_)));
    }

    #[test]
    fn test_nested_keeps_hierarchy() {
        let pvst = full(&graphs::nested_bubble());
        assert_eq!(pvst.vtx_count(), 3);
        assert!(matches!(pvst.vertex(1), PvstVertex::Flubble(_)));
        assert!(matches!(pvst.vertex(2), PvstVertex::Tiny(_)));
        assert_eq!(pvst.parent(2), 1);
    }

    #[test]
    fn test_tandem_at_most_one_concealed() {
        let pvst = full(&graphs::tandem_repeat());
        let concealed = pvst
            .iter_idx()
            .filter(|&v| matches!(pvst.vertex(v), PvstVertex::Concealed(_)))
            .count();
        assert!(concealed <= 1);
        assert!(matches!(pvst.vertex(1), PvstVertex::Flubble(_)));
    }
}
