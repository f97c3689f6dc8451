use crate::pvst::{Pvst, PvstVertex};
use crate::refine_blocks::tree_meta::TreeMeta;
use crate::spanning_tree::SpanningTree;
use crate::types::EdgeColor;

/// Every off-path branch must be a single sequence vertex that returns
/// straight into `ai`.
fn branches_return_to_ai(
    st: &SpanningTree,
    tm: &TreeMeta,
    ai: usize,
    branches: &[usize],
) -> bool {
    let has_be_to_ai = |c: usize| {
        tm.brackets(c)
            .iter()
            .any(|&be_idx| st.back_edge(be_idx).tgt() == ai)
            || st.obe_tgts(c).contains(&ai)
    };

    for &c in branches {
        let span = st.vertex(c).post_order() - st.vertex(c).pre_order();
        if span != 3 {
            return false;
        }
        if !has_be_to_ai(c) {
            return false;
        }
    }

    true
}

/// Retags flubbles whose interior is at most one sequence vertex per branch
/// as tiny (SNPs and short indels).
pub fn find_tiny(st: &SpanningTree, pvst: &mut Pvst, tm: &TreeMeta) {
    for v_idx in pvst.iter_idx() {
        let (ai, zi) = match pvst.vertex(v_idx) {
            PvstVertex::Flubble(f) => (f.ai, f.zi),
            _ => continue,
        };

        if !(zi - ai == 1 || zi - ai == 3) {
            continue;
        }

        let branches: Vec<usize> = st
            .child_edges(zi)
            .iter()
            .filter(|&&e| st.tree_edge(e).color() != EdgeColor::Black)
            .map(|&e| st.tree_edge(e).child())
            .collect();

        if branches.is_empty() {
            retag(pvst, v_idx);
            continue;
        }

        if branches_return_to_ai(st, tm, ai, &branches) {
            retag(pvst, v_idx);
        }
    }
}

fn retag(pvst: &mut Pvst, v_idx: usize) {
    let v = pvst.vertex_mut(v_idx);
    if let PvstVertex::Flubble(f) = *v {
        *v = PvstVertex::Tiny(f);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::biedged::BiedgedGraph;
    use crate::{cycle_equiv, flubble_tree};
    use crate::testing::graphs;

    fn refined(g: &crate::bidirected::BidirectedGraph) -> Pvst {
        let bg = BiedgedGraph::from_bidirected(g).unwrap();
        let mut st = SpanningTree::from_biedged(&bg);
        cycle_equiv::classify(&mut st);
        let mut pvst = flubble_tree::build(&st);
        let tm = TreeMeta::build(&st);
        find_tiny(&st, &mut pvst, &tm);
        pvst
    }

    #[test]
    fn test_snp_bubble_is_tiny() {
        let pvst = refined(&graphs::bubble());
        assert!(matches!(pvst.vertex(1), PvstVertex::Tiny(_)));
        assert_eq!(pvst.vertex(1).label(), ">1>4");
    }

    #[test]
    fn test_inner_bubble_tiny_outer_not() {
        let pvst = refined(&graphs::nested_bubble());
        assert!(matches!(pvst.vertex(1), PvstVertex::Flubble(_)));
        assert!(matches!(pvst.vertex(2), PvstVertex::Tiny(_)));
    }

    #[test]
    fn test_wide_region_not_tiny() {
        let pvst = refined(&graphs::tandem_repeat());
        assert!(matches!(pvst.vertex(1), PvstVertex::Flubble(_)));
    }
}
