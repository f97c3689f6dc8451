use crate::cycle_equiv_blocks::bracket_list::{Bracket, BracketLists};
use crate::spanning_tree::{BackEdgeType, SpanningTree};
use crate::types::EdgeColor;
use log::debug;

/// A hairpin region discovered while classifying: the sequence vertex whose
/// bracket list first ran dry and the last vertex the region extended to.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct HairpinBoundary {
    pub start: u64,
    pub end: u64,
}

/// Labels every tree edge and every non-capping back edge with a
/// cycle-equivalence class, in one pass over the vertices in decreasing DFS
/// number.
///
/// Each vertex merges its children's bracket lists by an O(1) splice, pops
/// the back edges ending here, pushes the ones starting here, and then reads
/// its parent edge's class off the topmost bracket. Vertices whose list runs
/// dry mark hairpin/tip boundaries and get a simplifying back edge to the
/// root; a subtree with two low-targeting branches gets a capping back edge.
///
/// Returns the hairpin boundaries found along the way.
pub fn classify(t: &mut SpanningTree) -> Vec<HairpinBoundary> {
    let n = t.vtx_count();
    let mut bl = BracketLists::new(n);

    let mut hairpins = Vec::new();
    let mut in_hairpin = false;
    let mut curr = HairpinBoundary {
        start: u64::MAX,
        end: u64::MAX,
    };

    for v in (0..n).rev() {
        let children = t.children(v);

        // a hairpin closes at the next leaf, or at the root
        if in_hairpin && ((children.is_empty() && !t.is_root(v)) || t.is_root(v)) {
            hairpins.push(curr);
            curr = HairpinBoundary {
                start: u64::MAX,
                end: u64::MAX,
            };
            in_hairpin = false;
        }

        /*
         * compute hi
         */

        let obe: Vec<usize> = t.obe_idxs(v).to_vec();
        let ibe: Vec<usize> = t.ibe_idxs(v).to_vec();

        let mut hi_0 = usize::MAX;
        for &be_idx in &obe {
            hi_0 = hi_0.min(t.back_edge(be_idx).tgt());
        }

        let mut hi_and_child: Vec<(usize, usize)> =
            children.iter().map(|&c| (t.vertex(c).hi(), c)).collect();
        hi_and_child.sort_unstable();

        let hi_1 = hi_and_child.first().map_or(usize::MAX, |&(h, _)| h);
        let hi_child = hi_and_child.first().map_or(usize::MAX, |&(_, c)| c);

        t.set_hi(v, hi_0.min(hi_1));

        // lowest hi among the remaining children that still reach above v
        let hi_2 = children
            .iter()
            .filter(|&&c| c != hi_child && t.vertex(c).hi() < v)
            .map(|&c| t.vertex(c).hi())
            .min()
            .unwrap_or(usize::MAX);

        /*
         * compute the bracket list
         */

        for &c in &children {
            bl.splice_front(v, c);
        }

        for &be_idx in &ibe {
            bl.delete(v, t.back_edge(be_idx).id());
            let be = t.back_edge(be_idx);
            if be.ty() != BackEdgeType::Capping && !be.is_classified() {
                let cls = t.new_class();
                t.back_edge_mut(be_idx).set_class(cls);
            }
        }

        for &be_idx in &obe {
            let be = t.back_edge(be_idx);
            bl.push_front(v, Bracket::new(be.id(), be.ty() == BackEdgeType::Capping));
        }

        if hi_2 < hi_0 {
            let be_idx = t.add_back_edge(v, hi_2, BackEdgeType::Capping, EdgeColor::Gray);
            bl.push_front(v, Bracket::new(t.back_edge(be_idx).id(), true));
        }

        if bl.is_empty(v) {
            if !t.is_root(v) {
                // boundary-hairpin start; keep v under a bracket so the
                // nesting stays well-formed
                curr.start = t.vertex(v).seg_id();
                let be_idx =
                    t.add_back_edge(v, t.root_idx(), BackEdgeType::Simplifying, EdgeColor::Gray);
                bl.push_front(v, Bracket::new(t.back_edge(be_idx).id(), false));
                t.set_hi(v, t.root_idx());
                in_hairpin = true;
            }
        } else if in_hairpin {
            let top_id = bl.top(v).back_edge_id;
            if t.back_edge_by_id(top_id).ty() == BackEdgeType::Simplifying {
                curr.end = t.vertex(v).seg_id();
            }
        }

        /*
         * label the tree edge into v
         */

        if !t.is_root(v) {
            let size = bl.len(v);
            let fresh = {
                let top = bl.top(v);
                if size != top.recent_size {
                    Some(t.new_class())
                } else {
                    None
                }
            };
            let top = bl.top_mut(v);
            if let Some(cls) = fresh {
                top.recent_size = size;
                top.recent_class = cls;
            }
            let cls = top.recent_class;
            let equiv_backedge = if top.recent_size == 1 {
                Some(top.back_edge_id)
            } else {
                None
            };

            t.parent_edge_mut(v).set_class(cls);
            if let Some(be_id) = equiv_backedge {
                // a singleton bracket is cycle-equivalent with the tree edge
                t.back_edge_by_id_mut(be_id).set_class(cls);
            }
        }
    }

    // every bracket has been popped by its target
    debug_assert!((0..n).all(|v| bl.is_empty(v)));

    debug!(
        "cycle_equiv: {} classes over {} tree edges, {} back edges, {} hairpins",
        t.class_count(),
        t.tree_edge_count(),
        t.back_edge_count(),
        hairpins.len()
    );

    hairpins
}
