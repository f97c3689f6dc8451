use crate::pvst::{Bounds, ConcealedKind, ConcealedVertex, Pvst, PvstVertex};
use crate::refine_blocks::tree_meta::TreeMeta;
use crate::spanning_tree::{BackEdgeType, SpanningTree};
use crate::types::{Boundary, EdgeColor, Orientation, OrientedId, SideTag};

/// A candidate concealed boundary: the source of the incoming back edge it
/// came from and its meeting point with the closing boundary.
#[derive(Clone, Copy, Debug)]
struct SrcLca {
    src: usize,
    lca: usize,
}

struct ConcealedGroup {
    fl_v_idx: usize,
    ai_adj: Vec<ConcealedVertex>,
    zi_adj: Vec<ConcealedVertex>,
    n: usize,
}

fn normal_ibe<'a>(st: &'a SpanningTree, v_idx: usize) -> impl Iterator<Item = usize> + 'a {
    st.ibe_idxs(v_idx)
        .iter()
        .copied()
        .filter(move |&b| st.back_edge(b).ty() == BackEdgeType::Normal)
}

fn normal_obe<'a>(st: &'a SpanningTree, v_idx: usize) -> impl Iterator<Item = usize> + 'a {
    st.obe_idxs(v_idx)
        .iter()
        .copied()
        .filter(move |&b| st.back_edge(b).ty() == BackEdgeType::Normal)
}

/// `m`: the deepest meeting point, with the closing boundary, of a normal
/// back edge into `ii` that meets strictly above `ji`; `ii` itself if none.
fn compute_m(st: &SpanningTree, tm: &TreeMeta, ii: usize, ji: usize) -> usize {
    if st.ibe_idxs(ii).is_empty() {
        return ii;
    }

    let mut best = usize::MAX;
    let mut best_depth = 0;
    for be_idx in normal_ibe(st, ii) {
        let src = st.back_edge(be_idx).src();
        let l = tm.lca(&[src, ji]);
        if tm.depth[l] >= tm.depth[ji] {
            continue;
        }
        if tm.depth[l] > best_depth {
            best = l;
            best_depth = tm.depth[l];
        }
    }

    if best == usize::MAX { ii } else { best }
}

/// `n`: the deepest target of a normal back edge out of `ji`; `ji` itself
/// if none reaches strictly below `ii`.
fn compute_n(st: &SpanningTree, tm: &TreeMeta, ii: usize, ji: usize) -> usize {
    if normal_obe(st, ji).next().is_none() {
        return ji;
    }

    let mut lowest = ii;
    for be_idx in normal_obe(st, ji) {
        let tgt = st.back_edge(be_idx).tgt();
        if tm.depth[tgt] > tm.depth[lowest] {
            lowest = tgt;
        }
    }

    if lowest == ii { ji } else { lowest }
}

/// Whether the region `(ii, ji)` can hold a concealed sub-region at all.
fn can_contain(
    st: &SpanningTree,
    tm: &TreeMeta,
    ii: usize,
    ji: usize,
    m: usize,
    n: usize,
) -> bool {
    // (i) some bracket of ji must stay inside the region
    let lo_ji = tm.lo[ji];
    if lo_ji == usize::MAX || tm.depth[lo_ji] < tm.depth[ii] {
        return false;
    }

    // (ii) a trivial region: nothing meets, nothing lands, nothing branches
    let ibe_ii = normal_ibe(st, ii)
        .filter(|&b| st.back_edge(b).src() != ji)
        .count();
    let ibe_ji = normal_ibe(st, ji).count();
    if m == ii && n == ji && ibe_ii < 2 && ibe_ji == 0 && st.child_count(ji) < 3 {
        return false;
    }

    true
}

/*
 * searches anchored on the ai side
 */

fn ai_trunk(
    st: &SpanningTree,
    tm: &TreeMeta,
    m: usize,
    n: usize,
    ai: usize,
    zi: usize,
) -> Option<SrcLca> {
    if n == usize::MAX || m == usize::MAX || tm.depth[m] > tm.depth[n] {
        return None;
    }

    let all_brackets_above_ai = |l: usize| {
        tm.brackets(l)
            .iter()
            .all(|&b| tm.depth[st.back_edge(b).tgt()] <= tm.depth[ai])
    };
    let is_busy = |l: usize| !st.obe_idxs(l).is_empty() || st.child_count(l) > 1;

    let mut candidates: Vec<SrcLca> = Vec::new();
    for be_idx in normal_ibe(st, ai) {
        let src = st.back_edge(be_idx).src();
        let l = tm.lca(&[src, zi]);
        if tm.depth[l] <= tm.depth[m] {
            candidates.push(SrcLca { src, lca: l });
        }
    }

    candidates.retain(|x| all_brackets_above_ai(x.lca) || !is_busy(x.lca));
    candidates.sort_unstable_by_key(|x| x.lca);
    candidates.last().copied()
}

fn ai_branches(
    st: &SpanningTree,
    tm: &TreeMeta,
    ai: usize,
    zi: usize,
    bb: &mut Vec<usize>,
) {
    if st.child_count(zi) < 2 {
        return;
    }

    for c_idx in st.children(zi) {
        let v = st.vertex(c_idx);
        if !(v.hi() == tm.lo[c_idx] && v.hi() == ai) {
            continue;
        }
        let brackets = tm.brackets(c_idx);
        if brackets.len() < 2 {
            continue;
        }

        let srcs: Vec<usize> = brackets.iter().map(|&b| st.back_edge(b).src()).collect();
        let d = tm.lca(&srcs);
        if !tm.brackets(d).is_empty() {
            bb.push(d);
        }
    }
}

fn with_ai(
    st: &SpanningTree,
    tm: &TreeMeta,
    res: &mut Vec<ConcealedVertex>,
    m: usize,
    n: usize,
    ai: usize,
    zi: usize,
    fl_v_idx: usize,
) {
    if let Some(tb) = ai_trunk(st, tm, m, n, ai, zi) {
        res.push(gen_ai_concealed(st, ai, tb, ConcealedKind::AiTrunk, fl_v_idx));
    }

    let mut bb = Vec::new();
    ai_branches(st, tm, ai, zi, &mut bb);
    for b in bb {
        let tb = SrcLca {
            src: usize::MAX,
            lca: b,
        };
        res.push(gen_ai_concealed(st, ai, tb, ConcealedKind::AiBranch, fl_v_idx));
    }
}

/*
 * searches anchored on the zi side
 */

fn override_zi_trunk(
    st: &SpanningTree,
    tm: &TreeMeta,
    m: usize,
    n: usize,
    ii: usize,
    ji: usize,
) -> usize {
    if tm.depth[m] > tm.depth[n] {
        return usize::MAX;
    }

    let mut candidates = Vec::new();
    for c_idx in st.children(ji) {
        let hi = st.vertex(c_idx).hi();
        if hi != usize::MAX && tm.depth[hi] < tm.depth[ii] {
            // this child leaves the region altogether
            continue;
        }

        let brackets = tm.brackets(c_idx);
        if brackets.len() == 1 {
            let tgt = st.back_edge(brackets[0]).tgt();
            if tm.depth[m] < tm.depth[tgt] && tm.depth[n] > tm.depth[tgt] {
                candidates.push(tgt);
            }
        }
    }

    let mut min_v = n;
    for y in candidates {
        let valid = tm.brackets(y).iter().all(|&b| {
            let be = st.back_edge(b);
            !(tm.depth[be.src()] < tm.depth[ji] || tm.depth[be.tgt()] > tm.depth[ii])
        });
        if valid && tm.depth[y] < tm.depth[min_v] {
            min_v = y;
        }
    }

    if min_v == n { usize::MAX } else { min_v }
}

fn zi_trunk(
    st: &SpanningTree,
    tm: &TreeMeta,
    m: usize,
    n: usize,
    ii: usize,
    ji: usize,
) -> usize {
    if n == usize::MAX || m == usize::MAX || tm.depth[m] > tm.depth[n] {
        return usize::MAX;
    }

    let overridden = override_zi_trunk(st, tm, m, n, ii, ji);
    if overridden != usize::MAX {
        return overridden;
    }

    let mut x: Vec<(usize, usize)> = Vec::new();
    for be_idx in normal_obe(st, ji) {
        let tgt = st.back_edge(be_idx).tgt();
        if tm.depth[tgt] < tm.depth[n] {
            continue;
        }
        x.push((tgt, tm.depth[tgt]));
    }

    x.sort_unstable_by_key(|&(_, d)| d);
    x.first().map_or(usize::MAX, |&(tgt, _)| tgt)
}

fn zi_branches(
    st: &SpanningTree,
    tm: &TreeMeta,
    ii: usize,
    ji: usize,
    bb: &mut Vec<usize>,
    n: usize,
) {
    if st.child_count(ji) < 2 || ji == n {
        return;
    }

    let main_be = normal_ibe(st, ii).find(|&b| st.back_edge(b).src() == ji);

    let mut direct = Vec::new(); // a bracket lands on ji itself
    let mut detour = Vec::new();
    for c_idx in st.children(ji) {
        let mut count = 0;
        let mut has_br_into_ji = false;
        for &b in tm.brackets(c_idx) {
            if st.back_edge(b).tgt() != ji {
                count += 1;
            } else {
                has_br_into_ji = true;
            }
        }
        if count == 1 {
            if has_br_into_ji {
                direct.push(c_idx);
            } else {
                detour.push(c_idx);
            }
        }
    }

    for c_idx in direct {
        let mut lowest = c_idx;
        for &b in tm.brackets(c_idx) {
            let be = st.back_edge(b);
            if be.tgt() != ji {
                continue;
            }
            if tm.depth[be.src()] > tm.depth[lowest] {
                lowest = be.src();
            }
        }
        debug_assert!(lowest != c_idx);
        bb.push(lowest);
    }

    for c_idx in detour {
        let brackets = tm.brackets(c_idx);
        debug_assert_eq!(brackets.len(), 1);
        let be = st.back_edge(brackets[0]);
        let (src, tgt) = (be.src(), be.tgt());

        // the path from the bracket source back to ji must branch somewhere
        let mut d = src;
        let mut branches = false;
        while d != ji {
            if st.child_count(d) > 1 {
                branches = true;
                break;
            }
            d = st.parent(d);
        }

        let alpha_br = tm.brackets(tgt);
        if !alpha_br.is_empty() && main_be.is_some() {
            continue;
        }
        if alpha_br.len() != 1 {
            continue;
        }

        if branches {
            bb.push(d);
        }
    }
}

fn with_zi(
    st: &SpanningTree,
    tm: &TreeMeta,
    res: &mut Vec<ConcealedVertex>,
    m: usize,
    n: usize,
    ii: usize,
    ji: usize,
    fl_v_idx: usize,
) {
    let tb = zi_trunk(st, tm, m, n, ii, ji);
    if tb != usize::MAX {
        res.push(gen_zi_concealed(st, ji, tb, ConcealedKind::ZiTrunk, fl_v_idx));
    }

    let mut bb = Vec::new();
    zi_branches(st, tm, ii, ji, &mut bb, n);
    for b in bb {
        res.push(gen_zi_concealed(st, ji, b, ConcealedKind::ZiBranch, fl_v_idx));
    }
}

/*
 * vertex construction
 */

/// Orientation of a concealed boundary anchored at `sl_st`, read off whether
/// the anchor hangs on its black edge or carries it below.
fn anchor_orientation(st: &SpanningTree, sl_st: usize, flip: bool) -> Orientation {
    let from_black = st.parent_edge(sl_st).color() == EdgeColor::Black;
    let rightward = st.vertex(sl_st).tag() == SideTag::Right;
    let o = if from_black == rightward {
        Orientation::Forward
    } else {
        Orientation::Reverse
    };
    if flip { o.flip() } else { o }
}

fn gen_ai_concealed(
    st: &SpanningTree,
    ai_st: usize,
    tb: SrcLca,
    kind: ConcealedKind,
    fl_v_idx: usize,
) -> ConcealedVertex {
    let sl_st = tb.lca;

    let fl_v = st.vertex(ai_st);
    let fl_o = if fl_v.tag() == SideTag::Right {
        Orientation::Forward
    } else {
        Orientation::Reverse
    };
    let fl_b = OrientedId::new(fl_v.seg_id(), fl_o);

    let sl_o = anchor_orientation(st, sl_st, kind == ConcealedKind::AiBranch);
    let sl_b = OrientedId::new(st.vertex(sl_st).seg_id(), sl_o);

    let bounds = match kind {
        ConcealedKind::AiTrunk => {
            if st.is_desc(ai_st, tb.src) {
                Bounds {
                    upper: ai_st,
                    lower: tb.src,
                }
            } else {
                Bounds {
                    upper: tb.src,
                    lower: ai_st,
                }
            }
        }
        _ => Bounds {
            upper: sl_st,
            lower: usize::MAX,
        },
    };

    ConcealedVertex {
        boundary: Boundary::forwardised(fl_b, sl_b),
        bounds,
        flubble: fl_v_idx,
        kind,
        anchor: sl_st,
    }
}

fn gen_zi_concealed(
    st: &SpanningTree,
    zi_st: usize,
    sl_st: usize,
    kind: ConcealedKind,
    fl_v_idx: usize,
) -> ConcealedVertex {
    let fl_v = st.vertex(zi_st);
    let fl_o = if fl_v.tag() == SideTag::Left {
        Orientation::Forward
    } else {
        Orientation::Reverse
    };

    let sl_o = anchor_orientation(st, sl_st, false);

    let (a, z) = if sl_o == Orientation::Reverse && fl_o == Orientation::Reverse {
        (
            OrientedId::new(fl_v.seg_id(), Orientation::Forward),
            OrientedId::new(st.vertex(sl_st).seg_id(), Orientation::Forward),
        )
    } else {
        (
            OrientedId::new(fl_v.seg_id(), fl_o),
            OrientedId::new(st.vertex(sl_st).seg_id(), sl_o),
        )
    };

    let bounds = if st.is_desc(zi_st, sl_st) {
        Bounds {
            upper: zi_st,
            lower: sl_st,
        }
    } else {
        Bounds {
            upper: sl_st,
            lower: zi_st,
        }
    };

    ConcealedVertex {
        boundary: Boundary { a, z },
        bounds,
        flubble: fl_v_idx,
        kind,
        anchor: sl_st,
    }
}

/*
 * nesting into the PVST
 */

fn is_nestable(pvst: &Pvst, v_idx: usize) -> bool {
    pvst.vertex(v_idx).as_flubble().is_some()
}

fn reparent(pvst: &mut Pvst, fl_v_idx: usize, sl_v_idx: usize, c_v_idx: usize) {
    pvst.del_edge(fl_v_idx, c_v_idx);
    pvst.add_edge(sl_v_idx, c_v_idx);
}

fn nest_trunk_ai(
    st: &SpanningTree,
    pvst: &mut Pvst,
    tm: &TreeMeta,
    sl_st: usize,
    fl_v_idx: usize,
    sl_v_idx: usize,
    ch: &[usize],
) {
    for &c_v_idx in ch {
        if !is_nestable(pvst, c_v_idx) {
            continue;
        }
        let f = *pvst.vertex(c_v_idx).as_flubble().unwrap();

        let above_anchor = tm.depth[sl_st] > tm.depth[f.zi];
        let from_anchor_branch = st.is_desc(sl_st, f.ai);
        if above_anchor || from_anchor_branch {
            reparent(pvst, fl_v_idx, sl_v_idx, c_v_idx);
        }
    }
}

/// The child lies under the anchor and a bracket of it lands on `ai`.
fn nest_branch_ai(
    st: &SpanningTree,
    pvst: &mut Pvst,
    tm: &TreeMeta,
    sl_st: usize,
    fl_v_idx: usize,
    sl_v_idx: usize,
    ai: usize,
    ch: &[usize],
) {
    for &c_v_idx in ch {
        if !is_nestable(pvst, c_v_idx) {
            continue;
        }
        let f = *pvst.vertex(c_v_idx).as_flubble().unwrap();

        let under_anchor = st.is_desc(sl_st, f.ai);
        let lands_on_ai = tm
            .brackets(f.zi)
            .iter()
            .any(|&b| st.back_edge(b).tgt() == ai);
        if under_anchor && lands_on_ai {
            reparent(pvst, fl_v_idx, sl_v_idx, c_v_idx);
        }
    }
}

/// The child lies between `n` and the region exit.
fn nest_trunk_zi(
    st: &SpanningTree,
    pvst: &mut Pvst,
    n: usize,
    fl_v_idx: usize,
    sl_v_idx: usize,
    zi: usize,
    ch: &[usize],
) {
    for &c_v_idx in ch {
        if !is_nestable(pvst, c_v_idx) {
            continue;
        }
        let f = *pvst.vertex(c_v_idx).as_flubble().unwrap();

        let below_n = st.is_desc(n, f.ai);
        let above_exit = !st.is_desc(zi, f.zi);
        if below_n && above_exit {
            reparent(pvst, fl_v_idx, sl_v_idx, c_v_idx);
        }
    }
}

fn nest_branch_zi(
    st: &SpanningTree,
    pvst: &mut Pvst,
    sl_st: usize,
    fl_v_idx: usize,
    sl_v_idx: usize,
    ch: &[usize],
) {
    for &c_v_idx in ch {
        if !is_nestable(pvst, c_v_idx) {
            continue;
        }
        let f = *pvst.vertex(c_v_idx).as_flubble().unwrap();

        if st.is_desc(f.ai, sl_st) {
            reparent(pvst, fl_v_idx, sl_v_idx, c_v_idx);
        }
    }
}

fn apply(st: &SpanningTree, pvst: &mut Pvst, tm: &TreeMeta, group: &ConcealedGroup) {
    let fl_v_idx = group.fl_v_idx;
    let was_leaf = pvst.is_leaf(fl_v_idx);
    let fl = *pvst.vertex(fl_v_idx).as_flubble().unwrap();

    for sl in &group.ai_adj {
        let sl_v_idx = pvst.add_vertex(PvstVertex::Concealed(*sl));
        pvst.add_edge(fl_v_idx, sl_v_idx);

        if !was_leaf {
            let ch: Vec<usize> = pvst.children(fl_v_idx).to_vec();
            match sl.kind {
                ConcealedKind::AiTrunk => {
                    nest_trunk_ai(st, pvst, tm, sl.anchor, fl_v_idx, sl_v_idx, &ch)
                }
                ConcealedKind::AiBranch => {
                    nest_branch_ai(st, pvst, tm, sl.anchor, fl_v_idx, sl_v_idx, fl.ai, &ch)
                }
                _ => unreachable!(),
            }
        }
    }

    for sl in &group.zi_adj {
        let sl_v_idx = pvst.add_vertex(PvstVertex::Concealed(*sl));
        pvst.add_edge(fl_v_idx, sl_v_idx);

        if !was_leaf {
            let ch: Vec<usize> = pvst.children(fl_v_idx).to_vec();
            match sl.kind {
                ConcealedKind::ZiTrunk => {
                    nest_trunk_zi(st, pvst, group.n, fl_v_idx, sl_v_idx, fl.zi, &ch)
                }
                ConcealedKind::ZiBranch => {
                    nest_branch_zi(st, pvst, sl.anchor, fl_v_idx, sl_v_idx, &ch)
                }
                _ => unreachable!(),
            }
        }
    }
}

/// Finds concealed sub-regions of every flubble-like region and hangs them
/// (and any flubbles they enclose) into the PVST.
pub fn find_concealed(st: &SpanningTree, pvst: &mut Pvst, tm: &TreeMeta) {
    let mut groups: Vec<ConcealedGroup> = Vec::new();

    for v_idx in pvst.iter_idx() {
        let (ai, zi) = match pvst.vertex(v_idx).as_flubble() {
            Some(f) => (f.ai, f.zi),
            None => continue,
        };

        let m = compute_m(st, tm, ai, zi);
        let n = compute_n(st, tm, ai, zi);
        {
            let f = pvst.vertex_mut(v_idx).as_flubble_mut().unwrap();
            f.m = m;
            f.n = n;
        }

        if !can_contain(st, tm, ai, zi, m, n) {
            continue;
        }

        let mut group = ConcealedGroup {
            fl_v_idx: v_idx,
            ai_adj: Vec::new(),
            zi_adj: Vec::new(),
            n,
        };
        with_ai(st, tm, &mut group.ai_adj, m, n, ai, zi, v_idx);
        with_zi(st, tm, &mut group.zi_adj, m, n, ai, zi, v_idx);

        if group.ai_adj.len() + group.zi_adj.len() > 0 {
            groups.push(group);
        }
    }

    for group in &groups {
        apply(st, pvst, tm, group);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::biedged::BiedgedGraph;
    use crate::refine_blocks::tiny;
    use crate::testing::graphs;
    use crate::{cycle_equiv, flubble_tree};

    fn pipeline(
        g: &crate::bidirected::BidirectedGraph,
    ) -> (SpanningTree, TreeMeta, Pvst) {
        let bg = BiedgedGraph::from_bidirected(g).unwrap();
        let mut st = SpanningTree::from_biedged(&bg);
        cycle_equiv::classify(&mut st);
        let mut pvst = flubble_tree::build(&st);
        let tm = TreeMeta::build(&st);
        tiny::find_tiny(&st, &mut pvst, &tm);
        find_concealed(&st, &mut pvst, &tm);
        (st, tm, pvst)
    }

    #[test]
    fn test_plain_bubble_has_no_concealed() {
        let (_, _, pvst) = pipeline(&graphs::bubble());
        assert!(
            pvst.iter_idx()
                .all(|v| !matches!(pvst.vertex(v), PvstVertex::Concealed(_)))
        );
    }

    #[test]
    fn test_nested_bubble_has_no_concealed() {
        let (_, _, pvst) = pipeline(&graphs::nested_bubble());
        assert!(
            pvst.iter_idx()
                .all(|v| !matches!(pvst.vertex(v), PvstVertex::Concealed(_)))
        );
    }

    #[test]
    fn test_m_n_recorded_on_flubbles() {
        let (_, _, pvst) = pipeline(&graphs::bubble());
        let f = pvst.vertex(1).as_flubble().unwrap();
        // nothing meets above, nothing lands below: the region is its own
        // frame
        assert_eq!(f.m, f.ai);
        assert_eq!(f.n, f.zi);
    }

    #[test]
    fn test_seven_segment_concealed_region() {
        let (st, _, pvst) = pipeline(&graphs::seven_segment());

        let concealed: Vec<usize> = pvst
            .iter_idx()
            .filter(|&v| matches!(pvst.vertex(v), PvstVertex::Concealed(_)))
            .collect();
        assert_eq!(concealed.len(), 1);

        let cn_idx = concealed[0];
        let cn = match pvst.vertex(cn_idx) {
            PvstVertex::Concealed(c) => *c,
            _ => unreachable!(),
        };
        assert_eq!(cn.kind, ConcealedKind::ZiTrunk);
        assert_eq!(st.vertex(cn.anchor).seg_id(), 4);

        // the concealed region hangs under the outer flubble and adopts the
        // inner tiny region it encloses
        let outer = pvst
            .iter_idx()
            .find(|&v| pvst.vertex(v).label() == ">1>7")
            .unwrap();
        let inner = pvst
            .iter_idx()
            .find(|&v| pvst.vertex(v).label() == ">4>6")
            .unwrap();
        assert_eq!(pvst.parent(cn_idx), outer);
        assert_eq!(pvst.parent(inner), cn_idx);
        assert!(matches!(pvst.vertex(inner), PvstVertex::Tiny(_)));
    }

    #[test]
    fn test_refinement_never_removes_vertices() {
        for seed in 0..15 {
            let g = graphs::random_bidirected(9, 13, seed);
            for comp in g.componentize() {
                let bg = match BiedgedGraph::from_bidirected(&comp) {
                    Ok(bg) => bg,
                    Err(_) => continue,
                };
                let mut st = SpanningTree::from_biedged(&bg);
                cycle_equiv::classify(&mut st);
                let mut pvst = flubble_tree::build(&st);
                let before = pvst.vtx_count();
                let tm = TreeMeta::build(&st);
                tiny::find_tiny(&st, &mut pvst, &tm);
                find_concealed(&st, &mut pvst, &tm);
                assert!(pvst.vtx_count() >= before);

                // every vertex still reaches the root
                for v in pvst.iter_idx() {
                    let mut cur = v;
                    let mut hops = 0;
                    while cur != pvst.root_idx() {
                        cur = pvst.parent(cur);
                        hops += 1;
                        assert!(hops <= pvst.vtx_count());
                    }
                }
            }
        }
    }
}
