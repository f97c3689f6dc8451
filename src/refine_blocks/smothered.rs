use crate::pvst::{Bounds, ConcealedKind, ConcealedVertex, Pvst, PvstVertex, SmotheredSide,
                  SmotheredVertex};
use crate::refine_blocks::tree_meta::TreeMeta;
use crate::spanning_tree::SpanningTree;
use crate::types::{Boundary, Orientation, OrientedId, SideTag};
use hashbrown::HashSet;
use std::collections::BTreeMap;

struct SmotheredGroup {
    cn_v_idx: usize,
    g_adj: Vec<SmotheredVertex>,
    s_adj: Vec<SmotheredVertex>,
}

/// Boundary contributed by a spanning-tree vertex flanking a smothered
/// region.
fn flank_boundary(st: &SpanningTree, v_idx: usize) -> OrientedId {
    let v = st.vertex(v_idx);
    let o = if v.tag() == SideTag::Left {
        Orientation::Reverse
    } else {
        Orientation::Forward
    };
    OrientedId::new(v.seg_id(), o)
}

fn compute_bounds(st: &SpanningTree, a: usize, b: usize) -> Bounds {
    if st.is_desc(a, b) {
        Bounds { upper: a, lower: b }
    } else {
        Bounds { upper: b, lower: a }
    }
}

fn is_nesting(st: &SpanningTree, outer: &Bounds, inner: &Bounds) -> bool {
    st.is_desc(outer.upper, inner.upper) && st.is_desc(inner.lower, outer.lower)
}

/*
 * neighbours of the anchor-side (g) boundary
 */

fn g_trunk(
    st: &SpanningTree,
    pvst: &Pvst,
    cn: &ConcealedVertex,
    cn_v_idx: usize,
    tm: &TreeMeta,
    res: &mut Vec<SmotheredVertex>,
) {
    let fl = pvst.vertex(cn.flubble).as_flubble().unwrap();
    let ai_st = fl.ai;
    let zi = fl.zi;
    let sl_st = cn.anchor;

    for c_idx in st.children(sl_st) {
        let mut br_srcs: HashSet<usize> = HashSet::new();
        let mut last_be = usize::MAX;
        for &be_idx in tm.brackets(c_idx) {
            last_be = be_idx;
            br_srcs.insert(st.back_edge(be_idx).src());
        }
        if last_be == usize::MAX {
            continue;
        }

        let tgt = st.back_edge(last_be).tgt();
        let src = st.back_edge(last_be).src();

        let branch_vtx = tm.lca(&[zi, src]);
        let bounds = Bounds {
            upper: branch_vtx,
            lower: src,
        };

        if br_srcs.len() == 1 && tm.depth[tgt] > tm.depth[ai_st] {
            let g = cn.boundary.z;
            if tm.brackets(src).is_empty() {
                res.push(SmotheredVertex {
                    boundary: Boundary {
                        a: g,
                        z: flank_boundary(st, tgt),
                    },
                    bounds,
                    concealed: cn_v_idx,
                    side: SmotheredSide::G,
                    from_branch: false,
                    anchor: tgt,
                });
            } else {
                res.push(SmotheredVertex {
                    boundary: Boundary {
                        a: g,
                        z: flank_boundary(st, src),
                    },
                    bounds,
                    concealed: cn_v_idx,
                    side: SmotheredSide::G,
                    from_branch: true,
                    anchor: src,
                });
            }
        }
    }
}

fn g_branch(
    st: &SpanningTree,
    pvst: &Pvst,
    cn: &ConcealedVertex,
    cn_v_idx: usize,
    tm: &TreeMeta,
    res: &mut Vec<SmotheredVertex>,
) {
    let fl = pvst.vertex(cn.flubble).as_flubble().unwrap();
    let ai_st = fl.ai;
    let sl_st = cn.anchor;

    let tgts = st.obe_tgts(sl_st);
    if tgts.len() != 1 || tgts[0] != ai_st {
        return;
    }

    for &be_idx in tm.brackets(sl_st) {
        if st.back_edge(be_idx).tgt() != ai_st {
            continue;
        }

        // a bracket of the source returning into the anchor pins the
        // smothered boundary
        for &inner_idx in tm.brackets(st.back_edge(be_idx).src()) {
            let inner = st.back_edge(inner_idx);
            if inner.tgt() != sl_st {
                continue;
            }
            let src = inner.src();
            res.push(SmotheredVertex {
                boundary: Boundary {
                    a: cn.boundary.z,
                    z: flank_boundary(st, src),
                },
                bounds: compute_bounds(st, sl_st, src),
                concealed: cn_v_idx,
                side: SmotheredSide::G,
                from_branch: true,
                anchor: src,
            });
        }
    }
}

/*
 * neighbours of the exit-side (s) boundary
 */

fn s_trunk(
    st: &SpanningTree,
    pvst: &Pvst,
    cn: &ConcealedVertex,
    cn_v_idx: usize,
    tm: &TreeMeta,
    res: &mut Vec<SmotheredVertex>,
) {
    let fl = pvst.vertex(cn.flubble).as_flubble().unwrap();
    let zi_st = fl.zi;
    let sl_st = cn.anchor;

    // group the incoming sources by where they branch off the trunk
    let mut lca_map: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for src in st.ibe_srcs(sl_st) {
        if tm.depth[src] >= tm.depth[zi_st] {
            continue;
        }
        let lca = tm.lca(&[zi_st, src]);
        if lca == src {
            // the source is on the trunk itself
            continue;
        }
        lca_map.entry(lca).or_default().push(src);
    }

    for (lca, srcs) in lca_map {
        if srcs.len() != 1 {
            continue;
        }
        let src = srcs[0];
        res.push(SmotheredVertex {
            boundary: Boundary {
                a: cn.boundary.z,
                z: flank_boundary(st, src),
            },
            bounds: Bounds {
                upper: lca,
                lower: src,
            },
            concealed: cn_v_idx,
            side: SmotheredSide::S,
            from_branch: false,
            anchor: src,
        });
    }
}

fn s_branch(
    st: &SpanningTree,
    pvst: &Pvst,
    cn: &ConcealedVertex,
    cn_v_idx: usize,
    _tm: &TreeMeta,
    res: &mut Vec<SmotheredVertex>,
) {
    let fl = pvst.vertex(cn.flubble).as_flubble().unwrap();
    let zi_st = fl.zi;
    let sl_st = cn.anchor;

    let srcs = st.ibe_srcs(sl_st);
    if srcs.is_empty() {
        return;
    }

    for src in srcs {
        for inner_src in st.ibe_srcs(src) {
            res.push(SmotheredVertex {
                boundary: Boundary {
                    a: cn.boundary.z,
                    z: flank_boundary(st, inner_src),
                },
                bounds: compute_bounds(st, inner_src, sl_st),
                concealed: cn_v_idx,
                side: SmotheredSide::S,
                from_branch: true,
                anchor: inner_src,
            });
        }

        for tgt in st.obe_tgts(src) {
            if tgt == zi_st {
                continue;
            }
            res.push(SmotheredVertex {
                boundary: Boundary {
                    a: cn.boundary.z,
                    z: flank_boundary(st, tgt),
                },
                bounds: compute_bounds(st, tgt, sl_st),
                concealed: cn_v_idx,
                side: SmotheredSide::S,
                from_branch: false,
                anchor: tgt,
            });
        }
    }
}

/// Moves the concealed vertex's enclosed children under a freshly added
/// smothered vertex.
fn nest(st: &SpanningTree, pvst: &mut Pvst, cn_v_idx: usize, smo_v_idx: usize) {
    let smo_bounds = pvst.vertex(smo_v_idx).bounds();

    let ch: Vec<usize> = pvst.children(cn_v_idx).to_vec();
    for c_v_idx in ch {
        let bounds = match pvst.vertex(c_v_idx) {
            PvstVertex::Flubble(f) | PvstVertex::Tiny(f) | PvstVertex::Parallel(f) => f.bounds(),
            PvstVertex::Concealed(c) => c.bounds,
            _ => continue,
        };
        if !bounds.is_defined() {
            continue;
        }

        if is_nesting(st, &smo_bounds, &bounds) {
            pvst.del_edge(cn_v_idx, c_v_idx);
            pvst.add_edge(smo_v_idx, c_v_idx);
        }
    }
}

/// Enumerates smothered neighbours of every concealed region and hangs them
/// into the PVST.
pub fn find_smothered(st: &SpanningTree, pvst: &mut Pvst, tm: &TreeMeta) {
    let mut groups: Vec<SmotheredGroup> = Vec::new();

    for v_idx in pvst.iter_idx() {
        let cn = match pvst.vertex(v_idx) {
            PvstVertex::Concealed(c) => *c,
            _ => continue,
        };

        let mut group = SmotheredGroup {
            cn_v_idx: v_idx,
            g_adj: Vec::new(),
            s_adj: Vec::new(),
        };
        match cn.kind {
            ConcealedKind::AiTrunk => g_trunk(st, pvst, &cn, v_idx, tm, &mut group.g_adj),
            ConcealedKind::AiBranch => g_branch(st, pvst, &cn, v_idx, tm, &mut group.g_adj),
            ConcealedKind::ZiTrunk => s_trunk(st, pvst, &cn, v_idx, tm, &mut group.s_adj),
            ConcealedKind::ZiBranch => s_branch(st, pvst, &cn, v_idx, tm, &mut group.s_adj),
        }

        if group.g_adj.len() + group.s_adj.len() > 0 {
            groups.push(group);
        }
    }

    for group in groups {
        for smo in group.g_adj.into_iter().chain(group.s_adj) {
            let cn_v_idx = smo.concealed;
            let smo_v_idx = pvst.add_vertex(PvstVertex::Smothered(smo));
            pvst.add_edge(cn_v_idx, smo_v_idx);
            nest(st, pvst, cn_v_idx, smo_v_idx);
        }
    }
}
