use crate::pvst::Pvst;
use crate::spanning_tree::{BackEdgeType, SpanningTree};
use crate::types::{EdgeColor, UnGraph};
use petgraph::dot::{Config, Dot};
use std::io::Write;

/// Version tag written to `.flb` headers.
pub const FLB_VERSION: &str = "0.1";

/// Writes the PVST of one component in the line-oriented `.flb` format.
///
/// First record: `H\t<version>\t.\t.`. Then one record per node:
/// `<kind>\t<index>\t<label>\t<children-or-dot>` where the kind letter is
/// one of `R F T P C S`, the label is the canonical oriented-boundary
/// string, and the last column is a comma-separated child index list or `.`
/// for a leaf.
pub fn write_flb<W: Write>(pvst: &Pvst, out: &mut W) -> std::io::Result<()> {
    writeln!(out, "H\t{}\t.\t.", FLB_VERSION)?;

    for v_idx in pvst.iter_idx() {
        let v = pvst.vertex(v_idx);
        let children = if pvst.is_leaf(v_idx) {
            ".".to_string()
        } else {
            pvst.children(v_idx)
                .iter()
                .map(|c| c.to_string())
                .collect::<Vec<_>>()
                .join(",")
        };
        writeln!(out, "{}\t{}\t{}\t{}", v.kind_letter(), v_idx, v.label(), children)?;
    }

    Ok(())
}

/// [`write_flb`] into a fresh string.
pub fn to_flb_string(pvst: &Pvst) -> String {
    let mut buf = Vec::new();
    write_flb(pvst, &mut buf).expect("writing to a vec should not fail");
    String::from_utf8(buf).expect("flb output is ascii")
}

/// Wrapper for petgraph::dot::Dot over a biedged-graph view.
///
/// Black (sequence) edges are solid, gray (adjacency) edges are dashed.
pub fn to_dot_str(graph: &UnGraph) -> String {
    Dot::with_attr_getters(
        graph,
        &[Config::EdgeNoLabel, Config::NodeNoLabel],
        &|_, edge_ref| {
            if *edge_ref.weight() == EdgeColor::Gray {
                "style=dashed".to_string()
            } else {
                "style=solid".to_string()
            }
        },
        &|g, node_ref| {
            format!(
                "label=\"{}\", style=filled, fillcolor=lightblue",
                g.node_weight(node_ref.0).unwrap()
            )
        },
    )
    .to_string()
}

/// Returns the spanning tree in DOT format: tree edges solid, back edges
/// dotted, capping back edges red, simplifying blue.
///
/// Use the returned string with `dot` not `neato`.
pub fn spanning_tree_dot(t: &SpanningTree) -> String {
    let mut out = String::new();
    out.push_str("graph G {\n  rankdir = LR;\n  node [shape = circle];\n");

    for v_idx in 0..t.vtx_count() {
        let v = t.vertex(v_idx);
        if v.seg_id() == u64::MAX {
            out.push_str(&format!("  {} [style=filled, fillcolor=pink];\n", v_idx));
        } else {
            let sign = match v.tag() {
                crate::types::SideTag::Left => "+",
                _ => "-",
            };
            out.push_str(&format!(
                "  {} [label=\"{} ({}{})\"];\n",
                v_idx,
                v_idx,
                v.seg_id(),
                sign
            ));
        }
    }

    for e_idx in 0..t.tree_edge_count() {
        let e = t.tree_edge(e_idx);
        let cls = if e.is_classified() {
            e.class().to_string()
        } else {
            String::new()
        };
        out.push_str(&format!(
            "  {} -- {} [label=\"{} {}\" color={}];\n",
            e.parent(),
            e.child(),
            e.id(),
            cls,
            e.color()
        ));
    }

    for b_idx in 0..t.back_edge_count() {
        let be = t.back_edge(b_idx);
        let color = match be.ty() {
            BackEdgeType::Capping => "red",
            BackEdgeType::Simplifying => "blue",
            BackEdgeType::Normal => "gray",
        };
        let cls = if be.is_classified() {
            be.class().to_string()
        } else {
            String::new()
        };
        out.push_str(&format!(
            "  {} -- {} [label=\"{} {}\" style=\"dotted\" color=\"{}\"];\n",
            be.src(),
            be.tgt(),
            be.id(),
            cls,
            color
        ));
    }

    out.push_str("}\n");
    out
}

/// Returns the PVST in DOT format, labelled with kind letters and
/// boundaries.
pub fn pvst_dot(pvst: &Pvst) -> String {
    let mut out = String::new();
    out.push_str("graph G {\n  rankdir = TD;\n  node [shape = circle];\n");

    for v_idx in pvst.iter_idx() {
        out.push_str(&format!(
            "  {} [label=\"{} {}\"];\n",
            v_idx,
            pvst.vertex(v_idx).kind_letter(),
            pvst.vertex(v_idx).label()
        ));
    }
    for v_idx in pvst.iter_idx() {
        for &c in pvst.children(v_idx) {
            out.push_str(&format!("  {} -- {};\n", v_idx, c));
        }
    }

    out.push_str("}\n");
    out
}

/// Writes a string to a file.
pub fn to_file(content: &str, path: &str) -> std::io::Result<()> {
    std::fs::write(path, content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::biedged::BiedgedGraph;
    use crate::decompose::{decompose, Context};
    use crate::testing::graphs;

    #[test]
    fn test_flb_nested_bubble() {
        let g = graphs::nested_bubble();
        let results = decompose(&g, &Context::default());
        let r = results[0].as_ref().unwrap();

        let flb = to_flb_string(&r.pvst);
        let expected = "\
H\t0.1\t.\t.
R\t0\t.\t1
F\t1\t>1>4\t2
T\t2\t>2>3\t.
";
        assert_eq!(flb, expected);
    }

    #[test]
    fn test_flb_dummy_only() {
        let g = graphs::chain(2);
        let results = decompose(&g, &Context::default());
        let r = results[0].as_ref().unwrap();
        assert_eq!(to_flb_string(&r.pvst), "H\t0.1\t.\t.\nR\t0\t.\t.\n");
    }

    #[test]
    fn test_dot_outputs_render_all_vertices() {
        let g = graphs::bubble();
        let bg = BiedgedGraph::from_bidirected(&g).unwrap();
        let dot = to_dot_str(&bg.to_petgraph());
        assert!(dot.contains("style=dashed"));
        assert!(dot.contains("1+"));

        let results = decompose(&g, &Context::default());
        let r = results[0].as_ref().unwrap();
        let dot = pvst_dot(&r.pvst);
        assert!(dot.contains(">1>4"));
    }
}
