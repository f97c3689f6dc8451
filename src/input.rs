use crate::bidirected::{BidirectedGraph, RefStep};
use crate::decompose::DecomposeError;
use crate::types::{Boundary, Orientation, OrientedId, VertexEnd};
use hashbrown::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader, Cursor};

/// This is equivalent to [`from_str`], but takes a file path as the input.
pub fn from_file(path: &str) -> Result<BidirectedGraph, DecomposeError> {
    let file = File::open(path)?;
    parse_gfa(BufReader::new(file))
}

/// Reads a bidirected graph from GFA-1 text.
///
/// - `S` lines contribute one sequence vertex each; segment names must be
///   numeric.
/// - `L` lines contribute one side-to-side edge; the `+`/`-` orientations of
///   source and sink pick the sides.
/// - `P` lines contribute reference haplotypes, recorded as per-vertex
///   placements.
///
/// Other record types are skipped. Tip sides are recorded once the whole
/// stream is read.
pub fn from_str(input: &str) -> Result<BidirectedGraph, DecomposeError> {
    parse_gfa(BufReader::new(Cursor::new(input)))
}

fn malformed(line: usize, msg: impl Into<String>) -> DecomposeError {
    DecomposeError::InputMalformed {
        line,
        msg: msg.into(),
    }
}

fn parse_seg_id(tok: &str, line_no: usize) -> Result<u64, DecomposeError> {
    tok.parse()
        .map_err(|_| malformed(line_no, format!("segment name '{}' is not numeric", tok)))
}

/// The side of a segment a link attaches to: leaving a forward segment uses
/// its right end, leaving a reverse one its left end; entering mirrors this.
fn link_ends(
    from_orient: &str,
    to_orient: &str,
    line_no: usize,
) -> Result<(VertexEnd, VertexEnd), DecomposeError> {
    let from_end = match from_orient {
        "+" => VertexEnd::Right,
        "-" => VertexEnd::Left,
        o => return Err(malformed(line_no, format!("bad orientation '{}'", o))),
    };
    let to_end = match to_orient {
        "+" => VertexEnd::Left,
        "-" => VertexEnd::Right,
        o => return Err(malformed(line_no, format!("bad orientation '{}'", o))),
    };
    Ok((from_end, to_end))
}

fn parse_gfa<R: BufRead>(reader: R) -> Result<BidirectedGraph, DecomposeError> {
    let mut g = BidirectedGraph::new();
    let mut seen_ids: HashSet<u64> = HashSet::new();
    // (line_no, from, from_end, to, to_end)
    let mut links: Vec<(usize, u64, VertexEnd, u64, VertexEnd)> = Vec::new();
    // (line_no, name, steps)
    let mut paths: Vec<(usize, String, String)> = Vec::new();

    for (idx, line) in reader.lines().enumerate() {
        let line_no = idx + 1;
        let line = line?;
        let line = line.trim_end();
        if line.is_empty() {
            continue;
        }

        let fields: Vec<&str> = line.split('\t').collect();
        match fields[0] {
            "S" => {
                if fields.len() < 3 {
                    return Err(malformed(line_no, "S line needs a name and a sequence"));
                }
                let id = parse_seg_id(fields[1], line_no)?;
                if !seen_ids.insert(id) {
                    return Err(malformed(line_no, format!("duplicate segment {}", id)));
                }
                g.add_vertex(id, fields[2].to_string());
            }
            "L" => {
                if fields.len() < 5 {
                    return Err(malformed(line_no, "L line needs source and sink"));
                }
                let from = parse_seg_id(fields[1], line_no)?;
                let to = parse_seg_id(fields[3], line_no)?;
                let (from_end, to_end) = link_ends(fields[2], fields[4], line_no)?;
                links.push((line_no, from, from_end, to, to_end));
            }
            "P" => {
                if fields.len() < 3 {
                    return Err(malformed(line_no, "P line needs a name and segments"));
                }
                paths.push((line_no, fields[1].to_string(), fields[2].to_string()));
            }
            _ => {} // headers, containments etc.
        }
    }

    for (line_no, from, from_end, to, to_end) in links {
        for id in [from, to] {
            if !seen_ids.contains(&id) {
                return Err(malformed(line_no, format!("link references unknown segment {}", id)));
            }
        }
        g.add_edge(from, from_end, to, to_end);
    }

    for (line_no, name, steps) in paths {
        let path_id = g.add_path(name, false);
        for (step, tok) in steps.split(',').enumerate() {
            if tok.len() < 2 {
                return Err(malformed(line_no, format!("bad path step '{}'", tok)));
            }
            let (id_str, orient) = tok.split_at(tok.len() - 1);
            let strand = match orient {
                "+" => Orientation::Forward,
                "-" => Orientation::Reverse,
                _ => return Err(malformed(line_no, format!("bad path step '{}'", tok))),
            };
            let id = parse_seg_id(id_str, line_no)?;
            if !seen_ids.contains(&id) {
                return Err(malformed(line_no, format!("path references unknown segment {}", id)));
            }
            g.add_ref(
                id,
                RefStep {
                    path_id,
                    strand,
                    step,
                },
            );
        }
    }

    g.record_tips();
    Ok(g)
}

/// Parses an oriented-boundary label like `>1>4` or `<2>5`.
fn parse_boundary(label: &str, line_no: usize) -> Result<Boundary, DecomposeError> {
    let bytes = label.as_bytes();
    let first = bytes
        .iter()
        .position(|&b| b == b'>' || b == b'<')
        .ok_or_else(|| malformed(line_no, format!("bad boundary label '{}'", label)))?;
    let last = bytes
        .iter()
        .rposition(|&b| b == b'>' || b == b'<')
        .unwrap();
    if first == last {
        return Err(malformed(line_no, format!("bad boundary label '{}'", label)));
    }

    let orient = |b: u8| {
        if b == b'>' {
            Orientation::Forward
        } else {
            Orientation::Reverse
        }
    };
    let a_id = parse_seg_id(&label[first + 1..last], line_no)?;
    let z_id = parse_seg_id(&label[last + 1..], line_no)?;

    Ok(Boundary {
        a: OrientedId::new(a_id, orient(bytes[first])),
        z: OrientedId::new(z_id, orient(bytes[last])),
    })
}

/// Reads the boundary pairs of the leaf regions out of `.flb` text, the
/// form downstream walk enumeration consumes.
pub fn read_flb_leaves(input: &str) -> Result<Vec<Boundary>, DecomposeError> {
    let mut leaves = Vec::new();

    for (idx, line) in input.lines().enumerate() {
        let line_no = idx + 1;
        let line = line.trim_end();
        if line.is_empty() {
            continue;
        }

        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() != 4 {
            return Err(malformed(line_no, "flb records have four columns"));
        }
        if fields[0] == "H" {
            continue;
        }

        // only non-dummy leaves carry an enumerable region
        if fields[2] == "." || fields[3] != "." {
            continue;
        }

        leaves.push(parse_boundary(fields[2], line_no)?);
    }

    Ok(leaves)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decompose::{decompose, Context};

    const BUBBLE_GFA: &str = "\
H\tVN:Z:1.0
S\t1\tA
S\t2\tC
S\t3\tG
S\t4\tT
L\t1\t+\t2\t+\t0M
L\t1\t+\t3\t+\t0M
L\t2\t+\t4\t+\t0M
L\t3\t+\t4\t+\t0M
P\tref\t1+,2+,4+\t*
";

    #[test]
    fn test_parse_bubble() {
        let g = from_str(BUBBLE_GFA).unwrap();
        assert_eq!(g.vtx_count(), 4);
        assert_eq!(g.edge_count(), 4);
        assert_eq!(g.tips().len(), 2);
        assert_eq!(g.paths().len(), 1);

        let v1 = g.vertex(g.v_id_to_idx(1).unwrap());
        assert_eq!(v1.label(), "A");
        assert_eq!(v1.refs().len(), 1);
        assert_eq!(v1.refs()[0].step, 0);
        assert_eq!(v1.refs()[0].strand, Orientation::Forward);
    }

    #[test]
    fn test_parse_reverse_link_sides() {
        // 1+ -> 2-: right of 1 to right of 2
        let g = from_str("S\t1\tA\nS\t2\tC\nL\t1\t+\t2\t-\t0M\n").unwrap();
        let e = g.edge(0);
        assert_eq!(e.v1().1, VertexEnd::Right);
        assert_eq!(e.v2().1, VertexEnd::Right);
    }

    #[test]
    fn test_end_to_end_from_gfa() {
        let g = from_str(BUBBLE_GFA).unwrap();
        let results = decompose(&g, &Context::default());
        assert_eq!(results.len(), 1);
        let r = results[0].as_ref().unwrap();
        assert_eq!(r.pvst.vertex(1).label(), ">1>4");
    }

    #[test]
    fn test_flb_leaves_roundtrip() {
        let g = from_str(BUBBLE_GFA).unwrap();
        let results = decompose(&g, &Context::default());
        let flb = crate::output::to_flb_string(&results[0].as_ref().unwrap().pvst);

        let leaves = read_flb_leaves(&flb).unwrap();
        assert_eq!(leaves.len(), 1);
        assert_eq!(leaves[0].to_string(), ">1>4");
    }

    #[test]
    fn test_malformed_lines_rejected() {
        assert!(matches!(
            from_str("S\t1\n").unwrap_err(),
            DecomposeError::InputMalformed { line: 1, .. }
        ));
        assert!(matches!(
            from_str("S\t1\tA\nL\t1\t+\t2\t+\t0M\n").unwrap_err(),
            DecomposeError::InputMalformed { line: 2, .. }
        ));
        assert!(matches!(
            from_str("S\tx\tA\n").unwrap_err(),
            DecomposeError::InputMalformed { .. }
        ));
    }
}
