/// Which end of a sequence vertex an edge attaches to.
///
/// `Left` is the 5' end, `Right` is the 3' end.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum VertexEnd {
    Left,
    Right,
}

impl VertexEnd {
    pub fn complement(self) -> Self {
        match self {
            VertexEnd::Left => VertexEnd::Right,
            VertexEnd::Right => VertexEnd::Left,
        }
    }
}

impl std::fmt::Display for VertexEnd {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VertexEnd::Left => write!(f, "l"),
            VertexEnd::Right => write!(f, "r"),
        }
    }
}

/// Strand of a walk through a sequence vertex.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum Orientation {
    Forward,
    Reverse,
}

impl Orientation {
    pub fn flip(self) -> Self {
        match self {
            Orientation::Forward => Orientation::Reverse,
            Orientation::Reverse => Orientation::Forward,
        }
    }
}

impl std::fmt::Display for Orientation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Orientation::Forward => write!(f, ">"),
            Orientation::Reverse => write!(f, "<"),
        }
    }
}

/// Color of an edge in the biedged graph and the spanning tree.
///
/// Black edges carry sequence (one per sequence vertex), gray edges carry
/// adjacencies.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum EdgeColor {
    Gray,
    Black,
}

impl std::fmt::Display for EdgeColor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EdgeColor::Gray => write!(f, "gray"),
            EdgeColor::Black => write!(f, "black"),
        }
    }
}

/// Which biedged vertex a spanning-tree vertex reflects.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum SideTag {
    Left,
    Right,
    Dummy,
}

/// A sequence vertex id together with the strand it is entered on.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct OrientedId {
    pub id: u64,
    pub orientation: Orientation,
}

impl OrientedId {
    pub fn new(id: u64, orientation: Orientation) -> Self {
        Self { id, orientation }
    }
}

impl std::fmt::Display for OrientedId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.orientation, self.id)
    }
}

/// An oriented boundary pair `(a, z)` of a region of variation.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Boundary {
    pub a: OrientedId,
    pub z: OrientedId,
}

impl Boundary {
    /// Canonical form: when both orientations are reverse, the pair is
    /// swapped and both orientations flipped to forward.
    pub fn forwardised(a: OrientedId, z: OrientedId) -> Self {
        if a.orientation == Orientation::Reverse && z.orientation == Orientation::Reverse {
            Self {
                a: OrientedId::new(z.id, Orientation::Forward),
                z: OrientedId::new(a.id, Orientation::Forward),
            }
        } else {
            Self { a, z }
        }
    }
}

impl std::fmt::Display for Boundary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.a, self.z)
    }
}

/// Wrapper for petgraph's graph type, used for interop and DOT output.
pub type UnGraph = petgraph::graph::UnGraph<String, EdgeColor>;
