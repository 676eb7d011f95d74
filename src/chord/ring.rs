use crate::chord::types::NodeId;

// Arcs run clockwise from a to b and wrap past 2^32; a == b spans the whole ring

/// `c` in (a, b)
pub fn ex_ex(a: NodeId, b: NodeId, c: NodeId) -> bool {
    if a < b {
        c > a && c < b
    } else {
        c > a || c < b
    }
}

/// `c` in [a, b]
pub fn in_in(a: NodeId, b: NodeId, c: NodeId) -> bool {
    if c == a || c == b {
        return true;
    }
    if a < b {
        c >= a && c <= b
    } else {
        c >= a || c <= b
    }
}

/// `c` in [a, b)
pub fn in_ex(a: NodeId, b: NodeId, c: NodeId) -> bool {
    if c == a {
        return true;
    }
    if a < b {
        c >= a && c < b
    } else {
        c >= a || c < b
    }
}

/// `c` in (a, b]
pub fn ex_in(a: NodeId, b: NodeId, c: NodeId) -> bool {
    if c == b {
        return true;
    }
    if a < b {
        c > a && c <= b
    } else {
        c > a || c <= b
    }
}
