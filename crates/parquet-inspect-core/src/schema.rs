//! Resolving column paths against the flat schema list.
//!
//! The schema is a depth-first pre-order list in which each group declares
//! how many direct children follow it. Full paths are rebuilt on the fly with
//! a stack of open groups instead of materializing a tree.

use crate::metadata::SchemaElement;

struct Frame {
    path: Vec<String>,
    remaining: usize,
}

/// Find the element whose full path matches `target`, ignoring case.
///
/// Matching is path-length-exact. A single-segment target that matches no
/// full path falls back to the first leaf with that name anywhere in the
/// schema, which is how flat legacy schemas are addressed.
pub fn resolve_path<'a, S: AsRef<str>>(
    schema: &'a [SchemaElement],
    target: &[S],
) -> Option<&'a SchemaElement> {
    if target.is_empty() || schema.is_empty() {
        return None;
    }

    let mut stack: Vec<Frame> = Vec::new();
    for element in schema.iter().skip(1) {
        while stack.last().is_some_and(|f| f.remaining == 0) {
            stack.pop();
        }
        if let Some(top) = stack.last_mut() {
            top.remaining -= 1;
        }

        let mut path = stack.last().map(|f| f.path.clone()).unwrap_or_default();
        path.push(element.name.clone());

        if path_matches(&path, target) {
            return Some(element);
        }

        if element.num_children > 0 {
            stack.push(Frame {
                path,
                remaining: element.num_children,
            });
        }
    }

    match target {
        [only] => schema
            .iter()
            .skip(1)
            .find(|e| e.is_leaf() && e.name.eq_ignore_ascii_case(only.as_ref())),
        _ => None,
    }
}

/// Split `dotted` on `.` and resolve it.
pub fn resolve_dotted<'a>(schema: &'a [SchemaElement], dotted: &str) -> Option<&'a SchemaElement> {
    if dotted.is_empty() {
        return None;
    }
    let parts: Vec<&str> = dotted.split('.').collect();
    resolve_path(schema, &parts)
}

/// Leaf elements in schema order, which is also column-chunk order.
pub fn leaves(schema: &[SchemaElement]) -> impl Iterator<Item = &SchemaElement> {
    schema.iter().skip(1).filter(|e| e.is_leaf())
}

fn path_matches<S: AsRef<str>>(path: &[String], target: &[S]) -> bool {
    path.len() == target.len()
        && path
            .iter()
            .zip(target)
            .all(|(a, b)| a.eq_ignore_ascii_case(b.as_ref()))
}
