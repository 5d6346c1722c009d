use limn_types::{ElementHandle, ElementRecord};

use crate::mirror::ElementMirror;

/// Upper bound on the ancestor walk. The feed can hand us a malformed
/// parent chain (an element reparented into its own subtree mid-mutation);
/// past this depth the walk stops and the accumulated suffix is returned as
/// a truncated path.
pub const MAX_ANCESTOR_DEPTH: usize = 128;

/// Resolves the root-to-leaf display path for `handle`.
///
/// An unknown handle yields the empty string. A known element whose
/// ancestor chain runs into an unknown handle keeps its known suffix,
/// prefixed by the separator of the missing ancestor.
pub fn resolve(mirror: &ElementMirror, handle: ElementHandle) -> String {
    let Some(record) = mirror.get(handle) else {
        return String::new();
    };

    let mut segments = vec![segment(record)];
    let mut next = record.parent;
    let mut depth = 0usize;

    while let Some(parent) = next {
        if depth >= MAX_ANCESTOR_DEPTH {
            break;
        }
        depth += 1;

        match mirror.get(parent) {
            Some(record) => {
                segments.push(segment(record));
                next = record.parent;
            }
            None => {
                // Ancestor removed or never reported: empty prefix, keep
                // the separator.
                segments.push(String::new());
                next = None;
            }
        }
    }

    segments.reverse();
    segments.join("/")
}

/// One path segment. The sibling index is appended only where it
/// disambiguates: the element has a parent and that parent reported more
/// than one child at the element's last add.
fn segment(record: &ElementRecord) -> String {
    if record.parent.is_some() && record.child_count > 1 {
        format!("{}[{}]", record.display, record.child_index)
    } else {
        record.display.to_string()
    }
}
