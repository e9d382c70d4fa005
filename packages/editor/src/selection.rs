//! # Selection Path Codec
//!
//! Captures a selection as child-index paths from a fixed root and resolves it
//! again later. Node handles do not survive a full document replacement, but
//! paths do as long as the tree keeps its shape, so this is what keeps the
//! cursor in place when content is re-rendered wholesale.

use resume_dom::{Boundary, Document, NodeId, Range, RenderingSurface};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

/// Selection stored as node paths
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedSelection {
    pub start_path: Vec<usize>,
    pub start_offset: usize,
    pub end_path: Vec<usize>,
    pub end_offset: usize,
}

#[derive(Debug, Error, PartialEq, Eq)]
enum PathError {
    #[error("no child {index} at depth {depth}")]
    MissingChild { depth: usize, index: usize },
}

/// Child-index path from `root` down to `node`
///
/// `None` when walking up from `node` never meets `root`.
pub fn node_path(doc: &Document, root: NodeId, node: NodeId) -> Option<Vec<usize>> {
    let mut path = Vec::new();
    let mut current = node;
    while current != root {
        let parent = doc.parent(current)?;
        path.push(doc.index_in_parent(current)?);
        current = parent;
    }
    path.reverse();
    Some(path)
}

fn resolve(doc: &Document, root: NodeId, path: &[usize]) -> Result<NodeId, PathError> {
    let mut current = root;
    for (depth, index) in path.iter().enumerate() {
        current = doc
            .child_at(current, *index)
            .ok_or(PathError::MissingChild {
                depth,
                index: *index,
            })?;
    }
    Ok(current)
}

/// Encode `range` relative to `root`; `None` without a range or outside `root`
pub fn capture(doc: &Document, root: NodeId, range: Option<&Range>) -> Option<SavedSelection> {
    let range = range?;
    let (Some(start_path), Some(end_path)) = (
        node_path(doc, root, range.start.node),
        node_path(doc, root, range.end.node),
    ) else {
        debug!("Selection lies outside the capture root");
        return None;
    };

    Some(SavedSelection {
        start_path,
        start_offset: range.start.offset,
        end_path,
        end_offset: range.end.offset,
    })
}

/// Resolve a saved selection against the current tree
///
/// Offsets clamp to the node's current length. Returns `None`, with a
/// warning, when a path no longer resolves.
pub fn restore(doc: &Document, root: NodeId, saved: &SavedSelection) -> Option<Range> {
    let resolved = resolve(doc, root, &saved.start_path)
        .and_then(|start| Ok((start, resolve(doc, root, &saved.end_path)?)));

    match resolved {
        Ok((start, end)) => Some(Range::new(
            Boundary::new(start, saved.start_offset.min(doc.text_length(start))),
            Boundary::new(end, saved.end_offset.min(doc.text_length(end))),
        )),
        Err(e) => {
            warn!(error = %e, "Could not restore selection");
            None
        }
    }
}

/// Restore onto a surface's live selection; leaves it untouched on failure
pub fn restore_into<S: RenderingSurface>(surface: &mut S, saved: &SavedSelection) -> bool {
    let doc = surface.document();
    match restore(doc, doc.root(), saved) {
        Some(range) => {
            surface.set_selection(Some(range));
            true
        }
        None => false,
    }
}

/// Capture a surface's live selection relative to its document root
pub fn capture_from<S: RenderingSurface>(surface: &S) -> Option<SavedSelection> {
    let doc = surface.document();
    capture(doc, doc.root(), surface.selection().as_ref())
}

#[cfg(test)]
mod tests {
    use super::*;
    use resume_dom::{ContentNode, MemorySurface};

    fn resume() -> Document {
        Document::with_body([
            ContentNode::element("h1").with_child(ContentNode::text("Jane Doe")),
            ContentNode::element("ul")
                .with_child(ContentNode::element("li").with_child(ContentNode::text("Rust")))
                .with_child(ContentNode::element("li").with_child(ContentNode::text("Go"))),
        ])
    }

    fn skill_text(doc: &Document, item: usize) -> NodeId {
        let ul = doc.child_at(doc.root(), 1).unwrap();
        let li = doc.child_at(ul, item).unwrap();
        doc.child_at(li, 0).unwrap()
    }

    #[test]
    fn test_node_path() {
        let doc = resume();
        let go = skill_text(&doc, 1);
        assert_eq!(node_path(&doc, doc.root(), go), Some(vec![1, 1, 0]));
        assert_eq!(node_path(&doc, doc.root(), doc.root()), Some(vec![]));
    }

    #[test]
    fn test_capture_without_range() {
        let doc = resume();
        assert_eq!(capture(&doc, doc.root(), None), None);
    }

    #[test]
    fn test_capture_restore_unmodified_tree() {
        let doc = resume();
        let rust = skill_text(&doc, 0);
        let go = skill_text(&doc, 1);
        let range = Range::new(Boundary::new(rust, 1), Boundary::new(go, 2));

        let saved = capture(&doc, doc.root(), Some(&range)).unwrap();
        assert_eq!(restore(&doc, doc.root(), &saved), Some(range));
    }

    #[test]
    fn test_restore_across_replacement() {
        let doc = resume();
        let go = skill_text(&doc, 1);
        let saved = capture(&doc, doc.root(), Some(&Range::collapsed(go, 1))).unwrap();

        let rebuilt = Document::from_content(&doc.to_content().unwrap()).unwrap();
        let restored = restore(&rebuilt, rebuilt.root(), &saved).unwrap();
        assert_eq!(restored.start.node, skill_text(&rebuilt, 1));
        assert_eq!(restored.start.offset, 1);
    }

    #[test]
    fn test_restore_clamps_offsets() {
        let mut doc = resume();
        let rust = skill_text(&doc, 0);
        let saved = capture(&doc, doc.root(), Some(&Range::collapsed(rust, 4))).unwrap();

        doc.set_text(rust, "R");
        let restored = restore(&doc, doc.root(), &saved).unwrap();
        assert_eq!(restored.start.offset, 1);
        assert_eq!(restored.end.offset, 1);
    }

    #[test]
    fn test_restore_after_removal_fails_silently() {
        let mut doc = resume();
        let go = skill_text(&doc, 1);
        let saved = capture(&doc, doc.root(), Some(&Range::collapsed(go, 0))).unwrap();

        let ul = doc.child_at(doc.root(), 1).unwrap();
        let second = doc.child_at(ul, 1).unwrap();
        doc.remove(second);
        assert_eq!(restore(&doc, doc.root(), &saved), None);
    }

    #[test]
    fn test_restore_into_leaves_selection_on_failure() {
        let doc = resume();
        let rust = skill_text(&doc, 0);
        let mut surface = MemorySurface::new(doc);
        let live = Range::collapsed(rust, 2);
        surface.set_selection(Some(live));

        let bogus = SavedSelection {
            start_path: vec![9, 9],
            start_offset: 0,
            end_path: vec![9, 9],
            end_offset: 0,
        };
        assert!(!restore_into(&mut surface, &bogus));
        assert_eq!(surface.selection(), Some(live));

        let saved = capture_from(&surface).unwrap();
        surface.set_selection(None);
        assert!(restore_into(&mut surface, &saved));
        assert_eq!(surface.selection(), Some(live));
    }

    #[test]
    fn test_capture_outside_root() {
        let mut doc = resume();
        let detached = doc.create_text("floating");
        let h1 = doc.child_at(doc.root(), 0).unwrap();
        assert_eq!(
            capture(&doc, h1, Some(&Range::collapsed(detached, 0))),
            None
        );
    }
}
