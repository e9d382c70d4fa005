//! # Document Tree
//!
//! Arena-backed mutable node tree. This is the "live" document a rendering
//! surface exposes: nodes are addressed by [`NodeId`], know their parent and
//! their ordered children, and can be moved, inserted and detached.
//!
//! ## Identity
//!
//! Every `Document` is stamped with a generation when it is built. A
//! [`NodeId`] carries the generation of the document that issued it, so an id
//! held across a full-document replacement simply stops resolving instead of
//! silently pointing at an unrelated node of the new tree.
//!
//! ```text
//! from_content(json) → Document ─┬─ edit in place (NodeIds stay valid)
//!                                └─ to_content() → json
//! ```

use crate::{ContentNode, DomError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// Generation allocator shared by every document so a handle never resolves
/// in a document it was not created by. Holds no document or editor state.
static NEXT_GENERATION: AtomicU64 = AtomicU64::new(1);

/// Tag of the root element every document is built around
pub const ROOT_TAG: &str = "body";

/// Handle to a node inside one specific [`Document`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId {
    generation: u64,
    index: usize,
}

/// Node payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Element {
        tag: String,
        attributes: BTreeMap<String, String>,
        styles: BTreeMap<String, String>,
    },
    Text {
        content: String,
    },
}

#[derive(Debug, Clone)]
struct NodeData {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// Mutable document tree
#[derive(Debug, Clone)]
pub struct Document {
    generation: u64,
    nodes: Vec<NodeData>,
}

impl Document {
    /// Create an empty document (a bare `body`)
    pub fn new() -> Self {
        let generation = NEXT_GENERATION.fetch_add(1, Ordering::Relaxed);
        Self {
            generation,
            nodes: vec![NodeData {
                kind: NodeKind::Element {
                    tag: ROOT_TAG.to_string(),
                    attributes: BTreeMap::new(),
                    styles: BTreeMap::new(),
                },
                parent: None,
                children: Vec::new(),
            }],
        }
    }

    /// Create a document whose body holds `children`
    pub fn with_body(children: impl IntoIterator<Item = ContentNode>) -> Self {
        let mut doc = Self::new();
        let root = doc.root();
        for child in children {
            let id = doc.build(&child);
            doc.append_child(root, id);
        }
        doc
    }

    /// Build a document from a serialized tree; the tree's root becomes the document root
    pub fn from_tree(tree: &ContentNode) -> Result<Self, DomError> {
        let ContentNode::Element {
            attributes,
            styles,
            children,
            ..
        } = tree
        else {
            return Err(DomError::MalformedContent(
                "document root must be an element".to_string(),
            ));
        };

        let mut doc = Self::new();
        let root = doc.root();
        if let NodeKind::Element {
            attributes: root_attrs,
            styles: root_styles,
            ..
        } = &mut doc.nodes[0].kind
        {
            *root_attrs = attributes.clone();
            *root_styles = styles.clone();
        }
        for child in children {
            let id = doc.build(child);
            doc.append_child(root, id);
        }
        Ok(doc)
    }

    /// Parse the serialized `content` string
    pub fn from_content(content: &str) -> Result<Self, DomError> {
        let tree: ContentNode = serde_json::from_str(content)?;
        Self::from_tree(&tree)
    }

    /// Serialize the attached tree to the `content` string
    pub fn to_content(&self) -> Result<String, DomError> {
        Ok(serde_json::to_string(&self.to_tree())?)
    }

    /// Snapshot the attached tree
    pub fn to_tree(&self) -> ContentNode {
        self.snapshot(&self.nodes[0])
    }

    /// Snapshot the subtree rooted at `node`
    pub fn subtree(&self, node: NodeId) -> Result<ContentNode, DomError> {
        let data = self.get(node).ok_or(DomError::NodeNotFound)?;
        Ok(self.snapshot(data))
    }

    fn snapshot(&self, data: &NodeData) -> ContentNode {
        match &data.kind {
            NodeKind::Text { content } => ContentNode::text(content.clone()),
            NodeKind::Element {
                tag,
                attributes,
                styles,
            } => ContentNode::Element {
                tag: tag.clone(),
                attributes: attributes.clone(),
                styles: styles.clone(),
                children: data
                    .children
                    .iter()
                    .filter_map(|c| self.get(*c))
                    .map(|child| self.snapshot(child))
                    .collect(),
            },
        }
    }

    /// Instantiate a serialized subtree as detached nodes
    pub fn build(&mut self, tree: &ContentNode) -> NodeId {
        match tree {
            ContentNode::Text { content } => self.create_text(content.clone()),
            ContentNode::Element {
                tag,
                attributes,
                styles,
                children,
            } => {
                let id = self.push(NodeKind::Element {
                    tag: tag.clone(),
                    attributes: attributes.clone(),
                    styles: styles.clone(),
                });
                for child in children {
                    let child_id = self.build(child);
                    self.append_child(id, child_id);
                }
                id
            }
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId {
            generation: self.generation,
            index: 0,
        }
    }

    pub fn create_element(&mut self, tag: impl Into<String>) -> NodeId {
        self.push(NodeKind::Element {
            tag: tag.into(),
            attributes: BTreeMap::new(),
            styles: BTreeMap::new(),
        })
    }

    pub fn create_text(&mut self, content: impl Into<String>) -> NodeId {
        self.push(NodeKind::Text {
            content: content.into(),
        })
    }

    fn push(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId {
            generation: self.generation,
            index: self.nodes.len(),
        };
        self.nodes.push(NodeData {
            kind,
            parent: None,
            children: Vec::new(),
        });
        id
    }

    fn get(&self, id: NodeId) -> Option<&NodeData> {
        if id.generation != self.generation {
            return None;
        }
        self.nodes.get(id.index)
    }

    fn get_mut(&mut self, id: NodeId) -> Option<&mut NodeData> {
        if id.generation != self.generation {
            return None;
        }
        self.nodes.get_mut(id.index)
    }

    /// Whether `id` was issued by this document
    pub fn contains(&self, id: NodeId) -> bool {
        self.get(id).is_some()
    }

    pub fn kind(&self, id: NodeId) -> Option<&NodeKind> {
        self.get(id).map(|n| &n.kind)
    }

    pub fn tag(&self, id: NodeId) -> Option<&str> {
        match self.kind(id)? {
            NodeKind::Element { tag, .. } => Some(tag),
            NodeKind::Text { .. } => None,
        }
    }

    pub fn is_text(&self, id: NodeId) -> bool {
        matches!(self.kind(id), Some(NodeKind::Text { .. }))
    }

    pub fn is_element(&self, id: NodeId, tag: &str) -> bool {
        self.tag(id).is_some_and(|t| t.eq_ignore_ascii_case(tag))
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id)?.parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.get(id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    pub fn child_at(&self, id: NodeId, index: usize) -> Option<NodeId> {
        self.children(id).get(index).copied()
    }

    /// Position of `id` among its parent's children
    pub fn index_in_parent(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().position(|c| *c == id)
    }

    /// Whether `id` is reachable from the root
    pub fn is_attached(&self, id: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(node) = current {
            if node == self.root() {
                return true;
            }
            current = self.parent(node);
        }
        false
    }

    /// Whether `ancestor` is `node` or one of its ancestors
    pub fn is_inclusive_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(n) = current {
            if n == ancestor {
                return true;
            }
            current = self.parent(n);
        }
        false
    }

    /// Nearest inclusive ancestor that is an element with `tag`
    pub fn closest(&self, id: NodeId, tag: &str) -> Option<NodeId> {
        let mut current = Some(id);
        while let Some(node) = current {
            if self.is_element(node, tag) {
                return Some(node);
            }
            current = self.parent(node);
        }
        None
    }

    /// Offset space of a node: characters for text, children for elements
    pub fn text_length(&self, id: NodeId) -> usize {
        match self.get(id) {
            Some(NodeData {
                kind: NodeKind::Text { content },
                ..
            }) => content.chars().count(),
            Some(data) => data.children.len(),
            None => 0,
        }
    }

    pub fn text(&self, id: NodeId) -> Option<&str> {
        match self.kind(id)? {
            NodeKind::Text { content } => Some(content),
            NodeKind::Element { .. } => None,
        }
    }

    pub fn set_text(&mut self, id: NodeId, value: impl Into<String>) {
        if let Some(NodeData {
            kind: NodeKind::Text { content },
            ..
        }) = self.get_mut(id)
        {
            *content = value.into();
        }
    }

    /// Concatenated text of the subtree
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out);
        out
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        match self.kind(id) {
            Some(NodeKind::Text { content }) => out.push_str(content),
            Some(NodeKind::Element { .. }) => {
                for child in self.children(id) {
                    self.collect_text(*child, out);
                }
            }
            None => {}
        }
    }

    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        match self.kind(id)? {
            NodeKind::Element { attributes, .. } => attributes.get(name).map(String::as_str),
            NodeKind::Text { .. } => None,
        }
    }

    pub fn set_attribute(&mut self, id: NodeId, name: impl Into<String>, value: impl Into<String>) {
        if let Some(NodeKind::Element { attributes, .. }) = self.get_mut(id).map(|n| &mut n.kind) {
            attributes.insert(name.into(), value.into());
        }
    }

    pub fn remove_attribute(&mut self, id: NodeId, name: &str) -> Option<String> {
        match self.get_mut(id).map(|n| &mut n.kind) {
            Some(NodeKind::Element { attributes, .. }) => attributes.remove(name),
            _ => None,
        }
    }

    pub fn style(&self, id: NodeId, property: &str) -> Option<&str> {
        match self.kind(id)? {
            NodeKind::Element { styles, .. } => styles.get(property).map(String::as_str),
            NodeKind::Text { .. } => None,
        }
    }

    pub fn set_style(&mut self, id: NodeId, property: impl Into<String>, value: impl Into<String>) {
        if let Some(NodeKind::Element { styles, .. }) = self.get_mut(id).map(|n| &mut n.kind) {
            styles.insert(property.into(), value.into());
        }
    }

    pub fn remove_style(&mut self, id: NodeId, property: &str) -> Option<String> {
        match self.get_mut(id).map(|n| &mut n.kind) {
            Some(NodeKind::Element { styles, .. }) => styles.remove(property),
            _ => None,
        }
    }

    /// Change an element's tag in place
    pub fn set_tag(&mut self, id: NodeId, new_tag: impl Into<String>) {
        if let Some(NodeKind::Element { tag, .. }) = self.get_mut(id).map(|n| &mut n.kind) {
            *tag = new_tag.into();
        }
    }

    /// Detach `child` from wherever it is and append it to `parent`
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        let len = self.children(parent).len();
        self.insert_child(parent, len, child);
    }

    /// Detach `child` and insert it at `index` (clamped) among `parent`'s children
    ///
    /// Inserting a node into its own subtree is refused.
    pub fn insert_child(&mut self, parent: NodeId, index: usize, child: NodeId) {
        if !self.contains(parent) || !self.contains(child) || self.is_text(parent) {
            return;
        }
        if self.is_inclusive_ancestor(child, parent) {
            tracing::warn!("refusing to insert a node into its own subtree");
            return;
        }
        self.detach(child);
        if let Some(data) = self.get_mut(parent) {
            let index = index.min(data.children.len());
            data.children.insert(index, child);
        }
        if let Some(data) = self.get_mut(child) {
            data.parent = Some(parent);
        }
    }

    /// Insert `child` before `reference`; appends when `reference` is not a child of `parent`
    pub fn insert_before(&mut self, parent: NodeId, child: NodeId, reference: NodeId) {
        let index = self
            .children(parent)
            .iter()
            .position(|c| *c == reference)
            .unwrap_or(self.children(parent).len());
        self.insert_child(parent, index, child);
    }

    /// Insert `child` right after `reference` under the same parent
    pub fn insert_after(&mut self, reference: NodeId, child: NodeId) {
        let (Some(parent), Some(index)) = (self.parent(reference), self.index_in_parent(reference))
        else {
            return;
        };
        self.insert_child(parent, index + 1, child);
    }

    /// Unlink a node (and its subtree) from its parent
    pub fn detach(&mut self, id: NodeId) {
        let Some(parent) = self.parent(id) else {
            return;
        };
        if let Some(data) = self.get_mut(parent) {
            data.children.retain(|c| *c != id);
        }
        if let Some(data) = self.get_mut(id) {
            data.parent = None;
        }
    }

    /// Remove a node from the tree; the root cannot be removed
    pub fn remove(&mut self, id: NodeId) {
        if id == self.root() {
            return;
        }
        self.detach(id);
    }

    /// Replace `id` by its own children, in place
    pub fn unwrap_node(&mut self, id: NodeId) {
        let (Some(parent), Some(index)) = (self.parent(id), self.index_in_parent(id)) else {
            return;
        };
        let children = self.children(id).to_vec();
        for (offset, child) in children.into_iter().enumerate() {
            self.insert_child(parent, index + offset, child);
        }
        self.detach(id);
    }

    /// Attached descendants of `id` in document order (excluding `id`)
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(self.children(node).iter().rev().copied());
        }
        out
    }

    /// First attached element with `tag`, in document order
    pub fn find_first(&self, tag: &str) -> Option<NodeId> {
        self.descendants(self.root())
            .into_iter()
            .find(|n| self.is_element(*n, tag))
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}
