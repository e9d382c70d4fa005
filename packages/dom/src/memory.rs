//! # In-Memory Surface
//!
//! A [`RenderingSurface`] with no renderer behind it. Native formatting lands
//! as inline styles on the element holding the selection start, which keeps
//! the document (and therefore its serialized content) the single source of
//! truth for format state queries.

use crate::{Document, DomError, NodeId, Range, RenderingSurface};
use tracing::debug;

const BLOCK_TAGS: &[&str] = &[
    "p", "div", "h1", "h2", "h3", "h4", "h5", "h6", "li", "td", "th", "blockquote", "pre",
];

const INLINE_PROPERTIES: &[&str] = &[
    "font-weight",
    "font-style",
    "text-decoration",
    "vertical-align",
    "font-family",
    "font-size",
    "color",
    "background-color",
];

const INDENT_STEP_PX: u32 = 40;

/// Surface over a plain [`Document`]
#[derive(Debug, Clone, Default)]
pub struct MemorySurface {
    document: Document,
    selection: Option<Range>,
    revision: u64,
}

impl MemorySurface {
    pub fn new(document: Document) -> Self {
        Self {
            document,
            selection: None,
            revision: 0,
        }
    }

    pub fn from_content(content: &str) -> Result<Self, DomError> {
        Ok(Self::new(Document::from_content(content)?))
    }

    /// Element the selection starts in
    fn focus_element(&self) -> Option<NodeId> {
        let start = self.selection?.start.node;
        if self.document.is_text(start) {
            self.document.parent(start)
        } else if self.document.contains(start) {
            Some(start)
        } else {
            None
        }
    }

    /// Nearest block-level element around the selection start
    fn block_element(&self) -> Option<NodeId> {
        let focus = self.focus_element()?;
        let mut current = Some(focus);
        while let Some(node) = current {
            if let Some(tag) = self.document.tag(node) {
                if BLOCK_TAGS.contains(&tag) {
                    return Some(node);
                }
            }
            current = self.document.parent(node);
        }
        Some(focus)
    }

    /// Style value in effect at `node`, inherited from the nearest ancestor defining it
    fn computed_style(&self, node: NodeId, property: &str) -> Option<&str> {
        let mut current = Some(node);
        while let Some(n) = current {
            if let Some(value) = self.document.style(n, property) {
                return Some(value);
            }
            current = self.document.parent(n);
        }
        None
    }

    fn has_decoration(&self, node: NodeId, token: &str) -> bool {
        let mut current = Some(node);
        while let Some(n) = current {
            if let Some(value) = self.document.style(n, "text-decoration") {
                if value.split_whitespace().any(|t| t == token) {
                    return true;
                }
            }
            current = self.document.parent(n);
        }
        false
    }

    fn toggle_style(&mut self, property: &str, value: &str) -> bool {
        let Some(el) = self.focus_element() else {
            return false;
        };
        if self.document.style(el, property) == Some(value) {
            self.document.remove_style(el, property);
        } else if self.computed_style(el, property) == Some(value) {
            self.document.set_style(el, property, "normal");
        } else {
            self.document.set_style(el, property, value);
        }
        true
    }

    fn toggle_decoration(&mut self, token: &str) -> bool {
        let Some(el) = self.focus_element() else {
            return false;
        };
        let mut tokens: Vec<String> = self
            .document
            .style(el, "text-decoration")
            .map(|v| v.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default();

        if let Some(pos) = tokens.iter().position(|t| t == token) {
            tokens.remove(pos);
        } else {
            tokens.push(token.to_string());
        }

        if tokens.is_empty() {
            self.document.remove_style(el, "text-decoration");
        } else {
            self.document.set_style(el, "text-decoration", tokens.join(" "));
        }
        true
    }

    fn set_value(&mut self, property: &str, value: Option<&str>) -> bool {
        let (Some(el), Some(value)) = (self.focus_element(), value.filter(|v| !v.is_empty())) else {
            return false;
        };
        self.document.set_style(el, property, value);
        true
    }

    fn align(&mut self, value: &str) -> bool {
        let Some(block) = self.block_element() else {
            return false;
        };
        self.document.set_style(block, "text-align", value);
        true
    }

    fn indent(&mut self, delta: i64) -> bool {
        let Some(block) = self.block_element() else {
            return false;
        };
        let current = self
            .document
            .style(block, "margin-left")
            .and_then(|v| v.trim_end_matches("px").trim().parse::<i64>().ok())
            .unwrap_or(0);
        if delta < 0 && current <= 0 {
            return false;
        }
        let next = (current + delta).max(0);
        if next == 0 {
            self.document.remove_style(block, "margin-left");
        } else {
            self.document.set_style(block, "margin-left", format!("{}px", next));
        }
        true
    }

    fn enclosing_list_item(&self) -> Option<(NodeId, NodeId)> {
        let focus = self.focus_element()?;
        let li = self.document.closest(focus, "li")?;
        let list = self.document.parent(li)?;
        if self.document.is_element(list, "ol") || self.document.is_element(list, "ul") {
            Some((li, list))
        } else {
            None
        }
    }

    fn toggle_list(&mut self, list_tag: &str) -> bool {
        if let Some((li, list)) = self.enclosing_list_item() {
            if self.document.is_element(list, list_tag) {
                self.lift_list_item(li, list);
            } else {
                self.document.set_tag(list, list_tag);
            }
            return true;
        }

        let Some(block) = self.block_element() else {
            return false;
        };
        if block == self.document.root() {
            return false;
        }

        let list = self.document.create_element(list_tag);
        let li = self.document.create_element("li");
        self.document.append_child(list, li);

        if self.document.is_element(block, "td") || self.document.is_element(block, "th") {
            for child in self.document.children(block).to_vec() {
                self.document.append_child(li, child);
            }
            self.document.append_child(block, list);
        } else {
            let Some(parent) = self.document.parent(block) else {
                return false;
            };
            self.document.insert_before(parent, list, block);
            self.document.append_child(li, block);
        }
        true
    }

    /// Move `li` out of `list`, splitting the list around it
    fn lift_list_item(&mut self, li: NodeId, list: NodeId) {
        let Some(index) = self.document.index_in_parent(li) else {
            return;
        };
        let following = self.document.children(list)[index + 1..].to_vec();
        let list_tag = self.document.tag(list).unwrap_or("ul").to_string();

        self.document.insert_after(list, li);
        if !following.is_empty() {
            let tail = self.document.create_element(list_tag);
            for item in following {
                self.document.append_child(tail, item);
            }
            self.document.insert_after(li, tail);
        }
        if self.document.children(list).is_empty() {
            self.document.remove(list);
        }

        let children = self.document.children(li);
        let single_block = children.len() == 1
            && self
                .document
                .tag(children[0])
                .is_some_and(|t| BLOCK_TAGS.contains(&t));
        if single_block {
            self.document.unwrap_node(li);
        } else {
            self.document.set_tag(li, "p");
        }
    }

    fn create_link(&mut self, url: Option<&str>) -> bool {
        let (Some(range), Some(url)) = (self.selection, url.filter(|u| !u.is_empty())) else {
            return false;
        };
        let text = range.start.node;
        if range.end.node != text || range.is_collapsed() {
            debug!("createLink needs a non-empty selection inside one text node");
            return false;
        }
        let Some(content) = self.document.text(text) else {
            return false;
        };

        let chars: Vec<char> = content.chars().collect();
        let lo = range.start.offset.min(range.end.offset).min(chars.len());
        let hi = range.start.offset.max(range.end.offset).min(chars.len());
        if lo == hi {
            return false;
        }
        let before: String = chars[..lo].iter().collect();
        let middle: String = chars[lo..hi].iter().collect();
        let after: String = chars[hi..].iter().collect();

        let anchor = self.document.create_element("a");
        self.document.set_attribute(anchor, "href", url);
        let linked = self.document.create_text(middle.clone());
        self.document.append_child(anchor, linked);

        self.document.insert_after(text, anchor);
        if !after.is_empty() {
            let tail = self.document.create_text(after);
            self.document.insert_after(anchor, tail);
        }
        if before.is_empty() {
            self.document.remove(text);
        } else {
            self.document.set_text(text, before);
        }

        self.selection = Some(Range::new(
            crate::Boundary::new(linked, 0),
            crate::Boundary::new(linked, middle.chars().count()),
        ));
        true
    }

    fn unlink(&mut self) -> bool {
        let Some(anchor) = self.focus_element().and_then(|f| self.document.closest(f, "a")) else {
            return false;
        };
        self.document.unwrap_node(anchor);
        true
    }

    fn remove_format(&mut self) -> bool {
        let Some(el) = self.focus_element() else {
            return false;
        };
        let mut removed = false;
        for property in INLINE_PROPERTIES {
            removed |= self.document.remove_style(el, property).is_some();
        }
        removed
    }

    fn insert_text_at_selection(&mut self, text: &str) -> bool {
        let Some(range) = self.selection else {
            return false;
        };
        if !range.is_collapsed() && !self.delete_selected() {
            return false;
        }
        let Some(at) = self.selection.map(|r| r.start) else {
            return false;
        };

        if let Some(content) = self.document.text(at.node) {
            let chars: Vec<char> = content.chars().collect();
            let offset = at.offset.min(chars.len());
            let mut next: String = chars[..offset].iter().collect();
            next.push_str(text);
            next.extend(chars[offset..].iter());
            self.document.set_text(at.node, next);
            self.selection = Some(Range::collapsed(at.node, offset + text.chars().count()));
        } else if self.document.contains(at.node) {
            let node = self.document.create_text(text);
            self.document.insert_child(at.node, at.offset, node);
            self.selection = Some(Range::collapsed(node, text.chars().count()));
        } else {
            return false;
        }
        true
    }

    fn delete_selected(&mut self) -> bool {
        let Some(range) = self.selection else {
            return false;
        };
        if range.is_collapsed() || range.start.node != range.end.node {
            debug!("delete only supports ranges within a single node");
            return false;
        }
        let node = range.start.node;
        let lo = range.start.offset.min(range.end.offset);
        let hi = range.start.offset.max(range.end.offset);

        if let Some(content) = self.document.text(node) {
            let remaining: String = content
                .chars()
                .enumerate()
                .filter(|(i, _)| *i < lo || *i >= hi)
                .map(|(_, c)| c)
                .collect();
            self.document.set_text(node, remaining);
        } else {
            let doomed: Vec<NodeId> = self
                .document
                .children(node)
                .iter()
                .skip(lo)
                .take(hi - lo)
                .copied()
                .collect();
            for child in doomed {
                self.document.remove(child);
            }
        }
        self.selection = Some(Range::collapsed(node, lo));
        true
    }
}

impl RenderingSurface for MemorySurface {
    fn document(&self) -> &Document {
        &self.document
    }

    fn document_mut(&mut self) -> &mut Document {
        &mut self.document
    }

    fn selection(&self) -> Option<Range> {
        self.selection
    }

    fn set_selection(&mut self, range: Option<Range>) {
        self.selection = range;
    }

    fn exec_native(&mut self, name: &str, arg: Option<&str>) -> bool {
        let applied = match name {
            "bold" => self.toggle_style("font-weight", "bold"),
            "italic" => self.toggle_style("font-style", "italic"),
            "underline" => self.toggle_decoration("underline"),
            "strikeThrough" => self.toggle_decoration("line-through"),
            "subscript" => self.toggle_style("vertical-align", "sub"),
            "superscript" => self.toggle_style("vertical-align", "super"),
            "fontName" => self.set_value("font-family", arg),
            "fontSize" => self.set_value("font-size", arg),
            "foreColor" => self.set_value("color", arg),
            "hiliteColor" => self.set_value("background-color", arg),
            "justifyLeft" => self.align("left"),
            "justifyCenter" => self.align("center"),
            "justifyRight" => self.align("right"),
            "justifyFull" => self.align("justify"),
            "insertOrderedList" => self.toggle_list("ol"),
            "insertUnorderedList" => self.toggle_list("ul"),
            "indent" => self.indent(INDENT_STEP_PX as i64),
            "outdent" => self.indent(-(INDENT_STEP_PX as i64)),
            "createLink" => self.create_link(arg),
            "unlink" => self.unlink(),
            "removeFormat" => self.remove_format(),
            "insertText" => self.insert_text_at_selection(arg.unwrap_or_default()),
            "delete" => self.delete_selected(),
            _ => {
                debug!(command = name, "unsupported native command");
                false
            }
        };
        if applied {
            self.revision += 1;
        }
        applied
    }

    fn query_native_state(&self, name: &str) -> bool {
        let Some(el) = self.focus_element() else {
            return false;
        };
        match name {
            "bold" => self.computed_style(el, "font-weight") == Some("bold"),
            "italic" => self.computed_style(el, "font-style") == Some("italic"),
            "underline" => self.has_decoration(el, "underline"),
            "strikeThrough" => self.has_decoration(el, "line-through"),
            "subscript" => self.computed_style(el, "vertical-align") == Some("sub"),
            "superscript" => self.computed_style(el, "vertical-align") == Some("super"),
            "justifyLeft" => matches!(self.computed_style(el, "text-align"), None | Some("left")),
            "justifyCenter" => self.computed_style(el, "text-align") == Some("center"),
            "justifyRight" => self.computed_style(el, "text-align") == Some("right"),
            "justifyFull" => self.computed_style(el, "text-align") == Some("justify"),
            "insertOrderedList" => self
                .enclosing_list_item()
                .is_some_and(|(_, list)| self.document.is_element(list, "ol")),
            "insertUnorderedList" => self
                .enclosing_list_item()
                .is_some_and(|(_, list)| self.document.is_element(list, "ul")),
            "createLink" => self.document.closest(el, "a").is_some(),
            _ => false,
        }
    }

    fn query_native_value(&self, name: &str) -> String {
        let Some(el) = self.focus_element() else {
            return String::new();
        };
        let value = match name {
            "fontName" => self.computed_style(el, "font-family"),
            "fontSize" => self.computed_style(el, "font-size"),
            "foreColor" => self.computed_style(el, "color"),
            "hiliteColor" => self.computed_style(el, "background-color"),
            "createLink" => self
                .document
                .closest(el, "a")
                .and_then(|a| self.document.attribute(a, "href")),
            _ => None,
        };
        value.unwrap_or_default().to_string()
    }

    fn replace_content(&mut self, content: &str) -> Result<(), DomError> {
        self.document = Document::from_content(content)?;
        self.selection = None;
        self.revision += 1;
        Ok(())
    }

    fn insert_text(&mut self, text: &str) -> bool {
        let applied = self.insert_text_at_selection(text);
        if applied {
            self.revision += 1;
        }
        applied
    }

    fn delete_selection(&mut self) -> bool {
        let applied = self.delete_selected();
        if applied {
            self.revision += 1;
        }
        applied
    }

    fn revision(&self) -> u64 {
        self.revision
    }
}
