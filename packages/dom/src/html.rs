//! HTML export of a document tree

use crate::{Document, NodeId, NodeKind};

const VOID_TAGS: &[&str] = &["br", "hr", "img", "input", "meta", "link", "col"];

impl Document {
    /// Markup of the root's children (the body's inner HTML)
    pub fn to_html(&self) -> String {
        let mut out = String::new();
        for child in self.children(self.root()) {
            self.write_html(*child, &mut out);
        }
        out
    }

    /// Markup of a single node and its subtree
    pub fn outer_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.write_html(id, &mut out);
        out
    }

    fn write_html(&self, id: NodeId, out: &mut String) {
        match self.kind(id) {
            Some(NodeKind::Text { content }) => out.push_str(&escape_text(content)),
            Some(NodeKind::Element {
                tag,
                attributes,
                styles,
            }) => {
                out.push('<');
                out.push_str(tag);
                for (name, value) in attributes {
                    if name == "style" && !styles.is_empty() {
                        continue;
                    }
                    out.push_str(&format!(" {}=\"{}\"", name, escape_attr(value)));
                }
                if !styles.is_empty() {
                    let style = styles
                        .iter()
                        .map(|(k, v)| format!("{}: {}", k, v))
                        .collect::<Vec<_>>()
                        .join("; ");
                    out.push_str(&format!(" style=\"{}\"", escape_attr(&style)));
                }
                out.push('>');

                if VOID_TAGS.contains(&tag.as_str()) {
                    return;
                }
                for child in self.children(id) {
                    self.write_html(*child, out);
                }
                out.push_str(&format!("</{}>", tag));
            }
            None => {}
        }
    }
}

fn escape_text(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn escape_attr(s: &str) -> String {
    escape_text(s).replace('"', "&quot;")
}
