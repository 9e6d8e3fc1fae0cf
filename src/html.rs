//! Best effort text of html-only newsletters.

use select::document::Document;
use select::node::Node;
use select::predicate::Name;

/// Elements that never contribute to the readable text.
pub const JUNK_ELEMENTS: [&str; 3] = ["script", "style", "a"];

pub trait TextCleaner {
    /// Ignore nodes that usually do not contain readable content.
    fn is_junk(node: &Node) -> bool {
        node.name()
            .map(|name| JUNK_ELEMENTS.contains(&name))
            .unwrap_or_default()
    }

    /// Collect all text nodes below `node` that are not inside a junk
    /// element, one per line.
    fn node_text(node: &Node) -> String {
        fn recur_text<T: TextCleaner + ?Sized>(node: &Node, parts: &mut Vec<String>) {
            if T::is_junk(node) {
                return;
            }
            if let Some(text) = node.as_text() {
                parts.push(text.to_string());
            }
            for child in node.children() {
                recur_text::<T>(&child, parts)
            }
        }

        let mut parts = Vec::new();
        recur_text::<Self>(node, &mut parts);
        parts.join("\n")
    }
}

/// Drops scripts, styles and links, keeps everything else.
pub struct DefaultTextCleaner;

impl TextCleaner for DefaultTextCleaner {}

/// Extracts the plain text of an html email with [`DefaultTextCleaner`].
pub fn html_to_text(html: &str) -> String {
    let doc = Document::from(html);
    doc.find(Name("html"))
        .next()
        .map(|root| DefaultTextCleaner::node_text(&root))
        .unwrap_or_default()
        .trim()
        .to_string()
}
