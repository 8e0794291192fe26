// Recursive text extraction with shared walker state.
//
// `indent` is inserted after newlines inside nested block contexts;
// `last_char` is the last character emitted so far, consulted when deciding
// whether a block needs a fresh line and whether text starting a line gets
// the indent. Handlers save and restore the indent around block-increasing
// rules, so the state behaves like a stack of walker frames.

use markup5ever_rcdom::{Handle, NodeData};

use super::{dom, handlers, UNWANTED_CLASSES, UNWANTED_TAGS};

pub(crate) struct Walker {
    indent: String,
    last_char: Option<char>,
}

impl Walker {
    pub(crate) fn new() -> Self {
        Self {
            indent: String::new(),
            last_char: None,
        }
    }

    /// Clear the state at a section boundary.
    pub(crate) fn reset(&mut self) {
        self.indent.clear();
        self.last_char = None;
    }

    /// Text of one node, formatted for its context. Formatting trouble in a
    /// subtree yields an empty string for that subtree, never a failure.
    pub(crate) fn get_text(&mut self, node: &Handle) -> String {
        match &node.data {
            NodeData::Text { contents } => self.format_text(&contents.borrow()),
            NodeData::Element { .. } => {
                if self.is_unwanted_tag(node) || self.is_unwanted_class(node) {
                    return String::new();
                }
                if let Some(text) = handlers::format(self, node) {
                    return text;
                }
                let text = self.walk_children(node);
                self.note(&text);
                text
            }
            _ => String::new(),
        }
    }

    /// Concatenated text of all direct children.
    pub(crate) fn walk_children(&mut self, node: &Handle) -> String {
        let children = node.children.borrow();
        let mut text = String::new();
        for child in children.iter() {
            text.push_str(&self.get_text(child));
        }
        text
    }

    /// A string node: every interior newline is followed by the current
    /// indent, and text that starts a fresh line gets the indent up front.
    fn format_text(&mut self, contents: &str) -> String {
        if contents.is_empty() {
            return String::new();
        }

        let mut text = String::with_capacity(contents.len());
        if self.last_char == Some('\n') {
            text.push_str(&self.indent);
        }
        let mut first = true;
        for segment in contents.split_inclusive('\n') {
            if !first {
                text.push_str(&self.indent);
            }
            text.push_str(segment);
            first = false;
        }

        self.note(&text);
        text
    }

    pub(crate) fn indent(&self) -> &str {
        &self.indent
    }

    pub(crate) fn last_char(&self) -> Option<char> {
        self.last_char
    }

    /// Grow the indent for a nested block; returns the length to restore.
    pub(crate) fn push_indent(&mut self, suffix: &str) -> usize {
        let saved = self.indent.len();
        self.indent.push_str(suffix);
        saved
    }

    pub(crate) fn restore_indent(&mut self, saved: usize) {
        self.indent.truncate(saved);
    }

    /// Record emitted text so later decisions see the last character.
    /// Empty emissions leave the state untouched.
    pub(crate) fn note(&mut self, text: &str) {
        if let Some(c) = text.chars().last() {
            self.last_char = Some(c);
        }
    }

    fn is_unwanted_tag(&self, node: &Handle) -> bool {
        dom::tag_name(node)
            .map(|name| UNWANTED_TAGS.contains(name.as_str()))
            .unwrap_or(false)
    }

    fn is_unwanted_class(&self, node: &Handle) -> bool {
        dom::class_list(node)
            .iter()
            .any(|class| UNWANTED_CLASSES.contains(class.as_str()))
    }
}
