// rcdom helpers shared by the extractor and the crawler's link scanner.

use html5ever::parse_document;
use html5ever::tendril::TendrilSink;
use html5ever::tree_builder::TreeBuilderOpts;
use html5ever::ParseOpts;
use markup5ever_rcdom::{Handle, NodeData, RcDom};

/// Parse an HTML string into an html5ever RcDom.
pub(crate) fn parse_html(html: &str) -> RcDom {
    let opts = ParseOpts {
        tree_builder: TreeBuilderOpts {
            drop_doctype: true,
            ..Default::default()
        },
        ..Default::default()
    };
    parse_document(RcDom::default(), opts)
        .from_utf8()
        .one(html.as_bytes())
}

/// Tag name of an element node.
pub(crate) fn tag_name(handle: &Handle) -> Option<String> {
    if let NodeData::Element { ref name, .. } = handle.data {
        Some(name.local.as_ref().to_string())
    } else {
        None
    }
}

/// Value of an attribute on an element node.
pub(crate) fn get_attr(handle: &Handle, name: &str) -> Option<String> {
    if let NodeData::Element { ref attrs, .. } = handle.data {
        for attr in attrs.borrow().iter() {
            if attr.name.local.as_ref() == name {
                return Some(attr.value.to_string());
            }
        }
    }
    None
}

/// The element's classes, split on whitespace.
pub(crate) fn class_list(handle: &Handle) -> Vec<String> {
    get_attr(handle, "class")
        .map(|classes| classes.split_whitespace().map(str::to_string).collect())
        .unwrap_or_default()
}

pub(crate) fn has_class(handle: &Handle, class: &str) -> bool {
    class_list(handle).iter().any(|c| c == class)
}

/// Direct children that are elements.
pub(crate) fn element_children(handle: &Handle) -> Vec<Handle> {
    handle
        .children
        .borrow()
        .iter()
        .filter(|child| matches!(child.data, NodeData::Element { .. }))
        .cloned()
        .collect()
}

/// First child node of any kind.
pub(crate) fn first_child(handle: &Handle) -> Option<Handle> {
    handle.children.borrow().first().cloned()
}

/// Depth-first search of the descendants for the first element satisfying
/// `pred`. The node itself is not considered.
pub(crate) fn find_element(handle: &Handle, pred: &dyn Fn(&Handle) -> bool) -> Option<Handle> {
    for child in handle.children.borrow().iter() {
        if matches!(child.data, NodeData::Element { .. }) && pred(child) {
            return Some(child.clone());
        }
        if let Some(found) = find_element(child, pred) {
            return Some(found);
        }
    }
    None
}

/// Visit every node of the subtree, depth first.
pub(crate) fn walk(handle: &Handle, visit: &mut dyn FnMut(&Handle)) {
    visit(handle);
    for child in handle.children.borrow().iter() {
        walk(child, visit);
    }
}

/// Concatenated text of all text descendants.
pub(crate) fn text_content(handle: &Handle) -> String {
    let mut text = String::new();
    walk(handle, &mut |node| {
        if let NodeData::Text { ref contents } = node.data {
            text.push_str(&contents.borrow());
        }
    });
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn body(html: &str) -> (RcDom, Handle) {
        let dom = parse_html(html);
        let body = find_element(&dom.document, &|h| tag_name(h).as_deref() == Some("body"))
            .expect("body");
        (dom, body)
    }

    #[test]
    fn test_class_list() {
        let (_dom, body) = body("<div class=\"a  b c\"></div>");
        let div = find_element(&body, &|h| tag_name(h).as_deref() == Some("div")).unwrap();
        assert_eq!(class_list(&div), vec!["a", "b", "c"]);
        assert!(has_class(&div, "b"));
        assert!(!has_class(&div, "d"));
    }

    #[test]
    fn test_find_element_is_depth_first() {
        let (_dom, body) = body("<div><span id=\"x\"></span></div><span id=\"y\"></span>");
        let span = find_element(&body, &|h| tag_name(h).as_deref() == Some("span")).unwrap();
        assert_eq!(get_attr(&span, "id").as_deref(), Some("x"));
    }

    #[test]
    fn test_text_content() {
        let (_dom, body) = body("<p>a<b>b</b>c</p>");
        assert_eq!(text_content(&body), "abc");
    }

    #[test]
    fn test_element_children_skip_text_nodes() {
        let (_dom, body) = body("<ul> <li>a</li> <li>b</li> </ul>");
        let ul = find_element(&body, &|h| tag_name(h).as_deref() == Some("ul")).unwrap();
        assert_eq!(element_children(&ul).len(), 2);
    }
}
