// Per-element formatting rules.
//
// Ordered dispatch, first match wins; the order makes resolution
// deterministic when an element could match more than one rule (a list
// inside a blockquote, a sup carrying a math class). Each rule returns the
// full text for its subtree; `None` falls through to the default child
// concatenation in the walker.

use markup5ever_rcdom::Handle;

use super::dom;
use super::walker::Walker;

/// Try each format rule in order. Returns `None` when no rule applies.
pub(crate) fn format(walker: &mut Walker, node: &Handle) -> Option<String> {
    let name = dom::tag_name(node)?;

    let text = if name == "ul" || name == "ol" {
        format_list(walker, node, name == "ol")
    } else if dom::has_class(node, "mwe-math-element") {
        format_math(node)
    } else if name == "sup" {
        format_sup(walker, node)
    } else if name == "dl" {
        format_indented(walker, node, "  ")
    } else if name == "blockquote" {
        format_indented(walker, node, "    ")
    } else if matches!(name.as_str(), "h3" | "h4" | "h5") {
        format_heading(walker, node, (name.as_bytes()[1] - b'0') as usize)
    } else {
        return None;
    };

    walker.note(&text);
    Some(text)
}

/// One line per item, `N. ` or `• ` markers, nested lists indented two
/// spaces per level. Empty placeholder items are skipped and do not
/// advance the ordinal.
fn format_list(walker: &mut Walker, node: &Handle, ordered: bool) -> String {
    let mut text = if walker.last_char() == Some('\n') {
        String::new()
    } else {
        "\n".to_string()
    };
    let line_indent = walker.indent().to_string();
    let saved = walker.push_indent("  ");

    let mut ordinal = 1;
    for li in dom::element_children(node) {
        if dom::tag_name(&li).as_deref() != Some("li") {
            continue;
        }
        if dom::has_class(&li, "mw-empty-elt") {
            continue;
        }

        let marker = if ordered {
            let marker = format!("{ordinal}. ");
            ordinal += 1;
            marker
        } else {
            "• ".to_string()
        };
        text.push_str(&line_indent);
        text.push_str(&marker);
        walker.note(&marker);
        text.push_str(&walker.get_text(&li));
        text.push('\n');
        walker.note("\n");
    }

    walker.restore_indent(saved);
    text
}

/// LaTeX from the `annotation` element, `$…$ ` when the inner span is
/// inline math, `$$…$$` on its own line otherwise.
fn format_math(node: &Handle) -> String {
    let annotation =
        dom::find_element(node, &|h| dom::tag_name(h).as_deref() == Some("annotation"));
    let Some(annotation) = annotation else {
        return "< --- MISSING MATH --- >".to_string();
    };

    let inline = dom::find_element(node, &|h| dom::tag_name(h).as_deref() == Some("span"))
        .is_some_and(|span| dom::has_class(&span, "mwe-math-mathml-inline"));

    let mut latex = dom::text_content(&annotation).trim().to_string();
    if let Some(rest) = latex.strip_prefix("{\\displaystyle") {
        let rest = rest.strip_suffix('}').unwrap_or(rest);
        latex = rest.trim().to_string();
    }

    if inline {
        format!("${latex}$ ")
    } else {
        format!("$${latex}$$\n")
    }
}

/// Citation markers vanish; other superscripts keep a `^` prefix.
fn format_sup(walker: &mut Walker, node: &Handle) -> String {
    if dom::has_class(node, "reference") {
        return String::new();
    }
    format!("^{}", walker.walk_children(node))
}

/// Definition lists and block quotes: indented block with a trailing
/// newline.
fn format_indented(walker: &mut Walker, node: &Handle, extra_indent: &str) -> String {
    let saved = walker.push_indent(extra_indent);
    let mut text = walker.walk_children(node);
    walker.restore_indent(saved);
    text.push('\n');
    text
}

/// `###`-style heading with a trailing newline.
fn format_heading(walker: &mut Walker, node: &Handle, level: usize) -> String {
    let mut text = "#".repeat(level);
    text.push(' ');
    text.push_str(&walker.walk_children(node));
    text.push('\n');
    text
}
