// Wiki HTML → per-section markdown.
//
// Parses the page with html5ever and walks the content container with a
// three-state machine: skip the preamble until the first paragraph,
// accumulate one string per h2 section, stop at the end-of-article
// headings. Node text comes from a recursive walker (walker.rs) whose
// per-element formatting rules live in handlers.rs.

pub(crate) mod dom;
mod handlers;
mod walker;

use std::collections::HashSet;
use std::path::Path;
use std::sync::LazyLock;

use markup5ever_rcdom::Handle;
use rayon::prelude::*;
use tracing::info;

use crate::error::Result;
use crate::records::{self, RawPage, SectionRecord};
use crate::workers;

use walker::Walker;

/// h2 ids that end the readable part of an article.
static END_IDS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    HashSet::from([
        "See_also",
        "Notes",
        "References",
        "Further_reading",
        "External_links",
        "References_and_notes",
        "Footnotes",
    ])
});

/// Tags whose subtrees never contain readable prose.
static UNWANTED_TAGS: LazyLock<HashSet<&'static str>> =
    LazyLock::new(|| HashSet::from(["meta", "style", "mstyle", "figure", "table"]));

/// Classes marking navigation, references, templates, and decoration.
static UNWANTED_CLASSES: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    HashSet::from([
        "Inline-Template",
        "Template-Fact",
        "ambox",
        "box-Fringe_theories",
        "cartbox",
        "gallery",
        "hatnote",
        "infobox",
        "locmap",
        "magnify",
        "mbox",
        "media",
        "metadata",
        "mw-editsection",
        "mw-empty-elt",
        "navbar",
        "navbox",
        "navbox-styles",
        "navigation-not-searchable",
        "noprint",
        "portal",
        "reflist",
        "reference",
        "references",
        "sidebar",
        "stub",
        "thumb",
        "thumbinner",
        "toc",
        "vertical-navbox",
        "wikitable",
    ])
});

/// Where the top-level walk is within the article body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SectionState {
    SkipPreamble,
    InSection,
    Done,
}

/// Converts one wiki HTML document into per-section markdown strings.
#[derive(Debug, Default)]
pub struct Extractor;

impl Extractor {
    pub fn new() -> Self {
        Self
    }

    /// Extract the readable sections of one page.
    ///
    /// Returns an empty vector when the content container or the title is
    /// missing; a broken subtree yields an empty string for that subtree
    /// but never aborts the page.
    pub fn extract(&self, html: &str) -> Vec<String> {
        let dom = dom::parse_html(html);

        let title = dom::find_element(&dom.document, &|h| {
            dom::tag_name(h).as_deref() == Some("h1")
                && dom::get_attr(h, "id").as_deref() == Some("firstHeading")
        });
        let Some(title) = title else {
            return Vec::new();
        };
        let title = dom::text_content(&title).trim().to_string();

        let Some(main) = dom::find_element(&dom.document, &is_content_container) else {
            return Vec::new();
        };

        let mut sections = Vec::new();
        let mut text = format!("# {title}\n\n");
        let mut walker = Walker::new();
        let mut state = SectionState::SkipPreamble;

        for child in dom::element_children(&main) {
            if state == SectionState::SkipPreamble {
                if dom::tag_name(&child).as_deref() == Some("p") {
                    state = SectionState::InSection;
                    walker.reset();
                } else {
                    continue;
                }
            }

            if is_end(&child) {
                state = SectionState::Done;
            } else if is_new_section(&child) {
                if !text.is_empty() {
                    sections.push(text);
                }
                text = format!("## {}\n\n", heading_title(&child));
                walker.reset();
            } else {
                text.push_str(&walker.get_text(&child));
            }

            if state == SectionState::Done {
                break;
            }
        }

        if !text.is_empty() {
            sections.push(text);
        }
        sections
    }
}

/// The English article body: `div.mw-content-ltr.mw-parser-output` with
/// `lang="en"`.
fn is_content_container(handle: &Handle) -> bool {
    dom::tag_name(handle).as_deref() == Some("div")
        && dom::has_class(handle, "mw-content-ltr")
        && dom::has_class(handle, "mw-parser-output")
        && dom::get_attr(handle, "lang").as_deref() == Some("en")
}

/// A `div` whose first child is an `h2` with an end-of-article id.
fn is_end(handle: &Handle) -> bool {
    if dom::tag_name(handle).as_deref() != Some("div") {
        return false;
    }
    let Some(first) = dom::first_child(handle) else {
        return false;
    };
    dom::tag_name(&first).as_deref() == Some("h2")
        && dom::get_attr(&first, "id")
            .is_some_and(|id| END_IDS.contains(id.as_str()))
}

/// A section-heading wrapper.
fn is_new_section(handle: &Handle) -> bool {
    dom::has_class(handle, "mw-heading2")
}

/// Text of the wrapper's `h2`.
fn heading_title(handle: &Handle) -> String {
    dom::find_element(handle, &|h| dom::tag_name(h).as_deref() == Some("h2"))
        .map(|h2| dom::text_content(&h2))
        .unwrap_or_default()
}

/// Extract every page of a raw crawl file into section records.
pub fn extract_file(inpath: &Path, outpath: &Path, processes: usize) -> Result<()> {
    info!("started extracting {}", inpath.display());
    let records: Vec<RawPage> = records::read_records(inpath)?;
    let total = records.len();
    let pool = workers::pool(processes)?;

    let extracted: Vec<SectionRecord> = pool.install(|| {
        records
            .into_par_iter()
            .enumerate()
            .map_init(Extractor::new, |extractor, (page_num, page)| {
                info!("extracting page {} / {} : {}", page_num + 1, total, page.url);
                SectionRecord {
                    url: page.url,
                    text_list: extractor.extract(&page.text),
                }
            })
            .collect()
    });

    records::write_records(outpath, &extracted)?;
    info!("finished extracting {}", inpath.display());
    Ok(())
}
