// Frontier link extraction.
//
// Collects article links from a fetched page: `/wiki/` hrefs, excluding
// list pages, the main page, namespaced pages (href containing `:`), and
// redirect anchors. Hrefs resolve against the wiki origin.

use markup5ever_rcdom::NodeData;
use url::Url;

use crate::error::{PipelineError, Result};
use crate::extract::dom;

/// Default crawl origin.
pub const WIKI_ORIGIN: &str = "https://en.wikipedia.org";

pub struct LinkExtractor {
    origin: Url,
}

impl LinkExtractor {
    pub fn new(origin: &str) -> Result<Self> {
        let origin = Url::parse(origin)
            .map_err(|err| PipelineError::Config(format!("crawl origin {origin}: {err}")))?;
        Ok(Self { origin })
    }

    /// All wanted article URLs in document order. May contain repeats; the
    /// caller deduplicates against its frontier.
    pub fn extract(&self, html: &str) -> Vec<String> {
        let dom = dom::parse_html(html);
        let mut urls = Vec::new();

        dom::walk(&dom.document, &mut |node| {
            if !matches!(node.data, NodeData::Element { .. }) {
                return;
            }
            if dom::tag_name(node).as_deref() != Some("a") {
                return;
            }
            let Some(href) = dom::get_attr(node, "href") else {
                return;
            };
            if !wanted_href(&href) || dom::has_class(node, "mw-redirect") {
                return;
            }
            if let Ok(url) = self.origin.join(&href) {
                urls.push(url.to_string());
            }
        });

        urls
    }
}

fn wanted_href(href: &str) -> bool {
    href.starts_with("/wiki/")
        && !href.starts_with("/wiki/List_of")
        && !href.starts_with("/wiki/Main_Page")
        && !href.contains(':')
}
