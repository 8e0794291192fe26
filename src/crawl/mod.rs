// Polite single-host crawling.
//
// BFS over article links with a persistent queue and visited set. The data
// file is append-only so an aborted run keeps what it fetched; the queue
// file is rewritten atomically at shutdown so the next run resumes where
// this one stopped.

mod limiter;
mod links;

pub use limiter::RateLimiter;
pub use links::{LinkExtractor, WIKI_ORIGIN};

use std::collections::{HashSet, VecDeque};
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use reqwest::blocking::Client;
use reqwest::StatusCode;
use tracing::{info, warn};

use crate::error::{PipelineError, Result};
use crate::records::{RawPage, RecordWriter};

/// Identifies the crawler to the host.
const USER_AGENT: &str =
    "wikicorpus/0.1 (educational corpus project; https://github.com/simidzija/wikicorpus)";

/// Bucket refill rate, tokens per second.
const REFILL_RATE: f64 = 1.0;
/// Bucket capacity.
const BUCKET_LIMIT: f64 = 10.0;

/// Files a crawl run reads and writes.
#[derive(Debug, Clone)]
pub struct CrawlPaths {
    pub data: PathBuf,
    pub queue: PathBuf,
    pub visited: PathBuf,
}

pub struct Crawler {
    paths: CrawlPaths,
    queue: VecDeque<String>,
    visited: HashSet<String>,
    /// Queue ∪ visited: everything already discovered, to suppress
    /// re-enqueueing.
    extracted: HashSet<String>,
    limiter: RateLimiter,
    client: Client,
    links: LinkExtractor,
}

impl Crawler {
    /// Fresh crawl: truncate the data, queue, and visited files and seed
    /// the queue.
    pub fn reset(paths: CrawlPaths, seeds: &[String]) -> Result<Self> {
        if seeds.is_empty() {
            return Err(PipelineError::Config(
                "reset crawl requires seed urls".to_string(),
            ));
        }

        File::create(&paths.data)?;
        File::create(&paths.queue)?;
        File::create(&paths.visited)?;

        let queue: VecDeque<String> = seeds.iter().cloned().collect();
        let extracted: HashSet<String> = seeds.iter().cloned().collect();
        Self::build(paths, queue, HashSet::new(), extracted)
    }

    /// Resume from the queue and visited files of a previous run.
    pub fn resume(paths: CrawlPaths) -> Result<Self> {
        let queue: VecDeque<String> = read_url_lines(&paths.queue)?.into();
        let visited: HashSet<String> = read_url_lines(&paths.visited)?.into_iter().collect();
        let extracted: HashSet<String> = queue.iter().chain(visited.iter()).cloned().collect();
        Self::build(paths, queue, visited, extracted)
    }

    fn build(
        paths: CrawlPaths,
        queue: VecDeque<String>,
        visited: HashSet<String>,
        extracted: HashSet<String>,
    ) -> Result<Self> {
        let client = Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self {
            paths,
            queue,
            visited,
            extracted,
            limiter: RateLimiter::new(REFILL_RATE, BUCKET_LIMIT),
            client,
            links: LinkExtractor::new(WIKI_ORIGIN)?,
        })
    }

    /// Fetch up to `max_pages` pages. Returns the number fetched.
    ///
    /// A 429 aborts the run after persisting the queue; other non-200
    /// statuses skip the URL. The queue file is rewritten on every exit
    /// path.
    pub fn crawl(&mut self, max_pages: usize) -> Result<usize> {
        info!("started crawling");
        let mut data = RecordWriter::append(&self.paths.data)?;
        let mut visited_file = BufWriter::new(
            OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.paths.visited)?,
        );

        let mut page_count = 0;
        while page_count < max_pages {
            let Some(url) = self.queue.pop_front() else {
                break;
            };

            self.limiter.acquire();
            let response = match self.client.get(url.as_str()).send() {
                Ok(response) => response,
                Err(err) => {
                    warn!("request for {url} failed: {err}");
                    self.queue.push_front(url);
                    self.save_queue()?;
                    return Err(err.into());
                }
            };

            let status = response.status();
            info!("crawling {url} - status: {status}");
            if status == StatusCode::OK {
                let body = match response.text() {
                    Ok(body) => body,
                    Err(err) => {
                        warn!("reading body of {url} failed: {err}");
                        self.queue.push_front(url);
                        self.save_queue()?;
                        return Err(err.into());
                    }
                };
                self.scrape(&url, &body, &mut data, &mut visited_file)?;
                page_count += 1;
            } else if status == StatusCode::TOO_MANY_REQUESTS {
                warn!("stopping crawl - status: {status}");
                self.queue.push_front(url);
                break;
            }
            // Other statuses: skip the URL.
        }

        visited_file.flush()?;
        self.save_queue()?;
        info!("finished crawling ({page_count} pages)");
        Ok(page_count)
    }

    fn scrape(
        &mut self,
        url: &str,
        body: &str,
        data: &mut RecordWriter,
        visited_file: &mut BufWriter<File>,
    ) -> Result<()> {
        data.write(&RawPage {
            url: url.to_string(),
            text: body.to_string(),
        })?;

        writeln!(visited_file, "{url}")?;
        self.visited.insert(url.to_string());

        for link in self.links.extract(body) {
            if self.extracted.insert(link.clone()) {
                self.queue.push_back(link);
            }
        }
        Ok(())
    }

    /// Rewrite the queue file through a temporary sibling and rename.
    fn save_queue(&self) -> Result<()> {
        let tmp = self.paths.queue.with_extension("tmp");
        {
            let mut writer = BufWriter::new(File::create(&tmp)?);
            for url in &self.queue {
                writeln!(writer, "{url}")?;
            }
            writer.flush()?;
        }
        fs::rename(&tmp, &self.paths.queue)?;
        Ok(())
    }

    #[cfg(test)]
    fn queue(&self) -> &VecDeque<String> {
        &self.queue
    }
}

/// One URL per line, no header.
fn read_url_lines(path: &Path) -> Result<Vec<String>> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let mut urls = Vec::new();
    for line in reader.lines() {
        let line = line?;
        let line = line.trim();
        if !line.is_empty() {
            urls.push(line.to_string());
        }
    }
    Ok(urls)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn paths(dir: &Path) -> CrawlPaths {
        CrawlPaths {
            data: dir.join("data.jsonl"),
            queue: dir.join("queue.txt"),
            visited: dir.join("visited.txt"),
        }
    }

    #[test]
    fn test_reset_seeds_the_queue() {
        let dir = tempfile::tempdir().unwrap();
        let seeds = vec!["https://en.wikipedia.org/wiki/Linguistics".to_string()];
        let crawler = Crawler::reset(paths(dir.path()), &seeds).unwrap();
        assert_eq!(crawler.queue().len(), 1);
    }

    #[test]
    fn test_reset_without_seeds_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Crawler::reset(paths(dir.path()), &[]).is_err());
    }

    #[test]
    fn test_resume_restores_queue_and_skips_known_urls() {
        let dir = tempfile::tempdir().unwrap();
        let paths = paths(dir.path());
        fs::write(&paths.queue, "https://en.wikipedia.org/wiki/A\n").unwrap();
        fs::write(&paths.visited, "https://en.wikipedia.org/wiki/B\n").unwrap();
        fs::write(&paths.data, "").unwrap();

        let crawler = Crawler::resume(paths).unwrap();
        assert_eq!(crawler.queue().len(), 1);
        assert!(crawler.extracted.contains("https://en.wikipedia.org/wiki/A"));
        assert!(crawler.extracted.contains("https://en.wikipedia.org/wiki/B"));
    }

    #[test]
    fn test_save_queue_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let paths = paths(dir.path());
        let seeds = vec![
            "https://en.wikipedia.org/wiki/A".to_string(),
            "https://en.wikipedia.org/wiki/B".to_string(),
        ];
        let crawler = Crawler::reset(paths.clone(), &seeds).unwrap();
        crawler.save_queue().unwrap();

        let restored = Crawler::resume(paths).unwrap();
        assert_eq!(restored.queue().iter().collect::<Vec<_>>(), seeds.iter().collect::<Vec<_>>());
    }
}
