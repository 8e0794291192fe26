// Stage runner: one subcommand per pipeline stage.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgAction, Parser, Subcommand};
use tracing::error;
use tracing_subscriber::EnvFilter;

use wikicorpus::crawl::{CrawlPaths, Crawler};
use wikicorpus::dedup::{DedupParams, Deduplicator};
use wikicorpus::{bpe, config, extract, freqdict, normalize, segment, stats};

#[derive(Parser)]
#[command(name = "wikicorpus", version, about = "Wiki pages to a tokenized training corpus")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Crawl wiki pages into a raw data file.
    Crawl {
        /// YAML settings file with the crawl seeds.
        #[arg(long)]
        config: PathBuf,
        /// Output record file of fetched pages.
        #[arg(long)]
        data: PathBuf,
        /// Queue file (one URL per line).
        #[arg(long)]
        queue: PathBuf,
        /// Visited file (one URL per line).
        #[arg(long)]
        visited: PathBuf,
        /// Discard queue, visited, and data files and start from the seeds.
        #[arg(long)]
        reset: bool,
        #[arg(long, default_value_t = 10)]
        max_pages: usize,
    },

    /// Extract per-section markdown from crawled HTML.
    Extract {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        output: PathBuf,
        #[arg(long, default_value_t = 4)]
        processes: usize,
    },

    /// Normalize extracted sections.
    Normalize {
        /// One or more extracted record files.
        #[arg(long, required = true, num_args = 1..)]
        input: Vec<PathBuf>,
        #[arg(long)]
        output: PathBuf,
        /// Sections shorter than this many chars are dropped.
        #[arg(long, default_value_t = 30)]
        len_cutoff: usize,
        #[arg(long, default_value_t = 4)]
        processes: usize,
    },

    /// Mark near-duplicate paragraphs.
    Dedup {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        output: PathBuf,
        #[arg(long, default_value_t = 5)]
        gram_len: usize,
        #[arg(long, default_value_t = 128)]
        signature_len: usize,
        #[arg(long, default_value_t = 16)]
        band_size: usize,
        #[arg(long, default_value_t = 0.9)]
        threshold: f64,
        #[arg(long, default_value_t = 4)]
        processes: usize,
    },

    /// Segment sections into sentences.
    Segment {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        output: PathBuf,
        /// Drop paragraphs marked as duplicates.
        #[arg(long, default_value_t = true, action = ArgAction::Set)]
        omit_duplicates: bool,
        #[arg(long, default_value_t = 4)]
        processes: usize,
    },

    /// Build the word frequency dictionary.
    Freqdict {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        output: PathBuf,
        #[arg(long, default_value_t = 4)]
        processes: usize,
    },

    /// Induce a BPE vocabulary from the frequency dictionary.
    Vocab {
        #[arg(long)]
        freq_dict: PathBuf,
        #[arg(long)]
        output: PathBuf,
        #[arg(long)]
        target_size: usize,
        #[arg(long, default_value_t = 4)]
        processes: usize,
    },

    /// Tokenize the segmented corpus against a vocabulary.
    Tokenize {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        output: PathBuf,
        #[arg(long)]
        vocab: PathBuf,
        #[arg(long, default_value_t = 4)]
        processes: usize,
    },

    /// Count occurrences of given characters across record files.
    Analyze {
        #[arg(long, required = true, num_args = 1..)]
        input: Vec<PathBuf>,
        /// Characters to count, as one string.
        #[arg(long)]
        chars: String,
        #[arg(long, default_value_t = 4)]
        processes: usize,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> wikicorpus::Result<()> {
    match cli.command {
        Command::Crawl {
            config,
            data,
            queue,
            visited,
            reset,
            max_pages,
        } => {
            let paths = CrawlPaths {
                data,
                queue,
                visited,
            };
            let mut crawler = if reset {
                let settings = config::load(&config)?;
                Crawler::reset(paths, &settings.crawl_seeds)?
            } else {
                Crawler::resume(paths)?
            };
            crawler.crawl(max_pages)?;
            Ok(())
        }

        Command::Extract {
            input,
            output,
            processes,
        } => extract::extract_file(&input, &output, processes),

        Command::Normalize {
            input,
            output,
            len_cutoff,
            processes,
        } => normalize::normalize_files(&input, &output, len_cutoff, processes),

        Command::Dedup {
            input,
            output,
            gram_len,
            signature_len,
            band_size,
            threshold,
            processes,
        } => {
            let dedup = Deduplicator::new(DedupParams {
                gram_len,
                signature_len,
                band_size,
                similarity_threshold: threshold,
            })?;
            dedup.deduplicate_file(&input, &output, processes)
        }

        Command::Segment {
            input,
            output,
            omit_duplicates,
            processes,
        } => segment::segment_file(&input, &output, processes, omit_duplicates),

        Command::Freqdict {
            input,
            output,
            processes,
        } => freqdict::freq_dict_file(&input, &output, processes),

        Command::Vocab {
            freq_dict,
            output,
            target_size,
            processes,
        } => bpe::build_vocab_file(&freq_dict, &output, target_size, processes),

        Command::Tokenize {
            input,
            output,
            vocab,
            processes,
        } => bpe::tokenize_file(&input, &output, &vocab, processes),

        Command::Analyze {
            input,
            chars,
            processes,
        } => {
            let chars: Vec<char> = chars.chars().collect();
            let counts = stats::char_frequencies(&input, &chars, processes)?;
            for (c, count) in counts {
                println!("{c} = U+{:04X}  -  {count:9} times", c as u32);
            }
            Ok(())
        }
    }
}
