//! Command-line interface definitions.
//!
//! Every option is optional: running the binary with no arguments scrapes
//! with the built-in defaults. Options override values from the YAML config
//! file, which in turn overrides the defaults.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Command-line arguments for the scraper.
///
/// # Examples
///
/// ```sh
/// # Full incremental scrape with defaults
/// fitness_scraper
///
/// # Custom output locations, deduplicating against the site database
/// fitness_scraper -o ./scraped -i ./public/images/articles --mongodb-uri mongodb://localhost/site
///
/// # Report what a later import would pick up
/// fitness_scraper check
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Optional path to a YAML config file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Directory for per-article JSON files and summary.json
    #[arg(short, long, env = "SCRAPER_OUTPUT_DIR", global = true)]
    pub output_dir: Option<PathBuf>,

    /// Root directory for downloaded images
    #[arg(short, long, env = "SCRAPER_IMAGES_DIR", global = true)]
    pub images_dir: Option<PathBuf>,

    /// Site to crawl
    #[arg(long, env = "SCRAPER_BASE_URL", global = true)]
    pub base_url: Option<String>,

    /// Connection string of the site's document store, used for deduplication
    #[arg(long, env = "MONGODB_URI", global = true)]
    pub mongodb_uri: Option<String>,

    /// Append the fallback article list when discovery finds fewer than this
    #[arg(long)]
    pub min_articles: Option<usize>,

    /// Links whose slug is not longer than this are treated as listing pages
    #[arg(long)]
    pub min_slug_len: Option<usize>,

    /// Disable every politeness delay
    #[arg(long)]
    pub no_delay: bool,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Discover, extract, and persist new articles (the default)
    Scrape,
    /// Report scraped articles not yet present in the record store
    Check,
}

impl Cli {
    pub fn command(&self) -> Command {
        self.command.unwrap_or(Command::Scrape)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_no_arguments_scrapes() {
        let cli = Cli::parse_from(["fitness_scraper"]);
        assert_eq!(cli.command(), Command::Scrape);
        assert!(cli.config.is_none());
        assert!(!cli.no_delay);
    }

    #[test]
    fn test_cli_short_flags() {
        let cli = Cli::parse_from([
            "fitness_scraper",
            "-o",
            "/tmp/json",
            "-i",
            "/tmp/images",
            "--min-articles",
            "10",
        ]);

        assert_eq!(cli.output_dir, Some(PathBuf::from("/tmp/json")));
        assert_eq!(cli.images_dir, Some(PathBuf::from("/tmp/images")));
        assert_eq!(cli.min_articles, Some(10));
    }

    #[test]
    fn test_cli_check_subcommand_with_global_flag() {
        let cli = Cli::parse_from(["fitness_scraper", "check", "-o", "./scraped"]);
        assert_eq!(cli.command(), Command::Check);
        assert_eq!(cli.output_dir, Some(PathBuf::from("./scraped")));
    }
}
