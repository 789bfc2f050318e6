//! cs: code search from the command line.
//!
//! Usage:
//!   cs parse NOT legacy            # files containing "parse" but not "legacy"
//!   cs '"fn main"' /impl\s+\w+/    # quoted phrase plus a regex term
//!   cs serch~1 --rank concordance  # fuzzy term, ranked by word relation
//!   cs -f json -o out.json error   # JSON results to a file

use clap::Parser;
use cs::fmt::{write_results, OutputFormat};
use cs::services::find_repository_root;
use cs::{CancelToken, Rank, SearchConfig, SearchService, WalkConfig};
use std::io::IsTerminal;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "cs")]
#[command(about = "Ranked code search over a directory tree")]
#[command(version)]
struct Cli {
    /// Search terms: plain, "quoted phrase", /regex/, term~1, term~2, NOT term
    query: Vec<String>,

    /// Directory to search
    #[arg(long, default_value = ".")]
    root: PathBuf,

    /// Match case exactly
    #[arg(short, long)]
    case_sensitive: bool,

    /// Treat every plain term as term~1
    #[arg(long)]
    fuzzy: bool,

    /// Maximum results shown (0 = unlimited)
    #[arg(short, long, default_value = "100")]
    limit: usize,

    /// Snippet length in bytes (0 = whole file)
    #[arg(short, long, default_value = "300")]
    snippet: usize,

    /// Maximum matches recorded per term per file (0 = unlimited)
    #[arg(long, default_value = "0")]
    match_limit: usize,

    /// Mean line length above which a file is treated as minified
    #[arg(long, default_value = "255")]
    min_line_length: usize,

    /// Search binary files
    #[arg(long)]
    binary: bool,

    /// Search minified files
    #[arg(long)]
    include_min: bool,

    /// Search hidden files and directories
    #[arg(long)]
    include_hidden: bool,

    /// Ignore .ignore files
    #[arg(long)]
    no_ignore: bool,

    /// Ignore .gitignore files
    #[arg(long)]
    no_gitignore: bool,

    /// Directories never searched
    #[arg(long, value_delimiter = ',', default_value = ".git,.hg,.svn")]
    exclude_dir: Vec<String>,

    /// Skip files whose path matches any of these regexes (case-insensitive)
    #[arg(short = 'x', long, value_delimiter = ',')]
    exclude_pattern: Vec<String>,

    /// Only search files with these extensions
    #[arg(short = 'i', long, value_delimiter = ',')]
    include_ext: Vec<String>,

    /// Search from the enclosing repository root
    #[arg(short = 'r', long)]
    find_root: bool,

    /// Output format: text or json
    #[arg(short, long, default_value = "text")]
    format: String,

    /// Write results to a file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Ranking: frequency or concordance
    #[arg(long, default_value = "frequency")]
    rank: String,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,

    /// Log progress to stderr
    #[arg(short, long)]
    verbose: bool,

    /// Log debug information to stderr
    #[arg(long)]
    debug: bool,

    /// Log per-file timings to stderr
    #[arg(short, long)]
    trace: bool,
}

impl Cli {
    fn log_level(&self) -> &'static str {
        if self.trace {
            "trace"
        } else if self.debug {
            "debug"
        } else if self.verbose {
            "info"
        } else {
            "warn"
        }
    }

    fn search_config(&self, rank: Rank) -> SearchConfig {
        SearchConfig {
            case_sensitive: self.case_sensitive,
            fuzzy: self.fuzzy,
            match_limit: self.match_limit,
            result_limit: self.limit,
            min_line_length: self.min_line_length,
            include_binary: self.binary,
            include_minified: self.include_min,
            snippet_length: self.snippet,
            rank,
            ..SearchConfig::default()
        }
    }

    fn walk_config(&self) -> WalkConfig {
        WalkConfig {
            include_hidden: self.include_hidden,
            git_ignore: !self.no_gitignore,
            ignore_files: !self.no_ignore,
            exclude_dirs: self.exclude_dir.clone(),
            exclude_patterns: self.exclude_pattern.clone(),
            include_ext: self.include_ext.clone(),
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Log to stderr only (stdout carries results)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(format!("cs={}", cli.log_level()).parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    if cli.query.is_empty() {
        tracing::info!("no search terms given, nothing will match");
    }

    let format: OutputFormat = cli.format.parse().map_err(|e: String| anyhow::anyhow!(e))?;
    let rank: Rank = cli.rank.parse().map_err(|e: String| anyhow::anyhow!(e))?;

    let root = if cli.find_root {
        find_repository_root(&cli.root)
    } else {
        cli.root.clone()
    };

    let config = cli.search_config(rank);
    let snippet_length = config.snippet_length;
    let service = SearchService::new(config);
    let outcome = service.search_dir(&root, &cli.query, &cli.walk_config(), &CancelToken::new())?;

    let color = !cli.no_color && cli.output.is_none() && std::io::stdout().is_terminal();
    write_results(
        &outcome,
        format,
        snippet_length,
        color,
        cli.output.as_deref(),
    )?;

    Ok(())
}
