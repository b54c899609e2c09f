//! Wildcarder CLI - seeded wildcard/template expansion

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;

use wildcarder::error::{FixSuggestion, WildcardError};
use wildcarder::paths::USER_PATHS_FILE;
use wildcarder::processor::{ProcessRequest, WildcardProcessor};
use wildcarder::resolver;

#[derive(Parser)]
#[command(name = "wildcarder")]
#[command(about = "Wildcarder - seeded wildcard/template expansion for prompt text")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Expand a template string
    Expand {
        /// Template text, e.g. "a __colors__ {cat|dog}"
        template: String,

        /// RNG seed; the same seed reproduces the same output
        #[arg(short, long, default_value_t = 0)]
        seed: u64,

        /// Separator for multi-select picks
        #[arg(long, default_value = " ")]
        separator: String,

        /// Tag delimiter pairs, e.g. "[],<>"
        #[arg(short, long, default_value = "")]
        tags: String,

        /// Wildcard directory (repeatable; defaults to ./wildcards)
        #[arg(short, long)]
        root: Vec<PathBuf>,

        /// User paths file listing extra wildcard directories
        #[arg(long)]
        paths_file: Option<PathBuf>,
    },

    /// List discovered wildcard files
    Files {
        /// Wildcard directory (repeatable; defaults to ./wildcards)
        #[arg(short, long)]
        root: Vec<PathBuf>,

        /// User paths file listing extra wildcard directories
        #[arg(long)]
        paths_file: Option<PathBuf>,
    },

    /// Show the ranked file matches for a wildcard name
    Which {
        /// The wildcard name to resolve, without underscores
        query: String,

        /// Wildcard directory (repeatable; defaults to ./wildcards)
        #[arg(short, long)]
        root: Vec<PathBuf>,

        /// User paths file listing extra wildcard directories
        #[arg(long)]
        paths_file: Option<PathBuf>,
    },

    /// Create a starter wildcards directory
    Init {
        /// Target directory
        #[arg(default_value = "wildcards")]
        dir: PathBuf,
    },
}

fn main() {
    // Initialize tracing; diagnostics go to stderr so stdout stays clean
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Expand {
            template,
            seed,
            separator,
            tags,
            root,
            paths_file,
        } => expand(template, seed, separator, tags, root, paths_file),
        Commands::Files { root, paths_file } => list_files(root, paths_file),
        Commands::Which {
            query,
            root,
            paths_file,
        } => which(&query, root, paths_file),
        Commands::Init { dir } => init(&dir),
    };

    if let Err(e) = result {
        eprintln!("{} {}", "Error:".red().bold(), e);
        if let Some(suggestion) = e
            .downcast_ref::<WildcardError>()
            .and_then(FixSuggestion::fix_suggestion)
        {
            eprintln!("  {} {}", "Fix:".yellow(), suggestion);
        }
        std::process::exit(1);
    }
}

fn build_processor(
    roots: Vec<PathBuf>,
    paths_file: Option<PathBuf>,
) -> Result<WildcardProcessor, WildcardError> {
    let mut roots = roots;
    if roots.is_empty() {
        let default = PathBuf::from("wildcards");
        if default.is_dir() {
            roots.push(default);
        }
    }
    // Only pick up the default paths file when it already exists; an
    // explicit --paths-file is created on demand
    let paths_file = paths_file.or_else(|| {
        let default = PathBuf::from("wildcards").join(USER_PATHS_FILE);
        default.exists().then_some(default)
    });
    WildcardProcessor::from_config(roots, paths_file.as_deref())
}

fn expand(
    template: String,
    seed: u64,
    separator: String,
    tags: String,
    roots: Vec<PathBuf>,
    paths_file: Option<PathBuf>,
) -> Result<()> {
    let processor = build_processor(roots, paths_file)?;
    let request = ProcessRequest {
        wildcard_string: template,
        seed,
        multiple_separator: separator,
        recache_wildcards: false,
        tag_extraction_tags: tags.clone(),
    };
    let output = processor.process(&request)?;

    println!("{}", output.processed_text);
    if !tags.is_empty() {
        println!("{} {}", "Tags:".cyan().bold(), output.extracted_tags_string);
        println!("{} {}", "Raw tags:".cyan().bold(), output.raw_tags_string);
    }
    Ok(())
}

fn list_files(roots: Vec<PathBuf>, paths_file: Option<PathBuf>) -> Result<()> {
    let processor = build_processor(roots, paths_file)?;
    let store = processor.store();

    let roots = store.existing_roots();
    if roots.is_empty() {
        println!("No wildcard directories found. Run 'wildcarder init' to create one.");
        return Ok(());
    }

    let files = store.files();
    for root in &roots {
        let under_root: Vec<_> = files.iter().filter(|f| f.starts_with(root)).collect();
        println!(
            "{} {} [{}]",
            "→".cyan(),
            root.display().to_string().bold(),
            under_root.len()
        );
        for file in under_root {
            let rel = file.strip_prefix(root).unwrap_or(file);
            println!("  {}", rel.display());
        }
    }
    Ok(())
}

fn which(query: &str, roots: Vec<PathBuf>, paths_file: Option<PathBuf>) -> Result<()> {
    let processor = build_processor(roots, paths_file)?;
    let store = processor.store();
    let files = store.files();
    let roots = store.existing_roots();

    let matches = resolver::rank_matches(query, &files, &roots);
    if matches.is_empty() {
        println!("No matching files found for '{query}'");
        return Ok(());
    }

    println!("Candidate files for '{query}' (sorted by relevance):");
    for (path, score) in &matches {
        println!(
            "  {:<50} : {:>8.3} ({})",
            path.display(),
            score.score,
            score.reason
        );
    }
    let (best, _) = matches[0];
    println!("{} {}", "Selected:".green().bold(), best.display());
    Ok(())
}

fn init(dir: &Path) -> Result<()> {
    let result = wildcarder::init::init_wildcards_dir(dir)?;
    println!("{} Initialized {}", "✓".green(), result.dir.bold());
    for file in result.files_created {
        println!("  {file}");
    }
    Ok(())
}
