//! Design-pattern playground CLI.
//!
//! Runs snippets through the same sandbox the web UI uses and exposes the
//! pattern catalog (listing, markdown export, validation) from the terminal.

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use tracing::debug;

use playground::core::catalog::{Pattern, matches_query};
use playground::core::markdown::render_markdown;
use playground::exit_codes;
use playground::io::config::{
    DEFAULT_CONFIG_PATH, PlaygroundConfig, load_config, write_config,
};
use playground::session::SessionHost;
use playground::validate::load_catalog;

#[derive(Parser)]
#[command(
    name = "playground",
    version,
    about = "Run and explore JavaScript design-pattern snippets"
)]
struct Cli {
    /// Config file.
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Write a default config file if missing.
    Init {
        /// Overwrite an existing file.
        #[arg(short, long)]
        force: bool,
    },
    /// Execute a snippet and print its output.
    ///
    /// Reads FILE, the code template of --pattern, or stdin.
    Run {
        file: Option<PathBuf>,
        /// Run the code template of the pattern with this slug.
        #[arg(short, long, conflicts_with = "file")]
        pattern: Option<String>,
    },
    /// Print a pattern as markdown.
    Export { slug: String },
    /// List patterns as `slug<TAB>name`.
    List {
        #[arg(short, long)]
        category: Option<String>,
        /// Case-insensitive match on name or description.
        #[arg(short, long)]
        query: Option<String>,
    },
    /// Check a catalog file against the schema and invariants.
    Validate { file: Option<PathBuf> },
}

fn main() {
    playground::logging::init("warn");
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("{:#}", err);
            std::process::exit(exit_codes::INVALID);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    match cli.command {
        Command::Init { force } => cmd_init(&cli.config, force),
        Command::Run { file, pattern } => {
            let cfg = load_config(&cli.config)?;
            cmd_run(&cfg, file.as_deref(), pattern.as_deref())
        }
        Command::Export { slug } => {
            let cfg = load_config(&cli.config)?;
            cmd_export(&cfg, &slug)
        }
        Command::List { category, query } => {
            let cfg = load_config(&cli.config)?;
            cmd_list(&cfg, category.as_deref(), query.as_deref())
        }
        Command::Validate { file } => {
            let cfg = load_config(&cli.config)?;
            cmd_validate(file.as_deref().or(cfg.catalog_path.as_deref()))
        }
    }
}

fn cmd_init(path: &Path, force: bool) -> Result<i32> {
    if !force && path.exists() {
        debug!(path = %path.display(), "config exists, leaving it");
        return Ok(exit_codes::OK);
    }
    write_config(path, &PlaygroundConfig::default())?;
    Ok(exit_codes::OK)
}

fn cmd_run(cfg: &PlaygroundConfig, file: Option<&Path>, slug: Option<&str>) -> Result<i32> {
    let source = match (file, slug) {
        (Some(path), _) => {
            fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?
        }
        (None, Some(slug)) => find_pattern(cfg, slug)?.code_template,
        (None, None) => {
            let mut source = String::new();
            std::io::stdin()
                .read_to_string(&mut source)
                .context("read snippet from stdin")?;
            source
        }
    };

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .context("build tokio runtime")?;
    let result = runtime.block_on(async {
        let host = SessionHost::from_config(cfg);
        let session = host.open_session(source, "javascript");
        if let Some(handle) = session.run() {
            handle.await.context("join run task")?;
        }
        session
            .last_result()
            .ok_or_else(|| anyhow!("run finished without a result"))
    })?;

    println!("{}", result.display_text());
    Ok(if result.is_success() {
        exit_codes::OK
    } else {
        exit_codes::EXECUTION_FAILED
    })
}

fn cmd_export(cfg: &PlaygroundConfig, slug: &str) -> Result<i32> {
    let pattern = find_pattern(cfg, slug)?;
    println!("{}", render_markdown(&pattern)?);
    Ok(exit_codes::OK)
}

fn cmd_list(cfg: &PlaygroundConfig, category: Option<&str>, query: Option<&str>) -> Result<i32> {
    let patterns = load_catalog(cfg.catalog_path.as_deref())?;
    for pattern in patterns.iter().filter(|pattern| {
        category.is_none_or(|category| pattern.category == category)
            && query.is_none_or(|query| matches_query(pattern, query))
    }) {
        println!("{}\t{}", pattern.slug, pattern.name);
    }
    Ok(exit_codes::OK)
}

fn cmd_validate(file: Option<&Path>) -> Result<i32> {
    let patterns = load_catalog(file)?;
    println!("ok: {} patterns", patterns.len());
    Ok(exit_codes::OK)
}

fn find_pattern(cfg: &PlaygroundConfig, slug: &str) -> Result<Pattern> {
    load_catalog(cfg.catalog_path.as_deref())?
        .into_iter()
        .find(|pattern| pattern.slug == slug)
        .ok_or_else(|| anyhow!("unknown pattern: {slug}"))
}
