use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use env_logger::Env;
use log::info;

use nodeforge::parser::subparser::extract_from_body;
use nodeforge::parser::{ParseCache, ParserPool};
use nodeforge::pipeline::{render_links, ConfigUpdater, FileStore, HttpFetcher, SettingsFile};
use nodeforge::{parse_link, Settings};

/// Collect proxy share links and build a Clash config from them
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run one full update from the sources in a settings file
    Run {
        /// Path to the settings file (TOML or YAML)
        #[arg(short, long, value_name = "FILE")]
        config: PathBuf,
    },
    /// Build a Clash config from a local file of share links
    Render {
        /// File holding share links, plain or Base64-wrapped
        #[arg(short, long, value_name = "FILE")]
        input: PathBuf,

        /// Output file; printed to stdout when omitted
        #[arg(short, long, value_name = "OUTPUT_FILE")]
        output: Option<PathBuf>,

        /// Settings file for listener and group options
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,
    },
    /// Parse one share link and print the node as JSON
    Parse {
        #[arg(value_name = "LINK")]
        link: String,
    },
}

fn load_settings(path: Option<&PathBuf>) -> Result<Settings> {
    match path {
        Some(path) => Settings::load(path)
            .with_context(|| format!("failed to load settings from {}", path.display())),
        None => Ok(Settings::default()),
    }
}

async fn run_update(config: PathBuf) -> Result<()> {
    let settings = load_settings(Some(&config))?;
    let fetcher = HttpFetcher::new(&settings.fetch).context("failed to build HTTP client")?;
    let store = FileStore::new(settings.target_dir());
    let updater = ConfigUpdater::new(SettingsFile::new(&config), fetcher, store, &settings);

    let record = updater.run().await.context("update run failed")?;
    info!(
        "Run #{} done: {} sources fetched, {} links, {} nodes",
        record.id,
        record.counts.sources_fetched,
        record.counts.links_extracted,
        record.counts.nodes_final
    );
    for (region, count) in &record.regions {
        info!("  {}: {}", region, count);
    }
    Ok(())
}

fn render(input: PathBuf, output: Option<PathBuf>, config: Option<PathBuf>) -> Result<()> {
    let settings = load_settings(config.as_ref())?;
    let body = fs::read_to_string(&input)
        .with_context(|| format!("failed to read {}", input.display()))?;
    let links = extract_from_body(&body);
    if links.is_empty() {
        bail!("no share links found in {}", input.display());
    }

    let pool = ParserPool::new(
        settings.parser.workers,
        Arc::new(ParseCache::new(
            settings.parser.cache_ttl(),
            settings.parser.cache_sweep_threshold,
        )),
    );
    let document = render_links(
        &pool,
        &links,
        &settings.sources.filter_keywords,
        &settings.clash,
    )?;

    match output {
        Some(path) => {
            fs::write(&path, document)
                .with_context(|| format!("failed to write {}", path.display()))?;
            info!("Wrote {}", path.display());
        }
        None => print!("{}", document),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init_from_env(Env::default().default_filter_or("info"));

    let args = Args::parse();
    match args.command {
        Command::Run { config } => run_update(config).await,
        Command::Render {
            input,
            output,
            config,
        } => render(input, output, config),
        Command::Parse { link } => {
            let node = parse_link(&link)?;
            println!("{}", serde_json::to_string_pretty(&node)?);
            Ok(())
        }
    }
}
