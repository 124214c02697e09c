use std::{io::IsTerminal, path::PathBuf, process::ExitCode};

use assetfetch::{
    batch,
    config::{AssetSpec, Config},
    fetcher::{self, AssetFetcher, FetchError, FetchOutcome},
    report::{self, FetchReport},
    source::Source,
    transport::HttpTransport,
};
use clap::{ArgAction, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "assetfetch", about = "Download a model file from the first source that serves a plausible artifact")]
struct Cli {
    /// Manifest (TOML) to use instead of the built-in one
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Per-attempt timeout in seconds
    #[arg(long, global = true)]
    timeout: Option<u64>,

    /// Pause between attempts in milliseconds
    #[arg(long, global = true)]
    delay_ms: Option<u64>,

    /// User-Agent sent with every request
    #[arg(long, global = true)]
    user_agent: Option<String>,

    /// Skip TLS certificate verification. Unsafe; only for hosts you trust on a network you trust
    #[arg(long, global = true)]
    insecure: bool,

    /// Download again even if the destination already holds an acceptable file
    #[arg(long, global = true)]
    force: bool,

    /// Print a JSON report on stdout instead of the summary
    #[arg(long, global = true)]
    json: bool,

    /// More log output (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Fetch one asset (the first in the manifest by default)
    Fetch {
        #[arg(long)]
        asset: Option<String>,
        /// Source URL to try, in order; replaces the manifest's sources
        #[arg(long = "url")]
        urls: Vec<String>,
        /// Destination file
        #[arg(long)]
        out: Option<PathBuf>,
        /// Accept only payloads larger than this many bytes
        #[arg(long)]
        min_bytes: Option<u64>,
    },
    /// Fetch every asset in the manifest
    FetchAll {
        /// Save all assets into this directory, keeping their file names
        #[arg(long)]
        dir: Option<PathBuf>,
        /// Fail unless every asset was downloaded
        #[arg(long)]
        require_all: bool,
    },
    /// Print the ordered source list of an asset without downloading
    Sources {
        #[arg(long)]
        asset: Option<String>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match run(cli).await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {:#}", err);
            ExitCode::from(FetchError::EXIT_OTHER)
        }
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let mut cfg = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::embedded()?,
    };
    // Command-line flags win over the manifest's settings.
    if let Some(t) = cli.timeout { cfg.settings.timeout_secs = Some(t); }
    if let Some(d) = cli.delay_ms { cfg.settings.attempt_delay_ms = Some(d); }
    if let Some(ua) = cli.user_agent.clone() { cfg.settings.user_agent = Some(ua); }
    if cli.insecure { cfg.settings.insecure_tls = Some(true); }
    if cli.force { cfg.settings.reuse_existing = Some(false); }

    let command = cli.command.unwrap_or(Commands::Fetch { asset: None, urls: Vec::new(), out: None, min_bytes: None });
    match command {
        Commands::Sources { asset } => {
            let asset = cfg.asset(asset.as_deref())?;
            let sources = asset.source_list();
            if cli.json {
                println!("{}", report::to_json(&sources.as_slice())?);
            } else {
                report::print_sources(asset, &sources);
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Fetch { asset, urls, out, min_bytes } => {
            let mut asset = cfg.asset(asset.as_deref())?.clone();
            if !urls.is_empty() {
                asset.sources = urls.into_iter().map(Source::new).collect();
                asset.github.clear();
            }
            if let Some(out) = out { asset.destination = out; }
            if let Some(m) = min_bytes { asset.min_bytes = m; }

            let fetcher = http_fetcher(&cfg, cli.json)?;
            let result = fetcher.fetch(&asset.source_list(), &asset.destination(), &asset.policy()).await;
            emit(cli.json, &asset, &result)?;
            Ok(ExitCode::from(fetcher::exit_code(&result)))
        }
        Commands::FetchAll { dir, require_all } => {
            let assets: Vec<AssetSpec> = match &dir {
                Some(dir) => cfg.assets.iter().map(|a| a.relocated(dir)).collect(),
                None => cfg.assets.clone(),
            };
            let fetcher = http_fetcher(&cfg, cli.json)?;
            let outcome = batch::fetch_all(&fetcher, &assets).await;
            if cli.json {
                let reports: Vec<FetchReport> =
                    outcome.entries.iter().map(|e| FetchReport::new(&e.asset, &e.destination, &e.result)).collect();
                println!("{}", report::to_json(&reports)?);
            } else {
                report::print_batch(&outcome, &assets);
            }
            Ok(ExitCode::from(outcome.exit_code(require_all)))
        }
    }
}

fn http_fetcher(cfg: &Config, json: bool) -> anyhow::Result<AssetFetcher<HttpTransport>> {
    let mut transport_cfg = cfg.transport_config();
    transport_cfg.show_progress = !json && std::io::stderr().is_terminal();
    Ok(AssetFetcher::with_options(HttpTransport::new(&transport_cfg)?, cfg.fetch_options()))
}

fn emit(json: bool, asset: &AssetSpec, result: &Result<FetchOutcome, FetchError>) -> anyhow::Result<()> {
    if json {
        println!("{}", report::to_json(&FetchReport::new(&asset.name, &asset.destination, result))?);
    } else {
        report::print_outcome(asset, result);
    }
    Ok(())
}
