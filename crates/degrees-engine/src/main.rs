use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use degrees_core::client::{HttpTransport, OracleClient};
use degrees_core::config::{platform_url, EngineConfig};
use degrees_core::oracle::RiotOracle;
use degrees_core::persistence::{FileCache, MemoryCache, Operation, ResponseCache};
use degrees_core::report::{JsonPresenter, Presenter, Report, TextPresenter};
use degrees_core::search::find_by_name;
use degrees_core::SearchError;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "degrees",
    version,
    about = "Find how two players are connected through shared matches",
    args_conflicts_with_subcommands = true,
    subcommand_negates_reqs = true
)]
struct Cli {
    /// Summoner name to start from
    #[arg(value_name = "SOURCE", required = true)]
    source: Option<String>,

    /// Summoner name to reach
    #[arg(value_name = "TARGET", required = true)]
    target: Option<String>,

    #[arg(long, env = "RIOT_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Platform id (`na1`, `euw1`, ...) or a full base URL
    #[arg(long)]
    platform: Option<String>,

    #[arg(long, global = true, help = "Directory holding the response cache")]
    cache_dir: Option<PathBuf>,

    #[arg(long, help = "Keep responses in memory only")]
    no_cache: bool,

    #[arg(long, help = "Recent matches expanded per player")]
    breadth: Option<usize>,

    #[arg(long, help = "Expansion waves per connectivity check")]
    depth: Option<u32>,

    #[arg(long, help = "Players expanded concurrently")]
    concurrency: Option<usize>,

    #[arg(long, help = "Give up after this many rounds")]
    max_rounds: Option<u32>,

    #[arg(long, help = "Escalate after this many consecutive rate limits")]
    max_retries: Option<u32>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show how many responses each cache store holds
    CacheStats,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

impl Cli {
    fn config(&self) -> EngineConfig {
        let mut config = EngineConfig::from_env();
        if let Some(key) = &self.api_key {
            config.client.api_key = Some(key.clone());
        }
        if let Some(platform) = &self.platform {
            config.client.base_url = platform_url(platform);
        }
        if let Some(dir) = &self.cache_dir {
            config.cache_dir = dir.clone();
        }
        if let Some(breadth) = self.breadth {
            config.search.breadth_limit = breadth;
        }
        if let Some(depth) = self.depth {
            config.search.depth = depth;
        }
        if let Some(concurrency) = self.concurrency {
            config.search.concurrency = concurrency;
        }
        if self.max_rounds.is_some() {
            config.search.max_rounds = self.max_rounds;
        }
        if self.max_retries.is_some() {
            config.client.max_retries = self.max_retries;
        }
        config
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("degrees=info,degrees_core=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let result = match &cli.command {
        Some(Command::CacheStats) => cache_stats(&cli.config()),
        None => find(&cli).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            match err.downcast_ref::<SearchError>() {
                Some(SearchError::Cancelled(_)) => ExitCode::from(130),
                Some(e) if e.is_fatal() => ExitCode::from(2),
                _ => ExitCode::FAILURE,
            }
        }
    }
}

async fn find(cli: &Cli) -> Result<()> {
    let (Some(source), Some(target)) = (cli.source.as_deref(), cli.target.as_deref()) else {
        anyhow::bail!("both SOURCE and TARGET are required");
    };
    let config = cli.config();
    if config.client.api_key.is_none() {
        warn!("RIOT_API_KEY is not set; live lookups will be rejected");
    }

    let cache: Arc<dyn ResponseCache> = if cli.no_cache {
        Arc::new(MemoryCache::new())
    } else {
        Arc::new(FileCache::open(&config.cache_dir).with_context(|| {
            format!("Failed to open cache at {}", config.cache_dir.display())
        })?)
    };
    let transport =
        Arc::new(HttpTransport::new(&config.client).context("Failed to build HTTP client")?);
    let oracle = Arc::new(RiotOracle::new(OracleClient::new(
        transport,
        cache,
        config.client.clone(),
    )));

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted, stopping after the current round");
            on_interrupt.cancel();
        }
    });

    let outcome =
        find_by_name(oracle.clone(), config.search.clone(), source, target, cancel).await?;
    let stats = oracle.client().stats();
    debug!(?stats, "lookups");

    let report = Report::build(oracle.as_ref(), source, target, &outcome)
        .await?
        .with_lookups(stats);

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    match cli.format {
        OutputFormat::Text => TextPresenter.present(&report, &mut out)?,
        OutputFormat::Json => JsonPresenter.present(&report, &mut out)?,
    }
    out.flush()?;
    Ok(())
}

fn cache_stats(config: &EngineConfig) -> Result<()> {
    let cache = FileCache::open(&config.cache_dir)
        .with_context(|| format!("Failed to open cache at {}", config.cache_dir.display()))?;
    println!("{}", cache.dir().display());
    for op in Operation::ALL {
        println!("  {:<16} {:>8} entries", op.file_name(), cache.len(op));
    }
    Ok(())
}
