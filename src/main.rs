//! WP Harvest CLI - Collect every public URL of a WordPress site

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::warn;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use wp_harvest::{
    Error, Harvester, JsonFileStore, KeyValueStore, LogStatus, MemoryStore, Origin, Settings,
    SettingsFile,
    SettingsProvider, StatusSink,
    output::{OutputFormat, output_cache_stats, output_harvest},
};

/// WordPress REST harvester - lists every public URL per content type
#[derive(Parser, Debug)]
#[command(name = "wp-harvest")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Settings file (defaults to the platform config directory)
    #[arg(long = "settings", global = true)]
    settings: Option<PathBuf>,

    /// Cache file (defaults to the platform cache directory)
    #[arg(long = "cache-file", global = true)]
    cache_file: Option<PathBuf>,

    /// Output format
    #[arg(short = 'o', long = "output", default_value = "human", value_enum, global = true)]
    output_format: OutputFormatArg,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// No progress or log output
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Harvest all URLs of a WordPress site
    Harvest(HarvestArgs),
    /// Remove every cached harvest result
    ClearCache,
    /// Show cache statistics
    CacheStats,
    /// Print the effective settings
    Settings,
}

#[derive(Args, Debug)]
struct HarvestArgs {
    /// URL of the WordPress site (any page; only the origin is used)
    url: String,

    /// Check every URL with a HEAD request and drop dead ones
    #[arg(long = "validate")]
    validate: bool,

    /// Maximum number of items per content type
    #[arg(long = "per-page-limit")]
    per_page_limit: Option<usize>,

    /// Neither read nor write the cache for this run
    #[arg(long = "no-cache")]
    no_cache: bool,

    /// Cache lifetime in seconds
    #[arg(long = "cache-expiry")]
    cache_expiry: Option<u64>,

    /// Initial page size for sites that allow more than 100 items per page
    #[arg(long = "page-size")]
    page_size: Option<usize>,

    /// Allow harvesting private/internal IP addresses (localhost, 192.168.x.x, etc.)
    #[arg(long = "allow-private")]
    allow_private: bool,
}

impl HarvestArgs {
    fn apply(&self, mut settings: Settings) -> Settings {
        if self.validate {
            settings.validate_urls = true;
        }
        if let Some(limit) = self.per_page_limit {
            settings.per_page_limit = limit;
        }
        if self.no_cache {
            settings.enable_cache = false;
        }
        if let Some(expiry) = self.cache_expiry {
            settings.cache_expiry = expiry;
        }
        settings
    }
}

/// Output format argument
#[derive(Clone, Copy, Debug, ValueEnum)]
enum OutputFormatArg {
    Human,
    Json,
    Urls,
    None,
}

impl From<OutputFormatArg> for OutputFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::Human => OutputFormat::Human,
            OutputFormatArg::Json => OutputFormat::Json,
            OutputFormatArg::Urls => OutputFormat::Urls,
            OutputFormatArg::None => OutputFormat::None,
        }
    }
}

fn setup_logging(verbose: bool, quiet: bool) {
    if quiet {
        return;
    }

    let default_filter = if verbose {
        "wp_harvest=debug,info"
    } else {
        "wp_harvest=warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .without_time()
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    setup_logging(cli.verbose, cli.quiet);

    match run(&cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            if let Some(guidance) = e.guidance() {
                eprintln!("\n{}", guidance);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: &Cli) -> wp_harvest::Result<()> {
    let settings_file = match &cli.settings {
        Some(path) => SettingsFile::new(path),
        None => SettingsFile::default_location(),
    };
    let settings = settings_file.load().await;
    let format: OutputFormat = cli.output_format.into();

    let stdout = std::io::stdout();
    let mut writer = stdout.lock();

    match &cli.command {
        Command::Harvest(args) => {
            let settings = args.apply(settings);
            let store = open_store(cli).await;
            let status: Arc<dyn StatusSink> = if matches!(format, OutputFormat::Human) && !cli.quiet {
                Arc::new(|text: &str| eprintln!("{}", text))
            } else {
                Arc::new(LogStatus { verbose: cli.verbose })
            };

            let mut builder = Harvester::builder()
                .allow_private(args.allow_private)
                .store(store)
                .settings(Arc::new(settings))
                .status(status);
            if let Some(size) = args.page_size {
                builder = builder.initial_page_size(size);
            }
            let harvester = builder.build()?;

            let origin = Origin::parse(&args.url)?;
            let result = harvester.harvest(&origin).await?;
            output_harvest(&result, format, &mut writer)
        }
        Command::ClearCache => {
            let harvester = Harvester::builder().store(open_store(cli).await).build()?;
            let removed = harvester.cache(&settings).clear_all().await?;
            let message = if removed > 0 {
                format!("Cleared {} cached entries", removed)
            } else {
                "No cached data to clear".to_string()
            };
            if !matches!(format, OutputFormat::None) {
                writeln!(writer, "{}", message).map_err(Error::OutputFailed)?;
            }
            Ok(())
        }
        Command::CacheStats => {
            let harvester = Harvester::builder().store(open_store(cli).await).build()?;
            let stats = harvester.cache(&settings).stats().await?;
            output_cache_stats(&stats, format, &mut writer)
        }
        Command::Settings => {
            let json = serde_json::to_string_pretty(&settings)?;
            writeln!(writer, "{}", json).map_err(Error::OutputFailed)
        }
    }
}

/// Cache file store, or an in-memory one when the file can't be opened
async fn open_store(cli: &Cli) -> Arc<dyn KeyValueStore> {
    let opened = match &cli.cache_file {
        Some(path) => JsonFileStore::open(path).await,
        None => JsonFileStore::open_default().await,
    };
    match opened {
        Ok(store) => Arc::new(store),
        Err(e) => {
            warn!(error = %e, "cache file unavailable, caching in memory for this run");
            Arc::new(MemoryStore::new())
        }
    }
}
