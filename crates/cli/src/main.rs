mod echo;
mod store;

use std::path::PathBuf;
use std::process::ExitCode;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::{Context, bail};
use clap::{Args as ClapArgs, Parser, Subcommand};
use owo_colors::OwoColorize;
use panelkit_core::{
    ComicService, KeyValueStore, PanelConfig, ProxyConfig, ProxyKind, ProxySource, StaticProxy, StoredProxySettings,
};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use crate::echo::{print_banner, print_error, print_info, print_success};
use crate::store::JsonFileStore;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Output format for command results
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputFormat {
    Text,
    Json,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "txt" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(format!("Invalid format: {}. Valid options: text, json", s)),
        }
    }
}

/// Browse comic listings, chapters and page images from scraped sources
#[derive(Parser, Debug)]
#[command(name = "panelkit")]
#[command(author = "Panelkit Contributors")]
#[command(version = "0.1.0")]
#[command(about = "Browse comic sources from the terminal", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Source id (default: mangahaven)
    #[arg(short, long, global = true, value_name = "ID")]
    source: Option<String>,

    /// Output format (text, json)
    #[arg(short, long, global = true, default_value = "text", value_name = "FORMAT")]
    format: OutputFormat,

    /// HTTP timeout in seconds
    #[arg(long, global = true, default_value = "15", value_name = "SECS")]
    timeout: u64,

    /// Custom User-Agent for HTTP requests
    #[arg(long, global = true, value_name = "UA")]
    user_agent: Option<String>,

    /// Proxy for this run, e.g. socks5://127.0.0.1:1080 (default: stored settings)
    #[arg(long, global = true, value_name = "URL")]
    proxy: Option<String>,

    /// Store file for the cache and proxy settings
    #[arg(long, global = true, value_name = "FILE")]
    store: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(ClapArgs, Debug, Clone, Copy)]
struct Paging {
    /// Page number, starting at 1
    #[arg(long, default_value = "1")]
    page: u32,

    /// Comics per page
    #[arg(long, default_value = "20")]
    limit: u32,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List sources
    Sources {
        /// Include disabled sources
        #[arg(long)]
        all: bool,
    },
    /// Popular comics
    Hot(Paging),
    /// Recently updated comics
    Latest(Paging),
    /// Comics in one category, or in all of them
    Category {
        /// Category id from the `categories` command
        #[arg(long)]
        id: Option<String>,
        #[command(flatten)]
        paging: Paging,
    },
    /// Search by keyword
    Search {
        keyword: String,
        #[command(flatten)]
        paging: Paging,
    },
    /// Comic details
    Detail { comic_id: String },
    /// Chapter list of a comic
    Chapters { comic_id: String },
    /// Page images of a chapter
    Images { chapter_id: String },
    /// Categories offered by a source
    Categories,
    /// Inspect or clear the result cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand, Debug, Clone, Copy)]
enum CacheAction {
    /// Entry counts and size
    Stats,
    /// Remove every cached result
    Clear,
    /// Remove expired results only
    ClearExpired,
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn default_store_path() -> anyhow::Result<PathBuf> {
    let base = dirs::cache_dir().context("Could not determine the user cache directory; pass --store")?;
    Ok(base.join("panelkit").join("store.json"))
}

/// Parses `scheme://host:port`.
fn parse_proxy(raw: &str) -> anyhow::Result<ProxyConfig> {
    let (scheme, rest) = raw.split_once("://").unwrap_or(("http", raw));
    let kind = match scheme.to_lowercase().as_str() {
        "http" => ProxyKind::Http,
        "https" => ProxyKind::Https,
        "socks5" | "socks5h" => ProxyKind::Socks5,
        other => bail!("Unsupported proxy scheme: {}", other),
    };

    let rest = rest.trim_end_matches('/');
    let Some((host, port)) = rest.rsplit_once(':') else {
        bail!("Proxy must include a port: {}", raw);
    };
    port.parse::<u16>().with_context(|| format!("Invalid proxy port: {}", port))?;

    Ok(ProxyConfig { enabled: true, host: host.to_string(), port: port.to_string(), kind })
}

fn emit<T: Serialize>(format: OutputFormat, value: &T, text: impl FnOnce(&T)) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
            println!("{}", json);
        }
        OutputFormat::Text => text(value),
    }
    Ok(())
}

async fn run(args: Args) -> anyhow::Result<()> {
    let store_path = match args.store {
        Some(path) => path,
        None => default_store_path()?,
    };
    let file_store = JsonFileStore::open(&store_path)
        .await
        .with_context(|| format!("Failed to open store: {}", store_path.display()))?;

    if args.verbose {
        print_info(&format!("Store: {}", file_store.path().display().bright_white()));
    }
    let store: Arc<dyn KeyValueStore> = Arc::new(file_store);

    let mut builder = PanelConfig::builder().timeout(args.timeout);
    if let Some(user_agent) = args.user_agent {
        builder = builder.user_agent(user_agent);
    }
    let config = builder.build();

    let proxy: Arc<dyn ProxySource> = match args.proxy.as_deref() {
        Some(raw) => Arc::new(StaticProxy(parse_proxy(raw)?)),
        None => Arc::new(StoredProxySettings::new(Arc::clone(&store))),
    };

    let service = ComicService::with_proxy(config, store, proxy);
    let source = args.source.as_deref();
    let format = args.format;

    match args.command {
        Command::Sources { all } => {
            let sources = if all { service.list_all_sources() } else { service.list_available_sources() };
            emit(format, &sources, |s| echo::print_sources(s))?;
        }
        Command::Hot(paging) => {
            let page = service.hot_comics(source, paging.page, paging.limit).await?;
            emit(format, &page, echo::print_comic_page)?;
        }
        Command::Latest(paging) => {
            let page = service.latest_comics(source, paging.page, paging.limit).await?;
            emit(format, &page, echo::print_comic_page)?;
        }
        Command::Category { id, paging } => {
            let page = service.comics_by_category(source, id.as_deref(), paging.page, paging.limit).await?;
            emit(format, &page, echo::print_comic_page)?;
        }
        Command::Search { keyword, paging } => {
            let page = service.search_comics(source, &keyword, paging.page, paging.limit).await?;
            emit(format, &page, echo::print_comic_page)?;
        }
        Command::Detail { comic_id } => match service.comic_detail(source, &comic_id).await? {
            Some(detail) => emit(format, &detail, echo::print_detail)?,
            None => bail!("Comic not found: {}", comic_id),
        },
        Command::Chapters { comic_id } => {
            let chapters = service.chapters(source, &comic_id).await?;
            emit(format, &chapters, echo::print_chapters)?;
        }
        Command::Images { chapter_id } => {
            let images = service.chapter_images(source, &chapter_id).await?;
            emit(format, &images, echo::print_images)?;
        }
        Command::Categories => {
            let categories = service.categories(source).await?;
            emit(format, &categories, echo::print_categories)?;
        }
        Command::Cache { action } => match action {
            CacheAction::Stats => {
                let stats = service.cache().stats().await;
                emit(format, &stats, echo::print_cache_stats)?;
            }
            CacheAction::Clear => {
                let removed = service.cache().clear_all().await;
                emit(format, &serde_json::json!({ "removed": removed }), |_| {
                    print_success(&format!("Removed {} cached entries", removed))
                })?;
            }
            CacheAction::ClearExpired => {
                let removed = service.cache().clear_expired().await;
                emit(format, &serde_json::json!({ "removed": removed }), |_| {
                    print_success(&format!("Removed {} expired entries", removed))
                })?;
            }
        },
    }

    if args.verbose {
        let diagnostics = service.diagnostics();
        eprintln!(
            "  {} {}  {} {}",
            "Dropped ids:".dimmed(),
            diagnostics.dropped_ids.to_string().bright_white(),
            "Degraded calls:".dimmed(),
            diagnostics.degraded_calls.to_string().bright_white()
        );
    }

    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(args.verbose);

    if args.verbose {
        print_banner();
        print_info("Debug logging enabled");
    }

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            print_error(&format!("{:#}", err));
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_proxy() {
        let proxy = parse_proxy("socks5://127.0.0.1:1080").unwrap();
        assert_eq!(proxy.kind, ProxyKind::Socks5);
        assert_eq!(proxy.proxy_url().as_deref(), Some("socks5://127.0.0.1:1080"));

        let proxy = parse_proxy("10.0.0.2:8080").unwrap();
        assert_eq!(proxy.kind, ProxyKind::Http);
        assert_eq!(proxy.host, "10.0.0.2");

        assert!(parse_proxy("ftp://host:21").is_err());
        assert!(parse_proxy("http://host").is_err());
        assert!(parse_proxy("http://host:99999").is_err());
    }

    #[test]
    fn test_output_format() {
        assert_eq!("JSON".parse::<OutputFormat>(), Ok(OutputFormat::Json));
        assert!("yaml".parse::<OutputFormat>().is_err());
    }
}
