use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::info;

use beerscroll::catalog::{CatalogClient, DemoCatalog};
use beerscroll::config;
use beerscroll::engine::{PaginationEngine, Row, Settled};
use beerscroll::fetcher::{Filter, PageFetcher, fetch_and_settle};

/// Size of the generated catalog used with `--offline`.
const DEMO_TOTAL: usize = 240;
const DEMO_PAGE_SIZE: usize = 20;

#[derive(Parser)]
#[command(name = "beerscroll", about = "Browse a paginated beer catalog in the terminal")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Beer style id to list
    #[arg(long, global = true)]
    style: Option<u32>,

    /// Catalog API base URL
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Catalog API key (or set BEERSCROLL_API_KEY)
    #[arg(long, global = true)]
    api_key: Option<String>,

    /// Use a generated in-process catalog instead of the network
    #[arg(long, global = true)]
    offline: bool,

    /// Log output file path (enables logging in the viewer)
    #[arg(long, global = true)]
    log: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Print the catalog to stdout, page by page
    List {
        /// Stop after this many pages (default: all)
        #[arg(long)]
        pages: Option<u32>,
    },
}

fn main() {
    let cli = Cli::parse();

    if let Some(log_path) = &cli.log {
        let file = std::fs::File::create(log_path).expect("failed to open log file");
        env_logger::Builder::from_default_env()
            .target(env_logger::Target::Pipe(Box::new(file)))
            .init();
    } else if cli.command.is_some() {
        env_logger::init();
    }
    // viewer mode + no --log → logger not initialized (no log output)

    let mut cfg = match config::load_config() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {e:#}");
            std::process::exit(1);
        }
    };
    cfg.merge_cli(config::CliOverrides {
        base_url: cli.base_url,
        api_key: cli.api_key,
        style_id: cli.style,
    });
    let config = cfg.resolve();

    let filter = Filter {
        style_id: config.style_id,
    };
    let fetcher: Box<dyn PageFetcher + Send> = if cli.offline {
        info!("using offline demo catalog ({DEMO_TOTAL} beers)");
        Box::new(DemoCatalog::new(DEMO_TOTAL, DEMO_PAGE_SIZE))
    } else {
        Box::new(CatalogClient::new(
            &config.base_url,
            config.api_key.clone(),
            config.request_timeout,
        ))
    };

    let result = match cli.command {
        Some(Command::List { pages }) => cmd_list(fetcher.as_ref(), &filter, pages),
        None => {
            let title = format!("Beers (style {})", filter.style_id);
            beerscroll::viewer::run(fetcher, filter, title, &config.viewer)
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

/// Walk the catalog through the same engine the viewer uses, printing rows
/// as each page settles.
fn cmd_list(
    fetcher: &(dyn PageFetcher + Send),
    filter: &Filter,
    max_pages: Option<u32>,
) -> Result<()> {
    let start = Instant::now();
    let mut engine = PaginationEngine::new();
    let mut out = io::stdout().lock();

    let mut ticket = engine.load_initial();
    let mut pages = 0;
    while let Some(t) = ticket {
        if max_pages.is_some_and(|max| pages >= max) {
            break;
        }
        let before = engine.store().len();
        let settle = fetch_and_settle(&mut engine, fetcher, filter, t)
            .context("[BUG] engine rejected its own ticket")?;
        if let Settled::Failed(e) = settle.settled {
            anyhow::bail!("page {}: {e}", t.page);
        }
        pages += 1;

        for index in before..engine.store().len() {
            if let Some(Row::Loaded(beer)) = engine.item_at(index) {
                let abv = beer.abv_label().unwrap_or_default();
                writeln!(
                    out,
                    "{:>5}  {}\t{}\t{abv}",
                    index + 1,
                    beer.name,
                    beer.brewery_label()
                )?;
            }
        }

        let next = engine.store().len();
        ticket = engine.prefetch([next]);
    }

    info!(
        "cmd_list: {pages} page(s), {} of {} beers in {:.1}ms",
        engine.store().len(),
        engine.item_count(),
        start.elapsed().as_secs_f64() * 1000.0
    );
    eprintln!("listed {} of {} beers", engine.store().len(), engine.item_count());
    Ok(())
}
