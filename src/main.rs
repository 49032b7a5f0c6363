use anyhow::{Context, Result};
use catalog_sync::config::{self, SyncConfig};
use catalog_sync::logging::init_tracing;
use catalog_sync::providers::brolexy::{BrolexyProvider, ProductId};
use catalog_sync::providers::shopify::ShopifyProvider;
use catalog_sync::sync::{run_pass, sku_for, SyncOptions, TargetStore};
use catalog_sync::util::env;
use catalog_sync::SyncError;
use clap::{Parser, Subcommand};
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "catalog_sync", version, about = "Brolexy -> Shopify catalog sync")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
#[command(rename_all = "kebab-case")]
enum Commands {
    /// Run one sync pass (default when no command is given)
    Run {
        /// Fetch and plan only; no create/update calls (also SYNC_DRY_RUN=1)
        #[arg(long, default_value_t = false)]
        dry_run: bool,
    },
    /// Print the Brolexy catalog as JSON
    Fetch {
        #[arg(long, default_value_t = false)]
        pretty: bool,
    },
    /// Look up the Shopify product/variant carrying the SKU derived from a Brolexy id
    Lookup {
        #[arg(long)]
        product_id: String,
    },
    /// Log a redacted configuration snapshot and fail when the configuration would not load
    CheckConfig,
}

#[tokio::main]
async fn main() {
    env::init_env();
    if let Err(e) = init_tracing("info") {
        eprintln!("{e}");
    }

    let cli = Cli::parse();
    let code = match dispatch(cli.command.unwrap_or(Commands::Run { dry_run: false })).await {
        Ok(code) => code,
        Err(e) => {
            error!(error = ?e, "catalog_sync failed");
            1
        }
    };
    std::process::exit(code);
}

async fn dispatch(command: Commands) -> Result<i32> {
    if let Commands::CheckConfig = command {
        env::preflight_snapshot("catalog_sync", &config::REQUIRED_KEYS, &config::OPTIONAL_KEYS);
        let problems = config::check_env();
        if !problems.is_empty() {
            error!(target = "preflight", problems = ?problems, "configuration would not load");
            return Ok(1);
        }
        info!(target = "preflight", "configuration ok");
        return Ok(0);
    }

    let mut cfg = match SyncConfig::from_env() {
        Ok(cfg) => cfg,
        Err(SyncError::Config { missing }) => {
            error!(target = "preflight", missing = ?missing, "missing required configuration");
            return Ok(1);
        }
        Err(e) => return Err(e).context("loading configuration"),
    };

    match command {
        Commands::Run { dry_run } => {
            cfg.dry_run |= dry_run;
            info!(
                source = %cfg.source_base_url,
                store = %cfg.shopify_store,
                dry_run = cfg.dry_run,
                "starting sync pass"
            );
            let source = BrolexyProvider::new(&cfg)?;
            let target = ShopifyProvider::new(&cfg)?;
            match run_pass(&source, &target, &SyncOptions::from(&cfg)).await {
                Ok(report) => {
                    for f in &report.failures {
                        warn!(name = %f.name, sku = %f.sku, error = %f.error, "item not synced");
                    }
                    Ok(0)
                }
                Err(e) => {
                    error!(error = %e, timeout = e.is_timeout(), "sync pass aborted");
                    Ok(1)
                }
            }
        }
        Commands::Fetch { pretty } => {
            let source = BrolexyProvider::new(&cfg)?;
            let outcome = source
                .fetch_products()
                .await
                .context("fetching brolexy products")?;
            let out = if pretty {
                serde_json::to_string_pretty(&outcome.products)?
            } else {
                serde_json::to_string(&outcome.products)?
            };
            println!("{out}");
            Ok(0)
        }
        Commands::Lookup { product_id } => {
            let target = ShopifyProvider::new(&cfg)?;
            let sku = sku_for(&cfg.sku_prefix, &ProductId::parse(&product_id));
            match target
                .find_by_sku(&sku)
                .await
                .context("listing shopify products")?
            {
                Some(found) => println!(
                    "{sku}: product_id={} variant_id={}",
                    found.product_id, found.variant_id
                ),
                None => println!("{sku}: not found"),
            }
            Ok(0)
        }
        Commands::CheckConfig => Ok(0),
    }
}
