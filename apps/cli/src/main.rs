//! # mmo-cli
//!
//! Command-line front end for the MMO market client.
//!
//! ## Commands
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  mmo-cli whoami                    sign in, print the current user      │
//! │  mmo-cli browse  -s tiktok -c service -p 2                              │
//! │                  CatalogFeed: search, category, load more               │
//! │  mmo-cli quote   PR0001 -q 2 -v SALE10                                  │
//! │                  PricingReconciler: settled price box                   │
//! │  mmo-cli order   PR0009 -q 1 --target-url https://...                   │
//! │                  quote, then place_order                                │
//! │  mmo-cli favorite PR0001 [--remove]  add or remove a favorite           │
//! │  mmo-cli favorites [-s netflix]    list favorite products               │
//! │  mmo-cli orders  --status refunded -p 2                                 │
//! │                  order history, newest first                            │
//! │  mmo-cli config  [--save]          print or write client.toml           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Credentials come from `--username`/`--password` or `MMO_USERNAME`/
//! `MMO_PASSWORD`. Logging goes to stderr, filtered by `RUST_LOG`.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use mmo_client::{
    load_order_history, place_order, set_favorite, CatalogFeed, ClientConfig, HttpApi,
    MarketplaceApi, Notice, NoticeSink, PricingHandle, PricingReconciler, ProductQuery, Session,
};
use mmo_core::pricing::PricingState;
use mmo_core::validation::{coerce_quantity, normalize_voucher_code};
use mmo_core::{OrderStatus, Product, ProductType, ServiceDetails};

/// Browse, quote and order on the MMO market.
#[derive(Parser, Debug)]
#[command(name = "mmo-cli", version)]
#[command(about = "Command-line client for the MMO digital goods market")]
struct Cli {
    /// Path to client.toml (defaults to the platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sign in and print the current user
    Whoami(Credentials),

    /// List products page by page
    Browse {
        /// Free text matched against product names
        #[arg(short, long, default_value = "")]
        search: String,

        /// account, service, software or course
        #[arg(short, long)]
        category: Option<ProductType>,

        /// Number of pages to load
        #[arg(short, long, default_value_t = 1)]
        pages: u32,
    },

    /// Show the price box for a product
    Quote {
        #[command(flatten)]
        line: LineArgs,

        #[command(flatten)]
        credentials: Credentials,
    },

    /// Quote a product, then place the order
    Order {
        #[command(flatten)]
        line: LineArgs,

        #[command(flatten)]
        credentials: Credentials,

        /// Link the service is delivered to (service products only)
        #[arg(long)]
        target_url: Option<String>,

        /// Note for the seller (service products only)
        #[arg(long, default_value = "")]
        note: String,
    },

    /// Add a product to the favorites, or remove it
    Favorite {
        /// Product code, e.g. PR0001
        product: String,

        /// Remove instead of add
        #[arg(long)]
        remove: bool,

        #[command(flatten)]
        credentials: Credentials,
    },

    /// List favorite products
    Favorites {
        /// Free text matched against product names
        #[arg(short, long, default_value = "")]
        search: String,

        #[command(flatten)]
        credentials: Credentials,
    },

    /// List past orders, newest first
    Orders {
        /// processing, delivered, complained, refunded or completed
        #[arg(long)]
        status: Option<OrderStatus>,

        /// Matched against order codes
        #[arg(short, long, default_value = "")]
        search: String,

        /// Number of pages to load
        #[arg(short, long, default_value_t = 1)]
        pages: u32,

        #[command(flatten)]
        credentials: Credentials,
    },

    /// Print the effective configuration
    Config {
        /// Write it back to the config file
        #[arg(long)]
        save: bool,
    },
}

#[derive(Args, Debug)]
struct Credentials {
    #[arg(short, long, env = "MMO_USERNAME")]
    username: Option<String>,

    #[arg(long, env = "MMO_PASSWORD", hide_env_values = true)]
    password: Option<String>,
}

#[derive(Args, Debug)]
struct LineArgs {
    /// Product code, e.g. PR0001
    product: String,

    /// Narrows the product lookup by name
    #[arg(long, default_value = "")]
    search: String,

    /// Quantity as typed; bad input is coerced like the app does
    #[arg(short, long, default_value = "1")]
    quantity: String,

    /// Voucher code
    #[arg(short, long, default_value = "")]
    voucher: String,
}

/// Prints notices to stderr, where the app would show a toast.
struct StderrNotices;

impl NoticeSink for StderrNotices {
    fn notify(&self, notice: Notice) {
        eprintln!("! [{:?}] {}", notice.kind, notice.message);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let config = match ClientConfig::load(cli.config.clone()) {
        Ok(config) => config,
        Err(e) if e.is_config_error() => {
            let shown = cli
                .config
                .clone()
                .or_else(ClientConfig::default_config_path)
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "client.toml".to_string());
            return Err(e).with_context(|| format!("Invalid client configuration, check {}", shown));
        }
        Err(e) => return Err(e).context("Failed to load client configuration"),
    };
    debug!(base_url = %config.base_url(), "Configuration loaded");

    let session = Session::new(&config)?;
    let api: Arc<dyn MarketplaceApi> = Arc::new(HttpApi::new(&config, session.clone()));
    let notices: Arc<dyn NoticeSink> = Arc::new(StderrNotices);

    match cli.command {
        Command::Whoami(credentials) => {
            sign_in(&session, &credentials).await?;
            let user = api.current_user().await?;
            println!("{} ({}) <{}>", user.username, user.role, user.email);
        }
        Command::Browse {
            search,
            category,
            pages,
        } => browse(api, &config, notices, search, category, pages).await?,
        Command::Quote { line, credentials } => {
            sign_in(&session, &credentials).await?;
            let product = find_product(api.as_ref(), &line.product, &line.search).await?;
            let state = quote(&product, &line, api, &config, notices).await?;
            print_breakdown(&product, &state);
        }
        Command::Order {
            line,
            credentials,
            target_url,
            note,
        } => {
            sign_in(&session, &credentials).await?;
            let product = find_product(api.as_ref(), &line.product, &line.search).await?;
            let state = quote(&product, &line, api.clone(), &config, notices.clone()).await?;
            print_breakdown(&product, &state);

            let details = target_url.map(|target_url| ServiceDetails { note, target_url });
            match place_order(api.as_ref(), &session, &product, &state, details.as_ref()).await {
                Ok(order) => println!("Order {} placed", order.order_code),
                Err(e) => {
                    notices.notify(Notice::checkout(e.user_message()));
                    return Err(e).context("Order was not placed");
                }
            }
        }
        Command::Favorite {
            product,
            remove,
            credentials,
        } => {
            sign_in(&session, &credentials).await?;
            let favourited = set_favorite(api.as_ref(), &product, !remove).await?;
            let verb = if favourited { "is" } else { "is not" };
            println!("{} {} a favorite", product, verb);
        }
        Command::Favorites {
            search,
            credentials,
        } => {
            sign_in(&session, &credentials).await?;
            let products = api.list_favorites(&search).await?;
            for product in &products {
                print_product(product);
            }
            println!("-- {} favorites", products.len());
        }
        Command::Orders {
            status,
            search,
            pages,
            credentials,
        } => {
            sign_in(&session, &credentials).await?;
            let history = load_order_history(api.as_ref(), status, &search, pages).await?;
            for order in &history.orders {
                println!(
                    "{:<8} {:<11} {:<6} {:<20} {}",
                    order.order_code,
                    order.status.as_str(),
                    if order.is_paid { "paid" } else { "unpaid" },
                    order
                        .created_date
                        .map(|d| d.format("%Y-%m-%d %H:%M").to_string())
                        .unwrap_or_default(),
                    order.voucher.as_ref().map(|v| v.code.as_str()).unwrap_or("")
                );
            }
            println!(
                "-- page {}, {} of {} orders{}",
                history.page,
                history.orders.len(),
                history.count,
                if history.has_next { ", more available" } else { "" }
            );
        }
        Command::Config { save } => {
            if save {
                config.save(cli.config.clone())?;
            }
            println!("{}", toml_preview(&config)?);
        }
    }

    Ok(())
}

/// Initializes the tracing subscriber.
///
/// `RUST_LOG=mmo_client=debug` shows every voucher check and page load.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn sign_in(session: &Session, credentials: &Credentials) -> Result<()> {
    let (Some(username), Some(password)) = (&credentials.username, &credentials.password) else {
        bail!("Username and password are required (--username/--password or MMO_USERNAME/MMO_PASSWORD)");
    };
    session
        .login(username, password)
        .await
        .with_context(|| format!("Sign in failed for {}", username))?;
    Ok(())
}

/// Walks the product pages until `code` turns up.
async fn find_product(api: &dyn MarketplaceApi, code: &str, search: &str) -> Result<Product> {
    let mut page = 1;
    loop {
        let query = ProductQuery {
            search: search.to_string(),
            product_type: None,
            page,
        };
        let result = api.list_products(&query).await?;
        if let Some(product) = result.results.into_iter().find(|p| p.product_code == code) {
            return Ok(product);
        }
        if result.next.is_none() {
            bail!("Product {} not found", code);
        }
        page += 1;
    }
}

async fn browse(
    api: Arc<dyn MarketplaceApi>,
    config: &ClientConfig,
    notices: Arc<dyn NoticeSink>,
    search: String,
    category: Option<ProductType>,
    pages: u32,
) -> Result<()> {
    let feed = CatalogFeed::with_notices(api, config, notices).start();
    let patience = config.request_timeout() + config.search_debounce();

    let wanted = search.trim().to_string();
    feed.set_search(search).await?;
    feed.set_category(category).await?;
    feed.refresh().await?;

    let mut state = tokio::time::timeout(
        patience,
        feed.wait_for(|s| !s.loading && s.page >= 1 && s.search == wanted && s.category == category),
    )
    .await
    .context("Timed out loading products")??;

    while state.page < pages && state.can_load_more() {
        let previous = state.page;
        feed.load_more().await?;
        match tokio::time::timeout(patience, feed.wait_for(|s| !s.loading && s.page > previous)).await {
            Ok(next) => state = next?,
            Err(_) => break,
        }
    }
    feed.shutdown().await?;

    for product in &state.items {
        print_product(product);
    }
    println!(
        "-- page {}/{}, {} products",
        state.page,
        state.total_pages,
        state.items.len()
    );
    Ok(())
}

/// Drives a price box to its settled state for the given inputs.
async fn quote(
    product: &Product,
    line: &LineArgs,
    api: Arc<dyn MarketplaceApi>,
    config: &ClientConfig,
    notices: Arc<dyn NoticeSink>,
) -> Result<PricingState> {
    let pricing: PricingHandle = PricingReconciler::with_notices(product, api, config, notices).start();

    let quantity = coerce_quantity(&line.quantity);
    if let Some(issue) = &quantity.issue {
        eprintln!("! quantity: {} (using {})", issue, quantity.value);
    }
    let code = normalize_voucher_code(&line.voucher);

    pricing.set_quantity(line.quantity.clone()).await?;
    if code.is_some() {
        pricing.set_voucher_input(line.voucher.clone()).await?;
    }

    let patience = config.request_timeout() + config.voucher_debounce();
    let state = tokio::time::timeout(
        patience,
        pricing.wait_for(|s| s.is_settled() && s.quantity == quantity.value && s.voucher_code == code),
    )
    .await
    .context("Timed out waiting for the voucher check")??;

    pricing.shutdown().await?;
    Ok(state)
}

fn print_breakdown(product: &Product, state: &PricingState) {
    let b = &state.breakdown;
    println!("{} ({})", product.name, product.product_code);
    println!("  Unit price   {:>16}", b.unit_price.to_string());
    println!("  Quantity     {:>16}", b.quantity);
    println!("  Subtotal     {:>16}", b.subtotal.to_string());
    if let Some(code) = &state.voucher_code {
        println!("  Voucher      {:>16}", code);
    }
    if b.has_discount() {
        println!("  Discount     {:>16}", format!("-{}", b.discount));
    }
    println!("  Total        {:>16}", b.final_total.to_string());
}

fn print_product(product: &Product) {
    println!(
        "{:<8} {:<9} {:>14}  {}",
        product.product_code,
        product.product_type.as_str(),
        product.price.to_string(),
        product.name
    );
}

fn toml_preview(config: &ClientConfig) -> Result<String> {
    let mut shown = config.clone();
    if !shown.auth.client_secret.is_empty() {
        shown.auth.client_secret = "********".to_string();
    }
    Ok(format!(
        "# {}\n{}",
        ClientConfig::default_config_path()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "no config directory".to_string()),
        shown.to_toml().context("Failed to serialize configuration")?
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_quote() {
        let cli = Cli::try_parse_from([
            "mmo-cli", "quote", "PR0001", "-q", "2", "-v", "SALE10", "-u", "alice", "--password",
            "pw",
        ])
        .unwrap();
        match cli.command {
            Command::Quote { line, credentials } => {
                assert_eq!(line.product, "PR0001");
                assert_eq!(line.quantity, "2");
                assert_eq!(line.voucher, "SALE10");
                assert_eq!(credentials.username.as_deref(), Some("alice"));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_browse_category() {
        let cli = Cli::try_parse_from(["mmo-cli", "browse", "-c", "service", "-p", "3"]).unwrap();
        match cli.command {
            Command::Browse {
                category, pages, ..
            } => {
                assert_eq!(category, Some(ProductType::Service));
                assert_eq!(pages, 3);
            }
            other => panic!("unexpected command: {:?}", other),
        }

        assert!(Cli::try_parse_from(["mmo-cli", "browse", "-c", "furniture"]).is_err());
    }

    #[test]
    fn test_parse_orders_status_filter() {
        let cli =
            Cli::try_parse_from(["mmo-cli", "orders", "--status", "refunded", "-p", "2"]).unwrap();
        match cli.command {
            Command::Orders { status, pages, .. } => {
                assert_eq!(status, Some(OrderStatus::Refunded));
                assert_eq!(pages, 2);
            }
            other => panic!("unexpected command: {:?}", other),
        }

        assert!(Cli::try_parse_from(["mmo-cli", "orders", "--status", "lost"]).is_err());
    }

    #[test]
    fn test_parse_favorite_remove() {
        let cli = Cli::try_parse_from(["mmo-cli", "favorite", "PR0001", "--remove"]).unwrap();
        match cli.command {
            Command::Favorite {
                product, remove, ..
            } => {
                assert_eq!(product, "PR0001");
                assert!(remove);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
