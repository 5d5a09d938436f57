//! Ecom CLI - storefront client for the terminal.
//!
//! # Usage
//!
//! ```bash
//! # Sign in (password from ECOM_PASSWORD or prompted)
//! ecom login -e customer@example.com
//!
//! # Browse
//! ecom products list --search saree
//! ecom products show jamdani-saree
//!
//! # Cart
//! ecom cart add prod_123 --quantity 2
//! ecom cart update item_456 3
//! ecom cart coupon apply EID2025
//! ecom cart show
//! ```
//!
//! # Environment Variables
//!
//! - `ECOM_API_URL` - Storefront API base URL (required)
//! - `ECOM_COOKIE_FILE` - Session cookie file (default: `<data dir>/ecom/cookies.json`)
//! - `SENTRY_DSN` / `SENTRY_ENVIRONMENT` - Error reporting (optional)
//! - `RUST_LOG` - Log filter (default: `ecom_cli=info,ecom_client=info`)

#![cfg_attr(not(test), forbid(unsafe_code))]
// Terminal output is what this binary is for
#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

use commands::{CliError, Context};

#[derive(Parser)]
#[command(name = "ecom")]
#[command(author, version, about = "Ecom storefront CLI")]
struct Cli {
    /// Session cookie file (overrides ECOM_COOKIE_FILE)
    #[arg(long, global = true)]
    cookie_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in with email and password
    Login {
        #[arg(short, long)]
        email: String,

        /// Password (prompted when omitted)
        #[arg(short, long, env = "ECOM_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },
    /// Create an account and sign in
    Register {
        #[arg(short, long)]
        email: String,

        /// Password (prompted when omitted)
        #[arg(short, long, env = "ECOM_PASSWORD", hide_env_values = true)]
        password: Option<String>,

        #[arg(long)]
        first_name: Option<String>,

        #[arg(long)]
        last_name: Option<String>,

        #[arg(long)]
        phone: Option<String>,
    },
    /// Sign out and forget the stored session
    Logout,
    /// Show the signed-in user
    Whoami,
    /// Browse the catalog
    Products {
        #[command(subcommand)]
        action: ProductsAction,
    },
    /// Manage the cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
}

#[derive(Subcommand)]
enum ProductsAction {
    /// List products
    List {
        #[arg(short, long)]
        search: Option<String>,

        #[arg(short, long)]
        category: Option<String>,

        #[arg(long, default_value_t = 1)]
        page: u32,

        #[arg(long)]
        limit: Option<u32>,
    },
    /// Show one product
    Show { slug: String },
}

#[derive(Subcommand)]
enum CartAction {
    /// Show the cart
    Show,
    /// Add a product
    Add {
        product_id: String,

        #[arg(short, long, default_value_t = 1)]
        quantity: u32,

        #[arg(short, long)]
        variant: Option<String>,
    },
    /// Set a line's quantity (0 removes it)
    Update { item_id: String, quantity: u32 },
    /// Remove a line
    Remove { item_id: String },
    /// Remove every line
    Clear,
    /// Apply or remove a coupon
    Coupon {
        #[command(subcommand)]
        action: CouponAction,
    },
}

#[derive(Subcommand)]
enum CouponAction {
    /// Apply a coupon code
    Apply { code: String },
    /// Remove the applied coupon
    Remove,
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry() -> Option<sentry::ClientInitGuard> {
    let dsn = std::env::var("SENTRY_DSN").ok().filter(|dsn| !dsn.is_empty())?;

    let guard = sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: std::env::var("SENTRY_ENVIRONMENT")
                .ok()
                .map(std::borrow::Cow::Owned),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR => sentry_tracing::EventFilter::Event,
        tracing::Level::WARN | tracing::Level::INFO => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "ecom_cli=info,ecom_client=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env before anything reads the environment
    let _ = dotenvy::dotenv();

    // Sentry must be initialized before the tracing subscriber
    let _sentry_guard = init_sentry();
    init_tracing();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            commands::report(&e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let ctx = Context::from_env(cli.cookie_file)?;

    match cli.command {
        Commands::Login { email, password } => {
            commands::auth::login(&ctx, &email, password).await?;
        }
        Commands::Register {
            email,
            password,
            first_name,
            last_name,
            phone,
        } => {
            let profile = commands::auth::Profile {
                first_name,
                last_name,
                phone,
            };
            commands::auth::register(&ctx, &email, password, profile).await?;
        }
        Commands::Logout => commands::auth::logout(&ctx).await?,
        Commands::Whoami => commands::auth::whoami(&ctx).await?,
        Commands::Products { action } => match action {
            ProductsAction::List {
                search,
                category,
                page,
                limit,
            } => {
                let query = ecom_core::ProductQuery {
                    page: Some(page),
                    limit,
                    search,
                    category,
                };
                commands::products::list(&ctx, &query).await?;
            }
            ProductsAction::Show { slug } => commands::products::show(&ctx, &slug).await?,
        },
        Commands::Cart { action } => match action {
            CartAction::Show => commands::cart::show(&ctx).await?,
            CartAction::Add {
                product_id,
                quantity,
                variant,
            } => commands::cart::add(&ctx, &product_id, quantity, variant).await?,
            CartAction::Update { item_id, quantity } => {
                commands::cart::update(&ctx, &item_id, quantity).await?;
            }
            CartAction::Remove { item_id } => commands::cart::remove(&ctx, &item_id).await?,
            CartAction::Clear => commands::cart::clear(&ctx).await?,
            CartAction::Coupon { action } => match action {
                CouponAction::Apply { code } => commands::cart::apply_coupon(&ctx, &code).await?,
                CouponAction::Remove => commands::cart::remove_coupon(&ctx).await?,
            },
        },
    }
    Ok(())
}
