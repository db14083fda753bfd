//! Command implementations.
//!
//! Each submodule handles one area of the storefront or the admin console
//! and writes its results to the [`Console`].

pub mod account;
pub mod admin;
pub mod catalog;
pub mod checkout;
pub mod orders;
pub mod shop;

use apparel_admin::AdminConsole;
use apparel_storefront::Storefront;
use clap::Subcommand;

use crate::console::Console;
use crate::error::CliError;

/// Everything a command needs.
pub struct App {
    pub storefront: Storefront,
    pub admin: AdminConsole,
    pub console: Console,
}

/// Commands available both one-shot and inside the shell.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Sign in (prompts for the password)
    Login {
        #[arg(short, long)]
        email: String,
    },
    /// Create an account and sign in
    Register {
        #[arg(short, long)]
        username: String,
        #[arg(short, long)]
        email: String,
    },
    /// Sign out
    Logout,
    /// Show the signed-in user
    Whoami,
    /// Change the password of the signed-in user
    ChangePassword,
    /// Reset a forgotten password with an emailed OTP
    ForgotPassword {
        #[arg(short, long)]
        email: String,
    },
    /// List products in a category
    Browse {
        #[arg(short, long, default_value = "men")]
        category: String,
        /// Number of pages to load
        #[arg(long, default_value_t = 1)]
        pages: u32,
    },
    /// Show one product with its variants
    Product { id: String },
    /// Search products by name or category
    Search {
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,
    },
    /// Show or clear recent searches
    Recent {
        #[arg(long)]
        clear: bool,
    },
    /// Show or toggle wishlist entries
    Wishlist {
        #[command(subcommand)]
        action: ListAction,
    },
    /// Show or toggle cart entries
    Cart {
        #[command(subcommand)]
        action: ListAction,
    },
    /// Manage delivery addresses
    Addresses {
        #[command(subcommand)]
        action: AddressAction,
    },
    /// Place a cash-on-delivery order
    Checkout(checkout::CheckoutArgs),
    /// Track and cancel orders
    Orders {
        #[command(subcommand)]
        action: OrderAction,
    },
    /// Store management (staff only)
    Admin {
        #[command(subcommand)]
        action: admin::AdminCommand,
    },
}

#[derive(Debug, Subcommand)]
pub enum ListAction {
    /// Show the list
    List,
    /// Add the product if absent, remove it if present
    Toggle { product_id: String },
}

#[derive(Debug, Subcommand)]
pub enum AddressAction {
    /// Show saved addresses
    List,
    /// Add an address (prompts for each field)
    Add {
        /// Label the address as work instead of home
        #[arg(long)]
        work: bool,
    },
}

#[derive(Debug, Subcommand)]
pub enum OrderAction {
    /// Show every ordered item, newest first
    List,
    /// Show one order with its delivery timeline
    Show { order_id: String },
    /// Cancel a pending order
    Cancel {
        order_id: String,
        /// Skip the confirmation question
        #[arg(short, long)]
        yes: bool,
    },
    /// Poll for status changes until interrupted
    Watch {
        /// Seconds between polls (defaults to the configured interval)
        #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
        interval: Option<u64>,
    },
}

/// Run one command.
///
/// # Errors
///
/// Returns the first error the command hits.
pub async fn run(app: &mut App, command: Command) -> Result<(), CliError> {
    match command {
        Command::Login { email } => account::login(app, &email).await,
        Command::Register { username, email } => account::register(app, &username, &email).await,
        Command::Logout => account::logout(app).await,
        Command::Whoami => account::whoami(app).await,
        Command::ChangePassword => account::change_password(app).await,
        Command::ForgotPassword { email } => account::forgot_password(app, &email).await,
        Command::Browse { category, pages } => catalog::browse(app, &category, pages).await,
        Command::Product { id } => catalog::product(app, &id).await,
        Command::Search { query } => catalog::search(app, &query.join(" ")).await,
        Command::Recent { clear } => catalog::recent(app, clear),
        Command::Wishlist { action } => shop::run(app, shop::Target::Wishlist, action).await,
        Command::Cart { action } => shop::run(app, shop::Target::Cart, action).await,
        Command::Addresses { action } => checkout::addresses(app, action).await,
        Command::Checkout(args) => checkout::run(app, args).await,
        Command::Orders { action } => orders::run(app, action).await,
        Command::Admin { action } => admin::run(app, action).await,
    }
}
