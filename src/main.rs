use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

mod auth;
mod cli;
mod console;
mod directory;
mod error;
mod logging;
mod provider;
mod session;
mod storage;
mod token;

#[cfg(test)]
mod testing;

use cli::AppContext;
use storage::ConfigStore;

#[derive(Parser)]
#[command(
    name = "fbadmin",
    version,
    about = "Interactive console for Firebase Authentication users"
)]
struct Cli {
    /// Firebase admin service account JSON file
    #[arg(short, long, global = true, env = "GOOGLE_APPLICATION_CREDENTIALS")]
    credentials: Option<PathBuf>,

    /// Web API key for email/password and custom-token sign-in
    #[arg(long, global = true, env = "FIREBASE_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Config file (default: <config dir>/fbadmin/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// More log output on stderr (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive console (the default)
    Console,

    /// Print the user table
    List {
        /// Only users whose email or display name contains this text
        #[arg(short, long)]
        query: Option<String>,
    },

    /// Show one user's details
    View {
        /// User UID
        uid: String,
    },

    /// Mint a custom token for a user
    MintToken {
        /// User UID
        uid: String,
        /// Additional claims as a JSON object
        #[arg(long)]
        claims: Option<String>,
        /// Also exchange the custom token for an ID token
        #[arg(long)]
        exchange: bool,
    },

    /// Sign in with email and password and print the ID token
    SignIn {
        /// Account email
        email: String,
    },

    /// Show or change settings
    Config {
        /// Store the web API key
        #[arg(long)]
        set_api_key: Option<String>,
        /// Users fetched per listing request (1-1000)
        #[arg(long)]
        set_page_size: Option<u32>,
    },
}

fn config_store(cli: &Cli) -> Result<ConfigStore> {
    match &cli.config {
        Some(path) => Ok(ConfigStore::at(path)),
        None => ConfigStore::new(),
    }
}

fn app_context(cli: &Cli, store: &ConfigStore) -> Result<AppContext> {
    let credentials = cli.credentials.as_deref().context(
        "No admin credentials: pass --credentials <FILE> or set GOOGLE_APPLICATION_CREDENTIALS",
    )?;
    AppContext::build(store, credentials, cli.api_key.as_deref())
}

fn run(cli: &Cli) -> Result<()> {
    let store = config_store(cli)?;

    match cli.command.as_ref().unwrap_or(&Commands::Console) {
        Commands::Console => cli::commands::cmd_console(app_context(cli, &store)?),
        Commands::List { query } => {
            cli::commands::cmd_list(&app_context(cli, &store)?, query.as_deref())
        }
        Commands::View { uid } => cli::commands::cmd_view(&app_context(cli, &store)?, uid),
        Commands::MintToken {
            uid,
            claims,
            exchange,
        } => cli::commands::cmd_mint_token(
            &app_context(cli, &store)?,
            uid,
            claims.as_deref(),
            *exchange,
        ),
        Commands::SignIn { email } => cli::commands::cmd_sign_in(&app_context(cli, &store)?, email),
        Commands::Config {
            set_api_key,
            set_page_size,
        } => cli::commands::cmd_config(&store, set_api_key.as_deref(), *set_page_size),
    }
}

fn main() {
    let cli = Cli::parse();
    logging::init_tracing(cli.verbose);

    if let Err(e) = run(&cli) {
        eprintln!("error: {:#}", e);
        std::process::exit(1);
    }
}
