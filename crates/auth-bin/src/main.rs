//! authctl - inspect and drive the authctx session from the command line.

mod commands;
mod output;

use std::path::PathBuf;
use std::sync::Arc;

use auth_config::{init_logging, parse_level, Config, Paths};
use auth_context::AuthProvider;
use auth_session::{AuthClient, SessionAuthSource, SignInRedirect};
use clap::{Parser, Subcommand};
use output::OutputFormat;
use supabase_auth::{FileSessionStore, SupabaseAuthClient};
use tracing::debug;

/// authctl command-line interface.
#[derive(Parser)]
#[command(name = "authctl")]
#[command(about = "Inspect and manage the authctx session")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error). Defaults to the configured level.
    /// When given, logs are also echoed to stderr
    #[arg(short, long, global = true)]
    log_level: Option<String>,

    /// Base directory for runtime files (config, session, logs). Defaults to ~/.authctx
    #[arg(long, global = true)]
    base_dir: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text, global = true)]
    format: OutputFormat,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the current auth state
    Status,
    /// Sign in with email and password
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "AUTHCTX_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Re-fetch the signed-in user
    Refresh,
    /// Sign out and clear the stored session
    SignOut,
    /// Print auth state changes until interrupted
    Watch,
}

fn sign_in_redirect() -> SignInRedirect {
    Box::new(|route: &str| {
        eprintln!("Sign-in required ({}). Run `authctl login`.", route);
    })
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let paths = match cli.base_dir {
        Some(base) => Paths::with_base_dir(base),
        None => Paths::new()?,
    };
    paths.ensure_dirs()?;
    let config = Config::load(&paths)?;

    // Initialize logging; stderr stays quiet unless a level was asked for
    let echo_stderr = cli.log_level.is_some();
    let level = cli.log_level.unwrap_or_else(|| config.log_level.clone());
    init_logging(
        &parse_level(&level).to_string().to_lowercase(),
        Some(&paths.log_file()),
        echo_stderr,
    );
    debug!(base_dir = %paths.base_dir().display(), "Configuration loaded");

    let store = Arc::new(FileSessionStore::new(paths.session_file()));
    let client = Arc::new(SupabaseAuthClient::new(
        config.supabase_url()?.as_str(),
        &config.supabase_publishable_key,
        store,
    ));
    let format = cli.format;

    if let Commands::Login { email, password } = &cli.command {
        commands::login(&client, email, password, &format).await?;
    }

    let auth_client: Arc<dyn AuthClient> = client;
    let source = SessionAuthSource::new(auth_client, &config.sign_in_route, sign_in_redirect());
    let provider = AuthProvider::mount(source);

    let result = provider
        .scope(async {
            match cli.command {
                Commands::Status | Commands::Login { .. } => commands::status(&format).await,
                Commands::Refresh => commands::refresh(&format).await,
                Commands::SignOut => commands::sign_out(&format).await,
                Commands::Watch => commands::watch(&format).await,
            }
        })
        .await;

    provider.unmount();

    if let Err(e) = result {
        output::print_error(&e.to_string(), &format);
        std::process::exit(1);
    }
    Ok(())
}
