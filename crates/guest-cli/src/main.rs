mod commands;
mod config;
mod logging;

use clap::{Parser, Subcommand};
use commands::PreferenceChanges;
use config::{Config, Paths};
use guest_api::ApiError;
use guest_session::{Provider, SessionError};
use std::path::PathBuf;
use tracing::debug;

#[derive(Parser)]
#[command(name = "wedding-guest")]
#[command(about = "Command-line client for the wedding invitation service")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (overrides config)
    #[arg(short, long, global = true)]
    log_level: Option<String>,

    /// Base URL of the backend API (overrides config)
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Directory for config and stored tokens. Defaults to ~/.wedding-guest
    #[arg(long, global = true)]
    base_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in with a phone number and SMS code
    Login,
    /// Log in through an OAuth provider
    LoginOauth {
        /// Provider name: vk or yandex
        #[arg(long)]
        provider: Provider,
    },
    /// Show the current session
    Status,
    /// Log out and clear stored tokens
    Logout,
    /// Show or answer the RSVP
    Rsvp {
        /// yes or no; omit to show the current answer
        #[arg(long, value_parser = ["yes", "no"])]
        attending: Option<String>,
    },
    /// Show or update food, alcohol, and allergy preferences
    Preferences {
        /// Food choice to save
        #[arg(long)]
        food: Option<String>,
        /// Alcohol choice to save, repeatable
        #[arg(long)]
        alcohol: Vec<String>,
        /// Allergen to add
        #[arg(long)]
        add_allergen: Option<String>,
        /// Allergen to remove
        #[arg(long)]
        remove_allergen: Option<String>,
    },
    /// Show the wishlist or manage reservations
    Wishlist {
        /// Item UUID to reserve
        #[arg(long)]
        reserve: Option<String>,
        /// Item UUID to release
        #[arg(long)]
        unreserve: Option<String>,
    },
    /// Gallery status, folder listings, and archive links
    Gallery {
        /// List files in this folder
        #[arg(long)]
        folder: Option<String>,
        /// Print an archive link: photos, video, or best-moments
        #[arg(long)]
        archive: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let paths = match &cli.base_dir {
        Some(dir) => Paths::with_base_dir(dir.clone()),
        None => Paths::new()?,
    };
    let mut config = Config::load(&paths);
    if let Some(url) = &cli.api_url {
        config.api_url = url.clone();
    }
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
    }

    logging::init_logging(&config.log_level);
    debug!(base_dir = %paths.base_dir.display(), "Starting up");

    let app = commands::build(config, &paths)?;

    // Re-establish the session before dispatching.
    app.session.validate_on_startup().await?;

    let result = match cli.command {
        Commands::Login => commands::login(&app).await,
        Commands::LoginOauth { provider } => commands::login_oauth(&app, provider).await,
        Commands::Status => commands::status(&app).await,
        Commands::Logout => commands::logout(&app).await,
        Commands::Rsvp { attending } => {
            commands::rsvp(&app, attending.map(|a| a == "yes")).await
        }
        Commands::Preferences {
            food,
            alcohol,
            add_allergen,
            remove_allergen,
        } => {
            commands::preferences(
                &app,
                PreferenceChanges {
                    food,
                    alcohol,
                    add_allergen,
                    remove_allergen,
                },
            )
            .await
        }
        Commands::Wishlist { reserve, unreserve } => {
            commands::wishlist(&app, reserve, unreserve).await
        }
        Commands::Gallery { folder, archive } => commands::gallery(&app, folder, archive).await,
    };

    if let Err(e) = result {
        if is_transient_failure(e.as_ref()) {
            eprintln!("The server is unreachable right now, try again later.");
        }
        return Err(e);
    }
    Ok(())
}

/// Whether an error came from a network or server-side hiccup rather than
/// from anything the guest did.
fn is_transient_failure(e: &(dyn std::error::Error + 'static)) -> bool {
    match e.downcast_ref::<SessionError>() {
        Some(SessionError::Api(api)) => api.is_transient(),
        Some(_) => false,
        None => e
            .downcast_ref::<ApiError>()
            .is_some_and(|api| api.is_transient()),
    }
}
