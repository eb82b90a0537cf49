//! Command implementations.
//!
//! Each command gets a fully wired [`App`]: file-backed token storage, the
//! transport, the session manager hooked up as the API client's refresh
//! handler, and the typed API adapters on top.

use crate::config::{Config, Paths};
use guest_api::{
    ApiClient, ArchiveKind, AuthApi, GalleryApi, HttpTransport, PreferencesApi, ReqwestTransport,
    RsvpApi, WishlistApi, WishlistItem,
};
use guest_session::{CallbackServer, Provider, ProviderFlow, SessionManager};
use guest_storage::{FileStorage, HandshakeStore, MemoryStorage, TokenStore};
use std::error::Error;
use std::io::Write;
use std::sync::Arc;
use tracing::info;

pub struct App {
    pub config: Config,
    pub session: Arc<SessionManager>,
    pub auth: AuthApi,
    pub client: Arc<ApiClient>,
}

pub fn build(config: Config, paths: &Paths) -> Result<App, Box<dyn Error>> {
    paths.ensure_dirs()?;

    let storage = Arc::new(FileStorage::open(paths.storage_file())?);
    let tokens = TokenStore::new(storage);
    // The PKCE handshake is only meaningful within one run.
    let handshake = HandshakeStore::new(Arc::new(MemoryStorage::new()));

    let transport: Arc<dyn HttpTransport> = Arc::new(ReqwestTransport::new(&config.api_url));
    let auth = AuthApi::new(transport.clone());

    let session = Arc::new(SessionManager::new(tokens.clone(), handshake, auth.clone()));
    let client = Arc::new(ApiClient::new(transport, tokens));
    client.set_refresh_handler(session.refresh_handler());

    info!(api_url = %config.api_url, "Client wired up");
    Ok(App {
        config,
        session,
        auth,
        client,
    })
}

fn prompt(label: &str) -> std::io::Result<String> {
    print!("{label}");
    std::io::stdout().flush()?;
    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

fn require_login(app: &App) -> Result<(), Box<dyn Error>> {
    if app.session.is_authenticated() {
        Ok(())
    } else {
        Err("Not logged in. Run `wedding-guest login` first.".into())
    }
}

pub async fn login(app: &App) -> Result<(), Box<dyn Error>> {
    if app.session.is_authenticated() {
        println!("Already logged in.");
        return Ok(());
    }

    let phone = match app.session.pending_verification()? {
        Some(attempt) => {
            println!("A code was already sent to {}.", attempt.phone);
            attempt.phone
        }
        None => {
            let input = prompt("Phone number: ")?;
            let phone = app.session.send_verification_code(&input).await?;
            println!("Code sent to {phone}.");
            phone
        }
    };

    let code = prompt("SMS code: ")?;
    if code.is_empty() {
        app.session.cancel_verification()?;
        return Err("No code entered, verification cancelled.".into());
    }
    app.session.verify_code(&code).await?;

    println!("Logged in as {phone}.");
    Ok(())
}

pub async fn login_oauth(app: &App, provider: Provider) -> Result<(), Box<dyn Error>> {
    if app.session.is_authenticated() {
        println!("Already logged in.");
        return Ok(());
    }

    match provider.flow() {
        ProviderFlow::DirectToken => {
            println!(
                "Sign in at the provider and paste the access token it issued."
            );
            let token = prompt("Access token: ")?;
            if token.is_empty() {
                return Err("No token entered.".into());
            }
            app.session
                .login_with_provider_token(provider, &token)
                .await?;
        }
        ProviderFlow::AuthorizationCode { .. } => {
            let remote = app.auth.fetch_config().await?;
            let client_id = match provider {
                Provider::Yandex => remote.yandex_client_id,
                Provider::Vk => remote.vk_client_id,
            }
            .ok_or_else(|| {
                format!(
                    "The server has no {} client id configured",
                    provider.wire_name()
                )
            })?;

            let server = CallbackServer::new(
                app.config.oauth_callback_port,
                guest_session::DEFAULT_CALLBACK_TIMEOUT_SECS,
            );
            let redirect_uri = server.redirect_uri();
            let request = app
                .session
                .begin_authorization(provider, &client_id, &redirect_uri)?;

            println!("Open this URL in your browser to sign in:\n");
            println!("  {}\n", request.url);
            println!("Waiting for the redirect on {redirect_uri} ...");

            let query = server.wait_for_redirect().await?;
            app.session
                .complete_authorization(provider, &query, &redirect_uri)
                .await?;
        }
    }

    let session = app.session.session();
    match session.user.and_then(|u| u.phone) {
        Some(phone) => println!("Logged in as {phone}."),
        None => println!("Logged in."),
    }
    Ok(())
}

pub async fn status(app: &App) -> Result<(), Box<dyn Error>> {
    let session = app.session.session();
    if session.is_authenticated {
        let user = session.user.unwrap_or_default();
        println!("Logged in.");
        if let Some(phone) = user.phone {
            println!("  phone:  {phone}");
        }
        println!("  friend: {}", if user.friend { "yes" } else { "no" });
    } else {
        println!("Not logged in.");
        if let Some(attempt) = app.session.pending_verification()? {
            println!("  verification pending for {}", attempt.phone);
        }
    }
    Ok(())
}

pub async fn logout(app: &App) -> Result<(), Box<dyn Error>> {
    app.session.logout().await?;
    println!("Logged out.");
    Ok(())
}

pub async fn rsvp(app: &App, attending: Option<bool>) -> Result<(), Box<dyn Error>> {
    require_login(app)?;
    let api = RsvpApi::new(app.client.clone());

    if let Some(attending) = attending {
        api.save(attending).await?;
        println!("RSVP saved: {}", if attending { "attending" } else { "not attending" });
        return Ok(());
    }

    match api.get().await?.rsvp {
        Some(true) => println!("RSVP: attending"),
        Some(false) => println!("RSVP: not attending"),
        None => println!("RSVP: not answered yet"),
    }
    Ok(())
}

#[derive(Default)]
pub struct PreferenceChanges {
    pub food: Option<String>,
    pub alcohol: Vec<String>,
    pub add_allergen: Option<String>,
    pub remove_allergen: Option<String>,
}

impl PreferenceChanges {
    fn is_empty(&self) -> bool {
        self.food.is_none()
            && self.alcohol.is_empty()
            && self.add_allergen.is_none()
            && self.remove_allergen.is_none()
    }
}

pub async fn preferences(app: &App, changes: PreferenceChanges) -> Result<(), Box<dyn Error>> {
    require_login(app)?;
    let api = PreferencesApi::new(app.client.clone());

    if changes.is_empty() {
        let options = api.form_options().await?;
        let current = api.get().await?;

        println!(
            "Food:      {}",
            current.food_preference.as_deref().unwrap_or("not chosen")
        );
        println!("  options: {}", options.food_choices.join(", "));
        println!(
            "Alcohol:   {}",
            if current.alcohol_preferences.is_empty() {
                "not chosen".to_string()
            } else {
                current.alcohol_preferences.join(", ")
            }
        );
        println!("  options: {}", options.alcohol_choices.join(", "));
        println!(
            "Allergies: {}",
            if current.allergies.is_empty() {
                "none".to_string()
            } else {
                current.allergies.join(", ")
            }
        );
        return Ok(());
    }

    if let Some(food) = changes.food {
        api.save_food(&food).await?;
        println!("Food preference saved: {food}");
    }
    if !changes.alcohol.is_empty() {
        api.save_alcohol(&changes.alcohol).await?;
        println!("Alcohol preferences saved: {}", changes.alcohol.join(", "));
    }
    if let Some(allergen) = changes.add_allergen {
        api.add_allergen(&allergen).await?;
        println!("Allergen added: {allergen}");
    }
    if let Some(allergen) = changes.remove_allergen {
        api.remove_allergen(&allergen).await?;
        println!("Allergen removed: {allergen}");
    }
    Ok(())
}

fn print_wishlist_items(items: &[WishlistItem], current_user_uuid: Option<&str>) {
    for item in items {
        let mark = if item.reserved_by(current_user_uuid) {
            " [reserved by you]"
        } else if item.user_uuid.is_some() {
            " [reserved]"
        } else {
            ""
        };
        match &item.link {
            Some(link) => println!("  {}  {} ({link}){mark}", item.uuid, item.item),
            None => println!("  {}  {}{mark}", item.uuid, item.item),
        }
    }
}

pub async fn wishlist(
    app: &App,
    reserve: Option<String>,
    unreserve: Option<String>,
) -> Result<(), Box<dyn Error>> {
    require_login(app)?;
    let api = WishlistApi::new(app.client.clone());

    if let Some(uuid) = reserve {
        api.reserve(&uuid).await?;
        println!("Reserved {uuid}.");
        return Ok(());
    }
    if let Some(uuid) = unreserve {
        api.unreserve(&uuid).await?;
        println!("Released {uuid}.");
        return Ok(());
    }

    let wishlist = api.get().await?;
    let me = wishlist.current_user_uuid.as_deref();
    println!("Bride:");
    print_wishlist_items(&wishlist.bride_items, me);
    println!("Groom:");
    print_wishlist_items(&wishlist.groom_items, me);
    Ok(())
}

fn parse_archive_kind(name: &str) -> Result<ArchiveKind, Box<dyn Error>> {
    match name {
        "photos" => Ok(ArchiveKind::AllPhotos),
        "video" => Ok(ArchiveKind::Video),
        "best-moments" => Ok(ArchiveKind::BestMoments),
        other => Err(format!(
            "Unknown archive `{other}`, expected photos, video, or best-moments"
        )
        .into()),
    }
}

pub async fn gallery(
    app: &App,
    folder: Option<String>,
    archive: Option<String>,
) -> Result<(), Box<dyn Error>> {
    require_login(app)?;
    let api = GalleryApi::new(app.client.clone());

    if let Some(name) = archive {
        let kind = parse_archive_kind(&name)?;
        let url = api.archive_url(kind).await?;
        println!("{url}");
        return Ok(());
    }

    if let Some(folder) = folder {
        let listing = api.list(&folder).await?;
        if listing.paths.is_empty() {
            println!("No files in {folder}.");
            return Ok(());
        }
        for path in &listing.paths {
            println!("{path}");
        }
        return Ok(());
    }

    let status = api.status().await?;
    if status.content_enabled {
        println!("Gallery is published.");
    } else {
        println!("Gallery is not published yet.");
    }
    Ok(())
}
