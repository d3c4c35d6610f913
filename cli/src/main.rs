//! `gotux`: command-line shell for the gotux image-hosting service.
//!
//! SYSTEM CONTEXT
//! ==============
//! Each invocation loads the session from the session file, runs the route
//! guard for the view the command stands in for, issues its calls through
//! the request pipeline, then drains session events so a server-side logout
//! mid-command ends with a login hint.

#[cfg(test)]
#[path = "main_test.rs"]
mod main_test;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Args, Parser, Subcommand, ValueEnum};
use gotux_client::config::normalize_base_url;
use gotux_client::net::api::{admin, auth, images, public, settings};
use gotux_client::net::types::{
    ImageUpdate, ListQuery, ProfileUpdate, RandomImageFilter, RegisterRequest, UserSettings, UserStatus,
};
use gotux_client::router::{GuardRule, LOGIN_PATH, NavigationError, REGISTER_PATH, RouteTable};
use gotux_client::state::store::FileStore;
use gotux_client::{
    ApiError, ClientConfig, ConfigError, Navigator, Notice, Notifier, RequestPipeline, SessionEvent, SessionState,
};
use serde::Serialize;
use serde_json::json;
use tokio::sync::broadcast;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("{0}")]
    Api(#[from] ApiError),
    #[error("navigation failed: {0}")]
    Navigation(#[from] NavigationError),
    #[error("{}", refusal_message(.0))]
    Refused(GuardRule),
    #[error("failed to read {path}: {source}")]
    ReadFile { path: String, source: std::io::Error },
    #[error("failed to write {path}: {source}")]
    WriteFile { path: String, source: std::io::Error },
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("nothing to update; pass at least one field")]
    EmptyUpdate,
}

fn refusal_message(rule: &GuardRule) -> &'static str {
    match rule {
        GuardRule::LoginRequired => "login required; run `gotux login <username>` first",
        GuardRule::AlreadyLoggedIn => "already logged in; run `gotux logout` first",
        GuardRule::AdminRequired => "administrator role required",
    }
}

// =============================================================================
// ARGUMENTS
// =============================================================================

#[derive(Parser, Debug)]
#[command(name = "gotux", about = "gotux image hosting CLI")]
struct Cli {
    #[arg(long, env = "GOTUX_BASE_URL")]
    base_url: Option<String>,

    #[arg(long, env = "GOTUX_SESSION_FILE")]
    session_file: Option<PathBuf>,

    #[arg(long, env = "GOTUX_REQUEST_TIMEOUT_SECS", value_parser = clap::value_parser!(u64).range(1..))]
    timeout_secs: Option<u64>,

    /// Log requests and session changes to stderr.
    #[arg(long, short)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Login {
        username: String,
        #[arg(long, env = "GOTUX_PASSWORD")]
        password: String,
    },
    Register {
        username: String,
        #[arg(long)]
        email: String,
        #[arg(long, env = "GOTUX_PASSWORD")]
        password: String,
    },
    Logout,
    /// Show the locally stored session.
    Whoami,
    /// Usage summary for the current user.
    Stats,
    Profile(ProfileCommand),
    Images(ImagesCommand),
    Admin(AdminCommand),
    Settings(SettingsCommand),
    /// Fetch a random public image (no login needed).
    Random {
        #[arg(long)]
        user_id: Option<u64>,
        #[arg(long)]
        tags: Option<String>,
        /// Save the image file here instead of printing its metadata.
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

#[derive(Args, Debug)]
struct ProfileCommand {
    #[command(subcommand)]
    command: ProfileSubcommand,
}

#[derive(Subcommand, Debug)]
enum ProfileSubcommand {
    Show,
    Update {
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        avatar: Option<String>,
    },
    Password {
        #[arg(long)]
        old: String,
        #[arg(long)]
        new: String,
    },
}

#[derive(Args, Debug)]
struct ImagesCommand {
    #[command(subcommand)]
    command: ImagesSubcommand,
}

#[derive(Args, Debug, Clone, Default)]
struct PageArgs {
    #[arg(long)]
    page: Option<u32>,
    #[arg(long)]
    page_size: Option<u32>,
}

#[derive(Subcommand, Debug)]
enum ImagesSubcommand {
    List {
        #[command(flatten)]
        page: PageArgs,
        #[arg(long)]
        keyword: Option<String>,
    },
    Show {
        id: u64,
    },
    Upload {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    Update {
        id: u64,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        tags: Option<String>,
        #[arg(long)]
        public: Option<bool>,
    },
    Delete {
        id: u64,
    },
    BatchDelete {
        #[arg(required = true)]
        ids: Vec<u64>,
    },
    Links {
        id: u64,
    },
}

#[derive(Args, Debug)]
struct AdminCommand {
    #[command(subcommand)]
    command: AdminSubcommand,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum StatusArg {
    Active,
    Disabled,
}

impl From<StatusArg> for UserStatus {
    fn from(value: StatusArg) -> Self {
        match value {
            StatusArg::Active => Self::Active,
            StatusArg::Disabled => Self::Disabled,
        }
    }
}

#[derive(Subcommand, Debug)]
enum AdminSubcommand {
    Users {
        #[command(flatten)]
        page: PageArgs,
    },
    Status {
        id: u64,
        #[arg(value_enum)]
        status: StatusArg,
    },
    /// Set a user's storage quota in bytes (0 = unlimited).
    Quota {
        id: u64,
        bytes: i64,
    },
    Images {
        #[command(flatten)]
        page: PageArgs,
    },
    Stats,
}

#[derive(Args, Debug)]
struct SettingsCommand {
    #[command(subcommand)]
    command: SettingsSubcommand,
}

#[derive(Subcommand, Debug)]
enum SettingsSubcommand {
    Show,
    Update {
        #[arg(long)]
        custom_domain: Option<String>,
        #[arg(long, value_parser = ["url", "markdown", "html", "bbcode"])]
        link_format: Option<String>,
        #[arg(long)]
        watermark: Option<bool>,
        #[arg(long)]
        watermark_text: Option<String>,
        #[arg(long)]
        compress: Option<bool>,
        #[arg(long, value_parser = clap::value_parser!(u8).range(1..=100))]
        quality: Option<u8>,
    },
}

// =============================================================================
// SHELL
// =============================================================================

/// Renders notices as `[kind] message` on stderr.
struct StderrNotifier;

impl Notifier for StderrNotifier {
    fn notify(&self, notice: &Notice) {
        eprintln!("[{}] {}", notice.kind.as_str(), notice.message);
    }
}

struct Shell {
    session: SessionState,
    pipeline: RequestPipeline,
    navigator: Navigator,
    events: broadcast::Receiver<SessionEvent>,
}

/// Outcome of one command, and whether the server ended the session while
/// it ran (including during the guard's profile refresh).
struct Completed {
    result: Result<(), CliError>,
    session_expired: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    if let Err(e) = run(cli).await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let level = if verbose { tracing::Level::DEBUG } else { tracing::Level::WARN };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn load_config(cli: &Cli) -> Result<ClientConfig, CliError> {
    let mut config = ClientConfig::from_env()?;
    if let Some(base_url) = &cli.base_url {
        config.base_url = normalize_base_url(base_url)?;
    }
    if let Some(path) = &cli.session_file {
        config.session_file.clone_from(path);
    }
    if let Some(secs) = cli.timeout_secs {
        config.timeouts.request_secs = secs;
    }
    Ok(config)
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let config = load_config(&cli)?;
    tracing::debug!(base_url = %config.base_url, session_file = %config.session_file.display(), "config loaded");

    let session = SessionState::load(FileStore::open(config.session_file.clone()));
    let pipeline = RequestPipeline::new(&config, session.clone(), Arc::new(StderrNotifier))?;
    let mut shell = Shell::new(session, pipeline);

    let completed = shell.dispatch(cli.command).await;
    if completed.session_expired {
        eprintln!("session expired; run `gotux login <username>` to sign in again");
    }
    completed.result
}

/// View a command stands in for; `None` for unguarded commands.
fn route_for(command: &Command) -> Option<&'static str> {
    match command {
        Command::Login { .. } => Some(LOGIN_PATH),
        Command::Register { .. } => Some(REGISTER_PATH),
        Command::Logout | Command::Whoami | Command::Random { .. } => None,
        Command::Stats => Some("/dashboard"),
        Command::Profile(_) | Command::Settings(_) => Some("/profile"),
        Command::Images(images) => match images.command {
            ImagesSubcommand::Upload { .. } => Some("/upload"),
            _ => Some("/images"),
        },
        Command::Admin(admin) => match admin.command {
            AdminSubcommand::Images { .. } => Some("/admin/images"),
            _ => Some("/admin/users"),
        },
    }
}

impl Shell {
    fn new(session: SessionState, pipeline: RequestPipeline) -> Self {
        let navigator = Navigator::new(RouteTable::standard(), session.clone());
        let events = pipeline.subscribe();
        Self { session, pipeline, navigator, events }
    }

    /// Guard and run `command`, then drain session events whether or not
    /// the guard let it through.
    async fn dispatch(&mut self, command: Command) -> Completed {
        let entered = match route_for(&command) {
            Some(route) => self.enter(route).await,
            None => Ok(()),
        };
        let result = match entered {
            Ok(()) => self.execute(command).await,
            Err(e) => Err(e),
        };
        let session_expired = self.navigator.drain_events(&mut self.events);
        Completed { result, session_expired }
    }

    /// Run the guard for `route`, refreshing a pending profile first so the
    /// admin check sees the real role.
    async fn enter(&mut self, route: &str) -> Result<(), CliError> {
        if self.session.profile_pending() {
            if let Err(e) = self.session.fetch_profile(&self.pipeline).await {
                tracing::debug!(error = %e, "profile refresh failed");
            }
        }
        let outcome = self.navigator.navigate(route)?;
        match outcome.blocked_by {
            Some(rule) => Err(CliError::Refused(rule)),
            None => Ok(()),
        }
    }

    async fn execute(&self, command: Command) -> Result<(), CliError> {
        match command {
            Command::Login { username, password } => {
                let payload = self
                    .session
                    .login(&self.pipeline, &username, &password)
                    .await?;
                println!("logged in as {} ({})", payload.user.username, payload.user.role);
                Ok(())
            }
            Command::Register { username, email, password } => {
                let request = RegisterRequest { username, email, password };
                let response = auth::register(&self.pipeline, &request).await?;
                println!("registered {}; run `gotux login {}`", response.user.username, response.user.username);
                Ok(())
            }
            Command::Logout => {
                if self.session.logout() {
                    println!("logged out");
                } else {
                    println!("not logged in");
                }
                Ok(())
            }
            Command::Whoami => {
                let session = self.session.snapshot();
                print_json(&json!({
                    "logged_in": session.is_logged_in(),
                    "admin": session.is_admin(),
                    "profile_pending": session.profile_pending(),
                    "user": session.user,
                }))
            }
            Command::Stats => print_json(&auth::stats(&self.pipeline).await?),
            Command::Profile(profile) => self.run_profile(profile.command).await,
            Command::Images(images) => self.run_images(images.command).await,
            Command::Admin(admin) => self.run_admin(admin.command).await,
            Command::Settings(settings) => self.run_settings(settings.command).await,
            Command::Random { user_id, tags, output } => {
                let filter = RandomImageFilter { user_id, tags };
                let channel = self.pipeline.public();
                match output {
                    Some(path) => {
                        let bytes = public::random_image(&channel, &filter).await?;
                        std::fs::write(&path, &bytes)
                            .map_err(|source| CliError::WriteFile { path: path.display().to_string(), source })?;
                        eprintln!("saved {} bytes to {}", bytes.len(), path.display());
                        Ok(())
                    }
                    None => print_json(&public::random(&channel, &filter).await?),
                }
            }
        }
    }

    async fn run_profile(&self, command: ProfileSubcommand) -> Result<(), CliError> {
        match command {
            ProfileSubcommand::Show => print_json(&self.session.fetch_profile(&self.pipeline).await?),
            ProfileSubcommand::Update { email, avatar } => {
                if email.is_none() && avatar.is_none() {
                    return Err(CliError::EmptyUpdate);
                }
                let update = ProfileUpdate { email, avatar };
                print_json(&self.session.update_profile(&self.pipeline, &update).await?)
            }
            ProfileSubcommand::Password { old, new } => {
                let response = auth::change_password(&self.pipeline, &old, &new).await?;
                println!("{}", response.message);
                Ok(())
            }
        }
    }

    async fn run_images(&self, command: ImagesSubcommand) -> Result<(), CliError> {
        match command {
            ImagesSubcommand::List { page, keyword } => {
                let query = ListQuery { page: page.page, page_size: page.page_size, keyword };
                print_json(&images::list(&self.pipeline, &query).await?)
            }
            ImagesSubcommand::Show { id } => print_json(&images::get(&self.pipeline, id).await?),
            ImagesSubcommand::Upload { files } => {
                let parts = files.iter().map(|path| read_upload(path)).collect::<Result<Vec<_>, _>>()?;
                let response = images::upload(&self.pipeline, parts).await?;
                for error in &response.errors {
                    eprintln!("[failure] {error}");
                }
                print_json(&response)
            }
            ImagesSubcommand::Update { id, description, tags, public } => {
                if description.is_none() && tags.is_none() && public.is_none() {
                    return Err(CliError::EmptyUpdate);
                }
                // The endpoint replaces description and tags, so fill the
                // omitted ones from the current image.
                let current = images::get(&self.pipeline, id).await?;
                let update = ImageUpdate {
                    description: description.unwrap_or(current.description),
                    tags: tags.unwrap_or(current.tags),
                    is_public: public,
                };
                print_json(&images::update(&self.pipeline, id, &update).await?)
            }
            ImagesSubcommand::Delete { id } => {
                let response = images::delete(&self.pipeline, id).await?;
                println!("{}", response.message);
                Ok(())
            }
            ImagesSubcommand::BatchDelete { ids } => print_json(&images::batch_delete(&self.pipeline, &ids).await?),
            ImagesSubcommand::Links { id } => print_json(&images::links(&self.pipeline, id).await?),
        }
    }

    async fn run_admin(&self, command: AdminSubcommand) -> Result<(), CliError> {
        match command {
            AdminSubcommand::Users { page } => print_json(&admin::users(&self.pipeline, &page.into()).await?),
            AdminSubcommand::Status { id, status } => {
                print_json(&admin::set_user_status(&self.pipeline, id, status.into()).await?)
            }
            AdminSubcommand::Quota { id, bytes } => print_json(&admin::set_user_quota(&self.pipeline, id, bytes).await?),
            AdminSubcommand::Images { page } => print_json(&admin::images(&self.pipeline, &page.into()).await?),
            AdminSubcommand::Stats => print_json(&admin::stats(&self.pipeline).await?),
        }
    }

    async fn run_settings(&self, command: SettingsSubcommand) -> Result<(), CliError> {
        match command {
            SettingsSubcommand::Show => print_json(&settings::get(&self.pipeline).await?),
            SettingsSubcommand::Update {
                custom_domain,
                link_format,
                watermark,
                watermark_text,
                compress,
                quality,
            } => {
                let update = UserSettings {
                    custom_domain,
                    default_link_format: link_format,
                    enable_watermark: watermark,
                    watermark_text,
                    compress_image: compress,
                    compress_quality: quality,
                    extra: serde_json::Map::new(),
                };
                if update == UserSettings::default() {
                    return Err(CliError::EmptyUpdate);
                }
                let response = settings::update(&self.pipeline, &update).await?;
                println!("{}", response.message);
                Ok(())
            }
        }
    }
}

impl From<PageArgs> for ListQuery {
    fn from(page: PageArgs) -> Self {
        Self { page: page.page, page_size: page.page_size, keyword: None }
    }
}

// =============================================================================
// HELPERS
// =============================================================================

fn read_upload(path: &Path) -> Result<gotux_client::net::pipeline::FilePart, CliError> {
    let bytes = std::fs::read(path).map_err(|source| CliError::ReadFile { path: path.display().to_string(), source })?;
    let file_name = path
        .file_name()
        .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());
    Ok(images::upload_part(file_name, mime_for(path), bytes))
}

/// Content type by extension for the formats the server accepts.
fn mime_for(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        "bmp" => Some("image/bmp"),
        _ => None,
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}
