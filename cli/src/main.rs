use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use concierge::config::ConfigError;
use concierge::net::types::{
    BookingStatus, ContactForm, NewBooking, NewEmergencyAlert, ProfileUpdate, RegisterRequest,
};
use concierge::session::navigator::HistoryNavigator;
use concierge::{ApiClient, ApiError, ClientConfig, FileTokenStore, SessionError, SessionManager, SessionState};
use serde::Serialize;
use serde_json::{Value, json};

#[cfg(test)]
#[path = "main_test.rs"]
mod main_test;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("not signed in; run `concierge-cli login` first")]
    NotSignedIn,
    #[error("invalid {field}: {value}")]
    InvalidArg { field: &'static str, value: String },
    #[error("invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

#[derive(Parser, Debug)]
#[command(name = "concierge-cli", about = "Concierge booking API and session CLI")]
struct Cli {
    /// Overrides `CONCIERGE_API_URL` from the environment or `.env`.
    #[arg(long)]
    api_url: Option<String>,

    /// File holding the persisted credential.
    #[arg(long, env = "CONCIERGE_TOKEN_FILE", default_value = ".concierge-session.json")]
    token_file: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sign in and persist the credential.
    Login {
        email: String,
        #[arg(long, env = "CONCIERGE_PASSWORD")]
        password: String,
    },
    /// Create an account and sign in as it.
    Register(RegisterArgs),
    /// Resolve the stored credential into the current user.
    Whoami,
    /// Forget the stored credential.
    Logout,
    Profile(ProfileCommand),
    /// Change the signed-in user's password.
    Password {
        #[arg(long)]
        current: String,
        #[arg(long)]
        new: String,
    },
    Services(CatalogCommand),
    Packages(CatalogCommand),
    Blogs(CatalogCommand),
    Bookings(BookingCommand),
    /// Send the public contact form.
    Contact(ContactArgs),
    Emergency(EmergencyCommand),
    Admin(AdminCommand),
}

#[derive(Args, Debug)]
struct RegisterArgs {
    email: String,
    #[arg(long, env = "CONCIERGE_PASSWORD")]
    password: String,
    #[arg(long)]
    first_name: String,
    #[arg(long)]
    last_name: String,
    #[arg(long)]
    phone: Option<String>,
}

#[derive(Args, Debug)]
struct ProfileCommand {
    #[command(subcommand)]
    command: ProfileSubcommand,
}

#[derive(Subcommand, Debug)]
enum ProfileSubcommand {
    Show,
    Update(ProfileArgs),
}

#[derive(Args, Debug)]
struct ProfileArgs {
    #[arg(long)]
    first_name: Option<String>,
    #[arg(long)]
    last_name: Option<String>,
    #[arg(long)]
    phone: Option<String>,
    #[arg(long)]
    address: Option<String>,
    #[arg(long)]
    city: Option<String>,
    #[arg(long)]
    state: Option<String>,
    #[arg(long)]
    country: Option<String>,
    #[arg(long)]
    profile_image: Option<String>,
}

impl From<ProfileArgs> for ProfileUpdate {
    fn from(args: ProfileArgs) -> Self {
        Self {
            first_name: args.first_name,
            last_name: args.last_name,
            phone: args.phone,
            address: args.address,
            city: args.city,
            state: args.state,
            country: args.country,
            profile_image: args.profile_image,
        }
    }
}

#[derive(Args, Debug)]
struct CatalogCommand {
    #[command(subcommand)]
    command: CatalogSubcommand,
}

#[derive(Subcommand, Debug)]
enum CatalogSubcommand {
    List,
    /// Show one entry by id (slug for blogs).
    Show { key: String },
    /// Create from a JSON document (admin).
    Create {
        #[arg(long)]
        data: String,
    },
    /// Replace from a JSON document (admin).
    Update {
        id: String,
        #[arg(long)]
        data: String,
    },
    Delete { id: String },
}

#[derive(Args, Debug)]
struct BookingCommand {
    #[command(subcommand)]
    command: BookingSubcommand,
}

#[derive(Subcommand, Debug)]
enum BookingSubcommand {
    List,
    Show {
        id: String,
    },
    Create {
        service_id: String,
        #[arg(long)]
        date: String,
        #[arg(long)]
        requests: Option<String>,
    },
    /// Set status: pending, confirmed, completed, or cancelled.
    Status {
        id: String,
        status: String,
    },
}

#[derive(Args, Debug)]
struct ContactArgs {
    #[arg(long)]
    name: String,
    #[arg(long)]
    email: String,
    #[arg(long)]
    phone: Option<String>,
    #[arg(long)]
    subject: String,
    #[arg(long)]
    message: String,
}

#[derive(Args, Debug)]
struct EmergencyCommand {
    #[command(subcommand)]
    command: EmergencySubcommand,
}

#[derive(Subcommand, Debug)]
enum EmergencySubcommand {
    List,
    Raise {
        message: String,
        #[arg(long)]
        location: Option<String>,
    },
}

#[derive(Args, Debug)]
struct AdminCommand {
    #[command(subcommand)]
    command: AdminSubcommand,
}

#[derive(Subcommand, Debug)]
enum AdminSubcommand {
    Stats,
    Users,
}

#[derive(Debug, Clone, Copy)]
enum Catalog {
    Services,
    Packages,
    Blogs,
}

struct CliContext {
    manager: Arc<SessionManager>,
    api: Arc<ApiClient>,
    nav: Arc<HistoryNavigator>,
}

#[tokio::main]
async fn main() {
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("warning: failed to load .env: {e}");
        }
    }
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(Cli::parse()).await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let mut config = ClientConfig::from_env()?;
    if let Some(url) = &cli.api_url {
        config.api_url = ClientConfig::with_api_url(url).api_url;
    }
    let tokens = Arc::new(FileTokenStore::new(cli.token_file, &config.token_key));
    let nav = Arc::new(HistoryNavigator::new());
    let (manager, api) = SessionManager::connect(&config, tokens, nav.clone())?;
    tracing::debug!(api_url = %api.base_url(), "client ready");
    let ctx = CliContext { manager, api, nav };

    let result = dispatch(&ctx, cli.command).await;
    ctx.manager.shutdown();
    result
}

async fn dispatch(ctx: &CliContext, command: Command) -> Result<(), CliError> {
    match command {
        Command::Login { email, password } => {
            let user = ctx.manager.login(&email, &password).await?;
            print_json(&with_route(ctx, &user)?)
        }
        Command::Register(args) => {
            let request = RegisterRequest {
                email: args.email,
                password: args.password,
                first_name: args.first_name,
                last_name: args.last_name,
                phone: args.phone,
            };
            let user = ctx.manager.register(&request).await?;
            print_json(&with_route(ctx, &user)?)
        }
        Command::Whoami => match ctx.manager.hydrate().await {
            SessionState::Authenticated(user) => print_json(&serde_json::to_value(user)?),
            _ => Err(CliError::NotSignedIn),
        },
        Command::Logout => {
            ctx.manager.logout();
            println!("signed out");
            Ok(())
        }
        Command::Profile(profile) => run_profile(ctx, profile).await,
        Command::Password { current, new } => {
            signed_in(ctx).await?;
            ctx.manager.change_password(&current, &new).await?;
            println!("password changed");
            Ok(())
        }
        Command::Services(cmd) => run_catalog(ctx, Catalog::Services, cmd).await,
        Command::Packages(cmd) => run_catalog(ctx, Catalog::Packages, cmd).await,
        Command::Blogs(cmd) => run_catalog(ctx, Catalog::Blogs, cmd).await,
        Command::Bookings(cmd) => run_bookings(ctx, cmd).await,
        Command::Contact(args) => {
            let form = ContactForm {
                name: args.name,
                email: args.email,
                phone: args.phone,
                subject: args.subject,
                message: args.message,
            };
            ctx.api.send_contact_form(&form).await?;
            println!("message sent");
            Ok(())
        }
        Command::Emergency(cmd) => match cmd.command {
            EmergencySubcommand::List => print_serialized(&ctx.api.list_emergency_alerts().await?),
            EmergencySubcommand::Raise { message, location } => {
                let alert = NewEmergencyAlert { message, location };
                print_serialized(&ctx.api.create_emergency_alert(&alert).await?)
            }
        },
        Command::Admin(cmd) => match cmd.command {
            AdminSubcommand::Stats => print_serialized(&ctx.api.dashboard_stats().await?),
            AdminSubcommand::Users => print_serialized(&ctx.api.list_users().await?),
        },
    }
}

async fn run_profile(ctx: &CliContext, profile: ProfileCommand) -> Result<(), CliError> {
    signed_in(ctx).await?;
    match profile.command {
        ProfileSubcommand::Show => {
            let user = ctx.manager.user().ok_or(CliError::NotSignedIn)?;
            print_serialized(&user)
        }
        ProfileSubcommand::Update(args) => {
            let update = ProfileUpdate::from(args);
            if update.is_empty() {
                return Err(CliError::InvalidArg { field: "profile update", value: "no fields given".to_owned() });
            }
            print_serialized(&ctx.manager.update_profile(&update).await?)
        }
    }
}

async fn run_catalog(ctx: &CliContext, catalog: Catalog, cmd: CatalogCommand) -> Result<(), CliError> {
    let api = &ctx.api;
    match (catalog, cmd.command) {
        (Catalog::Services, CatalogSubcommand::List) => print_serialized(&api.list_services().await?),
        (Catalog::Services, CatalogSubcommand::Show { key }) => print_serialized(&api.service(&key).await?),
        (Catalog::Services, CatalogSubcommand::Create { data }) => {
            print_serialized(&api.create_service(&parse_document(&data)?).await?)
        }
        (Catalog::Services, CatalogSubcommand::Update { id, data }) => {
            print_serialized(&api.update_service(&id, &parse_document(&data)?).await?)
        }
        (Catalog::Services, CatalogSubcommand::Delete { id }) => {
            api.delete_service(&id).await?;
            deleted()
        }

        (Catalog::Packages, CatalogSubcommand::List) => print_serialized(&api.list_packages().await?),
        (Catalog::Packages, CatalogSubcommand::Show { key }) => print_serialized(&api.package(&key).await?),
        (Catalog::Packages, CatalogSubcommand::Create { data }) => {
            print_serialized(&api.create_package(&parse_document(&data)?).await?)
        }
        (Catalog::Packages, CatalogSubcommand::Update { id, data }) => {
            print_serialized(&api.update_package(&id, &parse_document(&data)?).await?)
        }
        (Catalog::Packages, CatalogSubcommand::Delete { id }) => {
            api.delete_package(&id).await?;
            deleted()
        }

        (Catalog::Blogs, CatalogSubcommand::List) => print_serialized(&api.list_blogs().await?),
        (Catalog::Blogs, CatalogSubcommand::Show { key }) => print_serialized(&api.blog(&key).await?),
        (Catalog::Blogs, CatalogSubcommand::Create { data }) => {
            print_serialized(&api.create_blog(&parse_document(&data)?).await?)
        }
        (Catalog::Blogs, CatalogSubcommand::Update { id, data }) => {
            print_serialized(&api.update_blog(&id, &parse_document(&data)?).await?)
        }
        (Catalog::Blogs, CatalogSubcommand::Delete { id }) => {
            api.delete_blog(&id).await?;
            deleted()
        }
    }
}

async fn run_bookings(ctx: &CliContext, cmd: BookingCommand) -> Result<(), CliError> {
    match cmd.command {
        BookingSubcommand::List => print_serialized(&ctx.api.list_bookings().await?),
        BookingSubcommand::Show { id } => print_serialized(&ctx.api.booking(&id).await?),
        BookingSubcommand::Create { service_id, date, requests } => {
            let booking = NewBooking { service_id, booking_date: date, special_requests: requests };
            print_serialized(&ctx.api.create_booking(&booking).await?)
        }
        BookingSubcommand::Status { id, status } => {
            let status = parse_booking_status(&status)?;
            print_serialized(&ctx.api.update_booking_status(&id, status).await?)
        }
    }
}

/// Hydrate and require an authenticated session.
async fn signed_in(ctx: &CliContext) -> Result<(), CliError> {
    if ctx.manager.hydrate().await.is_authenticated() {
        Ok(())
    } else {
        Err(CliError::NotSignedIn)
    }
}

fn with_route<T: Serialize>(ctx: &CliContext, user: &T) -> Result<Value, CliError> {
    let route = ctx.nav.last().map(|r| r.path());
    Ok(json!({ "user": serde_json::to_value(user)?, "route": route }))
}

fn parse_booking_status(raw: &str) -> Result<BookingStatus, CliError> {
    serde_json::from_value(Value::String(raw.trim().to_lowercase()))
        .map_err(|_| CliError::InvalidArg { field: "booking status", value: raw.to_owned() })
}

fn parse_document(data: &str) -> Result<Value, CliError> {
    let value = serde_json::from_str::<Value>(data)?;
    if !value.is_object() {
        return Err(CliError::InvalidArg { field: "document", value: "expected a JSON object".to_owned() });
    }
    Ok(value)
}

fn deleted() -> Result<(), CliError> {
    println!("deleted");
    Ok(())
}

fn print_serialized<T: Serialize>(value: &T) -> Result<(), CliError> {
    print_json(&serde_json::to_value(value)?)
}

fn print_json(value: &Value) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}
