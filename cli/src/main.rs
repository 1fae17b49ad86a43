mod calendar;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};
use scheduler_client::net::config::ConfigError;
use scheduler_client::net::types::{
    Credentials, NewUser, Registration, Reservation, ReservationInput, Role, ServerInput, ServerStatus, UserUpdate,
};
use scheduler_client::util::credentials::FileStorage;
use scheduler_client::util::navigation::Location;
use scheduler_client::{ApiClient, ApiConfig, ApiError, GuardDecision, Route, SessionStore, navigate};
use serde::Serialize;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing_subscriber::EnvFilter;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("not logged in; run `scheduler login`")]
    NotLoggedIn,
    #[error("root role required")]
    RootRequired,
    #[error("session expired; run `scheduler login`")]
    SessionExpired,
    #[error("cannot locate a config directory; pass --credentials or set SCHEDULER_CREDENTIALS")]
    NoConfigDir,
    #[error("missing password; pass --password or set SCHEDULER_PASSWORD")]
    MissingPassword,
    #[error("invalid timestamp `{0}`; expected RFC 3339 such as 2024-03-04T10:00:00Z")]
    InvalidTime(String),
    #[error("invalid date `{0}`; expected YYYY-MM-DD")]
    InvalidDate(String),
    #[error("reservation must end after it starts")]
    EmptyRange,
    #[error("nothing to update; pass at least one field")]
    EmptyUpdate,
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("calendar rendering failed: {0}")]
    Render(#[from] calendar::RenderError),
}

#[derive(Parser, Debug)]
#[command(name = "scheduler", about = "Server reservation admin CLI")]
struct Cli {
    /// Backend origin; overrides SCHEDULER_API_URL / SCHEDULER_ENV resolution.
    #[arg(long)]
    api_url: Option<String>,

    /// Per-request timeout; overrides SCHEDULER_TIMEOUT_MS.
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Credential file; defaults to <config dir>/scheduler/credentials.json.
    #[arg(long, env = "SCHEDULER_CREDENTIALS")]
    credentials: Option<PathBuf>,

    /// Raise log verbosity (-v info, -vv debug). RUST_LOG wins when set.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Login(LoginArgs),
    Register(RegisterArgs),
    Logout,
    Whoami,
    Password {
        #[arg(long)]
        current: String,
        #[arg(long)]
        new: String,
    },
    Servers(ServersCommand),
    Reservations(ReservationsCommand),
    Calendar(CalendarArgs),
    Users(UsersCommand),
}

impl Command {
    /// Route each command renders; `None` for commands outside the route table.
    fn route(&self) -> Option<Route> {
        match self {
            Self::Login(_) => Some(Route::Login),
            Self::Register(_) => Some(Route::Register),
            Self::Logout => None,
            Self::Whoami | Self::Password { .. } => Some(Route::Home),
            Self::Servers(_) => Some(Route::Servers),
            Self::Reservations(_) => Some(Route::Reservations),
            Self::Calendar(_) => Some(Route::Calendar),
            Self::Users(_) => Some(Route::Users),
        }
    }
}

#[derive(Args, Debug)]
struct LoginArgs {
    #[arg(long)]
    username: String,
    #[arg(long, env = "SCHEDULER_PASSWORD", hide_env_values = true)]
    password: Option<String>,
}

#[derive(Args, Debug)]
struct RegisterArgs {
    #[arg(long)]
    username: String,
    #[arg(long, env = "SCHEDULER_PASSWORD", hide_env_values = true)]
    password: Option<String>,
    #[arg(long)]
    email: Option<String>,
}

#[derive(Args, Debug)]
struct ServersCommand {
    #[command(subcommand)]
    command: ServersSubcommand,
}

#[derive(Subcommand, Debug)]
enum ServersSubcommand {
    List,
    Show {
        id: i64,
    },
    Create {
        #[arg(long)]
        name: String,
        #[command(flatten)]
        fields: ServerFields,
    },
    Update {
        id: i64,
        #[arg(long)]
        name: Option<String>,
        #[command(flatten)]
        fields: ServerFields,
    },
    Delete {
        id: i64,
    },
}

#[derive(Args, Debug, Default)]
struct ServerFields {
    #[arg(long)]
    description: Option<String>,
    #[arg(long, value_enum)]
    status: Option<StatusArg>,
    #[arg(long)]
    ip_address: Option<String>,
    #[arg(long)]
    username: Option<String>,
    #[arg(long)]
    password: Option<String>,
}

impl ServerFields {
    fn is_empty(&self) -> bool {
        self.description.is_none()
            && self.status.is_none()
            && self.ip_address.is_none()
            && self.username.is_none()
            && self.password.is_none()
    }

    fn apply(self, input: &mut ServerInput) {
        if let Some(description) = self.description {
            input.description = Some(description);
        }
        if let Some(status) = self.status {
            input.status = Some(status.into());
        }
        if let Some(ip_address) = self.ip_address {
            input.ip_address = Some(ip_address);
        }
        if let Some(username) = self.username {
            input.username = Some(username);
        }
        if let Some(password) = self.password {
            input.password = Some(password);
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum StatusArg {
    Available,
    Reserved,
    Maintenance,
}

impl From<StatusArg> for ServerStatus {
    fn from(value: StatusArg) -> Self {
        match value {
            StatusArg::Available => Self::Available,
            StatusArg::Reserved => Self::Reserved,
            StatusArg::Maintenance => Self::Maintenance,
        }
    }
}

#[derive(Args, Debug)]
struct ReservationsCommand {
    #[command(subcommand)]
    command: ReservationsSubcommand,
}

#[derive(Subcommand, Debug)]
enum ReservationsSubcommand {
    List {
        /// Only reservations for this server.
        #[arg(long)]
        server: Option<i64>,
    },
    Show {
        id: i64,
    },
    Create {
        #[arg(long)]
        server: i64,
        /// RFC 3339 start, e.g. 2024-03-04T10:00:00Z.
        #[arg(long)]
        start: String,
        /// RFC 3339 end.
        #[arg(long)]
        end: String,
    },
    Update {
        id: i64,
        #[arg(long)]
        server: Option<i64>,
        #[arg(long)]
        start: Option<String>,
        #[arg(long)]
        end: Option<String>,
    },
    /// Cancel; the record is kept with status `cancelled`.
    Cancel {
        id: i64,
    },
    /// Remove permanently (root only).
    Delete {
        id: i64,
    },
}

#[derive(Args, Debug)]
struct CalendarArgs {
    /// First day (YYYY-MM-DD, UTC); defaults to today.
    #[arg(long)]
    from: Option<String>,
    #[arg(long, default_value_t = 7)]
    days: u16,
    /// Include cancelled reservations.
    #[arg(long, default_value_t = false)]
    all: bool,
}

#[derive(Args, Debug)]
struct UsersCommand {
    #[command(subcommand)]
    command: UsersSubcommand,
}

#[derive(Subcommand, Debug)]
enum UsersSubcommand {
    List,
    Show {
        id: i64,
    },
    Create {
        #[arg(long)]
        username: String,
        #[arg(long, env = "SCHEDULER_PASSWORD", hide_env_values = true)]
        password: Option<String>,
        #[arg(long, value_enum, default_value = "user")]
        role: RoleArg,
    },
    Update {
        id: i64,
        #[arg(long)]
        username: Option<String>,
        #[arg(long)]
        password: Option<String>,
        #[arg(long, value_enum)]
        role: Option<RoleArg>,
    },
    Delete {
        id: i64,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum RoleArg {
    User,
    Root,
}

impl From<RoleArg> for Role {
    fn from(value: RoleArg) -> Self {
        match value {
            RoleArg::User => Self::User,
            RoleArg::Root => Self::Root,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match start(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", failure_message(&e));
            ExitCode::FAILURE
        }
    }
}

async fn start(cli: Cli) -> Result<(), CliError> {
    let config = build_config(&cli)?;
    let storage = Arc::new(FileStorage::new(credentials_path(cli.credentials.clone())?));
    let api = ApiClient::new(config, storage)?;
    let location = Arc::new(Location::default());
    let session = SessionStore::new(api, location.clone());

    run(&session, &location, cli.command).await
}

/// User-facing line for a failed command.
fn failure_message(error: &CliError) -> String {
    format!("error: {error}")
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

fn build_config(cli: &Cli) -> Result<ApiConfig, CliError> {
    let mut config = ApiConfig::from_env()?;
    if let Some(url) = &cli.api_url {
        config = ApiConfig::new(url.as_str()).with_timeout(config.timeout);
    }
    if let Some(ms) = cli.timeout_ms {
        config = config.with_timeout(Duration::from_millis(ms));
    }
    Ok(config)
}

fn credentials_path(explicit: Option<PathBuf>) -> Result<PathBuf, CliError> {
    if let Some(path) = explicit {
        return Ok(path);
    }
    let dir = dirs::config_dir().ok_or(CliError::NoConfigDir)?;
    Ok(dir.join("scheduler").join("credentials.json"))
}

async fn run(session: &SessionStore, location: &Location, command: Command) -> Result<(), CliError> {
    let route = command.route();

    if let Err(e) = session.initialize().await {
        if route.is_some_and(|r| r.requirement().requires_auth()) {
            return Err(e.into());
        }
        tracing::warn!(error = %e, "could not restore session");
    }

    if let Some(route) = route {
        match navigate(route, session, location) {
            GuardDecision::Proceed => {}
            GuardDecision::Redirect(Route::Login) => return Err(CliError::NotLoggedIn),
            GuardDecision::Redirect(_) if route.requirement().guest() => {
                let name = session.user().map(|u| u.username).unwrap_or_default();
                println!("already logged in as {name}; run `scheduler logout` first");
                return Ok(());
            }
            GuardDecision::Redirect(_) => return Err(CliError::RootRequired),
        }
    }

    let seen = location.history().len();
    let result = dispatch(session, command).await;
    match result {
        Err(CliError::Api(e)) if e.is_auth_failure() && redirected_to_login(location, seen) => {
            tracing::debug!(error = %e, "request rejected the session");
            Err(CliError::SessionExpired)
        }
        other => other,
    }
}

fn redirected_to_login(location: &Location, seen: usize) -> bool {
    location.history().iter().skip(seen).any(|path| path == Route::Login.path())
}

async fn dispatch(session: &SessionStore, command: Command) -> Result<(), CliError> {
    match command {
        Command::Login(args) => {
            let password = args.password.ok_or(CliError::MissingPassword)?;
            let user = session.login(&Credentials::new(args.username, password)).await?;
            println!("logged in as {} ({})", user.username, user.role);
            Ok(())
        }
        Command::Register(args) => {
            let password = args.password.ok_or(CliError::MissingPassword)?;
            let registration = Registration { username: args.username, password, email: args.email };
            let user = session.register(&registration).await?;
            println!("registered and logged in as {}", user.username);
            Ok(())
        }
        Command::Logout => {
            session.logout();
            println!("logged out");
            Ok(())
        }
        Command::Whoami => {
            if let Some(user) = session.user() {
                println!("{} (id {}, role {})", user.username, user.id, user.role);
            }
            Ok(())
        }
        Command::Password { current, new } => {
            let ack = session.change_password(&current, &new).await?;
            println!("{}", ack.message);
            Ok(())
        }
        Command::Servers(servers) => run_servers(session.api(), servers).await,
        Command::Reservations(reservations) => run_reservations(session.api(), reservations).await,
        Command::Calendar(args) => run_calendar(session.api(), args).await,
        Command::Users(users) => run_users(session.api(), users).await,
    }
}

async fn run_servers(api: &ApiClient, servers: ServersCommand) -> Result<(), CliError> {
    match servers.command {
        ServersSubcommand::List => print_json(&api.list_servers().await?),
        ServersSubcommand::Show { id } => print_json(&api.get_server(id).await?),
        ServersSubcommand::Create { name, fields } => {
            let mut input = ServerInput { name, ..ServerInput::default() };
            fields.apply(&mut input);
            print_json(&api.create_server(&input).await?)
        }
        ServersSubcommand::Update { id, name, fields } => {
            if name.is_none() && fields.is_empty() {
                return Err(CliError::EmptyUpdate);
            }
            let current = api.get_server(id).await?;
            let mut input = ServerInput {
                name: name.unwrap_or(current.name),
                description: current.description,
                status: Some(current.status),
                ip_address: current.ip_address,
                username: current.username,
                password: current.password,
            };
            fields.apply(&mut input);
            print_json(&api.update_server(id, &input).await?)
        }
        ServersSubcommand::Delete { id } => print_json(&api.delete_server(id).await?),
    }
}

async fn run_reservations(api: &ApiClient, reservations: ReservationsCommand) -> Result<(), CliError> {
    match reservations.command {
        ReservationsSubcommand::List { server } => {
            let mut rows = api.list_reservations().await?;
            if let Some(server_id) = server {
                rows.retain(|r| r.server_id == server_id);
            }
            print_json(&rows)
        }
        ReservationsSubcommand::Show { id } => print_json(&api.get_reservation(id).await?),
        ReservationsSubcommand::Create { server, start, end } => {
            let input = reservation_input(server, parse_time(&start)?, parse_time(&end)?)?;
            print_json(&api.create_reservation(&input).await?)
        }
        ReservationsSubcommand::Update { id, server, start, end } => {
            if server.is_none() && start.is_none() && end.is_none() {
                return Err(CliError::EmptyUpdate);
            }
            let current: Reservation = api.get_reservation(id).await?;
            let start = start.as_deref().map(parse_time).transpose()?.unwrap_or(current.start_time);
            let end = end.as_deref().map(parse_time).transpose()?.unwrap_or(current.end_time);
            let input = reservation_input(server.unwrap_or(current.server_id), start, end)?;
            print_json(&api.update_reservation(id, &input).await?)
        }
        ReservationsSubcommand::Cancel { id } => print_json(&api.cancel_reservation(id).await?),
        ReservationsSubcommand::Delete { id } => print_json(&api.delete_reservation(id).await?),
    }
}

async fn run_calendar(api: &ApiClient, args: CalendarArgs) -> Result<(), CliError> {
    let from = match args.from.as_deref() {
        Some(raw) => calendar::parse_day(raw).map_err(|_| CliError::InvalidDate(raw.to_owned()))?,
        None => OffsetDateTime::now_utc().date(),
    };
    let rows = api.list_reservations().await?;
    let days = calendar::group_by_day(&rows, from, args.days, args.all);
    print!("{}", calendar::render(&days)?);
    Ok(())
}

async fn run_users(api: &ApiClient, users: UsersCommand) -> Result<(), CliError> {
    match users.command {
        UsersSubcommand::List => print_json(&api.list_users().await?),
        UsersSubcommand::Show { id } => print_json(&api.get_user(id).await?),
        UsersSubcommand::Create { username, password, role } => {
            let password = password.ok_or(CliError::MissingPassword)?;
            let new_user = NewUser { username, password, role: role.into() };
            print_json(&api.create_user(&new_user).await?)
        }
        UsersSubcommand::Update { id, username, password, role } => {
            let update = UserUpdate { username, password, role: role.map(Role::from) };
            if update == UserUpdate::default() {
                return Err(CliError::EmptyUpdate);
            }
            print_json(&api.update_user(id, &update).await?)
        }
        UsersSubcommand::Delete { id } => print_json(&api.delete_user(id).await?),
    }
}

fn parse_time(raw: &str) -> Result<OffsetDateTime, CliError> {
    OffsetDateTime::parse(raw.trim(), &Rfc3339).map_err(|_| CliError::InvalidTime(raw.to_owned()))
}

fn reservation_input(server_id: i64, start: OffsetDateTime, end: OffsetDateTime) -> Result<ReservationInput, CliError> {
    if end <= start {
        return Err(CliError::EmptyRange);
    }
    Ok(ReservationInput { server_id, start_time: start, end_time: end })
}

fn print_json<T: Serialize>(value: &T) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}
