//! woresk admin console
//!
//! Command line front end for the woresk payments backend: sign in, manage
//! users, processors and super-admins, review the activity log and watch
//! for new activity.

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs,
    rust_2018_idioms
)]

use clap::{Parser, Subcommand};
use parking_lot::Mutex;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tokio::signal;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};
use woresk_console::panels::alerts::AlertsPanel;
use woresk_console::panels::processors::{ProcessorUpdate, ProcessorsPanel};
use woresk_console::panels::super_admins::{self, SuperAdminsPanel};
use woresk_console::panels::users::{self, UsersPanel};
use woresk_console::scheduler::spawn_periodic;
use woresk_console::{ConsoleState, DashboardStats, Panel, Resource, Route, TopBar, render};
use woresk_core::types::{
    IpWhitelistRequest, ProcessorCredentials, ProcessorDraft, ProcessorKind, RoleName,
    SuperAdminForm, UserRoleForm,
};
use woresk_core::{Config, Error, Processor, Result, SuperAdmin, UserRole};

/// Command line interface for the woresk admin console
#[derive(Parser)]
#[command(
    name = "woresk",
    version = env!("CARGO_PKG_VERSION"),
    about = "Admin console for the woresk payments backend",
    long_about = "Headless admin console for the woresk payments backend: session-gated management of users, payment processors, super-admins and the activity log."
)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error); overrides the config file
    #[arg(short, long)]
    log_level: Option<String>,

    /// Log format (json, pretty); overrides the config file
    #[arg(long)]
    log_format: Option<String>,

    /// Enable structured JSON logging
    #[arg(long)]
    json: bool,

    /// Subcommand
    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands
#[derive(Subcommand)]
enum Commands {
    /// Sign in and store the session
    Login {
        /// Account name
        #[arg(short, long)]
        username: String,

        /// Account password
        #[arg(short, long, env = "WORESK_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Sign out and clear the stored session
    Logout,

    /// Show the signed-in account
    Whoami,

    /// Show summary counters
    Dashboard,

    /// Manage user roles
    Users {
        /// Users subcommand
        #[command(subcommand)]
        action: UserCommands,
    },

    /// Manage payment processors
    Processors {
        /// Processors subcommand
        #[command(subcommand)]
        action: ProcessorCommands,
    },

    /// Manage super-admin accounts
    SuperAdmins {
        /// Super-admins subcommand
        #[command(subcommand)]
        action: SuperAdminCommands,
    },

    /// Review the activity log
    Alerts {
        /// Alerts subcommand
        #[command(subcommand)]
        action: AlertCommands,
    },

    /// Watch the unseen-activity badge until Ctrl+C
    Notifications {
        /// Mark all activity as seen and exit
        #[arg(long)]
        ack: bool,
    },

    /// Add an IP address to the whitelist
    WhitelistIp {
        /// Address to allow
        #[arg(long)]
        ip: String,

        /// Free-form note
        #[arg(short, long, default_value = "")]
        description: String,

        /// Admin password confirming the change
        #[arg(short, long, env = "WORESK_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Create the first super-admin without signing in
    BootstrapAdmin {
        /// Login name (at least 3 characters)
        #[arg(short, long)]
        username: String,

        /// Password (at least 8 characters)
        #[arg(short, long, env = "WORESK_PASSWORD", hide_env_values = true)]
        password: String,

        /// Address the admin signs in from
        #[arg(long, default_value = "")]
        ip: String,
    },

    /// Inspect configuration
    Config {
        /// Show resolved configuration
        #[arg(short, long)]
        show: bool,
    },
}

/// User role commands
#[derive(Subcommand)]
enum UserCommands {
    /// List users
    List,

    /// Create a user
    Add {
        /// Login name
        #[arg(short, long)]
        username: String,

        /// Password
        #[arg(short, long)]
        password: String,

        /// Address the user signs in from
        #[arg(long, default_value = "")]
        ip: String,

        /// Role (admin, analyst, accountant, team-lead)
        #[arg(short, long, default_value = "admin")]
        role: RoleName,
    },

    /// Update a user; omitted fields keep their value
    Edit {
        /// User id
        id: i64,

        /// New login name
        #[arg(short, long)]
        username: Option<String>,

        /// New password
        #[arg(short, long)]
        password: Option<String>,

        /// New address
        #[arg(long)]
        ip: Option<String>,

        /// New role
        #[arg(short, long)]
        role: Option<RoleName>,
    },

    /// Delete a user
    Delete {
        /// User id
        id: i64,
    },

    /// Keep the list on screen, refreshing on the polling interval
    Watch,
}

/// Processor commands
#[derive(Subcommand)]
enum ProcessorCommands {
    /// List processors
    List,

    /// Register a processor
    Add {
        /// Display name
        #[arg(short, long)]
        name: String,

        /// Gateway (stripe, nmi, adyen)
        #[arg(short, long)]
        kind: ProcessorKind,

        /// Stripe secret key
        #[arg(long, env = "WORESK_STRIPE_SECRET_KEY", hide_env_values = true)]
        secret_key: Option<String>,

        /// NMI API key
        #[arg(long, env = "WORESK_NMI_API_KEY", hide_env_values = true)]
        api_key: Option<String>,

        /// NMI merchant id
        #[arg(long)]
        merchant_id: Option<String>,
    },

    /// Flip a processor between ACTIVE and ON_HOLD
    Toggle {
        /// Processor id
        id: String,
    },

    /// Keep the list on screen with live push updates
    Watch,
}

/// Super-admin commands
#[derive(Subcommand)]
enum SuperAdminCommands {
    /// List super-admins
    List,

    /// Create a super-admin
    Add {
        /// Login name
        #[arg(short, long)]
        username: String,

        /// Password
        #[arg(short, long)]
        password: String,

        /// Address the admin signs in from
        #[arg(long, default_value = "")]
        ip: String,
    },

    /// Update a super-admin; omitted fields keep their value
    Edit {
        /// Super-admin id
        id: i64,

        /// New login name
        #[arg(short, long)]
        username: Option<String>,

        /// New password
        #[arg(short, long)]
        password: Option<String>,

        /// New address
        #[arg(long)]
        ip: Option<String>,
    },

    /// Delete a super-admin
    Delete {
        /// Super-admin id
        id: i64,
    },
}

/// Activity log commands
#[derive(Subcommand)]
enum AlertCommands {
    /// Show the log and mark it as seen
    List,

    /// Delete one entry
    Delete {
        /// Entry id
        id: i64,
    },

    /// Delete every entry
    Clear,
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env file if it exists (for development convenience)
    if let Err(e) = dotenvy::dotenv() {
        debug!("No .env file loaded: {e}");
    }

    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            if e.is_unauthorized() {
                eprintln!("hint: run `woresk login` to start a new session");
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load_from(cli.config.as_deref())?;
    init_logging(&cli, &config)?;

    if let Commands::Config { show } = cli.command {
        return show_config(&config, show);
    }

    let state = ConsoleState::new(config)?;

    match cli.command {
        Commands::Login { username, password } => login(&state, &username, &password).await,
        Commands::Logout => state.auth().logout().await,
        Commands::Whoami => {
            whoami(&state).await;
            Ok(())
        }
        Commands::Dashboard => dashboard(&state).await,
        Commands::Users { action } => handle_users(&state, action).await,
        Commands::Processors { action } => handle_processors(&state, action).await,
        Commands::SuperAdmins { action } => handle_super_admins(&state, action).await,
        Commands::Alerts { action } => handle_alerts(&state, action).await,
        Commands::Notifications { ack } => notifications(&state, ack).await,
        Commands::WhitelistIp {
            ip,
            description,
            password,
        } => {
            state
                .auth()
                .whitelist_ip(&IpWhitelistRequest {
                    ip_address: ip,
                    description,
                    password,
                })
                .await?;
            println!("IP address whitelisted");
            Ok(())
        }
        Commands::BootstrapAdmin {
            username,
            password,
            ip,
        } => {
            state
                .auth()
                .bootstrap_super_admin(&SuperAdminForm {
                    username,
                    password,
                    ip_address: ip,
                })
                .await?;
            println!("Super-admin created");
            Ok(())
        }
        Commands::Config { .. } => Ok(()),
    }
}

/// Initialize logging from the CLI, falling back to the config file
fn init_logging(cli: &Cli, config: &Config) -> Result<()> {
    let level = cli.log_level.as_deref().unwrap_or(&config.logging.level);
    let format = if cli.json {
        "json"
    } else {
        cli.log_format.as_deref().unwrap_or(&config.logging.format)
    };
    woresk_core::init_logging(level, format)?;

    debug!(version = env!("CARGO_PKG_VERSION"), log_level = level, "woresk console starting");
    Ok(())
}

fn show_config(config: &Config, show: bool) -> Result<()> {
    if show {
        let rendered = toml::to_string_pretty(config)
            .map_err(|e| Error::Other(format!("Failed to render configuration: {e}")))?;
        println!("{rendered}");
    } else {
        println!("Configuration is valid");
    }
    Ok(())
}

async fn login(state: &ConsoleState, username: &str, password: &str) -> Result<()> {
    let response = state.auth().login(username, password).await?;
    println!("{}", state.top_bar().await);
    println!("Signed in as {} ({})", response.username, response.role);
    Ok(())
}

async fn whoami(state: &ConsoleState) {
    if state.session.is_authenticated() {
        println!("{}", state.top_bar().await);
        println!(
            "role: {}",
            state.session.role().unwrap_or_else(|| "unknown".to_string())
        );
    } else {
        println!("Not signed in");
    }
}

async fn dashboard(state: &ConsoleState) -> Result<()> {
    state.require(Route::Dashboard)?;
    let (stats, top_bar) = tokio::join!(DashboardStats::load(&state.api), state.top_bar());
    println!("{top_bar}");
    println!("{stats}");
    Ok(())
}

async fn handle_users(state: &ConsoleState, action: UserCommands) -> Result<()> {
    state.require(Route::ManageUsers)?;
    let mut panel = UsersPanel::new();

    match action {
        UserCommands::List => {
            panel.refresh(&state.api).await?;
            print!("{}", render::users(panel.rows()));
        }
        UserCommands::Add {
            username,
            password,
            ip,
            role,
        } => {
            let form = UserRoleForm {
                username,
                password,
                ip_address: ip,
                role_name: role,
            };
            panel.save(&state.api, None, &form).await?;
            print!("{}", render::users(panel.rows()));
        }
        UserCommands::Edit {
            id,
            username,
            password,
            ip,
            role,
        } => {
            panel.refresh(&state.api).await?;
            let existing = panel.find(&id).ok_or_else(|| not_found::<UserRole>(id))?;
            let mut form = users::edit_form(existing);
            if let Some(username) = username {
                form.username = username;
            }
            if let Some(password) = password {
                form.password = password;
            }
            if let Some(ip) = ip {
                form.ip_address = ip;
            }
            if let Some(role) = role {
                form.role_name = role;
            }
            panel.save(&state.api, Some(&id), &form).await?;
            print!("{}", render::users(panel.rows()));
        }
        UserCommands::Delete { id } => {
            panel.delete(&state.api, &id).await?;
            println!("Deleted user {id}");
        }
        UserCommands::Watch => watch_panel::<UserRole>(state, render::users, None).await?,
    }
    Ok(())
}

async fn handle_processors(state: &ConsoleState, action: ProcessorCommands) -> Result<()> {
    state.require(Route::Processors)?;
    let mut panel = ProcessorsPanel::new();

    match action {
        ProcessorCommands::List => {
            panel.refresh(&state.api).await?;
            print!("{}", render::processors(panel.rows()));
        }
        ProcessorCommands::Add {
            name,
            kind,
            secret_key,
            api_key,
            merchant_id,
        } => {
            let credentials = match kind {
                ProcessorKind::Stripe => ProcessorCredentials::Stripe {
                    secret_key: secret_key.unwrap_or_default(),
                },
                ProcessorKind::Nmi => ProcessorCredentials::Nmi {
                    api_key: api_key.unwrap_or_default(),
                    merchant_id: merchant_id.unwrap_or_default(),
                },
                ProcessorKind::Adyen => ProcessorCredentials::None {},
            };
            let draft = ProcessorDraft {
                name,
                kind,
                credentials,
            };
            panel.add(&state.api, &draft).await?;
            print!("{}", render::processors(panel.rows()));
        }
        ProcessorCommands::Toggle { id } => {
            panel.refresh(&state.api).await?;
            let status = panel.toggle(&state.api, &id).await?;
            println!("Processor {id} is now {status}");
        }
        ProcessorCommands::Watch => {
            watch_panel::<Processor>(
                state,
                render::processors,
                Some(ProcessorsPanel::apply_update),
            )
            .await?;
        }
    }
    Ok(())
}

async fn handle_super_admins(state: &ConsoleState, action: SuperAdminCommands) -> Result<()> {
    state.require(Route::SuperAdmins)?;
    let mut panel = SuperAdminsPanel::new();

    match action {
        SuperAdminCommands::List => {
            panel.refresh(&state.api).await?;
            print!("{}", render::super_admins(panel.rows()));
        }
        SuperAdminCommands::Add {
            username,
            password,
            ip,
        } => {
            let form = SuperAdminForm {
                username,
                password,
                ip_address: ip,
            };
            panel.save(&state.api, None, &form).await?;
            print!("{}", render::super_admins(panel.rows()));
        }
        SuperAdminCommands::Edit {
            id,
            username,
            password,
            ip,
        } => {
            panel.refresh(&state.api).await?;
            let existing = panel
                .find(&id)
                .ok_or_else(|| not_found::<SuperAdmin>(id))?;
            let mut form = super_admins::edit_form(existing);
            if let Some(username) = username {
                form.username = username;
            }
            if let Some(password) = password {
                form.password = password;
            }
            if let Some(ip) = ip {
                form.ip_address = ip;
            }
            panel.save(&state.api, Some(&id), &form).await?;
            print!("{}", render::super_admins(panel.rows()));
        }
        SuperAdminCommands::Delete { id } => {
            panel.delete(&state.api, &id).await?;
            println!("Deleted super-admin {id}");
        }
    }
    Ok(())
}

async fn handle_alerts(state: &ConsoleState, action: AlertCommands) -> Result<()> {
    state.require(Route::Alerts)?;
    let mut panel = AlertsPanel::new();

    match action {
        AlertCommands::List => {
            panel.open(&state.api, &state.session).await?;
            if panel.is_empty() {
                println!("No activity");
            } else {
                print!("{}", render::alerts(panel.rows()));
            }
        }
        AlertCommands::Delete { id } => {
            panel.delete(&state.api, &id).await?;
            println!("Deleted activity log entry {id}");
        }
        AlertCommands::Clear => {
            panel.delete_all(&state.api, &state.session).await?;
            println!("Activity log cleared");
        }
    }
    Ok(())
}

async fn notifications(state: &ConsoleState, ack: bool) -> Result<()> {
    state.require(Route::Dashboard)?;

    if ack {
        let seen = state.acknowledge_activity().await;
        println!("{}", TopBar::new(&state.session, 0));
        println!("Activity marked as seen up to {seen}");
        return Ok(());
    }

    let poller = state.poller();
    let mut badge = poller.subscribe();
    poller.start();
    info!("Watching activity. Press Ctrl+C to stop.");

    loop {
        tokio::select! {
            _ = signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down");
                break;
            }
            changed = badge.changed() => {
                if changed.is_err() {
                    break;
                }
                let unseen = *badge.borrow_and_update();
                println!("{}", TopBar::new(&state.session, unseen));
            }
        }
    }

    poller.stop().await;
    Ok(())
}

/// Merges a processor push update into a panel; returns whether a row changed
type LiveMerge<R> = fn(&mut Panel<R>, &ProcessorUpdate) -> bool;

/// Refresh a panel on the polling schedule until Ctrl+C
///
/// With `live` set, push updates are merged between refreshes.
async fn watch_panel<R: Resource>(
    state: &ConsoleState,
    render: fn(&[R]) -> String,
    live: Option<LiveMerge<R>>,
) -> Result<()> {
    let push = match live {
        Some(merge) => match state.push_channel()? {
            Some(channel) => Some((channel, merge)),
            None => {
                warn!("Push channel disabled; updates arrive on refresh only");
                None
            }
        },
        None => None,
    };

    let panel = Arc::new(Mutex::new(Panel::<R>::new()));
    let (shutdown_tx, _) = broadcast::channel(1);
    let mut handles = Vec::new();

    let refresher = {
        let panel = Arc::clone(&panel);
        let api = state.api.clone();
        spawn_periodic(
            "panel-refresh",
            state.schedule(),
            shutdown_tx.subscribe(),
            move || {
                let panel = Arc::clone(&panel);
                let api = api.clone();
                async move {
                    let result = api.list::<R>().await;
                    let mut panel = panel.lock();
                    if panel.apply_fetch(result).is_ok() {
                        print!("{}", render(panel.rows()));
                    }
                }
            },
        )
    };
    handles.push(refresher);

    if let Some((channel, merge)) = push {
        let (updates_tx, mut updates_rx) = mpsc::channel(64);
        let listener_shutdown = shutdown_tx.subscribe();
        handles.push(tokio::spawn(async move {
            channel.listen(updates_tx, listener_shutdown).await;
        }));

        let panel = Arc::clone(&panel);
        handles.push(tokio::spawn(async move {
            while let Some(update) = updates_rx.recv().await {
                let mut panel = panel.lock();
                if merge(&mut panel, &update) {
                    print!("{}", render(panel.rows()));
                }
            }
        }));
    }

    info!("Watching {}. Press Ctrl+C to stop.", R::COLLECTION);
    if let Err(e) = signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for Ctrl+C");
    }

    let _ = shutdown_tx.send(());
    for handle in handles {
        if let Err(e) = handle.await {
            debug!(error = %e, "Watch task ended abnormally");
        }
    }
    Ok(())
}

fn not_found<R: Resource>(id: impl std::fmt::Display) -> Error {
    Error::NotFound {
        resource: format!("{} {id}", R::LABEL),
    }
}
