mod app;
mod auth;
mod config;
mod db;
mod error;
mod firestore;
mod models;
mod notify;
mod session;
mod sort;
mod store;
mod sync;
mod tui;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::EnvFilter;

use app::{probe_backend, Tracker};
use auth::{Authenticator, FirebaseAuth, LocalAccounts, User};
use config::Config;
use db::Database;
use firestore::FirestoreClient;
use models::{format_date, JobRecord, RecordEdit, RecordForm};
use notify::{ConsoleNotifier, Notifier, Toasts};
use session::{Backend, Session};
use sort::SortMethod;
use store::{LocalStore, RecordStore, RemoteStore};
use sync::DocumentClient;

#[derive(Parser)]
#[command(name = "jobtrack")]
#[command(about = "Track job applications locally or in the cloud")]
struct Cli {
    /// Config file (defaults to the platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the local database
    Init,

    /// Add a job application
    Add {
        #[command(flatten)]
        form: RecordForm,
    },

    /// List applications
    List {
        /// likelihood, date or status (defaults to the configured order)
        #[arg(short, long)]
        sort: Option<SortMethod>,
    },

    /// Show one application
    Show {
        /// Application ID
        id: i64,
    },

    /// Change fields of an application
    Edit {
        /// Application ID
        id: i64,

        #[command(flatten)]
        edit: RecordEdit,
    },

    /// Delete an application
    Delete {
        /// Application ID
        id: i64,
    },

    /// Delete every application for the current user
    Clear {
        /// Confirm the deletion
        #[arg(long)]
        yes: bool,
    },

    /// Browse applications interactively
    Browse,

    /// Manage the signed-in account
    Account {
        #[command(subcommand)]
        command: AccountCommands,
    },

    /// Show storage backend and session details
    Status,
}

#[derive(Subcommand)]
enum AccountCommands {
    /// Create an account
    Register {
        #[arg(long)]
        email: String,

        #[arg(long)]
        password: String,

        /// Repeat the password
        #[arg(long)]
        confirm: String,

        /// Display name
        #[arg(long, default_value = "")]
        name: String,
    },

    /// Sign in
    Login {
        #[arg(long)]
        email: String,

        #[arg(long)]
        password: String,
    },

    /// Sign out
    Logout,

    /// Show the signed-in user
    Whoami,

    /// Change the display name
    Rename {
        name: String,
    },
}

/// The browse view owns the terminal, so its logs go to a file next to the
/// database instead of stderr.
fn browse_log_path(db_path: &Path) -> PathBuf {
    db_path.with_extension("log")
}

fn init_tracing(level: &str, log_file: Option<&Path>) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let file = log_file.and_then(|path| {
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .ok()
    });
    let (writer, ansi) = match (log_file, file) {
        (_, Some(file)) => (BoxMakeWriter::new(Mutex::new(file)), false),
        // Unwritable log file: stay quiet rather than draw over the screen.
        (Some(_), None) => (BoxMakeWriter::new(std::io::sink), false),
        (None, None) => (BoxMakeWriter::new(std::io::stderr), true),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(ansi)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = config::load_or_default(cli.config.as_deref()).context("Failed to load configuration")?;
    let db = Database::open(config.storage.path.as_deref())?;

    let log_file = match cli.command {
        Commands::Browse => Some(browse_log_path(db.path())),
        _ => None,
    };
    init_tracing(&config.log.level, log_file.as_deref());

    if let Commands::Init = cli.command {
        db.init()?;
        println!("Database initialized at {}", db.path().display());
        return Ok(());
    }

    db.ensure_initialized()?;
    if let Some(bytes) = config.storage.quota_bytes {
        db.set_quota(bytes).context("Failed to apply storage quota")?;
    }

    match cli.command {
        Commands::Account { command } => run_account(&db, &config, command),
        command => run_records(&db, &config, command),
    }
}

/// The saved user, with cloud tokens refreshed when they have expired.
fn current_user(db: &Database, config: &Config) -> Option<User> {
    let user = auth::load_user(db)?;
    let (Some(remote), Some(tokens)) = (config.remote.as_ref(), user.tokens.as_ref()) else {
        return Some(user);
    };
    let now = chrono::Utc::now().timestamp();
    if !tokens.is_expired(now) {
        return Some(user);
    }
    match FirebaseAuth::new(remote).refresh(&user, now) {
        Ok(refreshed) => {
            if let Err(e) = auth::save_user(db, &refreshed) {
                tracing::warn!(error = %e, "failed to save refreshed session");
            }
            Some(refreshed)
        }
        Err(e) => {
            tracing::warn!(error = %e, "could not refresh session; sign in again");
            Some(user)
        }
    }
}

fn run_records(db: &Database, config: &Config, command: Commands) -> Result<()> {
    let user = current_user(db, config);
    let id_token = user
        .as_ref()
        .and_then(|u| u.tokens.as_ref())
        .map(|t| t.id_token.clone());
    let client = config
        .remote
        .as_ref()
        .map(|remote| FirestoreClient::new(remote, id_token));
    let backend = probe_backend(client.as_ref().map(|c| c as &dyn DocumentClient));
    let session = Session::new(user, backend, config.ui.default_sort);

    let store: Box<dyn RecordStore + '_> = match (backend, client.as_ref()) {
        (Backend::Remote, Some(client)) => {
            Box::new(RemoteStore::new(client, session.uid().map(str::to_string)))
        }
        _ => Box::new(
            LocalStore::new(db, session.records_key())
                .with_size_warning(config.storage.size_warning_chars),
        ),
    };

    let console = ConsoleNotifier;
    let toasts = Toasts::default();
    let notifier: &dyn Notifier = match command {
        Commands::Browse => &toasts,
        _ => &console,
    };
    let mut tracker = Tracker::new(store, notifier, session);

    match command {
        Commands::Add { form } => {
            let now_ms = chrono::Utc::now().timestamp_millis();
            if let Some(record) = tracker.add(form, now_ms) {
                println!("Added application #{}", record.id);
                print_records(&tracker.load());
            }
        }

        Commands::List { sort } => {
            let records = match sort {
                Some(method) => tracker.set_sort(method),
                None => tracker.load(),
            };
            print_records(&records);
        }

        Commands::Show { id } => match tracker.find(id) {
            Some(record) => print_record(&record),
            None => println!("Application #{} not found.", id),
        },

        Commands::Edit { id, edit } => {
            if edit.is_empty() {
                bail!("Nothing to change. Pass at least one field, e.g. --status Interview");
            }
            if tracker.begin_edit(id).is_some() && tracker.save_edit(&edit).is_some() {
                print_records(&tracker.load());
            }
        }

        Commands::Delete { id } => {
            if tracker.delete(id) {
                print_records(&tracker.load());
            }
        }

        Commands::Clear { yes } => {
            if !yes {
                println!("This deletes every application. Run again with --yes to confirm.");
            } else if tracker.clear_all() {
                print_records(&tracker.load());
            }
        }

        Commands::Browse => tui::run_browse(&mut tracker, &toasts)?,

        Commands::Status => {
            let session = tracker.session();
            println!("Backend:  {}", session.backend);
            println!("Store:    {}", tracker.store_label());
            match &session.user {
                Some(user) => println!("User:     {} <{}>", user.display_name(), user.email),
                None => println!("User:     (not signed in)"),
            }
            if session.backend == Backend::Remote && session.uid().is_none() {
                println!("          Sign in to save to the cloud.");
            }
            println!("Sort:     {}", session.sort);
            println!("Database: {}", db.path().display());
            if let Some(path) = config::default_path() {
                println!("Config:   {}", path.display());
            }
            let keys = db.keys()?;
            println!("Keys:     {}", if keys.is_empty() { "-".to_string() } else { keys.join(", ") });
        }

        Commands::Init | Commands::Account { .. } => unreachable!("handled in main"),
    }

    Ok(())
}

fn authenticator<'a>(db: &'a Database, config: &Config) -> Box<dyn Authenticator + 'a> {
    match &config.remote {
        Some(remote) => Box::new(FirebaseAuth::new(remote)),
        None => Box::new(LocalAccounts::new(db)),
    }
}

fn run_account(db: &Database, config: &Config, command: AccountCommands) -> Result<()> {
    let auth = authenticator(db, config);

    match command {
        AccountCommands::Register {
            email,
            password,
            confirm,
            name,
        } => {
            if password != confirm {
                bail!("Passwords do not match.");
            }
            match auth.sign_up(&email, &password, &name).context("Registration failed")? {
                Some(user) => {
                    auth::save_user(db, &user)?;
                    println!("Registered and signed in as {}.", user.display_name());
                }
                None => println!("Registration successful! Please log in."),
            }
        }

        AccountCommands::Login { email, password } => {
            let user = auth.sign_in(&email, &password).context("Login failed")?;
            auth::save_user(db, &user)?;
            tracing::info!(email = %user.email, cloud = user.uid.is_some(), "signed in");
            println!("Welcome, {}!", user.display_name());
        }

        AccountCommands::Logout => match auth::load_user(db) {
            Some(user) => {
                auth.sign_out(&user)?;
                auth::clear_user(db)?;
                println!("Signed out {}.", user.email);
            }
            None => println!("Not signed in."),
        },

        AccountCommands::Whoami => match auth::load_user(db) {
            Some(user) => {
                println!("Name:  {}", user.display_name());
                println!("Email: {}", user.email);
                println!("Mode:  {}", if user.uid.is_some() { "cloud" } else { "local" });
            }
            None => println!("Not signed in."),
        },

        AccountCommands::Rename { name } => {
            if name.trim().is_empty() {
                bail!("Display name cannot be empty.");
            }
            let user = current_user(db, config).ok_or_else(|| anyhow!("Not signed in."))?;
            let renamed = auth
                .update_display_name(&user, &name)
                .context("Failed to update display name")?;
            auth::save_user(db, &renamed)?;
            println!("Display name set to {}.", renamed.name);
        }
    }

    Ok(())
}

fn print_records(records: &[JobRecord]) {
    if records.is_empty() {
        println!("No job applications yet.");
        return;
    }
    println!(
        "{:<14} {:<11} {:<6} {:<22} {:<22} {:<18}",
        "ID", "STATUS", "RATING", "COMPANY", "POSITION", "APPLIED"
    );
    println!("{}", "-".repeat(96));
    for record in records {
        println!(
            "{:<14} {:<11} {:<6} {:<22} {:<22} {:<18}",
            record.id,
            truncate(record.status.as_str(), 11),
            record.likelihood_rating,
            truncate(&record.job_name, 20),
            truncate(&record.position, 20),
            format_date(&record.date_applied)
        );
    }
}

fn print_record(record: &JobRecord) {
    println!("Application #{}", record.id);
    println!("Company: {}", record.job_name);
    println!("Position: {}", record.position);
    println!("Status: {}", record.status);
    println!("Likelihood: {}/{}", record.likelihood_rating, models::MAX_RATING);
    println!("Location: {}", record.location);
    println!("Pay: {}", record.pay);
    println!("Date Applied: {}", format_date(&record.date_applied));
    println!("Source: {}", record.source);
    let contacts = record.contacts();
    if !contacts.is_empty() {
        println!("Contacts: {}", contacts.join(", "));
    }
    if let Some(phone) = &record.contact_phone {
        println!("Phone: {}", phone);
    }
    if !record.job_url.is_empty() {
        println!("URL: {}", record.job_url);
    }
    println!("Follow Up: {}", format_date(&record.follow_up_date));
    if let Some(date) = record.follow_up_on() {
        if !record.is_rejected() && date <= chrono::Local::now().date_naive() {
            println!("  (follow-up is due)");
        }
    }
    if record.has_notes() {
        println!("\n--- Notes ---\n{}", textwrap::fill(&record.notes, 80));
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        format!("{}...", s.chars().take(max.saturating_sub(3)).collect::<String>())
    }
}
