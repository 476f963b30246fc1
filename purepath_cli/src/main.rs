use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use purepath_core::*;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "purepath")]
#[command(about = "Recovery streak tracker", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Read configuration from this file instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an account and sign in
    Signup {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        /// Display name
        #[arg(long)]
        name: String,
        #[arg(long, requires = "longitude", allow_hyphen_values = true)]
        latitude: Option<f64>,
        #[arg(long, requires = "latitude", allow_hyphen_values = true)]
        longitude: Option<f64>,
    },

    /// Sign in to an existing account
    Signin {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },

    /// Sign out
    Signout,

    /// Show the current profile and streak (default)
    Status,

    /// Check in for today
    Checkin {
        /// Print the result as JSON
        #[arg(long)]
        json: bool,

        /// Check in as of this time (for testing)
        #[arg(long, hide = true)]
        at: Option<DateTime<Utc>>,
    },

    /// Record a relapse and reset the streak
    Relapse {
        #[arg(long)]
        notes: Option<String>,

        /// Record as of this time (for testing)
        #[arg(long, hide = true)]
        at: Option<DateTime<Utc>>,
    },

    /// List recorded relapses, newest first
    History,

    /// Edit profile fields
    Profile {
        /// New display name
        #[arg(long)]
        name: Option<String>,
        #[arg(long, requires = "longitude", allow_hyphen_values = true)]
        latitude: Option<f64>,
        #[arg(long, requires = "latitude", allow_hyphen_values = true)]
        longitude: Option<f64>,
        /// Remove stored coordinates
        #[arg(long, conflicts_with_all = ["latitude", "longitude"])]
        clear_location: bool,
    },
}

/// Where the CLI keeps its state under the data directory
struct Paths {
    store: PathBuf,
    session: PathBuf,
}

impl Paths {
    fn new(data_dir: &Path) -> Self {
        Self {
            store: data_dir.join("store"),
            session: data_dir.join("session.json"),
        }
    }
}

#[tokio::main]
async fn main() {
    if let Err(e) = purepath_core::logging::init() {
        eprintln!("warning: {}", e);
    }

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("✗ {}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = match cli.config {
        Some(ref path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    let data_dir = cli.data_dir.unwrap_or_else(|| config.data.data_dir.clone());
    let paths = Paths::new(&data_dir);
    tracing::debug!("Using data directory {:?}", data_dir);
    let store = LocalStore::new(&paths.store);

    match cli.command {
        Some(Commands::Signup {
            email,
            password,
            name,
            latitude,
            longitude,
        }) => {
            let coordinates = coordinates_from(latitude, longitude);
            cmd_signup(&store, &paths, &email, &password, name, coordinates).await
        }
        Some(Commands::Signin { email, password }) => {
            cmd_signin(&store, &paths, &email, &password).await
        }
        Some(Commands::Signout) => cmd_signout(&store, &paths).await,
        Some(Commands::Checkin { json, at }) => {
            cmd_checkin(&store, &paths, &config, json, at.unwrap_or_else(Utc::now)).await
        }
        Some(Commands::Relapse { notes, at }) => {
            cmd_relapse(&store, &paths, notes.as_deref(), at.unwrap_or_else(Utc::now)).await
        }
        Some(Commands::History) => cmd_history(&store, &paths).await,
        Some(Commands::Profile {
            name,
            latitude,
            longitude,
            clear_location,
        }) => {
            let location = if clear_location {
                Some(None)
            } else {
                coordinates_from(latitude, longitude).map(Some)
            };
            cmd_profile(&store, &paths, name, location).await
        }
        Some(Commands::Status) | None => cmd_status(&store, &paths).await,
    }
}

fn coordinates_from(latitude: Option<f64>, longitude: Option<f64>) -> Option<Coordinates> {
    match (latitude, longitude) {
        (Some(latitude), Some(longitude)) => Some(Coordinates {
            latitude,
            longitude,
        }),
        _ => None,
    }
}

/// Restore the persisted session or fail with `NotSignedIn`
fn require_session(paths: &Paths) -> Result<Session> {
    Session::restore(&paths.session)?.ok_or(Error::NotSignedIn)
}

async fn cmd_signup(
    store: &LocalStore,
    paths: &Paths,
    email: &str,
    password: &str,
    display_name: String,
    coordinates: Option<Coordinates>,
) -> Result<()> {
    let session = Session::sign_up(
        store,
        store,
        email,
        password,
        NewProfile {
            display_name,
            coordinates,
        },
    )
    .await?;
    session.save(&paths.session)?;

    println!("✓ Account created for {}", session.email());
    if let Some(profile) = session.profile() {
        println!("  Welcome, {}! Role: {}", profile.display_name, profile.role);
    }
    Ok(())
}

async fn cmd_signin(store: &LocalStore, paths: &Paths, email: &str, password: &str) -> Result<()> {
    let session = Session::sign_in(store, store, email, password).await?;
    session.save(&paths.session)?;

    println!("✓ Signed in as {}", session.email());
    if let Some(profile) = session.profile() {
        println!("  Current streak: {} day(s)", profile.streak_days);
    }
    Ok(())
}

async fn cmd_signout(store: &LocalStore, paths: &Paths) -> Result<()> {
    match Session::restore(&paths.session)? {
        Some(session) => {
            let email = session.email().to_string();
            session.sign_out(store).await?;
            Session::clear(&paths.session)?;
            println!("✓ Signed out {}", email);
        }
        None => println!("Not signed in - nothing to do."),
    }
    Ok(())
}

async fn cmd_status(store: &LocalStore, paths: &Paths) -> Result<()> {
    let Some(mut session) = Session::restore(&paths.session)? else {
        println!("Not signed in. Use `purepath signin` or `purepath signup`.");
        return Ok(());
    };

    let profile = session.refresh(store).await?.clone();
    display_profile(session.email(), &profile);
    Ok(())
}

async fn cmd_checkin(
    store: &LocalStore,
    paths: &Paths,
    config: &Config,
    json: bool,
    now: DateTime<Utc>,
) -> Result<()> {
    let mut session = Session::restore(&paths.session)?;
    let result =
        checkin::check_in_signed_in(session.as_mut(), store, now, &config.streak).await;

    if json {
        let report = CheckInReport::from_result(&result);
        println!("{}", serde_json::to_string_pretty(&report)?);
        return result.map(|_| ());
    }

    let outcome = result?;
    let mark = if outcome.changed() { "✓" } else { "•" };
    println!("{} {}", mark, outcome.message());
    println!("  Streak: {} day(s)", outcome.streak_days());
    Ok(())
}

async fn cmd_relapse(
    store: &LocalStore,
    paths: &Paths,
    notes: Option<&str>,
    now: DateTime<Utc>,
) -> Result<()> {
    let mut session = require_session(paths)?;
    let record = record_relapse(&mut session, store, now, notes).await?;

    println!("✓ Relapse recorded. Streak reset to 0.");
    println!("  Every day is a fresh start.");
    if !record.notes.is_empty() {
        println!("  Notes: {}", record.notes);
    }
    Ok(())
}

async fn cmd_history(store: &LocalStore, paths: &Paths) -> Result<()> {
    let session = require_session(paths)?;
    let records = relapse_history(&session, store).await?;

    if records.is_empty() {
        println!("No relapses recorded.");
        return Ok(());
    }

    println!("{} relapse(s) recorded:", records.len());
    for record in &records {
        if record.notes.is_empty() {
            println!("  {}", record.timestamp.format("%Y-%m-%d %H:%M UTC"));
        } else {
            println!(
                "  {}  {}",
                record.timestamp.format("%Y-%m-%d %H:%M UTC"),
                record.notes
            );
        }
    }
    Ok(())
}

async fn cmd_profile(
    store: &LocalStore,
    paths: &Paths,
    name: Option<String>,
    location: Option<Option<Coordinates>>,
) -> Result<()> {
    if name.is_none() && location.is_none() {
        return Err(Error::Validation(
            "nothing to update; pass --name, --latitude/--longitude or --clear-location".into(),
        ));
    }

    let mut session = require_session(paths)?;
    if let Some(ref name) = name {
        profile::update_display_name(&mut session, store, name).await?;
    }
    if let Some(coordinates) = location {
        profile::update_coordinates(&mut session, store, coordinates).await?;
    }

    println!("✓ Profile updated");
    if let Some(profile) = session.profile() {
        display_profile(session.email(), profile);
    }
    Ok(())
}

fn display_profile(email: &str, profile: &UserProfile) {
    println!("\n╭─────────────────────────────────────────╮");
    println!("│  {}", profile.display_name);
    println!("╰─────────────────────────────────────────╯");
    println!();
    println!("  Account:  {} ({})", email, profile.role);
    println!("  Streak:   {} day(s)", profile.streak_days);
    match profile.last_check_in {
        Some(ts) => println!("  Last check-in: {}", ts.format("%Y-%m-%d %H:%M UTC")),
        None => println!("  Last check-in: never"),
    }
    if let Some(c) = profile.coordinates {
        println!("  Location: {:.4}, {:.4}", c.latitude, c.longitude);
    }
    println!("  Joined:   {}", profile.joined_at.format("%Y-%m-%d"));
    println!();
}
