use std::fs;
use std::sync::Arc;

use anyhow::bail;
use chrono::Utc;
use clap::{Parser, Subcommand};
use rand::Rng;
use tracing::info;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use taproom::auth::{TokenGenerator, hash_password};
use taproom::config::ServerConfig;
use taproom::db::{Db, SqliteDb};
use taproom::server::{AppState, create_router};
use taproom::types::{Role, SessionToken, User};

const GENERATED_PASSWORD_LEN: usize = 20;

fn create_session_token(
    generator: &TokenGenerator,
    user_id: String,
) -> anyhow::Result<(SessionToken, String)> {
    let (raw_token, lookup, hash) = generator.generate()?;
    let token = SessionToken {
        id: Uuid::new_v4().to_string(),
        token_hash: hash,
        token_lookup: lookup,
        user_id,
        created_at: Utc::now(),
        expires_at: None,
        last_used_at: None,
    };
    Ok((token, raw_token))
}

fn generate_password() -> String {
    rand::thread_rng()
        .sample_iter(&rand::distributions::Alphanumeric)
        .take(GENERATED_PASSWORD_LEN)
        .map(char::from)
        .collect()
}

#[cfg(unix)]
fn set_restrictive_permissions(path: &std::path::Path) {
    use std::os::unix::fs::PermissionsExt;
    if let Err(e) = fs::set_permissions(path, fs::Permissions::from_mode(0o600)) {
        tracing::warn!("Failed to set permissions on {}: {e}", path.display());
    }
}

#[derive(Parser)]
#[command(name = "taproom")]
#[command(about = "A beer and brewery review server", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Administrative commands
    Admin {
        #[command(subcommand)]
        command: AdminCommands,
    },

    /// Start the server
    Serve {
        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port to bind to
        #[arg(long, short, default_value = "8080")]
        port: u16,

        /// Data directory for database and uploads
        #[arg(long, default_value = "./data")]
        data_dir: String,
    },
}

#[derive(Subcommand)]
enum AdminCommands {
    /// Initialize the server (create database and admin account)
    Init {
        /// Data directory for database and uploads
        #[arg(long, default_value = "./data")]
        data_dir: String,

        /// Skip interactive prompts
        #[arg(long)]
        non_interactive: bool,
    },
}

fn run_init(data_dir: String, non_interactive: bool) -> anyhow::Result<()> {
    let data_path: std::path::PathBuf = data_dir.into();
    fs::create_dir_all(&data_path)?;

    let db_path = data_path.join("taproom.db");
    let db = SqliteDb::new(&db_path)?;
    db.initialize()?;

    let token_file = data_path.join(".admin_token");

    if db.has_admin_user()? {
        bail!(
            "Server already initialized. Admin token exists at: {}",
            token_file.display()
        );
    }

    let (email, display_name) = if non_interactive {
        ("admin@localhost".to_string(), "administrator".to_string())
    } else {
        prompt_admin_account()?
    };

    let password = generate_password();
    let now = Utc::now();
    let user = User {
        id: Uuid::new_v4().to_string(),
        email: email.clone(),
        password_hash: hash_password(&password)?,
        display_name,
        role: Role::Admin,
        profile_img_url: None,
        present_location: None,
        introduction: None,
        date_created: now,
        date_updated: now,
    };
    db.create_user(&user)?;

    let generator = TokenGenerator::new();
    let (token, raw_token) = create_session_token(&generator, user.id.clone())?;
    db.create_session_token(&token)?;
    fs::write(&token_file, &raw_token)?;

    #[cfg(unix)]
    set_restrictive_permissions(&token_file);

    println!();
    println!("========================================");
    println!("Admin account created:");
    println!();
    println!("  email:    {email}");
    println!("  password: {password}");
    println!();
    println!("Session token (save this, it won't be shown again):");
    println!();
    println!("  {raw_token}");
    println!();
    println!("Token also written to: {}", token_file.display());
    println!("========================================");
    println!();

    Ok(())
}

fn prompt_admin_account() -> anyhow::Result<(String, String)> {
    let email = inquire::Text::new("Admin email:")
        .with_validator(|input: &str| {
            if input.contains('@') {
                Ok(inquire::validator::Validation::Valid)
            } else {
                Err("Enter a valid email address".into())
            }
        })
        .prompt()?;

    let display_name = inquire::Text::new("Display name:")
        .with_validator(|input: &str| {
            if input.trim().len() < 5 {
                Err("Display name must be at least 5 characters long".into())
            } else {
                Ok(inquire::validator::Validation::Valid)
            }
        })
        .prompt()?;

    Ok((email, display_name.trim().to_string()))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("taproom=info".parse()?))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Admin { command } => match command {
            AdminCommands::Init {
                data_dir,
                non_interactive,
            } => {
                run_init(data_dir, non_interactive)?;
            }
        },
        Commands::Serve {
            host,
            port,
            data_dir,
        } => {
            let config = ServerConfig {
                host,
                port,
                data_dir: data_dir.into(),
            };

            let db = SqliteDb::new(config.db_path())?;
            if !db.has_admin_user()? {
                bail!(
                    "Server not initialized. Run 'taproom admin init' first to create the database and admin account."
                );
            }

            let state = Arc::new(AppState::new(Arc::new(db), &config.data_dir));

            let app = create_router(state);
            let addr = config.socket_addr()?;

            info!("Starting server on {}", addr);

            let listener = tokio::net::TcpListener::bind(addr).await?;
            axum::serve(listener, app).await?;
        }
    }

    Ok(())
}
