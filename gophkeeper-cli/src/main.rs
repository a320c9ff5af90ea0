//! GophKeeper CLI
//!
//! Local-first secret manager client. Secrets are kept in plaintext in a
//! private storage directory and synchronized with the server as
//! end-to-end encrypted envelopes.

mod app;
mod config;
mod domain;
mod error;
mod storage;
mod transport;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use app::{Client, ConflictResolution, SyncReport};
use domain::{BankCardData, BinaryData, LoginPasswordData, SecretData, SecretPayload, TextData};
use gophkeeper_core::SecretType;
use storage::FileStorage;
use transport::HttpTransport;

#[derive(Parser)]
#[command(name = "gophkeeper", about = "GophKeeper secret manager client")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "client.toml")]
    config: PathBuf,

    /// Server address override
    #[arg(short, long)]
    server: Option<String>,

    /// Storage directory override
    #[arg(long)]
    storage: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Register a new account
    Register {
        #[arg(long)]
        login: String,
        /// Password (prompted if not provided)
        #[arg(long)]
        password: Option<String>,
    },

    /// Log in and store the session
    Login {
        #[arg(long)]
        login: String,
        /// Password (prompted if not provided)
        #[arg(long)]
        password: Option<String>,
    },

    /// Log out and wipe the local session
    Logout,

    /// Add a new secret
    #[command(subcommand)]
    Add(AddCommands),

    /// Show a secret
    Get {
        id: String,
        /// Fetch from the server instead of the local store
        #[arg(long)]
        remote: bool,
    },

    /// List secrets
    List {
        /// Restrict to a single secret type
        #[arg(long = "type")]
        type_filter: Option<TypeArg>,
        /// List from the server instead of the local store
        #[arg(long)]
        remote: bool,
    },

    /// Delete a secret
    Delete {
        id: String,
        /// Delete on the server immediately instead of waiting for sync
        #[arg(long)]
        remote: bool,
    },

    /// Synchronize with the server
    Sync {
        /// Upload every secret, not just the dirty ones
        #[arg(short, long)]
        force: bool,
        /// Conflict resolution strategy
        #[arg(short, long, value_enum, default_value = "server")]
        resolve: ResolveArg,
    },

    /// Print version information
    Version,
}

#[derive(Subcommand)]
enum AddCommands {
    /// Website or service credentials
    LoginPassword {
        #[arg(long)]
        name: String,
        #[arg(long)]
        login: String,
        /// Password (prompted if not provided)
        #[arg(long)]
        password: Option<String>,
        #[arg(long)]
        website: Option<String>,
        #[arg(long)]
        notes: Option<String>,
    },

    /// Free-form note
    Text {
        #[arg(long)]
        name: String,
        #[arg(long)]
        content: String,
        #[arg(long)]
        description: Option<String>,
    },

    /// Payment card
    BankCard {
        #[arg(long)]
        name: String,
        #[arg(long)]
        holder: String,
        #[arg(long)]
        number: String,
        #[arg(long)]
        expiry: String,
        #[arg(long)]
        cvv: String,
        #[arg(long)]
        bank: Option<String>,
    },

    /// Arbitrary file contents
    Binary {
        #[arg(long)]
        name: String,
        /// File to read the payload from
        #[arg(long)]
        file: PathBuf,
        #[arg(long)]
        description: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum TypeArg {
    LoginPassword,
    Text,
    Binary,
    BankCard,
}

impl From<TypeArg> for SecretType {
    fn from(value: TypeArg) -> Self {
        match value {
            TypeArg::LoginPassword => SecretType::LoginPassword,
            TypeArg::Text => SecretType::Text,
            TypeArg::Binary => SecretType::Binary,
            TypeArg::BankCard => SecretType::BankCard,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ResolveArg {
    Server,
    Local,
}

impl From<ResolveArg> for ConflictResolution {
    fn from(value: ResolveArg) -> Self {
        match value {
            ResolveArg::Server => ConflictResolution::Server,
            ResolveArg::Local => ConflictResolution::Local,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let cli = Cli::parse();

    let mut cfg = if cli.config.exists() {
        config::ClientConfig::load(&cli.config)?
    } else {
        config::ClientConfig::default()
    };
    cfg.apply_env();

    if let Some(server) = cli.server {
        cfg.server_address = server;
    }
    if let Some(storage) = cli.storage {
        cfg.storage_path = storage;
    }

    let store = FileStorage::open(&cfg.storage_path)?;
    let transport = HttpTransport::new(&cfg.server_address)?;
    let mut client = Client::new(transport, store);

    match cli.command {
        Commands::Register { login, password } => {
            let password = password_or_prompt(password, "Password: ")?;
            let user_id = client.register(&login, &password).await?;
            println!("Registered user {user_id}. Run login to start a session.");
        }

        Commands::Login { login, password } => {
            let password = password_or_prompt(password, "Password: ")?;
            client.login(&login, &password).await?;
            println!("Logged in as {login}.");
        }

        Commands::Logout => {
            client.logout().await?;
            println!("Logged out.");
        }

        Commands::Add(add) => {
            let (name, payload) = build_payload(add)?;
            let id = client.create_secret(&name, payload)?;
            println!("Created secret {id}.");
            auto_sync(&mut client, &cfg).await;
        }

        Commands::Get { id, remote } => {
            let secret = if remote {
                client.get_secret_remote(&id).await?
            } else {
                client.get_secret(&id)?
            };
            print_secret(&secret);
        }

        Commands::List {
            type_filter,
            remote,
        } => {
            let filter = type_filter.map(SecretType::from);
            let secrets = if remote {
                client.list_secrets_remote(filter).await?
            } else {
                client.list_secrets(filter)?
            };

            if secrets.is_empty() {
                println!("No secrets.");
            }
            for secret in secrets {
                let dirty = if secret.is_dirty { " *" } else { "" };
                println!(
                    "{}  [{}] {}{}",
                    secret.id,
                    secret.secret_type.as_str(),
                    secret.name,
                    dirty
                );
            }
        }

        Commands::Delete { id, remote } => {
            if remote {
                client.delete_secret_remote(&id).await?;
            } else {
                client.delete_secret(&id)?;
            }
            println!("Deleted secret {id}.");
            auto_sync(&mut client, &cfg).await;
        }

        Commands::Sync { force, resolve } => {
            let report = client.sync(force, resolve.into()).await?;
            print_sync_report(&report);
        }

        Commands::Version => {
            println!("gophkeeper {}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}

fn password_or_prompt(password: Option<String>, prompt: &str) -> Result<String> {
    match password {
        Some(password) => Ok(password),
        None => Ok(rpassword::prompt_password(prompt)?),
    }
}

fn build_payload(add: AddCommands) -> Result<(String, SecretPayload)> {
    let built = match add {
        AddCommands::LoginPassword {
            name,
            login,
            password,
            website,
            notes,
        } => {
            let password = password_or_prompt(password, "Secret password: ")?;
            (
                name,
                SecretPayload::LoginPassword(LoginPasswordData {
                    login,
                    password,
                    website,
                    notes,
                }),
            )
        }
        AddCommands::Text {
            name,
            content,
            description,
        } => (
            name,
            SecretPayload::Text(TextData {
                content,
                description,
            }),
        ),
        AddCommands::BankCard {
            name,
            holder,
            number,
            expiry,
            cvv,
            bank,
        } => (
            name,
            SecretPayload::BankCard(BankCardData {
                card_holder: holder,
                card_number: number,
                expiry_date: expiry,
                cvv,
                bank_name: bank,
            }),
        ),
        AddCommands::Binary {
            name,
            file,
            description,
        } => {
            let data = std::fs::read(&file)?;
            let file_name = file
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "unnamed".to_string());
            (
                name,
                SecretPayload::Binary(BinaryData {
                    data,
                    file_name,
                    description,
                }),
            )
        }
    };
    Ok(built)
}

async fn auto_sync(client: &mut Client<HttpTransport, FileStorage>, cfg: &config::ClientConfig) {
    if !cfg.auto_sync {
        return;
    }
    match client.sync(false, ConflictResolution::Server).await {
        Ok(report) => print_sync_report(&report),
        Err(e) => tracing::warn!("auto-sync failed: {e}"),
    }
}

fn print_secret(secret: &SecretData) {
    println!("id:      {}", secret.id);
    println!("name:    {}", secret.name);
    println!("type:    {}", secret.secret_type.as_str());
    println!("version: {}", secret.version);
    match serde_json::to_string_pretty(&secret.data) {
        Ok(json) => println!("data:    {json}"),
        Err(e) => tracing::warn!("failed to render payload: {e}"),
    }
}

fn print_sync_report(report: &SyncReport) {
    println!("Sync completed:");
    println!("  uploaded:   {}", report.uploaded);
    println!("  downloaded: {}", report.downloaded);
    if !report.conflicts.is_empty() {
        println!("  conflicts:  {}", report.conflicts.len());
        for conflict in &report.conflicts {
            println!("    - {conflict}");
        }
    }
}
