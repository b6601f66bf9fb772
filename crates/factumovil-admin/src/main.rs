//! FactuMovil admin CLI
//!
//! Operational tooling over the record store: initialize or wipe the store,
//! load the demo dataset, manage senders, and encrypt or decrypt credential
//! values by hand. The encryption passphrase comes from
//! `FACTUMOVIL_ENCRYPTION_KEY`; pass `--strict-key` to refuse the fallback.

use clap::{Parser, Subcommand, ValueEnum};
use std::io::BufRead;
use std::path::PathBuf;
use std::sync::Arc;
use uuid::Uuid;

use factumovil_core::{
    seed_demo_data, CredentialCipher, EncryptionConfig, JsonFileStore, RecordStore, Repository,
    Scheme,
};

/// FactuMovil AI admin backend
#[derive(Parser, Debug)]
#[command(name = "factumovil-admin")]
#[command(version = "0.1.0")]
#[command(about = "FactuMovil AI admin backend - store management and credential tooling")]
struct Args {
    /// Path to the record store file (defaults to the platform data directory)
    #[arg(long, env = "FACTUMOVIL_STORE")]
    store: Option<PathBuf>,

    /// Refuse to run with the fallback encryption key
    #[arg(long)]
    strict_key: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create the store file
    Init,
    /// Wipe every record and sequence
    Reset {
        /// Confirm the wipe
        #[arg(long)]
        yes: bool,
    },
    /// Load the demo dataset
    Seed {
        /// Admin user id from the auth provider
        #[arg(long)]
        user_id: Uuid,
    },
    /// Manage senders
    Sender {
        #[command(subcommand)]
        command: SenderCommand,
    },
    /// Encrypt a value read from standard input
    Encrypt,
    /// Decrypt a stored value read from standard input
    Decrypt {
        /// Scheme of the stored value
        #[arg(long, value_enum, default_value = "auto")]
        scheme: SchemeArg,
    },
}

#[derive(Subcommand, Debug)]
enum SenderCommand {
    /// Register a sender, encrypting its SUNAT credentials
    Add {
        /// Owning user id from the auth provider
        #[arg(long)]
        user_id: Uuid,

        #[arg(long)]
        name: String,

        /// 11-digit tax id
        #[arg(long)]
        ruc: String,

        /// SUNAT SOL username
        #[arg(long)]
        sunat_user: Option<String>,

        /// SUNAT SOL password; prompted for when a username is given without it
        #[arg(long)]
        sunat_pass: Option<String>,
    },
    /// List senders
    List {
        #[arg(long)]
        user_id: Option<Uuid>,
    },
    /// Show one sender
    Show {
        id: i64,

        /// Decrypt and print the SUNAT credentials
        #[arg(long)]
        reveal: bool,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum SchemeArg {
    /// Detect the scheme from the stored format
    Auto,
    Token,
    RawAead,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let config = if args.strict_key {
        EncryptionConfig::from_env_strict()?
    } else {
        EncryptionConfig::from_env()
    };

    // Credential tooling works without the store.
    match args.command {
        Command::Encrypt => return encrypt_value(&config),
        Command::Decrypt { scheme } => return decrypt_value(&config, scheme),
        _ => {}
    }

    let store_path = match args.store {
        Some(path) => path,
        None => default_store_path()?,
    };
    let store = Arc::new(JsonFileStore::open(&store_path)?);
    let repo = Repository::new(store.clone(), config, Scheme::TokenV1);

    match args.command {
        Command::Init => {
            store.initialize().await?;
            println!(
                "Store ready at {} ({})",
                store_path.display(),
                store.backend_name()
            );
        }
        Command::Reset { yes } => {
            if !yes {
                eprintln!("Refusing to wipe {} without --yes", store_path.display());
                return Ok(());
            }
            store.clear().await?;
            println!("Store wiped: {}", store_path.display());
        }
        Command::Seed { user_id } => {
            let summary = seed_demo_data(&repo, user_id).await?;
            println!(
                "Seeded {} senders, {} clients, {} products, {} invoices",
                summary.senders, summary.clients, summary.products, summary.invoices
            );
        }
        Command::Sender { command } => run_sender_command(&repo, command).await?,
        Command::Encrypt | Command::Decrypt { .. } => unreachable!("handled above"),
    }

    Ok(())
}

async fn run_sender_command(
    repo: &Repository,
    command: SenderCommand,
) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        SenderCommand::Add {
            user_id,
            name,
            ruc,
            sunat_user,
            sunat_pass,
        } => {
            let sunat_pass = match (&sunat_user, sunat_pass) {
                (Some(_), None) => Some(rpassword::prompt_password("SUNAT SOL password: ")?),
                (_, pass) => pass,
            };

            let sender = repo
                .create_sender(
                    user_id,
                    &name,
                    &ruc,
                    sunat_user.as_deref(),
                    sunat_pass.as_deref(),
                )
                .await?;
            println!("Created sender {} ({} / {})", sender.id, sender.name, sender.ruc);
        }
        SenderCommand::List { user_id } => {
            let senders = repo.senders(user_id).await?;
            if senders.is_empty() {
                println!("No senders registered");
            }
            for sender in senders {
                let creds = if sender.sunat_user_encrypted.is_some() {
                    "credentials set"
                } else {
                    "no credentials"
                };
                println!("{:>4}  {}  {}  [{}]", sender.id, sender.ruc, sender.name, creds);
            }
        }
        SenderCommand::Show { id, reveal } => {
            let Some(sender) = repo.sender(id).await? else {
                eprintln!("Sender {} not found", id);
                return Ok(());
            };

            println!("id:    {}", sender.id);
            println!("name:  {}", sender.name);
            println!("ruc:   {}", sender.ruc);
            println!("owner: {}", sender.user_id);

            if reveal {
                let creds = repo.sunat_credentials(id).await?;
                print_field("sunat user", &creds.user.value, creds.user.success);
                print_field("sunat pass", &creds.password.value, creds.password.success);
            }
        }
    }
    Ok(())
}

fn print_field(label: &str, value: &str, success: bool) {
    if success {
        println!("{}: {}", label, value);
    } else {
        println!("{}: (decryption failed - wrong key or corrupted value)", label);
    }
}

fn encrypt_value(config: &EncryptionConfig) -> Result<(), Box<dyn std::error::Error>> {
    let cipher = CredentialCipher::new(Scheme::TokenV1, config.clone());
    let value = read_stdin_line("Paste the value to encrypt: ")?;

    match cipher.encrypt(&value)? {
        Some(token) => println!("{}", token),
        None => println!("Nothing to encrypt (empty input)"),
    }
    Ok(())
}

fn decrypt_value(
    config: &EncryptionConfig,
    scheme: SchemeArg,
) -> Result<(), Box<dyn std::error::Error>> {
    let value = read_stdin_line("Paste the encrypted value: ")?;

    let scheme = match scheme {
        SchemeArg::Token => Scheme::TokenV1,
        SchemeArg::RawAead => Scheme::RawAeadV1,
        SchemeArg::Auto => Scheme::detect(&value),
    };
    let cipher = CredentialCipher::new(scheme, config.clone());

    match cipher.decrypt(&value) {
        Ok(Some(plaintext)) => println!("Decrypted: {}", plaintext),
        Ok(None) => println!("Nothing to decrypt (empty input)"),
        Err(err) => println!("Decryption failed: {}", err),
    }
    Ok(())
}

fn read_stdin_line(prompt: &str) -> Result<String, Box<dyn std::error::Error>> {
    eprint!("{}", prompt);

    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

fn default_store_path() -> Result<PathBuf, Box<dyn std::error::Error>> {
    directories::ProjectDirs::from("pe", "factumovil", "factumovil-admin")
        .map(|dirs| dirs.data_dir().join("factumovil.json"))
        .ok_or_else(|| "Could not determine data directory".into())
}
