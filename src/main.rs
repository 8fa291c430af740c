use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use log::{info, warn};
use whatsmeow_relay::relay;
use whatsmeow_relay::store::{LocalAuth, MemoryStore, SessionStore};
use whatsmeow_relay::{Messenger, RelayConfig, SessionClient, JID};

/// HTTP and WebSocket relay for a WhatsApp Web session.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// Directory sessions are stored in.
    #[arg(long, env = "RELAY_SESSION_DIR", default_value = "./session")]
    session_dir: PathBuf,

    /// Separate session for this client id.
    #[arg(long, env = "RELAY_CLIENT_ID")]
    client_id: Option<String>,

    /// Port the HTTP server listens on.
    #[arg(long, env = "PORT", default_value_t = 3001)]
    port: u16,

    /// Address the HTTP server binds to.
    #[arg(long, env = "RELAY_BIND", default_value = "0.0.0.0")]
    bind: String,

    /// Give up after this many unscanned QR codes (0 never gives up).
    #[arg(long, env = "RELAY_QR_MAX_RETRIES", default_value_t = 0)]
    qr_max_retries: u32,

    /// Messages kept per chat in the stored session (0 keeps everything).
    #[arg(long, env = "RELAY_MESSAGE_RETENTION", default_value_t = 500)]
    message_retention: usize,

    /// Keep the session in memory only.
    #[arg(long)]
    no_persist: bool,

    /// Choose a command to run; serves the relay when omitted.
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Serve the HTTP API and socket channel.
    Serve,
    /// Link the stored session to an account (JID or phone number).
    Pair {
        jid: String,
        /// Display name of the linked account.
        #[arg(long)]
        push_name: Option<String>,
    },
    /// Save a contact in the address book of the stored session.
    SaveContact {
        jid: String,
        name: String,
    },
    /// Forget the stored session.
    Logout,
    /// Print the effective configuration.
    ShowConfig,
}

impl Cli {
    fn config(&self) -> RelayConfig {
        let mut config = RelayConfig::default()
            .with_session_dir(self.session_dir.clone())
            .with_port(self.port)
            .with_bind_host(self.bind.clone())
            .with_qr_max_retries(self.qr_max_retries)
            .with_message_retention(self.message_retention);
        if let Some(client_id) = &self.client_id {
            config = config.with_client_id(client_id.clone());
        }
        if self.no_persist {
            config = config.without_persistence();
        }
        config
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = cli.config();
    let local_auth = LocalAuth::new(&config.session_dir, config.client_id.as_deref());

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => {
            let store: Arc<dyn SessionStore> = if config.persist_session {
                Arc::new(local_auth)
            } else {
                warn!("session persistence disabled; pairing is lost on exit");
                Arc::new(MemoryStore::new())
            };
            let client: Arc<dyn Messenger> = Arc::new(SessionClient::new(config.clone(), store));
            relay::run(config, client, shutdown_signal()).await?;
        }
        Commands::Pair { jid, push_name } => {
            let jid: JID = whatsmeow_relay::normalize_chat_id(&jid).parse()?;
            let mut state = local_auth.load()?;
            state.register(jid.clone(), push_name);
            local_auth.save(&state)?;
            println!("Linked session to {}", jid.serialized());
        }
        Commands::SaveContact { jid, name } => {
            let jid: JID = whatsmeow_relay::normalize_chat_id(&jid).parse()?;
            let mut state = local_auth.load()?;
            if !state.is_registered() {
                warn!("no linked session; the contact is kept for the next one");
            }
            state.save_contact(&jid, name.clone());
            local_auth.save(&state)?;
            println!("Saved {} as {name}", jid.serialized());
        }
        Commands::Logout => {
            local_auth.clear()?;
            println!("Session removed from {}", local_auth.session_dir().display());
        }
        Commands::ShowConfig => {
            println!("{}", serde_json::to_string_pretty(&config)?);
            println!("Session directory: {}", local_auth.session_dir().display());
        }
    }

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!("failed to listen for shutdown signal: {err}");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}
