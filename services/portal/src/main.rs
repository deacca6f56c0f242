use std::io::Write;
use std::sync::Arc;

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::sync::broadcast::error::RecvError;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use common::cache::{RedisConfig, RedisStore};
use common::store::{FileStore, KeyValueStore, MemoryStore};
use portal::assistant::AssistantClient;
use portal::config::{PortalConfig, StoreBackend};
use portal::flow::AuthFlow;
use portal::identity::IdentityClient;
use portal::models::{ChatContext, User};
use portal::session::{ActivitySignal, SessionConfig, SessionEvent, SessionManager};

type Input = Lines<BufReader<Stdin>>;

#[tokio::main]
async fn main() -> Result<()> {
    let config = PortalConfig::load()?;

    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.as_str()));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    info!("Starting portal client against {}", config.api_url);

    let store = build_store(&config)?;
    let identity = IdentityClient::from_config(&config)?;
    let session = SessionManager::new(
        store,
        Arc::new(identity.clone()),
        SessionConfig::from(&config),
    );
    let flow = AuthFlow::new(identity, session.clone());
    let assistant = AssistantClient::from_config(&config, session.clone())?;

    session.validate_session().await;
    if let Some(notice) = session.take_logout_notice() {
        println!("{}", notice);
    }

    let watcher = tokio::spawn(announce_forced_logouts(session.clone()));
    let mut input = BufReader::new(tokio::io::stdin()).lines();

    loop {
        if !session.is_authenticated() {
            match sign_in(&flow, &mut input).await? {
                Some(user) => println!("Welcome, {}!", user.display_name()),
                None => break,
            }
        }

        let Some(line) = prompt(&mut input, "> ").await? else {
            break;
        };

        // The session may have expired while the prompt was open
        if !session.is_authenticated() {
            continue;
        }
        session.record_activity(ActivitySignal::KeyDown).await;

        match line.trim() {
            "" => {}
            "/quit" => break,
            "/logout" => {
                session.logout(None).await;
                println!("Signed out.");
            }
            "/whoami" => {
                if let Some(user) = session.user() {
                    println!(
                        "{} <{}> ({})",
                        user.display_name(),
                        user.email.as_deref().unwrap_or("no email"),
                        user.role.as_deref().unwrap_or("no role")
                    );
                }
            }
            "/history" => match assistant.history().await {
                Ok(entries) => {
                    for entry in entries {
                        println!("[{}] {}", entry.role, entry.content);
                    }
                }
                Err(e) => println!("Error: {}", e),
            },
            message => match assistant.send_message(message, ChatContext::General).await {
                Ok(reply) => {
                    println!("{}", reply.response);
                    for action in reply.suggested_actions {
                        println!("  - {}", action);
                    }
                }
                Err(e) => println!("Error: {}", e),
            },
        }
    }

    watcher.abort();
    session.shutdown();
    info!("Portal client stopped");

    Ok(())
}

fn build_store(config: &PortalConfig) -> Result<Arc<dyn KeyValueStore>> {
    let store: Arc<dyn KeyValueStore> = match config.store.backend {
        StoreBackend::Memory => Arc::new(MemoryStore::new()),
        StoreBackend::File => Arc::new(FileStore::new(config.store.path.clone())),
        StoreBackend::Redis => Arc::new(RedisStore::new(&RedisConfig {
            url: config.store.redis_url.clone(),
            key_prefix: config.store.key_prefix.clone(),
        })?),
    };
    info!("Using {:?} session store", config.store.backend);
    Ok(store)
}

/// Print the notice of logouts the user did not ask for
async fn announce_forced_logouts(session: SessionManager) {
    let mut events = session.events();
    loop {
        match events.recv().await {
            Ok(SessionEvent::LoggedOut { reason: Some(_) }) => {
                if let Some(notice) = session.take_logout_notice() {
                    println!("\n{}\nPress Enter to sign in again.", notice);
                }
            }
            Ok(_) | Err(RecvError::Lagged(_)) => {}
            Err(RecvError::Closed) => break,
        }
    }
}

async fn sign_in(flow: &AuthFlow, input: &mut Input) -> Result<Option<User>> {
    loop {
        let Some(action) = prompt(input, "Sign in or register? [login/register] ").await? else {
            return Ok(None);
        };
        let register = action.trim().eq_ignore_ascii_case("register");

        let Some(email) = prompt(input, "Email: ").await? else {
            return Ok(None);
        };
        let Some(password) = prompt(input, "Password: ").await? else {
            return Ok(None);
        };

        let requested = if register {
            flow.register(&email, &password).await
        } else {
            flow.request_login(&email, &password).await
        };
        if let Err(e) = requested {
            println!("{}", e);
            continue;
        }
        println!("A code has been sent to {}.", email.trim());

        loop {
            let Some(code) = prompt(input, "Code (or 'resend'): ").await? else {
                return Ok(None);
            };
            if code.trim().eq_ignore_ascii_case("resend") {
                match flow.resend_otp(&email).await {
                    Ok(()) => println!("A new code has been sent."),
                    Err(e) => println!("{}", e),
                }
                continue;
            }

            match flow.verify_otp(&email, &code).await {
                Ok(user) => return Ok(Some(user)),
                Err(e) => println!("{}", e),
            }
        }
    }
}

async fn prompt(input: &mut Input, label: &str) -> Result<Option<String>> {
    print!("{}", label);
    std::io::stdout().flush()?;
    Ok(input.next_line().await?)
}
