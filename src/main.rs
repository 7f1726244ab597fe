use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::io::{self, AsyncBufReadExt, BufReader};
use tokio::signal;
use tracing::{info, warn, Level};
use tracing_subscriber;

use turnstile::admin::{AdminPanel, ADMIN_COMMAND};
use turnstile::config::TurnstileConfig;
use turnstile::event::{Event, EventKind};
use turnstile::gate::{IdentityStore, RateLimiter};
use turnstile::pipeline::GatingPipeline;
use turnstile::sink::{LogSink, NotificationSink};

const GREETING: &str = "Hello! Use /help to see the available commands.";
const HELP_TEXT: &str = "Available commands:\n\
    /start - Begin\n\
    /help - Show this help\n\
    /admin - Open the admin menu\n\
    Any other message is echoed back.";

/// Inbound-event gating pipeline driver.
///
/// Reads one JSON event per line on stdin and runs it through the gate
/// chain, standing in for the platform dispatcher.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Path to the YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .with_target(false)
        .with_thread_ids(true)
        .init();

    info!("Starting Turnstile gating pipeline");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let args = Args::parse();
    let mut config = match &args.config {
        Some(path) => TurnstileConfig::from_file(path)?,
        None => TurnstileConfig::default(),
    };
    config.apply_env_overrides()?;
    info!(
        authorized = config.auth.authorized_principals.len(),
        window_ms = config.throttle.window_ms,
        variant = ?config.pipeline.variant,
        "Configuration loaded"
    );

    let identity = Arc::new(IdentityStore::new(
        config.auth.authorized_principals.iter().copied(),
    ));
    let limiter = Arc::new(RateLimiter::new(config.throttle.window()));
    let sink: Arc<dyn NotificationSink> = Arc::new(LogSink);

    let pipeline = GatingPipeline::for_variant(
        config.pipeline.variant,
        Arc::clone(&limiter),
        Arc::clone(&identity),
        Arc::clone(&sink),
    );
    let admin = Arc::new(AdminPanel::new(Arc::clone(&identity), Arc::clone(&sink)));

    // Periodically drop throttle records for principals gone idle
    let sweeper = Arc::clone(&limiter);
    let idle_timeout = config.throttle.idle_timeout();
    let mut sweep_tick = tokio::time::interval(config.throttle.sweep_interval());
    tokio::spawn(async move {
        loop {
            sweep_tick.tick().await;
            sweeper.sweep_idle(idle_timeout);
        }
    });

    info!("Reading events from stdin, one JSON object per line");

    let mut lines = BufReader::new(io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                match line? {
                    Some(line) if line.trim().is_empty() => {}
                    Some(line) => match Event::from_json(&line) {
                        Ok(event) => handle_event(&pipeline, &admin, &sink, event).await,
                        Err(e) => warn!(error = %e, "Dropping undecodable event"),
                    },
                    None => break,
                }
            }
            _ = shutdown_signal() => break,
        }
    }

    info!("Turnstile gating pipeline stopped");
    Ok(())
}

/// Route an admitted event to the demo handlers: the admin flow for its
/// entry command and panel action, an echo reply for everything else.
async fn handle_event(
    pipeline: &GatingPipeline,
    admin: &Arc<AdminPanel>,
    sink: &Arc<dyn NotificationSink>,
    event: Event,
) {
    let admin = Arc::clone(admin);
    let sink = Arc::clone(sink);

    let _ = pipeline
        .dispatch(event, move |event| async move {
            match event.kind {
                EventKind::Message => match event.text() {
                    Some(ADMIN_COMMAND) => {
                        admin.present_menu(&event).await;
                    }
                    Some("/start") => sink.notify(event.channel, GREETING, false).await,
                    Some("/help") => sink.notify(event.channel, HELP_TEXT, false).await,
                    // Echo everything else back to the sender
                    Some(text) => sink.notify(event.channel, text, false).await,
                    None => {}
                },
                EventKind::Interaction => {
                    if let Some(action) = event.text() {
                        admin.activate(&event, action).await;
                    }
                }
            }
        })
        .await;
}

/// Wait for a shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
