use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use assistant_core::Msg;
use assistant_engine::{forward_broadcasts, AssistantBackend, ChatDriver, HttpBackend};
use assistant_logging::{assistant_info, assistant_warn};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc::UnboundedSender;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::commands::{load_attachment, parse_command, Command, HELP};
use super::host::{StaticVoiceCatalog, TerminalHost};
use super::logging;
use super::settings::{self, ClientSettings, SETTINGS_FILENAME};

/// A second Ctrl-C within this window quits instead of stopping the reply.
const DOUBLE_INTERRUPT_WINDOW: Duration = Duration::from_secs(2);

pub fn run_app() -> anyhow::Result<()> {
    let settings_path = PathBuf::from(SETTINGS_FILENAME);
    let loaded = settings::load_settings(&settings_path);
    let settings = match &loaded {
        Ok(settings) => settings.clone(),
        Err(_) => ClientSettings::default(),
    };

    logging::initialize(settings.log_destination, settings.verbose);
    match loaded {
        Ok(_) if !settings_path.exists() => {
            if let Err(err) = settings::save_settings(&settings_path, &settings) {
                assistant_warn!("Failed to write default settings: {}", err);
            }
        }
        Ok(_) => {}
        Err(err) => assistant_warn!("Using default settings: {}", err),
    }

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;
    runtime.block_on(run(settings))
}

async fn run(settings: ClientSettings) -> anyhow::Result<()> {
    let http = HttpBackend::new(settings.transport())
        .with_context(|| format!("invalid backend address {}", settings.base_url))?;
    assistant_info!("Connecting to {}", settings.base_url);
    match http.health().await {
        Ok(Some(agent)) => println!("Connected to {agent} at {}.", settings.base_url),
        Ok(None) => println!("Connected to {}.", settings.base_url),
        Err(err) => {
            assistant_warn!("Health check failed: {}", err);
            println!("Backend at {} is not answering yet ({err}).", settings.base_url);
        }
    }
    let backend: Arc<dyn AssistantBackend> = Arc::new(http);

    let host = TerminalHost::new(settings.speech_command.clone());
    let mut driver = ChatDriver::new(Arc::clone(&backend), host, settings.driver())
        .with_voice_catalog(Box::new(StaticVoiceCatalog::new(settings.voices.clone())));
    let inbox = driver.sender();
    let shutdown = driver.shutdown_token();

    if settings.subscribe_events {
        tokio::spawn(forward_broadcasts(
            Arc::clone(&backend),
            inbox.clone(),
            shutdown.clone(),
        ));
    }
    tokio::spawn(read_commands(inbox.clone(), shutdown.clone()));
    tokio::spawn(interrupt_on_ctrl_c(inbox.clone(), shutdown.clone()));

    println!("Type /help for commands.");
    let _ = inbox.send(Msg::ConfigRequested);
    let _ = inbox.send(Msg::HistoryRequested);

    driver.run().await;
    assistant_info!("Client stopped");
    Ok(())
}

async fn read_commands(inbox: UnboundedSender<Msg>, shutdown: CancellationToken) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            _ = shutdown.cancelled() => break,
            line = lines.next_line() => line,
        };
        let line = match line {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(err) => {
                assistant_warn!("Failed to read input: {}", err);
                break;
            }
        };

        let msgs = match parse_command(&line) {
            Ok(None) => continue,
            Ok(Some(Command::Send(text))) => vec![Msg::InputChanged(text), Msg::MessageSubmitted],
            Ok(Some(Command::Attach(path))) => match load_attachment(&path).await {
                Ok(attachment) => vec![Msg::AttachmentStaged(attachment)],
                Err(err) => {
                    println!("  (cannot attach {}: {})", path.display(), err);
                    continue;
                }
            },
            Ok(Some(Command::Dispatch(msg))) => vec![msg],
            Ok(Some(Command::Help)) => {
                println!("{HELP}");
                continue;
            }
            Ok(Some(Command::Quit)) => break,
            Err(usage) => {
                println!("  ({})", usage.0);
                continue;
            }
        };
        if msgs.into_iter().any(|msg| inbox.send(msg).is_err()) {
            return;
        }
    }
    shutdown.cancel();
}

async fn interrupt_on_ctrl_c(inbox: UnboundedSender<Msg>, shutdown: CancellationToken) {
    let mut last: Option<Instant> = None;
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => return,
            signal = tokio::signal::ctrl_c() => {
                if let Err(err) = signal {
                    assistant_warn!("Ctrl-C handler unavailable: {}", err);
                    return;
                }
            }
        }
        let now = Instant::now();
        if last.is_some_and(|at| now.duration_since(at) < DOUBLE_INTERRUPT_WINDOW) {
            shutdown.cancel();
            return;
        }
        last = Some(now);
        println!("  (stopping; press Ctrl-C again to quit)");
        if inbox.send(Msg::AbortRequested).is_err() {
            return;
        }
    }
}
