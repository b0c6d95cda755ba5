use anyhow::Result;
use datasage_core::auth::TokenChain;
use datasage_core::config::AppConfig;
use datasage_core::types::{DatasetFile, Phase, Role};
use datasage_core::{ChatSession, ChatSnapshot, ClientError, HttpTransport, QueryOutcome};
use rustyline::error::ReadlineError;
use rustyline::{Config as RlConfig, DefaultEditor};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::console::ConsoleNotifier;

const BANNER: &str = r#"
  ╔═══════════════════════════════════════════╗
  ║            datasage v0.1.0                ║
  ║   Ask questions about your CSV data       ║
  ╚═══════════════════════════════════════════╝

  Upload a dataset, then type a question and press Enter.
  Commands:
    /upload <path> — Upload a CSV file
    /new           — Start over with a new dataset
    /status        — Show session status
    /help          — Show this help
    /exit          — Quit
"#;

/// Run the interactive REPL.
pub async fn run(config: AppConfig, file: Option<PathBuf>) -> Result<()> {
    println!("{}", BANNER);
    println!("  Endpoint: {}", config.api.base_url);
    println!();

    let transport = Arc::new(HttpTransport::new(&config.api)?);
    let tokens = Arc::new(TokenChain::from_config(&config.auth));
    let session = ChatSession::new(&config, transport, tokens, Arc::new(ConsoleNotifier));
    let mut printed = 0usize;

    if let Some(path) = file {
        upload(&session, &path).await;
        printed = print_new_turns(&session.snapshot(), printed);
    }

    // Set up rustyline.
    let rl_config = RlConfig::builder().auto_add_history(true).build();
    let history_path = AppConfig::data_dir().join("repl_history.txt");
    let mut rl = DefaultEditor::with_config(rl_config)?;
    let _ = rl.load_history(&history_path);

    loop {
        let snapshot = session.snapshot();
        let label = snapshot.dataset_name.as_deref().unwrap_or("no dataset");
        let prompt = format!("\x1b[1;36m{}\x1b[0m \x1b[1;32m❯\x1b[0m ", label);

        match rl.readline(&prompt) {
            Ok(line) => {
                let input = line.trim();
                if input.is_empty() {
                    continue;
                }

                // Handle slash commands.
                if input.starts_with('/') {
                    let handled = handle_command(input, &session).await?;
                    if !handled {
                        break; // /exit
                    }
                    let snapshot = session.snapshot();
                    if snapshot.turns.len() < printed {
                        printed = 0;
                    }
                    printed = print_new_turns(&snapshot, printed);
                    continue;
                }

                if session.phase() != Phase::Ready {
                    println!("  Upload a dataset first: /upload <path>");
                    continue;
                }

                let outcome = session.submit_query(input).await;
                if outcome == QueryOutcome::Rejected {
                    println!("  Query not sent.");
                    continue;
                }
                if let Some(err) = outcome.into_error() {
                    tracing::debug!("{}", err);
                }
                // The question itself is already on screen.
                printed += 1;
                printed = print_new_turns(&session.snapshot(), printed);
            }
            Err(ReadlineError::Interrupted) => {
                println!("^C");
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!("Goodbye!");
                break;
            }
            Err(e) => {
                eprintln!("Input error: {}", e);
                break;
            }
        }
    }

    // Save history.
    if let Some(parent) = history_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let _ = rl.save_history(&history_path);

    Ok(())
}

/// Handle a slash command. Returns `true` to continue the loop, `false` to exit.
async fn handle_command(input: &str, session: &ChatSession) -> Result<bool> {
    let parts: Vec<&str> = input.splitn(2, ' ').collect();
    let cmd = parts[0];
    let arg = parts.get(1).map(|s| s.trim()).unwrap_or("");

    match cmd {
        "/exit" | "/quit" | "/q" => {
            println!("Goodbye!");
            return Ok(false);
        }
        "/upload" => {
            if arg.is_empty() {
                println!("Usage: /upload <path-to-csv>");
            } else {
                upload(session, Path::new(arg)).await;
            }
        }
        "/new" | "/reset" => {
            session.reset_session();
            println!("Started a new analysis. Upload a dataset to continue.");
        }
        "/status" => {
            let snapshot = session.snapshot();
            println!("  Phase:   {}", phase_label(snapshot.phase));
            println!(
                "  Dataset: {}",
                snapshot.dataset_name.as_deref().unwrap_or("-")
            );
            println!("  Turns:   {}", snapshot.turns.len());
        }
        "/help" | "/?" => {
            println!("  /upload <path> — Upload a CSV file");
            println!("  /new           — Start over with a new dataset");
            println!("  /status        — Show session status");
            println!("  /help          — Show this help");
            println!("  /exit          — Quit");
        }
        _ => {
            println!(
                "Unknown command: {}. Type /help for available commands.",
                cmd
            );
        }
    }

    Ok(true)
}

/// Upload `path`; failures have already been reported by the notifier.
async fn upload(session: &ChatSession, path: &Path) {
    let file = match DatasetFile::read(path).await {
        Ok(file) => file,
        Err(e) => {
            eprintln!("\x1b[0;31mCannot read {}: {}\x1b[0m", path.display(), e);
            return;
        }
    };
    match session.begin_upload(file).await {
        Ok(_) | Err(ClientError::UploadFailure(_)) => {}
        Err(ClientError::InvalidTransition { .. }) => {
            println!("  A dataset is already loaded. Use /new to start over.");
        }
        Err(e) => eprintln!("\x1b[0;31mUpload error: {}\x1b[0m", e),
    }
}

/// Print turns past `printed`; returns the new count.
fn print_new_turns(snapshot: &ChatSnapshot, printed: usize) -> usize {
    for turn in snapshot.turns.iter().skip(printed) {
        match turn.role {
            Role::User => println!("\x1b[1;32myou\x1b[0m: {}", turn.content),
            Role::Agent => println!("\x1b[1;33mdatasage\x1b[0m: {}", turn.content),
        }
    }
    snapshot.turns.len()
}

fn phase_label(phase: Phase) -> &'static str {
    match phase {
        Phase::Empty => "waiting for a dataset",
        Phase::Uploading => "uploading",
        Phase::Ready => "ready",
        Phase::Querying => "waiting for a reply",
        Phase::Error => "upload failed (try /upload again)",
    }
}
