use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde_json::json;
use tokio::io::{AsyncBufReadExt, BufReader};
use xsdb_bridge::config::{BridgeConfig, load_settings};
use xsdb_bridge::protocol::{ClassifiedLine, OutOfBandPosition, ParsingMode, classify_after, merge};
use xsdb_bridge::session::LineBuffer;
use xsdb_bridge::{BridgeError, ShellEvent, XsdbBridge};

/// Structured JSON bridge to the interactive XSDB debug shell
#[derive(Parser)]
#[command(name = "xsdb-bridge")]
#[command(version)]
#[command(about = "Structured JSON bridge to the interactive XSDB debug shell")]
struct Cli {
    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Spawn the shell and relay commands read from stdin, one per line
    Run {
        /// Path to the xsdb executable
        #[arg(long)]
        xsdb: Option<String>,

        /// Config file used instead of ./xsdb-bridge.toml
        #[arg(long)]
        config: Option<PathBuf>,

        /// Tcl filter applied when listing targets
        #[arg(long)]
        target_filter: Option<String>,
    },
    /// Assemble the answers in a captured shell transcript
    Parse {
        /// Parsing mode the transcript is read in (e.g. listing-register)
        #[arg(long, default_value = "waiting")]
        mode: ParsingMode,

        /// Transcript file
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let result = match cli.command {
        Commands::Run {
            xsdb,
            config,
            target_filter,
        } => {
            let overrides = BridgeConfig {
                xsdb_path: xsdb,
                target_filter,
                ..BridgeConfig::default()
            };
            run(config.as_deref(), overrides).await
        }
        Commands::Parse { mode, file } => parse(&file, mode),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(config: Option<&Path>, overrides: BridgeConfig) -> Result<(), BridgeError> {
    let cwd = std::env::current_dir().ok();
    let outcome = load_settings(cwd.as_deref(), config, Some(overrides));
    for event in &outcome.events {
        event.log();
    }

    let bridge = XsdbBridge::spawn(outcome.settings)?;
    if let Some(mut events) = bridge.events() {
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                let exited = event == ShellEvent::Exited;
                println!("{}", json!({ "event": event }));
                if exited {
                    break;
                }
            }
        });
    }

    bridge.wait_ready().await?;
    for answer in bridge.initialize().await? {
        println!("{}", json!({ "init": answer }));
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let command = line.trim();
        if command.is_empty() {
            continue;
        }
        if command == "exit" || command == "quit" {
            break;
        }
        match bridge.send(command, false).await {
            Ok(answer) => println!("{}", json!({ "command": command, "answer": answer })),
            Err(BridgeError::ShellExited) => {
                println!("{}", json!({ "command": command, "error": "shell exited" }));
                break;
            }
            Err(e) => println!("{}", json!({ "command": command, "error": e.to_string() })),
        }
    }

    let status = bridge.shutdown().await?;
    if let Some(status) = status {
        log::info!(target: "xsdb_bridge::shell", "Shell exited with {}", status);
    }
    Ok(())
}

/// Print one JSON answer per prompt-terminated block of the transcript.
fn parse(file: &Path, mode: ParsingMode) -> Result<(), BridgeError> {
    let text = std::fs::read_to_string(file)?;
    let mut buffer = LineBuffer::new();
    let mut lines = buffer.push_str(&text);
    lines.extend(buffer.flush());

    let mut pending: Vec<ClassifiedLine> = Vec::new();
    let mut previous: Option<OutOfBandPosition> = None;
    for line in &lines {
        let classified = classify_after(line, mode, previous.as_ref());
        previous = classified.numbered_position().cloned();
        let is_prompt = classified.is_prompt();
        pending.push(classified);
        if is_prompt {
            let answer = merge(&pending, mode);
            if answer.complete {
                println!("{}", json!(answer));
                pending.clear();
            }
        }
    }
    if pending.iter().any(|line| !line.is_prompt()) {
        println!("{}", json!(merge(&pending, mode)));
    }
    Ok(())
}
