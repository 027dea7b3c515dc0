//! Interactive front panel REPL
//!
//! Runs on its own thread (rustyline blocks) and only talks to the polling
//! cycle through channels.

use anyhow::Result;
use colored::*;
use crossbeam::channel::Sender;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::thread::JoinHandle;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, warn};

use crate::input::panel::MAX_TURN_DETENTS;
use crate::input::PanelCommand;

/// Commands handled by the main loop rather than the panel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleCommand {
    Show,
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplAction {
    Panel(PanelCommand),
    Console(ConsoleCommand),
    Help,
}

fn parse_detents(arg: Option<&str>) -> Result<i32, String> {
    match arg {
        None => Ok(1),
        Some(n) => n
            .parse::<u32>()
            .ok()
            .filter(|n| (1..=MAX_TURN_DETENTS).contains(n))
            .map(|n| n as i32)
            .ok_or_else(|| {
                format!("expected a count between 1 and {}, got '{}'", MAX_TURN_DETENTS, n)
            }),
    }
}

/// Parse one REPL line. `Ok(None)` for a blank line.
pub fn parse_line(line: &str) -> Result<Option<ReplAction>, String> {
    let mut words = line.split_whitespace();
    let Some(command) = words.next() else {
        return Ok(None);
    };

    let action = match command.to_ascii_lowercase().as_str() {
        "right" | "r" => ReplAction::Panel(PanelCommand::Turn(parse_detents(words.next())?)),
        "left" | "l" => ReplAction::Panel(PanelCommand::Turn(-parse_detents(words.next())?)),
        "click" | "c" => ReplAction::Panel(PanelCommand::Click),
        "long" => ReplAction::Panel(PanelCommand::LongPress),
        "show" | "s" => ReplAction::Console(ConsoleCommand::Show),
        "quit" | "exit" | "q" => ReplAction::Console(ConsoleCommand::Quit),
        "help" | "?" => ReplAction::Help,
        other => return Err(format!("unknown command '{}'", other)),
    };
    Ok(Some(action))
}

fn print_help() {
    println!("{}", "Front panel commands:".bold());
    println!("  {} [n]   turn the encoder clockwise", "right".cyan());
    println!("  {} [n]    turn the encoder counter-clockwise", "left".cyan());
    println!("  {}       short press (toggle the selected route)", "click".cyan());
    println!("  {}        long press (switch input/output selection)", "long".cyan());
    println!("  {}        redraw the matrix", "show".cyan());
    println!("  {}        stop the router", "quit".cyan());
}

/// Start the REPL thread
pub fn spawn_repl(
    panel_tx: Sender<PanelCommand>,
    console_tx: UnboundedSender<ConsoleCommand>,
) -> Result<JoinHandle<()>> {
    let handle = std::thread::Builder::new()
        .name("panel-repl".into())
        .spawn(move || {
            let mut rl = match DefaultEditor::new() {
                Ok(rl) => rl,
                Err(e) => {
                    warn!("Front panel REPL unavailable: {}", e);
                    return;
                }
            };

            loop {
                let line = match rl.readline("matrix> ") {
                    Ok(line) => line,
                    Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
                    Err(e) => {
                        warn!("REPL read failed: {}", e);
                        break;
                    }
                };
                let _ = rl.add_history_entry(line.as_str());

                match parse_line(&line) {
                    Ok(None) => {}
                    Ok(Some(ReplAction::Help)) => print_help(),
                    Ok(Some(ReplAction::Panel(command))) => {
                        debug!(?command, "Panel input");
                        if panel_tx.send(command).is_err() {
                            break;
                        }
                    }
                    Ok(Some(ReplAction::Console(ConsoleCommand::Quit))) => break,
                    Ok(Some(ReplAction::Console(command))) => {
                        if console_tx.send(command).is_err() {
                            break;
                        }
                    }
                    Err(e) => println!("{} {}", "error:".red(), e),
                }
            }
            let _ = console_tx.send(ConsoleCommand::Quit);
        })?;

    Ok(handle)
}
