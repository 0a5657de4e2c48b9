//! Application orchestration and command routing.
//!
//! Handles command-line argument parsing and delegates to appropriate command handlers.

use crate::commands;
use crate::logging;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use std::io;
use std::process;

/// A terminal audio recorder with live level metering and resumable sessions
#[derive(Parser)]
#[command(name = "arec")]
#[command(version)]
#[command(about = "A terminal audio recorder with live level metering and resumable sessions")]
#[command(long_about = "A terminal audio recorder with live level metering and resumable sessions.\n\nDEFAULT COMMAND:\n    If no command is specified, 'record' is used by default.\n\nKEYS:\n    space    start, pause or continue recording\n    enter    finish recording (asks for confirmation)\n    r        discard and record again (asks for confirmation)\n    y / n    answer the confirmation dialog\n    q / esc  quit\n\nEXAMPLES:\n    # Record, then print the exported file path\n    $ arec\n\n    # Start over after a completed recording\n    $ arec state --clear\n\n    # Play back the most recent export\n    $ arec replay")]
#[command(
    after_help = "CONFIGURATION:\n    Config file:        ~/.config/arec/arec.toml\n    Saved state:        ~/.local/share/arec/state/<content_id>.json\n    Exports:            ~/.local/share/arec/exports/\n    Logs:               ~/.local/state/arec/arec.log.*"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug, PartialEq)]
enum Commands {
    /// Record audio with a live level meter (default)
    ///
    /// Space starts and pauses, Enter finishes, r starts over, Escape/q quits.
    /// The finished recording is exported and its path printed on exit.
    #[command(visible_alias = "r")]
    Record,

    /// Show or clear the saved recorder state
    ///
    /// A completed recording makes the next session open in the resumed
    /// state. Clearing the saved state starts fresh.
    State {
        /// Remove the saved state for the configured content id
        #[arg(long)]
        clear: bool,
    },

    /// List exported recordings, most recent first
    #[command(visible_alias = "e")]
    Exports,

    /// Play an exported recording using the system audio player
    #[command(visible_alias = "rp")]
    Replay {
        /// Export index (1 = most recent, 2 = second most recent, etc.)
        #[arg(value_name = "N")]
        index: Option<usize>,
    },

    /// Open configuration file in your preferred editor
    ///
    /// Uses $EDITOR environment variable or falls back to nano/vi.
    #[command(visible_alias = "c")]
    Config,

    /// List available audio input devices
    ///
    /// Shows device IDs, names, and configurations to help configure
    /// the correct input device in arec.toml.
    #[command(name = "list-devices")]
    ListDevices,

    /// Show the last 50 lines of the most recent log file
    Logs,

    /// Generate shell completion script
    ///
    /// Examples:
    ///   arec completions bash > arec.bash
    ///   arec completions zsh > _arec
    Completions {
        /// The shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Runs the main application based on command-line arguments.
///
/// # Exit Codes
/// - 0: Success
/// - 1: General error
/// - 2: Usage error (invalid arguments)
///
/// # Errors
/// - If logging initialization fails
/// - If command execution fails
pub async fn run() -> Result<(), anyhow::Error> {
    let cli = Cli::parse();

    // Commands that print to the terminal directly and need no log file
    match &cli.command {
        Some(Commands::Completions { shell }) => {
            generate(*shell, &mut Cli::command(), "arec", &mut io::stdout());
            return Ok(());
        }
        Some(Commands::ListDevices) => return exit_on_error(commands::handle_list_devices()),
        Some(Commands::Logs) => return exit_on_error(commands::handle_logs()),
        _ => {}
    }

    logging::init_logging()?;

    match cli.command {
        None | Some(Commands::Record) => commands::handle_record().await?,
        Some(Commands::State { clear }) => commands::handle_state(clear)?,
        Some(Commands::Exports) => commands::handle_exports()?,
        Some(Commands::Replay { index }) => commands::handle_replay(index)?,
        Some(Commands::Config) => commands::handle_config()?,
        Some(Commands::Completions { .. }) | Some(Commands::ListDevices) | Some(Commands::Logs) => {
            unreachable!("These commands are handled earlier")
        }
    }

    Ok(())
}

fn exit_on_error(result: anyhow::Result<()>) -> anyhow::Result<()> {
    if let Err(e) = result {
        eprintln!("Error: {e}");
        process::exit(1);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_record_is_default() {
        let cli = Cli::try_parse_from(["arec"]).unwrap();
        assert_eq!(cli.command, None);
        let cli = Cli::try_parse_from(["arec", "r"]).unwrap();
        assert_eq!(cli.command, Some(Commands::Record));
    }

    #[test]
    fn test_state_and_replay_arguments() {
        let cli = Cli::try_parse_from(["arec", "state", "--clear"]).unwrap();
        assert_eq!(cli.command, Some(Commands::State { clear: true }));
        let cli = Cli::try_parse_from(["arec", "replay", "3"]).unwrap();
        assert_eq!(cli.command, Some(Commands::Replay { index: Some(3) }));
        assert!(Cli::try_parse_from(["arec", "replay", "x"]).is_err());
    }
}
