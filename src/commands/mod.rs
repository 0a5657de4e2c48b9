//! Application command handlers for arec.
//!
//! # Commands
//! - `record`: Interactive recorder (default)
//! - `state`: Show or clear the persisted recorder state
//! - `exports`: List exported recordings
//! - `replay`: Play an exported recording
//! - `config`: Open configuration file in user's preferred editor
//! - `list_devices`: List available audio input devices
//! - `logs`: Display recent log entries

pub mod config;
pub mod exports;
pub mod list_devices;
pub mod logs;
pub mod record;
pub mod replay;
pub mod state;

pub use config::handle_config;
pub use exports::handle_exports;
pub use list_devices::handle_list_devices;
pub use logs::handle_logs;
pub use record::handle_record;
pub use replay::handle_replay;
pub use state::handle_state;
