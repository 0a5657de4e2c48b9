//! Inspect or reset the persisted recorder state.

use crate::config::ArecConfig;
use crate::recorder::StateStore;

/// Prints the persisted view state for the configured content id, or clears it.
///
/// Clearing makes the next `arec record` start from `ready` instead of `resume`.
pub fn handle_state(clear: bool) -> Result<(), anyhow::Error> {
    let config = ArecConfig::load_or_create()?;
    let content_id = &config.recorder.content_id;
    let store = StateStore::open_default()?;

    if clear {
        if store.clear(content_id)? {
            println!("Cleared saved state for '{content_id}'.");
        } else {
            println!("No saved state for '{content_id}'.");
        }
        return Ok(());
    }

    match store.load(content_id)? {
        Some(state) => println!("{content_id}: {}", serde_json::to_string(&state)?),
        None => println!("{content_id}: no saved state"),
    }
    Ok(())
}
