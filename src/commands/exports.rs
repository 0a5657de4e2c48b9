//! List exported recordings.

use crate::history::ExportHistory;
use crate::recorder::store::default_data_dir;

/// Prints exported recordings, most recent first, numbered for `arec replay N`.
pub fn handle_exports() -> Result<(), anyhow::Error> {
    let history = ExportHistory::new(&default_data_dir()?)?;
    let exports = history.list()?;

    if exports.is_empty() {
        println!("No exported recordings yet. Run 'arec' to record one.");
        return Ok(());
    }

    println!();
    for (index, export) in exports.iter().enumerate() {
        let missing = if export.audio_path.exists() {
            ""
        } else {
            " [missing]"
        };
        println!(
            "  {:>2}. {}  {}{}",
            index + 1,
            export.created_at.format("%Y-%m-%d %H:%M:%S"),
            export.title,
            missing
        );
        println!("      {}", export.audio_path.display());
    }
    println!();
    Ok(())
}
