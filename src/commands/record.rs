//! Interactive recording session.
//!
//! Wires the recorder controller to the cpal engine, the terminal UI, the state
//! store and the export history, then runs everything on one event loop.

use crate::config::ArecConfig;
use crate::history::ExportHistory;
use crate::recorder::store::default_data_dir;
use crate::recorder::{
    ChannelHost, ControllerSettings, CpalEngine, EngineEvent, HostEvent, HostOptions, Input,
    PlainTitle, RecordingController, SessionView, StateStore, ViewUpdate,
};
use crate::ui::{report_fatal, CellScale, EventReader, KeyAction, RecorderTui, TerminalEvent};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

/// Redraw cadence; keeps the elapsed timer moving while nothing else changes.
const REDRAW_INTERVAL: Duration = Duration::from_millis(33);

/// Applies host events on the terminal side: persistence and exports.
struct HostBridge {
    store: StateStore,
    exports: ExportHistory,
    content_id: String,
}

impl HostBridge {
    fn export(&self, path: &Path, mime_type: &str, view: &SessionView) -> Option<PathBuf> {
        match self.exports.save_export(
            path,
            &view.audio_filename,
            &view.title,
            mime_type,
            &self.content_id,
        ) {
            Ok(meta) => {
                tracing::info!("Export saved: {}", meta.audio_path.display());
                Some(meta.audio_path)
            }
            Err(e) => {
                tracing::error!("Failed to save export: {}", e);
                None
            }
        }
    }

    fn persist(&self, state: &crate::recorder::PersistedViewState) {
        if let Err(e) = self.store.save(&self.content_id, state) {
            tracing::error!("Failed to persist recorder state: {}", e);
        }
    }
}

/// Runs the recorder until the user quits.
///
/// # Errors
/// - If the configuration cannot be loaded
/// - If the data directory cannot be prepared
/// - If the terminal cannot be initialized or drawn
pub async fn handle_record() -> Result<(), anyhow::Error> {
    tracing::info!("=== arec Audio Recorder Started ===");

    let config = match ArecConfig::load_or_create() {
        Ok(config) => config,
        Err(err) => {
            tracing::error!("Failed to load configuration: {err}");
            report_fatal(
                "Configuration Error",
                &format!("{err}\n\nPlease check your ~/.config/arec/arec.toml file and try again."),
            );
            return Err(anyhow::anyhow!("Configuration error: {err}"));
        }
    };

    tracing::info!(
        "Configuration loaded: device={}, sample_rate={}Hz, reference_level={}dBFS, content_id={}",
        config.audio.device,
        config.audio.sample_rate,
        config.audio.reference_level_db,
        config.recorder.content_id
    );

    let data_dir = default_data_dir()?;
    let bridge = HostBridge {
        store: StateStore::new(&data_dir)?,
        exports: ExportHistory::new(&data_dir)?,
        content_id: config.recorder.content_id.clone(),
    };
    let previous_state = bridge
        .store
        .load(&config.recorder.content_id)
        .unwrap_or_else(|e| {
            tracing::warn!("Could not read persisted state: {}", e);
            None
        });

    let (inbox_tx, mut inbox_rx) = mpsc::unbounded_channel::<Input>();
    let (view_tx, mut view_rx) = mpsc::unbounded_channel::<Vec<ViewUpdate>>();
    let (host_tx, mut host_rx) = mpsc::unbounded_channel::<HostEvent>();
    let (engine_tx, mut engine_rx) = mpsc::unbounded_channel::<EngineEvent>();
    let (term_tx, mut term_rx) = mpsc::unbounded_channel::<TerminalEvent>();

    let engine = CpalEngine::new(
        config.audio.device.clone(),
        config.audio.sample_rate,
        config.audio.reference_level_db,
        engine_tx,
    );
    let options = HostOptions {
        title: config.recorder.title.clone(),
        l10n: config.l10n.clone(),
        content_id: config.recorder.content_id.clone(),
        previous_state,
        is_subcontent: config.recorder.is_subcontent,
    };
    let settings = ControllerSettings {
        frame_interval: config.meter.frame_interval(),
        layout: config.layout.thresholds(),
    };

    let scale = CellScale::new(config.layout.cell_width, config.layout.cell_height);
    let mut tui = RecorderTui::new(scale, &config.l10n)?;
    let mut reader = EventReader::spawn(term_tx);

    let mut controller = RecordingController::new(
        engine,
        Box::new(view_tx),
        Box::new(ChannelHost::new(host_tx)),
        inbox_tx,
        options,
        settings,
        &PlainTitle,
    );

    let mut view = SessionView::default();
    let mut exported: Option<PathBuf> = None;
    let mut redraw = tokio::time::interval(REDRAW_INTERVAL);
    redraw.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    let outcome: anyhow::Result<()> = loop {
        tokio::select! {
            Some(input) = inbox_rx.recv() => controller.handle(input),
            Some(event) = engine_rx.recv() => controller.handle(Input::Engine(event)),
            Some(batch) = view_rx.recv() => {
                view.reduce(batch);
                for intent in tui.screen_mut().observe(&view, Instant::now()) {
                    controller.handle(Input::Intent(intent));
                }
            }
            Some(event) = host_rx.recv() => match event {
                HostEvent::Persist(state) => bridge.persist(&state),
                HostEvent::ResizeRequested => match tui.viewport() {
                    Ok(viewport) => controller.handle(Input::Resize(viewport)),
                    Err(e) => tracing::warn!("Could not measure terminal: {}", e),
                },
                HostEvent::ExportFile(payload, options) => {
                    tracing::debug!("Export requested (external: {})", options.external);
                    exported = bridge.export(&payload.path, &payload.mime_type, &view);
                }
                HostEvent::Completed(completion) => {
                    tracing::info!("Completed: {} ({})", completion.title, completion.description);
                    tui.screen_mut().set_notice(completion.description);
                }
            },
            Some(event) = term_rx.recv() => match event {
                TerminalEvent::Key(key) => match tui.handle_key(key, &view) {
                    KeyAction::Quit => break Ok(()),
                    KeyAction::Send(intents) => {
                        for intent in intents {
                            controller.handle(Input::Intent(intent));
                        }
                    }
                    KeyAction::Ignore => {}
                },
                TerminalEvent::Resize { cols, rows } => {
                    let viewport = tui.screen_mut().resize(cols, rows);
                    controller.handle(Input::Resize(viewport));
                }
            },
            _ = redraw.tick() => {
                if let Err(e) = tui.draw(&view) {
                    break Err(anyhow::anyhow!("Render failed: {e}"));
                }
            }
        }
    };

    controller.detach();
    reader.stop();
    tui.cleanup()
        .map_err(|e| anyhow::anyhow!("Cleanup failed: {e}"))?;

    if let (Some(_), Some(path)) = (controller.audio_src(), &exported) {
        println!("{}", path.display());
    }

    match &outcome {
        Ok(()) => tracing::info!("=== arec Audio Recorder Exited Successfully ==="),
        Err(e) => tracing::error!("Recorder loop failed: {}", e),
    }
    outcome
}
