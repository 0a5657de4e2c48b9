//! The recording controller: owns the session state and drives every transition.
//!
//! All inputs (view intents, engine events, meter frames, audio resolution and
//! resize triggers) arrive as [`Input`] values and are handled one at a time on
//! the controller's task, in arrival order.

use super::engine::{AudioSrc, CaptureEngine, EngineEvent, FilePayload};
use super::error::RecorderError;
use super::host::{Completion, ExportOptions, Host, HostOptions, TitleFormatter};
use super::layout::{DialogRef, LayoutChange, LayoutState, LayoutThresholds, Viewport};
use super::meter::{LevelMeter, DEFAULT_FRAME_INTERVAL};
use super::state::{Epoch, PersistedViewState, RecordingState};
use super::status::StatusMessageTable;
use super::view::{audio_filename, LayoutOverrides, ViewSink, ViewUpdate};
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;

/// User intents signalled by the view.
#[derive(Debug, Clone, PartialEq)]
pub enum Intent {
    /// Start or continue recording
    Begin,
    Pause,
    Finish,
    /// Discard the current recording (already confirmed by the user)
    Retry,
    ConfirmationDialogOpened(DialogRef),
    ConfirmationDialogClosed,
}

/// Everything the controller reacts to.
#[derive(Debug)]
pub enum Input {
    Intent(Intent),
    Engine(EngineEvent),
    /// Level-meter tick from the activation started in `epoch`
    Frame { epoch: Epoch },
    /// Outcome of the audio resolution started in `epoch`
    AudioResolved {
        epoch: Epoch,
        result: Result<AudioSrc, RecorderError>,
    },
    /// The container was resized or re-measured
    Resize(Viewport),
}

/// Tunables that do not come from the host.
#[derive(Debug, Clone, Copy)]
pub struct ControllerSettings {
    pub frame_interval: Duration,
    pub layout: LayoutThresholds,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            frame_interval: DEFAULT_FRAME_INTERVAL,
            layout: LayoutThresholds::default(),
        }
    }
}

pub struct RecordingController<E: CaptureEngine> {
    engine: E,
    view: Box<dyn ViewSink>,
    host: Box<dyn Host>,
    /// Sender side of the controller's own inbox, for spawned work to report back
    inbox: UnboundedSender<Input>,
    state: RecordingState,
    epoch: Epoch,
    messages: StatusMessageTable,
    title: String,
    audio_filename: String,
    completed_description: String,
    audio_src: Option<AudioSrc>,
    /// Files reported by the engine since entering Done, exported once their
    /// audio resolves in the current epoch
    ready_files: Vec<FilePayload>,
    layout: LayoutState,
    meter: LevelMeter,
}

impl<E: CaptureEngine> RecordingController<E> {
    /// Builds the controller and publishes the initial view.
    ///
    /// A previous session that completed resumes straight into
    /// [`RecordingState::Resume`] without touching the engine.
    pub fn new(
        engine: E,
        view: Box<dyn ViewSink>,
        host: Box<dyn Host>,
        inbox: UnboundedSender<Input>,
        options: HostOptions,
        settings: ControllerSettings,
        formatter: &dyn TitleFormatter,
    ) -> Self {
        let title = formatter.format(&options.title);
        let filename = audio_filename(&title);
        let messages = StatusMessageTable::new(&options.l10n);

        let resumed = options
            .previous_state
            .is_some_and(|previous| previous.view_state.indicates_completion());
        let initial = if resumed {
            tracing::info!("Previous session completed; resuming without capture");
            RecordingState::Resume
        } else if !engine.supported() {
            tracing::warn!("Audio capture is not supported on this system");
            RecordingState::Unsupported
        } else {
            RecordingState::Ready
        };

        let mut controller = Self {
            engine,
            view,
            host,
            inbox,
            state: initial,
            epoch: Epoch::default(),
            messages,
            title: title.clone(),
            audio_filename: filename.clone(),
            completed_description: options.l10n.completed_description.clone(),
            audio_src: None,
            ready_files: Vec::new(),
            layout: LayoutState::new(settings.layout),
            meter: LevelMeter::new(settings.frame_interval),
        };

        let status = controller.messages.status(initial).to_string();
        controller.view.apply(vec![
            ViewUpdate::Title(title),
            ViewUpdate::State {
                state: initial,
                status,
            },
            ViewUpdate::AudioFilename(filename),
            ViewUpdate::AudioSrc(None),
            ViewUpdate::IsSubcontent(options.is_subcontent),
            ViewUpdate::Layout(LayoutOverrides::default()),
        ]);
        controller.host.persist(controller.current_state());
        controller.host.request_resize();

        tracing::info!(
            content_id = %options.content_id,
            state = %initial,
            "Recorder attached"
        );
        controller
    }

    pub fn state(&self) -> RecordingState {
        self.state
    }

    pub fn epoch(&self) -> Epoch {
        self.epoch
    }

    /// State exposed for cross-session persistence.
    pub fn current_state(&self) -> PersistedViewState {
        PersistedViewState {
            view_state: self.state,
        }
    }

    pub fn audio_src(&self) -> Option<&AudioSrc> {
        self.audio_src.as_ref()
    }

    pub fn audio_filename(&self) -> &str {
        &self.audio_filename
    }

    pub fn is_narrow_view(&self) -> bool {
        self.layout.is_narrow_view()
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    /// Handles one input. Never fails: engine errors become state transitions.
    pub fn handle(&mut self, input: Input) {
        match input {
            Input::Intent(intent) => self.on_intent(intent),
            Input::Engine(event) => self.on_engine_event(event),
            Input::Frame { epoch } => self.on_frame(epoch),
            Input::AudioResolved { epoch, result } => self.on_audio_resolved(epoch, result),
            Input::Resize(viewport) => self.on_resize(viewport),
        }
    }

    /// Stops the meter and releases the device before the recorder goes away.
    pub fn detach(&mut self) {
        self.meter.cancel();
        if matches!(self.state, RecordingState::Recording | RecordingState::Paused) {
            self.engine.stop();
        }
        self.engine.release_mic();
        tracing::info!(state = %self.state, "Recorder detached");
    }

    fn on_intent(&mut self, intent: Intent) {
        match (self.state, intent) {
            (RecordingState::Ready | RecordingState::Paused, Intent::Begin) => {
                match self.engine.start() {
                    Ok(()) => {
                        self.transition(RecordingState::Recording, Vec::new());
                        self.meter.start(self.epoch, self.inbox.clone());
                    }
                    Err(err) => self.fail(err),
                }
            }
            (RecordingState::Recording, Intent::Pause) => {
                self.engine.pause();
                self.transition(RecordingState::Paused, Vec::new());
            }
            (RecordingState::Recording | RecordingState::Paused, Intent::Finish) => {
                self.finish();
            }
            (
                RecordingState::Recording
                | RecordingState::Paused
                | RecordingState::Done
                | RecordingState::Resume
                | RecordingState::CantCreateAudioFile,
                Intent::Retry,
            ) => {
                self.retry();
            }
            (_, Intent::ConfirmationDialogOpened(dialog)) => {
                self.layout.dialog_opened(dialog);
                self.host.request_resize();
            }
            (_, Intent::ConfirmationDialogClosed) => {
                self.layout.dialog_closed();
                self.host.request_resize();
            }
            (state, intent) => {
                tracing::debug!("Ignoring {:?} in state {}", intent, state);
            }
        }
    }

    /// Stops capture and resolves the playable audio in the background.
    ///
    /// The device is released only once the audio handle exists, since releasing
    /// earlier can truncate the encoded output.
    fn finish(&mut self) {
        self.engine.stop();
        self.audio_src = None;
        self.transition(RecordingState::Done, vec![ViewUpdate::AudioSrc(None)]);

        let epoch = self.epoch;
        let job = self.engine.wav_url();
        let inbox = self.inbox.clone();
        tokio::spawn(async move {
            let result = job.await;
            if inbox.send(Input::AudioResolved { epoch, result }).is_err() {
                tracing::debug!("Controller gone before audio resolved for epoch {}", epoch);
            }
        });
        tracing::debug!("Awaiting audio resolution for epoch {}", epoch);
    }

    fn retry(&mut self) {
        if matches!(self.state, RecordingState::Recording | RecordingState::Paused) {
            self.engine.stop();
        }
        self.engine.release_mic();
        self.audio_src = None;
        self.transition(RecordingState::Ready, vec![ViewUpdate::AudioSrc(None)]);
    }

    fn on_engine_event(&mut self, event: EngineEvent) {
        match event {
            EngineEvent::Recording => {
                tracing::debug!("Capture engine reports device acquired (state {})", self.state);
            }
            EngineEvent::Blocked => self.fail(RecorderError::DeviceBlocked(
                "permission denied or device unavailable".to_string(),
            )),
            EngineEvent::InsecureNotAllowed => self.fail(RecorderError::InsecureContext),
            EngineEvent::FileReady(payload) => self.on_file_ready(payload),
        }
    }

    /// Holds an encoded file until it is known to belong to the current recording.
    fn on_file_ready(&mut self, payload: FilePayload) {
        if self.state != RecordingState::Done {
            tracing::debug!(
                "Discarding file {} reported in state {}",
                payload.path.display(),
                self.state
            );
            return;
        }
        let belongs = self
            .audio_src
            .as_ref()
            .map(|src| *src == AudioSrc::from_path(&payload.path));
        match belongs {
            Some(true) => self.export(payload),
            Some(false) => tracing::debug!(
                "Discarding file {} from an earlier recording",
                payload.path.display()
            ),
            None => self.ready_files.push(payload),
        }
    }

    fn export(&mut self, payload: FilePayload) {
        tracing::info!("Recording file ready: {}", payload.path.display());
        self.host
            .export_file(payload, ExportOptions { external: true });
    }

    fn on_frame(&mut self, epoch: Epoch) {
        if epoch != self.epoch || self.state != RecordingState::Recording {
            tracing::trace!(
                "Discarding meter frame from epoch {} (current {}, state {})",
                epoch,
                self.epoch,
                self.state
            );
            return;
        }
        let level = self.engine.average_mic_frequency();
        self.view.apply(vec![ViewUpdate::AvgMicFrequency(level)]);
    }

    fn on_audio_resolved(&mut self, epoch: Epoch, result: Result<AudioSrc, RecorderError>) {
        if epoch != self.epoch || self.state != RecordingState::Done {
            tracing::warn!(
                "Discarding audio resolved for epoch {}; session moved on to {} in state {}",
                epoch,
                self.epoch,
                self.state
            );
            return;
        }

        match result {
            Ok(src) => {
                self.engine.release_mic();
                tracing::info!("Recording available at {}", src);
                self.audio_src = Some(src.clone());
                let ready = std::mem::take(&mut self.ready_files);
                if let Some(payload) = ready
                    .into_iter()
                    .find(|payload| AudioSrc::from_path(&payload.path) == src)
                {
                    self.export(payload);
                }
                self.view.apply(vec![
                    ViewUpdate::AudioSrc(Some(src)),
                    ViewUpdate::AudioFilename(self.audio_filename.clone()),
                ]);
                self.host.completed(Completion {
                    title: self.title.clone(),
                    description: self.completed_description.clone(),
                });
                self.host.request_resize();
            }
            Err(err) => self.fail(err),
        }
    }

    fn on_resize(&mut self, viewport: Viewport) {
        let overrides = match self.layout.evaluate(viewport) {
            Some(LayoutChange::EnterNarrow) => LayoutOverrides::NARROW,
            Some(LayoutChange::LeaveNarrow) => LayoutOverrides::default(),
            None => return,
        };
        tracing::debug!(
            "Layout {} at {}x{}",
            if overrides.pinned { "narrowed" } else { "widened" },
            viewport.width,
            viewport.height
        );
        self.view.apply(vec![ViewUpdate::Layout(overrides)]);
        self.host.request_resize();
    }

    /// Surfaces an engine failure as a state transition. No automatic retry.
    fn fail(&mut self, err: RecorderError) {
        tracing::error!(state = %self.state, "Recording failed: {}", err);
        let next = err.state();
        if self.state == next {
            return;
        }
        if matches!(self.state, RecordingState::Recording | RecordingState::Paused) {
            self.engine.stop();
        }
        self.engine.release_mic();
        self.transition(next, Vec::new());
    }

    /// Applies a transition: one view batch, then persistence and a layout request.
    fn transition(&mut self, next: RecordingState, extra: Vec<ViewUpdate>) {
        let previous = self.state;
        self.state = next;
        self.epoch = self.epoch.next();
        self.ready_files.clear();
        if next != RecordingState::Recording {
            self.meter.cancel();
        }

        let mut batch = Vec::with_capacity(extra.len() + 1);
        batch.push(ViewUpdate::State {
            state: next,
            status: self.messages.status(next).to_string(),
        });
        batch.extend(extra);
        self.view.apply(batch);

        self.host.persist(self.current_state());
        self.host.request_resize();
        tracing::info!("Recording state: {} -> {} (epoch {})", previous, next, self.epoch);
    }
}
