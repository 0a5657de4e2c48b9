//! Terminal user interface for the recorder widget.
//!
//! Renders the [`SessionView`] projection, turns key presses into controller
//! intents, and reports terminal sizes as pixel viewports for the layout logic.

use crate::recorder::{
    DialogKind, DialogRef, Intent, L10n, RecordingState, SessionView, Viewport,
};
use crate::ui::meter::LevelHistory;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    prelude::*,
    widgets::{Block, Clear, Paragraph, Sparkline, Wrap},
};
use std::io::{stdout, Stdout};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tokio::sync::mpsc::UnboundedSender;

/// Rows above the dialog in its regular presentation (title, status, timer, meter top).
const HEADER_ROWS: u16 = 6;
const DIALOG_ROWS: u16 = 6;
const DIALOG_WIDTH: u16 = 46;

const FG: Color = Color::Rgb(206, 224, 220);
const BG: Color = Color::Rgb(0, 0, 0);
const ACCENT: Color = Color::Rgb(185, 207, 212);

/// Terminal input relevant to the recorder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminalEvent {
    Key(KeyEvent),
    Resize { cols: u16, rows: u16 },
}

/// What the event loop should do after a key press.
#[derive(Debug, Clone, PartialEq)]
pub enum KeyAction {
    Ignore,
    /// Forward these intents to the controller, in order
    Send(Vec<Intent>),
    Quit,
}

/// Pixel size of one terminal cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellScale {
    pub width: u32,
    pub height: u32,
}

impl CellScale {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
        }
    }

    pub fn viewport(&self, cols: u16, rows: u16) -> Viewport {
        Viewport::new(cols as u32 * self.width, rows as u32 * self.height)
    }
}

/// Recording duration with paused time excluded.
#[derive(Debug, Clone, Default)]
pub struct ElapsedTimer {
    started: Option<Instant>,
    paused_total: Duration,
    paused_since: Option<Instant>,
    frozen: Option<Duration>,
}

impl ElapsedTimer {
    /// Follows a state change of the session.
    pub fn observe(&mut self, state: RecordingState, now: Instant) {
        match state {
            RecordingState::Recording => {
                if self.started.is_none() {
                    *self = Self {
                        started: Some(now),
                        ..Self::default()
                    };
                }
                if let Some(since) = self.paused_since.take() {
                    self.paused_total += now.duration_since(since);
                }
            }
            RecordingState::Paused => {
                if self.started.is_some() && self.paused_since.is_none() {
                    self.paused_since = Some(now);
                }
            }
            RecordingState::Done => {
                if self.started.is_some() {
                    self.frozen = Some(self.elapsed(now));
                }
            }
            _ => *self = Self::default(),
        }
    }

    pub fn elapsed(&self, now: Instant) -> Duration {
        if let Some(frozen) = self.frozen {
            return frozen;
        }
        let Some(started) = self.started else {
            return Duration::ZERO;
        };
        let mut paused = self.paused_total;
        if let Some(since) = self.paused_since {
            paused += now.duration_since(since);
        }
        now.duration_since(started).saturating_sub(paused)
    }
}

fn can_finish(state: RecordingState) -> bool {
    matches!(state, RecordingState::Recording | RecordingState::Paused)
}

fn can_retry(state: RecordingState) -> bool {
    matches!(
        state,
        RecordingState::Recording
            | RecordingState::Paused
            | RecordingState::Done
            | RecordingState::Resume
            | RecordingState::CantCreateAudioFile
    )
}

/// Terminal-independent part of the UI: dialog, timer, meter history, drawing.
pub struct RecorderScreen {
    scale: CellScale,
    history: LevelHistory,
    timer: ElapsedTimer,
    dialog: Option<DialogKind>,
    last_state: Option<RecordingState>,
    notice: Option<String>,
    confirm_finish: String,
    confirm_retry: String,
}

impl RecorderScreen {
    pub fn new(scale: CellScale, l10n: &L10n, width: u16) -> Self {
        Self {
            scale,
            history: LevelHistory::new(width as usize),
            timer: ElapsedTimer::default(),
            dialog: None,
            last_state: None,
            notice: None,
            confirm_finish: l10n.confirm_finish.clone(),
            confirm_retry: l10n.confirm_retry.clone(),
        }
    }

    pub fn dialog(&self) -> Option<DialogKind> {
        self.dialog
    }

    pub fn set_notice(&mut self, notice: impl Into<String>) {
        self.notice = Some(notice.into());
    }

    pub fn resize(&mut self, cols: u16, rows: u16) -> Viewport {
        self.history.resize(cols as usize);
        self.scale.viewport(cols, rows)
    }

    /// Bottom edge of the dialog in its regular presentation, in pixels.
    fn dialog_bottom(&self) -> u32 {
        (HEADER_ROWS + DIALOG_ROWS) as u32 * self.scale.height
    }

    fn open_dialog(&mut self, kind: DialogKind) -> KeyAction {
        self.dialog = Some(kind);
        KeyAction::Send(vec![Intent::ConfirmationDialogOpened(DialogRef {
            kind,
            bottom: self.dialog_bottom(),
        })])
    }

    /// Maps a key press to controller intents.
    pub fn handle_key(&mut self, key: KeyEvent, view: &SessionView) -> KeyAction {
        if key.kind != KeyEventKind::Press {
            return KeyAction::Ignore;
        }
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            tracing::debug!("Ctrl+C pressed: quitting");
            return KeyAction::Quit;
        }

        if let Some(kind) = self.dialog {
            return match key.code {
                KeyCode::Char('y') | KeyCode::Enter => {
                    self.dialog = None;
                    let confirmed = match kind {
                        DialogKind::Finish => Intent::Finish,
                        DialogKind::Retry => Intent::Retry,
                    };
                    KeyAction::Send(vec![Intent::ConfirmationDialogClosed, confirmed])
                }
                KeyCode::Char('n') | KeyCode::Esc => {
                    self.dialog = None;
                    KeyAction::Send(vec![Intent::ConfirmationDialogClosed])
                }
                _ => KeyAction::Ignore,
            };
        }

        match key.code {
            KeyCode::Char(' ') => match view.state {
                RecordingState::Ready | RecordingState::Paused => {
                    KeyAction::Send(vec![Intent::Begin])
                }
                RecordingState::Recording => KeyAction::Send(vec![Intent::Pause]),
                _ => KeyAction::Ignore,
            },
            KeyCode::Enter if can_finish(view.state) => self.open_dialog(DialogKind::Finish),
            KeyCode::Char('r') if can_retry(view.state) => self.open_dialog(DialogKind::Retry),
            KeyCode::Char('q') | KeyCode::Esc => {
                tracing::debug!("Escape or 'q' pressed: quitting");
                KeyAction::Quit
            }
            _ => KeyAction::Ignore,
        }
    }

    /// Follows the latest view. Returns intents to send when an open dialog
    /// no longer applies to the new state.
    pub fn observe(&mut self, view: &SessionView, now: Instant) -> Vec<Intent> {
        if self.last_state != Some(view.state) {
            self.timer.observe(view.state, now);
            if view.state == RecordingState::Ready {
                self.history.clear();
                self.notice = None;
            }
            self.last_state = Some(view.state);
        }
        if view.state == RecordingState::Recording {
            self.history.record(view.avg_mic_frequency, now);
        }

        let stale = match self.dialog {
            Some(DialogKind::Finish) => !can_finish(view.state),
            Some(DialogKind::Retry) => !can_retry(view.state),
            None => false,
        };
        if stale {
            self.dialog = None;
            return vec![Intent::ConfirmationDialogClosed];
        }
        Vec::new()
    }

    pub fn render(&self, frame: &mut Frame, view: &SessionView, now: Instant) {
        let area = frame.area();
        frame.render_widget(Block::default().style(Style::default().bg(BG).fg(FG)), area);

        let hide_background = self.dialog.is_some() && view.layout.scroll_suppressed;
        if !hide_background {
            self.render_session(frame, area, view, now);
        }
        if let Some(kind) = self.dialog {
            self.render_dialog(frame, area, kind, view.layout.pinned);
        }
    }

    fn render_session(&self, frame: &mut Frame, area: Rect, view: &SessionView, now: Instant) {
        let inner = if view.is_subcontent {
            area
        } else {
            let block = Block::bordered()
                .title(" arec ")
                .border_style(Style::default().fg(ACCENT));
            let inner = block.inner(area);
            frame.render_widget(block, area);
            inner
        };

        let [title_area, status_area, timer_area, meter_area, audio_area, footer_area] =
            Layout::vertical([
                Constraint::Length(1),
                Constraint::Length(1),
                Constraint::Length(1),
                Constraint::Min(1),
                Constraint::Length(1),
                Constraint::Length(1),
            ])
            .areas(inner);

        frame.render_widget(
            Paragraph::new(Line::from(view.title.as_str().bold())),
            title_area,
        );

        let indicator = match view.state {
            RecordingState::Recording => Span::styled("● ", Style::default().fg(Color::Red)),
            RecordingState::Paused => Span::styled("⏸ ", Style::default().fg(Color::Yellow)),
            RecordingState::Done | RecordingState::Resume => {
                Span::styled("■ ", Style::default().fg(Color::Green))
            }
            state if state.is_environment_failure()
                || state == RecordingState::CantCreateAudioFile =>
            {
                Span::styled("✖ ", Style::default().fg(Color::Red))
            }
            _ => Span::raw("○ "),
        };
        frame.render_widget(
            Paragraph::new(Line::from(vec![indicator, Span::raw(view.status.as_str())]))
                .wrap(Wrap { trim: true }),
            status_area,
        );

        let secs = self.timer.elapsed(now).as_secs();
        frame.render_widget(
            Paragraph::new(format!("{}:{:02}", secs / 60, secs % 60)),
            timer_area,
        );

        let levels = self.history.levels();
        let visible = &levels[levels.len().saturating_sub(meter_area.width as usize)..];
        frame.render_widget(
            Sparkline::default()
                .data(visible)
                .max(100)
                .style(Style::default().fg(FG).bg(BG)),
            meter_area,
        );

        let audio_line = match (view.state, &view.audio_src) {
            (RecordingState::Done, Some(src)) => Line::from(vec![
                Span::raw(format!("Saved {} ", view.audio_filename)),
                Span::styled(src.as_str(), Style::default().fg(ACCENT).add_modifier(Modifier::DIM)),
            ]),
            (RecordingState::Done, None) => Line::from("Preparing audio...".italic()),
            (RecordingState::Resume, _) => {
                Line::from(format!("Previously recorded as {}", view.audio_filename))
            }
            _ => Line::default(),
        };
        frame.render_widget(Paragraph::new(audio_line), audio_area);

        let help = match view.state {
            RecordingState::Ready => "space record · q quit",
            RecordingState::Recording => "space pause · enter finish · r retry · q quit",
            RecordingState::Paused => "space resume · enter finish · r retry · q quit",
            RecordingState::Done | RecordingState::Resume | RecordingState::CantCreateAudioFile => {
                "r record again · q quit"
            }
            _ => "q quit",
        };
        let footer = match &self.notice {
            Some(notice) => Line::from(vec![
                Span::styled(notice.as_str(), Style::default().fg(Color::Green)),
                Span::raw(" · "),
                Span::raw(help),
            ]),
            None => Line::from(help),
        };
        frame.render_widget(
            Paragraph::new(footer).style(Style::default().fg(ACCENT)),
            footer_area,
        );
    }

    fn render_dialog(&self, frame: &mut Frame, area: Rect, kind: DialogKind, pinned: bool) {
        let dialog_area = if pinned {
            Rect {
                x: area.x,
                y: area.y,
                width: area.width,
                height: DIALOG_ROWS.min(area.height),
            }
        } else {
            let width = DIALOG_WIDTH.min(area.width);
            let y = area.y + HEADER_ROWS.min(area.height);
            Rect {
                x: area.x + (area.width - width) / 2,
                y,
                width,
                height: DIALOG_ROWS.min(area.bottom().saturating_sub(y)),
            }
        };

        let (title, question) = match kind {
            DialogKind::Finish => (" Finish ", self.confirm_finish.as_str()),
            DialogKind::Retry => (" Retry ", self.confirm_retry.as_str()),
        };
        let text = vec![
            Line::from(question),
            Line::default(),
            Line::from(vec!["y".bold(), Span::raw(" confirm   "), "n".bold(), Span::raw(" cancel")]),
        ];

        frame.render_widget(Clear, dialog_area);
        frame.render_widget(
            Paragraph::new(text)
                .alignment(Alignment::Center)
                .wrap(Wrap { trim: true })
                .block(
                    Block::bordered()
                        .title(title)
                        .border_style(Style::default().fg(Color::Yellow)),
                )
                .style(Style::default().bg(BG).fg(FG)),
            dialog_area,
        );
    }
}

/// Full-screen recorder UI on the terminal's alternate screen.
pub struct RecorderTui {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    screen: RecorderScreen,
    active: bool,
}

impl RecorderTui {
    /// Creates the TUI and enters alternate screen mode.
    ///
    /// # Errors
    /// - If terminal cannot be initialized
    /// - If raw mode cannot be enabled
    /// - If alternate screen cannot be entered
    pub fn new(scale: CellScale, l10n: &L10n) -> anyhow::Result<Self> {
        enable_raw_mode()?;
        let mut stdout = stdout();
        execute!(stdout, EnterAlternateScreen)?;

        let terminal = Terminal::new(CrosstermBackend::new(stdout))?;
        let size = terminal.size()?;

        Ok(Self {
            terminal,
            screen: RecorderScreen::new(scale, l10n, size.width),
            active: true,
        })
    }

    pub fn screen_mut(&mut self) -> &mut RecorderScreen {
        &mut self.screen
    }

    /// Current terminal size as a pixel viewport.
    pub fn viewport(&mut self) -> anyhow::Result<Viewport> {
        let size = self.terminal.size()?;
        Ok(self.screen.resize(size.width, size.height))
    }

    pub fn handle_key(&mut self, key: KeyEvent, view: &SessionView) -> KeyAction {
        self.screen.handle_key(key, view)
    }

    /// # Errors
    /// - If terminal rendering fails
    pub fn draw(&mut self, view: &SessionView) -> anyhow::Result<()> {
        let now = Instant::now();
        let screen = &self.screen;
        self.terminal.draw(|frame| screen.render(frame, view, now))?;
        Ok(())
    }

    /// Cleans up terminal state and exits alternate screen mode.
    pub fn cleanup(&mut self) -> anyhow::Result<()> {
        if !self.active {
            return Ok(());
        }
        self.active = false;
        disable_raw_mode()?;
        execute!(self.terminal.backend_mut(), LeaveAlternateScreen)?;
        self.terminal.show_cursor()?;
        Ok(())
    }
}

impl Drop for RecorderTui {
    fn drop(&mut self) {
        let _ = self.cleanup();
    }
}

/// Background thread forwarding crossterm key and resize events.
pub struct EventReader {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl EventReader {
    pub fn spawn(events: UnboundedSender<TerminalEvent>) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = Arc::clone(&stop);

        let handle = std::thread::spawn(move || {
            while !stop_flag.load(Ordering::Relaxed) {
                let forwarded = match event::poll(Duration::from_millis(100)) {
                    Ok(false) => continue,
                    Ok(true) => match event::read() {
                        Ok(Event::Key(key)) => events.send(TerminalEvent::Key(key)),
                        Ok(Event::Resize(cols, rows)) => {
                            events.send(TerminalEvent::Resize { cols, rows })
                        }
                        Ok(_) => continue,
                        Err(e) => {
                            tracing::error!("Failed to read terminal event: {}", e);
                            break;
                        }
                    },
                    Err(e) => {
                        tracing::error!("Failed to poll terminal events: {}", e);
                        break;
                    }
                };
                if forwarded.is_err() {
                    break;
                }
            }
        });

        Self {
            stop,
            handle: Some(handle),
        }
    }

    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::warn!("Terminal event reader panicked");
            }
        }
    }
}

impl Drop for EventReader {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recorder::{LayoutOverrides, ViewUpdate};
    use ratatui::backend::TestBackend;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn view_in(state: RecordingState) -> SessionView {
        let mut view = SessionView::default();
        view.reduce(vec![
            ViewUpdate::Title("My Answer".into()),
            ViewUpdate::State {
                state,
                status: state.to_string(),
            },
            ViewUpdate::AudioFilename("my-answer.wav".into()),
        ]);
        view
    }

    fn screen() -> RecorderScreen {
        RecorderScreen::new(CellScale::new(8, 16), &L10n::default(), 80)
    }

    fn buffer_text(terminal: &Terminal<TestBackend>) -> String {
        let buffer = terminal.backend().buffer();
        let area = buffer.area;
        (0..area.height)
            .map(|y| {
                (0..area.width)
                    .map(|x| buffer[(x, y)].symbol().to_string())
                    .collect::<String>()
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn test_space_begins_and_pauses() {
        let mut screen = screen();
        assert_eq!(
            screen.handle_key(key(KeyCode::Char(' ')), &view_in(RecordingState::Ready)),
            KeyAction::Send(vec![Intent::Begin])
        );
        assert_eq!(
            screen.handle_key(key(KeyCode::Char(' ')), &view_in(RecordingState::Recording)),
            KeyAction::Send(vec![Intent::Pause])
        );
        assert_eq!(
            screen.handle_key(key(KeyCode::Char(' ')), &view_in(RecordingState::Done)),
            KeyAction::Ignore
        );
    }

    #[test]
    fn test_finish_requires_confirmation() {
        let mut screen = screen();
        let view = view_in(RecordingState::Recording);

        let opened = screen.handle_key(key(KeyCode::Enter), &view);
        assert_eq!(
            opened,
            KeyAction::Send(vec![Intent::ConfirmationDialogOpened(DialogRef {
                kind: DialogKind::Finish,
                bottom: 12 * 16,
            })])
        );
        assert_eq!(screen.dialog(), Some(DialogKind::Finish));

        assert_eq!(
            screen.handle_key(key(KeyCode::Char('y')), &view),
            KeyAction::Send(vec![Intent::ConfirmationDialogClosed, Intent::Finish])
        );
        assert_eq!(screen.dialog(), None);
    }

    #[test]
    fn test_declined_retry_only_closes() {
        let mut screen = screen();
        let view = view_in(RecordingState::Done);
        assert!(matches!(
            screen.handle_key(key(KeyCode::Char('r')), &view),
            KeyAction::Send(_)
        ));
        assert_eq!(
            screen.handle_key(key(KeyCode::Char('n')), &view),
            KeyAction::Send(vec![Intent::ConfirmationDialogClosed])
        );
        assert_eq!(screen.handle_key(key(KeyCode::Char('q')), &view), KeyAction::Quit);
    }

    #[test]
    fn test_retry_unavailable_when_blocked() {
        let mut screen = screen();
        let view = view_in(RecordingState::Blocked);
        assert_eq!(screen.handle_key(key(KeyCode::Char('r')), &view), KeyAction::Ignore);
        assert_eq!(screen.handle_key(key(KeyCode::Enter), &view), KeyAction::Ignore);
    }

    #[test]
    fn test_stale_dialog_closes_on_state_change() {
        let mut screen = screen();
        let now = Instant::now();
        screen.handle_key(key(KeyCode::Enter), &view_in(RecordingState::Paused));
        assert!(screen.observe(&view_in(RecordingState::Paused), now).is_empty());
        assert_eq!(
            screen.observe(&view_in(RecordingState::Blocked), now),
            vec![Intent::ConfirmationDialogClosed]
        );
        assert_eq!(screen.dialog(), None);
    }

    #[test]
    fn test_timer_excludes_pauses_and_freezes_when_done() {
        let start = Instant::now();
        let mut timer = ElapsedTimer::default();
        timer.observe(RecordingState::Recording, start);
        timer.observe(RecordingState::Paused, start + Duration::from_secs(5));
        timer.observe(RecordingState::Recording, start + Duration::from_secs(65));
        assert_eq!(timer.elapsed(start + Duration::from_secs(70)), Duration::from_secs(10));

        timer.observe(RecordingState::Done, start + Duration::from_secs(72));
        assert_eq!(timer.elapsed(start + Duration::from_secs(500)), Duration::from_secs(12));

        timer.observe(RecordingState::Ready, start + Duration::from_secs(501));
        assert_eq!(timer.elapsed(start + Duration::from_secs(502)), Duration::ZERO);
    }

    #[test]
    fn test_viewport_uses_cell_size() {
        let mut screen = screen();
        assert_eq!(screen.resize(75, 20), Viewport::new(600, 320));
        assert_eq!(CellScale::new(0, 0).viewport(3, 4), Viewport::new(3, 4));
    }

    #[test]
    fn test_render_shows_title_status_and_dialog() {
        let mut terminal = Terminal::new(TestBackend::new(60, 16)).unwrap();
        let mut screen = screen();
        let view = view_in(RecordingState::Recording);
        screen.handle_key(key(KeyCode::Enter), &view);

        let now = Instant::now();
        terminal.draw(|frame| screen.render(frame, &view, now)).unwrap();
        let text = buffer_text(&terminal);
        assert!(text.contains("My Answer"));
        assert!(text.contains("recording"));
        assert!(text.contains("Finish"));
    }

    #[test]
    fn test_pinned_dialog_hides_background() {
        let mut terminal = Terminal::new(TestBackend::new(40, 8)).unwrap();
        let mut screen = screen();
        let mut view = view_in(RecordingState::Paused);
        view.reduce(vec![ViewUpdate::Layout(LayoutOverrides::NARROW)]);
        screen.handle_key(key(KeyCode::Char('r')), &view);

        let now = Instant::now();
        terminal.draw(|frame| screen.render(frame, &view, now)).unwrap();
        let text = buffer_text(&terminal);
        assert!(text.lines().next().unwrap().contains("Retry"));
        assert!(!text.contains("My Answer"));
    }
}
