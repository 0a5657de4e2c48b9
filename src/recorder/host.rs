//! Host adapter contract: persistence, resize, export and completion.

use super::engine::FilePayload;
use super::state::PersistedViewState;
use super::status::L10n;
use regex::Regex;
use std::sync::OnceLock;
use tokio::sync::mpsc::UnboundedSender;

/// Options passed by the host when a recorder is constructed.
#[derive(Debug, Clone, Default)]
pub struct HostOptions {
    pub title: String,
    pub l10n: L10n,
    /// Identifies the content instance; persisted state is keyed by it
    pub content_id: String,
    /// State written by a previous session, if any
    pub previous_state: Option<PersistedViewState>,
    /// Whether the recorder is embedded inside another content type
    pub is_subcontent: bool,
}

/// Options attached to an exported file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportOptions {
    pub external: bool,
}

/// Completion notification carried to the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub title: String,
    pub description: String,
}

/// Outbound side of the host adapter.
pub trait Host {
    /// Stores the cross-session state; called on every transition.
    fn persist(&mut self, state: PersistedViewState);

    /// Asks the host to re-measure and send a resize trigger back.
    fn request_resize(&mut self);

    fn export_file(&mut self, payload: FilePayload, options: ExportOptions);

    fn completed(&mut self, completion: Completion);
}

/// Host events forwarded over a channel, for hosts living on another loop.
#[derive(Debug, Clone, PartialEq)]
pub enum HostEvent {
    Persist(PersistedViewState),
    ResizeRequested,
    ExportFile(FilePayload, ExportOptions),
    Completed(Completion),
}

/// [`Host`] that forwards every call as a [`HostEvent`].
pub struct ChannelHost {
    events: UnboundedSender<HostEvent>,
}

impl ChannelHost {
    pub fn new(events: UnboundedSender<HostEvent>) -> Self {
        Self { events }
    }

    fn send(&self, event: HostEvent) {
        if self.events.send(event).is_err() {
            tracing::debug!("Host receiver dropped; discarding host event");
        }
    }
}

impl Host for ChannelHost {
    fn persist(&mut self, state: PersistedViewState) {
        self.send(HostEvent::Persist(state));
    }

    fn request_resize(&mut self) {
        self.send(HostEvent::ResizeRequested);
    }

    fn export_file(&mut self, payload: FilePayload, options: ExportOptions) {
        self.send(HostEvent::ExportFile(payload, options));
    }

    fn completed(&mut self, completion: Completion) {
        self.send(HostEvent::Completed(completion));
    }
}

/// Turns a raw content title into a display title.
pub trait TitleFormatter {
    fn format(&self, raw: &str) -> String;
}

/// Strips markup and collapses whitespace.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTitle;

impl TitleFormatter for PlainTitle {
    fn format(&self, raw: &str) -> String {
        static TAGS: OnceLock<Option<Regex>> = OnceLock::new();
        let stripped = match TAGS.get_or_init(|| Regex::new(r"<[^>]*>").ok()) {
            Some(tags) => tags.replace_all(raw, "").into_owned(),
            None => raw.to_string(),
        };
        stripped
            .replace("&amp;", "&")
            .replace("&nbsp;", " ")
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recorder::state::RecordingState;
    use tokio::sync::mpsc;

    #[test]
    fn test_plain_title_strips_markup() {
        assert_eq!(
            PlainTitle.format("<p>My  <strong>Great</strong>&nbsp;Answer</p>\n"),
            "My Great Answer"
        );
        assert_eq!(PlainTitle.format("Q&amp;A"), "Q&A");
    }

    #[test]
    fn test_channel_host_forwards_events() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut host = ChannelHost::new(tx);
        host.persist(PersistedViewState {
            view_state: RecordingState::Paused,
        });
        host.request_resize();

        assert_eq!(
            rx.try_recv().unwrap(),
            HostEvent::Persist(PersistedViewState {
                view_state: RecordingState::Paused
            })
        );
        assert_eq!(rx.try_recv().unwrap(), HostEvent::ResizeRequested);
        assert!(rx.try_recv().is_err());
    }
}
