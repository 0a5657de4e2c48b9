//! Narrow-view decision for the confirmation dialog.

use serde::{Deserialize, Serialize};

/// Available container area, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Which confirmation the dialog is asking for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogKind {
    Finish,
    Retry,
}

/// Reference to an open confirmation dialog and its measured extent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DialogRef {
    pub kind: DialogKind,
    /// Bottom edge of the dialog in its regular (wide) presentation
    pub bottom: u32,
}

/// Thresholds below which the container is considered cramped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutThresholds {
    pub min_width: u32,
    pub min_height: u32,
}

impl Default for LayoutThresholds {
    fn default() -> Self {
        Self {
            min_width: 480,
            min_height: 200,
        }
    }
}

/// Outcome of a layout evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutChange {
    EnterNarrow,
    LeaveNarrow,
}

/// Controller-owned layout state.
#[derive(Debug, Clone, Default)]
pub struct LayoutState {
    dialog: Option<DialogRef>,
    is_narrow_view: bool,
    thresholds: LayoutThresholds,
}

impl LayoutState {
    pub fn new(thresholds: LayoutThresholds) -> Self {
        Self {
            dialog: None,
            is_narrow_view: false,
            thresholds,
        }
    }

    pub fn is_narrow_view(&self) -> bool {
        self.is_narrow_view
    }

    pub fn dialog(&self) -> Option<DialogRef> {
        self.dialog
    }

    pub fn dialog_opened(&mut self, dialog: DialogRef) {
        self.dialog = Some(dialog);
    }

    pub fn dialog_closed(&mut self) {
        self.dialog = None;
    }

    /// Whether the container can hold the dialog in its regular presentation.
    ///
    /// Besides the fixed thresholds, an open dialog must fit inside the container.
    /// That keeps the narrow and wide conditions mutually exclusive for any
    /// given measurement.
    fn has_space(&self, viewport: Viewport) -> bool {
        let roomy = viewport.height > self.thresholds.min_height
            && viewport.width > self.thresholds.min_width;
        let dialog_fits = self
            .dialog
            .map_or(true, |dialog| dialog.bottom <= viewport.height);
        roomy && dialog_fits
    }

    /// Re-evaluates the narrow-view flag for a resize trigger.
    ///
    /// Repeating the call with the same measurements never toggles the flag back.
    pub fn evaluate(&mut self, viewport: Viewport) -> Option<LayoutChange> {
        let has_space = self.has_space(viewport);

        if !self.is_narrow_view {
            let overflowing = self
                .dialog
                .is_some_and(|dialog| dialog.bottom > viewport.height);
            if overflowing && !has_space {
                self.is_narrow_view = true;
                return Some(LayoutChange::EnterNarrow);
            }
        } else if has_space {
            self.is_narrow_view = false;
            return Some(LayoutChange::LeaveNarrow);
        }

        None
    }
}
