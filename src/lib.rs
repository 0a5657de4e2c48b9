//! arec: a terminal audio recorder widget.
//!
//! The [`recorder`] module holds the session controller and its collaborators;
//! everything else is the terminal application around it.

pub mod app;
pub mod commands;
pub mod config;
pub mod history;
pub mod logging;
pub mod recorder;
pub mod ui;
