//! Library surface of the Fareboard TUI dashboard.

pub mod app;
pub mod generator;
pub mod tui;
