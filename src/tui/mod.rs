//! Terminal user interface (Ratatui).

mod app;
mod backend;
mod clipboard;
mod compose;
mod feed;
mod help;
mod log_capture;
mod log_pane;
mod preview;
mod roster;
mod screen;
mod thumbnail;
mod ui;

pub use app::run;
pub use log_capture::LogBuffer;
