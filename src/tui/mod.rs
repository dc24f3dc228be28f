//! Terminal user interface for dvr-console using ratatui.
//!
//! A command bar on top, recent commands on the left, and the active
//! candidate list with the last result on the right. Requests run on tokio
//! tasks and report back as [`TaskMessage`]s.

mod render;
mod state;
mod types;

pub use render::draw;
pub use state::App;
pub use types::{Action, Focus, PendingConfirm, Screen, TaskMessage};

use crossterm::event::{self, Event};
use std::io;
use std::time::Duration;

/// Poll for keyboard events with a timeout.
pub fn poll_event(timeout: Duration) -> io::Result<Option<Event>> {
    if event::poll(timeout)? {
        Ok(Some(event::read()?))
    } else {
        Ok(None)
    }
}
