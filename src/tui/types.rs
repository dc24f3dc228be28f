//! TUI type definitions for screens, focus, actions and task messages.

use crate::api::CategorizeOutcome;
use crate::bulk::TriggerGuard;
use crate::candidates::Ticket;
use crate::classify::CommandResult;
use crate::dispatch::OptionCommand;
use crate::error::Result;
use crate::types::{BulkDownloadReport, Episode};

/// The current screen/view of the application.
#[derive(Debug, Clone, PartialEq)]
pub enum Screen {
    /// No candidate list on screen; output of the last command only
    Home,
    /// The active candidate list
    Candidates,
}

/// Focus state for split-panel views.
#[derive(Debug, Clone, PartialEq)]
pub enum Focus {
    Sidebar,
    Main,
}

/// A bulk action waiting for the user to confirm it.
#[derive(Debug, Clone, PartialEq)]
pub enum PendingConfirm {
    /// Download exactly these episodes
    BulkDownload(Vec<Episode>),
    /// Start the torrents with these option numbers
    BulkAddTorrents(Vec<u32>),
}

/// Actions that can be returned from the TUI.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// No action, continue running
    None,
    /// Quit the application
    Quit,
    /// Send free command text to the interpreter
    Send(String),
    /// Follow-up command naming candidates by option number
    Option(OptionCommand),
    /// Download the confirmed episodes
    BulkDownload(Vec<Episode>),
    /// Start the selected torrents
    BulkAddTorrents(Vec<u32>),
    /// Wake the configured machine
    Wake,
    StopRecording,
    Categorize,
}

/// Result of a background request, delivered to the event loop.
#[derive(Debug)]
pub enum TaskMessage {
    /// Reply to a command sent with `ticket`
    Command {
        ticket: Ticket,
        outcome: Result<CommandResult>,
    },
    /// Reply to a bulk episode download; the guard is released once handled
    Bulk {
        outcome: Result<BulkDownloadReport>,
        guard: TriggerGuard,
    },
    /// Reply to a multi-option torrent add
    BulkAdd {
        ticket: Ticket,
        outcome: Result<CommandResult>,
        guard: TriggerGuard,
    },
    /// Text reply of an auxiliary endpoint
    Notice(Result<String>),
    /// Reply of auto-categorize; an unsuccessful run is shown as an error
    Categorized(Result<CategorizeOutcome>),
    /// Polled recording progress
    Progress(Result<String>),
}
