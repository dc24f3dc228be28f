//! Application state management and input handling.

use crate::candidates::{ActiveCandidates, CandidateStore, SelectionController, Ticket};
use crate::classify::CommandResult;
use crate::config::Keybindings;
use crate::dispatch::OptionCommand;
use crate::error::AppError;
use crate::view::{bulk_report_lines, result_lines};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use log::{debug, warn};
use ratatui::widgets::{ListState, TableState};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use super::types::{Action, Focus, PendingConfirm, Screen, TaskMessage};

/// Recent commands kept in the sidebar.
const RECENT_LIMIT: usize = 20;

/// Application state for the TUI.
pub struct App {
    /// Current screen being displayed
    pub screen: Screen,
    /// Current focus (sidebar or main)
    pub focus: Focus,
    /// Whether the app should quit
    pub should_quit: bool,
    /// Command text being typed
    pub command_input: String,
    /// Whether the command bar has focus
    pub input_focused: bool,
    /// The active candidate collection
    pub store: CandidateStore,
    /// Cursor in the candidate table
    pub table_state: TableState,
    /// Commands sent this session, newest first
    pub recent_commands: Vec<String>,
    pub recent_list_state: ListState,
    /// Text of the last result
    pub output: Vec<String>,
    /// Last polled recording progress
    pub progress: Option<String>,
    /// Requests sent and not yet answered
    pub in_flight: usize,
    /// Set while a bulk action is running
    pub bulk_pending: Arc<AtomicBool>,
    /// Blocking message shown as a popup
    pub error_message: Option<String>,
    /// One-line note shown in the footer
    pub status_message: Option<String>,
    /// Whether help modal is shown
    pub show_help: bool,
    /// Bulk action awaiting confirmation
    pub confirm: Option<PendingConfirm>,
    /// Custom keybindings
    pub keybindings: Keybindings,
}

impl App {
    pub fn new(keybindings: Keybindings) -> Self {
        Self {
            screen: Screen::Home,
            focus: Focus::Main,
            should_quit: false,
            command_input: String::new(),
            input_focused: true,
            store: CandidateStore::new(),
            table_state: TableState::default(),
            recent_commands: Vec::new(),
            recent_list_state: ListState::default(),
            output: Vec::new(),
            progress: None,
            in_flight: 0,
            bulk_pending: Arc::new(AtomicBool::new(false)),
            error_message: None,
            status_message: None,
            show_help: false,
            confirm: None,
            keybindings,
        }
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight > 0
    }

    pub fn bulk_running(&self) -> bool {
        self.bulk_pending.load(Ordering::Acquire)
    }

    /// Record an outgoing interpreter command and reserve its ticket.
    pub fn start_command(&mut self, text: &str) -> Ticket {
        let text = text.trim().to_string();
        self.recent_commands.retain(|c| c != &text);
        self.recent_commands.insert(0, text);
        self.recent_commands.truncate(RECENT_LIMIT);

        self.start_request();
        self.store.issue()
    }

    /// Record any other outgoing request.
    pub fn start_request(&mut self) {
        self.in_flight += 1;
        self.status_message = Some("Processing...".to_string());
    }

    fn finish_request(&mut self) {
        self.in_flight = self.in_flight.saturating_sub(1);
        if self.in_flight == 0 {
            self.status_message = None;
        }
    }

    /// Set an error message.
    pub fn set_error(&mut self, message: &str) {
        self.error_message = Some(message.to_string());
    }

    /// Clear error message.
    pub fn clear_error(&mut self) {
        self.error_message = None;
    }

    pub fn set_status(&mut self, message: &str) {
        self.status_message = Some(message.to_string());
    }

    /// Validation failures block with a popup; everything else is output.
    pub fn show_error(&mut self, err: &AppError) {
        if err.is_validation() {
            self.set_error(&err.to_string());
        } else {
            warn!("{}", err);
            self.output = vec![err.to_string()];
        }
    }

    /// Apply a message from a background request.
    pub fn apply(&mut self, message: TaskMessage) {
        match message {
            TaskMessage::Command { ticket, outcome } => {
                self.finish_request();
                match outcome {
                    Ok(result) => self.show_result(ticket, &result),
                    Err(err) => self.show_error(&err),
                }
            }
            TaskMessage::Bulk { outcome, guard } => {
                self.finish_request();
                match outcome {
                    Ok(report) => self.output = bulk_report_lines(&report),
                    Err(err) => self.show_error(&err),
                }
                drop(guard);
            }
            TaskMessage::BulkAdd {
                ticket,
                outcome,
                guard,
            } => {
                self.finish_request();
                match outcome {
                    Ok(result) => self.show_result(ticket, &result),
                    Err(err) => self.show_error(&err),
                }
                drop(guard);
            }
            TaskMessage::Notice(outcome) => {
                self.finish_request();
                match outcome {
                    Ok(text) => self.output = vec![text],
                    Err(err) => self.show_error(&err),
                }
            }
            TaskMessage::Categorized(outcome) => {
                self.finish_request();
                match outcome {
                    Ok(outcome) if outcome.success => self.output = vec![outcome.message],
                    Ok(outcome) => {
                        warn!("Auto-categorize failed: {}", outcome.message);
                        self.set_error(&format!("Auto-categorize failed: {}", outcome.message));
                    }
                    Err(err) => self.show_error(&err),
                }
            }
            TaskMessage::Progress(outcome) => match outcome {
                Ok(text) => self.progress = Some(text),
                Err(err) => debug!("Progress poll failed: {}", err),
            },
        }
    }

    fn show_result(&mut self, ticket: Ticket, result: &CommandResult) {
        if result.has_candidates() {
            if !self.store.replace_if_current(ticket, result) {
                return;
            }
            if self.confirm.take().is_some() {
                self.set_status("List changed; bulk action cancelled");
            }
            self.screen = Screen::Candidates;
            self.focus = Focus::Main;
            self.table_state
                .select(if self.store.is_empty() { None } else { Some(0) });
        }

        self.output = result_lines(result);
        let ambiguous = self.store.ambiguous_options();
        if result.has_candidates() && !ambiguous.is_empty() {
            let listed: Vec<String> = ambiguous.iter().map(u32::to_string).collect();
            self.output.push(format!(
                "Warning: option numbers repeated in this list: {}",
                listed.join(", ")
            ));
        }
    }

    /// Index under the cursor, if the list is non-empty.
    pub fn cursor(&self) -> Option<usize> {
        self.table_state.selected().filter(|i| *i < self.store.len())
    }

    /// Handle keyboard input and return an action.
    pub fn handle_input(&mut self, key: KeyEvent) -> Action {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.should_quit = true;
            return Action::Quit;
        }

        // Any key dismisses the error popup
        if self.error_message.is_some() {
            self.clear_error();
            return Action::None;
        }

        if self.show_help {
            if key.code == KeyCode::Esc
                || self.keybindings.matches(&self.keybindings.help, &key)
                || self.keybindings.matches(&self.keybindings.quit, &key)
            {
                self.show_help = false;
            }
            return Action::None;
        }

        if self.confirm.is_some() {
            return self.handle_confirm(key);
        }

        if self.input_focused {
            return self.handle_command_input(key);
        }

        if self.keybindings.matches(&self.keybindings.help, &key) {
            self.show_help = true;
            return Action::None;
        }

        if self.keybindings.matches(&self.keybindings.command, &key) {
            self.input_focused = true;
            return Action::None;
        }

        if self
            .keybindings
            .matches(&self.keybindings.toggle_focus, &key)
        {
            self.focus = match self.focus {
                Focus::Sidebar => Focus::Main,
                Focus::Main => Focus::Sidebar,
            };
            if self.focus == Focus::Sidebar
                && self.recent_list_state.selected().is_none()
                && !self.recent_commands.is_empty()
            {
                self.recent_list_state.select(Some(0));
            }
            return Action::None;
        }

        if self.keybindings.matches(&self.keybindings.quit, &key) {
            self.should_quit = true;
            return Action::Quit;
        }
        if self.keybindings.matches(&self.keybindings.wake, &key) {
            return Action::Wake;
        }
        if self.keybindings.matches(&self.keybindings.stop_recording, &key) {
            return Action::StopRecording;
        }
        if self.keybindings.matches(&self.keybindings.categorize, &key) {
            return Action::Categorize;
        }

        if self.focus == Focus::Sidebar {
            return self.handle_sidebar_input(key);
        }

        match self.screen {
            Screen::Home => Action::None,
            Screen::Candidates => self.handle_candidates_input(key),
        }
    }

    fn handle_command_input(&mut self, key: KeyEvent) -> Action {
        match key.code {
            KeyCode::Enter => {
                let command = self.command_input.trim().to_string();
                self.command_input.clear();
                if command.is_empty() {
                    self.input_focused = false;
                    Action::None
                } else {
                    Action::Send(command)
                }
            }
            KeyCode::Char(c) => {
                self.command_input.push(c);
                Action::None
            }
            KeyCode::Backspace => {
                self.command_input.pop();
                Action::None
            }
            KeyCode::Esc => {
                self.command_input.clear();
                self.input_focused = false;
                Action::None
            }
            KeyCode::Tab => {
                self.input_focused = false;
                Action::None
            }
            _ => Action::None,
        }
    }

    fn handle_sidebar_input(&mut self, key: KeyEvent) -> Action {
        if self.keybindings.matches(&self.keybindings.up, &key) {
            let i = self.recent_list_state.selected().unwrap_or(0);
            if i > 0 {
                self.recent_list_state.select(Some(i - 1));
            }
            Action::None
        } else if self.keybindings.matches(&self.keybindings.down, &key) {
            let i = self.recent_list_state.selected().unwrap_or(0);
            if i < self.recent_commands.len().saturating_sub(1) {
                self.recent_list_state.select(Some(i + 1));
            }
            Action::None
        } else if self.keybindings.matches(&self.keybindings.select, &key) {
            match self
                .recent_list_state
                .selected()
                .and_then(|i| self.recent_commands.get(i))
            {
                Some(command) => {
                    let command = command.clone();
                    self.focus = Focus::Main;
                    Action::Send(command)
                }
                None => Action::None,
            }
        } else {
            Action::None
        }
    }

    fn handle_candidates_input(&mut self, key: KeyEvent) -> Action {
        let len = self.store.len();

        if self.keybindings.matches(&self.keybindings.up, &key) {
            let i = self.table_state.selected().unwrap_or(0);
            if i > 0 {
                self.table_state.select(Some(i - 1));
            }
            Action::None
        } else if self.keybindings.matches(&self.keybindings.down, &key) {
            let i = self.table_state.selected().unwrap_or(0);
            if i < len.saturating_sub(1) {
                self.table_state.select(Some(i + 1));
            }
            Action::None
        } else if self.keybindings.matches(&self.keybindings.toggle, &key) {
            if let Some(i) = self.cursor() {
                SelectionController::new(&mut self.store).toggle(i);
            }
            Action::None
        } else if self.keybindings.matches(&self.keybindings.select_all, &key) {
            SelectionController::new(&mut self.store).select_all();
            Action::None
        } else if self.keybindings.matches(&self.keybindings.deselect_all, &key) {
            SelectionController::new(&mut self.store).deselect_all();
            Action::None
        } else if self.keybindings.matches(&self.keybindings.select, &key) {
            self.handle_select()
        } else if self
            .keybindings
            .matches(&self.keybindings.record_recurring, &key)
        {
            match (self.store.active(), self.cursor()) {
                (ActiveCandidates::Recordings(_), Some(i)) => match self.store.option_at(i) {
                    Some(option) => self.option_action(OptionCommand::RecordRecurring(option)),
                    None => Action::None,
                },
                _ => Action::None,
            }
        } else if self.keybindings.matches(&self.keybindings.bulk, &key) {
            self.request_bulk()
        } else if self.keybindings.matches(&self.keybindings.back, &key) {
            self.screen = Screen::Home;
            Action::None
        } else {
            Action::None
        }
    }

    fn handle_select(&mut self) -> Action {
        let Some(i) = self.cursor() else {
            return Action::None;
        };
        match self.store.active() {
            ActiveCandidates::Episodes(_) => {
                SelectionController::new(&mut self.store).toggle(i);
                Action::None
            }
            ActiveCandidates::Torrents(_) => match self.store.option_at(i) {
                Some(option) => self.option_action(OptionCommand::Download(option)),
                None => Action::None,
            },
            ActiveCandidates::Recordings(_) => match self.store.option_at(i) {
                Some(option) => self.option_action(OptionCommand::Record(option)),
                None => Action::None,
            },
            ActiveCandidates::Empty => Action::None,
        }
    }

    /// Refuse option commands the active list cannot resolve unambiguously.
    fn option_action(&mut self, command: OptionCommand) -> Action {
        match self.store.check_unambiguous(&command.options()) {
            Ok(()) => Action::Option(command),
            Err(err) => {
                self.show_error(&err);
                Action::None
            }
        }
    }

    fn request_bulk(&mut self) -> Action {
        if self.bulk_running() {
            self.set_status("A bulk action is already running");
            return Action::None;
        }

        match self.store.active() {
            ActiveCandidates::Episodes(_) => {
                let episodes = self.store.selected_episodes();
                if episodes.is_empty() {
                    self.set_error("No episodes selected");
                } else {
                    self.confirm = Some(PendingConfirm::BulkDownload(episodes));
                }
            }
            ActiveCandidates::Torrents(_) => {
                let options = self.store.selected_torrent_options();
                if options.is_empty() {
                    self.set_error("No torrents selected");
                } else if let Err(err) = self.store.check_unambiguous(&options) {
                    self.show_error(&err);
                } else {
                    self.confirm = Some(PendingConfirm::BulkAddTorrents(options));
                }
            }
            ActiveCandidates::Recordings(_) | ActiveCandidates::Empty => {
                self.set_status("Bulk actions apply to episodes and torrents");
            }
        }
        Action::None
    }

    fn handle_confirm(&mut self, key: KeyEvent) -> Action {
        match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => {
                match self.confirm.take() {
                    Some(PendingConfirm::BulkDownload(episodes)) => {
                        Action::BulkDownload(episodes)
                    }
                    Some(PendingConfirm::BulkAddTorrents(options)) => {
                        Action::BulkAddTorrents(options)
                    }
                    None => Action::None,
                }
            }
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                self.confirm = None;
                Action::None
            }
            _ => Action::None,
        }
    }
}
