//! The active candidate collection and its selection flags.
//!
//! A [`CandidateStore`] holds at most one collection (episodes, torrents or
//! recording slots). Each classified reply that carries candidates replaces
//! it wholesale, dropping every earlier selection flag. Replies are fenced by
//! [`Ticket`]s so a slow, older request cannot overwrite a newer result.

use crate::classify::CommandResult;
use crate::error::{AppError, Result};
use crate::types::{Episode, RecordCandidate, TorrentCandidate};
use log::{debug, warn};
use std::collections::HashMap;

/// Items plus one selection flag per item.
#[derive(Clone, Debug, PartialEq)]
pub struct CandidateList<T> {
    items: Vec<T>,
    flags: Vec<bool>,
}

impl<T> CandidateList<T> {
    /// All items start unselected.
    pub fn new(items: Vec<T>) -> Self {
        let flags = vec![false; items.len()];
        Self { items, flags }
    }

    /// Items with initial flags; missing flags default to unselected.
    pub fn with_flags(items: Vec<T>, mut flags: Vec<bool>) -> Self {
        flags.resize(items.len(), false);
        Self { items, flags }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.items.get(index)
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    /// Items paired with their flags, in order.
    pub fn iter(&self) -> impl Iterator<Item = (&T, bool)> {
        self.items.iter().zip(self.flags.iter().copied())
    }

    /// Flip one flag. Out-of-range indices are ignored.
    pub fn toggle(&mut self, index: usize) {
        if let Some(flag) = self.flags.get_mut(index) {
            *flag = !*flag;
        }
    }

    pub fn set_all(&mut self, selected: bool) {
        self.flags.iter_mut().for_each(|f| *f = selected);
    }

    /// Selected items in original order.
    ///
    /// The iterator is lazy and `Clone`, so it can be walked more than once.
    pub fn selected(&self) -> impl Iterator<Item = &T> + Clone {
        self.items
            .iter()
            .zip(self.flags.iter())
            .filter(|(_, flag)| **flag)
            .map(|(item, _)| item)
    }

    pub fn selected_count(&self) -> usize {
        self.flags.iter().filter(|f| **f).count()
    }
}

/// The one collection currently on screen.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum ActiveCandidates {
    #[default]
    Empty,
    Episodes(CandidateList<Episode>),
    Torrents(CandidateList<TorrentCandidate>),
    Recordings(CandidateList<RecordCandidate>),
}

/// Monotonic request number handed out before a command is sent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct Ticket(u64);

/// Holder of the active candidate collection.
#[derive(Debug, Default)]
pub struct CandidateStore {
    active: ActiveCandidates,
    message: String,
    issued: u64,
    applied: u64,
}

impl CandidateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active(&self) -> &ActiveCandidates {
        &self.active
    }

    /// Message of the reply that produced the active collection.
    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn len(&self) -> usize {
        match &self.active {
            ActiveCandidates::Empty => 0,
            ActiveCandidates::Episodes(list) => list.len(),
            ActiveCandidates::Torrents(list) => list.len(),
            ActiveCandidates::Recordings(list) => list.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn selected_count(&self) -> usize {
        match &self.active {
            ActiveCandidates::Empty => 0,
            ActiveCandidates::Episodes(list) => list.selected_count(),
            ActiveCandidates::Torrents(list) => list.selected_count(),
            ActiveCandidates::Recordings(list) => list.selected_count(),
        }
    }

    /// Reserve the next ticket for an outgoing command.
    pub fn issue(&mut self) -> Ticket {
        self.issued += 1;
        Ticket(self.issued)
    }

    /// Whether a reply for `ticket` would be discarded.
    pub fn is_stale(&self, ticket: Ticket) -> bool {
        ticket.0 <= self.applied
    }

    /// Swap in the collection carried by `result`, if any.
    ///
    /// Returns whether the store changed. Replies without candidates leave
    /// the active collection in place.
    pub fn replace(&mut self, result: &CommandResult) -> bool {
        let (message, active) = match result {
            CommandResult::EpisodeList { message, episodes } => {
                let flags = episodes.iter().map(|e| e.selected).collect();
                (
                    message,
                    ActiveCandidates::Episodes(CandidateList::with_flags(episodes.clone(), flags)),
                )
            }
            CommandResult::TorrentSearch {
                message, torrents, ..
            } => (
                message,
                ActiveCandidates::Torrents(CandidateList::new(torrents.clone())),
            ),
            CommandResult::RecordCandidates {
                message,
                candidates,
            } => (
                message,
                ActiveCandidates::Recordings(CandidateList::new(candidates.clone())),
            ),
            CommandResult::DownloadStarted { .. }
            | CommandResult::BulkDownloadResult { .. }
            | CommandResult::RecordScheduled { .. }
            | CommandResult::RecurringRuleCreated { .. }
            | CommandResult::Failed { .. }
            | CommandResult::Plain { .. } => return false,
        };

        self.message = message.clone();
        self.active = active;

        let duplicates = self.ambiguous_options();
        if !duplicates.is_empty() {
            warn!("Reply repeats option numbers {:?}", duplicates);
        }
        true
    }

    /// Like [`replace`](Self::replace), but only for the newest ticket seen.
    ///
    /// A candidate reply whose ticket is older than the last applied one is
    /// dropped and `false` is returned.
    pub fn replace_if_current(&mut self, ticket: Ticket, result: &CommandResult) -> bool {
        if !result.has_candidates() {
            return false;
        }
        if self.is_stale(ticket) {
            debug!(
                "Dropping stale {} reply (ticket {:?}, applied {})",
                result.kind(),
                ticket,
                self.applied
            );
            return false;
        }
        self.applied = ticket.0;
        self.replace(result)
    }

    /// Option number of the item at `index`, for torrent and recording lists.
    pub fn option_at(&self, index: usize) -> Option<u32> {
        match &self.active {
            ActiveCandidates::Torrents(list) => list.get(index).map(|t| t.option),
            ActiveCandidates::Recordings(list) => list.get(index).map(|r| r.option),
            ActiveCandidates::Episodes(_) | ActiveCandidates::Empty => None,
        }
    }

    /// Option numbers of the selected torrents, in list order.
    pub fn selected_torrent_options(&self) -> Vec<u32> {
        match &self.active {
            ActiveCandidates::Torrents(list) => list.selected().map(|t| t.option).collect(),
            _ => Vec::new(),
        }
    }

    /// Selected episodes, in list order.
    pub fn selected_episodes(&self) -> Vec<Episode> {
        match &self.active {
            ActiveCandidates::Episodes(list) => list.selected().cloned().collect(),
            _ => Vec::new(),
        }
    }

    /// Option numbers that occur more than once in the active list.
    pub fn ambiguous_options(&self) -> Vec<u32> {
        let options: Vec<u32> = match &self.active {
            ActiveCandidates::Torrents(list) => list.items().iter().map(|t| t.option).collect(),
            ActiveCandidates::Recordings(list) => list.items().iter().map(|r| r.option).collect(),
            ActiveCandidates::Episodes(_) | ActiveCandidates::Empty => return Vec::new(),
        };

        let mut counts: HashMap<u32, usize> = HashMap::new();
        for option in &options {
            *counts.entry(*option).or_default() += 1;
        }
        let mut duplicates: Vec<u32> = counts
            .into_iter()
            .filter(|(_, n)| *n > 1)
            .map(|(option, _)| option)
            .collect();
        duplicates.sort_unstable();
        duplicates
    }

    /// Refuse follow-up commands naming an option the list repeats.
    pub fn check_unambiguous(&self, options: &[u32]) -> Result<()> {
        let ambiguous = self.ambiguous_options();
        match options.iter().find(|o| ambiguous.contains(o)) {
            Some(option) => Err(AppError::validation(format!(
                "Option {} appears more than once in this list; run the search again",
                option
            ))),
            None => Ok(()),
        }
    }
}

/// Select-all / deselect-all / toggle over a borrowed store.
pub struct SelectionController<'a> {
    store: &'a mut CandidateStore,
}

impl<'a> SelectionController<'a> {
    pub fn new(store: &'a mut CandidateStore) -> Self {
        Self { store }
    }

    /// Flip one item's flag; out-of-range is a no-op.
    pub fn toggle(&mut self, index: usize) {
        match &mut self.store.active {
            ActiveCandidates::Empty => {}
            ActiveCandidates::Episodes(list) => list.toggle(index),
            ActiveCandidates::Torrents(list) => list.toggle(index),
            ActiveCandidates::Recordings(list) => list.toggle(index),
        }
    }

    pub fn set_all(&mut self, selected: bool) {
        match &mut self.store.active {
            ActiveCandidates::Empty => {}
            ActiveCandidates::Episodes(list) => list.set_all(selected),
            ActiveCandidates::Torrents(list) => list.set_all(selected),
            ActiveCandidates::Recordings(list) => list.set_all(selected),
        }
    }

    pub fn select_all(&mut self) {
        self.set_all(true);
    }

    pub fn deselect_all(&mut self) {
        self.set_all(false);
    }
}
