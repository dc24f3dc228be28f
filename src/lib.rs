//! A terminal console for a home-media DVR server.
//!
//! dvr-console sends free-text commands ("download season 2 of ...",
//! "record the news tonight") to the server's interpreter and turns its
//! loosely shaped replies into interactive picking: episode lists for bulk
//! download, torrent search hits, and broadcast slots to record.
//!
//! # Features
//!
//! - Classify interpreter replies into a typed [`classify::CommandResult`]
//! - Select candidates and send follow-up `option` commands
//! - Bulk episode download and multi-torrent add with per-item results
//! - Wake-on-LAN, manual and scheduled recording, progress polling
//!
//! # Usage
//!
//! ```bash
//! # Interactive console against the default server
//! cargo run
//!
//! # One-shot command
//! cargo run -- --server http://dvr.lan:5000 send "search for big buck bunny"
//! ```

pub mod api;
pub mod bulk;
pub mod candidates;
pub mod classify;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod format;
pub mod tui;
pub mod types;
pub mod view;
