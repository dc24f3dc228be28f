//! Sending commands to the interpreter.

use crate::api::Transport;
use crate::classify::{CommandResult, classify_response};
use crate::error::{AppError, Result};
use log::{debug, info};
use serde_json::json;
use std::fmt;

/// A follow-up command that references candidates by option number.
///
/// The `Display` form is the exact text the interpreter resolves.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OptionCommand {
    Download(u32),
    DownloadMany(Vec<u32>),
    Record(u32),
    RecordRecurring(u32),
}

impl OptionCommand {
    /// Option numbers this command names.
    pub fn options(&self) -> Vec<u32> {
        match self {
            OptionCommand::Download(n)
            | OptionCommand::Record(n)
            | OptionCommand::RecordRecurring(n) => vec![*n],
            OptionCommand::DownloadMany(ns) => ns.clone(),
        }
    }
}

impl fmt::Display for OptionCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionCommand::Download(n) => write!(f, "download option {}", n),
            OptionCommand::DownloadMany(ns) => {
                let joined = ns.iter().map(u32::to_string).collect::<Vec<_>>().join(",");
                write!(f, "download options {}", joined)
            }
            OptionCommand::Record(n) => write!(f, "record option {}", n),
            OptionCommand::RecordRecurring(n) => write!(f, "record recurring option {}", n),
        }
    }
}

/// Sends command text to `/nlp_command` and classifies the reply.
#[derive(Clone, Debug)]
pub struct CommandDispatcher<T> {
    transport: T,
}

impl<T: Transport> CommandDispatcher<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Send free text.
    ///
    /// A transport failure is an `Err`; an error payload from the server is
    /// `Ok(CommandResult::Failed)`.
    pub async fn send(&self, command: &str) -> Result<CommandResult> {
        let command = command.trim();
        if command.is_empty() {
            return Err(AppError::validation("Enter a command first"));
        }

        info!("Sending command: {}", command);
        let body = self
            .transport
            .post_json("/nlp_command", &json!({ "command": command }))
            .await?;
        let result = classify_response(&body);
        debug!("Command '{}' classified as {}", command, result.kind());
        Ok(result)
    }

    pub async fn send_option(&self, command: &OptionCommand) -> Result<CommandResult> {
        if command.options().is_empty() {
            return Err(AppError::validation("No options selected"));
        }
        self.send(&command.to_string()).await
    }
}
