//! Monitoring events handed to the mailer by the host pipeline.
//!
//! `Event` is the flat, typed record the composer and dispatcher work with.
//! `SensuEvent` mirrors the nested JSON document a Sensu server pipes into
//! its handlers and converts into an `Event`.

use crate::error::InputError;
use serde::Deserialize;
use std::fmt;

/// Whether an event opens an incident or closes it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    #[default]
    Create,
    Resolve,
    Flapping,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Create => "create",
            Action::Resolve => "resolve",
            Action::Flapping => "flapping",
        }
    }

    /// Label used at the start of the subject line.
    pub fn label(&self) -> &'static str {
        match self {
            Action::Resolve => "RESOLVED",
            Action::Create | Action::Flapping => "ALERT",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Event {
    pub client_name: String,
    pub client_address: String,
    pub check_name: String,
    pub check_output: String,
    pub check_command: String,
    pub check_status: String,
    /// Epoch seconds at which the check result was issued.
    pub check_issued: i64,
    pub notification: String,
    pub occurrences: u64,
    pub action: Action,
}

impl Event {
    /// `client/check` identifier used in subjects and log lines.
    pub fn short_name(&self) -> String {
        format!("{}/{}", self.client_name, self.check_name)
    }

    pub fn validate(&self) -> Result<(), InputError> {
        if self.client_name.is_empty() {
            return Err(InputError::MissingField("client.name"));
        }
        if self.check_name.is_empty() {
            return Err(InputError::MissingField("check.name"));
        }
        Ok(())
    }

    /// Parse a Sensu event document.
    #[tracing::instrument(skip_all)]
    pub fn from_json(raw: &str) -> Result<Self, InputError> {
        let sensu: SensuEvent = serde_json::from_str(raw)?;
        Ok(sensu.into())
    }
}

#[derive(Debug, Deserialize)]
pub struct SensuEvent {
    pub client: SensuClient,
    pub check: SensuCheck,
    #[serde(default = "default_occurrences")]
    pub occurrences: u64,
    #[serde(default)]
    pub action: Action,
}

#[derive(Debug, Deserialize)]
pub struct SensuClient {
    pub name: String,
    #[serde(default)]
    pub address: String,
}

#[derive(Debug, Deserialize)]
pub struct SensuCheck {
    pub name: String,
    #[serde(default)]
    pub output: String,
    #[serde(default)]
    pub command: String,
    pub status: CheckStatus,
    pub issued: i64,
    #[serde(default)]
    pub notification: String,
}

/// Sensu reports the check's exit code; other producers send a word.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum CheckStatus {
    Code(i64),
    Text(String),
}

impl fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckStatus::Code(code) => write!(f, "{code}"),
            CheckStatus::Text(text) => f.write_str(text),
        }
    }
}

fn default_occurrences() -> u64 {
    1
}

impl From<SensuEvent> for Event {
    fn from(sensu: SensuEvent) -> Self {
        Event {
            client_name: sensu.client.name,
            client_address: sensu.client.address,
            check_name: sensu.check.name,
            check_output: sensu.check.output,
            check_command: sensu.check.command,
            check_status: sensu.check.status.to_string(),
            check_issued: sensu.check.issued,
            notification: sensu.check.notification,
            occurrences: sensu.occurrences,
            action: sensu.action,
        }
    }
}
