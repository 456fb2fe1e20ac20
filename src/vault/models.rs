use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;
use strum_macros::{Display, EnumIter, EnumString};

use super::errors::VaultError;

/// Server decision for a play
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Verdict {
    Win,
    Lose,
}

impl Verdict {
    pub fn is_win(self) -> bool {
        self == Verdict::Win
    }
}

/// A validated player name: a first name plus a last initial
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerName {
    first: String,
    initial: char,
}

impl PlayerName {
    /// Validates and normalizes the two name inputs
    ///
    /// The first name must be ASCII letters only and the last initial a
    /// single ASCII letter; surrounding whitespace is ignored.
    pub fn parse(first: &str, last_initial: &str) -> Result<Self, VaultError> {
        let first = first.trim();
        if first.is_empty() || !first.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(VaultError::InvalidFirstName);
        }

        let mut initial_chars = last_initial.trim().chars();
        let initial = match (initial_chars.next(), initial_chars.next()) {
            (Some(c), None) if c.is_ascii_alphabetic() => c.to_ascii_uppercase(),
            _ => return Err(VaultError::InvalidLastInitial),
        };

        let mut normalized = first.to_ascii_lowercase();
        normalized[..1].make_ascii_uppercase();

        Ok(Self {
            first: normalized,
            initial,
        })
    }

    pub fn first(&self) -> &str {
        &self.first
    }

    pub fn initial(&self) -> char {
        self.initial
    }
}

impl fmt::Display for PlayerName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.first, self.initial)
    }
}

/// Marker kept in persistent storage once a device has played
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayRecord {
    pub result: Verdict,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub claim_code: Option<String>,
    pub name: String,
    pub device_id: String,
    /// Missing on records written by older clients
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub played_at: Option<DateTime<Utc>>,
}

impl PlayRecord {
    /// Builds the record for a verdict; the claim code is kept for wins only
    pub fn new(response: &PlayResponse, name: &PlayerName, device_id: &str) -> Self {
        let result = response.verdict();
        Self {
            result,
            claim_code: if result.is_win() {
                response.claim_code.clone()
            } else {
                None
            },
            name: name.to_string(),
            device_id: device_id.to_string(),
            played_at: Some(Utc::now()),
        }
    }
}

/// Body returned by the endpoint for a `play` action
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayResponse {
    #[serde(default, deserialize_with = "lenient_verdict")]
    pub result: Option<Verdict>,
    #[serde(default)]
    pub claim_code: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl PlayResponse {
    /// Anything other than an explicit win counts as a loss
    pub fn verdict(&self) -> Verdict {
        self.result.unwrap_or(Verdict::Lose)
    }
}

/// Reads any result other than `"win"` as a loss
fn lenient_verdict<'de, D>(deserializer: D) -> Result<Option<Verdict>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(raw.map(|value| {
        if value == "win" {
            Verdict::Win
        } else {
            Verdict::Lose
        }
    }))
}

/// What a returning visitor should see
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VaultStatus {
    /// The promotion is over
    Closed,
    /// This device already has a verdict
    AlreadyPlayed(PlayRecord),
    Ready,
}
