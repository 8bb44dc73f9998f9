//! Companion links: the episode-scoped handle a patient's companion session is addressed by.

use crate::{CompanionError, CompanionResult};
use chrono::{DateTime, Utc};
use companion_types::CareRequestId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use uuid::Uuid;

/// Identifier of a companion link.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LinkId(Uuid);

impl LinkId {
    /// Generate a fresh random link id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse a link id from its hyphenated or simple UUID form.
    ///
    /// # Errors
    ///
    /// Returns `CompanionError::CompanionLinkNotFound` if `input` is not a UUID. A link id that
    /// cannot be parsed cannot name an existing link.
    pub fn parse(input: &str) -> CompanionResult<Self> {
        Uuid::parse_str(input.trim())
            .map(Self)
            .map_err(|_| CompanionError::CompanionLinkNotFound(input.to_string()))
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// Sharded directory for this link under `parent_dir`.
    ///
    /// Uses the first four hex characters of the simple form as two shard levels:
    /// `parent_dir/ab/cd/abcd.../`.
    pub fn sharded_dir(&self, parent_dir: &Path) -> PathBuf {
        let canonical = self.0.simple().to_string();
        let s1 = &canonical[0..2];
        let s2 = &canonical[2..4];
        parent_dir.join(s1).join(s2).join(&canonical)
    }
}

impl Default for LinkId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for LinkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

impl FromStr for LinkId {
    type Err = CompanionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// A companion link for one care request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanionLink {
    pub id: LinkId,
    pub care_request_id: CareRequestId,
    pub created_at: DateTime<Utc>,
}

impl CompanionLink {
    pub fn new(care_request_id: CareRequestId) -> Self {
        Self {
            id: LinkId::new(),
            care_request_id,
            created_at: Utc::now(),
        }
    }
}
