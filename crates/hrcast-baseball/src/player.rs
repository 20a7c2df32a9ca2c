// Player name resolution: free-text name -> MLBAM player id.
//
// Names are first checked against a static override table. Anything else goes
// to an external `PlayerDirectory`. Every directory failure collapses into
// `ResolveError::NotFound`; a batch never aborts because one name is unknown.

use std::collections::HashMap;
use std::fmt;
use std::sync::Mutex;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::error::ProviderError;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Stable numeric player identifier (MLB Advanced Media id).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub u32);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A player name split into the tokens a directory search needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameQuery {
    /// Title-cased first name; `None` for single-token queries.
    pub first: Option<String>,
    /// Title-cased last name (all tokens after the first).
    pub last: String,
}

impl NameQuery {
    /// Split a normalized name into first/last tokens. Returns `None` for an
    /// empty name.
    pub fn from_normalized(normalized: &str) -> Option<Self> {
        let tokens: Vec<String> = normalized.split_whitespace().map(title_case).collect();
        match tokens.as_slice() {
            [] => None,
            [only] => Some(Self {
                first: None,
                last: only.clone(),
            }),
            [first, rest @ ..] => Some(Self {
                first: Some(first.clone()),
                last: rest.join(" "),
            }),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResolveError {
    #[error("player not found: {0}")]
    NotFound(String),
}

// ---------------------------------------------------------------------------
// Directory seam
// ---------------------------------------------------------------------------

/// Name-based player search against an external register.
#[async_trait]
pub trait PlayerDirectory: Send + Sync {
    /// Return the ids of all players matching `query`, in directory order.
    async fn search(&self, query: &NameQuery) -> Result<Vec<PlayerId>, ProviderError>;
}

// ---------------------------------------------------------------------------
// Resolver
// ---------------------------------------------------------------------------

/// Resolves names via the override table, then the directory. Successful
/// directory lookups are memoized for the lifetime of the resolver.
pub struct Resolver<D> {
    overrides: HashMap<String, PlayerId>,
    directory: D,
    resolved: Mutex<HashMap<String, PlayerId>>,
}

impl<D: PlayerDirectory> Resolver<D> {
    pub fn new(overrides: HashMap<String, PlayerId>, directory: D) -> Self {
        let overrides = overrides
            .into_iter()
            .map(|(name, id)| (normalize_name(&name), id))
            .collect();
        Self {
            overrides,
            directory,
            resolved: Mutex::new(HashMap::new()),
        }
    }

    pub fn directory(&self) -> &D {
        &self.directory
    }

    pub async fn resolve(&self, name: &str) -> Result<PlayerId, ResolveError> {
        let normalized = normalize_name(name);

        if let Some(id) = self.overrides.get(&normalized) {
            debug!(name = %normalized, %id, "resolved from override table");
            return Ok(*id);
        }

        if let Some(id) = self.cached(&normalized) {
            return Ok(id);
        }

        let Some(query) = NameQuery::from_normalized(&normalized) else {
            return Err(ResolveError::NotFound(name.to_string()));
        };

        match self.directory.search(&query).await {
            Ok(ids) => match ids.first() {
                Some(id) => {
                    if ids.len() > 1 {
                        debug!(
                            name = %normalized,
                            matches = ids.len(),
                            "multiple directory matches, taking first"
                        );
                    }
                    self.remember(normalized, *id);
                    Ok(*id)
                }
                None => {
                    debug!(name = %normalized, "no directory match");
                    Err(ResolveError::NotFound(name.to_string()))
                }
            },
            Err(e) => {
                warn!("player lookup for '{}' failed: {}", normalized, e);
                Err(ResolveError::NotFound(name.to_string()))
            }
        }
    }

    fn cached(&self, normalized: &str) -> Option<PlayerId> {
        self.resolved
            .lock()
            .ok()
            .and_then(|m| m.get(normalized).copied())
    }

    fn remember(&self, normalized: String, id: PlayerId) {
        if let Ok(mut m) = self.resolved.lock() {
            m.entry(normalized).or_insert(id);
        }
    }
}

// ---------------------------------------------------------------------------
// Name helpers
// ---------------------------------------------------------------------------

/// Trim, collapse internal whitespace, and lowercase a player name.
pub fn normalize_name(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn title_case(token: &str) -> String {
    let mut chars = token.chars();
    match chars.next() {
        Some(c) => {
            let rest: String = chars.flat_map(char::to_lowercase).collect();
            format!("{}{rest}", c.to_uppercase())
        }
        None => String::new(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
