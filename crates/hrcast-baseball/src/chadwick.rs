// Player directory backed by the Chadwick Bureau person register.
//
// The register is published as sixteen CSV shards (`people-0.csv` ..
// `people-f.csv`). They are downloaded once per client on the first search and
// kept in memory for the rest of the run.

use std::io::Read;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::error::{get_text, ProviderError};
use crate::player::{NameQuery, PlayerDirectory, PlayerId};

const SHARD_SUFFIXES: &str = "0123456789abcdef";

/// One person in the register that has an MLBAM id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterEntry {
    pub first: String,
    pub last: String,
    pub mlbam: PlayerId,
}

impl RegisterEntry {
    fn matches(&self, query: &NameQuery) -> bool {
        if !self.last.eq_ignore_ascii_case(&query.last) {
            return false;
        }
        match &query.first {
            Some(first) => self.first.eq_ignore_ascii_case(first),
            None => true,
        }
    }
}

/// Raw register CSV row. Only the columns used for lookup are read; the
/// register's many other id columns are ignored.
#[derive(Debug, Deserialize)]
struct RawPerson {
    #[serde(default, deserialize_with = "csv::invalid_option")]
    key_mlbam: Option<u32>,
    #[serde(default)]
    name_first: String,
    #[serde(default)]
    name_last: String,
}

/// HTTP client for the Chadwick register.
pub struct ChadwickRegister {
    http: reqwest::Client,
    base_url: String,
    entries: OnceCell<Vec<RegisterEntry>>,
}

impl ChadwickRegister {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            entries: OnceCell::new(),
        }
    }

    /// Build a register from already-loaded entries (no network access).
    pub fn preloaded(entries: Vec<RegisterEntry>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: String::new(),
            entries: OnceCell::new_with(Some(entries)),
        }
    }

    fn shard_urls(&self) -> Vec<String> {
        SHARD_SUFFIXES
            .chars()
            .map(|c| format!("{}/people-{c}.csv", self.base_url))
            .collect()
    }

    async fn load(&self) -> Result<Vec<RegisterEntry>, ProviderError> {
        let mut entries = Vec::new();
        for url in self.shard_urls() {
            debug!(%url, "downloading register shard");
            let body = get_text(self.http.get(&url), &url).await?;
            let mut shard = parse_register(body.as_bytes()).map_err(|e| ProviderError::Csv {
                url: url.clone(),
                source: e,
            })?;
            entries.append(&mut shard);
        }
        info!("Loaded {} register entries with MLBAM ids", entries.len());
        Ok(entries)
    }
}

#[async_trait]
impl PlayerDirectory for ChadwickRegister {
    async fn search(&self, query: &NameQuery) -> Result<Vec<PlayerId>, ProviderError> {
        let entries = self.entries.get_or_try_init(|| self.load()).await?;
        Ok(search_entries(entries, query))
    }
}

/// Ids of all entries matching `query`, in register order.
pub fn search_entries(entries: &[RegisterEntry], query: &NameQuery) -> Vec<PlayerId> {
    entries
        .iter()
        .filter(|e| e.matches(query))
        .map(|e| e.mlbam)
        .collect()
}

/// Parse one register CSV shard, keeping only people with an MLBAM id.
pub fn parse_register<R: Read>(rdr: R) -> Result<Vec<RegisterEntry>, csv::Error> {
    let mut reader = csv::Reader::from_reader(rdr);
    let mut entries = Vec::new();
    for result in reader.deserialize::<RawPerson>() {
        match result {
            Ok(raw) => {
                let Some(id) = raw.key_mlbam else {
                    continue;
                };
                entries.push(RegisterEntry {
                    first: raw.name_first.trim().to_string(),
                    last: raw.name_last.trim().to_string(),
                    mlbam: PlayerId(id),
                });
            }
            Err(e) => {
                warn!("skipping malformed register row: {}", e);
            }
        }
    }
    Ok(entries)
}
