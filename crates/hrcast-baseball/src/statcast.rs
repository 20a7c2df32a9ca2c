// Batted-ball event retrieval from Baseball Savant's Statcast search.
//
// The search endpoint returns one CSV row per pitch for the batter over the
// requested date range. Rows are passed through unfiltered; columns this crate
// does not read are ignored and optional columns may be missing entirely.

use std::io::Read;

use async_trait::async_trait;
use chrono::{Duration, Local, NaiveDate};
use serde::{Deserialize, Deserializer};
use tracing::{debug, warn};

use crate::error::{get_text, ProviderError};
use crate::player::PlayerId;

/// Longest lookback accepted from config or the command line.
pub const MAX_WINDOW_DAYS: u32 = 3650;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// One Statcast row for a batter.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct BattedBallEvent {
    /// Vertical launch angle in degrees.
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub launch_angle: Option<f64>,
    /// Exit velocity in mph.
    #[serde(
        default,
        alias = "exit_velocity",
        deserialize_with = "csv::invalid_option"
    )]
    pub launch_speed: Option<f64>,
    /// Horizontal hit coordinate on Savant's spray chart.
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub hc_x: Option<f64>,
    #[serde(default, deserialize_with = "flag")]
    pub barrel: Option<bool>,
    #[serde(default, deserialize_with = "flag")]
    pub pull: Option<bool>,
}

/// All events for one player over one date window.
#[derive(Debug, Clone, PartialEq)]
pub struct BattedBallSample {
    pub player_id: PlayerId,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub events: Vec<BattedBallEvent>,
}

impl BattedBallSample {
    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

/// Accept `1`/`0`, `1.0`/`0.0` and `true`/`false`; anything else reads as absent.
fn flag<'de, D: Deserializer<'de>>(de: D) -> Result<Option<bool>, D::Error> {
    let raw: Option<String> = Option::deserialize(de)?;
    Ok(raw.and_then(|s| match s.trim().to_ascii_lowercase().as_str() {
        "true" => Some(true),
        "false" => Some(false),
        other => other.parse::<f64>().ok().map(|v| v >= 0.5),
    }))
}

// ---------------------------------------------------------------------------
// Statistics API seam
// ---------------------------------------------------------------------------

#[async_trait]
pub trait StatcastApi: Send + Sync {
    /// All Statcast rows for `player` between `start` and `end` inclusive.
    async fn batter_events(
        &self,
        player: PlayerId,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<BattedBallEvent>, ProviderError>;
}

/// Baseball Savant CSV search client.
pub struct BaseballSavant {
    http: reqwest::Client,
    search_url: String,
}

impl BaseballSavant {
    pub fn new(http: reqwest::Client, search_url: impl Into<String>) -> Self {
        Self {
            http,
            search_url: search_url.into(),
        }
    }

    fn query(player: PlayerId, start: NaiveDate, end: NaiveDate) -> Vec<(&'static str, String)> {
        vec![
            ("all", "true".into()),
            ("type", "details".into()),
            ("player_type", "batter".into()),
            ("batters_lookup[]", player.to_string()),
            ("game_date_gt", start.format("%Y-%m-%d").to_string()),
            ("game_date_lt", end.format("%Y-%m-%d").to_string()),
            ("hfGT", "R|PO|S|".into()),
            ("group_by", "name".into()),
            ("sort_col", "pitches".into()),
            ("sort_order", "desc".into()),
            ("min_pitches", "0".into()),
            ("min_results", "0".into()),
            ("min_abs", "0".into()),
        ]
    }
}

#[async_trait]
impl StatcastApi for BaseballSavant {
    async fn batter_events(
        &self,
        player: PlayerId,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<BattedBallEvent>, ProviderError> {
        let request = self
            .http
            .get(&self.search_url)
            .query(&Self::query(player, start, end));
        debug!(%player, %start, %end, "requesting statcast events");
        let body = get_text(request, &self.search_url).await?;
        parse_events(body.as_bytes()).map_err(|e| ProviderError::Csv {
            url: self.search_url.clone(),
            source: e,
        })
    }
}

/// Parse a Savant CSV export. Malformed rows are skipped with a warning; a
/// missing or unreadable header is an error.
pub fn parse_events<R: Read>(rdr: R) -> Result<Vec<BattedBallEvent>, csv::Error> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(rdr);

    // Savant prefixes the export with a UTF-8 byte order mark.
    let headers = reader.headers()?.clone();
    let has_bom = headers.get(0).is_some_and(|h| h.starts_with('\u{feff}'));
    if has_bom {
        let fixed: Vec<String> = headers
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').to_string())
            .collect();
        reader.set_headers(csv::StringRecord::from(fixed));
    }

    let mut events = Vec::new();
    for result in reader.deserialize::<BattedBallEvent>() {
        match result {
            Ok(event) => events.push(event),
            Err(e) => warn!("skipping malformed statcast row: {}", e),
        }
    }
    Ok(events)
}

// ---------------------------------------------------------------------------
// Fetcher
// ---------------------------------------------------------------------------

/// Computes the lookback window and fetches a player's sample.
pub struct BattedBallFetcher<S> {
    api: S,
}

impl<S: StatcastApi> BattedBallFetcher<S> {
    pub fn new(api: S) -> Self {
        Self { api }
    }

    pub fn api(&self) -> &S {
        &self.api
    }

    /// Events over the `window_days` days ending today.
    pub async fn fetch_events(
        &self,
        player: PlayerId,
        window_days: u32,
    ) -> Result<BattedBallSample, ProviderError> {
        self.fetch_events_ending(player, window_days, Local::now().date_naive())
            .await
    }

    /// Events over the `window_days` days ending on `end`.
    pub async fn fetch_events_ending(
        &self,
        player: PlayerId,
        window_days: u32,
        end: NaiveDate,
    ) -> Result<BattedBallSample, ProviderError> {
        let start = end
            .checked_sub_signed(Duration::days(i64::from(window_days)))
            .ok_or(ProviderError::WindowOutOfRange { window_days, end })?;
        let events = self.api.batter_events(player, start, end).await?;
        debug!(%player, events = events.len(), "fetched statcast sample");
        Ok(BattedBallSample {
            player_id: player,
            start,
            end,
            events,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
