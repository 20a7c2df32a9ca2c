// HR Score: a fixed linear blend of batted-ball rates and environment boosts.
//
// Formula (all percentages on a 0-100 scale, each rounded to 2 decimals first):
//
//   score = barrel% * 0.25 + fly_ball% * 0.15 + pull% * 0.10
//         + fly_ball_ev * 0.15 + pitcher_boost * 0.20
//         + park_boost * 0.10 + weather_boost * 0.05
//
//   park_boost    = park_factor * 10
//   weather_boost = wind * 0.5 + (temp - 70) * 0.25
//
// The sum is rounded to 2 decimals. A named opposing pitcher then applies a
// flat x1.10 placeholder multiplier.

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::ballpark::BallparkTable;
use crate::player::PlayerId;
use crate::statcast::{BattedBallEvent, BattedBallSample};
use crate::weather::Conditions;

// ---------------------------------------------------------------------------
// Weights
// ---------------------------------------------------------------------------

const W_BARREL: f64 = 0.25;
const W_FLY_BALL: f64 = 0.15;
const W_PULL: f64 = 0.10;
const W_FLY_BALL_EV: f64 = 0.15;
const W_PITCHER: f64 = 0.20;
const W_PARK: f64 = 0.10;
const W_WEATHER: f64 = 0.05;

/// Multiplier applied when an opposing pitcher is named.
pub const NAMED_PITCHER_MULTIPLIER: f64 = 1.10;

/// Temperature (°F) at which the weather boost has no temperature component.
const NEUTRAL_TEMP_F: f64 = 70.0;

pub const MAX_PITCHER_BOOST: f64 = 10.0;

// ---------------------------------------------------------------------------
// Environment
// ---------------------------------------------------------------------------

/// Game context shared by every player in a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnvironmentContext {
    pub ballpark: String,
    pub park_factor: f64,
    pub wind_mph: f64,
    pub temp_f: f64,
    /// 0 = elite pitcher, 10 = HR-prone.
    pub pitcher_boost: f64,
    pub pitcher_name: Option<String>,
}

impl EnvironmentContext {
    /// Build a context, looking up the park factor in `ballparks` (1.0 when
    /// unknown). The pitcher boost is clamped into 0..=10 and a blank pitcher
    /// name is treated as absent.
    pub fn new(
        ballparks: &BallparkTable,
        ballpark: &str,
        conditions: Conditions,
        pitcher_boost: f64,
        pitcher_name: Option<String>,
    ) -> Self {
        let clamped = if pitcher_boost.is_finite() {
            pitcher_boost.clamp(0.0, MAX_PITCHER_BOOST)
        } else {
            0.0
        };
        if clamped != pitcher_boost {
            warn!(
                "pitcher boost {} outside 0-10, using {}",
                pitcher_boost, clamped
            );
        }

        Self {
            ballpark: ballpark.trim().to_string(),
            park_factor: ballparks.park_factor(ballpark),
            wind_mph: conditions.wind_mph,
            temp_f: conditions.temp_f,
            pitcher_boost: clamped,
            pitcher_name: pitcher_name
                .map(|n| n.trim().to_string())
                .filter(|n| !n.is_empty()),
        }
    }

    pub fn park_boost(&self) -> f64 {
        park_boost(self.park_factor)
    }

    pub fn weather_boost(&self) -> f64 {
        weather_boost(self.wind_mph, self.temp_f)
    }
}

pub fn park_boost(park_factor: f64) -> f64 {
    park_factor * 10.0
}

pub fn weather_boost(wind_mph: f64, temp_f: f64) -> f64 {
    wind_mph * 0.5 + (temp_f - NEUTRAL_TEMP_F) * 0.25
}

// ---------------------------------------------------------------------------
// Rules and results
// ---------------------------------------------------------------------------

/// Thresholds used to classify events.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoringRules {
    /// Samples smaller than this are insufficient.
    pub min_events: usize,
    /// Launch angle (degrees) above which an event is a fly ball.
    pub fly_ball_launch_angle: f64,
    /// `hc_x` below which an event counts as pulled.
    pub pull_hc_x_threshold: f64,
}

impl Default for ScoringRules {
    fn default() -> Self {
        Self {
            min_events: 5,
            fly_ball_launch_angle: 10.0,
            pull_hc_x_threshold: 125.0,
        }
    }
}

/// Why a player's result carries no real score.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum ScoreError {
    #[error("Not found")]
    NotFound,
    #[error("No recent data ({events} events, need {min})")]
    InsufficientData { events: usize, min: usize },
    #[error("Statistics unavailable: {0}")]
    ExternalFailure(String),
    #[error("Score could not be computed")]
    Computation,
}

/// Batted-ball rates derived from one sample.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct BattedBallProfile {
    pub events: usize,
    pub barrel_pct: f64,
    pub fly_ball_pct: f64,
    pub pull_pct: f64,
    /// Mean exit velocity over fly balls (0 when there are none).
    pub fly_ball_ev: f64,
}

impl BattedBallProfile {
    fn is_finite(&self) -> bool {
        self.barrel_pct.is_finite()
            && self.fly_ball_pct.is_finite()
            && self.pull_pct.is_finite()
            && self.fly_ball_ev.is_finite()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreResult {
    pub player: String,
    pub player_id: Option<PlayerId>,
    #[serde(flatten)]
    pub profile: BattedBallProfile,
    pub hr_score: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ScoreError>,
}

impl ScoreResult {
    /// A zeroed result carrying `error`.
    pub fn failed(player: &str, player_id: Option<PlayerId>, error: ScoreError) -> Self {
        Self {
            player: player.to_string(),
            player_id,
            profile: BattedBallProfile::default(),
            hr_score: 0.0,
            error: Some(error),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

// ---------------------------------------------------------------------------
// Scorer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct Scorer {
    rules: ScoringRules,
}

impl Scorer {
    pub fn new(rules: ScoringRules) -> Self {
        Self { rules }
    }

    /// Score `sample` for `player` under `env`.
    pub fn score(
        &self,
        player: &str,
        sample: &BattedBallSample,
        env: &EnvironmentContext,
    ) -> ScoreResult {
        let id = Some(sample.player_id);

        if sample.len() < self.rules.min_events {
            debug!(
                player,
                events = sample.len(),
                "insufficient batted-ball data"
            );
            return ScoreResult::failed(
                player,
                id,
                ScoreError::InsufficientData {
                    events: sample.len(),
                    min: self.rules.min_events,
                },
            );
        }

        let profile = self.profile(&sample.events);
        if !profile.is_finite() {
            warn!("non-finite batted-ball profile for '{}'", player);
            return ScoreResult::failed(player, id, ScoreError::Computation);
        }

        let hr_score = hr_score(&profile, env);
        if !hr_score.is_finite() {
            warn!("non-finite HR score for '{}'", player);
            return ScoreResult::failed(player, id, ScoreError::Computation);
        }

        ScoreResult {
            player: player.to_string(),
            player_id: id,
            profile,
            hr_score,
            error: None,
        }
    }

    /// Derive rounded rates from `events`. An empty slice yields all zeros.
    pub fn profile(&self, events: &[BattedBallEvent]) -> BattedBallProfile {
        let total = events.len();
        if total == 0 {
            return BattedBallProfile::default();
        }

        let barrels = events.iter().filter(|e| e.barrel == Some(true)).count();
        let pulled = events.iter().filter(|e| self.is_pulled(e)).count();
        let fly_balls: Vec<&BattedBallEvent> =
            events.iter().filter(|e| self.is_fly_ball(e)).collect();

        let fly_evs: Vec<f64> = fly_balls.iter().filter_map(|e| e.launch_speed).collect();
        let fly_ball_ev = if fly_evs.is_empty() {
            0.0
        } else {
            fly_evs.iter().sum::<f64>() / fly_evs.len() as f64
        };

        BattedBallProfile {
            events: total,
            barrel_pct: round2(pct(barrels, total)),
            fly_ball_pct: round2(pct(fly_balls.len(), total)),
            pull_pct: round2(pct(pulled, total)),
            fly_ball_ev: round2(fly_ball_ev),
        }
    }

    fn is_fly_ball(&self, event: &BattedBallEvent) -> bool {
        event
            .launch_angle
            .is_some_and(|a| a > self.rules.fly_ball_launch_angle)
    }

    /// An explicit pull flag wins over the spray-chart coordinate.
    fn is_pulled(&self, event: &BattedBallEvent) -> bool {
        match event.pull {
            Some(flag) => flag,
            None => event
                .hc_x
                .is_some_and(|x| x < self.rules.pull_hc_x_threshold),
        }
    }
}

/// Combine a profile with the environment into the final HR Score.
pub fn hr_score(profile: &BattedBallProfile, env: &EnvironmentContext) -> f64 {
    let base = round2(
        profile.barrel_pct * W_BARREL
            + profile.fly_ball_pct * W_FLY_BALL
            + profile.pull_pct * W_PULL
            + profile.fly_ball_ev * W_FLY_BALL_EV
            + env.pitcher_boost * W_PITCHER
            + env.park_boost() * W_PARK
            + env.weather_boost() * W_WEATHER,
    );

    match env.pitcher_name {
        Some(_) => base * NAMED_PITCHER_MULTIPLIER,
        None => base,
    }
}

fn pct(count: usize, total: usize) -> f64 {
    count as f64 / total as f64 * 100.0
}

pub fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
