// Prediction run: resolve -> fetch -> score, one player at a time.
//
// Each player is handled independently. A name that does not resolve, a
// failed statistics request, or a thin sample yields a zeroed `ScoreResult`
// with an error attached; the rest of the batch carries on.

use serde::Serialize;
use tracing::{info, warn};

use crate::config::Config;
use crate::player::{PlayerDirectory, Resolver};
use crate::scoring::{EnvironmentContext, ScoreError, ScoreResult, Scorer};
use crate::statcast::{BattedBallFetcher, StatcastApi};
use crate::weather::Conditions;

/// Outcome of one prediction run.
#[derive(Debug, Clone, Serialize)]
pub struct Prediction {
    pub environment: EnvironmentContext,
    pub conditions: Conditions,
    pub window_days: u32,
    pub results: Vec<ScoreResult>,
}

impl Prediction {
    /// Number of players that produced a real score.
    pub fn scored(&self) -> usize {
        self.results.iter().filter(|r| r.is_ok()).count()
    }
}

pub struct Predictor<D, S> {
    resolver: Resolver<D>,
    fetcher: BattedBallFetcher<S>,
    scorer: Scorer,
    window_days: u32,
}

impl<D: PlayerDirectory, S: StatcastApi> Predictor<D, S> {
    pub fn new(
        resolver: Resolver<D>,
        fetcher: BattedBallFetcher<S>,
        scorer: Scorer,
        window_days: u32,
    ) -> Self {
        Self {
            resolver,
            fetcher,
            scorer,
            window_days,
        }
    }

    /// Wire a predictor from config around the given provider clients.
    pub fn from_config(config: &Config, directory: D, statcast: S) -> Self {
        Self::new(
            Resolver::new(config.players.overrides.clone(), directory),
            BattedBallFetcher::new(statcast),
            Scorer::new(config.scoring_rules()),
            config.prediction.window_days,
        )
    }

    pub fn with_window_days(mut self, window_days: u32) -> Self {
        self.window_days = window_days;
        self
    }

    pub fn window_days(&self) -> u32 {
        self.window_days
    }

    pub fn resolver(&self) -> &Resolver<D> {
        &self.resolver
    }

    pub fn fetcher(&self) -> &BattedBallFetcher<S> {
        &self.fetcher
    }

    /// Score every player in `players` under `env`, in order.
    pub async fn run(
        &self,
        players: &[String],
        env: EnvironmentContext,
        conditions: Conditions,
    ) -> Prediction {
        info!(
            players = players.len(),
            ballpark = %env.ballpark,
            window_days = self.window_days,
            "starting prediction run"
        );

        let mut results = Vec::with_capacity(players.len());
        for name in players {
            results.push(self.score_player(name, &env).await);
        }

        let prediction = Prediction {
            environment: env,
            conditions,
            window_days: self.window_days,
            results,
        };
        info!(
            "prediction run finished: {}/{} players scored",
            prediction.scored(),
            prediction.results.len()
        );
        prediction
    }

    /// Resolve, fetch and score a single player.
    pub async fn score_player(&self, name: &str, env: &EnvironmentContext) -> ScoreResult {
        let player = name.trim();

        let id = match self.resolver.resolve(player).await {
            Ok(id) => id,
            Err(_) => return ScoreResult::failed(player, None, ScoreError::NotFound),
        };

        let sample = match self.fetcher.fetch_events(id, self.window_days).await {
            Ok(sample) => sample,
            Err(e) => {
                warn!("statcast fetch for '{}' ({}) failed: {}", player, id, e);
                let error = ScoreError::ExternalFailure(e.to_string());
                return ScoreResult::failed(player, Some(id), error);
            }
        };

        self.scorer.score(player, &sample, env)
    }
}
