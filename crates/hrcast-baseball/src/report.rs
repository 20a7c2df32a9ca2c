// Result presentation: sorting, a fixed-width text table, a text bar chart,
// and CSV export.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::io::Write;

use serde::Serialize;
use thiserror::Error;

use crate::player::normalize_name;
use crate::scoring::{round2, ScoreResult};

const CHART_WIDTH: usize = 40;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("CSV export failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error during export: {0}")]
    Io(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Sorting
// ---------------------------------------------------------------------------

/// Column to order the results by. Numeric columns sort descending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    #[default]
    Score,
    Barrel,
    FlyBall,
    Pull,
    ExitVelocity,
    Name,
}

/// Stable sort; ties keep input order.
pub fn sort_results(results: &mut [ScoreResult], key: SortKey) {
    let metric = |r: &ScoreResult| match key {
        SortKey::Score => r.hr_score,
        SortKey::Barrel => r.profile.barrel_pct,
        SortKey::FlyBall => r.profile.fly_ball_pct,
        SortKey::Pull => r.profile.pull_pct,
        SortKey::ExitVelocity => r.profile.fly_ball_ev,
        SortKey::Name => 0.0,
    };

    if key == SortKey::Name {
        results.sort_by_key(|r| r.player.to_lowercase());
    } else {
        results.sort_by(|a, b| metric(b).total_cmp(&metric(a)));
    }
}

// ---------------------------------------------------------------------------
// Odds
// ---------------------------------------------------------------------------

/// American odds label (`+500`) for `player`, if the odds table lists them.
pub fn odds_label(odds: &HashMap<String, f64>, player: &str) -> Option<String> {
    odds.get(&normalize_name(player))
        .map(|o| format!("+{}", (o * 100.0).round() as i64))
}

// ---------------------------------------------------------------------------
// Rows
// ---------------------------------------------------------------------------

/// One exported row. Headers match the on-screen table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportRow {
    #[serde(rename = "Player")]
    pub player: String,
    #[serde(rename = "Player ID")]
    pub player_id: String,
    #[serde(rename = "Events")]
    pub events: usize,
    #[serde(rename = "Barrel%")]
    pub barrel_pct: f64,
    #[serde(rename = "FB%")]
    pub fly_ball_pct: f64,
    #[serde(rename = "Pull%")]
    pub pull_pct: f64,
    #[serde(rename = "EV_FB_LD")]
    pub fly_ball_ev: f64,
    #[serde(rename = "HR Score")]
    pub hr_score: f64,
    #[serde(rename = "HR Odds")]
    pub odds: String,
    #[serde(rename = "Error")]
    pub error: String,
}

impl ReportRow {
    pub fn from_result(result: &ScoreResult, odds: &HashMap<String, f64>) -> Self {
        Self {
            player: result.player.clone(),
            player_id: result
                .player_id
                .map(|id| id.to_string())
                .unwrap_or_default(),
            events: result.profile.events,
            barrel_pct: result.profile.barrel_pct,
            fly_ball_pct: result.profile.fly_ball_pct,
            pull_pct: result.profile.pull_pct,
            fly_ball_ev: result.profile.fly_ball_ev,
            hr_score: round2(result.hr_score),
            odds: odds_label(odds, &result.player).unwrap_or_default(),
            error: result
                .error
                .as_ref()
                .map(|e| e.to_string())
                .unwrap_or_default(),
        }
    }
}

pub fn rows(results: &[ScoreResult], odds: &HashMap<String, f64>) -> Vec<ReportRow> {
    results
        .iter()
        .map(|r| ReportRow::from_result(r, odds))
        .collect()
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

/// Fixed-width results table.
pub fn render_table(rows: &[ReportRow]) -> String {
    let name_width = rows
        .iter()
        .map(|r| r.player.chars().count())
        .max()
        .unwrap_or(0)
        .max("Player".len());

    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<name_width$}  {:>8}  {:>7}  {:>7}  {:>8}  {:>8}  {:>7}  {}",
        "Player", "Barrel%", "FB%", "Pull%", "EV_FB_LD", "HR Score", "Odds", "Note"
    );
    let _ = writeln!(out, "{}", "-".repeat(name_width + 68));
    for r in rows {
        let _ = writeln!(
            out,
            "{:<name_width$}  {:>8.2}  {:>7.2}  {:>7.2}  {:>8.2}  {:>8.2}  {:>7}  {}",
            r.player,
            r.barrel_pct,
            r.fly_ball_pct,
            r.pull_pct,
            r.fly_ball_ev,
            r.hr_score,
            r.odds,
            r.error
        );
    }
    out
}

/// Horizontal bar chart of HR Score, scaled so the top score fills the width.
pub fn render_chart(rows: &[ReportRow]) -> String {
    let name_width = rows
        .iter()
        .map(|r| r.player.chars().count())
        .max()
        .unwrap_or(0);
    let max = rows.iter().map(|r| r.hr_score).fold(0.0_f64, f64::max);

    let mut out = String::new();
    for r in rows {
        let len = if max > 0.0 && r.hr_score > 0.0 {
            ((r.hr_score / max) * CHART_WIDTH as f64).round() as usize
        } else {
            0
        };
        let _ = writeln!(
            out,
            "{:<name_width$} | {:<bar_width$} {:.2}",
            r.player,
            "#".repeat(len),
            r.hr_score,
            bar_width = CHART_WIDTH
        );
    }
    out
}

/// Write rows as CSV with a header line.
pub fn write_csv<W: Write>(rows: &[ReportRow], writer: W) -> Result<(), ReportError> {
    let mut wtr = csv::Writer::from_writer(writer);
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::PlayerId;
    use crate::scoring::{BattedBallProfile, ScoreError};

    fn result(name: &str, score: f64, barrel: f64) -> ScoreResult {
        ScoreResult {
            player: name.to_string(),
            player_id: Some(PlayerId(1)),
            profile: BattedBallProfile {
                events: 10,
                barrel_pct: barrel,
                fly_ball_pct: 30.0,
                pull_pct: 20.0,
                fly_ball_ev: 95.0,
            },
            hr_score: score,
            error: None,
        }
    }

    fn odds() -> HashMap<String, f64> {
        HashMap::from([
            ("aaron judge".to_string(), 5.0),
            ("shohei ohtani".to_string(), 6.5),
        ])
    }

    #[test]
    fn sort_by_score_descending() {
        let mut rs = vec![
            result("A", 10.0, 5.0),
            result("B", 30.0, 1.0),
            result("C", 20.0, 9.0),
        ];
        sort_results(&mut rs, SortKey::Score);
        let names: Vec<&str> = rs.iter().map(|r| r.player.as_str()).collect();
        assert_eq!(names, vec!["B", "C", "A"]);

        sort_results(&mut rs, SortKey::Barrel);
        assert_eq!(rs[0].player, "C");
    }

    #[test]
    fn sort_by_name_ascending_case_insensitive() {
        let mut rs = vec![
            result("mike", 1.0, 0.0),
            result("Aaron", 2.0, 0.0),
            result("juan", 3.0, 0.0),
        ];
        sort_results(&mut rs, SortKey::Name);
        let names: Vec<&str> = rs.iter().map(|r| r.player.as_str()).collect();
        assert_eq!(names, vec!["Aaron", "juan", "mike"]);
    }

    #[test]
    fn odds_label_formats_american_odds() {
        assert_eq!(odds_label(&odds(), "Aaron Judge"), Some("+500".to_string()));
        let spaced = odds_label(&odds(), " shohei  ohtani");
        assert_eq!(spaced, Some("+650".to_string()));
        assert_eq!(odds_label(&odds(), "Mike Trout"), None);
    }

    #[test]
    fn csv_export_has_headers_and_error_column() {
        let failed = ScoreResult::failed("Ghost", None, ScoreError::NotFound);
        let rs = rows(&[result("Aaron Judge", 23.41, 0.0), failed], &odds());

        let mut buf = Vec::new();
        write_csv(&rs, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(
            lines[0],
            "Player,Player ID,Events,Barrel%,FB%,Pull%,EV_FB_LD,HR Score,HR Odds,Error"
        );
        assert_eq!(lines[1], "Aaron Judge,1,10,0.0,30.0,20.0,95.0,23.41,+500,");
        assert_eq!(lines[2], "Ghost,,0,0.0,0.0,0.0,0.0,0.0,,Not found");
    }

    #[test]
    fn table_lists_every_row() {
        let results = [
            result("Aaron Judge", 23.41, 0.0),
            result("Juan Soto", 19.0, 2.5),
        ];
        let rs = rows(&results, &odds());
        let table = render_table(&rs);
        assert_eq!(table.lines().count(), 4);
        assert!(table.contains("Aaron Judge"));
        assert!(table.contains("23.41"));
        assert!(table.contains("+500"));
    }

    #[test]
    fn chart_scales_to_top_score() {
        let results = [
            result("A", 20.0, 0.0),
            result("B", 10.0, 0.0),
            result("C", 0.0, 0.0),
        ];
        let rs = rows(&results, &odds());
        let chart = render_chart(&rs);
        let lines: Vec<&str> = chart.lines().collect();
        assert_eq!(lines[0].matches('#').count(), 40);
        assert_eq!(lines[1].matches('#').count(), 20);
        assert_eq!(lines[2].matches('#').count(), 0);
    }
}
