use once_cell::sync::Lazy;
use regex::Regex;
use uuid::Uuid;

use crate::error::ProgressError;
use crate::models::{ChartPoint, ProgressRating, ReportingPeriod, SessionRecord};

/// Target assumed when a criterion string carries no percentage.
pub const DEFAULT_TARGET_PERCENT: i32 = 80;

static PERCENT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+)%").expect("valid regex"));

/// Whole-number accuracy for one session's trial counts. Zero attempted
/// trials means "no data" and yields 0 rather than an error.
pub fn accuracy(attempted: i32, correct: i32) -> Result<i32, ProgressError> {
    if attempted < 0 || correct < 0 {
        return Err(ProgressError::InvalidInput(format!(
            "trial counts must be non-negative, got {correct}/{attempted}"
        )));
    }
    if correct > attempted {
        return Err(ProgressError::InvalidInput(format!(
            "{correct} correct trials exceed {attempted} attempted"
        )));
    }
    if attempted == 0 {
        return Ok(0);
    }
    Ok(((correct as f64 / attempted as f64) * 100.0).round() as i32)
}

/// Best-effort target extraction from free-text criterion descriptions like
/// "80% accuracy across 3 consecutive sessions". The leftmost integer
/// followed by `%` wins; text with no percentage falls back to the default.
/// Criterion text naming several percentages ("reduce from 40% to 80%")
/// therefore resolves to the first one, which may not be the intended target.
pub fn parse_criterion(text: &str) -> i32 {
    PERCENT_RE
        .captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<i32>().ok())
        .unwrap_or(DEFAULT_TARGET_PERCENT)
}

/// Sessions for one goal whose date falls inside the period, both ends
/// inclusive. Output order follows input order; callers that need a specific
/// order impose it themselves.
pub fn sessions_in_period<'a>(
    sessions: &'a [SessionRecord],
    goal_id: Uuid,
    period: &ReportingPeriod,
) -> Vec<&'a SessionRecord> {
    sessions
        .iter()
        .filter(|s| s.goal_id == goal_id && period.contains(s.date))
        .collect()
}

/// Session with the maximum date. Ties resolve to the later entry in input
/// order, so two sessions on the same day stay deterministic.
pub fn latest_session<'a>(sessions: &[&'a SessionRecord]) -> Option<&'a SessionRecord> {
    let mut latest: Option<&'a SessionRecord> = None;
    for session in sessions.iter().copied() {
        match latest {
            Some(current) if session.date < current.date => {}
            _ => latest = Some(session),
        }
    }
    latest
}

#[derive(Debug, Clone)]
pub struct Aggregate {
    pub average_accuracy: i32,
    pub latest_accuracy: i32,
    pub chart_series: Vec<ChartPoint>,
}

/// Collapses a filtered session set into its summary numbers and the chart
/// series. Ties on the latest date resolve to the later entry in input order.
pub fn aggregate(sessions: &[&SessionRecord], target: i32) -> Aggregate {
    let average_accuracy = if sessions.is_empty() {
        0
    } else {
        let sum: i64 = sessions.iter().map(|s| s.accuracy_percent as i64).sum();
        (sum as f64 / sessions.len() as f64).round() as i32
    };

    let latest_accuracy = latest_session(sessions).map(|s| s.accuracy_percent).unwrap_or(0);

    let mut ordered: Vec<&SessionRecord> = sessions.to_vec();
    ordered.sort_by_key(|s| s.date);
    let chart_series = ordered
        .iter()
        .map(|s| ChartPoint {
            date: s.date.format("%b %-d").to_string(),
            accuracy: s.accuracy_percent,
            target,
        })
        .collect();

    Aggregate {
        average_accuracy,
        latest_accuracy,
        chart_series,
    }
}

/// Maps latest accuracy against the goal's target. Thresholds scale with the
/// target (0.8x and 0.5x) rather than being absolute percentages, so ratings
/// stay comparable across goals of different difficulty. First match wins.
pub fn classify(latest_accuracy: i32, target: i32, session_count: usize) -> ProgressRating {
    if session_count == 0 {
        return ProgressRating::NotAddressed;
    }
    let latest = latest_accuracy as f64;
    let target = target as f64;
    if latest >= target {
        ProgressRating::Mastered
    } else if latest >= target * 0.8 {
        ProgressRating::Sufficient
    } else if latest >= target * 0.5 {
        ProgressRating::SomeProgress
    } else {
        ProgressRating::Insufficient
    }
}
