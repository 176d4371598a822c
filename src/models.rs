use chrono::NaiveDate;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::ProgressError;

#[derive(Debug, Clone)]
pub struct StudentRecord {
    pub id: Uuid,
    pub full_name: String,
    pub grade: String,
}

#[derive(Debug, Clone)]
pub struct GoalRecord {
    pub id: Uuid,
    pub student_id: Uuid,
    pub area: GoalArea,
    pub goal_text: String,
    pub baseline: String,
    pub criterion: String,
    pub mastery_requirement: String,
    pub status: GoalStatus,
}

#[derive(Debug, Clone)]
pub struct SessionRecord {
    pub id: Uuid,
    pub student_id: Uuid,
    pub goal_id: Uuid,
    pub date: NaiveDate,
    pub trials_attempted: i32,
    pub trials_correct: i32,
    pub accuracy_percent: i32,
    pub activities: String,
    pub student_response: String,
    pub billable: bool,
    pub cpt_code: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GoalArea {
    Articulation,
    LanguageReceptive,
    LanguageExpressive,
    Fluency,
    Voice,
    Pragmatics,
    Other,
}

impl GoalArea {
    pub fn as_str(&self) -> &'static str {
        match self {
            GoalArea::Articulation => "articulation",
            GoalArea::LanguageReceptive => "language-receptive",
            GoalArea::LanguageExpressive => "language-expressive",
            GoalArea::Fluency => "fluency",
            GoalArea::Voice => "voice",
            GoalArea::Pragmatics => "pragmatics",
            GoalArea::Other => "other",
        }
    }

    pub fn label(&self) -> String {
        self.as_str().replace('-', " ")
    }
}

impl FromStr for GoalArea {
    type Err = ProgressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "articulation" => Ok(GoalArea::Articulation),
            "language-receptive" => Ok(GoalArea::LanguageReceptive),
            "language-expressive" => Ok(GoalArea::LanguageExpressive),
            "fluency" => Ok(GoalArea::Fluency),
            "voice" => Ok(GoalArea::Voice),
            "pragmatics" => Ok(GoalArea::Pragmatics),
            "other" => Ok(GoalArea::Other),
            other => Err(ProgressError::InvalidInput(format!(
                "unknown goal area '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GoalStatus {
    NotStarted,
    InProgress,
    Mastered,
    Discontinued,
}

impl GoalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            GoalStatus::NotStarted => "not-started",
            GoalStatus::InProgress => "in-progress",
            GoalStatus::Mastered => "mastered",
            GoalStatus::Discontinued => "discontinued",
        }
    }
}

impl FromStr for GoalStatus {
    type Err = ProgressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "not-started" => Ok(GoalStatus::NotStarted),
            "in-progress" => Ok(GoalStatus::InProgress),
            "mastered" => Ok(GoalStatus::Mastered),
            "discontinued" => Ok(GoalStatus::Discontinued),
            other => Err(ProgressError::InvalidInput(format!(
                "unknown goal status '{other}'"
            ))),
        }
    }
}

/// Qualitative rating for one goal over one reporting period. Ordered from
/// worst to best so monotonicity of the classifier can be checked directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProgressRating {
    NotAddressed,
    Insufficient,
    SomeProgress,
    Sufficient,
    Mastered,
}

impl ProgressRating {
    pub fn label(&self) -> &'static str {
        match self {
            ProgressRating::Mastered => "Goal Mastered",
            ProgressRating::Sufficient => "Sufficient Progress",
            ProgressRating::SomeProgress => "Some Progress",
            ProgressRating::Insufficient => "Insufficient Progress",
            ProgressRating::NotAddressed => "Not Addressed This Period",
        }
    }

    /// Verb phrase slotted into the qualitative summary sentence, one fixed
    /// template per rating.
    pub fn summary_phrase(&self) -> &'static str {
        match self {
            ProgressRating::Mastered => "has mastered",
            ProgressRating::Sufficient => "is making sufficient progress toward",
            ProgressRating::SomeProgress => "is making some progress toward",
            ProgressRating::Insufficient => "is making insufficient progress toward",
            ProgressRating::NotAddressed => "did not work on",
        }
    }
}

impl fmt::Display for ProgressRating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Inclusive date interval used to window session data for a report.
#[derive(Debug, Clone)]
pub struct ReportingPeriod {
    pub label: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl ReportingPeriod {
    pub fn new(
        label: impl Into<String>,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Self, ProgressError> {
        if start > end {
            return Err(ProgressError::InvalidInput(format!(
                "reporting period starts {start} after it ends {end}"
            )));
        }
        Ok(ReportingPeriod {
            label: label.into(),
            start,
            end,
        })
    }

    /// Calendar quarter of a year: Q1 is Jan 1 - Mar 31 and so on.
    pub fn quarter(year: i32, quarter: u32) -> Result<Self, ProgressError> {
        if !(1..=4).contains(&quarter) {
            return Err(ProgressError::InvalidInput(format!(
                "quarter must be 1-4, got {quarter}"
            )));
        }
        let start = NaiveDate::from_ymd_opt(year, (quarter - 1) * 3 + 1, 1)
            .ok_or_else(|| ProgressError::InvalidInput(format!("invalid year {year}")))?;
        let end = if quarter == 4 {
            NaiveDate::from_ymd_opt(year, 12, 31)
        } else {
            NaiveDate::from_ymd_opt(year, quarter * 3 + 1, 1).and_then(|d| d.pred_opt())
        }
        .ok_or_else(|| ProgressError::InvalidInput(format!("invalid year {year}")))?;
        ReportingPeriod::new(format!("Q{quarter} {year}"), start, end)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }
}

/// One point of the per-goal chart series, ordered by date ascending.
#[derive(Debug, Clone, Serialize)]
pub struct ChartPoint {
    pub date: String,
    pub accuracy: i32,
    pub target: i32,
}

/// Derived per-goal summary for one reporting period. Recomputed on demand
/// from sessions and the goal's criterion text, never stored.
#[derive(Debug, Clone, Serialize)]
pub struct GoalProgress {
    pub goal_id: Uuid,
    pub goal_text: String,
    pub baseline: String,
    pub current_performance: String,
    pub data_points: usize,
    pub average_accuracy: i32,
    pub progress_rating: ProgressRating,
    pub chart_series: Vec<ChartPoint>,
}
