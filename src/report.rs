use std::fmt::Write;

use uuid::Uuid;

use crate::error::ProgressError;
use crate::models::{GoalProgress, GoalRecord, ReportingPeriod, SessionRecord, StudentRecord};
use crate::progress;

/// How student-identifying text appears in rendered output. Injected by the
/// caller rather than read from ambient state, so the same data can be
/// rendered masked or unmasked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaskingPolicy {
    Off,
    MaskNames,
}

impl MaskingPolicy {
    pub fn display_name(&self, name: &str) -> String {
        match self {
            MaskingPolicy::Off => name.to_string(),
            MaskingPolicy::MaskNames => "Student ***".to_string(),
        }
    }
}

/// One goal's derived progress record: parse the criterion, window the
/// sessions, aggregate, classify.
pub fn assemble_goal_progress(
    goal: &GoalRecord,
    sessions: &[SessionRecord],
    period: &ReportingPeriod,
) -> GoalProgress {
    let target = progress::parse_criterion(&goal.criterion);
    let in_period = progress::sessions_in_period(sessions, goal.id, period);
    let agg = progress::aggregate(&in_period, target);
    let rating = progress::classify(agg.latest_accuracy, target, in_period.len());

    let current_performance = if in_period.is_empty() {
        "No data".to_string()
    } else {
        format!("{}% accuracy", agg.latest_accuracy)
    };

    GoalProgress {
        goal_id: goal.id,
        goal_text: goal.goal_text.clone(),
        baseline: goal.baseline.clone(),
        current_performance,
        data_points: in_period.len(),
        average_accuracy: agg.average_accuracy,
        progress_rating: rating,
        chart_series: agg.chart_series,
    }
}

/// Same as [`assemble_goal_progress`] but looks the goal up by id in the
/// supplied collection; a missing goal is an error, unlike a goal with no
/// sessions.
pub fn assemble_for_goal(
    goal_id: Uuid,
    goals: &[GoalRecord],
    sessions: &[SessionRecord],
    period: &ReportingPeriod,
) -> Result<GoalProgress, ProgressError> {
    let goal = goals
        .iter()
        .find(|g| g.id == goal_id)
        .ok_or_else(|| ProgressError::NotFound(format!("goal {goal_id}")))?;
    Ok(assemble_goal_progress(goal, sessions, period))
}

pub fn build_report(
    student: &StudentRecord,
    goals: &[GoalRecord],
    sessions: &[SessionRecord],
    period: &ReportingPeriod,
    masking: MaskingPolicy,
) -> String {
    let name = masking.display_name(&student.full_name);
    let mut output = String::new();

    let _ = writeln!(output, "# Progress Report - {}", period.label);
    let _ = writeln!(
        output,
        "{} (Grade {}) | {} - {}",
        name,
        student.grade,
        period.start.format("%B %-d"),
        period.end.format("%B %-d, %Y")
    );

    if goals.is_empty() {
        let _ = writeln!(output);
        let _ = writeln!(output, "No goals on file for this student.");
        return output;
    }

    for goal in goals {
        let target = progress::parse_criterion(&goal.criterion);
        let in_period = progress::sessions_in_period(sessions, goal.id, period);
        let latest = progress::latest_session(&in_period);
        let record = assemble_goal_progress(goal, sessions, period);

        let _ = writeln!(output);
        let _ = writeln!(
            output,
            "## {} - {}",
            goal.area.label(),
            record.progress_rating.label()
        );
        let _ = writeln!(output, "{}", record.goal_text);
        let _ = writeln!(output);
        let _ = writeln!(output, "- Baseline: {}", record.baseline);
        let _ = writeln!(output, "- Mastery requirement: {}", goal.mastery_requirement);
        let _ = writeln!(output, "- Current performance: {}", record.current_performance);
        let _ = writeln!(output, "- Average accuracy: {}%", record.average_accuracy);
        let _ = writeln!(output, "- Data points: {} sessions", record.data_points);

        if record.chart_series.len() >= 2 {
            let _ = writeln!(output);
            let _ = writeln!(output, "| Date | Accuracy | Target |");
            let _ = writeln!(output, "|------|----------|--------|");
            for point in &record.chart_series {
                let _ = writeln!(
                    output,
                    "| {} | {}% | {}% |",
                    point.date, point.accuracy, point.target
                );
            }
        }

        let _ = writeln!(output);
        if record.data_points > 0 {
            let _ = writeln!(
                output,
                "{} {} this goal during the reporting period.",
                name,
                record.progress_rating.summary_phrase()
            );
            let _ = writeln!(
                output,
                "Current performance: {} (target: {}%). Average accuracy across {} sessions: {}%.",
                record.current_performance, target, record.data_points, record.average_accuracy
            );
            if let Some(session) = latest {
                let _ = writeln!(
                    output,
                    "Most recent session ({}): {}/{} trials correct. {}",
                    session.date.format("%b %-d, %Y"),
                    session.trials_correct,
                    session.trials_attempted,
                    session.student_response
                );
                let _ = writeln!(output, "Activities: {}", session.activities);
            }
        } else {
            let _ = writeln!(
                output,
                "No session data was recorded for this goal during the {} reporting period.",
                period.label
            );
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{GoalArea, GoalStatus, ProgressRating};
    use chrono::NaiveDate;

    fn sample_student() -> StudentRecord {
        StudentRecord {
            id: Uuid::new_v4(),
            full_name: "Maya Chen".to_string(),
            grade: "3".to_string(),
        }
    }

    fn sample_goal(student_id: Uuid, criterion: &str) -> GoalRecord {
        GoalRecord {
            id: Uuid::new_v4(),
            student_id,
            area: GoalArea::Articulation,
            goal_text: "produce /r/ in words at the sentence level".to_string(),
            baseline: "40% accuracy".to_string(),
            criterion: criterion.to_string(),
            mastery_requirement: "3 consecutive sessions".to_string(),
            status: GoalStatus::InProgress,
        }
    }

    fn sample_session(
        student_id: Uuid,
        goal_id: Uuid,
        date: (i32, u32, u32),
        attempted: i32,
        correct: i32,
    ) -> SessionRecord {
        SessionRecord {
            id: Uuid::new_v4(),
            student_id,
            goal_id,
            date: NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
            trials_attempted: attempted,
            trials_correct: correct,
            accuracy_percent: progress::accuracy(attempted, correct).unwrap(),
            activities: "structured picture naming".to_string(),
            student_response: "needed minimal cues on blends".to_string(),
            billable: true,
            cpt_code: Some("92507".to_string()),
        }
    }

    #[test]
    fn assembles_mastered_goal_from_single_session() {
        let student = sample_student();
        let goal = sample_goal(student.id, "80% accuracy across 3 consecutive sessions");
        let sessions = vec![sample_session(student.id, goal.id, (2026, 2, 3), 20, 16)];
        let period = ReportingPeriod::quarter(2026, 1).unwrap();

        let record = assemble_goal_progress(&goal, &sessions, &period);
        assert_eq!(record.data_points, 1);
        assert_eq!(record.average_accuracy, 80);
        assert_eq!(record.current_performance, "80% accuracy");
        assert_eq!(record.progress_rating, ProgressRating::Mastered);
        assert_eq!(record.chart_series.len(), 1);
        assert_eq!(record.chart_series[0].target, 80);
    }

    #[test]
    fn empty_period_yields_not_addressed_with_no_data() {
        let student = sample_student();
        let goal = sample_goal(student.id, "80% accuracy");
        let sessions = vec![sample_session(student.id, goal.id, (2026, 5, 10), 20, 16)];
        let period = ReportingPeriod::quarter(2026, 1).unwrap();

        let record = assemble_goal_progress(&goal, &sessions, &period);
        assert_eq!(record.data_points, 0);
        assert_eq!(record.average_accuracy, 0);
        assert_eq!(record.current_performance, "No data");
        assert_eq!(record.progress_rating, ProgressRating::NotAddressed);
        assert!(record.chart_series.is_empty());
    }

    #[test]
    fn missing_goal_id_is_not_found() {
        let student = sample_student();
        let goal = sample_goal(student.id, "80% accuracy");
        let period = ReportingPeriod::quarter(2026, 1).unwrap();

        let err = assemble_for_goal(Uuid::new_v4(), std::slice::from_ref(&goal), &[], &period)
            .unwrap_err();
        assert!(matches!(err, ProgressError::NotFound(_)));
    }

    #[test]
    fn report_carries_summary_sentence_and_table() {
        let student = sample_student();
        let goal = sample_goal(student.id, "80% accuracy");
        let sessions = vec![
            sample_session(student.id, goal.id, (2026, 1, 8), 20, 10),
            sample_session(student.id, goal.id, (2026, 1, 22), 20, 14),
        ];
        let period = ReportingPeriod::quarter(2026, 1).unwrap();

        let report = build_report(&student, &[goal], &sessions, &period, MaskingPolicy::Off);
        assert!(report.contains("# Progress Report - Q1 2026"));
        assert!(report.contains("Maya Chen is making sufficient progress toward this goal"));
        assert!(report.contains("| Jan 8 | 50% | 80% |"));
        assert!(report.contains("| Jan 22 | 70% | 80% |"));
        assert!(report.contains("Average accuracy across 2 sessions: 60%."));
        assert!(report.contains("Most recent session (Jan 22, 2026): 14/20 trials correct."));
        assert!(report.contains("Activities: structured picture naming"));
    }

    #[test]
    fn report_handles_goal_without_sessions() {
        let student = sample_student();
        let goal = sample_goal(student.id, "80% accuracy");
        let period = ReportingPeriod::quarter(2026, 2).unwrap();

        let report = build_report(&student, &[goal], &[], &period, MaskingPolicy::Off);
        assert!(report.contains("Not Addressed This Period"));
        assert!(report.contains(
            "No session data was recorded for this goal during the Q2 2026 reporting period."
        ));
    }

    #[test]
    fn masking_policy_hides_the_student_name() {
        let student = sample_student();
        let goal = sample_goal(student.id, "80% accuracy");
        let sessions = vec![sample_session(student.id, goal.id, (2026, 1, 8), 20, 16)];
        let period = ReportingPeriod::quarter(2026, 1).unwrap();

        let report = build_report(
            &student,
            &[goal],
            &sessions,
            &period,
            MaskingPolicy::MaskNames,
        );
        assert!(!report.contains("Maya Chen"));
        assert!(report.contains("Student *** has mastered this goal"));
    }
}
