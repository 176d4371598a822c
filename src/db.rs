use anyhow::Context;
use chrono::NaiveDate;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::error::ProgressError;
use crate::models::{GoalRecord, SessionRecord, StudentRecord};
use crate::progress;

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::query("CREATE SCHEMA IF NOT EXISTS caseload")
        .execute(pool)
        .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS caseload.students (
            id UUID PRIMARY KEY,
            full_name TEXT NOT NULL UNIQUE,
            grade TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS caseload.goals (
            id UUID PRIMARY KEY,
            student_id UUID NOT NULL REFERENCES caseload.students(id),
            area TEXT NOT NULL,
            goal_text TEXT NOT NULL,
            baseline TEXT NOT NULL,
            criterion TEXT NOT NULL,
            mastery_requirement TEXT NOT NULL,
            status TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS caseload.sessions (
            id UUID PRIMARY KEY,
            student_id UUID NOT NULL REFERENCES caseload.students(id),
            goal_id UUID NOT NULL REFERENCES caseload.goals(id),
            session_date DATE NOT NULL,
            trials_attempted INT NOT NULL,
            trials_correct INT NOT NULL,
            accuracy_percent INT NOT NULL,
            activities TEXT NOT NULL,
            student_response TEXT NOT NULL,
            billable BOOLEAN NOT NULL DEFAULT TRUE,
            cpt_code TEXT,
            source_key TEXT NOT NULL UNIQUE
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<()> {
    let students = vec![
        (
            Uuid::parse_str("7a1d2c3e-5b6f-4a8d-9c0e-1f2a3b4c5d6e")?,
            "Maya Chen",
            "3",
        ),
        (
            Uuid::parse_str("2b3c4d5e-6f7a-4b9c-8d0e-2a3b4c5d6e7f")?,
            "Diego Alvarez",
            "1",
        ),
    ];

    for (id, full_name, grade) in students {
        sqlx::query(
            r#"
            INSERT INTO caseload.students (id, full_name, grade)
            VALUES ($1, $2, $3)
            ON CONFLICT (full_name) DO UPDATE
            SET grade = EXCLUDED.grade
            "#,
        )
        .bind(id)
        .bind(full_name)
        .bind(grade)
        .execute(pool)
        .await?;
    }

    let goals = vec![
        (
            Uuid::parse_str("9c8b7a6d-5e4f-4d3c-8b2a-190e8d7c6b5a")?,
            "Maya Chen",
            "articulation",
            "Maya will produce /r/ in words at the sentence level during structured activities",
            "40% accuracy",
            "80% accuracy across 3 consecutive sessions",
            "3 consecutive sessions",
            "in-progress",
        ),
        (
            Uuid::parse_str("8d7c6b5a-4e3f-4c2d-9b1a-080e7d6c5b4a")?,
            "Maya Chen",
            "language-expressive",
            "Maya will use age-appropriate grammar when retelling a short story",
            "50% accuracy",
            "75% accuracy across 4 sessions",
            "4 sessions",
            "in-progress",
        ),
        (
            Uuid::parse_str("6b5a4d3c-2e1f-4b0d-8a9c-070e6d5c4b3a")?,
            "Diego Alvarez",
            "fluency",
            "Diego will use easy-onset speech in single sentences",
            "30% accuracy",
            "70% accuracy across 3 consecutive sessions",
            "3 consecutive sessions",
            "not-started",
        ),
    ];

    for (id, student_name, area, goal_text, baseline, criterion, mastery, status) in goals {
        let student_id: Uuid =
            sqlx::query("SELECT id FROM caseload.students WHERE full_name = $1")
                .bind(student_name)
                .fetch_one(pool)
                .await?
                .get("id");

        sqlx::query(
            r#"
            INSERT INTO caseload.goals
            (id, student_id, area, goal_text, baseline, criterion, mastery_requirement, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (id) DO UPDATE
            SET criterion = EXCLUDED.criterion, status = EXCLUDED.status
            "#,
        )
        .bind(id)
        .bind(student_id)
        .bind(area)
        .bind(goal_text)
        .bind(baseline)
        .bind(criterion)
        .bind(mastery)
        .bind(status)
        .execute(pool)
        .await?;
    }

    let sessions = vec![
        (
            "seed-001",
            "9c8b7a6d-5e4f-4d3c-8b2a-190e8d7c6b5a",
            NaiveDate::from_ymd_opt(2026, 1, 8).context("invalid date")?,
            20,
            10,
            "Structured picture naming with /r/ targets",
            "Required moderate cues on initial /r/",
        ),
        (
            "seed-002",
            "9c8b7a6d-5e4f-4d3c-8b2a-190e8d7c6b5a",
            NaiveDate::from_ymd_opt(2026, 1, 22).context("invalid date")?,
            20,
            14,
            "Sentence completion with carrier phrases",
            "Self-corrected twice, minimal cues",
        ),
        (
            "seed-003",
            "9c8b7a6d-5e4f-4d3c-8b2a-190e8d7c6b5a",
            NaiveDate::from_ymd_opt(2026, 2, 5).context("invalid date")?,
            20,
            16,
            "Story retell with embedded /r/ words",
            "Produced /r/ independently in most sentences",
        ),
        (
            "seed-004",
            "8d7c6b5a-4e3f-4c2d-9b1a-080e7d6c5b4a",
            NaiveDate::from_ymd_opt(2026, 1, 15).context("invalid date")?,
            10,
            6,
            "Sequenced picture cards, past-tense retell",
            "Mixed regular and irregular past tense",
        ),
    ];

    for (source_key, goal_id, session_date, attempted, correct, activities, response) in sessions {
        let goal_id = Uuid::parse_str(goal_id)?;
        let student_id: Uuid = sqlx::query("SELECT student_id FROM caseload.goals WHERE id = $1")
            .bind(goal_id)
            .fetch_one(pool)
            .await?
            .get("student_id");
        let accuracy = progress::accuracy(attempted, correct)?;

        sqlx::query(
            r#"
            INSERT INTO caseload.sessions
            (id, student_id, goal_id, session_date, trials_attempted, trials_correct,
             accuracy_percent, activities, student_response, billable, cpt_code, source_key)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, TRUE, '92507', $10)
            ON CONFLICT (source_key) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(student_id)
        .bind(goal_id)
        .bind(session_date)
        .bind(attempted)
        .bind(correct)
        .bind(accuracy)
        .bind(activities)
        .bind(response)
        .bind(source_key)
        .execute(pool)
        .await?;
    }

    Ok(())
}

pub async fn fetch_student(pool: &PgPool, full_name: &str) -> anyhow::Result<StudentRecord> {
    let row = sqlx::query("SELECT id, full_name, grade FROM caseload.students WHERE full_name = $1")
        .bind(full_name)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| ProgressError::NotFound(format!("student '{full_name}'")))?;

    Ok(StudentRecord {
        id: row.get("id"),
        full_name: row.get("full_name"),
        grade: row.get("grade"),
    })
}

pub async fn fetch_goals(pool: &PgPool, student_id: Uuid) -> anyhow::Result<Vec<GoalRecord>> {
    let rows = sqlx::query(
        r#"
        SELECT id, student_id, area, goal_text, baseline, criterion, mastery_requirement, status
        FROM caseload.goals
        WHERE student_id = $1
        ORDER BY area, goal_text
        "#,
    )
    .bind(student_id)
    .fetch_all(pool)
    .await?;

    let mut goals = Vec::new();
    for row in rows {
        let area: String = row.get("area");
        let status: String = row.get("status");
        goals.push(GoalRecord {
            id: row.get("id"),
            student_id: row.get("student_id"),
            area: area.parse()?,
            goal_text: row.get("goal_text"),
            baseline: row.get("baseline"),
            criterion: row.get("criterion"),
            mastery_requirement: row.get("mastery_requirement"),
            status: status.parse()?,
        });
    }

    Ok(goals)
}

pub async fn fetch_sessions(pool: &PgPool, student_id: Uuid) -> anyhow::Result<Vec<SessionRecord>> {
    let rows = sqlx::query(
        r#"
        SELECT id, student_id, goal_id, session_date, trials_attempted, trials_correct,
               accuracy_percent, activities, student_response, billable, cpt_code
        FROM caseload.sessions
        WHERE student_id = $1
        ORDER BY session_date, id
        "#,
    )
    .bind(student_id)
    .fetch_all(pool)
    .await?;

    let mut sessions = Vec::new();
    for row in rows {
        sessions.push(SessionRecord {
            id: row.get("id"),
            student_id: row.get("student_id"),
            goal_id: row.get("goal_id"),
            date: row.get("session_date"),
            trials_attempted: row.get("trials_attempted"),
            trials_correct: row.get("trials_correct"),
            accuracy_percent: row.get("accuracy_percent"),
            activities: row.get("activities"),
            student_response: row.get("student_response"),
            billable: row.get("billable"),
            cpt_code: row.get("cpt_code"),
        });
    }

    Ok(sessions)
}

pub async fn import_csv(pool: &PgPool, csv_path: &std::path::Path) -> anyhow::Result<usize> {
    #[derive(serde::Deserialize)]
    struct CsvRow {
        student_name: String,
        goal_id: Uuid,
        session_date: NaiveDate,
        trials_attempted: i32,
        trials_correct: i32,
        activities: String,
        student_response: String,
        billable: Option<bool>,
        cpt_code: Option<String>,
        source_key: Option<String>,
    }

    let mut reader = csv::Reader::from_path(csv_path)?;
    let mut inserted = 0usize;

    for result in reader.deserialize::<CsvRow>() {
        let row = result?;
        let student = fetch_student(pool, &row.student_name).await?;

        let goal_owner: Uuid = sqlx::query("SELECT student_id FROM caseload.goals WHERE id = $1")
            .bind(row.goal_id)
            .fetch_optional(pool)
            .await?
            .map(|r| r.get("student_id"))
            .ok_or_else(|| ProgressError::NotFound(format!("goal {}", row.goal_id)))?;
        if goal_owner != student.id {
            return Err(ProgressError::InvalidInput(format!(
                "goal {} does not belong to student '{}'",
                row.goal_id, row.student_name
            ))
            .into());
        }

        // Accuracy is always derived from trial counts, never taken from the file.
        let accuracy = progress::accuracy(row.trials_attempted, row.trials_correct)?;

        let source_key = row
            .source_key
            .unwrap_or_else(|| format!("import-{}", Uuid::new_v4()));

        let result = sqlx::query(
            r#"
            INSERT INTO caseload.sessions
            (id, student_id, goal_id, session_date, trials_attempted, trials_correct,
             accuracy_percent, activities, student_response, billable, cpt_code, source_key)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            ON CONFLICT (source_key) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(student.id)
        .bind(row.goal_id)
        .bind(row.session_date)
        .bind(row.trials_attempted)
        .bind(row.trials_correct)
        .bind(accuracy)
        .bind(&row.activities)
        .bind(&row.student_response)
        .bind(row.billable.unwrap_or(true))
        .bind(&row.cpt_code)
        .bind(source_key)
        .execute(pool)
        .await?;

        if result.rows_affected() > 0 {
            inserted += 1;
        }
    }

    Ok(inserted)
}
