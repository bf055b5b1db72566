use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};

use super::sqlite::{
    format_datetime, in_transaction, map_unique, now, parse_datetime, parse_optional_datetime,
};
use crate::error::{Error, Result};
use crate::types::*;

fn study_from_row(row: &Row<'_>) -> rusqlite::Result<Study> {
    Ok(Study {
        id: row.get(0)?,
        name: row.get(1)?,
        begin_at: parse_optional_datetime(row.get(2)?),
        end_at: parse_optional_datetime(row.get(3)?),
        created_at: parse_datetime(&row.get::<_, String>(4)?),
    })
}

fn participant_study_from_row(row: &Row<'_>) -> rusqlite::Result<ParticipantStudy> {
    Ok(ParticipantStudy {
        study: study_from_row(row)?,
        participant_id: row.get(5)?,
        group_id: row.get(6)?,
    })
}

const PARTICIPANT_STUDY_SELECT: &str = "SELECT s.id, s.name, s.begin_at, s.end_at, s.created_at,
        p.id, p.group_id
     FROM study_participants p
     JOIN studies s ON s.id = p.study_id";

/// Studies the user takes part in. With no explicit `user_id` the session's
/// user is used; with neither this fails with `NoUser`.
pub fn get_studies(
    conn: &Connection,
    session: &Session,
    user_id: Option<i64>,
) -> Result<Vec<ParticipantStudy>> {
    let user_id = session.resolve_user(user_id).inspect_err(|_| {
        tracing::error!("cannot fetch studies without a user id");
    })?;

    let mut stmt = conn.prepare(&format!(
        "{PARTICIPANT_STUDY_SELECT} WHERE p.user_id = ?1 ORDER BY s.id"
    ))?;
    let rows = stmt.query_map(params![user_id], participant_study_from_row)?;

    rows.collect::<std::result::Result<Vec<_>, _>>()
        .map_err(Error::from)
}

pub fn get_study(conn: &Connection, id: i64) -> Result<Option<Study>> {
    conn.query_row(
        "SELECT id, name, begin_at, end_at, created_at FROM studies WHERE id = ?1",
        params![id],
        study_from_row,
    )
    .optional()
    .map_err(Error::from)
}

/// The steps of a study in the order the user's group sees them, with the
/// user's own progress on each. `None` when the user is not a participant.
pub fn get_steps(
    conn: &Connection,
    study_id: i64,
    session: &Session,
    user_id: Option<i64>,
) -> Result<Option<StudySteps>> {
    let user_id = session.resolve_user(user_id).inspect_err(|_| {
        tracing::error!(study_id, "cannot fetch study steps without a user id");
    })?;

    let study = conn
        .query_row(
            &format!("{PARTICIPANT_STUDY_SELECT} WHERE p.study_id = ?1 AND p.user_id = ?2"),
            params![study_id, user_id],
            participant_study_from_row,
        )
        .optional()?;
    let Some(study) = study else {
        return Ok(None);
    };
    let Some(group_id) = study.group_id else {
        tracing::warn!(
            study_id,
            participant_id = study.participant_id,
            "participant has no study group, so no steps are ordered for them"
        );
        return Ok(Some(StudySteps {
            study,
            steps: Vec::new(),
        }));
    };

    let mut stmt = conn.prepare(
        "SELECT st.id, st.label, st.url, st.base_annotation_id, ps.annotation_id,
                o.ordering, ps.started_at, ps.completed_at, st.created_at
         FROM study_step_orderings o
         JOIN study_steps st ON st.id = o.step_id
         LEFT JOIN study_participant_steps ps
             ON ps.step_id = st.id AND ps.study_participant_id = ?1
         WHERE o.group_id = ?2
         ORDER BY o.ordering",
    )?;
    let rows = stmt.query_map(params![study.participant_id, group_id], |row| {
        Ok(StudyStep {
            id: row.get(0)?,
            label: row.get(1)?,
            url: row.get(2)?,
            base_annotation_id: row.get(3)?,
            annotation_id: row.get(4)?,
            ordering: row.get(5)?,
            started_at: parse_optional_datetime(row.get(6)?),
            completed_at: parse_optional_datetime(row.get(7)?),
            created_at: parse_datetime(&row.get::<_, String>(8)?),
        })
    })?;
    let steps = rows.collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(Some(StudySteps { study, steps }))
}

/// Every study, for administrative tools.
pub fn list_all_studies(conn: &Connection) -> Result<Vec<Study>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, begin_at, end_at, created_at FROM studies ORDER BY id",
    )?;
    let rows = stmt.query_map([], study_from_row)?;

    rows.collect::<std::result::Result<Vec<_>, _>>()
        .map_err(Error::from)
}

/// Stores one batch of events a participant logged on a step. `data` is the
/// batch as a JSON array.
pub fn add_study_data(
    conn: &Connection,
    participant_id: i64,
    step_id: i64,
    data: &str,
) -> Result<i64> {
    conn.execute(
        "INSERT INTO study_data (study_participant_id, step_id, data, created_at)
         VALUES (?1, ?2, ?3, ?4)",
        params![participant_id, step_id, data, now()],
    )?;
    Ok(conn.last_insert_rowid())
}

/// All event batches recorded for a study, oldest first.
pub fn get_study_data(conn: &Connection, study_id: i64) -> Result<Vec<StudyDataRecord>> {
    let mut stmt = conn.prepare(
        "SELECT s.id, s.name, s.begin_at, s.end_at,
                d.id, d.step_id, st.label, st.base_annotation_id, st.url,
                p.id, u.id, u.username, p.group_id, g.label,
                ps.started_at, ps.completed_at,
                a.text_id, t.title, ps.annotation_id, a.label,
                d.created_at, d.data
         FROM study_data d
         JOIN study_participants p ON p.id = d.study_participant_id
         JOIN studies s ON s.id = p.study_id
         JOIN users u ON u.id = p.user_id
         JOIN study_steps st ON st.id = d.step_id
         LEFT JOIN study_groups g ON g.id = p.group_id
         LEFT JOIN study_participant_steps ps
             ON ps.study_participant_id = p.id AND ps.step_id = d.step_id
         LEFT JOIN annotations a ON a.id = ps.annotation_id
         LEFT JOIN texts t ON t.id = a.text_id
         WHERE s.id = ?1
         ORDER BY d.id",
    )?;
    let rows = stmt.query_map(params![study_id], |row| {
        Ok(StudyDataRecord {
            study_id: row.get(0)?,
            study_name: row.get(1)?,
            study_begin_at: parse_optional_datetime(row.get(2)?),
            study_end_at: parse_optional_datetime(row.get(3)?),
            study_data_id: row.get(4)?,
            step_id: row.get(5)?,
            step_label: row.get(6)?,
            base_annotation_id: row.get(7)?,
            step_url: row.get(8)?,
            participant_id: row.get(9)?,
            participant_user_id: row.get(10)?,
            participant_username: row.get(11)?,
            participant_group_id: row.get(12)?,
            participant_group_label: row.get(13)?,
            step_started_at: parse_optional_datetime(row.get(14)?),
            step_completed_at: parse_optional_datetime(row.get(15)?),
            text_id: row.get(16)?,
            text_title: row.get(17)?,
            annotation_id: row.get(18)?,
            annotation_label: row.get(19)?,
            study_data_uploaded_at: parse_datetime(&row.get::<_, String>(20)?),
            data: row.get(21)?,
        })
    })?;

    rows.collect::<std::result::Result<Vec<_>, _>>()
        .map_err(Error::from)
}

pub fn add_study(
    conn: &Connection,
    name: &str,
    begin_at: Option<DateTime<Utc>>,
    end_at: Option<DateTime<Utc>>,
) -> Result<i64> {
    in_transaction(conn, "add study", |conn| {
        conn.execute(
            "INSERT INTO studies (name, begin_at, end_at, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                name,
                begin_at.as_ref().map(format_datetime),
                end_at.as_ref().map(format_datetime),
                now(),
            ],
        )?;
        Ok(conn.last_insert_rowid())
    })
}

pub fn add_study_group(conn: &Connection, study_id: i64, label: Option<&str>) -> Result<i64> {
    in_transaction(conn, "add study group", |conn| {
        conn.execute(
            "INSERT INTO study_groups (study_id, label, created_at) VALUES (?1, ?2, ?3)",
            params![study_id, label, now()],
        )?;
        Ok(conn.last_insert_rowid())
    })
}

pub fn add_study_step(conn: &Connection, step: &NewStudyStep<'_>) -> Result<i64> {
    in_transaction(conn, "add study step", |conn| {
        conn.execute(
            "INSERT INTO study_steps (study_id, label, base_annotation_id, url, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                step.study_id,
                step.label,
                step.base_annotation_id,
                step.url,
                now()
            ],
        )?;
        Ok(conn.last_insert_rowid())
    })
}

/// Places a step at position `ordering` (1 = first) for a group.
pub fn add_study_step_ordering(
    conn: &Connection,
    group_id: i64,
    step_id: i64,
    ordering: i64,
) -> Result<()> {
    conn.execute(
        "INSERT INTO study_step_orderings (group_id, step_id, ordering, created_at)
         VALUES (?1, ?2, ?3, ?4)",
        params![group_id, step_id, ordering, now()],
    )
    .map_err(|e| map_unique(e, || format!("step {step_id} in group {group_id}")))?;
    Ok(())
}

pub fn add_study_participant(
    conn: &Connection,
    study_id: i64,
    user_id: i64,
    group_id: Option<i64>,
) -> Result<i64> {
    conn.execute(
        "INSERT INTO study_participants (study_id, user_id, group_id, created_at)
         VALUES (?1, ?2, ?3, ?4)",
        params![study_id, user_id, group_id, now()],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Records that a participant has been given a step, optionally with the
/// annotation they will work on.
pub fn add_study_participant_step(
    conn: &Connection,
    participant_id: i64,
    step_id: i64,
    annotation_id: Option<i64>,
) -> Result<()> {
    conn.execute(
        "INSERT INTO study_participant_steps
             (study_participant_id, step_id, annotation_id, created_at)
         VALUES (?1, ?2, ?3, ?4)",
        params![participant_id, step_id, annotation_id, now()],
    )
    .map_err(|e| {
        map_unique(e, || {
            format!("step {step_id} for participant {participant_id}")
        })
    })?;
    Ok(())
}
