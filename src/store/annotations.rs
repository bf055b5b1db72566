use rusqlite::{Connection, OptionalExtension, Row, params};

use super::sqlite::{in_transaction, map_unique, now, parse_datetime};
use crate::error::{Error, Result};
use crate::types::*;

const SUMMARY_SELECT: &str = "SELECT a.id, a.parent_annotation_id, a.text_id, t.title, t.md5sum,
        a.created_by, u.username, a.method, a.method_metadata, a.label, a.is_public,
        a.automated_method_in_progress, a.automated_method_error, a.created_at, a.updated_at";

const SUMMARY_FROM: &str = "FROM annotations a
     JOIN users u ON u.id = a.created_by
     JOIN texts t ON t.id = a.text_id";

/// Index of the first column after the summary columns.
const EXTRA_COLUMN: usize = 15;

const PERMISSION_SELECT: &str = "SELECT p.id, p.user_id, p.annotation_id, p.permission, u.username,
        p.created_at, p.updated_at
     FROM annotation_permissions p
     JOIN users u ON u.id = p.user_id";

fn summary_from_row(row: &Row<'_>) -> rusqlite::Result<AnnotationSummary> {
    Ok(AnnotationSummary {
        annotation_id: row.get(0)?,
        parent_annotation_id: row.get(1)?,
        text_id: row.get(2)?,
        text_title: row.get(3)?,
        text_md5sum: row.get(4)?,
        user_id: row.get(5)?,
        username: row.get(6)?,
        method: row.get(7)?,
        method_metadata: row.get(8)?,
        label: row.get(9)?,
        is_public: row.get(10)?,
        automated_method_in_progress: row.get(11)?,
        automated_method_error: row.get(12)?,
        created_at: parse_datetime(&row.get::<_, String>(13)?),
        updated_at: parse_datetime(&row.get::<_, String>(14)?),
        permission: None,
    })
}

fn permission_from_row(row: &Row<'_>) -> rusqlite::Result<AnnotationPermission> {
    Ok(AnnotationPermission {
        id: row.get(0)?,
        user_id: row.get(1)?,
        annotation_id: row.get(2)?,
        permission: row.get(3)?,
        username: row.get(4)?,
        created_at: parse_datetime(&row.get::<_, String>(5)?),
        updated_at: parse_datetime(&row.get::<_, String>(6)?),
    })
}

fn collect_summaries(
    conn: &Connection,
    sql: &str,
    params: impl rusqlite::Params,
) -> Result<Vec<AnnotationSummary>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params, summary_from_row)?;

    rows.collect::<std::result::Result<Vec<_>, _>>()
        .map_err(Error::from)
}

/// Reads a summary plus the raw graph column and decodes the graph.
fn query_annotation(
    conn: &Connection,
    filter: &str,
    params: impl rusqlite::Params,
) -> Result<Option<Annotation>> {
    let row = conn
        .query_row(
            &format!("{SUMMARY_SELECT}, a.annotation {SUMMARY_FROM} {filter}"),
            params,
            |row| {
                Ok((
                    summary_from_row(row)?,
                    row.get::<_, String>(EXTRA_COLUMN)?,
                ))
            },
        )
        .optional()?;

    let Some((summary, raw)) = row else {
        return Ok(None);
    };
    let annotation = AnnotationGraph::from_json(&raw).inspect_err(|e| {
        tracing::error!(
            annotation_id = summary.annotation_id,
            error = %e,
            "stored annotation graph is not valid JSON"
        );
    })?;
    Ok(Some(Annotation {
        summary,
        annotation,
    }))
}

/// Inserts an annotation. The graph is always stored as a JSON object.
pub fn add_annotation(conn: &Connection, annotation: &NewAnnotation<'_>) -> Result<i64> {
    let graph = annotation.graph.to_json()?;
    let ts = now();
    conn.execute(
        "INSERT INTO annotations (text_id, created_by, parent_annotation_id, annotation,
             method, method_metadata, label, automated_method_in_progress,
             automated_method_error, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 0, ?9, ?9)",
        params![
            annotation.text_id,
            annotation.user_id,
            annotation.parent_annotation_id,
            graph,
            annotation.method,
            annotation.method_metadata,
            annotation.label,
            annotation.automated_method_in_progress,
            ts,
        ],
    )
    .inspect_err(|e| {
        tracing::error!(
            text_id = annotation.text_id,
            user_id = annotation.user_id,
            parent_annotation_id = annotation.parent_annotation_id,
            method = annotation.method,
            error = %e,
            "error adding annotation"
        );
    })?;
    Ok(conn.last_insert_rowid())
}

/// Annotation summaries, optionally for one text, each carrying the session
/// user's permission level when one is stored. Visibility is left to the
/// caller.
pub fn lookup_annotations(
    conn: &Connection,
    session: &Session,
    text_id: Option<i64>,
) -> Result<Vec<AnnotationSummary>> {
    let mut stmt = conn.prepare(&format!(
        "{SUMMARY_SELECT}, p.permission {SUMMARY_FROM}
         LEFT JOIN annotation_permissions p ON p.annotation_id = a.id AND p.user_id = ?1
         WHERE (?2 IS NULL OR a.text_id = ?2)
         ORDER BY a.id"
    ))?;

    let rows = stmt.query_map(params![session.user_id, text_id], |row| {
        let mut summary = summary_from_row(row)?;
        summary.permission = row.get(EXTRA_COLUMN)?;
        Ok(summary)
    })?;

    rows.collect::<std::result::Result<Vec<_>, _>>()
        .map_err(Error::from)
}

pub fn lookup_annotations_by_user(conn: &Connection, user_id: i64) -> Result<Vec<AnnotationSummary>> {
    collect_summaries(
        conn,
        &format!("{SUMMARY_SELECT} {SUMMARY_FROM} WHERE a.created_by = ?1 ORDER BY a.id"),
        params![user_id],
    )
}

pub fn lookup_annotations_by_text(conn: &Connection, text_id: i64) -> Result<Vec<AnnotationSummary>> {
    collect_summaries(
        conn,
        &format!("{SUMMARY_SELECT} {SUMMARY_FROM} WHERE a.text_id = ?1 ORDER BY a.id"),
        params![text_id],
    )
}

/// One annotation with its decoded graph.
pub fn lookup_annotation(conn: &Connection, id: i64) -> Result<Option<Annotation>> {
    query_annotation(conn, "WHERE a.id = ?1", params![id])
}

/// The root annotation of a text, the one with no parent.
pub fn get_blank_slate_annotation(conn: &Connection, text_id: i64) -> Result<Option<Annotation>> {
    query_annotation(
        conn,
        "WHERE a.text_id = ?1 AND a.parent_annotation_id IS NULL ORDER BY a.id LIMIT 1",
        params![text_id],
    )
}

/// Writes the `Some` fields of `update` to an annotation and bumps
/// `updated_at`.
///
/// `user_id` must be the annotation's creator or hold at least WRITE on it.
/// Graph changes follow read-modify-write: the caller reads the annotation,
/// computes the new graph and passes it here.
pub fn update_annotation(
    conn: &Connection,
    id: i64,
    user_id: i64,
    update: &AnnotationUpdate,
) -> Result<()> {
    in_transaction(conn, "update annotation", |conn| {
        let created_by: i64 = conn
            .query_row(
                "SELECT created_by FROM annotations WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()?
            .ok_or(Error::NotFound)?;

        if created_by != user_id {
            let level = get_annotation_permission(conn, user_id, id)?
                .map(|p| p.permission)
                .unwrap_or_default();
            if !level.allows(PermissionLevel::Write) {
                return Err(Error::Forbidden);
            }
        }

        let mut assignments = Vec::new();
        let mut values: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(is_public) = update.is_public {
            values.push(Box::new(is_public));
            assignments.push(format!("is_public = ?{}", values.len()));
        }
        if let Some(graph) = &update.graph {
            values.push(Box::new(graph.to_json()?));
            assignments.push(format!("annotation = ?{}", values.len()));
        }
        if let Some(label) = &update.label {
            values.push(Box::new(label.clone()));
            assignments.push(format!("label = ?{}", values.len()));
        }
        values.push(Box::new(now()));
        assignments.push(format!("updated_at = ?{}", values.len()));
        values.push(Box::new(id));

        let sql = format!(
            "UPDATE annotations SET {} WHERE id = ?{}",
            assignments.join(", "),
            values.len()
        );
        conn.execute(&sql, rusqlite::params_from_iter(values.iter()))?;
        Ok(())
    })
}

/// Written by the external automated-annotation worker.
pub fn set_annotation_flags(
    conn: &Connection,
    id: i64,
    in_progress: bool,
    error: bool,
) -> Result<()> {
    let rows = conn.execute(
        "UPDATE annotations
         SET automated_method_in_progress = ?1, automated_method_error = ?2, updated_at = ?3
         WHERE id = ?4",
        params![in_progress, error, now(), id],
    )?;
    if rows == 0 {
        return Err(Error::NotFound);
    }
    Ok(())
}

// Annotation permissions

pub fn get_annotation_permission(
    conn: &Connection,
    user_id: i64,
    annotation_id: i64,
) -> Result<Option<AnnotationPermission>> {
    conn.query_row(
        &format!("{PERMISSION_SELECT} WHERE p.user_id = ?1 AND p.annotation_id = ?2"),
        params![user_id, annotation_id],
        permission_from_row,
    )
    .optional()
    .map_err(Error::from)
}

pub fn get_annotation_permission_by_id(
    conn: &Connection,
    id: i64,
) -> Result<Option<AnnotationPermission>> {
    conn.query_row(
        &format!("{PERMISSION_SELECT} WHERE p.id = ?1"),
        params![id],
        permission_from_row,
    )
    .optional()
    .map_err(Error::from)
}

pub fn list_annotation_permissions(
    conn: &Connection,
    annotation_id: i64,
) -> Result<Vec<AnnotationPermission>> {
    let mut stmt = conn.prepare(&format!(
        "{PERMISSION_SELECT} WHERE p.annotation_id = ?1 ORDER BY p.id"
    ))?;
    let rows = stmt.query_map(params![annotation_id], permission_from_row)?;

    rows.collect::<std::result::Result<Vec<_>, _>>()
        .map_err(Error::from)
}

pub fn add_annotation_permission(
    conn: &Connection,
    user_id: i64,
    annotation_id: i64,
    level: PermissionLevel,
) -> Result<i64> {
    in_transaction(conn, "add annotation permission", |conn| {
        let ts = now();
        conn.execute(
            "INSERT INTO annotation_permissions
                 (annotation_id, user_id, permission, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?4)",
            params![annotation_id, user_id, level, ts],
        )
        .map_err(|e| {
            map_unique(e, || {
                format!("permission for user {user_id} on annotation {annotation_id}")
            })
        })?;
        Ok(conn.last_insert_rowid())
    })
}

pub fn set_annotation_permission(conn: &Connection, id: i64, level: PermissionLevel) -> Result<()> {
    let rows = conn.execute(
        "UPDATE annotation_permissions SET permission = ?1, updated_at = ?2 WHERE id = ?3",
        params![level, now(), id],
    )?;
    if rows == 0 {
        return Err(Error::NotFound);
    }
    Ok(())
}

pub fn delete_annotation_permission(conn: &Connection, id: i64) -> Result<bool> {
    let rows = conn.execute(
        "DELETE FROM annotation_permissions WHERE id = ?1",
        params![id],
    )?;
    Ok(rows > 0)
}
