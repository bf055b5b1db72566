use std::path::PathBuf;

use rusqlite::{Connection, OptionalExtension, Row, params};

use super::sqlite::{in_transaction, map_unique, now, parse_datetime};
use super::text_storage::{Placement, TextStorage};
use crate::error::{Error, Result};
use crate::types::*;

const TEXT_SELECT: &str = "SELECT t.id, t.title, t.md5sum, t.tokenization_in_progress,
        t.tokenization_error, t.uploaded_by, u.username, t.is_public, t.created_at, t.updated_at
     FROM texts t
     JOIN users u ON u.id = t.uploaded_by";

const PERMISSION_SELECT: &str = "SELECT p.id, p.user_id, p.text_id, p.permission, u.username,
        p.created_at, p.updated_at
     FROM text_permissions p
     JOIN users u ON u.id = p.user_id";

fn text_from_row(row: &Row<'_>) -> rusqlite::Result<Text> {
    Ok(Text {
        id: row.get(0)?,
        title: row.get(1)?,
        md5sum: row.get(2)?,
        tokenization_in_progress: row.get(3)?,
        tokenization_error: row.get(4)?,
        uploaded_by: row.get(5)?,
        uploaded_by_username: row.get(6)?,
        is_public: row.get(7)?,
        created_at: parse_datetime(&row.get::<_, String>(8)?),
        updated_at: parse_datetime(&row.get::<_, String>(9)?),
    })
}

fn permission_from_row(row: &Row<'_>) -> rusqlite::Result<TextPermission> {
    Ok(TextPermission {
        id: row.get(0)?,
        user_id: row.get(1)?,
        text_id: row.get(2)?,
        permission: row.get(3)?,
        username: row.get(4)?,
        created_at: parse_datetime(&row.get::<_, String>(5)?),
        updated_at: parse_datetime(&row.get::<_, String>(6)?),
    })
}

/// Registers an uploaded text.
///
/// The metadata row is inserted first; the upload is then moved into the
/// content-addressed storage tree unless identical content is already there,
/// in which case the new row shares it. A storage failure rolls the insert
/// back (or propagates to the caller's transaction).
pub fn add_text(conn: &Connection, storage: &TextStorage, text: &NewText<'_>) -> Result<AddedText> {
    in_transaction(conn, "add text", |conn| {
        let ts = now();
        conn.execute(
            "INSERT INTO texts (title, md5sum, uploaded_by, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?4)",
            params![text.title, text.md5sum, text.uploaded_by, ts],
        )?;
        let id = conn.last_insert_rowid();

        let needs_processing = match storage.place(text.md5sum, text.source)? {
            Placement::Placed => true,
            Placement::Existing => storage.needs_processing(text.md5sum)?,
        };

        let stored = get_text(conn, id)?.ok_or(Error::NotFound)?;
        tracing::info!(text_id = id, md5sum = text.md5sum, needs_processing, "text added");
        Ok(AddedText {
            text: stored,
            needs_processing,
        })
    })
}

pub fn get_text(conn: &Connection, id: i64) -> Result<Option<Text>> {
    conn.query_row(
        &format!("{TEXT_SELECT} WHERE t.id = ?1"),
        params![id],
        text_from_row,
    )
    .optional()
    .map_err(Error::from)
}

/// Lists the texts the session may read, in id order, with their annotation
/// counts and the session user's permission on each.
///
/// Anonymous sessions see public texts only; signed-in users also see texts
/// they hold at least READ on. `count` bounds the readable rows returned.
pub fn list_texts(conn: &Connection, session: &Session, query: &TextQuery) -> Result<Vec<TextListing>> {
    let mut stmt = conn.prepare(
        "SELECT t.id, t.title, t.md5sum, t.tokenization_in_progress,
                t.tokenization_error, t.uploaded_by, u.username, t.is_public,
                t.created_at, t.updated_at,
                (SELECT COUNT(*) FROM annotations a WHERE a.text_id = t.id),
                p.permission
         FROM texts t
         JOIN users u ON u.id = t.uploaded_by
         LEFT JOIN text_permissions p ON p.text_id = t.id AND p.user_id = ?1
         WHERE t.id >= ?2 AND (?3 IS NULL OR t.id <= ?3)
           AND (t.is_public = 1 OR COALESCE(p.permission, 0) >= 1)
         ORDER BY t.id
         LIMIT ?4",
    )?;

    // SQLite treats a negative LIMIT as "no limit".
    let limit = query.count.unwrap_or(-1);
    let rows = stmt.query_map(
        params![session.user_id, query.start_id, query.end_id, limit],
        |row| {
            Ok(TextListing {
                text: text_from_row(row)?,
                annotation_count: row.get(10)?,
                permission: row.get(11)?,
            })
        },
    )?;

    rows.collect::<std::result::Result<Vec<_>, _>>()
        .map_err(Error::from)
}

pub fn count_texts(conn: &Connection) -> Result<i64> {
    conn.query_row("SELECT COUNT(*) FROM texts", [], |row| row.get(0))
        .map_err(Error::from)
}

/// Partial update: only the fields set in `update` are written.
pub fn update_text(conn: &Connection, id: i64, update: &TextUpdate) -> Result<()> {
    let mut assignments = Vec::new();
    let mut values: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

    if let Some(is_public) = update.is_public {
        values.push(Box::new(is_public));
        assignments.push(format!("is_public = ?{}", values.len()));
    }
    if let Some(title) = &update.title {
        values.push(Box::new(title.clone()));
        assignments.push(format!("title = ?{}", values.len()));
    }
    values.push(Box::new(now()));
    assignments.push(format!("updated_at = ?{}", values.len()));
    values.push(Box::new(id));

    let sql = format!(
        "UPDATE texts SET {} WHERE id = ?{}",
        assignments.join(", "),
        values.len()
    );
    let rows = conn.execute(&sql, rusqlite::params_from_iter(values.iter()))?;
    if rows == 0 {
        return Err(Error::NotFound);
    }
    Ok(())
}

/// Written by the external tokenizer as it picks up and finishes a text.
pub fn set_tokenization_flags(
    conn: &Connection,
    id: i64,
    in_progress: bool,
    error: bool,
) -> Result<()> {
    let rows = conn.execute(
        "UPDATE texts SET tokenization_in_progress = ?1, tokenization_error = ?2, updated_at = ?3
         WHERE id = ?4",
        params![in_progress, error, now(), id],
    )?;
    if rows == 0 {
        return Err(Error::NotFound);
    }
    Ok(())
}

/// Location of the tokenized JSON for a text, whether or not it exists yet.
pub fn text_content_path(
    conn: &Connection,
    storage: &TextStorage,
    id: i64,
) -> Result<Option<PathBuf>> {
    let Some(text) = get_text(conn, id)? else {
        return Ok(None);
    };
    Ok(Some(storage.tokens_json_path(&text.md5sum)?))
}

// Text permissions

pub fn get_text_permission(
    conn: &Connection,
    user_id: i64,
    text_id: i64,
) -> Result<Option<TextPermission>> {
    conn.query_row(
        &format!("{PERMISSION_SELECT} WHERE p.user_id = ?1 AND p.text_id = ?2"),
        params![user_id, text_id],
        permission_from_row,
    )
    .optional()
    .map_err(Error::from)
}

pub fn get_text_permission_by_id(conn: &Connection, id: i64) -> Result<Option<TextPermission>> {
    conn.query_row(
        &format!("{PERMISSION_SELECT} WHERE p.id = ?1"),
        params![id],
        permission_from_row,
    )
    .optional()
    .map_err(Error::from)
}

pub fn list_text_permissions(conn: &Connection, text_id: i64) -> Result<Vec<TextPermission>> {
    let mut stmt = conn.prepare(&format!(
        "{PERMISSION_SELECT} WHERE p.text_id = ?1 ORDER BY p.id"
    ))?;
    let rows = stmt.query_map(params![text_id], permission_from_row)?;

    rows.collect::<std::result::Result<Vec<_>, _>>()
        .map_err(Error::from)
}

/// Grants `level` on a text. A user holds at most one permission per text.
pub fn add_text_permission(
    conn: &Connection,
    user_id: i64,
    text_id: i64,
    level: PermissionLevel,
) -> Result<i64> {
    in_transaction(conn, "add text permission", |conn| {
        let ts = now();
        conn.execute(
            "INSERT INTO text_permissions (text_id, user_id, permission, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?4)",
            params![text_id, user_id, level, ts],
        )
        .map_err(|e| {
            map_unique(e, || {
                format!("permission for user {user_id} on text {text_id}")
            })
        })?;
        Ok(conn.last_insert_rowid())
    })
}

pub fn set_text_permission(conn: &Connection, id: i64, level: PermissionLevel) -> Result<()> {
    let rows = conn.execute(
        "UPDATE text_permissions SET permission = ?1, updated_at = ?2 WHERE id = ?3",
        params![level, now(), id],
    )?;
    if rows == 0 {
        return Err(Error::NotFound);
    }
    Ok(())
}

pub fn delete_text_permission(conn: &Connection, id: i64) -> Result<bool> {
    let rows = conn.execute("DELETE FROM text_permissions WHERE id = ?1", params![id])?;
    Ok(rows > 0)
}
