use rusqlite::{Connection, OptionalExtension, Row, params};

use super::sqlite::{map_unique, now, parse_datetime};
use crate::error::{Error, Result};
use crate::types::User;

const USER_COLUMNS: &str = "id, username, password, auth_token, created_at, updated_at";

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        password: row.get(2)?,
        auth_token: row.get::<_, Option<String>>(3)?.filter(|t| !t.is_empty()),
        created_at: parse_datetime(&row.get::<_, String>(4)?),
        updated_at: parse_datetime(&row.get::<_, String>(5)?),
    })
}

/// Inserts an account. A taken username is reported as `AlreadyExists`.
pub fn create_user(conn: &Connection, username: &str, password_hash: &str) -> Result<i64> {
    let ts = now();
    conn.execute(
        "INSERT INTO users (username, password, created_at, updated_at) VALUES (?1, ?2, ?3, ?3)",
        params![username, password_hash, ts],
    )
    .map_err(|e| map_unique(e, || format!("user '{username}'")))?;
    Ok(conn.last_insert_rowid())
}

pub fn get_user(conn: &Connection, id: i64) -> Result<Option<User>> {
    conn.query_row(
        &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
        params![id],
        user_from_row,
    )
    .optional()
    .map_err(Error::from)
}

pub fn get_user_by_name(conn: &Connection, username: &str) -> Result<Option<User>> {
    conn.query_row(
        &format!("SELECT {USER_COLUMNS} FROM users WHERE username = ?1"),
        params![username],
        user_from_row,
    )
    .optional()
    .map_err(Error::from)
}

/// Looks up the user holding `token`. An empty token (a logged-out account)
/// never matches.
pub fn get_user_by_auth_token(conn: &Connection, token: &str) -> Result<Option<User>> {
    if token.is_empty() {
        return Ok(None);
    }
    conn.query_row(
        &format!("SELECT {USER_COLUMNS} FROM users WHERE auth_token = ?1"),
        params![token],
        user_from_row,
    )
    .optional()
    .map_err(Error::from)
}

/// Replaces the user's session token; an empty string signs the user out.
/// Updating a user id that does not exist is not an error.
pub fn set_auth_token(conn: &Connection, user_id: i64, token: &str) -> Result<()> {
    conn.execute(
        "UPDATE users SET auth_token = ?1, updated_at = ?2 WHERE id = ?3",
        params![token, now(), user_id],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::test_store;
    use crate::store::Store;

    #[test]
    fn test_user_crud() {
        let (_temp, store) = test_store();

        let id = store.create_user("lizzy", "argon-hash").unwrap();

        let by_name = store.get_user_by_name("lizzy").unwrap().unwrap();
        assert_eq!(by_name.id, id);
        assert_eq!(by_name.password, "argon-hash");
        assert!(by_name.auth_token.is_none());

        let by_id = store.get_user(id).unwrap().unwrap();
        assert_eq!(by_id.username, "lizzy");

        assert!(store.get_user_by_name("darcy").unwrap().is_none());
    }

    #[test]
    fn test_duplicate_username_is_rejected() {
        let (_temp, store) = test_store();
        store.create_user("lizzy", "a").unwrap();

        let result = store.create_user("lizzy", "b");
        assert!(matches!(result, Err(Error::AlreadyExists(_))));
    }

    #[test]
    fn test_auth_token_lifecycle() {
        let (_temp, store) = test_store();
        let id = store.create_user("lizzy", "hash").unwrap();

        store.set_auth_token(id, "abc123").unwrap();
        let user = store.get_user_by_auth_token("abc123").unwrap().unwrap();
        assert_eq!(user.id, id);
        assert_eq!(user.auth_token.as_deref(), Some("abc123"));

        store.set_auth_token(id, "def456").unwrap();
        assert!(store.get_user_by_auth_token("abc123").unwrap().is_none());

        store.set_auth_token(id, "").unwrap();
        assert!(store.get_user_by_auth_token("").unwrap().is_none());
        assert!(store.get_user_by_auth_token("def456").unwrap().is_none());
    }

    #[test]
    fn test_set_auth_token_for_unknown_user_is_a_no_op() {
        let (_temp, store) = test_store();
        store.set_auth_token(999, "token").unwrap();
        assert!(store.get_user_by_auth_token("token").unwrap().is_none());
    }
}
