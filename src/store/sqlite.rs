use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::Connection;

use super::schema::SCHEMA;
use super::text_storage::TextStorage;
use super::{Store, annotations, studies, texts, users};
use crate::error::{Error, Result};
use crate::types::*;

pub struct SqliteStore {
    conn: Mutex<Connection>,
    storage: TextStorage,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(db_path: P, storage_root: impl Into<PathBuf>) -> Result<Self> {
        let conn = Connection::open(db_path)?;

        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.pragma_update(None, "journal_mode", "WAL")?;

        Ok(Self {
            conn: Mutex::new(conn),
            storage: TextStorage::new(storage_root),
        })
    }

    fn conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Returns a guard to the underlying database connection.
    /// This allows consuming applications to execute custom SQL.
    pub fn connection(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn()
    }

    pub fn storage(&self) -> &TextStorage {
        &self.storage
    }

    /// Runs `f` inside one transaction. Store functions called with the
    /// transaction's connection join it instead of opening their own; the
    /// whole unit commits when `f` returns `Ok` and rolls back otherwise.
    pub fn transaction<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection, &TextStorage) -> Result<T>,
    {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        let value = f(&tx, &self.storage)?;
        tx.commit()?;
        Ok(value)
    }
}

/// Runs `f` in a transaction owned by this call, or directly when the
/// connection is already inside a caller's transaction. A caller-owned
/// transaction is never committed or rolled back here: errors propagate and
/// the caller decides.
pub(crate) fn in_transaction<T>(
    conn: &Connection,
    context: &str,
    f: impl FnOnce(&Connection) -> Result<T>,
) -> Result<T> {
    if !conn.is_autocommit() {
        return f(conn);
    }

    let tx = conn.unchecked_transaction()?;
    match f(&tx) {
        Ok(value) => {
            tx.commit()?;
            Ok(value)
        }
        Err(e) => {
            tracing::error!(error = %e, "{} failed, rolling back", context);
            if let Err(rollback) = tx.rollback() {
                tracing::error!(error = %rollback, "rollback failed");
            }
            Err(e)
        }
    }
}

/// Maps unique-key violations to `AlreadyExists`; other failures pass through.
pub(crate) fn map_unique(err: rusqlite::Error, what: impl FnOnce() -> String) -> Error {
    match err {
        rusqlite::Error::SqliteFailure(e, _)
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                || e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY =>
        {
            Error::AlreadyExists(what())
        }
        other => Error::from(other),
    }
}

pub(crate) fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            // Handle SQLite's default datetime format: "YYYY-MM-DD HH:MM:SS"
            chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            tracing::warn!("Invalid datetime in database: '{}' - {}", s, e);
            Utc::now()
        })
}

pub(crate) fn parse_optional_datetime(s: Option<String>) -> Option<DateTime<Utc>> {
    s.filter(|s| !s.is_empty()).as_deref().map(parse_datetime)
}

pub(crate) fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

pub(crate) fn now() -> String {
    format_datetime(&Utc::now())
}

impl Store for SqliteStore {
    fn initialize(&self) -> Result<()> {
        self.conn().execute_batch(SCHEMA)?;
        Ok(())
    }

    // User operations

    fn create_user(&self, username: &str, password_hash: &str) -> Result<i64> {
        users::create_user(&self.conn(), username, password_hash)
    }

    fn get_user(&self, id: i64) -> Result<Option<User>> {
        users::get_user(&self.conn(), id)
    }

    fn get_user_by_name(&self, username: &str) -> Result<Option<User>> {
        users::get_user_by_name(&self.conn(), username)
    }

    fn get_user_by_auth_token(&self, token: &str) -> Result<Option<User>> {
        users::get_user_by_auth_token(&self.conn(), token)
    }

    fn set_auth_token(&self, user_id: i64, token: &str) -> Result<()> {
        users::set_auth_token(&self.conn(), user_id, token)
    }

    // Text operations

    fn add_text(&self, text: &NewText<'_>) -> Result<AddedText> {
        texts::add_text(&self.conn(), &self.storage, text)
    }

    fn get_text(&self, id: i64) -> Result<Option<Text>> {
        texts::get_text(&self.conn(), id)
    }

    fn list_texts(&self, session: &Session, query: &TextQuery) -> Result<Vec<TextListing>> {
        texts::list_texts(&self.conn(), session, query)
    }

    fn count_texts(&self) -> Result<i64> {
        texts::count_texts(&self.conn())
    }

    fn update_text(&self, id: i64, update: &TextUpdate) -> Result<()> {
        texts::update_text(&self.conn(), id, update)
    }

    fn set_tokenization_flags(&self, id: i64, in_progress: bool, error: bool) -> Result<()> {
        texts::set_tokenization_flags(&self.conn(), id, in_progress, error)
    }

    fn text_content_path(&self, id: i64) -> Result<Option<PathBuf>> {
        texts::text_content_path(&self.conn(), &self.storage, id)
    }

    fn get_text_permission(&self, user_id: i64, text_id: i64) -> Result<Option<TextPermission>> {
        texts::get_text_permission(&self.conn(), user_id, text_id)
    }

    fn get_text_permission_by_id(&self, id: i64) -> Result<Option<TextPermission>> {
        texts::get_text_permission_by_id(&self.conn(), id)
    }

    fn list_text_permissions(&self, text_id: i64) -> Result<Vec<TextPermission>> {
        texts::list_text_permissions(&self.conn(), text_id)
    }

    fn add_text_permission(
        &self,
        user_id: i64,
        text_id: i64,
        level: PermissionLevel,
    ) -> Result<i64> {
        texts::add_text_permission(&self.conn(), user_id, text_id, level)
    }

    fn set_text_permission(&self, id: i64, level: PermissionLevel) -> Result<()> {
        texts::set_text_permission(&self.conn(), id, level)
    }

    fn delete_text_permission(&self, id: i64) -> Result<bool> {
        texts::delete_text_permission(&self.conn(), id)
    }

    // Annotation operations

    fn add_annotation(&self, annotation: &NewAnnotation<'_>) -> Result<i64> {
        annotations::add_annotation(&self.conn(), annotation)
    }

    fn lookup_annotations(
        &self,
        session: &Session,
        text_id: Option<i64>,
    ) -> Result<Vec<AnnotationSummary>> {
        annotations::lookup_annotations(&self.conn(), session, text_id)
    }

    fn lookup_annotations_by_user(&self, user_id: i64) -> Result<Vec<AnnotationSummary>> {
        annotations::lookup_annotations_by_user(&self.conn(), user_id)
    }

    fn lookup_annotations_by_text(&self, text_id: i64) -> Result<Vec<AnnotationSummary>> {
        annotations::lookup_annotations_by_text(&self.conn(), text_id)
    }

    fn lookup_annotation(&self, id: i64) -> Result<Option<Annotation>> {
        annotations::lookup_annotation(&self.conn(), id)
    }

    fn update_annotation(&self, id: i64, user_id: i64, update: &AnnotationUpdate) -> Result<()> {
        annotations::update_annotation(&self.conn(), id, user_id, update)
    }

    fn set_annotation_flags(&self, id: i64, in_progress: bool, error: bool) -> Result<()> {
        annotations::set_annotation_flags(&self.conn(), id, in_progress, error)
    }

    fn get_blank_slate_annotation(&self, text_id: i64) -> Result<Option<Annotation>> {
        annotations::get_blank_slate_annotation(&self.conn(), text_id)
    }

    fn get_annotation_permission(
        &self,
        user_id: i64,
        annotation_id: i64,
    ) -> Result<Option<AnnotationPermission>> {
        annotations::get_annotation_permission(&self.conn(), user_id, annotation_id)
    }

    fn get_annotation_permission_by_id(&self, id: i64) -> Result<Option<AnnotationPermission>> {
        annotations::get_annotation_permission_by_id(&self.conn(), id)
    }

    fn list_annotation_permissions(&self, annotation_id: i64) -> Result<Vec<AnnotationPermission>> {
        annotations::list_annotation_permissions(&self.conn(), annotation_id)
    }

    fn add_annotation_permission(
        &self,
        user_id: i64,
        annotation_id: i64,
        level: PermissionLevel,
    ) -> Result<i64> {
        annotations::add_annotation_permission(&self.conn(), user_id, annotation_id, level)
    }

    fn set_annotation_permission(&self, id: i64, level: PermissionLevel) -> Result<()> {
        annotations::set_annotation_permission(&self.conn(), id, level)
    }

    fn delete_annotation_permission(&self, id: i64) -> Result<bool> {
        annotations::delete_annotation_permission(&self.conn(), id)
    }

    // Study operations

    fn get_studies(&self, session: &Session, user_id: Option<i64>) -> Result<Vec<ParticipantStudy>> {
        studies::get_studies(&self.conn(), session, user_id)
    }

    fn get_study(&self, id: i64) -> Result<Option<Study>> {
        studies::get_study(&self.conn(), id)
    }

    fn list_all_studies(&self) -> Result<Vec<Study>> {
        studies::list_all_studies(&self.conn())
    }

    fn get_steps(
        &self,
        study_id: i64,
        session: &Session,
        user_id: Option<i64>,
    ) -> Result<Option<StudySteps>> {
        studies::get_steps(&self.conn(), study_id, session, user_id)
    }

    fn add_study(
        &self,
        name: &str,
        begin_at: Option<DateTime<Utc>>,
        end_at: Option<DateTime<Utc>>,
    ) -> Result<i64> {
        studies::add_study(&self.conn(), name, begin_at, end_at)
    }

    fn add_study_group(&self, study_id: i64, label: Option<&str>) -> Result<i64> {
        studies::add_study_group(&self.conn(), study_id, label)
    }

    fn add_study_step(&self, step: &NewStudyStep<'_>) -> Result<i64> {
        studies::add_study_step(&self.conn(), step)
    }

    fn add_study_step_ordering(&self, group_id: i64, step_id: i64, ordering: i64) -> Result<()> {
        studies::add_study_step_ordering(&self.conn(), group_id, step_id, ordering)
    }

    fn add_study_participant(
        &self,
        study_id: i64,
        user_id: i64,
        group_id: Option<i64>,
    ) -> Result<i64> {
        studies::add_study_participant(&self.conn(), study_id, user_id, group_id)
    }

    fn add_study_participant_step(
        &self,
        participant_id: i64,
        step_id: i64,
        annotation_id: Option<i64>,
    ) -> Result<()> {
        studies::add_study_participant_step(&self.conn(), participant_id, step_id, annotation_id)
    }

    fn add_study_data(&self, participant_id: i64, step_id: i64, data: &str) -> Result<i64> {
        studies::add_study_data(&self.conn(), participant_id, step_id, data)
    }

    fn get_study_data(&self, study_id: i64) -> Result<Vec<StudyDataRecord>> {
        studies::get_study_data(&self.conn(), study_id)
    }
}
