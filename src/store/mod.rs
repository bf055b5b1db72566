//! Persistence for users, texts, annotations, studies and their permissions.
//!
//! Every operation exists as a free function over a `rusqlite::Connection`
//! (in the per-entity modules) so callers holding a transaction can compose
//! them, and as a method on [`Store`] for everyone else.

pub mod annotations;
mod schema;
mod sqlite;
pub mod studies;
mod text_storage;
pub mod texts;
pub mod users;

pub use sqlite::SqliteStore;
pub use text_storage::{Placement, TextStorage, TextStorageError};

#[cfg(test)]
pub(crate) use sqlite::tests::test_store;

use std::path::PathBuf;

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::types::*;

/// Store defines the database interface.
pub trait Store: Send + Sync {
    fn initialize(&self) -> Result<()>;

    // User operations
    fn create_user(&self, username: &str, password_hash: &str) -> Result<i64>;
    fn get_user(&self, id: i64) -> Result<Option<User>>;
    fn get_user_by_name(&self, username: &str) -> Result<Option<User>>;
    fn get_user_by_auth_token(&self, token: &str) -> Result<Option<User>>;
    fn set_auth_token(&self, user_id: i64, token: &str) -> Result<()>;

    // Text operations
    fn add_text(&self, text: &NewText<'_>) -> Result<AddedText>;
    fn get_text(&self, id: i64) -> Result<Option<Text>>;
    fn list_texts(&self, session: &Session, query: &TextQuery) -> Result<Vec<TextListing>>;
    fn count_texts(&self) -> Result<i64>;
    fn update_text(&self, id: i64, update: &TextUpdate) -> Result<()>;
    fn set_tokenization_flags(&self, id: i64, in_progress: bool, error: bool) -> Result<()>;
    fn text_content_path(&self, id: i64) -> Result<Option<PathBuf>>;

    // Text permission operations
    fn get_text_permission(&self, user_id: i64, text_id: i64) -> Result<Option<TextPermission>>;
    fn get_text_permission_by_id(&self, id: i64) -> Result<Option<TextPermission>>;
    fn list_text_permissions(&self, text_id: i64) -> Result<Vec<TextPermission>>;
    fn add_text_permission(&self, user_id: i64, text_id: i64, level: PermissionLevel)
    -> Result<i64>;
    fn set_text_permission(&self, id: i64, level: PermissionLevel) -> Result<()>;
    fn delete_text_permission(&self, id: i64) -> Result<bool>;

    // Annotation operations
    fn add_annotation(&self, annotation: &NewAnnotation<'_>) -> Result<i64>;
    fn lookup_annotations(
        &self,
        session: &Session,
        text_id: Option<i64>,
    ) -> Result<Vec<AnnotationSummary>>;
    fn lookup_annotations_by_user(&self, user_id: i64) -> Result<Vec<AnnotationSummary>>;
    fn lookup_annotations_by_text(&self, text_id: i64) -> Result<Vec<AnnotationSummary>>;
    fn lookup_annotation(&self, id: i64) -> Result<Option<Annotation>>;
    fn update_annotation(&self, id: i64, user_id: i64, update: &AnnotationUpdate) -> Result<()>;
    fn set_annotation_flags(&self, id: i64, in_progress: bool, error: bool) -> Result<()>;
    fn get_blank_slate_annotation(&self, text_id: i64) -> Result<Option<Annotation>>;

    // Annotation permission operations
    fn get_annotation_permission(
        &self,
        user_id: i64,
        annotation_id: i64,
    ) -> Result<Option<AnnotationPermission>>;
    fn get_annotation_permission_by_id(&self, id: i64) -> Result<Option<AnnotationPermission>>;
    fn list_annotation_permissions(&self, annotation_id: i64) -> Result<Vec<AnnotationPermission>>;
    fn add_annotation_permission(
        &self,
        user_id: i64,
        annotation_id: i64,
        level: PermissionLevel,
    ) -> Result<i64>;
    fn set_annotation_permission(&self, id: i64, level: PermissionLevel) -> Result<()>;
    fn delete_annotation_permission(&self, id: i64) -> Result<bool>;

    // Study operations
    fn get_studies(&self, session: &Session, user_id: Option<i64>) -> Result<Vec<ParticipantStudy>>;
    fn get_study(&self, id: i64) -> Result<Option<Study>>;
    fn list_all_studies(&self) -> Result<Vec<Study>>;
    fn get_steps(
        &self,
        study_id: i64,
        session: &Session,
        user_id: Option<i64>,
    ) -> Result<Option<StudySteps>>;
    fn add_study(
        &self,
        name: &str,
        begin_at: Option<DateTime<Utc>>,
        end_at: Option<DateTime<Utc>>,
    ) -> Result<i64>;
    fn add_study_group(&self, study_id: i64, label: Option<&str>) -> Result<i64>;
    fn add_study_step(&self, step: &NewStudyStep<'_>) -> Result<i64>;
    fn add_study_step_ordering(&self, group_id: i64, step_id: i64, ordering: i64) -> Result<()>;
    fn add_study_participant(
        &self,
        study_id: i64,
        user_id: i64,
        group_id: Option<i64>,
    ) -> Result<i64>;
    fn add_study_participant_step(
        &self,
        participant_id: i64,
        step_id: i64,
        annotation_id: Option<i64>,
    ) -> Result<()>;
    fn add_study_data(&self, participant_id: i64, step_id: i64, data: &str) -> Result<i64>;
    fn get_study_data(&self, study_id: i64) -> Result<Vec<StudyDataRecord>>;
}
