use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{AnnotationGraph, PermissionLevel};
use crate::error::{Error, Result};

/// The principal a request runs as. Store calls take it explicitly instead of
/// reading a process-wide "current user".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Session {
    pub user_id: Option<i64>,
}

impl Session {
    #[must_use]
    pub const fn anonymous() -> Self {
        Self { user_id: None }
    }

    #[must_use]
    pub const fn for_user(user_id: i64) -> Self {
        Self {
            user_id: Some(user_id),
        }
    }

    /// Resolves the user an operation applies to: the explicit id if given,
    /// otherwise the session's user.
    pub fn resolve_user(&self, explicit: Option<i64>) -> Result<i64> {
        explicit.or(self.user_id).ok_or(Error::NoUser)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    #[serde(skip)]
    pub password: String,
    #[serde(skip)]
    pub auth_token: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Text {
    pub id: i64,
    pub title: String,
    pub md5sum: String,
    pub tokenization_in_progress: bool,
    pub tokenization_error: bool,
    pub uploaded_by: i64,
    pub uploaded_by_username: String,
    pub is_public: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A text row as shown in listings, with the viewer's permission (if any).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextListing {
    #[serde(flatten)]
    pub text: Text,
    pub annotation_count: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permission: Option<PermissionLevel>,
}

#[derive(Debug, Clone, Default)]
pub struct TextQuery {
    pub start_id: i64,
    pub end_id: Option<i64>,
    pub count: Option<i64>,
}

pub struct NewText<'a> {
    pub md5sum: &'a str,
    /// Where the uploaded content currently lives; moved into storage when the
    /// hash has not been seen before, left untouched otherwise.
    pub source: &'a Path,
    pub title: &'a str,
    pub uploaded_by: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct AddedText {
    pub text: Text,
    /// True when no tokenized output exists yet and no live tokenizer holds
    /// the processing lock.
    pub needs_processing: bool,
}

/// Partial update of a text; `None` fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TextUpdate {
    #[serde(default)]
    pub is_public: Option<bool>,
    #[serde(default)]
    pub title: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextPermission {
    pub id: i64,
    pub user_id: i64,
    pub text_id: i64,
    pub permission: PermissionLevel,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnotationPermission {
    pub id: i64,
    pub user_id: i64,
    pub annotation_id: i64,
    pub permission: PermissionLevel,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Annotation metadata joined with its owner and text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnotationSummary {
    pub annotation_id: i64,
    pub parent_annotation_id: Option<i64>,
    pub text_id: i64,
    pub text_title: String,
    pub text_md5sum: String,
    pub user_id: i64,
    pub username: String,
    pub method: String,
    pub method_metadata: Option<String>,
    pub label: Option<String>,
    pub is_public: bool,
    pub automated_method_in_progress: bool,
    pub automated_method_error: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// The session user's level on this annotation, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permission: Option<PermissionLevel>,
}

impl AnnotationSummary {
    pub fn is_blank_slate(&self) -> bool {
        self.parent_annotation_id.is_none()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Annotation {
    #[serde(flatten)]
    pub summary: AnnotationSummary,
    pub annotation: AnnotationGraph,
}

pub struct NewAnnotation<'a> {
    pub user_id: i64,
    pub text_id: i64,
    /// `None` marks the blank-slate root annotation of a text.
    pub parent_annotation_id: Option<i64>,
    pub graph: &'a AnnotationGraph,
    pub method: &'a str,
    pub method_metadata: Option<&'a str>,
    pub label: Option<&'a str>,
    pub automated_method_in_progress: bool,
}

/// Replacement values for an annotation; only `Some` fields are written.
/// `updated_at` is always bumped.
#[derive(Debug, Clone, Default)]
pub struct AnnotationUpdate {
    pub graph: Option<AnnotationGraph>,
    pub is_public: Option<bool>,
    pub label: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Study {
    pub id: i64,
    pub name: String,
    pub begin_at: Option<DateTime<Utc>>,
    pub end_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// A study as seen by one participant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParticipantStudy {
    #[serde(flatten)]
    pub study: Study,
    pub participant_id: i64,
    pub group_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudyStep {
    pub id: i64,
    pub label: String,
    pub url: Option<String>,
    pub base_annotation_id: Option<i64>,
    /// The participant's own annotation for this step, if one was assigned.
    pub annotation_id: Option<i64>,
    pub ordering: i64,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudySteps {
    pub study: ParticipantStudy,
    pub steps: Vec<StudyStep>,
}

pub struct NewStudyStep<'a> {
    pub study_id: i64,
    pub label: &'a str,
    pub base_annotation_id: Option<i64>,
    pub url: Option<&'a str>,
}

/// One uploaded batch of study events, with the study, step, participant and
/// annotation context it was recorded in.
#[derive(Debug, Clone, Serialize)]
pub struct StudyDataRecord {
    pub study_id: i64,
    pub study_name: String,
    pub study_begin_at: Option<DateTime<Utc>>,
    pub study_end_at: Option<DateTime<Utc>>,
    pub study_data_id: i64,
    pub step_id: i64,
    pub step_label: String,
    pub base_annotation_id: Option<i64>,
    pub step_url: Option<String>,
    pub participant_id: i64,
    pub participant_user_id: i64,
    pub participant_username: String,
    pub participant_group_id: Option<i64>,
    pub participant_group_label: Option<String>,
    pub step_started_at: Option<DateTime<Utc>>,
    pub step_completed_at: Option<DateTime<Utc>>,
    pub text_id: Option<i64>,
    pub text_title: Option<String>,
    pub annotation_id: Option<i64>,
    pub annotation_label: Option<String>,
    pub study_data_uploaded_at: DateTime<Utc>,
    /// The batch as uploaded: a JSON array of event objects.
    #[serde(skip)]
    pub data: Option<String>,
}

/// A single logged event. `name` and `timestamp` are lifted out of the event
/// object; whatever else it carried is left in `data`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StudyEvent {
    #[serde(rename = "event_timestamp")]
    pub timestamp: Option<Value>,
    #[serde(rename = "event_name")]
    pub name: Option<Value>,
    #[serde(rename = "event_data")]
    pub data: Option<Value>,
}

impl StudyDataRecord {
    /// Unpacks the batch. A record without data yields a single empty event so
    /// it still shows up in dumps.
    pub fn events(&self) -> Result<Vec<StudyEvent>> {
        let Some(raw) = &self.data else {
            return Ok(vec![StudyEvent::default()]);
        };

        let batch: Vec<Value> = serde_json::from_str(raw)?;
        Ok(batch
            .into_iter()
            .map(|event| match event {
                Value::Object(mut fields) => StudyEvent {
                    timestamp: fields.remove("timestamp"),
                    name: fields.remove("name"),
                    data: Some(Value::Object(fields)),
                },
                other => StudyEvent {
                    data: Some(other),
                    ..StudyEvent::default()
                },
            })
            .collect())
    }
}
