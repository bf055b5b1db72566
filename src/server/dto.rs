use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::types::{GraphPatch, PermissionLevel, Text, TextListing, User};

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub user: User,
    pub auth_token: String,
}

/// A permission level as sent by clients: either its name or its number.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum PermissionInput {
    Number(i64),
    Name(String),
}

impl PermissionInput {
    pub fn level(&self) -> Result<PermissionLevel> {
        match self {
            PermissionInput::Number(n) => PermissionLevel::try_from(*n),
            PermissionInput::Name(name) => name.parse(),
        }
    }
}

/// Grants a user a level on a text or annotation. The grantee is named by
/// id or by username.
#[derive(Debug, Deserialize)]
pub struct CreatePermissionRequest {
    #[serde(default)]
    pub user_id: Option<i64>,
    #[serde(default)]
    pub username: Option<String>,
    pub permission: PermissionInput,
}

#[derive(Debug, Deserialize)]
pub struct UpdatePermissionRequest {
    pub permission: PermissionInput,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListTextsParams {
    #[serde(default)]
    pub start_id: Option<i64>,
    #[serde(default)]
    pub end_id: Option<i64>,
    #[serde(default)]
    pub count: Option<i64>,
}

/// One page of `GET /texts`.
#[derive(Debug, Serialize)]
pub struct TextListResponse {
    /// Every text ever uploaded, readable or not.
    pub upload_count: i64,
    pub start_id: i64,
    /// Id of the last text returned; `None` for an empty page.
    pub end_id: Option<i64>,
    pub returned_count: usize,
    pub texts: Vec<TextListing>,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub text: Text,
    /// The blank-slate annotation created alongside the text.
    pub annotation_id: i64,
    /// True when the content still has to be tokenized.
    pub needs_processing: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateAnnotationRequest {
    #[serde(default)]
    pub patch: Option<GraphPatch>,
    #[serde(default)]
    pub is_public: Option<bool>,
    #[serde(default)]
    pub label: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ForkAnnotationRequest {
    #[serde(default)]
    pub label: Option<String>,
}

/// A batch of events logged in the browser while a participant works on a
/// study step.
#[derive(Debug, Deserialize)]
pub struct RecordStudyDataRequest {
    pub data: Vec<serde_json::Value>,
}

#[derive(Debug, Serialize)]
pub struct StudyDataResponse {
    pub study_data_id: i64,
}
