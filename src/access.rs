//! Who may read, change or own a text or an annotation.
//!
//! Anonymous sessions may only read public resources. Signed-in users need a
//! stored permission at or above the requested level, except that anyone may
//! read a public resource. The creator of an annotation counts as its owner.

use crate::error::Result;
use crate::store::Store;
use crate::types::{PermissionLevel, Session};

/// Decides a request from data already at hand, such as a listing row that
/// carries the viewer's stored level.
#[must_use]
pub fn level_allows(
    session: &Session,
    is_public: bool,
    stored: Option<PermissionLevel>,
    required: PermissionLevel,
) -> bool {
    let public_read = required == PermissionLevel::Read && is_public;
    match session.user_id {
        None => public_read,
        Some(_) => stored.unwrap_or_default().allows(required) || public_read,
    }
}

pub fn has_text_permission<S: Store + ?Sized>(
    store: &S,
    session: &Session,
    text_id: i64,
    required: PermissionLevel,
) -> Result<bool> {
    let Some(text) = store.get_text(text_id)? else {
        return Ok(false);
    };
    let stored = match session.user_id {
        Some(user_id) => store
            .get_text_permission(user_id, text_id)?
            .map(|p| p.permission),
        None => None,
    };
    Ok(level_allows(session, text.is_public, stored, required))
}

pub fn can_view_text<S: Store + ?Sized>(store: &S, session: &Session, text_id: i64) -> Result<bool> {
    has_text_permission(store, session, text_id, PermissionLevel::Read)
}

pub fn can_modify_text<S: Store + ?Sized>(store: &S, session: &Session, text_id: i64) -> Result<bool> {
    has_text_permission(store, session, text_id, PermissionLevel::Write)
}

pub fn owns_text<S: Store + ?Sized>(store: &S, session: &Session, text_id: i64) -> Result<bool> {
    has_text_permission(store, session, text_id, PermissionLevel::Owner)
}

pub fn has_annotation_permission<S: Store + ?Sized>(
    store: &S,
    session: &Session,
    annotation_id: i64,
    required: PermissionLevel,
) -> Result<bool> {
    let Some(annotation) = store.lookup_annotation(annotation_id)? else {
        return Ok(false);
    };
    let summary = &annotation.summary;
    let stored = match session.user_id {
        Some(user_id) if user_id == summary.user_id => Some(PermissionLevel::Owner),
        Some(user_id) => store
            .get_annotation_permission(user_id, annotation_id)?
            .map(|p| p.permission),
        None => None,
    };
    Ok(level_allows(session, summary.is_public, stored, required))
}

pub fn can_view_annotation<S: Store + ?Sized>(
    store: &S,
    session: &Session,
    annotation_id: i64,
) -> Result<bool> {
    has_annotation_permission(store, session, annotation_id, PermissionLevel::Read)
}

pub fn can_modify_annotation<S: Store + ?Sized>(
    store: &S,
    session: &Session,
    annotation_id: i64,
) -> Result<bool> {
    has_annotation_permission(store, session, annotation_id, PermissionLevel::Write)
}

pub fn owns_annotation<S: Store + ?Sized>(
    store: &S,
    session: &Session,
    annotation_id: i64,
) -> Result<bool> {
    has_annotation_permission(store, session, annotation_id, PermissionLevel::Owner)
}
