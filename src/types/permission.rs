use std::fmt;
use std::str::FromStr;

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Access level a user holds on a text or an annotation.
///
/// Levels are ordered: each one implies every level below it, and `Owner`
/// marks ownership of the resource.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(into = "u8", try_from = "u8")]
pub enum PermissionLevel {
    #[default]
    None = 0,
    Read = 1,
    Write = 2,
    Owner = 3,
}

impl PermissionLevel {
    pub const ALL: [PermissionLevel; 4] = [
        PermissionLevel::None,
        PermissionLevel::Read,
        PermissionLevel::Write,
        PermissionLevel::Owner,
    ];

    #[must_use]
    pub const fn as_i64(self) -> i64 {
        self as i64
    }

    /// Returns true if this level grants at least `required`.
    #[must_use]
    pub fn allows(self, required: PermissionLevel) -> bool {
        self >= required
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            PermissionLevel::None => "NONE",
            PermissionLevel::Read => "READ",
            PermissionLevel::Write => "WRITE",
            PermissionLevel::Owner => "OWNER",
        }
    }
}

impl fmt::Display for PermissionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<i64> for PermissionLevel {
    type Error = Error;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(PermissionLevel::None),
            1 => Ok(PermissionLevel::Read),
            2 => Ok(PermissionLevel::Write),
            3 => Ok(PermissionLevel::Owner),
            other => Err(Error::InvalidPermission(format!(
                "permission level must be 0-3, got {other}"
            ))),
        }
    }
}

impl TryFrom<u8> for PermissionLevel {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        PermissionLevel::try_from(i64::from(value))
    }
}

impl From<PermissionLevel> for u8 {
    fn from(level: PermissionLevel) -> Self {
        level as u8
    }
}

/// Accepts either the level name (`"read"`, `"OWNER"`, ...) or its number.
impl FromStr for PermissionLevel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if let Ok(n) = trimmed.parse::<i64>() {
            return PermissionLevel::try_from(n);
        }
        match trimmed.to_ascii_uppercase().as_str() {
            "NONE" => Ok(PermissionLevel::None),
            "READ" => Ok(PermissionLevel::Read),
            "WRITE" => Ok(PermissionLevel::Write),
            "OWNER" => Ok(PermissionLevel::Owner),
            _ => Err(Error::InvalidPermission(format!(
                "unknown permission level '{trimmed}'"
            ))),
        }
    }
}

impl ToSql for PermissionLevel {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_i64()))
    }
}

impl FromSql for PermissionLevel {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let raw = i64::column_result(value)?;
        PermissionLevel::try_from(raw).map_err(|_| FromSqlError::OutOfRange(raw))
    }
}
