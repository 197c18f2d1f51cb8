use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// Availability states a faculty member can publish. Any state may follow any
/// other; membership in this set is the only validation rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, Default)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum Status {
    Available,
    Busy,
    #[default]
    NotInCabin,
}

impl Status {
    /// Parse a wire value; anything outside the three known values is `None`.
    pub fn parse(s: &str) -> Option<Status> {
        match s {
            "available" => Some(Status::Available),
            "busy" => Some(Status::Busy),
            "not_in_cabin" => Some(Status::NotInCabin),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Available => "available",
            Status::Busy => "busy",
            Status::NotInCabin => "not_in_cabin",
        }
    }
}

/// Faculty record as persisted. Deliberately not `Serialize`: everything that
/// leaves the process goes through [`PublicFaculty`], which has no hash field.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Faculty {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub full_name: String,
    pub department: String,
    pub cabin_number: String,
    pub status: Status,
    pub status_message: String,
    pub updated_at: OffsetDateTime,
}

/// Fields supplied at registration; id, status and timestamp are assigned by
/// the store.
#[derive(Debug, Clone)]
pub struct NewFaculty {
    pub email: String,
    pub password_hash: String,
    pub full_name: String,
    pub department: String,
    pub cabin_number: String,
}

/// Outward-facing projection of a faculty record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicFaculty {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub department: String,
    pub cabin_number: String,
    pub status: Status,
    pub status_message: String,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<Faculty> for PublicFaculty {
    fn from(f: Faculty) -> Self {
        Self {
            id: f.id,
            email: f.email,
            full_name: f.full_name,
            department: f.department,
            cabin_number: f.cabin_number,
            status: f.status,
            status_message: f.status_message,
            updated_at: f.updated_at,
        }
    }
}
