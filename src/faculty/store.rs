use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::PgPool;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::model::{Faculty, NewFaculty, Status};
use crate::error::ApiError;

/// Canonical form used for every email comparison and write.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Persistence seam for faculty records. One record per email; records are
/// never deleted, and only the status fields are ever rewritten.
#[async_trait]
pub trait FacultyStore: Send + Sync {
    /// Insert a new record. Fails with [`ApiError::DuplicateEmail`] when the
    /// normalized email is already taken.
    async fn create(&self, new: NewFaculty) -> Result<Faculty, ApiError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<Faculty>, ApiError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Faculty>, ApiError>;

    /// Rewrite status, message and `updated_at` together in a single write.
    async fn update_status(
        &self,
        id: Uuid,
        status: Status,
        message: String,
    ) -> Result<Faculty, ApiError>;

    /// Every record, ordered by full name.
    async fn list_all(&self) -> Result<Vec<Faculty>, ApiError>;
}

// 23505 = PostgreSQL unique violation
fn is_unique_violation(e: &sqlx::Error) -> bool {
    e.as_database_error()
        .and_then(|db| db.code())
        .map(|code| code == "23505")
        .unwrap_or(false)
}

/// Postgres-backed store used by the running service.
pub struct PgFacultyStore {
    pool: PgPool,
}

impl PgFacultyStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FacultyStore for PgFacultyStore {
    async fn create(&self, new: NewFaculty) -> Result<Faculty, ApiError> {
        let res = sqlx::query_as::<_, Faculty>(
            r#"
            INSERT INTO faculty (email, password_hash, full_name, department, cabin_number)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, email, password_hash, full_name, department, cabin_number,
                      status, status_message, updated_at
            "#,
        )
        .bind(normalize_email(&new.email))
        .bind(&new.password_hash)
        .bind(&new.full_name)
        .bind(&new.department)
        .bind(&new.cabin_number)
        .fetch_one(&self.pool)
        .await;

        match res {
            Ok(faculty) => Ok(faculty),
            Err(e) if is_unique_violation(&e) => Err(ApiError::DuplicateEmail),
            Err(e) => Err(e.into()),
        }
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Faculty>, ApiError> {
        let faculty = sqlx::query_as::<_, Faculty>(
            r#"
            SELECT id, email, password_hash, full_name, department, cabin_number,
                   status, status_message, updated_at
            FROM faculty
            WHERE email = $1
            "#,
        )
        .bind(normalize_email(email))
        .fetch_optional(&self.pool)
        .await?;
        Ok(faculty)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Faculty>, ApiError> {
        let faculty = sqlx::query_as::<_, Faculty>(
            r#"
            SELECT id, email, password_hash, full_name, department, cabin_number,
                   status, status_message, updated_at
            FROM faculty
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(faculty)
    }

    async fn update_status(
        &self,
        id: Uuid,
        status: Status,
        message: String,
    ) -> Result<Faculty, ApiError> {
        let updated = sqlx::query_as::<_, Faculty>(
            r#"
            UPDATE faculty
            SET status = $2, status_message = $3, updated_at = now()
            WHERE id = $1
            RETURNING id, email, password_hash, full_name, department, cabin_number,
                      status, status_message, updated_at
            "#,
        )
        .bind(id)
        .bind(status)
        .bind(message)
        .fetch_optional(&self.pool)
        .await?;
        updated.ok_or_else(|| ApiError::NotFound("Faculty not found".into()))
    }

    async fn list_all(&self) -> Result<Vec<Faculty>, ApiError> {
        let all = sqlx::query_as::<_, Faculty>(
            r#"
            SELECT id, email, password_hash, full_name, department, cabin_number,
                   status, status_message, updated_at
            FROM faculty
            ORDER BY full_name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(all)
    }
}

/// In-memory store backing `AppState::fake()` and the test suite.
#[derive(Default)]
pub struct MemoryFacultyStore {
    inner: RwLock<MemoryInner>,
}

#[derive(Default)]
struct MemoryInner {
    records: HashMap<Uuid, Faculty>,
    by_email: HashMap<String, Uuid>,
}

#[async_trait]
impl FacultyStore for MemoryFacultyStore {
    async fn create(&self, new: NewFaculty) -> Result<Faculty, ApiError> {
        let mut inner = self.inner.write().await;
        let email = normalize_email(&new.email);
        if inner.by_email.contains_key(&email) {
            return Err(ApiError::DuplicateEmail);
        }
        let faculty = Faculty {
            id: Uuid::new_v4(),
            email: email.clone(),
            password_hash: new.password_hash,
            full_name: new.full_name,
            department: new.department,
            cabin_number: new.cabin_number,
            status: Status::default(),
            status_message: String::new(),
            updated_at: OffsetDateTime::now_utc(),
        };
        inner.by_email.insert(email, faculty.id);
        inner.records.insert(faculty.id, faculty.clone());
        Ok(faculty)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Faculty>, ApiError> {
        let inner = self.inner.read().await;
        let id = inner.by_email.get(&normalize_email(email));
        Ok(id.and_then(|id| inner.records.get(id)).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Faculty>, ApiError> {
        let inner = self.inner.read().await;
        Ok(inner.records.get(&id).cloned())
    }

    async fn update_status(
        &self,
        id: Uuid,
        status: Status,
        message: String,
    ) -> Result<Faculty, ApiError> {
        let mut inner = self.inner.write().await;
        let faculty = inner
            .records
            .get_mut(&id)
            .ok_or_else(|| ApiError::NotFound("Faculty not found".into()))?;
        faculty.status = status;
        faculty.status_message = message;
        faculty.updated_at = OffsetDateTime::now_utc();
        Ok(faculty.clone())
    }

    async fn list_all(&self) -> Result<Vec<Faculty>, ApiError> {
        let inner = self.inner.read().await;
        let mut all: Vec<Faculty> = inner.records.values().cloned().collect();
        all.sort_by(|a, b| a.full_name.cmp(&b.full_name));
        Ok(all)
    }
}
