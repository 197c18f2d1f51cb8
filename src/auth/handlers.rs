use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{AuthResponse, LoginRequest, RegisterRequest},
        jwt::JwtKeys,
        password::{hash_password, verify_password},
    },
    error::ApiError,
    faculty::{model::NewFaculty, store::normalize_email},
    state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

fn required(value: &str, message: &str) -> Result<String, ApiError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ApiError::Validation(message.into()));
    }
    Ok(trimmed.to_string())
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    let email = normalize_email(&payload.email);

    if !is_valid_email(&email) {
        warn!(email = %email, "invalid email");
        return Err(ApiError::Validation("Invalid email".into()));
    }
    if payload.password.is_empty() {
        warn!("empty password");
        return Err(ApiError::Validation("Password is required".into()));
    }
    let full_name = required(&payload.full_name, "Full name is required")?;
    let department = required(&payload.department, "Department is required")?;
    let cabin_number = required(&payload.cabin_number, "Cabin number is required")?;

    let password_hash = hash_password(&payload.password)?;

    let faculty = state
        .store
        .create(NewFaculty {
            email,
            password_hash,
            full_name,
            department,
            cabin_number,
        })
        .await?;

    let token = JwtKeys::from_ref(&state).sign(faculty.id)?;

    info!(faculty_id = %faculty.id, email = %faculty.email, "faculty registered");
    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            token,
            faculty: faculty.into(),
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let email = normalize_email(&payload.email);

    // Unknown email and wrong password produce the same rejection, so a
    // caller cannot probe which addresses are registered.
    let faculty = state
        .store
        .find_by_email(&email)
        .await?
        .ok_or(ApiError::InvalidCredentials)?;

    if !verify_password(&payload.password, &faculty.password_hash)? {
        warn!(faculty_id = %faculty.id, "login invalid password");
        return Err(ApiError::InvalidCredentials);
    }

    let token = JwtKeys::from_ref(&state).sign(faculty.id)?;

    info!(faculty_id = %faculty.id, email = %faculty.email, "faculty logged in");
    Ok(Json(AuthResponse {
        token,
        faculty: faculty.into(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::faculty::model::Status;

    fn register_body(email: &str) -> RegisterRequest {
        RegisterRequest {
            email: email.into(),
            password: "p".into(),
            full_name: "A".into(),
            department: "CS".into(),
            cabin_number: "101".into(),
        }
    }

    #[tokio::test]
    async fn register_login_and_token_verification_round_trip() {
        let state = AppState::fake();

        let (status, Json(registered)) =
            register(State(state.clone()), Json(register_body("a@x.com")))
                .await
                .expect("register");
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(registered.faculty.email, "a@x.com");
        assert_eq!(registered.faculty.status, Status::NotInCabin);

        let Json(logged_in) = login(
            State(state.clone()),
            Json(LoginRequest {
                email: "a@x.com".into(),
                password: "p".into(),
            }),
        )
        .await
        .expect("login");

        let claims = JwtKeys::from_ref(&state)
            .verify(&logged_in.token)
            .expect("verify");
        assert_eq!(claims.sub, registered.faculty.id);
    }

    #[tokio::test]
    async fn register_rejects_a_duplicate_differing_only_by_case() {
        let state = AppState::fake();

        register(State(state.clone()), Json(register_body("a@x.com")))
            .await
            .expect("first register");

        let err = register(State(state.clone()), Json(register_body("A@X.com")))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::DuplicateEmail));
        assert_eq!(err.to_string(), "Email already registered");
    }

    #[tokio::test]
    async fn login_failures_are_indistinguishable() {
        let state = AppState::fake();

        register(State(state.clone()), Json(register_body("a@x.com")))
            .await
            .expect("register");

        let unknown_email = login(
            State(state.clone()),
            Json(LoginRequest {
                email: "nobody@x.com".into(),
                password: "p".into(),
            }),
        )
        .await
        .unwrap_err();

        let wrong_password = login(
            State(state.clone()),
            Json(LoginRequest {
                email: "a@x.com".into(),
                password: "wrong".into(),
            }),
        )
        .await
        .unwrap_err();

        assert_eq!(unknown_email.to_string(), wrong_password.to_string());
        assert_eq!(unknown_email.to_string(), "Invalid credentials");
    }

    #[tokio::test]
    async fn register_rejects_malformed_input() {
        let state = AppState::fake();

        let err = register(State(state.clone()), Json(register_body("not-an-email")))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));

        let mut blank_name = register_body("b@x.com");
        blank_name.full_name = "   ".into();
        let err = register(State(state.clone()), Json(blank_name))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));

        let mut empty_password = register_body("c@x.com");
        empty_password.password = "".into();
        let err = register(State(state.clone()), Json(empty_password))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[tokio::test]
    async fn register_normalizes_the_stored_email() {
        let state = AppState::fake();

        let (_, Json(registered)) = register(
            State(state.clone()),
            Json(register_body("  MiXeD@Case.EDU ")),
        )
        .await
        .expect("register");
        assert_eq!(registered.faculty.email, "mixed@case.edu");
    }

    #[test]
    fn email_validation_covers_the_obvious_shapes() {
        assert!(is_valid_email("a@x.com"));
        assert!(is_valid_email("first.last@dept.university.edu"));
        assert!(!is_valid_email("a@x"));
        assert!(!is_valid_email("ax.com"));
        assert!(!is_valid_email("a @x.com"));
        assert!(!is_valid_email(""));
    }
}
