//! Account management, admins only.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use super::error::{ApiError, ErrorCode};
use super::validation::{normalize_email, validate_id};
use crate::crypto;
use crate::db::{AuthUser, CreateUserRequest, NewUser, Role, User, UserResponse};
use crate::error::{ServiceError, ValidationErrorBuilder};
use crate::AppState;

const MIN_PASSWORD_LENGTH: usize = 8;

fn duplicate_email() -> ApiError {
    ApiError::new(ErrorCode::Conflict, "User with this email already exists")
}

pub async fn create_user(
    State(state): State<Arc<AppState>>,
    admin: AuthUser,
    body: Result<Json<CreateUserRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    let Json(req) = body.map_err(|e| ApiError::bad_request(e.body_text()))?;

    let mut errors = ValidationErrorBuilder::new();

    let email = match normalize_email(req.email.as_deref().unwrap_or_default()) {
        Ok(email) => Some(email),
        Err(e) => {
            errors.add("email", e);
            None
        }
    };

    let password = req.password.unwrap_or_default();
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        errors.add(
            "password",
            format!("Password must be at least {} characters", MIN_PASSWORD_LENGTH),
        );
    }

    let role = match req.role.as_deref().map(str::trim).filter(|r| !r.is_empty()) {
        None => Some(Role::Student),
        Some(r) => match r.parse::<Role>() {
            Ok(role) => Some(role),
            Err(e) => {
                errors.add("role", e);
                None
            }
        },
    };

    errors.finish()?;
    let (Some(email), Some(role)) = (email, role) else {
        return Err(ApiError::internal("An internal error occurred"));
    };

    if User::get_by_email(&state.db, &email).await?.is_some() {
        return Err(duplicate_email());
    }

    let password_hash = tokio::task::spawn_blocking(move || crypto::hash_password(&password))
        .await
        .map_err(|e| ServiceError::internal(format!("Password hashing task failed: {}", e)))?
        .map_err(|e| ServiceError::internal(format!("Password hashing failed: {}", e)))?;

    let display_name = req
        .display_name
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| email.split('@').next().unwrap_or(&email).to_string());
    let class_name = req
        .class_name
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty());

    let user = User::create(
        &state.db,
        NewUser {
            email,
            password_hash,
            role,
            display_name,
            class_name,
        },
    )
    .await
    .map_err(|e| match e {
        sqlx::Error::Database(ref db) if db.is_unique_violation() => duplicate_email(),
        e => e.into(),
    })?;

    tracing::info!(user_id = %user.id, role = %role, created_by = %admin.id, "User created");
    Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
}

pub async fn list_users(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<UserResponse>>, ApiError> {
    let users = User::list(&state.db).await?;
    Ok(Json(users.into_iter().map(UserResponse::from).collect()))
}

pub async fn get_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<UserResponse>, ApiError> {
    validate_id(&id, "id").map_err(|_| ApiError::not_found("User not found"))?;

    let user = User::get_by_id(&state.db, &id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;
    Ok(Json(UserResponse::from(user)))
}
