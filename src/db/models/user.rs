//! User models and the user repository.

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};

use super::common::now_timestamp;

/// User roles. Teachers and admins are "staff".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Teacher,
    Admin,
}

impl Role {
    /// Staff may see and manage every booking
    pub fn is_staff(&self) -> bool {
        matches!(self, Role::Teacher | Role::Admin)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Teacher => "teacher",
            Role::Admin => "admin",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "student" => Ok(Role::Student),
            "teacher" => Ok(Role::Teacher),
            "admin" => Ok(Role::Admin),
            _ => Err(format!("Unknown role: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: String,
    pub email: String,
    pub password_hash: String,
    pub role: String,
    pub display_name: String,
    pub class_name: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl User {
    /// Parsed role; unrecognised values get the least privileged role
    pub fn role(&self) -> Role {
        self.role.parse().unwrap_or(Role::Student)
    }
}

/// Public view of a user (never carries the password hash)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: String,
    pub email: String,
    pub display_name: String,
    pub role: Role,
    pub class_name: Option<String>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            role: user.role(),
            id: user.id,
            email: user.email,
            display_name: user.display_name,
            class_name: user.class_name,
        }
    }
}

/// Identity resolved from a session and attached to the request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthUser {
    pub id: String,
    pub email: String,
    pub display_name: String,
    pub role: Role,
    pub class_name: Option<String>,
}

impl AuthUser {
    pub fn is_staff(&self) -> bool {
        self.role.is_staff()
    }
}

impl From<User> for AuthUser {
    fn from(user: User) -> Self {
        Self {
            role: user.role(),
            id: user.id,
            email: user.email,
            display_name: user.display_name,
            class_name: user.class_name,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub message: String,
    pub token: String,
    pub user: UserResponse,
}

/// Admin request body for creating an account
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateUserRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<String>,
    #[serde(alias = "Display_name")]
    pub display_name: Option<String>,
    #[serde(alias = "class")]
    pub class_name: Option<String>,
}

/// Fields for inserting a user; the password must already be hashed
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub display_name: String,
    pub class_name: Option<String>,
}

impl User {
    pub async fn get_by_id(db: &SqlitePool, id: &str) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(db)
            .await
    }

    pub async fn get_by_email(db: &SqlitePool, email: &str) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM users WHERE email = ?")
            .bind(email)
            .fetch_optional(db)
            .await
    }

    pub async fn create(db: &SqlitePool, new: NewUser) -> Result<User, sqlx::Error> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = now_timestamp();

        sqlx::query(
            r#"
            INSERT INTO users (id, email, password_hash, role, display_name, class_name, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(&new.email)
        .bind(&new.password_hash)
        .bind(new.role.as_str())
        .bind(&new.display_name)
        .bind(&new.class_name)
        .bind(&now)
        .bind(&now)
        .execute(db)
        .await?;

        Self::get_by_id(db, &id)
            .await?
            .ok_or(sqlx::Error::RowNotFound)
    }

    pub async fn list(db: &SqlitePool) -> Result<Vec<User>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM users ORDER BY email ASC")
            .fetch_all(db)
            .await
    }

    pub async fn count(db: &SqlitePool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(db)
            .await
    }
}
