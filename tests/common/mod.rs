//! Shared helpers for integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, HeaderMap, Request, StatusCode};
use axum::Router;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use roombook::config::Config;
use roombook::db::{NewRoom, NewUser, Role, Room, RoomType, User};
use roombook::{crypto, AppState};

pub const PASSWORD: &str = "s3cret-passphrase";

/// Test application on its own temporary database
pub struct TestApp {
    pub router: Router,
    pub state: Arc<AppState>,
    _dir: TempDir,
}

#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestResponse {
    pub fn set_cookies(&self) -> Vec<String> {
        self.headers
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok().map(str::to_string))
            .collect()
    }

    /// Value of the session cookie set by this response, if any
    pub fn session_cookie(&self) -> Option<String> {
        self.set_cookies().iter().find_map(|c| {
            c.split(';')
                .next()
                .and_then(|pair| pair.strip_prefix("auth_token="))
                .map(str::to_string)
        })
    }

    pub fn clears_session_cookie(&self) -> bool {
        self.set_cookies()
            .iter()
            .any(|c| c.starts_with("auth_token=;") && c.contains("Max-Age=0"))
    }

    pub fn error_code(&self) -> &str {
        self.body["error"]["code"].as_str().unwrap_or_default()
    }
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_config(Config::default()).await
    }

    pub async fn with_config(mut config: Config) -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        config.server.data_dir = dir.path().to_path_buf();

        let db = roombook::db::init(dir.path())
            .await
            .expect("Failed to init database");
        let state = Arc::new(AppState::new(config, db));
        let router = roombook::api::create_router(state.clone());

        Self {
            router,
            state,
            _dir: dir,
        }
    }

    /// Create a user with the shared test password and return its id
    pub async fn create_user(&self, email: &str, role: Role) -> String {
        let password_hash = crypto::hash_password(PASSWORD).expect("Failed to hash password");
        User::create(
            &self.state.db,
            NewUser {
                email: email.to_string(),
                password_hash,
                role,
                display_name: email.split('@').next().unwrap_or(email).to_string(),
                class_name: None,
            },
        )
        .await
        .expect("Failed to create user")
        .id
    }

    pub async fn create_room(&self, room_number: &str) -> String {
        Room::create(
            &self.state.db,
            NewRoom {
                room_number: room_number.to_string(),
                room_type: RoomType::Classroom,
                capacity: Some(30),
                location: Some("Main building".to_string()),
                floor_number: Some(1),
            },
        )
        .await
        .expect("Failed to create room")
        .id
    }

    /// Log in and return the session token from the cookie
    pub async fn login(&self, email: &str) -> String {
        let response = self
            .request(
                "POST",
                "/api/auth/login",
                Some(serde_json::json!({ "email": email, "password": PASSWORD })),
                None,
            )
            .await;

        assert_eq!(
            response.status,
            StatusCode::OK,
            "Login failed: {:?}",
            response.body
        );
        response.session_cookie().expect("No session cookie set")
    }

    /// Make a request, sending `token` as the session cookie
    pub async fn request(
        &self,
        method: &str,
        path: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> TestResponse {
        self.request_with_headers(method, path, body, token, &[])
            .await
    }

    pub async fn request_with_headers(
        &self,
        method: &str,
        path: &str,
        body: Option<Value>,
        token: Option<&str>,
        headers: &[(&str, &str)],
    ) -> TestResponse {
        let mut req = Request::builder().method(method).uri(path);
        for (name, value) in headers {
            req = req.header(*name, *value);
        }

        if let Some(token) = token {
            req = req.header(header::COOKIE, format!("auth_token={}", token));
        }

        let body = match body {
            Some(b) => {
                req = req.header(header::CONTENT_TYPE, "application/json");
                Body::from(serde_json::to_string(&b).expect("Failed to serialize body"))
            }
            None => Body::empty(),
        };

        let response = self
            .router
            .clone()
            .oneshot(req.body(body).expect("Failed to build request"))
            .await
            .expect("Failed to send request");

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
            .await
            .expect("Failed to read body");
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

        TestResponse {
            status,
            headers,
            body,
        }
    }
}
