//! Integration test harness for the Zebrands catalog API.
//!
//! Drives the real router with `tower::ServiceExt::oneshot` over the
//! in-memory stores, a recording task queue and a recording mailer, so the
//! suite needs no database or network.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p zebrands-integration-tests
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]
#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{HeaderMap, Method, Request, StatusCode, header};
use secrecy::SecretString;
use serde_json::Value;
use tower::ServiceExt;

use zebrands_api::db::{MemoryStore, UserStore};
use zebrands_api::models::NewUser;
use zebrands_api::services::auth::hash_password;
use zebrands_api::services::email::RecordingMailer;
use zebrands_api::services::tasks::RecordingQueue;
use zebrands_api::services::{Mailer, Task, TaskRunner};
use zebrands_api::state::AppState;
use zebrands_core::{Email, RoleSet};

/// Password given to every account created by [`TestApp::user`].
pub const PASSWORD: &str = "pa55word";

/// A response with its body decoded.
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    /// JSON body, a string for plain text bodies and `Null` when empty.
    pub body: Value,
}

/// The router wired to in-memory fakes.
pub struct TestApp {
    pub store: Arc<MemoryStore>,
    pub queue: Arc<RecordingQueue>,
    pub mailer: Arc<RecordingMailer>,
    router: Router,
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}

impl TestApp {
    #[must_use]
    pub fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let queue = Arc::new(RecordingQueue::new());
        let state = AppState::new(store.clone(), store.clone(), queue.clone());

        Self {
            store,
            queue,
            mailer: Arc::new(RecordingMailer::new()),
            router: zebrands_api::router(state),
        }
    }

    /// Create an account directly in the store and return its API token.
    pub async fn user(&self, username: &str, roles: RoleSet) -> String {
        let new = NewUser {
            username: username.to_owned(),
            email: Email::parse(&format!("{username}@example.com")).unwrap(),
            password: SecretString::from(PASSWORD),
            first_name: String::new(),
            last_name: String::new(),
        };
        let hash = hash_password(&new.password).unwrap();
        let user = UserStore::create(self.store.as_ref(), &new, &hash, roles)
            .await
            .unwrap();
        self.store
            .get_or_create_token(user.id, &zebrands_api::services::auth::generate_token())
            .await
            .unwrap()
    }

    /// Send one request, optionally authenticated and with a JSON body.
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            request = request.header(header::AUTHORIZATION, format!("Token {token}"));
        }
        let body = match body {
            Some(json) => {
                request = request.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        self.send_request(request.body(body).unwrap()).await
    }

    /// Send a prepared request.
    pub async fn send_request(&self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();

        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        TestResponse {
            status,
            headers,
            body,
        }
    }

    /// Run every scheduled task the way the background worker would.
    pub async fn run_tasks(&self) -> Vec<Task> {
        let mailer: Arc<dyn Mailer> = self.mailer.clone();
        let runner = TaskRunner::new(self.store.clone(), self.store.clone(), Some(mailer));
        let tasks = self.queue.take();
        for task in tasks.clone() {
            runner.run(task).await;
        }
        tasks
    }
}
