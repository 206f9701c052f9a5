//! Test doubles shared by the unit tests: an in-memory identity provider, a
//! scripted prompter, and a local HTTP endpoint for the REST paths.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};
use std::io::Read;
use std::net::TcpListener;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::Result;
use serde_json::{Map, Value};
use tiny_http::{Header, Response, Server};

use crate::auth::ServiceAccountKey;
use crate::console::Prompter;
use crate::provider::{IdentityProvider, ProviderError, UserPage, UserRecord, UserUpdate};

pub const SERVICE_ACCOUNT_JSON: &str = include_str!("../tests/fixtures/service_account.json");
pub const TEST_PUBLIC_KEY: &str = include_str!("../tests/fixtures/test_key.pub.pem");

pub fn service_account() -> ServiceAccountKey {
    ServiceAccountKey::from_json(SERVICE_ACCOUNT_JSON).expect("fixture service account")
}

pub fn service_account_with_token_uri(token_uri: &str) -> ServiceAccountKey {
    let mut key = service_account();
    key.token_uri = token_uri.to_string();
    key
}

pub fn user(uid: &str, email: Option<&str>, name: Option<&str>) -> UserRecord {
    UserRecord {
        uid: uid.to_string(),
        email: email.map(str::to_string),
        display_name: name.map(str::to_string),
        email_verified: false,
        disabled: false,
        creation_time: None,
        last_sign_in: None,
    }
}

// -- In-memory provider -------------------------------------------------------

/// Serves `users` in pages of `page_size`; cursors are page indexes.
pub struct FakeProvider {
    pub users: RefCell<Vec<UserRecord>>,
    pub passwords: RefCell<HashMap<String, String>>,
    pub page_size: usize,
    /// 1-based page number whose request fails.
    pub fail_on_page: Option<usize>,
    pub unavailable: Cell<bool>,
    /// Number of upcoming updates to reject.
    pub reject_updates: Cell<usize>,
    pub list_calls: Cell<usize>,
    pub get_calls: Cell<usize>,
    pub update_calls: Cell<usize>,
    pub mint_calls: Cell<usize>,
}

impl FakeProvider {
    pub fn with_users(users: Vec<UserRecord>) -> Self {
        Self {
            users: RefCell::new(users),
            passwords: RefCell::new(HashMap::new()),
            page_size: 2,
            fail_on_page: None,
            unavailable: Cell::new(false),
            reject_updates: Cell::new(0),
            list_calls: Cell::new(0),
            get_calls: Cell::new(0),
            update_calls: Cell::new(0),
            mint_calls: Cell::new(0),
        }
    }

    pub fn page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn failing_on_page(mut self, page: usize) -> Self {
        self.fail_on_page = Some(page);
        self
    }

    pub fn total_calls(&self) -> usize {
        self.list_calls.get() + self.get_calls.get() + self.update_calls.get() + self.mint_calls.get()
    }

    fn check_available(&self) -> Result<(), ProviderError> {
        if self.unavailable.get() {
            return Err(ProviderError::Transport("connection refused".to_string()));
        }
        Ok(())
    }
}

impl IdentityProvider for FakeProvider {
    fn name(&self) -> &str {
        "fake"
    }

    fn list_users_page(&self, page_token: Option<&str>) -> Result<UserPage, ProviderError> {
        self.list_calls.set(self.list_calls.get() + 1);
        self.check_available()?;

        let index: usize = page_token.map(|t| t.parse().expect("numeric cursor")).unwrap_or(0);
        if self.fail_on_page == Some(index + 1) {
            return Err(ProviderError::Transport(format!("page {} failed", index + 1)));
        }

        let users = self.users.borrow();
        let start = index * self.page_size;
        let next_page_token = if start + self.page_size < users.len() {
            Some((index + 1).to_string())
        } else {
            None
        };

        Ok(UserPage {
            users: users.iter().skip(start).take(self.page_size).cloned().collect(),
            next_page_token,
        })
    }

    fn get_user(&self, uid: &str) -> Result<UserRecord, ProviderError> {
        self.get_calls.set(self.get_calls.get() + 1);
        self.check_available()?;
        self.users
            .borrow()
            .iter()
            .find(|u| u.uid == uid)
            .cloned()
            .ok_or_else(|| ProviderError::NotFound(uid.to_string()))
    }

    fn update_user(&self, uid: &str, update: &UserUpdate) -> Result<(), ProviderError> {
        self.update_calls.set(self.update_calls.get() + 1);
        self.check_available()?;

        if self.reject_updates.get() > 0 {
            self.reject_updates.set(self.reject_updates.get() - 1);
            return Err(ProviderError::Rejected {
                status: 400,
                message: "INTERNAL_ERROR".to_string(),
            });
        }

        let mut users = self.users.borrow_mut();
        let record = users
            .iter_mut()
            .find(|u| u.uid == uid)
            .ok_or_else(|| ProviderError::NotFound(uid.to_string()))?;

        match update {
            UserUpdate::Password(password) => {
                self.passwords
                    .borrow_mut()
                    .insert(uid.to_string(), password.clone());
            }
            UserUpdate::DisplayName(name) => record.display_name = Some(name.clone()),
        }
        Ok(())
    }

    fn create_custom_token(
        &self,
        uid: &str,
        _claims: Option<&Map<String, Value>>,
    ) -> Result<String, ProviderError> {
        self.mint_calls.set(self.mint_calls.get() + 1);
        self.check_available()?;
        Ok(format!("custom-token-for-{}", uid))
    }
}

// -- Scripted prompter --------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Text(String),
    Secret(String),
    Confirm(bool),
    Select(usize),
}

pub fn text(s: &str) -> Reply {
    Reply::Text(s.to_string())
}

pub fn secret(s: &str) -> Reply {
    Reply::Secret(s.to_string())
}

/// Answers prompts from a fixed script and panics on any mismatch.
#[derive(Debug, Default)]
pub struct ScriptedPrompter {
    replies: VecDeque<Reply>,
    pub asked: Vec<String>,
}

impl ScriptedPrompter {
    pub fn new(replies: Vec<Reply>) -> Self {
        Self {
            replies: replies.into(),
            asked: Vec::new(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.replies.len()
    }

    fn next(&mut self, message: &str) -> Reply {
        self.asked.push(message.to_string());
        self.replies
            .pop_front()
            .unwrap_or_else(|| panic!("script exhausted at prompt '{}'", message))
    }
}

impl Prompter for ScriptedPrompter {
    fn text(&mut self, message: &str) -> Result<String> {
        match self.next(message) {
            Reply::Text(s) => Ok(s),
            other => panic!("expected text reply for '{}', got {:?}", message, other),
        }
    }

    fn secret(&mut self, message: &str) -> Result<String> {
        match self.next(message) {
            Reply::Secret(s) => Ok(s),
            other => panic!("expected secret reply for '{}', got {:?}", message, other),
        }
    }

    fn confirm(&mut self, message: &str, _default: bool) -> Result<bool> {
        match self.next(message) {
            Reply::Confirm(answer) => Ok(answer),
            other => panic!("expected confirm reply for '{}', got {:?}", message, other),
        }
    }

    fn select(&mut self, message: &str, options: &[String]) -> Result<Option<usize>> {
        match self.next(message) {
            Reply::Select(index) => {
                assert!(index < options.len(), "no option {} for '{}'", index, message);
                Ok(Some(index))
            }
            other => panic!("expected select reply for '{}', got {:?}", message, other),
        }
    }
}

// -- Local HTTP endpoint ------------------------------------------------------

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    /// Path and query, as received.
    pub url: String,
    pub body: String,
    pub authorization: Option<String>,
}

/// Answers requests in order with the scripted `(status, body)` pairs and
/// records what it received.
pub struct FakeEndpoint {
    base: String,
    handle: Option<JoinHandle<Vec<RecordedRequest>>>,
}

impl FakeEndpoint {
    pub fn start(responses: Vec<(u16, String)>) -> Self {
        let server = Server::http("127.0.0.1:0").expect("bind fake endpoint");
        let addr = server.server_addr().to_ip().expect("tcp listener");

        let handle = thread::spawn(move || {
            let mut recorded = Vec::new();
            for (status, body) in responses {
                let mut request = match server.recv_timeout(Duration::from_secs(5)) {
                    Ok(Some(request)) => request,
                    _ => break,
                };

                let mut content = String::new();
                let _ = request.as_reader().read_to_string(&mut content);
                recorded.push(RecordedRequest {
                    method: request.method().to_string(),
                    url: request.url().to_string(),
                    body: content,
                    authorization: request
                        .headers()
                        .iter()
                        .find(|h| h.field.equiv("Authorization"))
                        .map(|h| h.value.as_str().to_string()),
                });

                let content_type =
                    Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..]).unwrap();
                let response = Response::from_string(body)
                    .with_status_code(status)
                    .with_header(content_type);
                let _ = request.respond(response);
            }
            recorded
        });

        Self {
            base: format!("http://{}", addr),
            handle: Some(handle),
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    /// Waits for the scripted exchanges and returns the recorded requests.
    pub fn finish(mut self) -> Vec<RecordedRequest> {
        self.handle
            .take()
            .expect("endpoint already finished")
            .join()
            .expect("fake endpoint thread panicked")
    }
}

/// A URL on which nothing is listening.
pub fn closed_port_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind free port");
    let port = listener.local_addr().expect("free port addr").port();
    drop(listener);
    format!("http://127.0.0.1:{}", port)
}
