//! Testing utilities for the slack-batch workspace
//!
//! In-memory stand-ins for the Slack Web API and SCIM, and CSV fixtures.

#![allow(missing_docs)]

use parking_lot::Mutex;
use sb_directory::{AdminApi, DirectoryClient, DirectoryConfig, DirectoryError, ScimApi, ScimResponse, ScimUser};
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet, VecDeque};
use std::io::Write;
use std::sync::Arc;
use tempfile::NamedTempFile;

/// Web API fake: scripted bodies per method, `{"ok": true}` otherwise
#[derive(Debug, Default)]
pub struct FakeAdminApi {
    scripted: Mutex<HashMap<String, VecDeque<Value>>>,
    calls: Mutex<Vec<(String, Value)>>,
}

impl FakeAdminApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `body` as the next answer to `method`
    pub fn push_response(&self, method: &str, body: Value) {
        self.scripted
            .lock()
            .entry(method.to_string())
            .or_default()
            .push_back(body);
    }

    /// Every call so far, in order
    pub fn calls(&self) -> Vec<(String, Value)> {
        self.calls.lock().clone()
    }

    /// Params of every call to `method`
    pub fn calls_to(&self, method: &str) -> Vec<Value> {
        self.calls
            .lock()
            .iter()
            .filter(|(m, _)| m == method)
            .map(|(_, params)| params.clone())
            .collect()
    }
}

#[async_trait::async_trait]
impl AdminApi for FakeAdminApi {
    async fn call(&self, method: &str, params: Value) -> Result<Value, DirectoryError> {
        self.calls.lock().push((method.to_string(), params));
        let body = self
            .scripted
            .lock()
            .get_mut(method)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| json!({"ok": true}));
        Ok(body)
    }
}

/// Account held by [`FakeScimApi`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredUser {
    pub id: String,
    pub user_name: String,
    pub display_name: String,
    pub email: String,
    pub active: bool,
    pub photo: Option<String>,
}

impl StoredUser {
    fn resource(&self) -> Value {
        json!({
            "id": self.id,
            "active": self.active,
            "userName": self.user_name,
            "displayName": self.display_name,
            "emails": [{"value": self.email, "primary": true}],
        })
    }
}

#[derive(Debug, Default)]
struct ScimState {
    users: Vec<StoredUser>,
    next_id: usize,
    create_responses: VecDeque<ScimResponse>,
    search_responses: VecDeque<ScimResponse>,
    failing_patches: HashSet<String>,
    calls: Vec<String>,
}

/// SCIM fake backed by an in-memory user list
///
/// Searches understand `email eq <address>`. Patches apply `active`,
/// `emails` and `photos`.
#[derive(Debug, Default)]
pub struct FakeScimApi {
    state: Mutex<ScimState>,
}

impl FakeScimApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an account and return its id
    pub fn add_user(&self, name: &str, email: &str, active: bool) -> String {
        let mut state = self.state.lock();
        state.next_id += 1;
        let id = format!("U{}", state.next_id);
        state.users.push(StoredUser {
            id: id.clone(),
            user_name: name.to_string(),
            display_name: name.to_string(),
            email: email.to_string(),
            active,
            photo: None,
        });
        id
    }

    /// Answer the next create with `response` instead of storing the user
    pub fn push_create_response(&self, response: ScimResponse) {
        self.state.lock().create_responses.push_back(response);
    }

    /// Answer the next search with `response`
    pub fn push_search_response(&self, response: ScimResponse) {
        self.state.lock().search_responses.push_back(response);
    }

    /// Reject every patch of `id` with a 500
    pub fn fail_patches_for(&self, id: &str) {
        self.state.lock().failing_patches.insert(id.to_string());
    }

    pub fn user(&self, id: &str) -> Option<StoredUser> {
        self.state.lock().users.iter().find(|u| u.id == id).cloned()
    }

    pub fn user_by_email(&self, email: &str) -> Option<StoredUser> {
        self.state
            .lock()
            .users
            .iter()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned()
    }

    /// Operation names in call order (`search`, `create`, `update`, `patch`)
    pub fn calls(&self) -> Vec<String> {
        self.state.lock().calls.clone()
    }
}

#[async_trait::async_trait]
impl ScimApi for FakeScimApi {
    async fn search_users(
        &self,
        filter: &str,
        _count: u32,
        _start_index: u32,
    ) -> Result<ScimResponse, DirectoryError> {
        let mut state = self.state.lock();
        state.calls.push(format!("search {filter}"));
        if let Some(response) = state.search_responses.pop_front() {
            return Ok(response);
        }

        let email = filter.trim_start_matches("email eq ").trim();
        let resources: Vec<Value> = state
            .users
            .iter()
            .filter(|u| u.email.eq_ignore_ascii_case(email))
            .map(StoredUser::resource)
            .collect();
        Ok(ScimResponse::new(
            200,
            json!({"totalResults": resources.len(), "Resources": resources}),
        ))
    }

    async fn create_user(&self, user: &ScimUser) -> Result<ScimResponse, DirectoryError> {
        let mut state = self.state.lock();
        state.calls.push(format!("create {}", user.user_name));
        if let Some(response) = state.create_responses.pop_front() {
            return Ok(response);
        }

        let email = user.emails.first().map(|e| e.value.clone()).unwrap_or_default();
        state.next_id += 1;
        let id = format!("U{}", state.next_id);
        state.users.push(StoredUser {
            id: id.clone(),
            user_name: user.user_name.clone(),
            display_name: user.display_name.clone(),
            email,
            active: user.active,
            photo: None,
        });
        Ok(ScimResponse::new(201, json!({"id": id})))
    }

    async fn update_user(&self, user: &ScimUser) -> Result<ScimResponse, DirectoryError> {
        let mut state = self.state.lock();
        state.calls.push(format!("update {}", user.user_name));
        let id = user.id.clone().unwrap_or_default();
        match state.users.iter_mut().find(|u| u.id == id) {
            Some(stored) => {
                stored.user_name.clone_from(&user.user_name);
                stored.display_name.clone_from(&user.display_name);
                stored.active = user.active;
                if let Some(email) = user.emails.first() {
                    stored.email.clone_from(&email.value);
                }
                Ok(ScimResponse::new(200, stored.resource()))
            }
            None => Ok(not_found()),
        }
    }

    async fn patch_user(&self, id: &str, partial: Value) -> Result<ScimResponse, DirectoryError> {
        let mut state = self.state.lock();
        state.calls.push(format!("patch {id}"));
        if state.failing_patches.contains(id) {
            return Ok(ScimResponse::new(
                500,
                json!({"Errors": {"code": 500, "description": "internal_error"}}),
            ));
        }
        let Some(stored) = state.users.iter_mut().find(|u| u.id == id) else {
            return Ok(not_found());
        };

        if let Some(active) = partial.get("active").and_then(Value::as_bool) {
            stored.active = active;
        }
        if let Some(email) = partial
            .pointer("/emails/0/value")
            .and_then(Value::as_str)
        {
            stored.email = email.to_string();
        }
        if let Some(photo) = partial.pointer("/photos/0").and_then(Value::as_str) {
            stored.photo = Some(photo.to_string());
        }
        Ok(ScimResponse::new(200, stored.resource()))
    }
}

fn not_found() -> ScimResponse {
    ScimResponse::new(
        404,
        json!({"Errors": {"code": 404, "description": "user_not_found"}}),
    )
}

/// Client wired to the given fakes with default configuration
pub fn fake_client(admin: &Arc<FakeAdminApi>, scim: &Arc<FakeScimApi>) -> DirectoryClient {
    fake_client_with_config(admin, scim, DirectoryConfig::new())
}

pub fn fake_client_with_config(
    admin: &Arc<FakeAdminApi>,
    scim: &Arc<FakeScimApi>,
    config: DirectoryConfig,
) -> DirectoryClient {
    DirectoryClient::with_transports(admin.clone(), scim.clone(), config)
}

/// Temporary CSV file with `header` and one line per row
pub fn instruction_file(header: &str, rows: &[&str]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "{header}").unwrap();
    for row in rows {
        writeln!(file, "{row}").unwrap();
    }
    file.flush().unwrap();
    file
}
