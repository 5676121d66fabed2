//! SCIM v1 payloads

use sb_models::User;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Core SCIM schema
pub const CORE_SCHEMA: &str = "urn:scim:schemas:core:1.0";
/// Enterprise extension schema
pub const ENTERPRISE_SCHEMA: &str = "urn:scim:schemas:extension:enterprise:1.0";

/// Email entry of a SCIM user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScimEmail {
    pub value: String,
    #[serde(default)]
    pub primary: bool,
}

/// Enterprise extension block
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnterpriseExtension {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub division: Option<String>,
}

/// SCIM user as sent to the provisioning API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScimUser {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub schemas: Vec<String>,
    #[serde(rename = "userName")]
    pub user_name: String,
    #[serde(rename = "displayName")]
    pub display_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub emails: Vec<ScimEmail>,
    pub active: bool,
    #[serde(rename = "urn:scim:schemas:extension:enterprise:1.0", default)]
    pub enterprise: EnterpriseExtension,
}

impl ScimUser {
    /// Inactive user with a single primary email
    ///
    /// Username and display name are trimmed.
    #[must_use]
    pub fn new(username: &str, display_name: &str, email: impl Into<String>) -> Self {
        Self {
            id: None,
            schemas: vec![CORE_SCHEMA.to_string(), ENTERPRISE_SCHEMA.to_string()],
            user_name: username.trim().to_string(),
            display_name: display_name.trim().to_string(),
            title: None,
            emails: vec![ScimEmail {
                value: email.into(),
                primary: true,
            }],
            active: false,
            enterprise: EnterpriseExtension::default(),
        }
    }

    /// Payload for creating `user` under `username`
    ///
    /// Location maps to department, section to division.
    #[must_use]
    pub fn for_user(user: &User, username: &str) -> Self {
        let mut scim = Self::new(username, &user.name, user.email.clone());
        scim.title.clone_from(&user.title);
        scim.enterprise = EnterpriseExtension {
            department: user.location.clone(),
            division: user.section.clone(),
        };
        scim
    }

    /// With remote id
    #[inline]
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// With active flag
    #[inline]
    #[must_use]
    pub fn with_active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }
}

/// User record returned by a SCIM search
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DirectoryUser {
    /// Remote id
    pub id: String,
    /// Whether the account is active
    #[serde(default)]
    pub active: bool,
    /// Login name
    #[serde(rename = "userName", default)]
    pub user_name: Option<String>,
    /// Display name
    #[serde(rename = "displayName", default)]
    pub display_name: Option<String>,
    /// All emails on the account
    #[serde(default)]
    pub emails: Vec<ScimEmail>,
}

/// Raw SCIM response
#[derive(Debug, Clone, PartialEq)]
pub struct ScimResponse {
    /// HTTP status
    pub status: u16,
    /// Decoded JSON body (`Null` when empty)
    pub body: Value,
}

impl ScimResponse {
    /// Create response
    #[inline]
    #[must_use]
    pub fn new(status: u16, body: Value) -> Self {
        Self { status, body }
    }

    /// `Errors` block of the body
    #[must_use]
    pub fn errors(&self) -> Value {
        self.body.get("Errors").cloned().unwrap_or(Value::Null)
    }

    /// `Errors.description`, e.g. `"username_taken The username is taken"`
    #[must_use]
    pub fn error_description(&self) -> Option<&str> {
        self.body
            .get("Errors")
            .and_then(|errors| errors.get("description"))
            .and_then(Value::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn scim_user_wire_shape() {
        let user = sb_models::User::new(" Jane Doe ", "jane@example.com")
            .with_title("Engineer")
            .with_location("Cairo")
            .with_section("Platform");

        let payload = serde_json::to_value(ScimUser::for_user(&user, &user.name)).unwrap();
        let mut expected = json!({
            "schemas": [CORE_SCHEMA, ENTERPRISE_SCHEMA],
            "userName": "Jane Doe",
            "displayName": "Jane Doe",
            "title": "Engineer",
            "emails": [{"value": "jane@example.com", "primary": true}],
            "active": false,
        });
        expected[ENTERPRISE_SCHEMA] = json!({"department": "Cairo", "division": "Platform"});
        assert_eq!(payload, expected);
    }

    #[test]
    fn error_description_lookup() {
        let response = ScimResponse::new(
            409,
            json!({"Errors": {"code": 409, "description": "username_taken taken"}}),
        );
        assert_eq!(response.error_description(), Some("username_taken taken"));
        assert_eq!(response.errors()["code"], 409);

        let empty = ScimResponse::new(500, Value::Null);
        assert_eq!(empty.error_description(), None);
    }

    #[test]
    fn directory_user_from_resource() {
        let user: DirectoryUser = serde_json::from_value(json!({
            "id": "U1",
            "active": true,
            "userName": "jane",
            "emails": [{"value": "jane@example.com", "primary": true}],
        }))
        .unwrap();
        assert_eq!(user.id, "U1");
        assert!(user.active);
        assert_eq!(user.display_name, None);
    }
}
