//! `/.well-known/matrix/support` document (MSC1929).

use serde::{Deserialize, Serialize};

use crate::protocol::ids::UserId;

/// Contact role. Unknown roles are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SupportRole {
    Admin,
    Security,
    Other(String),
}

impl From<String> for SupportRole {
    fn from(s: String) -> Self {
        match s.as_str() {
            "m.role.admin" => SupportRole::Admin,
            "m.role.security" => SupportRole::Security,
            _ => SupportRole::Other(s),
        }
    }
}

impl From<SupportRole> for String {
    fn from(r: SupportRole) -> Self {
        match r {
            SupportRole::Admin => "m.role.admin".into(),
            SupportRole::Security => "m.role.security".into(),
            SupportRole::Other(s) => s,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupportContact {
    pub role: SupportRole,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matrix_id: Option<UserId>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupportDocument {
    #[serde(default)]
    pub contacts: Vec<SupportContact>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub support_page: Option<String>,
}

impl SupportDocument {
    /// True iff some contact lists exactly this Matrix id.
    pub fn has_contact(&self, user_id: &UserId) -> bool {
        self.contacts
            .iter()
            .any(|c| c.matrix_id.as_ref() == Some(user_id))
    }
}
