//! Action verb codes recorded on audit records

use serde::{Deserialize, Serialize};
use std::fmt;

/// The verb describing what happened to a resource
///
/// Common verbs have their own variants; ERP modules can record any other
/// short code through `Custom`. Codes are stored upper-case.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Action {
    Create,
    Update,
    Delete,
    Login,
    Logout,
    Approve,
    Reject,
    Import,
    Export,
    /// Domain-specific code (e.g. `POST_JOURNAL`, `RECEIVE_GOODS`)
    Custom(String),
}

impl Action {
    /// Parse an action code, case-insensitively
    pub fn parse(code: &str) -> Self {
        let code = code.trim().to_uppercase();
        match code.as_str() {
            "CREATE" => Self::Create,
            "UPDATE" => Self::Update,
            "DELETE" => Self::Delete,
            "LOGIN" => Self::Login,
            "LOGOUT" => Self::Logout,
            "APPROVE" => Self::Approve,
            "REJECT" => Self::Reject,
            "IMPORT" => Self::Import,
            "EXPORT" => Self::Export,
            _ => Self::Custom(code),
        }
    }

    /// The stored code
    pub fn code(&self) -> &str {
        match self {
            Self::Create => "CREATE",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
            Self::Login => "LOGIN",
            Self::Logout => "LOGOUT",
            Self::Approve => "APPROVE",
            Self::Reject => "REJECT",
            Self::Import => "IMPORT",
            Self::Export => "EXPORT",
            Self::Custom(code) => code,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.code().is_empty()
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl From<String> for Action {
    fn from(code: String) -> Self {
        Self::parse(&code)
    }
}

impl From<&str> for Action {
    fn from(code: &str) -> Self {
        Self::parse(code)
    }
}

impl From<Action> for String {
    fn from(action: Action) -> Self {
        action.code().to_string()
    }
}
