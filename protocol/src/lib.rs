//! Plain data types shared across the husk workspace.
//!
//! Everything here is serde-serializable and free of I/O so that both the
//! core library and any front end can depend on it without pulling in the
//! transport stack.

use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;
use std::fmt;
use uuid::Uuid;

/// Webshell flavor a stored profile talks to.
///
/// The tag only selects parameter conventions and transport defaults;
/// flavor-specific payload framing is not modeled here.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum_macros::Display,
    strum_macros::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ShellKind {
    Php,
    Jsp,
    Aspx,
}

impl ShellKind {
    /// Conventional form field names (`secret_param`, `command_param`) for
    /// shells of this flavor, used when a profile does not override them.
    pub fn default_params(self) -> (&'static str, &'static str) {
        match self {
            ShellKind::Php => ("pass", "cmd"),
            ShellKind::Jsp => ("pwd", "cmd"),
            ShellKind::Aspx => ("key", "cmd"),
        }
    }
}

/// Stored connection profile for one webshell foothold.
///
/// The identifier is immutable for the lifetime of the profile; replacing a
/// profile keeps the id and swaps everything else.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionInfo {
    pub session_id: Uuid,
    /// Operator-facing label, not required to be unique.
    pub name: String,
    pub kind: ShellKind,
    /// Endpoint the webshell answers on.
    pub url: String,
    /// Shared secret the webshell checks before executing anything.
    pub secret: String,
    /// Form field carrying the secret. Empty means the flavor default.
    #[serde(default)]
    pub secret_param: String,
    /// Form field carrying the command. Empty means the flavor default.
    #[serde(default)]
    pub command_param: String,
    /// Optional boundary token: when set, real output is the text between
    /// the first two occurrences of this token in the response body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marker: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl SessionInfo {
    /// Effective form field names, falling back to the flavor defaults.
    pub fn params(&self) -> (&str, &str) {
        let (secret_param, command_param) = self.kind.default_params();
        (
            if self.secret_param.is_empty() {
                secret_param
            } else {
                &self.secret_param
            },
            if self.command_param.is_empty() {
                command_param
            } else {
                &self.command_param
            },
        )
    }

    /// Projection safe to show in listings and logs.
    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            session_id: self.session_id,
            name: self.name.clone(),
            kind: self.kind,
            url: self.url.clone(),
            note: self.note.clone(),
            created_at: self.created_at,
        }
    }
}

impl fmt::Debug for SessionInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionInfo")
            .field("session_id", &self.session_id)
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("url", &self.url)
            .field("secret", &"[REDACTED]")
            .field("marker", &self.marker.as_ref().map(|_| "[PRESENT]"))
            .field("note", &self.note)
            .field("created_at", &self.created_at)
            .finish()
    }
}

/// Redacted view of a profile, the only shape `list()` hands out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: Uuid,
    pub name: String,
    pub kind: ShellKind,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// One entry of a remote directory listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirEntry {
    pub name: String,
    pub is_dir: bool,
    /// Unknown for directories on some remotes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::str::FromStr;

    fn sample() -> SessionInfo {
        SessionInfo {
            session_id: Uuid::nil(),
            name: "web01".to_string(),
            kind: ShellKind::Php,
            url: "http://10.0.0.5/upload/img.php".to_string(),
            secret: "hunter2".to_string(),
            secret_param: String::new(),
            command_param: String::new(),
            marker: None,
            note: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn debug_never_prints_the_secret() {
        let rendered = format!("{:?}", sample());
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("[REDACTED]"));
    }

    #[test]
    fn summary_carries_no_secret_material() {
        let json = serde_json::to_string(&sample().summary()).expect("serialize summary");
        assert!(!json.contains("hunter2"));
        assert!(!json.contains("secret"));
    }

    #[test]
    fn params_fall_back_to_flavor_defaults() {
        let mut info = sample();
        assert_eq!(info.params(), ("pass", "cmd"));
        info.secret_param = "p".to_string();
        assert_eq!(info.params(), ("p", "cmd"));
    }

    #[test]
    fn kind_round_trips_through_strings() {
        assert_eq!(ShellKind::from_str("aspx").expect("parse"), ShellKind::Aspx);
        assert_eq!(ShellKind::Jsp.to_string(), "jsp");
    }
}
