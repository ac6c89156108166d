//! Connection-provenance contracts shared between the fetch engine and the
//! UI.
//!
//! A resolution attempt produces exactly one [`FetchResult`]: the page body
//! and headers on success, an opaque error string on failure, and in both
//! cases the ordered handshake log recording which authentication stages
//! passed before the attempt ended. The field names are a wire contract
//! with the embedding shell and must not change.

use serde::Deserialize;
use serde::Serialize;

/// Single handshake/authentication stage outcome. Steps are appended in
/// the order the stages ran and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogStep {
    pub name: String,
    pub ok: bool,
    pub detail: Option<String>,
}

impl LogStep {
    pub fn passed(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ok: true,
            detail: None,
        }
    }

    pub fn failed(name: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ok: false,
            detail: Some(detail.into()),
        }
    }
}

/// Response header. Duplicates are legal and order is preserved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    pub name: String,
    pub value: String,
}

/// Endpoint identities verified during a fully successful handshake.
///
/// All three fields are populated whenever this struct is present; an
/// attempt that failed before identity verification carries no
/// `connection` at all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionIdentity {
    pub client_node_id: String,
    pub server_node_id: String,
    pub server_pubkey: String,
}

/// Terminal outcome of one resolution attempt.
///
/// Produced once by the fetch engine, consumed once by the UI to update tab
/// state, then discarded. Never persisted and never merged across attempts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchResult {
    pub ok: bool,
    pub error: Option<String>,
    pub status: Option<String>,
    pub status_details: Option<String>,
    pub body: Option<String>,
    pub headers: Vec<Header>,
    pub connection: Option<ConnectionIdentity>,
    pub log: Vec<LogStep>,
}

impl FetchResult {
    /// Failure result carrying whatever log accumulated before the error.
    pub fn failure(error: impl Into<String>, log: Vec<LogStep>) -> Self {
        Self {
            ok: false,
            error: Some(error.into()),
            status: None,
            status_details: None,
            body: None,
            headers: Vec::new(),
            connection: None,
            log,
        }
    }

    /// Status and status details combined for log display, details dropped
    /// when empty.
    pub fn status_line(&self) -> Option<String> {
        let status = self.status.as_deref()?;
        match self.status_details.as_deref() {
            Some(details) if !details.is_empty() => Some(format!("{status} {details}")),
            _ => Some(status.to_owned()),
        }
    }

    /// Provenance view for the trust indicator.
    ///
    /// `None` when no handshake activity was recorded; an empty log means
    /// "no information", never "verified". Identity fields carry over only
    /// when the handshake completed far enough to verify them.
    pub fn connection_info(&self) -> Option<ConnectionInfo> {
        if self.log.is_empty() {
            return None;
        }

        Some(ConnectionInfo {
            client_node_id: self
                .connection
                .as_ref()
                .map(|identity| identity.client_node_id.clone()),
            server_node_id: self
                .connection
                .as_ref()
                .map(|identity| identity.server_node_id.clone()),
            server_pubkey: self
                .connection
                .as_ref()
                .map(|identity| identity.server_pubkey.clone()),
            log: self.log.clone(),
        })
    }
}

/// Aggregated provenance rendered by the UI: verified identities (when
/// available) plus the full handshake log, including partial logs from
/// failed attempts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionInfo {
    pub client_node_id: Option<String>,
    pub server_node_id: Option<String>,
    pub server_pubkey: Option<String>,
    pub log: Vec<LogStep>,
}

impl ConnectionInfo {
    /// True iff every recorded stage passed. Pure fold over the finished
    /// log; construction guarantees the log is non-empty.
    pub fn all_verified(&self) -> bool {
        self.log.iter().all(|step| step.ok)
    }
}

/// Error categories emitted by the fetch engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Crypto,
    Identity,
    Protocol,
}

impl ErrorCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::Crypto => "crypto",
            Self::Identity => "identity",
            Self::Protocol => "protocol",
        }
    }

    fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "network" => Some(Self::Network),
            "crypto" => Some(Self::Crypto),
            "identity" => Some(Self::Identity),
            "protocol" => Some(Self::Protocol),
            _ => None,
        }
    }
}

/// Structured view of a fetch-engine error string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedError {
    pub category: Option<ErrorCategory>,
    pub code: Option<String>,
    pub message: String,
}

impl ClassifiedError {
    fn unclassified(message: &str) -> Self {
        Self {
            category: None,
            code: None,
            message: message.to_owned(),
        }
    }

    /// Failure title for the error page. Selection is a display heuristic
    /// only; nothing may branch on it beyond icon/title/hint choice.
    pub fn user_title(&self) -> &'static str {
        let message = self.message.to_ascii_lowercase();
        match self.category {
            Some(ErrorCategory::Network) => {
                if message.contains("timed out") || message.contains("timeout") {
                    "Connection timed out"
                } else {
                    "Can't connect"
                }
            }
            Some(ErrorCategory::Crypto) => "Secure handshake failed",
            Some(ErrorCategory::Identity) => {
                if message.contains("addr") {
                    "Server not found"
                } else {
                    "Identity error"
                }
            }
            Some(ErrorCategory::Protocol) => "Protocol error",
            None => "Navigation failed",
        }
    }
}

/// Parses the `[<category>:<code>] <message>` error convention.
///
/// The match is fixed-structure: `[`, word characters, `:`, an optionally
/// negative integer code, `]`, at least one whitespace character, then the
/// message. Anything else (including an unknown category keyword) is
/// returned whole as an unclassified message.
pub fn classify_error(error: &str) -> ClassifiedError {
    let Some(rest) = error.strip_prefix('[') else {
        return ClassifiedError::unclassified(error);
    };
    let Some(colon) = rest.find(':') else {
        return ClassifiedError::unclassified(error);
    };

    let keyword = &rest[..colon];
    if keyword.is_empty() || !keyword.chars().all(|ch| ch.is_ascii_alphanumeric() || ch == '_') {
        return ClassifiedError::unclassified(error);
    }

    let after_colon = &rest[colon + 1..];
    let Some(close) = after_colon.find(']') else {
        return ClassifiedError::unclassified(error);
    };

    let code = &after_colon[..close];
    let digits = code.strip_prefix('-').unwrap_or(code);
    if digits.is_empty() || !digits.chars().all(|ch| ch.is_ascii_digit()) {
        return ClassifiedError::unclassified(error);
    }

    let remainder = &after_colon[close + 1..];
    let message = remainder.trim_start();
    if message.len() == remainder.len() {
        // No whitespace after the bracket; not the engine's format.
        return ClassifiedError::unclassified(error);
    }

    let Some(category) = ErrorCategory::from_keyword(keyword) else {
        return ClassifiedError::unclassified(error);
    };

    ClassifiedError {
        category: Some(category),
        code: Some(code.to_owned()),
        message: message.to_owned(),
    }
}

/// Lowercase-hex encoding used for the server public key on the wire.
pub fn encode_pubkey(bytes: &[u8]) -> String {
    bytes.iter().map(|byte| format!("{byte:02x}")).collect()
}
