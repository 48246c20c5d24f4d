use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Tag holding the explicit parent promise id
pub const TAG_PARENT: &str = "resonate:parent";
/// Tag holding the id of the root of the call tree
pub const TAG_ORIGIN: &str = "resonate:origin";
/// Tag distinguishing remote (`global`) from local (`local`) calls
pub const TAG_SCOPE: &str = "resonate:scope";
/// Tag holding a sleep duration in milliseconds
pub const TAG_TIMEOUT: &str = "resonate:timeout";
/// Tag holding a human display name
pub const TAG_INVOKE: &str = "resonate:invoke";

/// Lifecycle state of a promise as reported by the server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PromiseState {
    Pending,
    Resolved,
    Rejected,
    RejectedCanceled,
    RejectedTimedout,
    #[default]
    #[serde(other)]
    Unknown,
}

impl PromiseState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PromiseState::Pending => "PENDING",
            PromiseState::Resolved => "RESOLVED",
            PromiseState::Rejected => "REJECTED",
            PromiseState::RejectedCanceled => "REJECTED_CANCELED",
            PromiseState::RejectedTimedout => "REJECTED_TIMEDOUT",
            PromiseState::Unknown => "UNKNOWN",
        }
    }

    /// Collapse the state into the three-way health used for aggregation.
    pub fn health(&self) -> Health {
        match self {
            PromiseState::Resolved => Health::Resolved,
            PromiseState::Pending => Health::Pending,
            _ => Health::Rejected,
        }
    }

    /// True for REJECTED and every REJECTED_* variant.
    pub fn is_rejected(&self) -> bool {
        matches!(
            self,
            PromiseState::Rejected | PromiseState::RejectedCanceled | PromiseState::RejectedTimedout
        )
    }
}

impl fmt::Display for PromiseState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalized health, ordered so that `max` picks the worst.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Health {
    Resolved,
    Pending,
    Rejected,
}

impl Health {
    pub fn as_str(&self) -> &'static str {
        match self {
            Health::Resolved => "resolved",
            Health::Pending => "pending",
            Health::Rejected => "rejected",
        }
    }
}

impl fmt::Display for Health {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What kind of call a promise represents, derived from its tags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Root,
    Rpc,
    Run,
    Sleep,
}

impl Role {
    pub fn from_tags(tags: &HashMap<String, String>) -> Self {
        if tags.get(TAG_TIMEOUT).is_some_and(|t| !t.is_empty()) {
            return Role::Sleep;
        }
        match tags.get(TAG_SCOPE).map(String::as_str) {
            Some("global") => Role::Rpc,
            Some("local") => Role::Run,
            _ => Role::Root,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Root => "root",
            Role::Rpc => "rpc",
            Role::Run => "run",
            Role::Sleep => "sleep",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "root" => Ok(Role::Root),
            "rpc" => Ok(Role::Rpc),
            "run" => Ok(Role::Run),
            "sleep" => Ok(Role::Sleep),
            _ => Err(format!("Unknown role: {}. Use 'root', 'rpc', 'run' or 'sleep'.", s)),
        }
    }
}

/// Input or output payload of a promise
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Value {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<HashMap<String, String>>,
    /// Base64 encoded body
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
}

impl Value {
    /// Raw bytes of the base64 body, `None` when absent or not valid base64.
    pub fn decode_bytes(&self) -> Option<Vec<u8>> {
        let data = self.data.as_deref()?;
        STANDARD.decode(data.trim()).ok()
    }

    /// Decode the body as base64 JSON. Any failure yields `None`.
    pub fn decode_json<T: serde::de::DeserializeOwned>(&self) -> Option<T> {
        serde_json::from_slice(&self.decode_bytes()?).ok()
    }
}

/// A promise record as returned by the server
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Promise {
    pub id: String,
    #[serde(default)]
    pub state: PromiseState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub param: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(default)]
    pub timeout: i64,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub tags: HashMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_on: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_on: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idempotency_key_for_create: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idempotency_key_for_complete: Option<String>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<HashMap<String, String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<HashMap<String, String>>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Deserialize)]
struct ParamPayload {
    func: Option<String>,
}

impl Promise {
    /// Placeholder used when the requested root is absent from the record set.
    pub fn placeholder(id: &str) -> Self {
        Promise {
            id: id.to_string(),
            state: PromiseState::Unknown,
            timeout: 0,
            ..Promise::default()
        }
    }

    /// Non-empty tag value
    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str).filter(|v| !v.is_empty())
    }

    pub fn role(&self) -> Role {
        Role::from_tags(&self.tags)
    }

    pub fn health(&self) -> Health {
        self.state.health()
    }

    /// `completedOn - createdOn` when both are known
    pub fn duration(&self) -> Option<i64> {
        Some(self.completed_on? - self.created_on?)
    }
}

/// Function name carried in the param payload as `{"func": "..."}`.
pub fn function_name(promise: &Promise) -> Option<String> {
    let payload: ParamPayload = promise.param.as_ref()?.decode_json()?;
    payload.func.filter(|f| !f.is_empty())
}
