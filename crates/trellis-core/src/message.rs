// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Immutable store messages.
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Free-form message metadata.
pub type Meta = serde_json::Map<String, Value>;

/// Category of a store message.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MessageType {
    /// Boolean-ish node state (`dirty`, `submitted`, ...).
    State,
    /// User-facing error.
    Error,
    /// UI text (`incomplete`, submit labels, ...).
    Ui,
    /// Validation rule outcome.
    Validation,
    /// Any other plugin-defined category.
    Custom(String),
}

impl MessageType {
    /// Wire name of the type.
    pub fn as_str(&self) -> &str {
        match self {
            Self::State => "state",
            Self::Error => "error",
            Self::Ui => "ui",
            Self::Validation => "validation",
            Self::Custom(name) => name,
        }
    }
}

impl From<&str> for MessageType {
    fn from(name: &str) -> Self {
        match name {
            "state" => Self::State,
            "error" => Self::Error,
            "ui" => Self::Ui,
            "validation" => Self::Validation,
            other => Self::Custom(other.to_owned()),
        }
    }
}

impl From<String> for MessageType {
    fn from(name: String) -> Self {
        Self::from(name.as_str())
    }
}

impl From<MessageType> for String {
    fn from(kind: MessageType) -> Self {
        kind.as_str().to_owned()
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A keyed entry in a node's message store.
///
/// Messages are frozen once stored (they live behind `Rc`); replacing one
/// means storing a new message under the same key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Key, unique within one store.
    pub key: String,
    /// Payload; strings are localized through the `text` hook.
    pub value: Value,
    /// Category.
    #[serde(rename = "type")]
    pub kind: MessageType,
    /// Whether the message blocks submission.
    pub blocking: bool,
    /// Whether the message should be shown to the user.
    pub visible: bool,
    /// Free-form metadata.
    #[serde(default)]
    pub meta: Meta,
}

impl Message {
    /// Visible, non-blocking message.
    pub fn new(key: impl Into<String>, kind: MessageType, value: impl Into<Value>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            kind,
            blocking: false,
            visible: true,
            meta: Meta::new(),
        }
    }

    /// `state` message.
    pub fn state(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(key, MessageType::State, value)
    }

    /// `error` message.
    pub fn error(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(key, MessageType::Error, value)
    }

    /// `ui` message.
    pub fn ui(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(key, MessageType::Ui, value)
    }

    /// `validation` message.
    pub fn validation(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(key, MessageType::Validation, value)
    }

    /// Set the blocking flag.
    pub fn blocking(mut self, blocking: bool) -> Self {
        self.blocking = blocking;
        self
    }

    /// Set the visible flag.
    pub fn visible(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }

    /// Add one metadata entry.
    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.meta.insert(key.into(), value.into());
        self
    }

    /// String metadata entry.
    pub fn meta_str(&self, key: &str) -> Option<&str> {
        self.meta.get(key).and_then(Value::as_str)
    }
}

/// Lowercase, dash-separated key derived from message text.
pub fn slugify(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pending_dash = false;
    for ch in text.chars() {
        if ch.is_alphanumeric() {
            if pending_dash && !out.is_empty() {
                out.push('-');
            }
            pending_dash = false;
            out.extend(ch.to_lowercase());
        } else if ch.is_whitespace() || ch == '-' || ch == '_' {
            pending_dash = true;
        }
    }
    out
}
