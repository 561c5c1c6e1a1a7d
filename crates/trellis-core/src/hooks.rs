// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! The fixed hook set owned by every node and its payload types.
use std::collections::BTreeMap;

use serde_json::Value;

use crate::dispatcher::Dispatcher;
use crate::message::{MessageType, Meta};

/// A prop write travelling through the `prop` hook.
#[derive(Debug, Clone, PartialEq)]
pub struct PropChange {
    /// Prop name; middleware may rename it.
    pub prop: String,
    /// Value being written.
    pub value: Value,
}

/// A localizable text fragment travelling through the `text` hook.
#[derive(Debug, Clone, PartialEq)]
pub struct TextFragment {
    /// Message or fragment key.
    pub key: String,
    /// Text to localize.
    pub value: String,
    /// Kind of message the text belongs to.
    pub kind: MessageType,
    /// Free-form metadata.
    pub meta: Meta,
}

/// Ordered class toggles; `true` enables a class.
pub type ClassMap = BTreeMap<String, bool>;

/// Class composition request travelling through the `classes` hook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassesPayload {
    /// Section or property the classes apply to.
    pub property: String,
    /// Merged class toggles.
    pub classes: ClassMap,
}

/// Error injection travelling through the `set_errors` hook.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ErrorsPayload {
    /// Errors for the node itself.
    pub local_errors: Vec<String>,
    /// Errors for descendants, keyed by relative address.
    pub child_errors: BTreeMap<String, Vec<String>>,
}

/// One dispatcher per hook name.
#[derive(Debug, Default)]
pub struct Hooks {
    /// Raw values entering `input`.
    pub input: Dispatcher<Value>,
    /// Values about to be committed.
    pub commit: Dispatcher<Value>,
    /// Prop writes.
    pub prop: Dispatcher<PropChange>,
    /// Class list composition.
    pub classes: Dispatcher<ClassesPayload>,
    /// Text localization.
    pub text: Dispatcher<TextFragment>,
    /// Error injection.
    pub set_errors: Dispatcher<ErrorsPayload>,
}
