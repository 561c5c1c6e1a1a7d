// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Prop declarations and per-node prop state.
use std::fmt;
use std::rc::Rc;

use rustc_hash::FxHashMap;
use serde_json::{Map, Value};

/// Value transform applied on prop read or write.
pub type PropTransform = Rc<dyn Fn(Value) -> Value>;

/// Declared prop: default, read/write transforms and boolean coercion.
#[derive(Clone)]
pub struct PropDef {
    name: String,
    default: Option<Value>,
    getter: Option<PropTransform>,
    setter: Option<PropTransform>,
    boolean: bool,
}

impl PropDef {
    /// Declaration with no default and no transforms.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            default: None,
            getter: None,
            setter: None,
            boolean: false,
        }
    }

    /// Value used when nothing else supplies one.
    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Transform applied on every read.
    pub fn getter<F>(mut self, f: F) -> Self
    where
        F: Fn(Value) -> Value + 'static,
    {
        self.getter = Some(Rc::new(f));
        self
    }

    /// Transform applied on every write.
    pub fn setter<F>(mut self, f: F) -> Self
    where
        F: Fn(Value) -> Value + 'static,
    {
        self.setter = Some(Rc::new(f));
        self
    }

    /// Coerce reads with HTML boolean-attribute semantics.
    pub fn boolean(mut self) -> Self {
        self.boolean = true;
        self
    }

    /// Prop name.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for PropDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropDef")
            .field("name", &self.name)
            .field("default", &self.default)
            .field("getter", &self.getter.is_some())
            .field("setter", &self.setter.is_some())
            .field("boolean", &self.boolean)
            .finish()
    }
}

/// HTML boolean attribute coercion: presence means true, `"false"` means false.
pub fn coerce_bool(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::String(s) => s != "false",
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::Array(_) | Value::Object(_) => true,
    }
}

#[derive(Debug, Default)]
pub(crate) struct Props {
    pub(crate) local: Map<String, Value>,
    pub(crate) attrs: Map<String, Value>,
    pub(crate) defs: FxHashMap<String, PropDef>,
}

impl Props {
    /// Highest-precedence explicit value: attrs, then local props.
    pub(crate) fn explicit(&self, name: &str) -> Option<&Value> {
        self.attrs.get(name).or_else(|| self.local.get(name))
    }

    /// Apply the declared default, getter and coercion to a cascaded value.
    pub(crate) fn finish(&self, name: &str, cascaded: Option<Value>) -> Value {
        let def = self.defs.get(name);
        let value = cascaded
            .or_else(|| def.and_then(|d| d.default.clone()))
            .unwrap_or(Value::Null);
        let Some(def) = def else {
            return value;
        };
        let value = match &def.getter {
            Some(getter) => getter(value),
            None => value,
        };
        if def.boolean {
            Value::Bool(coerce_bool(&value))
        } else {
            value
        }
    }

    pub(crate) fn write_transform(&self, name: &str, value: Value) -> Value {
        match self.defs.get(name).and_then(|d| d.setter.as_ref()) {
            Some(setter) => setter(value),
            None => value,
        }
    }
}
