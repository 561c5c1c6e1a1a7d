// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Config cascade, shared configs and props.
//!
//! Config is resolved from the node's local map, then each ancestor's local
//! map (nearest first), then the node's shared config, then the graph
//! settings. A local value therefore shadows every source above it, which
//! is also what stops a cascade from reaching an overriding subtree.
use serde_json::{Map, Value};
use tracing::{debug, trace};

use super::tree::Visit;
use super::Graph;
use crate::config::SharedConfig;
use crate::error::{GraphError, GraphResult};
use crate::event::Payload;
use crate::hooks::PropChange;
use crate::ident::{ConfigId, NodeId};
use crate::props::PropDef;

impl Graph {
    /// Register a shared config object and return its handle.
    pub fn create_config(&mut self, values: Map<String, Value>) -> ConfigId {
        let id = ConfigId(u32::try_from(self.configs.len()).unwrap_or(u32::MAX));
        self.configs.push(SharedConfig::new(values));
        id
    }

    pub(crate) fn shared(&self, id: ConfigId) -> GraphResult<&SharedConfig> {
        usize::try_from(id.0)
            .ok()
            .and_then(|i| self.configs.get(i))
            .ok_or(GraphError::UnknownConfig(id))
    }

    fn shared_mut(&mut self, id: ConfigId) -> GraphResult<&mut SharedConfig> {
        usize::try_from(id.0)
            .ok()
            .and_then(|i| self.configs.get_mut(i))
            .ok_or(GraphError::UnknownConfig(id))
    }

    /// Value of `key` in a shared config.
    pub fn shared_config_value(&self, id: ConfigId, key: &str) -> GraphResult<Option<Value>> {
        Ok(self.shared(id)?.values.get(key).cloned())
    }

    /// Shared config the node currently belongs to.
    pub fn shared_config_of(&self, node: NodeId) -> GraphResult<Option<ConfigId>> {
        Ok(self.ctx(node)?.shared_config)
    }

    /// Write `key` on a shared config and notify every member that does
    /// not shadow it with a local value.
    pub fn set_shared_config(&mut self, id: ConfigId, key: &str, value: Value) -> GraphResult<()> {
        let shared = self.shared_mut(id)?;
        if shared.values.get(key) == Some(&value) {
            return Ok(());
        }
        shared.values.insert(key.to_owned(), value);
        let members: Vec<NodeId> = shared.members.iter().copied().collect();
        debug!(config = %id, key, members = members.len(), "shared config changed");
        for member in members {
            if self.contains(member) && !self.overrides(member, key)? {
                self.notify_config(member, key)?;
            }
        }
        Ok(())
    }

    fn overrides(&self, node: NodeId, key: &str) -> GraphResult<bool> {
        let mut cursor = Some(node);
        while let Some(at) = cursor {
            let ctx = self.ctx(at)?;
            if ctx.config.contains_key(key) {
                return Ok(true);
            }
            cursor = ctx.parent;
        }
        Ok(false)
    }

    pub(crate) fn join_shared_config(
        &mut self,
        node: NodeId,
        id: ConfigId,
        explicit: bool,
    ) -> GraphResult<()> {
        self.shared_mut(id)?.members.insert(node);
        let ctx = self.ctx_mut(node)?;
        ctx.shared_config = Some(id);
        ctx.explicit_shared = explicit;
        Ok(())
    }

    pub(crate) fn leave_shared_config(&mut self, node: NodeId) -> GraphResult<()> {
        let Some(id) = self.ctx_mut(node)?.shared_config.take() else {
            return Ok(());
        };
        self.shared_mut(id)?.members.remove(&node);
        Ok(())
    }

    /// Re-derive inherited shared-config membership below (and at) `node`.
    pub(crate) fn inherit_shared_config(&mut self, node: NodeId) -> GraphResult<()> {
        self.visit(node, &mut |graph: &mut Self, at: NodeId| -> GraphResult<Visit> {
            let ctx = graph.ctx(at)?;
            if ctx.explicit_shared {
                return Ok(Visit::SkipSubtree);
            }
            let current = ctx.shared_config;
            let inherited = match ctx.parent {
                Some(parent) => graph.ctx(parent)?.shared_config,
                None => None,
            };
            if inherited != current {
                graph.leave_shared_config(at)?;
                if let Some(id) = inherited {
                    graph.join_shared_config(at, id, false)?;
                }
                trace!(node = %at, ?inherited, "shared config inherited");
            }
            Ok(Visit::Continue)
        })?;
        Ok(())
    }

    /// Resolved config value for `key`.
    pub fn config_value(&self, node: NodeId, key: &str) -> GraphResult<Option<Value>> {
        let mut cursor = Some(node);
        while let Some(at) = cursor {
            let ctx = self.ctx(at)?;
            if let Some(value) = ctx.config.get(key) {
                return Ok(Some(value.clone()));
            }
            cursor = ctx.parent;
        }
        if let Some(id) = self.ctx(node)?.shared_config {
            if let Some(value) = self.shared(id)?.values.get(key) {
                return Ok(Some(value.clone()));
            }
        }
        Ok(match key {
            "delimiter" => Some(Value::String(self.settings.delimiter.clone())),
            "locale" => Some(Value::String(self.settings.locale.clone())),
            _ => None,
        })
    }

    /// Every config value visible from `node`, nearest source winning.
    pub fn config(&self, node: NodeId) -> GraphResult<Map<String, Value>> {
        let mut merged = Map::new();
        merged.insert("delimiter".to_owned(), Value::String(self.settings.delimiter.clone()));
        merged.insert("locale".to_owned(), Value::String(self.settings.locale.clone()));
        if let Some(id) = self.ctx(node)?.shared_config {
            merged.extend(self.shared(id)?.values.clone());
        }
        let mut chain = self.ancestors(node)?;
        chain.reverse();
        chain.push(node);
        for at in chain {
            merged.extend(self.ctx(at)?.config.clone());
        }
        Ok(merged)
    }

    pub(crate) fn delimiter(&self, node: NodeId) -> GraphResult<String> {
        Ok(self
            .config_value(node, "delimiter")?
            .and_then(|v| v.as_str().map(str::to_owned))
            .unwrap_or_else(|| self.settings.delimiter.clone()))
    }

    /// Set a local config value and cascade it to the subtree, skipping
    /// descendants that declare their own value for `key`.
    pub fn set_config(&mut self, node: NodeId, key: &str, value: Value) -> GraphResult<()> {
        let ctx = self.ctx_mut(node)?;
        if ctx.config.get(key) == Some(&value) {
            return Ok(());
        }
        ctx.config.insert(key.to_owned(), value);
        self.notify_config(node, key)?;
        let children = self.ctx(node)?.children.clone();
        for child in children {
            self.visit(child, &mut |graph: &mut Self, at: NodeId| -> GraphResult<Visit> {
                if graph.ctx(at)?.config.contains_key(key) {
                    return Ok(Visit::SkipSubtree);
                }
                graph.notify_config(at, key)?;
                Ok(Visit::Continue)
            })?;
        }
        Ok(())
    }

    fn notify_config(&mut self, node: NodeId, key: &str) -> GraphResult<()> {
        let value = self.config_value(node, key)?.unwrap_or(Value::Null);
        self.emit(node, &format!("config:{key}"), Payload::Value(value), false)?;
        if self.ctx(node)?.props.explicit(key).is_none() {
            let prop = self.prop(node, key)?;
            self.emit_prop_change(node, key, prop)?;
        }
        Ok(())
    }

    /// Effective prop value: attrs, local props, config cascade, declared default.
    pub fn prop(&self, node: NodeId, name: &str) -> GraphResult<Value> {
        let props = &self.ctx(node)?.props;
        let cascaded = match props.explicit(name) {
            Some(value) => Some(value.clone()),
            None => self.config_value(node, name)?,
        };
        Ok(props.finish(name, cascaded))
    }

    /// Explicit props and attrs, plus declared props at their effective value.
    pub fn props(&self, node: NodeId) -> GraphResult<Map<String, Value>> {
        let props = &self.ctx(node)?.props;
        let mut names: Vec<&str> = props
            .local
            .keys()
            .chain(props.attrs.keys())
            .chain(props.defs.keys())
            .map(String::as_str)
            .collect();
        names.sort_unstable();
        names.dedup();
        names
            .into_iter()
            .map(|name| Ok((name.to_owned(), self.prop(node, name)?)))
            .collect()
    }

    /// Write a local prop through the `prop` hook and the declared setter.
    pub fn set_prop(&mut self, node: NodeId, name: &str, value: Value) -> GraphResult<()> {
        let change = self.ctx(node)?.hooks.prop.dispatch(PropChange {
            prop: name.to_owned(),
            value,
        });
        let props = &self.ctx(node)?.props;
        let value = props.write_transform(&change.prop, change.value);
        if props.local.get(&change.prop) == Some(&value) {
            return Ok(());
        }
        let before = self.prop(node, &change.prop)?;
        self.ctx_mut(node)?.props.local.insert(change.prop.clone(), value);
        self.prop_written(node, &change.prop, &before)
    }

    /// Write an attr; attrs take precedence over every other prop source.
    pub fn set_attr(&mut self, node: NodeId, name: &str, value: Value) -> GraphResult<()> {
        let before = self.prop(node, name)?;
        self.ctx_mut(node)?.props.attrs.insert(name.to_owned(), value);
        self.prop_written(node, name, &before)
    }

    /// Declare props. An attr of the same name is adopted as the local value.
    pub fn add_props(&mut self, node: NodeId, defs: Vec<PropDef>) -> GraphResult<()> {
        for def in defs {
            let name = def.name().to_owned();
            let before = self.prop(node, &name)?;
            let props = &mut self.ctx_mut(node)?.props;
            if let Some(adopted) = props.attrs.remove(&name) {
                props.local.insert(name.clone(), adopted);
            }
            props.defs.insert(name.clone(), def);
            self.prop_written(node, &name, &before)?;
        }
        Ok(())
    }

    fn prop_written(&mut self, node: NodeId, name: &str, before: &Value) -> GraphResult<()> {
        let after = self.prop(node, name)?;
        if &after == before {
            return Ok(());
        }
        if name == "id" {
            self.deregister(node)?;
            if let Some(key) = after.as_str() {
                self.register(node, key)?;
            }
        }
        self.emit_prop_change(node, name, after)
    }

    fn emit_prop_change(&mut self, node: NodeId, name: &str, value: Value) -> GraphResult<()> {
        self.emit(
            node,
            "prop",
            Payload::Prop(PropChange {
                prop: name.to_owned(),
                value: value.clone(),
            }),
            true,
        )?;
        self.emit(node, &format!("prop:{name}"), Payload::Value(value), false)
    }
}
