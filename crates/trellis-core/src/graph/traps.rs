// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Trap resolution and the built-in trap table.
use std::collections::BTreeMap;

use serde_json::Value;

use super::Graph;
use crate::diagnostics::W_NOT_CALLABLE;
use crate::error::{GraphError, GraphResult};
use crate::event::Payload;
use crate::ident::NodeId;
use crate::traps::{BoundTrap, Trap, TrapArg, TrapGetter, TrapRegistry, TrapValue};

impl Graph {
    fn trap(&self, node: NodeId, key: &str) -> GraphResult<Option<Trap>> {
        let ctx = self.ctx(node)?;
        Ok(ctx
            .traps
            .get(key)
            .or_else(|| self.builtins.get(key))
            .cloned())
    }

    /// Read `key`: property traps return their value, method traps a
    /// [`BoundTrap`], anything else the prop of that name.
    pub fn get(&mut self, node: NodeId, key: &str) -> GraphResult<TrapValue> {
        match self.trap(node, key)? {
            Some(Trap {
                get: TrapGetter::Direct(f),
                ..
            }) => f(self, node, &[]),
            Some(Trap {
                get: TrapGetter::Curried(_),
                ..
            }) => Ok(TrapValue::Bound(BoundTrap::new(node, key))),
            None => Ok(TrapValue::Value(self.prop(node, key)?)),
        }
    }

    /// Invoke the method trap `key`.
    ///
    /// Calling anything that is not a method warns and yields what
    /// [`Graph::get`] would have returned.
    pub fn call(&mut self, node: NodeId, key: &str, args: &[TrapArg]) -> GraphResult<TrapValue> {
        match self.trap(node, key)? {
            Some(Trap {
                get: TrapGetter::Curried(f),
                ..
            }) => f(self, node, args),
            Some(Trap {
                get: TrapGetter::Direct(f),
                ..
            }) => {
                self.warn(W_NOT_CALLABLE, format!("`{key}` is not callable"));
                f(self, node, args)
            }
            None => {
                self.warn(W_NOT_CALLABLE, format!("`{key}` is not callable"));
                Ok(TrapValue::Value(self.prop(node, key)?))
            }
        }
    }

    /// Assign `key` through its setter trap; unknown keys become props.
    pub fn assign(&mut self, node: NodeId, key: &str, arg: TrapArg) -> GraphResult<bool> {
        match self.trap(node, key)? {
            Some(Trap { set: Some(set), .. }) => set(self, node, arg),
            Some(Trap { set: None, .. }) => {
                let name = self.ctx(node)?.name.clone();
                Err(if key == "store" {
                    GraphError::StoreMutation { name }
                } else {
                    GraphError::ProtectedAssignment {
                        property: key.to_owned(),
                        name,
                    }
                })
            }
            None => {
                let value = value_arg(key, &[arg], 0)?;
                self.set_prop(node, key, value)?;
                Ok(true)
            }
        }
    }

    /// Give `node` a new (or overriding) trap.
    pub fn extend(&mut self, node: NodeId, key: &str, trap: Trap) -> GraphResult<()> {
        self.ctx_mut(node)?.traps.insert(key, trap);
        Ok(())
    }

    /// Whether `key` resolves to a trap on `node`.
    pub fn has_trap(&self, node: NodeId, key: &str) -> GraphResult<bool> {
        Ok(self.trap(node, key)?.is_some())
    }
}

fn node_arg(trap: &str, args: &[TrapArg], i: usize) -> GraphResult<NodeId> {
    match args.get(i) {
        Some(TrapArg::Node(Some(node))) => Ok(*node),
        _ => Err(GraphError::TrapArgument {
            trap: trap.to_owned(),
            expected: "a node",
        }),
    }
}

fn value_arg(trap: &str, args: &[TrapArg], i: usize) -> GraphResult<Value> {
    match args.get(i) {
        Some(TrapArg::Value(value)) => Ok(value.clone()),
        Some(TrapArg::Bool(b)) => Ok(Value::Bool(*b)),
        _ => Err(GraphError::TrapArgument {
            trap: trap.to_owned(),
            expected: "a value",
        }),
    }
}

fn opt_value(args: &[TrapArg], i: usize) -> Option<Value> {
    match args.get(i) {
        Some(TrapArg::Value(value)) => Some(value.clone()),
        _ => None,
    }
}

fn opt_bool(args: &[TrapArg], i: usize) -> Option<bool> {
    match args.get(i) {
        Some(TrapArg::Bool(b)) => Some(*b),
        Some(TrapArg::Value(Value::Bool(b))) => Some(*b),
        _ => None,
    }
}

fn strings(value: &Value) -> Vec<String> {
    match value {
        Value::String(s) => vec![s.clone()],
        Value::Array(items) => items
            .iter()
            .filter_map(|v| v.as_str().map(str::to_owned))
            .collect(),
        _ => Vec::new(),
    }
}

fn object_arg(trap: &str, arg: TrapArg) -> GraphResult<serde_json::Map<String, Value>> {
    match arg {
        TrapArg::Value(Value::Object(map)) => Ok(map),
        _ => Err(GraphError::TrapArgument {
            trap: trap.to_owned(),
            expected: "an object",
        }),
    }
}

/// The trap table every node falls back to.
#[allow(clippy::too_many_lines)]
pub(super) fn builtin_traps() -> TrapRegistry {
    let mut traps = TrapRegistry::default();

    traps.insert(
        "add",
        Trap::method(|graph, node, args| {
            let child = node_arg("add", args, 0)?;
            let index = opt_value(args, 1)
                .and_then(|v| v.as_u64())
                .and_then(|i| usize::try_from(i).ok());
            graph.add(node, child, index)?;
            Ok(TrapValue::Node(Some(node)))
        }),
    );
    traps.insert(
        "remove",
        Trap::method(|graph, node, args| {
            let child = node_arg("remove", args, 0)?;
            graph.remove(node, child)?;
            Ok(TrapValue::Node(Some(node)))
        }),
    );
    traps.insert(
        "at",
        Trap::method(|graph, node, args| {
            let path = value_arg("at", args, 0)?;
            let path = path.as_str().ok_or_else(|| GraphError::TrapArgument {
                trap: "at".to_owned(),
                expected: "a path string",
            })?;
            Ok(TrapValue::Node(graph.at(node, path)?))
        }),
    );
    traps.insert(
        "address",
        Trap::property(|graph, node| Ok(TrapValue::Address(graph.address(node)?))),
    );
    traps.insert(
        "index",
        Trap::property(|graph, node| {
            let index = graph
                .index(node)?
                .map_or(-1, |i| i64::try_from(i).unwrap_or(i64::MAX));
            Ok(TrapValue::Int(index))
        })
        .with_setter(|graph, node, arg| {
            let index = value_arg("index", &[arg], 0)?
                .as_i64()
                .ok_or_else(|| GraphError::TrapArgument {
                    trap: "index".to_owned(),
                    expected: "an integer",
                })?;
            graph.set_index(node, index)
        }),
    );
    traps.insert(
        "parent",
        Trap::property(|graph, node| Ok(TrapValue::Node(graph.parent(node)?))).with_setter(
            |graph, node, arg| match arg {
                TrapArg::Node(parent) => {
                    graph.set_parent(node, parent)?;
                    Ok(true)
                }
                _ => Err(GraphError::TrapArgument {
                    trap: "parent".to_owned(),
                    expected: "a node or none",
                }),
            },
        ),
    );
    traps.insert(
        "name",
        Trap::property(|graph, node| Ok(TrapValue::Value(Value::String(graph.name(node)?)))),
    );
    traps.insert(
        "type",
        Trap::property(|graph, node| {
            Ok(TrapValue::Value(Value::String(
                graph.node_type(node)?.as_str().to_owned(),
            )))
        }),
    );
    traps.insert(
        "value",
        Trap::property(|graph, node| Ok(TrapValue::Value(graph.value(node)?.clone()))),
    );
    traps.insert(
        "children",
        Trap::property(|graph, node| Ok(TrapValue::Nodes(graph.children(node)?.to_vec()))),
    );
    traps.insert(
        "each",
        Trap::method(|graph, node, args| {
            let Some(TrapArg::Visitor(visitor)) = args.first().cloned() else {
                return Err(GraphError::TrapArgument {
                    trap: "each".to_owned(),
                    expected: "a visitor",
                });
            };
            graph.each(node, |graph, child| {
                visitor(graph, child);
            })?;
            Ok(TrapValue::Unit)
        }),
    );
    traps.insert(
        "walk",
        Trap::method(|graph, node, args| {
            let Some(TrapArg::Visitor(visitor)) = args.first().cloned() else {
                return Err(GraphError::TrapArgument {
                    trap: "walk".to_owned(),
                    expected: "a visitor",
                });
            };
            let stop_if_false = opt_bool(args, 1).unwrap_or(false);
            graph.walk(node, stop_if_false, |graph, child| visitor(graph, child))?;
            Ok(TrapValue::Unit)
        }),
    );
    traps.insert(
        "use",
        Trap::method(|graph, node, args| {
            for arg in args {
                let TrapArg::Plugin(plugin) = arg else {
                    return Err(GraphError::TrapArgument {
                        trap: "use".to_owned(),
                        expected: "a plugin",
                    });
                };
                graph.use_plugin(node, plugin)?;
            }
            Ok(TrapValue::Node(Some(node)))
        }),
    );
    traps.insert(
        "plugins",
        Trap::property(|graph, node| {
            let names = graph
                .plugins(node)?
                .iter()
                .map(|p| Value::String(p.name().to_owned()))
                .collect();
            Ok(TrapValue::Value(Value::Array(names)))
        }),
    );
    traps.insert(
        "config",
        Trap::property(|graph, node| Ok(TrapValue::Value(Value::Object(graph.config(node)?))))
            .with_setter(|graph, node, arg| {
                for (key, value) in object_arg("config", arg)? {
                    graph.set_config(node, &key, value)?;
                }
                Ok(true)
            }),
    );
    traps.insert(
        "props",
        Trap::property(|graph, node| Ok(TrapValue::Value(Value::Object(graph.props(node)?))))
            .with_setter(|graph, node, arg| {
                for (key, value) in object_arg("props", arg)? {
                    graph.set_prop(node, &key, value)?;
                }
                Ok(true)
            }),
    );
    traps.insert(
        "store",
        Trap::property(|graph, node| {
            let messages: Vec<_> = graph.store(node)?.iter().map(|m| &**m).collect();
            let value =
                serde_json::to_value(messages).map_err(|e| GraphError::Usage(e.to_string()))?;
            Ok(TrapValue::Value(value))
        }),
    );
    traps.insert(
        "ledger",
        Trap::method(|graph, node, args| {
            let name = value_arg("ledger", args, 0)?;
            let name = name.as_str().unwrap_or_default();
            Ok(TrapValue::Int(graph.ledger_value(node, name)?))
        }),
    );
    traps.insert(
        "input",
        Trap::method(|graph, node, args| {
            let value = value_arg("input", args, 0)?;
            let should_commit = opt_bool(args, 1).unwrap_or(true);
            Ok(TrapValue::Settled(graph.input(node, value, should_commit)?))
        }),
    );
    traps.insert(
        "reset",
        Trap::method(|graph, node, args| {
            graph.reset(node, opt_value(args, 0))?;
            Ok(TrapValue::Unit)
        }),
    );
    traps.insert(
        "emit",
        Trap::method(|graph, node, args| {
            let name = value_arg("emit", args, 0)?;
            let name = name.as_str().ok_or_else(|| GraphError::TrapArgument {
                trap: "emit".to_owned(),
                expected: "an event name",
            })?;
            let payload = opt_value(args, 1).map_or(Payload::None, Payload::Value);
            let bubble = opt_bool(args, 2).unwrap_or(true);
            graph.emit(node, name, payload, bubble)?;
            Ok(TrapValue::Unit)
        }),
    );
    traps.insert(
        "root",
        Trap::property(|graph, node| Ok(TrapValue::Node(Some(graph.root(node)?)))),
    );
    traps.insert(
        "settled",
        Trap::property(|graph, node| Ok(TrapValue::Settled(graph.settled(node)?))),
    );
    traps.insert(
        "is_settled",
        Trap::property(|graph, node| Ok(TrapValue::Bool(graph.is_settled(node)?))),
    );
    traps.insert(
        "set_errors",
        Trap::method(|graph, node, args| {
            let local = opt_value(args, 0).map(|v| strings(&v)).unwrap_or_default();
            let children: BTreeMap<String, Vec<String>> = match opt_value(args, 1) {
                Some(Value::Object(map)) => map.iter().map(|(k, v)| (k.clone(), strings(v))).collect(),
                _ => BTreeMap::new(),
            };
            graph.set_errors(node, local, children)?;
            Ok(TrapValue::Unit)
        }),
    );
    traps.insert(
        "clear_errors",
        Trap::method(|graph, node, args| {
            graph.clear_errors(node, opt_bool(args, 0).unwrap_or(true))?;
            Ok(TrapValue::Unit)
        }),
    );
    traps.insert(
        "destroy",
        Trap::method(|graph, node, _args| {
            graph.destroy(node)?;
            Ok(TrapValue::Unit)
        }),
    );
    traps
}
