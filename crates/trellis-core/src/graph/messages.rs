// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Message store mutation, ledger bookkeeping and error helpers.
use std::collections::BTreeMap;
use std::rc::Rc;

use serde_json::Value;
use tracing::{debug, trace};

use super::Graph;
use crate::address::Address;
use crate::error::GraphResult;
use crate::event::Payload;
use crate::hooks::{ErrorsPayload, TextFragment};
use crate::ident::NodeId;
use crate::ledger::{Condition, Transition};
use crate::message::{slugify, Message, MessageType};
use crate::promise::Promise;
use crate::store::{PendingErrors, StoreChange};

fn error_messages(source: &str, texts: &[String]) -> Vec<Message> {
    texts
        .iter()
        .map(|text| {
            Message::error(slugify(text), text.as_str())
                .with_meta("source", source)
                .with_meta("autoClear", true)
        })
        .collect()
}

fn from_source(source: &str) -> impl Fn(&Message) -> bool + '_ {
    move |m| m.kind == MessageType::Error && m.meta_str("source") == Some(source)
}

impl Graph {
    /// Insert or replace a message by key.
    ///
    /// String values are localized through the `text` hook unless
    /// `meta.localize` is `false`. Storing the very same `Rc` again is a
    /// no-op and skips the hook. Returns the message as stored.
    pub fn set_message(
        &mut self,
        node: NodeId,
        message: impl Into<Rc<Message>>,
    ) -> GraphResult<Rc<Message>> {
        let supplied = message.into();
        let store = &self.ctx(node)?.store;
        if store.holds(&supplied) {
            return Ok(store.get(&supplied.key).cloned().unwrap_or(supplied));
        }
        let localize = supplied.meta.get("localize") != Some(&Value::Bool(false));
        let fragment = match &supplied.value {
            Value::String(text) if localize => Some(TextFragment {
                key: supplied.key.clone(),
                value: text.clone(),
                kind: supplied.kind.clone(),
                meta: supplied.meta.clone(),
            }),
            _ => None,
        };
        let localized = match fragment {
            Some(fragment) => {
                let original = fragment.value.clone();
                let localized = self.ctx(node)?.hooks.text.dispatch(fragment);
                if localized.value == original {
                    None
                } else {
                    let locale = self.prop(node, "locale")?;
                    let mut changed = (*supplied).clone();
                    changed.value = Value::String(localized.value);
                    changed.meta.insert("locale".to_owned(), locale);
                    Some(Rc::new(changed))
                }
            }
            None => None,
        };
        let stored = localized.unwrap_or_else(|| Rc::clone(&supplied));
        let store = &mut self.ctx_mut(node)?.store;
        let change = if Rc::ptr_eq(&stored, &supplied) {
            store.set(supplied)
        } else {
            store.set_localized(supplied, Rc::clone(&stored))
        };
        if let Some(change) = change {
            self.store_changed(node, change)?;
        }
        Ok(stored)
    }

    /// Remove the message stored under `key`.
    pub fn remove_message(&mut self, node: NodeId, key: &str) -> GraphResult<bool> {
        let Some(change) = self.ctx_mut(node)?.store.remove(key) else {
            return Ok(false);
        };
        self.store_changed(node, change)?;
        Ok(true)
    }

    /// Remove every message (of `kind`, when given) for which `keep` is false.
    pub fn filter_messages<F>(
        &mut self,
        node: NodeId,
        keep: F,
        kind: Option<MessageType>,
    ) -> GraphResult<usize>
    where
        F: Fn(&Message) -> bool,
    {
        let changes = self.ctx_mut(node)?.store.filter(keep, kind.as_ref());
        let removed = changes.len();
        for change in changes {
            self.store_changed(node, change)?;
        }
        Ok(removed)
    }

    /// Store `messages`, first removing existing ones matching `clear`.
    pub fn apply_messages<C>(
        &mut self,
        node: NodeId,
        messages: Vec<Message>,
        clear: Option<C>,
    ) -> GraphResult<()>
    where
        C: Fn(&Message) -> bool,
    {
        if let Some(clear) = clear {
            self.filter_messages(node, |m| !clear(m), None)?;
        }
        for message in messages {
            self.set_message(node, message)?;
        }
        Ok(())
    }

    /// Ledger and event fan-out for one store mutation.
    pub(crate) fn store_changed(&mut self, node: NodeId, change: StoreChange) -> GraphResult<()> {
        let mut chain = vec![node];
        chain.extend(self.ancestors(node)?);
        for at in chain {
            let deltas = self.ctx(at)?.ledger.deltas(&change);
            for (name, delta) in deltas {
                self.adjust_counter(at, &name, delta)?;
            }
        }
        let (name, payload) = match change {
            StoreChange::Added(m) => ("message-added", Payload::Message(m)),
            StoreChange::Updated { previous, current } => {
                ("message-updated", Payload::MessageUpdated { previous, current })
            }
            StoreChange::Removed(m) => ("message-removed", Payload::Message(m)),
        };
        self.emit(node, name, payload, true)
    }

    /// Start (or reuse) the counter `name` on `node`'s subtree.
    ///
    /// Without a condition the counter matches messages whose type is
    /// `name`. Returns the counter's settlement.
    pub fn count(
        &mut self,
        node: NodeId,
        name: &str,
        condition: Option<Condition>,
    ) -> GraphResult<Promise<()>> {
        let condition = condition.unwrap_or_else(|| Condition::of_type(name));
        self.ensure_counter(node, name, &condition)?;
        Ok(self.ctx(node)?.ledger.settled(name))
    }

    fn ensure_counter(&mut self, node: NodeId, name: &str, condition: &Condition) -> GraphResult<()> {
        if self.ctx(node)?.ledger.has(name) {
            return Ok(());
        }
        let own = {
            let ctx = self.ctx_mut(node)?;
            ctx.ledger.insert(name, condition.clone());
            ctx.store.reduce(0_i64, |n, m| n + i64::from(condition.matches(m)))
        };
        let mut total = own;
        for child in self.ctx(node)?.children.clone() {
            self.ensure_counter(child, name, condition)?;
            total += self.ctx(child)?.ledger.value(name);
        }
        if total == 0 {
            return Ok(());
        }
        self.adjust_counter(node, name, total)
    }

    fn adjust_counter(&mut self, node: NodeId, name: &str, delta: i64) -> GraphResult<()> {
        let Some((count, transition)) = self.ctx_mut(node)?.ledger.adjust(name, delta) else {
            return Ok(());
        };
        trace!(node = %node, counter = name, count, "ledger adjusted");
        match transition {
            Transition::Unsettled => {
                self.emit(node, &format!("unsettled:{name}"), Payload::Count(count), false)?;
            }
            Transition::Settled => {
                self.emit(node, &format!("settled:{name}"), Payload::Count(count), false)?;
            }
            Transition::Steady => {}
        }
        self.emit(node, &format!("count:{name}"), Payload::Count(count), false)
    }

    /// Merge (`sign = 1`) or unmerge (`sign = -1`) `child`'s counts into
    /// `parent` and every ancestor above it.
    pub(crate) fn merge_ledger(&mut self, parent: NodeId, child: NodeId, sign: i64) -> GraphResult<()> {
        let mut chain = vec![parent];
        chain.extend(self.ancestors(parent)?);
        for at in chain {
            for (name, condition) in self.ctx(at)?.ledger.counters() {
                self.ensure_counter(child, &name, &condition)?;
                let delta = sign * self.ctx(child)?.ledger.value(&name);
                if delta != 0 {
                    self.adjust_counter(at, &name, delta)?;
                }
            }
        }
        Ok(())
    }

    /// Current count of `name` on `node` (0 when unknown).
    pub fn ledger_value(&self, node: NodeId, name: &str) -> GraphResult<i64> {
        Ok(self.ctx(node)?.ledger.value(name))
    }

    /// Settlement of counter `name` on `node`.
    pub fn ledger_settled(&self, node: NodeId, name: &str) -> GraphResult<Promise<()>> {
        Ok(self.ctx(node)?.ledger.settled(name))
    }

    /// Replace the errors this node sets on itself and on descendants.
    ///
    /// `child_errors` keys are addresses relative to `node`; addresses that
    /// do not resolve yet are held until a node appears there.
    pub fn set_errors(
        &mut self,
        node: NodeId,
        local_errors: Vec<String>,
        child_errors: BTreeMap<String, Vec<String>>,
    ) -> GraphResult<()> {
        let payload = self.ctx(node)?.hooks.set_errors.dispatch(ErrorsPayload {
            local_errors,
            child_errors,
        });
        let source = format!("{}-set", self.ctx(node)?.name);
        let messages = error_messages(&source, &payload.local_errors);
        self.apply_messages(node, messages, Some(from_source(&source)))?;

        let delimiter = self.delimiter(node)?;
        for (path, texts) in payload.child_errors {
            let address = Address::parse(&path, &delimiter);
            let messages = error_messages(&source, &texts);
            match self.descendant_at(node, &address)? {
                Some(target) => {
                    self.apply_messages(target, messages, Some(from_source(&source)))?;
                }
                None => {
                    let key = address.join(&delimiter);
                    debug!(node = %node, address = %key, "child errors buffered");
                    let pending = PendingErrors {
                        source: source.clone(),
                        messages: messages.into_iter().map(Rc::new).collect(),
                    };
                    self.ctx_mut(node)?.store.buffer(key, pending);
                }
            }
        }
        Ok(())
    }

    /// Apply errors buffered by any ancestor for nodes of `child`'s subtree.
    pub(crate) fn release_buffered_errors(&mut self, child: NodeId) -> GraphResult<()> {
        let mut subtree = vec![child];
        subtree.extend(self.descendants(child)?);
        for node in subtree {
            let address = self.address(node)?;
            for ancestor in self.ancestors(node)? {
                if !self.ctx(ancestor)?.store.has_buffered() {
                    continue;
                }
                let depth = self.address(ancestor)?.len();
                let delimiter = self.delimiter(ancestor)?;
                let relative: Address = address.segments()[depth..].iter().cloned().collect();
                let key = relative.join(&delimiter);
                let Some(pending) = self.ctx_mut(ancestor)?.store.take_buffered(&key) else {
                    continue;
                };
                debug!(node = %node, address = %key, "buffered errors released");
                let PendingErrors { source, messages } = pending;
                self.filter_messages(node, |m| !from_source(&source)(m), None)?;
                for message in messages {
                    self.set_message(node, message)?;
                }
            }
        }
        Ok(())
    }

    /// Remove errors set by this node; with `clear_children`, also every
    /// auto-clearing error in the subtree.
    pub fn clear_errors(&mut self, node: NodeId, clear_children: bool) -> GraphResult<()> {
        let source = format!("{}-set", self.ctx(node)?.name);
        self.ctx_mut(node)?.store.clear_buffered();
        self.filter_messages(node, |m| !from_source(&source)(m), Some(MessageType::Error))?;
        if clear_children {
            for child in self.descendants(node)? {
                self.filter_messages(
                    child,
                    |m| m.meta.get("autoClear") != Some(&Value::Bool(true)),
                    Some(MessageType::Error),
                )?;
            }
        }
        Ok(())
    }
}
