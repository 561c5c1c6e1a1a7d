// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Listener registration, emission and bubbling.
use std::rc::Rc;

use tracing::trace;

use super::Graph;
use crate::error::GraphResult;
use crate::event::{Event, ListenOptions, Payload};
use crate::ident::{NodeId, Receipt};
use crate::message::Meta;

impl Graph {
    /// Listen on `node` for `pattern` (`name` or `name.deep`).
    pub fn on<F>(&mut self, node: NodeId, pattern: &str, listener: F) -> GraphResult<Receipt>
    where
        F: Fn(&mut Self, &Event) + 'static,
    {
        self.on_with(node, pattern, listener, ListenOptions::default())
    }

    /// [`Graph::on`] with an explicit receipt and/or placement.
    pub fn on_with<F>(
        &mut self,
        node: NodeId,
        pattern: &str,
        listener: F,
        options: ListenOptions,
    ) -> GraphResult<Receipt>
    where
        F: Fn(&mut Self, &Event) + 'static,
    {
        self.ctx(node)?;
        let receipt = match options.receipt {
            Some(receipt) => receipt,
            None => self.next_receipt(),
        };
        self.ctx_mut(node)?
            .emitter
            .on(pattern, Rc::new(listener), receipt.clone(), options.placement);
        Ok(receipt)
    }

    /// Drop every registration on `node` sharing `receipt`.
    pub fn off(&mut self, node: NodeId, receipt: &Receipt) -> GraphResult<bool> {
        Ok(self.ctx_mut(node)?.emitter.off(receipt))
    }

    /// Number of listeners registered on `node` for `name`.
    pub fn listener_count(&self, node: NodeId, name: &str) -> GraphResult<usize> {
        Ok(self.ctx(node)?.emitter.listener_count(name))
    }

    /// Emit an event originating at `node`.
    pub fn emit(
        &mut self,
        node: NodeId,
        name: &str,
        payload: Payload,
        bubble: bool,
    ) -> GraphResult<()> {
        self.emit_with_meta(node, name, payload, bubble, None)
    }

    /// [`Graph::emit`] carrying event metadata.
    pub fn emit_with_meta(
        &mut self,
        node: NodeId,
        name: &str,
        payload: Payload,
        bubble: bool,
        meta: Option<Meta>,
    ) -> GraphResult<()> {
        self.ctx(node)?;
        let event = Rc::new(Event::new(name, payload, bubble, node, meta));
        self.deliver(node, event);
        Ok(())
    }

    fn deliver(&mut self, from: NodeId, event: Rc<Event>) {
        let mut cursor = Some(from);
        while let Some(at) = cursor {
            let Some(ctx) = self.nodes.get_mut(at) else {
                return;
            };
            if ctx.emitter.is_paused() {
                trace!(node = %at, event = event.name(), "event held");
                ctx.emitter.hold(event);
                return;
            }
            let listeners = ctx.emitter.matching(&event, at);
            for listener in listeners {
                listener(self, &event);
            }
            if !event.bubbles() {
                return;
            }
            cursor = self.nodes.get(at).and_then(|ctx| ctx.parent);
        }
    }

    /// Buffer events reaching any node of the subtree until [`Graph::play`].
    pub fn pause(&mut self, node: NodeId) -> GraphResult<()> {
        self.ctx_mut(node)?.emitter.pause();
        for child in self.descendants(node)? {
            self.ctx_mut(child)?.emitter.pause();
        }
        Ok(())
    }

    /// Resume the subtree, replaying held events from where they stopped.
    pub fn play(&mut self, node: NodeId) -> GraphResult<()> {
        let mut order = vec![node];
        order.extend(self.descendants(node)?);
        for at in order {
            let Some(ctx) = self.nodes.get_mut(at) else {
                continue;
            };
            for event in ctx.emitter.play() {
                self.deliver(at, event);
            }
        }
        Ok(())
    }

    /// Whether `node`'s emitter is buffering.
    pub fn is_paused(&self, node: NodeId) -> GraphResult<bool> {
        Ok(self.ctx(node)?.emitter.is_paused())
    }
}
