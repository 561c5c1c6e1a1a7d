// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Ordered middleware chains with onion-style continuation.
//!
//! Every hook on a node is a [`Dispatcher`]. A middleware receives the
//! payload and a [`Next`] continuation; calling `next.call(payload)` runs the
//! rest of the chain and returns its result, so a middleware can transform
//! the payload before, after, or instead of the downstream chain.
use std::fmt;
use std::rc::Rc;

/// One link in a dispatcher chain.
///
/// Identity is the allocation: clones of a middleware compare equal under
/// [`Middleware::ptr_eq`] and can be used to remove it later.
pub struct Middleware<T>(Rc<dyn Fn(T, Next<'_, T>) -> T>);

impl<T> Middleware<T> {
    /// Wrap a closure as middleware.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(T, Next<'_, T>) -> T + 'static,
    {
        Self(Rc::new(f))
    }

    /// Whether both handles refer to the same middleware.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl<T> Clone for Middleware<T> {
    fn clone(&self) -> Self {
        Self(Rc::clone(&self.0))
    }
}

impl<T> fmt::Debug for Middleware<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Middleware({:p})", Rc::as_ptr(&self.0))
    }
}

/// Continuation into the remainder of a chain.
pub struct Next<'a, T> {
    rest: &'a [Middleware<T>],
}

impl<T> Next<'_, T> {
    /// Run the remaining middleware; past the end the payload is returned as is.
    pub fn call(self, payload: T) -> T {
        match self.rest.split_first() {
            Some((head, rest)) => (head.0)(payload, Next { rest }),
            None => payload,
        }
    }
}

/// Ordered middleware list for a single hook.
pub struct Dispatcher<T> {
    chain: Vec<Middleware<T>>,
}

impl<T> Default for Dispatcher<T> {
    fn default() -> Self {
        Self { chain: Vec::new() }
    }
}

impl<T> fmt::Debug for Dispatcher<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("len", &self.chain.len())
            .finish()
    }
}

impl<T> Dispatcher<T> {
    /// Empty chain.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append middleware; returns a handle usable with [`Dispatcher::remove`].
    pub fn push(&mut self, middleware: Middleware<T>) -> Middleware<T> {
        self.chain.push(middleware.clone());
        middleware
    }

    /// Append a closure as middleware.
    pub fn use_fn<F>(&mut self, f: F) -> Middleware<T>
    where
        F: Fn(T, Next<'_, T>) -> T + 'static,
    {
        self.push(Middleware::new(f))
    }

    /// Insert middleware at the front so it runs first.
    pub fn unshift(&mut self, middleware: Middleware<T>) -> Middleware<T> {
        self.chain.insert(0, middleware.clone());
        middleware
    }

    /// Remove every occurrence of `middleware`. Returns whether anything was removed.
    pub fn remove(&mut self, middleware: &Middleware<T>) -> bool {
        let before = self.chain.len();
        self.chain.retain(|m| !m.ptr_eq(middleware));
        before != self.chain.len()
    }

    /// Run the chain from the first middleware.
    pub fn dispatch(&self, payload: T) -> T {
        Next { rest: &self.chain }.call(payload)
    }

    /// Number of middleware in the chain.
    pub fn len(&self) -> usize {
        self.chain.len()
    }

    /// Whether the chain is empty.
    pub fn is_empty(&self) -> bool {
        self.chain.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn empty_chain_returns_payload() {
        let d: Dispatcher<i32> = Dispatcher::new();
        assert_eq!(d.dispatch(7), 7);
    }

    #[test]
    fn onion_order_pre_and_post() {
        let mut d: Dispatcher<String> = Dispatcher::new();
        d.use_fn(|s, next| {
            let inner = next.call(format!("{s}a"));
            format!("{inner}A")
        });
        d.use_fn(|s, next| {
            let inner = next.call(format!("{s}b"));
            format!("{inner}B")
        });
        assert_eq!(d.dispatch(String::new()), "abBA");
    }

    #[test]
    fn unshift_runs_first_and_can_short_circuit() {
        let mut d: Dispatcher<i32> = Dispatcher::new();
        d.use_fn(|v, next| next.call(v + 1));
        d.unshift(Middleware::new(|v, _next| v * 100));
        assert_eq!(d.dispatch(2), 200);
    }

    #[test]
    fn removed_middleware_no_longer_runs() {
        let hits = Rc::new(Cell::new(0));
        let mut d: Dispatcher<i32> = Dispatcher::new();
        let counter = Rc::clone(&hits);
        let mw = d.use_fn(move |v, next| {
            counter.set(counter.get() + 1);
            next.call(v * 2)
        });
        d.use_fn(|v, next| next.call(v + 1));
        assert_eq!(d.dispatch(1), 3);
        assert!(d.remove(&mw));
        assert_eq!(d.dispatch(1), 2);
        assert_eq!(hits.get(), 1);
        assert!(!d.remove(&mw));
        assert_eq!(d.len(), 1);
    }
}
