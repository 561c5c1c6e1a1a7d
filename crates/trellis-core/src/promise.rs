// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Single-threaded settlement promises.
//!
//! A [`Promise`] is a oneshot receiver behind a [`Shared`] future, so every
//! clone observes the same value. The graph hands these out for node and
//! ledger settlement; the [`Resolver`] holds the sending half.
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures_channel::oneshot;
use futures_util::future::{self, FutureExt, LocalBoxFuture, Shared};

/// Clonable handle to a value that becomes available later.
pub struct Promise<T> {
    inner: Shared<LocalBoxFuture<'static, T>>,
}

/// Write side of a [`Promise`].
pub struct Resolver<T> {
    sender: oneshot::Sender<T>,
}

impl<T: Clone + 'static> Clone for Promise<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: Clone + 'static> fmt::Debug for Promise<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Promise")
            .field("resolved", &self.is_resolved())
            .finish()
    }
}

impl<T> fmt::Debug for Resolver<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolver")
            .field("canceled", &self.sender.is_canceled())
            .finish()
    }
}

impl<T: Clone + 'static> Promise<T> {
    /// A pending promise and the resolver that completes it.
    ///
    /// Dropping the resolver without resolving leaves the promise pending.
    pub fn pending() -> (Self, Resolver<T>) {
        let (sender, receiver) = oneshot::channel();
        let inner = receiver
            .then(|outcome| match outcome {
                Ok(value) => future::ready(value).left_future(),
                Err(oneshot::Canceled) => future::pending().right_future(),
            })
            .boxed_local()
            .shared();
        (Self { inner }, Resolver { sender })
    }

    /// A promise that is already complete.
    pub fn resolved(value: T) -> Self {
        Self {
            inner: future::ready(value).boxed_local().shared(),
        }
    }

    /// The resolved value, if any.
    pub fn peek(&self) -> Option<T> {
        // Poll a clone so this handle stays usable after completion.
        self.inner.clone().now_or_never()
    }

    /// Whether the value is available.
    pub fn is_resolved(&self) -> bool {
        self.peek().is_some()
    }

    /// Whether both handles observe the same underlying promise.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        self.inner.ptr_eq(&other.inner)
    }
}

impl<T> Resolver<T> {
    /// Complete the promise and wake every pending poller.
    pub fn resolve(self, value: T) {
        // Every promise handle may already be gone; nothing to deliver then.
        let _ = self.sender.send(value);
    }
}

impl<T: Clone + 'static> Future for Promise<T> {
    type Output = T;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<T> {
        self.inner.poll_unpin(cx)
    }
}
