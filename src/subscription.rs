//! Live query subscriptions.
//!
//! A `Subscription<T>` owns exactly one backend listener. It yields the
//! whole decoded result set every time it changes. Three terminal states:
//!
//! - cancelled by the owner (`cancel()` or drop),
//! - failed (backend error event or undecodable document), delivered once
//!   as `Err(Error::Subscription)`,
//! - closed by the backend (channel hung up).
//!
//! After any of them, no further values are produced and the backend
//! listener has been released exactly once. Nothing resubscribes
//! automatically; call `watch` again to recover.

use std::future::poll_fn;
use std::marker::PhantomData;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::sync::mpsc;
use tokio_stream::Stream;

use crate::codec::TemporalCodec;
use crate::model::{Document, FromDocument, WireDocument};
use crate::storage::{ListenEvent, ListenerId};
use crate::{Error, Result};

type Release = Box<dyn FnOnce() + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionState {
    Active,
    Cancelled,
    Failed,
    Closed,
}

pub struct Subscription<T> {
    collection: String,
    listener: ListenerId,
    events: mpsc::UnboundedReceiver<ListenEvent>,
    release: Option<Release>,
    state: SubscriptionState,
    _marker: PhantomData<fn() -> T>,
}

impl<T> std::fmt::Debug for Subscription<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("collection", &self.collection)
            .field("listener", &self.listener)
            .field("state", &self.state)
            .finish()
    }
}

impl<T: FromDocument> Subscription<T> {
    pub(crate) fn new(
        collection: impl Into<String>,
        listener: ListenerId,
        events: mpsc::UnboundedReceiver<ListenEvent>,
        release: Release,
    ) -> Self {
        Self {
            collection: collection.into(),
            listener,
            events,
            release: Some(release),
            state: SubscriptionState::Active,
            _marker: PhantomData,
        }
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn state(&self) -> SubscriptionState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == SubscriptionState::Active
    }

    /// Wait for the next full result set.
    ///
    /// `None` once the subscription is in a terminal state.
    pub async fn next(&mut self) -> Option<Result<Vec<T>>> {
        poll_fn(|cx| self.poll_snapshot(cx)).await
    }

    /// Stop listening and release the backend listener. Idempotent.
    pub fn cancel(&mut self) {
        if self.state == SubscriptionState::Active {
            self.state = SubscriptionState::Cancelled;
            tracing::debug!(collection = %self.collection, listener = %self.listener, "subscription cancelled");
        }
        self.finish();
    }

    fn finish(&mut self) {
        self.events.close();
        if let Some(release) = self.release.take() {
            release();
        }
    }

    fn fail(&mut self, message: String) -> Poll<Option<Result<Vec<T>>>> {
        tracing::error!(collection = %self.collection, listener = %self.listener, error = %message, "subscription terminated");
        self.state = SubscriptionState::Failed;
        self.finish();
        Poll::Ready(Some(Err(Error::Subscription(message))))
    }

    fn poll_snapshot(&mut self, cx: &mut Context<'_>) -> Poll<Option<Result<Vec<T>>>> {
        if self.state != SubscriptionState::Active {
            return Poll::Ready(None);
        }
        match self.events.poll_recv(cx) {
            Poll::Pending => Poll::Pending,
            Poll::Ready(None) => {
                tracing::debug!(collection = %self.collection, listener = %self.listener, "backend closed subscription");
                self.state = SubscriptionState::Closed;
                self.finish();
                Poll::Ready(None)
            }
            Poll::Ready(Some(ListenEvent::Error(message))) => self.fail(message),
            Poll::Ready(Some(ListenEvent::Snapshot(docs))) => match decode_all::<T>(docs) {
                Ok(items) => Poll::Ready(Some(Ok(items))),
                Err(e) => self.fail(format!("undecodable document in `{}`: {e}", self.collection)),
            },
        }
    }
}

fn decode_all<T: FromDocument>(docs: Vec<WireDocument>) -> Result<Vec<T>> {
    docs.into_iter()
        .map(|d| {
            let fields = TemporalCodec::decode_fields(&d.fields)?;
            T::from_document(Document { id: Some(d.id), fields })
        })
        .collect()
}

impl<T: FromDocument> Stream for Subscription<T> {
    type Item = Result<Vec<T>>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().poll_snapshot(cx)
    }
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}
