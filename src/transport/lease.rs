//! Per-request transport leases.
//!
//! The HTTP transport opens a [`TransportLease`] for every request and moves it
//! into the response body with [`LeasedStream`]. The lease is released exactly
//! once when that body is dropped: after the last byte is written, when the
//! handler fails, or when the client disconnects while the query is still
//! running.

use futures_util::Stream;
use std::fmt;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::task::{Context, Poll};
use tracing::debug;
use uuid::Uuid;

/// Identifier of the transport serving a request, stored in request extensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TransportId(pub Uuid);

impl fmt::Display for TransportId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Counts transports opened and closed by an HTTP host.
#[derive(Debug, Default)]
pub struct TransportTracker {
    opened: AtomicU64,
    closed: AtomicU64,
}

impl TransportTracker {
    /// Open a new lease.
    pub fn open(self: &Arc<Self>) -> TransportLease {
        let id = Uuid::new_v4();
        self.opened.fetch_add(1, Ordering::SeqCst);
        debug!(transport_id = %id, "Transport opened");
        TransportLease {
            id,
            tracker: Arc::clone(self),
        }
    }

    pub fn opened(&self) -> u64 {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> u64 {
        self.closed.load(Ordering::SeqCst)
    }

    /// Leases opened but not yet released.
    pub fn active(&self) -> u64 {
        self.opened().saturating_sub(self.closed())
    }
}

/// One per-request transport. Released on drop.
#[derive(Debug)]
pub struct TransportLease {
    id: Uuid,
    tracker: Arc<TransportTracker>,
}

impl TransportLease {
    pub fn id(&self) -> TransportId {
        TransportId(self.id)
    }
}

impl Drop for TransportLease {
    fn drop(&mut self) {
        self.tracker.closed.fetch_add(1, Ordering::SeqCst);
        debug!(transport_id = %self.id, "Transport closed");
    }
}

/// A stream that owns a lease until it is dropped.
pub struct LeasedStream<S> {
    inner: S,
    _lease: TransportLease,
}

impl<S> LeasedStream<S> {
    pub fn new(inner: S, lease: TransportLease) -> Self {
        Self {
            inner,
            _lease: lease,
        }
    }
}

impl<S: Stream + Unpin> Stream for LeasedStream<S> {
    type Item = S::Item;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<S::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}
