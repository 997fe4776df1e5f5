//! Ordered notification queue — the bridge between push-based transport
//! notifications and awaitable protocol reads.
//!
//! The BLE stack delivers response chunks through a callback-style stream
//! while the protocol logic wants sequential reads. The queue preserves
//! arrival order, and concurrent readers resolve in call order because the
//! receiver sits behind a fair async mutex.

use std::sync::Mutex as StdMutex;
use std::sync::PoisonError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::sync::mpsc;

use crate::error::SessionError;

/// FIFO queue of raw response chunks for one device session.
#[derive(Debug)]
pub struct NotificationQueue {
    tx: StdMutex<Option<mpsc::UnboundedSender<Vec<u8>>>>,
    rx: Mutex<mpsc::UnboundedReceiver<Vec<u8>>>,
    closed: AtomicBool,
}

impl NotificationQueue {
    /// An open, empty queue.
    #[must_use]
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx: StdMutex::new(Some(tx)),
            rx: Mutex::new(rx),
            closed: AtomicBool::new(false),
        }
    }

    /// Append a chunk. Never blocks; a push after [`close`](Self::close) is
    /// silently dropped.
    pub fn push(&self, chunk: Vec<u8>) {
        let tx = self.tx.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(tx) = tx.as_ref() {
            // Send only fails when the receiver side is gone, i.e. closed.
            let _ = tx.send(chunk);
        }
    }

    /// Wait for the next chunk in arrival order.
    ///
    /// Concurrent callers are served first-come-first-served: the receiver
    /// mutex is fair, so each arriving chunk resolves the longest-waiting
    /// caller.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::SessionClosed`] once the queue is closed.
    pub async fn pop(&self) -> Result<Vec<u8>, SessionError> {
        let mut rx = self.rx.lock().await;
        // Chunks buffered at close time are discarded, not delivered.
        if self.closed.load(Ordering::Acquire) {
            return Err(SessionError::SessionClosed);
        }
        rx.recv().await.ok_or(SessionError::SessionClosed)
    }

    /// Wait for the next chunk, bounded by `timeout`.
    ///
    /// On expiry the wait is abandoned entirely: a chunk arriving later goes
    /// to the next caller, never to the timed-out one (`recv` is
    /// cancel-safe, so no chunk is lost either).
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::TransferTimeout`] on expiry and
    /// [`SessionError::SessionClosed`] once the queue is closed.
    pub async fn pop_timeout(&self, timeout: Duration) -> Result<Vec<u8>, SessionError> {
        match tokio::time::timeout(timeout, self.pop()).await {
            Ok(result) => result,
            Err(_) => Err(SessionError::TransferTimeout(timeout)),
        }
    }

    /// Close the queue: pending and future [`pop`](Self::pop) calls resolve
    /// with [`SessionError::SessionClosed`] and later pushes are dropped.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
        // Dropping the sender wakes a parked `recv` with `None`.
        self.tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }
}

impl Default for NotificationQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;
    use crate::error::SessionError;

    // ── Ordering ────────────────────────────────────────────────────────

    #[tokio::test]
    async fn should_deliver_chunks_in_arrival_order() {
        let queue = NotificationQueue::new();
        queue.push(vec![1]);
        queue.push(vec![2]);
        queue.push(vec![3]);

        assert_eq!(queue.pop().await.unwrap(), vec![1]);
        assert_eq!(queue.pop().await.unwrap(), vec![2]);
        assert_eq!(queue.pop().await.unwrap(), vec![3]);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn should_serve_waiters_first_come_first_served() {
        let queue = Arc::new(NotificationQueue::new());

        // Park three readers in a known order before any chunk arrives.
        let mut readers = Vec::new();
        for _ in 0..3 {
            let queue = Arc::clone(&queue);
            readers.push(tokio::spawn(async move { queue.pop().await.unwrap() }));
            tokio::task::yield_now().await;
        }

        queue.push(vec![1]);
        queue.push(vec![2]);
        queue.push(vec![3]);

        let mut seen = Vec::new();
        for reader in readers {
            seen.push(reader.await.unwrap());
        }
        assert_eq!(seen, [vec![1], vec![2], vec![3]]);
    }

    // ── Timeouts ────────────────────────────────────────────────────────

    #[tokio::test]
    async fn should_time_out_when_no_chunk_arrives() {
        let queue = NotificationQueue::new();
        let err = queue.pop_timeout(Duration::from_millis(20)).await.unwrap_err();
        assert!(matches!(err, SessionError::TransferTimeout(_)));
    }

    #[tokio::test]
    async fn should_hand_late_chunk_to_next_reader_not_the_timed_out_one() {
        let queue = NotificationQueue::new();

        let err = queue.pop_timeout(Duration::from_millis(20)).await.unwrap_err();
        assert!(matches!(err, SessionError::TransferTimeout(_)));

        // The chunk that missed the deadline is still queued for the next read.
        queue.push(vec![42]);
        assert_eq!(queue.pop().await.unwrap(), vec![42]);
    }

    #[tokio::test]
    async fn should_resolve_within_timeout_when_chunk_is_ready() {
        let queue = NotificationQueue::new();
        queue.push(vec![7]);
        let chunk = queue.pop_timeout(Duration::from_secs(5)).await.unwrap();
        assert_eq!(chunk, vec![7]);
    }

    // ── Close ───────────────────────────────────────────────────────────

    #[tokio::test(flavor = "current_thread")]
    async fn should_reject_parked_reader_on_close() {
        let queue = Arc::new(NotificationQueue::new());

        let reader = {
            let queue = Arc::clone(&queue);
            tokio::spawn(async move { queue.pop().await })
        };
        tokio::task::yield_now().await;

        queue.close();
        let result = reader.await.unwrap();
        assert!(matches!(result, Err(SessionError::SessionClosed)));
    }

    #[tokio::test]
    async fn should_reject_pop_after_close() {
        let queue = NotificationQueue::new();
        queue.close();
        assert!(matches!(
            queue.pop().await,
            Err(SessionError::SessionClosed)
        ));
    }

    #[tokio::test]
    async fn should_discard_buffered_chunks_on_close() {
        let queue = NotificationQueue::new();
        queue.push(vec![1]);
        queue.close();
        assert!(matches!(
            queue.pop().await,
            Err(SessionError::SessionClosed)
        ));
    }

    #[tokio::test]
    async fn should_drop_push_after_close() {
        let queue = NotificationQueue::new();
        queue.close();
        queue.push(vec![1]);
        assert!(matches!(
            queue.pop().await,
            Err(SessionError::SessionClosed)
        ));
    }
}
