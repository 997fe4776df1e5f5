//! Device session — owns one peripheral connection, its notification queue,
//! and the command mutex.
//!
//! The session is the only place that touches the transport payload
//! encoding: callers hand it raw protocol bytes and get raw bytes back,
//! while the port below speaks base64 strings.

use std::sync::Arc;
use std::sync::Mutex as StdMutex;
use std::sync::PoisonError;
use std::time::Duration;

use data_encoding::BASE64;
use tokio::sync::{Mutex, MutexGuard};
use tokio::task::JoinHandle;
use tokio_stream::StreamExt as _;

use stower_protocol::command::CommandFrame;
use stower_protocol::mac::MacAddr;
use stower_protocol::uuids::{self, CharacteristicAddress};

use crate::error::{SessionError, TransportError};
use crate::ports::transport::GattPeripheral;
use crate::queue::NotificationQueue;

/// A connected peripheral plus the state needed to exchange commands with it.
pub struct DeviceSession<P> {
    peripheral: P,
    queue: Arc<NotificationQueue>,
    command_lock: Mutex<()>,
    pump: StdMutex<Option<JoinHandle<()>>>,
}

/// Exclusive command exchange.
///
/// Returned by [`DeviceSession::command`] with the command mutex held, and
/// holds it until dropped. The wire protocol has no correlation IDs, so the
/// mutex is what keeps response chunks attributable to the command that
/// triggered them: read every expected chunk before letting go.
#[must_use = "dropping the exchange releases the command mutex"]
#[derive(Debug)]
pub struct CommandExchange<'a> {
    queue: &'a NotificationQueue,
    _permit: MutexGuard<'a, ()>,
}

impl CommandExchange<'_> {
    /// Next response chunk in arrival order.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::SessionClosed`] once the session is closed.
    pub async fn next_chunk(&self) -> Result<Vec<u8>, SessionError> {
        self.queue.pop().await
    }

    /// Next response chunk, bounded by `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::TransferTimeout`] on expiry and
    /// [`SessionError::SessionClosed`] once the session is closed.
    pub async fn next_chunk_timeout(&self, timeout: Duration) -> Result<Vec<u8>, SessionError> {
        self.queue.pop_timeout(timeout).await
    }
}

impl<P: GattPeripheral> DeviceSession<P> {
    /// Connect to the peripheral and wrap it in a session.
    ///
    /// # Errors
    ///
    /// Returns the transport error when connecting fails.
    pub async fn open(peripheral: P) -> Result<Self, TransportError> {
        peripheral.connect().await?;
        tracing::debug!(peripheral = %peripheral.peripheral_id(), "session opened");
        Ok(Self {
            peripheral,
            queue: Arc::new(NotificationQueue::new()),
            command_lock: Mutex::new(()),
            pump: StdMutex::new(None),
        })
    }

    /// Opaque platform identifier of the underlying peripheral.
    pub fn peripheral_id(&self) -> &str {
        self.peripheral.peripheral_id()
    }

    /// BLE address of the underlying peripheral.
    pub fn address(&self) -> MacAddr {
        self.peripheral.address()
    }

    /// Subscribe to the result characteristic and start the pump task that
    /// moves every received chunk into the notification queue.
    ///
    /// Must be called before the first [`command`](Self::command) exchange,
    /// otherwise responses are lost. The pump itself never fails: a payload
    /// that does not decode is logged and dropped, surfacing to readers as
    /// a timeout rather than an error.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Transport`] when the subscription cannot be
    /// established.
    pub async fn subscribe(&self) -> Result<(), SessionError> {
        let mut stream = self.peripheral.subscribe(&uuids::RESULT_CHAR).await?;
        let queue = Arc::clone(&self.queue);
        let peripheral_id = self.peripheral.peripheral_id().to_owned();
        let handle = tokio::spawn(async move {
            while let Some(notification) = stream.next().await {
                if notification.characteristic != uuids::RESULT_CHAR.characteristic {
                    continue;
                }
                match BASE64.decode(notification.payload.as_bytes()) {
                    Ok(chunk) => queue.push(chunk),
                    Err(err) => {
                        tracing::warn!(
                            %err,
                            peripheral = %peripheral_id,
                            "dropping undecodable response chunk"
                        );
                    }
                }
            }
        });

        let mut pump = self.pump.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = pump.replace(handle) {
            previous.abort();
        }
        Ok(())
    }

    /// Stop the pump task and the transport subscription. Chunks already
    /// queued stay readable until [`close`](Self::close).
    pub async fn unsubscribe(&self) {
        let handle = self
            .pump
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            handle.abort();
        }
        if let Err(err) = self.peripheral.unsubscribe(&uuids::RESULT_CHAR).await {
            tracing::debug!(%err, "failed to unsubscribe from result characteristic");
        }
    }

    /// Acquire the command mutex and write `frame` to the command
    /// characteristic.
    ///
    /// The returned exchange keeps the mutex held; drop it once every
    /// expected response chunk has been consumed. Waiting callers are served
    /// in arrival order.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::CommandWriteFailed`] when the transport
    /// rejects the write. The mutex is released in that case.
    pub async fn command(&self, frame: &CommandFrame) -> Result<CommandExchange<'_>, SessionError> {
        let permit = self.command_lock.lock().await;
        let payload = BASE64.encode(&frame.to_bytes());
        tracing::debug!(command = %frame, "sending command frame");
        self.peripheral
            .write(&uuids::COMMAND_CHAR, &payload)
            .await
            .map_err(SessionError::CommandWriteFailed)?;
        Ok(CommandExchange {
            queue: &self.queue,
            _permit: permit,
        })
    }

    /// Write raw bytes to a characteristic.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Transport`] when the write fails.
    pub async fn write_characteristic(
        &self,
        target: &CharacteristicAddress,
        bytes: &[u8],
    ) -> Result<(), SessionError> {
        let payload = BASE64.encode(bytes);
        self.peripheral.write(target, &payload).await?;
        Ok(())
    }

    /// Read a characteristic's current raw bytes.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Transport`] when the read fails or the
    /// transport hands back a payload that is not valid base64.
    pub async fn read_characteristic(
        &self,
        target: &CharacteristicAddress,
    ) -> Result<Vec<u8>, SessionError> {
        let payload = self.peripheral.read(target).await?;
        BASE64.decode(payload.as_bytes()).map_err(|err| {
            SessionError::Transport(TransportError::new(
                "characteristic value is not valid base64",
                err,
            ))
        })
    }

    /// Tear the session down: stop the pump, reject queued readers, and
    /// disconnect. Disconnect failures are logged, not surfaced.
    pub async fn close(&self) {
        self.unsubscribe().await;
        self.queue.close();
        if let Err(err) = self.peripheral.disconnect().await {
            tracing::warn!(
                %err,
                peripheral = %self.peripheral.peripheral_id(),
                "failed to disconnect peripheral"
            );
        }
        tracing::debug!(peripheral = %self.peripheral.peripheral_id(), "session closed");
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex as StdMutex;
    use std::time::Duration;

    use tokio::sync::mpsc;
    use tokio_stream::wrappers::UnboundedReceiverStream;

    use stower_protocol::uuids;

    use super::*;
    use crate::ports::transport::{Notification, NotificationStream};

    struct FakePeripheral {
        stream: StdMutex<Option<mpsc::UnboundedReceiver<Notification>>>,
        writes: StdMutex<Vec<(uuid::Uuid, Vec<u8>)>>,
        fail_command_write: bool,
    }

    impl FakePeripheral {
        fn new(fail_command_write: bool) -> (Self, mpsc::UnboundedSender<Notification>) {
            let (tx, rx) = mpsc::unbounded_channel();
            let fake = Self {
                stream: StdMutex::new(Some(rx)),
                writes: StdMutex::new(Vec::new()),
                fail_command_write,
            };
            (fake, tx)
        }
    }

    impl GattPeripheral for FakePeripheral {
        fn peripheral_id(&self) -> &str {
            "fake-peripheral"
        }

        fn address(&self) -> MacAddr {
            MacAddr::new([0xA4, 0xC1, 0x38, 0x5B, 0x0E, 0xDF])
        }

        async fn connect(&self) -> Result<(), TransportError> {
            Ok(())
        }

        async fn disconnect(&self) -> Result<(), TransportError> {
            Ok(())
        }

        async fn write(
            &self,
            target: &CharacteristicAddress,
            payload: &str,
        ) -> Result<(), TransportError> {
            if self.fail_command_write && *target == uuids::COMMAND_CHAR {
                return Err(TransportError::message("write rejected"));
            }
            let bytes = BASE64
                .decode(payload.as_bytes())
                .map_err(|err| TransportError::new("bad payload", err))?;
            self.writes
                .lock()
                .unwrap()
                .push((target.characteristic, bytes));
            Ok(())
        }

        async fn read(&self, _target: &CharacteristicAddress) -> Result<String, TransportError> {
            Ok(BASE64.encode(&[0x2A]))
        }

        async fn subscribe(
            &self,
            _target: &CharacteristicAddress,
        ) -> Result<NotificationStream, TransportError> {
            let rx = self
                .stream
                .lock()
                .unwrap()
                .take()
                .ok_or_else(|| TransportError::message("already subscribed"))?;
            Ok(Box::pin(UnboundedReceiverStream::new(rx)))
        }

        async fn unsubscribe(&self, _target: &CharacteristicAddress) -> Result<(), TransportError> {
            Ok(())
        }
    }

    fn result_chunk(bytes: &[u8]) -> Notification {
        Notification {
            characteristic: uuids::RESULT_CHAR.characteristic,
            payload: BASE64.encode(bytes),
        }
    }

    #[tokio::test]
    async fn should_pump_response_chunks_in_order() {
        let (fake, tx) = FakePeripheral::new(false);
        let session = DeviceSession::open(fake).await.unwrap();
        session.subscribe().await.unwrap();

        tx.send(result_chunk(b"one")).unwrap();
        tx.send(result_chunk(b"two")).unwrap();

        let exchange = session.command(&CommandFrame::List).await.unwrap();
        assert_eq!(exchange.next_chunk().await.unwrap(), b"one");
        assert_eq!(exchange.next_chunk().await.unwrap(), b"two");
    }

    #[tokio::test]
    async fn should_ignore_chunks_from_other_characteristics() {
        let (fake, tx) = FakePeripheral::new(false);
        let session = DeviceSession::open(fake).await.unwrap();
        session.subscribe().await.unwrap();

        tx.send(Notification {
            characteristic: uuids::BATTERY_DATA_CHAR.characteristic,
            payload: BASE64.encode(b"noise"),
        })
        .unwrap();
        tx.send(result_chunk(b"signal")).unwrap();

        let exchange = session.command(&CommandFrame::List).await.unwrap();
        assert_eq!(exchange.next_chunk().await.unwrap(), b"signal");
    }

    #[tokio::test]
    async fn should_drop_undecodable_chunks() {
        let (fake, tx) = FakePeripheral::new(false);
        let session = DeviceSession::open(fake).await.unwrap();
        session.subscribe().await.unwrap();

        tx.send(Notification {
            characteristic: uuids::RESULT_CHAR.characteristic,
            payload: "not base64!".to_owned(),
        })
        .unwrap();
        tx.send(result_chunk(b"good")).unwrap();

        let exchange = session.command(&CommandFrame::List).await.unwrap();
        assert_eq!(exchange.next_chunk().await.unwrap(), b"good");
    }

    #[tokio::test]
    async fn should_release_command_mutex_when_write_fails() {
        let (fake, _tx) = FakePeripheral::new(true);
        let session = DeviceSession::open(fake).await.unwrap();

        let err = session.command(&CommandFrame::List).await.unwrap_err();
        assert!(matches!(err, SessionError::CommandWriteFailed(_)));

        // A failed write must not leave the mutex held.
        let err = session.command(&CommandFrame::Format).await.unwrap_err();
        assert!(matches!(err, SessionError::CommandWriteFailed(_)));
    }

    #[tokio::test]
    async fn should_hold_command_mutex_until_exchange_is_dropped() {
        let (fake, _tx) = FakePeripheral::new(false);
        let session = DeviceSession::open(fake).await.unwrap();
        session.subscribe().await.unwrap();

        let exchange = session.command(&CommandFrame::List).await.unwrap();
        let second = tokio::time::timeout(
            Duration::from_millis(20),
            session.command(&CommandFrame::Format),
        )
        .await;
        assert!(second.is_err(), "second command should wait for the first");

        drop(exchange);
        session.command(&CommandFrame::Format).await.unwrap();
    }

    #[tokio::test]
    async fn should_reject_chunk_reads_after_close() {
        let (fake, tx) = FakePeripheral::new(false);
        let session = DeviceSession::open(fake).await.unwrap();
        session.subscribe().await.unwrap();
        tx.send(result_chunk(b"late")).unwrap();

        let exchange = session.command(&CommandFrame::List).await.unwrap();
        session.close().await;
        assert!(matches!(
            exchange.next_chunk().await,
            Err(SessionError::SessionClosed)
        ));
    }

    #[tokio::test]
    async fn should_transcode_characteristic_io() {
        let (fake, _tx) = FakePeripheral::new(false);
        let session = DeviceSession::open(fake).await.unwrap();

        session
            .write_characteristic(&uuids::ENROLLMENT_CHAR, &[1, 2, 3])
            .await
            .unwrap();
        let value = session
            .read_characteristic(&uuids::BATTERY_DATA_CHAR)
            .await
            .unwrap();
        assert_eq!(value, [0x2A]);
    }
}
