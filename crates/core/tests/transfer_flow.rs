//! Full transfer flows against a scripted in-memory peripheral: the
//! list/download/delete cycle with index persistence, and the
//! command-mutex serialization guarantee.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use data_encoding::BASE64;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

use stower_core::FileIndex;
use stower_core::error::{StoreError, TransportError};
use stower_core::ports::index::FileIndexStore;
use stower_core::ports::transport::{GattPeripheral, Notification, NotificationStream};
use stower_core::session::DeviceSession;
use stower_core::transfer::{DeleteOutcome, FileTransfer, TransferConfig};
use stower_protocol::command::CommandFrame;
use stower_protocol::mac::MacAddr;
use stower_protocol::uuids::{self, CharacteristicAddress};
use stower_protocol::wire;

/// Answers command writes with scripted response chunks and keeps an event
/// log for ordering assertions.
struct ScriptedPeripheral {
    responses: StdMutex<HashMap<String, Vec<Vec<u8>>>>,
    stream: StdMutex<Option<mpsc::UnboundedReceiver<Notification>>>,
    notify: mpsc::UnboundedSender<Notification>,
    events: Arc<StdMutex<Vec<String>>>,
}

impl ScriptedPeripheral {
    fn new(responses: impl IntoIterator<Item = (&'static str, Vec<Vec<u8>>)>) -> Self {
        let (notify, rx) = mpsc::unbounded_channel();
        Self {
            responses: StdMutex::new(
                responses
                    .into_iter()
                    .map(|(cmd, chunks)| (cmd.to_owned(), chunks))
                    .collect(),
            ),
            stream: StdMutex::new(Some(rx)),
            notify,
            events: Arc::new(StdMutex::new(Vec::new())),
        }
    }

    fn events_handle(&self) -> Arc<StdMutex<Vec<String>>> {
        Arc::clone(&self.events)
    }
}

impl GattPeripheral for ScriptedPeripheral {
    fn peripheral_id(&self) -> &str {
        "scripted"
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
        if target.characteristic != uuids::COMMAND_CHAR.characteristic {
            return Ok(());
        }
        let bytes = BASE64
            .decode(payload.as_bytes())
            .map_err(|err| TransportError::new("bad payload", err))?;
        let command = String::from_utf8_lossy(&bytes).into_owned();
        self.events.lock().unwrap().push(format!("write {command}"));

        let chunks = self.responses.lock().unwrap().remove(&command);
        for chunk in chunks.into_iter().flatten() {
            let _ = self.notify.send(Notification {
                characteristic: uuids::RESULT_CHAR.characteristic,
                payload: BASE64.encode(&chunk),
            });
        }
        Ok(())
    }

    async fn read(&self, _target: &CharacteristicAddress) -> Result<String, TransportError> {
        Err(TransportError::message("not scripted"))
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

#[derive(Default)]
struct MemoryStore {
    index: StdMutex<FileIndex>,
}

impl FileIndexStore for MemoryStore {
    async fn load(&self) -> Result<FileIndex, StoreError> {
        Ok(self.index.lock().unwrap().clone())
    }

    async fn save(&self, index: &FileIndex) -> Result<(), StoreError> {
        *self.index.lock().unwrap() = index.clone();
        Ok(())
    }
}

async fn open_session(peripheral: ScriptedPeripheral) -> DeviceSession<ScriptedPeripheral> {
    let session = DeviceSession::open(peripheral).await.unwrap();
    session.subscribe().await.unwrap();
    session
}

#[tokio::test]
async fn should_run_the_full_pull_cycle() {
    let peripheral = ScriptedPeripheral::new([
        (
            "LS",
            vec![
                b"2026-08-24.log".to_vec(),
                b"config.json".to_vec(),
                Vec::new(),
            ],
        ),
        (
            "GET 2026-08-24.log",
            vec![
                wire::pack_u32_le(10).to_vec(),
                b"abcdef".to_vec(),
                b"ghij".to_vec(),
            ],
        ),
        ("RM 2026-08-24.log", vec![wire::pack_u32_le(0).to_vec()]),
    ]);
    let session = open_session(peripheral).await;
    let store = MemoryStore::default();
    let transfer = FileTransfer::new(&session, &store, TransferConfig::default());

    // Discover.
    let names = transfer.list_files().await.unwrap();
    assert_eq!(names, ["2026-08-24.log", "config.json"]);

    // Only the log is a candidate; config.json is reserved.
    let candidates = transfer.transfer_candidates(&[]).await.unwrap();
    assert_eq!(candidates, ["2026-08-24.log"]);

    // Pull and delete.
    let content = transfer.download_file("2026-08-24.log").await.unwrap();
    assert_eq!(content, b"abcdefghij");
    let outcome = transfer.delete_file("2026-08-24.log").await.unwrap();
    assert_eq!(outcome, DeleteOutcome::Deleted);

    // The index reflects the delete but keeps the reserved file.
    let index = store.load().await.unwrap();
    assert!(!index.contains("2026-08-24.log"));
    assert!(index.contains("config.json"));

    session.close().await;
}

#[tokio::test]
async fn should_serialize_concurrent_commands_without_interleaving() {
    let peripheral = ScriptedPeripheral::new([
        ("LS", vec![b"a.log".to_vec(), Vec::new()]),
        ("FMT", vec![wire::pack_u32_le(0).to_vec()]),
    ]);
    let events = peripheral.events_handle();
    let session = Arc::new(open_session(peripheral).await);

    let lister = {
        let session = Arc::clone(&session);
        let events = Arc::clone(&events);
        tokio::spawn(async move {
            let exchange = session.command(&CommandFrame::List).await.unwrap();
            assert_eq!(exchange.next_chunk().await.unwrap(), b"a.log");
            // Stay inside the response cycle long enough for the second
            // caller to attempt its write.
            tokio::time::sleep(Duration::from_millis(50)).await;
            assert_eq!(exchange.next_chunk().await.unwrap(), b"");
            events.lock().unwrap().push("list cycle complete".to_owned());
        })
    };

    // Spawn the second caller only once the first write is on the wire, so
    // the mutex is already held.
    while events.lock().unwrap().is_empty() {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }

    let formatter = {
        let session = Arc::clone(&session);
        tokio::spawn(async move {
            let exchange = session.command(&CommandFrame::Format).await.unwrap();
            exchange.next_chunk().await.unwrap();
        })
    };

    lister.await.unwrap();
    formatter.await.unwrap();

    let events = events.lock().unwrap();
    assert_eq!(
        *events,
        [
            "write LS".to_owned(),
            "list cycle complete".to_owned(),
            "write FMT".to_owned(),
        ]
    );
}

#[tokio::test]
async fn should_reject_transfer_calls_after_close() {
    let peripheral = ScriptedPeripheral::new([("LS", vec![b"a.log".to_vec(), Vec::new()])]);
    let session = open_session(peripheral).await;
    let store = MemoryStore::default();
    let transfer = FileTransfer::new(&session, &store, TransferConfig::default());

    session.close().await;

    // The command write still goes through the fake, but no chunk can ever
    // arrive once the queue is closed.
    let err = transfer.list_files().await.unwrap_err();
    assert!(matches!(
        err,
        stower_core::error::SessionError::SessionClosed
    ));
}
