//! File-transfer engine — `LS`/`GET`/`RM`/`FMT` over a device session.
//!
//! Every response arrives on the same result characteristic, so each
//! operation runs inside one [`CommandExchange`]: the command mutex spans
//! the write and the full response drain, which is what keeps chunks
//! attributable to the command that triggered them.

use std::time::Duration;

use stower_protocol::command::CommandFrame;
use stower_protocol::wire;

use crate::error::SessionError;
use crate::index::FileIndex;
use crate::ports::index::FileIndexStore;
use crate::ports::transport::GattPeripheral;
use crate::session::{CommandExchange, DeviceSession};

/// Device status word meaning a delete went through.
const DELETE_OK: u32 = 0;

/// Timeouts for transfer operations.
#[derive(Debug, Clone)]
pub struct TransferConfig {
    /// Longest wait for a single response chunk.
    pub chunk_timeout: Duration,
    /// Bound on a whole `LS` listing drain. The listing has no length
    /// header, so this is the only protection against a device that never
    /// sends the terminator.
    pub list_timeout: Duration,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            chunk_timeout: Duration::from_secs(10),
            list_timeout: Duration::from_secs(30),
        }
    }
}

/// Result of a delete request. The device refuses with a status word rather
/// than an error, so a refusal is a value, not an `Err`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// The file is gone from device storage (and from the index).
    Deleted,
    /// Non-zero device status word, passed through for reporting.
    Refused(u32),
}

/// Drives file-transfer commands against one session, keeping the local
/// file index in sync with what the device reports.
pub struct FileTransfer<'a, P, S> {
    session: &'a DeviceSession<P>,
    store: &'a S,
    config: TransferConfig,
}

impl<'a, P: GattPeripheral, S: FileIndexStore> FileTransfer<'a, P, S> {
    /// Bind the engine to a session and an index store.
    pub fn new(session: &'a DeviceSession<P>, store: &'a S, config: TransferConfig) -> Self {
        Self {
            session,
            store,
            config,
        }
    }

    /// List the files on the device.
    ///
    /// Sends `LS`, then drains name chunks until the empty-string
    /// terminator. Every discovered name is persisted to the index. Names
    /// come back in arrival order.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::TransferTimeout`] when the terminator does
    /// not arrive within the listing bound, plus the usual session and
    /// store failures.
    pub async fn list_files(&self) -> Result<Vec<String>, SessionError> {
        let exchange = self.session.command(&CommandFrame::List).await?;
        let names = tokio::time::timeout(self.config.list_timeout, drain_listing(&exchange))
            .await
            .map_err(|_| SessionError::TransferTimeout(self.config.list_timeout))??;
        drop(exchange);

        if !names.is_empty() {
            let mut index = self.store.load().await?;
            let mut changed = false;
            for name in &names {
                changed |= index.insert(name.clone());
            }
            if changed {
                self.store.save(&index).await?;
            }
        }
        tracing::info!(count = names.len(), "file listing complete");
        Ok(names)
    }

    /// Download one file and return exactly the declared number of bytes.
    ///
    /// The first response chunk is consumed whole and its first 4 bytes are
    /// the little-endian size prefix; content follows in subsequent chunks.
    /// A device that coalesced content into the prefix chunk would be
    /// miscounted — the firmware never does, and the hardware protocol
    /// offers no way to tell.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::TransferTimeout`] when any chunk misses the
    /// timeout; partial data is discarded, there is no resume.
    pub async fn download_file(&self, name: &str) -> Result<Vec<u8>, SessionError> {
        let exchange = self
            .session
            .command(&CommandFrame::Get(name.to_owned()))
            .await?;

        let prefix = exchange
            .next_chunk_timeout(self.config.chunk_timeout)
            .await?;
        // u32 always fits usize on the targets we build for.
        let declared = usize::try_from(wire::unpack_u32_le(&prefix)?).unwrap_or(usize::MAX);
        tracing::debug!(file = %name, bytes = declared, "download started");

        let mut content = Vec::with_capacity(declared.min(1 << 20));
        let mut logged_decile = 0;
        while content.len() < declared {
            let chunk = exchange
                .next_chunk_timeout(self.config.chunk_timeout)
                .await?;
            content.extend_from_slice(&chunk);

            let decile = content.len().min(declared).saturating_mul(10) / declared;
            if decile > logged_decile {
                tracing::info!(file = %name, percent = decile * 10, "download progress");
                logged_decile = decile;
            }
        }
        drop(exchange);

        // The last chunk may run past the declared size; trailing bytes are
        // transport padding, not file content.
        content.truncate(declared);
        Ok(content)
    }

    /// Delete one file.
    ///
    /// A non-zero device status is a refusal reported through
    /// [`DeleteOutcome`], not an error. On success the name is removed from
    /// the index as well.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::TransferTimeout`] when no status chunk
    /// arrives, plus the usual session and store failures.
    pub async fn delete_file(&self, name: &str) -> Result<DeleteOutcome, SessionError> {
        let exchange = self
            .session
            .command(&CommandFrame::Remove(name.to_owned()))
            .await?;
        let chunk = exchange
            .next_chunk_timeout(self.config.chunk_timeout)
            .await?;
        drop(exchange);

        let status = wire::unpack_u32_le(&chunk)?;
        if status == DELETE_OK {
            let mut index = self.store.load().await?;
            if index.remove(name) {
                self.store.save(&index).await?;
            }
            tracing::info!(file = %name, "file deleted");
            Ok(DeleteOutcome::Deleted)
        } else {
            tracing::warn!(file = %name, status, "device refused delete");
            Ok(DeleteOutcome::Refused(status))
        }
    }

    /// Format the device storage.
    ///
    /// Best-effort: the acknowledgement chunk is logged, never parsed, and
    /// a missing acknowledgement is only a warning. The local index is
    /// emptied either way; the next listing repopulates it.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::CommandWriteFailed`] when the command cannot
    /// be written and [`SessionError::SessionClosed`] after teardown.
    pub async fn format_storage(&self) -> Result<(), SessionError> {
        let exchange = self.session.command(&CommandFrame::Format).await?;
        match exchange
            .next_chunk_timeout(self.config.chunk_timeout)
            .await
        {
            Ok(chunk) => tracing::info!(result = ?chunk, "format acknowledged"),
            Err(SessionError::TransferTimeout(_)) => {
                tracing::warn!("no format acknowledgement before timeout");
            }
            Err(err) => return Err(err),
        }
        drop(exchange);

        let index = self.store.load().await?;
        if !index.is_empty() {
            self.store.save(&FileIndex::new()).await?;
            tracing::info!(forgotten = index.len(), "index cleared after format");
        }
        Ok(())
    }

    /// Names eligible for a download/delete loop: the indexed files minus
    /// the built-in reserved names and `reserved` (typically today's log,
    /// still being written).
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Index`] when the store fails.
    pub async fn transfer_candidates(&self, reserved: &[String]) -> Result<Vec<String>, SessionError> {
        Ok(self.store.load().await?.transfer_candidates(reserved))
    }
}

/// Drain `LS` response chunks until the empty-string terminator.
async fn drain_listing(exchange: &CommandExchange<'_>) -> Result<Vec<String>, SessionError> {
    let mut names = Vec::new();
    loop {
        let chunk = exchange.next_chunk().await?;
        let text = String::from_utf8_lossy(&chunk);
        let name = text.trim_end_matches('\0');
        if name.is_empty() {
            return Ok(names);
        }
        names.push(name.to_owned());
    }
}
