//! # stower-core
//!
//! Protocol engines for Stower devices — everything between the wire codecs
//! and the BLE radio.
//!
//! ## Responsibilities
//! - Define **port traits** that adapters implement:
//!   - `GattPeripheral` — connect/write/read/subscribe against one device
//!   - `FileIndexStore` — persistence for discovered filenames
//! - Provide the **device session**: one connection, its notification
//!   queue, and the command mutex
//! - Drive the **file-transfer engine** (`LS`/`GET`/`RM`/`FMT`)
//! - Sequence the **commissioning flow**: authenticate, enroll, first
//!   telemetry readout
//!
//! ## Dependency rule
//! Depends on `stower-protocol` plus `tokio` for sync/time. Never imports
//! btleplug or any other adapter crate; adapters depend on *this* crate,
//! not the reverse.

pub mod commission;
pub mod error;
pub mod index;
pub mod ports;
pub mod queue;
pub mod session;
pub mod transfer;

pub use commission::{CommissionReport, Commissioner};
pub use error::{CommissionError, SessionError, StoreError, TransportError};
pub use index::FileIndex;
pub use queue::NotificationQueue;
pub use session::{CommandExchange, DeviceSession};
pub use transfer::{DeleteOutcome, FileTransfer, TransferConfig};
