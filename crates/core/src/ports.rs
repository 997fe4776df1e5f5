//! Port definitions — traits that adapters implement.
//!
//! Ports are the boundaries between the core and the outside world. They
//! live here so the session, transfer, and commissioning logic can be
//! exercised against in-memory fakes without a radio or a filesystem.

pub mod index;
pub mod transport;

pub use index::FileIndexStore;
pub use transport::{GattPeripheral, Notification, NotificationStream};
