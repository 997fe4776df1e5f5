//! # stower-protocol
//!
//! Wire-level protocol for Stower solar inverters and battery nodes.
//!
//! ## Responsibilities
//! - **Authentication digests** — the MD5 scheme both device families check
//!   before unlocking their GATT surface
//! - **Command frames** — the ASCII `LS`/`GET`/`RM`/`FMT` file-transfer
//!   commands
//! - **Telemetry codecs** — fixed-offset decoders for the inverter,
//!   charge-controller, and battery records
//! - **Enrollment payload** — the 98-byte battery-list write
//! - **GATT addresses** — service and characteristic UUID constants
//!
//! ## Dependency rule
//! Pure functions over byte slices. No IO, no async, no internal crates;
//! everything here is testable without a radio.

pub mod command;
pub mod digest;
pub mod enrollment;
pub mod error;
pub mod mac;
pub mod telemetry;
pub mod uuids;
pub mod wire;

pub use error::ProtocolError;
pub use mac::MacAddr;
