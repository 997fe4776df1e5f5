//! Transport port — the GATT surface the core drives.
//!
//! Payloads cross this boundary in the platform payload encoding (base64
//! strings), matching what the underlying BLE stacks hand over. Decoding to
//! raw protocol bytes happens in the device session, so adapters stay a
//! thin transcoding shim.

use std::future::Future;
use std::pin::Pin;

use tokio_stream::Stream;

use stower_protocol::mac::MacAddr;
use stower_protocol::uuids::CharacteristicAddress;

use crate::error::TransportError;

/// One value-changed event delivered by a subscription.
#[derive(Debug, Clone)]
pub struct Notification {
    /// UUID of the characteristic that produced the value.
    pub characteristic: uuid::Uuid,
    /// The value in the transport payload encoding (base64).
    pub payload: String,
}

/// Stream of notifications from one peripheral.
pub type NotificationStream = Pin<Box<dyn Stream<Item = Notification> + Send>>;

/// A connectable BLE peripheral.
///
/// Implementations are expected to be cheap to clone their identity from:
/// [`peripheral_id`](Self::peripheral_id) and [`address`](Self::address)
/// must work before [`connect`](Self::connect) is called.
pub trait GattPeripheral: Send + Sync {
    /// Opaque platform identifier, used for correlation in logs.
    fn peripheral_id(&self) -> &str;

    /// The peripheral's BLE address.
    fn address(&self) -> MacAddr;

    /// Establish the connection and resolve the GATT services.
    fn connect(&self) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Tear the connection down.
    fn disconnect(&self) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Write a payload to a characteristic, waiting for the write response.
    fn write(
        &self,
        target: &CharacteristicAddress,
        payload: &str,
    ) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Read a characteristic's current value.
    fn read(
        &self,
        target: &CharacteristicAddress,
    ) -> impl Future<Output = Result<String, TransportError>> + Send;

    /// Subscribe to value-changed notifications for a characteristic.
    ///
    /// The stream may interleave notifications from other subscribed
    /// characteristics; consumers filter by [`Notification::characteristic`].
    fn subscribe(
        &self,
        target: &CharacteristicAddress,
    ) -> impl Future<Output = Result<NotificationStream, TransportError>> + Send;

    /// Stop notifications for a characteristic.
    fn unsubscribe(
        &self,
        target: &CharacteristicAddress,
    ) -> impl Future<Output = Result<(), TransportError>> + Send;
}
