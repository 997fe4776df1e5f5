//! # stower-adapter-btleplug
//!
//! BLE transport adapter — reaches Stower inverters and battery nodes
//! through the host Bluetooth stack via btleplug.
//!
//! ## How it works
//!
//! [`scanner`] discovers peripherals by advertised name or service UUID.
//! [`BlePeripheral`] wraps a platform peripheral and implements the core
//! transport port: payloads cross the port as base64 strings and are
//! transcoded to raw GATT bytes here, at the last possible moment.
//!
//! ## Dependency rule
//!
//! Depends on `stower-core` (the port) and `stower-protocol` (addresses and
//! characteristic UUIDs). Nothing in this crate decodes telemetry or builds
//! command frames.

mod error;
pub mod scanner;

pub use error::BleError;

use btleplug::api::{Characteristic, Peripheral as _, WriteType};
use btleplug::platform::Peripheral;
use data_encoding::BASE64;
use tokio_stream::StreamExt as _;

use stower_core::TransportError;
use stower_core::ports::transport::{GattPeripheral, Notification, NotificationStream};
use stower_protocol::mac::MacAddr;
use stower_protocol::uuids::CharacteristicAddress;

/// A Stower peripheral reachable over the host BLE stack.
///
/// The identity accessors work before [`connect`](GattPeripheral::connect);
/// everything else requires an established connection with discovered
/// services.
pub struct BlePeripheral {
    peripheral: Peripheral,
    id: String,
    address: MacAddr,
}

impl BlePeripheral {
    /// Wrap a platform peripheral.
    #[must_use]
    pub fn new(peripheral: Peripheral) -> Self {
        let id = peripheral.id().to_string();
        let address = MacAddr::new(peripheral.address().into_inner());
        Self {
            peripheral,
            id,
            address,
        }
    }

    /// Find a GATT characteristic on a peripheral that has already
    /// discovered its services.
    fn find_characteristic(
        &self,
        target: &CharacteristicAddress,
    ) -> Result<Characteristic, BleError> {
        self.peripheral
            .characteristics()
            .into_iter()
            .find(|c| c.service_uuid == target.service && c.uuid == target.characteristic)
            .ok_or(BleError::CharacteristicNotFound {
                uuid: target.characteristic,
            })
    }
}

impl GattPeripheral for BlePeripheral {
    fn peripheral_id(&self) -> &str {
        &self.id
    }

    fn address(&self) -> MacAddr {
        self.address
    }

    async fn connect(&self) -> Result<(), TransportError> {
        self.peripheral.connect().await.map_err(BleError::Connect)?;
        self.peripheral
            .discover_services()
            .await
            .map_err(BleError::Gatt)?;
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), TransportError> {
        self.peripheral.disconnect().await.map_err(BleError::Gatt)?;
        Ok(())
    }

    async fn write(
        &self,
        target: &CharacteristicAddress,
        payload: &str,
    ) -> Result<(), TransportError> {
        let bytes = BASE64
            .decode(payload.as_bytes())
            .map_err(BleError::PayloadEncoding)?;
        let characteristic = self.find_characteristic(target)?;
        self.peripheral
            .write(&characteristic, &bytes, WriteType::WithResponse)
            .await
            .map_err(BleError::Gatt)?;
        Ok(())
    }

    async fn read(&self, target: &CharacteristicAddress) -> Result<String, TransportError> {
        let characteristic = self.find_characteristic(target)?;
        let value = self
            .peripheral
            .read(&characteristic)
            .await
            .map_err(BleError::Gatt)?;
        Ok(BASE64.encode(&value))
    }

    async fn subscribe(
        &self,
        target: &CharacteristicAddress,
    ) -> Result<NotificationStream, TransportError> {
        let characteristic = self.find_characteristic(target)?;
        self.peripheral
            .subscribe(&characteristic)
            .await
            .map_err(BleError::Gatt)?;

        // The platform stream carries every subscribed characteristic; the
        // session filters by UUID.
        let notifications = self
            .peripheral
            .notifications()
            .await
            .map_err(BleError::Gatt)?;
        let stream = notifications.map(|event| Notification {
            characteristic: event.uuid,
            payload: BASE64.encode(&event.value),
        });
        Ok(Box::pin(stream))
    }

    async fn unsubscribe(&self, target: &CharacteristicAddress) -> Result<(), TransportError> {
        let characteristic = self.find_characteristic(target)?;
        self.peripheral
            .unsubscribe(&characteristic)
            .await
            .map_err(BleError::Gatt)?;
        Ok(())
    }
}
