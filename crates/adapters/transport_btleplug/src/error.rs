//! BLE adapter error types.

use stower_core::TransportError;
use stower_protocol::mac::MacAddr;

/// Errors specific to the btleplug transport adapter.
#[derive(Debug, thiserror::Error)]
pub enum BleError {
    /// No BLE adapter found on the host.
    #[error("no BLE adapter available")]
    NotAvailable,

    /// BLE scan or adapter operation failed.
    #[error("BLE scan error")]
    Scan(#[from] btleplug::Error),

    /// Connecting to a peripheral failed.
    #[error("could not connect to the peripheral")]
    Connect(#[source] btleplug::Error),

    /// A GATT read, write, or subscription failed on an open connection.
    #[error("GATT operation failed")]
    Gatt(#[source] btleplug::Error),

    /// The characteristic is missing after service discovery.
    #[error("characteristic {uuid} not found on the peripheral")]
    CharacteristicNotFound {
        /// UUID of the missing characteristic.
        uuid: uuid::Uuid,
    },

    /// No peripheral with the requested address was seen during the scan.
    #[error("no peripheral with address {address} found")]
    PeripheralNotFound {
        /// The address that was searched for.
        address: MacAddr,
    },

    /// A payload handed to the transport was not valid base64.
    #[error("payload is not valid base64")]
    PayloadEncoding(#[source] data_encoding::DecodeError),
}

impl BleError {
    /// Convert into a [`TransportError`] for propagation across the port
    /// boundary.
    #[must_use]
    pub fn into_transport(self) -> TransportError {
        match self {
            Self::NotAvailable | Self::CharacteristicNotFound { .. } => {
                TransportError::message(self.to_string())
            }
            Self::PeripheralNotFound { address } => {
                TransportError::message(format!("no peripheral with address {address} found"))
            }
            other => TransportError::new("bluetooth transport error", other),
        }
    }
}

impl From<BleError> for TransportError {
    fn from(err: BleError) -> Self {
        err.into_transport()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_display_not_available_error() {
        let err = BleError::NotAvailable;
        assert_eq!(err.to_string(), "no BLE adapter available");
    }

    #[test]
    fn should_display_scan_error() {
        let err = BleError::Scan(btleplug::Error::DeviceNotFound);
        assert_eq!(err.to_string(), "BLE scan error");
    }

    #[test]
    fn should_display_characteristic_not_found() {
        let uuid = uuid::Uuid::from_u128(0x669a_0c20_0008_d690_ec11_e214_3045_cb95);
        let err = BleError::CharacteristicNotFound { uuid };
        assert!(err.to_string().contains("669a0c20"));
    }

    #[test]
    fn should_keep_message_for_missing_peripheral() {
        let address: MacAddr = "A4:C1:38:5B:0E:DF".parse().unwrap();
        let transport: TransportError = BleError::PeripheralNotFound { address }.into();
        assert_eq!(
            transport.to_string(),
            "no peripheral with address A4:C1:38:5B:0E:DF found"
        );
    }

    #[test]
    fn should_wrap_gatt_error_as_source() {
        let transport: TransportError = BleError::Gatt(btleplug::Error::NotConnected).into();
        assert_eq!(transport.to_string(), "bluetooth transport error");
        let source = std::error::Error::source(&transport).map(ToString::to_string);
        assert_eq!(source.as_deref(), Some("GATT operation failed"));
    }
}
