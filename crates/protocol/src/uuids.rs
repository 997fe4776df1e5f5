//! GATT addresses for the Stower BLE surface.
//!
//! Two device families expose two services: the inverter service carries
//! authentication, enrollment, telemetry, and file transfer; battery nodes
//! expose a single-characteristic authentication service.

/// A service/characteristic UUID pair addressing one GATT characteristic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CharacteristicAddress {
    /// Service hosting the characteristic.
    pub service: uuid::Uuid,
    /// The characteristic itself.
    pub characteristic: uuid::Uuid,
}

/// Inverter service.
pub const INVERTER_SERVICE: uuid::Uuid =
    uuid::Uuid::from_u128(0x669a_0c20_0008_d690_ec11_e214_3045_cb95);

/// Battery-node authentication service.
pub const NODE_AUTH_SERVICE: uuid::Uuid =
    uuid::Uuid::from_u128(0xffff_ffff_21b5_ec11_e214_0000_3045_2e68);

/// Inverter authentication: accepts the 24-byte digest-plus-expiry payload.
pub const INVERTER_AUTH_CHAR: CharacteristicAddress = CharacteristicAddress {
    service: INVERTER_SERVICE,
    characteristic: uuid::Uuid::from_u128(0x669a_0c20_0008_d690_ec11_e214_416c_cb95),
};

/// Battery enrollment: accepts the 98-byte enrollment payload.
pub const ENROLLMENT_CHAR: CharacteristicAddress = CharacteristicAddress {
    service: INVERTER_SERVICE,
    characteristic: uuid::Uuid::from_u128(0x669a_0c20_0008_d690_ec11_e214_426c_cb95),
};

/// Inverter telemetry read.
pub const INVERTER_STATE_CHAR: CharacteristicAddress = CharacteristicAddress {
    service: INVERTER_SERVICE,
    characteristic: uuid::Uuid::from_u128(0x669a_0c20_0008_d690_ec11_e214_406c_cb95),
};

/// Charge-controller telemetry read.
pub const CHARGE_CONTROLLER_CHAR: CharacteristicAddress = CharacteristicAddress {
    service: INVERTER_SERVICE,
    characteristic: uuid::Uuid::from_u128(0x669a_0c20_0008_d690_ec11_e214_486c_cb95),
};

/// Battery slot selector: write the slot index before reading battery data.
pub const BATTERY_SELECT_CHAR: CharacteristicAddress = CharacteristicAddress {
    service: INVERTER_SERVICE,
    characteristic: uuid::Uuid::from_u128(0x669a_0c20_0008_d690_ec11_e214_436c_cb95),
};

/// Battery telemetry read for the selected slot.
pub const BATTERY_DATA_CHAR: CharacteristicAddress = CharacteristicAddress {
    service: INVERTER_SERVICE,
    characteristic: uuid::Uuid::from_u128(0x669a_0c20_0008_d690_ec11_e214_446c_cb95),
};

/// File-transfer command characteristic (written).
pub const COMMAND_CHAR: CharacteristicAddress = CharacteristicAddress {
    service: INVERTER_SERVICE,
    characteristic: uuid::Uuid::from_u128(0x669a_0c20_0008_d690_ec11_e214_466c_cb95),
};

/// File-transfer result characteristic (notifies response chunks).
pub const RESULT_CHAR: CharacteristicAddress = CharacteristicAddress {
    service: INVERTER_SERVICE,
    characteristic: uuid::Uuid::from_u128(0x669a_0c20_0008_d690_ec11_e214_476c_cb95),
};

/// Battery-node authentication: accepts the 16-byte node digest.
pub const NODE_AUTH_CHAR: CharacteristicAddress = CharacteristicAddress {
    service: NODE_AUTH_SERVICE,
    characteristic: uuid::Uuid::from_u128(0x669a_0c20_0008_21b5_ec11_e214_416c_2e68),
};
