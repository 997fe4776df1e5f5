//! Telemetry record decoders for the three Stower data characteristics.
//!
//! Pure functions over raw `&[u8]` buffers — no BLE dependency. All layouts
//! are fixed-offset. Inverter and charge-controller records are
//! little-endian; the battery record comes from a different MCU family and
//! is **big-endian**. Firmware revisions append fields, so every decoder
//! enforces a minimum length and ignores trailing bytes.

use serde::Serialize;

use crate::error::ProtocolError;

const INVERTER_STATE_LEN: usize = 29;
const CHARGE_CONTROLLER_LEN: usize = 24;
const BATTERY_DATA_LEN: usize = 23;

/// Operating state of the inverter output stage, solar input included.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct InverterState {
    /// Load input voltage, raw device units.
    pub load_input_voltage: u16,
    /// Load input current, raw device units.
    pub load_input_current: u16,
    /// Load input power, raw device units.
    pub load_input_power: u32,
    /// Load output voltage, raw device units.
    pub load_output_voltage: u16,
    /// Load output current, raw device units.
    pub load_output_current: u16,
    /// Load output power, raw device units.
    pub load_output_power: u32,
    /// Internal device temperature, raw device units.
    pub device_temperature: u16,
    /// Heatsink temperature, raw device units.
    pub heatsink_temperature: u16,
    /// Load status word.
    pub load_status: u16,
    /// Firmware version word.
    pub version: u16,
    /// Non-zero when the inverter output stage is switched on.
    pub inverter_on: u8,
    /// Solar input voltage, raw device units.
    pub solar_voltage: u16,
    /// Solar input current, raw device units.
    pub solar_current: u16,
}

impl InverterState {
    /// Decode a little-endian inverter-state record.
    ///
    /// | Offset | Field | Type |
    /// |--------|-------|------|
    /// | 0–1 | Load input voltage | u16 LE |
    /// | 2–3 | Load input current | u16 LE |
    /// | 4–7 | Load input power | u32 LE |
    /// | 8–9 | Load output voltage | u16 LE |
    /// | 10–11 | Load output current | u16 LE |
    /// | 12–15 | Load output power | u32 LE |
    /// | 16–17 | Device temperature | u16 LE |
    /// | 18–19 | Heatsink temperature | u16 LE |
    /// | 20–21 | Load status | u16 LE |
    /// | 22–23 | Version | u16 LE |
    /// | 24 | Inverter on | u8 |
    /// | 25–26 | Solar voltage | u16 LE |
    /// | 27–28 | Solar current | u16 LE |
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::TruncatedBuffer`] when the buffer is shorter
    /// than 29 bytes.
    pub fn decode(buf: &[u8]) -> Result<Self, ProtocolError> {
        if buf.len() < INVERTER_STATE_LEN {
            return Err(ProtocolError::TruncatedBuffer {
                record: "InverterState",
                expected: INVERTER_STATE_LEN,
                actual: buf.len(),
            });
        }

        Ok(Self {
            load_input_voltage: u16::from_le_bytes([buf[0], buf[1]]),
            load_input_current: u16::from_le_bytes([buf[2], buf[3]]),
            load_input_power: u32::from_le_bytes([buf[4], buf[5], buf[6], buf[7]]),
            load_output_voltage: u16::from_le_bytes([buf[8], buf[9]]),
            load_output_current: u16::from_le_bytes([buf[10], buf[11]]),
            load_output_power: u32::from_le_bytes([buf[12], buf[13], buf[14], buf[15]]),
            device_temperature: u16::from_le_bytes([buf[16], buf[17]]),
            heatsink_temperature: u16::from_le_bytes([buf[18], buf[19]]),
            load_status: u16::from_le_bytes([buf[20], buf[21]]),
            version: u16::from_le_bytes([buf[22], buf[23]]),
            inverter_on: buf[24],
            solar_voltage: u16::from_le_bytes([buf[25], buf[26]]),
            solar_current: u16::from_le_bytes([buf[27], buf[28]]),
        })
    }
}

/// Charge-controller snapshot. Current and power fields are signed: they go
/// negative when the battery bank feeds the load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ChargeControllerState {
    /// Panel voltage, raw device units.
    pub pv_voltage: u16,
    /// Battery bank voltage, raw device units.
    pub battery_voltage: u16,
    /// Panel current, raw device units.
    pub pv_current: u16,
    /// Panel power, raw device units.
    pub pv_watt: i32,
    /// Load current, raw device units.
    pub load_current: i16,
    /// Load power, raw device units.
    pub load_watt: i32,
    /// Battery status word.
    pub battery_status: u16,
    /// Charging status word.
    pub charging_status: u16,
    /// Discharging status word.
    pub discharging_status: u16,
    /// Controller temperature, raw device units.
    pub device_temperature: i16,
}

impl ChargeControllerState {
    /// Decode a little-endian charge-controller record.
    ///
    /// | Offset | Field | Type |
    /// |--------|-------|------|
    /// | 0–1 | PV voltage | u16 LE |
    /// | 2–3 | Battery voltage | u16 LE |
    /// | 4–5 | PV current | u16 LE |
    /// | 6–9 | PV watt | i32 LE |
    /// | 10–11 | Load current | i16 LE |
    /// | 12–15 | Load watt | i32 LE |
    /// | 16–17 | Battery status | u16 LE |
    /// | 18–19 | Charging status | u16 LE |
    /// | 20–21 | Discharging status | u16 LE |
    /// | 22–23 | Device temperature | i16 LE |
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::TruncatedBuffer`] when the buffer is shorter
    /// than 24 bytes.
    pub fn decode(buf: &[u8]) -> Result<Self, ProtocolError> {
        if buf.len() < CHARGE_CONTROLLER_LEN {
            return Err(ProtocolError::TruncatedBuffer {
                record: "ChargeControllerState",
                expected: CHARGE_CONTROLLER_LEN,
                actual: buf.len(),
            });
        }

        Ok(Self {
            pv_voltage: u16::from_le_bytes([buf[0], buf[1]]),
            battery_voltage: u16::from_le_bytes([buf[2], buf[3]]),
            pv_current: u16::from_le_bytes([buf[4], buf[5]]),
            pv_watt: i32::from_le_bytes([buf[6], buf[7], buf[8], buf[9]]),
            load_current: i16::from_le_bytes([buf[10], buf[11]]),
            load_watt: i32::from_le_bytes([buf[12], buf[13], buf[14], buf[15]]),
            battery_status: u16::from_le_bytes([buf[16], buf[17]]),
            charging_status: u16::from_le_bytes([buf[18], buf[19]]),
            discharging_status: u16::from_le_bytes([buf[20], buf[21]]),
            device_temperature: i16::from_le_bytes([buf[22], buf[23]]),
        })
    }
}

/// BMS snapshot for one battery node. Current is signed: negative while
/// discharging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BatteryData {
    /// Pack voltage, raw device units.
    pub total_voltage: u16,
    /// Pack current, raw device units.
    pub current: i16,
    /// Remaining capacity, raw device units.
    pub remaining_capacity: u16,
    /// Design capacity, raw device units.
    pub total_capacity: u16,
    /// Completed charge cycles.
    pub cycle_life: u16,
    /// Manufacture date word.
    pub product_life: u16,
    /// Cell balance bits, low word.
    pub balance_status_low: u16,
    /// Cell balance bits, high word.
    pub balance_status_high: u16,
    /// Protection status word.
    pub protection_status: u16,
    /// BMS software version.
    pub version: u8,
    /// Relative state of charge, percent.
    pub rsoc: u8,
    /// Charge/discharge FET status bits.
    pub fet_status: u8,
    /// Number of cells in series.
    pub cells_in_series: u8,
    /// Number of NTC temperature probes.
    pub ntc_count: u8,
}

impl BatteryData {
    /// Decode a **big-endian** battery record.
    ///
    /// | Offset | Field | Type |
    /// |--------|-------|------|
    /// | 0–1 | Total voltage | u16 BE |
    /// | 2–3 | Current | i16 BE |
    /// | 4–5 | Remaining capacity | u16 BE |
    /// | 6–7 | Total capacity | u16 BE |
    /// | 8–9 | Cycle life | u16 BE |
    /// | 10–11 | Product life | u16 BE |
    /// | 12–13 | Balance status low | u16 BE |
    /// | 14–15 | Balance status high | u16 BE |
    /// | 16–17 | Protection status | u16 BE |
    /// | 18 | Version | u8 |
    /// | 19 | RSOC | u8, % |
    /// | 20 | FET status | u8 |
    /// | 21 | Cells in series | u8 |
    /// | 22 | NTC count | u8 |
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::TruncatedBuffer`] when the buffer is shorter
    /// than 23 bytes.
    pub fn decode(buf: &[u8]) -> Result<Self, ProtocolError> {
        if buf.len() < BATTERY_DATA_LEN {
            return Err(ProtocolError::TruncatedBuffer {
                record: "BatteryData",
                expected: BATTERY_DATA_LEN,
                actual: buf.len(),
            });
        }

        Ok(Self {
            total_voltage: u16::from_be_bytes([buf[0], buf[1]]),
            current: i16::from_be_bytes([buf[2], buf[3]]),
            remaining_capacity: u16::from_be_bytes([buf[4], buf[5]]),
            total_capacity: u16::from_be_bytes([buf[6], buf[7]]),
            cycle_life: u16::from_be_bytes([buf[8], buf[9]]),
            product_life: u16::from_be_bytes([buf[10], buf[11]]),
            balance_status_low: u16::from_be_bytes([buf[12], buf[13]]),
            balance_status_high: u16::from_be_bytes([buf[14], buf[15]]),
            protection_status: u16::from_be_bytes([buf[16], buf[17]]),
            version: buf[18],
            rsoc: buf[19],
            fet_status: buf[20],
            cells_in_series: buf[21],
            ntc_count: buf[22],
        })
    }
}
