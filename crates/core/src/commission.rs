//! Commissioning orchestrator — connect, authenticate, enroll batteries,
//! read the first telemetry snapshot.

use chrono::Utc;
use serde::Serialize;

use stower_protocol::digest;
use stower_protocol::enrollment;
use stower_protocol::mac::MacAddr;
use stower_protocol::telemetry::{BatteryData, ChargeControllerState, InverterState};
use stower_protocol::uuids;

use crate::error::{CommissionError, SessionError};
use crate::ports::transport::GattPeripheral;
use crate::session::DeviceSession;

/// Telemetry snapshot taken at the end of a successful commissioning run,
/// one battery entry per enrolled node in enrollment order.
#[derive(Debug, Clone, Serialize)]
pub struct CommissionReport {
    /// Inverter output-stage state.
    pub inverter: InverterState,
    /// Charge-controller state.
    pub charge_controller: ChargeControllerState,
    /// Per-battery BMS snapshots, in enrollment order.
    pub batteries: Vec<BatteryData>,
}

/// Sequences the commissioning flow against inverter and node peripherals.
#[derive(Debug, Clone, Copy)]
pub struct Commissioner {
    log_interval: u8,
}

impl Commissioner {
    /// `log_interval` is the telemetry logging interval written during
    /// enrollment, in minutes.
    #[must_use]
    pub fn new(log_interval: u8) -> Self {
        Self { log_interval }
    }

    /// Run the full commissioning sequence against an inverter:
    ///
    /// 1. connect
    /// 2. write the digest-plus-expiry authentication payload
    /// 3. write the battery enrollment payload
    /// 4. read inverter, charge-controller, and per-battery telemetry
    ///
    /// The session is always closed before returning, success or not.
    /// There is no retry; callers decide whether to run the flow again.
    ///
    /// # Errors
    ///
    /// Returns [`CommissionError::ConnectionFailed`] when the connection
    /// cannot be established and [`CommissionError::AuthenticationFailed`]
    /// for any failure after that, with the cause attached.
    pub async fn commission<P: GattPeripheral>(
        &self,
        peripheral: P,
        batteries: &[MacAddr],
    ) -> Result<CommissionReport, CommissionError> {
        let address = peripheral.address();
        let session = DeviceSession::open(peripheral)
            .await
            .map_err(CommissionError::ConnectionFailed)?;
        tracing::info!(inverter = %address, batteries = batteries.len(), "commissioning started");

        let result = self.run_authenticated(&session, address, batteries).await;
        session.close().await;

        match &result {
            Ok(_) => tracing::info!(inverter = %address, "commissioning complete"),
            Err(err) => tracing::warn!(inverter = %address, %err, "commissioning failed"),
        }
        result.map_err(CommissionError::AuthenticationFailed)
    }

    /// Steps 2 through 4, split out so the caller always closes the session.
    async fn run_authenticated<P: GattPeripheral>(
        &self,
        session: &DeviceSession<P>,
        address: MacAddr,
        batteries: &[MacAddr],
    ) -> Result<CommissionReport, SessionError> {
        let expiry_ms = current_epoch_ms();
        let auth = digest::inverter_auth_payload(address, expiry_ms);
        session
            .write_characteristic(&uuids::INVERTER_AUTH_CHAR, &auth)
            .await?;
        tracing::debug!(inverter = %address, expiry_ms, "authentication payload accepted");

        let payload = enrollment::build_enrollment_payload(batteries, self.log_interval)?;
        session
            .write_characteristic(&uuids::ENROLLMENT_CHAR, &payload)
            .await?;
        tracing::debug!(count = batteries.len(), "battery enrollment written");

        let inverter = InverterState::decode(
            &session
                .read_characteristic(&uuids::INVERTER_STATE_CHAR)
                .await?,
        )?;
        let charge_controller = ChargeControllerState::decode(
            &session
                .read_characteristic(&uuids::CHARGE_CONTROLLER_CHAR)
                .await?,
        )?;

        let mut snapshots = Vec::with_capacity(batteries.len());
        for (slot, battery) in (0u8..).zip(batteries.iter()) {
            // The inverter multiplexes all batteries through one data
            // characteristic; the slot write selects which one answers.
            session
                .write_characteristic(&uuids::BATTERY_SELECT_CHAR, &[slot])
                .await?;
            let data = BatteryData::decode(
                &session
                    .read_characteristic(&uuids::BATTERY_DATA_CHAR)
                    .await?,
            )?;
            tracing::debug!(battery = %battery, rsoc = data.rsoc, "battery telemetry read");
            snapshots.push(data);
        }

        Ok(CommissionReport {
            inverter,
            charge_controller,
            batteries: snapshots,
        })
    }

    /// Authenticate a battery node and disconnect.
    ///
    /// Deliberately coarse: every failure mode (connect, write, transport)
    /// collapses to `false`. The cause goes to the log only; callers get a
    /// plain pass/fail, matching the firmware-side contract.
    pub async fn authenticate_node<P: GattPeripheral>(&self, peripheral: P) -> bool {
        let address = peripheral.address();
        let session = match DeviceSession::open(peripheral).await {
            Ok(session) => session,
            Err(err) => {
                tracing::warn!(node = %address, %err, "node connection failed");
                return false;
            }
        };

        let outcome = session
            .write_characteristic(&uuids::NODE_AUTH_CHAR, &digest::node_digest(address))
            .await;
        session.close().await;

        match outcome {
            Ok(()) => {
                tracing::info!(node = %address, "node authenticated");
                true
            }
            Err(err) => {
                tracing::warn!(node = %address, %err, "node authentication failed");
                false
            }
        }
    }
}

/// Current time as epoch milliseconds, the expiry input for the inverter
/// digest. Clamped at zero for clocks set before the epoch.
fn current_epoch_ms() -> u64 {
    u64::try_from(Utc::now().timestamp_millis()).unwrap_or(0)
}
