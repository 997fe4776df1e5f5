//! BLE scanner — finds Stower peripherals on the host adapter.
//!
//! Peripherals qualify either by advertising the Stower local-name prefix
//! or by advertising one of the Stower GATT services. Inverters keep
//! advertising while connectable; battery nodes only advertise until
//! commissioned.

use std::time::Duration;

use btleplug::api::{Central as _, CentralEvent, Manager as _, Peripheral as _, ScanFilter};
use btleplug::platform::{Adapter, Manager, Peripheral};
use tokio_stream::StreamExt as _;

use stower_protocol::mac::MacAddr;
use stower_protocol::uuids;

use crate::BlePeripheral;
use crate::error::BleError;

/// Local-name prefix advertised by Stower inverters and battery nodes.
pub const LOCAL_NAME_PREFIX: &str = "Stower";

/// A peripheral seen during a scan.
#[derive(Debug, Clone)]
pub struct DiscoveredPeripheral {
    /// Platform identifier, stable for the lifetime of the host session.
    pub id: String,
    /// BLE address.
    pub address: MacAddr,
    /// Advertised local name, when present.
    pub local_name: Option<String>,
    /// Signal strength at the last advertisement.
    pub rssi: Option<i16>,
}

/// Whether an advertisement looks like a Stower device.
fn is_stower_advertisement(local_name: Option<&str>, services: &[uuid::Uuid]) -> bool {
    let named = local_name.is_some_and(|name| name.starts_with(LOCAL_NAME_PREFIX));
    let advertises = services
        .iter()
        .any(|service| *service == uuids::INVERTER_SERVICE || *service == uuids::NODE_AUTH_SERVICE);
    named || advertises
}

async fn default_adapter() -> Result<Adapter, BleError> {
    let manager = Manager::new().await?;
    let adapters = manager.adapters().await?;
    adapters.into_iter().next().ok_or(BleError::NotAvailable)
}

async fn stop_scan(central: &Adapter) {
    if let Err(err) = central.stop_scan().await {
        tracing::debug!(%err, "failed to stop BLE scan");
    }
}

async fn lookup_by_address(
    central: &Adapter,
    address: MacAddr,
) -> Result<Option<Peripheral>, BleError> {
    let peripherals = central.peripherals().await?;
    Ok(peripherals
        .into_iter()
        .find(|peripheral| peripheral.address().into_inner() == address.octets()))
}

/// Run a single scan for the given duration and return every Stower
/// peripheral in range.
///
/// # Errors
///
/// Returns [`BleError`] when the BLE adapter is unavailable or the scan
/// cannot be started.
pub async fn scan(duration: Duration) -> Result<Vec<DiscoveredPeripheral>, BleError> {
    let central = default_adapter().await?;

    central.start_scan(ScanFilter::default()).await?;
    tokio::time::sleep(duration).await;

    let mut found = Vec::new();
    for peripheral in central.peripherals().await? {
        let Ok(Some(props)) = peripheral.properties().await else {
            continue;
        };
        if !is_stower_advertisement(props.local_name.as_deref(), &props.services) {
            continue;
        }
        found.push(DiscoveredPeripheral {
            id: peripheral.id().to_string(),
            address: MacAddr::new(peripheral.address().into_inner()),
            local_name: props.local_name,
            rssi: props.rssi,
        });
    }

    stop_scan(&central).await;
    Ok(found)
}

/// Scan until the peripheral with the given address shows up, then wrap it
/// for GATT use.
///
/// Checks the central's cache first, so a device found by an earlier scan
/// connects without waiting for a fresh advertisement.
///
/// # Errors
///
/// Returns [`BleError::PeripheralNotFound`] when the address does not
/// appear within `scan_for`, or [`BleError`] when the adapter is
/// unavailable.
pub async fn find_peripheral(
    address: MacAddr,
    scan_for: Duration,
) -> Result<BlePeripheral, BleError> {
    let central = default_adapter().await?;

    let mut events = central.events().await?;
    central.start_scan(ScanFilter::default()).await?;

    let mut found = lookup_by_address(&central, address).await?;

    let deadline = tokio::time::Instant::now() + scan_for;
    while found.is_none() && tokio::time::Instant::now() < deadline {
        let remaining = deadline - tokio::time::Instant::now();
        match tokio::time::timeout(remaining, events.next()).await {
            Ok(Some(CentralEvent::DeviceDiscovered(id) | CentralEvent::DeviceUpdated(id))) => {
                let Ok(peripheral) = central.peripheral(&id).await else {
                    continue;
                };
                if peripheral.address().into_inner() == address.octets() {
                    found = Some(peripheral);
                }
            }
            Ok(Some(_)) => {}
            Ok(None) | Err(_) => break,
        }
    }

    stop_scan(&central).await;
    found
        .map(BlePeripheral::new)
        .ok_or(BleError::PeripheralNotFound { address })
}
