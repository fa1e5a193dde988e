//! One poll cycle: run the four telemetry queries and build a fresh device set.

use std::panic::{self, AssertUnwindSafe};

use serde_json::{Map, Value};

use super::metrics::{DeviceMap, DriverInfo, Snapshot};
use super::parser;
use crate::platform::gpu::{AmdSmi, SmiQuery};

/// Parser applied to one structured query result.
pub type QueryParser = fn(&Map<String, Value>, &mut DeviceMap);

fn parser_for(query: SmiQuery) -> Option<QueryParser> {
    match query {
        SmiQuery::Utilization => Some(parser::parse_utilization as QueryParser),
        SmiQuery::Memory => Some(parser::parse_memory as QueryParser),
        SmiQuery::Temperature => Some(parser::parse_temperature as QueryParser),
        SmiQuery::ProductName => Some(parser::parse_product_name as QueryParser),
        SmiQuery::DriverVersion | SmiQuery::SmiVersion => None,
    }
}

/// Build this cycle's device map.
///
/// Starts empty every time, so cards missing from the tool output disappear.
/// Each query is isolated: a failing command only yields an empty mapping and a
/// panicking parser only loses that query's fields.
pub async fn collect_devices(smi: &AmdSmi) -> DeviceMap {
    collect_devices_until(smi, || false)
        .await
        .unwrap_or_default()
}

/// [`collect_devices`], abandoned between queries once `cancelled` returns true.
///
/// Returns `None` for an abandoned cycle so a partial device set is never stored.
pub async fn collect_devices_until<F>(smi: &AmdSmi, cancelled: F) -> Option<DeviceMap>
where
    F: Fn() -> bool,
{
    let mut devices = DeviceMap::new();

    for query in SmiQuery::TELEMETRY {
        if cancelled() {
            log::debug!("Cycle abandoned before {} query", query.name());
            return None;
        }

        let Some(parse) = parser_for(query) else {
            continue;
        };

        let payload = smi.query_structured(query).await;
        if payload.is_empty() {
            log::debug!("No {} data this cycle", query.name());
            continue;
        }

        apply_isolated(query, parse, &payload, &mut devices);
    }

    Some(devices)
}

/// Apply one parser to `devices`, containing any panic to that query.
pub fn apply_isolated(
    query: SmiQuery,
    parse: QueryParser,
    payload: &Map<String, Value>,
    devices: &mut DeviceMap,
) {
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| parse(payload, devices)));
    if outcome.is_err() {
        log::error!("Parsing {} output panicked; skipping it this cycle", query.name());
    }
}

/// Driver and tool version, best effort.
pub async fn fetch_driver_info(smi: &AmdSmi) -> DriverInfo {
    let mut driver = DriverInfo::default();

    if let Some(line) = parser::first_line(&smi.query_text(SmiQuery::DriverVersion).await) {
        driver.driver_version = line;
    }
    if let Some(line) = parser::first_line(&smi.query_text(SmiQuery::SmiVersion).await) {
        driver.smi_version = line;
    }

    log::debug!(
        "Driver info: driver='{}' smi='{}'",
        driver.driver_version,
        driver.smi_version
    );
    driver
}

/// Driver info plus one cycle, without touching any shared state.
pub async fn collect_snapshot(smi: &AmdSmi) -> Snapshot {
    let driver = fetch_driver_info(smi).await;
    let devices = collect_devices(smi).await;
    Snapshot::new(driver, devices)
}
