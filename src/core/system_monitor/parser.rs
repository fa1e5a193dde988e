//! Normalization of rocm-smi JSON output into [`DeviceRecord`]s.
//!
//! Field names differ between ROCm releases, values may carry unit suffixes and
//! summary keys are mixed in with the per-card entries. Every field conversion
//! returns a [`FieldResult`]; a failed conversion leaves the field at its default
//! and never affects the rest of the record.

use serde_json::{Map, Value};
use thiserror::Error;

use super::metrics::{DeviceMap, DeviceRecord, DEVICE_PREFIX};
use crate::platform::gpu::runner::json_kind;

pub const KEY_GPU_USE: &str = "GPU use (%)";
pub const KEY_VRAM_TOTAL: &str = "VRAM Total Memory (B)";
pub const KEY_VRAM_USED: &str = "VRAM Total Used Memory (B)";
pub const KEY_TEMP_EDGE: &str = "Temperature (Sensor edge) (C)";
pub const KEY_TEMP_JUNCTION: &str = "Temperature (Sensor junction) (C)";

/// Temperature sensors in priority order.
pub const TEMPERATURE_KEYS: [&str; 2] = [KEY_TEMP_EDGE, KEY_TEMP_JUNCTION];

/// Label fields in priority order.
pub const LABEL_KEYS: [&str; 3] = ["Card series", "Card model", "Product name"];

const PERCENT_SUFFIX: &str = "%";
const CELSIUS_SUFFIX: &str = "°C";
const BYTES_PER_MB: u64 = 1024 * 1024;

/// Why a single field could not be converted.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FieldError {
    #[error("not a number: {0:?}")]
    NotNumeric(String),

    #[error("not a finite value: {0}")]
    NotFinite(f64),

    #[error("not a byte count: {0}")]
    InvalidBytes(String),

    #[error("unsupported {0} value")]
    UnsupportedType(&'static str),
}

pub type FieldResult<T> = std::result::Result<T, FieldError>;

/// VRAM figures derived from one memory entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VramUsage {
    pub total_mb: u64,
    pub used_mb: u64,
    pub used_percent: u64,
}

/// First candidate key holding a usable value (not null, not blank text).
///
/// Isolates tool-version differences in field naming from the parsers.
pub fn lookup<'a>(fields: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    let object = fields.as_object()?;
    keys.iter()
        .filter_map(|key| object.get(*key))
        .find(|value| match value {
            Value::Null => false,
            Value::String(s) => !s.trim().is_empty(),
            _ => true,
        })
}

/// First candidate key that is present at all, whatever its value.
pub fn first_present<'a>(fields: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    let object = fields.as_object()?;
    keys.iter().find_map(|key| object.get(*key))
}

/// Parse a numeric field, stripping `suffix` from textual values.
///
/// Text that is empty once the suffix is removed counts as zero.
pub fn coerce_float(value: &Value, suffix: &str) -> FieldResult<f64> {
    let number = match value {
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| FieldError::NotNumeric(n.to_string()))?,
        Value::String(s) => {
            let cleaned = s.replace(suffix, "");
            let cleaned = cleaned.trim();
            if cleaned.is_empty() {
                0.0
            } else {
                cleaned
                    .parse::<f64>()
                    .map_err(|_| FieldError::NotNumeric(s.clone()))?
            }
        }
        other => return Err(FieldError::UnsupportedType(json_kind(other))),
    };

    if number.is_finite() {
        Ok(number)
    } else {
        Err(FieldError::NotFinite(number))
    }
}

/// [`coerce_float`] truncated toward zero.
pub fn coerce_truncated(value: &Value, suffix: &str) -> FieldResult<i64> {
    coerce_float(value, suffix).map(|n| n.trunc() as i64)
}

/// Non-negative byte count, from a JSON integer or decimal text.
pub fn coerce_bytes(value: &Value) -> FieldResult<u64> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| {
                n.as_f64()
                    .filter(|f| f.is_finite() && *f >= 0.0)
                    .map(|f| f.trunc() as u64)
            })
            .ok_or_else(|| FieldError::InvalidBytes(n.to_string())),
        Value::String(s) => s
            .trim()
            .parse::<u64>()
            .map_err(|_| FieldError::InvalidBytes(s.clone())),
        other => Err(FieldError::UnsupportedType(json_kind(other))),
    }
}

/// Convert byte counts to whole megabytes and the used percentage (truncated).
pub fn vram_usage(total: &Value, used: &Value) -> FieldResult<VramUsage> {
    let total_mb = coerce_bytes(total)? / BYTES_PER_MB;
    let used_mb = coerce_bytes(used)? / BYTES_PER_MB;
    let used_percent = if total_mb > 0 {
        ((used_mb as f64 / total_mb as f64) * 100.0) as u64
    } else {
        0
    };

    Ok(VramUsage {
        total_mb,
        used_mb,
        used_percent,
    })
}

/// `--showuse`: GPU busy percentage.
pub fn parse_utilization(payload: &Map<String, Value>, devices: &mut DeviceMap) {
    for (id, fields) in device_entries(payload) {
        let record = ensure_device(devices, id);
        record.gpu_utilization_percent = match fields.get(KEY_GPU_USE) {
            Some(value) => or_default(id, KEY_GPU_USE, coerce_truncated(value, PERCENT_SUFFIX)),
            None => 0,
        };
    }
}

/// `--showmeminfo vram`: total / used VRAM.
///
/// Both byte counts must be present; any conversion failure leaves all three
/// memory fields untouched.
pub fn parse_memory(payload: &Map<String, Value>, devices: &mut DeviceMap) {
    for (id, fields) in device_entries(payload) {
        let record = ensure_device(devices, id);
        let (Some(total), Some(used)) = (fields.get(KEY_VRAM_TOTAL), fields.get(KEY_VRAM_USED))
        else {
            continue;
        };

        match vram_usage(total, used) {
            Ok(usage) => {
                record.vram_total_mb = usage.total_mb;
                record.vram_used_mb = usage.used_mb;
                record.vram_used_percent = usage.used_percent;
            }
            Err(e) => log::trace!("{}: ignoring VRAM figures: {}", id, e),
        }
    }
}

/// `--showtemp`: edge sensor, falling back to junction only when edge is absent.
///
/// A present edge key always wins: null keeps the default, blank text reads as 0.
pub fn parse_temperature(payload: &Map<String, Value>, devices: &mut DeviceMap) {
    for (id, fields) in device_entries(payload) {
        let record = ensure_device(devices, id);
        match first_present(fields, &TEMPERATURE_KEYS) {
            None | Some(Value::Null) => {}
            Some(value) => {
                record.gpu_temperature_celsius =
                    or_default(id, "temperature", coerce_truncated(value, CELSIUS_SUFFIX));
            }
        }
    }
}

/// `--showproductname`: series, then model, then generic product name.
pub fn parse_product_name(payload: &Map<String, Value>, devices: &mut DeviceMap) {
    for (id, fields) in device_entries(payload) {
        let record = ensure_device(devices, id);
        if let Some(Value::String(name)) = lookup(fields, &LABEL_KEYS) {
            record.label = name.trim().to_string();
        }
    }
}

/// First non-empty trimmed line of a raw-text query.
pub fn first_line(text: &str) -> Option<String> {
    text.lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(str::to_string)
}

fn device_entries(payload: &Map<String, Value>) -> impl Iterator<Item = (&String, &Value)> {
    payload
        .iter()
        .filter(|(key, _)| key.starts_with(DEVICE_PREFIX))
}

fn ensure_device<'a>(devices: &'a mut DeviceMap, id: &str) -> &'a mut DeviceRecord {
    devices
        .entry(id.to_string())
        .or_insert_with(|| DeviceRecord::new(id))
}

fn or_default<T: Default>(id: &str, field: &str, result: FieldResult<T>) -> T {
    result.unwrap_or_else(|e| {
        log::trace!("{}: {} defaulted: {}", id, field, e);
        T::default()
    })
}
