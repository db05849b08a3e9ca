//! Parsing of unit-suffixed quantities such as `10ms`, `12345Gf`, `10000MBps` or `42MB`.
//!
//! The notation follows the platform descriptions of the calibration inputs: a
//! decimal number immediately followed by a unit. A bare number is taken in the
//! base unit (seconds, flop/s, bytes per second, bytes).

use crate::error::ConversionError;

/// Splits `"12.5MBps"` into `(12.5, "MBps")`.
fn split_quantity(value: &str) -> Result<(f64, &str), ConversionError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(invalid(value, "empty quantity"));
    }

    let idx = value.find(|c: char| !(c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+' | '-'))).unwrap_or(value.len());
    let (number_part, unit_part) = value.split_at(idx);

    let number: f64 = number_part.parse().map_err(|e| invalid(value, &format!("invalid number '{}': {}", number_part, e)))?;

    if !number.is_finite() {
        return Err(invalid(value, "quantity must be finite"));
    }

    Ok((number, unit_part.trim()))
}

fn invalid(value: &str, reason: &str) -> ConversionError {
    ConversionError::InvalidQuantity { value: value.to_string(), reason: reason.to_string() }
}

/// Multiplier for an SI (`k`, `M`, ...) or binary (`Ki`, `Mi`, ...) prefix.
fn prefix_multiplier(prefix: &str) -> Option<f64> {
    let multiplier = match prefix {
        "" => 1.0,
        "k" | "K" => 1e3,
        "M" => 1e6,
        "G" => 1e9,
        "T" => 1e12,
        "P" => 1e15,
        "Ki" => 1024.0,
        "Mi" => 1024.0_f64.powi(2),
        "Gi" => 1024.0_f64.powi(3),
        "Ti" => 1024.0_f64.powi(4),
        _ => return None,
    };
    Some(multiplier)
}

/// Parses a duration and returns it in seconds.
pub fn parse_duration(value: &str) -> Result<f64, ConversionError> {
    let (number, unit) = split_quantity(value)?;

    let factor = match unit {
        "" | "s" => 1.0,
        "ns" => 1e-9,
        "us" => 1e-6,
        "ms" => 1e-3,
        "m" | "min" => 60.0,
        "h" => 3600.0,
        "d" => 86400.0,
        other => return Err(invalid(value, &format!("unsupported duration unit '{}'; expected ns, us, ms, s, m, h or d", other))),
    };

    Ok(number * factor)
}

/// Parses a flop amount or a flop rate (`Gf` = 10^9 flops) and returns flops.
pub fn parse_flops(value: &str) -> Result<f64, ConversionError> {
    let (number, unit) = split_quantity(value)?;

    if unit.is_empty() {
        return Ok(number);
    }

    let prefix = unit.strip_suffix('f').ok_or_else(|| invalid(value, "flop quantities must end with 'f'"))?;
    let multiplier = prefix_multiplier(prefix).ok_or_else(|| invalid(value, &format!("unknown prefix '{}'", prefix)))?;

    Ok(number * multiplier)
}

/// Parses a bandwidth and returns bytes per second.
///
/// `Bps` denotes bytes per second and `bps` bits per second.
pub fn parse_bandwidth(value: &str) -> Result<f64, ConversionError> {
    let (number, unit) = split_quantity(value)?;

    if unit.is_empty() {
        return Ok(number);
    }

    let (prefix, divisor) = if let Some(prefix) = unit.strip_suffix("Bps") {
        (prefix, 1.0)
    } else if let Some(prefix) = unit.strip_suffix("bps") {
        (prefix, 8.0)
    } else {
        return Err(invalid(value, "bandwidth must end with 'Bps' or 'bps'"));
    };

    let multiplier = prefix_multiplier(prefix).ok_or_else(|| invalid(value, &format!("unknown prefix '{}'", prefix)))?;

    Ok(number * multiplier / divisor)
}

/// Parses a data size and returns bytes.
pub fn parse_size(value: &str) -> Result<f64, ConversionError> {
    let (number, unit) = split_quantity(value)?;

    if unit.is_empty() {
        return Ok(number);
    }

    let (prefix, divisor) = if let Some(prefix) = unit.strip_suffix('B') {
        (prefix, 1.0)
    } else if let Some(prefix) = unit.strip_suffix('b') {
        (prefix, 8.0)
    } else {
        return Err(invalid(value, "size must end with 'B' or 'b'"));
    };

    let multiplier = prefix_multiplier(prefix).ok_or_else(|| invalid(value, &format!("unknown prefix '{}'", prefix)))?;

    Ok(number * multiplier / divisor)
}
