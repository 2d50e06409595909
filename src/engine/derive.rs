//! Pure derivations for per-slot weight and time-decayed durability.
//!
//! Nothing here reads a clock: callers pass `now` as unix seconds, so the same inputs
//! always give the same answer.

use serde_json::Value;

use crate::engine::types::Metadata;

/// Durability values above this are expiry timestamps rather than percentages.
const PERCENT_CEILING: f64 = 100.0;

/// Weight of one piece for a stack of `weight` grams and `count` pieces.
pub fn unit_weight(weight: u32, count: u32) -> f64 {
    if count == 0 {
        return 0.0;
    }
    f64::from(weight) / f64::from(count)
}

/// Weight of `count` pieces taken from a stack weighing `total_weight` over
/// `total_count` pieces.
///
/// Computed as `total_weight * count / total_count` in integer grams, so a split and
/// its remainder (`total_weight - split`) always add back to the original weight.
pub fn weight_for(total_weight: u32, total_count: u32, count: u32) -> u32 {
    if total_count == 0 {
        return 0;
    }
    let grams = u64::from(total_weight) * u64::from(count) / u64::from(total_count);
    u32::try_from(grams).unwrap_or(u32::MAX)
}

/// Durability percentage for `metadata` at `now`.
///
/// - no `durability` key: `None` (the item does not decay)
/// - `durability <= 100`: a plain percentage
/// - `durability > 100` with `degrade` minutes: an expiry timestamp; the item loses
///   100% linearly over the `degrade` window ending at that timestamp
///
/// The result is clamped to `[0, 100]` and never increases as `now` advances.
pub fn durability(metadata: &Metadata, now: i64) -> Option<f64> {
    let basis = metadata.get("durability").and_then(Value::as_f64)?;

    let value = if basis > PERCENT_CEILING {
        match metadata.get("degrade").and_then(Value::as_f64) {
            Some(degrade) if degrade > 0.0 => {
                let remaining = basis - now as f64;
                remaining / (60.0 * degrade) * 100.0
            }
            _ => PERCENT_CEILING,
        }
    } else {
        basis
    };

    if value.is_nan() {
        return Some(0.0);
    }
    Some(value.clamp(0.0, PERCENT_CEILING))
}
