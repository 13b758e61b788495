//! Compact magnitude formatting: `1500` → `"1.5K"`, `2500000000` → `"2.5B"`.

use noterelay_shared::{RelayError, Result};

/// Suffixes for unit, thousand, million, billion, trillion.
const SUFFIXES: [&str; 5] = ["", "K", "M", "B", "T"];

/// Format `n` with the largest magnitude suffix that keeps it at or above 1.
///
/// Whole scaled values print without decimals, everything else with exactly
/// one. Magnitudes past trillions stay in `T`. Only non-finite input fails.
pub fn format_magnitude(n: f64) -> Result<String> {
    if !n.is_finite() {
        return Err(RelayError::validation(format!(
            "cannot format non-finite value {n}"
        )));
    }

    if n == 0.0 {
        return Ok("0".into());
    }

    let tier = ((n.abs().log10() / 3.0).floor() as i32).clamp(0, SUFFIXES.len() as i32 - 1);
    let scaled = n / 1000f64.powi(tier);
    let suffix = SUFFIXES[tier as usize];

    if scaled.fract() == 0.0 {
        Ok(format!("{scaled:.0}{suffix}"))
    } else {
        Ok(format!("{scaled:.1}{suffix}"))
    }
}
