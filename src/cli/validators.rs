//! CLI argument validators.
//!
//! Shared validation functions for CLI argument parsing.

use crate::seek::TraitCode;
use std::time::Duration;

/// Parse a SEEK trait code in rendered or compact form.
pub fn parse_trait_code(s: &str) -> Result<TraitCode, String> {
    s.parse().map_err(|e: crate::Error| e.to_string())
}

/// Parse a duration such as `90s`, `30m`, `2h` or `1d`. A bare number is seconds.
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    let split = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    let (digits, unit) = s.split_at(split);

    let value: u64 = digits
        .parse()
        .map_err(|_| format!("'{s}' is not a valid duration"))?;

    let multiplier = match unit {
        "" | "s" => 1,
        "m" => 60,
        "h" => 60 * 60,
        "d" => 24 * 60 * 60,
        other => return Err(format!("unknown duration unit '{other}' (use s, m, h or d)")),
    };

    Ok(Duration::from_secs(value.saturating_mul(multiplier)))
}
