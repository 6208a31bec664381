//! SEEK trait code representation and parsing.

use crate::constants::seek::{DISPLAY_LEN, SLOTS, WILDCARD};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const PRESENCE: &str = "01";
const RIGHT_EAR_POSITIONS: &str = "0789";
const LEFT_EAR_POSITIONS: &str = "0345";

/// Slot names in code order.
pub const SLOT_NAMES: [&str; SLOTS] = [
    "gender",
    "age",
    "r_tusk",
    "l_tusk",
    "r_prom_tear",
    "r_prom_hole",
    "r_sec_tear",
    "r_sec_hole",
    "l_prom_tear",
    "l_prom_hole",
    "l_sec_tear",
    "l_sec_hole",
    "r_extreme",
    "l_extreme",
    "r_special",
    "l_special",
    "body_special",
];

/// Symbols accepted in each slot.
const SLOT_ALPHABETS: [&str; SLOTS] = [
    "bc",
    "6789012",
    PRESENCE,
    PRESENCE,
    RIGHT_EAR_POSITIONS,
    RIGHT_EAR_POSITIONS,
    RIGHT_EAR_POSITIONS,
    RIGHT_EAR_POSITIONS,
    LEFT_EAR_POSITIONS,
    LEFT_EAR_POSITIONS,
    LEFT_EAR_POSITIONS,
    LEFT_EAR_POSITIONS,
    PRESENCE,
    PRESENCE,
    PRESENCE,
    PRESENCE,
    PRESENCE,
];

/// Section markers in the rendered form, keyed by the slot they precede.
const MARKERS: [(usize, char); 5] = [(2, 'T'), (4, 'E'), (8, '-'), (12, 'X'), (14, 'S')];

/// A fixed-length vector of categorical trait symbols; `None` is a wildcard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TraitCode {
    slots: [Option<char>; SLOTS],
}

impl TraitCode {
    /// A code with every slot unknown.
    pub const fn unknown() -> Self {
        Self {
            slots: [None; SLOTS],
        }
    }

    /// Build a code from raw slots, validating each symbol.
    pub fn from_slots(slots: [Option<char>; SLOTS]) -> Result<Self> {
        for (i, slot) in slots.iter().enumerate() {
            if let Some(symbol) = slot
                && !SLOT_ALPHABETS[i].contains(*symbol)
            {
                return Err(Error::InvalidTraitCode {
                    code: render(&slots),
                    reason: format!("'{symbol}' is not a valid {} value", SLOT_NAMES[i]),
                });
            }
        }
        Ok(Self { slots })
    }

    /// Slot values in code order.
    pub const fn slots(&self) -> &[Option<char>; SLOTS] {
        &self.slots
    }

    /// Number of wildcard slots.
    pub fn wildcard_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_none()).count()
    }

    /// Whether every slot is a wildcard.
    pub fn is_unknown(&self) -> bool {
        self.wildcard_count() == SLOTS
    }

    /// Compact form: one symbol per slot, no section markers.
    pub fn compact(&self) -> String {
        self.slots.iter().map(|s| s.unwrap_or(WILDCARD)).collect()
    }
}

fn render(slots: &[Option<char>; SLOTS]) -> String {
    let mut out = String::with_capacity(DISPLAY_LEN);
    for (i, slot) in slots.iter().enumerate() {
        if let Some((_, marker)) = MARKERS.iter().find(|(pos, _)| *pos == i) {
            out.push(*marker);
        }
        out.push(slot.unwrap_or(WILDCARD));
    }
    out
}

impl fmt::Display for TraitCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&render(&self.slots))
    }
}

impl FromStr for TraitCode {
    type Err = Error;

    /// Parse either the 22-character rendered form or the 17-character compact form.
    fn from_str(s: &str) -> Result<Self> {
        let chars: Vec<char> = s.trim().chars().collect();
        let invalid = |reason: String| Error::InvalidTraitCode {
            code: s.to_string(),
            reason,
        };

        let symbols: Vec<char> = match chars.len() {
            SLOTS => chars,
            DISPLAY_LEN => {
                let mut symbols = Vec::with_capacity(SLOTS);
                let mut offset = 0;
                for i in 0..SLOTS {
                    if let Some((_, marker)) = MARKERS.iter().find(|(pos, _)| *pos == i) {
                        let found = chars[i + offset];
                        if found != *marker {
                            return Err(invalid(format!(
                                "expected '{marker}' at position {}, found '{found}'",
                                i + offset
                            )));
                        }
                        offset += 1;
                    }
                    symbols.push(chars[i + offset]);
                }
                symbols
            }
            n => {
                return Err(invalid(format!(
                    "expected {SLOTS} or {DISPLAY_LEN} characters, got {n}"
                )));
            }
        };

        let mut slots = [None; SLOTS];
        for (slot, symbol) in slots.iter_mut().zip(symbols) {
            *slot = (symbol != WILDCARD).then_some(symbol.to_ascii_lowercase());
        }
        Self::from_slots(slots).map_err(|e| match e {
            Error::InvalidTraitCode { reason, .. } => invalid(reason),
            other => other,
        })
    }
}

impl TryFrom<String> for TraitCode {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<TraitCode> for String {
    fn from(code: TraitCode) -> Self {
        code.to_string()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rendered_form() {
        let code: TraitCode = "b2T01E7000-0300X10S001".parse().unwrap();
        assert_eq!(code.slots()[0], Some('b'));
        assert_eq!(code.slots()[1], Some('2'));
        assert_eq!(code.slots()[4], Some('7'));
        assert_eq!(code.slots()[9], Some('3'));
        assert_eq!(code.wildcard_count(), 0);
        assert_eq!(code.to_string(), "b2T01E7000-0300X10S001");
    }

    #[test]
    fn test_parse_compact_form_with_wildcards() {
        let code: TraitCode = "c?01????0000?????".parse().unwrap();
        assert_eq!(code.slots()[1], None);
        assert_eq!(code.wildcard_count(), 10);
        assert_eq!(code.compact(), "c?01????0000?????");
        assert_eq!(code.to_string(), "c?T01E????-0000X??S???");
    }

    #[test]
    fn test_unknown_code_renders_all_wildcards() {
        let code = TraitCode::unknown();
        assert!(code.is_unknown());
        assert_eq!(code.to_string(), "??T??E????-????X??S???");
        assert_eq!("??T??E????-????X??S???".parse::<TraitCode>().unwrap(), code);
    }

    #[test]
    fn test_rejects_bad_marker() {
        let err = "b2X01E7000-0300X10S001".parse::<TraitCode>().unwrap_err();
        assert!(matches!(err, Error::InvalidTraitCode { .. }));
    }

    #[test]
    fn test_rejects_symbol_outside_alphabet() {
        // '3' is a left-ear position, not a right-ear one.
        assert!("b2T01E3000-0300X10S001".parse::<TraitCode>().is_err());
        assert!("x2T01E7000-0300X10S001".parse::<TraitCode>().is_err());
    }

    #[test]
    fn test_rejects_wrong_length() {
        assert!("b2T01".parse::<TraitCode>().is_err());
    }

    #[test]
    fn test_serde_uses_rendered_string() {
        let code: TraitCode = "b2T01E7000-0300X10S001".parse().unwrap();
        let json = serde_json::to_string(&code).unwrap();
        assert_eq!(json, "\"b2T01E7000-0300X10S001\"");
        let back: TraitCode = serde_json::from_str(&json).unwrap();
        assert_eq!(back, code);
    }
}
