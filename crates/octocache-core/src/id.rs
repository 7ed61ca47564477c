//! Identifier generation for cache indirection.
//!
//! Identifiers never depend on caller input. Two strategies are available:
//! plain v4 UUID strings and a numeric variant that folds a random UUID into
//! a 16-digit integer for index backends that prefer compact numeric columns.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{CoreError, Result};

/// Number of decimal digits kept by the numeric strategy.
const NUMERIC_DIGITS: usize = 16;

/// How new identifiers are minted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdStrategy {
    /// Hyphenated v4 UUID string
    #[default]
    Uuid,
    /// 16-digit integer folded from a v4 UUID
    Numeric,
}

impl IdStrategy {
    /// Mint a fresh identifier.
    pub fn generate(&self) -> String {
        match self {
            Self::Uuid => generate_id(),
            Self::Numeric => generate_numeric_id().to_string(),
        }
    }
}

impl fmt::Display for IdStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uuid => write!(f, "uuid"),
            Self::Numeric => write!(f, "numeric"),
        }
    }
}

impl FromStr for IdStrategy {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "uuid" => Ok(Self::Uuid),
            "numeric" => Ok(Self::Numeric),
            other => Err(CoreError::unknown_id_strategy(other)),
        }
    }
}

pub fn generate_id() -> String {
    Uuid::new_v4().to_string()
}

pub fn generate_numeric_id() -> u64 {
    fold_uuid(&Uuid::new_v4())
}

/// Fold a UUID into a 16-digit integer.
///
/// Each non-hyphen character of the hyphenated form contributes the decimal
/// rendering of its character code, with codes >= 200 reduced modulo 200 and
/// codes >= 100 reduced modulo 100. The first 16 digits of the concatenation
/// form the result.
pub fn fold_uuid(uuid: &Uuid) -> u64 {
    let mut buf = Uuid::encode_buffer();
    let text = uuid.hyphenated().encode_lower(&mut buf);

    let mut value: u64 = 0;
    let mut digits = 0;
    for c in text.chars().filter(|c| *c != '-') {
        let mut code = c as u32;
        if code >= 200 {
            code %= 200;
        }
        if code >= 100 {
            code %= 100;
        }
        for d in code.to_string().bytes() {
            if digits == NUMERIC_DIGITS {
                return value;
            }
            value = value * 10 + u64::from(d - b'0');
            digits += 1;
        }
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_id_is_uuid() {
        let id = generate_id();
        assert!(Uuid::parse_str(&id).is_ok());
        assert_ne!(id, generate_id());
    }

    #[test]
    fn test_fold_uuid_known_values() {
        let zeros = Uuid::parse_str("00000000-0000-4000-8000-000000000000").unwrap();
        assert_eq!(fold_uuid(&zeros), 4848484848484848);

        // 'f' is 102, folded to 2
        let fs = Uuid::parse_str("ffffffff-ffff-4fff-bfff-ffffffffffff").unwrap();
        assert_eq!(fold_uuid(&fs), 2222222222222222);

        // 'a' is 97, kept as two digits; 'd' is 100, folded to 0
        let mixed = Uuid::parse_str("adadadad-adad-4ada-8ada-dadadadadada").unwrap();
        assert_eq!(fold_uuid(&mixed), 9709709709709709);
    }

    #[test]
    fn test_numeric_ids_fit_sixteen_digits() {
        for _ in 0..1000 {
            let id = generate_numeric_id();
            assert!(id < 10_000_000_000_000_000);
        }
    }

    #[test]
    fn test_strategy_generate() {
        let uuid = IdStrategy::Uuid.generate();
        assert!(Uuid::parse_str(&uuid).is_ok());

        let numeric = IdStrategy::Numeric.generate();
        assert!(numeric.parse::<u64>().is_ok());
    }

    #[test]
    fn test_strategy_parse_and_display() {
        assert_eq!("uuid".parse::<IdStrategy>().unwrap(), IdStrategy::Uuid);
        assert_eq!("NUMERIC".parse::<IdStrategy>().unwrap(), IdStrategy::Numeric);
        assert!("ulid".parse::<IdStrategy>().is_err());
        assert_eq!(IdStrategy::Numeric.to_string(), "numeric");
        assert_eq!(IdStrategy::default(), IdStrategy::Uuid);
    }

    #[test]
    fn test_strategy_serde() {
        let json = serde_json::to_string(&IdStrategy::Numeric).unwrap();
        assert_eq!(json, "\"numeric\"");
        let parsed: IdStrategy = serde_json::from_str("\"uuid\"").unwrap();
        assert_eq!(parsed, IdStrategy::Uuid);
    }
}
