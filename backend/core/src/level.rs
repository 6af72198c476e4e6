//! Numeric log severities.
//!
//! Levels are ordered integers with named tiers at multiples of ten. Values
//! between tiers are legal and render as `Level N`.

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use crate::error::LogError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Level(u32);

impl Level {
    pub const NOTSET: Level = Level(0);
    pub const DEBUG: Level = Level(10);
    pub const INFO: Level = Level(20);
    pub const WARNING: Level = Level(30);
    pub const ERROR: Level = Level(40);
    pub const CRITICAL: Level = Level(50);

    pub const fn new(value: u32) -> Self {
        Level(value)
    }

    pub const fn value(self) -> u32 {
        self.0
    }

    /// Name of the level as it appears in `meta.level`.
    pub fn name(self) -> Cow<'static, str> {
        match self {
            Level::NOTSET => Cow::Borrowed("NOTSET"),
            Level::DEBUG => Cow::Borrowed("DEBUG"),
            Level::INFO => Cow::Borrowed("INFO"),
            Level::WARNING => Cow::Borrowed("WARNING"),
            Level::ERROR => Cow::Borrowed("ERROR"),
            Level::CRITICAL => Cow::Borrowed("CRITICAL"),
            Level(other) => Cow::Owned(format!("Level {other}")),
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

impl From<u32> for Level {
    fn from(value: u32) -> Self {
        Level(value)
    }
}

impl FromStr for Level {
    type Err = LogError;

    /// Accepts tier names (any case, `WARN` and `FATAL` included) or a decimal value.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if let Ok(value) = trimmed.parse::<u32>() {
            return Ok(Level(value));
        }
        match trimmed.to_ascii_uppercase().as_str() {
            "NOTSET" => Ok(Level::NOTSET),
            "DEBUG" => Ok(Level::DEBUG),
            "INFO" => Ok(Level::INFO),
            "WARN" | "WARNING" => Ok(Level::WARNING),
            "ERROR" => Ok(Level::ERROR),
            "CRITICAL" | "FATAL" => Ok(Level::CRITICAL),
            _ => Err(LogError::InvalidArgument(format!("unknown log level '{s}'"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tiers_are_ordered() {
        assert!(Level::DEBUG < Level::INFO);
        assert!(Level::ERROR < Level::CRITICAL);
        assert!(Level::new(15) > Level::DEBUG);
    }

    #[test]
    fn unnamed_levels_render_numerically() {
        assert_eq!(Level::WARNING.name(), "WARNING");
        assert_eq!(Level::new(15).to_string(), "Level 15");
    }

    #[test]
    fn parses_names_and_numbers() {
        assert_eq!("warn".parse::<Level>().unwrap(), Level::WARNING);
        assert_eq!(" Critical ".parse::<Level>().unwrap(), Level::CRITICAL);
        assert_eq!("25".parse::<Level>().unwrap(), Level::new(25));
        assert!("loud".parse::<Level>().is_err());
    }
}
