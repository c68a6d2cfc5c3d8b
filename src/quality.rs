//! Import quality levels.

use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Caller-selected quality, controlling the palette size used on import.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Quality {
    /// 256 colors.
    #[default]
    Full,
    /// 128 colors.
    High,
    /// 64 colors.
    Medium,
    /// 32 colors.
    Low,
}

impl Quality {
    /// All levels, best first.
    pub const ALL: [Quality; 4] = [Quality::Full, Quality::High, Quality::Medium, Quality::Low];

    /// Maximum number of palette entries for this level.
    #[inline]
    pub const fn palette_size(self) -> usize {
        match self {
            Quality::Full => 256,
            Quality::High => 128,
            Quality::Medium => 64,
            Quality::Low => 32,
        }
    }

    /// Percentage shown to users.
    #[inline]
    pub const fn percent(self) -> u8 {
        match self {
            Quality::Full => 100,
            Quality::High => 75,
            Quality::Medium => 50,
            Quality::Low => 25,
        }
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.percent())
    }
}

impl FromStr for Quality {
    type Err = Error;

    /// Accepts `"100%"`, `"75%"`, `"50%"`, `"25%"`, with or without the `%`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.trim();
        let digits = digits.strip_suffix('%').unwrap_or(digits);
        match digits {
            "100" => Ok(Quality::Full),
            "75" => Ok(Quality::High),
            "50" => Ok(Quality::Medium),
            "25" => Ok(Quality::Low),
            _ => Err(Error::InvalidQuality(s.to_string())),
        }
    }
}
