//! Deployment environment tags.

use crate::error::{Result, TrellisError};
use std::fmt;
use std::str::FromStr;

/// The environment a connection points at.
///
/// Purely a display attribute: it decides the tag and risk colour shown
/// next to the connection and has no effect on behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Environment {
    #[default]
    Dev,
    Sit,
    Sat,
    Prod,
}

impl Environment {
    pub const ALL: [Environment; 4] = [Self::Dev, Self::Sit, Self::Sat, Self::Prod];

    /// Returns the environment as stored in the connection list.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Dev => "DEV",
            Self::Sit => "SIT",
            Self::Sat => "SAT",
            Self::Prod => "PROD",
        }
    }

    /// Parses an environment name, ignoring case.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "DEV" => Some(Self::Dev),
            "SIT" => Some(Self::Sit),
            "SAT" => Some(Self::Sat),
            "PROD" => Some(Self::Prod),
            _ => None,
        }
    }

    /// Colour name used to signal how risky it is to run statements here.
    pub fn risk_color(&self) -> &'static str {
        match self {
            Self::Dev => "green",
            Self::Sit => "yellow1",
            Self::Sat => "dark_orange",
            Self::Prod => "red",
        }
    }

    /// Bracketed tag shown in front of the connection id.
    pub fn tag(&self) -> String {
        format!("[{}]", self.as_str())
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = TrellisError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s).ok_or_else(|| {
            TrellisError::config(format!(
                "Unknown environment '{s}'. Expected one of: DEV, SIT, SAT, PROD"
            ))
        })
    }
}
