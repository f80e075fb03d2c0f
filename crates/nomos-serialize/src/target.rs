// SPDX-License-Identifier: MIT OR Apache-2.0
//! Output targets (spec §4.13, §6): `json | yaml | tfvars`, parsed
//! case-insensitively at the caller boundary.

use nomos_error::{CodedError, ErrorCode};
use std::fmt;
use std::str::FromStr;

/// A serialization target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// JSON.
    Json,
    /// YAML.
    Yaml,
    /// HCL `.tfvars`-style text.
    Tfvars,
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Json => "json",
            Self::Yaml => "yaml",
            Self::Tfvars => "tfvars",
        })
    }
}

/// A format name unknown to this serializer.
#[derive(Debug, Clone, thiserror::Error)]
#[error("unrecognized serialization format {0:?}")]
pub struct UnknownTargetError(pub String);

impl CodedError for UnknownTargetError {
    fn code(&self) -> ErrorCode {
        ErrorCode::UsageUnknownFormat
    }
}

impl FromStr for Target {
    type Err = UnknownTargetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "yaml" => Ok(Self::Yaml),
            "tfvars" => Ok(Self::Tfvars),
            other => Err(UnknownTargetError(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parsing_is_case_insensitive() {
        assert_eq!("JSON".parse::<Target>().unwrap(), Target::Json);
        assert_eq!("Yaml".parse::<Target>().unwrap(), Target::Yaml);
        assert_eq!("TFVARS".parse::<Target>().unwrap(), Target::Tfvars);
    }

    #[test]
    fn unknown_format_is_rejected() {
        assert!("toml".parse::<Target>().is_err());
    }
}
