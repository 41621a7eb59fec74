//! Self-describing port handles
//!
//! A handle labels one connection endpoint on the editor side as
//! `direction:key:type`, e.g. `output:heroArtifact:heroArtifact`. Port keys
//! never contain `:`.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::PortDataType;

const SEPARATOR: char = ':';

/// Direction of a port
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortDirection {
    Input,
    Output,
}

impl PortDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Input => "input",
            Self::Output => "output",
        }
    }

    fn parse(token: &str) -> Option<Self> {
        match token {
            "input" => Some(Self::Input),
            "output" => Some(Self::Output),
            _ => None,
        }
    }
}

impl fmt::Display for PortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decoded `(direction, key, type)` triple
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PortHandle {
    pub direction: PortDirection,
    pub key: String,
    pub data_type: PortDataType,
}

impl PortHandle {
    pub fn new(direction: PortDirection, key: impl Into<String>, data_type: PortDataType) -> Self {
        Self {
            direction,
            key: key.into(),
            data_type,
        }
    }

    /// Serialize this handle
    pub fn encode(&self) -> String {
        encode_handle(self.direction, &self.key, self.data_type)
    }
}

/// Build a handle string from its three parts
pub fn encode_handle(direction: PortDirection, key: &str, data_type: PortDataType) -> String {
    format!("{}{}{}{}{}", direction, SEPARATOR, key, SEPARATOR, data_type)
}

/// Parse a handle string
///
/// Returns `None` for a missing handle, a missing or empty field, extra
/// fields, an unknown direction token, or an unknown port type. Never panics.
pub fn decode_handle(handle: Option<&str>) -> Option<PortHandle> {
    let mut parts = handle?.split(SEPARATOR);
    let direction = parts.next().filter(|s| !s.is_empty())?;
    let key = parts.next().filter(|s| !s.is_empty())?;
    let data_type = parts.next().filter(|s| !s.is_empty())?;
    if parts.next().is_some() {
        return None;
    }

    Some(PortHandle {
        direction: PortDirection::parse(direction)?,
        key: key.to_string(),
        data_type: data_type.parse().ok()?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode() {
        assert_eq!(
            encode_handle(PortDirection::Input, "jsonTheme", PortDataType::Json),
            "input:jsonTheme:json"
        );
    }

    #[test]
    fn test_decode_reverses_encode() {
        let handle = PortHandle::new(
            PortDirection::Output,
            "heroArtifact",
            PortDataType::HeroArtifact,
        );
        assert_eq!(decode_handle(Some(&handle.encode())), Some(handle));
    }

    #[test]
    fn test_decode_rejects_malformed() {
        assert_eq!(decode_handle(None), None);
        assert_eq!(decode_handle(Some("")), None);
        assert_eq!(decode_handle(Some("output:text")), None);
        assert_eq!(decode_handle(Some("output::text")), None);
        assert_eq!(decode_handle(Some("sideways:text:text")), None);
        assert_eq!(decode_handle(Some("Output:text:text")), None);
        assert_eq!(decode_handle(Some("output:text:number")), None);
        assert_eq!(decode_handle(Some("output:text:text:extra")), None);
    }
}
