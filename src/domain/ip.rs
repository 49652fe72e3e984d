// Copyright (c) 2025 - Cowboy AI, Inc.
//! IP Address Value Object with Validation Invariants

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;
use thiserror::Error;

/// IP value validation error
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IpValueError {
    #[error("IP address is empty")]
    Empty,

    #[error("Invalid IP address format: {0}")]
    Invalid(String),
}

/// A single IPv4 or IPv6 host address
///
/// The address a server is reachable under, stored in canonical form.
/// Invariants:
/// - Valid IPv4 or IPv6 literal
/// - Canonical representation (comparisons ignore textual variants such as
///   `::0:1` vs `::1`)
///
/// # Examples
///
/// ```rust
/// use hostpanel::domain::IpValue;
///
/// let v4 = IpValue::new("192.0.2.10").unwrap();
/// assert!(v4.is_ipv4());
///
/// let v6 = IpValue::new("2001:db8::1").unwrap();
/// assert_eq!(v6.to_string(), "2001:db8::1");
///
/// assert!(IpValue::new("not-an-ip").is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IpValue(IpAddr);

impl IpValue {
    /// Parse and validate an IP literal
    ///
    /// # Invariants
    /// - Non-empty after trimming
    /// - Parses as an IPv4 or IPv6 address
    pub fn new(value: impl AsRef<str>) -> Result<Self, IpValueError> {
        let value = value.as_ref().trim();

        if value.is_empty() {
            return Err(IpValueError::Empty);
        }

        let addr =
            IpAddr::from_str(value).map_err(|_| IpValueError::Invalid(value.to_string()))?;

        Ok(Self(addr))
    }

    /// Get the underlying address
    pub fn addr(&self) -> IpAddr {
        self.0
    }

    /// Check if this is an IPv4 address
    pub fn is_ipv4(&self) -> bool {
        matches!(self.0, IpAddr::V4(_))
    }

    /// Check if this is an IPv6 address
    pub fn is_ipv6(&self) -> bool {
        matches!(self.0, IpAddr::V6(_))
    }
}

impl fmt::Display for IpValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for IpValue {
    type Err = IpValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl From<IpAddr> for IpValue {
    fn from(addr: IpAddr) -> Self {
        Self(addr)
    }
}
