//! Money amounts in minor currency units (e.g. cents).

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};
use crate::value_object::ValueObject;

/// A strictly positive amount in minor units.
///
/// Zero amounts are unrepresentable; every money movement validates through
/// [`Amount::new`] before the engine is contacted.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u64", into = "u64")]
pub struct Amount(u64);

impl Amount {
    pub fn new(minor_units: u64) -> DomainResult<Self> {
        if minor_units == 0 {
            return Err(DomainError::validation("amount must be greater than zero"));
        }
        Ok(Self(minor_units))
    }

    /// Validate a signed amount (HTTP bodies and other untyped inputs).
    pub fn from_signed(minor_units: i64) -> DomainResult<Self> {
        if minor_units <= 0 {
            return Err(DomainError::validation("amount must be greater than zero"));
        }
        Self::new(minor_units as u64)
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl ValueObject for Amount {}

impl TryFrom<u64> for Amount {
    type Error = DomainError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Amount> for u64 {
    fn from(value: Amount) -> Self {
        value.0
    }
}

impl core::fmt::Display for Amount {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}
