//! Lifecycle state shared by contract and resident option records.
//!
//! The state is a pure value holder: which transitions are allowed is decided
//! by the services that drive admissions and contracts, never by the entity.
//! The only check performed here is at the decoding boundary, where an
//! unknown integer code is rejected instead of being carried around.

use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Integer-coded lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "i16", into = "i16")]
#[repr(i16)]
pub enum LifecycleState {
    #[default]
    Active = 1,
    Inactive = 2,
    Pending = 3,
}

impl LifecycleState {
    pub const ALL: [LifecycleState; 3] = [
        LifecycleState::Active,
        LifecycleState::Inactive,
        LifecycleState::Pending,
    ];

    /// Integer code persisted in the `state` column.
    pub fn code(self) -> i16 {
        self as i16
    }

    pub fn label(self) -> &'static str {
        match self {
            LifecycleState::Active => "Active",
            LifecycleState::Inactive => "Inactive",
            LifecycleState::Pending => "Pending",
        }
    }

    /// Codes accepted by `Choice` constraints on state fields.
    pub const CODES: &'static [i64] = &[1, 2, 3];
}

impl TryFrom<i16> for LifecycleState {
    type Error = DomainError;

    fn try_from(code: i16) -> Result<Self, Self::Error> {
        match code {
            1 => Ok(LifecycleState::Active),
            2 => Ok(LifecycleState::Inactive),
            3 => Ok(LifecycleState::Pending),
            other => Err(DomainError::validation(format!(
                "unknown lifecycle state code: {other}"
            ))),
        }
    }
}

impl From<LifecycleState> for i16 {
    fn from(value: LifecycleState) -> Self {
        value.code()
    }
}

impl core::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.label())
    }
}

/// Capability attached to every record that carries a lifecycle state.
pub trait HasLifecycleState {
    fn state(&self) -> LifecycleState;

    fn set_state(&mut self, state: LifecycleState);

    fn is_active(&self) -> bool {
        self.state() == LifecycleState::Active
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn default_is_active() {
        assert_eq!(LifecycleState::default(), LifecycleState::Active);
    }

    #[test]
    fn serializes_as_integer_code() {
        let json = serde_json::to_string(&LifecycleState::Pending).unwrap();
        assert_eq!(json, "3");
        let back: LifecycleState = serde_json::from_str("2").unwrap();
        assert_eq!(back, LifecycleState::Inactive);
    }

    #[test]
    fn out_of_range_code_fails_at_decoding() {
        assert!(serde_json::from_str::<LifecycleState>("0").is_err());
        assert!(serde_json::from_str::<LifecycleState>("4").is_err());
        assert!(LifecycleState::try_from(-1).is_err());
    }

    proptest! {
        #[test]
        fn only_declared_codes_decode(code in any::<i16>()) {
            match LifecycleState::try_from(code) {
                Ok(state) => prop_assert_eq!(state.code(), code),
                Err(_) => prop_assert!(!(1..=3).contains(&code)),
            }
        }
    }
}
