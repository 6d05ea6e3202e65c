// SPDX-License-Identifier: Apache-2.0

use serde::{Serialize, Serializer};
use std::fmt::{self, Debug, Display, Formatter};

/// A wrapper for text that must not leak into logs or user-facing messages.
/// To access the inner value, use the `.expose()` method.
#[derive(Clone, Eq, PartialEq, Hash)]
pub struct Sensitive<T>(T);

impl<T> Sensitive<T> {
    pub fn new(value: T) -> Self {
        Self(value)
    }

    /// Expose the wrapped value. Only for diagnostics in trusted contexts.
    pub fn expose(&self) -> &T {
        &self.0
    }
}

impl<T> Debug for Sensitive<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl<T> Display for Sensitive<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl<T> Serialize for Sensitive<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str("***")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sensitive_debug_display() {
        let statement = Sensitive::new("DELETE FROM users WHERE name = 'x'".to_string());
        assert_eq!(format!("{:?}", statement), "[REDACTED]");
        assert_eq!(format!("{}", statement), "[REDACTED]");
        assert!(statement.expose().starts_with("DELETE"));
    }

    #[test]
    fn test_sensitive_serialize() {
        let statement = Sensitive::new("SELECT 1");
        let json = serde_json::to_string(&statement).unwrap();
        assert_eq!(json, "\"***\"");
    }
}
