use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// 真实姓名（名 + 姓，均不能为空）
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawProperName")]
pub struct ProperName {
    first_name: String,
    last_name: String,
}

#[derive(Deserialize)]
struct RawProperName {
    first_name: String,
    last_name: String,
}

impl ProperName {
    pub fn new(first_name: &str, last_name: &str) -> Result<Self, ValidationError> {
        let first_name = first_name.trim();
        if first_name.is_empty() {
            return Err(ValidationError::EmptyField("first name".to_string()));
        }

        let last_name = last_name.trim();
        if last_name.is_empty() {
            return Err(ValidationError::EmptyField("last name".to_string()));
        }

        Ok(Self {
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
        })
    }

    pub fn first_name(&self) -> &str {
        &self.first_name
    }

    pub fn last_name(&self) -> &str {
        &self.last_name
    }
}

impl fmt::Display for ProperName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.first_name, self.last_name)
    }
}

impl TryFrom<RawProperName> for ProperName {
    type Error = ValidationError;

    fn try_from(raw: RawProperName) -> Result<Self, Self::Error> {
        Self::new(&raw.first_name, &raw.last_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_proper_name() {
        let name = ProperName::new("Alice", "Liddell").unwrap();
        assert_eq!(name.first_name(), "Alice");
        assert_eq!(name.last_name(), "Liddell");
        assert_eq!(name.to_string(), "Alice Liddell");
    }

    #[test]
    fn test_empty_parts_rejected() {
        assert_eq!(
            ProperName::new("", "Liddell"),
            Err(ValidationError::EmptyField("first name".to_string()))
        );
        assert_eq!(
            ProperName::new("Alice", "   "),
            Err(ValidationError::EmptyField("last name".to_string()))
        );
    }

    #[test]
    fn test_deserialize_validates() {
        let json = r#"{"first_name":"Alice","last_name":"Liddell"}"#;
        let name: ProperName = serde_json::from_str(json).unwrap();
        assert_eq!(name.first_name(), "Alice");

        let json = r#"{"first_name":"","last_name":"Liddell"}"#;
        assert!(serde_json::from_str::<ProperName>(json).is_err());
    }
}
