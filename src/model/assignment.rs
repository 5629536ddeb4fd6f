use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use utoipa::ToSchema;

use crate::service::assignment::AssignmentError;

/// A (department, position) pairing an employee may hold.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AssignmentKey {
    pub department_id: String,
    pub position_id: String,
}

impl AssignmentKey {
    pub fn new(department_id: impl Into<String>, position_id: impl Into<String>) -> Self {
        Self {
            department_id: department_id.into(),
            position_id: position_id.into(),
        }
    }
}

impl fmt::Display for AssignmentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.department_id, self.position_id)
    }
}

/// Parses the `department:position` form used by the console's multi-select.
impl FromStr for AssignmentKey {
    type Err = AssignmentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(':') {
            Some((department, position))
                if !department.trim().is_empty() && !position.trim().is_empty() =>
            {
                Ok(AssignmentKey::new(department.trim(), position.trim()))
            }
            _ => Err(AssignmentError::MalformedKey(s.to_string())),
        }
    }
}

impl Serialize for AssignmentKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for AssignmentKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Position assignment joined with its department and position names.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct PositionAssignment {
    #[schema(example = "6f1c2a8e-0b55-4c1e-9d0e-2f3a4b5c6d7e")]
    pub employee_id: String,
    #[schema(example = "d-01")]
    pub department_id: String,
    #[schema(example = "Phòng Kỹ thuật")]
    pub department_name: String,
    #[schema(example = "p-01")]
    pub position_id: String,
    #[schema(example = "Trưởng phòng")]
    pub position_name: String,
    pub active: bool,
}

impl PositionAssignment {
    pub fn key(&self) -> AssignmentKey {
        AssignmentKey::new(&self.department_id, &self.position_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_colon_separated_keys() {
        let key: AssignmentKey = "D1:P1".parse().unwrap();
        assert_eq!(key, AssignmentKey::new("D1", "P1"));
        assert_eq!(key.to_string(), "D1:P1");
    }

    #[test]
    fn rejects_keys_without_both_halves() {
        for bad in ["D1", "D1:", ":P1", "", " : "] {
            assert!(bad.parse::<AssignmentKey>().is_err(), "{bad:?} should not parse");
        }
    }

    #[test]
    fn serde_uses_the_string_form() {
        let keys: Vec<AssignmentKey> = serde_json::from_str(r#"["D1:P1","D2:P2"]"#).unwrap();
        assert_eq!(keys[1], AssignmentKey::new("D2", "P2"));
        assert_eq!(serde_json::to_string(&keys[0]).unwrap(), r#""D1:P1""#);
        assert!(serde_json::from_str::<AssignmentKey>(r#""nope""#).is_err());
    }
}
