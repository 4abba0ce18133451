use crate::core::value::Value;
use serde::{Deserialize, Serialize};
use std::{cmp::Ordering, fmt};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum KeyError {
    #[error("Break keys differ in arity: {left} vs {right}")]
    ArityMismatch { left: usize, right: usize },

    #[error("Key component {index} cannot be ordered: {left:?} vs {right:?}")]
    Incomparable {
        index: usize,
        left: Value,
        right: Value,
    },
}

/// An ordered tuple of field values identifying a group at one break
/// level, or (concatenated across levels) a position in the row stream.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct BreakKey(Vec<Value>);

impl BreakKey {
    pub fn new(values: Vec<Value>) -> Self {
        Self(values)
    }

    pub fn values(&self) -> &[Value] {
        &self.0
    }

    pub fn arity(&self) -> usize {
        self.0.len()
    }

    /// Field-wise equality. Keys of different arity indicate a broken level
    /// definition and are reported rather than treated as unequal.
    pub fn equals(&self, other: &BreakKey) -> Result<bool, KeyError> {
        self.check_arity(other)?;
        Ok(self.0.iter().zip(&other.0).all(|(a, b)| a.equal(b)))
    }

    /// Lexicographic comparison, most significant component first.
    pub fn compare(&self, other: &BreakKey) -> Result<Ordering, KeyError> {
        self.check_arity(other)?;
        for (index, (a, b)) in self.0.iter().zip(&other.0).enumerate() {
            match a.compare(b) {
                Some(Ordering::Equal) => continue,
                Some(ord) => return Ok(ord),
                None => {
                    return Err(KeyError::Incomparable {
                        index,
                        left: a.clone(),
                        right: b.clone(),
                    });
                }
            }
        }
        Ok(Ordering::Equal)
    }

    /// Appends the components of `other`, producing a composite key.
    pub fn extend(&mut self, other: &BreakKey) {
        self.0.extend(other.0.iter().cloned());
    }

    fn check_arity(&self, other: &BreakKey) -> Result<(), KeyError> {
        if self.0.len() != other.0.len() {
            return Err(KeyError::ArityMismatch {
                left: self.0.len(),
                right: other.0.len(),
            });
        }
        Ok(())
    }
}

impl From<Vec<Value>> for BreakKey {
    fn from(values: Vec<Value>) -> Self {
        Self(values)
    }
}

impl fmt::Display for BreakKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|v| v.to_string()).collect();
        f.write_str(&parts.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(parts: &[&str]) -> BreakKey {
        BreakKey::new(parts.iter().map(|p| Value::from(*p)).collect())
    }

    #[test]
    fn equal_keys_compare_equal() {
        assert!(key(&["PER", "1"]).equals(&key(&["PER", "1"])).unwrap());
        assert!(!key(&["PER", "1"]).equals(&key(&["PER", "2"])).unwrap());
    }

    #[test]
    fn arity_mismatch_is_an_error() {
        let err = key(&["PER"]).equals(&key(&["PER", "1"])).unwrap_err();
        assert_eq!(err, KeyError::ArityMismatch { left: 1, right: 2 });
    }

    #[test]
    fn compares_most_significant_first() {
        let a = BreakKey::new(vec![Value::from("PER"), Value::Int(9)]);
        let b = BreakKey::new(vec![Value::from("RET"), Value::Int(1)]);
        assert_eq!(a.compare(&b).unwrap(), Ordering::Less);
    }

    #[test]
    fn incomparable_components_are_reported() {
        let a = BreakKey::new(vec![Value::from("PER")]);
        let b = BreakKey::new(vec![Value::Int(1)]);
        assert!(matches!(
            a.compare(&b),
            Err(KeyError::Incomparable { index: 0, .. })
        ));
    }

    #[test]
    fn displays_components_space_separated() {
        assert_eq!(key(&["PER", "0001"]).to_string(), "PER 0001");
    }
}
