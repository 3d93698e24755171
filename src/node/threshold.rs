//! Group thresholds and binary operators.

use serde::{Deserialize, Serialize};
use std::fmt;

/// How many items of a condition group must hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "ThresholdRepr", into = "ThresholdRepr")]
pub enum Threshold {
    /// Every item (count 0)
    All,
    /// At least one item (count 1)
    Any,
    /// At least `n` items, `n >= 2`
    AtLeast(usize),
}

impl Threshold {
    /// Declarative count: 0 is All, 1 is Any, anything else AtLeast.
    pub fn from_count(count: usize) -> Self {
        match count {
            0 => Threshold::All,
            1 => Threshold::Any,
            n => Threshold::AtLeast(n),
        }
    }

    /// Declarative count of this threshold.
    pub fn count(self) -> usize {
        match self {
            Threshold::All => 0,
            Threshold::Any => 1,
            Threshold::AtLeast(n) => n,
        }
    }

    /// Fold `AtLeast(0|1)` into All/Any. Independent of the item count.
    pub fn canonical(self) -> Self {
        match self {
            Threshold::AtLeast(n) if n < 2 => Threshold::from_count(n),
            other => other,
        }
    }

    /// Fold degenerate forms for a group of exactly `len` evaluated items:
    /// `AtLeast(0|1)` become All/Any and `AtLeast(len)` becomes All.
    ///
    /// Only valid once the evaluated items are known. Placeholders and no-op
    /// leaves are dropped at compile time, so a configured group may evaluate
    /// fewer items than it declares.
    pub fn normalize(self, len: usize) -> Self {
        match self.canonical() {
            Threshold::AtLeast(n) if n == len => Threshold::All,
            other => other,
        }
    }

    /// Reject an `AtLeast(n)` that no group of `len` items can satisfy.
    pub fn check(self, len: usize) -> Result<Self, String> {
        match self.canonical() {
            Threshold::AtLeast(n) if n > len => Err(format!(
                "threshold AtLeast({}) can never hold for {} item(s)",
                n, len
            )),
            ok => Ok(ok),
        }
    }
}

impl fmt::Display for Threshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Threshold::All => write!(f, "All"),
            Threshold::Any => write!(f, "Any"),
            Threshold::AtLeast(n) => write!(f, "AtLeast({})", n),
        }
    }
}

/// Wire form: a count or a name (`"All"`, `"Any"`, `"2"`).
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum ThresholdRepr {
    Count(u64),
    Name(String),
}

impl TryFrom<ThresholdRepr> for Threshold {
    type Error = String;

    fn try_from(repr: ThresholdRepr) -> Result<Self, Self::Error> {
        match repr {
            ThresholdRepr::Count(n) => usize::try_from(n)
                .map(Threshold::from_count)
                .map_err(|_| format!("threshold {} out of range", n)),
            ThresholdRepr::Name(name) => {
                let name = name.trim();
                if name.eq_ignore_ascii_case("all") {
                    Ok(Threshold::All)
                } else if name.eq_ignore_ascii_case("any") {
                    Ok(Threshold::Any)
                } else {
                    name.parse::<usize>()
                        .map(Threshold::from_count)
                        .map_err(|_| format!("invalid threshold '{}'", name))
                }
            }
        }
    }
}

impl From<Threshold> for ThresholdRepr {
    fn from(threshold: Threshold) -> Self {
        match threshold {
            Threshold::All => ThresholdRepr::Name("All".to_string()),
            Threshold::Any => ThresholdRepr::Name("Any".to_string()),
            Threshold::AtLeast(n) => ThresholdRepr::Count(n as u64),
        }
    }
}

/// Binary condition operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PairOp {
    And,
    Or,
    Xor,
}

impl PairOp {
    /// Parse a discriminator, ignoring case.
    pub fn parse(name: &str) -> Option<Self> {
        [PairOp::And, PairOp::Or, PairOp::Xor]
            .into_iter()
            .find(|op| op.name().eq_ignore_ascii_case(name))
    }

    pub fn name(self) -> &'static str {
        match self {
            PairOp::And => "And",
            PairOp::Or => "Or",
            PairOp::Xor => "Xor",
        }
    }

    /// Group threshold this operator is equivalent to, if any.
    pub fn as_threshold(self) -> Option<Threshold> {
        match self {
            PairOp::And => Some(Threshold::All),
            PairOp::Or => Some(Threshold::Any),
            PairOp::Xor => None,
        }
    }
}

impl fmt::Display for PairOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_count() {
        assert_eq!(Threshold::from_count(0), Threshold::All);
        assert_eq!(Threshold::from_count(1), Threshold::Any);
        assert_eq!(Threshold::from_count(3), Threshold::AtLeast(3));
        assert_eq!(Threshold::AtLeast(3).count(), 3);
    }

    #[test]
    fn test_normalize_and_check() {
        assert_eq!(Threshold::AtLeast(1).normalize(5), Threshold::Any);
        assert_eq!(Threshold::AtLeast(3).normalize(3), Threshold::All);
        assert_eq!(Threshold::AtLeast(2).check(3), Ok(Threshold::AtLeast(2)));
        assert_eq!(Threshold::AtLeast(3).check(3), Ok(Threshold::AtLeast(3)));
        assert_eq!(Threshold::AtLeast(0).canonical(), Threshold::All);
        assert_eq!(Threshold::AtLeast(3).canonical(), Threshold::AtLeast(3));
        assert!(Threshold::AtLeast(4).check(3).is_err());
        assert_eq!(Threshold::All.check(0), Ok(Threshold::All));
    }

    #[test]
    fn test_deserialize_forms() {
        let parse = |s: &str| serde_json::from_str::<Threshold>(s);
        assert_eq!(parse("0").unwrap(), Threshold::All);
        assert_eq!(parse("1").unwrap(), Threshold::Any);
        assert_eq!(parse("2").unwrap(), Threshold::AtLeast(2));
        assert_eq!(parse("\"any\"").unwrap(), Threshold::Any);
        assert_eq!(parse("\"All\"").unwrap(), Threshold::All);
        assert_eq!(parse("\"3\"").unwrap(), Threshold::AtLeast(3));
        assert!(parse("\"most\"").is_err());
        assert!(parse("-1").is_err());
    }

    #[test]
    fn test_serialize_forms() {
        assert_eq!(serde_json::to_string(&Threshold::All).unwrap(), "\"All\"");
        assert_eq!(serde_json::to_string(&Threshold::AtLeast(2)).unwrap(), "2");
    }

    #[test]
    fn test_pair_op() {
        assert_eq!(PairOp::parse("xor"), Some(PairOp::Xor));
        assert_eq!(PairOp::parse("Group"), None);
        assert_eq!(PairOp::And.as_threshold(), Some(Threshold::All));
        assert_eq!(PairOp::Xor.as_threshold(), None);
    }
}
