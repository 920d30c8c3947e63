//! Error types raised when an op is called with arguments it can not accept.
use lrnorm_data::prelude::*;
use std::fmt;

/// Result type used across the crate. Precondition failures are carried as
/// an `InvalidArgument` inside the `anyhow::Error`.
pub type LrnResult<T> = anyhow::Result<T>;

/// A precondition violation detected before any computation started.
#[derive(Debug, Clone, PartialEq)]
pub enum InvalidArgument {
    Rank { expected: &'static [usize], got: usize },
    Radius(f64),
    Region(String),
    Parameter { name: &'static str, value: f64 },
    ShapeMismatch { expected: TVec<usize>, got: TVec<usize> },
    DatumTypeMismatch { expected: DatumType, got: DatumType },
}

impl fmt::Display for InvalidArgument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use InvalidArgument::*;
        match self {
            Rank { expected, got } => {
                let expected =
                    expected.iter().map(|r| r.to_string()).collect::<Vec<_>>().join(" or ");
                write!(f, "Invalid argument: expected a tensor of rank {expected}, got rank {got}")
            }
            Radius(r) => {
                write!(f, "Invalid argument: radius must be a non-negative integer, got {r}")
            }
            Region(r) => write!(
                f,
                "Invalid argument: region must be across_channels or within_channel, got {r:?}"
            ),
            Parameter { name, value } => {
                write!(f, "Invalid argument: {name} must be finite, got {value}")
            }
            ShapeMismatch { expected, got } => write!(
                f,
                "Invalid argument: expected a tensor of shape {expected:?}, got {got:?}"
            ),
            DatumTypeMismatch { expected, got } => {
                write!(f, "Invalid argument: expected a {expected} tensor, got {got}")
            }
        }
    }
}

impl std::error::Error for InvalidArgument {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_offending_value() {
        let e = InvalidArgument::Rank { expected: &[3, 4], got: 2 };
        assert_eq!(
            e.to_string(),
            "Invalid argument: expected a tensor of rank 3 or 4, got rank 2"
        );
        assert!(InvalidArgument::Radius(2.5).to_string().contains("2.5"));
        assert!(InvalidArgument::Region("diagonal".into()).to_string().contains("\"diagonal\""));
    }

    #[test]
    fn survives_anyhow_round_trip() {
        let e: anyhow::Error = InvalidArgument::Radius(-1.0).into();
        assert_eq!(e.downcast_ref::<InvalidArgument>(), Some(&InvalidArgument::Radius(-1.0)));
    }
}
