//! Element types a `Tensor` can hold.
use crate::tensor::{Storage, Tensor};
use crate::tensor::litteral::tensor0;
use half::f16;
use ndarray::ArrayD;
use std::fmt;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Ord, PartialOrd)]
pub enum DatumType {
    F16,
    F32,
    F64,
}

impl fmt::Display for DatumType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            DatumType::F16 => write!(f, "f16"),
            DatumType::F32 => write!(f, "f32"),
            DatumType::F64 => write!(f, "f64"),
        }
    }
}

impl std::str::FromStr for DatumType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "F16" | "f16" => Ok(DatumType::F16),
            "F32" | "f32" => Ok(DatumType::F32),
            "F64" | "f64" => Ok(DatumType::F64),
            _ => anyhow::bail!("Unknown type {}", s),
        }
    }
}

/// A scalar type that can be stored in a `Tensor`.
///
/// The storage hooks are used by `Tensor` to move typed arrays in and out of
/// its type-erased storage.
pub trait Datum:
    Copy
    + Send
    + Sync
    + fmt::Debug
    + fmt::Display
    + Default
    + 'static
    + PartialEq
    + num_traits::Float
{
    fn name() -> &'static str;
    fn datum_type() -> DatumType;

    #[doc(hidden)]
    fn wrap(array: ArrayD<Self>) -> Storage;
    #[doc(hidden)]
    fn peek(storage: &Storage) -> Option<&ArrayD<Self>>;
}

macro_rules! datum {
    ($t:ty, $v:ident) => {
        impl From<$t> for Tensor {
            fn from(it: $t) -> Tensor {
                tensor0(it)
            }
        }

        impl Datum for $t {
            fn name() -> &'static str {
                stringify!($t)
            }

            fn datum_type() -> DatumType {
                DatumType::$v
            }

            fn wrap(array: ArrayD<Self>) -> Storage {
                Storage::$v(array)
            }

            fn peek(storage: &Storage) -> Option<&ArrayD<Self>> {
                match storage {
                    Storage::$v(array) => Some(array),
                    _ => None,
                }
            }
        }
    };
}

datum!(f16, F16);
datum!(f32, F32);
datum!(f64, F64);

#[cfg(test)]
mod tests {
    use crate::internal::*;
    use ndarray::arr1;

    #[test]
    fn test_array_to_tensor_to_array() {
        let array = arr1(&[12f32, 42.]);
        let tensor = Tensor::from(array.clone());
        let view = tensor.to_array_view::<f32>().unwrap();
        assert_eq!(array, view.into_dimensionality().unwrap());
    }

    #[test]
    fn test_parse_datum_type() {
        assert_eq!("f16".parse::<DatumType>().unwrap(), DatumType::F16);
        assert_eq!("F64".parse::<DatumType>().unwrap(), DatumType::F64);
        assert!("i32".parse::<DatumType>().is_err());
    }

    #[test]
    fn test_datum_type_of_scalars() {
        assert_eq!(Tensor::from(1f32).datum_type(), DatumType::F32);
        assert_eq!(Tensor::from(f16::from_f32(1.0)).datum_type(), DatumType::F16);
        assert_eq!(Tensor::from(1f64).rank(), 0);
    }
}
