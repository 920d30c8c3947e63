#[macro_use]
mod macros;

/// A Smallvec instantiation with 4 embeddable values.
///
/// Used about everywhere, for op inputs and outputs, or tensor dimensions.
pub type TVec<T> = smallvec::SmallVec<[T; 4]>;

pub mod prelude {
    pub use crate::datum::{Datum, DatumType};
    pub use crate::tensor::litteral::*;
    pub use crate::tensor::{Approximation, IntoArcTensor, IntoTensor, Tensor};
    pub use crate::tvec;
    pub use crate::TVec;
    pub use crate::{args_1, args_2, dispatch_floatlike};
    pub use half::f16;
}

pub mod internal {
    pub use crate::prelude::*;
    pub use anyhow::{bail, ensure, Context as _};
    pub use ndarray as lrnorm_ndarray;
}

pub use anyhow;
pub use half;
pub use ndarray;

mod datum;
mod tensor;
