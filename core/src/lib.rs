//! # lrnorm
//!
//! Local response normalization over image-like tensors, with its gradient.
//!
//! ```
//! use lrnorm_core::prelude::*;
//!
//! let x = tensor4(&[[[[1f32, 2., 3.]]]]);
//! let y = normalize(&x, 1.0, 1.0, 1.0, 0.5, "across_channels").unwrap();
//! let expected = tensor4(&[[[[1. / 6f32.sqrt(), 2. / 15f32.sqrt(), 3. / 14f32.sqrt()]]]]);
//! y.close_enough(&expected, Approximation::Close).unwrap();
//! ```
//!
//! Rank 3 (single image) inputs, argument defaults and gradient recording
//! are handled by `local_response_normalization`.

#[macro_use]
extern crate derive_new;
#[allow(unused_imports)]
#[macro_use]
extern crate log;
#[macro_use]
extern crate downcast_rs;

pub mod errors;
pub mod executor;
pub mod ops;
pub mod tape;

pub use lrnorm_data;
pub use lrnorm_data::anyhow;

/// This prelude is meant for code using lrnorm.
pub mod prelude {
    pub use crate::errors::{InvalidArgument, LrnResult};
    pub use crate::executor::{
        current_executor, multithread_scope, set_default_executor, Executor,
    };
    pub use crate::ops::nn::{
        local_response_normalization, local_response_normalization_grad, normalize, Lrn, LrnArgs,
        LrnGrad, LrnInput, LrnRegion,
    };
    pub use crate::tape::{OpRecord, Tape};
    pub use lrnorm_data::prelude::*;
}

/// This prelude is meant for code extending lrnorm (like implementing new ops).
pub mod internal {
    pub use crate::ops::nn::{DataFormat, DataShape};
    pub use crate::ops::{EvalOp, GradOp, Op};
    pub use crate::prelude::*;
    pub use lrnorm_data::internal::*;
    pub use std::borrow::Cow;
    pub use std::sync::Arc;
}

#[cfg(test)]
#[allow(dead_code)]
fn setup_test_logger() {
    let _ = env_logger::Builder::from_env("LRNORM_LOG").try_init();
}
