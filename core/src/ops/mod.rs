//! Ops
use std::fmt;

use downcast_rs::DowncastSync;

use crate::internal::*;

pub mod nn;

pub trait Op: fmt::Debug + DowncastSync {
    fn name(&self) -> Cow<'_, str>;
}

impl_downcast!(sync Op);

pub trait EvalOp: Op {
    fn eval(&self, inputs: TVec<Arc<Tensor>>) -> LrnResult<TVec<Arc<Tensor>>>;
}

/// An op a `Tape` can back-propagate through.
pub trait GradOp: EvalOp {
    /// Gradients with respect to each input, given the inputs and outputs of
    /// the recorded evaluation and the gradients flowing back into each output.
    fn grad(
        &self,
        inputs: &[Arc<Tensor>],
        outputs: &[Arc<Tensor>],
        output_grads: TVec<Arc<Tensor>>,
    ) -> LrnResult<TVec<Arc<Tensor>>>;
}
