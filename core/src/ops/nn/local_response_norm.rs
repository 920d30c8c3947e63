//! User facing entry point: argument defaults, validation and rank
//! adaptation around the `Lrn` kernel.
use crate::internal::*;
use crate::ops::nn::lrn::radius_from_f64;
use crate::ops::nn::DataFormat;
use crate::tape::Tape;

/// Unvalidated LRN arguments, as a caller or a configuration file gives them.
#[derive(Clone, Debug, PartialEq)]
pub struct LrnArgs {
    pub depth_radius: f64,
    pub bias: f64,
    pub alpha: f64,
    pub beta: f64,
    pub region: String,
}

impl Default for LrnArgs {
    fn default() -> LrnArgs {
        LrnArgs {
            depth_radius: 5.0,
            bias: 1.0,
            alpha: 1.0,
            beta: 0.5,
            region: LrnRegion::AcrossChannels.to_string(),
        }
    }
}

impl LrnArgs {
    /// Validate the arguments into a kernel op.
    pub fn to_op(&self) -> LrnResult<Lrn> {
        let radius = radius_from_f64(self.depth_radius)?;
        let region = self.region.parse::<LrnRegion>()?;
        let lrn = Lrn::new(radius, self.bias, self.alpha, self.beta, region);
        lrn.validate()?;
        Ok(lrn)
    }
}

/// A tensor the wrapper accepts: a single HWC image or a NHWC batch.
#[derive(Clone, Debug, PartialEq)]
pub enum LrnInput {
    Rank3(Tensor),
    Rank4(Tensor),
}

impl LrnInput {
    pub fn from_tensor(tensor: Tensor) -> LrnResult<LrnInput> {
        match tensor.rank() {
            3 => Ok(LrnInput::Rank3(tensor)),
            4 => Ok(LrnInput::Rank4(tensor)),
            got => bail!(InvalidArgument::Rank { expected: &[3, 4], got }),
        }
    }

    pub fn data_format(&self) -> DataFormat {
        match self {
            LrnInput::Rank3(_) => DataFormat::HWC,
            LrnInput::Rank4(_) => DataFormat::NHWC,
        }
    }

    pub fn tensor(&self) -> &Tensor {
        match self {
            LrnInput::Rank3(t) | LrnInput::Rank4(t) => t,
        }
    }

    pub fn into_tensor(self) -> Tensor {
        match self {
            LrnInput::Rank3(t) | LrnInput::Rank4(t) => t,
        }
    }

    /// The NHWC view the kernels work on, synthesizing a batch axis for a
    /// single image.
    fn into_nhwc(self) -> LrnResult<Tensor> {
        let fmt = self.data_format();
        let tensor = self.into_tensor();
        fmt.shape(tensor.shape())?;
        if fmt.has_n() { Ok(tensor) } else { tensor.insert_axis(0) }
    }

    fn from_nhwc(tensor: Tensor, fmt: DataFormat) -> LrnResult<LrnInput> {
        if fmt.has_n() {
            Ok(LrnInput::Rank4(tensor))
        } else {
            Ok(LrnInput::Rank3(tensor.remove_axis(0)?))
        }
    }
}

impl From<LrnInput> for Tensor {
    fn from(input: LrnInput) -> Tensor {
        input.into_tensor()
    }
}

/// Local response normalization of a rank 3 or rank 4 tensor, returning a
/// tensor of the same variant and shape.
///
/// When a tape is given, the evaluation is recorded on it as a rank 4 `Lrn`.
pub fn local_response_normalization(
    x: LrnInput,
    args: &LrnArgs,
    tape: Option<&mut Tape>,
) -> LrnResult<LrnInput> {
    let lrn = args.to_op()?;
    let fmt = x.data_format();
    let input = x.into_nhwc()?.into_arc_tensor();
    let mut outputs = lrn.eval(tvec!(input.clone()))?;
    if let Some(tape) = tape {
        let name = format!("lrn_{}", tape.len());
        tape.record(name, lrn, tvec!(input), outputs.clone());
    }
    let output = args_1!(outputs);
    let output = Arc::try_unwrap(output).unwrap_or_else(|shared| (*shared).clone());
    LrnInput::from_nhwc(output, fmt)
}

/// Back-propagate `dy`, given in the caller's rank, through the LRN recorded
/// at `ix` on `tape`.
pub fn local_response_normalization_grad(
    tape: &Tape,
    ix: usize,
    dy: LrnInput,
) -> LrnResult<LrnInput> {
    let record = tape.record_at(ix)?;
    ensure!(record.op_as::<Lrn>().is_some(), "Record #{} is {}, not a Lrn", ix, record);
    let fmt = dy.data_format();
    let dy = dy.into_nhwc()?.into_arc_tensor();
    let mut dx = tape.grad(ix, tvec!(dy))?;
    let dx = args_1!(dx);
    let dx = Arc::try_unwrap(dx).unwrap_or_else(|shared| (*shared).clone());
    LrnInput::from_nhwc(dx, fmt)
}
