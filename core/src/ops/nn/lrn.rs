use std::str::FromStr;

use crate::executor::current_executor;
use crate::internal::*;
use crate::ops::nn::{DataFormat, DataShape, LrnGrad};

/// Where the normalization window of an element extends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LrnRegion {
    /// Neighbouring channels at the same (n, h, w) position.
    #[default]
    AcrossChannels,
    /// A square spatial neighbourhood at the same (n, c).
    WithinChannel,
}

impl FromStr for LrnRegion {
    type Err = InvalidArgument;

    fn from_str(s: &str) -> Result<LrnRegion, InvalidArgument> {
        let canonical = s.to_lowercase().replace(['_', '-', ' '], "");
        match &*canonical {
            "acrosschannels" | "acrosschannel" | "across" => Ok(LrnRegion::AcrossChannels),
            "withinchannel" | "withinchannels" | "within" => Ok(LrnRegion::WithinChannel),
            _ => Err(InvalidArgument::Region(s.to_string())),
        }
    }
}

impl std::fmt::Display for LrnRegion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LrnRegion::AcrossChannels => write!(f, "across_channels"),
            LrnRegion::WithinChannel => write!(f, "within_channel"),
        }
    }
}

/// Checks that a loosely typed radius is a representable non-negative integer.
pub fn radius_from_f64(radius: f64) -> Result<usize, InvalidArgument> {
    if radius.is_finite() && radius >= 0.0 && radius.fract() == 0.0 && radius < usize::MAX as f64
    {
        Ok(radius as usize)
    } else {
        Err(InvalidArgument::Radius(radius))
    }
}

/// Local response normalization over a NHWC tensor.
///
/// Every element is divided by `(bias + alpha * sum_sq) ^ beta` where
/// `sum_sq` is the sum of the squares of the elements in its window. Windows
/// are clamped to the tensor bounds.
#[derive(Debug, Clone, new, PartialEq)]
pub struct Lrn {
    pub radius: usize,
    pub bias: f64,
    pub alpha: f64,
    pub beta: f64,
    pub region: LrnRegion,
}

impl Lrn {
    pub fn validate(&self) -> LrnResult<()> {
        for (name, value) in [("bias", self.bias), ("alpha", self.alpha), ("beta", self.beta)] {
            if !value.is_finite() {
                bail!(InvalidArgument::Parameter { name, value })
            }
        }
        Ok(())
    }

    /// Normalize a rank 4 NHWC tensor into a freshly allocated tensor of the
    /// same shape and datum type.
    pub fn normalize(&self, input: &Tensor) -> LrnResult<Tensor> {
        self.validate()?;
        let shape = DataFormat::NHWC.shape(input.shape())?;
        debug!("{} {:?} on {:?}", self.name(), self, input.shape());
        dispatch_floatlike!(Self::eval_t(input.datum_type())(self, input, &shape))
    }

    fn eval_t<T: Datum>(&self, input: &Tensor, shape: &DataShape) -> LrnResult<Tensor> {
        let x = input.as_slice::<T>()?;
        let bias: T = scalar("bias", self.bias)?;
        let alpha: T = scalar("alpha", self.alpha)?;
        let beta: T = scalar("beta", self.beta)?;
        let window = Window::new(self.radius, self.region, shape);
        let c = shape.c();
        let mut output = vec![T::zero(); x.len()];
        current_executor().for_each_chunk_mut(&mut output, c, |pixel, out| {
            for (channel, o) in out.iter_mut().enumerate() {
                let sum_sq = window.sum_of_squares(x, pixel, channel);
                *o = x[pixel * c + channel] / (bias + alpha * sum_sq).powf(beta);
            }
        });
        Tensor::from_shape(input.shape(), output)
    }
}

impl Op for Lrn {
    fn name(&self) -> Cow<'_, str> {
        "Lrn".into()
    }
}

impl EvalOp for Lrn {
    fn eval(&self, mut inputs: TVec<Arc<Tensor>>) -> LrnResult<TVec<Arc<Tensor>>> {
        let input = args_1!(inputs);
        Ok(tvec!(self.normalize(&input)?.into_arc_tensor()))
    }
}

impl GradOp for Lrn {
    fn grad(
        &self,
        inputs: &[Arc<Tensor>],
        _outputs: &[Arc<Tensor>],
        mut output_grads: TVec<Arc<Tensor>>,
    ) -> LrnResult<TVec<Arc<Tensor>>> {
        ensure!(inputs.len() == 1, "Lrn expects 1 input, got {}", inputs.len());
        let dy = args_1!(output_grads);
        LrnGrad::new(self.clone()).eval(tvec!(inputs[0].clone(), dy))
    }
}

/// The loosely typed kernel boundary: validates `radius` and `region` before
/// running an `Lrn` over `x`.
pub fn normalize(
    x: &Tensor,
    radius: f64,
    bias: f64,
    alpha: f64,
    beta: f64,
    region: &str,
) -> LrnResult<Tensor> {
    let radius = radius_from_f64(radius)?;
    let region = region.parse::<LrnRegion>()?;
    Lrn::new(radius, bias, alpha, beta, region).normalize(x)
}

pub(crate) fn scalar<T: Datum>(name: &str, value: f64) -> LrnResult<T> {
    <T as num_traits::NumCast>::from(value)
        .with_context(|| format!("Can not represent {name}={value} as {}", T::name()))
}

/// Geometry of the normalization window in a NHWC buffer.
///
/// Windows are symmetric: `i` is in the window of `k` if and only if `k` is
/// in the window of `i`.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Window {
    radius: usize,
    region: LrnRegion,
    h: usize,
    w: usize,
    c: usize,
}

impl Window {
    pub(crate) fn new(radius: usize, region: LrnRegion, shape: &DataShape) -> Window {
        Window { radius, region, h: shape.h(), w: shape.w(), c: shape.c() }
    }

    /// Calls `f` with the buffer offset of every element in the window of
    /// the element at (`pixel`, `channel`), `pixel` being the flattened
    /// (n, h, w) index.
    #[inline]
    pub(crate) fn for_each<F: FnMut(usize)>(&self, pixel: usize, channel: usize, mut f: F) {
        let r = self.radius;
        match self.region {
            LrnRegion::AcrossChannels => {
                let base = pixel * self.c;
                let lo = channel.saturating_sub(r);
                let hi = channel.saturating_add(r).min(self.c - 1);
                (lo..=hi).for_each(|cc| f(base + cc));
            }
            LrnRegion::WithinChannel => {
                let n = pixel / (self.h * self.w);
                let y = (pixel / self.w) % self.h;
                let x = pixel % self.w;
                let (y0, y1) = (y.saturating_sub(r), y.saturating_add(r).min(self.h - 1));
                let (x0, x1) = (x.saturating_sub(r), x.saturating_add(r).min(self.w - 1));
                for yy in y0..=y1 {
                    let row = (n * self.h + yy) * self.w;
                    for xx in x0..=x1 {
                        f((row + xx) * self.c + channel)
                    }
                }
            }
        }
    }

    #[inline]
    pub(crate) fn sum_of_squares<T: Datum>(&self, x: &[T], pixel: usize, channel: usize) -> T {
        let mut sum = T::zero();
        self.for_each(pixel, channel, |ix| sum = sum + x[ix] * x[ix]);
        sum
    }
}
