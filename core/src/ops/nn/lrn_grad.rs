use crate::executor::current_executor;
use crate::internal::*;
use crate::ops::nn::lrn::{scalar, Window};
use crate::ops::nn::{DataFormat, DataShape};

/// Gradient of `Lrn` with respect to its input.
///
/// With `D_k = bias + alpha * sum_sq_k`:
///
/// `dx_k = dy_k * D_k^-beta - 2 * alpha * beta * x_k * sum(dy_i * x_i * D_i^(-beta-1))`
///
/// the sum running over the window of `k`, which is also the set of
/// elements whose window contains `k`.
#[derive(Debug, Clone, new, PartialEq)]
pub struct LrnGrad {
    pub lrn: Lrn,
}

impl LrnGrad {
    pub fn backward(&self, input: &Tensor, output_grad: &Tensor) -> LrnResult<Tensor> {
        self.lrn.validate()?;
        let shape = DataFormat::NHWC.shape(input.shape())?;
        if output_grad.shape() != input.shape() {
            bail!(InvalidArgument::ShapeMismatch {
                expected: input.shape().into(),
                got: output_grad.shape().into(),
            })
        }
        if output_grad.datum_type() != input.datum_type() {
            bail!(InvalidArgument::DatumTypeMismatch {
                expected: input.datum_type(),
                got: output_grad.datum_type(),
            })
        }
        debug!("{} {:?} on {:?}", self.name(), self.lrn, input.shape());
        dispatch_floatlike!(Self::eval_t(input.datum_type())(self, input, output_grad, &shape))
    }

    fn eval_t<T: Datum>(
        &self,
        input: &Tensor,
        output_grad: &Tensor,
        shape: &DataShape,
    ) -> LrnResult<Tensor> {
        let x = input.as_slice::<T>()?;
        let dy = output_grad.as_slice::<T>()?;
        let bias: T = scalar("bias", self.lrn.bias)?;
        let alpha: T = scalar("alpha", self.lrn.alpha)?;
        let beta: T = scalar("beta", self.lrn.beta)?;
        let two = T::one() + T::one();
        let window = Window::new(self.lrn.radius, self.lrn.region, shape);
        let c = shape.c();
        let executor = current_executor();

        let mut norm = vec![T::zero(); x.len()];
        executor.for_each_chunk_mut(&mut norm, c, |pixel, out| {
            for (channel, o) in out.iter_mut().enumerate() {
                *o = bias + alpha * window.sum_of_squares(x, pixel, channel);
            }
        });

        // dy_i * x_i * D_i^(-beta-1), shared by every window containing i
        let mut scaled = vec![T::zero(); x.len()];
        executor.for_each_chunk_mut(&mut scaled, c, |pixel, out| {
            for (channel, o) in out.iter_mut().enumerate() {
                let ix = pixel * c + channel;
                *o = dy[ix] * x[ix] * norm[ix].powf(-beta - T::one());
            }
        });

        let mut dx = vec![T::zero(); x.len()];
        executor.for_each_chunk_mut(&mut dx, c, |pixel, out| {
            for (channel, o) in out.iter_mut().enumerate() {
                let k = pixel * c + channel;
                let mut acc = T::zero();
                window.for_each(pixel, channel, |i| acc = acc + scaled[i]);
                *o = dy[k] * norm[k].powf(-beta) - two * alpha * beta * x[k] * acc;
            }
        });
        Tensor::from_shape(input.shape(), dx)
    }
}

impl Op for LrnGrad {
    fn name(&self) -> Cow<'_, str> {
        "LrnGrad".into()
    }
}

impl EvalOp for LrnGrad {
    fn eval(&self, mut inputs: TVec<Arc<Tensor>>) -> LrnResult<TVec<Arc<Tensor>>> {
        let (input, output_grad) = args_2!(inputs);
        Ok(tvec!(self.backward(&input, &output_grad)?.into_arc_tensor()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::collection::vec;
    use proptest::prelude::*;

    /// Gradient of `sum(dy * lrn(x))` by central finite differences.
    fn numerical_grad(lrn: &Lrn, x: &Tensor, dy: &Tensor) -> Tensor {
        let eps = 1e-6;
        let dy = dy.as_slice::<f64>().unwrap();
        let loss = |x: &Tensor| -> f64 {
            let y = lrn.normalize(x).unwrap();
            y.as_slice::<f64>().unwrap().iter().zip(dy).map(|(y, dy)| y * dy).sum()
        };
        let data = x.as_slice::<f64>().unwrap().to_vec();
        let grad = (0..data.len())
            .map(|i| {
                let mut plus = data.clone();
                plus[i] += eps;
                let mut minus = data.clone();
                minus[i] -= eps;
                let plus = Tensor::from_shape(x.shape(), plus).unwrap();
                let minus = Tensor::from_shape(x.shape(), minus).unwrap();
                (loss(&plus) - loss(&minus)) / (2.0 * eps)
            })
            .collect();
        Tensor::from_shape(x.shape(), grad).unwrap()
    }

    fn check(lrn: Lrn, shape: &[usize], x: Vec<f64>, dy: Vec<f64>) -> LrnResult<()> {
        let x = Tensor::from_shape(shape, x)?;
        let dy = Tensor::from_shape(shape, dy)?;
        let found = LrnGrad::new(lrn.clone()).backward(&x, &dy)?;
        let expected = numerical_grad(&lrn, &x, &dy);
        for (f, e) in found.as_slice::<f64>()?.iter().zip(expected.as_slice::<f64>()?) {
            ensure!((f - e).abs() <= 1e-6 + 1e-5 * e.abs(), "{found:?} != {expected:?}");
        }
        Ok(())
    }

    #[test]
    fn across_channels_matches_finite_differences() {
        let lrn = Lrn::new(1, 1.0, 1.0, 0.5, LrnRegion::AcrossChannels);
        check(lrn, &[1, 1, 1, 3], vec![1., 2., 3.], vec![1., 1., 1.]).unwrap();
    }

    #[test]
    fn within_channel_matches_finite_differences() {
        let lrn = Lrn::new(1, 2.0, 0.3, 0.75, LrnRegion::WithinChannel);
        let x = (0..18).map(|i| (i as f64 - 9.0) / 4.0).collect();
        let dy = (0..18).map(|i| ((i * 7) % 5) as f64 - 2.0).collect();
        check(lrn, &[1, 3, 3, 2], x, dy).unwrap();
    }

    #[test]
    fn radius_zero_alpha_zero_is_scaling() {
        let lrn = Lrn::new(0, 4.0, 0.0, 0.5, LrnRegion::AcrossChannels);
        let x = tensor4(&[[[[1f32, -2.]]]]);
        let dy = tensor4(&[[[[3f32, 5.]]]]);
        let dx = LrnGrad::new(lrn).backward(&x, &dy).unwrap();
        dx.close_enough(&tensor4(&[[[[1.5f32, 2.5]]]]), Approximation::Close).unwrap();
    }

    #[test]
    fn mismatched_output_grad_is_invalid() {
        let grad = LrnGrad::new(Lrn::new(1, 1.0, 1.0, 0.5, LrnRegion::AcrossChannels));
        let x = tensor4(&[[[[1f32, 2., 3.]]]]);
        let e = grad.backward(&x, &tensor4(&[[[[1f32, 2.]]]])).unwrap_err();
        assert!(matches!(
            e.downcast_ref::<InvalidArgument>(),
            Some(InvalidArgument::ShapeMismatch { .. })
        ));
        let e = grad.backward(&x, &tensor4(&[[[[1f64, 2., 3.]]]])).unwrap_err();
        assert!(matches!(
            e.downcast_ref::<InvalidArgument>(),
            Some(InvalidArgument::DatumTypeMismatch { .. })
        ));
    }

    fn shape_and_data() -> BoxedStrategy<(Vec<usize>, Vec<f64>, Vec<f64>)> {
        (1usize..3, 1usize..4, 1usize..4, 1usize..5)
            .prop_flat_map(|(n, h, w, c)| {
                let len = n * h * w * c;
                let x = vec(-2.0f64..2.0, len..=len);
                let dy = vec(-1.0f64..1.0, len..=len);
                (Just(vec![n, h, w, c]), x, dy)
            })
            .boxed()
    }

    proptest::proptest! {
        #![proptest_config(ProptestConfig::with_cases(30))]
        #[test]
        fn prop_grad(
            (shape, x, dy) in shape_and_data(),
            radius in 0usize..3,
            alpha in 0.0f64..1.0,
            beta in 0.25f64..1.0,
            within in any::<bool>(),
        ) {
            let region = if within { LrnRegion::WithinChannel } else { LrnRegion::AcrossChannels };
            check(Lrn::new(radius, 1.0, alpha, beta, region), &shape, x, dy).unwrap()
        }
    }
}
