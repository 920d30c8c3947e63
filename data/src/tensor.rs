//! `Tensor`, the main data object of interest.
use crate::datum::{Datum, DatumType};
use half::f16;
use itertools::Itertools;
use ndarray::prelude::*;
use std::fmt;
use std::sync::Arc;

pub mod litteral;

/// Typed backing array of a `Tensor`.
///
/// Arrays stored here are always in standard (row-major) layout, so the
/// logical coordinates of an element and its offset in `as_slice` agree.
#[doc(hidden)]
#[derive(Clone, PartialEq, Debug)]
pub enum Storage {
    F16(ArrayD<f16>),
    F32(ArrayD<f32>),
    F64(ArrayD<f64>),
}

macro_rules! with_array {
    ($storage:expr, |$a:ident| $body:expr) => {
        match $storage {
            Storage::F16($a) => $body,
            Storage::F32($a) => $body,
            Storage::F64($a) => $body,
        }
    };
}

macro_rules! map_array {
    ($storage:expr, |$a:ident| $body:expr) => {
        match $storage {
            Storage::F16($a) => Storage::F16($body),
            Storage::F32($a) => Storage::F32($body),
            Storage::F64($a) => Storage::F64($body),
        }
    };
}

/// How strict a tensor comparison should be.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum Approximation {
    Exact,
    #[default]
    Close,
    Approximate,
}

impl Approximation {
    /// Absolute and relative tolerances for a given datum type.
    pub fn atol_and_rtol(&self, dt: DatumType) -> (f64, f64) {
        use Approximation::*;
        use DatumType::*;
        match (self, dt) {
            (Exact, _) => (0.0, 0.0),
            (Close, F16) => (1e-3, 1e-3),
            (Close, F32) => (1e-7, 1e-6),
            (Close, F64) => (1e-14, 1e-12),
            (Approximate, F16) => (1e-3, 5e-3),
            (Approximate, F32) => (5e-5, 1e-4),
            (Approximate, F64) => (1e-10, 1e-8),
        }
    }
}

/// Dense, immutable, rectangular array of floating point values.
#[derive(Clone, PartialEq)]
pub struct Tensor {
    storage: Storage,
}

impl Tensor {
    /// Build a tensor from a shape and a flat row-major buffer.
    pub fn from_shape<T: Datum>(shape: &[usize], data: Vec<T>) -> anyhow::Result<Tensor> {
        let array = ArrayD::from_shape_vec(shape, data)?;
        Ok(Tensor { storage: T::wrap(array) })
    }

    /// A tensor of the given shape, filled with zeroes.
    pub fn zero<T: Datum>(shape: &[usize]) -> Tensor {
        Tensor { storage: T::wrap(ArrayD::from_elem(shape, T::zero())) }
    }

    pub fn datum_type(&self) -> DatumType {
        match self.storage {
            Storage::F16(_) => DatumType::F16,
            Storage::F32(_) => DatumType::F32,
            Storage::F64(_) => DatumType::F64,
        }
    }

    pub fn shape(&self) -> &[usize] {
        with_array!(&self.storage, |a| a.shape())
    }

    pub fn rank(&self) -> usize {
        self.shape().len()
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        with_array!(&self.storage, |a| a.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check_for_access<D: Datum>(&self) -> anyhow::Result<()> {
        if self.datum_type() != D::datum_type() {
            anyhow::bail!(
                "Tensor datum type error: tensor is {:?}, accessed as {:?}",
                self.datum_type(),
                D::datum_type(),
            );
        }
        Ok(())
    }

    /// Access the data as a `ndarray::ArrayView`.
    pub fn to_array_view<D: Datum>(&self) -> anyhow::Result<ArrayViewD<'_, D>> {
        self.check_for_access::<D>()?;
        match D::peek(&self.storage) {
            Some(array) => Ok(array.view()),
            None => anyhow::bail!("Inconsistent storage for {:?}", self.datum_type()),
        }
    }

    /// Access the data as a flat slice, in row-major order.
    pub fn as_slice<D: Datum>(&self) -> anyhow::Result<&[D]> {
        self.check_for_access::<D>()?;
        D::peek(&self.storage)
            .and_then(|a| a.as_slice())
            .ok_or_else(|| anyhow::format_err!("Tensor is not contiguous"))
    }

    /// Insert a new axis of size 1. Only metadata is touched.
    pub fn insert_axis(self, axis: usize) -> anyhow::Result<Tensor> {
        anyhow::ensure!(
            axis <= self.rank(),
            "Can not insert axis {} in a tensor of rank {}",
            axis,
            self.rank()
        );
        Ok(Tensor { storage: map_array!(self.storage, |a| a.insert_axis(Axis(axis))) })
    }

    /// Remove an axis of size 1. Only metadata is touched.
    pub fn remove_axis(self, axis: usize) -> anyhow::Result<Tensor> {
        anyhow::ensure!(
            self.shape().get(axis) == Some(&1),
            "Can not remove axis {} from a tensor of shape {:?}",
            axis,
            self.shape()
        );
        Ok(Tensor { storage: map_array!(self.storage, |a| a.index_axis_move(Axis(axis), 0)) })
    }

    fn to_f64_array(&self) -> ArrayD<f64> {
        match &self.storage {
            Storage::F16(a) => a.mapv(|x| x.to_f64()),
            Storage::F32(a) => a.mapv(|x| x as f64),
            Storage::F64(a) => a.clone(),
        }
    }

    /// Compare two tensors, allowing for rounding errors.
    ///
    /// NaNs compare equal to NaNs, and infinities to infinities of the same
    /// sign.
    pub fn close_enough(&self, other: &Self, approx: Approximation) -> anyhow::Result<()> {
        if self.shape() != other.shape() {
            anyhow::bail!("Shape mismatch {:?} != {:?}", self.shape(), other.shape())
        }
        if self.datum_type() != other.datum_type() {
            anyhow::bail!("Datum type mismatch {:?} != {:?}", self.datum_type(), other.datum_type())
        }
        let (atol, rtol) = approx.atol_and_rtol(self.datum_type());
        let ma = self.to_f64_array();
        let mb = other.to_f64_array();
        ma.indexed_iter().zip(mb.iter()).try_for_each(|((indices, &a), &b)| {
            if !((a.is_nan() && b.is_nan())
                || (a.is_infinite() && b.is_infinite() && a.signum() == b.signum())
                || (a - b).abs() <= atol + rtol * b.abs())
            {
                anyhow::bail!("Mismatch at {:?} {} != {}", indices.slice(), a, b)
            }
            Ok(())
        })
    }

    /// Dump the tensor in a human readable form.
    ///
    /// `force_full` will force the tensor to be dump in full even if it is big.
    pub fn dump(&self, force_full: bool) -> String {
        let trunc = self.len() > 12 && !force_full;
        let n = if trunc { 12 } else { self.len() };
        let data = with_array!(&self.storage, |a| a.iter().take(n).join(", "));
        format!(
            "{},{:?} {}{}",
            self.shape().iter().join(","),
            self.datum_type(),
            data,
            if trunc { "..." } else { "" }
        )
    }
}

impl fmt::Debug for Tensor {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.dump(false))
    }
}

/// Convenient conversion to Tensor.
pub trait IntoTensor: Sized {
    /// Convert Self to a Tensor.
    fn into_tensor(self) -> Tensor;
}

impl<T: Into<Tensor>> IntoTensor for T {
    fn into_tensor(self) -> Tensor {
        self.into()
    }
}

/// Convenient conversion to Arc<Tensor>.
pub trait IntoArcTensor: Sized {
    /// Convert Self to a Arc<Tensor>.
    fn into_arc_tensor(self) -> Arc<Tensor>;
}

impl<T: IntoTensor> IntoArcTensor for T {
    fn into_arc_tensor(self) -> Arc<Tensor> {
        Arc::new(self.into_tensor())
    }
}

impl<T: Datum, D: Dimension> From<Array<T, D>> for Tensor {
    fn from(it: Array<T, D>) -> Tensor {
        let it = it.into_dyn();
        let it = if it.is_standard_layout() { it } else { it.as_standard_layout().into_owned() };
        Tensor { storage: T::wrap(it) }
    }
}
