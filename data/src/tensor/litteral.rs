use super::Tensor;
use crate::datum::Datum;
use ndarray::*;

pub fn arr4<A: Clone, const N: usize, const M: usize, const K: usize>(
    xs: &[[[[A; K]; M]; N]],
) -> Array4<A> {
    let data = xs.iter().flatten().flatten().flatten().cloned().collect::<Vec<_>>();
    Array4::from_shape_vec((xs.len(), N, M, K), data)
        .expect("nested fixed size arrays are always rectangular")
}

pub fn tensor0<A: Datum>(x: A) -> Tensor {
    Tensor::from(arr0(x))
}

pub fn tensor1<A: Datum>(xs: &[A]) -> Tensor {
    Tensor::from(arr1(xs))
}

pub fn tensor2<A: Datum, const N: usize>(xs: &[[A; N]]) -> Tensor {
    Tensor::from(arr2(xs))
}

pub fn tensor3<A: Datum, const N: usize, const M: usize>(xs: &[[[A; M]; N]]) -> Tensor {
    Tensor::from(arr3(xs))
}

pub fn tensor4<A: Datum, const N: usize, const M: usize, const K: usize>(
    xs: &[[[[A; K]; M]; N]],
) -> Tensor {
    Tensor::from(arr4(xs))
}
