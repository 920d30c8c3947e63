use crate::internal::*;

/// Axes layout of an image-like tensor. Channels are always innermost.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
pub enum DataFormat {
    #[default]
    NHWC,
    HWC,
}

impl DataFormat {
    pub fn has_n(&self) -> bool {
        *self == DataFormat::NHWC
    }

    pub fn rank(&self) -> usize {
        3 + self.has_n() as usize
    }

    /// Interpret `shape` in this format, failing with `InvalidArgument` if
    /// its rank does not match.
    pub fn shape(&self, shape: impl AsRef<[usize]>) -> LrnResult<DataShape> {
        let shape: TVec<usize> = shape.as_ref().into();
        if shape.len() != self.rank() {
            let expected: &'static [usize] = if self.has_n() { &[4] } else { &[3] };
            bail!(InvalidArgument::Rank { expected, got: shape.len() });
        }
        Ok(DataShape { fmt: *self, shape })
    }
}

/// A shape together with its format.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DataShape {
    pub fmt: DataFormat,
    pub shape: TVec<usize>,
}

impl DataShape {
    #[inline]
    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    #[inline]
    pub fn h_axis(&self) -> usize {
        self.fmt.has_n() as usize
    }

    #[inline]
    pub fn w_axis(&self) -> usize {
        self.h_axis() + 1
    }

    #[inline]
    pub fn c_axis(&self) -> usize {
        self.rank() - 1
    }

    #[inline]
    pub fn h(&self) -> usize {
        self.shape[self.h_axis()]
    }

    #[inline]
    pub fn w(&self) -> usize {
        self.shape[self.w_axis()]
    }

    #[inline]
    pub fn c(&self) -> usize {
        self.shape[self.c_axis()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nhwc_accessors() {
        let s = DataFormat::NHWC.shape([2, 3, 5, 7]).unwrap();
        assert_eq!((s.h(), s.w(), s.c()), (3, 5, 7));
        assert_eq!((s.h_axis(), s.w_axis(), s.c_axis()), (1, 2, 3));
    }

    #[test]
    fn hwc_has_implicit_batch() {
        let s = DataFormat::HWC.shape([3, 5, 7]).unwrap();
        assert_eq!((s.h(), s.w(), s.c()), (3, 5, 7));
        assert_eq!((s.h_axis(), s.w_axis(), s.c_axis()), (0, 1, 2));
    }

    #[test]
    fn wrong_rank_is_invalid_argument() {
        let e = DataFormat::NHWC.shape([3, 3]).unwrap_err();
        assert_eq!(
            e.downcast_ref::<InvalidArgument>(),
            Some(&InvalidArgument::Rank { expected: &[4], got: 2 })
        );
    }
}
