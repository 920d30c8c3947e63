use std::io::BufWriter;
use std::path::Path;

use lrnorm_core::internal::*;
use ndarray_npy::{ReadNpyExt, WriteNpyExt};

use crate::CliResult;

/// Read a `f32` or `f64` npy file into a tensor.
pub fn load(path: impl AsRef<Path>) -> CliResult<Tensor> {
    let path = path.as_ref();
    let bytes = fs_err::read(path)?;
    if let Ok(array) = lrnorm_ndarray::ArrayD::<f32>::read_npy(&*bytes) {
        return Ok(array.into_tensor());
    }
    let array = lrnorm_ndarray::ArrayD::<f64>::read_npy(&*bytes)
        .with_context(|| format!("Reading {path:?} as a f32 or f64 npy"))?;
    Ok(array.into_tensor())
}

pub fn save(tensor: &Tensor, path: impl AsRef<Path>) -> CliResult<()> {
    let path = path.as_ref();
    let writer = BufWriter::new(fs_err::File::create(path)?);
    let written = match tensor.datum_type() {
        DatumType::F32 => tensor.to_array_view::<f32>()?.write_npy(writer),
        DatumType::F64 => tensor.to_array_view::<f64>()?.write_npy(writer),
        dt => bail!("Can not write {dt} tensors as npy"),
    };
    written.with_context(|| format!("Writing {path:?}"))
}
