mod data_formats;
mod local_response_norm;
mod lrn;
mod lrn_grad;

pub use self::data_formats::{DataFormat, DataShape};
pub use self::local_response_norm::{
    local_response_normalization, local_response_normalization_grad, LrnArgs, LrnInput,
};
pub use self::lrn::{normalize, radius_from_f64, Lrn, LrnRegion};
pub use self::lrn_grad::LrnGrad;
