//! Conversion of a finished image into a channel-first float tensor

use crate::error::{Error, Result};
use crate::image::Image;

/// `[1, rows, columns]` array with samples scaled into `[0, 1]`
#[cfg(feature = "tensor")]
pub type Tensor = ndarray::Array3<f32>;

/// Scale a single-channel 8- or 16-bit 2-D image by `2^bits - 1` into a channel-first array
///
/// # Errors
///
/// - [`Error::UnsupportedType`] for float images
/// - [`Error::Configuration`] for multi-channel or non-2-D images
#[cfg(feature = "tensor")]
pub fn to_tensor(image: &Image) -> Result<Tensor> {
    let bit_depth = image.pixel_type().bit_depth()?;
    if image.num_components() != 1 {
        return Err(Error::Configuration(format!(
            "expected a single-channel image, got {} components",
            image.num_components()
        )));
    }
    let &[columns, rows] = image.shape() else {
        return Err(Error::Configuration(format!(
            "expected a 2-D image, got shape {:?}",
            image.shape()
        )));
    };

    let scale = bit_depth.max_value() as f32;
    let values = image.data().to_f32_vec().into_iter().map(|v| v / scale).collect();
    ndarray::Array3::from_shape_vec((1, rows, columns), values)
        .map_err(|e| Error::Configuration(format!("cannot shape tensor: {e}")))
}

/// Tensor support was compiled out
///
/// # Errors
///
/// Always [`Error::Unavailable`]
#[cfg(not(feature = "tensor"))]
pub fn to_tensor(_image: &Image) -> Result<()> {
    Err(Error::Unavailable(
        "tensor conversion requires the \"tensor\" feature".to_string(),
    ))
}
