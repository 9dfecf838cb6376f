//! Channel reduction and singleton-axis removal

use super::{Image, PixelData};
use crate::error::{Error, Result};
use tracing::debug;

/// Collapse a multi-component image to its first component
///
/// Replicated grayscale (e.g. RGB with equal channels) is the only accepted
/// multi-component input; any component differing from the first one is a
/// corrupted or mis-tagged file.
///
/// # Errors
///
/// Returns [`Error::DataIntegrity`] naming the first divergent component
pub fn reduce_channels(image: &Image) -> Result<Image> {
    let components = image.num_components();
    if components == 1 {
        return Ok(image.clone());
    }

    let data = match image.data() {
        PixelData::UInt8(v) => PixelData::UInt8(first_component(v, components, |a, b| a == b)?),
        PixelData::UInt16(v) => PixelData::UInt16(first_component(v, components, |a, b| a == b)?),
        PixelData::Float32(v) => {
            PixelData::Float32(first_component(v, components, |a, b| a.to_bits() == b.to_bits())?)
        }
    };
    debug!(components, "Reduced identical channels to one");

    Ok(Image::with_parts(
        data,
        image.shape().to_vec(),
        1,
        image.spacing().to_vec(),
        image.origin().to_vec(),
        image.direction().to_vec(),
    ))
}

fn first_component<T: Copy>(
    samples: &[T],
    components: usize,
    same: impl Fn(&T, &T) -> bool,
) -> Result<Vec<T>> {
    for index in 1..components {
        let diverges = samples
            .chunks_exact(components)
            .any(|pixel| !same(&pixel[index], &pixel[0]));
        if diverges {
            return Err(Error::DataIntegrity { index });
        }
    }
    Ok(samples.chunks_exact(components).map(|pixel| pixel[0]).collect())
}

/// Drop the first axis with extent 1
///
/// Only one axis is removed per call. 1-D images are returned unchanged.
#[must_use]
pub fn squeeze_singletons(image: &Image) -> Image {
    let dimension = image.dimension();
    if dimension < 2 {
        return image.clone();
    }
    let Some(axis) = image.shape().iter().position(|&extent| extent == 1) else {
        return image.clone();
    };

    let keep = |values: &[f64]| -> Vec<f64> {
        values
            .iter()
            .enumerate()
            .filter(|&(i, _)| i != axis)
            .map(|(_, &v)| v)
            .collect()
    };
    let shape = image
        .shape()
        .iter()
        .enumerate()
        .filter(|&(i, _)| i != axis)
        .map(|(_, &e)| e)
        .collect::<Vec<_>>();
    let direction = image
        .direction()
        .iter()
        .enumerate()
        .filter(|&(i, _)| i / dimension != axis && i % dimension != axis)
        .map(|(_, &v)| v)
        .collect();
    debug!(axis, ?shape, "Removed singleton axis");

    // An extent-1 axis contributes nothing to the linear index, so the buffer is reused as is
    Image::with_parts(
        image.data().clone(),
        shape,
        image.num_components(),
        keep(image.spacing()),
        keep(image.origin()),
        direction,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn rgb(pixels: &[[u8; 3]], shape: &[usize]) -> Image {
        let data = pixels.iter().flatten().copied().collect();
        Image::new(PixelData::UInt8(data), shape.to_vec(), 3).unwrap()
    }

    #[test]
    fn test_single_channel_is_identity() {
        let image = Image::from_samples(PixelData::UInt16(vec![1, 2, 3, 4]), &[2, 2]).unwrap();
        assert_eq!(reduce_channels(&image).unwrap(), image);
    }

    #[test]
    fn test_identical_channels_reduce_to_first() {
        let image = rgb(&[[10, 10, 10], [20, 20, 20], [30, 30, 30], [40, 40, 40]], &[2, 2]);
        let gray = reduce_channels(&image).unwrap();
        assert_eq!(gray.num_components(), 1);
        assert_eq!(gray.shape(), &[2, 2]);
        assert_eq!(gray.data(), &PixelData::UInt8(vec![10, 20, 30, 40]));
    }

    #[test]
    fn test_divergent_channel_is_reported() {
        let image = rgb(&[[10, 10, 10], [20, 20, 21]], &[2]);
        assert_matches!(reduce_channels(&image), Err(Error::DataIntegrity { index: 2 }));

        let image = rgb(&[[10, 11, 10], [20, 20, 20]], &[2]);
        assert_matches!(reduce_channels(&image), Err(Error::DataIntegrity { index: 1 }));
    }

    #[test]
    fn test_float_channels_compare_bitwise() {
        let data = PixelData::Float32(vec![0.0, -0.0, 1.0, 1.0]);
        let image = Image::new(data, vec![2], 2).unwrap();
        assert_matches!(reduce_channels(&image), Err(Error::DataIntegrity { index: 1 }));
    }

    #[test]
    fn test_squeeze_without_singleton_is_identity() {
        let image = Image::from_samples(PixelData::UInt8(vec![0; 6]), &[2, 3]).unwrap();
        assert_eq!(squeeze_singletons(&image), image);
    }

    #[test]
    fn test_squeeze_removes_one_axis() {
        let image = Image::from_samples(PixelData::UInt8((0..6).collect()), &[3, 2, 1])
            .unwrap()
            .with_geometry(
                vec![0.5, 0.7, 2.5],
                vec![1.0, 2.0, 3.0],
                vec![1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0],
            )
            .unwrap();
        let squeezed = squeeze_singletons(&image);
        assert_eq!(squeezed.shape(), &[3, 2]);
        assert_eq!(squeezed.dimension(), 2);
        assert_eq!(squeezed.spacing(), &[0.5, 0.7]);
        assert_eq!(squeezed.origin(), &[1.0, 2.0]);
        assert_eq!(squeezed.direction(), &[1.0, 0.0, 0.0, 1.0]);
        assert_eq!(squeezed.data(), image.data());
    }

    #[test]
    fn test_squeeze_removes_only_first_singleton() {
        let image = Image::from_samples(PixelData::UInt8(vec![0; 4]), &[4, 1, 1]).unwrap();
        assert_eq!(squeeze_singletons(&image).shape(), &[4, 1]);
    }

    #[test]
    fn test_squeeze_leaves_one_dimensional_image() {
        let image = Image::from_samples(PixelData::UInt8(vec![9]), &[1]).unwrap();
        assert_eq!(squeeze_singletons(&image), image);
    }
}
