//! DICOM reading
//!
//! A file becomes a 3-D image `[columns, rows, frames]` with one component per
//! sample. Unsigned data without a modality rescale keeps its stored type;
//! everything else is converted to float with the rescale applied.

use crate::error::{Error, Result};
use crate::image::{Image, PixelData};
use dicom::dictionary_std::tags;
use dicom::object::{FileDicomObject, InMemDicomObject, StandardDataDictionary, open_file};
use dicom::pixeldata::PixelDecoder;
use std::path::Path;
use tracing::debug;

type DicomFile = FileDicomObject<InMemDicomObject<StandardDataDictionary>>;

/// Attributes needed to lay out the pixel buffer
#[derive(Debug, Clone, PartialEq)]
struct Header {
    rows: usize,
    columns: usize,
    frames: usize,
    samples_per_pixel: usize,
    bits_allocated: u16,
    bits_stored: u16,
    signed: bool,
    planar: bool,
    slope: f64,
    intercept: f64,
}

impl Header {
    fn has_rescale(&self) -> bool {
        self.slope != 1.0 || self.intercept != 0.0
    }
}

/// Load a DICOM file with its in-plane geometry
///
/// # Errors
///
/// Returns [`Error::Dicom`] if the file cannot be parsed, lacks the image
/// attributes, or stores pixel data with an unsupported layout
pub fn read_dicom(path: &Path) -> Result<Image> {
    let fail = |message: String| Error::Dicom {
        path: path.to_path_buf(),
        message,
    };
    let obj = open_file(path).map_err(|e| fail(e.to_string()))?;
    let header = extract_header(&obj).map_err(fail)?;
    let bytes = extract_pixel_bytes(&obj, &header).map_err(fail)?;
    let data = to_pixel_data(&bytes, &header).map_err(fail)?;

    let shape = vec![header.columns, header.rows, header.frames];
    debug!(
        path = %path.display(),
        ?shape,
        bits_allocated = header.bits_allocated,
        bits_stored = header.bits_stored,
        signed = header.signed,
        slope = header.slope,
        intercept = header.intercept,
        "Decoded DICOM"
    );

    Image::new(data, shape, header.samples_per_pixel)?.with_geometry(
        extract_spacing(&obj),
        extract_origin(&obj),
        extract_direction(&obj),
    )
}

/// True when `bytes` start with the 128-byte preamble followed by `DICM`
#[inline]
#[must_use]
pub fn has_dicom_preamble(bytes: &[u8]) -> bool {
    bytes.get(128..132) == Some(b"DICM".as_slice())
}

fn required_u16(obj: &DicomFile, tag: dicom::core::Tag, name: &str) -> std::result::Result<u16, String> {
    obj.get(tag)
        .and_then(|e| e.to_int::<u16>().ok())
        .ok_or_else(|| format!("Missing or invalid {name} tag"))
}

fn extract_header(obj: &DicomFile) -> std::result::Result<Header, String> {
    let rows = required_u16(obj, tags::ROWS, "Rows")?;
    let columns = required_u16(obj, tags::COLUMNS, "Columns")?;
    let bits_allocated = required_u16(obj, tags::BITS_ALLOCATED, "Bits Allocated")?;

    let frames = obj
        .get(tags::NUMBER_OF_FRAMES)
        .and_then(|e| e.to_int::<u32>().ok())
        .unwrap_or(1)
        .max(1);
    let samples_per_pixel = obj
        .get(tags::SAMPLES_PER_PIXEL)
        .and_then(|e| e.to_int::<u16>().ok())
        .unwrap_or(1)
        .max(1);
    let signed = obj
        .get(tags::PIXEL_REPRESENTATION)
        .and_then(|e| e.to_int::<u16>().ok())
        .is_some_and(|r| r == 1);
    let planar = obj
        .get(tags::PLANAR_CONFIGURATION)
        .and_then(|e| e.to_int::<u16>().ok())
        .is_some_and(|p| p == 1);
    // Optional; mostly present for CT/PET
    let slope = obj
        .get(tags::RESCALE_SLOPE)
        .and_then(|e| e.to_float64().ok())
        .unwrap_or(1.0);
    let intercept = obj
        .get(tags::RESCALE_INTERCEPT)
        .and_then(|e| e.to_float64().ok())
        .unwrap_or(0.0);

    if !matches!(bits_allocated, 8 | 16) {
        return Err(format!("Unsupported Bits Allocated {bits_allocated} (expected 8 or 16)"));
    }
    let bits_stored = obj
        .get(tags::BITS_STORED)
        .and_then(|e| e.to_int::<u16>().ok())
        .unwrap_or(bits_allocated);
    if bits_stored == 0 || bits_stored > bits_allocated {
        return Err(format!(
            "Invalid Bits Stored {bits_stored} for Bits Allocated {bits_allocated}"
        ));
    }

    Ok(Header {
        rows: usize::from(rows),
        columns: usize::from(columns),
        frames: frames as usize,
        samples_per_pixel: usize::from(samples_per_pixel),
        bits_allocated,
        bits_stored,
        signed,
        planar,
        slope,
        intercept,
    })
}

/// Little-endian pixel bytes, decompressed if needed
fn extract_pixel_bytes(obj: &DicomFile, header: &Header) -> std::result::Result<Vec<u8>, String> {
    #[allow(deprecated)]
    use dicom::dictionary_std::uids::EXPLICIT_VR_BIG_ENDIAN;

    let is_big_endian = obj.meta().transfer_syntax() == EXPLICIT_VR_BIG_ENDIAN;
    if header.bits_allocated == 16 && is_big_endian {
        let raw = obj
            .get(tags::PIXEL_DATA)
            .ok_or("Missing pixel data")?
            .to_bytes()
            .map_err(|e| format!("Failed to get raw pixel data bytes: {e}"))?;
        if !raw.len().is_multiple_of(2) {
            return Err("Invalid 16-bit pixel data length".to_string());
        }
        return Ok(raw
            .chunks_exact(2)
            .flat_map(|chunk| u16::from_be_bytes([chunk[0], chunk[1]]).to_le_bytes())
            .collect());
    }

    let decoded = obj
        .decode_pixel_data()
        .map_err(|e| format!("Failed to decode pixel data: {e}"))?;
    // Raw stored values; modality LUT is applied below
    Ok(decoded.data().to_vec())
}

fn to_pixel_data(bytes: &[u8], header: &Header) -> std::result::Result<PixelData, String> {
    let bytes_per_sample = usize::from(header.bits_allocated / 8);
    let expected = header.rows * header.columns * header.frames * header.samples_per_pixel;
    if bytes.len() < expected * bytes_per_sample {
        return Err(format!(
            "Pixel data holds {} bytes, expected {}",
            bytes.len(),
            expected * bytes_per_sample
        ));
    }
    let bytes = &bytes[..expected * bytes_per_sample];

    let as_float = header.signed || header.has_rescale();
    let data = match (header.bits_allocated, as_float) {
        (8, false) => PixelData::UInt8(bytes.to_vec()),
        (16, false) => PixelData::UInt16(
            bytes
                .chunks_exact(2)
                .map(|c| u16::from_le_bytes([c[0], c[1]]))
                .collect(),
        ),
        (8, true) => rescaled(bytes.iter().map(|&b| stored(u16::from(b), header)), header),
        (_, true) => rescaled(
            bytes
                .chunks_exact(2)
                .map(|c| stored(u16::from_le_bytes([c[0], c[1]]), header)),
            header,
        ),
        (bits, _) => return Err(format!("Unsupported Bits Allocated {bits}")),
    };

    if header.planar && header.samples_per_pixel > 1 {
        return Ok(interleave(data, header));
    }
    Ok(data)
}

/// Stored value, sign-extended from bit `bits_stored - 1` when the representation
/// is two's complement; bits above Bits Stored are ignored
#[inline]
fn stored(raw: u16, header: &Header) -> f64 {
    if header.signed {
        let shift = 16 - u32::from(header.bits_stored);
        f64::from(((raw << shift) as i16) >> shift)
    } else {
        f64::from(raw)
    }
}

fn rescaled(values: impl Iterator<Item = f64>, header: &Header) -> PixelData {
    PixelData::Float32(
        values
            .map(|v| v.mul_add(header.slope, header.intercept) as f32)
            .collect(),
    )
}

/// Convert colour-by-plane frames to colour-by-pixel
fn interleave(data: PixelData, header: &Header) -> PixelData {
    fn reorder<T: Copy>(values: &[T], frame_pixels: usize, samples: usize) -> Vec<T> {
        let frame_len = frame_pixels * samples;
        let mut out = Vec::with_capacity(values.len());
        for frame in values.chunks_exact(frame_len) {
            for pixel in 0..frame_pixels {
                for sample in 0..samples {
                    out.push(frame[sample * frame_pixels + pixel]);
                }
            }
        }
        out
    }

    let frame_pixels = header.rows * header.columns;
    let samples = header.samples_per_pixel;
    match data {
        PixelData::UInt8(v) => PixelData::UInt8(reorder(&v, frame_pixels, samples)),
        PixelData::UInt16(v) => PixelData::UInt16(reorder(&v, frame_pixels, samples)),
        PixelData::Float32(v) => PixelData::Float32(reorder(&v, frame_pixels, samples)),
    }
}

/// `[column spacing, row spacing, slice spacing]`
fn extract_spacing(obj: &DicomFile) -> Vec<f64> {
    let positive = |v: &f64| v.is_finite() && *v > 0.0;
    let (row, column) = obj
        .get(tags::PIXEL_SPACING)
        .and_then(|e| e.to_multi_float64().ok())
        .filter(|v| v.len() >= 2 && v[..2].iter().all(positive))
        .map_or((1.0, 1.0), |v| (v[0], v[1]));
    let slice = obj
        .get(tags::SPACING_BETWEEN_SLICES)
        .or_else(|| obj.get(tags::SLICE_THICKNESS))
        .and_then(|e| e.to_float64().ok())
        .filter(positive)
        .unwrap_or(1.0);
    vec![column, row, slice]
}

fn extract_origin(obj: &DicomFile) -> Vec<f64> {
    obj.get(tags::IMAGE_POSITION_PATIENT)
        .and_then(|e| e.to_multi_float64().ok())
        .filter(|v| v.len() >= 3 && v.iter().all(|x| x.is_finite()))
        .map_or_else(|| vec![0.0; 3], |v| v[..3].to_vec())
}

/// Row-major 3x3 matrix whose columns are the row, column and slice directions
fn extract_direction(obj: &DicomFile) -> Vec<f64> {
    let Some(cosines) = obj
        .get(tags::IMAGE_ORIENTATION_PATIENT)
        .and_then(|e| e.to_multi_float64().ok())
        .filter(|v| v.len() >= 6 && v.iter().all(|x| x.is_finite()))
    else {
        return crate::image::identity(3);
    };
    let (r, c) = (&cosines[..3], &cosines[3..6]);
    let n = [
        r[1] * c[2] - r[2] * c[1],
        r[2] * c[0] - r[0] * c[2],
        r[0] * c[1] - r[1] * c[0],
    ];
    (0..3).flat_map(|i| [r[i], c[i], n[i]]).collect()
}
