//! Image preprocessing for the forward pass.
//!
//! Every image, whatever its source format, is normalized to the shape the
//! network was trained on: 224x224, exactly three channels, pixel values
//! scaled to [0, 1], NCHW with a leading batch dimension.

use std::io::Cursor;

use image::imageops::FilterType;
use image::{DynamicImage, ImageReader};
use tch::Tensor;
use thiserror::Error;

/// Square edge length of the network input.
pub const MODEL_INPUT_SIZE: u32 = 224;

#[derive(Debug, Error)]
pub enum PreprocessError {
    #[error("could not read image data: {0}")]
    Io(#[from] std::io::Error),
    #[error("could not decode image: {0}")]
    Decode(#[from] image::ImageError),
}

/// Decode an uploaded byte buffer. The format is sniffed from the content,
/// not taken from the filename.
pub fn decode_image(bytes: &[u8]) -> Result<DynamicImage, PreprocessError> {
    let reader = ImageReader::new(Cursor::new(bytes)).with_guessed_format()?;
    Ok(reader.decode()?)
}

/// Convert a decoded image into the network input tensor.
///
/// `to_rgb8` broadcasts single-channel input across three channels and
/// drops an alpha channel, which is exactly the channel normalization the
/// model expects.
pub fn to_input_tensor(image: &DynamicImage) -> Tensor {
    let size = MODEL_INPUT_SIZE;
    let resized = image.resize_exact(size, size, FilterType::Triangle);
    let rgb = resized.to_rgb8();

    let num_pixels = (size * size) as usize;
    let mut chw = vec![0.0f32; 3 * num_pixels];
    for (i, pixel) in rgb.pixels().enumerate() {
        chw[i] = pixel[0] as f32 / 255.0;
        chw[num_pixels + i] = pixel[1] as f32 / 255.0;
        chw[2 * num_pixels + i] = pixel[2] as f32 / 255.0;
    }

    Tensor::from_slice(&chw).view([1, 3, size as i64, size as i64])
}

pub fn decode_and_preprocess(bytes: &[u8]) -> Result<Tensor, PreprocessError> {
    Ok(to_input_tensor(&decode_image(bytes)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::ImageFormat;

    fn encode_png(image: &DynamicImage) -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        image.write_to(&mut buf, ImageFormat::Png).unwrap();
        buf.into_inner()
    }

    #[test]
    fn rgb_input_produces_batched_tensor() {
        let bytes = encode_png(&DynamicImage::new_rgb8(100, 60));
        let tensor = decode_and_preprocess(&bytes).unwrap();
        assert_eq!(tensor.size(), vec![1, 3, 224, 224]);
    }

    #[test]
    fn grayscale_is_broadcast_to_three_channels() {
        let bytes = encode_png(&DynamicImage::new_luma8(50, 50));
        let tensor = decode_and_preprocess(&bytes).unwrap();
        assert_eq!(tensor.size(), vec![1, 3, 224, 224]);
    }

    #[test]
    fn alpha_channel_is_dropped() {
        let bytes = encode_png(&DynamicImage::new_rgba8(30, 30));
        let tensor = decode_and_preprocess(&bytes).unwrap();
        assert_eq!(tensor.size(), vec![1, 3, 224, 224]);
    }

    #[test]
    fn pixel_values_land_in_unit_interval() {
        let mut img = image::RgbImage::new(8, 8);
        for pixel in img.pixels_mut() {
            *pixel = image::Rgb([255, 0, 128]);
        }
        let bytes = encode_png(&DynamicImage::ImageRgb8(img));
        let tensor = decode_and_preprocess(&bytes).unwrap();
        assert!(tensor.max().double_value(&[]) <= 1.0);
        assert!(tensor.min().double_value(&[]) >= 0.0);
    }

    #[test]
    fn garbage_bytes_are_a_decode_error() {
        let err = decode_and_preprocess(b"definitely not an image").unwrap_err();
        assert!(matches!(err, PreprocessError::Decode(_) | PreprocessError::Io(_)));
    }
}
