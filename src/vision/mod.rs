//! Camera frame preprocessing.
//!
//! Every frame the model sees — live or recorded — goes through the same
//! pipeline: drop the rows above the crop line (horizon and sky carry no
//! steering signal), resize to the fixed 200x66 input, normalize to [0, 1].

use image::imageops::{self, FilterType};

use crate::telemetry::CameraImage;

/// Model input width in pixels.
pub const INPUT_WIDTH: u32 = 200;
/// Model input height in pixels.
pub const INPUT_HEIGHT: u32 = 66;
/// Model input channels (RGB).
pub const INPUT_CHANNELS: usize = 3;

/// Total number of values in one model input.
pub const INPUT_LEN: usize = INPUT_CHANNELS * (INPUT_WIDTH * INPUT_HEIGHT) as usize;

/// Crop, resize, and normalize a camera frame into a CHW float buffer.
///
/// `top_crop` is the number of bottom rows kept; everything above is
/// discarded before resizing. Frames shorter than `top_crop` are used whole.
pub fn preprocess(image: &CameraImage, top_crop: u32) -> Vec<f32> {
    let (width, height) = image.dimensions();

    let cropped = if height > top_crop {
        imageops::crop_imm(image, 0, height - top_crop, width, top_crop).to_image()
    } else {
        image.clone()
    };

    let resized = imageops::resize(&cropped, INPUT_WIDTH, INPUT_HEIGHT, FilterType::Triangle);

    let mut buffer = Vec::with_capacity(INPUT_LEN);
    for c in 0..INPUT_CHANNELS {
        for y in 0..INPUT_HEIGHT {
            for x in 0..INPUT_WIDTH {
                buffer.push(resized.get_pixel(x, y)[c] as f32 / 255.0);
            }
        }
    }
    buffer
}
