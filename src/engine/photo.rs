//! Photo processing for the verification gate: a fixed brightness/contrast
//! enhancement applied to the captured frame before it is JPEG-encoded and
//! handed opaquely to the attendance recorder.

use image::RgbImage;
use std::io::Cursor;

use crate::engine::error::EngineError;

/// Fixed enhancement applied to every verification photo. Kiosk cameras tend
/// to underexpose; these values were tuned for badge-distance face shots.
pub const BRIGHTNESS_SHIFT: i32 = 25;
pub const CONTRAST_SHIFT: f32 = 35.0;

const JPEG_QUALITY: u8 = 85;

/// A decoded camera frame, RGB8, row-major.
#[derive(Debug, Clone)]
pub struct RawFrame {
    pub width: u32,
    pub height: u32,
    pub rgb: Vec<u8>,
}

impl RawFrame {
    pub fn decode(bytes: &[u8]) -> Result<Self, EngineError> {
        let img = image::load_from_memory(bytes)
            .map_err(|e| EngineError::CaptureFailed(format!("undecodable frame: {e}")))?
            .to_rgb8();
        Ok(Self {
            width: img.width(),
            height: img.height(),
            rgb: img.into_raw(),
        })
    }
}

fn contrast_factor(contrast: f32) -> f32 {
    (259.0 * (contrast + 255.0)) / (255.0 * (259.0 - contrast))
}

/// Linear per-channel transform `factor * (x - 128) + 128 + brightness`,
/// clamped to `0..=255`.
pub fn enhance(frame: &mut RawFrame) {
    let factor = contrast_factor(CONTRAST_SHIFT);
    for px in frame.rgb.iter_mut() {
        let adjusted = factor * (*px as f32 - 128.0) + 128.0 + BRIGHTNESS_SHIFT as f32;
        *px = adjusted.clamp(0.0, 255.0) as u8;
    }
}

pub fn encode_jpeg(frame: &RawFrame) -> Result<Vec<u8>, EngineError> {
    let img = RgbImage::from_raw(frame.width, frame.height, frame.rgb.clone())
        .ok_or_else(|| EngineError::CaptureFailed("frame buffer size mismatch".to_string()))?;
    let mut out = Cursor::new(Vec::new());
    let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY);
    img.write_with_encoder(encoder)
        .map_err(|e| EngineError::CaptureFailed(format!("jpeg encode: {e}")))?;
    Ok(out.into_inner())
}

/// Enhance then encode; the verification gate's one entry point.
pub fn process(mut frame: RawFrame) -> Result<Vec<u8>, EngineError> {
    enhance(&mut frame);
    encode_jpeg(&frame)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid_frame(value: u8) -> RawFrame {
        RawFrame {
            width: 4,
            height: 4,
            rgb: vec![value; 4 * 4 * 3],
        }
    }

    #[test]
    fn midpoint_pixel_shifts_by_brightness_only() {
        // factor * (128 - 128) is zero, so 128 maps to 128 + 25.
        let mut frame = solid_frame(128);
        enhance(&mut frame);
        assert!(frame.rgb.iter().all(|&px| px == 128 + 25));
    }

    #[test]
    fn enhancement_clamps_at_channel_bounds() {
        let mut bright = solid_frame(250);
        enhance(&mut bright);
        assert!(bright.rgb.iter().all(|&px| px == 255));

        // 1.315*(0-128)+128+25 is negative, so black clamps at the floor.
        let mut dark = solid_frame(0);
        enhance(&mut dark);
        assert!(dark.rgb.iter().all(|&px| px == 0));
    }

    #[test]
    fn contrast_spreads_values_away_from_midpoint() {
        let mut frame = RawFrame {
            width: 2,
            height: 1,
            rgb: vec![100, 100, 100, 160, 160, 160],
        };
        enhance(&mut frame);
        let spread_before = 160 - 100;
        let spread_after = frame.rgb[3] as i32 - frame.rgb[0] as i32;
        assert!(spread_after > spread_before);
    }

    #[test]
    fn process_produces_a_decodable_jpeg() {
        let jpeg = process(solid_frame(128)).unwrap();
        let reread = RawFrame::decode(&jpeg).unwrap();
        assert_eq!(reread.width, 4);
        assert_eq!(reread.height, 4);
    }

    #[test]
    fn mismatched_buffer_is_a_capture_failure() {
        let frame = RawFrame {
            width: 10,
            height: 10,
            rgb: vec![0; 5],
        };
        assert!(matches!(
            encode_jpeg(&frame),
            Err(EngineError::CaptureFailed(_))
        ));
    }
}
