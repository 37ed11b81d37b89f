//! Black/white thresholding for OCR
//!
//! On-video captions are anti-aliased and drawn over moving, colorful
//! backgrounds. Collapsing every pixel to pure black or white gives OCR
//! engines the scanned-document contrast they are tuned for.

use tracing::debug;

use crate::capture::Frame;

/// Average brightness above which a pixel becomes white
pub const LUMA_THRESHOLD: u32 = 128;

/// Binarize a frame, returning a new frame of the same dimensions
pub fn binarize(frame: &Frame) -> Frame {
    let mut data = frame.data.clone();
    binarize_in_place(&mut data);
    debug!("Binarized {}x{} frame", frame.width, frame.height);
    Frame {
        data,
        width: frame.width,
        height: frame.height,
        timestamp: frame.timestamp,
    }
}

/// Binarize RGBA data in place
///
/// Uses the unweighted average `(R + G + B) / 3`; a pixel is white when the
/// average is strictly greater than [`LUMA_THRESHOLD`]. Alpha is unchanged.
pub fn binarize_in_place(data: &mut [u8]) {
    // avg > 128 <=> sum > 384, no rounding involved
    let sum_threshold = LUMA_THRESHOLD * 3;
    for chunk in data.chunks_exact_mut(4) {
        let sum = chunk[0] as u32 + chunk[1] as u32 + chunk[2] as u32;
        let value = if sum > sum_threshold { 255 } else { 0 };
        chunk[0] = value;
        chunk[1] = value;
        chunk[2] = value;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(data: Vec<u8>, width: u32, height: u32) -> Frame {
        Frame::new(data, width, height)
    }

    #[test]
    fn test_light_and_dark_pixels() {
        let input = frame(vec![200, 200, 200, 255, 50, 50, 50, 255], 2, 1);
        let output = binarize(&input);
        assert_eq!(output.data, vec![255, 255, 255, 255, 0, 0, 0, 255]);
        assert_eq!(output.dimensions(), (2, 1));
    }

    #[test]
    fn test_threshold_is_strict() {
        // Average exactly 128 stays black, just above turns white
        let mut data = vec![128, 128, 128, 255, 129, 128, 128, 255];
        binarize_in_place(&mut data);
        assert_eq!(&data[0..3], &[0, 0, 0]);
        assert_eq!(&data[4..7], &[255, 255, 255]);
    }

    #[test]
    fn test_unweighted_average() {
        // Perceptual luma of pure green is ~150, the plain average is 85
        let mut data = vec![0, 255, 0, 255];
        binarize_in_place(&mut data);
        assert_eq!(&data[0..3], &[0, 0, 0]);
    }

    #[test]
    fn test_alpha_passes_through() {
        let input = frame(vec![255, 255, 255, 7, 0, 0, 0, 200], 2, 1);
        let output = binarize(&input);
        assert_eq!(output.data[3], 7);
        assert_eq!(output.data[7], 200);
    }

    #[test]
    fn test_channels_collapse_to_black_or_white() {
        let data: Vec<u8> = (0..=255u8)
            .flat_map(|v| [v, v.wrapping_mul(7), v.wrapping_mul(13), v])
            .collect();
        let output = binarize(&frame(data.clone(), 256, 1));

        for (out, input) in output.data.chunks_exact(4).zip(data.chunks_exact(4)) {
            assert!(out[0] == 0 || out[0] == 255);
            assert_eq!(out[0], out[1]);
            assert_eq!(out[1], out[2]);
            assert_eq!(out[3], input[3]);
        }
    }

    #[test]
    fn test_idempotent() {
        let data: Vec<u8> = (0..64u8).flat_map(|v| [v * 4, 255 - v, v * 3, 255]).collect();
        let once = binarize(&frame(data, 8, 8));
        let twice = binarize(&once);
        assert_eq!(once.data, twice.data);
    }
}
