// SPDX-License-Identifier: GPL-3.0-only

//! RGBA to NV12 pixel format conversion
//!
//! The virtual camera sink consumes NV12 (YUV 4:2:0, semi-planar): a full
//! resolution luma plane followed by an interleaved UV plane at half
//! resolution in both dimensions. Conversion uses BT.601 coefficients with
//! limited (broadcast) range output: Y in [16,235], U/V in [16,240].
//!
//! All arithmetic is done in f32 and rounded half-away-from-zero
//! (`f32::round`) before the final clamp, so output is bit-exact and
//! deterministic across runs.

use crate::constants::RGBA_BYTES_PER_PIXEL;

/// Size in bytes of one RGBA8 frame at the given resolution
pub fn rgba_frame_size(width: u32, height: u32) -> usize {
    width as usize * height as usize * RGBA_BYTES_PER_PIXEL
}

/// Size in bytes of one NV12 frame at the given resolution
///
/// Y plane (`w*h`) plus interleaved UV plane (`w*h/2`).
pub fn nv12_frame_size(width: u32, height: u32) -> usize {
    let pixels = width as usize * height as usize;
    pixels + pixels / 2
}

/// Convert an RGBA8 buffer to NV12 (BT.601, limited range)
///
/// `width` and `height` must be even and `rgba` must hold exactly
/// `width * height * 4` bytes; the caller validates frame size before
/// invoking this (the session drops mismatched frames).
///
/// Luma is computed per pixel; chroma is averaged over non-overlapping
/// 2x2 pixel blocks and written as interleaved U,V pairs in raster block
/// order.
pub fn rgba_to_nv12(rgba: &[u8], width: u32, height: u32) -> Vec<u8> {
    let w = width as usize;
    let h = height as usize;
    debug_assert_eq!(w % 2, 0, "width must be even for 4:2:0 subsampling");
    debug_assert_eq!(h % 2, 0, "height must be even for 4:2:0 subsampling");
    debug_assert_eq!(rgba.len(), w * h * RGBA_BYTES_PER_PIXEL);

    let mut out = vec![0u8; nv12_frame_size(width, height)];
    let (y_plane, uv_plane) = out.split_at_mut(w * h);

    // Luma plane: one sample per pixel
    for (pixel, y_out) in rgba.chunks_exact(4).zip(y_plane.iter_mut()) {
        let r = pixel[0] as f32;
        let g = pixel[1] as f32;
        let b = pixel[2] as f32;

        let y = 0.299 * r + 0.587 * g + 0.114 * b;
        *y_out = (16.0 + 219.0 * y / 255.0).round().clamp(16.0, 235.0) as u8;
    }

    // Chroma plane: average RGB over each 2x2 block, then interleave U,V
    for by in 0..h / 2 {
        for bx in 0..w / 2 {
            let mut r_sum = 0.0f32;
            let mut g_sum = 0.0f32;
            let mut b_sum = 0.0f32;

            for dy in 0..2 {
                for dx in 0..2 {
                    let idx = ((by * 2 + dy) * w + bx * 2 + dx) * RGBA_BYTES_PER_PIXEL;
                    r_sum += rgba[idx] as f32;
                    g_sum += rgba[idx + 1] as f32;
                    b_sum += rgba[idx + 2] as f32;
                }
            }

            let r = r_sum / 4.0;
            let g = g_sum / 4.0;
            let b = b_sum / 4.0;

            let u = -0.168736 * r - 0.331264 * g + 0.5 * b;
            let v = 0.5 * r - 0.418688 * g - 0.081312 * b;

            let uv_idx = (by * (w / 2) + bx) * 2;
            uv_plane[uv_idx] = (128.0 + 224.0 * u / 255.0).round().clamp(16.0, 240.0) as u8;
            uv_plane[uv_idx + 1] = (128.0 + 224.0 * v / 255.0).round().clamp(16.0, 240.0) as u8;
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Build a solid-color RGBA frame
    fn solid_frame(r: u8, g: u8, b: u8, width: u32, height: u32) -> Vec<u8> {
        let mut frame = Vec::with_capacity(rgba_frame_size(width, height));
        for _ in 0..(width * height) {
            frame.extend_from_slice(&[r, g, b, 255]);
        }
        frame
    }

    #[test]
    fn test_frame_sizes() {
        assert_eq!(rgba_frame_size(1280, 720), 1280 * 720 * 4);
        assert_eq!(nv12_frame_size(1280, 720), 1280 * 720 * 3 / 2);
        assert_eq!(nv12_frame_size(2, 2), 6);
    }

    #[test]
    fn test_pure_black() {
        let nv12 = rgba_to_nv12(&solid_frame(0, 0, 0, 4, 4), 4, 4);
        // Limited range: black maps to Y=16, neutral chroma 128
        assert!(nv12[..16].iter().all(|&y| y == 16));
        assert!(nv12[16..].iter().all(|&c| c == 128));
    }

    #[test]
    fn test_pure_white() {
        let nv12 = rgba_to_nv12(&solid_frame(255, 255, 255, 4, 4), 4, 4);
        assert!(nv12[..16].iter().all(|&y| y == 235));
        assert!(nv12[16..].iter().all(|&c| c == 128));
    }

    #[test]
    fn test_mid_gray() {
        // Y = 128, Yout = round(16 + 219*128/255) = round(125.93) = 126
        let nv12 = rgba_to_nv12(&solid_frame(128, 128, 128, 2, 2), 2, 2);
        assert!(nv12[..4].iter().all(|&y| y == 126));
        assert_eq!(&nv12[4..6], &[128, 128]);
    }

    #[test]
    fn test_pure_red() {
        // Y = 0.299*255 = 76.245 -> round(16 + 219*76.245/255) = 81
        // U = -0.168736*255 -> round(128 + 224*(-43.028)/255) = 90
        // V = 0.5*255 = 127.5 -> round(128 + 224*127.5/255) = 240
        let nv12 = rgba_to_nv12(&solid_frame(255, 0, 0, 2, 2), 2, 2);
        assert!(nv12[..4].iter().all(|&y| y == 81));
        assert_eq!(&nv12[4..6], &[90, 240]);
    }

    #[test]
    fn test_output_ranges() {
        // Sample the RGB cube and confirm limited-range bounds hold
        for r in (0..=255u32).step_by(51) {
            for g in (0..=255u32).step_by(51) {
                for b in (0..=255u32).step_by(51) {
                    let nv12 = rgba_to_nv12(&solid_frame(r as u8, g as u8, b as u8, 2, 2), 2, 2);
                    for &y in &nv12[..4] {
                        assert!((16..=235).contains(&y), "Y={} out of range", y);
                    }
                    for &c in &nv12[4..6] {
                        assert!((16..=240).contains(&c), "chroma={} out of range", c);
                    }
                }
            }
        }
    }

    #[test]
    fn test_determinism() {
        // Mixed-content frame converted twice must be byte-identical
        let mut frame = Vec::with_capacity(rgba_frame_size(8, 8));
        for i in 0..(8 * 8 * 4) {
            frame.push((i * 37 % 256) as u8);
        }
        let a = rgba_to_nv12(&frame, 8, 8);
        let b = rgba_to_nv12(&frame, 8, 8);
        assert_eq!(a, b);
    }

    #[test]
    fn test_chroma_averages_blocks() {
        // Left 2x2 block red, right 2x2 block blue: each block keeps its
        // own chroma sample, so U differs between the two blocks.
        let mut frame = Vec::new();
        for _row in 0..2 {
            for x in 0..4 {
                if x < 2 {
                    frame.extend_from_slice(&[255, 0, 0, 255]);
                } else {
                    frame.extend_from_slice(&[0, 0, 255, 255]);
                }
            }
        }
        let nv12 = rgba_to_nv12(&frame, 4, 2);
        let uv = &nv12[8..];
        // Red block: U below neutral, V above; blue block the opposite
        assert!(uv[0] < 128 && uv[1] > 128);
        assert!(uv[2] > 128 && uv[3] < 128);
    }
}
