// SPDX-License-Identifier: GPL-3.0-only

//! Synthetic RGBA frame source
//!
//! Stands in for a real renderer when exercising the delivery pipeline
//! from the CLI: produces an animated gradient with a moving bar so that
//! consumers can verify frames are actually advancing.

use crate::constants::RGBA_BYTES_PER_PIXEL;

/// Generates animated RGBA test frames at a fixed resolution
pub struct TestPattern {
    width: u32,
    height: u32,
    frame_index: u64,
}

impl TestPattern {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            frame_index: 0,
        }
    }

    /// Render the next frame into a fresh RGBA buffer
    pub fn next_frame(&mut self) -> Vec<u8> {
        let w = self.width as usize;
        let h = self.height as usize;
        let mut frame = vec![0u8; w * h * RGBA_BYTES_PER_PIXEL];

        // Vertical bar sweeping left to right, 4 pixels per frame
        let bar_x = (self.frame_index as usize * 4) % w;
        let bar_w = w / 16;

        for y in 0..h {
            for x in 0..w {
                let idx = (y * w + x) * RGBA_BYTES_PER_PIXEL;
                let in_bar = {
                    let dx = (x + w - bar_x) % w;
                    dx < bar_w
                };
                if in_bar {
                    frame[idx] = 255;
                    frame[idx + 1] = 255;
                    frame[idx + 2] = 255;
                } else {
                    // Static two-axis gradient background
                    frame[idx] = (x * 255 / w) as u8;
                    frame[idx + 1] = (y * 255 / h) as u8;
                    frame[idx + 2] = 96;
                }
                frame[idx + 3] = 255;
            }
        }

        self.frame_index += 1;
        frame
    }
}
