// SPDX-License-Identifier: GPL-3.0-only

//! Media utilities for the frame delivery pipeline
//!
//! - [`convert`]: RGBA to NV12 color conversion (BT.601, limited range)
//! - [`test_pattern`]: synthetic RGBA frame source for the CLI

pub mod convert;
pub mod test_pattern;

pub use convert::{nv12_frame_size, rgba_frame_size, rgba_to_nv12};
pub use test_pattern::TestPattern;
