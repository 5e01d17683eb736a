// Copyright 2025 the Pixmill Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! This crate implements a CPU raster compositor in the tradition of the X Render extension.
//!
//! Images are built from pixel buffers in any of the formats of
//! [`PixelFormat`][pixmill_common::format::PixelFormat], or procedurally from a solid color or a
//! gradient. They can be transformed, filtered, repeated and clipped, and are combined with
//! [`composite`] using one of the Porter-Duff or PDF blend [`Operator`]s. Anti-aliased masks can
//! be produced from trapezoids with the functions in [`raster`].
//!
//! All intermediate math happens at 16 bits per channel on premultiplied colors, regardless
//! of the storage formats involved.
//!
//! # Usage
//!
//! ```
//! use pixmill_cpu::{composite, Image, Operator};
//! use pixmill_cpu::common::color::Color;
//! use pixmill_cpu::common::format::PixelFormat;
//!
//! let dest = Image::new_bits(PixelFormat::A8r8g8b8, 4, 4).unwrap();
//! let red = Image::solid_fill(Color::from_a8r8g8b8(0xffff_0000));
//! composite(Operator::Over, &red, None, &dest, 0, 0, 0, 0, 0, 0, 4, 4);
//! assert_eq!(dest.pixel(2, 2), Some(0xffff_0000));
//! ```
//!
//! Images are reference counted handles: cloning an [`Image`] acquires a new reference and
//! dropping it releases one. Images are not thread safe; use one image per thread.

// LINEBENDER LINT SET - lib.rs - v3
// See https://linebender.org/wiki/canonical-lints/
// These lints shouldn't apply to examples or tests.
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
// These lints shouldn't apply to examples.
#![warn(clippy::print_stdout, clippy::print_stderr)]
// Targeting e.g. 32-bit means structs containing usize can give false positives for 64-bit.
#![cfg_attr(target_pointer_width = "64", warn(clippy::trivially_copy_pass_by_ref))]
// END LINEBENDER LINT SET
#![cfg_attr(docsrs, feature(doc_cfg))]
#![forbid(unsafe_code)]

mod combine;
mod composite;
mod dither;
mod gradient;
mod image;
pub mod raster;
mod sample;

pub use combine::Operator;
pub use composite::{composite, fill_boxes, fill_rectangles, region_from_image};
pub use dither::Dither;
pub use gradient::GradientStop;
pub use image::{Filter, Image, Kernel, Repeat, SeparableKernel};
pub use sample::BILINEAR_INTERPOLATION_BITS;

pub use pixmill_common as common;

use pixmill_common::bits::LayoutError;
use thiserror::Error;

/// Errors that can occur when constructing images.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// The image is too large to be addressed.
    #[error("Image dimensions are too large")]
    InvalidDimensions,
    /// The stride is smaller than a row of pixels.
    #[error("Stride is smaller than a row of pixels")]
    StrideTooSmall,
    /// The buffer doesn't hold all rows of the image.
    #[error("Buffer is too small for the image layout")]
    BufferTooSmall,
    /// The stride can't be used with the pixel format, e.g. a negative stride for a planar
    /// format.
    #[error("Stride is not supported by the pixel format")]
    UnsupportedStride,
    /// A color indexed format was used without a palette.
    #[error("Color indexed formats require a palette")]
    MissingPalette,
    /// The parameters of a convolution filter are inconsistent.
    #[error("Invalid filter parameters: {0}")]
    InvalidFilter(&'static str),
    /// A gradient was created without color stops.
    #[error("Gradient has no color stops")]
    NoGradientStops,
}

impl From<LayoutError> for Error {
    fn from(e: LayoutError) -> Self {
        match e {
            LayoutError::InvalidDimensions => Self::InvalidDimensions,
            LayoutError::StrideTooSmall => Self::StrideTooSmall,
            LayoutError::BufferTooSmall => Self::BufferTooSmall,
            LayoutError::UnsupportedStride => Self::UnsupportedStride,
            LayoutError::MissingPalette => Self::MissingPalette,
        }
    }
}

pub(crate) type Result<T, E = Error> = std::result::Result<T, E>;
