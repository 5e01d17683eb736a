// Copyright 2025 the Pixmill Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! This crate includes the data structures shared by the [Pixmill CPU][pixmill_cpu] compositor:
//! fixed-point numbers, geometry, projective transforms, rectangle regions, pixel formats and
//! pixel buffers.
//!
//! # Usage
//!
//! This crate is usually not used on its own. It is the foundation of `pixmill_cpu`, which
//! builds images on top of [`Bits`][crate::bits::Bits] and composites them.
//!
//! # Contents
//!
//! - [`fixed`]: 16.16 fixed-point scalars.
//! - [`geometry`]: integer boxes and fixed-point points, lines and trapezoids.
//! - [`transform`]: 3×3 fixed-point projective transforms.
//! - [`region`]: canonical rectangle sets with boolean algebra.
//! - [`format`]: the closed table of packed pixel formats and indexed palettes.
//! - [`access`]: byte order and the injectable memory [`Accessor`][crate::access::Accessor].
//! - [`color`]: 16-bit-per-channel working colors and unorm helpers.
//! - [`srgb`]: sRGB transfer curve tables.
//! - [`bits`]: pixel buffers with format-converting fetch and store.
//!
//! [pixmill_cpu]: https://crates.io/crates/pixmill_cpu
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
#![no_std]

extern crate alloc;
#[cfg(test)]
extern crate std;

pub mod access;
pub mod bits;
pub mod color;
pub mod fixed;
pub mod format;
pub mod geometry;
pub mod region;
pub mod srgb;
pub mod transform;

pub use smallvec;
