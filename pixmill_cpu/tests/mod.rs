// Copyright 2025 the Pixmill Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! This crate contains the test harness for `pixmill_cpu`.
//! - The `util` module contains shared utility functions that are needed by different
//!   test methods.
//! - We do not use the default Rust test harness, but instead use this `mod.rs` file as the
//!   entry point to run all other tests, so that the utilities can be shared.
//! - Put new tests into the module of their topic and start the test name with that topic,
//!   e.g. `blend_multiply_opaque` rather than `multiply_blend_opaque`.

#![allow(missing_docs)]
#![allow(clippy::cast_possible_truncation)]

mod composite;
mod formats;
mod sampling;
mod util;
