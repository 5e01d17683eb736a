// Copyright 2025 the Pixmill Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::cell::Cell;

use pixmill_cpu::common::access::{Accessor, ByteOrder};
use pixmill_cpu::common::color::Color;
use pixmill_cpu::common::format::PixelFormat;
use pixmill_cpu::common::geometry::Box32;
use pixmill_cpu::{fill_boxes, Image, Operator};

/// A `width × height` image filled with `argb`.
pub(crate) fn filled(format: PixelFormat, width: u32, height: u32, argb: u32) -> Image {
    let image = Image::new_bits(format, width, height).unwrap();
    fill_boxes(
        Operator::Src,
        &image,
        Color::from_a8r8g8b8(argb),
        &[Box32::new(0, 0, width as i32, height as i32)],
    );
    image
}

/// A solid image of `argb`.
pub(crate) fn solid(argb: u32) -> Image {
    Image::solid_fill(Color::from_a8r8g8b8(argb))
}

/// All raw pixel values, row by row.
pub(crate) fn pixels(image: &Image) -> Vec<u32> {
    let mut out = Vec::new();
    for y in 0..image.height() as i32 {
        for x in 0..image.width() as i32 {
            out.push(image.pixel(x, y).unwrap());
        }
    }
    out
}

/// A pixel as `0xAARRGGBB`, regardless of the image format.
pub(crate) fn argb(image: &Image, x: i32, y: i32) -> u32 {
    image.color(x, y).unwrap().to_a8r8g8b8()
}

/// A small deterministic pseudo random generator.
pub(crate) struct Lcg(u64);

impl Lcg {
    pub(crate) fn new(seed: u64) -> Self {
        Self(seed)
    }

    pub(crate) fn next_u32(&mut self) -> u32 {
        self.0 = self
            .0
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);
        (self.0 >> 32) as u32
    }

    /// A value in `0..n`.
    pub(crate) fn below(&mut self, n: u32) -> u32 {
        self.next_u32() % n
    }

    /// Either a small coordinate or, now and then, one near the ends of the `i32` range.
    pub(crate) fn coord(&mut self) -> i32 {
        match self.below(8) {
            0 => i32::MAX - self.below(64) as i32,
            1 => i32::MIN + self.below(64) as i32,
            2 => self.next_u32() as i32,
            _ => self.below(48) as i32 - 16,
        }
    }

    pub(crate) fn pick<'a, T>(&mut self, items: &'a [T]) -> &'a T {
        &items[self.below(items.len() as u32) as usize]
    }
}

/// Counts the memory traffic of an image.
#[derive(Debug, Default)]
pub(crate) struct CountingAccessor {
    pub(crate) reads: Cell<usize>,
    pub(crate) writes: Cell<usize>,
}

impl Accessor for CountingAccessor {
    fn read(&self, bytes: &[u8], offset: usize, size: usize, order: ByteOrder) -> u32 {
        self.reads.set(self.reads.get() + 1);
        pixmill_cpu::common::access::read_direct(bytes, offset, size, order)
    }

    fn write(&self, bytes: &mut [u8], offset: usize, size: usize, order: ByteOrder, value: u32) {
        self.writes.set(self.writes.get() + 1);
        pixmill_cpu::common::access::write_direct(bytes, offset, size, order, value);
    }
}
