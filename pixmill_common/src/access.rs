// Copyright 2025 the Pixmill Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Raw memory access for pixel buffers.
//!
//! Every read and write of packed pixel data goes through an [`Accessor`]. The default,
//! [`DirectAccess`], reads the buffer directly. Callers can supply their own implementation to
//! observe or redirect memory traffic, for example to validate the handling of a byte order
//! other than the host's.

use core::fmt::Debug;

/// The order of bytes within a pixel word, and of pixels within a byte for sub-byte formats.
///
/// With [`ByteOrder::Little`], the least significant byte comes first and the first pixel of a
/// byte occupies its least significant bits. With [`ByteOrder::Big`], it is the other way
/// around.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ByteOrder {
    /// Least significant first.
    Little,
    /// Most significant first.
    Big,
}

impl ByteOrder {
    /// The byte order of the host.
    pub const fn native() -> Self {
        if cfg!(target_endian = "big") {
            Self::Big
        } else {
            Self::Little
        }
    }
}

impl Default for ByteOrder {
    fn default() -> Self {
        Self::native()
    }
}

/// A strategy for reading and writing pixel words.
///
/// `size` is the number of bytes in the word, between 1 and 4. Implementations must not panic
/// on out-of-range offsets: reads return zero and writes are dropped.
pub trait Accessor: Debug {
    /// Read a `size`-byte word at byte `offset`.
    fn read(&self, bytes: &[u8], offset: usize, size: usize, order: ByteOrder) -> u32 {
        read_direct(bytes, offset, size, order)
    }

    /// Write the low `size` bytes of `value` at byte `offset`.
    fn write(&self, bytes: &mut [u8], offset: usize, size: usize, order: ByteOrder, value: u32) {
        write_direct(bytes, offset, size, order, value);
    }
}

/// Plain memory access.
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectAccess;

impl Accessor for DirectAccess {}

/// Read a word directly from `bytes`.
pub fn read_direct(bytes: &[u8], offset: usize, size: usize, order: ByteOrder) -> u32 {
    let Some(word) = offset
        .checked_add(size)
        .and_then(|end| bytes.get(offset..end))
    else {
        return 0;
    };

    match order {
        ByteOrder::Little => word
            .iter()
            .rev()
            .fold(0, |acc, &b| (acc << 8) | u32::from(b)),
        ByteOrder::Big => word.iter().fold(0, |acc, &b| (acc << 8) | u32::from(b)),
    }
}

/// Write a word directly into `bytes`.
pub fn write_direct(bytes: &mut [u8], offset: usize, size: usize, order: ByteOrder, value: u32) {
    let Some(word) = offset
        .checked_add(size)
        .and_then(|end| bytes.get_mut(offset..end))
    else {
        return;
    };

    for (i, b) in word.iter_mut().enumerate() {
        let shift = match order {
            ByteOrder::Little => 8 * i,
            ByteOrder::Big => 8 * (size - 1 - i),
        };
        *b = (value >> shift) as u8;
    }
}

#[cfg(test)]
mod tests {
    use super::{read_direct, write_direct, ByteOrder};

    #[test]
    fn word_orders() {
        let bytes = [0x11, 0x22, 0x33, 0x44];
        assert_eq!(read_direct(&bytes, 0, 4, ByteOrder::Little), 0x4433_2211);
        assert_eq!(read_direct(&bytes, 0, 4, ByteOrder::Big), 0x1122_3344);
        assert_eq!(read_direct(&bytes, 1, 3, ByteOrder::Little), 0x44_3322);
        assert_eq!(read_direct(&bytes, 2, 2, ByteOrder::Big), 0x3344);
    }

    #[test]
    fn out_of_range_is_harmless() {
        let mut bytes = [0_u8; 3];
        assert_eq!(read_direct(&bytes, 1, 4, ByteOrder::Little), 0);
        write_direct(&mut bytes, usize::MAX, 2, ByteOrder::Big, 0xffff);
        assert_eq!(bytes, [0, 0, 0]);
    }

    #[test]
    fn write_then_read() {
        let mut bytes = [0_u8; 4];
        write_direct(&mut bytes, 0, 4, ByteOrder::Big, 0xaabb_ccdd);
        assert_eq!(bytes, [0xaa, 0xbb, 0xcc, 0xdd]);
        write_direct(&mut bytes, 0, 2, ByteOrder::Little, 0x1234);
        assert_eq!(bytes, [0x34, 0x12, 0xcc, 0xdd]);
    }
}
