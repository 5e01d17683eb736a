// Copyright 2025 the Pixmill Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Ordered dithering of destination stores.

/// How colors are dithered when stored into a destination of lower precision.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Dither {
    /// Round each channel to the nearest representable value.
    #[default]
    None,
    /// The fastest available dither.
    Fast,
    /// A dither balancing speed and quality.
    Good,
    /// The highest quality dither.
    Best,
    /// An 8 × 8 Bayer matrix.
    OrderedBayer8,
}

/// The rank of pixel `(x, y)` in an 8 × 8 Bayer matrix, in `0..64`.
///
/// This is the bit reversal of the interleaved low three bits of `x ^ y` and `x`.
pub(crate) fn bayer_8(x: i32, y: i32) -> u32 {
    let x = x as u32;
    let y = y as u32 ^ x;
    ((y & 1) << 5)
        | ((x & 1) << 4)
        | ((y & 2) << 2)
        | ((x & 2) << 1)
        | ((y & 4) >> 1)
        | ((x & 4) >> 2)
}

#[cfg(test)]
mod tests {
    use super::bayer_8;

    #[test]
    fn bayer_tile_holds_every_rank_once() {
        let mut seen = [false; 64];
        for y in 0..8 {
            for x in 0..8 {
                let r = bayer_8(x, y) as usize;
                assert!(!seen[r]);
                seen[r] = true;
            }
        }
        assert_eq!(bayer_8(0, 0), 0);
        assert_eq!(bayer_8(-8, 16), 0);
        assert_eq!(bayer_8(-1, -1), bayer_8(7, 7));
    }

    #[test]
    fn neighbors_are_far_apart() {
        // The 2 × 2 corner holds ranks from all four quarters of the range.
        let mut corner = [bayer_8(0, 0), bayer_8(1, 0), bayer_8(0, 1), bayer_8(1, 1)];
        corner.sort_unstable();
        assert_eq!(corner, [0, 16, 32, 48]);
    }
}
