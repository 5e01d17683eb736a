// Copyright 2025 the Pixmill Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Conversion between 8-bit sRGB-encoded channels and 16-bit linear channels.

use static_assertions::const_assert;

/// The linear value of each 8-bit sRGB code, scaled to `0..=65535`.
const TO_LINEAR: [u16; 256] = [
    0, 20, 40, 60, 80, 99, 119, 139, 159, 179, 199, 219,
    241, 264, 288, 313, 340, 367, 396, 427, 458, 491, 526, 562,
    599, 637, 677, 718, 761, 805, 851, 898, 947, 997, 1048, 1101,
    1156, 1212, 1270, 1330, 1391, 1453, 1517, 1583, 1651, 1720, 1790, 1863,
    1937, 2013, 2090, 2170, 2250, 2333, 2418, 2504, 2592, 2681, 2773, 2866,
    2961, 3058, 3157, 3258, 3360, 3464, 3570, 3678, 3788, 3900, 4014, 4129,
    4247, 4366, 4488, 4611, 4736, 4864, 4993, 5124, 5257, 5392, 5530, 5669,
    5810, 5953, 6099, 6246, 6395, 6547, 6700, 6856, 7014, 7174, 7335, 7500,
    7666, 7834, 8004, 8177, 8352, 8528, 8708, 8889, 9072, 9258, 9445, 9635,
    9828, 10022, 10219, 10417, 10619, 10822, 11028, 11235, 11446, 11658, 11873, 12090,
    12309, 12530, 12754, 12980, 13209, 13440, 13673, 13909, 14146, 14387, 14629, 14874,
    15122, 15371, 15623, 15878, 16135, 16394, 16656, 16920, 17187, 17456, 17727, 18001,
    18277, 18556, 18837, 19121, 19407, 19696, 19987, 20281, 20577, 20876, 21177, 21481,
    21787, 22096, 22407, 22721, 23038, 23357, 23678, 24002, 24329, 24658, 24990, 25325,
    25662, 26001, 26344, 26688, 27036, 27386, 27739, 28094, 28452, 28813, 29176, 29542,
    29911, 30282, 30656, 31033, 31412, 31794, 32179, 32567, 32957, 33350, 33745, 34143,
    34544, 34948, 35355, 35764, 36176, 36591, 37008, 37429, 37852, 38278, 38706, 39138,
    39572, 40009, 40449, 40891, 41337, 41785, 42236, 42690, 43147, 43606, 44069, 44534,
    45002, 45473, 45947, 46423, 46903, 47385, 47871, 48359, 48850, 49344, 49841, 50341,
    50844, 51349, 51858, 52369, 52884, 53401, 53921, 54445, 54971, 55500, 56032, 56567,
    57105, 57646, 58190, 58737, 59287, 59840, 60396, 60955, 61517, 62082, 62650, 63221,
    63795, 64372, 64952, 65535,
];

/// Linear values at which encoding switches to the next sRGB code.
const TO_SRGB: [u16; 255] = thresholds();

const fn thresholds() -> [u16; 255] {
    let mut out = [0; 255];
    let mut i = 0;
    while i < 255 {
        out[i] = ((TO_LINEAR[i] as u32 + TO_LINEAR[i + 1] as u32 + 1) / 2) as u16;
        i += 1;
    }
    out
}

const fn strictly_increasing(table: &[u16]) -> bool {
    let mut i = 1;
    while i < table.len() {
        if table[i] <= table[i - 1] {
            return false;
        }
        i += 1;
    }
    true
}

const_assert!(strictly_increasing(&TO_LINEAR));
const_assert!(TO_LINEAR[0] == 0 && TO_LINEAR[255] == 0xffff);

/// Decode an sRGB code to a linear 16-bit value.
#[inline]
pub fn to_linear(v: u8) -> u16 {
    TO_LINEAR[v as usize]
}

/// Encode a linear 16-bit value to the nearest sRGB code.
#[inline]
pub fn to_srgb(v: u16) -> u8 {
    TO_SRGB.partition_point(|&t| t <= v) as u8
}

#[cfg(test)]
mod tests {
    use super::{to_linear, to_srgb};

    #[test]
    fn codes_round_trip() {
        for v in 0..=255 {
            assert_eq!(to_srgb(to_linear(v)), v);
        }
    }

    #[test]
    fn curve_points() {
        assert_eq!(to_linear(0), 0);
        assert_eq!(to_linear(1), 20);
        assert_eq!(to_linear(0x80), 14146);
        assert_eq!(to_linear(0xff), 0xffff);
        assert_eq!(to_srgb(0x8080), 0xbc);
        assert_eq!(to_srgb(0xffff), 0xff);
        assert_eq!(to_srgb(9), 0);
        assert_eq!(to_srgb(10), 1);
    }
}
