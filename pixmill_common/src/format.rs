// Copyright 2025 the Pixmill Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The closed table of packed pixel formats.
//!
//! Each [`PixelFormat`] is described by a [`FormatCode`]: the number of bits per pixel, how the
//! channels are laid out and how wide each channel is. Channel positions are derived from the
//! layout type rather than stored, see [`PixelFormat::channel_shifts`].

use alloc::vec;
use alloc::vec::Vec;
use static_assertions::const_assert;

/// How the channels of a format are laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelType {
    /// Alpha only.
    A,
    /// Alpha, red, green, blue from most to least significant bits.
    Argb,
    /// Like [`ChannelType::Argb`], with sRGB-encoded color channels.
    ArgbSrgb,
    /// Alpha, blue, green, red from most to least significant bits.
    Abgr,
    /// Blue, green, red, alpha from most to least significant bits.
    Bgra,
    /// Red, green, blue, alpha from most to least significant bits.
    Rgba,
    /// Indices into a color palette.
    Color,
    /// Indices into a gray palette.
    Gray,
    /// Packed 4:2:2 YCbCr.
    Yuy2,
    /// Planar 4:2:0 YCbCr.
    Yv12,
}

/// The bit layout of a pixel format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FormatCode {
    /// Bits per pixel.
    pub bpp: u8,
    /// The channel layout.
    pub kind: ChannelType,
    /// Width of the alpha channel.
    pub a: u8,
    /// Width of the red channel.
    pub r: u8,
    /// Width of the green channel.
    pub g: u8,
    /// Width of the blue channel.
    pub b: u8,
}

const fn code(bpp: u8, kind: ChannelType, a: u8, r: u8, g: u8, b: u8) -> FormatCode {
    FormatCode {
        bpp,
        kind,
        a,
        r,
        g,
        b,
    }
}

/// Bit offsets of each channel within a pixel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ChannelShifts {
    /// Offset of the alpha channel.
    pub a: u32,
    /// Offset of the red channel.
    pub r: u32,
    /// Offset of the green channel.
    pub g: u32,
    /// Offset of the blue channel.
    pub b: u32,
}

macro_rules! formats {
    ($($(#[$doc:meta])* $name:ident = ($bpp:expr, $kind:ident, $a:expr, $r:expr, $g:expr, $b:expr),)*) => {
        /// A packed pixel format.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum PixelFormat {
            $($(#[$doc])* $name,)*
        }

        impl PixelFormat {
            /// Every supported format.
            pub const ALL: &'static [Self] = &[$(Self::$name,)*];

            /// The bit layout of the format.
            pub const fn code(self) -> FormatCode {
                match self {
                    $(Self::$name => code($bpp, ChannelType::$kind, $a, $r, $g, $b),)*
                }
            }
        }
    };
}

formats! {
    /// 32 bpp, 8-bit alpha, red, green, blue.
    A8r8g8b8 = (32, Argb, 8, 8, 8, 8),
    /// 32 bpp, 8-bit red, green, blue, unused top byte.
    X8r8g8b8 = (32, Argb, 0, 8, 8, 8),
    /// 32 bpp, 8-bit alpha and sRGB-encoded red, green, blue.
    A8r8g8b8Srgb = (32, ArgbSrgb, 8, 8, 8, 8),
    /// 32 bpp, 8-bit alpha, blue, green, red.
    A8b8g8r8 = (32, Abgr, 8, 8, 8, 8),
    /// 32 bpp, 8-bit blue, green, red, unused top byte.
    X8b8g8r8 = (32, Abgr, 0, 8, 8, 8),
    /// 32 bpp, 8-bit blue, green, red, alpha.
    B8g8r8a8 = (32, Bgra, 8, 8, 8, 8),
    /// 32 bpp, 8-bit blue, green, red, unused low byte.
    B8g8r8x8 = (32, Bgra, 0, 8, 8, 8),
    /// 32 bpp, 8-bit red, green, blue, alpha.
    R8g8b8a8 = (32, Rgba, 8, 8, 8, 8),
    /// 32 bpp, 8-bit red, green, blue, unused low byte.
    R8g8b8x8 = (32, Rgba, 0, 8, 8, 8),
    /// 32 bpp, 6-bit red, green, blue.
    X14r6g6b6 = (32, Argb, 0, 6, 6, 6),
    /// 32 bpp, 10-bit red, green, blue.
    X2r10g10b10 = (32, Argb, 0, 10, 10, 10),
    /// 32 bpp, 2-bit alpha, 10-bit red, green, blue.
    A2r10g10b10 = (32, Argb, 2, 10, 10, 10),
    /// 32 bpp, 10-bit blue, green, red.
    X2b10g10r10 = (32, Abgr, 0, 10, 10, 10),
    /// 32 bpp, 2-bit alpha, 10-bit blue, green, red.
    A2b10g10r10 = (32, Abgr, 2, 10, 10, 10),
    /// 24 bpp, 8-bit red, green, blue.
    R8g8b8 = (24, Argb, 0, 8, 8, 8),
    /// 24 bpp, 8-bit blue, green, red.
    B8g8r8 = (24, Abgr, 0, 8, 8, 8),
    /// 24 bpp, sRGB-encoded 8-bit red, green, blue.
    R8g8b8Srgb = (24, ArgbSrgb, 0, 8, 8, 8),
    /// 16 bpp, 5-bit red, 6-bit green, 5-bit blue.
    R5g6b5 = (16, Argb, 0, 5, 6, 5),
    /// 16 bpp, 5-bit blue, 6-bit green, 5-bit red.
    B5g6r5 = (16, Abgr, 0, 5, 6, 5),
    /// 16 bpp, 1-bit alpha, 5-bit red, green, blue.
    A1r5g5b5 = (16, Argb, 1, 5, 5, 5),
    /// 16 bpp, 5-bit red, green, blue.
    X1r5g5b5 = (16, Argb, 0, 5, 5, 5),
    /// 16 bpp, 1-bit alpha, 5-bit blue, green, red.
    A1b5g5r5 = (16, Abgr, 1, 5, 5, 5),
    /// 16 bpp, 5-bit blue, green, red.
    X1b5g5r5 = (16, Abgr, 0, 5, 5, 5),
    /// 16 bpp, 4-bit alpha, red, green, blue.
    A4r4g4b4 = (16, Argb, 4, 4, 4, 4),
    /// 16 bpp, 4-bit red, green, blue.
    X4r4g4b4 = (16, Argb, 0, 4, 4, 4),
    /// 16 bpp, 4-bit alpha, blue, green, red.
    A4b4g4r4 = (16, Abgr, 4, 4, 4, 4),
    /// 16 bpp, 4-bit blue, green, red.
    X4b4g4r4 = (16, Abgr, 0, 4, 4, 4),
    /// 8 bpp alpha.
    A8 = (8, A, 8, 0, 0, 0),
    /// 8 bpp, 3-bit red and green, 2-bit blue.
    R3g3b2 = (8, Argb, 0, 3, 3, 2),
    /// 8 bpp, 2-bit blue, 3-bit green and red.
    B2g3r3 = (8, Abgr, 0, 3, 3, 2),
    /// 8 bpp, 2-bit alpha, red, green, blue.
    A2r2g2b2 = (8, Argb, 2, 2, 2, 2),
    /// 8 bpp, 2-bit alpha, blue, green, red.
    A2b2g2r2 = (8, Abgr, 2, 2, 2, 2),
    /// 8 bpp color palette index.
    C8 = (8, Color, 0, 0, 0, 0),
    /// 8 bpp gray palette index.
    G8 = (8, Gray, 0, 0, 0, 0),
    /// 8 bpp, 4-bit alpha in the low nibble.
    X4a4 = (8, A, 4, 0, 0, 0),
    /// 4 bpp alpha.
    A4 = (4, A, 4, 0, 0, 0),
    /// 4 bpp, 1-bit red, 2-bit green, 1-bit blue.
    R1g2b1 = (4, Argb, 0, 1, 2, 1),
    /// 4 bpp, 1-bit blue, 2-bit green, 1-bit red.
    B1g2r1 = (4, Abgr, 0, 1, 2, 1),
    /// 4 bpp, 1-bit alpha, red, green, blue.
    A1r1g1b1 = (4, Argb, 1, 1, 1, 1),
    /// 4 bpp, 1-bit alpha, blue, green, red.
    A1b1g1r1 = (4, Abgr, 1, 1, 1, 1),
    /// 4 bpp color palette index.
    C4 = (4, Color, 0, 0, 0, 0),
    /// 4 bpp gray palette index.
    G4 = (4, Gray, 0, 0, 0, 0),
    /// 1 bpp alpha.
    A1 = (1, A, 1, 0, 0, 0),
    /// 1 bpp gray palette index.
    G1 = (1, Gray, 0, 0, 0, 0),
    /// Packed YCbCr 4:2:2, 16 bits per pixel.
    Yuy2 = (16, Yuy2, 0, 0, 0, 0),
    /// Planar YCbCr 4:2:0, 12 bits per pixel in three planes.
    Yv12 = (12, Yv12, 0, 0, 0, 0),
}

const_assert!(PixelFormat::ALL.len() == 46);

impl PixelFormat {
    /// Bits per pixel. For planar formats this is the luma plane's 8 bits.
    pub const fn bpp(self) -> u32 {
        match self.code().kind {
            ChannelType::Yv12 => 8,
            _ => self.code().bpp as u32,
        }
    }

    /// The number of significant bits per pixel.
    ///
    /// For indexed and YCbCr formats this is the storage size.
    pub const fn depth(self) -> u32 {
        let c = self.code();
        match c.kind {
            ChannelType::Color | ChannelType::Gray | ChannelType::Yuy2 | ChannelType::Yv12 => {
                c.bpp as u32
            }
            _ => c.a as u32 + c.r as u32 + c.g as u32 + c.b as u32,
        }
    }

    /// Whether pixels carry an alpha channel.
    pub const fn has_alpha(self) -> bool {
        self.code().a > 0
    }

    /// Whether pixels are palette indices.
    pub const fn is_indexed(self) -> bool {
        matches!(self.code().kind, ChannelType::Color | ChannelType::Gray)
    }

    /// Whether pixels are YCbCr.
    pub const fn is_yuv(self) -> bool {
        matches!(self.code().kind, ChannelType::Yuy2 | ChannelType::Yv12)
    }

    /// Whether the color channels are sRGB-encoded.
    pub const fn is_srgb(self) -> bool {
        matches!(self.code().kind, ChannelType::ArgbSrgb)
    }

    /// Whether any channel is wider than 8 bits.
    pub const fn is_wide(self) -> bool {
        let c = self.code();
        c.a > 8 || c.r > 8 || c.g > 8 || c.b > 8
    }

    /// Whether the format has bits that belong to no channel.
    pub const fn has_padding(self) -> bool {
        !self.is_indexed() && !self.is_yuv() && self.depth() != self.code().bpp as u32
    }

    /// Bit offsets of each channel within a pixel.
    ///
    /// Channels with zero width report an offset that is never used.
    pub const fn channel_shifts(self) -> ChannelShifts {
        let c = self.code();
        let (a, r, g, b) = (c.a as u32, c.r as u32, c.g as u32, c.b as u32);
        let bpp = c.bpp as u32;

        match c.kind {
            ChannelType::Argb | ChannelType::ArgbSrgb => ChannelShifts {
                b: 0,
                g: b,
                r: b + g,
                a: b + g + r,
            },
            ChannelType::Abgr => ChannelShifts {
                r: 0,
                g: r,
                b: r + g,
                a: r + g + b,
            },
            // These two count from the most significant end.
            ChannelType::Bgra => ChannelShifts {
                b: bpp - b,
                g: bpp - b - g,
                r: bpp - b - g - r,
                a: bpp - b - g - r - a,
            },
            ChannelType::Rgba => ChannelShifts {
                r: bpp - r,
                g: bpp - r - g,
                b: bpp - r - g - b,
                a: bpp - r - g - b - a,
            },
            _ => ChannelShifts {
                a: 0,
                r: 0,
                g: 0,
                b: 0,
            },
        }
    }
}

/// Number of entries in the reverse lookup table of a [`Palette`].
pub const PALETTE_ENT_SIZE: usize = 1 << 15;

/// A palette for indexed formats.
///
/// `rgba` maps indices to `0xAARRGGBB` colors for fetching. `ent` maps back for storing: for
/// color palettes it is indexed by the `x1r5g5b5` reduction of the color, for gray palettes by
/// the 15-bit luminance `(r * 153 + g * 301 + b * 58) >> 2`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
    /// Whether the palette is indexed by color rather than luminance.
    pub color: bool,
    /// The palette entries.
    pub rgba: [u32; 256],
    /// The reverse lookup table.
    pub ent: Vec<u8>,
}

impl Palette {
    /// Build a color palette from up to 256 `0xAARRGGBB` entries.
    ///
    /// Each reverse lookup slot points at the nearest entry in RGB space.
    pub fn color(entries: &[u32]) -> Self {
        let entries = &entries[..entries.len().min(256)];
        let mut rgba = [0; 256];
        rgba[..entries.len()].copy_from_slice(entries);

        let mut ent = vec![0; PALETTE_ENT_SIZE];
        for (i15, slot) in ent.iter_mut().enumerate() {
            let expand = |v: usize| {
                let v = (v & 0x1f) as i32;
                (v << 3) | (v >> 2)
            };
            let (r, g, b) = (expand(i15 >> 10), expand(i15 >> 5), expand(i15));
            *slot = nearest(entries, |e| {
                let dr = ((e >> 16) & 0xff) as i32 - r;
                let dg = ((e >> 8) & 0xff) as i32 - g;
                let db = (e & 0xff) as i32 - b;
                dr * dr + dg * dg + db * db
            });
        }

        Self {
            color: true,
            rgba,
            ent,
        }
    }

    /// Build a gray palette from up to 256 `0xAARRGGBB` entries.
    ///
    /// Each reverse lookup slot points at the entry with the nearest luminance.
    pub fn gray(entries: &[u32]) -> Self {
        let entries = &entries[..entries.len().min(256)];
        let mut rgba = [0; 256];
        rgba[..entries.len()].copy_from_slice(entries);

        let lum: Vec<i32> = entries.iter().map(|&e| rgb24_to_y15(e) as i32).collect();
        let mut ent = vec![0; PALETTE_ENT_SIZE];
        for (y15, slot) in ent.iter_mut().enumerate() {
            *slot = nearest(&lum, |l| (l - y15 as i32).abs());
        }

        Self {
            color: false,
            rgba,
            ent,
        }
    }

    /// An evenly spaced opaque gray ramp with `1 << bits` entries.
    pub fn gray_ramp(bits: u32) -> Self {
        let bits = bits.clamp(1, 8);
        let max = (1_u32 << bits) - 1;
        let entries: Vec<u32> = (0..=max)
            .map(|i| {
                let v = (i * 255 + max / 2) / max;
                0xff00_0000 | (v * 0x0001_0101)
            })
            .collect();
        Self::gray(&entries)
    }

    /// The reverse lookup of a `0xAARRGGBB` color.
    pub fn lookup(&self, argb: u32) -> u8 {
        let i = if self.color {
            rgb24_to_rgb15(argb)
        } else {
            rgb24_to_y15(argb)
        };
        self.ent.get(i as usize).copied().unwrap_or(0)
    }
}

fn nearest<T: Copy>(entries: &[T], dist: impl Fn(T) -> i32) -> u8 {
    let mut best = (0, i32::MAX);
    for (i, &e) in entries.iter().enumerate() {
        let d = dist(e);
        if d < best.1 {
            best = (i, d);
        }
    }

    best.0 as u8
}

/// The 15-bit luminance of a `0x..RRGGBB` color.
pub const fn rgb24_to_y15(s: u32) -> u32 {
    (((s >> 16) & 0xff) * 153 + ((s >> 8) & 0xff) * 301 + (s & 0xff) * 58) >> 2
}

/// The `x1r5g5b5` truncation of a `0x..RRGGBB` color.
pub const fn rgb24_to_rgb15(s: u32) -> u32 {
    ((s >> 3) & 0x001f) | ((s >> 6) & 0x03e0) | ((s >> 9) & 0x7c00)
}

const_assert!(rgb24_to_y15(0x00ff_ffff) < PALETTE_ENT_SIZE as u32);

#[cfg(test)]
mod tests {
    use super::{ChannelShifts, Palette, PixelFormat};

    #[test]
    fn argb_shifts() {
        assert_eq!(
            PixelFormat::A8r8g8b8.channel_shifts(),
            ChannelShifts {
                a: 24,
                r: 16,
                g: 8,
                b: 0
            }
        );
        assert_eq!(
            PixelFormat::R5g6b5.channel_shifts(),
            ChannelShifts {
                a: 16,
                r: 11,
                g: 5,
                b: 0
            }
        );
    }

    #[test]
    fn rgba_shifts_count_from_the_top() {
        let s = PixelFormat::R8g8b8a8.channel_shifts();
        assert_eq!((s.r, s.g, s.b, s.a), (24, 16, 8, 0));
        let s = PixelFormat::B8g8r8x8.channel_shifts();
        assert_eq!((s.b, s.g, s.r), (24, 16, 8));
    }

    #[test]
    fn table_is_consistent() {
        for &f in PixelFormat::ALL {
            let c = f.code();
            assert!(f.depth() <= u32::from(c.bpp), "{f:?}");
            if !f.is_indexed() && !f.is_yuv() {
                let s = f.channel_shifts();
                for (shift, width) in [(s.a, c.a), (s.r, c.r), (s.g, c.g), (s.b, c.b)] {
                    if width > 0 {
                        assert!(shift + u32::from(width) <= u32::from(c.bpp), "{f:?}");
                    }
                }
            }
        }
    }

    #[test]
    fn srgb_formats_share_the_argb_layout() {
        assert!(PixelFormat::A8r8g8b8Srgb.is_srgb());
        assert!(!PixelFormat::A8r8g8b8.is_srgb());
        assert_eq!(
            PixelFormat::A8r8g8b8Srgb.channel_shifts(),
            PixelFormat::A8r8g8b8.channel_shifts()
        );
        assert_eq!(
            PixelFormat::R8g8b8Srgb.channel_shifts(),
            PixelFormat::R8g8b8.channel_shifts()
        );
        assert_eq!(PixelFormat::R8g8b8Srgb.depth(), 24);
    }

    #[test]
    fn padding() {
        assert!(PixelFormat::X8r8g8b8.has_padding());
        assert!(PixelFormat::X4a4.has_padding());
        assert!(!PixelFormat::A8r8g8b8.has_padding());
        assert!(!PixelFormat::R5g6b5.has_padding());
        assert!(!PixelFormat::C8.has_padding());
    }

    #[test]
    fn gray_ramp_lookup() {
        let p = Palette::gray_ramp(1);
        assert_eq!(p.rgba[0], 0xff00_0000);
        assert_eq!(p.rgba[1], 0xffff_ffff);
        assert_eq!(p.lookup(0xff20_2020), 0);
        assert_eq!(p.lookup(0xffe0_e0e0), 1);
    }

    #[test]
    fn color_palette_lookup() {
        let p = Palette::color(&[0xff00_0000, 0xffff_0000, 0xff00_00ff]);
        assert_eq!(p.lookup(0xfff0_0808), 1);
        assert_eq!(p.lookup(0xff10_10f0), 2);
        assert_eq!(p.lookup(0xff00_0000), 0);
    }
}
