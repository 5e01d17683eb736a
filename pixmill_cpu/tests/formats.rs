// Copyright 2025 the Pixmill Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::sync::Arc;

use pixmill_cpu::common::format::{Palette, PixelFormat};
use pixmill_cpu::{composite, Dither, Error, Image, Operator};

use crate::util::{argb, filled, pixels, solid};

#[test]
fn formats_rgba_to_argb() {
    let src = Image::from_words(
        PixelFormat::R8g8b8a8,
        4,
        1,
        &[0x1122_3300, 0x5566_7744, 0x99aa_bb88, 0xddee_ffcc],
        4,
    )
    .unwrap();
    let dest = Image::new_bits(PixelFormat::A8r8g8b8, 4, 1).unwrap();

    composite(Operator::Src, &src, None, &dest, 0, 0, 0, 0, 0, 0, 4, 1);

    assert_eq!(
        pixels(&dest),
        [0x0011_2233, 0x4455_6677, 0x8899_aabb, 0xccdd_eeff]
    );
}

#[test]
fn formats_white_and_black_survive_every_format() {
    for &format in PixelFormat::ALL {
        if format.is_indexed() || format.is_yuv() {
            continue;
        }
        let has_color = format.code().r > 0;

        let white = filled(format, 3, 2, 0xffff_ffff);
        let expected = if has_color { 0xffff_ffff } else { 0xff00_0000 };
        assert_eq!(argb(&white, 2, 1), expected, "white in {format:?}");

        let black = filled(format, 3, 2, 0xff00_0000);
        assert_eq!(argb(&black, 0, 0), 0xff00_0000, "black in {format:?}");
    }
}

#[test]
fn formats_depth() {
    let depth = |f| Image::new_bits(f, 1, 1).unwrap().depth();
    assert_eq!(depth(PixelFormat::A8r8g8b8), 32);
    assert_eq!(depth(PixelFormat::X8r8g8b8), 24);
    assert_eq!(depth(PixelFormat::R5g6b5), 16);
    assert_eq!(depth(PixelFormat::A1), 1);
}

#[test]
fn formats_narrow_channels_round() {
    // 0x80 is closer to 16/31 than 15/31.
    let image = filled(PixelFormat::R5g6b5, 1, 1, 0xff80_8080);
    assert_eq!(image.pixel(0, 0), Some((16 << 11) | (32 << 5) | 16));
}

#[test]
fn formats_wide_channels() {
    let image = filled(PixelFormat::A2r10g10b10, 1, 1, 0xffff_0000);
    assert_eq!(image.pixel(0, 0), Some(0xfff0_0000));
    assert_eq!(argb(&image, 0, 0), 0xffff_0000);
}

#[test]
fn formats_yuy2() {
    // One macropixel: Y0 U Y1 V, white then black.
    let src = Image::from_data(PixelFormat::Yuy2, 2, 1, vec![235, 128, 16, 128], 4).unwrap();
    let dest = Image::new_bits(PixelFormat::A8r8g8b8, 2, 1).unwrap();

    composite(Operator::Src, &src, None, &dest, 0, 0, 0, 0, 0, 0, 2, 1);

    assert_eq!(pixels(&dest), [0xffff_ffff, 0xff00_0000]);
}

#[test]
fn formats_yv12() {
    let stride = 16;
    let mut data = vec![16; 48];
    data[0] = 235;
    // The V plane follows the luma plane, then comes U.
    data[32..].fill(128);
    let src = Image::from_data(PixelFormat::Yv12, 2, 2, data, stride).unwrap();
    let dest = Image::new_bits(PixelFormat::A8r8g8b8, 2, 2).unwrap();

    composite(Operator::Src, &src, None, &dest, 0, 0, 0, 0, 0, 0, 2, 2);

    assert_eq!(
        pixels(&dest),
        [0xffff_ffff, 0xff00_0000, 0xff00_0000, 0xff00_0000]
    );
}

#[test]
fn formats_yv12_needs_positive_word_stride() {
    let err = Image::from_data(PixelFormat::Yv12, 2, 2, vec![0; 64], -16).unwrap_err();
    assert_eq!(err, Error::UnsupportedStride);
    let err = Image::from_data(PixelFormat::Yv12, 2, 2, vec![0; 64], 6).unwrap_err();
    assert_eq!(err, Error::UnsupportedStride);
}

fn palette() -> Arc<Palette> {
    Arc::new(Palette::color(&[
        0xff00_0000,
        0xffff_0000,
        0xff00_ff00,
        0xff00_00ff,
    ]))
}

#[test]
fn formats_color_indexed_fetch() {
    let src =
        Image::from_data_indexed(PixelFormat::C8, 2, 1, vec![1, 3, 0, 0], 4, palette()).unwrap();
    let dest = Image::new_bits(PixelFormat::A8r8g8b8, 2, 1).unwrap();

    composite(Operator::Src, &src, None, &dest, 0, 0, 0, 0, 0, 0, 2, 1);

    assert_eq!(pixels(&dest), [0xffff_0000, 0xff00_00ff]);
}

#[test]
fn formats_color_indexed_store() {
    let dest =
        Image::from_data_indexed(PixelFormat::C8, 2, 1, vec![0; 4], 4, palette()).unwrap();

    composite(Operator::Src, &solid(0xff00_ff00), None, &dest, 0, 0, 0, 0, 1, 0, 1, 1);

    assert_eq!(pixels(&dest), [0, 2]);
    assert_eq!(argb(&dest, 1, 0), 0xff00_ff00);
}

#[test]
fn formats_color_indexed_needs_palette() {
    let err = Image::from_data(PixelFormat::C4, 2, 2, vec![0; 8], 4).unwrap_err();
    assert_eq!(err, Error::MissingPalette);
}

#[test]
fn formats_gray_default_ramp() {
    let image = Image::from_data(PixelFormat::G8, 2, 1, vec![0, 255, 0, 0], 4).unwrap();
    assert_eq!(argb(&image, 0, 0), 0xff00_0000);
    assert_eq!(argb(&image, 1, 0), 0xffff_ffff);

    let g1 = filled(PixelFormat::G1, 8, 1, 0xffe0_e0e0);
    assert_eq!(g1.pixel(7, 0), Some(1));
}

#[test]
fn formats_negative_stride() {
    let image = Image::from_data(PixelFormat::A8, 1, 2, vec![0x11, 0, 0, 0, 0x22], -4).unwrap();
    assert_eq!(image.pixel(0, 0), Some(0x22));
    assert_eq!(image.pixel(0, 1), Some(0x11));

    image.set_pixel(0, 1, 0x33);
    assert_eq!(image.data().unwrap()[0], 0x33);
}

#[test]
fn formats_layout_errors() {
    assert_eq!(
        Image::from_data(PixelFormat::A8r8g8b8, 4, 1, vec![0; 16], 8).unwrap_err(),
        Error::StrideTooSmall
    );
    assert_eq!(
        Image::from_data(PixelFormat::A8r8g8b8, 4, 2, vec![0; 20], 16).unwrap_err(),
        Error::BufferTooSmall
    );
    assert_eq!(
        Image::new_bits(PixelFormat::A8, u32::MAX, 1).unwrap_err(),
        Error::InvalidDimensions
    );
}

#[test]
fn formats_sub_byte_pixels_are_independent() {
    let image = Image::new_bits(PixelFormat::A4, 3, 1).unwrap();
    image.set_pixel(0, 0, 0x3);
    image.set_pixel(1, 0, 0xc);
    image.set_pixel(2, 0, 0xf);
    assert_eq!(pixels(&image), [0x3, 0xc, 0xf]);

    let image = Image::new_bits(PixelFormat::A1, 10, 1).unwrap();
    image.set_pixel(9, 0, 1);
    assert_eq!(pixels(&image), [0, 0, 0, 0, 0, 0, 0, 0, 0, 1]);
}

#[test]
fn formats_srgb_sources_are_linearized() {
    let src = Image::from_words(PixelFormat::A8r8g8b8Srgb, 1, 1, &[0xff80_8080], 1).unwrap();
    let dest = Image::new_bits(PixelFormat::A8r8g8b8, 1, 1).unwrap();
    composite(Operator::Src, &src, None, &dest, 0, 0, 0, 0, 0, 0, 1, 1);
    assert_eq!(pixels(&dest), [0xff37_3737]);

    let copy = Image::new_bits(PixelFormat::A8r8g8b8Srgb, 1, 1).unwrap();
    composite(Operator::Src, &src, None, &copy, 0, 0, 0, 0, 0, 0, 1, 1);
    assert_eq!(pixels(&copy), [0xff80_8080]);
}

#[test]
fn formats_srgb_destinations_are_encoded() {
    let src = solid(0xff80_8080);
    let dest = Image::new_bits(PixelFormat::R8g8b8Srgb, 2, 1).unwrap();
    composite(Operator::Src, &src, None, &dest, 0, 0, 0, 0, 0, 0, 2, 1);
    assert_eq!(pixels(&dest), [0x00bc_bcbc, 0x00bc_bcbc]);
    assert_eq!(argb(&dest, 1, 0), 0xff80_8080);
}

fn dithered_half_alpha(offset: (i32, i32)) -> Vec<u32> {
    let dest = Image::new_bits(PixelFormat::A1, 8, 8).unwrap();
    dest.set_dither(Dither::Fast);
    dest.set_dither_offset(offset.0, offset.1);
    composite(Operator::Src, &solid(0x8000_0000), None, &dest, 0, 0, 0, 0, 0, 0, 8, 8);
    pixels(&dest)
}

#[test]
fn formats_dither_spreads_coverage() {
    let plain = Image::new_bits(PixelFormat::A1, 8, 8).unwrap();
    composite(Operator::Src, &solid(0x8000_0000), None, &plain, 0, 0, 0, 0, 0, 0, 8, 8);
    assert!(pixels(&plain).iter().all(|&p| p == 1));

    let dithered = dithered_half_alpha((0, 0));
    assert_eq!(dithered.iter().filter(|&&p| p == 1).count(), 32);
    assert_eq!(dithered[0], 0);
}

#[test]
fn formats_dither_offset_moves_the_pattern() {
    let base = dithered_half_alpha((0, 0));
    let shifted = dithered_half_alpha((1, 0));
    assert_ne!(base, shifted);
    for y in 0..8 {
        for x in 0..8 {
            assert_eq!(shifted[y * 8 + x], base[y * 8 + (x + 1) % 8], "at ({x}, {y})");
        }
    }
}

#[test]
fn formats_dither_keeps_exact_colors() {
    for dither in [Dither::Fast, Dither::Good, Dither::Best, Dither::OrderedBayer8] {
        let dest = Image::new_bits(PixelFormat::A8r8g8b8, 8, 8).unwrap();
        dest.set_dither(dither);
        composite(Operator::Src, &solid(0xff33_6699), None, &dest, 0, 0, 0, 0, 0, 0, 8, 8);
        assert!(pixels(&dest).iter().all(|&p| p == 0xff33_6699), "{dither:?}");

        let narrow = Image::new_bits(PixelFormat::R5g6b5, 8, 8).unwrap();
        narrow.set_dither(dither);
        composite(Operator::Src, &solid(0xffff_0000), None, &narrow, 0, 0, 0, 0, 0, 0, 8, 8);
        assert!(pixels(&narrow).iter().all(|&p| p == 0xf800), "{dither:?}");
    }
}
