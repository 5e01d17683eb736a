// Copyright 2025 the Pixmill Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use pixmill_cpu::common::color::Color;
use pixmill_cpu::common::fixed::Fixed;
use pixmill_cpu::common::format::PixelFormat;
use pixmill_cpu::common::geometry::PointFixed;
use pixmill_cpu::common::transform::Transform;
use pixmill_cpu::{
    composite, Error, Filter, GradientStop, Image, Kernel, Operator, Repeat, SeparableKernel,
};

use crate::util::{argb, filled, pixels};

const RED: u32 = 0xffff_0000;
const BLUE: u32 = 0xff00_00ff;

fn red_blue() -> Image {
    Image::from_words(PixelFormat::A8r8g8b8, 2, 1, &[RED, BLUE], 2).unwrap()
}

fn point(x: i32, y: i32) -> PointFixed {
    PointFixed::new(Fixed::from_int(x), Fixed::from_int(y))
}

fn black_to_white() -> [GradientStop; 2] {
    [
        GradientStop::new(Fixed::ZERO, Color::from_a8r8g8b8(0xff00_0000)),
        GradientStop::new(Fixed::ONE, Color::from_a8r8g8b8(0xffff_ffff)),
    ]
}

/// Composite `src` with `Src` into a fresh `width × height` destination.
fn render(src: &Image, src_x: i32, width: u32, height: u32) -> Image {
    let dest = Image::new_bits(PixelFormat::A8r8g8b8, width, height).unwrap();
    composite(
        Operator::Src,
        src,
        None,
        &dest,
        src_x,
        0,
        0,
        0,
        0,
        0,
        width as i32,
        height as i32,
    );
    dest
}

fn red_channel(image: &Image) -> Vec<u32> {
    pixels(image).iter().map(|p| (p >> 16) & 0xff).collect()
}

#[test]
fn sampling_repeat_modes() {
    let src = red_blue();
    let cases = [
        (Repeat::None, [0, 0, RED, BLUE, 0, 0]),
        (Repeat::Normal, [RED, BLUE, RED, BLUE, RED, BLUE]),
        (Repeat::Pad, [RED, RED, RED, BLUE, BLUE, BLUE]),
        (Repeat::Reflect, [BLUE, RED, RED, BLUE, BLUE, RED]),
    ];
    for (repeat, expected) in cases {
        src.set_repeat(repeat);
        assert_eq!(pixels(&render(&src, -2, 6, 1)), expected, "{repeat:?}");
    }
}

#[test]
fn sampling_nearest_upscale() {
    let src = red_blue();
    let two = Fixed::from_int(2);
    src.set_transform(Some(Transform::from_scale(two, two)));

    let dest = render(&src, 0, 4, 2);
    assert_eq!(pixels(&dest), [RED, RED, BLUE, BLUE, RED, RED, BLUE, BLUE]);
}

#[test]
fn sampling_bilinear_upscale() {
    let src = Image::from_words(PixelFormat::A8r8g8b8, 2, 1, &[0xff00_0000, 0xffff_ffff], 2)
        .unwrap();
    let two = Fixed::from_int(2);
    src.set_transform(Some(Transform::from_scale(two, two)));
    src.set_filter(Filter::Bilinear);
    src.set_repeat(Repeat::Pad);

    let dest = render(&src, 0, 4, 1);
    let red = red_channel(&dest);
    assert_eq!(red[0], 0);
    assert!(red[1].abs_diff(0x40) <= 1, "{:#x}", red[1]);
    assert!(red[2].abs_diff(0xbf) <= 1, "{:#x}", red[2]);
    assert_eq!(red[3], 0xff);
    assert!(pixels(&dest).iter().all(|p| p >> 24 == 0xff));
}

#[test]
fn sampling_identity_transform_is_dropped() {
    let src = red_blue();
    src.set_transform(Some(Transform::IDENTITY));
    assert_eq!(src.transform(), None);
    assert_eq!(pixels(&render(&src, 0, 2, 1)), [RED, BLUE]);
}

#[test]
fn sampling_singular_transform_is_transparent() {
    let src = filled(PixelFormat::A8r8g8b8, 4, 4, RED);
    let singular = Transform::from_scale(Fixed::ZERO, Fixed::ONE);
    src.set_transform(Some(singular));
    assert_eq!(src.transform(), Some(singular));

    let dest = filled(PixelFormat::A8r8g8b8, 4, 4, 0xffff_ffff);
    composite(Operator::Over, &src, None, &dest, 0, 0, 0, 0, 0, 0, 4, 4);
    assert!(pixels(&dest).iter().all(|&p| p == 0xffff_ffff));

    composite(Operator::Src, &src, None, &dest, 0, 0, 0, 0, 0, 0, 4, 4);
    assert!(pixels(&dest).iter().all(|&p| p == 0));
}

#[test]
fn sampling_convolution_box_blur() {
    let src = filled(PixelFormat::A8r8g8b8, 3, 3, 0xff00_0000);
    src.set_pixel(1, 1, 0xffff_ffff);
    let ninth = Fixed::from_f64(1.0 / 9.0);
    src.set_filter(Filter::Convolution(Kernel::new(3, 3, vec![ninth; 9]).unwrap()));

    let dest = render(&src, 0, 3, 3);
    assert_eq!(argb(&dest, 1, 1), 0xff1c_1c1c);
}

#[test]
fn sampling_separable_identity_kernel() {
    let src = red_blue();
    let kernel = SeparableKernel::new(1, 1, 0, 0, vec![Fixed::ONE], vec![Fixed::ONE]).unwrap();
    src.set_filter(Filter::SeparableConvolution(kernel));
    assert_eq!(pixels(&render(&src, 0, 2, 1)), [RED, BLUE]);
}

#[test]
fn sampling_kernel_validation() {
    assert!(matches!(
        Kernel::new(2, 2, vec![Fixed::ONE; 3]),
        Err(Error::InvalidFilter(_))
    ));
    assert!(matches!(
        Kernel::new(0, 1, Vec::new()),
        Err(Error::InvalidFilter(_))
    ));
    assert!(matches!(
        SeparableKernel::new(1, 1, 17, 0, vec![Fixed::ONE; 1 << 17], vec![Fixed::ONE]),
        Err(Error::InvalidFilter(_))
    ));
    assert!(matches!(
        SeparableKernel::new(2, 1, 1, 0, vec![Fixed::ONE; 2], vec![Fixed::ONE]),
        Err(Error::InvalidFilter(_))
    ));
}

#[test]
fn sampling_source_alpha_map() {
    let src = filled(PixelFormat::A8r8g8b8, 2, 1, RED);
    let alpha = Image::from_data(PixelFormat::A8, 2, 1, vec![0x80, 0, 0, 0], 4).unwrap();
    src.set_alpha_map(Some(&alpha), 0, 0);

    let alphas: Vec<u32> = pixels(&render(&src, 0, 2, 1)).iter().map(|p| p >> 24).collect();
    assert_eq!(alphas, [0x80, 0]);

    // Alpha maps must be pixel buffers.
    let solid = Image::solid_fill(Color::from_a8r8g8b8(0));
    src.set_alpha_map(Some(&solid), 0, 0);
    let alphas: Vec<u32> = pixels(&render(&src, 0, 2, 1)).iter().map(|p| p >> 24).collect();
    assert_eq!(alphas, [0x80, 0]);

    src.set_alpha_map(None, 0, 0);
    assert_eq!(pixels(&render(&src, 0, 2, 1)), [RED, RED]);
}

#[test]
fn sampling_linear_gradient() {
    let g = Image::linear_gradient(point(0, 0), point(10, 0), &black_to_white()).unwrap();

    let dest = render(&g, 0, 12, 1);
    let red = red_channel(&dest);
    assert!(red[..10].windows(2).all(|w| w[0] < w[1]), "{red:?}");
    assert!(red[0] < 0x20 && red[9] > 0xe0);
    assert_eq!(pixels(&dest)[10..], [0, 0]);

    g.set_repeat(Repeat::Pad);
    assert_eq!(pixels(&render(&g, 0, 12, 1))[10..], [0xffff_ffff, 0xffff_ffff]);
}

#[test]
fn sampling_gradient_with_transparent_stop_is_premultiplied() {
    let stops = [
        GradientStop::new(Fixed::ZERO, Color::from_a8r8g8b8(0x00ff_ffff)),
        GradientStop::new(Fixed::ONE, Color::from_a8r8g8b8(0x00ff_ffff)),
    ];
    let g = Image::linear_gradient(point(0, 0), point(4, 0), &stops).unwrap();
    assert_eq!(pixels(&render(&g, 0, 4, 1)), [0; 4]);
}

#[test]
fn sampling_gradient_needs_stops() {
    assert_eq!(
        Image::linear_gradient(point(0, 0), point(1, 0), &[]).unwrap_err(),
        Error::NoGradientStops
    );
}

#[test]
fn sampling_radial_gradient() {
    let g = Image::radial_gradient(
        point(5, 5),
        point(5, 5),
        Fixed::ZERO,
        Fixed::from_int(5),
        &black_to_white(),
    )
    .unwrap();

    let dest = render(&g, 0, 10, 10);
    let center = argb(&dest, 5, 5);
    let edge = argb(&dest, 0, 5);
    assert_eq!(center >> 24, 0xff);
    assert!((center >> 16) & 0xff < 0x30);
    assert!((edge >> 16) & 0xff > 0xd0);
    assert_eq!(argb(&dest, 0, 0), 0);
}

#[test]
fn sampling_conical_gradient() {
    let g = Image::conical_gradient(point(5, 5), Fixed::ZERO, &black_to_white()).unwrap();

    let dest = render(&g, 0, 10, 10);
    assert!(pixels(&dest).iter().all(|p| p >> 24 == 0xff));
    // The sweep starts just above the positive x axis and ends just below it.
    assert!((argb(&dest, 9, 5) >> 16) & 0xff > 0xf0);
    assert!((argb(&dest, 9, 4) >> 16) & 0xff < 0x10);
}

#[test]
fn sampling_transformed_gradient() {
    let g = Image::linear_gradient(point(0, 0), point(10, 0), &black_to_white()).unwrap();
    g.set_transform(Some(Transform::from_translate(Fixed::from_int(5), Fixed::ZERO)));

    // After the translation the gradient starts at x = 5.
    let red = red_channel(&render(&g, 0, 10, 1));
    assert_eq!(red[..5], [0; 5]);
    assert!(red[5] < 0x20);
}
