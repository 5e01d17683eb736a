// Copyright 2025 the Pixmill Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::cell::Cell;
use std::rc::Rc;
use std::sync::Arc;

use pixmill_cpu::common::access::ByteOrder;
use pixmill_cpu::common::color::Color;
use pixmill_cpu::common::fixed::Fixed;
use pixmill_cpu::common::format::PixelFormat;
use pixmill_cpu::common::geometry::{LineFixed, PointFixed, Rectangle32, Trapezoid};
use pixmill_cpu::common::region::Region;
use pixmill_cpu::common::transform::Transform;
use pixmill_cpu::raster::add_trapezoids;
use pixmill_cpu::{composite, fill_rectangles, Image, Operator, Repeat};

use crate::util::{argb, filled, pixels, solid, CountingAccessor};

fn unit_trapezoid() -> Trapezoid {
    let p = |x: i32, y: i32| PointFixed::new(Fixed::from_int(x), Fixed::from_int(y));
    Trapezoid {
        top: Fixed::ZERO,
        bottom: Fixed::ONE,
        left: LineFixed::new(p(0, 0), p(0, 1)),
        right: LineFixed::new(p(1, 0), p(1, 1)),
    }
}

#[test]
fn composite_red_through_trapezoid_mask() {
    let src = filled(PixelFormat::A8r8g8b8, 20, 20, 0xffff_0000);
    let dest = filled(PixelFormat::A8r8g8b8, 20, 20, 0xffff_ffff);
    let mask = Image::new_bits(PixelFormat::A1, 20, 20).unwrap();
    add_trapezoids(&mask, 0, 0, &[unit_trapezoid()]);

    composite(Operator::Over, &src, Some(&mask), &dest, 0, 0, 0, 0, 0, 0, 20, 20);

    assert_eq!(dest.pixel(0, 0), Some(0xffff_0000));
    assert_eq!(dest.pixel(1, 1), Some(0xffff_ffff));
    assert_eq!(dest.pixel(19, 19), Some(0xffff_ffff));
}

#[test]
fn composite_src_is_idempotent() {
    let src = Image::from_words(
        PixelFormat::A8r8g8b8,
        2,
        2,
        &[0x8040_2010, 0xffff_ffff, 0x0000_0000, 0x7f7f_0000],
        2,
    )
    .unwrap();
    let dest = Image::new_bits(PixelFormat::A8r8g8b8, 2, 2).unwrap();
    composite(Operator::Src, &src, None, &dest, 0, 0, 0, 0, 0, 0, 2, 2);
    let once = pixels(&dest);
    composite(Operator::Src, &src, None, &dest, 0, 0, 0, 0, 0, 0, 2, 2);
    assert_eq!(pixels(&dest), once);
    assert_eq!(once, pixels(&src));
}

#[test]
fn composite_src_translated_wraps() {
    let src = Image::from_words(PixelFormat::A8r8g8b8, 2, 1, &[0x8040_2010, 0xff00_ff00], 2)
        .unwrap();
    src.set_transform(Some(Transform::from_translate(Fixed::ONE, Fixed::ZERO)));
    src.set_repeat(Repeat::Normal);
    let dest = Image::new_bits(PixelFormat::A8r8g8b8, 2, 1).unwrap();
    composite(Operator::Src, &src, None, &dest, 0, 0, 0, 0, 0, 0, 2, 1);
    assert_eq!(pixels(&dest), [0xff00_ff00, 0x8040_2010]);
}

#[test]
fn composite_over_partial_alpha() {
    let dest = filled(PixelFormat::A8r8g8b8, 1, 1, 0xff00_00ff);
    composite(Operator::Over, &solid(0x8080_0000), None, &dest, 0, 0, 0, 0, 0, 0, 1, 1);
    assert_eq!(dest.pixel(0, 0), Some(0xff80_007f));
}

#[test]
fn composite_respects_destination_bounds() {
    let dest = Image::new_bits(PixelFormat::A8, 4, 4).unwrap();
    composite(Operator::Src, &solid(0xffff_ffff), None, &dest, 0, 0, 0, 0, -2, -2, 4, 4);
    assert_eq!(
        pixels(&dest),
        [0xff, 0xff, 0, 0, 0xff, 0xff, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0]
    );
}

#[test]
fn composite_clip_region() {
    let dest = Image::new_bits(PixelFormat::A8, 3, 3).unwrap();
    let clip = Region::from_rect(0, 0, 3, 3).subtract(&Region::from_rect(1, 1, 1, 1));
    dest.set_clip_region(Some(&clip));
    composite(Operator::Src, &solid(0xffff_ffff), None, &dest, 0, 0, 0, 0, 0, 0, 3, 3);
    assert_eq!(pixels(&dest), [0xff, 0xff, 0xff, 0xff, 0, 0xff, 0xff, 0xff, 0xff]);
}

#[test]
fn composite_unbounded_operator_clears_outside_source() {
    let src = filled(PixelFormat::A8r8g8b8, 1, 1, 0xffff_ffff);
    let dest = filled(PixelFormat::A8r8g8b8, 2, 1, 0xff00_00ff);
    composite(Operator::Src, &src, None, &dest, 0, 0, 0, 0, 0, 0, 2, 1);
    assert_eq!(pixels(&dest), [0xffff_ffff, 0]);
}

#[test]
fn composite_component_alpha() {
    let mask = filled(PixelFormat::A8r8g8b8, 1, 1, 0xffff_0000);
    mask.set_component_alpha(true);
    let dest = filled(PixelFormat::A8r8g8b8, 1, 1, 0xff00_0000);
    composite(Operator::Over, &solid(0xffff_ffff), Some(&mask), &dest, 0, 0, 0, 0, 0, 0, 1, 1);
    assert_eq!(dest.pixel(0, 0), Some(0xffff_0000));

    mask.set_component_alpha(false);
    let dest = filled(PixelFormat::A8r8g8b8, 1, 1, 0xff00_0000);
    composite(Operator::Over, &solid(0xffff_ffff), Some(&mask), &dest, 0, 0, 0, 0, 0, 0, 1, 1);
    assert_eq!(dest.pixel(0, 0), Some(0xffff_ffff));
}

#[test]
fn composite_destination_alpha_map() {
    let dest = filled(PixelFormat::X8r8g8b8, 2, 1, 0x0000_0000);
    let alpha = Image::new_bits(PixelFormat::A8, 1, 1).unwrap();
    dest.set_alpha_map(Some(&alpha), 1, 0);

    composite(Operator::Src, &solid(0x8080_8080), None, &dest, 0, 0, 0, 0, 0, 0, 2, 1);

    // Only the pixel covered by the alpha map is written, and its alpha lands in the map.
    assert_eq!(dest.pixel(0, 0), Some(0));
    assert_eq!(dest.pixel(1, 0), Some(0x0080_8080));
    assert_eq!(alpha.pixel(0, 0), Some(0x80));
}

#[test]
fn composite_same_image_as_mask_and_dest() {
    let image = filled(PixelFormat::A8, 2, 1, 0x8000_0000);
    composite(Operator::In, &image, Some(&image), &image, 0, 0, 0, 0, 0, 0, 2, 1);
    // 0x80 in 0x80 in 0x80, roughly an eighth.
    let v = image.pixel(0, 0).unwrap();
    assert!((0x1f..=0x21).contains(&v), "{v:#x}");
}

#[test]
fn composite_accessor_sees_all_traffic() {
    let src = filled(PixelFormat::A8r8g8b8, 2, 2, 0xff12_3456);
    let dest = Image::new_bits(PixelFormat::R5g6b5, 2, 2).unwrap();
    let counter = Arc::new(CountingAccessor::default());
    src.set_accessor(counter.clone());
    dest.set_accessor(counter.clone());
    // Force the general path by using a transformed source.
    src.set_transform(Some(Transform::from_translate(Fixed::ONE, Fixed::ZERO)));
    src.set_repeat(Repeat::Pad);

    composite(Operator::Src, &src, None, &dest, 0, 0, 0, 0, 0, 0, 2, 2);
    assert!(counter.reads.get() >= 4);
    assert_eq!(counter.writes.get(), 4);
}

#[test]
fn composite_byte_orders_agree() {
    let mut results = Vec::new();
    for order in [ByteOrder::Little, ByteOrder::Big] {
        let formats = [
            PixelFormat::A8r8g8b8,
            PixelFormat::R5g6b5,
            PixelFormat::A4,
            PixelFormat::A1,
        ];
        for format in formats {
            let dest = Image::new_bits(format, 5, 1).unwrap();
            dest.set_byte_order(order);
            fill_rectangles(
                Operator::Src,
                &dest,
                Color::from_a8r8g8b8(0xffff_ffff),
                &[Rectangle32::new(1, 0, 2, 1)],
            );
            composite(Operator::Over, &solid(0x8000_0000), None, &dest, 0, 0, 0, 0, 2, 0, 3, 1);
            let row: Vec<u32> = (0..5).map(|x| argb(&dest, x, 0)).collect();
            results.push((format, row));
        }
    }

    let (little, big) = results.split_at(results.len() / 2);
    for (l, b) in little.iter().zip(big) {
        assert_eq!(l.1, b.1, "{:?}", l.0);
    }
}

#[test]
fn composite_destroy_runs_after_last_use() {
    let calls = Rc::new(Cell::new(0));
    let src = filled(PixelFormat::A8r8g8b8, 1, 1, 0xffff_ffff);
    let seen = calls.clone();
    src.set_destroy_function(move |_| seen.set(seen.get() + 1));

    let mask = src.clone();
    let dest = Image::new_bits(PixelFormat::A8r8g8b8, 1, 1).unwrap();
    composite(Operator::Over, &src, Some(&mask), &dest, 0, 0, 0, 0, 0, 0, 1, 1);
    drop(src);
    assert_eq!(calls.get(), 0);
    drop(mask);
    assert_eq!(calls.get(), 1);
}
