// Copyright 2025 the Pixmill Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Images and their sampling attributes.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

use pixmill_common::access::{Accessor, ByteOrder};
use pixmill_common::bits::Bits;
use pixmill_common::color::{Color, Rgba16};
use pixmill_common::fixed::Fixed;
use pixmill_common::format::{Palette, PixelFormat};
use pixmill_common::geometry::{Box32, PointFixed};
use pixmill_common::region::Region;
use pixmill_common::transform::Transform;

use crate::dither::Dither;
use crate::gradient::{ConicalGradient, Gradient, GradientStop, LinearGradient, RadialGradient};
use crate::{Error, Result};

/// How an image is extended beyond its bounds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Repeat {
    /// Outside of the image is transparent.
    #[default]
    None,
    /// The image is tiled.
    Normal,
    /// The edge pixels are extended.
    Pad,
    /// The image is tiled, mirroring every other tile.
    Reflect,
}

/// A convolution kernel of `width × height` 16.16 weights in row-major order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Kernel {
    width: u32,
    height: u32,
    params: Vec<Fixed>,
}

impl Kernel {
    /// Create a kernel. `params` must hold exactly `width * height` weights.
    pub fn new(width: u32, height: u32, params: Vec<Fixed>) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::InvalidFilter("kernel dimensions must be positive"));
        }
        if u64::from(width) * u64::from(height) != params.len() as u64 {
            return Err(Error::InvalidFilter("kernel size doesn't match its weights"));
        }

        Ok(Self {
            width,
            height,
            params,
        })
    }

    /// The width of the kernel.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// The height of the kernel.
    pub fn height(&self) -> u32 {
        self.height
    }

    pub(crate) fn params(&self) -> &[Fixed] {
        &self.params
    }
}

/// A separable convolution kernel with subpixel phases.
///
/// Each axis holds `2^phase_bits` rows of weights, one per subpixel phase, so `x_params`
/// holds `width << x_phase_bits` weights and `y_params` holds `height << y_phase_bits`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeparableKernel {
    width: u32,
    height: u32,
    x_phase_bits: u32,
    y_phase_bits: u32,
    x_params: Vec<Fixed>,
    y_params: Vec<Fixed>,
}

impl SeparableKernel {
    /// Create a separable kernel.
    pub fn new(
        width: u32,
        height: u32,
        x_phase_bits: u32,
        y_phase_bits: u32,
        x_params: Vec<Fixed>,
        y_params: Vec<Fixed>,
    ) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::InvalidFilter("kernel dimensions must be positive"));
        }
        if x_phase_bits > 16 || y_phase_bits > 16 {
            return Err(Error::InvalidFilter("at most 16 subpixel phase bits"));
        }
        if (u64::from(width) << x_phase_bits) != x_params.len() as u64
            || (u64::from(height) << y_phase_bits) != y_params.len() as u64
        {
            return Err(Error::InvalidFilter("kernel size doesn't match its weights"));
        }

        Ok(Self {
            width,
            height,
            x_phase_bits,
            y_phase_bits,
            x_params,
            y_params,
        })
    }

    pub(crate) fn width(&self) -> u32 {
        self.width
    }

    pub(crate) fn height(&self) -> u32 {
        self.height
    }

    pub(crate) fn x_phase_bits(&self) -> u32 {
        self.x_phase_bits
    }

    pub(crate) fn y_phase_bits(&self) -> u32 {
        self.y_phase_bits
    }

    pub(crate) fn x_params(&self) -> &[Fixed] {
        &self.x_params
    }

    pub(crate) fn y_params(&self) -> &[Fixed] {
        &self.y_params
    }
}

/// How an image is sampled.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Filter {
    /// Whatever is fastest. Same as [`Filter::Nearest`].
    Fast,
    /// A reasonable tradeoff. Same as [`Filter::Bilinear`].
    Good,
    /// The best available quality. Same as [`Filter::Bilinear`].
    Best,
    /// The nearest pixel.
    #[default]
    Nearest,
    /// Bilinear interpolation between the four nearest pixels.
    Bilinear,
    /// A weighted sum over a kernel centered on the sample point.
    Convolution(Kernel),
    /// A product of horizontal and vertical kernels, selected by subpixel phase.
    SeparableConvolution(SeparableKernel),
}

impl Filter {
    /// Whether the filter reads exactly one pixel at untransformed pixel centers.
    pub(crate) fn is_point_sampling(&self) -> bool {
        matches!(
            self,
            Self::Fast | Self::Good | Self::Best | Self::Nearest | Self::Bilinear
        )
    }
}

/// Where sample points come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Mapping {
    Identity,
    /// Maps destination space to image space.
    Inverse(Transform),
    /// The transform can't be inverted; the image samples as transparent.
    Singular,
}

#[derive(Debug)]
pub(crate) enum Kind {
    Bits(Bits),
    Solid(Rgba16),
    Gradient(Gradient),
}

#[derive(Debug)]
pub(crate) struct AlphaMap {
    pub(crate) image: Image,
    pub(crate) x: i32,
    pub(crate) y: i32,
}

impl AlphaMap {
    fn release(self) {
        if let Ok(mut repr) = self.image.0.try_borrow_mut() {
            repr.alpha_users = repr.alpha_users.saturating_sub(1);
        }
    }
}

type DestroyFn = Box<dyn FnOnce(Vec<u8>)>;

pub(crate) struct ImageRepr {
    pub(crate) kind: Kind,
    pub(crate) transform: Option<Transform>,
    pub(crate) mapping: Mapping,
    pub(crate) repeat: Repeat,
    pub(crate) filter: Filter,
    pub(crate) clip: Option<Region>,
    pub(crate) source_clipping: bool,
    pub(crate) alpha_map: Option<AlphaMap>,
    pub(crate) component_alpha: bool,
    pub(crate) dither: Dither,
    pub(crate) dither_offset: (i32, i32),
    /// How many images use this one as their alpha map.
    alpha_users: usize,
    destroy: Option<DestroyFn>,
}

impl fmt::Debug for ImageRepr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageRepr")
            .field("kind", &self.kind)
            .field("transform", &self.transform)
            .field("repeat", &self.repeat)
            .field("filter", &self.filter)
            .field("clip", &self.clip)
            .field("component_alpha", &self.component_alpha)
            .field("dither", &self.dither)
            .finish_non_exhaustive()
    }
}

impl Drop for ImageRepr {
    fn drop(&mut self) {
        if let Some(map) = self.alpha_map.take() {
            map.release();
        }
        if let Some(destroy) = self.destroy.take() {
            let data = match &mut self.kind {
                Kind::Bits(bits) => bits.take_data(),
                _ => Vec::new(),
            };
            destroy(data);
        }
    }
}

/// A reference counted image.
///
/// Cloning an image acquires a new reference to the same image; all references observe
/// attribute changes. The image is released, and its destroy function runs, when the last
/// reference is dropped.
#[derive(Clone)]
pub struct Image(pub(crate) Rc<RefCell<ImageRepr>>);

impl fmt::Debug for Image {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.try_borrow() {
            Ok(repr) => repr.fmt(f),
            Err(_) => f.write_str("Image(<borrowed>)"),
        }
    }
}

impl Image {
    fn from_kind(kind: Kind) -> Self {
        Self(Rc::new(RefCell::new(ImageRepr {
            kind,
            transform: None,
            mapping: Mapping::Identity,
            repeat: Repeat::None,
            filter: Filter::Nearest,
            clip: None,
            source_clipping: false,
            alpha_map: None,
            component_alpha: false,
            dither: Dither::None,
            dither_offset: (0, 0),
            alpha_users: 0,
            destroy: None,
        })))
    }

    /// Create a zero-filled image.
    pub fn new_bits(format: PixelFormat, width: u32, height: u32) -> Result<Self> {
        let bits = Bits::new(format, width, height)?;
        Ok(Self::from_kind(Kind::Bits(bits)))
    }

    /// Wrap a buffer with rows `stride` bytes apart. A negative stride stores rows bottom-up.
    ///
    /// Color indexed formats need [`Image::from_data_indexed`].
    pub fn from_data(
        format: PixelFormat,
        width: u32,
        height: u32,
        data: Vec<u8>,
        stride: i32,
    ) -> Result<Self> {
        let bits = Bits::from_data(format, width, height, data, stride)?;
        Ok(Self::from_kind(Kind::Bits(bits)))
    }

    /// Wrap a buffer of an indexed format.
    pub fn from_data_indexed(
        format: PixelFormat,
        width: u32,
        height: u32,
        data: Vec<u8>,
        stride: i32,
        palette: Arc<Palette>,
    ) -> Result<Self> {
        let bits = Bits::from_data_indexed(format, width, height, data, stride, palette)?;
        Ok(Self::from_kind(Kind::Bits(bits)))
    }

    /// Wrap native-endian 32-bit words, `stride_words` words per row.
    pub fn from_words(
        format: PixelFormat,
        width: u32,
        height: u32,
        words: &[u32],
        stride_words: i32,
    ) -> Result<Self> {
        let bits = Bits::from_words(format, width, height, words, stride_words)?;
        Ok(Self::from_kind(Kind::Bits(bits)))
    }

    /// Create an image of infinite extent in a single color.
    ///
    /// The color is taken as premultiplied; color channels above alpha are clamped.
    pub fn solid_fill(color: Color) -> Self {
        Self::from_kind(Kind::Solid(color.to_premultiplied()))
    }

    /// Create a linear gradient from `p1` to `p2`.
    pub fn linear_gradient(p1: PointFixed, p2: PointFixed, stops: &[GradientStop]) -> Result<Self> {
        let g = LinearGradient::new(p1, p2, stops)?;
        Ok(Self::from_kind(Kind::Gradient(Gradient::Linear(g))))
    }

    /// Create a two-circle radial gradient.
    ///
    /// Offset 0 lies on the circle around `inner` with `inner_radius`, offset 1 on the circle
    /// around `outer` with `outer_radius`.
    pub fn radial_gradient(
        inner: PointFixed,
        outer: PointFixed,
        inner_radius: Fixed,
        outer_radius: Fixed,
        stops: &[GradientStop],
    ) -> Result<Self> {
        let g = RadialGradient::new(inner, outer, inner_radius, outer_radius, stops)?;
        Ok(Self::from_kind(Kind::Gradient(Gradient::Radial(g))))
    }

    /// Create a conical (sweep) gradient around `center`, starting at `angle` degrees.
    pub fn conical_gradient(
        center: PointFixed,
        angle: Fixed,
        stops: &[GradientStop],
    ) -> Result<Self> {
        let g = ConicalGradient::new(center, angle, stops)?;
        Ok(Self::from_kind(Kind::Gradient(Gradient::Conical(g))))
    }

    /// The number of live references to this image.
    pub fn ref_count(&self) -> usize {
        Rc::strong_count(&self.0)
    }

    /// Run `destroy` with the image's buffer when the last reference is released.
    ///
    /// Procedural images pass an empty buffer.
    pub fn set_destroy_function(&self, destroy: impl FnOnce(Vec<u8>) + 'static) {
        self.0.borrow_mut().destroy = Some(Box::new(destroy));
    }

    /// Set the transform from image space to destination space, or reset it with `None`.
    ///
    /// A transform that can't be inverted makes the image sample as transparent.
    pub fn set_transform(&self, transform: Option<Transform>) {
        let mut repr = self.0.borrow_mut();
        let transform = transform.filter(|t| !t.is_identity());
        repr.mapping = match &transform {
            None => Mapping::Identity,
            Some(t) => match t.invert() {
                Some(inv) => Mapping::Inverse(inv),
                None => {
                    log::warn!("image transform is singular, sampling as transparent");
                    Mapping::Singular
                }
            },
        };
        repr.transform = transform;
    }

    /// The current transform, if any.
    pub fn transform(&self) -> Option<Transform> {
        self.0.borrow().transform
    }

    /// Set how the image is sampled.
    pub fn set_filter(&self, filter: Filter) {
        self.0.borrow_mut().filter = filter;
    }

    /// Set how the image extends beyond its bounds.
    pub fn set_repeat(&self, repeat: Repeat) {
        self.0.borrow_mut().repeat = repeat;
    }

    /// Restrict the image to `region`, or lift the restriction with `None`.
    ///
    /// For destinations the clip always applies. For sources and masks it applies only with
    /// [`Image::set_source_clipping`].
    pub fn set_clip_region(&self, region: Option<&Region>) {
        self.0.borrow_mut().clip = region.cloned();
    }

    /// Whether the clip region of this image also applies when it is used as a source.
    pub fn set_source_clipping(&self, enable: bool) {
        self.0.borrow_mut().source_clipping = enable;
    }

    /// Take the alpha channel from `alpha_map`, placed at `(x, y)`, instead of this image.
    ///
    /// Only pixel buffer images can be alpha maps, and alpha maps can't be nested: an image
    /// that serves as an alpha map can't get one of its own, and an image that has an alpha map
    /// can't serve as one. Such requests are ignored.
    pub fn set_alpha_map(&self, alpha_map: Option<&Image>, x: i32, y: i32) {
        let Some(map) = alpha_map else {
            let old = self.0.borrow_mut().alpha_map.take();
            if let Some(old) = old {
                old.release();
            }
            return;
        };

        if Rc::ptr_eq(&self.0, &map.0) {
            log::warn!("an image can't be its own alpha map");
            return;
        }
        if self.0.borrow().alpha_users > 0 {
            log::warn!("an alpha map can't have an alpha map");
            return;
        }
        {
            let mut repr = map.0.borrow_mut();
            if !matches!(repr.kind, Kind::Bits(_)) {
                log::warn!("alpha maps must be pixel buffers");
                return;
            }
            if repr.alpha_map.is_some() {
                log::warn!("an image with an alpha map can't be an alpha map");
                return;
            }
            repr.alpha_users += 1;
        }

        let old = self.0.borrow_mut().alpha_map.replace(AlphaMap {
            image: map.clone(),
            x,
            y,
        });
        if let Some(old) = old {
            old.release();
        }
    }

    /// Whether each channel of this image, used as a mask, weighs the corresponding channel.
    pub fn set_component_alpha(&self, enable: bool) {
        self.0.borrow_mut().component_alpha = enable;
    }

    /// Whether component alpha is enabled.
    pub fn component_alpha(&self) -> bool {
        self.0.borrow().component_alpha
    }

    fn with_bits<R>(&self, f: impl FnOnce(&Bits) -> R) -> Option<R> {
        match &self.0.borrow().kind {
            Kind::Bits(bits) => Some(f(bits)),
            _ => None,
        }
    }

    fn with_bits_mut(&self, f: impl FnOnce(&mut Bits)) {
        if let Kind::Bits(bits) = &mut self.0.borrow_mut().kind {
            f(bits);
        }
    }

    /// Set how colors are dithered when this image is a destination.
    pub fn set_dither(&self, dither: Dither) {
        self.0.borrow_mut().dither = dither;
    }

    /// Move the dither pattern by `(x, y)` pixels.
    pub fn set_dither_offset(&self, x: i32, y: i32) {
        self.0.borrow_mut().dither_offset = (x, y);
    }

    /// Replace the palette of an indexed image.
    pub fn set_palette(&self, palette: Arc<Palette>) {
        self.with_bits_mut(|bits| bits.set_palette(palette));
    }

    /// Route all memory traffic of a pixel buffer image through `accessor`.
    pub fn set_accessor(&self, accessor: Arc<dyn Accessor>) {
        self.with_bits_mut(|bits| bits.set_accessor(accessor));
    }

    /// Set the byte order of a pixel buffer image.
    pub fn set_byte_order(&self, order: ByteOrder) {
        self.with_bits_mut(|bits| bits.set_byte_order(order));
    }

    /// The width in pixels, zero for procedural images.
    pub fn width(&self) -> u32 {
        self.with_bits(Bits::width).unwrap_or(0)
    }

    /// The height in pixels, zero for procedural images.
    pub fn height(&self) -> u32 {
        self.with_bits(Bits::height).unwrap_or(0)
    }

    /// The distance between rows in bytes, zero for procedural images.
    pub fn stride(&self) -> i32 {
        self.with_bits(Bits::stride).unwrap_or(0)
    }

    /// The pixel format of a pixel buffer image.
    pub fn format(&self) -> Option<PixelFormat> {
        self.with_bits(Bits::format)
    }

    /// The depth of a pixel buffer image, in bits.
    pub fn depth(&self) -> u32 {
        self.with_bits(|b| b.format().depth()).unwrap_or(0)
    }

    /// The box covering all pixels of a pixel buffer image.
    pub(crate) fn bounds(&self) -> Option<Box32> {
        self.with_bits(Bits::bounds)
    }

    /// A copy of the raw buffer of a pixel buffer image.
    pub fn data(&self) -> Option<Vec<u8>> {
        self.with_bits(|b| b.data().to_vec())
    }

    /// The packed value of a pixel, or `None` when out of bounds or not a pixel buffer.
    pub fn pixel(&self, x: i32, y: i32) -> Option<u32> {
        self.with_bits(|b| b.bounds().contains_point(x, y).then(|| b.fetch_raw(x, y)))
            .flatten()
    }

    /// A pixel converted to a premultiplied working color.
    pub fn color(&self, x: i32, y: i32) -> Option<Rgba16> {
        self.with_bits(|b| b.bounds().contains_point(x, y).then(|| b.fetch(x, y)))
            .flatten()
    }

    /// Overwrite the packed value of a pixel. Out of bounds writes are dropped.
    pub fn set_pixel(&self, x: i32, y: i32, value: u32) {
        self.with_bits_mut(|b| b.store_raw(x, y, value));
    }
}
