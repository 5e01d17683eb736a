// Copyright 2025 the Pixmill Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Pixel buffers with format-converting fetch and store.

use alloc::sync::Arc;
use alloc::vec;
use alloc::vec::Vec;
use core::fmt;

use crate::access::{Accessor, ByteOrder, DirectAccess};
use crate::color::{unorm_expand, unorm_reduce, unorm_reduce_dithered, Rgba16};
use crate::format::{ChannelType, Palette, PixelFormat};
use crate::geometry::Box32;
use crate::srgb;

/// Why a pixel buffer layout was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LayoutError {
    /// The dimensions are too large to address.
    InvalidDimensions,
    /// The stride is smaller than a row of pixels.
    StrideTooSmall,
    /// The buffer doesn't hold all rows.
    BufferTooSmall,
    /// The stride is not usable for the format.
    UnsupportedStride,
    /// The format needs a color palette.
    MissingPalette,
}

impl fmt::Display for LayoutError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::InvalidDimensions => "dimensions too large",
            Self::StrideTooSmall => "stride smaller than a row",
            Self::BufferTooSmall => "buffer too small for the given layout",
            Self::UnsupportedStride => "stride not supported by the format",
            Self::MissingPalette => "color indexed format without a palette",
        })
    }
}

/// A rectangular buffer of packed pixels.
///
/// Rows are `stride` bytes apart. A negative stride stores the rows bottom-up: row 0 is then
/// the last row in memory. All memory traffic goes through the buffer's [`Accessor`] and
/// honors its [`ByteOrder`].
#[derive(Clone)]
pub struct Bits {
    data: Vec<u8>,
    width: u32,
    height: u32,
    stride: i32,
    /// Byte offset of row 0.
    origin: usize,
    format: PixelFormat,
    byte_order: ByteOrder,
    accessor: Arc<dyn Accessor>,
    palette: Option<Arc<Palette>>,
}

impl fmt::Debug for Bits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bits")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("stride", &self.stride)
            .field("format", &self.format)
            .field("byte_order", &self.byte_order)
            .field("accessor", &self.accessor)
            .field("len", &self.data.len())
            .finish_non_exhaustive()
    }
}

/// The number of bytes a row of `width` pixels needs.
fn row_bytes(format: PixelFormat, width: u32) -> Option<usize> {
    let bits = u64::from(width) * u64::from(format.bpp());
    usize::try_from(bits.div_ceil(8)).ok()
}

/// The byte offsets of the V and U planes of a planar buffer.
fn yv12_planes(stride: i32, height: u32) -> Option<(usize, usize)> {
    let words = usize::try_from(stride / 4).ok()?;
    let offset0 = words.checked_mul(height as usize)?;
    let offset1 = offset0 + (offset0 >> 2);
    Some((offset0.checked_mul(4)?, offset1.checked_mul(4)?))
}

impl Bits {
    /// Create a zeroed buffer with a stride rounded up to whole 32-bit words.
    pub fn new(format: PixelFormat, width: u32, height: u32) -> Result<Self, LayoutError> {
        let row = row_bytes(format, width).ok_or(LayoutError::InvalidDimensions)?;
        let stride = row
            .checked_add(3)
            .map(|r| r & !3)
            .and_then(|r| i32::try_from(r).ok())
            .ok_or(LayoutError::InvalidDimensions)?;
        let rows = (stride as usize)
            .checked_mul(height as usize)
            .ok_or(LayoutError::InvalidDimensions)?;
        let len = Self::required_len(format, width, height, stride)?.max(rows);
        Self::from_data(format, width, height, vec![0; len], stride)
    }

    /// Wrap an existing buffer.
    ///
    /// Color indexed formats need [`Bits::from_data_indexed`]. Gray indexed formats default to
    /// an evenly spaced gray ramp.
    pub fn from_data(
        format: PixelFormat,
        width: u32,
        height: u32,
        data: Vec<u8>,
        stride: i32,
    ) -> Result<Self, LayoutError> {
        let palette = match format.code().kind {
            ChannelType::Color => return Err(LayoutError::MissingPalette),
            ChannelType::Gray => Some(Arc::new(Palette::gray_ramp(format.bpp()))),
            _ => None,
        };

        Self::with_layout(format, width, height, data, stride, palette)
    }

    /// Wrap an existing buffer of an indexed format.
    pub fn from_data_indexed(
        format: PixelFormat,
        width: u32,
        height: u32,
        data: Vec<u8>,
        stride: i32,
        palette: Arc<Palette>,
    ) -> Result<Self, LayoutError> {
        Self::with_layout(format, width, height, data, stride, Some(palette))
    }

    /// Wrap a buffer of native-endian 32-bit words, `stride_words` words per row.
    pub fn from_words(
        format: PixelFormat,
        width: u32,
        height: u32,
        words: &[u32],
        stride_words: i32,
    ) -> Result<Self, LayoutError> {
        let data = bytemuck::cast_slice::<u32, u8>(words).to_vec();
        let stride = stride_words
            .checked_mul(4)
            .ok_or(LayoutError::InvalidDimensions)?;
        Self::from_data(format, width, height, data, stride)
    }

    fn required_len(
        format: PixelFormat,
        width: u32,
        height: u32,
        stride: i32,
    ) -> Result<usize, LayoutError> {
        if i32::try_from(width).is_err() || i32::try_from(height).is_err() {
            return Err(LayoutError::InvalidDimensions);
        }

        let row = row_bytes(format, width).ok_or(LayoutError::InvalidDimensions)?;
        let abs_stride = stride.unsigned_abs() as usize;
        if abs_stride < row {
            return Err(LayoutError::StrideTooSmall);
        }
        if height == 0 {
            return Ok(0);
        }

        if format == PixelFormat::Yv12 {
            if stride <= 0 || stride % 4 != 0 {
                return Err(LayoutError::UnsupportedStride);
            }
            let (_, offset1) =
                yv12_planes(stride, height).ok_or(LayoutError::InvalidDimensions)?;
            let chroma_rows = ((height as usize - 1) >> 1) + 1;
            let chroma_stride = ((stride as usize / 4) >> 1) * 4;
            return chroma_stride
                .checked_mul(chroma_rows)
                .and_then(|c| c.checked_add(offset1))
                .ok_or(LayoutError::InvalidDimensions);
        }

        abs_stride
            .checked_mul(height as usize - 1)
            .and_then(|v| v.checked_add(row))
            .ok_or(LayoutError::InvalidDimensions)
    }

    fn with_layout(
        format: PixelFormat,
        width: u32,
        height: u32,
        data: Vec<u8>,
        stride: i32,
        palette: Option<Arc<Palette>>,
    ) -> Result<Self, LayoutError> {
        let len = Self::required_len(format, width, height, stride)?;
        if data.len() < len {
            return Err(LayoutError::BufferTooSmall);
        }

        let origin = if stride < 0 {
            stride.unsigned_abs() as usize * (height.max(1) as usize - 1)
        } else {
            0
        };

        Ok(Self {
            data,
            width,
            height,
            stride,
            origin,
            format,
            byte_order: ByteOrder::native(),
            accessor: Arc::new(DirectAccess),
            palette,
        })
    }

    /// The width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// The height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// The distance between rows in bytes.
    pub fn stride(&self) -> i32 {
        self.stride
    }

    /// The pixel format.
    pub fn format(&self) -> PixelFormat {
        self.format
    }

    /// The byte order of pixel words.
    pub fn byte_order(&self) -> ByteOrder {
        self.byte_order
    }

    /// Set the byte order of pixel words.
    pub fn set_byte_order(&mut self, order: ByteOrder) {
        self.byte_order = order;
    }

    /// Route all memory traffic through `accessor`.
    pub fn set_accessor(&mut self, accessor: Arc<dyn Accessor>) {
        self.accessor = accessor;
    }

    /// The palette of an indexed format.
    pub fn palette(&self) -> Option<&Arc<Palette>> {
        self.palette.as_ref()
    }

    /// Replace the palette.
    pub fn set_palette(&mut self, palette: Arc<Palette>) {
        self.palette = Some(palette);
    }

    /// The raw buffer.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// The raw buffer, mutably.
    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Take the raw buffer out, leaving an empty one behind.
    pub fn take_data(&mut self) -> Vec<u8> {
        self.width = 0;
        self.height = 0;
        core::mem::take(&mut self.data)
    }

    /// The box covering all pixels.
    pub fn bounds(&self) -> Box32 {
        Box32::from_rect(0, 0, self.width, self.height)
    }

    fn in_bounds(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && (x as u32) < self.width && (y as u32) < self.height
    }

    fn row_offset(&self, y: i32) -> usize {
        (self.origin as i64 + i64::from(y) * i64::from(self.stride)) as usize
    }

    fn read(&self, offset: usize, size: usize) -> u32 {
        self.accessor
            .read(&self.data, offset, size, self.byte_order)
    }

    fn write(&mut self, offset: usize, size: usize, value: u32) {
        let order = self.byte_order;
        self.accessor
            .write(&mut self.data, offset, size, order, value);
    }

    /// Read the packed value of a pixel. Out of bounds pixels read as zero.
    ///
    /// For planar formats this is the luma sample.
    pub fn fetch_raw(&self, x: i32, y: i32) -> u32 {
        if !self.in_bounds(x, y) {
            return 0;
        }

        let row = self.row_offset(y);
        let x = x as usize;
        match self.format.bpp() {
            32 => self.read(row + x * 4, 4),
            24 => self.read(row + x * 3, 3),
            16 => self.read(row + x * 2, 2),
            8 => self.read(row + x, 1),
            4 => {
                let byte = self.read(row + x / 2, 1);
                let high = (x & 1 == 1) == (self.byte_order == ByteOrder::Little);
                if high {
                    byte >> 4
                } else {
                    byte & 0xf
                }
            }
            _ => {
                let byte = self.read(row + x / 8, 1);
                let bit = match self.byte_order {
                    ByteOrder::Little => x & 7,
                    ByteOrder::Big => 7 - (x & 7),
                };
                (byte >> bit) & 1
            }
        }
    }

    /// Write the packed value of a pixel. Out of bounds writes are dropped.
    pub fn store_raw(&mut self, x: i32, y: i32, value: u32) {
        if !self.in_bounds(x, y) || self.format == PixelFormat::Yv12 {
            return;
        }

        let row = self.row_offset(y);
        let x = x as usize;
        match self.format.bpp() {
            32 => self.write(row + x * 4, 4, value),
            24 => self.write(row + x * 3, 3, value),
            16 => self.write(row + x * 2, 2, value),
            8 => self.write(row + x, 1, value),
            4 => {
                let offset = row + x / 2;
                let byte = self.read(offset, 1);
                let high = (x & 1 == 1) == (self.byte_order == ByteOrder::Little);
                let byte = if high {
                    (byte & 0x0f) | ((value & 0xf) << 4)
                } else {
                    (byte & 0xf0) | (value & 0xf)
                };
                self.write(offset, 1, byte);
            }
            _ => {
                let offset = row + x / 8;
                let byte = self.read(offset, 1);
                let bit = match self.byte_order {
                    ByteOrder::Little => x & 7,
                    ByteOrder::Big => 7 - (x & 7),
                };
                let byte = (byte & !(1 << bit)) | ((value & 1) << bit);
                self.write(offset, 1, byte);
            }
        }
    }

    /// Fetch a pixel as a premultiplied working color.
    ///
    /// Out of bounds pixels are transparent.
    pub fn fetch(&self, x: i32, y: i32) -> Rgba16 {
        if !self.in_bounds(x, y) {
            return Rgba16::TRANSPARENT;
        }

        let code = self.format.code();
        match code.kind {
            ChannelType::Yuy2 => Rgba16::from_a8r8g8b8(self.fetch_yuy2(x, y)),
            ChannelType::Yv12 => Rgba16::from_a8r8g8b8(self.fetch_yv12(x, y)),
            ChannelType::Color | ChannelType::Gray => {
                let index = self.fetch_raw(x, y) as usize;
                self.palette
                    .as_ref()
                    .map(|p| Rgba16::from_a8r8g8b8(p.rgba[index & 0xff]))
                    .unwrap_or_default()
            }
            _ => {
                let raw = self.fetch_raw(x, y);
                let s = self.format.channel_shifts();
                let channel = |shift: u32, width: u8| {
                    let width = u32::from(width);
                    unorm_expand(raw >> shift, width)
                };
                let color = |shift: u32, width: u8| {
                    if code.kind == ChannelType::ArgbSrgb {
                        srgb::to_linear((raw >> shift) as u8)
                    } else {
                        channel(shift, width)
                    }
                };
                let a = if code.a > 0 {
                    channel(s.a, code.a)
                } else {
                    0xffff
                };
                Rgba16::new(
                    color(s.r, code.r),
                    color(s.g, code.g),
                    color(s.b, code.b),
                    a,
                )
            }
        }
    }

    /// Store a premultiplied working color, rounding each channel to the format's depth.
    ///
    /// Channels the format doesn't have are dropped. YCbCr formats can't be stored to.
    pub fn store(&mut self, x: i32, y: i32, c: Rgba16) {
        if let Some(raw) = self.pack(c) {
            self.store_raw(x, y, raw);
        }
    }

    /// The packed representation of `c`, or `None` for formats that can't be stored to.
    pub fn pack(&self, c: Rgba16) -> Option<u32> {
        self.pack_with(c, unorm_reduce)
    }

    /// Like [`Bits::pack`], reducing each channel with the ordered dither threshold `rank`
    /// (see [`unorm_reduce_dithered`]).
    ///
    /// Indexed and sRGB formats are packed without dithering.
    pub fn pack_dithered(&self, c: Rgba16, rank: u32) -> Option<u32> {
        if self.format.is_indexed() || self.format.is_srgb() {
            return self.pack(c);
        }
        self.pack_with(c, |v, bits| unorm_reduce_dithered(v, bits, rank))
    }

    fn pack_with(&self, c: Rgba16, reduce: impl Fn(u16, u32) -> u32) -> Option<u32> {
        let code = self.format.code();
        let raw = match code.kind {
            ChannelType::Yuy2 | ChannelType::Yv12 => return None,
            ChannelType::Color | ChannelType::Gray => {
                let palette = self.palette.as_ref()?;
                u32::from(palette.lookup(c.to_a8r8g8b8()))
            }
            _ => {
                let s = self.format.channel_shifts();
                let channel = |v: u16, shift: u32, width: u8| {
                    if width == 0 {
                        0
                    } else {
                        reduce(v, u32::from(width)) << shift
                    }
                };
                let color = |v: u16, shift: u32, width: u8| {
                    if code.kind == ChannelType::ArgbSrgb {
                        u32::from(srgb::to_srgb(v)) << shift
                    } else {
                        channel(v, shift, width)
                    }
                };
                channel(c.a, s.a, code.a)
                    | color(c.r, s.r, code.r)
                    | color(c.g, s.g, code.g)
                    | color(c.b, s.b, code.b)
            }
        };

        Some(raw)
    }

    /// Store a color with the ordered dither threshold `rank`.
    pub fn store_dithered(&mut self, x: i32, y: i32, c: Rgba16, rank: u32) {
        if let Some(raw) = self.pack_dithered(c, rank) {
            self.store_raw(x, y, raw);
        }
    }

    /// Fetch `out.len()` pixels of row `y` starting at `x`.
    pub fn fetch_scanline(&self, x: i32, y: i32, out: &mut [Rgba16]) {
        for (i, px) in out.iter_mut().enumerate() {
            *px = self.fetch(x.saturating_add(i as i32), y);
        }
    }

    /// Store `colors` into row `y` starting at `x`.
    pub fn store_scanline(&mut self, x: i32, y: i32, colors: &[Rgba16]) {
        if self.format.is_yuv() {
            log::warn!("ignoring store to {:?} buffer", self.format);
            return;
        }

        for (i, &c) in colors.iter().enumerate() {
            self.store(x.saturating_add(i as i32), y, c);
        }
    }

    fn fetch_yuy2(&self, x: i32, y: i32) -> u32 {
        let row = self.row_offset(y);
        let x = x as usize * 2;
        let luma = self.read(row + x, 1);
        let u = self.read(row + (x & !3) + 1, 1);
        let v = self.read(row + (x & !3) + 3, 1);
        yuv_to_a8r8g8b8(luma, u, v)
    }

    fn fetch_yv12(&self, x: i32, y: i32) -> u32 {
        let Some((offset0, offset1)) = yv12_planes(self.stride, self.height) else {
            return 0;
        };
        let (x, y) = (x as usize, y as usize);
        let chroma_stride = ((self.stride as usize / 4) >> 1) * 4;
        let chroma = chroma_stride * (y >> 1) + (x >> 1);

        let luma = self.read(self.row_offset(y as i32) + x, 1);
        let u = self.read(offset1 + chroma, 1);
        let v = self.read(offset0 + chroma, 1);
        yuv_to_a8r8g8b8(luma, u, v)
    }
}

/// Convert 8-bit BT.601 studio-range YCbCr to opaque `0xAARRGGBB`.
fn yuv_to_a8r8g8b8(y: u32, u: u32, v: u32) -> u32 {
    let y = y as i32 - 16;
    let u = u as i32 - 128;
    let v = v as i32 - 128;

    let r = 0x012b27 * y + 0x019a2e * v;
    let g = 0x012b27 * y - 0x00d0f2 * v - 0x00647e * u;
    let b = 0x012b27 * y + 0x0206a2 * u;

    let clamp = |c: i32, shift: u32, mask: u32| {
        if c < 0 {
            0
        } else if c >= 0x100_0000 {
            mask
        } else {
            (c as u32 >> shift) & mask
        }
    };

    0xff00_0000 | clamp(r, 0, 0xff_0000) | clamp(g, 8, 0x00_ff00) | clamp(b, 16, 0x00_00ff)
}
