// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

use crate::error::{Error, Result};
use core::fmt;
use std::borrow::Cow;

/// Pixel formats handled by the preview pipeline.
///
/// Camera frames arrive as some variant of YUV 4:2:0 and are normalized to
/// [`PixelFormat::Nv21`]. The pipeline works internally on
/// [`PixelFormat::Rgb888`] and presents [`PixelFormat::Rgba8888`] or
/// [`PixelFormat::Rgbx8888`] to the display surface.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PixelFormat {
    /// NV21 4:2:0 YUV semi-planar format (Y plane followed by interleaved VU)
    Nv21,
    /// RGB 24-bit pixel format (8 bits per channel, no alpha)
    Rgb888,
    /// RGBA 32-bit pixel format (8 bits per channel, with alpha)
    Rgba8888,
    /// RGBX 32-bit pixel format (8 bits per channel, unused alpha)
    Rgbx8888,
}

impl PixelFormat {
    /// The four character code used by V4L2 and DRM for this format.
    pub const fn fourcc(self) -> [u8; 4] {
        match self {
            PixelFormat::Nv21 => *b"NV21",
            PixelFormat::Rgb888 => *b"RGB3",
            PixelFormat::Rgba8888 => *b"RGBA",
            PixelFormat::Rgbx8888 => *b"RGBX",
        }
    }

    /// Bytes per pixel for packed formats, `None` for planar formats.
    pub const fn channels(self) -> Option<usize> {
        match self {
            PixelFormat::Nv21 => None,
            PixelFormat::Rgb888 => Some(3),
            PixelFormat::Rgba8888 | PixelFormat::Rgbx8888 => Some(4),
        }
    }
}

impl fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let code = self.fourcc();
        write!(f, "{}", String::from_utf8_lossy(&code))
    }
}

/// Size in bytes of one image of the given format, rows densely packed.
pub const fn image_size(width: u32, height: u32, format: PixelFormat) -> usize {
    let pixels = width as usize * height as usize;
    match format {
        PixelFormat::Nv21 => pixels + pixels / 2,
        PixelFormat::Rgb888 => pixels * 3,
        PixelFormat::Rgba8888 | PixelFormat::Rgbx8888 => pixels * 4,
    }
}

/// Rectangle specification for crop operations.
///
/// Defines a rectangular region within an image for cropping or
/// region-of-interest operations.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Rect {
    /// X coordinate of top-left corner
    pub x: u32,
    /// Y coordinate of top-left corner
    pub y: u32,
    /// Width of the rectangle in pixels
    pub width: u32,
    /// Height of the rectangle in pixels
    pub height: u32,
}

impl Rect {
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// The rectangle covering a whole `width` x `height` image.
    pub const fn full(width: u32, height: u32) -> Self {
        Self::new(0, 0, width, height)
    }

    /// The same rectangle with its axes exchanged.
    pub const fn transposed(self) -> Self {
        Self::new(self.y, self.x, self.height, self.width)
    }

    /// True when origin and extent all land on even pixel boundaries, which is
    /// required to crop the half resolution chroma plane consistently.
    pub const fn is_even_aligned(&self) -> bool {
        (self.x | self.y | self.width | self.height) & 1 == 0
    }

    /// True when the rectangle lies entirely inside a `width` x `height` image.
    pub fn fits_in(&self, width: u32, height: u32) -> bool {
        self.x as u64 + self.width as u64 <= width as u64
            && self.y as u64 + self.height as u64 <= height as u64
    }
}

impl fmt::Display for Rect {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{},{} {}x{}", self.x, self.y, self.width, self.height)
    }
}

/// Location of one plane of a [`RawFrame`] inside its backing buffer.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PlaneLayout {
    /// Byte offset of the first sample.
    pub offset: usize,
    /// Number of bytes the capture API reports for the plane.
    pub len: usize,
    /// Distance in bytes between horizontally adjacent samples.
    pub pixel_stride: usize,
    /// Distance in bytes between vertically adjacent samples.
    pub row_stride: usize,
}

impl PlaneLayout {
    pub const fn new(offset: usize, len: usize, pixel_stride: usize, row_stride: usize) -> Self {
        Self {
            offset,
            len,
            pixel_stride,
            row_stride,
        }
    }

    /// Number of bytes from the plane start up to and including the last
    /// sample of a `cols` x `rows` grid, `None` if it does not fit a `usize`.
    fn span(&self, cols: usize, rows: usize) -> Option<usize> {
        let down = (rows - 1).checked_mul(self.row_stride)?;
        let across = (cols - 1).checked_mul(self.pixel_stride)?;
        down.checked_add(across)?.checked_add(1)
    }
}

/// A YUV 4:2:0 camera frame as delivered by the capture API.
///
/// The three planes are described by byte offsets into one backing buffer,
/// which is how camera HALs and V4L2 hand out multi-planar buffers. The frame
/// only borrows the buffer; it must not be retained beyond the delivery
/// callback.
#[derive(Copy, Clone, Debug)]
pub struct RawFrame<'a> {
    width: u32,
    height: u32,
    buffer: &'a [u8],
    /// Y, U and V planes in that order.
    planes: [PlaneLayout; 3],
}

impl<'a> RawFrame<'a> {
    /// Wraps a buffer with an explicit Y, U, V plane layout.
    pub fn new(
        width: u32,
        height: u32,
        buffer: &'a [u8],
        y: PlaneLayout,
        u: PlaneLayout,
        v: PlaneLayout,
    ) -> Self {
        Self {
            width,
            height,
            buffer,
            planes: [y, u, v],
        }
    }

    /// Describes a canonical NV21 buffer: Y plane then interleaved VU pairs.
    pub fn nv21(width: u32, height: u32, buffer: &'a [u8]) -> Self {
        let w = width as usize;
        let luma = w * height as usize;
        let chroma = luma / 2;
        Self::new(
            width,
            height,
            buffer,
            PlaneLayout::new(0, luma, 1, w),
            PlaneLayout::new(luma + 1, chroma.saturating_sub(1), 2, w),
            PlaneLayout::new(luma, chroma.saturating_sub(1), 2, w),
        )
    }

    /// Describes a fully planar I420 buffer: Y, then U, then V.
    pub fn i420(width: u32, height: u32, buffer: &'a [u8]) -> Self {
        let w = width as usize;
        let luma = w * height as usize;
        let quarter = luma / 4;
        Self::new(
            width,
            height,
            buffer,
            PlaneLayout::new(0, luma, 1, w),
            PlaneLayout::new(luma, quarter, 1, w / 2),
            PlaneLayout::new(luma + quarter, quarter, 1, w / 2),
        )
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn buffer(&self) -> &'a [u8] {
        self.buffer
    }

    pub fn y_plane(&self) -> &PlaneLayout {
        &self.planes[0]
    }

    pub fn u_plane(&self) -> &PlaneLayout {
        &self.planes[1]
    }

    pub fn v_plane(&self) -> &PlaneLayout {
        &self.planes[2]
    }

    /// Checks dimensions and that every addressed sample lies inside both the
    /// reported plane length and the backing buffer.
    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 || self.width % 2 != 0 || self.height % 2 != 0 {
            return Err(Error::InvalidDimensions(self.width, self.height));
        }

        let (w, h) = (self.width as usize, self.height as usize);
        let checks = [
            ("Y", &self.planes[0], w, h),
            ("U", &self.planes[1], w / 2, h / 2),
            ("V", &self.planes[2], w / 2, h / 2),
        ];
        for (name, plane, cols, rows) in checks {
            if plane.pixel_stride == 0 || plane.row_stride == 0 {
                return Err(Error::UnsupportedLayout(format!(
                    "{} plane has zero stride (pixel {} row {})",
                    name, plane.pixel_stride, plane.row_stride
                )));
            }
            let needed = plane.span(cols, rows).ok_or_else(|| {
                Error::UnsupportedLayout(format!(
                    "{} plane strides overflow (pixel {} row {})",
                    name, plane.pixel_stride, plane.row_stride
                ))
            })?;
            let available = plane.len.min(self.buffer.len().saturating_sub(plane.offset));
            if needed > available {
                return Err(Error::PlaneOutOfBounds {
                    plane: name,
                    needed,
                    available,
                });
            }
        }
        Ok(())
    }
}

/// A frame in canonical NV21 layout: `width * height` luma bytes followed by
/// `width * height / 2` bytes of interleaved V,U pairs, one pair per 2x2
/// luma block.
///
/// The data is borrowed when the camera buffer already had this layout and
/// owned when it had to be repacked.
#[derive(Clone, Debug)]
pub struct Nv21Frame<'a> {
    width: u32,
    height: u32,
    data: Cow<'a, [u8]>,
}

impl<'a> Nv21Frame<'a> {
    /// Wraps a canonical NV21 buffer of exactly `width * height * 3 / 2` bytes.
    pub fn new(width: u32, height: u32, data: impl Into<Cow<'a, [u8]>>) -> Result<Self> {
        if width == 0 || height == 0 || width % 2 != 0 || height % 2 != 0 {
            return Err(Error::InvalidDimensions(width, height));
        }
        let data = data.into();
        let needed = image_size(width, height, PixelFormat::Nv21);
        if data.len() != needed {
            return Err(Error::PlaneOutOfBounds {
                plane: "NV21",
                needed,
                available: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn luma(&self) -> &[u8] {
        &self.data[..self.width as usize * self.height as usize]
    }

    pub fn chroma(&self) -> &[u8] {
        &self.data[self.width as usize * self.height as usize..]
    }

    /// True when the frame aliases the camera buffer instead of owning a copy.
    pub fn is_borrowed(&self) -> bool {
        matches!(self.data, Cow::Borrowed(_))
    }

    pub fn into_owned(self) -> Nv21Frame<'static> {
        Nv21Frame {
            width: self.width,
            height: self.height,
            data: Cow::Owned(self.data.into_owned()),
        }
    }
}

impl fmt::Display for Nv21Frame<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}x{} {} {}",
            self.width,
            self.height,
            PixelFormat::Nv21,
            if self.is_borrowed() { "borrowed" } else { "owned" }
        )
    }
}

/// Densely packed 8-bit RGB image.
///
/// This is the frame handed to [`crate::pipeline::FrameConsumer`] hooks, which
/// may draw on it in place before it is levelled and presented.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RgbImage {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl RgbImage {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0; image_size(width, height, PixelFormat::Rgb888)],
        }
    }

    pub fn from_raw(width: u32, height: u32, data: Vec<u8>) -> Option<Self> {
        if data.len() != image_size(width, height, PixelFormat::Rgb888) {
            return None;
        }
        Some(Self {
            width,
            height,
            data,
        })
    }

    /// Changes the dimensions, reusing the allocation where possible. Pixel
    /// contents are unspecified afterwards.
    pub fn reshape(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.data
            .resize(image_size(width, height, PixelFormat::Rgb888), 0);
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn row_stride(&self) -> usize {
        self.width as usize * 3
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    pub fn as_slice_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn into_raw(self) -> Vec<u8> {
        self.data
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * 3;
        Some([self.data[i], self.data[i + 1], self.data[i + 2]])
    }

    /// Writes one pixel, ignoring coordinates outside the image.
    pub fn put_pixel(&mut self, x: u32, y: u32, rgb: [u8; 3]) {
        if x >= self.width || y >= self.height {
            return;
        }
        let i = (y as usize * self.width as usize + x as usize) * 3;
        self.data[i..i + 3].copy_from_slice(&rgb);
    }

    /// Fills the intersection of `rect` with the image.
    pub fn fill_rect(&mut self, rect: Rect, rgb: [u8; 3]) {
        let x1 = (rect.x.saturating_add(rect.width)).min(self.width);
        let y1 = (rect.y.saturating_add(rect.height)).min(self.height);
        for y in rect.y.min(y1)..y1 {
            let row = y as usize * self.row_stride();
            for x in rect.x.min(x1)..x1 {
                let i = row + x as usize * 3;
                self.data[i..i + 3].copy_from_slice(&rgb);
            }
        }
    }
}

impl fmt::Display for RgbImage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}x{} {}", self.width, self.height, PixelFormat::Rgb888)
    }
}
