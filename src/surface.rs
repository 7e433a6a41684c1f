// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! Presentation surface abstraction and the RGB to RGBA blitter.

use crate::{
    error::{Error, Result},
    image::{PixelFormat, RgbImage},
};
use tracing::{debug, instrument};

/// Pixels expanded per iteration of the blitter's block loop.
pub const BLIT_BLOCK: usize = 8;

/// A locked destination buffer owned by a [`Surface`].
///
/// `stride` is in pixels, as display compositors report it; each row starts
/// `stride * 4` bytes after the previous one.
#[derive(Debug)]
pub struct RenderTarget<'a> {
    pub width: u32,
    pub height: u32,
    pub stride: u32,
    pub format: PixelFormat,
    pub bits: &'a mut [u8],
}

/// A display surface the pipeline presents finished frames to.
///
/// The pipeline calls [`Surface::configure`] with the size of the frame about
/// to be presented, then exactly one [`Surface::lock`] and, if the lock
/// succeeded, one [`Surface::unlock_and_present`], or
/// [`Surface::unlock_and_discard`] when nothing valid was written.
pub trait Surface {
    /// Current physical size of the surface.
    fn size(&self) -> (u32, u32);

    /// Sets the geometry of the buffers that will be locked next.
    fn configure(&mut self, width: u32, height: u32, format: PixelFormat) -> Result<()>;

    /// Acquires the back buffer for writing.
    fn lock(&mut self) -> Result<RenderTarget<'_>>;

    /// Releases the buffer acquired by [`Surface::lock`] and queues it for
    /// display.
    fn unlock_and_present(&mut self);

    /// Releases the buffer acquired by [`Surface::lock`] without showing it.
    ///
    /// Surfaces that cannot drop a locked buffer keep the default, which
    /// presents it anyway.
    fn unlock_and_discard(&mut self) {
        self.unlock_and_present();
    }
}

#[inline(always)]
fn expand_pixel(rgb: &[u8], rgba: &mut [u8]) {
    rgba[0] = rgb[0];
    rgba[1] = rgb[1];
    rgba[2] = rgb[2];
    rgba[3] = 255;
}

/// Expands one row of RGB pixels into RGBA with opaque alpha.
///
/// The bulk of the row is processed in blocks of [`BLIT_BLOCK`] pixels, which
/// the compiler turns into vector shuffles; the remaining pixels go through
/// the same per-pixel expansion one at a time.
#[inline]
pub fn expand_row(rgb: &[u8], rgba: &mut [u8]) {
    let pixels = (rgb.len() / 3).min(rgba.len() / 4);
    let body = pixels / BLIT_BLOCK * BLIT_BLOCK;
    let (rgb_body, rgb_tail) = rgb[..pixels * 3].split_at(body * 3);
    let (rgba_body, rgba_tail) = rgba[..pixels * 4].split_at_mut(body * 4);

    for (src, dst) in rgb_body
        .chunks_exact(BLIT_BLOCK * 3)
        .zip(rgba_body.chunks_exact_mut(BLIT_BLOCK * 4))
    {
        for i in 0..BLIT_BLOCK {
            dst[i * 4] = src[i * 3];
            dst[i * 4 + 1] = src[i * 3 + 1];
            dst[i * 4 + 2] = src[i * 3 + 2];
            dst[i * 4 + 3] = 255;
        }
    }

    for (src, dst) in rgb_tail.chunks_exact(3).zip(rgba_tail.chunks_exact_mut(4)) {
        expand_pixel(src, dst);
    }
}

/// Copies an RGB image into the top-left corner of a locked render target,
/// expanding it to four channels with opaque alpha.
///
/// Every precondition is checked before the first byte is written, so a
/// failed blit leaves the target untouched.
///
/// # Errors
///
/// Returns an error if the target format is not RGBA or RGBX, or if the
/// target is too small for the image.
#[instrument(skip_all, fields(image = %image))]
pub fn blit(image: &RgbImage, target: &mut RenderTarget) -> Result<()> {
    if !matches!(target.format, PixelFormat::Rgba8888 | PixelFormat::Rgbx8888) {
        return Err(Error::UnsupportedFormat(target.format));
    }

    let (w, h) = (image.width() as usize, image.height() as usize);
    let stride = target.stride as usize * 4;
    let too_small = Error::TargetTooSmall {
        width: target.width,
        height: target.height,
        stride: target.stride,
        needed_width: image.width(),
        needed_height: image.height(),
    };
    if target.width < image.width()
        || target.height < image.height()
        || target.stride < image.width()
    {
        return Err(too_small);
    }
    if w == 0 || h == 0 {
        return Ok(());
    }
    if target.bits.len() < (h - 1) * stride + w * 4 {
        return Err(too_small);
    }

    for (row, src) in image.as_slice().chunks_exact(w * 3).enumerate() {
        expand_row(src, &mut target.bits[row * stride..][..w * 4]);
    }
    Ok(())
}

/// A surface backed by ordinary memory, used for headless runs and tests.
///
/// Rows are padded by `padding` pixels so consumers exercise the stride
/// handling a real compositor buffer needs.
#[derive(Debug)]
pub struct MemorySurface {
    width: u32,
    height: u32,
    padding: u32,
    config: Option<(u32, u32, PixelFormat)>,
    bits: Vec<u8>,
    locked: bool,
    fail_next_lock: bool,
    presented: u64,
    discarded: u64,
}

impl MemorySurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self::with_padding(width, height, 0)
    }

    pub fn with_padding(width: u32, height: u32, padding: u32) -> Self {
        Self {
            width,
            height,
            padding,
            config: None,
            bits: Vec::new(),
            locked: false,
            fail_next_lock: false,
            presented: 0,
            discarded: 0,
        }
    }

    /// Changes the physical size, as on a window resize. The buffer geometry
    /// set by [`Surface::configure`] is kept.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
    }

    /// Makes the next [`Surface::lock`] fail.
    pub fn fail_next_lock(&mut self) {
        self.fail_next_lock = true;
    }

    /// Number of frames presented so far.
    pub fn presented(&self) -> u64 {
        self.presented
    }

    /// Number of locked buffers released without being shown.
    pub fn discarded(&self) -> u64 {
        self.discarded
    }

    pub fn configuration(&self) -> Option<(u32, u32, PixelFormat)> {
        self.config
    }

    /// Row stride of the buffer in pixels.
    pub fn stride(&self) -> u32 {
        self.config.map(|(w, _, _)| w + self.padding).unwrap_or(0)
    }

    /// Raw contents of the buffer, including row padding.
    pub fn bits(&self) -> &[u8] {
        &self.bits
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        let (w, h, _) = self.config?;
        if x >= w || y >= h {
            return None;
        }
        let i = (y as usize * self.stride() as usize + x as usize) * 4;
        self.bits.get(i..i + 4)?.try_into().ok()
    }
}

impl Surface for MemorySurface {
    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn configure(&mut self, width: u32, height: u32, format: PixelFormat) -> Result<()> {
        if format.channels() != Some(4) {
            return Err(Error::UnsupportedFormat(format));
        }
        if self.config != Some((width, height, format)) {
            debug!(width, height, %format, "surface configured");
            self.config = Some((width, height, format));
            let stride = (width + self.padding) as usize;
            self.bits = vec![0; stride * height as usize * 4];
        }
        Ok(())
    }

    fn lock(&mut self) -> Result<RenderTarget<'_>> {
        if std::mem::take(&mut self.fail_next_lock) {
            return Err(Error::SurfaceLock("buffer unavailable".to_string()));
        }
        let (width, height, format) = self.config.ok_or(Error::SurfaceNotConfigured)?;
        if self.locked {
            return Err(Error::SurfaceLock("surface is already locked".to_string()));
        }
        self.locked = true;
        Ok(RenderTarget {
            width,
            height,
            stride: width + self.padding,
            format,
            bits: &mut self.bits,
        })
    }

    fn unlock_and_present(&mut self) {
        if self.locked {
            self.locked = false;
            self.presented += 1;
        }
    }

    fn unlock_and_discard(&mut self) {
        if self.locked {
            self.locked = false;
            self.discarded += 1;
        }
    }
}
