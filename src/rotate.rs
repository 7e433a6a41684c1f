// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! Rotation and mirroring of packed and semi-planar images by one of the
//! eight [`Transform`]s.
//!
//! Sources may be a sub-rectangle of a larger strided buffer so a crop and a
//! rotation happen in a single pass. Destinations are always densely packed.

use crate::{
    error::{Error, Result},
    image::{image_size, Nv21Frame, PixelFormat, Rect, RgbImage},
    orientation::Transform,
};
use tracing::instrument;

/// Destination pixel index of the first pixel of source row `row`, and the
/// index step between consecutive source pixels of that row.
///
/// `width` and `height` are the source dimensions; the destination row
/// length is `height` for transforms that swap axes and `width` otherwise.
fn placement(transform: Transform, width: usize, height: usize, row: usize) -> (usize, isize) {
    let (w, h) = (width, height);
    match transform {
        Transform::Identity => (row * w, 1),
        Transform::FlipHorizontal => (row * w + w - 1, -1),
        Transform::Rotate180 => ((h - 1 - row) * w + w - 1, -1),
        Transform::FlipVertical => ((h - 1 - row) * w, 1),
        // destination rows are `h` pixels long from here on
        Transform::Transpose => (row, h as isize),
        Transform::Rotate90 => (h - 1 - row, h as isize),
        Transform::Transverse => ((w - 1) * h + h - 1 - row, -(h as isize)),
        Transform::Rotate270 => ((w - 1) * h + row, -(h as isize)),
    }
}

/// Applies `transform` to a `width` x `height` image of `C`-byte pixels.
///
/// `src` starts at the first pixel of the region and consecutive rows are
/// `src_stride` bytes apart, so the region may be a window into a wider
/// image. `dst` receives the transformed image densely packed with
/// dimensions given by [`Transform::output_size`].
///
/// # Errors
///
/// Returns an error if either buffer is too short for the given geometry.
pub fn rotate<const C: usize>(
    src: &[u8],
    width: usize,
    height: usize,
    src_stride: usize,
    dst: &mut [u8],
    transform: Transform,
) -> Result<()> {
    if width == 0 || height == 0 {
        return Ok(());
    }

    let needed = (height - 1) * src_stride + width * C;
    if src_stride < width * C || src.len() < needed {
        return Err(Error::PlaneOutOfBounds {
            plane: "rotate source",
            needed,
            available: src.len(),
        });
    }
    if dst.len() < width * height * C {
        return Err(Error::PlaneOutOfBounds {
            plane: "rotate destination",
            needed: width * height * C,
            available: dst.len(),
        });
    }

    if transform == Transform::Identity {
        for (row, out) in dst.chunks_exact_mut(width * C).take(height).enumerate() {
            out.copy_from_slice(&src[row * src_stride..][..width * C]);
        }
        return Ok(());
    }

    for row in 0..height {
        let line = &src[row * src_stride..][..width * C];
        let (start, step) = placement(transform, width, height, row);
        let mut at = start as isize;
        for px in line.chunks_exact(C) {
            let i = at as usize * C;
            dst[i..i + C].copy_from_slice(px);
            at += step;
        }
    }
    Ok(())
}

/// Crops `roi` out of an NV21 frame and applies `transform` to it, writing a
/// densely packed NV21 image into `dst`.
///
/// Luma is transformed at full resolution and the VU pairs at half
/// resolution with the same transform, so chroma stays co-sited with luma.
/// `dst` is resized as needed. Returns the output width and height.
///
/// # Errors
///
/// Returns an error if `roi` is not even aligned, is empty, or is not inside
/// the frame.
#[instrument(skip_all, fields(roi = %roi, transform = %transform))]
pub fn crop_rotate_nv21(
    frame: &Nv21Frame,
    roi: Rect,
    transform: Transform,
    dst: &mut Vec<u8>,
) -> Result<(u32, u32)> {
    let (fw, fh) = (frame.width(), frame.height());
    if !roi.is_even_aligned() || roi.width == 0 || roi.height == 0 || !roi.fits_in(fw, fh) {
        return Err(Error::InvalidCrop {
            x: roi.x,
            y: roi.y,
            width: roi.width,
            height: roi.height,
            frame_width: fw,
            frame_height: fh,
        });
    }

    let (out_w, out_h) = transform.output_size(roi.width, roi.height);
    dst.resize(image_size(out_w, out_h, PixelFormat::Nv21), 0);

    let stride = fw as usize;
    let (x, y) = (roi.x as usize, roi.y as usize);
    let (w, h) = (roi.width as usize, roi.height as usize);
    let (dst_luma, dst_chroma) = dst.split_at_mut(w * h);

    let luma = &frame.luma()[y * stride + x..];
    rotate::<1>(luma, w, h, stride, dst_luma, transform)?;

    // a chroma row holds width / 2 VU pairs, i.e. `stride` bytes
    let chroma = &frame.chroma()[y / 2 * stride + x..];
    rotate::<2>(chroma, w / 2, h / 2, stride, dst_chroma, transform)?;

    Ok((out_w, out_h))
}

/// Applies `transform` to an RGB image, reshaping `dst` to the output size.
pub fn rotate_rgb(src: &RgbImage, transform: Transform, dst: &mut RgbImage) -> Result<()> {
    let (out_w, out_h) = transform.output_size(src.width(), src.height());
    dst.reshape(out_w, out_h);
    rotate::<3>(
        src.as_slice(),
        src.width() as usize,
        src.height() as usize,
        src.row_stride(),
        dst.as_slice_mut(),
        transform,
    )
}
