// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! Reduction of arbitrary YUV 4:2:0 plane layouts to canonical NV21.

use crate::{
    error::Result,
    image::{image_size, Nv21Frame, PixelFormat, PlaneLayout, RawFrame},
};
use std::borrow::Cow;
use tracing::{instrument, trace};

/// True when the frame buffer is already a contiguous NV21 image: V plane
/// directly after the Y plane, U interleaved one byte after V, tightly packed
/// rows.
pub fn is_canonical_nv21(frame: &RawFrame) -> bool {
    let w = frame.width() as usize;
    let luma = w * frame.height() as usize;
    let (y, u, v) = (frame.y_plane(), frame.u_plane(), frame.v_plane());

    v.offset == y.offset + luma
        && u.offset == v.offset + 1
        && y.pixel_stride == 1
        && u.pixel_stride == 2
        && v.pixel_stride == 2
        && y.row_stride == w
        && u.row_stride == w
        && v.row_stride == w
}

/// Normalizes a camera frame to canonical NV21.
///
/// When the camera already delivered NV21 the returned frame borrows the
/// camera buffer and no pixel is touched. Otherwise luma is gathered row by
/// row honoring the plane strides and the two chroma planes are walked in
/// lock-step, writing interleaved V,U pairs.
///
/// # Errors
///
/// Returns an error if the frame has odd or zero dimensions, or if any plane
/// addresses bytes outside the frame buffer.
#[instrument(skip_all, fields(width = frame.width(), height = frame.height()))]
pub fn normalize<'a>(frame: &RawFrame<'a>) -> Result<Nv21Frame<'a>> {
    frame.validate()?;

    let (width, height) = (frame.width(), frame.height());
    let size = image_size(width, height, PixelFormat::Nv21);

    if is_canonical_nv21(frame) {
        trace!("frame is already nv21");
        let start = frame.y_plane().offset;
        return Nv21Frame::new(width, height, Cow::Borrowed(&frame.buffer()[start..start + size]));
    }

    let mut nv21 = vec![0u8; size];
    repack(frame, &mut nv21);
    Nv21Frame::new(width, height, nv21)
}

fn repack(frame: &RawFrame, nv21: &mut [u8]) {
    let w = frame.width() as usize;
    let h = frame.height() as usize;
    let buffer = frame.buffer();
    let (luma, chroma) = nv21.split_at_mut(w * h);

    let y = frame.y_plane();
    for (row, out) in luma.chunks_exact_mut(w).enumerate() {
        let src = &buffer[y.offset + row * y.row_stride..];
        if y.pixel_stride == 1 {
            out.copy_from_slice(&src[..w]);
        } else {
            gather(src, y, out);
        }
    }

    let (u, v) = (frame.u_plane(), frame.v_plane());
    for (row, out) in chroma.chunks_exact_mut(w).enumerate() {
        let u_row = &buffer[u.offset + row * u.row_stride..];
        let v_row = &buffer[v.offset + row * v.row_stride..];
        for (col, pair) in out.chunks_exact_mut(2).enumerate() {
            pair[0] = v_row[col * v.pixel_stride];
            pair[1] = u_row[col * u.pixel_stride];
        }
    }
}

fn gather(src: &[u8], plane: &PlaneLayout, out: &mut [u8]) {
    for (col, px) in out.iter_mut().enumerate() {
        *px = src[col * plane.pixel_stride];
    }
}
