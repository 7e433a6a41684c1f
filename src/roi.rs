// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

use crate::{
    error::{Error, Result},
    image::Rect,
    orientation::Angle,
};

const fn even(v: u64) -> u32 {
    (v / 2 * 2) as u32
}

/// Largest centered crop of a `width` x `height` image with the aspect ratio
/// of `target_width` x `target_height`, in the image's own axes.
fn centered_crop(width: u32, height: u32, target_width: u32, target_height: u32) -> Rect {
    let (w, h) = (width as u64, height as u64);
    let (tw, th) = (target_width as u64, target_height as u64);

    if tw * h > th * w {
        // target is wider, keep the full width and trim rows
        let crop_h = even(w * th / tw);
        Rect::new(0, even((h - crop_h as u64) / 2), width, crop_h)
    } else {
        let crop_w = even(h * tw / th);
        Rect::new(even((w - crop_w as u64) / 2), 0, crop_w, height)
    }
}

/// Computes the region of a frame to keep so that, once rotated by
/// `capture_angle`, it fills a `target_width` x `target_height` surface
/// without letterboxing.
///
/// The target size must already be expressed in upright axes, i.e. swapped
/// when the device is held sideways. When `capture_angle` is 90 or 270 the
/// rotation will exchange the frame axes, so the crop is computed against the
/// transposed frame and mapped back to frame coordinates.
///
/// The returned rectangle is inside the frame and every field is even.
///
/// # Errors
///
/// Returns an error if the target has a zero dimension or an aspect ratio so
/// extreme that no even-sized crop remains.
pub fn crop_for_target(
    frame_width: u32,
    frame_height: u32,
    target_width: u32,
    target_height: u32,
    capture_angle: Angle,
) -> Result<Rect> {
    if target_width == 0 || target_height == 0 {
        return Err(Error::SurfaceEmpty(target_width, target_height));
    }

    let roi = if capture_angle.is_sideways() {
        centered_crop(frame_height, frame_width, target_width, target_height).transposed()
    } else {
        centered_crop(frame_width, frame_height, target_width, target_height)
    };

    if roi.width == 0 || roi.height == 0 || !roi.fits_in(frame_width, frame_height) {
        return Err(Error::InvalidCrop {
            x: roi.x,
            y: roi.y,
            width: roi.width,
            height: roi.height,
            frame_width,
            frame_height,
        });
    }
    Ok(roi)
}
