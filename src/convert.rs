// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

use crate::{
    error::{Error, Result},
    image::{image_size, Nv21Frame, PixelFormat, RgbImage},
};
use rayon::prelude::*;
use tracing::instrument;

#[inline(always)]
fn saturate(v: i32) -> u8 {
    v.clamp(0, 255) as u8
}

/// Converts one pair of rows sharing a row of VU samples.
///
/// BT.601 in 6-bit fixed point:
///
/// ```text
/// R = Y + 1.406 (V - 128)
/// G = Y - 0.719 (V - 128) - 0.344 (U - 128)
/// B = Y + 1.766 (U - 128)
/// ```
fn convert_row_pair(y0: &[u8], y1: &[u8], vu: &[u8], rgb0: &mut [u8], rgb1: &mut [u8]) {
    let luma = y0.chunks_exact(2).zip(y1.chunks_exact(2));
    let out = rgb0.chunks_exact_mut(6).zip(rgb1.chunks_exact_mut(6));

    for (((l0, l1), (o0, o1)), c) in luma.zip(out).zip(vu.chunks_exact(2)) {
        let v = c[0] as i32 - 128;
        let u = c[1] as i32 - 128;

        let ruv = 90 * v;
        let guv = -46 * v - 22 * u;
        let buv = 113 * u;

        for (src, dst) in [(l0, &mut *o0), (l1, &mut *o1)] {
            for (px, out) in src.iter().zip(dst.chunks_exact_mut(3)) {
                let y = (*px as i32) << 6;
                out[0] = saturate((y + ruv) >> 6);
                out[1] = saturate((y + guv) >> 6);
                out[2] = saturate((y + buv) >> 6);
            }
        }
    }
}

/// Converts a densely packed NV21 buffer to RGB888.
///
/// Row pairs are independent and are converted in parallel. The output is
/// identical regardless of how rows are scheduled.
///
/// # Errors
///
/// Returns an error if the dimensions are odd or either buffer is too small.
pub fn nv21_to_rgb(nv21: &[u8], width: u32, height: u32, rgb: &mut [u8]) -> Result<()> {
    if width % 2 != 0 || height % 2 != 0 {
        return Err(Error::InvalidDimensions(width, height));
    }
    let needed = image_size(width, height, PixelFormat::Nv21);
    if nv21.len() < needed {
        return Err(Error::PlaneOutOfBounds {
            plane: "NV21",
            needed,
            available: nv21.len(),
        });
    }
    let needed = image_size(width, height, PixelFormat::Rgb888);
    if rgb.len() < needed {
        return Err(Error::PlaneOutOfBounds {
            plane: "RGB",
            needed,
            available: rgb.len(),
        });
    }
    if width == 0 || height == 0 {
        return Ok(());
    }

    let w = width as usize;
    let (luma, chroma) = nv21.split_at(w * height as usize);

    rgb[..needed]
        .par_chunks_mut(w * 3 * 2)
        .zip(luma.par_chunks(w * 2))
        .zip(chroma.par_chunks(w))
        .for_each(|((out, y), vu)| {
            let (rgb0, rgb1) = out.split_at_mut(w * 3);
            let (y0, y1) = y.split_at(w);
            convert_row_pair(y0, y1, vu, rgb0, rgb1);
        });
    Ok(())
}

/// Converts an [`Nv21Frame`] into `rgb`, reshaping it to the frame size.
#[instrument(skip_all, fields(width = frame.width(), height = frame.height()))]
pub fn convert_frame(frame: &Nv21Frame, rgb: &mut RgbImage) -> Result<()> {
    rgb.reshape(frame.width(), frame.height());
    nv21_to_rgb(frame.as_bytes(), frame.width(), frame.height(), rgb.as_slice_mut())
}
