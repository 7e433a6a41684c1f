// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

use edgefirst_preview::{
    convert::{convert_frame, nv21_to_rgb},
    image::{image_size, Nv21Frame, PixelFormat, PlaneLayout, RawFrame, Rect, RgbImage},
    normalize::{is_canonical_nv21, normalize},
    orientation::{Angle, Transform},
    roi::crop_for_target,
    rotate::{crop_rotate_nv21, rotate, rotate_rgb},
    surface::{blit, expand_row, RenderTarget},
    Error, ErrorKind,
};
use std::error::Error as StdError;

/// NV21 frame whose samples encode their own coordinates so misplaced bytes
/// are easy to spot.
fn numbered_nv21(width: u32, height: u32) -> Vec<u8> {
    let (w, h) = (width as usize, height as usize);
    let mut buf = vec![0u8; image_size(width, height, PixelFormat::Nv21)];
    for y in 0..h {
        for x in 0..w {
            buf[y * w + x] = (y * 7 + x * 3) as u8;
        }
    }
    for y in 0..h / 2 {
        for x in 0..w / 2 {
            buf[w * h + y * w + x * 2] = (100 + y * 5 + x) as u8;
            buf[w * h + y * w + x * 2 + 1] = (200 + y + x * 3) as u8;
        }
    }
    buf
}

/// Independent dst -> src formulation of each transform.
fn reference_transform(t: Transform, src: &[u8], w: usize, h: usize) -> Vec<u8> {
    let (ow, oh) = t.output_size(w as u32, h as u32);
    let (ow, oh) = (ow as usize, oh as usize);
    let mut out = vec![0u8; ow * oh];
    for y in 0..oh {
        for x in 0..ow {
            let (sx, sy) = match t {
                Transform::Identity => (x, y),
                Transform::FlipHorizontal => (w - 1 - x, y),
                Transform::Rotate180 => (w - 1 - x, h - 1 - y),
                Transform::FlipVertical => (x, h - 1 - y),
                Transform::Transpose => (y, x),
                Transform::Rotate90 => (y, h - 1 - x),
                Transform::Transverse => (w - 1 - y, h - 1 - x),
                Transform::Rotate270 => (w - 1 - y, x),
            };
            out[y * ow + x] = src[sy * w + sx];
        }
    }
    out
}

#[test]
fn test_formats() {
    assert_eq!(image_size(1920, 1080, PixelFormat::Nv21), 3110400);
    assert_eq!(image_size(1920, 1080, PixelFormat::Rgb888), 6220800);
    assert_eq!(image_size(1920, 1080, PixelFormat::Rgba8888), 8294400);
    assert_eq!(PixelFormat::Rgbx8888.to_string(), "RGBX");
    assert_eq!(PixelFormat::Nv21.channels(), None);
}

#[test]
fn test_normalize_nv21_borrows() -> Result<(), Box<dyn StdError>> {
    let buf = numbered_nv21(64, 48);
    let frame = RawFrame::nv21(64, 48, &buf);
    assert!(is_canonical_nv21(&frame));

    let nv21 = normalize(&frame)?;
    println!("{}", nv21);
    assert!(nv21.is_borrowed());
    assert_eq!(nv21.as_bytes().as_ptr(), buf.as_ptr());
    assert_eq!(nv21.as_bytes(), &buf[..]);
    Ok(())
}

#[test]
fn test_normalize_nv21_with_header() -> Result<(), Box<dyn StdError>> {
    // some HALs prepend metadata, the aliased planes start after it
    let header = 32;
    let image = numbered_nv21(16, 8);
    let mut buf = vec![0xAA; header];
    buf.extend_from_slice(&image);
    buf.extend_from_slice(&[0x55; 16]);

    let (w, luma) = (16, 16 * 8);
    let frame = RawFrame::new(
        16,
        8,
        &buf,
        PlaneLayout::new(header, luma, 1, w),
        PlaneLayout::new(header + luma + 1, luma / 2 - 1, 2, w),
        PlaneLayout::new(header + luma, luma / 2 - 1, 2, w),
    );
    let nv21 = normalize(&frame)?;
    assert!(nv21.is_borrowed());
    assert_eq!(nv21.as_bytes().as_ptr(), buf[header..].as_ptr());
    assert_eq!(nv21.as_bytes(), &image[..]);
    Ok(())
}

#[test]
fn test_normalize_i420() -> Result<(), Box<dyn StdError>> {
    let (w, h) = (8usize, 6usize);
    let expected = numbered_nv21(w as u32, h as u32);

    let mut buf = expected[..w * h].to_vec();
    let chroma = &expected[w * h..];
    let us: Vec<u8> = chroma.chunks_exact(2).map(|p| p[1]).collect();
    let vs: Vec<u8> = chroma.chunks_exact(2).map(|p| p[0]).collect();
    buf.extend_from_slice(&us);
    buf.extend_from_slice(&vs);

    let frame = RawFrame::i420(w as u32, h as u32, &buf);
    assert!(!is_canonical_nv21(&frame));
    let nv21 = normalize(&frame)?;
    assert!(!nv21.is_borrowed());
    assert_eq!(nv21.as_bytes(), &expected[..]);
    Ok(())
}

#[test]
fn test_normalize_padded_semi_planar() -> Result<(), Box<dyn StdError>> {
    let (w, h, stride) = (8usize, 4usize, 16usize);
    let expected = numbered_nv21(w as u32, h as u32);

    // luma rows padded to 16 bytes, chroma as NV12 (U first) also padded
    let mut buf = vec![0xEE; stride * h + stride * h / 2];
    for y in 0..h {
        buf[y * stride..y * stride + w].copy_from_slice(&expected[y * w..(y + 1) * w]);
    }
    let chroma_base = stride * h;
    for y in 0..h / 2 {
        for x in 0..w / 2 {
            let pair = &expected[w * h + y * w + x * 2..];
            buf[chroma_base + y * stride + x * 2] = pair[1];
            buf[chroma_base + y * stride + x * 2 + 1] = pair[0];
        }
    }

    let frame = RawFrame::new(
        w as u32,
        h as u32,
        &buf,
        PlaneLayout::new(0, stride * h, 1, stride),
        PlaneLayout::new(chroma_base, stride * h / 2 - 1, 2, stride),
        PlaneLayout::new(chroma_base + 1, stride * h / 2 - 1, 2, stride),
    );
    let nv21 = normalize(&frame)?;
    assert_eq!(nv21.as_bytes(), &expected[..]);
    Ok(())
}

#[test]
fn test_normalize_strided_luma() -> Result<(), Box<dyn StdError>> {
    let (w, h) = (4usize, 2usize);
    // luma samples every other byte, as in a packed plane view
    let mut buf = vec![0u8; w * 2 * h];
    for i in 0..w * h {
        buf[i * 2] = i as u8 + 1;
    }
    let chroma_base = buf.len();
    buf.extend_from_slice(&[10, 11, 20, 21]);

    let frame = RawFrame::new(
        w as u32,
        h as u32,
        &buf,
        PlaneLayout::new(0, w * 2 * h, 2, w * 2),
        PlaneLayout::new(chroma_base, 2, 1, 2),
        PlaneLayout::new(chroma_base + 2, 2, 1, 2),
    );
    let nv21 = normalize(&frame)?;
    assert_eq!(nv21.luma(), &[1, 2, 3, 4, 5, 6, 7, 8]);
    assert_eq!(nv21.chroma(), &[20, 10, 21, 11]);
    Ok(())
}

#[test]
fn test_normalize_rejects_malformed() {
    let buf = vec![0u8; 1024];

    let err = normalize(&RawFrame::nv21(7, 4, &buf)).unwrap_err();
    assert!(matches!(err, Error::InvalidDimensions(7, 4)));
    assert_eq!(err.kind(), ErrorKind::Precondition);

    let err = normalize(&RawFrame::nv21(0, 4, &buf)).unwrap_err();
    assert!(matches!(err, Error::InvalidDimensions(0, 4)));

    let err = normalize(&RawFrame::nv21(64, 64, &buf)).unwrap_err();
    assert!(matches!(err, Error::PlaneOutOfBounds { plane: "Y", .. }));
    assert_eq!(err.kind(), ErrorKind::Precondition);

    // chroma row stride pushes the last V sample past the buffer
    let frame = RawFrame::new(
        16,
        16,
        &buf[..16 * 16 + 128],
        PlaneLayout::new(0, 256, 1, 16),
        PlaneLayout::new(257, 127, 2, 32),
        PlaneLayout::new(256, 128, 2, 32),
    );
    let err = normalize(&frame).unwrap_err();
    assert!(matches!(err, Error::PlaneOutOfBounds { plane: "U", .. }));

    let frame = RawFrame::new(
        4,
        4,
        &buf,
        PlaneLayout::new(0, 16, 1, 4),
        PlaneLayout::new(16, 4, 0, 2),
        PlaneLayout::new(20, 4, 1, 2),
    );
    let err = normalize(&frame).unwrap_err();
    assert!(matches!(err, Error::UnsupportedLayout(_)));
}

#[test]
fn test_normalize_rejects_huge_strides() {
    let buf = vec![0u8; 64];
    for row_stride in [usize::MAX / 2, 1 << (usize::BITS - 1)] {
        let frame = RawFrame::new(
            4,
            6,
            &buf,
            PlaneLayout::new(0, 24, 1, row_stride),
            PlaneLayout::new(25, 11, 2, 4),
            PlaneLayout::new(24, 12, 2, 4),
        );
        let err = normalize(&frame).unwrap_err();
        assert!(matches!(err, Error::UnsupportedLayout(_)), "{}", err);
        assert_eq!(err.kind(), ErrorKind::Precondition);
    }

    let frame = RawFrame::new(
        4,
        4,
        &buf,
        PlaneLayout::new(0, 16, 1, 4),
        PlaneLayout::new(17, 7, usize::MAX, 4),
        PlaneLayout::new(16, 8, 2, 4),
    );
    assert!(matches!(normalize(&frame), Err(Error::UnsupportedLayout(_))));
}

#[test]
fn test_nv21_frame_size() {
    assert!(Nv21Frame::new(4, 4, vec![0u8; 24]).is_ok());
    assert!(Nv21Frame::new(4, 4, vec![0u8; 23]).is_err());
    assert!(Nv21Frame::new(3, 4, vec![0u8; 18]).is_err());
}

#[test]
fn test_roi_scenarios() -> Result<(), Box<dyn StdError>> {
    // sideways capture into a portrait surface uses the whole frame
    let roi = crop_for_target(640, 480, 480, 640, Angle::Deg90)?;
    assert_eq!(roi, Rect::new(0, 0, 640, 480));

    // upright capture into a portrait surface trims the sides
    let roi = crop_for_target(640, 480, 480, 640, Angle::Deg0)?;
    assert_eq!(roi, Rect::new(140, 0, 360, 480));

    // wide surface trims rows
    let roi = crop_for_target(640, 480, 1280, 480, Angle::Deg180)?;
    assert_eq!(roi, Rect::new(0, 120, 640, 240));

    let roi = crop_for_target(640, 480, 640, 480, Angle::Deg0)?;
    assert_eq!(roi, Rect::full(640, 480));

    assert!(matches!(
        crop_for_target(640, 480, 0, 640, Angle::Deg0),
        Err(Error::SurfaceEmpty(0, 640))
    ));
    assert!(matches!(
        crop_for_target(640, 480, 1, 10000, Angle::Deg0),
        Err(Error::InvalidCrop { .. })
    ));
    Ok(())
}

#[test]
fn test_roi_invariants() -> Result<(), Box<dyn StdError>> {
    let frames = [(640, 480), (1920, 1080), (1280, 720), (320, 240), (4000, 3000)];
    let targets = [(480, 640), (1080, 2340), (1920, 1080), (720, 720), (333, 555)];

    for (fw, fh) in frames {
        for (tw, th) in targets {
            for angle in Angle::ALL {
                let roi = crop_for_target(fw, fh, tw, th, angle)?;
                assert!(roi.is_even_aligned(), "{} for {}x{}", roi, tw, th);
                assert!(roi.fits_in(fw, fh));

                let (uw, uh, full_w, full_h) = if angle.is_sideways() {
                    (roi.height, roi.width, fh, fw)
                } else {
                    (roi.width, roi.height, fw, fh)
                };
                // one dimension is kept whole so no larger crop exists
                assert!(uw == full_w || uh == full_h, "{} angle {}", roi, angle);

                let err = (uw as i64 * th as i64 - uh as i64 * tw as i64).abs();
                assert!(err < 2 * tw.max(th) as i64, "{} aspect off for {}x{}", roi, tw, th);

                // centered to within the even rounding
                let (left, right) = (roi.x, fw - roi.x - roi.width);
                let (top, bottom) = (roi.y, fh - roi.y - roi.height);
                assert!(left.abs_diff(right) <= 2);
                assert!(top.abs_diff(bottom) <= 2);
            }
        }
    }
    Ok(())
}

#[test]
fn test_rotate_reference() -> Result<(), Box<dyn StdError>> {
    let (w, h) = (5usize, 3usize);
    let src: Vec<u8> = (0..(w * h) as u8).collect();

    for t in Transform::ALL {
        let mut dst = vec![0u8; w * h];
        rotate::<1>(&src, w, h, w, &mut dst, t)?;
        assert_eq!(dst, reference_transform(t, &src, w, h), "{}", t);
    }
    Ok(())
}

#[test]
fn test_rotate_quarter_turns() -> Result<(), Box<dyn StdError>> {
    let src = [0, 1, 2, 3, 4, 5];

    let mut dst = [0u8; 6];
    rotate::<1>(&src, 3, 2, 3, &mut dst, Transform::Rotate90)?;
    assert_eq!(dst, [3, 0, 4, 1, 5, 2]);

    rotate::<1>(&src, 3, 2, 3, &mut dst, Transform::Rotate270)?;
    assert_eq!(dst, [2, 5, 1, 4, 0, 3]);

    rotate::<1>(&src, 3, 2, 3, &mut dst, Transform::Rotate180)?;
    assert_eq!(dst, [5, 4, 3, 2, 1, 0]);
    Ok(())
}

#[test]
fn test_rotate_window() -> Result<(), Box<dyn StdError>> {
    // 2x2 window at (1,1) of a 4x3 image of 2-byte pixels
    let src: Vec<u8> = (0..24).collect();
    let mut dst = [0u8; 8];
    rotate::<2>(&src[8 + 2..], 2, 2, 8, &mut dst, Transform::Transpose)?;
    assert_eq!(dst, [10, 11, 18, 19, 12, 13, 20, 21]);

    let err = rotate::<2>(&src, 4, 4, 8, &mut [0u8; 32], Transform::Identity).unwrap_err();
    assert!(matches!(err, Error::PlaneOutOfBounds { .. }));
    Ok(())
}

#[test]
fn test_rotate_round_trips() -> Result<(), Box<dyn StdError>> {
    let buf = numbered_nv21(32, 16);
    let frame = Nv21Frame::new(32, 16, &buf[..])?;
    let full = Rect::full(32, 16);

    let mut once = Vec::new();
    let mut twice = Vec::new();

    let (w, h) = crop_rotate_nv21(&frame, full, Transform::Identity, &mut once)?;
    assert_eq!((w, h), (32, 16));
    assert_eq!(once, buf);

    crop_rotate_nv21(&frame, full, Transform::Rotate180, &mut once)?;
    let rotated = Nv21Frame::new(32, 16, &once[..])?;
    crop_rotate_nv21(&rotated, full, Transform::Rotate180, &mut twice)?;
    assert_eq!(twice, buf);

    for t in Transform::ALL {
        let (w, h) = crop_rotate_nv21(&frame, full, t, &mut once)?;
        let rotated = Nv21Frame::new(w, h, &once[..])?;
        crop_rotate_nv21(&rotated, Rect::full(w, h), t.inverse(), &mut twice)?;
        assert_eq!(twice, buf, "{} then {}", t, t.inverse());
    }
    Ok(())
}

#[test]
fn test_crop_rotate_chroma_sited() -> Result<(), Box<dyn StdError>> {
    let buf = numbered_nv21(16, 12);
    let frame = Nv21Frame::new(16, 12, &buf[..])?;
    let roi = Rect::new(4, 2, 8, 6);

    for t in Transform::ALL {
        let mut out = Vec::new();
        let (w, h) = crop_rotate_nv21(&frame, roi, t, &mut out)?;
        let (w, h) = (w as usize, h as usize);

        // crop the source by hand and transform each plane independently
        let mut luma = Vec::new();
        for y in 2..8 {
            luma.extend_from_slice(&buf[y * 16 + 4..y * 16 + 12]);
        }
        let mut v = Vec::new();
        let mut u = Vec::new();
        for y in 1..4 {
            for x in 2..6 {
                v.push(buf[192 + y * 16 + x * 2]);
                u.push(buf[192 + y * 16 + x * 2 + 1]);
            }
        }
        assert_eq!(&out[..w * h], &reference_transform(t, &luma, 8, 6)[..], "{}", t);

        let v = reference_transform(t, &v, 4, 3);
        let u = reference_transform(t, &u, 4, 3);
        let chroma: Vec<u8> = v.iter().zip(&u).flat_map(|(v, u)| [*v, *u]).collect();
        assert_eq!(&out[w * h..], &chroma[..], "{}", t);
    }
    Ok(())
}

#[test]
fn test_crop_rotate_rejects_bad_roi() -> Result<(), Box<dyn StdError>> {
    let buf = numbered_nv21(16, 12);
    let frame = Nv21Frame::new(16, 12, &buf[..])?;
    let mut out = Vec::new();

    for roi in [
        Rect::new(1, 0, 8, 6),
        Rect::new(0, 0, 7, 6),
        Rect::new(10, 0, 8, 6),
        Rect::new(0, 0, 0, 6),
    ] {
        let err = crop_rotate_nv21(&frame, roi, Transform::Rotate90, &mut out).unwrap_err();
        assert!(matches!(err, Error::InvalidCrop { .. }), "{}", roi);
    }
    Ok(())
}

#[test]
fn test_rotate_rgb() -> Result<(), Box<dyn StdError>> {
    let mut src = RgbImage::new(4, 2);
    src.put_pixel(0, 0, [255, 0, 0]);
    src.put_pixel(3, 1, [0, 0, 255]);

    let mut dst = RgbImage::default();
    rotate_rgb(&src, Transform::Rotate90, &mut dst)?;
    assert_eq!((dst.width(), dst.height()), (2, 4));
    assert_eq!(dst.pixel(1, 0), Some([255, 0, 0]));
    assert_eq!(dst.pixel(0, 3), Some([0, 0, 255]));

    rotate_rgb(&src, Transform::FlipHorizontal, &mut dst)?;
    assert_eq!((dst.width(), dst.height()), (4, 2));
    assert_eq!(dst.pixel(3, 0), Some([255, 0, 0]));
    Ok(())
}

#[test]
fn test_convert_known_values() -> Result<(), Box<dyn StdError>> {
    let cases = [
        ((128, 128, 128), [128, 128, 128]),
        ((81, 240, 90), [238, 13, 13]),
        ((255, 128, 128), [255, 255, 255]),
        ((255, 255, 128), [255, 163, 255]),
        ((0, 0, 0), [0, 136, 0]),
        ((16, 128, 128), [16, 16, 16]),
    ];
    for ((y, v, u), rgb) in cases {
        let nv21 = [y, y, y, y, v, u];
        let mut out = [0u8; 12];
        nv21_to_rgb(&nv21, 2, 2, &mut out)?;
        for px in out.chunks_exact(3) {
            assert_eq!(px, rgb, "Y {} V {} U {}", y, v, u);
        }
    }
    Ok(())
}

#[test]
fn test_convert_chroma_sharing() -> Result<(), Box<dyn StdError>> {
    // 4x2: left block neutral, right block strongly red
    let nv21 = [50, 60, 81, 81, 70, 80, 81, 81, 128, 128, 240, 90];
    let mut out = [0u8; 24];
    nv21_to_rgb(&nv21, 4, 2, &mut out)?;
    assert_eq!(&out[0..6], &[50, 50, 50, 60, 60, 60]);
    assert_eq!(&out[12..18], &[70, 70, 70, 80, 80, 80]);
    assert_eq!(&out[6..9], &[238, 13, 13]);
    assert_eq!(&out[21..24], &[238, 13, 13]);
    Ok(())
}

#[test]
fn test_convert_deterministic() -> Result<(), Box<dyn StdError>> {
    let buf = numbered_nv21(320, 240);
    let frame = Nv21Frame::new(320, 240, &buf[..])?;

    let mut first = RgbImage::default();
    convert_frame(&frame, &mut first)?;
    for _ in 0..4 {
        let mut again = RgbImage::default();
        convert_frame(&frame, &mut again)?;
        assert_eq!(first, again);
    }

    // rows are converted independently of how they are scheduled
    let mut top = vec![0u8; 320 * 2 * 3];
    nv21_to_rgb(
        &[&buf[..640], &buf[320 * 240..320 * 241]].concat(),
        320,
        2,
        &mut top,
    )?;
    assert_eq!(&first.as_slice()[..top.len()], &top[..]);
    Ok(())
}

#[test]
fn test_convert_rejects_bad_buffers() {
    let mut rgb = vec![0u8; 12];
    assert!(matches!(
        nv21_to_rgb(&[0u8; 6], 3, 2, &mut rgb),
        Err(Error::InvalidDimensions(3, 2))
    ));
    assert!(nv21_to_rgb(&[0u8; 5], 2, 2, &mut rgb).is_err());
    assert!(nv21_to_rgb(&[0u8; 6], 2, 2, &mut rgb[..11]).is_err());
}

#[test]
fn test_expand_row_widths() {
    for width in 1..=20usize {
        let rgb: Vec<u8> = (0..width * 3).map(|i| i as u8).collect();
        let mut rgba = vec![0u8; width * 4];
        expand_row(&rgb, &mut rgba);

        let expected: Vec<u8> = rgb
            .chunks_exact(3)
            .flat_map(|p| [p[0], p[1], p[2], 255])
            .collect();
        assert_eq!(rgba, expected, "width {}", width);
    }
}

#[test]
fn test_blit_stride() -> Result<(), Box<dyn StdError>> {
    for width in [1u32, 7, 8, 9, 17] {
        let mut image = RgbImage::new(width, 3);
        for (i, b) in image.as_slice_mut().iter_mut().enumerate() {
            *b = (i * 11) as u8;
        }

        let stride = width + 5;
        let mut bits = vec![0u8; (stride * 4) as usize * 3];
        let mut target = RenderTarget {
            width,
            height: 3,
            stride,
            format: PixelFormat::Rgbx8888,
            bits: &mut bits,
        };
        blit(&image, &mut target)?;

        for y in 0..3u32 {
            let row = &bits[(y * stride * 4) as usize..][..(stride * 4) as usize];
            for x in 0..width {
                let px = &row[x as usize * 4..][..4];
                let rgb = image.pixel(x, y).ok_or("pixel")?;
                assert_eq!(px, &[rgb[0], rgb[1], rgb[2], 255]);
            }
            // row padding is never written
            assert!(row[width as usize * 4..].iter().all(|b| *b == 0));
        }
    }
    Ok(())
}

#[test]
fn test_blit_failures_leave_target_untouched() {
    let image = RgbImage::new(8, 8);
    let mut bits = vec![7u8; 8 * 8 * 4];

    let mut target = RenderTarget {
        width: 8,
        height: 8,
        stride: 8,
        format: PixelFormat::Rgb888,
        bits: &mut bits,
    };
    let err = blit(&image, &mut target).unwrap_err();
    assert!(matches!(err, Error::UnsupportedFormat(PixelFormat::Rgb888)));

    let mut target = RenderTarget {
        width: 8,
        height: 7,
        stride: 8,
        format: PixelFormat::Rgba8888,
        bits: &mut bits,
    };
    let err = blit(&image, &mut target).unwrap_err();
    assert!(matches!(err, Error::TargetTooSmall { .. }));

    let mut short = vec![7u8; 8 * 8 * 4 - 1];
    let mut target = RenderTarget {
        width: 8,
        height: 8,
        stride: 8,
        format: PixelFormat::Rgba8888,
        bits: &mut short,
    };
    assert!(blit(&image, &mut target).is_err());

    assert!(bits.iter().all(|b| *b == 7));
    assert!(short.iter().all(|b| *b == 7));
}
