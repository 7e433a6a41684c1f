// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! # EdgeFirst Camera Preview Library
//!
//! This library turns raw YUV 4:2:0 camera frames into display-ready RGBA
//! buffers for a live camera preview. Each frame is oriented to compensate
//! for the sensor mounting angle, the camera facing and the current device
//! tilt, cropped to fill the display surface without letterboxing, and
//! expanded to the surface's native pixel format.
//!
//! ## Pipeline
//!
//! 1. [`normalize`]: repack any Y/U/V plane layout into canonical NV21,
//!    aliasing the camera buffer when it already is NV21.
//! 2. [`roi`]: choose the largest centered, even-aligned crop matching the
//!    surface aspect ratio.
//! 3. [`rotate`]: crop and apply the capture [`orientation::Transform`] in
//!    one pass over luma and chroma.
//! 4. [`convert`]: NV21 to RGB888.
//! 5. An optional [`pipeline::FrameConsumer`] draws on the upright frame.
//! 6. [`rotate`] again to level the image for the tilted display.
//! 7. [`surface`]: expand to RGBA and write into the locked surface buffer.
//!
//! ## Example
//!
//! ```no_run
//! use edgefirst_preview::{
//!     image::RawFrame,
//!     orientation::{DeviceTilt, Facing, Angle},
//!     pipeline::Pipeline,
//!     session::{CameraDescriptor, Session},
//!     surface::MemorySurface,
//! };
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut session = Session::new(CameraDescriptor::new("0", Facing::Back, Angle::Deg90));
//! session.open()?;
//! session.on_active()?;
//!
//! let tilt = DeviceTilt::default();
//! let mut surface = MemorySurface::new(480, 640);
//! let mut pipeline = Pipeline::new();
//!
//! let nv21 = vec![0u8; 640 * 480 * 3 / 2];
//! let frame = RawFrame::nv21(640, 480, &nv21);
//! pipeline.on_frame(&frame, session.snapshot(&tilt), &mut surface);
//! # Ok(())
//! # }
//! ```
//!
//! ## Threading
//!
//! A [`pipeline::Pipeline`] runs on whichever thread delivers frames. The
//! device tilt is shared through [`orientation::DeviceTilt`], which the
//! orientation sensor may update from any thread; each frame reads it once
//! through [`session::Session::snapshot`].

pub mod convert;
pub mod error;
pub mod image;
pub mod normalize;
pub mod orientation;
pub mod pipeline;
pub mod roi;
pub mod rotate;
pub mod session;
pub mod surface;

pub use error::{Error, ErrorKind, Result};
