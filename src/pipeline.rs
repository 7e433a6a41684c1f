// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

use crate::{
    convert::nv21_to_rgb,
    error::{ErrorKind, Result},
    image::{PixelFormat, RawFrame, Rect, RgbImage},
    normalize::normalize,
    orientation::{Orientation, Transform},
    roi::crop_for_target,
    rotate::{crop_rotate_nv21, rotate_rgb},
    surface::{blit, Surface},
};
use tracing::{debug, instrument, warn};

/// Application hook invoked on every upright, cropped RGB frame before it is
/// levelled for the display and presented.
///
/// The consumer may draw on the image in place; its dimensions must not
/// change.
pub trait FrameConsumer: Send {
    fn on_frame(&mut self, image: &mut RgbImage);
}

impl<F> FrameConsumer for F
where
    F: FnMut(&mut RgbImage) + Send,
{
    fn on_frame(&mut self, image: &mut RgbImage) {
        self(image)
    }
}

/// Geometry chosen for one presented frame.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct FrameReport {
    /// Region of the camera frame that was kept.
    pub roi: Rect,
    /// Transform from camera frame to upright image.
    pub capture: Transform,
    /// Transform from upright image to display buffer.
    pub display: Transform,
    /// Size of the upright image handed to the consumer.
    pub upright: (u32, u32),
    /// Size of the buffer presented to the surface.
    pub rendered: (u32, u32),
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct PipelineStats {
    pub presented: u64,
    pub dropped: u64,
}

/// Turns camera frames into display-ready buffers.
///
/// A pipeline processes one frame at a time on the caller's thread and keeps
/// its intermediate buffers between frames to avoid per-frame allocation.
///
/// # Example
///
/// ```no_run
/// use edgefirst_preview::{
///     image::RawFrame,
///     orientation::{Angle, Facing, Orientation},
///     pipeline::Pipeline,
///     surface::MemorySurface,
/// };
///
/// let nv21 = vec![128u8; 640 * 480 * 3 / 2];
/// let frame = RawFrame::nv21(640, 480, &nv21);
/// let mut surface = MemorySurface::new(480, 640);
/// let mut pipeline = Pipeline::new();
///
/// let orientation = Orientation::new(Angle::Deg90, Facing::Back, Angle::Deg0);
/// assert!(pipeline.on_frame(&frame, orientation, &mut surface));
/// ```
#[derive(Default)]
pub struct Pipeline {
    consumer: Option<Box<dyn FrameConsumer>>,
    cropped: Vec<u8>,
    upright: RgbImage,
    render: RgbImage,
    stats: PipelineStats,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_consumer(consumer: impl FrameConsumer + 'static) -> Self {
        Self {
            consumer: Some(Box::new(consumer)),
            ..Self::default()
        }
    }

    pub fn set_consumer(&mut self, consumer: Option<Box<dyn FrameConsumer>>) {
        self.consumer = consumer;
    }

    pub fn stats(&self) -> PipelineStats {
        self.stats
    }

    /// Processes one frame and presents it, dropping it on any failure.
    ///
    /// This is the entry point for the frame delivery callback: it never
    /// fails, and a dropped frame leaves the pipeline ready for the next one.
    /// Returns true when the frame reached the surface.
    pub fn on_frame(
        &mut self,
        frame: &RawFrame,
        orientation: Orientation,
        surface: &mut dyn Surface,
    ) -> bool {
        match self.process(frame, orientation, surface) {
            Ok(report) => {
                self.stats.presented += 1;
                debug!(?report, "frame presented");
                true
            }
            Err(err) => {
                self.stats.dropped += 1;
                match err.kind() {
                    ErrorKind::Precondition => warn!("dropped frame: {}", err),
                    _ => debug!("dropped frame: {}", err),
                }
                false
            }
        }
    }

    /// Crops, orients, converts and presents one frame.
    ///
    /// The crop is chosen against the surface size in upright axes so the
    /// image fills the surface, the capture transform makes the crop upright
    /// and the display transform compensates the device tilt.
    ///
    /// # Errors
    ///
    /// Returns an error if the frame is malformed, the surface has no usable
    /// size, or the surface cannot be configured or locked. Nothing is
    /// written to the surface unless every earlier stage succeeded.
    #[instrument(skip_all, fields(
        capture = %orientation.capture_transform(),
        display = %orientation.display_transform()
    ))]
    pub fn process(
        &mut self,
        frame: &RawFrame,
        orientation: Orientation,
        surface: &mut dyn Surface,
    ) -> Result<FrameReport> {
        let nv21 = normalize(frame)?;

        let (mut target_w, mut target_h) = surface.size();
        if orientation.tilt.is_sideways() {
            std::mem::swap(&mut target_w, &mut target_h);
        }

        let roi = crop_for_target(
            nv21.width(),
            nv21.height(),
            target_w,
            target_h,
            orientation.capture_angle(),
        )?;
        let capture = orientation.capture_transform();
        let (width, height) = crop_rotate_nv21(&nv21, roi, capture, &mut self.cropped)?;

        self.upright.reshape(width, height);
        nv21_to_rgb(&self.cropped, width, height, self.upright.as_slice_mut())?;

        if let Some(consumer) = self.consumer.as_mut() {
            consumer.on_frame(&mut self.upright);
        }

        let display = orientation.display_transform();
        rotate_rgb(&self.upright, display, &mut self.render)?;
        let rendered = (self.render.width(), self.render.height());

        surface.configure(rendered.0, rendered.1, PixelFormat::Rgba8888)?;
        let result = {
            let mut target = surface.lock()?;
            blit(&self.render, &mut target)
        };
        match result {
            Ok(()) => surface.unlock_and_present(),
            Err(err) => {
                surface.unlock_and_discard();
                return Err(err);
            }
        }

        Ok(FrameReport {
            roi,
            capture,
            display,
            upright: (width, height),
            rendered,
        })
    }

    /// Produces an upright RGB image of the whole frame without a display
    /// surface: no crop and no tilt levelling of the output.
    ///
    /// The frame consumer, if any, sees the image before it is returned.
    ///
    /// # Errors
    ///
    /// Returns an error if the frame is malformed.
    #[instrument(skip_all, fields(capture = %orientation.capture_transform()))]
    pub fn capture(&mut self, frame: &RawFrame, orientation: Orientation) -> Result<RgbImage> {
        let nv21 = normalize(frame)?;
        let full = Rect::full(nv21.width(), nv21.height());
        let (width, height) =
            crop_rotate_nv21(&nv21, full, orientation.capture_transform(), &mut self.cropped)?;

        let mut rgb = RgbImage::new(width, height);
        nv21_to_rgb(&self.cropped, width, height, rgb.as_slice_mut())?;

        if let Some(consumer) = self.consumer.as_mut() {
            consumer.on_frame(&mut rgb);
        }
        Ok(rgb)
    }
}
