// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

use crate::{image::PixelFormat, session::SessionState};
use thiserror::Error;

/// Broad classification of an [`Error`].
///
/// The pipeline uses the kind to decide how loudly a dropped frame is
/// reported: precondition violations point at a broken frame source, while
/// an unavailable surface is routine during start-up and resizes.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// The frame handed to the pipeline is malformed.
    Precondition,
    /// The presentation surface could not accept a frame.
    ResourceUnavailable,
    /// The camera description is unusable or the session was driven
    /// through an invalid transition.
    Session,
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid frame dimensions {0}x{1}: width and height must be even and non-zero")]
    InvalidDimensions(u32, u32),

    #[error("{plane} plane does not fit in the frame buffer ({needed} bytes needed, {available} available)")]
    PlaneOutOfBounds {
        plane: &'static str,
        needed: usize,
        available: usize,
    },

    #[error("unsupported chroma layout: {0}")]
    UnsupportedLayout(String),

    #[error("crop {x},{y} {width}x{height} is not inside a {frame_width}x{frame_height} frame")]
    InvalidCrop {
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        frame_width: u32,
        frame_height: u32,
    },

    #[error("surface is not configured")]
    SurfaceNotConfigured,

    #[error("surface has no usable size ({0}x{1})")]
    SurfaceEmpty(u32, u32),

    #[error("failed to lock surface: {0}")]
    SurfaceLock(String),

    #[error("unsupported render target format {0}")]
    UnsupportedFormat(PixelFormat),

    #[error("render target {width}x{height} stride {stride} cannot hold a {needed_width}x{needed_height} image")]
    TargetTooSmall {
        width: u32,
        height: u32,
        stride: u32,
        needed_width: u32,
        needed_height: u32,
    },

    #[error("invalid camera descriptor: {0}")]
    InvalidDescriptor(String),

    #[error("invalid session transition from {from:?} on {event}")]
    InvalidTransition {
        from: SessionState,
        event: &'static str,
    },
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidDimensions(..)
            | Error::PlaneOutOfBounds { .. }
            | Error::UnsupportedLayout(_)
            | Error::InvalidCrop { .. } => ErrorKind::Precondition,
            Error::SurfaceNotConfigured
            | Error::SurfaceEmpty(..)
            | Error::SurfaceLock(_)
            | Error::UnsupportedFormat(_)
            | Error::TargetTooSmall { .. } => ErrorKind::ResourceUnavailable,
            Error::InvalidDescriptor(_) | Error::InvalidTransition { .. } => ErrorKind::Session,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
