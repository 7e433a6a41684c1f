// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

use clap::Parser;
use edgefirst_preview::orientation::Facing;
use std::path::PathBuf;

/// Camera facing options.
#[derive(clap::ValueEnum, Clone, Debug, PartialEq, Copy)]
pub enum FacingSetting {
    /// Camera on the display side, preview is mirrored
    Front,
    /// Camera on the rear of the device
    Back,
}

impl From<FacingSetting> for Facing {
    fn from(value: FacingSetting) -> Self {
        match value {
            FacingSetting::Front => Facing::Front,
            FacingSetting::Back => Facing::Back,
        }
    }
}

/// Plane layout of the synthetic camera frames.
///
/// Selects which normalization path the frames exercise.
#[derive(clap::ValueEnum, Clone, Debug, PartialEq, Copy)]
pub enum LayoutSetting {
    /// Contiguous NV21, normalized without copying
    Nv21,
    /// Fully planar I420
    I420,
    /// Semi-planar with padded rows, as many camera HALs deliver
    Padded,
}

/// Command-line arguments for the EdgeFirst camera preview.
///
/// Runs the preview pipeline against a synthetic camera and a simulated
/// orientation sensor, presenting into an in-memory surface. Arguments can be
/// specified via command line or environment variables.
///
/// # Example
///
/// ```bash
/// # Front camera, device rotated every two seconds
/// edgefirst-preview --facing front --tilt-period 2000
///
/// # Via environment variables
/// export SURFACE_SIZE="1080 1920"
/// export OVERLAY=true
/// edgefirst-preview
/// ```
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Camera capture resolution in pixels (width height)
    #[arg(
        long,
        env = "CAMERA_SIZE",
        default_value = "640 480",
        value_delimiter = ' ',
        num_args = 2
    )]
    pub camera_size: Vec<u32>,

    /// Camera facing
    #[arg(long, env = "FACING", default_value = "back", value_enum)]
    pub facing: FacingSetting,

    /// Camera sensor mounting angle in degrees (0, 90, 180 or 270)
    #[arg(long, env = "SENSOR_ORIENTATION", default_value = "90")]
    pub sensor_orientation: i32,

    /// Use the reported front camera sensor orientation instead of forcing 0
    #[arg(long, env = "NO_FRONT_OVERRIDE")]
    pub no_front_override: bool,

    /// Path to camera characteristics JSON (overrides facing and sensor
    /// orientation)
    #[arg(long, env = "CAMERA_INFO_PATH")]
    pub camera_info_path: Option<PathBuf>,

    /// Plane layout of the synthetic camera frames
    #[arg(long, env = "LAYOUT", default_value = "nv21", value_enum)]
    pub layout: LayoutSetting,

    /// Camera frame rate
    #[arg(long, env = "FPS", default_value = "30")]
    pub fps: u32,

    /// Number of frames to process before exiting (0 runs forever)
    #[arg(long, env = "FRAMES", default_value = "0")]
    pub frames: u64,

    /// Display surface size in pixels (width height)
    #[arg(
        short,
        long,
        env = "SURFACE_SIZE",
        default_value = "480 640",
        value_delimiter = ' ',
        num_args = 2
    )]
    pub surface_size: Vec<u32>,

    /// Extra pixels at the end of each surface row
    #[arg(long, env = "SURFACE_PADDING", default_value = "0")]
    pub surface_padding: u32,

    /// Fixed device tilt in degrees (0, 90, 180 or 270)
    #[arg(long, env = "TILT", default_value = "0")]
    pub tilt: i32,

    /// Rotate the simulated device a quarter turn every N milliseconds
    #[arg(long, env = "TILT_PERIOD")]
    pub tilt_period: Option<u64>,

    /// Draw the orientation marker overlay on each frame
    #[arg(long, env = "OVERLAY")]
    pub overlay: bool,

    /// Produce upright frames without a display surface
    #[arg(long, env = "HEADLESS")]
    pub headless: bool,

    /// Write the last presented frame to this path as raw RGBA
    #[arg(short, long, env = "OUTPUT")]
    pub output: Option<PathBuf>,

    /// Enable verbose debug logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Enable Tokio async runtime console for debugging
    #[arg(long, env = "TOKIO_CONSOLE")]
    pub tokio_console: bool,

    /// Enable Tracy profiler for performance analysis
    #[arg(long, env = "TRACY")]
    pub tracy: bool,
}
