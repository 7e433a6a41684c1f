// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! Orientation model and the resolver that turns camera mounting, facing and
//! device tilt into the dihedral transforms applied to each frame.

use core::fmt;
use std::{
    ops::{Add, Sub},
    sync::atomic::{AtomicU32, Ordering},
};
use tracing::trace;

/// A right angle multiple, as reported by the camera characteristics and the
/// device orientation sensor.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum Angle {
    #[default]
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl Angle {
    pub const ALL: [Angle; 4] = [Angle::Deg0, Angle::Deg90, Angle::Deg180, Angle::Deg270];

    /// Converts a reading in degrees. Anything other than exactly 0, 90, 180
    /// or 270 is treated as 0.
    pub const fn from_degrees(degrees: i32) -> Self {
        match degrees {
            90 => Angle::Deg90,
            180 => Angle::Deg180,
            270 => Angle::Deg270,
            _ => Angle::Deg0,
        }
    }

    pub const fn degrees(self) -> u32 {
        self.quarter_turns() as u32 * 90
    }

    const fn quarter_turns(self) -> u8 {
        match self {
            Angle::Deg0 => 0,
            Angle::Deg90 => 1,
            Angle::Deg180 => 2,
            Angle::Deg270 => 3,
        }
    }

    const fn from_quarter_turns(turns: u8) -> Self {
        match turns % 4 {
            1 => Angle::Deg90,
            2 => Angle::Deg180,
            3 => Angle::Deg270,
            _ => Angle::Deg0,
        }
    }

    /// True for 90 and 270, where image width and height trade places.
    pub const fn is_sideways(self) -> bool {
        matches!(self, Angle::Deg90 | Angle::Deg270)
    }
}

impl Add for Angle {
    type Output = Angle;

    fn add(self, rhs: Angle) -> Angle {
        Angle::from_quarter_turns(self.quarter_turns() + rhs.quarter_turns())
    }
}

impl Sub for Angle {
    type Output = Angle;

    fn sub(self, rhs: Angle) -> Angle {
        Angle::from_quarter_turns(self.quarter_turns() + 4 - rhs.quarter_turns())
    }
}

impl fmt::Display for Angle {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}°", self.degrees())
    }
}

/// Which way a camera points relative to the display.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Facing {
    /// Same direction as the display; previews are mirrored.
    Front,
    /// Away from the display.
    Back,
}

impl Facing {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "front" => Some(Facing::Front),
            "back" | "rear" => Some(Facing::Back),
            _ => None,
        }
    }
}

impl fmt::Display for Facing {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Facing::Front => write!(f, "front"),
            Facing::Back => write!(f, "back"),
        }
    }
}

/// The eight rotations and mirrors of a rectangle, numbered like the EXIF
/// orientation tag.
///
/// ```text
/// 1 Identity       2 FlipHorizontal  3 Rotate180       4 FlipVertical
/// 5 Transpose      6 Rotate90        7 Transverse      8 Rotate270
/// ```
///
/// Rotations are clockwise. `Transpose` mirrors across the main diagonal and
/// `Transverse` across the anti-diagonal.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Transform {
    Identity = 1,
    FlipHorizontal = 2,
    Rotate180 = 3,
    FlipVertical = 4,
    Transpose = 5,
    Rotate90 = 6,
    Transverse = 7,
    Rotate270 = 8,
}

impl Transform {
    pub const ALL: [Transform; 8] = [
        Transform::Identity,
        Transform::FlipHorizontal,
        Transform::Rotate180,
        Transform::FlipVertical,
        Transform::Transpose,
        Transform::Rotate90,
        Transform::Transverse,
        Transform::Rotate270,
    ];

    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Transform::Identity),
            2 => Some(Transform::FlipHorizontal),
            3 => Some(Transform::Rotate180),
            4 => Some(Transform::FlipVertical),
            5 => Some(Transform::Transpose),
            6 => Some(Transform::Rotate90),
            7 => Some(Transform::Transverse),
            8 => Some(Transform::Rotate270),
            _ => None,
        }
    }

    pub const fn code(self) -> u8 {
        self as u8
    }

    /// True when the output has the input's width and height exchanged.
    pub const fn swaps_axes(self) -> bool {
        self as u8 >= 5
    }

    /// The transform that undoes this one.
    pub const fn inverse(self) -> Self {
        match self {
            Transform::Rotate90 => Transform::Rotate270,
            Transform::Rotate270 => Transform::Rotate90,
            other => other,
        }
    }

    /// Output dimensions for a `width` x `height` input.
    pub const fn output_size(self, width: u32, height: u32) -> (u32, u32) {
        if self.swaps_axes() {
            (height, width)
        } else {
            (width, height)
        }
    }
}

impl fmt::Display for Transform {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?}({})", self, self.code())
    }
}

/// Transform taking a sensor frame to an upright image.
///
/// Back cameras compose the sensor mounting angle with the device tilt.
/// Front cameras are mirrored, which flips the sense of the tilt and selects
/// the mirrored half of the transform group.
pub fn capture_transform(sensor: Angle, facing: Facing, tilt: Angle) -> Transform {
    match facing {
        Facing::Back => match sensor + tilt {
            Angle::Deg0 => Transform::Identity,
            Angle::Deg90 => Transform::Rotate90,
            Angle::Deg180 => Transform::Rotate180,
            Angle::Deg270 => Transform::Rotate270,
        },
        Facing::Front => match sensor - tilt {
            Angle::Deg0 => Transform::FlipHorizontal,
            Angle::Deg90 => Transform::Transpose,
            Angle::Deg180 => Transform::FlipVertical,
            Angle::Deg270 => Transform::Transverse,
        },
    }
}

/// Transform levelling an upright image on a display tilted by `tilt`.
pub fn display_transform(tilt: Angle) -> Transform {
    match tilt {
        Angle::Deg0 => Transform::Identity,
        Angle::Deg90 => Transform::Rotate270,
        Angle::Deg180 => Transform::Rotate180,
        Angle::Deg270 => Transform::Rotate90,
    }
}

/// Snapshot of every orientation input for one frame.
///
/// Taken once per frame so the capture and display transforms are derived
/// from the same tilt reading.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Orientation {
    pub sensor: Angle,
    pub facing: Facing,
    pub tilt: Angle,
}

impl Orientation {
    pub const fn new(sensor: Angle, facing: Facing, tilt: Angle) -> Self {
        Self {
            sensor,
            facing,
            tilt,
        }
    }

    /// Net rotation between sensor and display. Only its class (sideways or
    /// not) matters for cropping, and that class is the same for both facings.
    pub fn capture_angle(&self) -> Angle {
        match self.facing {
            Facing::Back => self.sensor + self.tilt,
            Facing::Front => self.sensor - self.tilt,
        }
    }

    pub fn capture_transform(&self) -> Transform {
        capture_transform(self.sensor, self.facing, self.tilt)
    }

    pub fn display_transform(&self) -> Transform {
        display_transform(self.tilt)
    }
}

/// Acceleration along a device axis, in m/s², beyond which gravity is taken
/// to point along that axis.
pub const GRAVITY_THRESHOLD: f32 = 7.0;

/// Latest coarse device tilt, written by the orientation sensor and read by
/// the pipeline without locking.
#[derive(Debug, Default)]
pub struct DeviceTilt {
    degrees: AtomicU32,
}

impl DeviceTilt {
    pub fn new(tilt: Angle) -> Self {
        Self {
            degrees: AtomicU32::new(tilt.degrees()),
        }
    }

    pub fn get(&self) -> Angle {
        Angle::from_degrees(self.degrees.load(Ordering::Relaxed) as i32)
    }

    pub fn set(&self, tilt: Angle) {
        self.degrees.store(tilt.degrees(), Ordering::Relaxed);
    }

    /// Quantizes an accelerometer reading and stores the resulting tilt.
    ///
    /// Readings where no axis exceeds [`GRAVITY_THRESHOLD`], such as a device
    /// lying flat, keep the previous tilt. Returns the tilt now in effect.
    pub fn update_from_acceleration(&self, x: f32, y: f32) -> Angle {
        let mut tilt = None;
        if y > GRAVITY_THRESHOLD {
            tilt = Some(Angle::Deg0);
        }
        if x < -GRAVITY_THRESHOLD {
            tilt = Some(Angle::Deg90);
        }
        if y < -GRAVITY_THRESHOLD {
            tilt = Some(Angle::Deg180);
        }
        if x > GRAVITY_THRESHOLD {
            tilt = Some(Angle::Deg270);
        }

        match tilt {
            Some(tilt) => {
                trace!(x, y, %tilt, "device tilt");
                self.set(tilt);
                tilt
            }
            None => self.get(),
        }
    }
}
