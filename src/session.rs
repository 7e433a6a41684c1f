// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! Camera descriptors and the lifecycle of a capture session.
//!
//! The platform camera API is callback driven; its callbacks map onto the
//! transition methods of [`Session`], which keeps track of whether frames
//! may currently be delivered and builds the per-frame [`Orientation`].

use crate::{
    error::{Error, Result},
    orientation::{Angle, DeviceTilt, Facing, Orientation},
};
use serde_json::Value;
use tracing::{info, warn};

/// Fixed characteristics of one camera, queried once when it is opened.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CameraDescriptor {
    pub id: String,
    pub facing: Facing,
    /// Clockwise angle the sensor image must be rotated to appear upright
    /// on the device in its natural orientation.
    pub sensor_orientation: Angle,
    front_override: bool,
}

impl CameraDescriptor {
    pub fn new(id: impl Into<String>, facing: Facing, sensor_orientation: Angle) -> Self {
        Self {
            id: id.into(),
            facing,
            sensor_orientation,
            front_override: true,
        }
    }

    /// Enables or disables forcing front camera sensor orientation to 0.
    ///
    /// The override is on by default: some devices report a meaningless
    /// mounting angle for the front sensor.
    pub fn with_front_override(mut self, enabled: bool) -> Self {
        self.front_override = enabled;
        self
    }

    /// Sensor orientation used for frame processing.
    pub fn effective_sensor_orientation(&self) -> Angle {
        match self.facing {
            Facing::Front if self.front_override => Angle::Deg0,
            _ => self.sensor_orientation,
        }
    }

    /// Parses one camera from its characteristics JSON, e.g.
    /// `{"id": "1", "facing": "front", "sensor_orientation": 270}`.
    ///
    /// A missing or unrecognized `sensor_orientation` reads as 0.
    pub fn from_json(value: &Value) -> Result<Self> {
        let facing = value["facing"]
            .as_str()
            .and_then(Facing::parse)
            .ok_or_else(|| {
                Error::InvalidDescriptor(format!("missing or invalid facing in {}", value))
            })?;
        let orientation = value["sensor_orientation"]
            .as_i64()
            .and_then(|degrees| i32::try_from(degrees).ok())
            .map_or(Angle::Deg0, Angle::from_degrees);
        let id = match &value["id"] {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            _ => facing.to_string(),
        };
        let mut camera = CameraDescriptor::new(id, facing, orientation);
        if let Some(enabled) = value["front_override"].as_bool() {
            camera = camera.with_front_override(enabled);
        }
        Ok(camera)
    }

    /// Parses either a single camera object or `{"cameras": [...]}`.
    pub fn list_from_json(value: &Value) -> Result<Vec<Self>> {
        match value["cameras"].as_array() {
            Some(cameras) => cameras.iter().map(Self::from_json).collect(),
            None => Ok(vec![Self::from_json(value)?]),
        }
    }
}

/// Picks the first camera pointing the requested way.
pub fn select_camera(cameras: &[CameraDescriptor], facing: Facing) -> Option<&CameraDescriptor> {
    cameras.iter().find(|c| c.facing == facing)
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SessionState {
    Closed,
    Opening,
    Capturing,
    Closing,
}

/// Lifecycle of one capture session on one camera.
#[derive(Debug)]
pub struct Session {
    camera: CameraDescriptor,
    state: SessionState,
}

impl Session {
    pub fn new(camera: CameraDescriptor) -> Self {
        Self {
            camera,
            state: SessionState::Closed,
        }
    }

    pub fn camera(&self) -> &CameraDescriptor {
        &self.camera
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    fn transition(
        &mut self,
        event: &'static str,
        allowed: &[SessionState],
        to: SessionState,
    ) -> Result<()> {
        if !allowed.contains(&self.state) {
            return Err(Error::InvalidTransition {
                from: self.state,
                event,
            });
        }
        info!(camera = %self.camera.id, from = ?self.state, to = ?to, "{}", event);
        self.state = to;
        Ok(())
    }

    /// The device open and capture request have been issued.
    pub fn open(&mut self) -> Result<()> {
        self.transition("open", &[SessionState::Closed], SessionState::Opening)
    }

    /// The capture session reports it is streaming.
    pub fn on_active(&mut self) -> Result<()> {
        self.transition("active", &[SessionState::Opening], SessionState::Capturing)
    }

    /// Stop repeating requests and tear the session down.
    pub fn close(&mut self) -> Result<()> {
        self.transition(
            "close",
            &[SessionState::Opening, SessionState::Capturing],
            SessionState::Closing,
        )
    }

    /// The capture session has finished closing.
    pub fn on_closed(&mut self) -> Result<()> {
        self.transition("closed", &[SessionState::Closing], SessionState::Closed)
    }

    /// The camera device was disconnected.
    pub fn on_disconnect(&mut self) {
        warn!(camera = %self.camera.id, state = ?self.state, "camera disconnected");
        self.state = SessionState::Closed;
    }

    /// The camera device reported a fatal error.
    pub fn on_error(&mut self, code: i32) {
        warn!(camera = %self.camera.id, state = ?self.state, code, "camera error");
        self.state = SessionState::Closed;
    }

    pub fn accepts_frames(&self) -> bool {
        self.state == SessionState::Capturing
    }

    /// Orientation inputs for the next frame, combining the camera's fixed
    /// characteristics with the current device tilt.
    pub fn snapshot(&self, tilt: &DeviceTilt) -> Orientation {
        Orientation::new(
            self.camera.effective_sensor_orientation(),
            self.camera.facing,
            tilt.get(),
        )
    }
}
