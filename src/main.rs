// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

use args::{Args, LayoutSetting};
use clap::Parser;
use edgefirst_preview::{
    image::{PlaneLayout, RawFrame, Rect, RgbImage},
    orientation::{Angle, DeviceTilt, Facing},
    pipeline::Pipeline,
    session::{select_camera, CameraDescriptor, Session},
    surface::{expand_row, MemorySurface},
};
use std::{
    error::Error,
    fs::File,
    io::Write,
    path::Path,
    sync::Arc,
    time::{Duration, Instant},
};
use tracing::{debug, info, trace, warn};
use tracing_subscriber::{filter::LevelFilter, layer::SubscriberExt, EnvFilter, Layer};

mod args;

/// Extra bytes per row in the padded synthetic layout.
const ROW_PADDING: usize = 64;

/// Gravity vectors (x, y) of a device at 0, 90, 180 and 270 degrees.
const GRAVITY: [(f32, f32); 4] = [(0.0, 9.81), (-9.81, 0.0), (0.0, -9.81), (9.81, 0.0)];

/// A frame from the synthetic camera, owning its buffer like a camera HAL
/// image until it is released.
struct SyntheticFrame {
    width: u32,
    height: u32,
    layout: LayoutSetting,
    buffer: Vec<u8>,
}

impl SyntheticFrame {
    /// Renders a test pattern: four colored quadrants, a white marker in the
    /// sensor's top-left corner and a bar sweeping left to right.
    fn new(width: u32, height: u32, layout: LayoutSetting, seq: u64) -> Self {
        let (w, h) = (width as usize, height as usize);
        // (Y, V, U) for red, green, blue and gray
        let quadrants = [(81, 240, 90), (145, 34, 54), (41, 110, 240), (180, 128, 128)];
        let quadrant = |x: usize, y: usize| quadrants[(y * 2 / h.max(1)) * 2 + x * 2 / w.max(1)];
        let bar = (seq as usize * 8) % w.max(1);

        let stride = match layout {
            LayoutSetting::Padded => w + ROW_PADDING,
            _ => w,
        };
        let mut buffer = vec![0u8; stride * h + stride * h / 2];
        let (luma, chroma) = buffer.split_at_mut(stride * h);

        for y in 0..h {
            for x in 0..w {
                let marker = x < w / 8 && y < h / 8;
                let in_bar = x >= bar && x < bar + 8;
                luma[y * stride + x] = if marker || in_bar { 235 } else { quadrant(x, y).0 };
            }
        }

        let (cw, ch) = (w / 2, h / 2);
        for y in 0..ch {
            for x in 0..cw {
                let (_, v, u) = quadrant(x * 2, y * 2);
                match layout {
                    LayoutSetting::I420 => {
                        chroma[y * cw + x] = u;
                        chroma[cw * ch + y * cw + x] = v;
                    }
                    _ => {
                        chroma[y * stride + x * 2] = v;
                        chroma[y * stride + x * 2 + 1] = u;
                    }
                }
            }
        }

        Self {
            width,
            height,
            layout,
            buffer,
        }
    }

    fn raw(&self) -> RawFrame<'_> {
        let (w, h) = (self.width as usize, self.height as usize);
        match self.layout {
            LayoutSetting::Nv21 => RawFrame::nv21(self.width, self.height, &self.buffer),
            LayoutSetting::I420 => RawFrame::i420(self.width, self.height, &self.buffer),
            LayoutSetting::Padded => {
                let stride = w + ROW_PADDING;
                let base = stride * h;
                let chroma_len = stride * h / 2 - 1;
                RawFrame::new(
                    self.width,
                    self.height,
                    &self.buffer,
                    PlaneLayout::new(0, base, 1, stride),
                    PlaneLayout::new(base + 1, chroma_len, 2, stride),
                    PlaneLayout::new(base, chroma_len, 2, stride),
                )
            }
        }
    }
}

/// Frame consumer marking the upright image so orientation errors are
/// obvious: red block top-left, green block top-right.
fn orientation_marker(image: &mut RgbImage) {
    let size = (image.width().min(image.height()) / 10).max(2);
    image.fill_rect(Rect::new(0, 0, size, size), [255, 0, 0]);
    image.fill_rect(
        Rect::new(image.width().saturating_sub(size), 0, size, size),
        [0, 255, 0],
    );
}

fn update_fps(prev: &mut Instant, history: &mut [i64], index: &mut usize) -> i64 {
    let now = Instant::now();

    let elapsed = now.duration_since(*prev);
    *prev = now;

    history[*index] = 1e9 as i64 / (elapsed.as_nanos() as i64).max(1);
    *index = (*index + 1) % history.len();

    (history.iter().sum::<i64>() as f64 / history.len() as f64).round() as i64
}

fn load_camera(args: &Args) -> Result<CameraDescriptor, Box<dyn Error>> {
    let facing: Facing = args.facing.into();
    let camera = match &args.camera_info_path {
        Some(path) => {
            let file = File::open(path)?;
            let json: serde_json::Value = serde_json::from_reader(file)?;
            let cameras = CameraDescriptor::list_from_json(&json)?;
            select_camera(&cameras, facing)
                .cloned()
                .ok_or_else(|| format!("no {} camera in {}", facing, path.display()))?
        }
        None => CameraDescriptor::new(
            facing.to_string(),
            facing,
            Angle::from_degrees(args.sensor_orientation),
        ),
    };

    if args.no_front_override {
        return Ok(camera.with_front_override(false));
    }
    Ok(camera)
}

fn init_tracing(args: &Args) -> Result<(), Box<dyn Error>> {
    let default = if args.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let stdout = tracing_subscriber::fmt::layer().with_filter(filter);

    let journald = tracing_journald::layer()
        .ok()
        .map(|journald| journald.with_filter(LevelFilter::INFO));

    let tracy = if args.tracy {
        let _ = tracy_client::Client::start();
        Some(tracing_tracy::TracyLayer::default())
    } else {
        None
    };

    let console = args.tokio_console.then(console_subscriber::spawn);

    let subscriber = tracing_subscriber::registry()
        .with(stdout)
        .with(journald)
        .with(tracy)
        .with(console);
    tracing::subscriber::set_global_default(subscriber)?;
    tracing_log::LogTracer::init()?;
    Ok(())
}

/// Feeds the orientation sensor with gravity readings of a device turning a
/// quarter turn every `period`.
async fn simulate_accelerometer(tilt: Arc<DeviceTilt>, period: Duration) {
    let mut interval = tokio::time::interval(period);
    let mut turn = tilt.get().degrees() as usize / 90;
    loop {
        interval.tick().await;
        let (x, y) = GRAVITY[turn % GRAVITY.len()];
        let now = tilt.update_from_acceleration(x, y);
        info!(tilt = %now, "device orientation");
        turn += 1;
    }
}

/// Delivers synthetic frames at the camera frame rate. When the pipeline has
/// not picked up the previous frame yet it is replaced by the new one.
async fn synthetic_camera(
    tx: kanal::Sender<SyntheticFrame>,
    stale: kanal::Receiver<SyntheticFrame>,
    width: u32,
    height: u32,
    layout: LayoutSetting,
    fps: u32,
) {
    let mut interval = tokio::time::interval(Duration::from_secs_f64(1.0 / fps.max(1) as f64));
    let mut seq = 0u64;
    loop {
        interval.tick().await;
        let mut frame = SyntheticFrame::new(width, height, layout, seq);
        loop {
            match tx.try_send(frame) {
                Ok(true) => break,
                Ok(false) => {
                    trace!(seq, "replacing pending frame");
                    if stale.try_recv().is_err() {
                        return;
                    }
                    frame = SyntheticFrame::new(width, height, layout, seq);
                }
                Err(_) => return,
            }
        }
        seq += 1;
    }
}

fn write_rgba(
    path: &Path,
    width: u32,
    height: u32,
    rows: &mut dyn Iterator<Item = Vec<u8>>,
) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    for row in rows {
        file.write_all(&row)?;
    }
    info!("saved {} resolution: {}x{} RGBA", path.display(), width, height);
    Ok(())
}

fn save_headless(path: &Path, image: &RgbImage) -> std::io::Result<()> {
    let mut rows = image.as_slice().chunks_exact(image.row_stride()).map(|src| {
        let mut row = vec![0u8; image.width() as usize * 4];
        expand_row(src, &mut row);
        row
    });
    write_rgba(path, image.width(), image.height(), &mut rows)
}

fn save_surface(path: &Path, surface: &MemorySurface) -> std::io::Result<()> {
    let Some((width, height, _)) = surface.configuration() else {
        warn!("nothing was presented, {} not written", path.display());
        return Ok(());
    };
    let stride = surface.stride() as usize * 4;
    let mut rows = surface
        .bits()
        .chunks_exact(stride)
        .take(height as usize)
        .map(|row| row[..width as usize * 4].to_vec());
    write_rgba(path, width, height, &mut rows)
}

fn process_frames(
    rx: kanal::Receiver<SyntheticFrame>,
    mut session: Session,
    tilt: Arc<DeviceTilt>,
    args: Args,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let mut pipeline = if args.overlay {
        Pipeline::with_consumer(orientation_marker)
    } else {
        Pipeline::new()
    };
    let mut surface = MemorySurface::with_padding(
        args.surface_size[0],
        args.surface_size[1],
        args.surface_padding,
    );
    let mut upright = None;

    let mut prev = Instant::now();
    let mut history = vec![0; 30];
    let mut index = 0;
    let mut processed = 0u64;

    while let Ok(mut frame) = rx.recv() {
        while let Ok(Some(newer)) = rx.try_recv() {
            frame = newer;
        }
        if !session.accepts_frames() {
            continue;
        }

        let orientation = session.snapshot(&tilt);
        let now = Instant::now();
        let presented = if args.headless {
            match pipeline.capture(&frame.raw(), orientation) {
                Ok(image) => {
                    upright = Some(image);
                    true
                }
                Err(e) => {
                    warn!("capture failed: {}", e);
                    false
                }
            }
        } else {
            pipeline.on_frame(&frame.raw(), orientation, &mut surface)
        };
        let process_time = now.elapsed();
        let fps = update_fps(&mut prev, &mut history, &mut index);

        if let Some(client) = tracy_client::Client::running() {
            client.frame_mark();
        }

        debug!(
            "frame {} presented: {} process: {:?} fps: {} capture: {} display: {}",
            processed,
            presented,
            process_time,
            fps,
            orientation.capture_transform(),
            orientation.display_transform(),
        );

        processed += 1;
        if processed % 300 == 0 {
            let stats = pipeline.stats();
            info!(
                "frames presented: {} dropped: {} fps: {}",
                stats.presented, stats.dropped, fps
            );
        }
        if args.frames != 0 && processed >= args.frames {
            break;
        }
    }

    let _ = rx.close();
    session.close()?;
    session.on_closed()?;

    if let Some(path) = &args.output {
        match &upright {
            Some(image) => save_headless(path, image)?,
            None => save_surface(path, &surface)?,
        }
    }

    let stats = pipeline.stats();
    info!(
        "processed {} frames, presented {} dropped {}",
        processed, stats.presented, stats.dropped
    );
    Ok(())
}

async fn run(args: Args) -> Result<(), Box<dyn Error>> {
    let camera = load_camera(&args)?;
    info!(
        "camera {} facing: {} sensor orientation: {} effective: {}",
        camera.id,
        camera.facing,
        camera.sensor_orientation,
        camera.effective_sensor_orientation()
    );

    let mut session = Session::new(camera);
    session.open()?;

    let tilt = Arc::new(DeviceTilt::new(Angle::from_degrees(args.tilt)));
    if let Some(period) = args.tilt_period {
        tokio::spawn(simulate_accelerometer(
            tilt.clone(),
            Duration::from_millis(period.max(1)),
        ));
    }

    let (tx, rx) = kanal::bounded(1);
    tokio::spawn(synthetic_camera(
        tx,
        rx.clone(),
        args.camera_size[0],
        args.camera_size[1],
        args.layout,
        args.fps,
    ));
    session.on_active()?;

    tokio::task::spawn_blocking(move || process_frames(rx, session, tilt, args))
        .await?
        .map_err(|e| e as Box<dyn Error>)
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_time()
        .build()?;
    let _guard = rt.enter();

    init_tracing(&args)?;
    info!("EdgeFirst Camera Preview");

    rt.block_on(run(args))
}
