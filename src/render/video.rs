//! GStreamer-backed video playback.
//!
//! A `playbin` pipeline decodes into an `appsink` that hands BGRA frames to
//! the window for upload. A watcher thread reports the play position to the
//! driver and loops the clip at end-of-stream, so the sequencer's
//! minimum-watch debounce decides when the slot is released.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use gstreamer as gst;
use gstreamer::prelude::*;
use gstreamer_app as gst_app;
use gstreamer_video as gst_video;
use gstreamer_video::VideoFrameExt;
use tokio::sync::mpsc::Sender;
use tracing::{debug, warn};

use crate::events::AdapterEvent;

const POSITION_POLL: gst::ClockTime = gst::ClockTime::from_mseconds(250);

/// Initialize GStreamer once, before any playback.
///
/// # Errors
/// Returns an error when the GStreamer runtime is unavailable.
pub fn init() -> Result<()> {
    gst::init().context("initializing GStreamer")
}

/// One decoded BGRA frame, tightly packed.
pub struct VideoFrame {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

pub struct VideoPlayer {
    playbin: gst::Element,
    frame: Arc<Mutex<Option<VideoFrame>>>,
    has_new_frame: Arc<AtomicBool>,
    stop_flag: Arc<AtomicBool>,
    watcher: Option<thread::JoinHandle<()>>,
}

impl VideoPlayer {
    /// Start playing `path`. Position reports and end-of-stream signals go
    /// to `events`; frames are picked up via [`VideoPlayer::take_frame`].
    ///
    /// # Errors
    /// Returns an error when the pipeline cannot be built or started.
    pub fn play(path: &Path, muted: bool, events: Sender<AdapterEvent>) -> Result<Self> {
        let frame = Arc::new(Mutex::new(None));
        let has_new_frame = Arc::new(AtomicBool::new(false));

        let sink_bin = gst::parse::bin_from_description(
            "videoconvert ! video/x-raw,format=BGRA ! appsink name=sink sync=true max-buffers=1 drop=true",
            true,
        )
        .context("building video sink bin")?;
        let app_sink = sink_bin
            .by_name("sink")
            .context("appsink missing from sink bin")?
            .dynamic_cast::<gst_app::AppSink>()
            .map_err(|_| anyhow!("sink element is not an AppSink"))?;
        install_frame_callback(&app_sink, Arc::clone(&frame), Arc::clone(&has_new_frame));

        let abs = path
            .canonicalize()
            .with_context(|| format!("resolving video path {}", path.display()))?;
        let uri = gst::glib::filename_to_uri(&abs, None)
            .with_context(|| format!("building uri for {}", abs.display()))?;

        let playbin = gst::ElementFactory::make("playbin")
            .property("uri", uri.as_str())
            .property("video-sink", &sink_bin)
            .property("mute", muted)
            .build()
            .context("creating playbin")?;

        let bus = playbin.bus().context("playbin has no bus")?;
        playbin
            .set_state(gst::State::Playing)
            .context("starting playback")?;

        let stop_flag = Arc::new(AtomicBool::new(false));
        let watcher = spawn_watcher(playbin.clone(), bus, events, Arc::clone(&stop_flag));

        Ok(Self {
            playbin,
            frame,
            has_new_frame,
            stop_flag,
            watcher: Some(watcher),
        })
    }

    /// Take the most recent decoded frame, if a new one arrived since the
    /// last call.
    pub fn take_frame(&self) -> Option<VideoFrame> {
        if !self.has_new_frame.swap(false, Ordering::Acquire) {
            return None;
        }
        self.frame.lock().ok()?.take()
    }

    pub fn set_muted(&self, muted: bool) {
        self.playbin.set_property("mute", muted);
    }

    pub fn stop(&mut self) {
        self.stop_flag.store(true, Ordering::Release);
        if let Err(err) = self.playbin.set_state(gst::State::Null) {
            warn!("failed to tear down pipeline: {err}");
        }
        if let Some(watcher) = self.watcher.take() {
            let _ = watcher.join();
        }
    }
}

impl Drop for VideoPlayer {
    fn drop(&mut self) {
        self.stop();
    }
}

fn install_frame_callback(
    app_sink: &gst_app::AppSink,
    frame: Arc<Mutex<Option<VideoFrame>>>,
    has_new_frame: Arc<AtomicBool>,
) {
    app_sink.set_callbacks(
        gst_app::AppSinkCallbacks::builder()
            .new_sample(move |sink| {
                let sample = sink.pull_sample().map_err(|_| gst::FlowError::Eos)?;
                let caps = sample.caps().ok_or(gst::FlowError::Error)?;
                let info =
                    gst_video::VideoInfo::from_caps(caps).map_err(|_| gst::FlowError::Error)?;
                let buffer = sample.buffer().ok_or(gst::FlowError::Error)?;
                let vframe = gst_video::VideoFrameRef::from_buffer_ref_readable(buffer, &info)
                    .map_err(|_| gst::FlowError::Error)?;

                let width = info.width();
                let height = info.height();
                let stride = vframe.plane_stride()[0] as usize;
                let data = vframe.plane_data(0).map_err(|_| gst::FlowError::Error)?;

                // Repack to tight rows; appsink strides can be padded.
                let row = width as usize * 4;
                let mut pixels = Vec::with_capacity(row * height as usize);
                for y in 0..height as usize {
                    let start = y * stride;
                    pixels.extend_from_slice(&data[start..start + row]);
                }

                if let Ok(mut slot) = frame.lock() {
                    *slot = Some(VideoFrame {
                        width,
                        height,
                        pixels,
                    });
                    has_new_frame.store(true, Ordering::Release);
                }
                Ok(gst::FlowSuccess::Ok)
            })
            .build(),
    );
}

/// Bus + position watcher. Loops the clip on end-of-stream and reports the
/// end through a position update so the sequencer's debounce applies; a
/// pipeline error is surfaced as `PlaybackFinished` so the show is not
/// wedged on a broken file.
fn spawn_watcher(
    playbin: gst::Element,
    bus: gst::Bus,
    events: Sender<AdapterEvent>,
    stop_flag: Arc<AtomicBool>,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        loop {
            if stop_flag.load(Ordering::Acquire) {
                break;
            }

            if let Some(message) = bus.timed_pop(POSITION_POLL) {
                use gst::MessageView;
                match message.view() {
                    MessageView::Eos(_) => {
                        let duration = playbin
                            .query_duration::<gst::ClockTime>()
                            .map_or(Duration::ZERO, |t| Duration::from_nanos(t.nseconds()));
                        if duration.is_zero() {
                            let _ = events.blocking_send(AdapterEvent::PlaybackFinished);
                            break;
                        }
                        let _ = events.blocking_send(AdapterEvent::PositionChanged {
                            position: duration,
                            duration,
                        });
                        debug!("end of stream; looping");
                        if playbin
                            .seek_simple(
                                gst::SeekFlags::FLUSH | gst::SeekFlags::KEY_UNIT,
                                gst::ClockTime::ZERO,
                            )
                            .is_err()
                        {
                            let _ = events.blocking_send(AdapterEvent::PlaybackFinished);
                            break;
                        }
                    }
                    MessageView::Error(err) => {
                        warn!("pipeline error: {}", err.error());
                        let _ = events.blocking_send(AdapterEvent::PlaybackFinished);
                        break;
                    }
                    _ => {}
                }
                continue;
            }

            // timed_pop timeout doubles as the position poll interval
            if let (Some(position), Some(duration)) = (
                playbin.query_position::<gst::ClockTime>(),
                playbin.query_duration::<gst::ClockTime>(),
            ) {
                let _ = events.try_send(AdapterEvent::PositionChanged {
                    position: Duration::from_nanos(position.nseconds()),
                    duration: Duration::from_nanos(duration.nseconds()),
                });
            }
        }
    })
}
