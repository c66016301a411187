use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::bridge::dispatch::Dispatch;
use crate::bridge::signal::FrameSignal;
use crate::core::FrameConfig;
use crate::engine::Engine;
use crate::window::WindowOps;

/// Flags shared between the UI thread and engine-side handlers.
#[derive(Debug, Default)]
pub struct UiState {
    modal_open: AtomicBool,
    dragging: AtomicBool,
    ui_suspended: AtomicBool,
}

impl UiState {
    pub fn modal_open(&self) -> bool {
        self.modal_open.load(Ordering::Acquire)
    }

    pub fn set_modal_open(&self, open: bool) {
        self.modal_open.store(open, Ordering::Release);
    }

    pub fn dragging(&self) -> bool {
        self.dragging.load(Ordering::Acquire)
    }

    pub fn set_dragging(&self, dragging: bool) {
        self.dragging.store(dragging, Ordering::Release);
    }

    pub fn ui_suspended(&self) -> bool {
        self.ui_suspended.load(Ordering::Acquire)
    }

    pub fn set_ui_suspended(&self, suspended: bool) {
        self.ui_suspended.store(suspended, Ordering::Release);
    }
}

/// The drawable the frame loop paints into.
pub trait FrameSurface {
    fn size(&self) -> (u32, u32);
    /// Draw the UI overlay on top of the video.
    fn draw_ui(&mut self);
    fn present(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FramePolicy {
    pub idle_wait: Duration,
    pub input_wait: Duration,
    pub input_boost: Duration,
}

impl Default for FramePolicy {
    fn default() -> Self {
        Self::from(&FrameConfig::default())
    }
}

impl From<&FrameConfig> for FramePolicy {
    fn from(config: &FrameConfig) -> Self {
        Self {
            idle_wait: Duration::from_millis(config.idle_wait_ms),
            input_wait: Duration::from_millis(config.input_wait_ms),
            input_boost: Duration::from_millis(config.input_boost_ms),
        }
    }
}

/// What one iteration did.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FrameReport {
    pub jobs: usize,
    pub video: bool,
    pub ui: bool,
    pub platform_windows: bool,
}

pub struct FrameLoop {
    dispatch: Arc<Dispatch<dyn WindowOps>>,
    ui: Arc<UiState>,
    signal: Arc<FrameSignal>,
    policy: FramePolicy,
    viewports: bool,
    last_input: Option<Instant>,
}

impl FrameLoop {
    pub fn new(
        dispatch: Arc<Dispatch<dyn WindowOps>>,
        ui: Arc<UiState>,
        signal: Arc<FrameSignal>,
        policy: FramePolicy,
        viewports: bool,
    ) -> Self {
        Self {
            dispatch,
            ui,
            signal,
            policy,
            viewports,
            last_input: None,
        }
    }

    pub fn note_input(&mut self) {
        self.last_input = Some(Instant::now());
    }

    /// How long to sleep before the next iteration when nothing wakes us.
    pub fn timeout(&self) -> Duration {
        self.timeout_at(Instant::now())
    }

    pub fn timeout_at(&self, now: Instant) -> Duration {
        match self.last_input {
            Some(at) if now.saturating_duration_since(at) < self.policy.input_boost => self.policy.input_wait,
            _ => self.policy.idle_wait,
        }
    }

    /// One pass of the UI thread: drain Dispatch, render video if the engine
    /// asked for a frame, draw UI, present, then update platform windows.
    pub fn iterate(&mut self, engine: &Engine, surface: &mut dyn FrameSurface) -> FrameReport {
        // Re-arm the waker before draining so work queued from here on wakes
        // the next iteration.
        let wake = self.signal.take();
        let mut report = FrameReport {
            jobs: self.dispatch.drain(),
            ..FrameReport::default()
        };

        let client = engine.client();
        // Always consulted so the pending-frame flag clears even when the
        // engine is idle.
        let wanted = engine.want_render() || wake.render;
        if wanted && (!client.idle() || client.force_window()) {
            let (width, height) = surface.size();
            engine.render(width, height);
            report.video = true;
        }

        if !self.viewports || !self.ui.ui_suspended() {
            surface.draw_ui();
            report.ui = true;
        }

        surface.present();

        if report.ui && self.viewports && !self.ui.modal_open() && !self.ui.dragging() {
            report.platform_windows = self.dispatch.sync(|window| window.update_platform_windows()).is_some();
        }

        report
    }
}
