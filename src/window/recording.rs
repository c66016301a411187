use parking_lot::Mutex;

use crate::window::{Geometry, MonitorInfo, WindowOps};

#[derive(Debug, Clone, PartialEq)]
pub enum WindowCall {
    Title(String),
    Position(i32, i32),
    Size(u32, u32),
    Decorated(bool),
    Floating(bool),
    Aspect(Option<(u32, u32)>),
    Maximize,
    Iconify,
    Restore,
    EnterFullscreen(usize),
    ExitFullscreen(Geometry),
    BeginDrag,
    Close,
    PlatformWindows,
}

struct Recorded {
    geometry: Geometry,
    fullscreen: bool,
    monitors: Vec<MonitorInfo>,
    calls: Vec<WindowCall>,
}

/// Window that only remembers what was asked of it.
pub struct RecordingWindow {
    inner: Mutex<Recorded>,
}

impl RecordingWindow {
    pub fn new(geometry: Geometry, monitors: Vec<MonitorInfo>) -> Self {
        Self {
            inner: Mutex::new(Recorded {
                geometry,
                fullscreen: false,
                monitors,
                calls: Vec::new(),
            }),
        }
    }

    pub fn calls(&self) -> Vec<WindowCall> {
        self.inner.lock().calls.clone()
    }

    pub fn take_calls(&self) -> Vec<WindowCall> {
        std::mem::take(&mut self.inner.lock().calls)
    }

    fn record(&self, call: WindowCall) {
        self.inner.lock().calls.push(call);
    }
}

impl Default for RecordingWindow {
    fn default() -> Self {
        Self::new(
            Geometry::new(100, 100, 1280, 720),
            vec![MonitorInfo {
                name: "primary".into(),
                bounds: Geometry::new(0, 0, 1920, 1080),
                primary: true,
            }],
        )
    }
}

impl WindowOps for RecordingWindow {
    fn set_title(&self, title: &str) {
        self.record(WindowCall::Title(title.to_string()));
    }

    fn position(&self) -> (i32, i32) {
        let g = self.inner.lock().geometry;
        (g.x, g.y)
    }

    fn size(&self) -> (u32, u32) {
        let g = self.inner.lock().geometry;
        (g.width, g.height)
    }

    fn set_position(&self, x: i32, y: i32) {
        let mut inner = self.inner.lock();
        inner.geometry.x = x;
        inner.geometry.y = y;
        inner.calls.push(WindowCall::Position(x, y));
    }

    fn set_size(&self, width: u32, height: u32) {
        let mut inner = self.inner.lock();
        inner.geometry.width = width;
        inner.geometry.height = height;
        inner.calls.push(WindowCall::Size(width, height));
    }

    fn set_decorated(&self, decorated: bool) {
        self.record(WindowCall::Decorated(decorated));
    }

    fn set_floating(&self, floating: bool) {
        self.record(WindowCall::Floating(floating));
    }

    fn set_aspect_ratio(&self, ratio: Option<(u32, u32)>) {
        self.record(WindowCall::Aspect(ratio));
    }

    fn maximize(&self) {
        self.record(WindowCall::Maximize);
    }

    fn iconify(&self) {
        self.record(WindowCall::Iconify);
    }

    fn restore(&self) {
        self.record(WindowCall::Restore);
    }

    fn monitors(&self) -> Vec<MonitorInfo> {
        self.inner.lock().monitors.clone()
    }

    fn is_fullscreen(&self) -> bool {
        self.inner.lock().fullscreen
    }

    fn enter_fullscreen(&self, index: usize) {
        let mut inner = self.inner.lock();
        inner.fullscreen = true;
        inner.calls.push(WindowCall::EnterFullscreen(index));
    }

    fn exit_fullscreen(&self, restore: Geometry) {
        let mut inner = self.inner.lock();
        inner.fullscreen = false;
        inner.geometry = restore;
        inner.calls.push(WindowCall::ExitFullscreen(restore));
    }

    fn begin_drag(&self) {
        self.record(WindowCall::BeginDrag);
    }

    fn request_close(&self) {
        self.record(WindowCall::Close);
    }

    fn update_platform_windows(&self) {
        self.record(WindowCall::PlatformWindows);
    }
}
