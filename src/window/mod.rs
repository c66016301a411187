pub mod host;

#[cfg(test)]
mod recording;

#[cfg(test)]
pub use recording::{RecordingWindow, WindowCall};

/// Position and size of a window or monitor, in physical pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Geometry {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Geometry {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    /// Area shared with `other`, zero when they do not intersect.
    pub fn overlap(&self, other: &Geometry) -> u64 {
        let left = self.x.max(other.x) as i64;
        let top = self.y.max(other.y) as i64;
        let right = (self.x as i64 + self.width as i64).min(other.x as i64 + other.width as i64);
        let bottom = (self.y as i64 + self.height as i64).min(other.y as i64 + other.height as i64);
        if right <= left || bottom <= top {
            return 0;
        }
        ((right - left) * (bottom - top)) as u64
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorInfo {
    pub name: String,
    pub bounds: Geometry,
    pub primary: bool,
}

/// Everything the player does to its window. Implementations are only ever
/// called on the thread that owns the window, through Dispatch.
pub trait WindowOps: Send + Sync {
    fn set_title(&self, title: &str);
    fn position(&self) -> (i32, i32);
    fn size(&self) -> (u32, u32);
    fn set_position(&self, x: i32, y: i32);
    fn set_size(&self, width: u32, height: u32);
    fn set_decorated(&self, decorated: bool);
    fn set_floating(&self, floating: bool);
    /// Lock the client area to `width:height`, or release the lock.
    fn set_aspect_ratio(&self, ratio: Option<(u32, u32)>);
    fn maximize(&self);
    fn iconify(&self);
    fn restore(&self);

    fn monitors(&self) -> Vec<MonitorInfo>;
    fn is_fullscreen(&self) -> bool;
    /// Go fullscreen on the monitor at `index` in [`WindowOps::monitors`].
    fn enter_fullscreen(&self, index: usize);
    /// Leave fullscreen and put the window back at `restore`.
    fn exit_fullscreen(&self, restore: Geometry);

    fn begin_drag(&self);
    fn request_close(&self);

    /// Update and render secondary platform windows. Must not run while a
    /// native modal or drag is in progress.
    fn update_platform_windows(&self);

    fn geometry(&self) -> Geometry {
        let (x, y) = self.position();
        let (width, height) = self.size();
        Geometry { x, y, width, height }
    }
}

/// Pick the monitor sharing the most area with `window`. The first monitor
/// wins a tie; when nothing overlaps, the primary monitor (or the first one)
/// is used. `None` only when there are no monitors.
pub fn select_monitor(window: &Geometry, monitors: &[MonitorInfo]) -> Option<usize> {
    let mut best: Option<(usize, u64)> = None;
    for (index, monitor) in monitors.iter().enumerate() {
        let area = window.overlap(&monitor.bounds);
        if area == 0 {
            continue;
        }
        match best {
            Some((_, best_area)) if best_area >= area => {}
            _ => best = Some((index, area)),
        }
    }

    best.map(|(index, _)| index)
        .or_else(|| monitors.iter().position(|m| m.primary))
        .or(if monitors.is_empty() { None } else { Some(0) })
}
