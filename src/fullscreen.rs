//! Double click detection and the fullscreen toggle.

use instant::{Duration, Instant};
use winit::window::{Fullscreen, Window};

/// The platform's fullscreen API. State is always queried live, never cached.
pub trait FullscreenPlatform {
    fn is_fullscreen(&self) -> bool;

    fn request_fullscreen(&self);

    fn exit_fullscreen(&self);
}

impl FullscreenPlatform for Window {
    fn is_fullscreen(&self) -> bool {
        self.fullscreen().is_some()
    }

    fn request_fullscreen(&self) {
        self.set_fullscreen(Some(Fullscreen::Borderless(None)));
    }

    fn exit_fullscreen(&self) {
        self.set_fullscreen(None);
    }
}

/// Enter fullscreen when nothing is fullscreen, leave it otherwise.
///
/// Returns whether fullscreen was requested.
pub fn toggle_fullscreen(platform: &dyn FullscreenPlatform) -> bool {
    if platform.is_fullscreen() {
        log::debug!("leaving fullscreen");
        platform.exit_fullscreen();
        false
    } else {
        log::debug!("entering fullscreen");
        platform.request_fullscreen();
        true
    }
}

/// Turns a stream of presses into double clicks.
///
/// The press completing a double click is consumed, so three quick presses
/// make one double click and a pending first press.
#[derive(Debug)]
pub struct DoubleClick {
    interval: Duration,
    last_press: Option<Instant>,
}

impl DoubleClick {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_press: None,
        }
    }

    /// Register a press at `now`, returning `true` if it completes a double click.
    pub fn register(&mut self, now: Instant) -> bool {
        match self.last_press {
            Some(previous) if now >= previous && now - previous <= self.interval => {
                self.last_press = None;
                true
            }
            _ => {
                self.last_press = Some(now);
                false
            }
        }
    }
}
