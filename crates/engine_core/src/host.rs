//! Host collaborators: the drawable surface, the frame scheduler and the
//! resize subscription.
//!
//! The engine never owns a window or an event loop. A host hands it boxed
//! implementations of these traits and forwards frame callbacks and size
//! changes. [`MemorySurface`] and [`ManualScheduler`] are in-process
//! implementations used by the headless binary and by tests.

use std::cell::RefCell;
use std::rc::Rc;

/// Something the composited frame can be shown on.
pub trait Surface {
    /// Size in CSS (logical) pixels.
    fn css_size(&self) -> (u32, u32);

    /// Ratio between device pixels and CSS pixels.
    fn device_pixel_ratio(&self) -> f32 {
        1.0
    }

    /// Resize the backing store to `width x height` device pixels.
    fn resize(&mut self, width: u32, height: u32);

    /// Show a frame. `rgba` is tightly packed, `width * height * 4` bytes.
    fn present(&mut self, width: u32, height: u32, rgba: &[u8]);
}

/// Handle for one pending frame callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameToken(pub u64);

/// The platform's "call me before the next repaint" primitive.
pub trait FrameScheduler {
    /// Ask for one frame callback. The host later calls the engine's frame
    /// entry point once for the returned token.
    fn request_frame(&mut self) -> FrameToken;

    /// Withdraw a previously requested callback. Unknown tokens are ignored.
    fn cancel_frame(&mut self, token: FrameToken);
}

/// A live subscription to size changes of the surface's container.
pub trait ResizeObserver {
    fn disconnect(&mut self);
}

#[derive(Debug, Default)]
struct MemorySurfaceState {
    css_size: (u32, u32),
    device_pixel_ratio: f32,
    backing_size: (u32, u32),
    last_frame: Vec<u8>,
    presents: u64,
}

/// Surface that keeps the last presented frame in memory.
///
/// Cloning yields another handle to the same surface, so a host can keep
/// one handle for inspection after boxing another into the engine.
#[derive(Debug, Clone)]
pub struct MemorySurface {
    inner: Rc<RefCell<MemorySurfaceState>>,
}

impl MemorySurface {
    pub fn new(width: u32, height: u32, device_pixel_ratio: f32) -> Self {
        Self {
            inner: Rc::new(RefCell::new(MemorySurfaceState {
                css_size: (width, height),
                device_pixel_ratio: if device_pixel_ratio > 0.0 { device_pixel_ratio } else { 1.0 },
                ..Default::default()
            })),
        }
    }

    /// Change the reported CSS size (what a container resize would do).
    pub fn set_css_size(&self, width: u32, height: u32) {
        self.inner.borrow_mut().css_size = (width, height);
    }

    /// Backing store size in device pixels, as last set by the engine.
    pub fn backing_size(&self) -> (u32, u32) {
        self.inner.borrow().backing_size
    }

    /// Number of frames presented so far.
    pub fn presents(&self) -> u64 {
        self.inner.borrow().presents
    }

    /// Copy of the last presented frame (RGBA8).
    pub fn last_frame(&self) -> Vec<u8> {
        self.inner.borrow().last_frame.clone()
    }
}

impl Surface for MemorySurface {
    fn css_size(&self) -> (u32, u32) {
        self.inner.borrow().css_size
    }

    fn device_pixel_ratio(&self) -> f32 {
        self.inner.borrow().device_pixel_ratio
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.inner.borrow_mut().backing_size = (width, height);
    }

    fn present(&mut self, width: u32, height: u32, rgba: &[u8]) {
        let mut state = self.inner.borrow_mut();
        state.backing_size = (width, height);
        state.last_frame.clear();
        state.last_frame.extend_from_slice(rgba);
        state.presents += 1;
    }
}

#[derive(Debug, Default)]
struct SchedulerState {
    next_id: u64,
    pending: Vec<FrameToken>,
    cancelled: u64,
}

/// Scheduler whose callbacks are fired by hand.
///
/// The host polls [`ManualScheduler::take_pending`] and calls the engine's
/// frame entry point once per returned token.
#[derive(Debug, Clone, Default)]
pub struct ManualScheduler {
    inner: Rc<RefCell<SchedulerState>>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tokens currently waiting to fire.
    pub fn pending(&self) -> Vec<FrameToken> {
        self.inner.borrow().pending.clone()
    }

    /// Drain the pending tokens; the caller is now responsible for firing them.
    pub fn take_pending(&self) -> Vec<FrameToken> {
        std::mem::take(&mut self.inner.borrow_mut().pending)
    }

    /// How many tokens were cancelled over the scheduler's lifetime.
    pub fn cancelled(&self) -> u64 {
        self.inner.borrow().cancelled
    }
}

impl FrameScheduler for ManualScheduler {
    fn request_frame(&mut self) -> FrameToken {
        let mut state = self.inner.borrow_mut();
        state.next_id += 1;
        let token = FrameToken(state.next_id);
        state.pending.push(token);
        token
    }

    fn cancel_frame(&mut self, token: FrameToken) {
        let mut state = self.inner.borrow_mut();
        let before = state.pending.len();
        state.pending.retain(|t| *t != token);
        if state.pending.len() != before {
            state.cancelled += 1;
        } else {
            log::trace!("cancel of unknown frame token {:?}", token);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_scheduler_tracks_and_cancels_tokens() {
        let handle = ManualScheduler::new();
        let mut scheduler: Box<dyn FrameScheduler> = Box::new(handle.clone());
        let a = scheduler.request_frame();
        let b = scheduler.request_frame();
        assert_ne!(a, b);
        assert_eq!(handle.pending(), vec![a, b]);

        scheduler.cancel_frame(a);
        assert_eq!(handle.pending(), vec![b]);
        assert_eq!(handle.cancelled(), 1);

        // Unknown token is a no-op.
        scheduler.cancel_frame(FrameToken(999));
        assert_eq!(handle.cancelled(), 1);

        assert_eq!(handle.take_pending(), vec![b]);
        assert!(handle.pending().is_empty());
    }

    #[test]
    fn memory_surface_records_presents_through_clones() {
        let surface = MemorySurface::new(4, 2, 0.0);
        assert_eq!(surface.device_pixel_ratio(), 1.0);

        let mut boxed: Box<dyn Surface> = Box::new(surface.clone());
        boxed.resize(4, 2);
        boxed.present(4, 2, &[7u8; 32]);

        assert_eq!(surface.presents(), 1);
        assert_eq!(surface.backing_size(), (4, 2));
        assert_eq!(surface.last_frame().len(), 32);
    }
}
