//! Renderer seam
//!
//! The reconciler never hands out closures over the model. Each handle is
//! created from a value [`EntityBinding`] and positioned once per frame.

use roadplay_core::LaneId;
use roadplay_state::EntityBinding;
use tracing::trace;

/// Where to draw one entity this frame
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Placement {
    /// `scale * position + frame_offset`, in viewport units
    pub x: f64,
    pub lane: Option<LaneId>,
}

/// Drawing surface driven by the reconciler. Calls are infallible.
pub trait Renderer {
    type Handle;

    fn create_handle(&mut self, binding: EntityBinding) -> Self::Handle;

    fn destroy_handle(&mut self, handle: Self::Handle);

    fn place(&mut self, handle: &Self::Handle, placement: Placement);

    fn scroll_by(&mut self, delta: f64);
}

/// Headless renderer that only traces what it would draw
#[derive(Debug, Default)]
pub struct LogRenderer {
    live: usize,
    scroll: f64,
}

impl LogRenderer {
    pub fn new() -> Self {
        LogRenderer::default()
    }

    /// Handles created and not yet destroyed
    pub fn live_handles(&self) -> usize {
        self.live
    }

    /// Accumulated background scroll
    pub fn scroll(&self) -> f64 {
        self.scroll
    }
}

impl Renderer for LogRenderer {
    type Handle = EntityBinding;

    fn create_handle(&mut self, binding: EntityBinding) -> EntityBinding {
        self.live += 1;
        trace!(entity = %binding.entity, "create handle");
        binding
    }

    fn destroy_handle(&mut self, handle: EntityBinding) {
        self.live = self.live.saturating_sub(1);
        trace!(entity = %handle.entity, "destroy handle");
    }

    fn place(&mut self, handle: &EntityBinding, placement: Placement) {
        trace!(entity = %handle.entity, x = placement.x, lane = ?placement.lane, "place");
    }

    fn scroll_by(&mut self, delta: f64) {
        self.scroll += delta;
    }
}
