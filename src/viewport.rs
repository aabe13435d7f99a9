use std::time::{Duration, Instant};

use crate::feed::FeedState;
use crate::render::{ReelNode, ViewTree};
use crate::schedule::ScheduledTask;

pub const SETTLE_DELAY: Duration = Duration::from_millis(120);

#[derive(Debug, Clone, Copy, PartialEq)]
struct ScrollAnimation {
    from: f64,
    to: f64,
    started: Instant,
    duration: Duration,
}

impl ScrollAnimation {
    fn offset_at(&self, now: Instant) -> (f64, bool) {
        let elapsed = now.saturating_duration_since(self.started);
        if self.duration.is_zero() || elapsed >= self.duration {
            return (self.to, true);
        }
        let t = elapsed.as_secs_f64() / self.duration.as_secs_f64();
        let eased = 1.0 - (1.0 - t).powi(3);
        (self.from + (self.to - self.from) * eased, false)
    }
}

/// Scroll position of the feed container, in content rows.
#[derive(Debug, Clone, PartialEq)]
pub struct Viewport {
    offset: f64,
    height: u16,
    content_height: u32,
    animation: Option<ScrollAnimation>,
}

impl Viewport {
    pub fn new(height: u16, content_height: u32) -> Self {
        Self {
            offset: 0.0,
            height,
            content_height,
            animation: None,
        }
    }

    pub fn offset(&self) -> f64 {
        self.offset
    }

    /// Content row drawn on the first screen line of the feed.
    pub fn first_row(&self) -> u32 {
        self.offset.round().max(0.0) as u32
    }

    pub fn height(&self) -> u16 {
        self.height
    }

    pub fn center(&self) -> f64 {
        self.offset + f64::from(self.height) / 2.0
    }

    pub fn max_offset(&self) -> f64 {
        f64::from(self.content_height.saturating_sub(u32::from(self.height)))
    }

    pub fn is_animating(&self) -> bool {
        self.animation.is_some()
    }

    pub fn resize(&mut self, height: u16, content_height: u32) {
        self.height = height;
        self.content_height = content_height;
        self.animation = None;
        self.offset = self.clamp(self.offset);
    }

    fn clamp(&self, offset: f64) -> f64 {
        offset.clamp(0.0, self.max_offset())
    }

    /// Starts a smooth scroll that puts `midpoint` in the middle of the view.
    pub fn scroll_to_center(&mut self, midpoint: f64, duration: Duration, now: Instant) {
        let target = self.clamp(midpoint - f64::from(self.height) / 2.0);
        self.animation = Some(ScrollAnimation {
            from: self.offset,
            to: target,
            started: now,
            duration,
        });
    }

    /// Moves the view immediately; returns whether the offset changed.
    pub fn jump_to_center(&mut self, midpoint: f64) -> bool {
        self.animation = None;
        self.set_offset(midpoint - f64::from(self.height) / 2.0)
    }

    /// User scroll. Cancels any programmatic scroll in flight.
    pub fn scroll_by(&mut self, rows: f64) -> bool {
        self.animation = None;
        self.set_offset(self.offset + rows)
    }

    fn set_offset(&mut self, offset: f64) -> bool {
        let next = self.clamp(offset);
        let changed = (next - self.offset).abs() > f64::EPSILON;
        self.offset = next;
        changed
    }

    /// Advances the smooth scroll; true when the offset moved.
    pub fn tick(&mut self, now: Instant) -> bool {
        let Some(animation) = self.animation else {
            return false;
        };
        let (offset, done) = animation.offset_at(now);
        if done {
            self.animation = None;
        }
        self.set_offset(offset)
    }
}

/// Reconciles the current reel with whatever the user scrolled to.
#[derive(Debug, Clone)]
pub struct Synchronizer {
    settle: ScheduledTask<()>,
    recomputations: u64,
}

impl Synchronizer {
    pub fn new(settle_delay: Duration) -> Self {
        Self {
            settle: ScheduledTask::new(settle_delay),
            recomputations: 0,
        }
    }

    /// Records a scroll signal, pushing the settle point back.
    pub fn signal(&mut self, now: Instant) {
        self.settle.reschedule(now, ());
    }

    pub fn is_pending(&self) -> bool {
        self.settle.is_pending()
    }

    pub fn recomputations(&self) -> u64 {
        self.recomputations
    }

    /// Returns the reel to activate once scrolling has settled on a reel
    /// other than the current one.
    pub fn poll(
        &mut self,
        now: Instant,
        state: &FeedState,
        view: &ViewTree,
        viewport: &Viewport,
    ) -> Option<usize> {
        self.settle.poll(now)?;
        self.recomputations += 1;
        let selected = closest_to_center(view.nodes(), viewport.center(), state.current())?;
        (Some(selected) != state.current()).then_some(selected)
    }
}

/// Node whose midpoint is nearest `center`; the earliest node wins ties.
pub fn closest_to_center(nodes: &[ReelNode], center: f64, current: Option<usize>) -> Option<usize> {
    let mut closest = current;
    let mut closest_distance = f64::INFINITY;
    for node in nodes {
        let distance = (node.midpoint() - center).abs();
        if distance < closest_distance {
            closest_distance = distance;
            closest = Some(node.index);
        }
    }
    closest
}
