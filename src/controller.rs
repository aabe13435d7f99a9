use std::time::{Duration, Instant};

use crossterm::event::KeyCode;
use ratatui::layout::Rect;

use crate::debug;
use crate::dispatch::{self, FollowSink, Interaction};
use crate::feed::{FeedState, InitError, ReelRecord};
use crate::navigation::{self, Navigator};
use crate::playback::{Deck, VideoBackend};
use crate::render::{self, FeedLayout, ViewTree};
use crate::viewport::{self, Synchronizer, Viewport};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    pub settle_delay: Duration,
    pub playback_delay: Duration,
    pub scroll_duration: Duration,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            settle_delay: viewport::SETTLE_DELAY,
            playback_delay: navigation::PLAYBACK_DELAY,
            scroll_duration: navigation::SCROLL_DURATION,
        }
    }
}

pub struct MountOptions {
    pub records: Vec<ReelRecord>,
    /// Screen area reserved for the feed; `None` when the layout has none.
    pub area: Option<Rect>,
    pub timing: Timing,
    pub backend: Box<dyn VideoBackend>,
    pub follow_sink: Box<dyn FollowSink>,
}

/// The mounted feed: state, its rendered projection and the components that
/// keep the two in step.
pub struct Controller {
    area: Rect,
    state: FeedState,
    view: ViewTree,
    viewport: Viewport,
    deck: Deck,
    navigator: Navigator,
    sync: Synchronizer,
    follow_sink: Box<dyn FollowSink>,
    /// A like pulse was live at the last tick; its lapse needs one redraw.
    pulsing: bool,
}

impl Controller {
    /// Renders the feed into `area` and starts the first reel.
    pub fn mount(opts: MountOptions, now: Instant) -> Result<Self, InitError> {
        let layout = FeedLayout::mount(opts.area)?;
        let area = opts.area.ok_or(InitError::MissingMount)?;
        let view = render::render_all(&opts.records, layout);
        let viewport = Viewport::new(area.height, view.content_height());
        let deck = Deck::new(opts.records.len(), opts.backend);
        let mut controller = Self {
            area,
            state: FeedState::new(opts.records),
            view,
            viewport,
            deck,
            navigator: Navigator::new(opts.timing.playback_delay, opts.timing.scroll_duration),
            sync: Synchronizer::new(opts.timing.settle_delay),
            follow_sink: opts.follow_sink,
            pulsing: false,
        };
        debug::log(format!(
            "mounted {} reels into {}x{}",
            controller.state.len(),
            area.width,
            area.height
        ));
        if !controller.state.is_empty() {
            controller.activate(0, now);
        }
        Ok(controller)
    }

    pub fn area(&self) -> Rect {
        self.area
    }

    pub fn state(&self) -> &FeedState {
        &self.state
    }

    pub fn view(&self) -> &ViewTree {
        &self.view
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn deck(&self) -> &Deck {
        &self.deck
    }

    pub fn activate(&mut self, index: usize, now: Instant) -> bool {
        self.navigator.activate(
            index,
            &mut self.state,
            &self.view,
            &mut self.viewport,
            &mut self.deck,
            now,
        )
    }

    pub fn on_key(&mut self, code: KeyCode, now: Instant) -> bool {
        let Some(delta) = navigation::key_delta(code) else {
            return false;
        };
        self.navigator.advance(
            delta,
            &mut self.state,
            &self.view,
            &mut self.viewport,
            &mut self.deck,
            now,
        )
    }

    /// Handles a click at absolute screen coordinates.
    pub fn on_click(&mut self, column: u16, row: u16, now: Instant) -> bool {
        if !contains(self.area, column, row) {
            return false;
        }
        let col = column - self.area.x;
        let content_row = self.viewport.first_row() + u32::from(row - self.area.y);
        let mut ctx = Interaction {
            state: &mut self.state,
            view: &mut self.view,
            follow_sink: self.follow_sink.as_mut(),
            now,
        };
        let changed = dispatch::click(&mut ctx, col, content_row);
        if changed && self.any_pulse(now) {
            self.pulsing = true;
        }
        changed
    }

    /// Handles a wheel scroll over the feed.
    pub fn on_wheel(&mut self, column: u16, row: u16, rows: f64, now: Instant) -> bool {
        if !contains(self.area, column, row) {
            return false;
        }
        let moved = self.viewport.scroll_by(rows);
        if moved {
            self.sync.signal(now);
        }
        moved
    }

    /// Lays the feed out again for a new area and recenters the current reel
    /// without restarting it.
    pub fn on_resize(&mut self, area: Rect) -> Result<(), InitError> {
        let layout = FeedLayout::mount(Some(area))?;
        self.area = area;
        self.view = render::render_all(self.state.records(), layout);
        self.viewport.resize(area.height, self.view.content_height());
        if let Some(node) = self.state.current().and_then(|index| self.view.node(index)) {
            self.viewport.jump_to_center(node.midpoint());
        }
        Ok(())
    }

    /// Runs due timers and animations. Returns true when a redraw is needed.
    pub fn tick(&mut self, now: Instant) -> bool {
        let mut dirty = false;
        if self.viewport.tick(now) {
            self.sync.signal(now);
            dirty = true;
        }
        if self.navigator.poll(now, &self.state, &mut self.deck) {
            dirty = true;
        }
        if let Some(index) = self
            .sync
            .poll(now, &self.state, &self.view, &self.viewport)
        {
            debug::log(format!("scroll settled on reel {index}"));
            dirty |= self.activate(index, now);
        }
        let pulsing = self.any_pulse(now);
        let lapsed = self.pulsing && !pulsing;
        self.pulsing = pulsing;
        dirty || pulsing || lapsed
    }

    /// Whether any timer, animation or like pulse still needs ticks.
    pub fn is_busy(&self) -> bool {
        self.viewport.is_animating()
            || self.sync.is_pending()
            || self.navigator.pending_start().is_some()
            || self.pulsing
    }

    fn any_pulse(&self, now: Instant) -> bool {
        self.view.nodes().iter().any(|node| node.pulse_active(now))
    }
}

fn contains(area: Rect, column: u16, row: u16) -> bool {
    column >= area.x
        && row >= area.y
        && u32::from(column) < u32::from(area.x) + u32::from(area.width)
        && u32::from(row) < u32::from(area.y) + u32::from(area.height)
}
