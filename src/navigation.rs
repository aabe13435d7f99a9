use std::time::{Duration, Instant};

use crossterm::event::KeyCode;

use crate::debug;
use crate::feed::FeedState;
use crate::playback::Deck;
use crate::render::ViewTree;
use crate::schedule::ScheduledTask;
use crate::viewport::Viewport;

pub const PLAYBACK_DELAY: Duration = Duration::from_millis(80);
pub const SCROLL_DURATION: Duration = Duration::from_millis(240);

/// Maps navigation keys to a step through the feed.
pub fn key_delta(code: KeyCode) -> Option<isize> {
    match code {
        KeyCode::Down => Some(1),
        KeyCode::Up => Some(-1),
        _ => None,
    }
}

/// Owns the "current reel": centers it and plays it alone.
#[derive(Debug, Clone)]
pub struct Navigator {
    playback_start: ScheduledTask<usize>,
    scroll_duration: Duration,
}

impl Navigator {
    pub fn new(playback_delay: Duration, scroll_duration: Duration) -> Self {
        Self {
            playback_start: ScheduledTask::new(playback_delay),
            scroll_duration,
        }
    }

    /// Deadline of the pending playback start, if any.
    pub fn pending_start(&self) -> Option<Instant> {
        self.playback_start.deadline()
    }

    /// Makes `index` current. Out-of-range indices are ignored.
    ///
    /// Playback starts after the playback delay; activating again before it
    /// elapses replaces the pending start, so an older reel never resumes.
    pub fn activate(
        &mut self,
        index: usize,
        state: &mut FeedState,
        view: &ViewTree,
        viewport: &mut Viewport,
        deck: &mut Deck,
        now: Instant,
    ) -> bool {
        let Some(node) = view.node(index) else {
            return false;
        };
        if !state.set_current(index) {
            return false;
        }
        debug::log(format!("activate reel {index}"));
        viewport.scroll_to_center(node.midpoint(), self.scroll_duration, now);
        deck.pause_all();
        self.playback_start.reschedule(now, index);
        true
    }

    /// Steps the current reel by `delta`; no-op past either end.
    pub fn advance(
        &mut self,
        delta: isize,
        state: &mut FeedState,
        view: &ViewTree,
        viewport: &mut Viewport,
        deck: &mut Deck,
        now: Instant,
    ) -> bool {
        let Some(current) = state.current() else {
            return false;
        };
        let Some(target) = current.checked_add_signed(delta) else {
            return false;
        };
        if target >= state.len() {
            return false;
        }
        self.activate(target, state, view, viewport, deck, now)
    }

    /// Starts the pending playback once its delay has elapsed.
    pub fn poll(&mut self, now: Instant, state: &FeedState, deck: &mut Deck) -> bool {
        let Some(index) = self.playback_start.poll(now) else {
            return false;
        };
        if state.current() != Some(index) {
            return false;
        }
        let Some(record) = state.record(index) else {
            return false;
        };
        deck.play(index, &record.video_source);
        true
    }
}
