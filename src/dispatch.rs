use std::time::Instant;

use anyhow::Result;

use crate::debug;
use crate::feed::FeedState;
use crate::render::{Region, ViewTree};

/// What a click on a reel asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    ToggleFollow,
    ToggleLike,
    Comment,
    Share,
    Menu,
    Ignore,
}

impl Action {
    /// Follow wins over like; anything outside both is inert.
    pub fn for_region(region: Region) -> Self {
        if region.within(Region::FollowButton) {
            Action::ToggleFollow
        } else if region.within(Region::LikeIcon) {
            Action::ToggleLike
        } else if region.within(Region::CommentGroup) {
            Action::Comment
        } else if region.within(Region::ShareGroup) {
            Action::Share
        } else if region.within(Region::MenuGroup) {
            Action::Menu
        } else {
            Action::Ignore
        }
    }
}

/// Receives follow changes for persistence elsewhere.
pub trait FollowSink {
    fn follow_changed(&mut self, username: &str, followed: bool) -> Result<()>;
}

/// Default sink: follow state stays in memory.
#[derive(Default)]
pub struct InertFollowSink;

impl FollowSink for InertFollowSink {
    fn follow_changed(&mut self, _username: &str, _followed: bool) -> Result<()> {
        Ok(())
    }
}

/// Everything an action handler may touch.
pub struct Interaction<'a> {
    pub state: &'a mut FeedState,
    pub view: &'a mut ViewTree,
    pub follow_sink: &'a mut dyn FollowSink,
    pub now: Instant,
}

type Handler = fn(&mut Interaction<'_>, usize) -> bool;

const HANDLERS: [(Action, Handler); 2] = [
    (Action::ToggleFollow, toggle_follow),
    (Action::ToggleLike, toggle_like),
];

/// Finds the reel and action under a click at `col` on content row `row`.
pub fn resolve(view: &ViewTree, state: &FeedState, col: u16, row: u32) -> Option<(usize, Action)> {
    let node = view.node_at(row)?;
    let index = node.index;
    state.record(index)?;
    let local_row = u16::try_from(row - node.top).ok()?;
    let region = node.hit(col, local_row)?;
    Some((index, Action::for_region(region)))
}

/// Applies one resolved action. Returns whether anything changed.
pub fn apply(ctx: &mut Interaction<'_>, index: usize, action: Action) -> bool {
    HANDLERS
        .iter()
        .find(|(candidate, _)| *candidate == action)
        .map(|(_, handler)| handler(ctx, index))
        .unwrap_or(false)
}

/// Resolve then apply; clicks that miss every reel do nothing.
pub fn click(ctx: &mut Interaction<'_>, col: u16, row: u32) -> bool {
    match resolve(&*ctx.view, &*ctx.state, col, row) {
        Some((index, action)) => apply(ctx, index, action),
        None => false,
    }
}

fn toggle_follow(ctx: &mut Interaction<'_>, index: usize) -> bool {
    let Some(followed) = ctx.state.toggle_follow(index) else {
        return false;
    };
    let Some(record) = ctx.state.record(index) else {
        return false;
    };
    ctx.view.patch_one(index, record);
    if let Err(err) = ctx.follow_sink.follow_changed(&record.username, followed) {
        debug::log(format!("follow sink rejected {}: {err:#}", record.username));
    }
    true
}

fn toggle_like(ctx: &mut Interaction<'_>, index: usize) -> bool {
    let Some(liked) = ctx.state.toggle_like(index) else {
        return false;
    };
    if liked {
        ctx.view.restart_pulse(index, ctx.now);
    }
    let Some(record) = ctx.state.record(index) else {
        return false;
    };
    ctx.view.patch_like(index, record);
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::ReelRecord;
    use crate::render::{render_all, FeedLayout, HeartGlyph};

    #[derive(Default)]
    struct RecordingSink {
        calls: Vec<(String, bool)>,
    }

    impl FollowSink for RecordingSink {
        fn follow_changed(&mut self, username: &str, followed: bool) -> Result<()> {
            self.calls.push((username.to_string(), followed));
            Ok(())
        }
    }

    struct FailingSink;

    impl FollowSink for FailingSink {
        fn follow_changed(&mut self, _username: &str, _followed: bool) -> Result<()> {
            anyhow::bail!("offline")
        }
    }

    const LAYOUT: FeedLayout = FeedLayout {
        width: 60,
        reel_height: 20,
    };

    fn records() -> Vec<ReelRecord> {
        [(10, false), (0, false), (5, true)]
            .into_iter()
            .enumerate()
            .map(|(idx, (like_count, is_liked))| ReelRecord {
                video_source: format!("{idx}.mp4"),
                username: format!("user{idx}"),
                like_count,
                is_liked,
                comment_count: 4,
                share_count: 1,
                ..ReelRecord::default()
            })
            .collect()
    }

    fn setup() -> (FeedState, ViewTree) {
        let records = records();
        let view = render_all(&records, LAYOUT);
        (FeedState::new(records), view)
    }

    fn point(view: &ViewTree, index: usize, region: Region) -> (u16, u32) {
        let node = view.node(index).unwrap();
        let area = node.region(region).unwrap().area;
        (area.x, node.top + u32::from(area.y))
    }

    fn click_at(
        state: &mut FeedState,
        view: &mut ViewTree,
        sink: &mut dyn FollowSink,
        (col, row): (u16, u32),
    ) -> bool {
        let mut ctx = Interaction {
            state,
            view,
            follow_sink: sink,
            now: Instant::now(),
        };
        click(&mut ctx, col, row)
    }

    #[test]
    fn like_click_patches_only_that_reel() {
        let (mut state, mut view) = setup();
        let before = view.clone();
        let target = point(&view, 0, Region::LikeGlyph);

        assert!(click_at(&mut state, &mut view, &mut InertFollowSink, target));

        let counts: Vec<&str> = view.nodes().iter().map(|node| node.like_label()).collect();
        assert_eq!(counts, vec!["11", "0", "5"]);
        let hearts: Vec<HeartGlyph> = view.nodes().iter().map(|node| node.heart).collect();
        assert_eq!(
            hearts,
            vec![HeartGlyph::Filled, HeartGlyph::Outline, HeartGlyph::Filled]
        );
        assert!(view.node(0).unwrap().liked);
        assert_eq!(view.node(1), before.node(1));
        assert_eq!(view.node(2), before.node(2));
    }

    #[test]
    fn like_toggle_round_trip_restarts_pulse_each_like() {
        let (mut state, mut view) = setup();
        let target = point(&view, 1, Region::LikeIcon);

        click_at(&mut state, &mut view, &mut InertFollowSink, target);
        assert_eq!(state.record(1).unwrap().like_count, 1);
        assert_eq!(view.node(1).unwrap().pulse.map(|p| p.epoch), Some(1));

        click_at(&mut state, &mut view, &mut InertFollowSink, target);
        assert_eq!(state.record(1).unwrap().like_count, 0);
        assert!(!state.record(1).unwrap().is_liked);
        assert_eq!(view.node(1).unwrap().heart, HeartGlyph::Outline);
        assert_eq!(view.node(1).unwrap().pulse.map(|p| p.epoch), Some(1));

        click_at(&mut state, &mut view, &mut InertFollowSink, target);
        assert_eq!(view.node(1).unwrap().pulse.map(|p| p.epoch), Some(2));
    }

    #[test]
    fn follow_click_flips_button_and_notifies_sink() {
        let (mut state, mut view) = setup();
        let before = view.clone();
        let target = point(&view, 2, Region::FollowButton);
        let mut sink = RecordingSink::default();

        assert!(click_at(&mut state, &mut view, &mut sink, target));
        assert!(state.record(2).unwrap().is_followed);
        assert_eq!(view.node(2).unwrap().follow_label(), "Unfollow");
        assert_eq!(view.node(2).unwrap().like_label(), "5");
        assert_eq!(view.node(0), before.node(0));
        assert_eq!(view.node(1), before.node(1));

        assert!(click_at(&mut state, &mut view, &mut sink, target));
        assert_eq!(view.node(2).unwrap().follow_label(), "Follow");
        assert_eq!(
            sink.calls,
            vec![("user2".to_string(), true), ("user2".to_string(), false)]
        );
    }

    #[test]
    fn sink_failure_keeps_local_state() {
        let (mut state, mut view) = setup();
        let target = point(&view, 0, Region::FollowButton);
        assert!(click_at(&mut state, &mut view, &mut FailingSink, target));
        assert!(state.record(0).unwrap().is_followed);
    }

    #[test]
    fn share_and_comment_clicks_are_inert() {
        let (mut state, mut view) = setup();
        let state_before = state.clone();
        let view_before = view.clone();
        for region in [
            Region::ShareCount,
            Region::ShareIcon,
            Region::CommentCount,
            Region::MenuIcon,
            Region::LikeCount,
            Region::Caption,
            Region::Video,
        ] {
            let target = point(&view, 1, region);
            assert!(!click_at(&mut state, &mut view, &mut InertFollowSink, target));
        }
        assert_eq!(state, state_before);
        assert_eq!(view, view_before);
    }

    #[test]
    fn clicks_outside_every_reel_are_ignored() {
        let (mut state, mut view) = setup();
        let below = view.content_height() + 3;
        assert!(!click_at(&mut state, &mut view, &mut InertFollowSink, (1, below)));
        assert_eq!(resolve(&view, &state, 1, below), None);
    }

    #[test]
    fn stale_node_for_missing_record_is_ignored() {
        let records = records();
        let view = render_all(&records, LAYOUT);
        let state = FeedState::new(records[..1].to_vec());
        let (col, row) = point(&view, 2, Region::LikeGlyph);
        assert_eq!(resolve(&view, &state, col, row), None);
    }

    #[test]
    fn regions_map_to_actions() {
        assert_eq!(Action::for_region(Region::LikeGlyph), Action::ToggleLike);
        assert_eq!(Action::for_region(Region::LikeIcon), Action::ToggleLike);
        assert_eq!(Action::for_region(Region::LikeCount), Action::Ignore);
        assert_eq!(Action::for_region(Region::FollowButton), Action::ToggleFollow);
        assert_eq!(Action::for_region(Region::Username), Action::Ignore);
        assert_eq!(Action::for_region(Region::ShareCount), Action::Share);
    }
}
