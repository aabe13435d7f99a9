use std::time::{Duration, Instant};

use ratatui::layout::Rect;
use textwrap::Options as WrapOptions;
use unicode_width::UnicodeWidthStr;

use crate::feed::{InitError, ReelRecord};

pub const RAIL_WIDTH: u16 = 12;
pub const BOTTOM_HEIGHT: u16 = 4;
pub const PULSE_DURATION: Duration = Duration::from_millis(320);
const FOLLOW_BUTTON_WIDTH: u16 = 10;
const USERNAME_MAX_WIDTH: u16 = 24;

pub const FOLLOW_LABEL: &str = "Follow";
pub const UNFOLLOW_LABEL: &str = "Unfollow";

/// Queryable parts of a reel node. Regions nest the way the markup does, so
/// a hit on a glyph also counts as a hit on its icon and group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Region {
    Video,
    Bottom,
    User,
    Avatar,
    Username,
    FollowButton,
    Caption,
    Rail,
    LikeGroup,
    LikeIcon,
    LikeGlyph,
    LikeCount,
    CommentGroup,
    CommentIcon,
    CommentCount,
    ShareGroup,
    ShareIcon,
    ShareCount,
    MenuGroup,
    MenuIcon,
}

impl Region {
    pub fn parent(self) -> Option<Region> {
        match self {
            Region::Video | Region::Bottom | Region::Rail => None,
            Region::User | Region::Caption => Some(Region::Bottom),
            Region::Avatar | Region::Username | Region::FollowButton => Some(Region::User),
            Region::LikeGroup | Region::CommentGroup | Region::ShareGroup | Region::MenuGroup => {
                Some(Region::Rail)
            }
            Region::LikeIcon | Region::LikeCount => Some(Region::LikeGroup),
            Region::LikeGlyph => Some(Region::LikeIcon),
            Region::CommentIcon | Region::CommentCount => Some(Region::CommentGroup),
            Region::ShareIcon | Region::ShareCount => Some(Region::ShareGroup),
            Region::MenuIcon => Some(Region::MenuGroup),
        }
    }

    /// The region itself followed by its enclosing regions, innermost first.
    pub fn ancestry(self) -> impl Iterator<Item = Region> {
        std::iter::successors(Some(self), |region| region.parent())
    }

    /// Equivalent of `closest()`: true when `self` is `other` or sits inside it.
    pub fn within(self, other: Region) -> bool {
        self.ancestry().any(|region| region == other)
    }

    fn depth(self) -> usize {
        self.ancestry().count()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeartGlyph {
    Outline,
    Filled,
}

impl HeartGlyph {
    pub fn for_liked(liked: bool) -> Self {
        if liked {
            HeartGlyph::Filled
        } else {
            HeartGlyph::Outline
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            HeartGlyph::Outline => "♡",
            HeartGlyph::Filled => "♥",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionView {
    pub region: Region,
    /// Position relative to the top-left corner of the owning node.
    pub area: Rect,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pulse {
    pub epoch: u64,
    pub started: Instant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReelNode {
    pub index: usize,
    /// First content row of the node; nodes are stacked without gaps.
    pub top: u32,
    pub width: u16,
    pub height: u16,
    pub video_source: String,
    pub heart: HeartGlyph,
    pub liked: bool,
    pub pulse: Option<Pulse>,
    regions: Vec<RegionView>,
}

impl ReelNode {
    pub fn region(&self, region: Region) -> Option<&RegionView> {
        self.regions.iter().find(|view| view.region == region)
    }

    pub fn regions(&self) -> &[RegionView] {
        &self.regions
    }

    pub fn text(&self, region: Region) -> Option<&str> {
        self.region(region).map(|view| view.text.as_str())
    }

    pub fn follow_label(&self) -> &str {
        self.text(Region::FollowButton).unwrap_or_default()
    }

    pub fn like_label(&self) -> &str {
        self.text(Region::LikeCount).unwrap_or_default()
    }

    pub fn bottom(&self) -> u32 {
        self.top + u32::from(self.height)
    }

    pub fn midpoint(&self) -> f64 {
        f64::from(self.top) + f64::from(self.height) / 2.0
    }

    pub fn pulse_active(&self, now: Instant) -> bool {
        self.pulse
            .map(|pulse| now.saturating_duration_since(pulse.started) < PULSE_DURATION)
            .unwrap_or(false)
    }

    /// Innermost region under a node-relative point.
    pub fn hit(&self, x: u16, y: u16) -> Option<Region> {
        self.regions
            .iter()
            .filter(|view| contains(view.area, x, y))
            .max_by_key(|view| view.region.depth())
            .map(|view| view.region)
    }

    fn set_text(&mut self, region: Region, text: String) {
        if let Some(view) = self.regions.iter_mut().find(|view| view.region == region) {
            view.text = text;
        }
    }

    fn apply_like(&mut self, record: &ReelRecord) {
        self.heart = HeartGlyph::for_liked(record.is_liked);
        self.liked = record.is_liked;
        self.set_text(Region::LikeGlyph, self.heart.symbol().to_string());
        self.set_text(Region::LikeCount, record.like_count.to_string());
    }

    fn apply_follow(&mut self, record: &ReelRecord) {
        self.set_text(Region::FollowButton, follow_label(record.is_followed).to_string());
    }
}

fn contains(area: Rect, x: u16, y: u16) -> bool {
    x >= area.x
        && y >= area.y
        && u32::from(x) < u32::from(area.x) + u32::from(area.width)
        && u32::from(y) < u32::from(area.y) + u32::from(area.height)
}

pub fn follow_label(followed: bool) -> &'static str {
    if followed {
        UNFOLLOW_LABEL
    } else {
        FOLLOW_LABEL
    }
}

/// Geometry shared by every node: each reel fills exactly one viewport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedLayout {
    pub width: u16,
    pub reel_height: u16,
}

impl FeedLayout {
    /// Fails when the feed has nowhere to draw.
    pub fn mount(area: Option<Rect>) -> Result<Self, InitError> {
        match area {
            Some(area) if area.width > 0 && area.height > 0 => Ok(Self {
                width: area.width,
                reel_height: area.height,
            }),
            _ => Err(InitError::MissingMount),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewTree {
    layout: FeedLayout,
    nodes: Vec<ReelNode>,
}

impl ViewTree {
    pub fn layout(&self) -> FeedLayout {
        self.layout
    }

    pub fn nodes(&self) -> &[ReelNode] {
        &self.nodes
    }

    pub fn node(&self, index: usize) -> Option<&ReelNode> {
        self.nodes.get(index)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn content_height(&self) -> u32 {
        self.nodes.last().map(ReelNode::bottom).unwrap_or(0)
    }

    /// Node covering an absolute content row.
    pub fn node_at(&self, row: u32) -> Option<&ReelNode> {
        self.nodes
            .iter()
            .find(|node| row >= node.top && row < node.bottom())
    }

    /// Re-derives the like and follow parts of one node from its record.
    pub fn patch_one(&mut self, index: usize, record: &ReelRecord) {
        if let Some(node) = self.nodes.get_mut(index) {
            node.apply_like(record);
            node.apply_follow(record);
        }
    }

    /// Like [`ViewTree::patch_one`] but limited to the like region.
    pub fn patch_like(&mut self, index: usize, record: &ReelRecord) {
        if let Some(node) = self.nodes.get_mut(index) {
            node.apply_like(record);
        }
    }

    /// Starts the like pulse over, even if one is still running.
    pub fn restart_pulse(&mut self, index: usize, now: Instant) {
        if let Some(node) = self.nodes.get_mut(index) {
            let epoch = node.pulse.map(|pulse| pulse.epoch + 1).unwrap_or(1);
            node.pulse = Some(Pulse {
                epoch,
                started: now,
            });
        }
    }
}

pub fn render_all(records: &[ReelRecord], layout: FeedLayout) -> ViewTree {
    let nodes = records
        .iter()
        .enumerate()
        .map(|(index, record)| render_node(index, record, layout))
        .collect();
    ViewTree { layout, nodes }
}

fn render_node(index: usize, record: &ReelRecord, layout: FeedLayout) -> ReelNode {
    let width = layout.width;
    let height = layout.reel_height;
    let top = u32::try_from(index)
        .unwrap_or(u32::MAX)
        .saturating_mul(u32::from(height));
    let video_width = width.saturating_sub(RAIL_WIDTH);
    let rail_width = width - video_width;
    let bottom_y = height.saturating_sub(BOTTOM_HEIGHT);
    let inner_width = video_width.saturating_sub(2);

    let mut regions = Vec::with_capacity(20);
    let mut push = |region, area, text: String| {
        regions.push(RegionView { region, area, text });
    };

    push(Region::Video, Rect::new(0, 0, video_width, bottom_y), record.video_source.clone());

    push(
        Region::Bottom,
        Rect::new(0, bottom_y, video_width, BOTTOM_HEIGHT.min(height)),
        String::new(),
    );
    let user_y = bottom_y.saturating_add(1).min(height.saturating_sub(1));
    push(Region::User, Rect::new(1, user_y, inner_width, 1), String::new());
    push(Region::Avatar, Rect::new(1, user_y, 2, 1), "◉".to_string());
    let username = format!("@{}", record.username);
    let username_width = (username.width() as u16).min(USERNAME_MAX_WIDTH);
    push(
        Region::Username,
        Rect::new(4, user_y, username_width, 1),
        username,
    );
    push(
        Region::FollowButton,
        Rect::new(4 + username_width + 1, user_y, FOLLOW_BUTTON_WIDTH, 1),
        follow_label(record.is_followed).to_string(),
    );
    let caption_y = user_y.saturating_add(1).min(height.saturating_sub(1));
    push(
        Region::Caption,
        Rect::new(1, caption_y, inner_width, 1),
        caption_line(&record.caption, inner_width),
    );

    push(Region::Rail, Rect::new(video_width, 0, rail_width, height), String::new());
    let heart = HeartGlyph::for_liked(record.is_liked);
    let groups = [
        (
            Region::LikeGroup,
            Region::LikeIcon,
            Some(Region::LikeCount),
            heart.symbol(),
            record.like_count.to_string(),
        ),
        (
            Region::CommentGroup,
            Region::CommentIcon,
            Some(Region::CommentCount),
            "✉",
            record.comment_count.to_string(),
        ),
        (
            Region::ShareGroup,
            Region::ShareIcon,
            Some(Region::ShareCount),
            "➦",
            record.share_count.to_string(),
        ),
        (Region::MenuGroup, Region::MenuIcon, None, "⋮", String::new()),
    ];
    let rail_top = height.saturating_sub(3 * groups.len() as u16);
    for (slot, (group, icon, count, symbol, label)) in groups.into_iter().enumerate() {
        let y = rail_top.saturating_add(3 * slot as u16);
        push(group, Rect::new(video_width, y, rail_width, 2), String::new());
        if icon == Region::LikeIcon {
            push(icon, Rect::new(video_width, y, rail_width, 1), String::new());
            push(
                Region::LikeGlyph,
                Rect::new(video_width + rail_width / 2, y, 1, 1),
                symbol.to_string(),
            );
        } else {
            push(icon, Rect::new(video_width, y, rail_width, 1), symbol.to_string());
        }
        if let Some(count) = count {
            push(count, Rect::new(video_width, y.saturating_add(1), rail_width, 1), label);
        }
    }

    ReelNode {
        index,
        top,
        width,
        height,
        video_source: record.video_source.clone(),
        heart,
        liked: record.is_liked,
        pulse: None,
        regions,
    }
}

fn caption_line(caption: &str, width: u16) -> String {
    let width = usize::from(width.max(1));
    let lines = textwrap::wrap(caption, WrapOptions::new(width));
    match lines.as_slice() {
        [] => String::new(),
        [only] => only.to_string(),
        [first, ..] => {
            let mut line = first.to_string();
            while line.width() + 1 > width && line.pop().is_some() {}
            line.push('…');
            line
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout() -> FeedLayout {
        FeedLayout {
            width: 60,
            reel_height: 20,
        }
    }

    fn records() -> Vec<ReelRecord> {
        vec![
            ReelRecord {
                video_source: "a.mp4".into(),
                username: "alice".into(),
                caption: "sunrise".into(),
                like_count: 10,
                ..ReelRecord::default()
            },
            ReelRecord {
                video_source: "b.mp4".into(),
                username: "bob".into(),
                is_liked: true,
                is_followed: true,
                like_count: 3,
                comment_count: 9,
                share_count: 2,
                ..ReelRecord::default()
            },
        ]
    }

    #[test]
    fn renders_one_node_per_record_in_order() {
        let tree = render_all(&records(), layout());
        assert_eq!(tree.len(), 2);
        assert_eq!(tree.node(0).unwrap().index, 0);
        assert_eq!(tree.node(1).unwrap().top, 20);
        assert_eq!(tree.content_height(), 40);
        assert_eq!(tree.node_at(25).map(|node| node.index), Some(1));
        assert!(tree.node_at(40).is_none());
    }

    #[test]
    fn node_labels_echo_record() {
        let tree = render_all(&records(), layout());
        let first = tree.node(0).unwrap();
        assert_eq!(first.heart, HeartGlyph::Outline);
        assert!(!first.liked);
        assert_eq!(first.follow_label(), "Follow");
        assert_eq!(first.like_label(), "10");

        let second = tree.node(1).unwrap();
        assert_eq!(second.heart, HeartGlyph::Filled);
        assert!(second.liked);
        assert_eq!(second.follow_label(), "Unfollow");
        assert_eq!(second.text(Region::CommentCount), Some("9"));
        assert_eq!(second.text(Region::ShareCount), Some("2"));
        assert_eq!(second.text(Region::Username), Some("@bob"));
    }

    #[test]
    fn patch_one_touches_only_target_node() {
        let mut records = records();
        let mut tree = render_all(&records, layout());
        let untouched = tree.node(1).cloned();

        records[0].is_liked = true;
        records[0].like_count = 11;
        records[0].is_followed = true;
        tree.patch_one(0, &records[0]);
        let patched = tree.clone();
        tree.patch_one(0, &records[0]);

        assert_eq!(tree, patched);
        let node = tree.node(0).unwrap();
        assert_eq!(node.heart, HeartGlyph::Filled);
        assert_eq!(node.like_label(), "11");
        assert_eq!(node.follow_label(), "Unfollow");
        assert_eq!(tree.node(1).cloned(), untouched);
    }

    #[test]
    fn hit_prefers_innermost_region() {
        let tree = render_all(&records(), layout());
        let node = tree.node(0).unwrap();
        let glyph = node.region(Region::LikeGlyph).unwrap().area;
        let hit = node.hit(glyph.x, glyph.y).unwrap();
        assert_eq!(hit, Region::LikeGlyph);
        assert!(hit.within(Region::LikeIcon));
        assert!(hit.within(Region::Rail));
        assert!(!hit.within(Region::FollowButton));

        let count = node.region(Region::LikeCount).unwrap().area;
        assert_eq!(node.hit(count.x, count.y), Some(Region::LikeCount));
        assert_eq!(node.hit(2, 2), Some(Region::Video));
    }

    #[test]
    fn restart_pulse_bumps_epoch() {
        let now = Instant::now();
        let mut tree = render_all(&records(), layout());
        tree.restart_pulse(1, now);
        tree.restart_pulse(1, now);
        let node = tree.node(1).unwrap();
        assert_eq!(node.pulse.map(|pulse| pulse.epoch), Some(2));
        assert!(node.pulse_active(now));
        assert!(!node.pulse_active(now + PULSE_DURATION));
    }

    #[test]
    fn mount_requires_area() {
        assert!(matches!(FeedLayout::mount(None), Err(InitError::MissingMount)));
        assert!(matches!(
            FeedLayout::mount(Some(Rect::new(0, 1, 80, 0))),
            Err(InitError::MissingMount)
        ));
        let layout = FeedLayout::mount(Some(Rect::new(0, 1, 80, 23))).unwrap();
        assert_eq!(layout.reel_height, 23);
    }

    #[test]
    fn long_captions_are_cut_with_ellipsis() {
        let line = caption_line("one two three four five six", 10);
        assert!(line.ends_with('…'));
        assert!(line.width() <= 10);
    }
}
