use std::io::{self, Stdout};
use std::time::{Duration, Instant};

use anyhow::Result;
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind, MouseButton,
    MouseEvent, MouseEventKind,
};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::backend::{Backend, CrosstermBackend};
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};
use ratatui::{Frame, Terminal};

use crate::controller::{Controller, MountOptions, Timing};
use crate::dispatch::FollowSink;
use crate::feed::{InitError, ReelRecord};
use crate::playback::{PlayState, VideoBackend};
use crate::render::{ReelNode, Region, RegionView};

const COLOR_BG: Color = Color::Rgb(30, 30, 46);
const COLOR_PANEL_BG: Color = Color::Rgb(24, 24, 36);
const COLOR_PANEL_FOCUSED_BG: Color = Color::Rgb(49, 50, 68);
const COLOR_BORDER_IDLE: Color = Color::Rgb(49, 50, 68);
const COLOR_BORDER_FOCUSED: Color = Color::Rgb(137, 180, 250);
const COLOR_TEXT_PRIMARY: Color = Color::Rgb(205, 214, 244);
const COLOR_TEXT_SECONDARY: Color = Color::Rgb(166, 173, 200);
const COLOR_ACCENT: Color = Color::Rgb(137, 180, 250);
const COLOR_SUCCESS: Color = Color::Rgb(166, 227, 161);
const COLOR_ERROR: Color = Color::Rgb(243, 139, 168);

const IDLE_TICK: Duration = Duration::from_millis(120);
const BUSY_TICK: Duration = Duration::from_millis(16);

pub struct Options {
    pub records: Result<Vec<ReelRecord>, InitError>,
    pub timing: Timing,
    pub backend: Box<dyn VideoBackend>,
    pub follow_sink: Box<dyn FollowSink>,
    pub wheel_step: u16,
}

/// Splits the screen into status line, feed container and footer.
fn screen_layout(full: Rect) -> [Rect; 3] {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(full);
    [chunks[0], chunks[1], chunks[2]]
}

fn feed_area(full: Rect) -> Option<Rect> {
    let area = screen_layout(full)[1];
    (area.width > 0 && area.height > 0).then_some(area)
}

pub struct Model {
    feed: Option<Controller>,
    status_message: String,
    init_error: Option<String>,
    /// Resize fault shown ahead of the reel summary until a resize succeeds.
    notice: Option<String>,
    wheel_step: f64,
    needs_redraw: bool,
    clock: Instant,
}

impl Model {
    /// Mounts the feed into the screen. An initialization fault is reported
    /// once in the status line and leaves the feed empty.
    pub fn new(opts: Options, screen: Rect, now: Instant) -> Self {
        let wheel_step = f64::from(opts.wheel_step.max(1));
        let mounted = opts.records.and_then(|records| {
            Controller::mount(
                MountOptions {
                    records,
                    area: feed_area(screen),
                    timing: opts.timing,
                    backend: opts.backend,
                    follow_sink: opts.follow_sink,
                },
                now,
            )
        });
        match mounted {
            Ok(controller) => {
                let status_message = if controller.state().is_empty() {
                    "The feed is empty.".to_string()
                } else {
                    format!("Loaded {} reels.", controller.state().len())
                };
                Self {
                    feed: Some(controller),
                    status_message,
                    init_error: None,
                    notice: None,
                    wheel_step,
                    needs_redraw: true,
                    clock: now,
                }
            }
            Err(err) => {
                crate::debug::log(format!("feed initialization failed: {err}"));
                Self {
                    feed: None,
                    status_message: "Feed unavailable.".to_string(),
                    init_error: Some(err.to_string()),
                    notice: None,
                    wheel_step,
                    needs_redraw: true,
                    clock: now,
                }
            }
        }
    }

    pub fn controller(&self) -> Option<&Controller> {
        self.feed.as_ref()
    }

    pub fn init_error(&self) -> Option<&str> {
        self.init_error.as_deref()
    }

    fn mark_dirty(&mut self) {
        self.needs_redraw = true;
    }

    /// Returns true when the app should quit.
    pub fn handle_key(&mut self, code: KeyCode, now: Instant) -> bool {
        match code {
            KeyCode::Char('q') | KeyCode::Esc => return true,
            _ => {}
        }
        self.clock = now;
        if let Some(feed) = self.feed.as_mut() {
            if feed.on_key(code, now) {
                self.mark_dirty();
            }
        }
        false
    }

    pub fn handle_mouse(&mut self, event: MouseEvent, now: Instant) {
        self.clock = now;
        let Some(feed) = self.feed.as_mut() else {
            return;
        };
        let changed = match event.kind {
            MouseEventKind::Down(MouseButton::Left) => feed.on_click(event.column, event.row, now),
            MouseEventKind::ScrollDown => {
                feed.on_wheel(event.column, event.row, self.wheel_step, now)
            }
            MouseEventKind::ScrollUp => {
                feed.on_wheel(event.column, event.row, -self.wheel_step, now)
            }
            _ => false,
        };
        if changed {
            self.mark_dirty();
        }
    }

    pub fn handle_resize(&mut self, width: u16, height: u16) {
        let screen = Rect::new(0, 0, width, height);
        if let Some(feed) = self.feed.as_mut() {
            let result = match feed_area(screen) {
                Some(area) => feed.on_resize(area),
                None => Err(InitError::MissingMount),
            };
            self.notice = result.err().map(|err| format!("Error: {err}"));
        }
        self.mark_dirty();
    }

    pub fn tick(&mut self, now: Instant) {
        self.clock = now;
        if let Some(feed) = self.feed.as_mut() {
            if feed.tick(now) {
                self.mark_dirty();
            }
        }
    }

    fn tick_rate(&self) -> Duration {
        match &self.feed {
            Some(feed) if feed.is_busy() => BUSY_TICK,
            _ => IDLE_TICK,
        }
    }

    pub fn run(&mut self) -> Result<()> {
        let mut stdout = io::stdout();
        enable_raw_mode()?;
        stdout.execute(EnterAlternateScreen)?;
        stdout.execute(EnableMouseCapture)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;
        terminal.clear()?;

        let result = self.event_loop(&mut terminal);

        disable_raw_mode()?;
        terminal.backend_mut().execute(DisableMouseCapture)?;
        terminal.backend_mut().execute(LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        result
    }

    fn event_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
        loop {
            self.tick(Instant::now());

            if self.needs_redraw {
                self.draw_to(terminal)?;
            }

            if event::poll(self.tick_rate())? {
                let now = Instant::now();
                match event::read()? {
                    Event::Key(key) if key.kind == KeyEventKind::Press => {
                        if self.handle_key(key.code, now) {
                            break;
                        }
                    }
                    Event::Mouse(mouse) => self.handle_mouse(mouse, now),
                    Event::Resize(width, height) => self.handle_resize(width, height),
                    _ => {}
                }
            }
        }

        Ok(())
    }

    pub fn draw_to<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<()> {
        let now = self.clock;
        terminal.draw(|frame| self.draw(frame, now))?;
        self.needs_redraw = false;
        Ok(())
    }

    fn draw(&self, frame: &mut Frame<'_>, now: Instant) {
        let full = frame.size();
        frame.render_widget(Block::default().style(Style::default().bg(COLOR_BG)), full);
        let [status_area, feed_rect, footer_area] = screen_layout(full);

        let status_line = Paragraph::new(self.status_text()).style(
            Style::default()
                .fg(COLOR_TEXT_PRIMARY)
                .bg(COLOR_PANEL_FOCUSED_BG)
                .add_modifier(Modifier::BOLD),
        );
        frame.render_widget(status_line, status_area);

        match &self.feed {
            Some(feed) => draw_feed(frame, feed, feed_rect, now),
            None => {
                let message = self.init_error.as_deref().unwrap_or("Feed unavailable.");
                let body = Paragraph::new(vec![
                    Line::from(Span::styled(
                        "Could not load the feed",
                        Style::default().fg(COLOR_ERROR).add_modifier(Modifier::BOLD),
                    )),
                    Line::from(""),
                    Line::from(Span::styled(
                        message.to_string(),
                        Style::default().fg(COLOR_TEXT_SECONDARY),
                    )),
                ])
                .alignment(Alignment::Center)
                .wrap(Wrap { trim: true });
                frame.render_widget(body, feed_rect);
            }
        }

        let footer = Paragraph::new("↑/↓ move · click ♡ like · click Follow · wheel scroll · q quit")
            .style(
                Style::default()
                    .fg(COLOR_TEXT_SECONDARY)
                    .bg(COLOR_PANEL_BG)
                    .add_modifier(Modifier::ITALIC),
            )
            .alignment(Alignment::Center);
        frame.render_widget(footer, footer_area);
    }

    fn status_text(&self) -> String {
        let summary = self.reel_summary();
        match &self.notice {
            Some(notice) => format!("{notice} · {summary}"),
            None => summary,
        }
    }

    fn reel_summary(&self) -> String {
        let Some(feed) = &self.feed else {
            return self.status_message.clone();
        };
        let state = feed.state();
        let Some(index) = state.current() else {
            return self.status_message.clone();
        };
        let Some(record) = state.record(index) else {
            return self.status_message.clone();
        };
        let playing = match feed.deck().state(index) {
            Some(PlayState::Playing) => "▶ playing",
            _ => "❚❚ paused",
        };
        format!(
            "Reel {}/{} · @{} · {}",
            index + 1,
            state.len(),
            record.username,
            playing
        )
    }
}

fn draw_feed(frame: &mut Frame<'_>, feed: &Controller, area: Rect, now: Instant) {
    let first_row = i64::from(feed.viewport().first_row());
    let visible_rows = i64::from(area.height);
    for node in feed.view().nodes() {
        let top = i64::from(node.top) - first_row;
        let bottom = i64::from(node.bottom()) - first_row;
        if bottom <= 0 || top >= visible_rows {
            continue;
        }
        let current = feed.state().current() == Some(node.index);
        let playing = feed.deck().state(node.index) == Some(PlayState::Playing);
        for view in node.regions() {
            let y = area.y as i64 + top + i64::from(view.area.y);
            let Some(target) = place(area, view.area, y) else {
                continue;
            };
            draw_region(frame, node, view, target, current, playing, now);
        }
    }
}

/// Screen rect for a region whose first row lands on screen row `y`,
/// clipped to the feed. Text regions must fit entirely.
fn place(area: Rect, region: Rect, y: i64) -> Option<Rect> {
    if region.width == 0 || region.height == 0 {
        return None;
    }
    let area_top = i64::from(area.y);
    let area_bottom = area_top + i64::from(area.height);
    let top = y.max(area_top);
    let bottom = (y + i64::from(region.height)).min(area_bottom);
    if bottom <= top {
        return None;
    }
    let x = area.x.saturating_add(region.x);
    let width = region.width.min(area.right().saturating_sub(x));
    if width == 0 {
        return None;
    }
    Some(Rect::new(x, top as u16, width, (bottom - top) as u16))
}

fn draw_region(
    frame: &mut Frame<'_>,
    node: &ReelNode,
    view: &RegionView,
    target: Rect,
    current: bool,
    playing: bool,
    now: Instant,
) {
    let full_height = target.height == view.area.height;
    match view.region {
        Region::Video => {
            let border = if current {
                COLOR_BORDER_FOCUSED
            } else {
                COLOR_BORDER_IDLE
            };
            let block = Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(border))
                .style(Style::default().bg(COLOR_PANEL_BG));
            let inner = block.inner(target);
            frame.render_widget(block, target);
            let (label, color) = if playing {
                ("▶ playing", COLOR_SUCCESS)
            } else {
                ("❚❚ paused", COLOR_TEXT_SECONDARY)
            };
            let body = Paragraph::new(vec![
                Line::from(Span::styled(
                    label,
                    Style::default().fg(color).add_modifier(Modifier::BOLD),
                )),
                Line::from(Span::styled(
                    view.text.clone(),
                    Style::default().fg(COLOR_TEXT_SECONDARY),
                )),
            ])
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true });
            if inner.height > 0 {
                let middle = inner.height / 2;
                let text_area = Rect::new(
                    inner.x,
                    inner.y + middle.saturating_sub(1),
                    inner.width,
                    inner.height - middle.saturating_sub(1),
                );
                frame.render_widget(body, text_area);
            }
        }
        _ if !full_height || view.text.is_empty() => {}
        Region::Username => {
            let text = Paragraph::new(view.text.clone()).style(
                Style::default()
                    .fg(COLOR_TEXT_PRIMARY)
                    .add_modifier(Modifier::BOLD),
            );
            frame.render_widget(text, target);
        }
        Region::FollowButton => {
            let style = if view.text == crate::render::FOLLOW_LABEL {
                Style::default()
                    .fg(COLOR_BG)
                    .bg(COLOR_ACCENT)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default()
                    .fg(COLOR_TEXT_SECONDARY)
                    .bg(COLOR_PANEL_FOCUSED_BG)
            };
            let button = Paragraph::new(view.text.clone())
                .style(style)
                .alignment(Alignment::Center);
            frame.render_widget(button, target);
        }
        Region::LikeGlyph => {
            let mut style = if node.liked {
                Style::default().fg(COLOR_ERROR).add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(COLOR_TEXT_PRIMARY)
            };
            if node.pulse_active(now) {
                style = style.add_modifier(Modifier::REVERSED);
            }
            frame.render_widget(Paragraph::new(view.text.clone()).style(style), target);
        }
        Region::Caption => {
            let caption =
                Paragraph::new(view.text.clone()).style(Style::default().fg(COLOR_TEXT_SECONDARY));
            frame.render_widget(caption, target);
        }
        Region::LikeCount
        | Region::CommentCount
        | Region::ShareCount
        | Region::CommentIcon
        | Region::ShareIcon
        | Region::MenuIcon => {
            let text = Paragraph::new(view.text.clone())
                .style(Style::default().fg(COLOR_TEXT_PRIMARY))
                .alignment(Alignment::Center);
            frame.render_widget(text, target);
        }
        _ => {
            let text = Paragraph::new(view.text.clone())
                .style(Style::default().fg(COLOR_ACCENT));
            frame.render_widget(text, target);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::InertFollowSink;
    use crate::playback::MockBackend;
    use crossterm::event::KeyModifiers;
    use ratatui::backend::TestBackend;

    fn options(records: Result<Vec<ReelRecord>, InitError>) -> Options {
        Options {
            records,
            timing: Timing::default(),
            backend: Box::new(MockBackend::default()),
            follow_sink: Box::new(InertFollowSink),
            wheel_step: 3,
        }
    }

    fn records() -> Vec<ReelRecord> {
        vec![
            ReelRecord {
                video_source: "a.mp4".into(),
                username: "alice".into(),
                caption: "hello".into(),
                like_count: 41,
                ..ReelRecord::default()
            },
            ReelRecord {
                video_source: "b.mp4".into(),
                username: "bob".into(),
                ..ReelRecord::default()
            },
        ]
    }

    fn screen_text(terminal: &Terminal<TestBackend>) -> String {
        let buffer = terminal.backend().buffer();
        let mut out = String::new();
        for y in 0..buffer.area.height {
            for x in 0..buffer.area.width {
                out.push_str(buffer.get(x, y).symbol());
            }
            out.push('\n');
        }
        out
    }

    #[test]
    fn draws_current_reel_labels() {
        let screen = Rect::new(0, 0, 70, 24);
        let mut model = Model::new(options(Ok(records())), screen, Instant::now());
        let mut terminal = Terminal::new(TestBackend::new(70, 24)).unwrap();
        model.draw_to(&mut terminal).unwrap();
        let text = screen_text(&terminal);
        assert!(text.contains("Reel 1/2"));
        assert!(text.contains("@alice"));
        assert!(text.contains("Follow"));
        assert!(text.contains("41"));
        assert!(text.contains("♡"));
        assert!(!text.contains("@bob"));
    }

    #[test]
    fn init_error_is_reported_without_feed() {
        let screen = Rect::new(0, 0, 70, 24);
        let mut model = Model::new(
            options(Err(InitError::MissingRecords)),
            screen,
            Instant::now(),
        );
        assert!(model.controller().is_none());
        assert!(model.init_error().unwrap().contains("reels"));
        let mut terminal = Terminal::new(TestBackend::new(70, 24)).unwrap();
        model.draw_to(&mut terminal).unwrap();
        assert!(screen_text(&terminal).contains("Could not load the feed"));
        assert!(!model.handle_key(KeyCode::Down, Instant::now()));
        assert!(model.handle_key(KeyCode::Char('q'), Instant::now()));
    }

    #[test]
    fn tiny_screen_has_no_mount_point() {
        let model = Model::new(options(Ok(records())), Rect::new(0, 0, 40, 2), Instant::now());
        assert!(model.controller().is_none());
        assert!(model.init_error().is_some());
    }

    #[test]
    fn place_clips_to_feed() {
        let area = Rect::new(0, 1, 40, 10);
        assert_eq!(place(area, Rect::new(2, 0, 5, 4), -1), Some(Rect::new(2, 1, 5, 2)));
        assert_eq!(place(area, Rect::new(2, 0, 5, 4), 11), None);
        assert_eq!(place(area, Rect::new(38, 0, 5, 1), 3), Some(Rect::new(38, 3, 2, 1)));
    }

    #[test]
    fn like_pulse_clears_after_it_expires() {
        let start = Instant::now();
        let screen = Rect::new(0, 0, 70, 24);
        let mut model = Model::new(options(Ok(records())), screen, start);
        let mut terminal = Terminal::new(TestBackend::new(70, 24)).unwrap();
        let area = model.controller().unwrap().area();
        let glyph = model
            .controller()
            .unwrap()
            .view()
            .node(0)
            .unwrap()
            .region(Region::LikeGlyph)
            .unwrap()
            .area;
        let (x, y) = (area.x + glyph.x, area.y + glyph.y);

        model.handle_mouse(
            MouseEvent {
                kind: MouseEventKind::Down(MouseButton::Left),
                column: x,
                row: y,
                modifiers: KeyModifiers::NONE,
            },
            start,
        );
        model.draw_to(&mut terminal).unwrap();
        let cell = terminal.backend().buffer().get(x, y).clone();
        assert_eq!(cell.symbol(), "♥");
        assert!(cell.modifier.contains(Modifier::REVERSED));

        let mut now = start;
        while now < start + Duration::from_secs(1) {
            now += model.tick_rate();
            model.tick(now);
            if model.needs_redraw {
                model.draw_to(&mut terminal).unwrap();
            }
        }
        let cell = terminal.backend().buffer().get(x, y).clone();
        assert_eq!(cell.symbol(), "♥");
        assert!(!cell.modifier.contains(Modifier::REVERSED));
    }

    #[test]
    fn failed_resize_is_shown_until_layout_recovers() {
        let screen = Rect::new(0, 0, 70, 24);
        let mut model = Model::new(options(Ok(records())), screen, Instant::now());
        model.handle_resize(40, 2);
        let status = model.status_text();
        assert!(status.starts_with("Error: feed container not found"), "{status}");
        assert!(status.contains("Reel 1/2"));

        model.handle_resize(70, 24);
        assert!(model.status_text().starts_with("Reel 1/2"));
    }
}
