use std::io::Stdout;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossbeam_channel::{unbounded, Receiver, Sender};
use crossterm::event::{self, Event, KeyEventKind, MouseEventKind};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Paragraph, Wrap};
use ratatui::Terminal;
use unicode_width::UnicodeWidthStr;

use crate::chat::{
    AuthState, ChatMessage, ChatSession, FeedState, IdentityEvent, FREEMAN, SYSTEM,
};
use crate::format::format_message_time;
use crate::github::{patch_preview, CommitDetail, GitHubClient};
use crate::{input_cursor_position, truncate};

mod input;
mod panel;
mod render;
mod runtime;
mod text;
mod types;
mod ui;

pub(crate) use panel::GitHubPanel;
use panel::{PanelEvent, PanelFetch, PanelLevel};
pub(crate) use runtime::run_app;
use text::sanitize_feed_text;
use types::{default_palette, FeedKind, Focus, ThemePalette};

const SLASH_COMMANDS: [&str; 4] = ["/help", "/me ", "/bot ", "/clear"];
const MAX_HISTORY: usize = 200;
const GITHUB_UNAVAILABLE: &str = "github client unavailable";

/// Feed lines are rebuilt only when the session revision or the feed
/// width changes.
struct RenderCache {
    revision: u64,
    width: u16,
    height: u16,
    lines: Vec<Line<'static>>,
    scroll_max: u16,
}

impl RenderCache {
    fn new() -> Self {
        Self {
            revision: u64::MAX,
            width: 0,
            height: 0,
            lines: Vec::new(),
            scroll_max: 0,
        }
    }
}

struct App {
    session: ChatSession,
    panel: GitHubPanel,
    github: Option<GitHubClient>,
    panel_tx: Sender<PanelEvent>,
    panel_rx: Receiver<PanelEvent>,

    focus: Focus,
    owner_draft: Option<String>,
    should_quit: bool,
    spinner_idx: usize,

    input: String,
    cursor: usize,
    history: Vec<String>,
    history_pos: Option<usize>,
    slash_hint_idx: usize,

    scroll: u16,
    autoscroll: bool,
    viewport_width: u16,
    viewport_height: u16,

    theme: ThemePalette,
    last_status: String,
    render_cache: RenderCache,
}

impl App {
    fn new(session: ChatSession, panel: GitHubPanel, github: Option<GitHubClient>) -> Self {
        let (panel_tx, panel_rx) = unbounded();
        Self {
            session,
            panel,
            github,
            panel_tx,
            panel_rx,
            focus: Focus::Composer,
            owner_draft: None,
            should_quit: false,
            spinner_idx: 0,
            input: String::new(),
            cursor: 0,
            history: Vec::new(),
            history_pos: None,
            slash_hint_idx: 0,
            scroll: 0,
            autoscroll: true,
            viewport_width: 120,
            viewport_height: 36,
            theme: default_palette(),
            last_status: "ready".to_string(),
            render_cache: RenderCache::new(),
        }
    }

    /// Signs in (when an identity is configured), starts the feed and kicks
    /// off the panel's first fetches.
    fn start(&mut self, identity: Option<String>) {
        if let Some(identity) = identity {
            self.session.apply_identity(IdentityEvent::SignedIn(identity));
        } else {
            self.last_status = "읽기 전용: --user 로 로그인하세요".to_string();
        }
        self.session.mount();
        for fetch in self.panel.start() {
            self.dispatch_fetch(fetch);
        }
    }

    fn shutdown(&mut self) {
        self.session.unmount();
        self.session.apply_identity(IdentityEvent::SignedOut);
    }

    fn dispatch_fetch(&mut self, fetch: PanelFetch) {
        let Some(client) = self.github.clone() else {
            tracing::debug!(?fetch, "github client unavailable; fetch skipped");
            self.panel.apply(fetch.fail(GITHUB_UNAVAILABLE));
            return;
        };
        let tx = self.panel_tx.clone();
        std::thread::spawn(move || {
            let _ = tx.send(fetch.run(&client));
        });
    }

    /// Drains chat and panel updates. Returns true if anything changed.
    fn poll_updates(&mut self) -> bool {
        let mut changed = self.session.poll();
        for event in self.panel_rx.try_iter().collect::<Vec<_>>() {
            self.panel.apply(event);
            changed = true;
        }
        if changed {
            self.follow_scroll();
        }
        changed
    }

    fn has_pending_jobs(&self) -> bool {
        self.session.pending_jobs() > 0
    }

    fn follow_scroll(&mut self) {
        if self.autoscroll {
            self.scroll = self.scroll_max();
        } else {
            self.scroll = self.scroll.min(self.scroll_max());
        }
    }

    fn composer_height(&self, width: u16) -> u16 {
        let prompt_width = UnicodeWidthStr::width(ui::PROMPT) as u16;
        let content_width = width.saturating_sub(ui::PANEL_HORIZONTAL_INSET).max(1);
        self.input_height(content_width, prompt_width)
            .saturating_add(ui::PANEL_VERTICAL_INSET)
    }

    fn feed_area(&self) -> Rect {
        let area = Rect::new(0, 0, self.viewport_width, self.viewport_height);
        ui::screen_layout(area, self).feed
    }

    fn ensure_render_cache(&mut self) -> bool {
        let feed = self.feed_area();
        let width = feed.width.saturating_sub(ui::PANEL_HORIZONTAL_INSET).max(1);
        let height = feed.height.saturating_sub(ui::PANEL_VERTICAL_INSET);
        let need_rebuild = self.render_cache.revision != self.session.revision()
            || self.render_cache.width != width
            || self.render_cache.height != height;
        if !need_rebuild {
            return false;
        }

        let lines = self.render_feed_lines();
        let paragraph = Paragraph::new(Text::from(lines.clone())).wrap(Wrap { trim: false });
        let rendered = paragraph.line_count(width).min(u16::MAX as usize) as u16;
        self.render_cache = RenderCache {
            revision: self.session.revision(),
            width,
            height,
            lines,
            scroll_max: rendered.saturating_sub(height),
        };
        true
    }

    fn scroll_max(&mut self) -> u16 {
        self.ensure_render_cache();
        self.render_cache.scroll_max
    }

    fn cached_feed_lines(&self) -> &[Line<'static>] {
        &self.render_cache.lines
    }

    fn update_viewport(&mut self, width: u16, height: u16) {
        self.viewport_width = width.max(1);
        self.viewport_height = height.max(1);
        self.follow_scroll();
    }

    fn scroll_up(&mut self, n: u16) {
        let from = if self.autoscroll {
            self.scroll_max()
        } else {
            self.scroll
        };
        self.autoscroll = false;
        self.scroll = from.saturating_sub(n);
    }

    fn scroll_down(&mut self, n: u16) {
        let max_scroll = self.scroll_max();
        self.scroll = self.scroll.saturating_add(n).min(max_scroll);
        if self.scroll >= max_scroll {
            self.autoscroll = true;
        }
    }

    fn input_height(&self, width: u16, prompt_width: u16) -> u16 {
        if self.input.is_empty() {
            return 1;
        }
        let (_, end_y) = input_cursor_position(&self.input, self.input.len(), width, prompt_width);
        end_y.saturating_add(1).max(1)
    }

    fn status_line(&self) -> String {
        let identity = self.session.identity().unwrap_or("로그인 안 됨");
        let feed = match self.session.feed_state() {
            FeedState::Active => "live",
            FeedState::Inactive => "offline",
        };
        let mut status = format!("{identity} | feed {feed}");
        if self.has_pending_jobs() {
            const SPINNER: [&str; 4] = ["|", "/", "-", "\\"];
            status.push_str(&format!(
                " | {FREEMAN} {} ({})",
                SPINNER[self.spinner_idx % SPINNER.len()],
                self.session.pending_jobs()
            ));
        }
        if self.panel.is_loading() {
            status.push_str(" | github ...");
        }
        status.push_str(&format!(" | {}", truncate(&self.last_status, 48)));
        status
    }
}
