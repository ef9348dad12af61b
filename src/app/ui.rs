use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::Style;
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, BorderType, Borders, Padding, Paragraph, Wrap};
use ratatui::Frame;
use unicode_width::UnicodeWidthStr;

use super::{App, Focus, PanelLevel, ThemePalette};
use crate::input_cursor_position;

pub(super) const PROMPT: &str = "> ";
const PANEL_PADDING_X: u16 = 1;
const PANEL_PADDING_Y: u16 = 0;
pub(super) const PANEL_HORIZONTAL_INSET: u16 = 2 + PANEL_PADDING_X * 2;
pub(super) const PANEL_VERTICAL_INSET: u16 = 2 + PANEL_PADDING_Y * 2;

pub(super) struct ScreenLayout {
    pub(super) feed: Rect,
    pub(super) panel: Rect,
    pub(super) hints: Option<Rect>,
    pub(super) composer: Rect,
    pub(super) status: Rect,
}

/// Feed and GitHub panel side by side (3:1), then suggestions, composer and
/// status stacked underneath.
pub(super) fn screen_layout(area: Rect, app: &App) -> ScreenLayout {
    let hints_h = if app.inline_hints().is_empty() {
        0
    } else {
        1 + PANEL_VERTICAL_INSET
    };
    let status_h = 1 + PANEL_VERTICAL_INSET;
    let max_input_h = area
        .height
        .saturating_sub(hints_h + status_h + PANEL_VERTICAL_INSET + 1)
        .max(PANEL_VERTICAL_INSET + 1);
    let input_h = app.composer_height(area.width).min(max_input_h);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(1),
            Constraint::Length(hints_h),
            Constraint::Length(input_h),
            Constraint::Length(status_h),
        ])
        .split(area);
    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(75), Constraint::Percentage(25)])
        .split(rows[0]);

    ScreenLayout {
        feed: body[0],
        panel: body[1],
        hints: (hints_h > 0).then_some(rows[1]),
        composer: rows[2],
        status: rows[3],
    }
}

pub(super) fn draw(f: &mut Frame, app: &App) {
    let theme = app.theme;
    let layout = screen_layout(f.area(), app);

    let feed = Paragraph::new(Text::from(app.cached_feed_lines().to_vec()))
        .style(theme.panel_surface_style())
        .block(panel_block(theme, "chat", false))
        .wrap(Wrap { trim: false })
        .scroll((app.scroll, 0));
    f.render_widget(feed, layout.feed);

    draw_panel(f, app, layout.panel, theme);

    if let Some(area) = layout.hints {
        let hint_panel = Paragraph::new(Text::from(vec![build_hint_line(app, theme)]))
            .style(theme.panel_surface_style())
            .block(panel_block(theme, "suggestions", false));
        f.render_widget(hint_panel, area);
    }

    let composer_focused = matches!(app.focus, Focus::Composer);
    let input = Paragraph::new(Text::from(build_input_lines(app, theme)))
        .style(theme.input_surface_style())
        .block(panel_block(theme, "compose", composer_focused))
        .wrap(Wrap { trim: false });
    f.render_widget(input, layout.composer);

    if composer_focused {
        let prompt_width = UnicodeWidthStr::width(PROMPT) as u16;
        let area = layout.composer;
        let content_width = area.width.saturating_sub(PANEL_HORIZONTAL_INSET).max(1);
        let content_height = area.height.saturating_sub(PANEL_VERTICAL_INSET).max(1);
        let (cx, cy) = input_cursor_position(&app.input, app.cursor, content_width, prompt_width);
        let cursor_x = area.x + 1 + PANEL_PADDING_X + cx.min(content_width.saturating_sub(1));
        let cursor_y = area.y + 1 + PANEL_PADDING_Y + cy.min(content_height.saturating_sub(1));
        f.set_cursor_position((cursor_x, cursor_y));
    }

    let keys = match app.focus {
        Focus::Composer => "Tab github | PgUp/PgDn scroll | Ctrl+C exit",
        Focus::Panel => "Enter open | Backspace back | o owner | Tab chat",
    };
    let status = Paragraph::new(format!("{} | {keys}", app.status_line()))
        .style(theme.status_style())
        .block(panel_block(theme, "status", false));
    f.render_widget(status, layout.status);
}

fn draw_panel(f: &mut Frame, app: &App, area: Rect, theme: ThemePalette) {
    let view = app.render_panel_view();
    let inner_height = area.height.saturating_sub(PANEL_VERTICAL_INSET).max(1);
    let title = match app.panel.selected_repo() {
        Some(repo) => format!("github: {}/{repo}", app.panel.owner()),
        None => "github".to_string(),
    };
    let offset = match app.panel.level() {
        PanelLevel::Detail => app.panel.detail_scroll(),
        _ => view.focus_row.saturating_sub(inner_height.saturating_sub(1)),
    };

    let mut paragraph = Paragraph::new(Text::from(view.lines))
        .style(theme.panel_surface_style())
        .block(panel_block(theme, &title, matches!(app.focus, Focus::Panel)))
        .scroll((offset, 0));
    if app.panel.level() == PanelLevel::Detail {
        paragraph = paragraph.wrap(Wrap { trim: false });
    }
    f.render_widget(paragraph, area);
}

fn panel_block(theme: ThemePalette, title: &str, focused: bool) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(theme.panel_border_style(focused))
        .title(Span::styled(format!(" {title} "), theme.title_style()))
        .padding(Padding::new(
            PANEL_PADDING_X,
            PANEL_PADDING_X,
            PANEL_PADDING_Y,
            PANEL_PADDING_Y,
        ))
        .style(theme.panel_surface_style())
}

fn build_input_lines(app: &App, theme: ThemePalette) -> Vec<Line<'static>> {
    let prompt_style = theme.prompt_style();
    if app.input.is_empty() {
        let placeholder = if app.session.identity().is_some() {
            "메시지를 입력하세요"
        } else {
            "로그인이 필요합니다"
        };
        return vec![Line::from(vec![
            Span::styled(PROMPT, prompt_style),
            Span::styled(placeholder, theme.muted_style()),
        ])];
    }

    let indent = " ".repeat(PROMPT.chars().count());
    app.input
        .split('\n')
        .enumerate()
        .map(|(idx, part)| {
            let lead = if idx == 0 {
                PROMPT.to_string()
            } else {
                indent.clone()
            };
            Line::from(vec![
                Span::styled(lead, prompt_style),
                Span::styled(part.to_string(), Style::default().fg(theme.input_text)),
            ])
        })
        .collect()
}

fn build_hint_line(app: &App, theme: ThemePalette) -> Line<'static> {
    let hints = app.inline_hints();
    let mut spans = vec![Span::styled(" commands (Up/Down): ", theme.muted_style())];
    let selected = app.slash_hint_idx.min(hints.len().saturating_sub(1));
    for (i, hint) in hints.iter().enumerate() {
        if i > 0 {
            spans.push(Span::raw("  "));
        }
        let style = if i == selected {
            theme.hint_selected_style()
        } else {
            theme.muted_style()
        };
        spans.push(Span::styled(hint.trim_end().to_string(), style));
    }
    Line::from(spans)
}
