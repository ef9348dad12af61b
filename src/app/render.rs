use super::*;

pub(super) const EMPTY_FEED: &str = "아직 대화가 없습니다.";
const LOADING: &str = "불러오는 중...";
const COMMIT_TITLE_CHARS: usize = 60;

/// Panel content plus the row that must stay on screen.
pub(super) struct PanelView {
    pub(super) lines: Vec<Line<'static>>,
    pub(super) focus_row: u16,
}

fn feed_kind(msg: &ChatMessage, identity: Option<&str>) -> FeedKind {
    if msg.is_local() || msg.user == SYSTEM {
        FeedKind::Local
    } else if msg.user == FREEMAN {
        FeedKind::Freeman
    } else if identity == Some(msg.user.as_str()) {
        FeedKind::Own
    } else {
        FeedKind::Remote
    }
}

pub(super) fn feed_prefix(msg: &ChatMessage) -> String {
    format!(
        "[{} {} : ",
        format_message_time(msg.timestamp.as_ref()),
        msg.user
    )
}

/// One message as `[<time> <user> : <text>]`. Extra lines of a multi-line
/// message are indented under the text.
fn push_message_lines(
    lines: &mut Vec<Line<'static>>,
    msg: &ChatMessage,
    kind: FeedKind,
    theme: ThemePalette,
) {
    let prefix = feed_prefix(msg);
    let indent = " ".repeat(UnicodeWidthStr::width(prefix.as_str()));
    let style = theme.feed_style(kind);
    let text = sanitize_feed_text(&msg.text);
    let parts = text.split('\n').collect::<Vec<_>>();
    let last = parts.len().saturating_sub(1);

    for (idx, part) in parts.iter().enumerate() {
        let lead = if idx == 0 {
            Span::styled(prefix.clone(), style.add_modifier(Modifier::BOLD))
        } else {
            Span::raw(indent.clone())
        };
        let mut spans = vec![lead, Span::styled(part.to_string(), style)];
        if idx == last {
            spans.push(Span::styled("]", style.add_modifier(Modifier::BOLD)));
        }
        lines.push(Line::from(spans));
    }
}

fn heading(theme: ThemePalette, text: String) -> Line<'static> {
    Line::from(Span::styled(text, theme.title_style()))
}

fn note(theme: ThemePalette, text: &str) -> Line<'static> {
    Line::from(Span::styled(text.to_string(), theme.muted_style()))
}

fn list_row(theme: ThemePalette, label: String, under_cursor: bool, chosen: bool) -> Line<'static> {
    let marker = if chosen { "* " } else { "  " };
    let style = if under_cursor {
        theme.hint_selected_style()
    } else if chosen {
        Style::default()
            .fg(theme.highlight_fg)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(theme.panel_fg)
    };
    Line::from(Span::styled(format!("{marker}{label}"), style))
}

impl App {
    pub(super) fn render_feed_lines(&self) -> Vec<Line<'static>> {
        let visible = self.session.visible_messages();
        if visible.is_empty() {
            return vec![note(self.theme, EMPTY_FEED)];
        }

        let identity = self.session.identity();
        let mut lines = Vec::with_capacity(visible.len());
        for msg in visible {
            push_message_lines(&mut lines, msg, feed_kind(msg, identity), self.theme);
        }
        lines
    }

    pub(super) fn render_panel_view(&self) -> PanelView {
        let theme = self.theme;
        let panel = &self.panel;
        let cursor_active = matches!(self.focus, Focus::Panel) && self.owner_draft.is_none();
        let mut lines = Vec::new();
        let mut focus_row = 0usize;

        match &self.owner_draft {
            Some(draft) => lines.push(Line::from(vec![
                Span::styled("owner: ", theme.muted_style()),
                Span::styled(format!("{draft}_"), theme.hint_selected_style()),
            ])),
            None => lines.push(Line::from(vec![
                Span::styled("owner: ", theme.muted_style()),
                Span::styled(panel.owner().to_string(), theme.title_style()),
            ])),
        }
        lines.push(Line::from(""));

        match panel.level() {
            PanelLevel::Repos => {
                lines.push(heading(theme, "리포지토리".to_string()));
                if panel.repos().is_empty() {
                    let text = if panel.is_loading() {
                        LOADING
                    } else {
                        "리포지토리가 없습니다."
                    };
                    lines.push(note(theme, text));
                }
                for (idx, repo) in panel.repos().iter().enumerate() {
                    let under_cursor = cursor_active && idx == panel.cursor();
                    if idx == panel.cursor() {
                        focus_row = lines.len();
                    }
                    let chosen = panel.selected_repo() == Some(repo.name.as_str());
                    lines.push(list_row(theme, repo.name.clone(), under_cursor, chosen));
                }
            }
            PanelLevel::Branches => {
                let repo = panel.selected_repo().unwrap_or_default();
                lines.push(heading(theme, format!("최신 GitHub 브랜치 ({repo})")));
                if panel.branches().is_empty() {
                    lines.push(note(theme, "브랜치 정보를 불러오는 중..."));
                }
                for (idx, branch) in panel.branches().iter().enumerate() {
                    let under_cursor = cursor_active && idx == panel.cursor();
                    if idx == panel.cursor() {
                        focus_row = lines.len();
                    }
                    let chosen = panel.selected_branch() == Some(branch.name.as_str());
                    let short_sha = branch.commit_sha.chars().take(7).collect::<String>();
                    lines.push(list_row(
                        theme,
                        format!("{} ({short_sha})", branch.name),
                        under_cursor,
                        chosen,
                    ));
                }
            }
            PanelLevel::Commits => {
                let branch = panel.selected_branch().unwrap_or_default();
                lines.push(heading(theme, format!("커밋 목록 ({branch})")));
                if panel.commits().is_empty() {
                    let text = if panel.is_loading() {
                        LOADING
                    } else {
                        "커밋이 없습니다."
                    };
                    lines.push(note(theme, text));
                }
                for (idx, commit) in panel.commits().iter().enumerate() {
                    let under_cursor = cursor_active && idx == panel.cursor();
                    if idx == panel.cursor() {
                        focus_row = lines.len() + 1;
                    }
                    lines.push(list_row(
                        theme,
                        truncate(&commit.message, COMMIT_TITLE_CHARS),
                        under_cursor,
                        false,
                    ));
                    lines.push(note(
                        theme,
                        &format!("    {} | {}", commit.author, commit.date),
                    ));
                }
            }
            PanelLevel::Detail => {
                focus_row = (lines.len() as u16).saturating_add(panel.detail_scroll()) as usize;
                match panel.detail() {
                    None if panel.is_loading() => lines.push(note(theme, LOADING)),
                    None => lines.push(note(theme, "커밋 정보가 없습니다.")),
                    Some(detail) => push_detail_lines(&mut lines, detail, theme),
                }
            }
        }

        if let Some(err) = panel.last_error() {
            lines.push(Line::from(""));
            lines.push(Line::from(Span::styled(
                format!("오류: {}", truncate(err, 120)),
                theme.error_style(),
            )));
        }

        PanelView {
            lines,
            focus_row: focus_row.min(u16::MAX as usize) as u16,
        }
    }
}

fn push_detail_lines(lines: &mut Vec<Line<'static>>, detail: &CommitDetail, theme: ThemePalette) {
    lines.push(Line::from(Span::styled(
        sanitize_feed_text(&detail.message),
        theme.title_style(),
    )));
    lines.push(note(
        theme,
        &format!("작성자: {} | 날짜: {}", detail.author, detail.date),
    ));
    lines.push(Line::from(""));
    for part in sanitize_feed_text(&detail.body).split('\n') {
        lines.push(Line::from(Span::styled(
            part.to_string(),
            Style::default().fg(theme.panel_fg),
        )));
    }

    if detail.files.is_empty() {
        return;
    }
    lines.push(Line::from(""));
    lines.push(heading(theme, "변경 파일:".to_string()));
    for file in &detail.files {
        lines.push(Line::from(Span::styled(
            format!("- {} ({})", file.filename, file.status),
            theme.muted_style(),
        )));
        if let Some(patch) = &file.patch {
            for part in sanitize_feed_text(&patch_preview(patch)).split('\n') {
                lines.push(Line::from(Span::styled(
                    format!("    {part}"),
                    theme.patch_style(),
                )));
            }
        }
    }
}
