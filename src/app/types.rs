use ratatui::style::{Color, Modifier, Style};

/// Which pane receives key input.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Focus {
    Composer,
    Panel,
}

/// How a feed line is styled.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum FeedKind {
    Own,
    Remote,
    Freeman,
    Local,
}

#[derive(Clone, Copy)]
pub(crate) struct ThemePalette {
    pub(crate) prompt: Color,
    pub(crate) input_text: Color,
    pub(crate) muted_text: Color,
    pub(crate) highlight_fg: Color,
    pub(crate) highlight_bg: Color,
    pub(crate) status_text: Color,
    pub(crate) own_text: Color,
    pub(crate) remote_text: Color,
    pub(crate) freeman_label: Color,
    pub(crate) system_text: Color,
    pub(crate) error_text: Color,
    pub(crate) banner_title: Color,
    pub(crate) panel_bg: Color,
    pub(crate) panel_fg: Color,
    pub(crate) border: Color,
    pub(crate) border_focused: Color,
    pub(crate) patch_text: Color,
}

/// Green-on-black terminal look.
pub(crate) fn default_palette() -> ThemePalette {
    ThemePalette {
        prompt: Color::Rgb(74, 222, 128),
        input_text: Color::Rgb(134, 239, 172),
        muted_text: Color::Rgb(34, 197, 94),
        highlight_fg: Color::Rgb(220, 252, 231),
        highlight_bg: Color::Rgb(21, 128, 61),
        status_text: Color::Rgb(34, 197, 94),
        own_text: Color::Rgb(187, 247, 208),
        remote_text: Color::Rgb(74, 222, 128),
        freeman_label: Color::Rgb(250, 204, 21),
        system_text: Color::Rgb(22, 163, 74),
        error_text: Color::Rgb(248, 113, 113),
        banner_title: Color::Rgb(22, 163, 74),
        panel_bg: Color::Rgb(0, 0, 0),
        panel_fg: Color::Rgb(74, 222, 128),
        border: Color::Rgb(22, 101, 52),
        border_focused: Color::Rgb(74, 222, 128),
        patch_text: Color::Rgb(21, 128, 61),
    }
}

impl ThemePalette {
    pub(crate) fn prompt_style(self) -> Style {
        Style::default()
            .fg(self.prompt)
            .add_modifier(Modifier::BOLD)
    }

    pub(crate) fn title_style(self) -> Style {
        Style::default()
            .fg(self.banner_title)
            .add_modifier(Modifier::BOLD)
    }

    pub(crate) fn feed_style(self, kind: FeedKind) -> Style {
        match kind {
            FeedKind::Own => Style::default().fg(self.own_text),
            FeedKind::Remote => Style::default().fg(self.remote_text),
            FeedKind::Freeman => Style::default().fg(self.freeman_label),
            FeedKind::Local => Style::default()
                .fg(self.system_text)
                .add_modifier(Modifier::ITALIC),
        }
    }

    pub(crate) fn muted_style(self) -> Style {
        Style::default().fg(self.muted_text)
    }

    pub(crate) fn error_style(self) -> Style {
        Style::default().fg(self.error_text)
    }

    pub(crate) fn patch_style(self) -> Style {
        Style::default().fg(self.patch_text)
    }

    pub(crate) fn status_style(self) -> Style {
        Style::default().fg(self.status_text)
    }

    pub(crate) fn panel_surface_style(self) -> Style {
        Style::default().bg(self.panel_bg).fg(self.panel_fg)
    }

    pub(crate) fn panel_border_style(self, focused: bool) -> Style {
        Style::default().fg(if focused {
            self.border_focused
        } else {
            self.border
        })
    }

    pub(crate) fn input_surface_style(self) -> Style {
        Style::default().fg(self.input_text)
    }

    pub(crate) fn hint_selected_style(self) -> Style {
        Style::default()
            .fg(self.highlight_fg)
            .bg(self.highlight_bg)
            .add_modifier(Modifier::BOLD)
    }
}
