use super::*;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

impl App {
    pub(super) fn handle_paste_event(&mut self, raw: &str) {
        let normalized = if raw.contains('\r') {
            raw.replace("\r\n", "\n").replace('\r', "\n")
        } else {
            raw.to_string()
        };
        if normalized.is_empty() {
            return;
        }
        if let Some(draft) = self.owner_draft.as_mut() {
            draft.push_str(normalized.trim());
        } else if self.focus == Focus::Composer {
            self.insert_str(&normalized);
        }
    }

    pub(super) fn clear_input_buffer(&mut self) {
        self.input.clear();
        self.cursor = 0;
        self.slash_hint_idx = 0;
    }

    pub(super) fn inline_hints(&self) -> Vec<String> {
        if !self.input.starts_with('/') || self.input.contains(char::is_whitespace) {
            return Vec::new();
        }
        let query = self.input.to_lowercase();
        SLASH_COMMANDS
            .iter()
            .filter(|cmd| cmd.starts_with(query.as_str()))
            .map(|cmd| cmd.to_string())
            .collect()
    }

    pub(super) fn apply_selected_inline_hint(&mut self) -> bool {
        let hints = self.inline_hints();
        let idx = self.slash_hint_idx.min(hints.len().saturating_sub(1));
        let Some(selected) = hints.get(idx).cloned() else {
            return false;
        };
        self.input = selected;
        self.cursor = self.input.len();
        self.slash_hint_idx = 0;
        true
    }

    pub(super) fn sync_inline_hint_idx(&mut self) {
        let len = self.inline_hints().len();
        if len == 0 {
            self.slash_hint_idx = 0;
        } else if self.slash_hint_idx >= len {
            self.slash_hint_idx = len - 1;
        }
    }

    pub(super) fn history_prev(&mut self) {
        if self.history.is_empty() {
            return;
        }
        let next = match self.history_pos {
            None => self.history.len() - 1,
            Some(i) => i.saturating_sub(1),
        };
        self.history_pos = Some(next);
        self.input = self.history[next].clone();
        self.cursor = self.input.len();
    }

    pub(super) fn history_next(&mut self) {
        let Some(i) = self.history_pos else {
            return;
        };
        if i + 1 >= self.history.len() {
            self.history_pos = None;
            self.clear_input_buffer();
            return;
        }
        self.history_pos = Some(i + 1);
        self.input = self.history[i + 1].clone();
        self.cursor = self.input.len();
    }

    fn remember(&mut self, line: &str) {
        if self.history.last().map(String::as_str) != Some(line) {
            self.history.push(line.to_string());
        }
        if self.history.len() > MAX_HISTORY {
            let overflow = self.history.len() - MAX_HISTORY;
            self.history.drain(..overflow);
        }
        self.history_pos = None;
    }

    /// Hands the composer text to the chat session. Without an identity the
    /// buffer is kept so nothing typed is lost.
    pub(super) fn submit_current_line(&mut self) {
        if self.input.trim().is_empty() {
            return;
        }
        if self.session.auth_state() == AuthState::Unauthenticated {
            self.last_status = "로그인이 필요합니다".to_string();
            return;
        }

        let line = std::mem::take(&mut self.input);
        self.clear_input_buffer();
        self.remember(line.trim());
        self.session.send_message(&line);
        self.autoscroll = true;
        self.follow_scroll();
        self.last_status = if line.trim_start().starts_with('/') {
            "command".to_string()
        } else {
            "sent".to_string()
        };
    }

    pub(super) fn insert_char(&mut self, c: char) {
        if self.cursor >= self.input.len() {
            self.input.push(c);
        } else {
            self.input.insert(self.cursor, c);
        }
        self.cursor += c.len_utf8();
    }

    pub(super) fn insert_str(&mut self, s: &str) {
        for c in s.chars() {
            self.insert_char(c);
        }
        self.sync_inline_hint_idx();
    }

    pub(super) fn backspace(&mut self) {
        if let Some((prev_idx, _)) = self.input[..self.cursor].char_indices().next_back() {
            self.input.drain(prev_idx..self.cursor);
            self.cursor = prev_idx;
        }
    }

    pub(super) fn delete(&mut self) {
        if let Some(ch) = self.input[self.cursor..].chars().next() {
            self.input.drain(self.cursor..self.cursor + ch.len_utf8());
        }
    }

    pub(super) fn move_left(&mut self) {
        if let Some((prev_idx, _)) = self.input[..self.cursor].char_indices().next_back() {
            self.cursor = prev_idx;
        }
    }

    pub(super) fn move_right(&mut self) {
        if let Some(ch) = self.input[self.cursor..].chars().next() {
            self.cursor += ch.len_utf8();
        }
    }

    pub(super) fn handle_key(&mut self, key: KeyEvent) {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.should_quit = true;
            return;
        }
        if self.owner_draft.is_some() {
            self.handle_owner_key(key);
            return;
        }
        match self.focus {
            Focus::Composer => self.handle_composer_key(key),
            Focus::Panel => self.handle_panel_key(key),
        }
    }

    fn toggle_focus(&mut self) {
        self.focus = match self.focus {
            Focus::Composer => Focus::Panel,
            Focus::Panel => Focus::Composer,
        };
    }

    pub(super) fn handle_panel_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Tab | KeyCode::BackTab | KeyCode::Esc => self.toggle_focus(),
            KeyCode::Up => self.panel.move_cursor(-1),
            KeyCode::Down => self.panel.move_cursor(1),
            KeyCode::PageUp => self.panel.move_cursor(-10),
            KeyCode::PageDown => self.panel.move_cursor(10),
            KeyCode::Enter | KeyCode::Right => {
                if let Some(fetch) = self.panel.activate() {
                    self.dispatch_fetch(fetch);
                }
            }
            KeyCode::Backspace | KeyCode::Left => self.panel.back(),
            KeyCode::Char('o') => self.owner_draft = Some(self.panel.owner().to_string()),
            _ => {}
        }
    }

    pub(super) fn handle_owner_key(&mut self, key: KeyEvent) {
        let Some(draft) = self.owner_draft.as_mut() else {
            return;
        };
        match key.code {
            KeyCode::Esc => self.owner_draft = None,
            KeyCode::Backspace => {
                draft.pop();
            }
            KeyCode::Enter => {
                let owner = std::mem::take(draft);
                self.owner_draft = None;
                self.last_status = format!("github owner: {}", owner.trim());
                if let Some(fetch) = self.panel.set_owner(&owner) {
                    self.dispatch_fetch(fetch);
                }
            }
            KeyCode::Char(c) if !c.is_whitespace() => draft.push(c),
            _ => {}
        }
    }

    pub(super) fn handle_composer_key(&mut self, key: KeyEvent) {
        if key.modifiers.contains(KeyModifiers::CONTROL) {
            match key.code {
                KeyCode::Char('a') => self.cursor = 0,
                KeyCode::Char('e') => self.cursor = self.input.len(),
                KeyCode::Char('j') => self.insert_char('\n'),
                KeyCode::Char('u') => self.clear_input_buffer(),
                _ => {}
            }
            return;
        }

        match key.code {
            KeyCode::Tab | KeyCode::BackTab => self.toggle_focus(),
            KeyCode::PageUp => self.scroll_up(5),
            KeyCode::PageDown => self.scroll_down(5),
            KeyCode::Up => {
                let hints = self.inline_hints();
                if hints.is_empty() {
                    self.history_prev();
                } else if self.slash_hint_idx == 0 {
                    self.slash_hint_idx = hints.len() - 1;
                } else {
                    self.slash_hint_idx -= 1;
                }
            }
            KeyCode::Down => {
                let hints = self.inline_hints();
                if hints.is_empty() {
                    self.history_next();
                } else {
                    self.slash_hint_idx = (self.slash_hint_idx + 1) % hints.len();
                }
            }
            KeyCode::Enter => {
                if key.modifiers.contains(KeyModifiers::SHIFT) {
                    self.insert_char('\n');
                    return;
                }
                let hints = self.inline_hints();
                let exact = hints.iter().any(|h| h.trim_end() == self.input);
                if !exact && self.apply_selected_inline_hint() {
                    return;
                }
                self.submit_current_line();
            }
            KeyCode::Backspace => {
                self.backspace();
                self.sync_inline_hint_idx();
            }
            KeyCode::Delete => {
                self.delete();
                self.sync_inline_hint_idx();
            }
            KeyCode::Left => self.move_left(),
            KeyCode::Right => self.move_right(),
            KeyCode::Home => self.cursor = 0,
            KeyCode::End => self.cursor = self.input.len(),
            KeyCode::Esc => self.clear_input_buffer(),
            KeyCode::Char(c) => {
                self.insert_char(c);
                self.sync_inline_hint_idx();
            }
            _ => {}
        }
    }
}
