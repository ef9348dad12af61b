const TAB_WIDTH: usize = 4;

/// Makes text from the shared feed safe to draw: escape sequences and
/// control characters are dropped, CR becomes a line break and tabs expand
/// to spaces.
pub(super) fn sanitize_feed_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_escape = false;
    let mut in_csi = false;
    let mut after_cr = false;

    for ch in text.chars() {
        let was_cr = std::mem::replace(&mut after_cr, ch == '\r');
        if in_escape {
            if in_csi {
                // CSI ends at a final byte in 0x40..=0x7E.
                if ('@'..='~').contains(&ch) {
                    in_escape = false;
                    in_csi = false;
                }
                continue;
            }
            in_csi = ch == '[';
            in_escape = in_csi;
            continue;
        }

        match ch {
            '\u{1b}' => in_escape = true,
            '\r' => out.push('\n'),
            '\t' => out.extend(std::iter::repeat(' ').take(TAB_WIDTH)),
            '\n' if was_cr => {}
            '\n' => out.push(ch),
            c if c.is_control() => {}
            c => out.push(c),
        }
    }

    out
}
