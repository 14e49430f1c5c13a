//! Text placement for card bodies.

use crate::domain::artifact::{SCREEN_HEIGHT, SCREEN_WIDTH};

pub(crate) const STATUS_BAR_HEIGHT: u32 = 30;
pub(crate) const FOOTER_HEIGHT: u32 = 28;
const MARGIN: u32 = 20;
const LINE_SPACING_PERCENT: u32 = 140;
/// Average glyph advance as a percentage of the font size.
const GLYPH_WIDTH_PERCENT: u32 = 55;

/// Split `text` into lines of at most `max_chars` characters, breaking at spaces where
/// possible and inside words (or unspaced scripts) where not.
pub fn wrap_text(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for word in text.split_whitespace() {
        let word_len = word.chars().count();
        let needed = if current_len == 0 {
            word_len
        } else {
            current_len + 1 + word_len
        };
        if needed <= max_chars {
            if current_len > 0 {
                current.push(' ');
            }
            current.push_str(word);
            current_len = needed;
            continue;
        }

        if current_len > 0 {
            lines.push(std::mem::take(&mut current));
            current_len = 0;
        }
        let mut chars = word.chars().peekable();
        while chars.peek().is_some() {
            let chunk: String = chars.by_ref().take(max_chars).collect();
            let chunk_len = chunk.chars().count();
            if chunk_len == max_chars {
                lines.push(chunk);
            } else {
                current = chunk;
                current_len = chunk_len;
            }
        }
    }

    if current_len > 0 {
        lines.push(current);
    }
    lines
}

/// One positioned `<text>` element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CardLine {
    pub x: u32,
    pub y: u32,
    pub size: u32,
    pub bold: bool,
    pub italic: bool,
    pub anchor: &'static str,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Align {
    Center,
    Left,
}

/// Stacks lines top to bottom, then centres the block vertically in the body area.
#[derive(Debug, Default)]
pub(crate) struct BodyLayout {
    lines: Vec<CardLine>,
    height: u32,
}

impl BodyLayout {
    pub fn new() -> Self {
        Self::default()
    }

    fn max_chars(size: u32) -> usize {
        let usable = SCREEN_WIDTH - 2 * MARGIN;
        (usable * 100 / (size * GLYPH_WIDTH_PERCENT).max(1)) as usize
    }

    fn push_line(&mut self, text: String, size: u32, bold: bool, italic: bool, align: Align) {
        let advance = size * LINE_SPACING_PERCENT / 100;
        self.height += advance;
        let (x, anchor) = match align {
            Align::Center => (SCREEN_WIDTH / 2, "middle"),
            Align::Left => (MARGIN, "start"),
        };
        self.lines.push(CardLine {
            x,
            // Baseline sits at the bottom of the line box, less the descender allowance.
            y: self.height - (advance - size) - size / 5,
            size,
            bold,
            italic,
            anchor,
            text,
        });
    }

    /// Wrapped paragraph; empty text adds nothing.
    pub fn text(mut self, text: &str, size: u32, align: Align) -> Self {
        for line in wrap_text(text, Self::max_chars(size)) {
            self.push_line(line, size, false, false, align);
        }
        self
    }

    pub fn heading(mut self, text: &str, size: u32) -> Self {
        for line in wrap_text(text, Self::max_chars(size)) {
            self.push_line(line, size, true, false, Align::Center);
        }
        self
    }

    pub fn aside(mut self, text: &str, size: u32) -> Self {
        for line in wrap_text(text, Self::max_chars(size)) {
            self.push_line(line, size, false, true, Align::Center);
        }
        self
    }

    pub fn gap(mut self, pixels: u32) -> Self {
        self.height += pixels;
        self
    }

    pub fn finish(self) -> Vec<CardLine> {
        let top = STATUS_BAR_HEIGHT;
        let available = SCREEN_HEIGHT - STATUS_BAR_HEIGHT - FOOTER_HEIGHT;
        let offset = top + available.saturating_sub(self.height) / 2;
        self.lines
            .into_iter()
            .map(|mut line| {
                line.y += offset;
                line
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wraps_at_word_boundaries() {
        assert_eq!(
            wrap_text("the quick brown fox jumps", 10),
            vec!["the quick", "brown fox", "jumps"]
        );
        assert!(wrap_text("   ", 10).is_empty());
    }

    #[test]
    fn splits_words_longer_than_the_line() {
        assert_eq!(
            wrap_text("abcdefghij kl", 4),
            vec!["abcd", "efgh", "ij", "kl"]
        );
    }

    #[test]
    fn unspaced_text_is_chunked_by_characters() {
        let lines = wrap_text("静以修身俭以养德", 3);
        assert_eq!(lines, vec!["静以修", "身俭以", "养德"]);
    }

    #[test]
    fn body_is_centred_between_status_bar_and_footer() {
        let lines = BodyLayout::new().heading("Still", 40).finish();
        assert_eq!(lines.len(), 1);
        let line = &lines[0];
        assert_eq!(line.anchor, "middle");
        assert!(line.y > STATUS_BAR_HEIGHT);
        assert!(line.y < SCREEN_HEIGHT - FOOTER_HEIGHT);
    }

    #[test]
    fn lines_advance_downwards() {
        let lines = BodyLayout::new()
            .text("first", 16, Align::Left)
            .gap(10)
            .text("second", 16, Align::Left)
            .finish();
        assert_eq!(lines[0].x, MARGIN);
        assert!(lines[1].y > lines[0].y + 16);
    }
}
