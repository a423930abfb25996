//! Line accumulation and wrapping.
//!
//! Extraction engines break sentences at the physical line ends of the page.
//! [`LineAccumulator`] glues such fragments back together until something
//! marks a segment boundary (a list item, a sentence end, or a line that is
//! already long enough), then hands the segment to [`split_and_format_line`].

/// Fraction of the remaining line a space break may sit at before a hard break wins.
const SOFT_BREAK_RATIO: f64 = 0.75;

/// Upper-case the first character after leading whitespace when it is a
/// lowercase letter. Lines starting with a digit or symbol are left alone.
pub fn enforce_capitalization(line: &str) -> String {
    let body = line.trim_start();
    let indent = &line[..line.len() - body.len()];
    let mut chars = body.chars();
    match chars.next() {
        Some(first) if first.is_alphabetic() && !first.is_uppercase() => {
            let mut out = String::with_capacity(line.len());
            out.push_str(indent);
            out.extend(first.to_uppercase());
            out.push_str(chars.as_str());
            out
        }
        _ => line.to_string(),
    }
}

/// Split `line` into pieces of at most `max_len` characters.
///
/// Breaks at the last space within the limit, unless that space lies beyond
/// three quarters of the remaining text, in which case the line is cut at
/// exactly `max_len`. Pieces are trimmed and never empty. `max_len == 0`
/// disables wrapping.
pub fn split_and_format_line(line: &str, max_len: usize, enforce_cap: bool) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut rest = if enforce_cap {
        enforce_capitalization(line)
    } else {
        line.to_string()
    };

    while max_len > 0 {
        let chars: Vec<char> = rest.chars().collect();
        if chars.len() <= max_len {
            break;
        }

        let break_at = match chars[..=max_len].iter().rposition(|&c| c == ' ') {
            Some(bp) if bp as f64 <= chars.len() as f64 * SOFT_BREAK_RATIO => bp,
            _ => max_len,
        };

        let head: String = chars[..break_at].iter().collect();
        let head = head.trim();
        if !head.is_empty() {
            pieces.push(head.to_string());
        }
        let tail: String = chars[break_at..].iter().collect();
        rest = tail.trim().to_string();
    }

    if !rest.is_empty() {
        pieces.push(rest);
    }
    pieces
}

/// Per-page buffer that re-joins broken lines.
#[derive(Debug)]
pub struct LineAccumulator {
    buffer: String,
    min_chars: usize,
    max_chars: usize,
    enforce_cap: bool,
    out: Vec<String>,
}

impl LineAccumulator {
    pub fn new(min_chars: usize, max_chars: usize, enforce_cap: bool) -> Self {
        Self {
            buffer: String::new(),
            min_chars,
            max_chars,
            enforce_cap,
            out: Vec::new(),
        }
    }

    /// Feed one filtered, non-empty line.
    pub fn push(&mut self, line: &str) {
        let stripped = line.trim();
        let is_list_item = stripped.starts_with(['-', '*']);
        let is_sentence_end = stripped.ends_with(['.', '?', '!']);

        if is_list_item || is_sentence_end || stripped.chars().count() >= self.min_chars {
            self.flush();
            self.buffer = line.to_string();
        } else if self.buffer.is_empty() {
            self.buffer = stripped.to_string();
        } else {
            if !self.buffer.ends_with('-') {
                self.buffer.push(' ');
            }
            self.buffer.push_str(stripped);
        }
    }

    fn flush(&mut self) {
        if self.buffer.is_empty() {
            return;
        }
        let segment = std::mem::take(&mut self.buffer);
        self.out
            .extend(split_and_format_line(&segment, self.max_chars, self.enforce_cap));
    }

    /// Flush the pending segment and return every wrapped line of the page.
    pub fn finish(mut self) -> Vec<String> {
        self.flush();
        self.out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LONG: &str = "this is a very long sentence that needs to be broken into multiple lines at a sensible break point.";

    #[test]
    fn long_line_wraps_into_three_pieces() {
        let pieces = split_and_format_line(LONG, 50, true);
        assert_eq!(
            pieces,
            vec![
                "This is a very long sentence that needs to be",
                "broken into multiple lines at a sensible break poi",
                "nt.",
            ]
        );
        assert!(pieces.iter().all(|p| p.chars().count() <= 50));
    }

    #[test]
    fn unbroken_word_is_hard_split() {
        let word = "a".repeat(25);
        let pieces = split_and_format_line(&word, 10, false);
        assert_eq!(pieces, vec!["a".repeat(10), "a".repeat(10), "a".repeat(5)]);
    }

    #[test]
    fn late_space_falls_back_to_hard_break() {
        // Space at index 16 of a 20-char line lies beyond 75%.
        let line = format!("{} bbb", "a".repeat(16));
        let pieces = split_and_format_line(&line, 18, false);
        assert_eq!(pieces, vec![format!("{} b", "a".repeat(16)), "bb".to_string()]);
    }

    #[test]
    fn space_at_three_quarters_is_kept() {
        let pieces = split_and_format_line("abcdefghi jk", 10, false);
        assert_eq!(pieces, vec!["abcdefghi", "jk"]);
        let pieces = split_and_format_line("abcdefghijk lm", 10, false);
        assert_eq!(pieces, vec!["abcdefghij", "k lm"]);
    }

    #[test]
    fn zero_max_disables_wrapping() {
        assert_eq!(split_and_format_line(LONG, 0, false), vec![LONG.to_string()]);
        assert_eq!(split_and_format_line(LONG, 0, true)[0].chars().next(), Some('T'));
    }

    #[test]
    fn short_line_is_returned_whole() {
        assert_eq!(split_and_format_line("short", 80, true), vec!["Short"]);
        assert!(split_and_format_line("", 80, false).is_empty());
    }

    #[test]
    fn wrap_counts_characters_not_bytes() {
        let line = "\u{e9}".repeat(12);
        let pieces = split_and_format_line(&line, 10, false);
        assert_eq!(pieces[0].chars().count(), 10);
        assert_eq!(pieces[1].chars().count(), 2);
    }

    #[test]
    fn capitalization() {
        assert_eq!(enforce_capitalization(" already Capitalized"), " Already Capitalized");
        assert_eq!(enforce_capitalization("1. hello world"), "1. hello world");
        assert_eq!(enforce_capitalization("Hello"), "Hello");
        assert_eq!(enforce_capitalization("   "), "   ");
    }

    #[test]
    fn accumulator_joins_fragments() {
        let mut acc = LineAccumulator::new(20, 80, false);
        for line in ["This sentence was", "broken by the", "extractor."] {
            acc.push(line);
        }
        // A sentence end opens its own segment rather than closing the current one.
        assert_eq!(
            acc.finish(),
            vec!["This sentence was broken by the", "extractor."]
        );
    }

    #[test]
    fn accumulator_joins_hyphenated_words_without_space() {
        let mut acc = LineAccumulator::new(50, 80, false);
        acc.push("well-");
        acc.push("known fact");
        assert_eq!(acc.finish(), vec!["well-known fact"]);
    }

    #[test]
    fn list_items_and_sentence_ends_start_segments() {
        let mut acc = LineAccumulator::new(100, 80, false);
        acc.push("intro text");
        acc.push("- first");
        acc.push("- second");
        acc.push("Done.");
        assert_eq!(acc.finish(), vec!["intro text", "- first", "- second", "Done."]);
    }

    #[test]
    fn long_lines_start_segments() {
        let mut acc = LineAccumulator::new(15, 80, false);
        acc.push("Line One (Long)");
        acc.push("Short");
        acc.push("Line Three (Long)");
        assert_eq!(acc.finish(), vec!["Line One (Long) Short", "Line Three (Long)"]);
    }

    #[test]
    fn min_zero_keeps_every_line() {
        let mut acc = LineAccumulator::new(0, 80, false);
        acc.push("a");
        acc.push("b");
        assert_eq!(acc.finish(), vec!["a", "b"]);
    }
}
