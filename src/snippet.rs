//! Snippet extraction and match highlighting.
//!
//! Spans are byte ranges into the original content, which need not be
//! valid UTF-8. Before use they are clamped to the content, widened to
//! char boundaries, sorted and merged so that overlapping or touching
//! matches become one highlighted region. Text is decoded only after the
//! regions are fixed, one region at a time.

use crate::types::MatchSpan;
use serde::Serialize;

/// A run of text that is either plain or part of a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment<'a> {
    Plain(&'a str),
    Match(&'a str),
}

impl<'a> Segment<'a> {
    #[must_use]
    pub fn text(self) -> &'a str {
        match self {
            Self::Plain(s) | Self::Match(s) => s,
        }
    }
}

/// UTF-8 continuation bytes never start a char.
fn is_boundary(bytes: &[u8], i: usize) -> bool {
    i == 0 || i >= bytes.len() || bytes[i] & 0xC0 != 0x80
}

fn floor_boundary(bytes: &[u8], mut i: usize) -> usize {
    i = i.min(bytes.len());
    while !is_boundary(bytes, i) {
        i -= 1;
    }
    i
}

fn ceil_boundary(bytes: &[u8], mut i: usize) -> usize {
    i = i.min(bytes.len());
    while !is_boundary(bytes, i) {
        i += 1;
    }
    i
}

/// Sorted, disjoint, non-adjacent regions on char boundaries.
fn merge_spans(content: &[u8], spans: &[MatchSpan]) -> Vec<MatchSpan> {
    let mut sorted: Vec<MatchSpan> = spans
        .iter()
        .map(|s| {
            MatchSpan::new(
                floor_boundary(content, s.start),
                ceil_boundary(content, s.end),
            )
        })
        .filter(|s| !s.is_empty())
        .collect();
    sorted.sort_unstable_by(|a, b| a.start.cmp(&b.start).then(b.end.cmp(&a.end)));

    let mut merged: Vec<MatchSpan> = Vec::with_capacity(sorted.len());
    for span in sorted {
        match merged.last_mut() {
            Some(last) if span.start <= last.end => last.end = last.end.max(span.end),
            _ => merged.push(span),
        }
    }
    merged
}

/// Splits `content` into plain and matched segments.
#[must_use]
pub fn highlight_segments<'a>(content: &'a str, spans: &[MatchSpan]) -> Vec<Segment<'a>> {
    let mut segments = Vec::new();
    let mut cursor = 0;

    for span in merge_spans(content.as_bytes(), spans) {
        if span.start > cursor {
            segments.push(Segment::Plain(&content[cursor..span.start]));
        }
        segments.push(Segment::Match(&content[span.start..span.end]));
        cursor = span.end;
    }
    if cursor < content.len() {
        segments.push(Segment::Plain(&content[cursor..]));
    }
    segments
}

/// Wraps every matched region in `enter` and `exit`.
///
/// With empty markers the output equals `content`.
#[must_use]
pub fn highlight(content: &str, spans: &[MatchSpan], enter: &str, exit: &str) -> String {
    let mut out = String::with_capacity(content.len() + spans.len() * (enter.len() + exit.len()));
    for segment in highlight_segments(content, spans) {
        match segment {
            Segment::Plain(s) => out.push_str(s),
            Segment::Match(s) => {
                out.push_str(enter);
                out.push_str(s);
                out.push_str(exit);
            }
        }
    }
    out
}

/// A window of content with the spans that fall inside it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Snippet {
    pub text: String,
    /// Merged match regions, relative to `text`
    pub spans: Vec<MatchSpan>,
    /// Byte offset of `text` in the original content
    pub start: usize,
    pub end: usize,
}

impl Snippet {
    /// The snippet with matches wrapped in `enter` and `exit`.
    #[must_use]
    pub fn highlighted(&self, enter: &str, exit: &str) -> String {
        highlight(&self.text, &self.spans, enter, exit)
    }

    #[must_use]
    pub fn segments(&self) -> Vec<Segment<'_>> {
        highlight_segments(&self.text, &self.spans)
    }
}

/// Cuts at most `length` bytes around the first match (0 = all content).
///
/// The window and its highlighted regions are fixed on the raw bytes;
/// each region is then decoded separately, so invalid UTF-8 never moves
/// a highlight.
#[must_use]
pub fn extract_snippet(content: &[u8], spans: &[MatchSpan], length: usize) -> Snippet {
    let len = content.len();
    let (start, end) = if length == 0 || len <= length {
        (0, len)
    } else {
        let anchor = spans
            .iter()
            .min_by_key(|s| s.start)
            .map_or(0, |s| s.start + s.len().min(length) / 2);
        let start = anchor.saturating_sub(length / 2).min(len - length);
        let start = ceil_boundary(content, start);
        (start, floor_boundary(content, start + length).max(start))
    };

    let window = &content[start..end];
    let local: Vec<MatchSpan> = spans
        .iter()
        .filter(|s| s.start < end && s.end > start)
        .map(|s| MatchSpan::new(s.start.max(start) - start, s.end.min(end) - start))
        .collect();

    let mut text = String::with_capacity(window.len());
    let mut regions = Vec::new();
    let mut cursor = 0;
    for span in merge_spans(window, &local) {
        text.push_str(&String::from_utf8_lossy(&window[cursor..span.start]));
        let from = text.len();
        text.push_str(&String::from_utf8_lossy(&window[span.start..span.end]));
        regions.push(MatchSpan::new(from, text.len()));
        cursor = span.end;
    }
    text.push_str(&String::from_utf8_lossy(&window[cursor..]));

    Snippet {
        text,
        spans: regions,
        start,
        end,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spans(pairs: &[(usize, usize)]) -> Vec<MatchSpan> {
        pairs.iter().map(|&(s, e)| MatchSpan::new(s, e)).collect()
    }

    #[test]
    fn test_overlapping_spans_merge() {
        assert_eq!(highlight("abcdef", &spans(&[(0, 4), (2, 6)]), "<", ">"), "<abcdef>");
    }

    #[test]
    fn test_adjacent_spans_merge() {
        assert_eq!(highlight("abcdef", &spans(&[(2, 4), (0, 2)]), "<", ">"), "<abcd>ef");
    }

    #[test]
    fn test_disjoint_spans() {
        assert_eq!(
            highlight("foo bar foo", &spans(&[(8, 11), (0, 3)]), "[", "]"),
            "[foo] bar [foo]"
        );
    }

    #[test]
    fn test_empty_markers_identity() {
        let content = "some text with matches in it";
        let s = spans(&[(0, 4), (2, 9), (15, 22), (27, 28)]);
        assert_eq!(highlight(content, &s, "", ""), content);
    }

    #[test]
    fn test_no_spans_identity() {
        assert_eq!(highlight("plain", &[], "<", ">"), "plain");
    }

    #[test]
    fn test_multibyte_boundaries_widened() {
        // é occupies bytes 1..3
        assert_eq!(highlight("héllo", &spans(&[(2, 3)]), "<", ">"), "h<é>llo");
        assert_eq!(highlight("héllo", &spans(&[(0, 2)]), "<", ">"), "<hé>llo");
    }

    #[test]
    fn test_out_of_range_clamped() {
        assert_eq!(highlight("abc", &spans(&[(1, 99)]), "<", ">"), "a<bc>");
        assert_eq!(highlight("abc", &spans(&[(50, 99)]), "<", ">"), "abc");
    }

    #[test]
    fn test_segments() {
        let segments = highlight_segments("a foo b", &spans(&[(2, 5)]));
        assert_eq!(
            segments,
            vec![Segment::Plain("a "), Segment::Match("foo"), Segment::Plain(" b")]
        );
    }

    #[test]
    fn test_snippet_whole_content_when_short() {
        let snippet = extract_snippet(b"short foo", &spans(&[(6, 9)]), 300);
        assert_eq!(snippet.text, "short foo");
        assert_eq!(snippet.spans, spans(&[(6, 9)]));
        assert_eq!(snippet.highlighted("<", ">"), "short <foo>");
    }

    #[test]
    fn test_snippet_window_centred_on_first_match() {
        let content = format!("{}needle{}", "a".repeat(500), "b".repeat(500));
        let snippet = extract_snippet(content.as_bytes(), &spans(&[(500, 506)]), 100);

        assert!(snippet.text.len() <= 100);
        assert!(snippet.text.contains("needle"));
        assert_eq!(snippet.spans.len(), 1);
        let span = snippet.spans[0];
        assert_eq!(&snippet.text[span.start..span.end], "needle");
        assert_eq!(&content[snippet.start..snippet.end], snippet.text);
    }

    #[test]
    fn test_snippet_near_end_stays_full_length() {
        let content = format!("{}tail", "x".repeat(400));
        let snippet = extract_snippet(content.as_bytes(), &spans(&[(400, 404)]), 50);
        assert_eq!(snippet.text.len(), 50);
        assert!(snippet.text.ends_with("tail"));
    }

    #[test]
    fn test_snippet_multibyte_window() {
        let content = "é".repeat(200);
        let snippet = extract_snippet(content.as_bytes(), &spans(&[(200, 202)]), 31);
        assert!(snippet.text.len() <= 31);
        assert!(snippet.text.chars().all(|c| c == 'é'));
    }

    #[test]
    fn test_snippet_zero_length_is_everything() {
        let content = "x".repeat(1000);
        assert_eq!(extract_snippet(content.as_bytes(), &[], 0).text.len(), 1000);
    }

    #[test]
    fn test_snippet_invalid_utf8_keeps_highlight_on_match() {
        let content = b"caf\xe9\xe9\xe9 needle here";
        // "needle" starts at byte 7 of the raw content
        let snippet = extract_snippet(content, &spans(&[(7, 13)]), 300);
        assert_eq!(snippet.highlighted("<", ">"), "caf\u{FFFD}\u{FFFD}\u{FFFD} <needle> here");
        assert_eq!(snippet.segments()[1], Segment::Match("needle"));
    }

    #[test]
    fn test_snippet_invalid_utf8_window() {
        let mut content = vec![0xff; 400];
        content.extend_from_slice(b"needle");
        content.extend(std::iter::repeat(0xfe).take(400));
        let snippet = extract_snippet(&content, &spans(&[(400, 406)]), 40);

        assert_eq!(snippet.end - snippet.start, 40);
        let span = snippet.spans[0];
        assert_eq!(&snippet.text[span.start..span.end], "needle");
    }
}
