//! Term matching and word-window snippet extraction.

use crate::error::WikiError;
use crate::models::{GrepMatch, PageContent};
use regex::{Regex, RegexBuilder};
use std::iter;
use std::ops::Range;

/// How many whole words to keep on each side of a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WordWindow {
    pub before: usize,
    pub after: usize,
}

#[derive(Debug, Clone)]
pub struct Matcher {
    pattern: Regex,
    window: WordWindow,
}

impl Matcher {
    /// The term is compiled as-is, so regex syntax in it is honoured.
    pub fn new(term: &str, window: WordWindow) -> Result<Self, WikiError> {
        let pattern = RegexBuilder::new(term).case_insensitive(true).build()?;
        Ok(Self { pattern, window })
    }

    /// Every non-overlapping match in `text`, in order, as a word-window snippet.
    pub fn snippets(&self, text: &str) -> Vec<String> {
        self.pattern
            .find_iter(text)
            .map(|found| {
                extract_window(text, found.range(), self.window.before, self.window.after)
            })
            .collect()
    }

    pub fn scan(&self, page: PageContent) -> GrepMatch {
        let snippets = self.snippets(&page.text);
        GrepMatch {
            page_id: page.page_id,
            title: page.title,
            url: page.url,
            snippets,
        }
    }
}

/// Returns the matched span of `text` with up to `before` words ahead of it and
/// `after` words behind it.
///
/// Non-whitespace characters touching the match stay attached to it and do not
/// count as window words. Near either end of the text fewer words are returned.
pub fn extract_window(text: &str, span: Range<usize>, before: usize, after: usize) -> String {
    let head = &text[..span.start];
    let tail = &text[span.end..];

    let head_split = head.trim_end_matches(|c: char| !c.is_whitespace()).len();
    let (head_words, head_glue) = head.split_at(head_split);
    let tail_split = tail.len() - tail.trim_start_matches(|c: char| !c.is_whitespace()).len();
    let (tail_glue, tail_words) = tail.split_at(tail_split);

    let token = format!("{head_glue}{}{tail_glue}", &text[span]);

    let mut preceding: Vec<&str> = head_words.split_whitespace().rev().take(before).collect();
    preceding.reverse();

    preceding
        .into_iter()
        .chain(iter::once(token.as_str()))
        .chain(tail_words.split_whitespace().take(after))
        .collect::<Vec<_>>()
        .join(" ")
}
