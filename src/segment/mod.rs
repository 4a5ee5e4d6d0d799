//! Bounded-length segmentation of messages into posts.
//!
//! A message is a header, a body and two continuation marks. The body is
//! normalized, split into text runs and atomic tokens (links, mail
//! addresses, mentions), then packed greedily into segments whose counted
//! length fits the provider's budget. Every segment is finally wrapped with
//! the header and the marks:
//!
//! ```text
//! 1 post:    header + seg
//! first:     header + seg + continue_mark
//! interior:  header + continued_mark + seg + continue_mark
//! last:      header + continued_mark + seg
//! ```

mod preprocess;
mod token;

use unicode_segmentation::UnicodeSegmentation;

use crate::error::{AppError, Result};
use crate::models::SegmentConfig;

pub use preprocess::Normalizer;
pub use token::{MENTION_MASK, Token, TokenClass, TokenPatterns};
pub(crate) use token::compile;

/// Counts tokens the way the provider does.
pub trait TokenLength: Send + Sync {
    /// Maximum counted length of a single post.
    fn max_length(&self) -> usize;

    /// Counted length of `text`, which belongs to a token of `class`.
    fn length_of(&self, class: TokenClass, text: &str) -> usize;
}

/// Provider length rules: one unit per character, except links which the
/// provider shortens to a fixed length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LengthPolicy {
    pub max_length: usize,
    pub link_length: usize,
}

impl Default for LengthPolicy {
    fn default() -> Self {
        Self {
            max_length: 140,
            link_length: 23,
        }
    }
}

impl TokenLength for LengthPolicy {
    fn max_length(&self) -> usize {
        self.max_length
    }

    fn length_of(&self, class: TokenClass, text: &str) -> usize {
        match class {
            TokenClass::Link => self.link_length,
            TokenClass::Text | TokenClass::Mail | TokenClass::Mention => text.chars().count(),
        }
    }
}

/// Splits messages into provider-sized posts.
#[derive(Debug, Clone)]
pub struct Segmenter<L = LengthPolicy> {
    length: L,
    normalizer: Normalizer,
    patterns: TokenPatterns,
}

impl Segmenter<LengthPolicy> {
    /// Create a segmenter from the `[segment]` configuration.
    pub fn from_config(config: &SegmentConfig) -> Result<Self> {
        Self::new(LengthPolicy {
            max_length: config.max_length,
            link_length: config.link_length,
        })
    }
}

impl<L: TokenLength> Segmenter<L> {
    pub fn new(length: L) -> Result<Self> {
        Ok(Self {
            length,
            normalizer: Normalizer::new()?,
            patterns: TokenPatterns::new()?,
        })
    }

    pub fn max_length(&self) -> usize {
        self.length.max_length()
    }

    /// Counted length of arbitrary text.
    pub fn counted_len(&self, text: &str) -> usize {
        self.patterns
            .tokenize(text)
            .iter()
            .map(|t| self.length.length_of(t.class, &t.text))
            .sum()
    }

    /// Normalize and tokenize a body. Mentions come back masked.
    pub fn tokenize(&self, body: &str) -> Vec<Token> {
        self.patterns.tokenize(&self.normalizer.normalize(body))
    }

    /// The body as it will appear across the posts, before wrapping.
    pub fn preprocess(&self, body: &str) -> String {
        self.tokenize(body).into_iter().map(|t| t.text).collect()
    }

    /// Split a message into wrapped posts, in publication order.
    pub fn segment(
        &self,
        header: &str,
        continued_mark: &str,
        body: &str,
        continue_mark: &str,
    ) -> Result<Vec<String>> {
        let header = self.patterns.mask_mentions(header);
        let available = self.available(&header, continued_mark, continue_mark)?;
        let segments = self.pack(&self.tokenize(body), available);
        Ok(wrap(&header, continued_mark, continue_mark, segments))
    }

    /// Body segments for `body`, without header or marks.
    pub fn split_body(
        &self,
        header: &str,
        continued_mark: &str,
        body: &str,
        continue_mark: &str,
    ) -> Result<Vec<String>> {
        let header = self.patterns.mask_mentions(header);
        let available = self.available(&header, continued_mark, continue_mark)?;
        Ok(self.pack(&self.tokenize(body), available))
    }

    fn available(&self, header: &str, continued_mark: &str, continue_mark: &str) -> Result<usize> {
        let used = self.counted_len(header)
            + self.counted_len(continued_mark)
            + self.counted_len(continue_mark);
        let max_length = self.length.max_length();
        if used >= max_length {
            return Err(AppError::NoBudget { used, max_length });
        }
        Ok(max_length - used)
    }

    /// Greedy packing. Text runs are cut between grapheme clusters, atomic
    /// tokens always move whole to the next segment when they do not fit.
    fn pack(&self, tokens: &[Token], available: usize) -> Vec<String> {
        let mut segments = Vec::new();
        let mut buffer = String::new();
        let mut remaining = available;

        for token in tokens {
            if token.is_atomic() {
                let len = self.length.length_of(token.class, &token.text);
                if len <= remaining {
                    buffer.push_str(&token.text);
                    remaining -= len;
                } else {
                    flush(&mut segments, &mut buffer);
                    buffer.push_str(&token.text);
                    // An oversized token still gets a post of its own.
                    remaining = available.saturating_sub(len);
                }
                continue;
            }

            for grapheme in token.text.graphemes(true) {
                if self.length.length_of(TokenClass::Text, grapheme) <= available {
                    self.push_text(grapheme, available, &mut remaining, &mut buffer, &mut segments);
                    continue;
                }
                // A cluster longer than a whole post is cut between chars.
                for (start, ch) in grapheme.char_indices() {
                    let unit = &grapheme[start..start + ch.len_utf8()];
                    self.push_text(unit, available, &mut remaining, &mut buffer, &mut segments);
                }
            }
        }

        flush(&mut segments, &mut buffer);
        segments
    }

    fn push_text(
        &self,
        unit: &str,
        available: usize,
        remaining: &mut usize,
        buffer: &mut String,
        segments: &mut Vec<String>,
    ) {
        let len = self.length.length_of(TokenClass::Text, unit);
        if len > *remaining && !buffer.is_empty() {
            flush(segments, buffer);
            *remaining = available;
        }
        buffer.push_str(unit);
        *remaining = remaining.saturating_sub(len);
        if *remaining == 0 {
            flush(segments, buffer);
            *remaining = available;
        }
    }
}

fn flush(segments: &mut Vec<String>, buffer: &mut String) {
    if !buffer.is_empty() {
        segments.push(std::mem::take(buffer));
    }
}

fn wrap(
    header: &str,
    continued_mark: &str,
    continue_mark: &str,
    segments: Vec<String>,
) -> Vec<String> {
    let count = segments.len();
    if count == 0 {
        return vec![header.to_string()];
    }

    segments
        .into_iter()
        .enumerate()
        .map(|(index, segment)| match (index, count) {
            (_, 1) => format!("{header}{segment}"),
            (0, _) => format!("{header}{segment}{continue_mark}"),
            (i, n) if i + 1 < n => format!("{header}{continued_mark}{segment}{continue_mark}"),
            _ => format!("{header}{continued_mark}{segment}"),
        })
        .collect()
}
