//! Tokenization of message bodies into text runs and atomic tokens.

use regex::Regex;

use crate::error::{AppError, Result};

// Character classes are spelled out in ASCII so that a link or address
// running into surrounding Japanese text stops at the first non-ASCII char.
const LINK: &str = r"https?://[A-Za-z0-9_/:%#$&?()~.=+\-]+";
const SHORT_LINK: &str = r"goo\.gl/[A-Za-z0-9_/:%#$&?()~.=+\-]+";
const MAIL: &str = r"[A-Za-z0-9_!#$%&'*+/=?^{}\\|~-]+(?:\.[A-Za-z0-9_!#$%&'*+/=?^{}\\|~-]+)*@(?:[A-Za-z0-9_][A-Za-z0-9_-]*\.)+[A-Za-z0-9_][A-Za-z0-9_-]*";
const MENTION: &str = r"[@＠][A-Za-z0-9_]{1,15}";
const MENTION_CAPTURE: &str = r"[@＠]([A-Za-z0-9_]{1,15})";

/// Replaces the mention sigil so the provider does not notify the account.
pub const MENTION_MASK: char = '%';

/// Class of a token, which decides how it is counted and whether it may be
/// split across posts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenClass {
    /// Plain text, splittable anywhere between grapheme clusters
    Text,
    /// A link the provider shortens to a fixed length
    Link,
    /// An e-mail address
    Mail,
    /// An account mention (already masked)
    Mention,
}

/// A piece of a message body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub class: TokenClass,
    pub text: String,
}

impl Token {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            class: TokenClass::Text,
            text: text.into(),
        }
    }

    /// Atomic tokens are never split across posts.
    pub fn is_atomic(&self) -> bool {
        self.class != TokenClass::Text
    }
}

/// Compiled token patterns.
#[derive(Debug, Clone)]
pub struct TokenPatterns {
    atomic: Regex,
    mention: Regex,
}

impl TokenPatterns {
    pub fn new() -> Result<Self> {
        let atomic = format!(
            "(?P<link>{LINK})|(?P<short>{SHORT_LINK})|(?P<mail>{MAIL})|(?P<mention>{MENTION})"
        );
        Ok(Self {
            atomic: compile(&atomic)?,
            mention: compile(MENTION_CAPTURE)?,
        })
    }

    /// Split `text` into alternating text runs and atomic tokens.
    ///
    /// The alternation is leftmost-first, so at a given position links win
    /// over shortener links, which win over mail addresses and mentions.
    /// Only mention tokens are masked; the `@` of a mail address is kept.
    pub fn tokenize(&self, text: &str) -> Vec<Token> {
        let mut tokens = Vec::new();
        let mut last = 0;

        for caps in self.atomic.captures_iter(text) {
            let Some(whole) = caps.get(0) else {
                continue;
            };
            if whole.start() > last {
                tokens.push(Token::text(&text[last..whole.start()]));
            }

            let (class, token_text) = if caps.name("link").is_some() || caps.name("short").is_some()
            {
                (TokenClass::Link, whole.as_str().to_string())
            } else if caps.name("mail").is_some() {
                (TokenClass::Mail, whole.as_str().to_string())
            } else {
                (TokenClass::Mention, mask_sigil(whole.as_str()))
            };
            tokens.push(Token {
                class,
                text: token_text,
            });
            last = whole.end();
        }

        if last < text.len() {
            tokens.push(Token::text(&text[last..]));
        }
        tokens
    }

    /// Mask every mention in free text such as a header.
    pub fn mask_mentions(&self, text: &str) -> String {
        self.mention
            .replace_all(text, format!("{MENTION_MASK}${{1}}").as_str())
            .into_owned()
    }
}

fn mask_sigil(mention: &str) -> String {
    let mut chars = mention.chars();
    chars.next();
    let mut masked = String::with_capacity(mention.len());
    masked.push(MENTION_MASK);
    masked.push_str(chars.as_str());
    masked
}

pub(crate) fn compile(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|e| AppError::pattern(pattern, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classes(tokens: &[Token]) -> Vec<TokenClass> {
        tokens.iter().map(|t| t.class).collect()
    }

    #[test]
    fn test_tokenize_mixed_body() {
        let patterns = TokenPatterns::new().unwrap();
        let tokens = patterns.tokenize(
            "あるhttp://example.com/aaaaaaaaa/bbbbbbbbbbところに、test@example.comを持っている百姓が@testありました。",
        );

        assert_eq!(
            classes(&tokens),
            vec![
                TokenClass::Text,
                TokenClass::Link,
                TokenClass::Text,
                TokenClass::Mail,
                TokenClass::Text,
                TokenClass::Mention,
                TokenClass::Text,
            ]
        );
        assert_eq!(tokens[1].text, "http://example.com/aaaaaaaaa/bbbbbbbbbb");
        assert_eq!(tokens[3].text, "test@example.com");
        assert_eq!(tokens[5].text, "%test");
    }

    #[test]
    fn test_link_stops_at_non_ascii() {
        let patterns = TokenPatterns::new().unwrap();
        let tokens = patterns.tokenize("http://example.comあります");
        assert_eq!(tokens[0].text, "http://example.com");
        assert_eq!(tokens[1].text, "あります");
    }

    #[test]
    fn test_short_link_is_a_link() {
        let patterns = TokenPatterns::new().unwrap();
        let tokens = patterns.tokenize("谷津駅 [goo.gl/JGdbXl]");
        assert_eq!(tokens[1].class, TokenClass::Link);
        assert_eq!(tokens[1].text, "goo.gl/JGdbXl");
    }

    #[test]
    fn test_full_width_mention_is_masked() {
        let patterns = TokenPatterns::new().unwrap();
        let tokens = patterns.tokenize("＠abc");
        assert_eq!(tokens, vec![Token {
            class: TokenClass::Mention,
            text: "%abc".to_string(),
        }]);
    }

    #[test]
    fn test_mask_mentions_in_header() {
        let patterns = TokenPatterns::new().unwrap();
        assert_eq!(patterns.mask_mentions("(@user)\n"), "(%user)\n");
        assert_eq!(patterns.mask_mentions("(＠user)\n"), "(%user)\n");
        assert_eq!(patterns.mask_mentions("(名無し)\n"), "(名無し)\n");
    }

    #[test]
    fn test_plain_text_is_single_run() {
        let patterns = TokenPatterns::new().unwrap();
        let tokens = patterns.tokenize("ただの文章です。");
        assert_eq!(tokens, vec![Token::text("ただの文章です。")]);
    }
}
