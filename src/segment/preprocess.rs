//! Body normalization applied before tokenization.

use regex::Regex;

use super::token::compile;
use crate::error::Result;

/// Trailing boilerplate the board appends to truncated replies.
const READ_MORE: &str = "(省略しています。全て読むにはこのリンクをクリック！)";
const READ_MORE_MARKER: &str = "(省略)";

const ENTITIES: [(&str, &str); 4] = [
    ("&gt;", ">"),
    ("&lt;", "<"),
    ("&quot;", "\""),
    ("&#39;", "'"),
];

/// Quoted content ids (`>>sm123` followed by the id itself on the next line)
/// and the canonical URL each one expands to.
const CROSS_REFERENCES: [(&str, &str); 6] = [
    (r"sm[0-9]{3,}", "http://www.nicovideo.jp/watch/"),
    (r"lv[0-9]{3,}", "http://live.nicovideo.jp/watch/"),
    (r"im[0-9]{3,}", "http://seiga.nicovideo.jp/seiga/"),
    (r"co[0-9]{2,}", "http://com.nicovideo.jp/community/"),
    (r"mg[0-9]{3,}", "http://seiga.nicovideo.jp/watch/"),
    (r"mylist/[0-9]{3,}", "http://www.nicovideo.jp/mylist/"),
];

/// Normalizes markup, line breaks and board-specific renderings.
#[derive(Debug, Clone)]
pub struct Normalizer {
    line_break: Regex,
    tag: Regex,
    trailing_breaks: Regex,
    cross_references: Vec<(Regex, String)>,
}

impl Normalizer {
    pub fn new() -> Result<Self> {
        let cross_references = CROSS_REFERENCES
            .iter()
            .map(|(id, base)| {
                let quoted = format!(r">>({id})\n{id}");
                Ok((compile(&quoted)?, format!("{base}${{1}}")))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            line_break: compile(r"(?i)<br\s*/?>")?,
            tag: compile(r"<[^>]*>")?,
            trailing_breaks: compile(r"\n+$")?,
            cross_references,
        })
    }

    /// Normalize a raw body.
    pub fn normalize(&self, body: &str) -> String {
        let mut text = body.replace("\r\n", "\n").replace('\r', "\n");

        text = self.line_break.replace_all(&text, "\n").into_owned();
        text = self.tag.replace_all(&text, "").into_owned();
        for (entity, replacement) in ENTITIES {
            text = text.replace(entity, replacement);
        }
        text = text.replace("&amp;", "&");

        text = text.replace(READ_MORE, READ_MORE_MARKER);

        for (pattern, replacement) in &self.cross_references {
            text = pattern.replace_all(&text, replacement.as_str()).into_owned();
        }

        self.trailing_breaks.replace(&text, "").into_owned()
    }
}
