// src/pipeline/compose.rs

//! Builds the message of an item from the configured templates.

use crate::models::{Item, ItemContent, SegmentConfig, TemplateConfig};

/// Everything the segmenter needs to publish one item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub header: String,
    pub continued_mark: String,
    pub body: String,
    pub continue_mark: String,
}

/// Per-kind message builder.
#[derive(Debug, Clone)]
pub struct Composer {
    templates: TemplateConfig,
    continued_mark: String,
    continue_mark: String,
}

impl Composer {
    pub fn new(templates: &TemplateConfig, segment: &SegmentConfig) -> Self {
        Self {
            templates: templates.clone(),
            continued_mark: segment.continued_mark.clone(),
            continue_mark: segment.continue_mark.clone(),
        }
    }

    pub fn compose(&self, item: &Item) -> Message {
        let t = &self.templates;
        let (header, body) = match &item.content {
            ItemContent::Reply {
                number,
                name,
                date,
                hash,
                body,
            } => {
                let number = number.to_string();
                let vars = [
                    ("name", name.as_str()),
                    ("number", number.as_str()),
                    ("date", date.as_str()),
                    ("hash", hash.as_str()),
                ];
                (render(&t.reply_header, &vars), body.clone())
            }
            ItemContent::Broadcast {
                link,
                community_name,
                date,
                title,
            } => {
                let vars = [
                    ("community_name", community_name.as_str()),
                    ("title", title.as_str()),
                    ("date", date.as_str()),
                    ("link", link.as_str()),
                ];
                (
                    render(&t.broadcast_header, &vars),
                    render(&t.broadcast_body, &vars),
                )
            }
            ItemContent::News {
                community_name,
                title,
                desc,
                date,
                name,
            } => {
                let vars = [
                    ("community_name", community_name.as_str()),
                    ("title", title.as_str()),
                    ("name", name.as_deref().unwrap_or_default()),
                    ("date", date.as_str()),
                ];
                (render(&t.news_header, &vars), desc.clone())
            }
            ItemContent::Video { title, link } => {
                let vars = [("title", title.as_str()), ("link", link.as_str())];
                (render(&t.video_header, &vars), render(&t.video_body, &vars))
            }
        };

        Message {
            header,
            continued_mark: self.continued_mark.clone(),
            body,
            continue_mark: self.continue_mark.clone(),
        }
    }
}

/// Substitute `{name}` placeholders. Unknown placeholders are left as is.
fn render(template: &str, vars: &[(&str, &str)]) -> String {
    vars.iter().fold(template.to_string(), |acc, (key, value)| {
        acc.replace(&format!("{{{key}}}"), value)
    })
}
