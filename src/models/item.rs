//! Harvested items and their processing status.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Processing status of an item.
///
/// Items are harvested as `UNPROCESSED` and end in one of the terminal
/// statuses. `FAILED` is reserved for a bounded-retry policy and is never
/// written by the delivery driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemStatus {
    /// Harvested, not yet published
    #[default]
    Unprocessed,
    /// Rejected by the content filter
    Spam,
    /// The provider already had this exact text
    Duplicate,
    /// Gave up after repeated failures (reserved)
    Failed,
    /// Every post of the item was accepted
    Completed,
}

impl ItemStatus {
    pub const ALL: [ItemStatus; 5] = [
        ItemStatus::Unprocessed,
        ItemStatus::Spam,
        ItemStatus::Duplicate,
        ItemStatus::Failed,
        ItemStatus::Completed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ItemStatus::Unprocessed => "UNPROCESSED",
            ItemStatus::Spam => "SPAM",
            ItemStatus::Duplicate => "DUPLICATE",
            ItemStatus::Failed => "FAILED",
            ItemStatus::Completed => "COMPLETED",
        }
    }

    /// Terminal items are never picked up again.
    pub fn is_terminal(self) -> bool {
        !matches!(self, ItemStatus::Unprocessed)
    }

    /// Whether the lifecycle allows moving from `self` to `next`.
    pub fn can_transition_to(self, next: ItemStatus) -> bool {
        match (self, next) {
            (
                ItemStatus::Unprocessed,
                ItemStatus::Unprocessed
                | ItemStatus::Spam
                | ItemStatus::Duplicate
                | ItemStatus::Failed
                | ItemStatus::Completed,
            ) => true,
            (
                ItemStatus::Spam
                | ItemStatus::Duplicate
                | ItemStatus::Failed
                | ItemStatus::Completed,
                _,
            ) => false,
        }
    }

    /// Check a transition for the item identified by `key`.
    pub fn transition(self, key: &ItemKey, next: ItemStatus) -> Result<ItemStatus> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(AppError::InvalidTransition {
                key: key.to_string(),
                from: self,
                to: next,
            })
        }
    }
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of harvested content.
///
/// The declaration order is the order in which a backlog is delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Reply,
    Broadcast,
    News,
    Video,
}

impl ItemKind {
    pub const ALL: [ItemKind; 4] = [
        ItemKind::Reply,
        ItemKind::Broadcast,
        ItemKind::News,
        ItemKind::Video,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ItemKind::Reply => "reply",
            ItemKind::Broadcast => "broadcast",
            ItemKind::News => "news",
            ItemKind::Video => "video",
        }
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Natural key of an item: destination, kind and the kind's own identity
/// (reply number, news date, broadcast or video link).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemKey {
    pub destination: String,
    pub kind: ItemKind,
    pub id: String,
}

impl fmt::Display for ItemKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.destination, self.kind, self.id)
    }
}

/// Kind-specific display fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ItemContent {
    /// A reply on the community board
    Reply {
        number: u64,
        name: String,
        #[serde(default)]
        date: String,
        /// Poster id shown next to the reply
        #[serde(default)]
        hash: String,
        body: String,
    },
    /// A scheduled live broadcast
    Broadcast {
        link: String,
        community_name: String,
        date: String,
        title: String,
    },
    /// A community news entry
    News {
        community_name: String,
        title: String,
        desc: String,
        date: String,
        #[serde(default)]
        name: Option<String>,
    },
    /// A video uploaded to the community
    Video { title: String, link: String },
}

/// One harvested unit of content destined for a single destination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    /// Destination identifier
    pub destination: String,

    #[serde(flatten)]
    pub content: ItemContent,

    /// Processing status (harvested items start as `UNPROCESSED`)
    #[serde(default)]
    pub status: ItemStatus,
}

impl Item {
    pub fn new(destination: impl Into<String>, content: ItemContent) -> Self {
        Self {
            destination: destination.into(),
            content,
            status: ItemStatus::Unprocessed,
        }
    }

    pub fn kind(&self) -> ItemKind {
        match self.content {
            ItemContent::Reply { .. } => ItemKind::Reply,
            ItemContent::Broadcast { .. } => ItemKind::Broadcast,
            ItemContent::News { .. } => ItemKind::News,
            ItemContent::Video { .. } => ItemKind::Video,
        }
    }

    pub fn key(&self) -> ItemKey {
        let id = match &self.content {
            ItemContent::Reply { number, .. } => number.to_string(),
            ItemContent::News { date, .. } => date.clone(),
            ItemContent::Broadcast { link, .. } | ItemContent::Video { link, .. } => link.clone(),
        };
        ItemKey {
            destination: self.destination.clone(),
            kind: self.kind(),
            id,
        }
    }

    /// Natural ordering field, where the kind has one.
    pub fn sequence(&self) -> Option<u64> {
        match self.content {
            ItemContent::Reply { number, .. } => Some(number),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reply(number: u64) -> Item {
        Item::new(
            "co12345",
            ItemContent::Reply {
                number,
                name: "名無し".to_string(),
                date: "2013/06/01(土) 12:00:00".to_string(),
                hash: "abcd".to_string(),
                body: "こんにちは".to_string(),
            },
        )
    }

    #[test]
    fn test_terminal_statuses_never_transition() {
        for from in ItemStatus::ALL {
            for to in ItemStatus::ALL {
                let allowed = from.can_transition_to(to);
                assert_eq!(allowed, from == ItemStatus::Unprocessed, "{from} -> {to}");
            }
        }
    }

    #[test]
    fn test_transition_error_names_the_item() {
        let key = reply(3).key();
        let err = ItemStatus::Completed
            .transition(&key, ItemStatus::Unprocessed)
            .unwrap_err();
        assert!(err.to_string().contains("co12345/reply/3"));
    }

    #[test]
    fn test_status_serializes_as_upper_case() {
        let s = serde_json::to_string(&ItemStatus::Unprocessed).unwrap();
        assert_eq!(s, "\"UNPROCESSED\"");
    }

    #[test]
    fn test_item_json_shape() {
        let json = r#"{
            "destination": "co1",
            "kind": "video",
            "title": "テスト動画",
            "link": "http://www.nicovideo.jp/watch/sm123456"
        }"#;
        let item: Item = serde_json::from_str(json).unwrap();
        assert_eq!(item.kind(), ItemKind::Video);
        assert_eq!(item.status, ItemStatus::Unprocessed);
        assert_eq!(item.key().id, "http://www.nicovideo.jp/watch/sm123456");
    }

    #[test]
    fn test_reply_key_and_sequence() {
        let item = reply(42);
        assert_eq!(item.key().to_string(), "co12345/reply/42");
        assert_eq!(item.sequence(), Some(42));
    }
}
