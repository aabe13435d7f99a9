use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// One feed item. Identity is its position in the feed, which never changes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ReelRecord {
    #[serde(alias = "video")]
    pub video_source: String,
    #[serde(default, alias = "userProfile")]
    pub user_profile_image: String,
    pub username: String,
    #[serde(default)]
    pub caption: String,
    #[serde(default)]
    pub is_liked: bool,
    #[serde(default)]
    pub is_followed: bool,
    #[serde(default)]
    pub like_count: u64,
    #[serde(default)]
    pub comment_count: u64,
    #[serde(default)]
    pub share_count: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum InitError {
    #[error("reels list not found; define a `reels` sequence in the feed file")]
    MissingRecords,
    #[error("reels must be an ordered sequence, found {0}")]
    NotASequence(&'static str),
    #[error("reel {index} is malformed: {source}")]
    MalformedRecord {
        index: usize,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("feed container not found in the terminal layout")]
    MissingMount,
    #[error("failed to read feed file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse feed file: {0}")]
    Syntax(#[from] serde_yaml::Error),
}

/// Reel records plus the index of the reel that is currently active.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedState {
    records: Vec<ReelRecord>,
    current: Option<usize>,
}

impl FeedState {
    /// Takes ownership of the records. The feed starts with no current reel;
    /// the navigator activates the first one once the view is mounted.
    pub fn new(records: Vec<ReelRecord>) -> Self {
        Self {
            records,
            current: None,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[ReelRecord] {
        &self.records
    }

    pub fn record(&self, index: usize) -> Option<&ReelRecord> {
        self.records.get(index)
    }

    pub fn current(&self) -> Option<usize> {
        self.current
    }

    /// Returns false and leaves the state alone when `index` is out of range.
    pub fn set_current(&mut self, index: usize) -> bool {
        if index >= self.records.len() {
            return false;
        }
        self.current = Some(index);
        true
    }

    /// Flips `is_liked` and moves `like_count` by one in the same direction,
    /// never below zero. Returns the new liked flag.
    pub fn toggle_like(&mut self, index: usize) -> Option<bool> {
        let record = self.records.get_mut(index)?;
        if record.is_liked {
            record.is_liked = false;
            record.like_count = record.like_count.saturating_sub(1);
        } else {
            record.is_liked = true;
            record.like_count = record.like_count.saturating_add(1);
        }
        Some(record.is_liked)
    }

    /// Flips `is_followed`. Returns the new flag.
    pub fn toggle_follow(&mut self, index: usize) -> Option<bool> {
        let record = self.records.get_mut(index)?;
        record.is_followed = !record.is_followed;
        Some(record.is_followed)
    }
}

/// Parses a feed document. Accepts either a top-level sequence or a mapping
/// with a `reels` key; YAML is a superset of JSON so both formats work.
pub fn parse_records(source: &str) -> Result<Vec<ReelRecord>, InitError> {
    let document: serde_yaml::Value = serde_yaml::from_str(source)?;
    let reels = match document {
        serde_yaml::Value::Mapping(mut map) => map
            .remove("reels")
            .ok_or(InitError::MissingRecords)?,
        serde_yaml::Value::Null => return Err(InitError::MissingRecords),
        other => other,
    };
    let items = match reels {
        serde_yaml::Value::Sequence(items) => items,
        other => return Err(InitError::NotASequence(value_kind(&other))),
    };
    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            serde_yaml::from_value(item)
                .map_err(|source| InitError::MalformedRecord { index, source })
        })
        .collect()
}

pub fn load_file(path: &Path) -> Result<Vec<ReelRecord>, InitError> {
    let data = fs::read_to_string(path).map_err(|source| InitError::Read {
        path: path.display().to_string(),
        source,
    })?;
    parse_records(&data)
}

fn value_kind(value: &serde_yaml::Value) -> &'static str {
    match value {
        serde_yaml::Value::Null => "null",
        serde_yaml::Value::Bool(_) => "a boolean",
        serde_yaml::Value::Number(_) => "a number",
        serde_yaml::Value::String(_) => "a string",
        serde_yaml::Value::Sequence(_) => "a sequence",
        serde_yaml::Value::Mapping(_) => "a mapping",
        serde_yaml::Value::Tagged(_) => "a tagged value",
    }
}

pub fn demo_records() -> Vec<ReelRecord> {
    let reel = |video: &str, user: &str, caption: &str, likes, comments, shares| ReelRecord {
        video_source: video.to_string(),
        user_profile_image: format!("https://i.pravatar.cc/150?u={user}"),
        username: user.to_string(),
        caption: caption.to_string(),
        is_liked: false,
        is_followed: false,
        like_count: likes,
        comment_count: comments,
        share_count: shares,
    };
    vec![
        reel(
            "https://storage.googleapis.com/gtv-videos-bucket/sample/ForBiggerBlazes.mp4",
            "ember.studio",
            "First light over the ridge",
            1240,
            88,
            31,
        ),
        reel(
            "https://storage.googleapis.com/gtv-videos-bucket/sample/ForBiggerEscapes.mp4",
            "roam.far",
            "Weekend escape, no plans",
            874,
            42,
            12,
        ),
        reel(
            "https://storage.googleapis.com/gtv-videos-bucket/sample/ForBiggerFun.mp4",
            "tinker.tv",
            "Built this in an afternoon",
            3301,
            210,
            97,
        ),
        reel(
            "https://storage.googleapis.com/gtv-videos-bucket/sample/ForBiggerJoyrides.mp4",
            "laps.daily",
            "Morning loop, 12km",
            56,
            3,
            0,
        ),
    ]
}
