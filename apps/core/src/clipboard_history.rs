use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::fuzzy::{match_text, CLIPBOARD_GROUP};
use crate::model::{Payload, ResultType, SearchResult};

const MAX_CLIPBOARD_ENTRIES: usize = 500;
const PREVIEW_CHARS: usize = 96;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClipboardEntry {
    pub id: String,
    pub text: String,
    pub captured_epoch_secs: i64,
}

/// Source of clipboard-history candidates. Newest entry first.
pub trait ClipboardProvider: Send + Sync {
    fn entries(&self) -> Vec<ClipboardEntry>;
    fn clear(&self);
}

pub struct ClipboardHistory {
    entries: Mutex<VecDeque<ClipboardEntry>>,
    sensitive_patterns: Vec<String>,
    next_id: AtomicU64,
}

impl ClipboardHistory {
    pub fn new(sensitive_patterns: Vec<String>) -> Self {
        Self {
            entries: Mutex::new(VecDeque::new()),
            sensitive_patterns,
            next_id: AtomicU64::new(1),
        }
    }

    pub fn capture(&self, raw: &str) -> bool {
        self.capture_at(raw, now_epoch_secs())
    }

    /// Records `raw` unless it is empty, sensitive, or repeats the newest entry.
    pub fn capture_at(&self, raw: &str, epoch_secs: i64) -> bool {
        let text = normalize_clipboard_text(raw);
        if text.is_empty() || is_sensitive_content(&text, &self.sensitive_patterns) {
            return false;
        }

        let Ok(mut entries) = self.entries.lock() else {
            return false;
        };
        if entries.front().is_some_and(|entry| entry.text == text) {
            return false;
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        entries.push_front(ClipboardEntry {
            id: format!("clip-{id}"),
            text,
            captured_epoch_secs: epoch_secs,
        });
        entries.truncate(MAX_CLIPBOARD_ENTRIES);
        true
    }
}

impl ClipboardProvider for ClipboardHistory {
    fn entries(&self) -> Vec<ClipboardEntry> {
        self.entries
            .lock()
            .map(|entries| entries.iter().cloned().collect())
            .unwrap_or_default()
    }

    fn clear(&self) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.clear();
        }
    }
}

pub fn search_history(
    provider: &dyn ClipboardProvider,
    query: &str,
    now_epoch_secs: i64,
) -> Vec<SearchResult> {
    provider
        .entries()
        .into_iter()
        .filter_map(|entry| {
            let preview = preview_text(&entry.text, PREVIEW_CHARS);
            let found = match_text(query, &preview)?;
            let subtitle = format!(
                "Copied {}",
                relative_age(entry.captured_epoch_secs, now_epoch_secs)
            );
            Some(
                SearchResult::new(
                    preview,
                    subtitle,
                    CLIPBOARD_GROUP,
                    ResultType::ClipboardEntry,
                    Payload::PasteClipboard(entry.text),
                    found.score,
                )
                .with_matched_indices(found.indices),
            )
        })
        .collect()
}

fn normalize_clipboard_text(input: &str) -> String {
    input
        .replace('\u{0000}', "")
        .replace('\r', "")
        .trim()
        .to_string()
}

fn preview_text(value: &str, max_chars: usize) -> String {
    let single_line = value.replace('\n', " ").trim().to_string();
    single_line.chars().take(max_chars).collect()
}

fn is_sensitive_content(value: &str, patterns: &[String]) -> bool {
    let lowered = value.to_ascii_lowercase();
    patterns.iter().any(|pattern| {
        let p = pattern.trim().to_ascii_lowercase();
        !p.is_empty() && lowered.contains(&p)
    })
}

fn relative_age(captured_epoch_secs: i64, now: i64) -> String {
    let age = now.saturating_sub(captured_epoch_secs);
    if age < 60 {
        return "just now".to_string();
    }
    if age < 3600 {
        return format!("{}m ago", age / 60);
    }
    if age < 86_400 {
        return format!("{}h ago", age / 3600);
    }
    format!("{}d ago", age / 86_400)
}

pub fn now_epoch_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}
