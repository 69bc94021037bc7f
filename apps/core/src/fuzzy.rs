//! Substring and subsequence scoring for commands, built-in actions,
//! discovered items and clipboard entries.
//!
//! Scores live in `0.0..=1.0`: an exact match is `1.0`, a contiguous substring
//! is [`SUBSTRING_SCORE`], and subsequence matches stay strictly below
//! [`SUBSEQUENCE_CEILING`] so they never outrank a contiguous hit.

use crate::action_registry::{resolve_command_payload, BuiltInCommand};
use crate::config::Config;
use crate::model::{fold_chars, Command, Payload, ResultType, SearchItem, SearchResult};

pub const EXACT_SCORE: f64 = 1.0;
pub const SUBSTRING_SCORE: f64 = 0.8;
pub const SUBSEQUENCE_CEILING: f64 = 0.6;

pub const COMMANDS_GROUP: &str = "Commands";
pub const BUILT_IN_GROUP: &str = "Actions";
pub const APPLICATIONS_GROUP: &str = "Applications";
pub const FILES_GROUP: &str = "Files";
pub const CLIPBOARD_GROUP: &str = "Clipboard";

#[derive(Debug, Clone, PartialEq)]
pub struct FuzzyMatch {
    pub score: f64,
    /// Char offsets into the candidate text, ascending.
    pub indices: Vec<usize>,
}

/// Case-insensitive match of `query` against `text`.
pub fn match_text(query: &str, text: &str) -> Option<FuzzyMatch> {
    let needle = fold_chars(query.trim());
    let haystack = fold_chars(text);
    if needle.is_empty() || haystack.is_empty() || needle.len() > haystack.len() {
        return None;
    }

    if needle == haystack {
        return Some(FuzzyMatch {
            score: EXACT_SCORE,
            indices: (0..haystack.len()).collect(),
        });
    }

    if let Some(start) = find_contiguous(&haystack, &needle) {
        return Some(FuzzyMatch {
            score: SUBSTRING_SCORE,
            indices: (start..start + needle.len()).collect(),
        });
    }

    let positions = subsequence_positions(&haystack, &needle)?;
    let span = positions[positions.len() - 1] - positions[0] + 1;
    Some(FuzzyMatch {
        score: SUBSEQUENCE_CEILING * needle.len() as f64 / span as f64,
        indices: positions,
    })
}

fn find_contiguous(haystack: &[char], needle: &[char]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

fn subsequence_positions(haystack: &[char], needle: &[char]) -> Option<Vec<usize>> {
    let mut positions = Vec::with_capacity(needle.len());
    let mut next_start = 0;

    for needle_char in needle {
        let offset = haystack[next_start..]
            .iter()
            .position(|hay_char| hay_char == needle_char)?;
        let absolute = next_start + offset;
        positions.push(absolute);
        next_start = absolute + 1;
    }

    Some(positions)
}

/// Best of the title match and any key match. Highlight offsets always come
/// from the title; a key-only hit highlights nothing.
fn best_match<'a>(
    query: &str,
    title: &str,
    keys: impl IntoIterator<Item = &'a str>,
) -> Option<FuzzyMatch> {
    let title_match = match_text(query, title);
    let best_key = keys
        .into_iter()
        .filter_map(|key| match_text(query, key))
        .map(|found| found.score)
        .fold(None, |best: Option<f64>, score| Some(best.map_or(score, |b| b.max(score))));

    match (title_match, best_key) {
        (Some(title_match), Some(key_score)) if key_score > title_match.score => Some(FuzzyMatch {
            score: key_score,
            indices: title_match.indices,
        }),
        (Some(title_match), _) => Some(title_match),
        (None, Some(key_score)) => Some(FuzzyMatch {
            score: key_score,
            indices: Vec::new(),
        }),
        (None, None) => None,
    }
}

/// Matches configured commands against the query. A query of the form
/// `<keyword> <text>` whose keyword names a parameterized command is an exact
/// hit with `<text>` substituted into the payload.
pub fn match_commands(query: &str, cfg: &Config) -> Vec<SearchResult> {
    let trimmed = query.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }
    let inline = trimmed
        .split_once(char::is_whitespace)
        .map(|(head, tail)| (head, tail.trim()))
        .filter(|(_, tail)| !tail.is_empty());

    cfg.enabled_commands()
        .filter_map(|command| {
            let group = cfg.group_name(&command.group_id).unwrap_or(COMMANDS_GROUP);
            if let Some((head, tail)) = inline {
                if command.accepts_param() && command.keyword.eq_ignore_ascii_case(head) {
                    return Some(command_result(command, group, tail, EXACT_SCORE, Vec::new()));
                }
            }
            let found = best_match(trimmed, command.title(), [command.keyword.as_str()])?;
            Some(command_result(command, group, "", found.score, found.indices))
        })
        .collect()
}

fn command_result(
    command: &Command,
    group: &str,
    param: &str,
    score: f64,
    indices: Vec<usize>,
) -> SearchResult {
    let payload = resolve_command_payload(command, param);
    let subtitle = payload.target().to_string();
    SearchResult::new(
        command.title(),
        subtitle,
        group,
        ResultType::CustomCommand,
        payload,
        score,
    )
    .with_matched_indices(indices)
    .with_command(command)
}

pub fn match_built_ins(query: &str, actions: &[BuiltInCommand]) -> Vec<SearchResult> {
    actions
        .iter()
        .filter_map(|action| {
            let found = best_match(query, action.title, action.keywords.iter().copied())?;
            Some(
                SearchResult::new(
                    action.title,
                    action.subtitle,
                    BUILT_IN_GROUP,
                    ResultType::BuiltInCommand,
                    Payload::BuiltIn(action.id.to_string()),
                    found.score,
                )
                .with_matched_indices(found.indices),
            )
        })
        .collect()
}

/// Matches discovered applications and files by title.
pub fn match_items(query: &str, items: &[SearchItem]) -> Vec<SearchResult> {
    items
        .iter()
        .filter_map(|item| {
            let found = match_text(query, &item.title)?;
            let group = match item.result_type() {
                ResultType::Application => APPLICATIONS_GROUP,
                _ => FILES_GROUP,
            };
            Some(
                SearchResult::new(
                    item.title.clone(),
                    item.path.clone(),
                    group,
                    item.result_type(),
                    item.payload(),
                    found.score,
                )
                .with_matched_indices(found.indices),
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{match_built_ins, match_commands, match_items, match_text, SUBSTRING_SCORE};
    use crate::action_registry::built_in_commands;
    use crate::config::{CommandGroup, Config};
    use crate::model::{Command, CommandType, ItemKind, Payload, ResultType, SearchItem};

    #[test]
    fn exact_match_scores_one() {
        let found = match_text("Record", "record").unwrap();
        assert_eq!(found.score, 1.0);
        assert_eq!(found.indices, vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn contiguous_substring_beats_subsequence() {
        let prefix = match_text("rec", "record").unwrap();
        assert_eq!(prefix.score, SUBSTRING_SCORE);
        assert_eq!(prefix.indices, vec![0, 1, 2]);

        let tightest_fuzzy = match_text("rec", "rxec").unwrap();
        assert!(tightest_fuzzy.score < prefix.score);
        assert_eq!(tightest_fuzzy.indices, vec![0, 2, 3]);
    }

    #[test]
    fn compact_subsequences_score_higher() {
        let compact = match_text("vsc", "visual studio code").unwrap();
        let loose = match_text("vsc", "very slow clock tower").unwrap();
        let close = match_text("abc", "axbxc").unwrap();
        let far = match_text("abc", "axxxxbxxxxc").unwrap();
        assert!(close.score > far.score);
        assert!(compact.score > 0.0 && loose.score > 0.0);
    }

    #[test]
    fn out_of_order_characters_do_not_match() {
        assert!(match_text("cba", "abc").is_none());
        assert!(match_text("xyz", "record").is_none());
        assert!(match_text("", "record").is_none());
    }

    #[test]
    fn indices_are_char_offsets() {
        let found = match_text("é", "café").unwrap();
        assert_eq!(found.indices, vec![3]);
    }

    #[test]
    fn commands_match_keyword_or_title_with_group_labels() {
        let mut cfg = Config::default();
        cfg.groups.push(CommandGroup {
            id: "dev".into(),
            name: "Development".into(),
        });
        cfg.commands.push(
            Command::new("gh", "GitHub", CommandType::Url, "https://github.com/search?q={query}")
                .with_group("dev"),
        );
        cfg.commands.push(Command::new("home", "Home Folder", CommandType::Directory, "/home/me"));

        let results = match_commands("gh", &cfg);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].score, 1.0);
        assert_eq!(results[0].group_label, "Development");
        assert!(results[0].accepts_param);

        let results = match_commands("fold", &cfg);
        assert_eq!(results[0].title, "Home Folder");
        assert_eq!(results[0].group_label, "Commands");
        assert_eq!(results[0].payload, Payload::OpenDirectory("/home/me".into()));
    }

    #[test]
    fn keyword_with_trailing_text_substitutes_param() {
        let mut cfg = Config::default();
        cfg.commands.push(Command::new(
            "gh",
            "GitHub",
            CommandType::Url,
            "https://github.com/search?q={query}",
        ));

        let results = match_commands("gh async trait", &cfg);
        assert_eq!(results.len(), 1);
        assert_eq!(
            results[0].payload,
            Payload::OpenUrl("https://github.com/search?q=async%20trait".into())
        );
    }

    #[test]
    fn disabled_commands_are_skipped() {
        let mut cfg = Config::default();
        let mut command = Command::new("gh", "GitHub", CommandType::Url, "https://github.com");
        command.enabled = false;
        cfg.commands.push(command);
        assert!(match_commands("gh", &cfg).is_empty());
    }

    #[test]
    fn built_ins_match_by_keyword() {
        let results = match_built_ins("logs", built_in_commands());
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].result_type, ResultType::BuiltInCommand);
    }

    #[test]
    fn items_are_grouped_by_kind() {
        let items = vec![
            SearchItem::new("app-code", ItemKind::Application, "Code", "/usr/bin/code"),
            SearchItem::new("file-notes", ItemKind::File, "code-notes.md", "/home/me/code-notes.md"),
        ];
        let results = match_items("code", &items);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].group_label, "Applications");
        assert_eq!(results[0].score, 1.0);
        assert_eq!(results[1].group_label, "Files");
        assert_eq!(results[1].score, SUBSTRING_SCORE);
    }
}
