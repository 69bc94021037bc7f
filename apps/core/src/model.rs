use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

pub const DEFAULT_PARAM_PLACEHOLDER: &str = "{query}";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandType {
    Url,
    Program,
    Shell,
    Directory,
    Calculator,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Command {
    pub id: String,
    pub keyword: String,
    pub display_name: String,
    #[serde(rename = "type")]
    pub command_type: CommandType,
    pub path_template: String,
    pub param_placeholder: String,
    pub group_id: String,
    pub enabled: bool,
    pub hotkey: Option<String>,
}

impl Default for Command {
    fn default() -> Self {
        Self {
            id: String::new(),
            keyword: String::new(),
            display_name: String::new(),
            command_type: CommandType::Url,
            path_template: String::new(),
            param_placeholder: DEFAULT_PARAM_PLACEHOLDER.to_string(),
            group_id: String::new(),
            enabled: true,
            hotkey: None,
        }
    }
}

impl Command {
    pub fn new(
        keyword: &str,
        display_name: &str,
        command_type: CommandType,
        path_template: &str,
    ) -> Self {
        Self {
            id: keyword.to_string(),
            keyword: keyword.to_string(),
            display_name: display_name.to_string(),
            command_type,
            path_template: path_template.to_string(),
            ..Self::default()
        }
    }

    pub fn with_group(mut self, group_id: &str) -> Self {
        self.group_id = group_id.to_string();
        self
    }

    /// A command takes a deferred argument when its template carries the placeholder.
    pub fn accepts_param(&self) -> bool {
        !self.param_placeholder.is_empty() && self.path_template.contains(&self.param_placeholder)
    }

    pub fn title(&self) -> &str {
        if self.display_name.trim().is_empty() {
            &self.keyword
        } else {
            &self.display_name
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultType {
    CustomCommand,
    BuiltInCommand,
    Application,
    File,
    Calculator,
    UnitConversion,
    CurrencyConversion,
    ColorConversion,
    TextTool,
    ClipboardEntry,
}

impl ResultType {
    /// Tie-break rank among equal scores; lower sorts first.
    pub fn priority(self) -> u8 {
        match self {
            Self::CustomCommand => 0,
            Self::BuiltInCommand => 1,
            Self::Application => 2,
            Self::File => 3,
            Self::Calculator => 4,
            Self::UnitConversion => 5,
            Self::CurrencyConversion => 6,
            Self::ColorConversion => 7,
            Self::TextTool => 8,
            Self::ClipboardEntry => 9,
        }
    }
}

/// Resolved action handed to the execution collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "action", content = "target", rename_all = "snake_case")]
pub enum Payload {
    OpenUrl(String),
    LaunchProgram(String),
    RunShell(String),
    OpenDirectory(String),
    OpenFile(String),
    Calculator(String),
    CopyText(String),
    PasteClipboard(String),
    ShowQr(String),
    BuiltIn(String),
}

impl Payload {
    pub fn target(&self) -> &str {
        match self {
            Self::OpenUrl(value)
            | Self::LaunchProgram(value)
            | Self::RunShell(value)
            | Self::OpenDirectory(value)
            | Self::OpenFile(value)
            | Self::Calculator(value)
            | Self::CopyText(value)
            | Self::PasteClipboard(value)
            | Self::ShowQr(value)
            | Self::BuiltIn(value) => value,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub subtitle: String,
    pub group_label: String,
    pub result_type: ResultType,
    pub payload: Payload,
    pub score: f64,
    pub matched_indices: BTreeSet<usize>,
    /// Keyword of the command this result was built from, if any.
    pub keyword: Option<String>,
    pub accepts_param: bool,
    /// Keywords may repeat across commands, so the source command travels
    /// with the result.
    #[serde(skip)]
    pub command: Option<Command>,
}

impl SearchResult {
    pub fn new(
        title: impl Into<String>,
        subtitle: impl Into<String>,
        group_label: impl Into<String>,
        result_type: ResultType,
        payload: Payload,
        score: f64,
    ) -> Self {
        Self {
            title: title.into(),
            subtitle: subtitle.into(),
            group_label: group_label.into(),
            result_type,
            payload,
            score,
            matched_indices: BTreeSet::new(),
            keyword: None,
            accepts_param: false,
            command: None,
        }
    }

    pub fn with_matched_indices(mut self, indices: impl IntoIterator<Item = usize>) -> Self {
        let limit = self.title.chars().count();
        self.matched_indices = indices.into_iter().filter(|index| *index < limit).collect();
        self
    }

    pub fn with_command(mut self, command: &Command) -> Self {
        self.keyword = Some(command.keyword.clone());
        self.accepts_param = command.accepts_param();
        self.command = Some(command.clone());
        self
    }
}

/// User-visible notice attached to a search outcome. Never blocks results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum Warning {
    CurrencyConfigurationMissing,
    CurrencyUnavailable(String),
}

impl Warning {
    pub fn message(&self) -> String {
        match self {
            Self::CurrencyConfigurationMissing => {
                "Currency conversion needs an exchange-rate API key in the config.".to_string()
            }
            Self::CurrencyUnavailable(reason) => {
                format!("Exchange rates are unavailable right now: {reason}")
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    Application,
    File,
    Folder,
}

impl ItemKind {
    fn id_prefix(self) -> &'static str {
        match self {
            Self::Application => "app",
            Self::File => "file",
            Self::Folder => "dir",
        }
    }
}

/// Candidate entry produced by an application or file enumerator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchItem {
    pub id: String,
    pub kind: ItemKind,
    pub title: String,
    pub path: String,
}

impl SearchItem {
    pub fn new(id: &str, kind: ItemKind, title: &str, path: &str) -> Self {
        Self::from_owned(id.to_string(), kind, title.to_string(), path.to_string())
    }

    pub fn from_owned(id: String, kind: ItemKind, title: String, path: String) -> Self {
        Self {
            id,
            kind,
            title,
            path,
        }
    }

    /// Builds an item whose id is derived from its kind and path, so the same
    /// file discovered twice keeps one launch-history row.
    pub fn at_path(kind: ItemKind, title: String, path: String) -> Self {
        Self::from_owned(format!("{}:{path}", kind.id_prefix()), kind, title, path)
    }

    /// Recovers the launchable item behind an application or file result.
    pub fn from_result(result: &SearchResult) -> Option<Self> {
        let (kind, path) = match (&result.result_type, &result.payload) {
            (ResultType::Application, Payload::LaunchProgram(path)) => (ItemKind::Application, path),
            (ResultType::File, Payload::OpenFile(path)) => (ItemKind::File, path),
            (ResultType::File, Payload::OpenDirectory(path)) => (ItemKind::Folder, path),
            _ => return None,
        };
        Some(Self::at_path(kind, result.title.clone(), path.clone()))
    }

    pub fn result_type(&self) -> ResultType {
        match self.kind {
            ItemKind::Application => ResultType::Application,
            ItemKind::File | ItemKind::Folder => ResultType::File,
        }
    }

    pub fn payload(&self) -> Payload {
        match self.kind {
            ItemKind::Application => Payload::LaunchProgram(self.path.clone()),
            ItemKind::File => Payload::OpenFile(self.path.clone()),
            ItemKind::Folder => Payload::OpenDirectory(self.path.clone()),
        }
    }
}

/// Case-folds one char at a time so offsets stay aligned with the source text.
pub fn fold_chars(input: &str) -> Vec<char> {
    input
        .chars()
        .map(|c| c.to_lowercase().next().unwrap_or(c))
        .collect()
}
