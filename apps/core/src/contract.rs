use serde::{Deserialize, Serialize};

use crate::aggregate::ResultGroup;
use crate::model::{Payload, ResultType, SearchResult, Warning};
use crate::search_engine::SearchOutcome;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QueryRequest {
    pub query: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SelectRequest {
    /// Position in display order; the best result when absent.
    #[serde(default)]
    pub index: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ParamRequest {
    pub param: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClipboardRequest {
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", content = "payload", rename_all = "snake_case")]
pub enum CoreRequest {
    /// Search immediately.
    Search(QueryRequest),
    /// Debounced search; results arrive as a later `results` line.
    Type(QueryRequest),
    Tab(SelectRequest),
    Escape,
    Backspace,
    Param(ParamRequest),
    Execute(SelectRequest),
    Clipboard(ClipboardRequest),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchResultDto {
    pub title: String,
    pub subtitle: String,
    pub kind: ResultType,
    pub action: Payload,
    pub score: f64,
    pub matched_indices: Vec<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keyword: Option<String>,
    pub accepts_param: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResultGroupDto {
    pub label: String,
    pub results: Vec<SearchResultDto>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WarningDto {
    pub warning: Warning,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchResponse {
    pub query_id: u64,
    pub query: String,
    pub groups: Vec<ResultGroupDto>,
    pub warnings: Vec<WarningDto>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CommandResponse {
    pub result: SearchResultDto,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SubmittedResponse {
    pub query_id: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExecuteResponse {
    pub action: Payload,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub built_in: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClipboardResponse {
    pub captured: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", content = "payload", rename_all = "snake_case")]
pub enum CoreResponse {
    Results(SearchResponse),
    Command(CommandResponse),
    Submitted(SubmittedResponse),
    Superseded,
    Unchanged,
    Executed(ExecuteResponse),
    Clipboard(ClipboardResponse),
}

impl From<SearchResult> for SearchResultDto {
    fn from(value: SearchResult) -> Self {
        Self {
            title: value.title,
            subtitle: value.subtitle,
            kind: value.result_type,
            action: value.payload,
            score: value.score,
            matched_indices: value.matched_indices.into_iter().collect(),
            keyword: value.keyword,
            accepts_param: value.accepts_param,
        }
    }
}

impl From<ResultGroup> for ResultGroupDto {
    fn from(value: ResultGroup) -> Self {
        Self {
            label: value.label,
            results: value.results.into_iter().map(SearchResultDto::from).collect(),
        }
    }
}

impl From<Warning> for WarningDto {
    fn from(value: Warning) -> Self {
        Self {
            message: value.message(),
            warning: value,
        }
    }
}

impl From<SearchOutcome> for SearchResponse {
    fn from(value: SearchOutcome) -> Self {
        Self {
            query_id: value.query_id,
            query: value.query,
            groups: value.results.groups.into_iter().map(ResultGroupDto::from).collect(),
            warnings: value.warnings.into_iter().map(WarningDto::from).collect(),
        }
    }
}
