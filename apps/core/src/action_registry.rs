use crate::config::{Config, WebSearchProvider};
use crate::model::{Command, CommandType, Payload};
use crate::text_tools::percent_encode;

pub const ACTION_OPEN_LOGS_ID: &str = "__quickbar_action_open_logs__";
pub const ACTION_RESCAN_FILES_ID: &str = "__quickbar_action_rescan_files__";
pub const ACTION_CLEAR_CLIPBOARD_ID: &str = "__quickbar_action_clear_clipboard__";
pub const ACTION_OPEN_CONFIG_ID: &str = "__quickbar_action_open_config__";

#[derive(Debug, Clone, Copy)]
pub struct BuiltInCommand {
    pub id: &'static str,
    pub title: &'static str,
    pub subtitle: &'static str,
    pub keywords: &'static [&'static str],
}

pub fn built_in_commands() -> &'static [BuiltInCommand] {
    &[
        BuiltInCommand {
            id: ACTION_OPEN_LOGS_ID,
            title: "Open Logs Folder",
            subtitle: "Open the QuickBar logs directory",
            keywords: &["logs", "log", "debug"],
        },
        BuiltInCommand {
            id: ACTION_RESCAN_FILES_ID,
            title: "Rescan Files",
            subtitle: "Refresh applications and files on the next search",
            keywords: &["rescan", "reindex", "refresh"],
        },
        BuiltInCommand {
            id: ACTION_CLEAR_CLIPBOARD_ID,
            title: "Clear Clipboard History",
            subtitle: "Delete local clipboard history entries",
            keywords: &["clipboard", "clear", "history"],
        },
        BuiltInCommand {
            id: ACTION_OPEN_CONFIG_ID,
            title: "Open Config",
            subtitle: "Open the QuickBar configuration file",
            keywords: &["config", "settings", "preferences"],
        },
    ]
}

pub fn find_built_in(id: &str) -> Option<&'static BuiltInCommand> {
    built_in_commands().iter().find(|action| action.id == id)
}

/// Substitutes `param` into the command template and maps the command type to
/// the payload the execution sink understands.
pub fn resolve_command_payload(command: &Command, param: &str) -> Payload {
    let param = param.trim();
    let substitute = |value: &str| {
        if command.accepts_param() {
            command
                .path_template
                .replace(&command.param_placeholder, value)
        } else {
            command.path_template.clone()
        }
    };

    match command.command_type {
        CommandType::Url => Payload::OpenUrl(substitute(&percent_encode(param, false))),
        CommandType::Program => Payload::LaunchProgram(substitute(param)),
        CommandType::Shell => Payload::RunShell(substitute(param)),
        CommandType::Directory => Payload::OpenDirectory(substitute(param)),
        CommandType::Calculator => Payload::Calculator(substitute(param)),
    }
}

pub fn provider_web_search_url(cfg: &Config, query: &str) -> Option<String> {
    let encoded = percent_encode(query.trim(), true);
    let url = match cfg.web_search_provider {
        WebSearchProvider::Duckduckgo => format!("https://duckduckgo.com/?q={encoded}"),
        WebSearchProvider::Google => format!("https://www.google.com/search?q={encoded}"),
        WebSearchProvider::Bing => format!("https://www.bing.com/search?q={encoded}"),
        WebSearchProvider::Brave => format!("https://search.brave.com/search?q={encoded}"),
        WebSearchProvider::Startpage => {
            format!("https://www.startpage.com/sp/search?query={encoded}")
        }
        WebSearchProvider::Ecosia => format!("https://www.ecosia.org/search?q={encoded}"),
        WebSearchProvider::Yahoo => format!("https://search.yahoo.com/search?p={encoded}"),
        WebSearchProvider::Custom => {
            let template = cfg.web_search_custom_template.trim();
            if template.is_empty() || !template.contains("{query}") {
                return None;
            }
            template.replace("{query}", &encoded)
        }
    };
    Some(url)
}
