//! Normal / parameter-mode state machine behind the query box.

use crate::action_registry::resolve_command_payload;
use crate::fuzzy::{COMMANDS_GROUP, EXACT_SCORE};
use crate::model::{Command, Payload, ResultType, SearchResult};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Normal,
    Param,
}

/// What the caller must do after a state transition.
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    /// Run the full pipeline for this text.
    Search(String),
    /// Show only the active command with its parameter substituted.
    Render(SearchResult),
    Execute(Payload),
    Unchanged,
}

#[derive(Debug, Clone, Default)]
pub struct QueryState {
    raw_text: String,
    mode: Mode,
    active: Option<Command>,
    command_param: String,
}

impl QueryState {
    pub fn raw_text(&self) -> &str {
        &self.raw_text
    }

    pub fn is_param_mode(&self) -> bool {
        self.mode == Mode::Param
    }

    pub fn command_keyword(&self) -> Option<&str> {
        self.active.as_ref().map(|command| command.keyword.as_str())
    }

    pub fn command_param(&self) -> &str {
        &self.command_param
    }

    pub fn on_text_changed(&mut self, text: &str) -> Transition {
        if self.is_param_mode() {
            let prefix = self
                .command_keyword()
                .map(|keyword| format!("{keyword} "))
                .unwrap_or_default();
            if let Some(param) = text.strip_prefix(&prefix) {
                let param = param.to_string();
                return self.on_param_changed(&param);
            }
            self.leave_param_mode();
        }
        self.raw_text = text.to_string();
        Transition::Search(self.raw_text.clone())
    }

    /// Enters parameter mode for `candidate` when it takes a parameter.
    pub fn on_tab(&mut self, candidate: Option<&Command>) -> Transition {
        if self.is_param_mode() {
            return Transition::Unchanged;
        }
        let Some(command) = candidate.filter(|command| command.accepts_param()) else {
            return Transition::Unchanged;
        };

        self.mode = Mode::Param;
        self.active = Some(command.clone());
        self.command_param.clear();
        self.render()
    }

    pub fn on_escape(&mut self) -> Transition {
        if !self.is_param_mode() {
            return Transition::Unchanged;
        }
        let keyword = self.command_keyword().unwrap_or_default().to_string();
        self.leave_param_mode();
        self.raw_text = keyword;
        Transition::Search(self.raw_text.clone())
    }

    /// Deletes one parameter char, or leaves parameter mode when none remain.
    pub fn on_backspace(&mut self) -> Transition {
        if !self.is_param_mode() {
            return Transition::Unchanged;
        }
        if self.command_param.pop().is_some() {
            return self.render();
        }
        self.on_escape()
    }

    pub fn on_param_changed(&mut self, param: &str) -> Transition {
        if !self.is_param_mode() {
            return Transition::Unchanged;
        }
        self.command_param = param.to_string();
        self.render()
    }

    /// Resolves the payload to execute and returns to normal mode.
    pub fn on_enter(&mut self, selected: Option<&SearchResult>) -> Transition {
        let payload = match (&self.mode, self.active.as_ref()) {
            (Mode::Param, Some(command)) => {
                Some(resolve_command_payload(command, &self.command_param))
            }
            _ => selected.map(|result| result.payload.clone()),
        };
        let Some(payload) = payload else {
            return Transition::Unchanged;
        };

        self.leave_param_mode();
        self.raw_text.clear();
        Transition::Execute(payload)
    }

    fn leave_param_mode(&mut self) {
        self.mode = Mode::Normal;
        self.active = None;
        self.command_param.clear();
    }

    fn render(&mut self) -> Transition {
        let Some(command) = self.active.as_ref() else {
            return Transition::Unchanged;
        };
        self.raw_text = format!("{} {}", command.keyword, self.command_param);
        let payload = resolve_command_payload(command, &self.command_param);
        let result = SearchResult::new(
            command.title(),
            payload.target(),
            COMMANDS_GROUP,
            ResultType::CustomCommand,
            payload.clone(),
            EXACT_SCORE,
        )
        .with_command(command);
        Transition::Render(result)
    }
}

#[cfg(test)]
mod tests {
    use super::{QueryState, Transition};
    use crate::model::{Command, CommandType, Payload, ResultType, SearchResult};

    fn github() -> Command {
        Command::new("gh", "GitHub", CommandType::Url, "https://github.com/search?q={query}")
    }

    fn rendered_target(transition: Transition) -> String {
        match transition {
            Transition::Render(result) => result.payload.target().to_string(),
            other => panic!("expected render, got {other:?}"),
        }
    }

    #[test]
    fn tab_enters_param_mode_only_for_parameterized_commands() {
        let mut state = QueryState::default();
        state.on_text_changed("gh");

        let home = Command::new("home", "Home", CommandType::Directory, "/home/me");
        assert_eq!(state.on_tab(Some(&home)), Transition::Unchanged);
        assert_eq!(state.on_tab(None), Transition::Unchanged);
        assert!(!state.is_param_mode());

        let rendered = rendered_target(state.on_tab(Some(&github())));
        assert_eq!(rendered, "https://github.com/search?q=");
        assert!(state.is_param_mode());
        assert_eq!(state.command_keyword(), Some("gh"));
        assert_eq!(state.raw_text(), "gh ");
    }

    #[test]
    fn param_changes_rerender_without_searching() {
        let mut state = QueryState::default();
        state.on_tab(Some(&github()));

        let rendered = rendered_target(state.on_param_changed("rust lang"));
        assert_eq!(rendered, "https://github.com/search?q=rust%20lang");
        assert_eq!(state.raw_text(), "gh rust lang");

        let rendered = rendered_target(state.on_text_changed("gh tokio"));
        assert_eq!(rendered, "https://github.com/search?q=tokio");
        assert_eq!(state.command_param(), "tokio");
    }

    #[test]
    fn escape_and_backspace_return_to_normal() {
        let mut state = QueryState::default();
        state.on_tab(Some(&github()));
        state.on_param_changed("a");

        assert!(matches!(state.on_backspace(), Transition::Render(_)));
        assert!(state.is_param_mode());
        assert_eq!(state.on_backspace(), Transition::Search("gh".into()));
        assert!(!state.is_param_mode());

        state.on_tab(Some(&github()));
        state.on_param_changed("query");
        assert_eq!(state.on_escape(), Transition::Search("gh".into()));
        assert!(!state.is_param_mode());
        assert_eq!(state.on_escape(), Transition::Unchanged);
    }

    #[test]
    fn editing_away_from_keyword_leaves_param_mode() {
        let mut state = QueryState::default();
        state.on_tab(Some(&github()));
        assert_eq!(state.on_text_changed("firefox"), Transition::Search("firefox".into()));
        assert!(!state.is_param_mode());
    }

    #[test]
    fn enter_executes_substituted_payload_and_resets() {
        let mut state = QueryState::default();
        state.on_tab(Some(&github()));
        state.on_param_changed("serde");
        assert_eq!(
            state.on_enter(None),
            Transition::Execute(Payload::OpenUrl("https://github.com/search?q=serde".into()))
        );
        assert!(!state.is_param_mode());
        assert_eq!(state.raw_text(), "");
    }

    #[test]
    fn enter_in_normal_mode_executes_selection() {
        let mut state = QueryState::default();
        state.on_text_changed("notes");
        let selected = SearchResult::new(
            "notes.txt",
            "/tmp/notes.txt",
            "Files",
            ResultType::File,
            Payload::OpenFile("/tmp/notes.txt".into()),
            0.8,
        );
        assert_eq!(
            state.on_enter(Some(&selected)),
            Transition::Execute(Payload::OpenFile("/tmp/notes.txt".into()))
        );
        assert_eq!(state.on_enter(None), Transition::Unchanged);
    }
}
