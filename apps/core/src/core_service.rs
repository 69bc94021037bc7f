use std::sync::{Arc, Mutex};

use thiserror::Error;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, info, warn};

use crate::action_executor::{ExecutionSink, LaunchError, LoggingSink};
use crate::action_registry::{
    find_built_in, ACTION_CLEAR_CLIPBOARD_ID, ACTION_OPEN_CONFIG_ID, ACTION_OPEN_LOGS_ID,
    ACTION_RESCAN_FILES_ID,
};
use crate::clipboard_history::{ClipboardHistory, ClipboardProvider};
use crate::config::{validate, Config, ConfigError, ConfigProvider, StaticConfig};
use crate::currency::{CurrencyService, HttpRateFetcher, RateFetcher};
use crate::discovery::{CachedProvider, DiscoveryProvider, FileSystemProvider};
use crate::index_store::{RecentStore, StoreError};
use crate::model::{Payload, SearchItem, SearchResult};
use crate::query_state::{QueryState, Transition};
use crate::search_engine::{SearchEngine, SearchOutcome, SearchSources};

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("launch error: {0}")]
    Launch(#[from] LaunchError),
    #[error("nothing to execute")]
    NothingSelected,
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

/// What the query box should show after an input event.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryView {
    Results(SearchOutcome),
    /// Parameter mode: only the active command, with its parameter applied.
    Command(SearchResult),
    /// A debounced search was scheduled; its results arrive as an update.
    Submitted(u64),
    /// A newer query started before this one could publish.
    Superseded,
    Unchanged,
}

/// The action that was handed to the execution sink, or handled in-process
/// for built-ins.
#[derive(Debug, Clone, PartialEq)]
pub struct Executed {
    pub payload: Payload,
    pub built_in: Option<&'static str>,
}

pub struct CoreServiceBuilder {
    config: Config,
    sink: Option<Arc<dyn ExecutionSink>>,
    rate_fetcher: Option<Arc<dyn RateFetcher>>,
    providers: Vec<Arc<dyn DiscoveryProvider>>,
    rescannable: Vec<Arc<CachedProvider>>,
    recent: Option<Arc<RecentStore>>,
    clipboard: Option<Arc<dyn ClipboardProvider>>,
    clipboard_history: Option<Arc<ClipboardHistory>>,
}

impl CoreServiceBuilder {
    pub fn with_sink(mut self, sink: Arc<dyn ExecutionSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn with_rate_fetcher(mut self, fetcher: Arc<dyn RateFetcher>) -> Self {
        self.rate_fetcher = Some(fetcher);
        self
    }

    pub fn with_provider(mut self, provider: Arc<dyn DiscoveryProvider>) -> Self {
        self.providers.push(provider);
        self
    }

    pub fn with_recent_store(mut self, store: Arc<RecentStore>) -> Self {
        self.providers.push(Arc::clone(&store) as Arc<dyn DiscoveryProvider>);
        self.recent = Some(store);
        self
    }

    pub fn with_clipboard(mut self, clipboard: Arc<dyn ClipboardProvider>) -> Self {
        self.clipboard = Some(clipboard);
        self
    }

    pub fn with_clipboard_history(mut self, history: Arc<ClipboardHistory>) -> Self {
        self.clipboard = Some(Arc::clone(&history) as Arc<dyn ClipboardProvider>);
        self.clipboard_history = Some(history);
        self
    }

    /// Scans the configured application and file roots, opens the launch
    /// history and starts an empty clipboard history.
    pub fn with_runtime_providers(mut self) -> Self {
        let apps = Arc::new(CachedProvider::new(Arc::new(FileSystemProvider::applications(
            self.config.app_roots.clone(),
            self.config.app_scan_limit,
        ))));
        let files = Arc::new(CachedProvider::new(Arc::new(FileSystemProvider::files(
            self.config.file_roots.clone(),
            self.config.file_scan_limit,
            self.config.file_scan_depth,
        ))));
        for provider in [apps, files] {
            self.providers.push(Arc::clone(&provider) as Arc<dyn DiscoveryProvider>);
            self.rescannable.push(provider);
        }

        match RecentStore::open(&self.config.history_db_path, self.config.recent_limit) {
            Ok(store) => self = self.with_recent_store(Arc::new(store)),
            Err(error) => warn!(
                path = %self.config.history_db_path.display(),
                %error,
                "launch history unavailable"
            ),
        }

        if self.config.clipboard_enabled {
            let patterns = self.config.clipboard_exclude_sensitive_patterns.clone();
            self = self.with_clipboard_history(Arc::new(ClipboardHistory::new(patterns)));
        }
        self
    }

    pub fn build(self) -> Result<CoreService, ServiceError> {
        validate(&self.config)?;

        let fetcher = self.rate_fetcher.unwrap_or_else(|| {
            Arc::new(HttpRateFetcher::new(&self.config.currency_api_key)) as Arc<dyn RateFetcher>
        });
        let config: Arc<dyn ConfigProvider> = Arc::new(StaticConfig::new(self.config));
        let mut sources = SearchSources::new(
            Arc::clone(&config),
            Arc::new(CurrencyService::new(fetcher)),
        );
        for provider in self.providers {
            sources = sources.with_provider(provider);
        }
        if let Some(clipboard) = self.clipboard.as_ref() {
            sources = sources.with_clipboard(Arc::clone(clipboard));
        }

        let (engine, updates) = SearchEngine::new(sources);
        Ok(CoreService {
            config,
            engine,
            updates: Mutex::new(Some(updates)),
            state: Mutex::new(QueryState::default()),
            sink: self.sink.unwrap_or_else(|| Arc::new(LoggingSink)),
            rescannable: self.rescannable,
            recent: self.recent,
            clipboard: self.clipboard,
            clipboard_history: self.clipboard_history,
        })
    }
}

pub struct CoreService {
    config: Arc<dyn ConfigProvider>,
    engine: SearchEngine,
    updates: Mutex<Option<UnboundedReceiver<SearchOutcome>>>,
    state: Mutex<QueryState>,
    sink: Arc<dyn ExecutionSink>,
    rescannable: Vec<Arc<CachedProvider>>,
    recent: Option<Arc<RecentStore>>,
    clipboard: Option<Arc<dyn ClipboardProvider>>,
    clipboard_history: Option<Arc<ClipboardHistory>>,
}

impl CoreService {
    pub fn builder(config: Config) -> CoreServiceBuilder {
        CoreServiceBuilder {
            config,
            sink: None,
            rate_fetcher: None,
            providers: Vec::new(),
            rescannable: Vec::new(),
            recent: None,
            clipboard: None,
            clipboard_history: None,
        }
    }

    pub fn config(&self) -> Arc<Config> {
        self.config.snapshot()
    }

    /// Receiver for debounced search outcomes. Only the first caller gets it.
    pub fn take_updates(&self) -> Option<UnboundedReceiver<SearchOutcome>> {
        self.updates.lock().ok().and_then(|mut updates| updates.take())
    }

    pub fn latest_results(&self) -> Option<SearchOutcome> {
        self.engine.current()
    }

    /// Replaces the query text and searches immediately.
    pub async fn search(&self, text: &str) -> QueryView {
        let transition = self.with_state(|state| state.on_text_changed(text));
        self.apply(transition).await
    }

    /// Replaces the query text; the search runs after the debounce interval.
    pub fn type_text(&self, text: &str) -> QueryView {
        match self.with_state(|state| state.on_text_changed(text)) {
            Transition::Search(query) => QueryView::Submitted(self.engine.submit(&query)),
            Transition::Render(result) => QueryView::Command(result),
            Transition::Execute(_) | Transition::Unchanged => QueryView::Unchanged,
        }
    }

    /// Enters parameter mode for the selected command result.
    pub fn tab(&self, index: Option<usize>) -> QueryView {
        let command = self.selected(index).and_then(|result| result.command);
        match self.with_state(|state| state.on_tab(command.as_ref())) {
            Transition::Render(result) => QueryView::Command(result),
            _ => QueryView::Unchanged,
        }
    }

    pub async fn escape(&self) -> QueryView {
        let transition = self.with_state(QueryState::on_escape);
        self.apply(transition).await
    }

    pub async fn backspace(&self) -> QueryView {
        let transition = self.with_state(QueryState::on_backspace);
        self.apply(transition).await
    }

    pub fn set_param(&self, param: &str) -> QueryView {
        match self.with_state(|state| state.on_param_changed(param)) {
            Transition::Render(result) => QueryView::Command(result),
            _ => QueryView::Unchanged,
        }
    }

    /// Executes the active command in parameter mode, otherwise the result
    /// at `index` (the best result when `None`) of the latest outcome.
    pub fn execute(&self, index: Option<usize>) -> Result<Executed, ServiceError> {
        let selected = self.selected(index);
        if let (Some(index), None, false) = (index, selected.as_ref(), self.in_param_mode()) {
            return Err(ServiceError::InvalidRequest(format!("no result at index {index}")));
        }
        let (from_command, transition) = self.with_state(|state| {
            (state.is_param_mode(), state.on_enter(selected.as_ref()))
        });
        let payload = match transition {
            Transition::Execute(payload) => payload,
            _ => return Err(ServiceError::NothingSelected),
        };

        if let Payload::BuiltIn(id) = &payload {
            return self.run_built_in(id);
        }

        self.sink.execute(&payload)?;
        info!(?payload, "executed result");
        if !from_command {
            if let Some(item) = selected.as_ref().and_then(SearchItem::from_result) {
                self.record_launch(&item);
            }
        }
        Ok(Executed {
            payload,
            built_in: None,
        })
    }

    /// Adds text to the clipboard history. Returns false when it was ignored.
    pub fn capture_clipboard(&self, text: &str) -> bool {
        self.clipboard_history
            .as_ref()
            .is_some_and(|history| history.capture(text))
    }

    async fn apply(&self, transition: Transition) -> QueryView {
        match transition {
            Transition::Search(query) => match self.engine.search(&query).await {
                Some(outcome) => QueryView::Results(outcome),
                None => QueryView::Superseded,
            },
            Transition::Render(result) => QueryView::Command(result),
            Transition::Execute(_) | Transition::Unchanged => QueryView::Unchanged,
        }
    }

    fn with_state<T>(&self, update: impl FnOnce(&mut QueryState) -> T) -> T {
        let mut state = match self.state.lock() {
            Ok(state) => state,
            Err(poisoned) => poisoned.into_inner(),
        };
        update(&mut state)
    }

    fn in_param_mode(&self) -> bool {
        self.with_state(|state| state.is_param_mode())
    }

    fn selected(&self, index: Option<usize>) -> Option<SearchResult> {
        let outcome = self.engine.current()?;
        let selected = outcome.results.iter().nth(index.unwrap_or(0)).cloned();
        selected
    }

    fn run_built_in(&self, id: &str) -> Result<Executed, ServiceError> {
        let action = find_built_in(id).ok_or_else(|| LaunchError::UnknownAction(id.to_string()))?;
        let payload = match action.id {
            ACTION_OPEN_LOGS_ID => Some(Payload::OpenDirectory(
                crate::logging::logs_dir().to_string_lossy().into_owned(),
            )),
            ACTION_OPEN_CONFIG_ID => Some(Payload::OpenFile(
                self.config.snapshot().config_path.to_string_lossy().into_owned(),
            )),
            ACTION_CLEAR_CLIPBOARD_ID => {
                if let Some(clipboard) = self.clipboard.as_ref() {
                    clipboard.clear();
                }
                None
            }
            ACTION_RESCAN_FILES_ID => {
                for provider in &self.rescannable {
                    provider.invalidate();
                }
                None
            }
            _ => None,
        };

        info!(action = action.id, "running built-in action");
        match payload {
            Some(payload) => {
                // The target may not exist yet on a fresh install; the sink decides.
                self.sink.execute(&payload)?;
                Ok(Executed {
                    payload,
                    built_in: Some(action.id),
                })
            }
            None => Ok(Executed {
                payload: Payload::BuiltIn(action.id.to_string()),
                built_in: Some(action.id),
            }),
        }
    }

    fn record_launch(&self, item: &SearchItem) {
        let Some(recent) = self.recent.as_ref() else {
            return;
        };
        match recent.record_use(item) {
            Ok(()) => debug!(id = %item.id, "recorded launch"),
            Err(error) => warn!(id = %item.id, %error, "failed to record launch"),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::{CoreService, QueryView, ServiceError};
    use crate::action_executor::{LaunchError, MockExecutionSink};
    use crate::action_registry::ACTION_RESCAN_FILES_ID;
    use crate::config::Config;
    use crate::currency::MockRateFetcher;
    use crate::discovery::AppProvider;
    use crate::model::{Command, CommandType, Payload};

    fn config_with_github() -> Config {
        Config {
            commands: vec![Command::new(
                "gh",
                "GitHub",
                CommandType::Url,
                "https://github.com/search?q={query}",
            )],
            ..Config::default()
        }
    }

    #[tokio::test]
    async fn execute_hands_the_selected_payload_to_the_sink() {
        let mut sink = MockExecutionSink::new();
        sink.expect_execute()
            .withf(|payload| *payload == Payload::CopyText("4".into()))
            .times(1)
            .returning(|_| Ok(()));
        let service = CoreService::builder(Config::default())
            .with_sink(Arc::new(sink))
            .with_rate_fetcher(Arc::new(MockRateFetcher::new()))
            .build()
            .unwrap();

        assert!(matches!(service.search("2+2").await, QueryView::Results(_)));
        let executed = service.execute(None).unwrap();
        assert_eq!(executed.payload, Payload::CopyText("4".into()));
    }

    #[tokio::test]
    async fn sink_errors_surface_as_launch_errors() {
        let mut sink = MockExecutionSink::new();
        sink.expect_execute()
            .returning(|_| Err(LaunchError::Failed("boom".into())));
        let service = CoreService::builder(Config::default())
            .with_sink(Arc::new(sink))
            .with_rate_fetcher(Arc::new(MockRateFetcher::new()))
            .with_provider(Arc::new(AppProvider::deterministic_fixture()))
            .build()
            .unwrap();

        service.search("code").await;
        assert!(matches!(service.execute(None), Err(ServiceError::Launch(_))));
    }

    #[tokio::test]
    async fn tab_on_command_result_enters_param_mode() {
        let mut sink = MockExecutionSink::new();
        sink.expect_execute()
            .withf(|payload| {
                *payload == Payload::OpenUrl("https://github.com/search?q=tokio".into())
            })
            .times(1)
            .returning(|_| Ok(()));
        let service = CoreService::builder(config_with_github())
            .with_sink(Arc::new(sink))
            .with_rate_fetcher(Arc::new(MockRateFetcher::new()))
            .build()
            .unwrap();

        service.search("gh").await;
        assert!(matches!(service.tab(None), QueryView::Command(_)));
        match service.set_param("tokio") {
            QueryView::Command(result) => {
                assert_eq!(result.payload.target(), "https://github.com/search?q=tokio");
            }
            other => panic!("expected command view, got {other:?}"),
        }
        service.execute(None).unwrap();
    }

    #[tokio::test]
    async fn built_ins_run_in_process() {
        let sink = MockExecutionSink::new();
        let service = CoreService::builder(Config::default())
            .with_sink(Arc::new(sink))
            .with_rate_fetcher(Arc::new(MockRateFetcher::new()))
            .build()
            .unwrap();

        service.search("rescan").await;
        let executed = service.execute(None).unwrap();
        assert_eq!(executed.built_in, Some(ACTION_RESCAN_FILES_ID));
    }

    #[test]
    fn execute_without_results_reports_nothing_selected() {
        let service = CoreService::builder(Config::default())
            .with_rate_fetcher(Arc::new(MockRateFetcher::new()))
            .build()
            .unwrap();
        assert!(matches!(service.execute(None), Err(ServiceError::NothingSelected)));
        assert!(matches!(service.execute(Some(3)), Err(ServiceError::InvalidRequest(_))));
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = Config {
            max_results: 1,
            ..Config::default()
        };
        assert!(matches!(
            CoreService::builder(config).build(),
            Err(ServiceError::Config(_))
        ));
    }
}
