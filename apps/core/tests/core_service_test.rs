use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use quickbar_core::action_executor::RecordingSink;
use quickbar_core::action_registry::ACTION_CLEAR_CLIPBOARD_ID;
use quickbar_core::clipboard_history::ClipboardHistory;
use quickbar_core::config::Config;
use quickbar_core::core_service::{CoreService, QueryView};
use quickbar_core::currency::{RateError, RateFetcher};
use quickbar_core::discovery::{AppProvider, FileProvider};
use quickbar_core::index_store::RecentStore;
use quickbar_core::model::{Command, CommandType, ItemKind, Payload, ResultType, SearchItem};

struct OfflineFetcher;

#[async_trait]
impl RateFetcher for OfflineFetcher {
    async fn fetch(&self, _base: &str) -> Result<HashMap<String, f64>, RateError> {
        Err(RateError::Network("offline".into()))
    }
}

fn config() -> Config {
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

fn service(sink: Arc<RecordingSink>, recent: Arc<RecentStore>) -> CoreService {
    CoreService::builder(config())
        .with_sink(sink)
        .with_rate_fetcher(Arc::new(OfflineFetcher))
        .with_provider(Arc::new(AppProvider::deterministic_fixture()))
        .with_provider(Arc::new(FileProvider::deterministic_fixture()))
        .with_recent_store(recent)
        .build()
        .unwrap()
}

fn best_title(view: &QueryView) -> Option<&str> {
    match view {
        QueryView::Results(outcome) => outcome.results.best().map(|r| r.title.as_str()),
        _ => None,
    }
}

#[tokio::test]
async fn executing_a_file_records_it_in_launch_history() {
    let sink = Arc::new(RecordingSink::default());
    let recent = Arc::new(RecentStore::open_memory(10).unwrap());
    let service = service(sink.clone(), recent.clone());

    let view = service.search("report").await;
    assert_eq!(best_title(&view), Some("Q4_Report.xlsx"));

    let executed = service.execute(None).unwrap();
    let expected = Payload::OpenFile("/home/admin/Documents/Q4_Report.xlsx".into());
    assert_eq!(executed.payload, expected);
    assert_eq!(sink.executed(), vec![expected.clone()]);

    assert_eq!(
        recent
            .use_count("file:/home/admin/Documents/Q4_Report.xlsx")
            .unwrap(),
        1
    );

    let view = service.search("report").await;
    let QueryView::Results(outcome) = view else {
        panic!("expected results");
    };
    let copies = outcome.results.iter().filter(|r| r.payload == expected).count();
    assert_eq!(copies, 1);
}

#[tokio::test]
async fn parameter_mode_round_trip() {
    let sink = Arc::new(RecordingSink::default());
    let service = service(sink.clone(), Arc::new(RecentStore::open_memory(10).unwrap()));

    service.search("gh").await;
    let QueryView::Command(result) = service.tab(None) else {
        panic!("expected parameter mode");
    };
    assert_eq!(result.result_type, ResultType::CustomCommand);

    service.set_param("x");
    assert!(matches!(service.backspace().await, QueryView::Command(_)));
    let view = service.backspace().await;
    assert_eq!(best_title(&view), Some("GitHub"));

    service.tab(None);
    service.set_param("serde json");
    assert!(matches!(service.escape().await, QueryView::Results(_)));

    service.tab(None);
    service.set_param("serde json");
    service.execute(None).unwrap();
    assert_eq!(
        sink.executed(),
        vec![Payload::OpenUrl(
            "https://github.com/search?q=serde%20json".into()
        )]
    );
}

#[tokio::test]
async fn inline_parameter_executes_without_tab() {
    let sink = Arc::new(RecordingSink::default());
    let service = service(sink.clone(), Arc::new(RecentStore::open_memory(10).unwrap()));

    service.search("gh tokio").await;
    service.execute(None).unwrap();
    assert_eq!(
        sink.executed(),
        vec![Payload::OpenUrl("https://github.com/search?q=tokio".into())]
    );
}

#[tokio::test(start_paused = true)]
async fn typed_text_arrives_as_an_update() {
    let service = service(
        Arc::new(RecordingSink::default()),
        Arc::new(RecentStore::open_memory(10).unwrap()),
    );
    let mut updates = service.take_updates().unwrap();
    assert!(service.take_updates().is_none());

    let QueryView::Submitted(first) = service.type_text("te") else {
        panic!("expected submission");
    };
    let QueryView::Submitted(second) = service.type_text("term") else {
        panic!("expected submission");
    };
    assert!(second > first);

    let outcome = updates.recv().await.unwrap();
    assert_eq!(outcome.query_id, second);
    assert_eq!(outcome.results.best().map(|r| r.title.as_str()), Some("Terminal"));
}

#[tokio::test]
async fn clipboard_history_is_searchable_and_clearable() {
    let history = Arc::new(ClipboardHistory::new(vec!["password".into()]));
    let service = CoreService::builder(Config::default())
        .with_sink(Arc::new(RecordingSink::default()))
        .with_rate_fetcher(Arc::new(OfflineFetcher))
        .with_clipboard_history(history)
        .build()
        .unwrap();

    assert!(service.capture_clipboard("hello world snippet"));
    assert!(!service.capture_clipboard("my password is hunter2"));

    let view = service.search("snippet").await;
    let QueryView::Results(outcome) = view else {
        panic!("expected results");
    };
    assert_eq!(
        outcome.results.best().map(|r| r.payload.clone()),
        Some(Payload::PasteClipboard("hello world snippet".into()))
    );

    service.search("clear clipboard").await;
    let executed = service.execute(None).unwrap();
    assert_eq!(executed.built_in, Some(ACTION_CLEAR_CLIPBOARD_ID));

    let view = service.search("snippet").await;
    assert_eq!(best_title(&view), None);
}

#[tokio::test]
async fn parameter_mode_execution_does_not_record_the_row_underneath() {
    let recent = Arc::new(RecentStore::open_memory(10).unwrap());
    let sink = Arc::new(RecordingSink::default());
    let app = SearchItem::at_path(
        ItemKind::Application,
        "cod".to_string(),
        "/apps/cod.desktop".to_string(),
    );
    let service = CoreService::builder(Config {
        commands: vec![Command::new(
            "co",
            "Codeberg",
            CommandType::Url,
            "https://codeberg.org/explore/repos?q={query}",
        )],
        ..Config::default()
    })
    .with_sink(sink.clone())
    .with_rate_fetcher(Arc::new(OfflineFetcher))
    .with_provider(Arc::new(AppProvider::from_apps(vec![app.clone()])))
    .with_recent_store(recent.clone())
    .build()
    .unwrap();

    let view = service.search("cod").await;
    assert_eq!(best_title(&view), Some("cod"));
    let QueryView::Results(outcome) = view else {
        panic!("expected results");
    };
    let codeberg = outcome
        .results
        .iter()
        .position(|r| r.title == "Codeberg")
        .unwrap();
    assert!(codeberg > 0);

    assert!(matches!(service.tab(Some(codeberg)), QueryView::Command(_)));
    service.set_param("rust");
    service.execute(None).unwrap();

    assert_eq!(
        sink.executed(),
        vec![Payload::OpenUrl("https://codeberg.org/explore/repos?q=rust".into())]
    );
    assert_eq!(recent.use_count(&app.id).unwrap(), 0);
}

#[tokio::test]
async fn tab_enters_the_matched_command_when_keywords_repeat() {
    let sink = Arc::new(RecordingSink::default());
    let work = Command {
        id: "work".into(),
        ..Command::new("w", "Work", CommandType::Directory, "/work")
    };
    let wiki = Command {
        id: "wiki".into(),
        ..Command::new(
            "w",
            "Wikipedia",
            CommandType::Url,
            "https://en.wikipedia.org/w/index.php?search={query}",
        )
    };
    let service = CoreService::builder(Config {
        commands: vec![work, wiki],
        ..Config::default()
    })
    .with_sink(sink.clone())
    .with_rate_fetcher(Arc::new(OfflineFetcher))
    .build()
    .unwrap();

    let view = service.search("wikipedia").await;
    assert_eq!(best_title(&view), Some("Wikipedia"));

    let QueryView::Command(active) = service.tab(None) else {
        panic!("expected parameter mode");
    };
    assert_eq!(active.title, "Wikipedia");

    service.set_param("rust");
    service.execute(None).unwrap();
    assert_eq!(
        sink.executed(),
        vec![Payload::OpenUrl(
            "https://en.wikipedia.org/w/index.php?search=rust".into()
        )]
    );
}
