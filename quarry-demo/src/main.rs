use std::fs::File;
use std::ops::Range;
use std::sync::Arc;
use std::time::Duration;

use quarry::prelude::*;
use quarry::wakeup;
use simplelog::{Config, LevelFilter, WriteLogger};

const COUNTRIES: &[(&str, &str)] = &[
    ("at", "Austria"),
    ("be", "Belgium"),
    ("ca", "Canada"),
    ("de", "Germany"),
    ("dk", "Denmark"),
    ("fr", "France"),
    ("ge", "Georgia"),
    ("gh", "Ghana"),
    ("gr", "Greece"),
    ("nl", "Netherlands"),
];

/// Country lookup with simulated network latency.
struct CountryProvider {
    latency: Duration,
}

#[async_trait]
impl OptionsProvider<String> for CountryProvider {
    async fn search(&self, query: &str) -> Result<Vec<SearchOption<String>>, ProviderError> {
        tokio::time::sleep(self.latency).await;
        if query.contains('!') {
            return Err(ProviderError::reason("invalid character in query"));
        }
        let query = query.to_lowercase();
        let found = COUNTRIES
            .iter()
            .filter(|(_, name)| name.to_lowercase().starts_with(&query))
            .map(|(code, name)| SearchOption::with_value(*name, code.to_string()))
            .collect();
        Ok(found)
    }
}

/// Prints what a real text input would do.
struct ConsoleInput;

impl InputHost for ConsoleInput {
    fn set_text(&self, text: &str) {
        println!("  [input] text = {text:?}");
    }

    fn set_selection(&self, range: Range<usize>) {
        println!("  [input] selection = {range:?}");
    }
}

fn init_logger() -> Result<(), Box<dyn std::error::Error>> {
    let level = std::env::var("QUARRY_LOG")
        .ok()
        .and_then(|level| level.parse().ok())
        .unwrap_or(LevelFilter::Debug);
    let log_file = File::create("quarry-demo.log")?;
    WriteLogger::init(level, Config::default(), log_file)?;
    Ok(())
}

fn load_config() -> Result<SearchConfig, Box<dyn std::error::Error>> {
    match std::env::args().nth(1) {
        Some(path) => {
            let document = std::fs::read_to_string(&path)?;
            let config = SearchConfig::from_toml_str(&document)?;
            log::info!("loaded config from {path}");
            Ok(config)
        }
        None => Ok(SearchConfig::default().with_debounce_threshold(Duration::from_millis(300))),
    }
}

fn print_snapshot(snapshot: &SearchSnapshot<String>) {
    let shown = match snapshot.view {
        ResultsView::Instructions => "type to search".to_string(),
        ResultsView::DebounceWaiting => String::new(),
        ResultsView::Loading => "loading...".to_string(),
        ResultsView::NoResults => "no results".to_string(),
        ResultsView::Results => snapshot
            .display_results()
            .iter()
            .enumerate()
            .map(|(i, option)| {
                let marker = if snapshot.active_index == Some(i) { ">" } else { " " };
                format!("{marker}{}", option.label)
            })
            .collect::<Vec<_>>()
            .join(", "),
    };
    let selected = snapshot
        .value
        .as_single()
        .map(|option| option.label.as_str())
        .unwrap_or("-");
    println!(
        "  {:<12} {:?} | {shown} | selected: {selected}",
        snapshot.display_text,
        snapshot.view
    );
    if let Some(error) = &snapshot.error {
        println!("  error: {error}");
    }
}

async fn type_slowly(session: &SearchSession<String>, text: &str, pause: Duration) {
    let mut typed = String::new();
    for c in text.chars() {
        typed.push(c);
        println!("key {c:?}");
        session.key_pressed(Key::Char(c));
        session.set_query(typed.as_str());
        tokio::time::sleep(pause).await;
    }
}

async fn settle(session: &SearchSession<String>, rx: &mut WakeupReceiver, wait: Duration) {
    let deadline = tokio::time::Instant::now() + wait;
    while let Ok(Some(changed)) = tokio::time::timeout_at(deadline, rx.recv()).await {
        if changed == session.id() && session.is_dirty() {
            session.clear_dirty();
            print_snapshot(&session.snapshot());
        }
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    init_logger()?;
    let config = load_config()?;
    let wait = config.debounce_threshold * 3;

    let (tx, mut rx) = wakeup::channel();
    let session = SearchSession::builder(OptionsSource::provider(CountryProvider {
        latency: Duration::from_millis(120),
    }))
    .config(config)
    .input_host(Arc::new(ConsoleInput))
    .wakeup(tx)
    .build();
    log::info!("session {} started", session.id());

    println!("== typing \"ge\"");
    type_slowly(&session, "ge", Duration::from_millis(60)).await;
    settle(&session, &mut rx, wait).await;

    println!("== backspace, then \"r\"");
    session.key_pressed(Key::Backspace);
    session.set_query("g");
    settle(&session, &mut rx, wait).await;
    session.key_pressed(Key::Char('r'));
    session.set_query("gr");
    settle(&session, &mut rx, wait).await;

    println!("== navigate and pick");
    session.set_query("g");
    settle(&session, &mut rx, wait).await;
    session.key_pressed(Key::Down);
    session.key_pressed(Key::Down);
    session.key_pressed(Key::Enter);
    settle(&session, &mut rx, wait).await;

    println!("== provider error");
    type_slowly(&session, "g!", Duration::from_millis(60)).await;
    settle(&session, &mut rx, wait).await;
    session.clear_error();

    session.shutdown();
    let code = session.value().as_single().and_then(|o| o.value.clone());
    println!("selected: {code:?}");
    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
    }
}
