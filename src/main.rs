mod app;
mod config;
mod handlers;
mod models;
mod services;

use anyhow::{Context, Result};
use std::future::Future;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use app::InsightsApp;
use config::Config;
use handlers::{dashboard, data, parse_command, query, Command, HELP};
use models::conversation::EntryKind;
use services::loader::{LoadOutcome, LoadPath};
use services::query::SubmitOutcome;
use services::request::RequestClient;
use services::store::{ActiveView, StoreChange};
use services::{HttpBackendService, RequestError};

type App = InsightsApp<HttpBackendService>;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("🚀 Starting InsightsAI terminal client");

    let config = Config::from_env().context("Invalid configuration")?;
    log::info!("🌐 Using analytics API at {}", config.api_base_url);

    let client = RequestClient::new(&config.api_base_url, config.request_timeout)?;
    let backend = Arc::new(HttpBackendService::new(client));
    let app = Arc::new(InsightsApp::new(backend, &config));

    // Backend work runs in spawned tasks that report back here, so input is
    // read again right away even when a call hangs.
    let (tx, mut rx) = mpsc::channel::<String>(32);
    log::info!("📊 Report channel initialized with capacity: {}", rx.capacity());

    println!("InsightsAI. Type 'help' for commands.");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    print_prompt(&app);
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("Failed to read input")? else {
                    break;
                };
                if let Some(command) = parse_command(&line, app.store().active_view()) {
                    if command == Command::Quit {
                        break;
                    }
                    run_command(&app, &tx, command);
                }
            }
            Some(text) = rx.recv() => {
                println!("\n{}", text);
            }
        }
        print_prompt(&app);
    }

    log::info!("👋 Shutting down");
    Ok(())
}

fn print_prompt(app: &App) {
    use std::io::Write;
    let prompt = match app.store().active_view() {
        ActiveView::Dashboard => "dashboard> ",
        ActiveView::Query => "ask> ",
    };
    print!("{}", prompt);
    let _ = std::io::stdout().flush();
}

/// Run `work` in the background; whatever it sends is printed by the input loop.
fn spawn_task<F, Fut>(app: &Arc<App>, tx: &mpsc::Sender<String>, work: F)
where
    F: FnOnce(Arc<App>, mpsc::Sender<String>) -> Fut,
    Fut: Future<Output = ()> + Send + 'static,
{
    tokio::spawn(work(app.clone(), tx.clone()));
}

async fn report(tx: &mpsc::Sender<String>, text: String) {
    if tx.send(text).await.is_err() {
        log::warn!("Report dropped, the input loop has stopped");
    }
}

fn run_command(app: &Arc<App>, tx: &mpsc::Sender<String>, command: Command) {
    match command {
        Command::Sample => spawn_task(app, tx, |app, tx| async move {
            let result = app.load_sample().await;
            report_load(&app, &tx, "sample data", result).await;
        }),
        Command::Upload(path) => spawn_task(app, tx, |app, tx| async move {
            let result = app.load_file(&path).await;
            report_load(&app, &tx, &path.display().to_string(), result).await;
        }),
        Command::View(view) => match app.switch_view(view) {
            StoreChange::Rejected(reason) => println!("{}", reason),
            _ if view == ActiveView::Dashboard => show_dashboard(app),
            _ => show_transcript(app),
        },
        Command::Dashboard => show_dashboard(app),
        Command::Chart(chart_type) => spawn_task(app, tx, move |app, tx| async move {
            let text = match app.fetch_chart(chart_type).await {
                Ok(records) => dashboard::render_chart(chart_type, &records),
                Err(e) => format!("Could not fetch {}: {}", chart_type, e),
            };
            report(&tx, text).await;
        }),
        Command::Rows(page) => spawn_task(app, tx, move |app, tx| async move {
            let text = match app.raw_page(page).await {
                Ok(page) => data::render_raw_page(&page),
                Err(e) => format!("Could not fetch rows: {}", e),
            };
            report(&tx, text).await;
        }),
        Command::Ask(question) => ask(app, tx, Some(question)),
        Command::Draft(text) => {
            app.session().set_draft(&text);
            println!("Draft staged. Type 'send' to ask it.");
        }
        Command::Send => ask(app, tx, None),
        Command::Transcript => show_transcript(app),
        Command::Status => show_status(app),
        Command::Help => println!("{}", HELP),
        Command::Invalid(message) => println!("{}", message),
        Command::Quit => {}
    }
}

/// Report a finished load. A committed load is followed by the dashboard once
/// its chart wave lands, if the dashboard is still the active view.
async fn report_load(
    app: &App,
    tx: &mpsc::Sender<String>,
    what: &str,
    result: Result<LoadOutcome, RequestError>,
) {
    let loaded = matches!(result, Ok(LoadOutcome::Loaded(_)));
    report(tx, data::render_load_result(what, &result)).await;
    if !loaded {
        return;
    }
    app.settle_charts().await;
    if app.store().active_view() == ActiveView::Dashboard && !app.charts().is_loading() {
        report(tx, dashboard_text(app)).await;
    }
}

/// Ask `question`, or the staged draft when there is none.
fn ask(app: &Arc<App>, tx: &mpsc::Sender<String>, question: Option<String>) {
    if !app.store().is_loaded() {
        println!("Load a dataset before asking questions.");
        return;
    }
    if app.store().active_view() != ActiveView::Query {
        app.switch_view(ActiveView::Query);
    }

    spawn_task(app, tx, |app, tx| async move {
        let before = app.session().len();
        let outcome = match question {
            Some(question) => app.session().submit(&question).await,
            None => app.session().submit_draft().await,
        };
        let text = match outcome {
            SubmitOutcome::Empty => "Please type a question.".to_string(),
            SubmitOutcome::Busy => "Still answering the previous question.".to_string(),
            SubmitOutcome::Answered | SubmitOutcome::Failed(_) => app
                .session()
                .transcript()
                .iter()
                .skip(before)
                .map(query::render_entry)
                .collect::<Vec<_>>()
                .join("\n"),
        };
        report(&tx, text).await;
    });
}

fn dashboard_text(app: &App) -> String {
    let summary = app.store().summary();
    dashboard::render_dashboard(summary.as_deref(), &app.charts().view())
}

fn show_dashboard(app: &App) {
    println!("{}", dashboard_text(app));
}

fn show_transcript(app: &App) {
    let banner = app.session().banner();
    println!(
        "{}",
        query::render_transcript(&app.session().transcript(), banner.as_deref())
    );
}

fn show_status(app: &App) {
    let loader = app.loader();
    if loader.is_loading() {
        println!("A dataset is loading...");
    }
    println!("{}", data::render_status("Sample", &loader.status(LoadPath::Sample)));
    println!("{}", data::render_status("Upload", &loader.status(LoadPath::Upload)));
    println!(
        "Charts: {} ({:?})",
        if app.charts().is_loading() { "loading" } else { "idle" },
        app.charts().policy()
    );
    let session = app.session();
    if session.is_empty() {
        println!("Query session {}: no questions yet", session.id());
    } else {
        println!(
            "Query session {}: {} question(s), {}",
            session.id(),
            session
                .transcript()
                .iter()
                .filter(|entry| entry.kind == EntryKind::Question)
                .count(),
            if session.is_loading() { "answering" } else { "idle" }
        );
    }
    if let Some(error) = session.error() {
        println!("Last query error: {}", error);
    }
    match app.store().active() {
        Some(active) => println!(
            "Dataset #{}: {} rows, {} columns",
            active.identity.generation, active.summary.row_count, active.summary.column_count
        ),
        None => println!("No dataset loaded"),
    }
}
