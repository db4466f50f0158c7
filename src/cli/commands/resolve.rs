//! Resolve command: run the batch over pending tournaments.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::NaiveDate;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::mpsc;

use tournoi_signup::browser::ChromiumLauncher;
use tournoi_signup::config::Config;
use tournoi_signup::documents::{HttpDocumentSource, PdfToTextExtractor};
use tournoi_signup::models::ResolutionOutcome;
use tournoi_signup::platform::HelloAssoSearch;
use tournoi_signup::repository::{DateRange, JsonFileStore, TournamentStore};
use tournoi_signup::season::SeasonScope;
use tournoi_signup::services::{Orchestrator, ResolveEvent, TournamentResolver};
use tournoi_signup::skip_list::SkipList;

pub struct ResolveArgs {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub workers: Option<usize>,
    pub limit: usize,
    pub store: Option<PathBuf>,
}

/// Resolve and store the signup URLs of pending tournaments.
pub async fn cmd_resolve(config: &Config, args: ResolveArgs) -> anyhow::Result<()> {
    let store_path = args.store.unwrap_or_else(|| config.store_path());
    let range = DateRange {
        from: args.from,
        to: args.to,
    };
    let store = Arc::new(JsonFileStore::new(&store_path).with_range(range));

    let mut targets = store.load_pending().await?;
    if args.limit > 0 {
        targets.truncate(args.limit);
    }
    if targets.is_empty() {
        println!(
            "{} No pending tournaments in {}",
            style("!").yellow(),
            store_path.display()
        );
        return Ok(());
    }

    let skip_list = Arc::new(SkipList::from_config(&config.skip_list));
    let documents = Arc::new(HttpDocumentSource::new(
        &config.browser.user_agent,
        config.navigation_timeout(),
    )?);
    let search = Arc::new(HelloAssoSearch::new(
        config.platform.base_url.as_str(),
        config.platform.max_results,
    ));
    let resolver = Arc::new(TournamentResolver::new(
        documents,
        Arc::new(PdfToTextExtractor::new()),
        search,
        skip_list,
        config.resolver_limits(),
        config.screenshot_dir(),
    ));

    let mut orchestrator_config = config.orchestrator_config();
    if let Some(workers) = args.workers {
        orchestrator_config.workers = workers;
    }
    let workers = orchestrator_config.workers.clamp(1, targets.len());

    println!(
        "{} Starting {} browser session(s) for {} tournament(s)",
        style("→").cyan(),
        workers,
        targets.len()
    );

    let orchestrator = Orchestrator::new(
        Arc::new(ChromiumLauncher::new(config.browser.clone())),
        resolver,
        store,
        orchestrator_config,
    );

    let progress = ProgressBar::new(targets.len() as u64);
    progress.set_style(
        ProgressStyle::with_template("{bar:40.cyan/blue} {pos}/{len} {wide_msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("##-"),
    );

    let (event_tx, mut event_rx) = mpsc::channel::<ResolveEvent>(100);

    let progress_clone = progress.clone();
    let event_handler = tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            match event {
                ResolveEvent::WorkerFailed { worker_id, error } => {
                    progress_clone.println(format!(
                        "{} Worker {} could not open a browser: {}",
                        style("✗").red(),
                        worker_id,
                        error
                    ));
                }
                ResolveEvent::Started { name, .. } => {
                    progress_clone.set_message(name);
                }
                ResolveEvent::Finished { id, outcome, .. } => {
                    progress_clone.inc(1);
                    match outcome {
                        ResolutionOutcome::Found(url) => progress_clone.println(format!(
                            "{} #{} {}",
                            style("✓").green(),
                            id,
                            url
                        )),
                        ResolutionOutcome::Error(error) => progress_clone.println(format!(
                            "{} #{} {}",
                            style("✗").red(),
                            id,
                            error
                        )),
                        ResolutionOutcome::NotFound => {}
                    }
                }
                ResolveEvent::Flushed {
                    worker_id,
                    persisted,
                } => {
                    tracing::debug!("Worker {} stored {} URL(s)", worker_id, persisted);
                }
            }
        }
    });

    let report = orchestrator.run(targets, event_tx).await;

    if let Err(e) = event_handler.await {
        tracing::warn!("Event handler task failed: {}", e);
    }
    progress.finish_and_clear();

    println!(
        "{} Resolved {} of {} tournament(s)",
        style("✓").green(),
        report.found(),
        report.total()
    );
    if report.not_found() > 0 {
        println!(
            "  {} {} without a signup page",
            style("→").dim(),
            report.not_found()
        );
    }
    if report.errors() > 0 {
        println!("  {} {} failed", style("!").yellow(), report.errors());
    }
    if report.persist_failures > 0 {
        println!(
            "  {} {} URL(s) could not be stored",
            style("!").yellow(),
            report.persist_failures
        );
    }

    let today = chrono::Local::now().date_naive();
    report.check(SeasonScope::of_range(args.from, args.to, today))?;
    Ok(())
}
