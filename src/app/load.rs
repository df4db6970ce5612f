use std::sync::Arc;
use std::time::Instant;

use tokio::runtime::Handle;
use tracing::{debug, info};

use crate::browser::{Browser, BrowserContext};
use crate::config::RunSettings;
use crate::crew::Crew;
use crate::error::{AppError, AppResult};
use crate::http::{CookieJar, LinkExtractor};
use crate::metrics::{BrowserStats, FailureGate, Marks, RunReport, aggregate};
use crate::system::shutdown_handlers::{
    setup_duration_timer, setup_signal_shutdown_handler, shutdown_channel,
};
use crate::transport::build_tls_connector;
use crate::urls::UrlEntry;

/// What a finished load run hands back for reporting.
#[derive(Debug)]
pub(crate) struct LoadResult {
    pub report: RunReport,
    pub tripped: bool,
    pub failures: u64,
}

/// Starts one browser per crew slot, waits for every one of them, and
/// aggregates their counters.
///
/// The run ends when every browser finished its repetitions, the run time
/// elapsed, a signal arrived, or the failure gate tripped.
pub(crate) fn run_load(
    settings: &Arc<RunSettings>,
    urls: Arc<[UrlEntry]>,
    handle: &Handle,
) -> AppResult<LoadResult> {
    let tls = Arc::new(build_tls_connector(settings.insecure)?);
    let jar = Arc::new(CookieJar::new());
    for (name, value) in &settings.cookies {
        jar.seed(name, value);
    }

    let concurrency = settings.concurrency;
    let crew = Crew::<BrowserStats>::create(concurrency, concurrency, true)?;
    let cancel = crew.cancel_token();
    let context = BrowserContext {
        settings: Arc::clone(settings),
        urls,
        jar,
        links: Arc::new(LinkExtractor::new()?),
        marks: Arc::new(Marks::new()),
        gate: Arc::new(FailureGate::new(settings.failure_threshold, cancel.clone())),
        tls: Some(tls),
    };

    let (shutdown_tx, _) = shutdown_channel();
    let (signal_handle, timer_handle, bridge_handle) = {
        let _entered = handle.enter();
        let signal_handle = setup_signal_shutdown_handler(&shutdown_tx);
        let timer_handle = settings
            .duration
            .map(|duration| setup_duration_timer(&shutdown_tx, duration));
        let mut shutdown_rx = shutdown_tx.subscribe();
        let bridge_cancel = cancel.clone();
        let bridge_handle = tokio::spawn(async move {
            tokio::select! {
                _ = shutdown_rx.recv() => bridge_cancel.cancel(),
                () = bridge_cancel.cancelled() => {}
            }
        });
        (signal_handle, timer_handle, bridge_handle)
    };

    info!(
        "Preparing {} concurrent users against {} targets",
        concurrency,
        context.urls.len()
    );
    let started = Instant::now();
    let mut add_error = None;
    for id in 0..concurrency {
        let browser = Browser::new(id, &context, cancel.clone(), rand::random::<u64>());
        let runtime = handle.clone();
        if let Err(err) = crew.add(move || runtime.block_on(browser.run())) {
            add_error = Some(err);
            break;
        }
    }
    if add_error.is_some() {
        crew.cancel();
    }

    let joined = crew.join(add_error.is_none());
    let elapsed = started.elapsed();
    signal_handle.abort();
    bridge_handle.abort();
    if let Some(timer) = timer_handle {
        timer.abort();
    }
    if let Some(err) = add_error {
        return Err(AppError::Crew(err));
    }
    let stats = joined?;
    debug!("crew joined after {:?}", elapsed);

    Ok(LoadResult {
        report: aggregate(&stats, &context.marks, elapsed),
        tripped: context.gate.is_tripped(),
        failures: context.gate.failures(),
    })
}
