use chrono::{Local, Utc};
use futures::future::join_all;
use futures::stream::{FuturesUnordered, StreamExt};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{error, info, warn};

use crate::config::{AppConfig, NotifierConfig};
use crate::error::ConfigError;
use crate::models::{AppStatus, Transition, TransitionEvent};
use crate::notify::{ChatNotifier, Delivery, MailNotifier, Notifier};
use crate::probe::{build_client, probe};

/// One configured app and the status slot only its own probe writes.
pub struct MonitoredApp {
    pub config: AppConfig,
    client: reqwest::Client,
    status: RwLock<AppStatus>,
    in_flight: AtomicBool,
}

impl MonitoredApp {
    fn new(config: AppConfig) -> Result<Self, ConfigError> {
        let client = build_client(&config.proxy, &config.name)?;
        Ok(Self {
            config,
            client,
            status: RwLock::new(AppStatus::default()),
            in_flight: AtomicBool::new(false),
        })
    }

    pub async fn status(&self) -> AppStatus {
        *self.status.read().await
    }

    /// Claims the app for one check, or `None` while an earlier check is
    /// still running.
    fn claim(self: &Arc<Self>) -> Option<InFlight> {
        if self.in_flight.swap(true, Ordering::AcqRel) {
            return None;
        }
        Some(InFlight(Arc::clone(self)))
    }
}

/// Releases the app's in-flight flag on drop, including when the check panics.
struct InFlight(Arc<MonitoredApp>);

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.in_flight.store(false, Ordering::Release);
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepSummary {
    pub probed: usize,
    pub transitions: usize,
    /// Apps whose previous check had not finished yet.
    pub skipped: usize,
}

pub struct Monitor {
    pub config: NotifierConfig,
    apps: Vec<Arc<MonitoredApp>>,
    notifiers: Arc<Vec<Arc<dyn Notifier>>>,
}

impl Monitor {
    pub fn new(config: NotifierConfig) -> Result<Self, ConfigError> {
        let notifiers: Vec<Arc<dyn Notifier>> = vec![
            Arc::new(ChatNotifier::from_config(&config)?),
            Arc::new(MailNotifier::from_config(&config)?),
        ];
        Self::with_notifiers(config, notifiers)
    }

    pub fn with_notifiers(config: NotifierConfig, notifiers: Vec<Arc<dyn Notifier>>) -> Result<Self, ConfigError> {
        let apps = config
            .apps
            .iter()
            .cloned()
            .map(|app| MonitoredApp::new(app).map(Arc::new))
            .collect::<Result<Vec<_>, _>>()?;

        info!("Monitoring {} apps", apps.len());
        Ok(Self { config, apps, notifiers: Arc::new(notifiers) })
    }

    /// Apps in configuration order.
    pub fn apps(&self) -> &[Arc<MonitoredApp>] {
        &self.apps
    }

    /// Probes every app concurrently and returns once all of them have
    /// been classified, notified and recorded. An app whose check from an
    /// earlier sweep is still running is skipped, so a hung endpoint or
    /// channel only ever holds up its own app.
    pub async fn sweep(&self) -> SweepSummary {
        let start_time = Utc::now();
        let mut tasks = FuturesUnordered::new();
        let mut summary = SweepSummary::default();

        for app in &self.apps {
            let Some(guard) = app.claim() else {
                warn!(app = %app.config.name, "previous check still running, skipping");
                summary.skipped += 1;
                continue;
            };
            let notifiers = Arc::clone(&self.notifiers);
            tasks.push(tokio::spawn(async move {
                let transition = check_app(&guard.0, &notifiers).await;
                drop(guard);
                transition
            }));
        }

        while let Some(join_res) = tasks.next().await {
            match join_res {
                Ok(transition) => {
                    summary.probed += 1;
                    if transition != Transition::NoChange {
                        summary.transitions += 1;
                    }
                }
                Err(e) => error!("Healthcheck task aborted: {}", e),
            }
        }

        let duration = Utc::now() - start_time;
        info!(
            "Sweep completed {} checks ({} transitions, {} skipped) in {:.2}s.",
            summary.probed,
            summary.transitions,
            summary.skipped,
            duration.num_milliseconds() as f64 / 1000.0
        );
        summary
    }
}

async fn check_app(app: &MonitoredApp, notifiers: &[Arc<dyn Notifier>]) -> Transition {
    let status_code = probe(&app.client, &app.config.url).await;
    let previous = app.status.read().await.status_code;
    let transition = Transition::classify(previous, status_code);

    if transition != Transition::NoChange {
        let event = TransitionEvent {
            app_name: app.config.name.clone(),
            url: app.config.url.clone(),
            transition,
            status_code,
        };
        let msg = format!("[CHANGE] {} {} -> {}", app.config.name, previous, status_code);
        if event.is_up() { warn!("{}", msg); } else { error!("{}", msg); }
        notify_all(&app.config, &event, notifiers).await;
    }

    *app.status.write().await = AppStatus::observed(status_code, Local::now());
    info!(app = %app.config.name, status = status_code, "probed");
    transition
}

/// Delivers through every channel concurrently; a failing channel is logged
/// and never affects the others.
async fn notify_all(app: &AppConfig, event: &TransitionEvent, notifiers: &[Arc<dyn Notifier>]) {
    let deliveries = notifiers.iter().map(|notifier| async move {
        match notifier.notify(app, event).await {
            Ok(Delivery::Sent) => info!(app = %app.name, channel = notifier.name(), "notification sent"),
            Ok(Delivery::Skipped) => info!(app = %app.name, channel = notifier.name(), "notification skipped"),
            Err(e) => error!(app = %app.name, channel = notifier.name(), error = %e, "notification failed"),
        }
    });
    join_all(deliveries).await;
}
