use super::fetcher::Fetcher;
use super::view::{DisplayError, WidgetView};
use crate::config::RefreshConfig;
use crate::extract::Extractor;
use crate::store::WidgetStore;
use crate::widget::{FetchSignature, Widget, WidgetKind};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Outcome of one refresh cycle, delivered to the scheduler's consumer
#[derive(Debug, Clone)]
pub struct RefreshEvent {
    pub widget_id: String,
    pub view: WidgetView,
    /// When the cycle finished, whether or not the fetch succeeded; see
    /// [`WidgetView::fetched_at`] for the time data last arrived
    pub completed_at: DateTime<Utc>,
}

/// Result of asking for a manual refresh
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshTrigger {
    Queued,
    /// A manual refresh is already waiting; this one was coalesced into it
    AlreadyQueued,
    NotScheduled,
}

struct ScheduledWidget {
    signature: FetchSignature,
    trigger: mpsc::Sender<()>,
    handle: JoinHandle<()>,
}

/// Owns one refresh task per scheduled widget
///
/// Every task runs at most one fetch and extract cycle at a time. Must be used from
/// within a tokio runtime.
pub struct RefreshScheduler {
    fetcher: Arc<dyn Fetcher>,
    extractor: Arc<Extractor>,
    config: RefreshConfig,
    events: mpsc::UnboundedSender<RefreshEvent>,
    tasks: HashMap<String, ScheduledWidget>,
}

impl RefreshScheduler {
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        extractor: Arc<Extractor>,
        config: RefreshConfig,
    ) -> (Self, mpsc::UnboundedReceiver<RefreshEvent>) {
        let (events, receiver) = mpsc::unbounded_channel();
        let scheduler = RefreshScheduler {
            fetcher,
            extractor,
            config,
            events,
            tasks: HashMap::new(),
        };
        (scheduler, receiver)
    }

    /// Start or restart the refresh task for `widget`
    ///
    /// Returns `true` when a new task was started. A running task is kept when the
    /// widget's fetch signature is unchanged. Hidden and live-feed widgets are
    /// unscheduled instead.
    pub fn schedule(&mut self, widget: &Widget) -> bool {
        if widget.kind == WidgetKind::LiveFeed || widget.hidden {
            self.unschedule(&widget.id);
            return false;
        }

        let signature = widget.fetch_signature();
        if let Some(existing) = self.tasks.get(&widget.id) {
            if existing.signature == signature && !existing.handle.is_finished() {
                debug!(widget_id = %widget.id, "fetch signature unchanged, keeping task");
                return false;
            }
        }
        self.unschedule(&widget.id);

        let (trigger, triggers) = mpsc::channel(self.config.manual_queue_depth.max(1));
        let handle = tokio::spawn(run_widget(
            widget.clone(),
            self.fetcher.clone(),
            self.extractor.clone(),
            triggers,
            self.events.clone(),
        ));

        info!(
            widget_id = %widget.id,
            interval_secs = widget.refresh_interval_seconds,
            "scheduled widget refresh"
        );
        self.tasks.insert(
            widget.id.clone(),
            ScheduledWidget {
                signature,
                trigger,
                handle,
            },
        );
        true
    }

    /// Stop a widget's task; a cycle in flight is aborted and its result discarded
    pub fn unschedule(&mut self, widget_id: &str) -> bool {
        match self.tasks.remove(widget_id) {
            Some(task) => {
                task.handle.abort();
                info!(widget_id, "unscheduled widget refresh");
                true
            }
            None => false,
        }
    }

    pub fn refresh_now(&self, widget_id: &str) -> RefreshTrigger {
        let Some(task) = self.tasks.get(widget_id) else {
            return RefreshTrigger::NotScheduled;
        };
        match task.trigger.try_send(()) {
            Ok(()) => RefreshTrigger::Queued,
            Err(TrySendError::Full(())) => {
                debug!(widget_id, "manual refresh coalesced");
                RefreshTrigger::AlreadyQueued
            }
            Err(TrySendError::Closed(())) => RefreshTrigger::NotScheduled,
        }
    }

    /// Bring the running tasks in line with the store's widgets
    ///
    /// Returns the number of tasks started or restarted.
    pub fn sync(&mut self, store: &WidgetStore) -> usize {
        let stale: Vec<String> = self
            .tasks
            .keys()
            .filter(|id| store.get(id).is_none())
            .cloned()
            .collect();
        for id in stale {
            self.unschedule(&id);
        }
        store
            .widgets()
            .iter()
            .filter(|widget| self.schedule(widget))
            .count()
    }

    pub fn is_scheduled(&self, widget_id: &str) -> bool {
        self.tasks.contains_key(widget_id)
    }

    pub fn scheduled_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.tasks.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    pub fn shutdown(&mut self) {
        for (_, task) in self.tasks.drain() {
            task.handle.abort();
        }
    }
}

impl Drop for RefreshScheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

async fn run_widget(
    widget: Widget,
    fetcher: Arc<dyn Fetcher>,
    extractor: Arc<Extractor>,
    mut triggers: mpsc::Receiver<()>,
    events: mpsc::UnboundedSender<RefreshEvent>,
) {
    let mut ticker = interval(Duration::from_secs(widget.refresh_interval_seconds.max(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            trigger = triggers.recv() => {
                if trigger.is_none() {
                    break;
                }
            }
        }

        let view = refresh_widget(&widget, fetcher.as_ref(), &extractor).await;
        let event = RefreshEvent {
            widget_id: widget.id.clone(),
            view,
            completed_at: Utc::now(),
        };
        if events.send(event).is_err() {
            debug!(widget_id = %widget.id, "event receiver dropped, stopping refresh task");
            break;
        }
    }
}

/// One fetch and extract cycle, with every failure turned into display state
pub async fn refresh_widget(
    widget: &Widget,
    fetcher: &dyn Fetcher,
    extractor: &Extractor,
) -> WidgetView {
    let request = widget.fetch_request();
    if let Err(err) = request.url() {
        warn!(widget_id = %widget.id, error = %err, "widget endpoint rejected");
        return WidgetView::failed(DisplayError::from(&err), None);
    }

    let response = match fetcher.fetch(&request).await {
        Ok(response) => response,
        Err(err) => {
            warn!(widget_id = %widget.id, error = %err, "fetch failed");
            return WidgetView::failed(DisplayError::from(&err), None);
        }
    };
    let fetched_at = Utc::now();

    match extractor.extract(widget, &response) {
        Ok(extraction) => {
            if let Some(warning) = &extraction.warning {
                warn!(widget_id = %widget.id, "{}", warning);
            }
            WidgetView::loaded(extraction, fetched_at)
        }
        Err(err) => {
            warn!(widget_id = %widget.id, error = %err, "extraction failed");
            WidgetView::failed(DisplayError::from(&err), Some(fetched_at))
        }
    }
}
