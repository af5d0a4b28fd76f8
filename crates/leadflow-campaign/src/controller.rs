//! Campaign controller — operator surface over a single run.
//!
//! All run state lives behind one synchronous mutex. Operator calls and the
//! dispatcher only hold it for bookkeeping, never across an `.await`.

use leadflow_core::config::CampaignConfig;
use leadflow_core::traits::{LeadStatusStore, MessageChannel};
use leadflow_core::types::Recipient;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::delay::DelayPolicy;
use crate::dispatch::process_next;
use crate::error::CampaignError;
use crate::events::{CampaignEvent, EventBus, RecordedEvent};
use crate::state::{CampaignSnapshot, CampaignState, CampaignStatus};
use crate::sync::StatusSynchronizer;

#[derive(Default)]
pub(crate) struct Run {
    pub(crate) state: CampaignState,
    pub(crate) recipients: Vec<Recipient>,
    pub(crate) message: String,
    /// Bumped by start and stop. Results from an older run are discarded.
    pub(crate) run_id: u64,
    /// Bumped by every operator control. Pending dispatches from an older
    /// epoch never claim a recipient.
    pub(crate) epoch: u64,
    pub(crate) timer: Option<JoinHandle<()>>,
    pub(crate) in_flight: bool,
}

impl Run {
    fn cancel_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}

pub(crate) struct Inner {
    run: Mutex<Run>,
    pub(crate) channel: Arc<dyn MessageChannel>,
    pub(crate) synchronizer: StatusSynchronizer,
    pub(crate) policy: DelayPolicy,
    pub(crate) country_code: String,
    pub(crate) events: EventBus,
    /// Held for the duration of a channel call.
    pub(crate) send_gate: tokio::sync::Mutex<()>,
}

impl Inner {
    pub(crate) fn lock(&self) -> MutexGuard<'_, Run> {
        self.run.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Drives one campaign at a time: start, pause, resume, stop, and observe.
pub struct CampaignController {
    inner: Arc<Inner>,
}

impl CampaignController {
    pub fn new(
        channel: Arc<dyn MessageChannel>,
        synchronizer: StatusSynchronizer,
        policy: DelayPolicy,
        country_code: impl Into<String>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                run: Mutex::new(Run::default()),
                channel,
                synchronizer,
                policy,
                country_code: country_code.into(),
                events: EventBus::new(),
                send_gate: tokio::sync::Mutex::new(()),
            }),
        }
    }

    pub fn from_config(
        channel: Arc<dyn MessageChannel>,
        store: Arc<dyn LeadStatusStore>,
        config: &CampaignConfig,
    ) -> Self {
        Self::new(
            channel,
            StatusSynchronizer::new(store),
            DelayPolicy::from_config(config),
            config.country_code.clone(),
        )
    }

    pub fn channel_name(&self) -> &str {
        self.inner.channel.name()
    }

    pub fn delay_policy(&self) -> DelayPolicy {
        self.inner.policy
    }

    /// Begin a run over `recipients`. The first send goes out immediately.
    ///
    /// Allowed from `Idle` or `Completed`. The message is sent verbatim.
    pub fn start(&self, message: &str, recipients: Vec<Recipient>) -> Result<(), CampaignError> {
        if message.trim().is_empty() {
            return Err(CampaignError::EmptyMessage);
        }
        if recipients.is_empty() {
            return Err(CampaignError::NoRecipients);
        }

        let mut run = self.inner.lock();
        if !matches!(run.state.status, CampaignStatus::Idle | CampaignStatus::Completed) {
            return Err(rejected("start", run.state.status));
        }

        run.cancel_timer();
        run.run_id += 1;
        run.epoch += 1;
        run.state = CampaignState::running();
        run.recipients = recipients;
        run.message = message.to_string();
        run.in_flight = false;

        let total = run.recipients.len();
        tracing::info!(
            "🚀 Campaign started: {} recipient(s) via {}",
            total,
            self.inner.channel.name()
        );
        self.inner.events.emit(CampaignEvent::Started { total });

        tokio::spawn(process_next(Arc::clone(&self.inner), run.epoch));
        Ok(())
    }

    /// Cancel the pending timer. A send already in flight still completes
    /// and is recorded, but nothing is scheduled after it.
    pub fn pause(&self) -> Result<(), CampaignError> {
        let mut run = self.inner.lock();
        if run.state.status != CampaignStatus::Running {
            return Err(rejected("pause", run.state.status));
        }

        run.cancel_timer();
        run.epoch += 1;
        run.state.status = CampaignStatus::Paused;
        run.state.next_send_at = None;

        let position = run.state.position;
        tracing::info!("⏸️ Campaign paused at {}/{}", position, run.recipients.len());
        self.inner.events.emit(CampaignEvent::Paused { position });
        Ok(())
    }

    /// Continue from the saved position with no delay before the next send.
    pub fn resume(&self) -> Result<(), CampaignError> {
        let mut run = self.inner.lock();
        if run.state.status != CampaignStatus::Paused {
            return Err(rejected("resume", run.state.status));
        }

        run.epoch += 1;
        run.state.status = CampaignStatus::Running;

        let position = run.state.position;
        tracing::info!("▶️ Campaign resumed at {}/{}", position, run.recipients.len());
        self.inner.events.emit(CampaignEvent::Resumed { position });

        // An in-flight send schedules the next one itself when it settles.
        if !run.in_flight {
            tokio::spawn(process_next(Arc::clone(&self.inner), run.epoch));
        }
        Ok(())
    }

    /// Abandon the run and return to `Idle`. Valid from any state.
    pub fn stop(&self) {
        let mut run = self.inner.lock();
        let was = run.state.status;
        let sent = run.state.sent_count;

        run.cancel_timer();
        run.run_id += 1;
        run.epoch += 1;
        run.state = CampaignState::default();
        run.recipients.clear();
        run.message.clear();
        run.in_flight = false;

        tracing::info!("⏹️ Campaign stopped (was {was}, {sent} sent)");
        self.inner.events.emit(CampaignEvent::Stopped);
    }

    pub fn status(&self) -> CampaignSnapshot {
        let run = self.inner.lock();
        CampaignSnapshot::new(&run.state, run.recipients.len())
    }

    /// Recipient set of the current run, in send order.
    pub fn recipients(&self) -> Vec<Recipient> {
        self.inner.lock().recipients.clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CampaignEvent> {
        self.inner.events.subscribe()
    }

    pub fn history(&self) -> Vec<RecordedEvent> {
        self.inner.events.history()
    }
}

fn rejected(op: &'static str, from: CampaignStatus) -> CampaignError {
    tracing::warn!("⚠️ Ignoring {op}: campaign is {from}");
    CampaignError::InvalidTransition { op, from }
}

impl Drop for CampaignController {
    fn drop(&mut self) {
        let mut run = self.inner.lock();
        run.cancel_timer();
        run.run_id += 1;
        run.epoch += 1;
    }
}
