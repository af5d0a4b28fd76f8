//! Dispatcher — processes one recipient per invocation, then either arms the
//! timer for the next one or finalizes the run.
//!
//! Every invocation carries the controller epoch it was created for. Pause,
//! resume, start and stop all bump the epoch, so an invocation that lost a
//! race with one of them finds a stale epoch at claim time and does nothing.
//! Once claimed, a send always runs to completion.

use chrono::Utc;
use leadflow_core::error::{LeadflowError, Result};
use leadflow_core::types::Recipient;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::contact::normalize_contact;
use crate::controller::{Inner, Run};
use crate::events::CampaignEvent;
use crate::state::{CampaignStatus, CampaignSummary};

type DispatchFuture = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

struct Claim {
    run_id: u64,
    position: usize,
    recipient: Recipient,
    message: String,
}

/// Process the recipient at the current position.
pub(crate) fn process_next(inner: Arc<Inner>, epoch: u64) -> DispatchFuture {
    Box::pin(async move {
        let Some(claim) = claim(&inner, epoch) else {
            return;
        };

        let outcome = deliver(&inner, &claim.recipient, &claim.message).await;
        let synced = match &outcome {
            Ok(_) => Some(inner.synchronizer.mark_contacted(&claim.recipient).await),
            Err(_) => None,
        };

        settle(&inner, claim, outcome, synced);
    })
}

/// Take ownership of the current position, or finalize when past the end.
fn claim(inner: &Arc<Inner>, epoch: u64) -> Option<Claim> {
    let mut run = inner.lock();
    if run.epoch != epoch || run.state.status != CampaignStatus::Running {
        return None;
    }
    // From here on pause/stop can no longer abort this invocation.
    run.timer = None;
    run.state.next_send_at = None;

    let position = run.state.position;
    if position >= run.recipients.len() {
        finish(inner, &mut run);
        return None;
    }

    run.in_flight = true;
    Some(Claim {
        run_id: run.run_id,
        position,
        recipient: run.recipients[position].clone(),
        message: run.message.clone(),
    })
}

async fn deliver(inner: &Inner, recipient: &Recipient, message: &str) -> Result<String> {
    let Some(handle) = normalize_contact(&recipient.contact_handle, &inner.country_code) else {
        return Err(LeadflowError::Validation(format!(
            "lead {} has no usable contact handle",
            recipient.id
        )));
    };
    let _gate = inner.send_gate.lock().await;
    inner.channel.send_text(&handle, message).await
}

/// Apply the outcome of a claimed send and schedule what comes next.
fn settle(inner: &Arc<Inner>, claim: Claim, outcome: Result<String>, synced: Option<Result<()>>) {
    let lead_id = claim.recipient.id;
    let mut run = inner.lock();

    if run.run_id != claim.run_id {
        tracing::info!(
            "Send to lead {} finished after its campaign was stopped (delivered={})",
            lead_id,
            outcome.is_ok()
        );
        inner.events.emit(CampaignEvent::StaleResult {
            lead_id,
            delivered: outcome.is_ok(),
        });
        if let Some(Err(e)) = synced {
            inner.events.emit(CampaignEvent::SyncFailed {
                lead_id,
                reason: e.to_string(),
            });
        }
        return;
    }
    run.in_flight = false;

    match outcome {
        Ok(msg_id) => {
            run.state.record_sent(lead_id);
            tracing::info!(
                "✅ Sent to {} ({}/{}) msg_id={}",
                claim.recipient.display_name,
                claim.position + 1,
                run.recipients.len(),
                msg_id
            );
            inner.events.emit(CampaignEvent::Sent {
                lead_id,
                position: claim.position,
            });
        }
        Err(e) => {
            tracing::warn!(
                "⚠️ Send failed for {} ({}): {e}",
                claim.recipient.display_name,
                claim.recipient.contact_handle
            );
            inner.events.emit(CampaignEvent::SendFailed {
                lead_id,
                position: claim.position,
                reason: e.to_string(),
            });
        }
    }

    if let Some(Err(e)) = synced {
        inner.events.emit(CampaignEvent::SyncFailed {
            lead_id,
            reason: e.to_string(),
        });
    }

    run.state.position = claim.position + 1;

    // A run paused mid-send still completes on its last recipient; otherwise
    // it keeps the bookkeeping and arms nothing.
    if run.state.position >= run.recipients.len() {
        finish(inner, &mut run);
    } else if run.state.status == CampaignStatus::Running {
        arm_timer(inner, &mut run);
    }
}

/// Draw a delay and schedule the next invocation after it.
fn arm_timer(inner: &Arc<Inner>, run: &mut Run) {
    let delay = inner.policy.draw();
    let delay_ms = delay.as_millis() as u64;
    let at = Utc::now() + chrono::Duration::milliseconds(delay_ms as i64);
    run.state.next_send_at = Some(at);

    let epoch = run.epoch;
    let task_inner = Arc::clone(inner);
    run.timer = Some(tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        process_next(task_inner, epoch).await;
    }));

    tracing::info!("⏳ Next send in {}s", delay_ms / 1000);
    inner.events.emit(CampaignEvent::Scheduled {
        position: run.state.position,
        delay_ms,
        at,
    });
}

fn finish(inner: &Inner, run: &mut Run) {
    run.timer = None;
    run.state.status = CampaignStatus::Completed;
    run.state.next_send_at = None;
    let summary = CampaignSummary {
        sent_count: run.state.sent_count,
        total_recipients: run.recipients.len(),
    };
    tracing::info!(
        "🎉 Campaign finished: {}/{} messages sent",
        summary.sent_count,
        summary.total_recipients
    );
    inner.events.emit(CampaignEvent::Completed(summary));
}
