//! Log-only channel for rehearsing a campaign without contacting anyone.

use async_trait::async_trait;
use leadflow_core::error::Result;
use leadflow_core::traits::MessageChannel;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Default)]
pub struct DryRunChannel {
    sent: AtomicU64,
}

impl DryRunChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent_count(&self) -> u64 {
        self.sent.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl MessageChannel for DryRunChannel {
    fn name(&self) -> &str { "dry-run" }

    async fn send_text(&self, contact_handle: &str, text: &str) -> Result<String> {
        let n = self.sent.fetch_add(1, Ordering::Relaxed) + 1;
        tracing::info!("[dry-run #{n}] → {contact_handle}: {} chars", text.chars().count());
        Ok(format!("dry-run-{n}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_counts_sends() {
        let ch = DryRunChannel::new();
        assert_eq!(ch.send_text("5511", "a").await.unwrap(), "dry-run-1");
        assert_eq!(ch.send_text("5512", "b").await.unwrap(), "dry-run-2");
        assert_eq!(ch.sent_count(), 2);
    }
}
