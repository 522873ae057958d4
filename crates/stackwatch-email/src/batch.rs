//! Batched sending with per-recipient failure aggregation.
//!
//! Messages are sent in fixed-size batches. The sends of one batch run
//! concurrently and the batch is awaited before the next one starts, which
//! caps the number of open connections to the mail provider. A failed send is
//! recorded against its recipient and never stops later batches.

use futures::future::join_all;
use serde::Serialize;

use crate::prelude::*;
use stackwatch_types::mail_adapter::{EmailMessage, MailTransport};

#[derive(Debug, Clone, Serialize)]
pub struct SentMail {
	pub to: Box<str>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FailedMail {
	pub to: Box<str>,
	pub error: String,
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchSummary {
	pub results: Vec<SentMail>,
	pub errors: Vec<FailedMail>,
	pub total_sent: usize,
	pub total_failed: usize,
}

pub async fn send_in_batches(
	transport: &dyn MailTransport,
	messages: &[EmailMessage],
	batch_size: usize,
) -> BatchSummary {
	let batch_size = batch_size.max(1);
	let mut summary = BatchSummary::default();

	for (batch_no, batch) in messages.chunks(batch_size).enumerate() {
		let outcomes = join_all(batch.iter().map(|msg| transport.send(msg))).await;
		let mut failed = 0;
		for (msg, outcome) in batch.iter().zip(outcomes) {
			match outcome {
				Ok(()) => summary.results.push(SentMail { to: msg.to.clone() }),
				Err(err) => {
					failed += 1;
					summary.errors.push(FailedMail { to: msg.to.clone(), error: err.to_string() });
				}
			}
		}
		if failed > 0 {
			warn!(batch = batch_no, size = batch.len(), failed, "Email batch had failures");
		} else {
			debug!(batch = batch_no, size = batch.len(), "Email batch sent");
		}
	}

	summary.total_sent = summary.results.len();
	summary.total_failed = summary.errors.len();
	info!(
		sent = summary.total_sent,
		failed = summary.total_failed,
		"Batch email run finished"
	);
	summary
}

#[cfg(test)]
mod tests {
	use super::*;
	use async_trait::async_trait;
	use std::sync::atomic::{AtomicUsize, Ordering};

	/// Fails recipients whose index is in `fail`, tracks peak concurrency
	#[derive(Debug, Default)]
	struct FakeProvider {
		fail: std::ops::Range<usize>,
		attempts: AtomicUsize,
		in_flight: AtomicUsize,
		peak: AtomicUsize,
	}

	#[async_trait]
	impl MailTransport for FakeProvider {
		async fn send(&self, message: &EmailMessage) -> ClResult<()> {
			self.attempts.fetch_add(1, Ordering::SeqCst);
			let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
			self.peak.fetch_max(now, Ordering::SeqCst);
			tokio::task::yield_now().await;
			self.in_flight.fetch_sub(1, Ordering::SeqCst);

			let idx: usize = message.to.trim_start_matches("user").split('@').next().unwrap_or("").parse()?;
			if self.fail.contains(&idx) {
				Err(Error::MailError("provider rejected batch".into()))
			} else {
				Ok(())
			}
		}
	}

	fn messages(n: usize) -> Vec<EmailMessage> {
		(0..n)
			.map(|i| EmailMessage {
				to: format!("user{}@example.com", i).into(),
				subject: "Hi".into(),
				text: "Hello".into(),
				html: None,
			})
			.collect()
	}

	#[tokio::test]
	async fn test_failed_batch_does_not_stop_later_batches() {
		// 120 recipients, batches of 50: the second batch (50..100) fails
		let provider = FakeProvider { fail: 50..100, ..Default::default() };
		let summary = send_in_batches(&provider, &messages(120), 50).await;

		assert_eq!(provider.attempts.load(Ordering::SeqCst), 120);
		assert_eq!(summary.total_failed, 50);
		assert_eq!(summary.total_sent, 70);
		assert!(summary.results.iter().any(|r| &*r.to == "user119@example.com"));
		assert!(summary.errors.iter().all(|e| e.error.contains("provider rejected")));
	}

	#[tokio::test]
	async fn test_concurrency_is_capped_by_batch_size() {
		let provider = FakeProvider { fail: 0..0, ..Default::default() };
		let summary = send_in_batches(&provider, &messages(120), 50).await;
		assert_eq!(summary.total_sent, 120);
		assert!(provider.peak.load(Ordering::SeqCst) <= 50);
	}

	#[tokio::test]
	async fn test_summary_shape() {
		let provider = FakeProvider { fail: 1..2, ..Default::default() };
		let summary = send_in_batches(&provider, &messages(2), 50).await;
		let value = serde_json::to_value(&summary).unwrap();
		assert_eq!(value["totalSent"], 1);
		assert_eq!(value["totalFailed"], 1);
		assert_eq!(value["errors"][0]["to"], "user1@example.com");
		assert_eq!(value["results"][0]["to"], "user0@example.com");
	}

	#[tokio::test]
	async fn test_empty_run() {
		let provider = FakeProvider::default();
		let summary = send_in_batches(&provider, &[], 50).await;
		assert_eq!(summary.total_sent, 0);
		assert_eq!(summary.total_failed, 0);
	}
}

// vim: ts=4
