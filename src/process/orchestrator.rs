use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, instrument, warn};

use super::store::InvoiceStore;
use crate::core::{DEFAULT_ERROR_CAP, ErrorClass, Invoice, ZatcaError};
use crate::submit::{DEFAULT_TIMEOUT, SubmissionResult, Submitter};
use crate::ubl::{fingerprint, to_ubl_xml};

/// Counts reported by [`Processor::process_pending`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub processed: usize,
    pub success: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessorOptions {
    /// Maximum characters kept in `last_error`.
    pub error_cap: usize,
    /// Upper bound on each remote call, on top of the client's own timeout.
    pub remote_timeout: Duration,
}

impl Default for ProcessorOptions {
    fn default() -> Self {
        Self {
            error_cap: DEFAULT_ERROR_CAP,
            remote_timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Drives pending invoices through generate, fingerprint, submit and record.
pub struct Processor<S, C> {
    store: Arc<S>,
    submitter: Arc<C>,
    options: ProcessorOptions,
}

impl<S: InvoiceStore, C: Submitter> Processor<S, C> {
    pub fn new(store: Arc<S>, submitter: Arc<C>) -> Self {
        Self::with_options(store, submitter, ProcessorOptions::default())
    }

    pub fn with_options(store: Arc<S>, submitter: Arc<C>, options: ProcessorOptions) -> Self {
        Self {
            store,
            submitter,
            options,
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn options(&self) -> ProcessorOptions {
        self.options
    }

    /// Process at most `limit` pending invoices, oldest first.
    ///
    /// `simulate` selects [`Submitter::simulate`] instead of a live
    /// submission. Each invoice is isolated: its failure is recorded on the
    /// invoice and the batch continues. Every outcome is saved as soon as it
    /// is known.
    ///
    /// # Errors
    /// Only storage failures abort the batch.
    #[instrument(skip(self), fields(processed, success, failed))]
    pub async fn process_pending(
        &self,
        limit: usize,
        simulate: bool,
    ) -> Result<BatchSummary, ZatcaError> {
        let candidates = self.store.fetch_pending(limit).await?;
        info!(candidates = candidates.len(), "processing pending invoices");

        let mut summary = BatchSummary::default();
        for mut invoice in candidates {
            if !self.store.claim(invoice.id).await? {
                warn!(
                    invoice_id = %invoice.id,
                    invoice_number = %invoice.invoice_number,
                    "invoice claimed elsewhere, skipping"
                );
                continue;
            }
            invoice.mark_in_progress()?;
            summary.processed += 1;

            if self.process_one(&mut invoice, simulate).await? {
                summary.success += 1;
            } else {
                summary.failed += 1;
            }
        }

        let span = tracing::Span::current();
        span.record("processed", summary.processed);
        span.record("success", summary.success);
        span.record("failed", summary.failed);
        info!(?summary, "batch complete");
        Ok(summary)
    }

    /// Run one claimed invoice to a terminal state. Returns whether it ended `Done`.
    async fn process_one(&self, invoice: &mut Invoice, simulate: bool) -> Result<bool, ZatcaError> {
        match self.attempt(invoice, simulate).await {
            Ok(result) if result.success => {
                let remote_id = result
                    .remote_id
                    .unwrap_or_else(|| invoice.id.to_string());
                invoice.mark_done(remote_id, Utc::now());
                self.store.save(invoice).await?;
                info!(
                    invoice_id = %invoice.id,
                    invoice_number = %invoice.invoice_number,
                    remote_id = invoice.zatca_uuid.as_deref().unwrap_or_default(),
                    simulated = result.simulated,
                    "invoice done"
                );
                Ok(true)
            }
            Ok(result) => {
                self.fail(invoice, &result.failure_message()).await?;
                Ok(false)
            }
            Err(e) if e.class() == ErrorClass::Storage => Err(e),
            Err(e) => {
                self.fail(invoice, &e.to_string()).await?;
                Ok(false)
            }
        }
    }

    /// Generate, fingerprint and persist the document, then submit it.
    async fn attempt(
        &self,
        invoice: &mut Invoice,
        simulate: bool,
    ) -> Result<SubmissionResult, ZatcaError> {
        let xml = to_ubl_xml(invoice)?;
        invoice.record_document(fingerprint(&xml));
        // Artifacts are on record before anything leaves the process.
        self.store.save(invoice).await?;

        let invoice_id = invoice.id.to_string();
        let call = async {
            match (simulate, &invoice.document) {
                (true, _) => self.submitter.simulate(&invoice_id).await,
                (false, Some(doc)) => {
                    self.submitter
                        .submit(&doc.xml_base64, &doc.xml_hash, &invoice_id)
                        .await
                }
                (false, None) => Err(ZatcaError::Validation(
                    "no generated document to submit".into(),
                )),
            }
        };

        tokio::time::timeout(self.options.remote_timeout, call)
            .await
            .map_err(|_| {
                ZatcaError::Transport(format!(
                    "remote call exceeded {}s",
                    self.options.remote_timeout.as_secs_f64()
                ))
            })?
    }

    async fn fail(&self, invoice: &mut Invoice, message: &str) -> Result<(), ZatcaError> {
        invoice.mark_failed(message, self.options.error_cap);
        self.store.save(invoice).await?;
        error!(
            invoice_id = %invoice.id,
            invoice_number = %invoice.invoice_number,
            error = %message,
            "invoice failed"
        );
        Ok(())
    }
}
