//! Batch processing of pending invoices.
//!
//! ```text
//! Pending ──claim──▶ InProgress ──▶ Done
//!                         │
//!                         └───────▶ Failed ──requeue (operator)──▶ Pending
//! ```
//!
//! The store's atomic [`claim`](InvoiceStore::claim) keeps two processors
//! from submitting the same invoice.

mod orchestrator;
mod store;

pub use orchestrator::{BatchSummary, Processor, ProcessorOptions};
pub use store::{InMemoryStore, InvoiceStore, ListQuery};
