use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::core::{Invoice, InvoiceStatus, ZatcaError};

/// Filter and page for [`InvoiceStore::list`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    pub status: Option<InvoiceStatus>,
    pub limit: usize,
    pub offset: usize,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            status: None,
            limit: 50,
            offset: 0,
        }
    }
}

impl ListQuery {
    pub fn with_status(status: InvoiceStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }
}

/// Persistence for invoices and their items.
///
/// Implementations must make [`claim`](InvoiceStore::claim) atomic: of two
/// concurrent claims on the same pending invoice exactly one returns `true`.
#[allow(async_fn_in_trait)]
pub trait InvoiceStore: Send + Sync {
    /// Store a new invoice with its items.
    ///
    /// # Errors
    /// `DuplicateInvoiceNumber` if the number is already taken.
    async fn insert(&self, invoice: Invoice) -> Result<(), ZatcaError>;

    async fn get(&self, id: Uuid) -> Result<Option<Invoice>, ZatcaError>;

    /// Remove an invoice and its items. Returns whether it existed.
    async fn delete(&self, id: Uuid) -> Result<bool, ZatcaError>;

    /// Up to `limit` pending invoices, oldest first, items loaded.
    async fn fetch_pending(&self, limit: usize) -> Result<Vec<Invoice>, ZatcaError>;

    /// Move `id` from Pending to InProgress if it is still Pending.
    ///
    /// Returns `false` when another worker got there first (or the invoice
    /// is gone).
    async fn claim(&self, id: Uuid) -> Result<bool, ZatcaError>;

    /// Persist the full current state of an existing invoice.
    async fn save(&self, invoice: &Invoice) -> Result<(), ZatcaError>;

    /// Operator action: Failed → Pending.
    async fn requeue_failed(&self, id: Uuid) -> Result<(), ZatcaError>;

    async fn count_by_status(&self, status: InvoiceStatus) -> Result<usize, ZatcaError>;

    /// Counts for every status, zeros included.
    async fn status_counts(&self) -> Result<BTreeMap<InvoiceStatus, usize>, ZatcaError> {
        let mut counts = BTreeMap::new();
        for status in InvoiceStatus::ALL {
            counts.insert(status, self.count_by_status(status).await?);
        }
        Ok(counts)
    }

    /// Newest first, optionally filtered by status.
    async fn list(&self, query: &ListQuery) -> Result<Vec<Invoice>, ZatcaError>;
}

struct Row {
    seq: u64,
    invoice: Invoice,
}

/// In-process store backed by a `HashMap` behind an async `RwLock`.
///
/// Cloning shares the underlying map.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    rows: Arc<RwLock<HashMap<Uuid, Row>>>,
    seq: Arc<AtomicU64>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rows.read().await.is_empty()
    }
}

fn not_found(id: Uuid) -> ZatcaError {
    ZatcaError::Storage(format!("invoice {id} not found"))
}

impl InvoiceStore for InMemoryStore {
    async fn insert(&self, invoice: Invoice) -> Result<(), ZatcaError> {
        invoice.check_invariants()?;
        let mut rows = self.rows.write().await;
        if rows.contains_key(&invoice.id) {
            return Err(ZatcaError::Storage(format!(
                "invoice {} already exists",
                invoice.id
            )));
        }
        if rows
            .values()
            .any(|r| r.invoice.invoice_number == invoice.invoice_number)
        {
            return Err(ZatcaError::DuplicateInvoiceNumber(invoice.invoice_number));
        }
        let seq = self.seq.fetch_add(1, Ordering::Relaxed);
        rows.insert(invoice.id, Row { seq, invoice });
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Invoice>, ZatcaError> {
        Ok(self.rows.read().await.get(&id).map(|r| r.invoice.clone()))
    }

    async fn delete(&self, id: Uuid) -> Result<bool, ZatcaError> {
        Ok(self.rows.write().await.remove(&id).is_some())
    }

    async fn fetch_pending(&self, limit: usize) -> Result<Vec<Invoice>, ZatcaError> {
        let rows = self.rows.read().await;
        let mut pending: Vec<&Row> = rows
            .values()
            .filter(|r| r.invoice.status == InvoiceStatus::Pending)
            .collect();
        pending.sort_by_key(|r| (r.invoice.created_at, r.seq));
        Ok(pending
            .into_iter()
            .take(limit)
            .map(|r| r.invoice.clone())
            .collect())
    }

    async fn claim(&self, id: Uuid) -> Result<bool, ZatcaError> {
        let mut rows = self.rows.write().await;
        match rows.get_mut(&id) {
            Some(row) if row.invoice.status == InvoiceStatus::Pending => {
                row.invoice.mark_in_progress()?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn save(&self, invoice: &Invoice) -> Result<(), ZatcaError> {
        invoice.check_invariants()?;
        let mut rows = self.rows.write().await;
        if rows.values().any(|r| {
            r.invoice.id != invoice.id && r.invoice.invoice_number == invoice.invoice_number
        }) {
            return Err(ZatcaError::DuplicateInvoiceNumber(
                invoice.invoice_number.clone(),
            ));
        }
        let row = rows.get_mut(&invoice.id).ok_or_else(|| not_found(invoice.id))?;
        row.invoice = invoice.clone();
        Ok(())
    }

    async fn requeue_failed(&self, id: Uuid) -> Result<(), ZatcaError> {
        let mut rows = self.rows.write().await;
        let row = rows.get_mut(&id).ok_or_else(|| not_found(id))?;
        row.invoice.reset_to_pending()
    }

    async fn count_by_status(&self, status: InvoiceStatus) -> Result<usize, ZatcaError> {
        Ok(self
            .rows
            .read()
            .await
            .values()
            .filter(|r| r.invoice.status == status)
            .count())
    }

    async fn list(&self, query: &ListQuery) -> Result<Vec<Invoice>, ZatcaError> {
        let rows = self.rows.read().await;
        let mut matching: Vec<&Row> = rows
            .values()
            .filter(|r| query.status.is_none_or(|s| r.invoice.status == s))
            .collect();
        matching.sort_by_key(|r| std::cmp::Reverse((r.invoice.created_at, r.seq)));
        Ok(matching
            .into_iter()
            .skip(query.offset)
            .take(query.limit)
            .map(|r| r.invoice.clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::*;
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;

    fn invoice(number: &str, minute: u32) -> Invoice {
        InvoiceBuilder::new(number, Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap())
            .seller(Seller {
                name: "Store".into(),
                address: "Jeddah".into(),
                vat_number: "300000000000003".into(),
            })
            .buyer(Buyer {
                id: "A-1".into(),
                name: "Buyer".into(),
            })
            .total(dec!(10))
            .created_at(Utc.with_ymd_and_hms(2024, 5, 1, 9, minute, 0).unwrap())
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn duplicate_number_rejected() {
        let store = InMemoryStore::new();
        store.insert(invoice("INV-1", 0)).await.unwrap();
        let err = store.insert(invoice("INV-1", 1)).await.unwrap_err();
        assert!(matches!(err, ZatcaError::DuplicateInvoiceNumber(n) if n == "INV-1"));
    }

    #[tokio::test]
    async fn pending_oldest_first_with_insertion_tiebreak() {
        let store = InMemoryStore::new();
        store.insert(invoice("late", 30)).await.unwrap();
        store.insert(invoice("tie-a", 10)).await.unwrap();
        store.insert(invoice("tie-b", 10)).await.unwrap();
        store.insert(invoice("early", 5)).await.unwrap();

        let numbers: Vec<String> = store
            .fetch_pending(3)
            .await
            .unwrap()
            .into_iter()
            .map(|i| i.invoice_number)
            .collect();
        assert_eq!(numbers, ["early", "tie-a", "tie-b"]);
    }

    #[tokio::test]
    async fn claim_is_won_once() {
        let store = InMemoryStore::new();
        let inv = invoice("INV-1", 0);
        let id = inv.id;
        store.insert(inv).await.unwrap();

        assert!(store.claim(id).await.unwrap());
        assert!(!store.claim(id).await.unwrap());
        assert!(!store.claim(Uuid::new_v4()).await.unwrap());
        assert_eq!(
            store.get(id).await.unwrap().unwrap().status,
            InvoiceStatus::InProgress
        );
    }

    #[tokio::test]
    async fn concurrent_claims_have_one_winner() {
        let store = InMemoryStore::new();
        let inv = invoice("INV-1", 0);
        let id = inv.id;
        store.insert(inv).await.unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.claim(id).await.unwrap() })
            })
            .collect();
        let mut wins = 0;
        for h in handles {
            if h.await.unwrap() {
                wins += 1;
            }
        }
        assert_eq!(wins, 1);
    }

    #[tokio::test]
    async fn list_newest_first_and_counts() {
        let store = InMemoryStore::new();
        for (n, m) in [("a", 1), ("b", 2), ("c", 3)] {
            store.insert(invoice(n, m)).await.unwrap();
        }
        let page = store
            .list(&ListQuery {
                status: None,
                limit: 2,
                offset: 1,
            })
            .await
            .unwrap();
        let numbers: Vec<&str> = page.iter().map(|i| i.invoice_number.as_str()).collect();
        assert_eq!(numbers, ["b", "a"]);

        let counts = store.status_counts().await.unwrap();
        assert_eq!(counts[&InvoiceStatus::Pending], 3);
        assert_eq!(counts[&InvoiceStatus::Done], 0);
        assert_eq!(counts.len(), 4);
    }

    #[tokio::test]
    async fn requeue_only_failed() {
        let store = InMemoryStore::new();
        let mut inv = invoice("INV-1", 0);
        let id = inv.id;
        store.insert(inv.clone()).await.unwrap();
        assert!(store.requeue_failed(id).await.is_err());

        inv.mark_in_progress().unwrap();
        inv.mark_failed("boom", DEFAULT_ERROR_CAP);
        store.save(&inv).await.unwrap();
        store.requeue_failed(id).await.unwrap();

        let back = store.get(id).await.unwrap().unwrap();
        assert_eq!(back.status, InvoiceStatus::Pending);
        assert!(back.last_error.is_none());
    }

    #[tokio::test]
    async fn delete_removes_items_with_invoice() {
        let store = InMemoryStore::new();
        let inv = invoice("INV-1", 0);
        let id = inv.id;
        store.insert(inv).await.unwrap();
        assert!(store.delete(id).await.unwrap());
        assert!(!store.delete(id).await.unwrap());
        assert!(store.get(id).await.unwrap().is_none());
    }
}
