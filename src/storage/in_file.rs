//! Append-file storage backend.
//!
//! Invoices live in a single file, one JSON document per line. Inserts are
//! appends; updates and deletes rewrite the file through [`LineFile`].
//! The id counter is seeded on open from the highest id present anywhere in
//! the file, not from the last line, so a trailing update of an older
//! invoice cannot roll the counter back onto ids already in use.
//!
//! File I/O is synchronous underneath; every operation hops onto the
//! blocking pool. A `tokio::sync::Mutex` serialises mutations so a rewrite
//! never interleaves with an append.

use std::path::Path;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error};

use crate::core::database::{DatabaseResult, InvoiceDatabase};
use crate::core::error::DatabaseError;
use crate::core::invoice::Invoice;
use crate::storage::line_file::LineFile;

fn encode(invoice: &Invoice) -> DatabaseResult<String> {
    serde_json::to_string(invoice)
        .map_err(|e| DatabaseError::Serialization(format!("failed to encode invoice: {e}")))
}

fn decode(line: &str) -> DatabaseResult<Invoice> {
    serde_json::from_str(line)
        .map_err(|e| DatabaseError::Serialization(format!("malformed invoice line: {e}")))
}

async fn run_blocking<T, F>(f: F) -> DatabaseResult<T>
where
    T: Send + 'static,
    F: FnOnce() -> DatabaseResult<T> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| DatabaseError::operation("blocking file task failed", e))?
}

/// File-backed invoice store.
#[derive(Clone)]
pub struct InFileDatabase {
    file: LineFile,
    next_id: Arc<AtomicI64>,
    write_lock: Arc<tokio::sync::Mutex<()>>,
}

impl InFileDatabase {
    /// Open (or create) the store at `path`, seeding the id counter from
    /// the highest id already on disk. Fails if any existing line does not
    /// decode as an invoice.
    pub async fn open(path: impl AsRef<Path>) -> DatabaseResult<Self> {
        let file = LineFile::new(path.as_ref());
        let seed_file = file.clone();
        let max_id = run_blocking(move || {
            let mut max_id = 0;
            for line in seed_file.read_lines()? {
                let invoice = decode(&line)?;
                max_id = max_id.max(invoice.id.unwrap_or(0));
            }
            Ok(max_id)
        })
        .await?;

        debug!(path = %file.path().display(), max_id, "opened invoice file");
        Ok(Self {
            file,
            next_id: Arc::new(AtomicI64::new(max_id)),
            write_lock: Arc::new(tokio::sync::Mutex::new(())),
        })
    }

    async fn read_all(&self) -> DatabaseResult<Vec<Invoice>> {
        let file = self.file.clone();
        run_blocking(move || file.read_lines()?.iter().map(|l| decode(l)).collect()).await
    }
}

#[async_trait]
impl InvoiceDatabase for InFileDatabase {
    async fn save(&self, invoice: &Invoice) -> DatabaseResult<Invoice> {
        let _guard = self.write_lock.lock().await;
        let file = self.file.clone();
        let next_id = Arc::clone(&self.next_id);
        let invoice = invoice.clone();

        run_blocking(move || {
            if let Some(id) = invoice.id {
                let updated = invoice.with_id(id);
                let line = encode(&updated)?;
                let replaced = file.map_lines(|l| {
                    decode(l)
                        .ok()
                        .filter(|existing| existing.id == Some(id))
                        .map(|_| line.clone())
                })?;
                if replaced > 0 {
                    debug!(id, "invoice updated in file");
                    return Ok(updated);
                }
            }

            let id = next_id.fetch_add(1, Ordering::SeqCst) + 1;
            let inserted = invoice.with_id(id);
            file.append_line(&encode(&inserted)?)?;
            debug!(id, "invoice appended to file");
            Ok(inserted)
        })
        .await
    }

    async fn delete(&self, id: i64) -> DatabaseResult<()> {
        let _guard = self.write_lock.lock().await;
        let file = self.file.clone();

        run_blocking(move || {
            let dropped = file.retain_lines(|l| {
                decode(l).map(|i| i.id != Some(id)).unwrap_or(true)
            })?;
            if dropped == 0 {
                error!(id, "attempt to delete a non-existing invoice");
                return Err(DatabaseError::not_found_invoice(id));
            }
            Ok(())
        })
        .await
    }

    async fn get_by_id(&self, id: i64) -> DatabaseResult<Option<Invoice>> {
        Ok(self.read_all().await?.into_iter().find(|i| i.id == Some(id)))
    }

    async fn get_by_number(&self, number: &str) -> DatabaseResult<Option<Invoice>> {
        Ok(self
            .read_all()
            .await?
            .into_iter()
            .find(|i| i.number == number))
    }

    async fn get_all(&self) -> DatabaseResult<Vec<Invoice>> {
        self.read_all().await
    }

    async fn delete_all(&self) -> DatabaseResult<()> {
        let _guard = self.write_lock.lock().await;
        let file = self.file.clone();
        run_blocking(move || Ok(file.clear()?)).await
    }

    async fn exists(&self, id: i64) -> DatabaseResult<bool> {
        Ok(self.get_by_id(id).await?.is_some())
    }

    async fn count(&self) -> DatabaseResult<u64> {
        Ok(self.read_all().await?.len() as u64)
    }
}
