//! Invoice business operations on top of any [`InvoiceDatabase`].
//!
//! The service splits the backend's upsert into explicit `add` and `update`
//! operations: adding an invoice that is already stored or updating one that
//! is not are caller mistakes, reported before the backend is written to.

use std::sync::Arc;

use tracing::{error, info};

use crate::core::database::InvoiceDatabase;
use crate::core::error::ServiceError;
use crate::core::invoice::Invoice;
use crate::service::ServiceResult;

/// Invoice service over a shared backend handle.
#[derive(Clone)]
pub struct InvoiceService<D: InvoiceDatabase> {
    database: Arc<D>,
}

impl<D: InvoiceDatabase> InvoiceService<D> {
    pub fn new(database: Arc<D>) -> Self {
        Self { database }
    }

    /// Add a new invoice. An invoice carrying an id that is already stored
    /// is rejected; use [`update`](Self::update) for that.
    pub async fn add(&self, invoice: &Invoice) -> ServiceResult<Invoice> {
        if let Some(id) = invoice.id {
            if self.database.exists(id).await? {
                error!(id, "attempt to add an invoice that already exists");
                return Err(ServiceError::AlreadyExists(format!(
                    "invoice with id {id} already exists"
                )));
            }
        }
        let saved = self.database.save(invoice).await?;
        info!(id = saved.id, number = %saved.number, "invoice added");
        Ok(saved)
    }

    /// Replace a stored invoice. The invoice must carry the id of an
    /// existing one.
    pub async fn update(&self, invoice: &Invoice) -> ServiceResult<Invoice> {
        let id = invoice.id.ok_or_else(|| {
            error!("attempt to update an invoice without an id");
            ServiceError::InvalidArgument("invoice id is required for update".to_string())
        })?;
        if !self.database.exists(id).await? {
            error!(id, "attempt to update a non-existing invoice");
            return Err(ServiceError::NotFound(format!(
                "no invoice with id: {id}"
            )));
        }
        let saved = self.database.save(invoice).await?;
        info!(id, "invoice updated");
        Ok(saved)
    }

    pub async fn delete_by_id(&self, id: i64) -> ServiceResult<()> {
        if !self.database.exists(id).await? {
            error!(id, "attempt to delete a non-existing invoice");
            return Err(ServiceError::NotFound(format!(
                "no invoice with id: {id}"
            )));
        }
        self.database.delete(id).await?;
        info!(id, "invoice deleted");
        Ok(())
    }

    pub async fn get_by_id(&self, id: i64) -> ServiceResult<Option<Invoice>> {
        Ok(self.database.get_by_id(id).await?)
    }

    pub async fn get_by_number(&self, number: &str) -> ServiceResult<Option<Invoice>> {
        Ok(self.database.get_by_number(number).await?)
    }

    pub async fn get_all(&self) -> ServiceResult<Vec<Invoice>> {
        Ok(self.database.get_all().await?)
    }

    pub async fn delete_all(&self) -> ServiceResult<()> {
        self.database.delete_all().await?;
        info!("all invoices deleted");
        Ok(())
    }

    pub async fn exists(&self, id: i64) -> ServiceResult<bool> {
        Ok(self.database.exists(id).await?)
    }

    pub async fn count(&self) -> ServiceResult<u64> {
        Ok(self.database.count().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::invoice::{Company, InvoiceEntry, Vat};
    use crate::storage::in_memory::InMemoryDatabase;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn service() -> InvoiceService<InMemoryDatabase> {
        InvoiceService::new(Arc::new(InMemoryDatabase::new()))
    }

    fn invoice(number: &str) -> Invoice {
        let company = |name: &str| Company {
            id: None,
            name: name.to_string(),
            address: "ul. Testowa 1".to_string(),
            tax_id: "111-222-33-44".to_string(),
            account_number: "PL00000000000000000000000000".to_string(),
            phone_number: "+48 000 000 000".to_string(),
            email: format!("{}@example.com", name.to_lowercase()),
        };
        Invoice {
            id: None,
            number: number.to_string(),
            issued_date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            due_date: NaiveDate::from_ymd_opt(2024, 5, 15).unwrap(),
            seller: company("Seller"),
            buyer: company("Buyer"),
            entries: vec![InvoiceEntry {
                id: None,
                description: "consulting".to_string(),
                quantity: 2,
                price: dec!(100.00),
                net_value: dec!(200.00),
                gross_value: dec!(246.00),
                vat_rate: Vat::Vat23,
            }],
        }
    }

    #[tokio::test]
    async fn add_assigns_id_and_rejects_resubmission() {
        let service = service();
        let saved = service.add(&invoice("INV-1")).await.unwrap();
        assert_eq!(saved.id, Some(1));

        assert!(matches!(
            service.add(&saved).await,
            Err(ServiceError::AlreadyExists(_))
        ));
        assert_eq!(service.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn update_requires_a_stored_invoice() {
        let service = service();

        assert!(matches!(
            service.update(&invoice("INV-1")).await,
            Err(ServiceError::InvalidArgument(_))
        ));

        let phantom = invoice("INV-1").with_id(9);
        assert!(matches!(
            service.update(&phantom).await,
            Err(ServiceError::NotFound(_))
        ));

        let saved = service.add(&invoice("INV-1")).await.unwrap();
        let mut changed = saved.clone();
        changed.number = "INV-1-corrected".to_string();
        let updated = service.update(&changed).await.unwrap();
        assert_eq!(updated.id, saved.id);
        assert_eq!(
            service.get_by_id(1).await.unwrap().unwrap().number,
            "INV-1-corrected"
        );
    }

    #[tokio::test]
    async fn delete_by_id_checks_existence_first() {
        let service = service();
        assert!(matches!(
            service.delete_by_id(1).await,
            Err(ServiceError::NotFound(_))
        ));

        service.add(&invoice("INV-1")).await.unwrap();
        service.delete_by_id(1).await.unwrap();
        assert!(service.get_by_id(1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn absent_lookups_are_none_not_errors() {
        let service = service();
        assert!(service.get_by_id(7).await.unwrap().is_none());
        assert!(service.get_by_number("INV-7").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn delete_all_empties_the_store() {
        let service = service();
        service.add(&invoice("INV-1")).await.unwrap();
        service.add(&invoice("INV-2")).await.unwrap();

        service.delete_all().await.unwrap();
        assert_eq!(service.count().await.unwrap(), 0);
        assert!(service.get_all().await.unwrap().is_empty());
    }
}
