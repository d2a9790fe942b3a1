use std::sync::Arc;

use diesel::prelude::*;
use eyre::Result;

use crate::db::Database;
use crate::models::{Invoice, InvoiceChanges, NewInvoice};

/// One statement per call. Row counts are returned, never checked here.
pub trait InvoiceStore {
    async fn insert_invoice(&self, invoice: NewInvoice) -> Result<()>;

    async fn update_invoice(&self, id: &str, changes: InvoiceChanges) -> Result<usize>;

    async fn delete_invoice(&self, id: &str) -> Result<usize>;

    async fn fetch_invoices(&self) -> Result<Vec<Invoice>>;

    async fn fetch_invoice_by_id(&self, id: &str) -> Result<Option<Invoice>>;
}

pub struct InvoiceService {
    db: Arc<Database>,
}

impl InvoiceService {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }
}

impl InvoiceStore for InvoiceService {
    async fn insert_invoice(&self, new_invoice: NewInvoice) -> Result<()> {
        use crate::schema::invoices;

        self.db
            .run(|connection| {
                diesel::insert_into(invoices::table)
                    .values(&new_invoice)
                    .execute(connection)
            })
            .await?;
        Ok(())
    }

    async fn update_invoice(&self, invoice_id: &str, changes: InvoiceChanges) -> Result<usize> {
        use crate::schema::invoices::dsl::*;

        Ok(self
            .db
            .run(|connection| {
                diesel::update(invoices.find(invoice_id))
                    .set(&changes)
                    .execute(connection)
            })
            .await?)
    }

    async fn delete_invoice(&self, invoice_id: &str) -> Result<usize> {
        use crate::schema::invoices::dsl::*;

        Ok(self
            .db
            .run(|connection| diesel::delete(invoices.find(invoice_id)).execute(connection))
            .await?)
    }

    async fn fetch_invoices(&self) -> Result<Vec<Invoice>> {
        use crate::schema::invoices::dsl::*;

        Ok(self
            .db
            .run(|connection| {
                invoices
                    .order(date.desc())
                    .select(Invoice::as_select())
                    .load(connection)
            })
            .await?)
    }

    async fn fetch_invoice_by_id(&self, invoice_id: &str) -> Result<Option<Invoice>> {
        use crate::schema::invoices::dsl::*;

        Ok(self
            .db
            .run(|connection| {
                invoices
                    .find(invoice_id)
                    .select(Invoice::as_select())
                    .first(connection)
                    .optional()
            })
            .await?)
    }
}
