use std::collections::BTreeMap;
use std::fmt;

use eyre::Result;
use log::{error, info, warn};
use serde::{Deserialize, Serialize};

use crate::invoice_service::InvoiceStore;
use crate::models::{Invoice, InvoiceChanges, NewInvoice};
use crate::pages::{Cached, PageCache};
use crate::utils::{cents_to_dollars, dollars_to_cents, today};

pub const INVOICES_PATH: &str = "/dashboard/invoices";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InvoiceStatus {
    Pending,
    Paid,
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(Self::Pending),
            "paid" => Some(Self::Paid),
            _ => None,
        }
    }
}

/// Invoice fields exactly as the form submitted them.
#[derive(Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceForm {
    pub customer_id: Option<String>,
    pub amount: Option<String>,
    pub status: Option<String>,
}

/// Messages per offending form field, keyed by the form's field name.
pub type FieldErrors = BTreeMap<&'static str, Vec<String>>;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
#[error("invalid invoice fields")]
pub struct ValidationError {
    pub errors: FieldErrors,
}

/// Invoice fields after coercion. Amounts are already in cents.
#[derive(Debug, Clone, PartialEq)]
pub struct InvoiceInput {
    pub customer_id: String,
    pub amount_in_cents: i32,
    pub status: InvoiceStatus,
}

impl InvoiceInput {
    /// Checks and coerces every field, collecting all messages before failing.
    pub fn parse(form: &InvoiceForm) -> Result<Self, ValidationError> {
        let mut errors = FieldErrors::new();

        let customer_id = trimmed(&form.customer_id);
        if customer_id.is_empty() {
            errors
                .entry("customerId")
                .or_default()
                .push("Please select a customer.".to_string());
        }

        let amount_in_cents = match parse_amount(trimmed(&form.amount)) {
            Ok(cents) => Some(cents),
            Err(message) => {
                errors.entry("amount").or_default().push(message.to_string());
                None
            }
        };

        let status = InvoiceStatus::parse(trimmed(&form.status));
        if status.is_none() {
            errors
                .entry("status")
                .or_default()
                .push("Please select an invoice status.".to_string());
        }

        match (amount_in_cents, status) {
            (Some(amount_in_cents), Some(status)) if errors.is_empty() => Ok(Self {
                customer_id: customer_id.to_string(),
                amount_in_cents,
                status,
            }),
            _ => Err(ValidationError { errors }),
        }
    }

    pub fn into_new_invoice(self, date: chrono::NaiveDate) -> NewInvoice {
        NewInvoice {
            customer_id: self.customer_id,
            amount: self.amount_in_cents,
            status: self.status.as_str().to_string(),
            date,
        }
    }

    pub fn into_changes(self) -> InvoiceChanges {
        InvoiceChanges {
            customer_id: self.customer_id,
            amount: self.amount_in_cents,
            status: self.status.as_str().to_string(),
        }
    }
}

fn trimmed(field: &Option<String>) -> &str {
    field.as_deref().map(str::trim).unwrap_or_default()
}

fn parse_amount(raw: &str) -> Result<i32, &'static str> {
    let dollars = raw
        .parse::<f64>()
        .ok()
        .filter(|dollars| dollars.is_finite())
        .ok_or("Please enter a valid amount.")?;
    if dollars <= 0.0 {
        return Err("Please enter an amount greater than $0.");
    }
    match dollars_to_cents(dollars) {
        Some(cents) if cents > 0 => Ok(cents),
        Some(_) => Err("Please enter an amount greater than $0."),
        None => Err("Amount is too large."),
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mutation {
    Create,
    Update,
    Delete,
}

const CREATE_INVALID: &str = "Missing Fields. Failed to Create Invoice.";
const UPDATE_INVALID: &str = "Missing Fields. Failed to Update Invoice.";

impl Mutation {
    fn failure_message(&self) -> &'static str {
        match self {
            Self::Create => "Database Error: failed to create invoice",
            Self::Update => "Database error: failed to update invoice",
            Self::Delete => "Database error: failed to delete invoice",
        }
    }
}

impl fmt::Display for Mutation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Create => f.write_str("create"),
            Self::Update => f.write_str("update"),
            Self::Delete => f.write_str("delete"),
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ActionError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("failed to {mutation} invoice: {cause}")]
    Persistence {
        mutation: Mutation,
        cause: eyre::Report,
    },
}

impl ActionError {
    fn persistence(mutation: Mutation) -> impl FnOnce(eyre::Report) -> Self {
        move |cause| Self::Persistence { mutation, cause }
    }

    fn into_outcome(self, invalid_message: &'static str) -> ActionOutcome {
        match self {
            Self::Validation(ValidationError { errors }) => {
                warn!("Rejected invoice form: {:?}", errors.keys());
                ActionOutcome::Invalid(ActionState {
                    errors: Some(errors),
                    message: Some(invalid_message.to_string()),
                })
            }
            Self::Persistence { mutation, cause } => persistence_failure(mutation, cause),
        }
    }
}

/// The storage cause is logged here and never reaches the form.
fn persistence_failure(mutation: Mutation, cause: eyre::Report) -> ActionOutcome {
    error!("Failed to {mutation} invoice: {cause}");
    ActionOutcome::failed(mutation.failure_message())
}

/// State handed back to the form after a rejected action.
#[derive(Serialize, Debug, Clone, Default, PartialEq)]
pub struct ActionState {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<FieldErrors>,
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ActionOutcome {
    /// Succeeded; the caller should send the user to this path.
    Redirect(String),
    /// Succeeded; the caller stays on the current page.
    Done,
    Invalid(ActionState),
    Failed(ActionState),
}

impl ActionOutcome {
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(ActionState {
            errors: None,
            message: Some(message.into()),
        })
    }
}

/// Invoice prepared for the edit form, amount back in dollars.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceEdit {
    pub id: String,
    pub customer_id: String,
    pub amount: f64,
    pub status: String,
}

impl From<Invoice> for InvoiceEdit {
    fn from(invoice: Invoice) -> Self {
        Self {
            id: invoice.id,
            customer_id: invoice.customer_id,
            amount: cents_to_dollars(invoice.amount),
            status: invoice.status,
        }
    }
}

pub struct InvoiceManager<S, C> {
    store: S,
    pages: C,
}

impl<S: InvoiceStore, C: PageCache> InvoiceManager<S, C> {
    pub fn new(store: S, pages: C) -> Self {
        Self { store, pages }
    }

    pub async fn create_invoice(&self, form: &InvoiceForm) -> ActionOutcome {
        match self.try_create(form).await {
            Ok(()) => self.revalidate_and_redirect(),
            Err(err) => err.into_outcome(CREATE_INVALID),
        }
    }

    async fn try_create(&self, form: &InvoiceForm) -> Result<(), ActionError> {
        let invoice = InvoiceInput::parse(form)?.into_new_invoice(today());
        info!(
            "Creating invoice for customer {} ({} cents)",
            invoice.customer_id, invoice.amount
        );
        self.store
            .insert_invoice(invoice)
            .await
            .map_err(ActionError::persistence(Mutation::Create))
    }

    /// `id` comes from routing and is trusted; an unknown id updates nothing.
    pub async fn update_invoice(&self, id: &str, form: &InvoiceForm) -> ActionOutcome {
        match self.try_update(id, form).await {
            Ok(()) => self.revalidate_and_redirect(),
            Err(err) => err.into_outcome(UPDATE_INVALID),
        }
    }

    async fn try_update(&self, id: &str, form: &InvoiceForm) -> Result<(), ActionError> {
        let changes = InvoiceInput::parse(form)?.into_changes();
        let affected = self
            .store
            .update_invoice(id, changes)
            .await
            .map_err(ActionError::persistence(Mutation::Update))?;
        info!("Updated invoice {id} ({affected} rows)");
        Ok(())
    }

    pub async fn delete_invoice(&self, id: &str) -> ActionOutcome {
        match self.store.delete_invoice(id).await {
            Ok(affected) => {
                info!("Deleted invoice {id} ({affected} rows)");
                self.pages.revalidate_path(INVOICES_PATH);
                ActionOutcome::Done
            }
            Err(cause) => persistence_failure(Mutation::Delete, cause),
        }
    }

    fn revalidate_and_redirect(&self) -> ActionOutcome {
        self.pages.revalidate_path(INVOICES_PATH);
        ActionOutcome::Redirect(INVOICES_PATH.to_string())
    }

    /// Rendered invoice listing, served from the page cache while it is fresh.
    /// A render that races a revalidation is returned but not cached.
    pub async fn list_invoices(&self) -> Result<String> {
        let generation = match self.pages.cached(INVOICES_PATH) {
            Cached::Hit(body) => return Ok(body),
            Cached::Miss { generation } => generation,
        };
        let invoices = self.store.fetch_invoices().await?;
        let body = serde_json::to_string(&invoices)?;
        self.pages.store(INVOICES_PATH, generation, body.clone());
        Ok(body)
    }

    pub async fn get_invoice(&self, id: &str) -> Result<Option<InvoiceEdit>> {
        Ok(self
            .store
            .fetch_invoice_by_id(id)
            .await?
            .map(InvoiceEdit::from))
    }
}
