use crate::auth::CredentialsProvider;
use crate::invoice_service::InvoiceService;
use crate::invoices::InvoiceManager;
use crate::pages::MemoryPageCache;
use crate::user_service::UserService;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub invoice_manager: Arc<InvoiceManager<InvoiceService, MemoryPageCache>>,
    pub sign_in: Arc<CredentialsProvider<UserService>>,
}
