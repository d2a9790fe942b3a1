use std::sync::Arc;
use actix_web::{web, App, HttpServer};
use log::info;
use crate::app_state::AppState;
use crate::auth::CredentialsProvider;
use crate::config::Config;
use crate::controller::{create_invoice, delete_invoice, edit_invoice, list_invoices, login, update_invoice};
use crate::db::Database;
use crate::invoice_service::InvoiceService;
use crate::invoices::InvoiceManager;
use crate::pages::MemoryPageCache;
use crate::user_service::UserService;

mod app_state;
mod auth;
mod config;
mod controller;
mod db;
mod invoice_service;
mod invoices;
mod logger;
mod models;
mod pages;
mod schema;
mod user_service;
mod utils;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;
    logger::setup_logger(&config.log_path, config.log_level)?;

    let database = Arc::new(Database::establish(&config.database_url)?);

    let state = AppState {
        invoice_manager: Arc::new(InvoiceManager::new(
            InvoiceService::new(Arc::clone(&database)),
            MemoryPageCache::default(),
        )),
        sign_in: Arc::new(CredentialsProvider::new(UserService::new(Arc::clone(&database)))),
    };

    info!("Listening on {}:{}", config.host, config.port);
    HttpServer::new(move || {
        App::new().app_data(web::Data::new(state.clone()))
            .route("/dashboard/invoices", web::get().to(list_invoices))
            .route("/dashboard/invoices/create", web::post().to(create_invoice))
            .route("/dashboard/invoices/{id}/edit", web::get().to(edit_invoice))
            .route("/dashboard/invoices/{id}/edit", web::post().to(update_invoice))
            .route("/dashboard/invoices/{id}/delete", web::post().to(delete_invoice))
            .route("/login", web::post().to(login))
        })
        .bind((config.host.as_str(), config.port))?
        .run()
        .await?
    ;

    info!("Server stopped");
    Ok(())
}
