pub mod application;
pub mod config;
pub mod db;
pub mod domain;
pub mod errors;
pub mod handlers;
pub mod infrastructure;
pub mod schema;

use actix_web::{middleware::Logger, web, App, HttpServer};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use application::alert_service::AlertService;
use application::inventory_service::InventoryService;
use application::order_service::OrderService;
use infrastructure::alert_repo::DieselAlertRepository;
use infrastructure::ledger::DieselStockLedger;
use infrastructure::order_repo::DieselOrderRepository;
use infrastructure::product_repo::DieselProductCatalog;

pub use config::Config;
pub use db::{create_pool, DbPool};

pub type Orders = OrderService<DieselOrderRepository>;
pub type Inventory = InventoryService<DieselStockLedger>;
pub type Alerts = AlertService<DieselAlertRepository>;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Run any pending Diesel migrations against the pool's database.
pub fn run_migrations(pool: &DbPool) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut conn = pool.get()?;
    let applied = conn.run_pending_migrations(MIGRATIONS)?;
    log::info!("Applied {} pending migration(s)", applied.len());
    Ok(())
}

/// Build and return an actix-web `Server` bound to `config.host:config.port`.
///
/// The caller is responsible for `.await`-ing (or `tokio::spawn`-ing) the
/// returned server.
pub fn build_server(pool: DbPool, config: &Config) -> std::io::Result<actix_web::dev::Server> {
    let orders = web::Data::new(Orders::new(
        DieselOrderRepository::new(pool.clone()),
        config.reserve_stock,
    ));
    let inventory = web::Data::new(Inventory::new(DieselStockLedger::new(pool.clone())));
    let alerts = web::Data::new(Alerts::new(DieselAlertRepository::new(pool.clone())));
    let catalog = web::Data::new(DieselProductCatalog::new(pool));

    Ok(HttpServer::new(move || {
        App::new()
            .app_data(orders.clone())
            .app_data(inventory.clone())
            .app_data(alerts.clone())
            .app_data(catalog.clone())
            .wrap(Logger::default())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-docs/openapi.json", handlers::ApiDoc::openapi()),
            )
            .service(
                web::scope("/orders")
                    .route("", web::post().to(handlers::orders::create_order))
                    .route("", web::get().to(handlers::orders::list_orders))
                    .route(
                        "/payment-callback",
                        web::post().to(handlers::orders::payment_callback),
                    )
                    .route("/{id}", web::get().to(handlers::orders::get_order))
                    .route(
                        "/{id}/status",
                        web::post().to(handlers::orders::transition_status),
                    )
                    .route("/{id}/cancel", web::post().to(handlers::orders::cancel_order))
                    .route("/{id}/refund", web::post().to(handlers::orders::request_refund))
                    .route(
                        "/{id}/refund/decision",
                        web::post().to(handlers::orders::decide_refund),
                    )
                    .route(
                        "/{id}/refund/complete",
                        web::post().to(handlers::orders::complete_refund),
                    )
                    .route("/{id}/payment", web::post().to(handlers::orders::update_payment)),
            )
            .service(
                web::scope("/inventory")
                    .route(
                        "/transactions",
                        web::post().to(handlers::inventory::record_transaction),
                    )
                    .route("/reconcile", web::post().to(handlers::inventory::reconcile))
                    .route(
                        "/{product_id}/history",
                        web::get().to(handlers::inventory::history),
                    )
                    .route("/{product_id}/audit", web::get().to(handlers::inventory::audit)),
            )
            .service(
                web::scope("/alerts")
                    .route("", web::post().to(handlers::alerts::create_alert))
                    .route("", web::get().to(handlers::alerts::list_alerts))
                    .route("/{id}/resolve", web::post().to(handlers::alerts::resolve_alert)),
            )
            .service(
                web::scope("/products")
                    .route("", web::post().to(handlers::products::create_product))
                    .route("/{id}", web::get().to(handlers::products::get_product)),
            )
    })
    .bind((config.host.clone(), config.port))?
    .run())
}
