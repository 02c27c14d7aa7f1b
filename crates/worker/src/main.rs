//! Worker entry point.

use std::sync::Arc;

use executor::TaskContext;
use saga::services::{
    InMemoryAccountService, InMemoryCreditCardService, InMemoryDiscountTicketService,
    InMemoryNotificationSender, InMemorySeatReservationService,
};
use sqlx::postgres::PgPoolOptions;
use store::{
    InMemoryActionStore, InMemoryOrderStore, InMemoryTaskStore, InMemoryTransactionStore,
    PostgresActionStore, PostgresOrderStore, PostgresTaskStore, PostgresTransactionStore,
};
use tokio::signal;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use worker::{Config, Worker};

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
}

/// Capability gateways for the worker.
///
/// Development defaults: production deployments replace these with the
/// real gateway clients at this single seam.
struct Gateways {
    seat_reservation: Arc<InMemorySeatReservationService>,
    credit_card: Arc<InMemoryCreditCardService>,
    account: Arc<InMemoryAccountService>,
    discount_ticket: Arc<InMemoryDiscountTicketService>,
    notifications: Arc<InMemoryNotificationSender>,
}

impl Gateways {
    fn development() -> Self {
        Self {
            seat_reservation: Arc::new(InMemorySeatReservationService::new()),
            credit_card: Arc::new(InMemoryCreditCardService::new()),
            account: Arc::new(InMemoryAccountService::new()),
            discount_ticket: Arc::new(InMemoryDiscountTicketService::new()),
            notifications: Arc::new(InMemoryNotificationSender::new()),
        }
    }
}

async fn postgres_context(database_url: &str, gateways: Gateways) -> TaskContext {
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await
        .expect("failed to connect to PostgreSQL");

    let transactions = PostgresTransactionStore::new(pool.clone());
    transactions
        .run_migrations()
        .await
        .expect("failed to run migrations");

    TaskContext {
        transactions: Arc::new(transactions),
        actions: Arc::new(PostgresActionStore::new(pool.clone())),
        tasks: Arc::new(PostgresTaskStore::new(pool.clone())),
        orders: Arc::new(PostgresOrderStore::new(pool)),
        seat_reservation: gateways.seat_reservation,
        credit_card: gateways.credit_card,
        account: gateways.account,
        discount_ticket: gateways.discount_ticket,
        notifications: gateways.notifications,
    }
}

fn memory_context(gateways: Gateways) -> TaskContext {
    TaskContext {
        transactions: Arc::new(InMemoryTransactionStore::new()),
        actions: Arc::new(InMemoryActionStore::new()),
        tasks: Arc::new(InMemoryTaskStore::new()),
        orders: Arc::new(InMemoryOrderStore::new()),
        seat_reservation: gateways.seat_reservation,
        credit_card: gateways.credit_card,
        account: gateways.account,
        discount_ticket: gateways.discount_ticket,
        notifications: gateways.notifications,
    }
}

#[tokio::main]
async fn main() {
    // 1. Initialize tracing
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 2. Install Prometheus metrics recorder
    let prometheus_builder = metrics_exporter_prometheus::PrometheusBuilder::new();
    prometheus_builder
        .install()
        .expect("failed to install Prometheus recorder");

    // 3. Build the task context
    let config = Config::from_env();
    let gateways = Gateways::development();
    let context = match &config.database_url {
        Some(database_url) => {
            tracing::info!("using PostgreSQL stores");
            postgres_context(database_url, gateways).await
        }
        None => {
            tracing::info!("DATABASE_URL not set, using in-memory stores");
            memory_context(gateways)
        }
    };

    // 4. Run the worker until a signal arrives
    tracing::info!(
        poll_interval_secs = config.poll_interval_secs,
        "starting worker"
    );
    Worker::new(context, config).run(shutdown_signal()).await;

    tracing::info!("worker shut down gracefully");
}
