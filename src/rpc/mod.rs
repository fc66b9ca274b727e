//! HTTP boundary.
//!
//! Procedures are served under `/api/trpc/<router>.<procedure>`: queries as
//! `GET` with input in the query string, mutations as `POST` with a JSON body.
//! Every procedure sits behind the admin session gate; `/api/auth/login` and
//! `/healthz` do not.

mod auth;
mod handlers;
mod response;
mod session;

pub use auth::require_session;
pub use handlers::{CustomerInfoInput, Liveness};
pub use response::{ErrorBody, ErrorDetail, RpcData, RpcResult};
pub use session::{Credentials, IssuedSession, Session, SessionManager};

use crate::budget::BudgetService;
use crate::config::ServerConfig;
use crate::dashboard::{Dashboard, TimestampStore};

use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    /// Dashboard views over the operation layer
    pub dashboard: Arc<Dashboard>,
    /// Session issuer and verifier
    pub sessions: Arc<SessionManager>,
}

impl AppState {
    /// Assemble the state from its parts.
    pub fn new(
        service: Arc<BudgetService>,
        timestamps: Arc<dyn TimestampStore>,
        sessions: SessionManager,
    ) -> Self {
        Self {
            dashboard: Arc::new(Dashboard::new(service, timestamps)),
            sessions: Arc::new(sessions),
        }
    }

    /// The operation layer.
    pub fn service(&self) -> &BudgetService {
        self.dashboard.service()
    }
}

/// Procedure routes, without the session gate.
fn procedures() -> Router<AppState> {
    Router::new()
        .route("/api/trpc/budget.listCustomers", get(handlers::list_customers))
        .route(
            "/api/trpc/budget.listCustomersDetailed",
            get(handlers::list_customers_detailed),
        )
        .route("/api/trpc/budget.getCustomerInfo", get(handlers::get_customer_info))
        .route("/api/trpc/budget.createBudget", post(handlers::create_budget))
        .route("/api/trpc/budget.assignBudget", post(handlers::assign_budget))
        .route(
            "/api/trpc/budget.assignBudgetBatch",
            post(handlers::assign_budget_batch),
        )
        .route("/api/trpc/budget.updateBudget", post(handlers::update_budget))
        .route("/api/trpc/budget.listBudgets", get(handlers::list_budgets))
        .route("/api/trpc/system.health", get(handlers::system_health))
        .route("/api/trpc/system.metrics", get(handlers::system_metrics))
        .route("/api/trpc/dashboard.overview", get(handlers::dashboard_overview))
        .route("/api/trpc/dashboard.customers", get(handlers::dashboard_customers))
        .route("/api/trpc/dashboard.budgets", get(handlers::dashboard_budgets))
        .route("/api/auth/session", get(auth::current_session))
}

/// Build the application router.
pub fn router(state: AppState, server: &ServerConfig) -> Router {
    let gated = procedures().layer(middleware::from_fn_with_state(
        state.clone(),
        auth::require_session,
    ));

    Router::new()
        .route("/healthz", get(handlers::healthz))
        .route("/api/auth/login", post(auth::login))
        .merge(gated)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(server))
        .with_state(state)
}

fn cors_layer(server: &ServerConfig) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if server.cors_origins.is_empty() {
        return layer.allow_origin(Any);
    }

    let origins: Vec<_> = server
        .cors_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();
    layer.allow_origin(origins)
}
