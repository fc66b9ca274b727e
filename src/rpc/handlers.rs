//! Procedure handlers. Each one unwraps its input and delegates to the
//! operation layer.

use super::response::{json_input, query_input, RpcResult};
use super::AppState;
use crate::budget::{BatchAssignReport, BatchAssignRequest};
use crate::dashboard::{BudgetPage, BudgetQuery, CustomerPage, CustomerQuery, Overview};
use crate::proxy::{
    AssignBudgetRequest, AssignmentResponse, Budget, CreateBudgetRequest, Customer, CustomerInfo,
    DetailedCustomer, HealthReport, UpdateBudgetRequest,
};
use crate::telemetry::MetricsSnapshot;
use crate::Result;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

type JsonInput<T> = std::result::Result<Json<T>, JsonRejection>;
type QueryInput<T> = std::result::Result<Query<T>, QueryRejection>;

/// Input of `budget.getCustomerInfo`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerInfoInput {
    /// Customer to look up
    pub end_user_id: String,
}

pub async fn list_customers(State(state): State<AppState>) -> Result<RpcResult<Vec<Customer>>> {
    Ok(RpcResult::new(state.service().list_customers().await?))
}

pub async fn list_customers_detailed(
    State(state): State<AppState>,
) -> Result<RpcResult<Vec<DetailedCustomer>>> {
    Ok(RpcResult::new(
        state.service().list_customers_detailed().await?,
    ))
}

pub async fn get_customer_info(
    State(state): State<AppState>,
    input: QueryInput<CustomerInfoInput>,
) -> Result<RpcResult<CustomerInfo>> {
    let input = query_input(input)?;
    Ok(RpcResult::new(
        state.service().get_customer_info(&input.end_user_id).await?,
    ))
}

pub async fn create_budget(
    State(state): State<AppState>,
    input: JsonInput<CreateBudgetRequest>,
) -> Result<RpcResult<Budget>> {
    let request = json_input(input)?;
    Ok(RpcResult::new(state.service().create_budget(request).await?))
}

pub async fn assign_budget(
    State(state): State<AppState>,
    input: JsonInput<AssignBudgetRequest>,
) -> Result<RpcResult<AssignmentResponse>> {
    let request = json_input(input)?;
    Ok(RpcResult::new(state.service().assign_budget(request).await?))
}

pub async fn assign_budget_batch(
    State(state): State<AppState>,
    input: JsonInput<BatchAssignRequest>,
) -> Result<RpcResult<BatchAssignReport>> {
    let request = json_input(input)?;
    Ok(RpcResult::new(
        state.service().assign_budget_batch(request).await?,
    ))
}

pub async fn update_budget(
    State(state): State<AppState>,
    input: JsonInput<UpdateBudgetRequest>,
) -> Result<RpcResult<Budget>> {
    let request = json_input(input)?;
    Ok(RpcResult::new(state.service().update_budget(request).await?))
}

pub async fn list_budgets(State(state): State<AppState>) -> Result<RpcResult<Vec<Budget>>> {
    Ok(RpcResult::new(state.service().list_budgets().await?))
}

pub async fn system_health(State(state): State<AppState>) -> RpcResult<HealthReport> {
    RpcResult::new(state.service().health().await)
}

pub async fn system_metrics(State(state): State<AppState>) -> RpcResult<MetricsSnapshot> {
    RpcResult::new(state.service().metrics())
}

pub async fn dashboard_overview(State(state): State<AppState>) -> Result<RpcResult<Overview>> {
    Ok(RpcResult::new(state.dashboard.overview().await?))
}

pub async fn dashboard_customers(
    State(state): State<AppState>,
    input: QueryInput<CustomerQuery>,
) -> Result<RpcResult<CustomerPage>> {
    let query = query_input(input)?;
    Ok(RpcResult::new(state.dashboard.customers(&query).await?))
}

pub async fn dashboard_budgets(
    State(state): State<AppState>,
    input: QueryInput<BudgetQuery>,
) -> Result<RpcResult<BudgetPage>> {
    let query = query_input(input)?;
    Ok(RpcResult::new(state.dashboard.budgets(&query).await?))
}

/// Liveness of this service, independent of the proxy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Liveness {
    /// Always `ok`
    pub status: String,
    /// Crate version
    pub version: String,
}

/// `GET /healthz`
pub async fn healthz() -> Json<Liveness> {
    Json(Liveness {
        status: "ok".to_string(),
        version: crate::VERSION.to_string(),
    })
}
