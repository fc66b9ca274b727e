//! Customer and budget operations against the LiteLLM proxy.

use crate::config::{AssignmentEndpoint, ProxyConfig};
use crate::proxy::models::ListEnvelope;
use crate::proxy::{
    AssignBudgetRequest, AssignmentResponse, Budget, CallError, CreateBudgetRequest, Customer,
    CustomerInfo, CustomerRecord, DetailedCustomer, HealthReport, ProxyClient, ProxyStatus,
    UpdateBudgetRequest,
};
use crate::telemetry::{MetricsSnapshot, UpstreamMetrics};
use crate::{Error, Result};

use futures::stream::{self, StreamExt};
use regex::Regex;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};
use tracing::{debug, info, warn};
use validator::Validate;

const LIST_CUSTOMERS_FAILED: &str = "Failed to list customers.";
const LIST_DETAILED_FAILED: &str = "Failed to list detailed customers.";
const CUSTOMER_INFO_FAILED: &str = "Failed to get customer info.";
const CREATE_BUDGET_FAILED: &str = "Failed to create budget.";
const ASSIGN_BUDGET_FAILED: &str = "Failed to assign budget.";
const UPDATE_BUDGET_FAILED: &str = "Failed to update budget.";
const LIST_BUDGETS_FAILED: &str = "Failed to list budgets.";

/// Matches the proxy's database error when an assignment references a missing budget.
fn foreign_key_violation() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)foreign\s+key\s+constraint|\bP2003\b").expect("static pattern is valid")
    })
}

/// Operations exposed to the admin dashboard.
///
/// Every operation validates what it sends and what it receives. Failures talking to
/// the proxy collapse into [`Error::Upstream`]; the one exception is budget
/// assignment against a missing budget, which yields [`Error::NotFound`].
pub struct BudgetService {
    client: ProxyClient,
    assignment_endpoint: AssignmentEndpoint,
    detail_concurrency: Option<usize>,
}

impl BudgetService {
    /// Create a service builder.
    pub fn builder() -> BudgetServiceBuilder {
        BudgetServiceBuilder::new()
    }

    /// Create a service from proxy configuration.
    pub fn new(config: &ProxyConfig, metrics: Arc<UpstreamMetrics>) -> Result<Self> {
        Ok(Self {
            client: ProxyClient::new(config, metrics)?,
            assignment_endpoint: config.assignment_endpoint,
            detail_concurrency: config.detail_concurrency,
        })
    }

    /// The underlying proxy client.
    pub fn client(&self) -> &ProxyClient {
        &self.client
    }

    /// List customers with each budget limit flattened onto the customer.
    pub async fn list_customers(&self) -> Result<Vec<Customer>> {
        let records = self
            .fetch_customer_records()
            .await
            .map_err(|e| e.into_error(LIST_CUSTOMERS_FAILED))?;

        let customers: Vec<Customer> = records.into_iter().map(Customer::from).collect();
        for customer in &customers {
            check_response(customer, LIST_CUSTOMERS_FAILED)?;
        }
        Ok(customers)
    }

    /// List customers enriched with per-customer detail and budget creation dates.
    ///
    /// Issues one `/customer/info` call per customer. A failed detail call degrades
    /// that customer to [`DetailedCustomer::fallback`] instead of failing the list.
    pub async fn list_customers_detailed(&self) -> Result<Vec<DetailedCustomer>> {
        let (customers, budgets) =
            futures::try_join!(self.fetch_customer_records(), self.fetch_budgets())
                .map_err(|e| e.into_error(LIST_DETAILED_FAILED))?;

        let budget_created: HashMap<String, String> = budgets
            .into_iter()
            .filter_map(|budget| budget.created_at.map(|at| (budget.budget_id, at)))
            .collect();

        debug!(
            customers = customers.len(),
            concurrency = ?self.detail_concurrency,
            "fetching customer details"
        );

        let fetches = customers
            .into_iter()
            .map(|base| self.fetch_detail(base, &budget_created));

        let detailed: Vec<DetailedCustomer> = match self.detail_concurrency {
            Some(limit) => stream::iter(fetches).buffered(limit).collect().await,
            None => futures::future::join_all(fetches).await,
        };
        Ok(detailed)
    }

    async fn fetch_detail(
        &self,
        base: CustomerRecord,
        budget_created: &HashMap<String, String>,
    ) -> DetailedCustomer {
        let record = match self.fetch_customer_record(&base.user_id).await {
            Ok(record) => record,
            Err(e) => {
                warn!(
                    user_id = %base.user_id,
                    error = %e,
                    "customer detail fetch failed, using fallback record"
                );
                return DetailedCustomer::fallback(base.user_id, base.email);
            }
        };

        let detailed = enrich(record, budget_created);
        if let Err(e) = detailed.validate() {
            warn!(
                user_id = %base.user_id,
                error = %e,
                "customer detail is invalid, using fallback record"
            );
            return DetailedCustomer::fallback(base.user_id, base.email);
        }
        detailed
    }

    /// Get one customer with its assigned budget as a singleton list.
    pub async fn get_customer_info(&self, end_user_id: &str) -> Result<CustomerInfo> {
        if end_user_id.trim().is_empty() {
            return Err(Error::validation_field(
                "end_user_id is required",
                "end_user_id",
            ));
        }

        let record = self
            .fetch_customer_record(end_user_id)
            .await
            .map_err(|e| e.into_error(CUSTOMER_INFO_FAILED))?;

        let info = CustomerInfo::from(record);
        check_response(&info, CUSTOMER_INFO_FAILED)?;
        Ok(info)
    }

    /// Create a budget.
    pub async fn create_budget(&self, request: CreateBudgetRequest) -> Result<Budget> {
        request.validate()?;

        let budget: Budget = self
            .client
            .post("/budget/new", &request)
            .await
            .map_err(|e| e.into_error(CREATE_BUDGET_FAILED))?;

        check_response(&budget, CREATE_BUDGET_FAILED)?;
        info!(budget_id = %budget.budget_id, max_budget = ?budget.max_budget, "budget created");
        Ok(budget)
    }

    /// Assign an existing budget to a customer.
    ///
    /// The budget list is checked first; a missing budget fails with
    /// [`Error::NotFound`] without calling the assignment endpoint.
    pub async fn assign_budget(&self, request: AssignBudgetRequest) -> Result<AssignmentResponse> {
        request.validate()?;

        let budgets = self.list_budgets().await?;
        ensure_budget_exists(&budgets, &request.budget_id)?;

        let response = self.post_assignment(&request).await?;
        info!(user_id = %request.user_id, budget_id = %request.budget_id, "budget assigned");
        Ok(response)
    }

    /// Post one assignment, translating foreign-key failures into not-found.
    pub(crate) async fn post_assignment(
        &self,
        request: &AssignBudgetRequest,
    ) -> Result<AssignmentResponse> {
        self.client
            .post(self.assignment_endpoint.path(), request)
            .await
            .map_err(|e| assignment_error(e, &request.budget_id))
    }

    /// Update a budget's spending limit.
    pub async fn update_budget(&self, request: UpdateBudgetRequest) -> Result<Budget> {
        request.validate()?;

        let budget: Budget = self
            .client
            .post("/budget/update", &request)
            .await
            .map_err(|e| e.into_error(UPDATE_BUDGET_FAILED))?;

        check_response(&budget, UPDATE_BUDGET_FAILED)?;
        info!(budget_id = %budget.budget_id, max_budget = ?budget.max_budget, "budget updated");
        Ok(budget)
    }

    /// List all budgets.
    pub async fn list_budgets(&self) -> Result<Vec<Budget>> {
        let budgets = self
            .fetch_budgets()
            .await
            .map_err(|e| e.into_error(LIST_BUDGETS_FAILED))?;

        for budget in &budgets {
            check_response(budget, LIST_BUDGETS_FAILED)?;
        }
        Ok(budgets)
    }

    /// Report whether the proxy is reachable. Never fails.
    pub async fn health(&self) -> HealthReport {
        let status = if self.client.health_check().await {
            ProxyStatus::Online
        } else {
            ProxyStatus::Offline
        };
        HealthReport { status }
    }

    /// Upstream call counters.
    pub fn metrics(&self) -> MetricsSnapshot {
        self.client.metrics().snapshot()
    }

    async fn fetch_customer_records(&self) -> std::result::Result<Vec<CustomerRecord>, CallError> {
        self.client
            .get::<ListEnvelope<CustomerRecord>>("/customer/list")
            .await
            .map(ListEnvelope::into_vec)
    }

    async fn fetch_customer_record(
        &self,
        end_user_id: &str,
    ) -> std::result::Result<CustomerRecord, CallError> {
        self.client
            .get_with_query("/customer/info", &[("end_user_id", end_user_id)])
            .await
    }

    async fn fetch_budgets(&self) -> std::result::Result<Vec<Budget>, CallError> {
        self.client
            .get::<ListEnvelope<Budget>>("/budget/list")
            .await
            .map(ListEnvelope::into_vec)
    }
}

fn enrich(record: CustomerRecord, budget_created: &HashMap<String, String>) -> DetailedCustomer {
    let max_budget = record.max_budget();
    let mut table = record.litellm_budget_table;

    if let Some(table) = table.as_mut() {
        let created = table
            .budget_id
            .as_deref()
            .and_then(|id| budget_created.get(id));
        if let Some(created) = created {
            table.created_at = Some(created.clone());
        }
    }

    DetailedCustomer {
        user_id: record.user_id,
        email: record.email,
        spend: record.spend,
        max_budget,
        created_at: record.created_at,
        blocked: record.blocked,
        litellm_budget_table: table,
    }
}

fn missing_budget_message(budget_id: &str) -> String {
    format!(
        "Budget '{}' does not exist. Create it first, then assign it.",
        budget_id
    )
}

pub(crate) fn ensure_budget_exists(budgets: &[Budget], budget_id: &str) -> Result<()> {
    if budgets.iter().any(|budget| budget.budget_id == budget_id) {
        Ok(())
    } else {
        Err(Error::not_found(missing_budget_message(budget_id)))
    }
}

fn assignment_error(error: CallError, budget_id: &str) -> Error {
    let is_missing_budget = error
        .proxy_message()
        .is_some_and(|message| foreign_key_violation().is_match(message));

    if is_missing_budget {
        Error::not_found(missing_budget_message(budget_id))
    } else {
        error.into_error(ASSIGN_BUDGET_FAILED)
    }
}

fn check_response<T: Validate>(value: &T, fallback: &str) -> Result<()> {
    value.validate().map_err(|errors| {
        warn!(error = %errors, "proxy returned data that failed validation");
        Error::upstream(fallback)
    })
}

/// Builder for [`BudgetService`].
pub struct BudgetServiceBuilder {
    config: ProxyConfig,
    metrics: Option<Arc<UpstreamMetrics>>,
}

impl BudgetServiceBuilder {
    /// Create a builder with default proxy settings.
    pub fn new() -> Self {
        Self {
            config: ProxyConfig::default(),
            metrics: None,
        }
    }

    /// Use the given proxy configuration.
    pub fn with_config(mut self, config: ProxyConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the proxy base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.config.base_url = base_url.into();
        self
    }

    /// Set the proxy bearer token.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.config.api_key = api_key.into();
        self
    }

    /// Bound concurrent detail fetches.
    pub fn with_detail_concurrency(mut self, limit: usize) -> Self {
        self.config.detail_concurrency = Some(limit);
        self
    }

    /// Choose the assignment endpoint.
    pub fn with_assignment_endpoint(mut self, endpoint: AssignmentEndpoint) -> Self {
        self.config.assignment_endpoint = endpoint;
        self
    }

    /// Share an existing metrics instance.
    pub fn with_metrics(mut self, metrics: Arc<UpstreamMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Build the service.
    pub fn build(self) -> Result<BudgetService> {
        let metrics = self.metrics.unwrap_or_default();
        BudgetService::new(&self.config, metrics)
    }
}

impl Default for BudgetServiceBuilder {
    fn default() -> Self {
        Self::new()
    }
}
