//! Dashboard views derived from the operation results.
//!
//! Filtering, pagination and aggregates run in-process over the full lists
//! returned by [`BudgetService`]; nothing here talks to the proxy directly.

mod filter;
mod pagination;
mod stats;
mod timestamps;

pub use filter::{CustomerFilter, CustomerView, StatusFilter};
pub use pagination::{paginate, total_pages, Page, PageSize};
pub use stats::{assignment_counts, budget_rows, BudgetRow, BudgetStats, CustomerStats};
pub use timestamps::{
    format_creation_date, parse_reported, FileTimestampStore, MemoryTimestampStore,
    TimestampStore, UNKNOWN_DATE,
};

use crate::budget::BudgetService;
use crate::proxy::DetailedCustomer;
use crate::Result;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

fn first_page() -> usize {
    1
}

/// Input of `dashboard.customers`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerQuery {
    /// Search text
    #[serde(default)]
    pub search: String,
    /// Activity filter
    #[serde(default)]
    pub status: StatusFilter,
    /// Requested page, 1-based
    #[serde(default = "first_page")]
    pub page: usize,
    /// Rows per page
    #[serde(default)]
    pub page_size: PageSize,
}

impl Default for CustomerQuery {
    fn default() -> Self {
        Self {
            search: String::new(),
            status: StatusFilter::All,
            page: first_page(),
            page_size: PageSize::default(),
        }
    }
}

impl CustomerQuery {
    fn filter(&self) -> CustomerFilter {
        CustomerFilter::new(self.search.clone(), self.status)
    }
}

/// Input of `dashboard.budgets`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetQuery {
    /// Requested page, 1-based
    #[serde(default = "first_page")]
    pub page: usize,
    /// Rows per page
    #[serde(default)]
    pub page_size: PageSize,
}

impl Default for BudgetQuery {
    fn default() -> Self {
        Self {
            page: first_page(),
            page_size: PageSize::default(),
        }
    }
}

/// Customer table row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerRow {
    /// The customer
    #[serde(flatten)]
    pub customer: DetailedCustomer,
    /// Proxy-reported creation time, else the first time this service saw the customer
    pub first_seen: Option<DateTime<Utc>>,
    /// `first_seen` formatted for display
    pub created: String,
}

/// Result of `dashboard.overview`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Overview {
    /// Customer aggregates
    pub customers: CustomerStats,
    /// Budget aggregates
    pub budgets: BudgetStats,
}

/// Result of `dashboard.customers`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerPage {
    /// Filtered and paginated rows
    pub customers: Page<CustomerRow>,
    /// Aggregates over the unfiltered list
    pub stats: CustomerStats,
}

/// Result of `dashboard.budgets`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetPage {
    /// Paginated rows with assignment counts
    pub budgets: Page<BudgetRow>,
    /// Aggregates over all budgets
    pub stats: BudgetStats,
}

/// Builds the dashboard views.
pub struct Dashboard {
    service: Arc<BudgetService>,
    timestamps: Arc<dyn TimestampStore>,
}

impl Dashboard {
    /// Create a dashboard over `service`, recording first-seen times in `timestamps`.
    pub fn new(service: Arc<BudgetService>, timestamps: Arc<dyn TimestampStore>) -> Self {
        Self {
            service,
            timestamps,
        }
    }

    /// The operation layer.
    pub fn service(&self) -> &Arc<BudgetService> {
        &self.service
    }

    /// Customer and budget aggregates.
    pub async fn overview(&self) -> Result<Overview> {
        let (customers, budgets) = futures::try_join!(
            self.service.list_customers_detailed(),
            self.service.list_budgets()
        )?;

        Ok(Overview {
            customers: CustomerStats::compute(&customers),
            budgets: BudgetStats::compute(&budgets, &customers),
        })
    }

    /// Filtered, paginated customer table.
    pub async fn customers(&self, query: &CustomerQuery) -> Result<CustomerPage> {
        let customers = self.service.list_customers_detailed().await?;
        let stats = CustomerStats::compute(&customers);

        let filtered = query.filter().apply(&customers);
        let first_seen = self.record_first_seen(&filtered).await;
        let rows: Vec<CustomerRow> = filtered
            .into_iter()
            .map(|c| row(c, &first_seen))
            .collect();
        debug!(
            total = customers.len(),
            matched = rows.len(),
            page = query.page,
            "customer table built"
        );

        Ok(CustomerPage {
            customers: paginate(&rows, query.page, query.page_size),
            stats,
        })
    }

    /// Paginated budget table with assignment counts.
    pub async fn budgets(&self, query: &BudgetQuery) -> Result<BudgetPage> {
        let (budgets, customers) = futures::try_join!(
            self.service.list_budgets(),
            self.service.list_customers_detailed()
        )?;

        let stats = BudgetStats::compute(&budgets, &customers);
        let rows = budget_rows(budgets, &customers);
        Ok(BudgetPage {
            budgets: paginate(&rows, query.page, query.page_size),
            stats,
        })
    }

    /// Record every customer without a reported creation time in one store call.
    async fn record_first_seen(
        &self,
        customers: &[DetailedCustomer],
    ) -> HashMap<String, DateTime<Utc>> {
        let ids: Vec<String> = customers
            .iter()
            .filter(|c| parse_reported(c.created_at.as_deref()).is_none())
            .map(|c| c.user_id.clone())
            .collect();
        if ids.is_empty() {
            return HashMap::new();
        }

        let store = Arc::clone(&self.timestamps);
        let count = ids.len();
        let recorded =
            tokio::task::spawn_blocking(move || store.set_many_if_absent(&ids, Utc::now())).await;
        match recorded {
            Ok(Ok(stored)) => stored,
            Ok(Err(e)) => {
                warn!(customers = count, error = %e, "could not record first-seen times");
                HashMap::new()
            }
            Err(e) => {
                warn!(customers = count, error = %e, "first-seen recording task failed");
                HashMap::new()
            }
        }
    }
}

fn row(customer: DetailedCustomer, recorded: &HashMap<String, DateTime<Utc>>) -> CustomerRow {
    let first_seen = parse_reported(customer.created_at.as_deref())
        .or_else(|| recorded.get(&customer.user_id).copied());

    CustomerRow {
        created: format_creation_date(first_seen),
        first_seen,
        customer,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn mount_customers(server: &MockServer, customers: &[(&str, f64, Option<&str>)]) {
        let list: Vec<_> = customers
            .iter()
            .map(|(id, spend, _)| json!({"user_id": id, "spend": spend}))
            .collect();
        Mock::given(method("GET"))
            .and(path("/customer/list"))
            .respond_with(ResponseTemplate::new(200).set_body_json(list))
            .mount(server)
            .await;

        for (id, spend, budget) in customers {
            let table = budget.map(|b| json!({"budget_id": b, "max_budget": 100.0}));
            Mock::given(method("GET"))
                .and(path("/customer/info"))
                .and(query_param("end_user_id", *id))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                    "user_id": id,
                    "spend": spend,
                    "litellm_budget_table": table
                })))
                .mount(server)
                .await;
        }
    }

    async fn mount_budgets(server: &MockServer, budgets: serde_json::Value) {
        Mock::given(method("GET"))
            .and(path("/budget/list"))
            .respond_with(ResponseTemplate::new(200).set_body_json(budgets))
            .mount(server)
            .await;
    }

    fn dashboard(server: &MockServer, store: Arc<MemoryTimestampStore>) -> Dashboard {
        let service = BudgetService::builder()
            .with_base_url(server.uri())
            .with_api_key("sk-test")
            .build()
            .unwrap();
        Dashboard::new(Arc::new(service), store)
    }

    #[tokio::test]
    async fn test_customers_filters_and_records_first_seen() {
        let server = MockServer::start().await;
        mount_customers(
            &server,
            &[("acme", 0.0, None), ("globex", 5.0, Some("b1")), ("initech", 2.0, None)],
        )
        .await;
        mount_budgets(&server, json!([{"budget_id": "b1", "max_budget": 100.0}])).await;

        let store = Arc::new(MemoryTimestampStore::new());
        let dashboard = dashboard(&server, store.clone());

        let query = CustomerQuery {
            status: StatusFilter::Active,
            ..CustomerQuery::default()
        };
        let page = dashboard.customers(&query).await.unwrap();

        assert_eq!(page.customers.total, 2);
        assert_eq!(page.customers.items[0].customer.user_id, "globex");
        assert_ne!(page.customers.items[0].created, UNKNOWN_DATE);
        assert_eq!(page.stats.total_customers, 3);
        assert_eq!(page.stats.assigned_customers, 1);
        assert_eq!(store.len(), 2);

        let first = store.get("globex").unwrap();
        dashboard.customers(&query).await.unwrap();
        assert_eq!(store.get("globex").unwrap(), first);
    }

    #[tokio::test]
    async fn test_budgets_counts_assignments() {
        let server = MockServer::start().await;
        mount_customers(
            &server,
            &[("u1", 1.0, Some("b1")), ("u2", 0.0, Some("b1")), ("u3", 0.0, None)],
        )
        .await;
        mount_budgets(
            &server,
            json!([
                {"budget_id": "b1", "max_budget": 100.0, "spend": 1.0},
                {"budget_id": "b2", "max_budget": 50.0}
            ]),
        )
        .await;

        let dashboard = dashboard(&server, Arc::new(MemoryTimestampStore::new()));
        let page = dashboard.budgets(&BudgetQuery::default()).await.unwrap();

        assert_eq!(page.budgets.items.len(), 2);
        assert_eq!(page.budgets.items[0].assigned_customers, 2);
        assert_eq!(page.budgets.items[1].assigned_customers, 0);
        assert_eq!(page.stats.total_max_budget, 150.0);
        assert_eq!(page.stats.total_assigned_customers, 2);

        let overview = dashboard.overview().await.unwrap();
        assert_eq!(overview.customers.total_customers, 3);
        assert_eq!(overview.customers.active_customers, 1);
        assert_eq!(overview.budgets.total_budgets, 2);
    }

    #[tokio::test]
    async fn test_overview_fails_when_budget_list_fails() {
        let server = MockServer::start().await;
        mount_customers(&server, &[("u1", 1.0, None)]).await;
        Mock::given(method("GET"))
            .and(path("/budget/list"))
            .respond_with(ResponseTemplate::new(500).set_body_json(json!({"detail": "db down"})))
            .mount(&server)
            .await;

        let dashboard = dashboard(&server, Arc::new(MemoryTimestampStore::new()));
        let err = dashboard.overview().await.unwrap_err();
        assert_eq!(err.code(), crate::ErrorCode::InternalServerError);
    }

    #[tokio::test]
    async fn test_customers_persist_first_seen_once_per_request() {
        let server = MockServer::start().await;
        let customers: Vec<(String, f64, Option<&str>)> =
            (0..40).map(|i| (format!("cust-{i}"), 1.0, None)).collect();
        let borrowed: Vec<(&str, f64, Option<&str>)> = customers
            .iter()
            .map(|(id, spend, budget)| (id.as_str(), *spend, *budget))
            .collect();
        mount_customers(&server, &borrowed).await;
        mount_budgets(&server, json!([])).await;

        let dir = tempfile::TempDir::new().unwrap();
        let store = Arc::new(FileTimestampStore::open(dir.path().join("seen.json")).unwrap());
        let service = BudgetService::builder()
            .with_base_url(server.uri())
            .with_api_key("sk-test")
            .build()
            .unwrap();
        let dashboard = Dashboard::new(Arc::new(service), store.clone());

        let page = dashboard.customers(&CustomerQuery::default()).await.unwrap();
        assert_eq!(page.customers.total, 40);
        assert!(page.customers.items.iter().all(|r| r.first_seen.is_some()));
        assert_eq!(store.writes(), 1);

        dashboard.customers(&CustomerQuery::default()).await.unwrap();
        assert_eq!(store.writes(), 1);
    }

    #[test]
    fn test_customer_query_defaults() {
        let query: CustomerQuery = serde_json::from_value(json!({"search": "ac"})).unwrap();
        assert_eq!(query.page, 1);
        assert_eq!(query.page_size, PageSize::Ten);
        assert_eq!(query.status, StatusFilter::All);
    }
}
