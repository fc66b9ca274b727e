//! Search and status filtering for customer lists.

use crate::proxy::{Customer, DetailedCustomer};

use serde::{Deserialize, Serialize};

/// Read access to the customer fields the dashboard derives state from.
pub trait CustomerView {
    /// Customer identifier.
    fn user_id(&self) -> &str;

    /// Contact email, when known.
    fn email(&self) -> Option<&str> {
        None
    }

    /// Proxy-computed spend.
    fn spend(&self) -> f64;

    /// Limit of the assigned budget.
    fn max_budget(&self) -> Option<f64>;

    /// Identifier of the assigned budget.
    fn budget_id(&self) -> Option<&str> {
        None
    }

    /// Whether a budget is assigned.
    fn has_budget(&self) -> bool;
}

impl CustomerView for Customer {
    fn user_id(&self) -> &str {
        &self.user_id
    }

    fn spend(&self) -> f64 {
        self.spend
    }

    fn max_budget(&self) -> Option<f64> {
        self.max_budget
    }

    fn has_budget(&self) -> bool {
        self.max_budget.is_some()
    }
}

impl CustomerView for DetailedCustomer {
    fn user_id(&self) -> &str {
        &self.user_id
    }

    fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    fn spend(&self) -> f64 {
        self.spend
    }

    fn max_budget(&self) -> Option<f64> {
        self.max_budget
    }

    fn budget_id(&self) -> Option<&str> {
        self.litellm_budget_table
            .as_ref()
            .and_then(|table| table.budget_id.as_deref())
    }

    fn has_budget(&self) -> bool {
        self.litellm_budget_table.is_some()
    }
}

/// Activity filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusFilter {
    /// No filtering
    #[default]
    #[serde(alias = "All Status", alias = "All")]
    All,
    /// Customers with spend above zero
    #[serde(alias = "Active")]
    Active,
    /// Customers with zero spend
    #[serde(alias = "Inactive")]
    Inactive,
}

impl StatusFilter {
    /// Whether a customer with `spend` passes this filter.
    pub fn matches(&self, spend: f64) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Active => spend > 0.0,
            StatusFilter::Inactive => spend == 0.0,
        }
    }
}

/// Combined search and status filter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CustomerFilter {
    /// Case-insensitive substring matched against user id and email
    #[serde(default)]
    pub search: String,
    /// Activity filter
    #[serde(default)]
    pub status: StatusFilter,
}

impl CustomerFilter {
    /// Create a filter.
    pub fn new(search: impl Into<String>, status: StatusFilter) -> Self {
        Self {
            search: search.into(),
            status,
        }
    }

    /// Whether `customer` passes both the search and the status filter.
    pub fn matches<C: CustomerView>(&self, customer: &C) -> bool {
        self.status.matches(customer.spend()) && matches_search(customer, &self.search.to_lowercase())
    }

    /// Keep the matching customers, preserving order.
    pub fn apply<C: CustomerView + Clone>(&self, customers: &[C]) -> Vec<C> {
        let needle = self.search.to_lowercase();
        customers
            .iter()
            .filter(|c| self.status.matches(c.spend()) && matches_search(*c, &needle))
            .cloned()
            .collect()
    }
}

fn matches_search<C: CustomerView>(customer: &C, needle: &str) -> bool {
    if needle.is_empty() {
        return true;
    }
    customer.user_id().to_lowercase().contains(needle)
        || customer
            .email()
            .is_some_and(|email| email.to_lowercase().contains(needle))
}
