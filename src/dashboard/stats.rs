//! Aggregate figures shown on dashboard cards.

use super::filter::CustomerView;
use crate::proxy::Budget;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Totals over the full customer list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CustomerStats {
    /// Number of customers
    pub total_customers: usize,
    /// Summed spend
    pub total_spend: f64,
    /// Summed budget limits, unassigned customers counting as 0
    pub total_budget: f64,
    /// Customers with spend above zero
    pub active_customers: usize,
    /// Customers with a budget assigned
    pub assigned_customers: usize,
}

impl CustomerStats {
    /// Reduce over `customers`.
    pub fn compute<C: CustomerView>(customers: &[C]) -> Self {
        customers.iter().fold(Self::default(), |mut stats, customer| {
            stats.total_customers += 1;
            stats.total_spend += customer.spend();
            stats.total_budget += customer.max_budget().unwrap_or(0.0);
            if customer.spend() > 0.0 {
                stats.active_customers += 1;
            }
            if customer.has_budget() {
                stats.assigned_customers += 1;
            }
            stats
        })
    }
}

/// Number of customers assigned to each budget id.
pub fn assignment_counts<C: CustomerView>(customers: &[C]) -> HashMap<String, usize> {
    let mut counts = HashMap::new();
    for budget_id in customers.iter().filter_map(|c| c.budget_id()) {
        *counts.entry(budget_id.to_string()).or_insert(0) += 1;
    }
    counts
}

/// A budget together with how many customers use it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetRow {
    /// The budget
    #[serde(flatten)]
    pub budget: Budget,
    /// Customers currently assigned to it
    pub assigned_customers: usize,
}

/// Join budgets with their assignment counts, keeping budget order.
pub fn budget_rows<C: CustomerView>(budgets: Vec<Budget>, customers: &[C]) -> Vec<BudgetRow> {
    let counts = assignment_counts(customers);
    budgets
        .into_iter()
        .map(|budget| {
            let assigned_customers = counts.get(&budget.budget_id).copied().unwrap_or(0);
            BudgetRow {
                budget,
                assigned_customers,
            }
        })
        .collect()
}

/// Totals over the budget list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BudgetStats {
    /// Number of budgets
    pub total_budgets: usize,
    /// Summed limits
    pub total_max_budget: f64,
    /// Summed spend
    pub total_spend: f64,
    /// Customers with any budget assigned
    pub total_assigned_customers: usize,
}

impl BudgetStats {
    /// Reduce over budgets and the customers referencing them.
    pub fn compute<C: CustomerView>(budgets: &[Budget], customers: &[C]) -> Self {
        Self {
            total_budgets: budgets.len(),
            total_max_budget: budgets.iter().filter_map(|b| b.max_budget).sum(),
            total_spend: budgets.iter().map(|b| b.spend).sum(),
            total_assigned_customers: customers.iter().filter(|c| c.has_budget()).count(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proxy::{BudgetTable, DetailedCustomer};

    fn customer(user_id: &str, spend: f64, budget: Option<(&str, f64)>) -> DetailedCustomer {
        let mut c = DetailedCustomer::fallback(user_id, None);
        c.spend = spend;
        if let Some((budget_id, max_budget)) = budget {
            c.max_budget = Some(max_budget);
            c.litellm_budget_table = Some(BudgetTable {
                budget_id: Some(budget_id.to_string()),
                max_budget: Some(max_budget),
                ..BudgetTable::default()
            });
        }
        c
    }

    fn budget(budget_id: &str, max_budget: f64, spend: f64) -> Budget {
        serde_json::from_value(serde_json::json!({
            "budget_id": budget_id,
            "max_budget": max_budget,
            "spend": spend
        }))
        .unwrap()
    }

    #[test]
    fn test_customer_stats() {
        let customers = vec![
            customer("a", 0.0, None),
            customer("b", 5.0, Some(("b1", 100.0))),
            customer("c", 2.5, Some(("b1", 100.0))),
            customer("d", 0.0, Some(("b2", 20.0))),
        ];
        let stats = CustomerStats::compute(&customers);
        assert_eq!(stats.total_customers, 4);
        assert_eq!(stats.total_spend, 7.5);
        assert_eq!(stats.total_budget, 220.0);
        assert_eq!(stats.active_customers, 2);
        assert_eq!(stats.assigned_customers, 3);
    }

    #[test]
    fn test_empty_stats() {
        let stats = CustomerStats::compute::<DetailedCustomer>(&[]);
        assert_eq!(stats, CustomerStats::default());
    }

    #[test]
    fn test_budget_rows_and_stats() {
        let customers = vec![
            customer("a", 1.0, Some(("b1", 100.0))),
            customer("b", 1.0, Some(("b1", 100.0))),
            customer("c", 0.0, None),
        ];
        let budgets = vec![budget("b1", 100.0, 2.0), budget("b2", 50.0, 0.0)];

        let stats = BudgetStats::compute(&budgets, &customers);
        assert_eq!(stats.total_budgets, 2);
        assert_eq!(stats.total_max_budget, 150.0);
        assert_eq!(stats.total_assigned_customers, 2);

        let rows = budget_rows(budgets, &customers);
        assert_eq!(rows[0].budget.budget_id, "b1");
        assert_eq!(rows[0].assigned_customers, 2);
        assert_eq!(rows[1].assigned_customers, 0);

        let json = serde_json::to_value(&rows[0]).unwrap();
        assert_eq!(json["budget_id"], "b1");
        assert_eq!(json["assigned_customers"], 2);
    }
}
