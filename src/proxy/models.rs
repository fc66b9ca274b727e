//! Wire and domain types for the LiteLLM proxy.
//!
//! Deserialization is the structural check on every proxy response; the
//! `validator` rules on the flattened types catch values that parse but make
//! no sense (negative spend, empty identifiers).

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use validator::Validate;

/// Reset interval of a budget.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BudgetDuration {
    /// Resets every day
    Daily,
    /// Resets every week
    Weekly,
    /// Resets every month
    Monthly,
    /// Resets every quarter
    Quarterly,
    /// Resets every year
    Yearly,
    /// Proxy-native interval such as `30d`, carried verbatim
    Other(String),
}

impl BudgetDuration {
    /// Parse an interval, treating empty and `none` as no interval.
    pub fn parse(value: &str) -> Option<Self> {
        let trimmed = value.trim();
        match trimmed.to_lowercase().as_str() {
            "" | "none" | "never" => None,
            "daily" => Some(BudgetDuration::Daily),
            "weekly" => Some(BudgetDuration::Weekly),
            "monthly" => Some(BudgetDuration::Monthly),
            "quarterly" => Some(BudgetDuration::Quarterly),
            "yearly" => Some(BudgetDuration::Yearly),
            _ => Some(BudgetDuration::Other(trimmed.to_string())),
        }
    }

    /// Get the string representation.
    pub fn as_str(&self) -> &str {
        match self {
            BudgetDuration::Daily => "daily",
            BudgetDuration::Weekly => "weekly",
            BudgetDuration::Monthly => "monthly",
            BudgetDuration::Quarterly => "quarterly",
            BudgetDuration::Yearly => "yearly",
            BudgetDuration::Other(raw) => raw,
        }
    }
}

impl fmt::Display for BudgetDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Serialize for BudgetDuration {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for BudgetDuration {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        BudgetDuration::parse(&raw)
            .ok_or_else(|| serde::de::Error::custom("budget duration must not be empty"))
    }
}

/// Reads `null`, `""` and `"none"` as no duration.
pub(crate) fn optional_duration<'de, D>(deserializer: D) -> Result<Option<BudgetDuration>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(BudgetDuration::parse))
}

fn null_as_zero<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(0.0))
}

fn null_as_false<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    Ok(Option::<bool>::deserialize(deserializer)?.unwrap_or(false))
}

/// List endpoints answer with either a bare array or `{"data": [...]}`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum ListEnvelope<T> {
    Bare(Vec<T>),
    Wrapped { data: Vec<T> },
}

impl<T> ListEnvelope<T> {
    pub(crate) fn into_vec(self) -> Vec<T> {
        match self {
            ListEnvelope::Bare(items) | ListEnvelope::Wrapped { data: items } => items,
        }
    }
}

/// Budget row embedded in a customer record.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BudgetTable {
    /// Assigned budget
    #[serde(default)]
    pub budget_id: Option<String>,
    /// Spending limit
    #[serde(default)]
    pub max_budget: Option<f64>,
    /// Soft limit that triggers alerts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub soft_budget: Option<f64>,
    /// Spend tracked against this table
    #[serde(default, deserialize_with = "null_as_zero")]
    pub spend: f64,
    /// Reset interval
    #[serde(
        default,
        deserialize_with = "optional_duration",
        skip_serializing_if = "Option::is_none"
    )]
    pub budget_duration: Option<BudgetDuration>,
    /// Tokens-per-minute limit
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tpm_limit: Option<i64>,
    /// Requests-per-minute limit
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rpm_limit: Option<i64>,
    /// Parallel request limit
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_parallel_requests: Option<i64>,
    /// Per-model limits, shape owned by the proxy
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_max_budget: Option<serde_json::Value>,
    /// Creation time of the budget, filled in from the budget list when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

/// Customer (end user) record as returned by `/customer/list` and `/customer/info`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerRecord {
    /// Customer identifier
    pub user_id: String,
    /// Display alias
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    /// Contact email
    #[serde(default)]
    pub email: Option<String>,
    /// Proxy-computed spend
    #[serde(default, deserialize_with = "null_as_zero")]
    pub spend: f64,
    /// Whether the proxy rejects this customer's requests
    #[serde(default, deserialize_with = "null_as_false")]
    pub blocked: bool,
    /// Region restriction
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_model_region: Option<String>,
    /// Default model
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_model: Option<String>,
    /// Creation time, reported by some proxy releases only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    /// Assigned budget, if any
    #[serde(default)]
    pub litellm_budget_table: Option<BudgetTable>,
    /// Keys owned by the customer, shape owned by the proxy
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keys: Option<serde_json::Value>,
    /// Organization memberships, shape owned by the proxy
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization_membership: Option<serde_json::Value>,
}

impl CustomerRecord {
    /// Limit inherited from the assigned budget.
    pub fn max_budget(&self) -> Option<f64> {
        self.litellm_budget_table
            .as_ref()
            .and_then(|table| table.max_budget)
    }
}

/// Flattened customer returned by `listCustomers`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Customer {
    /// Customer identifier
    #[validate(length(min = 1, message = "user_id must not be empty"))]
    pub user_id: String,
    /// Proxy-computed spend
    #[validate(range(min = 0.0, message = "spend must not be negative"))]
    pub spend: f64,
    /// Limit of the assigned budget
    pub max_budget: Option<f64>,
}

impl From<CustomerRecord> for Customer {
    fn from(record: CustomerRecord) -> Self {
        let max_budget = record.max_budget();
        Self {
            user_id: record.user_id,
            spend: record.spend,
            max_budget,
        }
    }
}

/// Budget reference inside `CustomerInfo`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct BudgetSummary {
    /// Budget identifier
    #[validate(length(min = 1, message = "budget_id must not be empty"))]
    pub budget_id: String,
    /// Spending limit
    pub max_budget: Option<f64>,
    /// Spend against the budget
    pub spend: f64,
}

/// Single customer view returned by `getCustomerInfo`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct CustomerInfo {
    /// Customer identifier
    #[validate(length(min = 1, message = "user_id must not be empty"))]
    pub user_id: String,
    /// Contact email
    pub email: Option<String>,
    /// Proxy-computed spend
    #[validate(range(min = 0.0, message = "spend must not be negative"))]
    pub spend: f64,
    /// Limit of the assigned budget
    pub max_budget: Option<f64>,
    /// Whether the proxy rejects this customer's requests
    pub blocked: bool,
    /// Zero or one assigned budget
    #[validate]
    pub budgets: Vec<BudgetSummary>,
}

impl From<CustomerRecord> for CustomerInfo {
    fn from(record: CustomerRecord) -> Self {
        let max_budget = record.max_budget();
        let budgets = record
            .litellm_budget_table
            .and_then(|table| {
                table.budget_id.map(|budget_id| BudgetSummary {
                    budget_id,
                    max_budget: table.max_budget,
                    spend: table.spend,
                })
            })
            .into_iter()
            .collect();

        Self {
            user_id: record.user_id,
            email: record.email,
            spend: record.spend,
            max_budget,
            blocked: record.blocked,
            budgets,
        }
    }
}

/// Customer enriched with its budget details, returned by `listCustomersDetailed`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct DetailedCustomer {
    /// Customer identifier
    #[validate(length(min = 1, message = "user_id must not be empty"))]
    pub user_id: String,
    /// Contact email
    pub email: Option<String>,
    /// Proxy-computed spend
    #[validate(range(min = 0.0, message = "spend must not be negative"))]
    pub spend: f64,
    /// Limit of the assigned budget
    #[validate(range(min = 0.0, message = "max_budget must not be negative"))]
    pub max_budget: Option<f64>,
    /// Customer creation time, when the proxy reports one
    pub created_at: Option<String>,
    /// Whether the proxy rejects this customer's requests
    pub blocked: bool,
    /// Assigned budget, with the budget's creation time when known
    pub litellm_budget_table: Option<BudgetTable>,
}

impl DetailedCustomer {
    /// Degraded record used when a customer's detail fetch fails.
    pub fn fallback(user_id: impl Into<String>, email: Option<String>) -> Self {
        Self {
            user_id: user_id.into(),
            email,
            spend: 0.0,
            max_budget: None,
            created_at: None,
            blocked: false,
            litellm_budget_table: None,
        }
    }
}

/// Budget as returned by `/budget/list`, `/budget/new` and `/budget/update`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Budget {
    /// Budget identifier
    #[validate(length(min = 1, message = "budget_id must not be empty"))]
    pub budget_id: String,
    /// Spending limit
    #[serde(default)]
    #[validate(range(min = 0.0, message = "max_budget must not be negative"))]
    pub max_budget: Option<f64>,
    /// Soft limit that triggers alerts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub soft_budget: Option<f64>,
    /// Spend across assigned customers
    #[serde(default, deserialize_with = "null_as_zero")]
    pub spend: f64,
    /// Reset interval
    #[serde(default, deserialize_with = "optional_duration")]
    pub budget_duration: Option<BudgetDuration>,
    /// Next reset time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub budget_reset_at: Option<String>,
    /// Creation time
    #[serde(default)]
    pub created_at: Option<String>,
    /// Creator
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    /// Tokens-per-minute limit
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tpm_limit: Option<i64>,
    /// Requests-per-minute limit
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rpm_limit: Option<i64>,
    /// Per-model limits, shape owned by the proxy
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_max_budget: Option<serde_json::Value>,
}

/// Input of `createBudget`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct CreateBudgetRequest {
    /// New budget identifier
    #[validate(length(min = 1, message = "budget_id is required"))]
    pub budget_id: String,
    /// Spending limit
    #[validate(range(min = 0.0, message = "max_budget must not be negative"))]
    pub max_budget: f64,
    /// Reset interval; none means a one-time budget
    #[serde(
        default,
        deserialize_with = "optional_duration",
        skip_serializing_if = "Option::is_none"
    )]
    pub budget_duration: Option<BudgetDuration>,
}

/// Input of `assignBudget`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct AssignBudgetRequest {
    /// Customer to assign to
    #[validate(length(min = 1, message = "user_id is required"))]
    pub user_id: String,
    /// Existing budget to assign
    #[validate(length(min = 1, message = "budget_id is required"))]
    pub budget_id: String,
}

/// Input of `updateBudget`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct UpdateBudgetRequest {
    /// Budget to update
    #[validate(length(min = 1, message = "budget_id is required"))]
    pub budget_id: String,
    /// New spending limit
    #[validate(range(min = 0.0, message = "max_budget must not be negative"))]
    pub max_budget: f64,
}

/// Response of an assignment call.
///
/// `/customer/update` echoes the customer; the legacy `/budget/assign` answers
/// with a message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AssignmentResponse {
    /// Updated customer record
    Customer(Box<CustomerRecord>),
    /// Confirmation message
    Message {
        /// Proxy message
        message: String,
    },
}

/// Reachability of the proxy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProxyStatus {
    /// `/health` answered with a success status
    Online,
    /// `/health` failed or was unreachable
    Offline,
}

/// Result of `system.health`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthReport {
    /// Proxy reachability
    pub status: ProxyStatus,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_customer_record_tolerates_nulls() {
        let record: CustomerRecord = serde_json::from_value(json!({
            "user_id": "u1",
            "spend": null,
            "blocked": null,
            "litellm_budget_table": null,
            "keys": [{"token": "abc"}]
        }))
        .unwrap();

        assert_eq!(record.spend, 0.0);
        assert!(!record.blocked);
        assert!(record.litellm_budget_table.is_none());
        assert!(record.keys.is_some());
    }

    #[test]
    fn test_customer_flattens_budget_table() {
        let record: CustomerRecord = serde_json::from_value(json!({
            "user_id": "u1",
            "spend": 12.5,
            "litellm_budget_table": {"budget_id": "b1", "max_budget": 100.0, "model_max_budget": {"gpt-4": 5}}
        }))
        .unwrap();

        let customer = Customer::from(record);
        assert_eq!(customer.max_budget, Some(100.0));
        assert!(customer.validate().is_ok());
    }

    #[test]
    fn test_customer_info_budgets_singleton_or_empty() {
        let with_budget: CustomerRecord = serde_json::from_value(json!({
            "user_id": "u1",
            "spend": 3.0,
            "litellm_budget_table": {"budget_id": "b1", "max_budget": 50.0, "spend": 3.0}
        }))
        .unwrap();
        let info = CustomerInfo::from(with_budget);
        assert_eq!(info.budgets.len(), 1);
        assert_eq!(info.budgets[0].budget_id, "b1");

        let without: CustomerRecord =
            serde_json::from_value(json!({"user_id": "u2", "spend": 0})).unwrap();
        assert!(CustomerInfo::from(without).budgets.is_empty());
    }

    #[test]
    fn test_budget_duration_parsing() {
        assert_eq!(BudgetDuration::parse("Monthly"), Some(BudgetDuration::Monthly));
        assert_eq!(BudgetDuration::parse(""), None);
        assert_eq!(BudgetDuration::parse("none"), None);
        assert_eq!(
            BudgetDuration::parse("30d"),
            Some(BudgetDuration::Other("30d".to_string()))
        );

        let budget: Budget = serde_json::from_value(json!({
            "budget_id": "b1",
            "max_budget": 10,
            "budget_duration": null
        }))
        .unwrap();
        assert!(budget.budget_duration.is_none());
        assert_eq!(serde_json::to_value(BudgetDuration::Weekly).unwrap(), json!("weekly"));
    }

    #[test]
    fn test_list_envelope_accepts_both_shapes() {
        let bare: ListEnvelope<Budget> =
            serde_json::from_value(json!([{"budget_id": "b1"}])).unwrap();
        let wrapped: ListEnvelope<Budget> =
            serde_json::from_value(json!({"data": [{"budget_id": "b1"}, {"budget_id": "b2"}]}))
                .unwrap();
        assert_eq!(bare.into_vec().len(), 1);
        assert_eq!(wrapped.into_vec().len(), 2);
    }

    #[test]
    fn test_request_validation() {
        let bad = CreateBudgetRequest {
            budget_id: String::new(),
            max_budget: -1.0,
            budget_duration: None,
        };
        let errors = bad.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("budget_id"));
        assert!(errors.field_errors().contains_key("max_budget"));

        let negative = Budget {
            budget_id: "b1".to_string(),
            max_budget: Some(-5.0),
            soft_budget: None,
            spend: 0.0,
            budget_duration: None,
            budget_reset_at: None,
            created_at: None,
            created_by: None,
            tpm_limit: None,
            rpm_limit: None,
            model_max_budget: None,
        };
        assert!(negative.validate().is_err());
    }

    #[test]
    fn test_assignment_response_shapes() {
        let legacy: AssignmentResponse =
            serde_json::from_value(json!({"message": "Budget assigned"})).unwrap();
        assert!(matches!(legacy, AssignmentResponse::Message { .. }));

        let current: AssignmentResponse =
            serde_json::from_value(json!({"user_id": "u1", "spend": 0})).unwrap();
        assert!(matches!(current, AssignmentResponse::Customer(_)));
    }
}
