//! Client and data types for the LiteLLM proxy.
//!
//! The proxy owns all customer and budget state; this module only talks to
//! its REST API and describes the shapes it returns.

mod client;
pub mod models;

pub use client::{CallError, CallResult, ProxyClient};
pub use models::{
    AssignBudgetRequest, AssignmentResponse, Budget, BudgetDuration, BudgetSummary, BudgetTable,
    CreateBudgetRequest, Customer, CustomerInfo, CustomerRecord, DetailedCustomer, HealthReport,
    ProxyStatus, UpdateBudgetRequest,
};
