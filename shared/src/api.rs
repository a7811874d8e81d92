use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use validator::{Validate, ValidationError};

use crate::models::{
    BackOfficeStatus, CashFlowStatus, ConfirmationType, DebitCreditIndicator, Direction,
    MatchStatus, ProductType, SettlementMethod, TransactionSource, TransactionStatus,
};

// ============================================================================
// Health
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    /// Seconds since the process started
    pub uptime: f64,
}

impl HealthResponse {
    pub fn ok(uptime: f64) -> Self {
        Self {
            status: "ok".to_string(),
            timestamp: Utc::now(),
            uptime,
        }
    }
}

// ============================================================================
// Error Types
// ============================================================================

/// Error body returned by the backend.
///
/// Business errors carry `code` and `message`; framework errors only carry
/// `detail`. Every field is optional so either shape decodes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

impl ErrorResponse {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: Some(code.into()),
            message: Some(message.into()),
            ..Default::default()
        }
    }

    /// Human-readable message: `message`, else a string `detail`, else `fallback`.
    pub fn message_or(&self, fallback: &str) -> String {
        if let Some(message) = self.message.as_deref().filter(|m| !m.trim().is_empty()) {
            return message.to_string();
        }
        match &self.detail {
            Some(serde_json::Value::String(detail)) if !detail.trim().is_empty() => detail.clone(),
            _ => fallback.to_string(),
        }
    }
}

// ============================================================================
// Pagination
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct PaginationParams {
    #[validate(range(min = 1))]
    pub page: u32,

    #[validate(range(min = 1, max = 100))]
    pub page_size: u32,

    pub sort_by: Option<String>,
    pub sort_order: SortOrder,
}

impl Default for PaginationParams {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: 20,
            sort_by: None,
            sort_order: SortOrder::Desc,
        }
    }
}

impl PaginationParams {
    pub fn page(page: u32, page_size: u32) -> Self {
        Self {
            page,
            page_size,
            ..Default::default()
        }
    }

    /// Query-string pairs in the order the backend documents them.
    pub fn to_query(&self) -> Vec<(&'static str, String)> {
        let mut query = vec![
            ("page", self.page.to_string()),
            ("page_size", self.page_size.to_string()),
        ];
        if let Some(sort_by) = &self.sort_by {
            query.push(("sort_by", sort_by.clone()));
        }
        query.push(("sort_order", self.sort_order.as_str().to_string()));
        query
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationMeta {
    pub current_page: u32,
    pub total_pages: u32,
    pub total_records: u64,
    pub page_size: u32,
}

impl PaginationMeta {
    pub fn has_next(&self) -> bool {
        self.current_page < self.total_pages
    }

    pub fn has_previous(&self) -> bool {
        self.current_page > 1
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PagedResult<T> {
    pub data: Vec<T>,
    pub pagination: PaginationMeta,
}

// ============================================================================
// Transaction API Types
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionSummary {
    pub external_id: String,
    pub transaction_id: String,
    pub entry_date: NaiveDateTime,
    pub trade_date: NaiveDateTime,
    pub value_date: NaiveDateTime,
    pub maturity_date: NaiveDateTime,
    pub account: String,
    pub product: ProductType,
    pub direction: Direction,
    pub underlying: String,
    pub counterparty: String,
    pub status: TransactionStatus,
    pub back_office_status: BackOfficeStatus,
    pub settlement_method: SettlementMethod,
    pub confirmation_number: Option<String>,
    pub confirmation_type: ConfirmationType,
    pub confirmation_match_type: Option<String>,
    pub nature: String,
    pub source: TransactionSource,
    pub latest_event_type: Option<String>,
    pub operating_institution: String,
    pub trader: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionDetail {
    pub external_id: String,
    pub transaction_id: String,
    pub parent_transaction_id: Option<String>,
    pub entry_date: NaiveDateTime,
    pub trade_date: NaiveDateTime,
    pub value_date: NaiveDateTime,
    pub maturity_date: NaiveDateTime,
    pub account: String,
    pub product: ProductType,
    pub direction: Direction,
    pub underlying: String,
    pub counterparty: String,
    pub status: TransactionStatus,
    pub back_office_status: BackOfficeStatus,
    pub settlement_method: SettlementMethod,
    pub confirmation_number: Option<String>,
    pub confirmation_type: ConfirmationType,
    pub confirmation_match_type: Option<String>,
    pub confirmation_match_status: Option<MatchStatus>,
    pub nature: String,
    pub source: TransactionSource,
    pub latest_event_type: Option<String>,
    pub operating_institution: String,
    pub business_institution: Option<String>,
    pub trader: String,
    pub version: i32,
    pub last_modified_date: NaiveDateTime,
    pub last_modified_by: String,
}

/// Receipt for one stage of a transaction's lifecycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusReceipt {
    pub stage: String,
    /// SUCCESS, FAILED, WAITING or PROCESSING
    pub status: String,
    pub timestamp: Option<NaiveDateTime>,
    pub message: Option<String>,
    pub can_proceed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LifecycleProgress {
    pub current_stage: String,
    pub current_status: String,
    pub progress_percentage: u8,
    pub stage_completion_time: Option<NaiveDateTime>,
    pub status_receipts: Vec<StatusReceipt>,
    pub flow_visualization: Vec<FlowNode>,
}

/// Node of the flow visualization the backend computes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowNode {
    pub id: String,
    pub name: String,
    /// COMPLETED, CURRENT, PENDING, FAILED, BLOCKED or WAITING_APPROVAL
    pub status: String,
    pub timestamp: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionEntry {
    /// BUTTON or LINK
    #[serde(rename = "type")]
    pub kind: String,
    pub label: String,
    pub url: Option<String>,
    pub action: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationGuide {
    pub next_action: String,
    pub action_entry: Option<ActionEntry>,
    pub notes: Option<String>,
    pub estimated_time: Option<String>,
}

// ============================================================================
// Cash Flow API Types
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CashFlowSummary {
    pub cash_flow_id: String,
    pub transaction_id: String,
    pub direction: Direction,
    pub currency: String,
    pub amount: f64,
    pub payment_date: NaiveDateTime,
    pub account_number: String,
    pub current_status: CashFlowStatus,
    pub progress_percentage: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CashFlowDetail {
    pub cash_flow_id: String,
    pub transaction_id: String,
    pub payment_info_id: Option<String>,
    pub settlement_id: Option<String>,
    pub direction: Direction,
    pub currency: String,
    pub amount: f64,
    pub payment_date: NaiveDateTime,
    pub account_number: String,
    pub account_name: String,
    pub bank_name: String,
    pub bank_code: String,
    pub settlement_method: SettlementMethod,
    pub current_status: CashFlowStatus,
    pub progress_percentage: u8,
    pub version: i32,
    pub last_modified_date: NaiveDateTime,
}

/// Payment progress of a cash flow through the four-stage flow.
///
/// The per-stage blocks are kept as raw JSON; the dashboard only renders
/// `flow_visualization` and `operation_guide`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentProgress {
    pub current_stage: String,
    pub current_status: String,
    /// SWIFT, CBMNet or INTERNAL
    pub sending_route: String,
    pub progress_percentage: u8,
    #[serde(default)]
    pub netting_stage: Option<serde_json::Value>,
    #[serde(default)]
    pub compliance_stage: Option<serde_json::Value>,
    #[serde(default)]
    pub settlement_stage: Option<serde_json::Value>,
    #[serde(default)]
    pub cancellation_stage: Option<serde_json::Value>,
    pub flow_visualization: Vec<FlowNode>,
    #[serde(default)]
    pub operation_guide: Option<OperationGuide>,
}

// ============================================================================
// Query Criteria
// ============================================================================

/// Filters for the transaction summary and export. Unset fields match
/// everything; blank strings count as unset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_transaction_dates"))]
pub struct TransactionQueryCriteria {
    pub external_id: Option<String>,
    pub status: Option<TransactionStatus>,
    pub trade_date_from: Option<NaiveDate>,
    pub trade_date_to: Option<NaiveDate>,
    pub value_date_from: Option<NaiveDate>,
    pub value_date_to: Option<NaiveDate>,
    pub maturity_date_from: Option<NaiveDate>,
    pub maturity_date_to: Option<NaiveDate>,
    pub counterparty: Option<String>,
    pub product: Option<ProductType>,
    pub currency: Option<String>,
    pub operating_institution: Option<String>,
    pub business_institution: Option<String>,
    pub settlement_method: Option<SettlementMethod>,
    pub confirmation_type: Option<ConfirmationType>,
    pub source: Option<TransactionSource>,
}

impl TransactionQueryCriteria {
    pub fn to_query(&self) -> Vec<(&'static str, String)> {
        let mut query = QueryPairs::default();
        query.text("external_id", &self.external_id);
        query.wire("status", &self.status);
        query.date("trade_date_from", self.trade_date_from);
        query.date("trade_date_to", self.trade_date_to);
        query.date("value_date_from", self.value_date_from);
        query.date("value_date_to", self.value_date_to);
        query.date("maturity_date_from", self.maturity_date_from);
        query.date("maturity_date_to", self.maturity_date_to);
        query.text("counterparty", &self.counterparty);
        query.wire("product", &self.product);
        query.text("currency", &self.currency);
        query.text("operating_institution", &self.operating_institution);
        query.text("business_institution", &self.business_institution);
        query.wire("settlement_method", &self.settlement_method);
        query.wire("confirmation_type", &self.confirmation_type);
        query.wire("source", &self.source);
        query.0
    }
}

fn validate_transaction_dates(criteria: &TransactionQueryCriteria) -> Result<(), ValidationError> {
    check_range("trade_date", criteria.trade_date_from, criteria.trade_date_to)?;
    check_range("value_date", criteria.value_date_from, criteria.value_date_to)?;
    check_range(
        "maturity_date",
        criteria.maturity_date_from,
        criteria.maturity_date_to,
    )
}

/// Filters for the cash-flow summary and export.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_cash_flow_ranges"))]
pub struct CashFlowQueryCriteria {
    pub transaction_id: Option<String>,
    pub cash_flow_id: Option<String>,
    pub payment_info_id: Option<String>,
    pub settlement_id: Option<String>,
    pub direction: Option<Direction>,
    pub currency: Option<String>,
    pub amount_min: Option<f64>,
    pub amount_max: Option<f64>,
    pub payment_date_from: Option<NaiveDate>,
    pub payment_date_to: Option<NaiveDate>,
    pub status: Option<CashFlowStatus>,
}

impl CashFlowQueryCriteria {
    pub fn to_query(&self) -> Vec<(&'static str, String)> {
        let mut query = QueryPairs::default();
        query.text("transaction_id", &self.transaction_id);
        query.text("cash_flow_id", &self.cash_flow_id);
        query.text("payment_info_id", &self.payment_info_id);
        query.text("settlement_id", &self.settlement_id);
        query.wire("direction", &self.direction);
        query.text("currency", &self.currency);
        if let Some(min) = self.amount_min {
            query.0.push(("amount_min", min.to_string()));
        }
        if let Some(max) = self.amount_max {
            query.0.push(("amount_max", max.to_string()));
        }
        query.date("payment_date_from", self.payment_date_from);
        query.date("payment_date_to", self.payment_date_to);
        query.wire("status", &self.status);
        query.0
    }
}

fn validate_cash_flow_ranges(criteria: &CashFlowQueryCriteria) -> Result<(), ValidationError> {
    check_range("amount", criteria.amount_min, criteria.amount_max)?;
    check_range(
        "payment_date",
        criteria.payment_date_from,
        criteria.payment_date_to,
    )
}

fn check_range<T: PartialOrd>(
    field: &'static str,
    from: Option<T>,
    to: Option<T>,
) -> Result<(), ValidationError> {
    match (from, to) {
        (Some(from), Some(to)) if from > to => {
            let mut err = ValidationError::new("inverted_range");
            err.message = Some(format!("{} range starts after it ends", field).into());
            Err(err)
        }
        _ => Ok(()),
    }
}

#[derive(Default)]
struct QueryPairs(Vec<(&'static str, String)>);

impl QueryPairs {
    fn text(&mut self, key: &'static str, value: &Option<String>) {
        if let Some(value) = value.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
            self.0.push((key, value.to_string()));
        }
    }

    fn date(&mut self, key: &'static str, value: Option<NaiveDate>) {
        if let Some(date) = value {
            self.0.push((key, date.format("%Y-%m-%d").to_string()));
        }
    }

    /// Enum filters go out as their serialized wire value.
    fn wire<T: Serialize>(&mut self, key: &'static str, value: &Option<T>) {
        let Some(value) = value else { return };
        match serde_json::to_value(value) {
            Ok(serde_json::Value::String(wire)) => self.0.push((key, wire)),
            Ok(other) => self.0.push((key, other.to_string())),
            Err(e) => tracing::warn!("Skipping filter {}: {}", key, e),
        }
    }
}

// ============================================================================
// Events and Accounting
// ============================================================================

/// One lifecycle event of a transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub event_id: String,
    pub external_id: String,
    pub transaction_id: String,
    pub parent_transaction_id: Option<String>,
    pub product: ProductType,
    pub account: String,
    pub event_type: String,
    pub transaction_status: TransactionStatus,
    pub entry_date: NaiveDateTime,
    pub trade_date: NaiveDateTime,
    pub modified_date: NaiveDateTime,
    pub back_office_status: BackOfficeStatus,
    pub confirmation_status: Option<String>,
    pub confirmation_match_status: Option<MatchStatus>,
    pub operator: String,
}

/// Settlement accounts and the payment message sent for a transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentInfo {
    pub our_bank_name: String,
    pub our_bank_code: String,
    pub our_account_name: String,
    pub our_account_number: String,
    pub counterparty_bank_name: String,
    pub counterparty_bank_code: String,
    pub counterparty_account_name: String,
    pub counterparty_account_number: String,
    pub instruction_id: String,
    pub payment_date: NaiveDateTime,
    pub message_type: String,
    pub currency: String,
    pub amount: f64,
    pub message_sender: String,
    pub message_send_time: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountingRecord {
    pub voucher_id: String,
    pub transaction_id: String,
    pub actual_accounting_date: NaiveDateTime,
    pub planned_accounting_date: NaiveDateTime,
    pub event_number: String,
    pub debit_credit_indicator: DebitCreditIndicator,
    pub currency: String,
    pub account_subject: String,
    pub transaction_amount: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CurrencyTotals {
    #[serde(default)]
    pub debit: f64,
    #[serde(default)]
    pub credit: f64,
}

impl CurrencyTotals {
    pub fn net(&self) -> f64 {
        self.debit - self.credit
    }
}

/// Debit and credit totals keyed by currency code
pub type AccountingSummary = BTreeMap<String, CurrencyTotals>;

// ============================================================================
// Export
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Excel,
    Csv,
}

impl ExportFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Excel => "excel",
            Self::Csv => "csv",
        }
    }

    pub fn media_type(&self) -> &'static str {
        match self {
            Self::Excel => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            Self::Csv => "text/csv",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Excel => "xlsx",
            Self::Csv => "csv",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "excel" | "xlsx" => Ok(Self::Excel),
            "csv" => Ok(Self::Csv),
            other => Err(format!("unsupported export format: {} (expected excel or csv)", other)),
        }
    }
}
