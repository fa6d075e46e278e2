// src/models/mod.rs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::{fmt, str::FromStr};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

// ─── Exit Type ────────────────────────────────────────────────────────────────

// Postgres enums need #[sqlx(type_name = "...")] and the matching CREATE TYPE
// in migrations/
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, ToSchema, PartialEq, Eq)]
#[sqlx(type_name = "exit_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ExitType {
    Resignation,
    Termination,
    Retirement,
    EndOfContract,
    MutualSeparation,
    Absconding,
    Death,
}

impl ExitType {
    pub fn label(self) -> &'static str {
        match self {
            ExitType::Resignation => "Resignation",
            ExitType::Termination => "Termination",
            ExitType::Retirement => "Retirement",
            ExitType::EndOfContract => "End of Contract",
            ExitType::MutualSeparation => "Mutual Separation",
            ExitType::Absconding => "Absconding",
            ExitType::Death => "Death",
        }
    }

    /// Exits the employer initiates or that end on a known date; the employee owes no notice.
    pub fn waives_notice(self) -> bool {
        matches!(
            self,
            ExitType::Termination | ExitType::Retirement | ExitType::EndOfContract | ExitType::Death
        )
    }
}

// ─── Exit Case Status ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, ToSchema, PartialEq, Eq, Hash)]
#[sqlx(type_name = "exit_case_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ExitCaseStatus {
    Initiated,
    ClearancePending,
    ClearanceCompleted,
    FnfPending,
    FnfProcessed,
    Completed,
    Cancelled,
}

impl ExitCaseStatus {
    pub const ALL: [ExitCaseStatus; 7] = [
        ExitCaseStatus::Initiated,
        ExitCaseStatus::ClearancePending,
        ExitCaseStatus::ClearanceCompleted,
        ExitCaseStatus::FnfPending,
        ExitCaseStatus::FnfProcessed,
        ExitCaseStatus::Completed,
        ExitCaseStatus::Cancelled,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ExitCaseStatus::Initiated => "initiated",
            ExitCaseStatus::ClearancePending => "clearance_pending",
            ExitCaseStatus::ClearanceCompleted => "clearance_completed",
            ExitCaseStatus::FnfPending => "fnf_pending",
            ExitCaseStatus::FnfProcessed => "fnf_processed",
            ExitCaseStatus::Completed => "completed",
            ExitCaseStatus::Cancelled => "cancelled",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ExitCaseStatus::Initiated => "Initiated",
            ExitCaseStatus::ClearancePending => "Clearance Pending",
            ExitCaseStatus::ClearanceCompleted => "Clearance Completed",
            ExitCaseStatus::FnfPending => "F&F Pending",
            ExitCaseStatus::FnfProcessed => "F&F Processed",
            ExitCaseStatus::Completed => "Completed",
            ExitCaseStatus::Cancelled => "Cancelled",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, ExitCaseStatus::Completed | ExitCaseStatus::Cancelled)
    }

    pub fn is_open(self) -> bool {
        !self.is_terminal()
    }
}

impl fmt::Display for ExitCaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExitCaseStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ExitCaseStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("Unknown exit case status: {}", s))
    }
}

// ─── Clearance ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, ToSchema, PartialEq, Eq, Hash)]
#[sqlx(type_name = "clearance_department", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ClearanceDepartment {
    It,
    Hr,
    Finance,
    Admin,
    Manager,
}

impl ClearanceDepartment {
    pub fn as_str(self) -> &'static str {
        match self {
            ClearanceDepartment::It => "it",
            ClearanceDepartment::Hr => "hr",
            ClearanceDepartment::Finance => "finance",
            ClearanceDepartment::Admin => "admin",
            ClearanceDepartment::Manager => "manager",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ClearanceDepartment::It => "IT",
            ClearanceDepartment::Hr => "HR",
            ClearanceDepartment::Finance => "Finance",
            ClearanceDepartment::Admin => "Admin",
            ClearanceDepartment::Manager => "Reporting Manager",
        }
    }

    /// Role that owns this department's checklist items.
    pub fn owner_role(self) -> &'static str {
        match self {
            ClearanceDepartment::It => "it_admin",
            ClearanceDepartment::Hr => "hr_manager",
            ClearanceDepartment::Finance => "finance_manager",
            ClearanceDepartment::Admin => "admin_officer",
            ClearanceDepartment::Manager => "reporting_manager",
        }
    }
}

impl fmt::Display for ClearanceDepartment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ClearanceDepartment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "it" => Ok(ClearanceDepartment::It),
            "hr" => Ok(ClearanceDepartment::Hr),
            "finance" => Ok(ClearanceDepartment::Finance),
            "admin" => Ok(ClearanceDepartment::Admin),
            "manager" => Ok(ClearanceDepartment::Manager),
            other => Err(format!("Unknown clearance department: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, ToSchema, PartialEq, Eq)]
#[sqlx(type_name = "clearance_task_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ClearanceTaskStatus {
    Pending,
    InProgress,
    Cleared,
    NotApplicable,
}

impl ClearanceTaskStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ClearanceTaskStatus::Pending => "pending",
            ClearanceTaskStatus::InProgress => "in_progress",
            ClearanceTaskStatus::Cleared => "cleared",
            ClearanceTaskStatus::NotApplicable => "not_applicable",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ClearanceTaskStatus::Pending => "Pending",
            ClearanceTaskStatus::InProgress => "In Progress",
            ClearanceTaskStatus::Cleared => "Cleared",
            ClearanceTaskStatus::NotApplicable => "Not Applicable",
        }
    }

    /// Cleared and not-applicable tasks both count toward progress.
    pub fn is_resolved(self) -> bool {
        matches!(
            self,
            ClearanceTaskStatus::Cleared | ClearanceTaskStatus::NotApplicable
        )
    }
}

impl fmt::Display for ClearanceTaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema, PartialEq)]
pub struct ClearanceTask {
    pub id: Uuid,
    pub exit_case_id: Uuid,
    pub department: ClearanceDepartment,
    pub task_name: String,
    pub description: String,
    pub status: ClearanceTaskStatus,
    /// Position in the department template; listings keep this order
    pub sort_order: i32,
    pub assigned_role: Option<String>,
    pub assigned_to: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub completed_date: Option<DateTime<Utc>>,
    /// Value of unreturned assets, summed into the settlement's asset recovery
    pub recovery_amount: Option<Decimal>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ─── Settlement ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, ToSchema, PartialEq, Eq)]
#[sqlx(type_name = "settlement_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SettlementStatus {
    Calculated,
    Approved,
    Processed,
    Paid,
}

impl SettlementStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            SettlementStatus::Calculated => "calculated",
            SettlementStatus::Approved => "approved",
            SettlementStatus::Processed => "processed",
            SettlementStatus::Paid => "paid",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SettlementStatus::Calculated => "Calculated",
            SettlementStatus::Approved => "Approved",
            SettlementStatus::Processed => "Processed",
            SettlementStatus::Paid => "Paid",
        }
    }
}

impl fmt::Display for SettlementStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema, PartialEq)]
pub struct FinalSettlement {
    pub id: Uuid,
    pub exit_case_id: Uuid,
    pub leave_encashment_days: Decimal,
    // Earnings
    pub basic_salary_dues: Decimal,
    pub leave_encashment: Decimal,
    pub bonus_dues: Decimal,
    pub gratuity: Decimal,
    pub reimbursements: Decimal,
    pub other_earnings: Decimal,
    pub total_earnings: Decimal,
    // Deductions
    pub notice_recovery: Decimal,
    pub asset_recovery: Decimal,
    pub loan_recovery: Decimal,
    pub advance_recovery: Decimal,
    pub tds: Decimal,
    pub pf_employee: Decimal,
    pub other_deductions: Decimal,
    pub total_deductions: Decimal,
    pub net_payable: Decimal,
    /// Set when deductions exceed earnings; payment needs explicit sign-off
    pub is_negative: bool,
    pub status: SettlementStatus,
    pub calculation_date: DateTime<Utc>,
    pub approved_date: Option<DateTime<Utc>>,
    pub processed_date: Option<DateTime<Utc>>,
    pub payment_date: Option<NaiveDate>,
    pub payment_reference: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Manual inputs to a full-and-final calculation. Every amount defaults to zero.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct SettlementAdjustments {
    #[serde(default)]
    pub leave_encashment_days: Decimal,
    #[serde(default)]
    pub bonus_dues: Decimal,
    #[serde(default)]
    pub reimbursements: Decimal,
    #[serde(default)]
    pub other_earnings: Decimal,
    #[serde(default)]
    pub loan_recovery: Decimal,
    #[serde(default)]
    pub advance_recovery: Decimal,
    #[serde(default)]
    pub other_deductions: Decimal,
    /// Overrides the sum of recovery amounts on cleared tasks
    #[serde(default)]
    pub asset_recovery: Option<Decimal>,
    #[serde(default)]
    pub notes: Option<String>,
    /// Must be true to overwrite an existing settlement
    #[serde(default)]
    pub recalculate: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SettlementResponse {
    pub settlement: FinalSettlement,
    pub case_status: ExitCaseStatus,
    pub negative_settlement_warning: bool,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct RecordPaymentRequest {
    pub payment_reference: String,
    /// Defaults to today
    #[serde(default)]
    pub payment_date: Option<NaiveDate>,
}

// ─── Exit Case ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema, PartialEq)]
pub struct ExitCase {
    pub id: Uuid,
    pub company_id: Uuid,
    pub employee_id: Uuid,
    pub employee_name: String,
    pub exit_type: ExitType,
    pub resignation_date: Option<NaiveDate>,
    pub requested_last_working_day: Option<NaiveDate>,
    pub approved_last_working_day: Option<NaiveDate>,
    pub actual_last_working_day: Option<NaiveDate>,
    pub reason_category: Option<String>,
    pub reason: Option<String>,
    pub notice_period_days: i32,
    pub notice_served_days: i32,
    pub notice_buyout_days: i32,
    pub notice_recovery_amount: Decimal,
    pub status: ExitCaseStatus,
    pub clearance_progress_percent: i32,
    pub tasks_completed: i32,
    pub tasks_total: i32,
    pub eligible_for_rehire: Option<bool>,
    pub rehire_notes: Option<String>,
    pub exit_interview_date: Option<NaiveDate>,
    pub exit_interview_notes: Option<String>,
    pub notes: Option<String>,
    pub initiated_by: String,
    pub approved_by: Option<String>,
    pub approved_at: Option<DateTime<Utc>>,
    pub cancelled_by: Option<String>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancellation_reason: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The exit case aggregate: the case with the tasks and settlement it owns.
#[derive(Debug, Clone, Serialize, ToSchema, PartialEq)]
pub struct ExitCaseDetail {
    #[serde(flatten)]
    pub case: ExitCase,
    pub clearance_tasks: Vec<ClearanceTask>,
    pub final_settlement: Option<FinalSettlement>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct InitiateExitRequest {
    pub employee_id: Uuid,
    pub exit_type: ExitType,
    #[serde(default)]
    pub resignation_date: Option<NaiveDate>,
    #[serde(default)]
    pub requested_lwd: Option<NaiveDate>,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub reason_category: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    /// Falls back to the configured policy default
    #[serde(default)]
    pub notice_period_days: Option<i32>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct ApproveExitRequest {
    pub approved_lwd: NaiveDate,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct CancelExitRequest {
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct UpdateExitCaseRequest {
    #[serde(default)]
    pub exit_interview_date: Option<NaiveDate>,
    #[serde(default)]
    pub exit_interview_notes: Option<String>,
    #[serde(default)]
    pub eligible_for_rehire: Option<bool>,
    #[serde(default)]
    pub rehire_notes: Option<String>,
    #[serde(default)]
    pub notice_served_days: Option<i32>,
    #[serde(default)]
    pub notice_buyout_days: Option<i32>,
    #[serde(default)]
    pub notes: Option<String>,
}

// ─── Task Requests ────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct StartTaskRequest {
    #[serde(default)]
    pub assigned_to: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct ResolveTaskRequest {
    /// Either `cleared` or `not_applicable`
    pub status: ClearanceTaskStatus,
    #[serde(default)]
    pub recovery_amount: Option<Decimal>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, ToSchema, PartialEq, Eq)]
pub struct ClearanceProgress {
    pub tasks_completed: i32,
    pub tasks_total: i32,
    pub clearance_progress_percent: i32,
}

// ─── Listing & Stats ──────────────────────────────────────────────────────────

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListCasesQuery {
    /// 1-based page number, at most 1000000
    pub page: Option<i64>,
    /// Page size, 1..=100
    pub limit: Option<i64>,
    pub status: Option<ExitCaseStatus>,
}

impl ListCasesQuery {
    pub const DEFAULT_LIMIT: i64 = 20;
    pub const MAX_LIMIT: i64 = 100;
    pub const MAX_PAGE: i64 = 1_000_000;

    /// Normalized `(page, limit)`. `(page - 1) * limit` always fits an `i64`.
    pub fn page_and_limit(&self) -> (i64, i64) {
        let page = self.page.unwrap_or(1).clamp(1, Self::MAX_PAGE);
        let limit = self
            .limit
            .unwrap_or(Self::DEFAULT_LIMIT)
            .clamp(1, Self::MAX_LIMIT);
        (page, limit)
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PageMeta {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ExitCaseList {
    pub data: Vec<ExitCase>,
    pub meta: PageMeta,
}

#[derive(Debug, Default, Serialize, FromRow, ToSchema, PartialEq, Eq)]
pub struct ExitStats {
    pub total: i64,
    pub initiated: i64,
    pub clearance_pending: i64,
    pub clearance_completed: i64,
    pub fnf_pending: i64,
    pub fnf_processed: i64,
    pub completed: i64,
    pub cancelled: i64,
    pub this_month: i64,
}

// ─── Employee Directory ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EmploymentStatus {
    Active,
    Probation,
    OnNotice,
    Suspended,
    Inactive,
    Exited,
}

impl EmploymentStatus {
    /// Only active and probationary employees can be offboarded.
    pub fn can_initiate_exit(self) -> bool {
        matches!(self, EmploymentStatus::Active | EmploymentStatus::Probation)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EmployeeRecord {
    pub id: Uuid,
    pub company_id: Uuid,
    pub full_name: String,
    pub status: EmploymentStatus,
}

/// Final-period compensation figures supplied by payroll.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct EmployeeCompensation {
    pub monthly_basic: Decimal,
    /// Statutory gratuity, computed by the payroll collaborator
    #[serde(default)]
    pub gratuity: Decimal,
    #[serde(default)]
    pub tds: Decimal,
    #[serde(default)]
    pub pf_employee: Decimal,
}

// ─── JWT Claims ───────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub company_id: String,
    pub name: String,
    #[serde(default)]
    pub role: Option<String>,
    pub exp: usize,
    pub iat: usize,
}
