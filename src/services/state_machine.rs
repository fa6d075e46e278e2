// src/services/state_machine.rs

use crate::{
    errors::ExitError,
    models::{
        ClearanceDepartment, ClearanceProgress, ClearanceTask, ClearanceTaskStatus,
        EmployeeCompensation, EmployeeRecord, ExitCase, ExitCaseDetail, ExitCaseStatus,
        FinalSettlement, InitiateExitRequest, SettlementAdjustments, SettlementStatus,
        UpdateExitCaseRequest,
    },
    services::{
        clearance::ClearanceTracker,
        settlement::{SettlementCalculator, SettlementInputs},
    },
};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use tracing::{info, warn};
use uuid::Uuid;

/// Validates and applies lifecycle transitions on an exit case aggregate.
///
/// Every operation is pure: it mutates the in-memory aggregate or fails
/// without touching it. Persistence and locking live in the lifecycle service.
pub struct ExitCaseStateMachine;

/// Result of a settlement calculation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SettlementOutcome {
    pub negative_settlement_warning: bool,
}

impl ExitCaseStateMachine {
    /// Opens a new case in `initiated` with no tasks.
    #[allow(clippy::too_many_arguments)]
    pub fn initiate(
        company_id: Uuid,
        employee: &EmployeeRecord,
        has_open_case: bool,
        request: InitiateExitRequest,
        default_notice_period_days: i32,
        initiated_by: &str,
        now: DateTime<Utc>,
    ) -> Result<ExitCase, ExitError> {
        if employee.company_id != company_id {
            return Err(ExitError::InvalidEmployeeState {
                employee_id: employee.id,
                reason: "employee belongs to another company".to_string(),
            });
        }
        if !employee.status.can_initiate_exit() {
            return Err(ExitError::InvalidEmployeeState {
                employee_id: employee.id,
                reason: format!(
                    "employment status is {:?}; only active or probationary employees can exit",
                    employee.status
                ),
            });
        }
        if has_open_case {
            return Err(ExitError::InvalidEmployeeState {
                employee_id: employee.id,
                reason: "an exit case is already open".to_string(),
            });
        }
        if let (Some(resigned), Some(requested)) =
            (request.resignation_date, request.requested_lwd)
        {
            if requested < resigned {
                return Err(ExitError::InvalidDate(format!(
                    "requested last working day {} precedes resignation date {}",
                    requested, resigned
                )));
            }
        }

        let notice_period_days = request
            .notice_period_days
            .unwrap_or(default_notice_period_days);
        if notice_period_days < 0 {
            return Err(ExitError::InvalidAmount {
                field: "notice_period_days",
                value: Decimal::from(notice_period_days),
            });
        }

        info!(
            "Exit case initiated for employee {} ({})",
            employee.id,
            request.exit_type.label()
        );

        Ok(ExitCase {
            id: Uuid::new_v4(),
            company_id,
            employee_id: employee.id,
            employee_name: employee.full_name.clone(),
            exit_type: request.exit_type,
            resignation_date: request.resignation_date,
            requested_last_working_day: request.requested_lwd,
            approved_last_working_day: None,
            actual_last_working_day: None,
            reason_category: request.reason_category,
            reason: request.reason,
            notice_period_days,
            notice_served_days: 0,
            notice_buyout_days: 0,
            notice_recovery_amount: Decimal::ZERO,
            status: ExitCaseStatus::Initiated,
            clearance_progress_percent: 0,
            tasks_completed: 0,
            tasks_total: 0,
            eligible_for_rehire: None,
            rehire_notes: None,
            exit_interview_date: None,
            exit_interview_notes: None,
            notes: request.notes,
            initiated_by: initiated_by.to_string(),
            approved_by: None,
            approved_at: None,
            cancelled_by: None,
            cancelled_at: None,
            cancellation_reason: None,
            completed_at: None,
            created_at: now,
            updated_at: now,
        })
    }

    /// Fixes the last working day and spawns the clearance checklist.
    #[allow(clippy::too_many_arguments)]
    pub fn approve(
        detail: &mut ExitCaseDetail,
        approved_lwd: NaiveDate,
        notes: Option<String>,
        approved_by: &str,
        departments: &[ClearanceDepartment],
        today: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<(), ExitError> {
        require_status(&detail.case, &[ExitCaseStatus::Initiated], "approve")?;

        if approved_lwd < today {
            return Err(ExitError::InvalidDate(format!(
                "approved last working day {} is in the past",
                approved_lwd
            )));
        }
        if let Some(resigned) = detail.case.resignation_date {
            if approved_lwd < resigned {
                return Err(ExitError::InvalidDate(format!(
                    "approved last working day {} precedes resignation date {}",
                    approved_lwd, resigned
                )));
            }
        }

        let case = &mut detail.case;
        case.approved_last_working_day = Some(approved_lwd);
        case.approved_by = Some(approved_by.to_string());
        case.approved_at = Some(now);
        case.notice_served_days = match case.resignation_date {
            Some(resigned) => {
                (approved_lwd - resigned).num_days().clamp(0, i32::MAX as i64) as i32
            }
            None if case.exit_type.waives_notice() => case.notice_period_days,
            None => 0,
        };
        if notes.is_some() {
            case.notes = notes;
        }
        transition(case, ExitCaseStatus::ClearancePending, "approve", now)?;

        let created = ClearanceTracker::add_tasks_from_template(
            &detail.case,
            &mut detail.clearance_tasks,
            departments,
            now,
        );
        info!(
            "Exit case {} approved with last working day {}; {} clearance tasks created",
            detail.case.id, approved_lwd, created
        );

        refresh_clearance(detail, now)
    }

    pub fn start_task(
        detail: &mut ExitCaseDetail,
        task_id: Uuid,
        assigned_to: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<ClearanceTask, ExitError> {
        require_status(&detail.case, &[ExitCaseStatus::ClearancePending], "start a task on")?;
        let task = find_task_mut(&mut detail.clearance_tasks, task_id)?;
        ClearanceTracker::start(task, assigned_to, now)?;
        let task = task.clone();
        detail.case.updated_at = now;
        Ok(task)
    }

    /// Marks a task cleared; the last resolution moves the case to `clearance_completed`.
    pub fn complete_task(
        detail: &mut ExitCaseDetail,
        task_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<ClearanceTask, ExitError> {
        Self::resolve_task(detail, task_id, ClearanceTaskStatus::Cleared, None, None, now)
    }

    pub fn resolve_task(
        detail: &mut ExitCaseDetail,
        task_id: Uuid,
        resolution: ClearanceTaskStatus,
        recovery_amount: Option<Decimal>,
        notes: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<ClearanceTask, ExitError> {
        require_status(&detail.case, &[ExitCaseStatus::ClearancePending], "resolve a task on")?;

        let task = find_task_mut(&mut detail.clearance_tasks, task_id)?;
        ClearanceTracker::mark_resolved(task, resolution, recovery_amount, notes, now)?;
        let task = task.clone();

        refresh_clearance(detail, now)?;
        Ok(task)
    }

    /// Progress derived from the current task list.
    pub fn progress(detail: &ExitCaseDetail) -> ClearanceProgress {
        ClearanceTracker::progress(&detail.clearance_tasks)
    }

    /// Computes the full-and-final settlement and moves the case to `fnf_pending`.
    ///
    /// An existing settlement is only overwritten when `adjustments.recalculate`
    /// is set; recalculation resets the settlement to `calculated`.
    pub fn calculate_settlement(
        detail: &mut ExitCaseDetail,
        compensation: &EmployeeCompensation,
        adjustments: &SettlementAdjustments,
        now: DateTime<Utc>,
    ) -> Result<SettlementOutcome, ExitError> {
        let case_id = detail.case.id;
        match detail.case.status {
            ExitCaseStatus::ClearanceCompleted => {
                if detail.final_settlement.is_some() && !adjustments.recalculate {
                    return Err(ExitError::SettlementAlreadyCalculated(case_id));
                }
            }
            ExitCaseStatus::FnfPending | ExitCaseStatus::FnfProcessed => {
                if !adjustments.recalculate {
                    return Err(ExitError::SettlementAlreadyCalculated(case_id));
                }
            }
            from => {
                return Err(ExitError::InvalidTransition {
                    from,
                    action: "calculate a settlement for",
                });
            }
        }

        SettlementCalculator::validate_compensation(compensation)?;

        let last_working_day = detail
            .case
            .actual_last_working_day
            .or(detail.case.approved_last_working_day)
            .ok_or_else(|| {
                ExitError::InvalidDate("exit case has no approved last working day".to_string())
            })?;

        let inputs = SettlementInputs::from_compensation(
            compensation,
            last_working_day,
            detail.case.notice_period_days,
            detail.case.notice_served_days,
            detail.case.notice_buyout_days,
            ClearanceTracker::cleared_recovery_total(&detail.clearance_tasks),
        );
        let breakdown = SettlementCalculator::calculate(&inputs, adjustments)?;

        let (id, created_at) = detail
            .final_settlement
            .as_ref()
            .map(|s| (s.id, s.created_at))
            .unwrap_or_else(|| (Uuid::new_v4(), now));

        let negative = breakdown.is_negative();
        detail.final_settlement = Some(FinalSettlement {
            id,
            exit_case_id: case_id,
            leave_encashment_days: breakdown.leave_encashment_days,
            basic_salary_dues: breakdown.basic_salary_dues,
            leave_encashment: breakdown.leave_encashment,
            bonus_dues: breakdown.bonus_dues,
            gratuity: breakdown.gratuity,
            reimbursements: breakdown.reimbursements,
            other_earnings: breakdown.other_earnings,
            total_earnings: breakdown.total_earnings,
            notice_recovery: breakdown.notice_recovery,
            asset_recovery: breakdown.asset_recovery,
            loan_recovery: breakdown.loan_recovery,
            advance_recovery: breakdown.advance_recovery,
            tds: breakdown.tds,
            pf_employee: breakdown.pf_employee,
            other_deductions: breakdown.other_deductions,
            total_deductions: breakdown.total_deductions,
            net_payable: breakdown.net_payable,
            is_negative: negative,
            status: SettlementStatus::Calculated,
            calculation_date: now,
            approved_date: None,
            processed_date: None,
            payment_date: None,
            payment_reference: None,
            notes: adjustments.notes.clone(),
            created_at,
            updated_at: now,
        });
        detail.case.notice_recovery_amount = breakdown.notice_recovery;

        if detail.case.status != ExitCaseStatus::FnfPending {
            transition(&mut detail.case, ExitCaseStatus::FnfPending, "calculate a settlement for", now)?;
        } else {
            detail.case.updated_at = now;
        }

        if negative {
            warn!(
                "Exit case {} settlement is negative: net payable {}",
                case_id, breakdown.net_payable
            );
        } else {
            info!(
                "Exit case {} settlement calculated at {} per day: net payable {}",
                case_id, breakdown.daily_rate, breakdown.net_payable
            );
        }

        Ok(SettlementOutcome {
            negative_settlement_warning: negative,
        })
    }

    pub fn approve_settlement(
        detail: &mut ExitCaseDetail,
        now: DateTime<Utc>,
    ) -> Result<(), ExitError> {
        require_status(&detail.case, &[ExitCaseStatus::FnfPending], "approve the settlement of")?;
        let settlement = settlement_in(detail, SettlementStatus::Calculated)?;
        settlement.status = SettlementStatus::Approved;
        settlement.approved_date = Some(now);
        settlement.updated_at = now;
        detail.case.updated_at = now;
        info!(
            "Exit case {} settlement {}",
            detail.case.id,
            SettlementStatus::Approved.label()
        );
        Ok(())
    }

    pub fn process_settlement(
        detail: &mut ExitCaseDetail,
        now: DateTime<Utc>,
    ) -> Result<(), ExitError> {
        require_status(&detail.case, &[ExitCaseStatus::FnfPending], "process the settlement of")?;
        let settlement = settlement_in(detail, SettlementStatus::Approved)?;
        settlement.status = SettlementStatus::Processed;
        settlement.processed_date = Some(now);
        settlement.updated_at = now;
        transition(&mut detail.case, ExitCaseStatus::FnfProcessed, "process the settlement of", now)
    }

    pub fn record_payment(
        detail: &mut ExitCaseDetail,
        payment_reference: String,
        payment_date: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<(), ExitError> {
        require_status(&detail.case, &[ExitCaseStatus::FnfProcessed], "record payment for")?;
        let settlement = settlement_in(detail, SettlementStatus::Processed)?;
        settlement.status = SettlementStatus::Paid;
        settlement.payment_reference = Some(payment_reference);
        settlement.payment_date = Some(payment_date);
        settlement.updated_at = now;
        detail.case.updated_at = now;
        info!("Exit case {} settlement paid", detail.case.id);
        Ok(())
    }

    /// Closes a case whose settlement has been paid.
    pub fn complete(
        detail: &mut ExitCaseDetail,
        today: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<(), ExitError> {
        require_status(
            &detail.case,
            &[ExitCaseStatus::FnfPending, ExitCaseStatus::FnfProcessed],
            "complete",
        )?;
        let paid = detail
            .final_settlement
            .as_ref()
            .is_some_and(|s| s.status == SettlementStatus::Paid);
        if !paid {
            return Err(ExitError::SettlementNotPaid(detail.case.id));
        }

        let case = &mut detail.case;
        if case.actual_last_working_day.is_none() {
            case.actual_last_working_day = case.approved_last_working_day.or(Some(today));
        }
        case.completed_at = Some(now);
        transition(case, ExitCaseStatus::Completed, "complete", now)
    }

    /// Cancels an open case. Returns `false` when the case was already cancelled.
    pub fn cancel(
        detail: &mut ExitCaseDetail,
        reason: Option<String>,
        cancelled_by: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, ExitError> {
        let case = &mut detail.case;
        if case.status == ExitCaseStatus::Cancelled {
            return Ok(false);
        }
        transition(case, ExitCaseStatus::Cancelled, "cancel", now)?;
        case.cancelled_at = Some(now);
        case.cancelled_by = Some(cancelled_by.to_string());
        case.cancellation_reason = reason;
        Ok(true)
    }

    /// Applies informational edits. Notice figures freeze once a settlement exists.
    pub fn update(
        detail: &mut ExitCaseDetail,
        request: UpdateExitCaseRequest,
        now: DateTime<Utc>,
    ) -> Result<(), ExitError> {
        if detail.case.status.is_terminal() {
            return Err(ExitError::InvalidTransition {
                from: detail.case.status,
                action: "update",
            });
        }

        let touches_notice =
            request.notice_served_days.is_some() || request.notice_buyout_days.is_some();
        if touches_notice && detail.final_settlement.is_some() {
            return Err(ExitError::InvalidTransition {
                from: detail.case.status,
                action: "change notice days on",
            });
        }
        for (field, days) in [
            ("notice_served_days", request.notice_served_days),
            ("notice_buyout_days", request.notice_buyout_days),
        ] {
            if let Some(days) = days.filter(|d| *d < 0) {
                return Err(ExitError::InvalidAmount {
                    field,
                    value: Decimal::from(days),
                });
            }
        }

        let case = &mut detail.case;
        if let Some(days) = request.notice_served_days {
            case.notice_served_days = days;
        }
        if let Some(days) = request.notice_buyout_days {
            case.notice_buyout_days = days;
        }
        if request.exit_interview_date.is_some() {
            case.exit_interview_date = request.exit_interview_date;
        }
        if request.exit_interview_notes.is_some() {
            case.exit_interview_notes = request.exit_interview_notes;
        }
        if request.eligible_for_rehire.is_some() {
            case.eligible_for_rehire = request.eligible_for_rehire;
        }
        if request.rehire_notes.is_some() {
            case.rehire_notes = request.rehire_notes;
        }
        if request.notes.is_some() {
            case.notes = request.notes;
        }
        case.updated_at = now;
        Ok(())
    }
}

fn can_transition(from: ExitCaseStatus, to: ExitCaseStatus) -> bool {
    use ExitCaseStatus::*;
    matches!(
        (from, to),
        (Initiated, ClearancePending)
            | (ClearancePending, ClearanceCompleted)
            | (ClearanceCompleted, FnfPending)
            | (FnfPending, FnfProcessed)
            // corrective recalculation of a processed settlement
            | (FnfProcessed, FnfPending)
            | (FnfPending, Completed)
            | (FnfProcessed, Completed)
    ) || (to == Cancelled && from.is_open())
}

fn transition(
    case: &mut ExitCase,
    to: ExitCaseStatus,
    action: &'static str,
    now: DateTime<Utc>,
) -> Result<(), ExitError> {
    if !can_transition(case.status, to) {
        return Err(ExitError::InvalidTransition {
            from: case.status,
            action,
        });
    }
    info!("Exit case {}: {} -> {}", case.id, case.status.label(), to.label());
    case.status = to;
    case.updated_at = now;
    Ok(())
}

fn require_status(
    case: &ExitCase,
    allowed: &[ExitCaseStatus],
    action: &'static str,
) -> Result<(), ExitError> {
    if allowed.contains(&case.status) {
        Ok(())
    } else {
        Err(ExitError::InvalidTransition {
            from: case.status,
            action,
        })
    }
}

fn find_task_mut(
    tasks: &mut [ClearanceTask],
    task_id: Uuid,
) -> Result<&mut ClearanceTask, ExitError> {
    tasks
        .iter_mut()
        .find(|t| t.id == task_id)
        .ok_or(ExitError::TaskNotFound(task_id))
}

fn settlement_in(
    detail: &mut ExitCaseDetail,
    expected: SettlementStatus,
) -> Result<&mut FinalSettlement, ExitError> {
    let case_id = detail.case.id;
    let settlement = detail
        .final_settlement
        .as_mut()
        .ok_or(ExitError::SettlementNotFound(case_id))?;
    if settlement.status != expected {
        return Err(ExitError::InvalidSettlementState {
            found: settlement.status,
            expected,
        });
    }
    Ok(settlement)
}

// Recompute derived aggregates and auto-advance once every task is resolved.
fn refresh_clearance(detail: &mut ExitCaseDetail, now: DateTime<Utc>) -> Result<(), ExitError> {
    let progress = ClearanceTracker::progress(&detail.clearance_tasks);
    let case = &mut detail.case;
    case.tasks_completed = progress.tasks_completed;
    case.tasks_total = progress.tasks_total;
    case.clearance_progress_percent = progress.clearance_progress_percent;
    case.updated_at = now;

    if case.status == ExitCaseStatus::ClearancePending
        && ClearanceTracker::all_resolved(&detail.clearance_tasks)
    {
        transition(case, ExitCaseStatus::ClearanceCompleted, "complete clearance for", now)?;
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::{EmploymentStatus, ExitType};
    use chrono::Days;
    use rust_decimal_macros::dec;

    const ALL_DEPARTMENTS: [ClearanceDepartment; 5] = [
        ClearanceDepartment::It,
        ClearanceDepartment::Hr,
        ClearanceDepartment::Finance,
        ClearanceDepartment::Admin,
        ClearanceDepartment::Manager,
    ];

    fn company() -> Uuid {
        Uuid::from_u128(0x0c0a_0001)
    }

    fn employee(status: EmploymentStatus) -> EmployeeRecord {
        EmployeeRecord {
            id: Uuid::from_u128(0xe000_0042),
            company_id: company(),
            full_name: "Asha Menon".to_string(),
            status,
        }
    }

    fn request(exit_type: ExitType) -> InitiateExitRequest {
        InitiateExitRequest {
            employee_id: Uuid::from_u128(0xe000_0042),
            exit_type,
            resignation_date: Some(today()),
            requested_lwd: Some(today() + Days::new(30)),
            reason: Some("Relocating".to_string()),
            reason_category: Some("personal".to_string()),
            notes: None,
            notice_period_days: None,
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 2).unwrap()
    }

    fn compensation(monthly_basic: Decimal) -> EmployeeCompensation {
        EmployeeCompensation {
            monthly_basic,
            gratuity: Decimal::ZERO,
            tds: Decimal::ZERO,
            pf_employee: Decimal::ZERO,
        }
    }

    pub(crate) fn sample_case() -> ExitCase {
        ExitCaseStateMachine::initiate(
            company(),
            &employee(EmploymentStatus::Active),
            false,
            request(ExitType::Resignation),
            30,
            "hr.admin",
            Utc::now(),
        )
        .unwrap()
    }

    fn sample_detail() -> ExitCaseDetail {
        ExitCaseDetail {
            case: sample_case(),
            clearance_tasks: Vec::new(),
            final_settlement: None,
        }
    }

    fn approved_detail() -> ExitCaseDetail {
        let mut detail = sample_detail();
        ExitCaseStateMachine::approve(
            &mut detail,
            today() + Days::new(30),
            None,
            "hr.head",
            &ALL_DEPARTMENTS,
            today(),
            Utc::now(),
        )
        .unwrap();
        detail
    }

    fn cleared_detail() -> ExitCaseDetail {
        let mut detail = approved_detail();
        let ids: Vec<_> = detail.clearance_tasks.iter().map(|t| t.id).collect();
        for id in ids {
            ExitCaseStateMachine::complete_task(&mut detail, id, Utc::now()).unwrap();
        }
        detail
    }

    fn assert_progress_invariant(case: &ExitCase) {
        assert!(case.tasks_completed <= case.tasks_total);
        let expected = if case.tasks_total > 0 {
            (100.0 * case.tasks_completed as f64 / case.tasks_total as f64).round() as i32
        } else {
            0
        };
        assert_eq!(case.clearance_progress_percent, expected);
    }

    #[test]
    fn test_initiate_creates_case_without_tasks() {
        let case = sample_case();
        assert_eq!(case.status, ExitCaseStatus::Initiated);
        assert_eq!(case.tasks_total, 0);
        assert_eq!(case.notice_period_days, 30);
        assert_eq!(case.employee_name, "Asha Menon");
        assert!(case.approved_last_working_day.is_none());
    }

    #[test]
    fn test_initiate_rejects_inactive_employee() {
        let err = ExitCaseStateMachine::initiate(
            company(),
            &employee(EmploymentStatus::Exited),
            false,
            request(ExitType::Resignation),
            30,
            "hr.admin",
            Utc::now(),
        )
        .unwrap_err();
        assert!(matches!(err, ExitError::InvalidEmployeeState { .. }));
    }

    #[test]
    fn test_initiate_allows_probationer() {
        let case = ExitCaseStateMachine::initiate(
            company(),
            &employee(EmploymentStatus::Probation),
            false,
            request(ExitType::Termination),
            30,
            "hr.admin",
            Utc::now(),
        )
        .unwrap();
        assert_eq!(case.exit_type, ExitType::Termination);
    }

    #[test]
    fn test_initiate_rejects_second_open_case() {
        let err = ExitCaseStateMachine::initiate(
            company(),
            &employee(EmploymentStatus::Active),
            true,
            request(ExitType::Resignation),
            30,
            "hr.admin",
            Utc::now(),
        )
        .unwrap_err();
        assert!(matches!(err, ExitError::InvalidEmployeeState { .. }));
    }

    #[test]
    fn test_initiate_rejects_employee_of_other_company() {
        let err = ExitCaseStateMachine::initiate(
            Uuid::new_v4(),
            &employee(EmploymentStatus::Active),
            false,
            request(ExitType::Resignation),
            30,
            "hr.admin",
            Utc::now(),
        )
        .unwrap_err();
        assert!(matches!(err, ExitError::InvalidEmployeeState { .. }));
    }

    #[test]
    fn test_approve_spawns_pending_tasks() {
        let detail = approved_detail();

        assert_eq!(detail.case.status, ExitCaseStatus::ClearancePending);
        assert_eq!(detail.case.approved_last_working_day, Some(today() + Days::new(30)));
        assert_eq!(detail.case.notice_served_days, 30);
        assert_eq!(detail.case.tasks_total, 13);
        assert_eq!(detail.case.tasks_completed, 0);
        assert!(detail
            .clearance_tasks
            .iter()
            .all(|t| t.status == ClearanceTaskStatus::Pending));
        assert_progress_invariant(&detail.case);
    }

    #[test]
    fn test_approve_rejects_lwd_before_resignation() {
        let mut detail = sample_detail();
        detail.case.resignation_date = Some(today() + Days::new(10));

        let err = ExitCaseStateMachine::approve(
            &mut detail,
            today() + Days::new(5),
            None,
            "hr.head",
            &ALL_DEPARTMENTS,
            today(),
            Utc::now(),
        )
        .unwrap_err();

        assert!(matches!(err, ExitError::InvalidDate(_)));
        assert_eq!(detail.case.status, ExitCaseStatus::Initiated);
        assert!(detail.clearance_tasks.is_empty());
    }

    #[test]
    fn test_approve_rejects_past_lwd() {
        let mut detail = sample_detail();
        detail.case.resignation_date = None;
        let err = ExitCaseStateMachine::approve(
            &mut detail,
            today() - Days::new(1),
            None,
            "hr.head",
            &ALL_DEPARTMENTS,
            today(),
            Utc::now(),
        )
        .unwrap_err();
        assert!(matches!(err, ExitError::InvalidDate(_)));
    }

    #[test]
    fn test_approve_twice_is_invalid_transition() {
        let mut detail = approved_detail();
        let err = ExitCaseStateMachine::approve(
            &mut detail,
            today() + Days::new(40),
            None,
            "hr.head",
            &ALL_DEPARTMENTS,
            today(),
            Utc::now(),
        )
        .unwrap_err();
        assert_eq!(
            err,
            ExitError::InvalidTransition {
                from: ExitCaseStatus::ClearancePending,
                action: "approve"
            }
        );
        assert_eq!(detail.case.approved_last_working_day, Some(today() + Days::new(30)));
    }

    #[test]
    fn test_complete_task_before_approval_fails() {
        let mut detail = sample_detail();
        let err =
            ExitCaseStateMachine::complete_task(&mut detail, Uuid::new_v4(), Utc::now()).unwrap_err();
        assert!(matches!(err, ExitError::InvalidTransition { .. }));
    }

    #[test]
    fn test_complete_unknown_task_is_not_found() {
        let mut detail = approved_detail();
        let id = Uuid::new_v4();
        let err = ExitCaseStateMachine::complete_task(&mut detail, id, Utc::now()).unwrap_err();
        assert_eq!(err, ExitError::TaskNotFound(id));
    }

    #[test]
    fn test_complete_task_twice_leaves_progress_unchanged() {
        let mut detail = approved_detail();
        let id = detail.clearance_tasks[0].id;

        ExitCaseStateMachine::complete_task(&mut detail, id, Utc::now()).unwrap();
        let before = ExitCaseStateMachine::progress(&detail);

        let err = ExitCaseStateMachine::complete_task(&mut detail, id, Utc::now()).unwrap_err();
        assert!(matches!(err, ExitError::TaskAlreadyResolved { .. }));
        assert_eq!(ExitCaseStateMachine::progress(&detail), before);
        assert_eq!(detail.case.tasks_completed, 1);
        assert_progress_invariant(&detail.case);
    }

    #[test]
    fn test_clearance_completes_only_when_every_task_resolved() {
        let mut detail = approved_detail();
        let ids: Vec<_> = detail.clearance_tasks.iter().map(|t| t.id).collect();
        let (last, rest) = ids.split_last().unwrap();

        for (i, id) in rest.iter().enumerate() {
            if i % 3 == 0 {
                ExitCaseStateMachine::resolve_task(
                    &mut detail,
                    *id,
                    ClearanceTaskStatus::NotApplicable,
                    None,
                    None,
                    Utc::now(),
                )
                .unwrap();
            } else {
                ExitCaseStateMachine::complete_task(&mut detail, *id, Utc::now()).unwrap();
            }
            assert_eq!(detail.case.status, ExitCaseStatus::ClearancePending);
            assert_progress_invariant(&detail.case);
        }

        ExitCaseStateMachine::complete_task(&mut detail, *last, Utc::now()).unwrap();
        assert_eq!(detail.case.status, ExitCaseStatus::ClearanceCompleted);
        assert_eq!(detail.case.clearance_progress_percent, 100);
    }

    #[test]
    fn test_start_task_keeps_case_pending() {
        let mut detail = approved_detail();
        let id = detail.clearance_tasks[0].id;
        let task =
            ExitCaseStateMachine::start_task(&mut detail, id, Some("ravi.it".into()), Utc::now())
                .unwrap();
        assert_eq!(task.status, ClearanceTaskStatus::InProgress);
        assert_eq!(detail.case.tasks_completed, 0);

        // in-progress tasks can still be completed
        ExitCaseStateMachine::complete_task(&mut detail, id, Utc::now()).unwrap();
        assert_eq!(detail.case.tasks_completed, 1);
    }

    #[test]
    fn test_settlement_requires_completed_clearance() {
        let mut detail = approved_detail();
        let err = ExitCaseStateMachine::calculate_settlement(
            &mut detail,
            &compensation(dec!(60000)),
            &SettlementAdjustments::default(),
            Utc::now(),
        )
        .unwrap_err();
        assert!(matches!(err, ExitError::InvalidTransition { .. }));
        assert!(detail.final_settlement.is_none());
    }

    #[test]
    fn test_settlement_uses_final_month_and_cleared_recoveries() {
        let mut detail = approved_detail();
        let ids: Vec<_> = detail.clearance_tasks.iter().map(|t| t.id).collect();
        ExitCaseStateMachine::resolve_task(
            &mut detail,
            ids[0],
            ClearanceTaskStatus::Cleared,
            Some(dec!(45000)),
            None,
            Utc::now(),
        )
        .unwrap();
        for id in &ids[1..] {
            ExitCaseStateMachine::complete_task(&mut detail, *id, Utc::now()).unwrap();
        }

        // LWD 2026-04-01: 1 day worked in a 30-day month
        ExitCaseStateMachine::calculate_settlement(
            &mut detail,
            &compensation(dec!(60000)),
            &SettlementAdjustments::default(),
            Utc::now(),
        )
        .unwrap();

        let settlement = detail.final_settlement.as_ref().unwrap();
        assert_eq!(settlement.basic_salary_dues, dec!(2000));
        assert_eq!(settlement.asset_recovery, dec!(45000));
        assert_eq!(settlement.notice_recovery, dec!(0));
        assert_eq!(settlement.net_payable, dec!(-43000));
        assert!(settlement.is_negative);
    }

    #[test]
    fn test_implicit_recalculation_is_rejected() {
        let mut detail = cleared_detail();
        let comp = compensation(dec!(60000));
        ExitCaseStateMachine::calculate_settlement(
            &mut detail,
            &comp,
            &SettlementAdjustments::default(),
            Utc::now(),
        )
        .unwrap();
        let first = detail.final_settlement.clone().unwrap();

        let err = ExitCaseStateMachine::calculate_settlement(
            &mut detail,
            &comp,
            &SettlementAdjustments {
                bonus_dues: dec!(1000),
                ..Default::default()
            },
            Utc::now(),
        )
        .unwrap_err();
        assert_eq!(err, ExitError::SettlementAlreadyCalculated(detail.case.id));
        assert_eq!(detail.final_settlement.as_ref(), Some(&first));

        ExitCaseStateMachine::calculate_settlement(
            &mut detail,
            &comp,
            &SettlementAdjustments {
                bonus_dues: dec!(1000),
                recalculate: true,
                ..Default::default()
            },
            Utc::now(),
        )
        .unwrap();
        let second = detail.final_settlement.as_ref().unwrap();
        assert_eq!(second.id, first.id);
        assert_eq!(second.bonus_dues, dec!(1000));
        assert_eq!(second.total_earnings, first.total_earnings + dec!(1000));
    }

    #[test]
    fn test_negative_settlement_is_flagged_not_blocked() {
        let mut detail = cleared_detail();
        let outcome = ExitCaseStateMachine::calculate_settlement(
            &mut detail,
            &compensation(dec!(60000)),
            &SettlementAdjustments {
                loan_recovery: dec!(500000),
                ..Default::default()
            },
            Utc::now(),
        )
        .unwrap();

        assert!(outcome.negative_settlement_warning);
        assert_eq!(detail.case.status, ExitCaseStatus::FnfPending);
        assert!(detail.final_settlement.unwrap().net_payable < Decimal::ZERO);
    }

    #[test]
    fn test_complete_requires_paid_settlement() {
        let mut detail = cleared_detail();
        ExitCaseStateMachine::calculate_settlement(
            &mut detail,
            &compensation(dec!(60000)),
            &SettlementAdjustments::default(),
            Utc::now(),
        )
        .unwrap();

        let err = ExitCaseStateMachine::complete(&mut detail, today(), Utc::now()).unwrap_err();
        assert_eq!(err, ExitError::SettlementNotPaid(detail.case.id));
        assert_eq!(detail.case.status, ExitCaseStatus::FnfPending);
    }

    #[test]
    fn test_settlement_steps_must_follow_order() {
        let mut detail = cleared_detail();
        ExitCaseStateMachine::calculate_settlement(
            &mut detail,
            &compensation(dec!(60000)),
            &SettlementAdjustments::default(),
            Utc::now(),
        )
        .unwrap();

        let err = ExitCaseStateMachine::process_settlement(&mut detail, Utc::now()).unwrap_err();
        assert_eq!(
            err,
            ExitError::InvalidSettlementState {
                found: SettlementStatus::Calculated,
                expected: SettlementStatus::Approved
            }
        );
        let err = ExitCaseStateMachine::record_payment(
            &mut detail,
            "UTR-1".into(),
            today(),
            Utc::now(),
        )
        .unwrap_err();
        assert!(matches!(err, ExitError::InvalidTransition { .. }));
    }

    #[test]
    fn test_recalculation_after_processing_returns_to_fnf_pending() {
        let mut detail = cleared_detail();
        let comp = compensation(dec!(60000));
        ExitCaseStateMachine::calculate_settlement(
            &mut detail,
            &comp,
            &SettlementAdjustments::default(),
            Utc::now(),
        )
        .unwrap();
        ExitCaseStateMachine::approve_settlement(&mut detail, Utc::now()).unwrap();
        ExitCaseStateMachine::process_settlement(&mut detail, Utc::now()).unwrap();
        assert_eq!(detail.case.status, ExitCaseStatus::FnfProcessed);

        ExitCaseStateMachine::calculate_settlement(
            &mut detail,
            &comp,
            &SettlementAdjustments {
                recalculate: true,
                ..Default::default()
            },
            Utc::now(),
        )
        .unwrap();

        let settlement = detail.final_settlement.as_ref().unwrap();
        assert_eq!(detail.case.status, ExitCaseStatus::FnfPending);
        assert_eq!(settlement.status, SettlementStatus::Calculated);
        assert!(settlement.approved_date.is_none());
        assert!(settlement.processed_date.is_none());
    }

    #[test]
    fn test_end_to_end_resignation() {
        let mut detail = sample_detail();
        assert_eq!(detail.case.status, ExitCaseStatus::Initiated);

        let lwd = today() + Days::new(30);
        ExitCaseStateMachine::approve(
            &mut detail,
            lwd,
            Some("Approved by HR head".into()),
            "hr.head",
            &ALL_DEPARTMENTS,
            today(),
            Utc::now(),
        )
        .unwrap();
        assert_eq!(detail.case.status, ExitCaseStatus::ClearancePending);
        let n = detail.case.tasks_total;
        assert!(n > 0);

        let ids: Vec<_> = detail.clearance_tasks.iter().map(|t| t.id).collect();
        for id in ids {
            ExitCaseStateMachine::complete_task(&mut detail, id, Utc::now()).unwrap();
        }
        assert_eq!(detail.case.status, ExitCaseStatus::ClearanceCompleted);
        assert_eq!(detail.case.clearance_progress_percent, 100);
        assert_eq!(detail.case.tasks_completed, n);

        let outcome = ExitCaseStateMachine::calculate_settlement(
            &mut detail,
            &compensation(dec!(60000)),
            &SettlementAdjustments::default(),
            Utc::now(),
        )
        .unwrap();
        assert!(!outcome.negative_settlement_warning);
        assert_eq!(detail.case.status, ExitCaseStatus::FnfPending);
        assert_eq!(
            detail.final_settlement.as_ref().map(|s| s.status),
            Some(SettlementStatus::Calculated)
        );

        ExitCaseStateMachine::approve_settlement(&mut detail, Utc::now()).unwrap();
        ExitCaseStateMachine::process_settlement(&mut detail, Utc::now()).unwrap();
        ExitCaseStateMachine::record_payment(&mut detail, "UTR-88231".into(), lwd, Utc::now())
            .unwrap();
        ExitCaseStateMachine::complete(&mut detail, lwd, Utc::now()).unwrap();

        assert_eq!(detail.case.status, ExitCaseStatus::Completed);
        assert_eq!(detail.case.actual_last_working_day, Some(lwd));
        assert!(detail.case.completed_at.is_some());
        assert_progress_invariant(&detail.case);
    }

    #[test]
    fn test_cancel_from_clearance_pending_blocks_tasks() {
        let mut detail = approved_detail();
        let changed =
            ExitCaseStateMachine::cancel(&mut detail, Some("Retained".into()), "hr.head", Utc::now())
                .unwrap();
        assert!(changed);
        assert_eq!(detail.case.status, ExitCaseStatus::Cancelled);
        assert_eq!(detail.case.cancellation_reason.as_deref(), Some("Retained"));

        let id = detail.clearance_tasks[0].id;
        let err = ExitCaseStateMachine::complete_task(&mut detail, id, Utc::now()).unwrap_err();
        assert!(matches!(err, ExitError::InvalidTransition { .. }));
    }

    #[test]
    fn test_cancel_is_idempotent_but_not_after_completion() {
        let mut detail = sample_detail();
        assert!(ExitCaseStateMachine::cancel(&mut detail, None, "hr", Utc::now()).unwrap());
        let cancelled_at = detail.case.cancelled_at;
        assert!(!ExitCaseStateMachine::cancel(&mut detail, None, "hr", Utc::now()).unwrap());
        assert_eq!(detail.case.cancelled_at, cancelled_at);

        let mut done = sample_detail();
        done.case.status = ExitCaseStatus::Completed;
        let err = ExitCaseStateMachine::cancel(&mut done, None, "hr", Utc::now()).unwrap_err();
        assert!(matches!(err, ExitError::InvalidTransition { .. }));
    }

    #[test]
    fn test_update_freezes_notice_after_settlement() {
        let mut detail = cleared_detail();
        ExitCaseStateMachine::update(
            &mut detail,
            UpdateExitCaseRequest {
                notice_buyout_days: Some(10),
                eligible_for_rehire: Some(true),
                ..Default::default()
            },
            Utc::now(),
        )
        .unwrap();
        assert_eq!(detail.case.notice_buyout_days, 10);
        assert_eq!(detail.case.eligible_for_rehire, Some(true));

        ExitCaseStateMachine::calculate_settlement(
            &mut detail,
            &compensation(dec!(60000)),
            &SettlementAdjustments::default(),
            Utc::now(),
        )
        .unwrap();

        let err = ExitCaseStateMachine::update(
            &mut detail,
            UpdateExitCaseRequest {
                notice_served_days: Some(5),
                ..Default::default()
            },
            Utc::now(),
        )
        .unwrap_err();
        assert!(matches!(err, ExitError::InvalidTransition { .. }));

        // informational fields stay editable
        ExitCaseStateMachine::update(
            &mut detail,
            UpdateExitCaseRequest {
                exit_interview_notes: Some("Cited growth".into()),
                ..Default::default()
            },
            Utc::now(),
        )
        .unwrap();
    }

    #[test]
    fn test_short_notice_is_recovered_in_settlement() {
        let mut detail = sample_detail();
        // resigned 10 days before the LWD against a 30-day notice period
        detail.case.resignation_date = Some(today() + Days::new(20));
        ExitCaseStateMachine::approve(
            &mut detail,
            today() + Days::new(30),
            None,
            "hr.head",
            &[ClearanceDepartment::Admin],
            today(),
            Utc::now(),
        )
        .unwrap();
        assert_eq!(detail.case.notice_served_days, 10);

        let ids: Vec<_> = detail.clearance_tasks.iter().map(|t| t.id).collect();
        for id in ids {
            ExitCaseStateMachine::complete_task(&mut detail, id, Utc::now()).unwrap();
        }
        ExitCaseStateMachine::calculate_settlement(
            &mut detail,
            &compensation(dec!(30000)),
            &SettlementAdjustments::default(),
            Utc::now(),
        )
        .unwrap();

        // April has 30 days: daily rate 1000, 20 days short
        let settlement = detail.final_settlement.as_ref().unwrap();
        assert_eq!(settlement.notice_recovery, dec!(20000));
        assert_eq!(detail.case.notice_recovery_amount, dec!(20000));
    }

    fn settle_without_resignation(exit_type: ExitType) -> ExitCaseDetail {
        let mut detail = sample_detail();
        detail.case.exit_type = exit_type;
        detail.case.resignation_date = None;
        ExitCaseStateMachine::approve(
            &mut detail,
            today() + Days::new(30),
            None,
            "hr.head",
            &[ClearanceDepartment::Admin],
            today(),
            Utc::now(),
        )
        .unwrap();
        let ids: Vec<_> = detail.clearance_tasks.iter().map(|t| t.id).collect();
        for id in ids {
            ExitCaseStateMachine::complete_task(&mut detail, id, Utc::now()).unwrap();
        }
        ExitCaseStateMachine::calculate_settlement(
            &mut detail,
            &compensation(dec!(30000)),
            &SettlementAdjustments::default(),
            Utc::now(),
        )
        .unwrap();
        detail
    }

    #[test]
    fn test_employer_initiated_exit_owes_no_notice() {
        for exit_type in [ExitType::Termination, ExitType::Death, ExitType::EndOfContract] {
            let detail = settle_without_resignation(exit_type);
            assert_eq!(detail.case.notice_served_days, 30, "{}", exit_type.label());
            let settlement = detail.final_settlement.as_ref().unwrap();
            assert_eq!(settlement.notice_recovery, dec!(0));
            assert_eq!(detail.case.notice_recovery_amount, dec!(0));
        }
    }

    #[test]
    fn test_absconding_without_resignation_recovers_full_notice() {
        let detail = settle_without_resignation(ExitType::Absconding);
        assert_eq!(detail.case.notice_served_days, 0);
        // April has 30 days: daily rate 1000, nothing served
        let settlement = detail.final_settlement.as_ref().unwrap();
        assert_eq!(settlement.notice_recovery, dec!(30000));
    }

    #[test]
    fn test_transition_table() {
        use ExitCaseStatus::*;
        assert!(can_transition(Initiated, ClearancePending));
        assert!(!can_transition(Initiated, FnfPending));
        assert!(!can_transition(ClearanceCompleted, ClearancePending));
        assert!(can_transition(FnfProcessed, Cancelled));
        assert!(!can_transition(Completed, Cancelled));
        assert!(!can_transition(Cancelled, Cancelled));
    }
}
