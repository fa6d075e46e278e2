// src/services/clearance.rs

use crate::{
    errors::ExitError,
    models::{ClearanceDepartment, ClearanceProgress, ClearanceTask, ClearanceTaskStatus, ExitCase},
    services::settlement::MAX_AMOUNT,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::debug;
use uuid::Uuid;

/// One entry of a department's static clearance checklist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChecklistItem {
    pub task_name: &'static str,
    pub description: &'static str,
}

const fn item(task_name: &'static str, description: &'static str) -> ChecklistItem {
    ChecklistItem {
        task_name,
        description,
    }
}

const IT_CHECKLIST: &[ChecklistItem] = &[
    item("Return laptop", "Return company laptop, charger and accessories"),
    item("Revoke system access", "Disable SSO, VPN and application accounts"),
    item("Transfer mailbox", "Forward or archive the corporate mailbox"),
];

const HR_CHECKLIST: &[ChecklistItem] = &[
    item("Exit interview", "Conduct and record the exit interview"),
    item("Update HRMS", "Mark the employee as separated in HRMS"),
    item("Issue relieving letter", "Prepare relieving and experience letters"),
];

const FINANCE_CHECKLIST: &[ChecklistItem] = &[
    item("Settle advances", "Reconcile outstanding salary and travel advances"),
    item("Collect NDAs", "Collect signed non-disclosure acknowledgements"),
    item("Close expense claims", "Settle or reject pending expense claims"),
];

const ADMIN_CHECKLIST: &[ChecklistItem] = &[
    item("Return ID card", "Collect identity and access cards"),
    item("Return office keys", "Collect desk, cabinet and locker keys"),
];

const MANAGER_CHECKLIST: &[ChecklistItem] = &[
    item("Knowledge transfer", "Hand over documentation and open work items"),
    item("Handover sign-off", "Reporting manager confirms the handover is complete"),
];

pub struct ClearanceTracker;

impl ClearanceTracker {
    /// Static checklist for a department, in declaration order.
    pub fn template(department: ClearanceDepartment) -> &'static [ChecklistItem] {
        match department {
            ClearanceDepartment::It => IT_CHECKLIST,
            ClearanceDepartment::Hr => HR_CHECKLIST,
            ClearanceDepartment::Finance => FINANCE_CHECKLIST,
            ClearanceDepartment::Admin => ADMIN_CHECKLIST,
            ClearanceDepartment::Manager => MANAGER_CHECKLIST,
        }
    }

    /// Appends one pending task per checklist item of each department.
    /// Items already present for the same (department, task name) are skipped.
    /// Returns the number of tasks created.
    pub fn add_tasks_from_template(
        case: &ExitCase,
        tasks: &mut Vec<ClearanceTask>,
        departments: &[ClearanceDepartment],
        now: DateTime<Utc>,
    ) -> usize {
        let mut next_order = tasks.iter().map(|t| t.sort_order + 1).max().unwrap_or(0);
        let mut created = 0;

        for &department in departments {
            for entry in Self::template(department) {
                let exists = tasks
                    .iter()
                    .any(|t| t.department == department && t.task_name == entry.task_name);
                if exists {
                    continue;
                }

                tasks.push(ClearanceTask {
                    id: Uuid::new_v4(),
                    exit_case_id: case.id,
                    department,
                    task_name: entry.task_name.to_string(),
                    description: entry.description.to_string(),
                    status: ClearanceTaskStatus::Pending,
                    sort_order: next_order,
                    assigned_role: Some(department.owner_role().to_string()),
                    assigned_to: None,
                    due_date: case.approved_last_working_day,
                    completed_date: None,
                    recovery_amount: None,
                    notes: None,
                    created_at: now,
                    updated_at: now,
                });
                next_order += 1;
                created += 1;
            }
        }

        created
    }

    /// Moves a pending task to in-progress, optionally reassigning it.
    pub fn start(
        task: &mut ClearanceTask,
        assigned_to: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<(), ExitError> {
        if task.status.is_resolved() {
            return Err(ExitError::TaskAlreadyResolved {
                task_id: task.id,
                status: task.status,
            });
        }
        task.status = ClearanceTaskStatus::InProgress;
        if assigned_to.is_some() {
            task.assigned_to = assigned_to;
        }
        task.updated_at = now;
        Ok(())
    }

    /// Resolves a single task as cleared or not applicable.
    pub fn mark_resolved(
        task: &mut ClearanceTask,
        resolution: ClearanceTaskStatus,
        recovery_amount: Option<Decimal>,
        notes: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<(), ExitError> {
        if !resolution.is_resolved() {
            return Err(ExitError::InvalidResolution(resolution));
        }
        if task.status.is_resolved() {
            return Err(ExitError::TaskAlreadyResolved {
                task_id: task.id,
                status: task.status,
            });
        }
        if let Some(amount) = recovery_amount {
            if amount < Decimal::ZERO || amount > MAX_AMOUNT {
                return Err(ExitError::InvalidAmount {
                    field: "recovery_amount",
                    value: amount,
                });
            }
            task.recovery_amount = Some(amount);
        }
        if notes.is_some() {
            task.notes = notes;
        }

        task.status = resolution;
        task.completed_date = Some(now);
        task.updated_at = now;
        debug!(
            "{} clearance task '{}' marked {}",
            task.department.label(),
            task.task_name,
            resolution.label()
        );
        Ok(())
    }

    /// Resolved/total counts and the rounded percentage; 0% when there are no tasks.
    pub fn progress(tasks: &[ClearanceTask]) -> ClearanceProgress {
        let total = tasks.len() as i32;
        let completed = tasks.iter().filter(|t| t.status.is_resolved()).count() as i32;

        ClearanceProgress {
            tasks_completed: completed,
            tasks_total: total,
            clearance_progress_percent: percent(completed, total),
        }
    }

    /// True when every task is cleared or not applicable.
    pub fn all_resolved(tasks: &[ClearanceTask]) -> bool {
        tasks.iter().all(|t| t.status.is_resolved())
    }

    /// Sum of recovery amounts on cleared tasks. Not-applicable tasks never
    /// contribute, whatever amount they carry.
    pub fn cleared_recovery_total(tasks: &[ClearanceTask]) -> Decimal {
        tasks
            .iter()
            .filter(|t| t.status == ClearanceTaskStatus::Cleared)
            .filter_map(|t| t.recovery_amount)
            .sum()
    }
}

// round(100 * completed / total), half away from zero, in integer arithmetic
fn percent(completed: i32, total: i32) -> i32 {
    if total <= 0 {
        return 0;
    }
    let (completed, total) = (completed as i64, total as i64);
    ((200 * completed + total) / (2 * total)) as i32
}
