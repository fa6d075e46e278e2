// src/services/lifecycle.rs

use crate::{
    auth::AuthActor,
    errors::{AppError, AppResult, ExitError},
    models::{
        ApproveExitRequest, ClearanceDepartment, ClearanceProgress, ClearanceTask, EmployeeRecord,
        ExitCaseDetail, ExitCaseList, ExitStats, FinalSettlement, InitiateExitRequest,
        ListCasesQuery, PageMeta, RecordPaymentRequest, ResolveTaskRequest, SettlementAdjustments,
        SettlementResponse, UpdateExitCaseRequest,
    },
    repository::ExitCaseRepository,
    services::{
        directory::EmployeeDirectory,
        state_machine::{ExitCaseStateMachine, SettlementOutcome},
    },
    state::AppState,
};
use chrono::{NaiveDate, Utc};
use std::{collections::HashSet, sync::Arc};
use tracing::{info, warn};
use uuid::Uuid;

/// Runs state machine operations against persisted cases.
///
/// Each mutation locks the case row, applies the operation to the loaded
/// aggregate, and writes the aggregate back in the same transaction. A failed
/// operation rolls back and leaves the stored case untouched.
pub struct ExitLifecycleService {
    repo: ExitCaseRepository,
    directory: Arc<dyn EmployeeDirectory>,
    default_notice_period_days: i32,
    departments: Vec<ClearanceDepartment>,
}

impl ExitLifecycleService {
    pub fn new(state: &AppState) -> Self {
        Self {
            repo: ExitCaseRepository::new(state.db.clone()),
            directory: state.directory.clone(),
            default_notice_period_days: state.config.default_notice_period_days,
            departments: state.config.clearance_departments.clone(),
        }
    }

    async fn mutate<T, F>(
        &self,
        company_id: Uuid,
        case_id: Uuid,
        apply: F,
    ) -> AppResult<(T, ExitCaseDetail)>
    where
        F: FnOnce(&mut ExitCaseDetail) -> Result<T, ExitError>,
    {
        let mut tx = self.repo.begin().await?;
        let mut detail = ExitCaseRepository::load_detail(&mut tx, company_id, case_id, true).await?;
        let output = apply(&mut detail)?;
        ExitCaseRepository::save_detail(&mut tx, &detail).await?;
        tx.commit().await?;
        Ok((output, detail))
    }

    // ─── Case lifecycle ───────────────────────────────────────────────────────

    pub async fn initiate(
        &self,
        actor: &AuthActor,
        request: InitiateExitRequest,
    ) -> AppResult<ExitCaseDetail> {
        let employee = self.directory.employee(request.employee_id).await?;

        let mut tx = self.repo.begin().await?;
        let has_open_case = ExitCaseRepository::has_open_case(&mut tx, employee.id).await?;
        let case = ExitCaseStateMachine::initiate(
            actor.company_id,
            &employee,
            has_open_case,
            request,
            self.default_notice_period_days,
            &actor.name,
            Utc::now(),
        )?;

        // Two concurrent initiations can both pass the check above; the partial
        // unique index rejects the second insert.
        if let Err(e) = ExitCaseRepository::insert_case(&mut tx, &case).await {
            return Err(if AppError::is_unique_violation(&e) {
                ExitError::InvalidEmployeeState {
                    employee_id: employee.id,
                    reason: "employee already has an open exit case".to_string(),
                }
                .into()
            } else {
                e.into()
            });
        }
        tx.commit().await?;

        info!(
            "Exit case {} initiated for employee {} by {} ({})",
            case.id, case.employee_id, actor.name, actor.user_id
        );
        Ok(ExitCaseDetail {
            case,
            clearance_tasks: Vec::new(),
            final_settlement: None,
        })
    }

    pub async fn detail(&self, actor: &AuthActor, case_id: Uuid) -> AppResult<ExitCaseDetail> {
        self.repo.find_detail(actor.company_id, case_id).await
    }

    pub async fn list(&self, actor: &AuthActor, query: &ListCasesQuery) -> AppResult<ExitCaseList> {
        let (page, limit) = query.page_and_limit();
        let (data, total) = self
            .repo
            .list(actor.company_id, query.status, page, limit)
            .await?;
        Ok(ExitCaseList {
            data,
            meta: PageMeta { page, limit, total },
        })
    }

    pub async fn update(
        &self,
        actor: &AuthActor,
        case_id: Uuid,
        request: UpdateExitCaseRequest,
    ) -> AppResult<ExitCaseDetail> {
        let ((), detail) = self
            .mutate(actor.company_id, case_id, |detail| {
                ExitCaseStateMachine::update(detail, request, Utc::now())
            })
            .await?;
        Ok(detail)
    }

    pub async fn approve(
        &self,
        actor: &AuthActor,
        case_id: Uuid,
        request: ApproveExitRequest,
    ) -> AppResult<ExitCaseDetail> {
        let now = Utc::now();
        let ((), detail) = self
            .mutate(actor.company_id, case_id, |detail| {
                ExitCaseStateMachine::approve(
                    detail,
                    request.approved_lwd,
                    request.notes,
                    &actor.name,
                    &self.departments,
                    now.date_naive(),
                    now,
                )
            })
            .await?;
        Ok(detail)
    }

    pub async fn cancel(
        &self,
        actor: &AuthActor,
        case_id: Uuid,
        reason: Option<String>,
    ) -> AppResult<ExitCaseDetail> {
        let (changed, detail) = self
            .mutate(actor.company_id, case_id, |detail| {
                ExitCaseStateMachine::cancel(detail, reason, &actor.name, Utc::now())
            })
            .await?;
        if !changed {
            warn!("Exit case {} was already cancelled", case_id);
        }
        Ok(detail)
    }

    pub async fn complete(&self, actor: &AuthActor, case_id: Uuid) -> AppResult<ExitCaseDetail> {
        let now = Utc::now();
        let ((), detail) = self
            .mutate(actor.company_id, case_id, |detail| {
                ExitCaseStateMachine::complete(detail, now.date_naive(), now)
            })
            .await?;
        Ok(detail)
    }

    // ─── Clearance ────────────────────────────────────────────────────────────

    pub async fn tasks(&self, actor: &AuthActor, case_id: Uuid) -> AppResult<Vec<ClearanceTask>> {
        Ok(self.detail(actor, case_id).await?.clearance_tasks)
    }

    pub async fn progress(&self, actor: &AuthActor, case_id: Uuid) -> AppResult<ClearanceProgress> {
        Ok(ExitCaseStateMachine::progress(
            &self.detail(actor, case_id).await?,
        ))
    }

    pub async fn start_task(
        &self,
        actor: &AuthActor,
        task_id: Uuid,
        assigned_to: Option<String>,
    ) -> AppResult<ClearanceTask> {
        let case_id = self.repo.case_for_task(actor.company_id, task_id).await?;
        let (task, _) = self
            .mutate(actor.company_id, case_id, |detail| {
                ExitCaseStateMachine::start_task(detail, task_id, assigned_to, Utc::now())
            })
            .await?;
        Ok(task)
    }

    pub async fn complete_task(&self, actor: &AuthActor, task_id: Uuid) -> AppResult<ClearanceTask> {
        let case_id = self.repo.case_for_task(actor.company_id, task_id).await?;
        let (task, _) = self
            .mutate(actor.company_id, case_id, |detail| {
                ExitCaseStateMachine::complete_task(detail, task_id, Utc::now())
            })
            .await?;
        Ok(task)
    }

    pub async fn resolve_task(
        &self,
        actor: &AuthActor,
        task_id: Uuid,
        request: ResolveTaskRequest,
    ) -> AppResult<ClearanceTask> {
        let case_id = self.repo.case_for_task(actor.company_id, task_id).await?;
        let (task, _) = self
            .mutate(actor.company_id, case_id, |detail| {
                ExitCaseStateMachine::resolve_task(
                    detail,
                    task_id,
                    request.status,
                    request.recovery_amount,
                    request.notes,
                    Utc::now(),
                )
            })
            .await?;
        Ok(task)
    }

    // ─── Settlement ───────────────────────────────────────────────────────────

    pub async fn calculate_settlement(
        &self,
        actor: &AuthActor,
        case_id: Uuid,
        adjustments: SettlementAdjustments,
    ) -> AppResult<SettlementResponse> {
        // Compensation is fetched before the lock; the state is re-validated under it.
        let employee_id = self.detail(actor, case_id).await?.case.employee_id;
        let compensation = self.directory.compensation(employee_id).await?;

        let (outcome, detail) = self
            .mutate(actor.company_id, case_id, |detail| {
                ExitCaseStateMachine::calculate_settlement(
                    detail,
                    &compensation,
                    &adjustments,
                    Utc::now(),
                )
            })
            .await?;
        settlement_response(detail, outcome)
    }

    pub async fn settlement(&self, actor: &AuthActor, case_id: Uuid) -> AppResult<FinalSettlement> {
        self.detail(actor, case_id)
            .await?
            .final_settlement
            .ok_or_else(|| ExitError::SettlementNotFound(case_id).into())
    }

    pub async fn approve_settlement(
        &self,
        actor: &AuthActor,
        case_id: Uuid,
    ) -> AppResult<SettlementResponse> {
        let ((), detail) = self
            .mutate(actor.company_id, case_id, |detail| {
                ExitCaseStateMachine::approve_settlement(detail, Utc::now())
            })
            .await?;
        settlement_response(detail, SettlementOutcome::default())
    }

    pub async fn process_settlement(
        &self,
        actor: &AuthActor,
        case_id: Uuid,
    ) -> AppResult<SettlementResponse> {
        let ((), detail) = self
            .mutate(actor.company_id, case_id, |detail| {
                ExitCaseStateMachine::process_settlement(detail, Utc::now())
            })
            .await?;
        settlement_response(detail, SettlementOutcome::default())
    }

    pub async fn record_payment(
        &self,
        actor: &AuthActor,
        case_id: Uuid,
        request: RecordPaymentRequest,
    ) -> AppResult<SettlementResponse> {
        let reference = request.payment_reference.trim().to_string();
        if reference.is_empty() {
            return Err(AppError::Validation(
                "payment_reference cannot be blank".to_string(),
            ));
        }

        let now = Utc::now();
        let payment_date: NaiveDate = request.payment_date.unwrap_or_else(|| now.date_naive());
        let ((), detail) = self
            .mutate(actor.company_id, case_id, |detail| {
                ExitCaseStateMachine::record_payment(detail, reference, payment_date, now)
            })
            .await?;
        settlement_response(detail, SettlementOutcome::default())
    }

    // ─── Reporting ────────────────────────────────────────────────────────────

    pub async fn stats(&self, actor: &AuthActor) -> AppResult<ExitStats> {
        self.repo.stats(actor.company_id).await
    }

    /// Active and probationary employees of the caller's company with no open exit case.
    pub async fn eligible_employees(&self, actor: &AuthActor) -> AppResult<Vec<EmployeeRecord>> {
        let roster = self.directory.current_employees().await?;
        let open: HashSet<Uuid> = self
            .repo
            .open_case_employees(actor.company_id)
            .await?
            .into_iter()
            .collect();

        Ok(eligible(roster, actor.company_id, &open))
    }
}

fn eligible(
    roster: Vec<EmployeeRecord>,
    company_id: Uuid,
    open_cases: &HashSet<Uuid>,
) -> Vec<EmployeeRecord> {
    let mut employees: Vec<EmployeeRecord> = roster
        .into_iter()
        .filter(|e| e.company_id == company_id)
        .filter(|e| e.status.can_initiate_exit())
        .filter(|e| !open_cases.contains(&e.id))
        .collect();
    employees.sort_by(|a, b| a.full_name.cmp(&b.full_name));
    employees
}

fn settlement_response(
    detail: ExitCaseDetail,
    outcome: SettlementOutcome,
) -> AppResult<SettlementResponse> {
    let case_id = detail.case.id;
    let case_status = detail.case.status;
    let settlement = detail
        .final_settlement
        .ok_or(ExitError::SettlementNotFound(case_id))?;
    Ok(SettlementResponse {
        negative_settlement_warning: outcome.negative_settlement_warning || settlement.is_negative,
        settlement,
        case_status,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EmploymentStatus;

    fn employee(name: &str, company_id: Uuid, status: EmploymentStatus) -> EmployeeRecord {
        EmployeeRecord {
            id: Uuid::new_v4(),
            company_id,
            full_name: name.to_string(),
            status,
        }
    }

    #[test]
    fn test_eligible_excludes_open_cases_and_other_companies() {
        let company = Uuid::new_v4();
        let with_case = employee("Zoya Khan", company, EmploymentStatus::Active);
        let free = employee("Arjun Das", company, EmploymentStatus::Active);
        let elsewhere = employee("Bela Roy", Uuid::new_v4(), EmploymentStatus::Active);
        let suspended = employee("Chetan Pal", company, EmploymentStatus::Suspended);

        let open = HashSet::from([with_case.id]);
        let result = eligible(
            vec![with_case, free.clone(), elsewhere, suspended],
            company,
            &open,
        );

        assert_eq!(result.len(), 1);
        assert_eq!(result[0].id, free.id);
    }

    #[test]
    fn test_eligible_is_sorted_by_name() {
        let company = Uuid::new_v4();
        let roster = vec![
            employee("Zoya Khan", company, EmploymentStatus::Active),
            employee("Arjun Das", company, EmploymentStatus::Probation),
        ];
        let names: Vec<_> = eligible(roster, company, &HashSet::new())
            .into_iter()
            .map(|e| e.full_name)
            .collect();
        assert_eq!(names, vec!["Arjun Das", "Zoya Khan"]);
    }
}
