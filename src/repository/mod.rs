// src/repository/mod.rs

use crate::{
    errors::{AppResult, ExitError},
    models::{ClearanceTask, ExitCase, ExitCaseDetail, ExitCaseStatus, ExitStats, FinalSettlement},
};
use sqlx::{PgConnection, PgPool, Postgres, Transaction};
use uuid::Uuid;

/// Persistence for the exit case aggregate.
///
/// Mutations run inside a transaction that holds a row lock on the case
/// (`SELECT ... FOR UPDATE`), so concurrent writers on one case are serialized.
#[derive(Debug, Clone)]
pub struct ExitCaseRepository {
    pool: PgPool,
}

impl ExitCaseRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn begin(&self) -> Result<Transaction<'static, Postgres>, sqlx::Error> {
        self.pool.begin().await
    }

    // ─── Reads ────────────────────────────────────────────────────────────────

    pub async fn find_detail(&self, company_id: Uuid, case_id: Uuid) -> AppResult<ExitCaseDetail> {
        let mut conn = self.pool.acquire().await?;
        Self::load_detail(&mut conn, company_id, case_id, false).await
    }

    pub async fn list(
        &self,
        company_id: Uuid,
        status: Option<ExitCaseStatus>,
        page: i64,
        limit: i64,
    ) -> AppResult<(Vec<ExitCase>, i64)> {
        let cases = sqlx::query_as::<_, ExitCase>(
            r#"SELECT * FROM exit_cases
               WHERE company_id = $1
                 AND ($2::exit_case_status IS NULL OR status = $2)
               ORDER BY created_at DESC
               LIMIT $3 OFFSET $4"#,
        )
        .bind(company_id)
        .bind(status)
        .bind(limit)
        .bind((page - 1) * limit)
        .fetch_all(&self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar(
            r#"SELECT COUNT(*) FROM exit_cases
               WHERE company_id = $1
                 AND ($2::exit_case_status IS NULL OR status = $2)"#,
        )
        .bind(company_id)
        .bind(status)
        .fetch_one(&self.pool)
        .await?;

        Ok((cases, total))
    }

    pub async fn stats(&self, company_id: Uuid) -> AppResult<ExitStats> {
        let stats = sqlx::query_as::<_, ExitStats>(
            r#"SELECT
                COUNT(*) AS total,
                COUNT(*) FILTER (WHERE status = 'initiated') AS initiated,
                COUNT(*) FILTER (WHERE status = 'clearance_pending') AS clearance_pending,
                COUNT(*) FILTER (WHERE status = 'clearance_completed') AS clearance_completed,
                COUNT(*) FILTER (WHERE status = 'fnf_pending') AS fnf_pending,
                COUNT(*) FILTER (WHERE status = 'fnf_processed') AS fnf_processed,
                COUNT(*) FILTER (WHERE status = 'completed') AS completed,
                COUNT(*) FILTER (WHERE status = 'cancelled') AS cancelled,
                COUNT(*) FILTER (WHERE created_at >= date_trunc('month', NOW())) AS this_month
               FROM exit_cases
               WHERE company_id = $1"#,
        )
        .bind(company_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(stats)
    }

    pub async fn open_case_employees(&self, company_id: Uuid) -> AppResult<Vec<Uuid>> {
        let ids = sqlx::query_scalar::<_, Uuid>(
            r#"SELECT employee_id FROM exit_cases
               WHERE company_id = $1 AND status NOT IN ('completed', 'cancelled')"#,
        )
        .bind(company_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids)
    }

    /// Case owning a task, scoped to the caller's company.
    pub async fn case_for_task(&self, company_id: Uuid, task_id: Uuid) -> AppResult<Uuid> {
        sqlx::query_scalar::<_, Uuid>(
            r#"SELECT t.exit_case_id
               FROM clearance_tasks t
               JOIN exit_cases c ON c.id = t.exit_case_id
               WHERE t.id = $1 AND c.company_id = $2"#,
        )
        .bind(task_id)
        .bind(company_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| ExitError::TaskNotFound(task_id).into())
    }

    // ─── Transactional ────────────────────────────────────────────────────────

    pub async fn has_open_case(conn: &mut PgConnection, employee_id: Uuid) -> AppResult<bool> {
        let open: bool = sqlx::query_scalar(
            r#"SELECT EXISTS (
                SELECT 1 FROM exit_cases
                WHERE employee_id = $1 AND status NOT IN ('completed', 'cancelled')
               )"#,
        )
        .bind(employee_id)
        .fetch_one(&mut *conn)
        .await?;

        Ok(open)
    }

    /// Loads the case with its tasks (template order) and settlement.
    /// With `lock`, the case row stays locked until the transaction ends.
    pub async fn load_detail(
        conn: &mut PgConnection,
        company_id: Uuid,
        case_id: Uuid,
        lock: bool,
    ) -> AppResult<ExitCaseDetail> {
        let sql = if lock {
            "SELECT * FROM exit_cases WHERE id = $1 AND company_id = $2 FOR UPDATE"
        } else {
            "SELECT * FROM exit_cases WHERE id = $1 AND company_id = $2"
        };
        let case = sqlx::query_as::<_, ExitCase>(sql)
            .bind(case_id)
            .bind(company_id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or(ExitError::CaseNotFound(case_id))?;

        let clearance_tasks = sqlx::query_as::<_, ClearanceTask>(
            "SELECT * FROM clearance_tasks WHERE exit_case_id = $1 ORDER BY sort_order",
        )
        .bind(case_id)
        .fetch_all(&mut *conn)
        .await?;

        let final_settlement = sqlx::query_as::<_, FinalSettlement>(
            "SELECT * FROM final_settlements WHERE exit_case_id = $1",
        )
        .bind(case_id)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(ExitCaseDetail {
            case,
            clearance_tasks,
            final_settlement,
        })
    }

    pub async fn insert_case(conn: &mut PgConnection, case: &ExitCase) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"INSERT INTO exit_cases (
                id, company_id, employee_id, employee_name, exit_type,
                resignation_date, requested_last_working_day, approved_last_working_day,
                actual_last_working_day, reason_category, reason,
                notice_period_days, notice_served_days, notice_buyout_days, notice_recovery_amount,
                status, clearance_progress_percent, tasks_completed, tasks_total,
                eligible_for_rehire, rehire_notes, exit_interview_date, exit_interview_notes,
                notes, initiated_by, approved_by, approved_at,
                cancelled_by, cancelled_at, cancellation_reason, completed_at,
                created_at, updated_at
            ) VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17,
                $18, $19, $20, $21, $22, $23, $24, $25, $26, $27, $28, $29, $30, $31, $32, $33
            )"#,
        )
        .bind(case.id)
        .bind(case.company_id)
        .bind(case.employee_id)
        .bind(&case.employee_name)
        .bind(case.exit_type)
        .bind(case.resignation_date)
        .bind(case.requested_last_working_day)
        .bind(case.approved_last_working_day)
        .bind(case.actual_last_working_day)
        .bind(&case.reason_category)
        .bind(&case.reason)
        .bind(case.notice_period_days)
        .bind(case.notice_served_days)
        .bind(case.notice_buyout_days)
        .bind(case.notice_recovery_amount)
        .bind(case.status)
        .bind(case.clearance_progress_percent)
        .bind(case.tasks_completed)
        .bind(case.tasks_total)
        .bind(case.eligible_for_rehire)
        .bind(&case.rehire_notes)
        .bind(case.exit_interview_date)
        .bind(&case.exit_interview_notes)
        .bind(&case.notes)
        .bind(&case.initiated_by)
        .bind(&case.approved_by)
        .bind(case.approved_at)
        .bind(&case.cancelled_by)
        .bind(case.cancelled_at)
        .bind(&case.cancellation_reason)
        .bind(case.completed_at)
        .bind(case.created_at)
        .bind(case.updated_at)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Writes the whole aggregate back: case row, every task, and the settlement.
    pub async fn save_detail(conn: &mut PgConnection, detail: &ExitCaseDetail) -> AppResult<()> {
        Self::update_case(conn, &detail.case).await?;
        for task in &detail.clearance_tasks {
            Self::upsert_task(conn, task).await?;
        }
        if let Some(settlement) = &detail.final_settlement {
            Self::upsert_settlement(conn, settlement).await?;
        }
        Ok(())
    }

    async fn update_case(conn: &mut PgConnection, case: &ExitCase) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"UPDATE exit_cases SET
                approved_last_working_day = $2,
                actual_last_working_day = $3,
                notice_served_days = $4,
                notice_buyout_days = $5,
                notice_recovery_amount = $6,
                status = $7,
                clearance_progress_percent = $8,
                tasks_completed = $9,
                tasks_total = $10,
                eligible_for_rehire = $11,
                rehire_notes = $12,
                exit_interview_date = $13,
                exit_interview_notes = $14,
                notes = $15,
                approved_by = $16,
                approved_at = $17,
                cancelled_by = $18,
                cancelled_at = $19,
                cancellation_reason = $20,
                completed_at = $21,
                updated_at = $22
               WHERE id = $1"#,
        )
        .bind(case.id)
        .bind(case.approved_last_working_day)
        .bind(case.actual_last_working_day)
        .bind(case.notice_served_days)
        .bind(case.notice_buyout_days)
        .bind(case.notice_recovery_amount)
        .bind(case.status)
        .bind(case.clearance_progress_percent)
        .bind(case.tasks_completed)
        .bind(case.tasks_total)
        .bind(case.eligible_for_rehire)
        .bind(&case.rehire_notes)
        .bind(case.exit_interview_date)
        .bind(&case.exit_interview_notes)
        .bind(&case.notes)
        .bind(&case.approved_by)
        .bind(case.approved_at)
        .bind(&case.cancelled_by)
        .bind(case.cancelled_at)
        .bind(&case.cancellation_reason)
        .bind(case.completed_at)
        .bind(case.updated_at)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    async fn upsert_task(conn: &mut PgConnection, task: &ClearanceTask) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"INSERT INTO clearance_tasks (
                id, exit_case_id, department, task_name, description, status, sort_order,
                assigned_role, assigned_to, due_date, completed_date, recovery_amount, notes,
                created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            ON CONFLICT (id) DO UPDATE SET
                status = EXCLUDED.status,
                assigned_to = EXCLUDED.assigned_to,
                completed_date = EXCLUDED.completed_date,
                recovery_amount = EXCLUDED.recovery_amount,
                notes = EXCLUDED.notes,
                updated_at = EXCLUDED.updated_at"#,
        )
        .bind(task.id)
        .bind(task.exit_case_id)
        .bind(task.department)
        .bind(&task.task_name)
        .bind(&task.description)
        .bind(task.status)
        .bind(task.sort_order)
        .bind(&task.assigned_role)
        .bind(&task.assigned_to)
        .bind(task.due_date)
        .bind(task.completed_date)
        .bind(task.recovery_amount)
        .bind(&task.notes)
        .bind(task.created_at)
        .bind(task.updated_at)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    async fn upsert_settlement(
        conn: &mut PgConnection,
        s: &FinalSettlement,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"INSERT INTO final_settlements (
                id, exit_case_id, leave_encashment_days,
                basic_salary_dues, leave_encashment, bonus_dues, gratuity, reimbursements,
                other_earnings, total_earnings,
                notice_recovery, asset_recovery, loan_recovery, advance_recovery, tds,
                pf_employee, other_deductions, total_deductions, net_payable, is_negative,
                status, calculation_date, approved_date, processed_date, payment_date,
                payment_reference, notes, created_at, updated_at
            ) VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15,
                $16, $17, $18, $19, $20, $21, $22, $23, $24, $25, $26, $27, $28, $29
            )
            ON CONFLICT (exit_case_id) DO UPDATE SET
                leave_encashment_days = EXCLUDED.leave_encashment_days,
                basic_salary_dues = EXCLUDED.basic_salary_dues,
                leave_encashment = EXCLUDED.leave_encashment,
                bonus_dues = EXCLUDED.bonus_dues,
                gratuity = EXCLUDED.gratuity,
                reimbursements = EXCLUDED.reimbursements,
                other_earnings = EXCLUDED.other_earnings,
                total_earnings = EXCLUDED.total_earnings,
                notice_recovery = EXCLUDED.notice_recovery,
                asset_recovery = EXCLUDED.asset_recovery,
                loan_recovery = EXCLUDED.loan_recovery,
                advance_recovery = EXCLUDED.advance_recovery,
                tds = EXCLUDED.tds,
                pf_employee = EXCLUDED.pf_employee,
                other_deductions = EXCLUDED.other_deductions,
                total_deductions = EXCLUDED.total_deductions,
                net_payable = EXCLUDED.net_payable,
                is_negative = EXCLUDED.is_negative,
                status = EXCLUDED.status,
                calculation_date = EXCLUDED.calculation_date,
                approved_date = EXCLUDED.approved_date,
                processed_date = EXCLUDED.processed_date,
                payment_date = EXCLUDED.payment_date,
                payment_reference = EXCLUDED.payment_reference,
                notes = EXCLUDED.notes,
                updated_at = EXCLUDED.updated_at"#,
        )
        .bind(s.id)
        .bind(s.exit_case_id)
        .bind(s.leave_encashment_days)
        .bind(s.basic_salary_dues)
        .bind(s.leave_encashment)
        .bind(s.bonus_dues)
        .bind(s.gratuity)
        .bind(s.reimbursements)
        .bind(s.other_earnings)
        .bind(s.total_earnings)
        .bind(s.notice_recovery)
        .bind(s.asset_recovery)
        .bind(s.loan_recovery)
        .bind(s.advance_recovery)
        .bind(s.tds)
        .bind(s.pf_employee)
        .bind(s.other_deductions)
        .bind(s.total_deductions)
        .bind(s.net_payable)
        .bind(s.is_negative)
        .bind(s.status)
        .bind(s.calculation_date)
        .bind(s.approved_date)
        .bind(s.processed_date)
        .bind(s.payment_date)
        .bind(&s.payment_reference)
        .bind(&s.notes)
        .bind(s.created_at)
        .bind(s.updated_at)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }
}
