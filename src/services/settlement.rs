// src/services/settlement.rs

use crate::{
    errors::ExitError,
    models::{EmployeeCompensation, SettlementAdjustments},
};
use chrono::{Datelike, NaiveDate};
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;

pub struct SettlementCalculator;

/// Largest figure a `NUMERIC(14, 2)` money column holds.
pub const MAX_AMOUNT: Decimal = dec!(999_999_999_999.99);

/// Largest leave balance a `NUMERIC(8, 2)` column holds.
pub const MAX_LEAVE_DAYS: Decimal = dec!(999_999.99);

/// Everything the calculation needs besides the manual adjustments.
#[derive(Debug, Clone, PartialEq)]
pub struct SettlementInputs {
    pub monthly_basic: Decimal,
    pub days_in_month: u32,
    pub days_worked_in_final_month: u32,
    pub notice_period_days: i32,
    pub notice_served_days: i32,
    pub notice_buyout_days: i32,
    pub gratuity: Decimal,
    pub tds: Decimal,
    pub pf_employee: Decimal,
    /// Recovery amounts on cleared clearance tasks
    pub cleared_recovery_total: Decimal,
}

impl SettlementInputs {
    /// Builds inputs from payroll figures and the final working day.
    pub fn from_compensation(
        compensation: &EmployeeCompensation,
        last_working_day: NaiveDate,
        notice_period_days: i32,
        notice_served_days: i32,
        notice_buyout_days: i32,
        cleared_recovery_total: Decimal,
    ) -> Self {
        let (days_in_month, days_worked_in_final_month) =
            SettlementCalculator::final_month_days(last_working_day);

        Self {
            monthly_basic: compensation.monthly_basic,
            days_in_month,
            days_worked_in_final_month,
            notice_period_days,
            notice_served_days,
            notice_buyout_days,
            gratuity: compensation.gratuity,
            tds: compensation.tds,
            pf_employee: compensation.pf_employee,
            cleared_recovery_total,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SettlementBreakdown {
    pub daily_rate: Decimal,
    pub leave_encashment_days: Decimal,
    pub basic_salary_dues: Decimal,
    pub leave_encashment: Decimal,
    pub bonus_dues: Decimal,
    pub gratuity: Decimal,
    pub reimbursements: Decimal,
    pub other_earnings: Decimal,
    pub total_earnings: Decimal,
    pub notice_recovery: Decimal,
    pub asset_recovery: Decimal,
    pub loan_recovery: Decimal,
    pub advance_recovery: Decimal,
    pub tds: Decimal,
    pub pf_employee: Decimal,
    pub other_deductions: Decimal,
    pub total_deductions: Decimal,
    pub net_payable: Decimal,
}

impl SettlementBreakdown {
    pub fn is_negative(&self) -> bool {
        self.net_payable < Decimal::ZERO
    }
}

impl SettlementCalculator {
    /// Rejects negative or unstorable manual adjustments.
    pub fn validate(adjustments: &SettlementAdjustments) -> Result<(), ExitError> {
        ensure_in_range(
            &[("leave_encashment_days", adjustments.leave_encashment_days)],
            MAX_LEAVE_DAYS,
        )?;
        let fields = [
            ("bonus_dues", adjustments.bonus_dues),
            ("reimbursements", adjustments.reimbursements),
            ("other_earnings", adjustments.other_earnings),
            ("loan_recovery", adjustments.loan_recovery),
            ("advance_recovery", adjustments.advance_recovery),
            ("other_deductions", adjustments.other_deductions),
            (
                "asset_recovery",
                adjustments.asset_recovery.unwrap_or(Decimal::ZERO),
            ),
        ];
        ensure_in_range(&fields, MAX_AMOUNT)
    }

    /// Rejects negative or unstorable figures coming back from payroll.
    pub fn validate_compensation(compensation: &EmployeeCompensation) -> Result<(), ExitError> {
        ensure_in_range(
            &[
                ("monthly_basic", compensation.monthly_basic),
                ("gratuity", compensation.gratuity),
                ("tds", compensation.tds),
                ("pf_employee", compensation.pf_employee),
            ],
            MAX_AMOUNT,
        )
    }

    /// `(days in the month, days worked up to and including the last working day)`
    pub fn final_month_days(last_working_day: NaiveDate) -> (u32, u32) {
        let first = last_working_day.with_day(1).unwrap_or(last_working_day);
        let next_month = first
            .checked_add_months(chrono::Months::new(1))
            .unwrap_or(first);
        let days_in_month = (next_month - first).num_days().max(1) as u32;
        (days_in_month, last_working_day.day())
    }

    /// Unrounded daily basic; zero-length months yield zero.
    pub fn daily_rate(monthly_basic: Decimal, days_in_month: u32) -> Decimal {
        if days_in_month == 0 {
            return Decimal::ZERO;
        }
        monthly_basic / Decimal::from(days_in_month)
    }

    /// Unserved notice not covered by a buyout, charged at the daily rate.
    pub fn notice_recovery(
        notice_period_days: i32,
        notice_served_days: i32,
        notice_buyout_days: i32,
        daily_rate: Decimal,
    ) -> Result<Decimal, ExitError> {
        let shortfall = (i64::from(notice_period_days)
            - i64::from(notice_served_days)
            - i64::from(notice_buyout_days))
        .max(0);
        times("notice_recovery", Decimal::from(shortfall), daily_rate)
    }

    pub fn calculate(
        inputs: &SettlementInputs,
        adjustments: &SettlementAdjustments,
    ) -> Result<SettlementBreakdown, ExitError> {
        Self::validate(adjustments)?;

        let daily_rate = Self::daily_rate(inputs.monthly_basic, inputs.days_in_month);
        let basic_salary_dues = times(
            "basic_salary_dues",
            daily_rate,
            Decimal::from(inputs.days_worked_in_final_month),
        )?;
        let leave_encashment = times(
            "leave_encashment",
            adjustments.leave_encashment_days,
            daily_rate,
        )?;
        let bonus_dues = money(adjustments.bonus_dues);
        let gratuity = money(inputs.gratuity);
        let reimbursements = money(adjustments.reimbursements);
        let other_earnings = money(adjustments.other_earnings);

        let notice_recovery = Self::notice_recovery(
            inputs.notice_period_days,
            inputs.notice_served_days,
            inputs.notice_buyout_days,
            daily_rate,
        )?;
        let asset_recovery = money(
            adjustments
                .asset_recovery
                .unwrap_or(inputs.cleared_recovery_total),
        );
        let loan_recovery = money(adjustments.loan_recovery);
        let advance_recovery = money(adjustments.advance_recovery);
        let tds = money(inputs.tds);
        let pf_employee = money(inputs.pf_employee);
        let other_deductions = money(adjustments.other_deductions);

        ensure_in_range(&[("asset_recovery", asset_recovery)], MAX_AMOUNT)?;

        let total_earnings = total(
            "total_earnings",
            &[
                basic_salary_dues,
                leave_encashment,
                bonus_dues,
                gratuity,
                reimbursements,
                other_earnings,
            ],
        )?;
        let total_deductions = total(
            "total_deductions",
            &[
                notice_recovery,
                asset_recovery,
                loan_recovery,
                advance_recovery,
                tds,
                pf_employee,
                other_deductions,
            ],
        )?;

        // Negative net is a legitimate outcome; callers flag it instead of clamping.
        // Both totals are bounded, so the difference always fits.
        let net_payable = total_earnings - total_deductions;

        Ok(SettlementBreakdown {
            daily_rate: money(daily_rate),
            leave_encashment_days: adjustments.leave_encashment_days,
            basic_salary_dues,
            leave_encashment,
            bonus_dues,
            gratuity,
            reimbursements,
            other_earnings,
            total_earnings,
            notice_recovery,
            asset_recovery,
            loan_recovery,
            advance_recovery,
            tds,
            pf_employee,
            other_deductions,
            total_deductions,
            net_payable,
        })
    }
}

fn ensure_in_range(fields: &[(&'static str, Decimal)], max: Decimal) -> Result<(), ExitError> {
    match fields
        .iter()
        .find(|(_, value)| *value < dec!(0) || *value > max)
    {
        Some(&(field, value)) => Err(ExitError::InvalidAmount { field, value }),
        None => Ok(()),
    }
}

// Rounded product that must fit a money column.
fn times(field: &'static str, lhs: Decimal, rhs: Decimal) -> Result<Decimal, ExitError> {
    let product = lhs
        .checked_mul(rhs)
        .map(money)
        .ok_or(ExitError::InvalidAmount { field, value: lhs })?;
    ensure_in_range(&[(field, product)], MAX_AMOUNT)?;
    Ok(product)
}

// Sum that must fit a money column.
fn total(field: &'static str, parts: &[Decimal]) -> Result<Decimal, ExitError> {
    let sum = parts
        .iter()
        .try_fold(Decimal::ZERO, |acc, part| acc.checked_add(*part))
        .ok_or(ExitError::InvalidAmount {
            field,
            value: MAX_AMOUNT,
        })?;
    ensure_in_range(&[(field, sum)], MAX_AMOUNT)?;
    Ok(sum)
}

fn money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}
