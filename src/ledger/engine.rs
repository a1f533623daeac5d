//! Core accrual engine for monthly restatement ledgers

use super::accrual::{AccrualInterval, InterestRegime};
use super::rows::{LedgerResult, LedgerRow};
use super::state::AccrualState;
use crate::calendar::{add_one_month, MonthKey};
use crate::case::{CaseConfig, OverrideTable, RetpBasis, RowOverride};
use crate::tables::ReferenceTables;
use chrono::NaiveDate;

/// Months between seniority steps
pub const SENIORITY_STEP_MONTHS: usize = 60;

/// Percentage points added at each seniority step
pub const SENIORITY_STEP_PCT: f64 = 5.0;

/// Values fixed for the whole run
struct RunContext<'a> {
    case: &'a CaseConfig,
    overrides: &'a OverrideTable,
    /// Correction index of the limit month, shared by every row
    limit_index: f64,
    savings: InterestRegime<'a>,
    treasury: InterestRegime<'a>,
}

/// Main restatement engine
pub struct AccrualEngine<'a> {
    tables: &'a ReferenceTables,
}

impl<'a> AccrualEngine<'a> {
    /// Create an engine reading from the given reference tables
    pub fn new(tables: &'a ReferenceTables) -> Self {
        Self { tables }
    }

    /// Compute the full ledger for a case. Every call recomputes from
    /// scratch; an empty ledger is returned when start is after end.
    pub fn restate(&self, case: &CaseConfig, overrides: &OverrideTable) -> LedgerResult {
        let ctx = RunContext {
            case,
            overrides,
            limit_index: self
                .tables
                .correction
                .index_for_opt(case.correction_limit.map(MonthKey::from_date)),
            savings: InterestRegime::new(
                AccrualInterval::UntilBoundary { end: case.savings_limit },
                &self.tables.savings,
            ),
            treasury: InterestRegime::new(
                AccrualInterval::FlooredStart {
                    floor: case.treasury_start,
                    end: case.correction_limit,
                },
                &self.tables.treasury,
            ),
        };

        let mut result = LedgerResult::new();
        let mut state = AccrualState::new();

        let last = case.last_month();
        let mut date = case.first_month();

        while date <= last {
            let next = add_one_month(date);
            let is_last_row = next > last;

            let row = self.calculate_month(&ctx, &mut state, date, is_last_row);
            result.add_row(row);
            state.advance_row();

            if next == date {
                break;
            }
            date = next;
        }

        log::debug!(
            "restated {} months {}..{}: total {:.2}",
            result.len(),
            case.first_month(),
            last,
            result.totals.total
        );

        result
    }

    /// Calculate every column of one month
    fn calculate_month(
        &self,
        ctx: &RunContext<'_>,
        state: &mut AccrualState,
        date: NaiveDate,
        is_last_row: bool,
    ) -> LedgerRow {
        let mut row = LedgerRow::new(state.row_index as u32 + 1, date);

        let overrides = ctx.overrides.get(state.row_index).copied().unwrap_or_default();
        self.calculate_components(ctx.case, &overrides, state.row_index, date, &mut row);

        self.apply_correction(ctx, &mut row);

        self.calculate_benefits(ctx.case, state, is_last_row, &mut row);

        row.subtotal = row.corrected_value
            + row.vacation
            + row.vacation_third
            + row.thirteenth
            + row.long_service_leave;

        let savings = ctx.savings.accrue(date, row.subtotal);
        row.savings_factor = savings.factor;
        row.savings_interest = savings.interest;
        row.subtotal_after_savings = savings.total;

        let treasury = ctx.treasury.accrue(date, row.subtotal_after_savings);
        row.treasury_factor = treasury.factor;
        row.treasury_interest = treasury.interest;
        row.subtotal_after_treasury = treasury.total;

        self.apply_rates(ctx.case, &mut row);

        row
    }

    /// Component values with overrides applied. Dependent values are derived
    /// from the overridden inputs unless they are overridden themselves.
    fn calculate_components(
        &self,
        case: &CaseConfig,
        overrides: &RowOverride,
        row_index: usize,
        date: NaiveDate,
        row: &mut LedgerRow,
    ) {
        let toggles = &case.toggles;

        row.base = overrides
            .base
            .unwrap_or(if toggles.base_pay { case.base_value } else { 0.0 });

        row.allowance = overrides.allowance.unwrap_or_else(|| {
            if !toggles.allowance {
                return 0.0;
            }
            let value = self.tables.allowance.value_on(date);
            if toggles.halve_allowance {
                value / 2.0
            } else {
                value
            }
        });

        row.floor = overrides
            .floor
            .unwrap_or(if toggles.floor_pay { case.floor_value } else { 0.0 });

        row.retp = overrides.retp.unwrap_or(if toggles.retp {
            match case.retp_basis {
                RetpBasis::Base => row.base,
                RetpBasis::Allowance => row.allowance,
                RetpBasis::Floor => row.floor,
            }
        } else {
            0.0
        });

        let pay_base = row.base + row.allowance + row.floor;

        // Steps up every 60 months from the start of the range
        row.seniority_pct = overrides.seniority_pct.unwrap_or(if toggles.seniority {
            let steps = (row_index / SENIORITY_STEP_MONTHS) as f64;
            case.initial_seniority_pct + SENIORITY_STEP_PCT * steps
        } else {
            0.0
        });

        row.seniority_value = overrides.seniority_value.unwrap_or(if toggles.seniority {
            pay_base * row.seniority_pct / 100.0
        } else {
            0.0
        });

        row.one_sixth = overrides.one_sixth.unwrap_or(if toggles.one_sixth {
            (pay_base + row.seniority_value) / 6.0
        } else {
            0.0
        });

        row.sub_base = row.base
            + row.allowance
            + row.floor
            + row.seniority_value
            + row.one_sixth
            + row.retp;
    }

    /// Restate the sub-base to the limit month's index
    fn apply_correction(&self, ctx: &RunContext<'_>, row: &mut LedgerRow) {
        row.correction_index = self.tables.correction.index_for(row.month);

        row.corrected_value = if row.correction_index != 0.0 {
            row.sub_base / row.correction_index * ctx.limit_index
        } else {
            log::warn!("correction index for {} is zero; value left uncorrected", row.month);
            row.sub_base
        };
    }

    /// Vacation, vacation third, thirteenth salary, and long-service leave
    fn calculate_benefits(
        &self,
        case: &CaseConfig,
        state: &mut AccrualState,
        is_last_row: bool,
        row: &mut LedgerRow,
    ) {
        let toggles = &case.toggles;

        if let Some(months) = state.accrue_vacation(toggles.any_periodic_benefit(), is_last_row) {
            let proportional = row.corrected_value / 12.0 * months as f64;
            if toggles.vacation {
                row.vacation = proportional;
            }
            if toggles.vacation_third {
                row.vacation_third = proportional / 3.0;
            }
            if toggles.thirteenth {
                row.thirteenth = proportional;
            }
        }

        let leave = state.accrue_leave(toggles.long_service_leave, is_last_row);
        row.long_service_leave = row.corrected_value * leave.multiplier();
    }

    /// Percentage deduction and additions over the post-interest subtotal
    fn apply_rates(&self, case: &CaseConfig, row: &mut LedgerRow) {
        let base = row.subtotal_after_treasury;

        row.deduction = base * (case.deduction_rate / 100.0) * -1.0;
        row.addition_1 = base * (case.addition_rate_1 / 100.0);
        row.addition_2 = base * (case.addition_rate_2 / 100.0);

        row.total = base + row.deduction + row.addition_1 + row.addition_2;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::case::{ComponentToggles, EditScope, OverrideField};
    use crate::tables::{AllowanceSchedule, CorrectionIndexTable, FactorSeries};
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn key(s: &str) -> MonthKey {
        s.parse().unwrap()
    }

    /// Correction index rising 1% a month from 100 in 2015-01, through 2024-12
    fn test_tables() -> ReferenceTables {
        let mut correction = CorrectionIndexTable::new();
        let mut month = key("2015-01");
        let mut index = 100.0;
        while month <= key("2024-12") {
            correction.insert(month, index);
            index *= 1.01;
            month = month.next();
        }

        let allowance =
            AllowanceSchedule::from_entries([(date(2015, 1, 1), 200.0), (date(2020, 2, 1), 300.0)]);

        let savings = FactorSeries::from_entries(
            (1..=12).map(|m| (date(2020, m, 1), 0.005)),
        );
        let treasury = FactorSeries::from_entries(
            (1..=12).map(|m| (date(2021, m, 1), 0.01)),
        );

        ReferenceTables::new(correction, allowance, savings, treasury)
    }

    /// Correction table with the same index every month
    fn flat_tables() -> ReferenceTables {
        let mut correction = CorrectionIndexTable::new();
        let mut month = key("2015-01");
        while month <= key("2024-12") {
            correction.insert(month, 2.0);
            month = month.next();
        }
        ReferenceTables::new(
            correction,
            AllowanceSchedule::default(),
            FactorSeries::default(),
            FactorSeries::default(),
        )
    }

    fn base_case(start: NaiveDate, end: NaiveDate) -> CaseConfig {
        CaseConfig {
            toggles: ComponentToggles::base_only(),
            base_value: 1000.0,
            correction_limit: Some(date(2024, 5, 1)),
            ..CaseConfig::new(start, end)
        }
    }

    #[test]
    fn test_base_only_three_months() {
        let mut tables = test_tables();
        tables.treasury = FactorSeries::default();
        let engine = AccrualEngine::new(&tables);
        let case = base_case(date(2020, 1, 1), date(2020, 3, 1));

        let result = engine.restate(&case, &OverrideTable::new());
        assert_eq!(result.rows.len(), 3);

        let limit = tables.correction.index_for(key("2024-05"));
        for (i, row) in result.rows.iter().enumerate() {
            assert_eq!(row.sequence, i as u32 + 1);
            let expected = 1000.0 * limit / tables.correction.index_for(row.month);
            assert_relative_eq!(row.corrected_value, expected, max_relative = 1e-12);
            assert_eq!(row.total, row.corrected_value);
        }

        let sum: f64 = result.rows.iter().map(|r| r.total).sum();
        assert_eq!(result.totals.total, sum);
    }

    #[test]
    fn test_row_count_and_month_keys() {
        let tables = test_tables();
        let engine = AccrualEngine::new(&tables);
        let case = base_case(date(2019, 11, 20), date(2021, 2, 3));

        let result = engine.restate(&case, &OverrideTable::new());
        assert_eq!(result.rows.len(), case.row_count());
        assert_eq!(result.rows.len(), 16);
        assert_eq!(result.rows[0].date, date(2019, 11, 1));
        for pair in result.rows.windows(2) {
            assert_eq!(pair[0].month.next(), pair[1].month);
        }
    }

    #[test]
    fn test_inverted_range_is_empty() {
        let tables = test_tables();
        let engine = AccrualEngine::new(&tables);
        let case = base_case(date(2020, 3, 1), date(2020, 1, 1));

        let result = engine.restate(&case, &OverrideTable::new());
        assert!(result.is_empty());
        assert_eq!(result.totals, Default::default());
    }

    #[test]
    fn test_totals_equal_column_sums() {
        let tables = test_tables();
        let engine = AccrualEngine::new(&tables);
        let case = CaseConfig {
            toggles: ComponentToggles::all(),
            base_value: 1000.0,
            floor_value: 400.0,
            initial_seniority_pct: 10.0,
            deduction_rate: 11.0,
            addition_rate_1: 10.0,
            addition_rate_2: 2.5,
            correction_limit: Some(date(2024, 5, 1)),
            savings_limit: Some(date(2020, 12, 1)),
            treasury_start: Some(date(2021, 1, 1)),
            ..CaseConfig::new(date(2019, 6, 1), date(2021, 8, 1))
        };

        let result = engine.restate(&case, &OverrideTable::new());
        let rows = &result.rows;
        let t = &result.totals;

        assert_eq!(t.sub_base, rows.iter().map(|r| r.sub_base).sum::<f64>());
        assert_eq!(t.vacation, rows.iter().map(|r| r.vacation).sum::<f64>());
        assert_eq!(t.savings_interest, rows.iter().map(|r| r.savings_interest).sum::<f64>());
        assert_eq!(t.treasury_factor, rows.iter().map(|r| r.treasury_factor).sum::<f64>());
        assert_eq!(t.deduction, rows.iter().map(|r| r.deduction).sum::<f64>());
        assert_eq!(t.total, rows.iter().map(|r| r.total).sum::<f64>());
        assert!(rows.iter().all(|r| r.deduction <= 0.0));
    }

    #[test]
    fn test_component_composition() {
        let tables = test_tables();
        let engine = AccrualEngine::new(&tables);
        let case = CaseConfig {
            toggles: ComponentToggles {
                base_pay: true,
                allowance: true,
                halve_allowance: true,
                floor_pay: true,
                seniority: true,
                one_sixth: true,
                retp: true,
                ..Default::default()
            },
            retp_basis: RetpBasis::Floor,
            base_value: 1000.0,
            floor_value: 500.0,
            initial_seniority_pct: 10.0,
            ..CaseConfig::new(date(2020, 1, 1), date(2020, 2, 1))
        };

        let result = engine.restate(&case, &OverrideTable::new());
        let jan = &result.rows[0];
        assert_eq!(jan.allowance, 100.0);
        assert_eq!(jan.retp, 500.0);
        assert_relative_eq!(jan.seniority_value, 160.0, epsilon = 1e-9);
        assert_relative_eq!(jan.one_sixth, 1760.0 / 6.0, epsilon = 1e-9);
        let expected_sub_base = 1000.0 + 100.0 + 500.0 + 160.0 + 1760.0 / 6.0 + 500.0;
        assert_relative_eq!(jan.sub_base, expected_sub_base, epsilon = 1e-9);

        // New allowance takes effect in February
        assert_eq!(result.rows[1].allowance, 150.0);
    }

    #[test]
    fn test_seniority_steps_every_60_months() {
        let tables = test_tables();
        let engine = AccrualEngine::new(&tables);
        let case = CaseConfig {
            toggles: ComponentToggles { base_pay: true, seniority: true, ..Default::default() },
            base_value: 1000.0,
            initial_seniority_pct: 5.0,
            ..CaseConfig::new(date(2015, 1, 1), date(2024, 12, 1))
        };

        let result = engine.restate(&case, &OverrideTable::new());
        assert_eq!(result.rows[59].seniority_pct, 5.0);
        assert_eq!(result.rows[60].seniority_pct, 10.0);
        assert_eq!(result.rows[119].seniority_pct, 10.0);
        assert_relative_eq!(result.rows[60].seniority_value, 100.0, epsilon = 1e-9);
    }

    #[test]
    fn test_vacation_prorated_on_short_range() {
        let tables = flat_tables();
        let engine = AccrualEngine::new(&tables);
        let case = CaseConfig {
            toggles: ComponentToggles {
                base_pay: true,
                vacation: true,
                vacation_third: true,
                thirteenth: true,
                ..Default::default()
            },
            ..base_case(date(2020, 1, 1), date(2020, 5, 1))
        };

        let result = engine.restate(&case, &OverrideTable::new());
        for row in &result.rows[..4] {
            assert_eq!(row.vacation, 0.0);
            assert_eq!(row.vacation_third, 0.0);
            assert_eq!(row.thirteenth, 0.0);
        }

        let last = &result.rows[4];
        assert_relative_eq!(last.vacation, last.corrected_value / 12.0 * 5.0, epsilon = 1e-9);
        assert_relative_eq!(last.vacation_third, last.vacation / 3.0, epsilon = 1e-9);
        assert_eq!(last.thirteenth, last.vacation);
    }

    #[test]
    fn test_vacation_every_twelve_months() {
        let tables = flat_tables();
        let engine = AccrualEngine::new(&tables);
        let case = CaseConfig {
            toggles: ComponentToggles { base_pay: true, vacation: true, ..Default::default() },
            ..base_case(date(2020, 1, 1), date(2021, 12, 1))
        };

        let result = engine.restate(&case, &OverrideTable::new());
        let paid: Vec<usize> = result
            .rows
            .iter()
            .enumerate()
            .filter(|(_, r)| r.vacation != 0.0)
            .map(|(i, _)| i)
            .collect();
        assert_eq!(paid, vec![11, 23]);
        let december = &result.rows[11];
        assert_relative_eq!(december.vacation, december.corrected_value, epsilon = 1e-9);
    }

    #[test]
    fn test_long_service_leave_sixty_months() {
        let tables = flat_tables();
        let engine = AccrualEngine::new(&tables);
        let case = CaseConfig {
            toggles: ComponentToggles {
                base_pay: true,
                long_service_leave: true,
                ..Default::default()
            },
            ..base_case(date(2015, 1, 1), date(2019, 12, 1))
        };

        let result = engine.restate(&case, &OverrideTable::new());
        assert_eq!(result.rows.len(), 60);

        for row in &result.rows[..59] {
            assert_eq!(row.long_service_leave, 0.0);
        }
        let last = &result.rows[59];
        assert_eq!(last.long_service_leave, last.corrected_value * 3.0);
    }

    #[test]
    fn test_long_service_leave_prorated() {
        let tables = flat_tables();
        let engine = AccrualEngine::new(&tables);
        let case = CaseConfig {
            toggles: ComponentToggles {
                base_pay: true,
                long_service_leave: true,
                ..Default::default()
            },
            ..base_case(date(2015, 1, 1), date(2016, 4, 1))
        };

        let result = engine.restate(&case, &OverrideTable::new());
        let last = result.rows.last().unwrap();
        assert_eq!(result.rows.len(), 16);
        let expected = last.corrected_value * 16.0 / 20.0;
        assert_relative_eq!(last.long_service_leave, expected, epsilon = 1e-9);
    }

    #[test]
    fn test_override_base_affects_only_that_row() {
        let tables = test_tables();
        let engine = AccrualEngine::new(&tables);
        let case = CaseConfig {
            toggles: ComponentToggles {
                base_pay: true,
                seniority: true,
                one_sixth: true,
                ..Default::default()
            },
            initial_seniority_pct: 10.0,
            deduction_rate: 11.0,
            ..base_case(date(2020, 1, 1), date(2020, 6, 1))
        };

        let plain = engine.restate(&case, &OverrideTable::new());
        let overrides = OverrideTable::new().with_edit(
            2,
            OverrideField::Base,
            2000.0,
            EditScope::One,
            plain.len(),
        );
        let edited = engine.restate(&case, &overrides);

        for i in [0, 1, 3, 4, 5] {
            assert_eq!(plain.rows[i], edited.rows[i]);
        }

        let before = &plain.rows[2];
        let after = &edited.rows[2];
        assert_eq!(after.base, 2000.0);
        // Dependents follow the overridden base
        assert_relative_eq!(after.seniority_value, 200.0, epsilon = 1e-9);
        assert_relative_eq!(after.one_sixth, 2200.0 / 6.0, epsilon = 1e-9);
        assert_relative_eq!(after.sub_base / before.sub_base, 2.0, max_relative = 1e-12);
        let corrected_ratio = after.corrected_value / before.corrected_value;
        assert_relative_eq!(corrected_ratio, 2.0, max_relative = 1e-12);
        assert_relative_eq!(after.total / before.total, 2.0, max_relative = 1e-12);
    }

    #[test]
    fn test_overridden_dependent_is_taken_verbatim() {
        let tables = test_tables();
        let engine = AccrualEngine::new(&tables);
        let case = CaseConfig {
            toggles: ComponentToggles { base_pay: true, seniority: true, ..Default::default() },
            initial_seniority_pct: 10.0,
            ..base_case(date(2020, 1, 1), date(2020, 1, 1))
        };

        let mut overrides = OverrideTable::new();
        overrides.apply_edit(0, OverrideField::Base, 3000.0, EditScope::One, 1);
        overrides.apply_edit(0, OverrideField::SeniorityValue, 42.0, EditScope::One, 1);

        let row = &engine.restate(&case, &overrides).rows[0];
        assert_eq!(row.seniority_value, 42.0);
        assert_eq!(row.sub_base, 3042.0);
    }

    #[test]
    fn test_interest_regimes_in_sequence() {
        let mut tables = flat_tables();
        tables.savings = FactorSeries::from_entries((1..=12).map(|m| (date(2020, m, 1), 0.01)));
        tables.treasury = FactorSeries::from_entries((1..=12).map(|m| (date(2021, m, 1), 0.02)));

        let engine = AccrualEngine::new(&tables);
        let case = CaseConfig {
            savings_limit: Some(date(2020, 12, 1)),
            treasury_start: Some(date(2021, 1, 1)),
            correction_limit: Some(date(2021, 6, 1)),
            ..base_case(date(2020, 10, 1), date(2021, 3, 1))
        };

        let result = engine.restate(&case, &OverrideTable::new());

        // October 2020: savings Oct..Dec, treasury Jan..Jun 2021
        let oct = &result.rows[0];
        assert_abs_diff_eq!(oct.savings_factor, 0.03, epsilon = 1e-12);
        assert_abs_diff_eq!(oct.treasury_factor, 0.12, epsilon = 1e-12);
        assert_relative_eq!(oct.subtotal_after_savings, 1000.0 * 1.03, epsilon = 1e-9);
        assert_relative_eq!(oct.subtotal_after_treasury, 1000.0 * 1.03 * 1.12, epsilon = 1e-9);

        // February 2021: past the savings boundary, treasury Feb..Jun
        let feb = &result.rows[4];
        assert_eq!(feb.savings_factor, 0.0);
        assert_abs_diff_eq!(feb.treasury_factor, 0.10, epsilon = 1e-12);
    }

    #[test]
    fn test_deductions_and_additions() {
        let tables = flat_tables();
        let engine = AccrualEngine::new(&tables);
        let case = CaseConfig {
            deduction_rate: 10.0,
            addition_rate_1: 20.0,
            addition_rate_2: 5.0,
            ..base_case(date(2020, 1, 1), date(2020, 1, 1))
        };

        let row = &engine.restate(&case, &OverrideTable::new()).rows[0];
        assert_relative_eq!(row.deduction, -100.0, epsilon = 1e-9);
        assert_relative_eq!(row.addition_1, 200.0, epsilon = 1e-9);
        assert_relative_eq!(row.addition_2, 50.0, epsilon = 1e-9);
        assert_relative_eq!(row.total, 1150.0, epsilon = 1e-9);
    }

    #[test]
    fn test_missing_limit_date_is_neutral() {
        let tables = flat_tables();
        let engine = AccrualEngine::new(&tables);
        let case = CaseConfig {
            correction_limit: None,
            ..base_case(date(2020, 1, 1), date(2020, 1, 1))
        };

        let row = &engine.restate(&case, &OverrideTable::new()).rows[0];
        // index 2.0 for the month, neutral 1.0 for the missing limit
        assert_eq!(row.corrected_value, 500.0);
        assert_eq!(row.treasury_factor, 0.0);
    }
}
