//! Counters carried from one ledger row to the next

/// Months of accrual that trigger a vacation / thirteenth-salary payout
pub const VACATION_CYCLE_MONTHS: u32 = 12;

/// Months of accrual that trigger a long-service leave payout
pub const LEAVE_CYCLE_MONTHS: u32 = 60;

/// Monthly values paid out per completed long-service leave cycle
pub const LEAVE_MONTHS_PER_CYCLE: f64 = 3.0;

/// Outcome of the long-service leave counter for one row
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LeaveAccrual {
    /// Nothing paid this row
    None,
    /// A full cycle completed
    FullCycle,
    /// The ledger ended mid-cycle after this many months
    Prorated(u32),
}

impl LeaveAccrual {
    /// Multiplier applied to the corrected value
    pub fn multiplier(&self) -> f64 {
        match self {
            LeaveAccrual::None => 0.0,
            LeaveAccrual::FullCycle => LEAVE_MONTHS_PER_CYCLE,
            LeaveAccrual::Prorated(months) => {
                // One month of pay per 20 accrued months
                *months as f64 / (LEAVE_CYCLE_MONTHS as f64 / LEAVE_MONTHS_PER_CYCLE)
            }
        }
    }
}

/// State of a restatement run between rows
#[derive(Debug, Clone, Default)]
pub struct AccrualState {
    /// 0-based index of the row being computed; also months since range start
    pub row_index: usize,

    /// Months accrued toward the next vacation payout
    pub vacation_months: u32,

    /// Months accrued toward the next long-service leave payout
    pub leave_months: u32,
}

impl AccrualState {
    /// Fresh state for a new run
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one month toward vacation. Returns the months to pay when the
    /// cycle completes or the ledger ends, resetting the counter.
    pub fn accrue_vacation(&mut self, enabled: bool, is_last_row: bool) -> Option<u32> {
        if !enabled {
            return None;
        }

        self.vacation_months += 1;
        if self.vacation_months >= VACATION_CYCLE_MONTHS || is_last_row {
            let months = self.vacation_months;
            self.vacation_months = 0;
            Some(months)
        } else {
            None
        }
    }

    /// Count one month toward long-service leave
    pub fn accrue_leave(&mut self, enabled: bool, is_last_row: bool) -> LeaveAccrual {
        if !enabled {
            return LeaveAccrual::None;
        }

        self.leave_months += 1;
        if self.leave_months >= LEAVE_CYCLE_MONTHS {
            self.leave_months = 0;
            LeaveAccrual::FullCycle
        } else if is_last_row {
            let months = self.leave_months;
            self.leave_months = 0;
            LeaveAccrual::Prorated(months)
        } else {
            LeaveAccrual::None
        }
    }

    /// Move to the next row
    pub fn advance_row(&mut self) {
        self.row_index += 1;
    }
}
