//! Period-by-period payoff simulation with extra payments.
//!
//! A [`Simulator`] owns validated [`LoanTerms`], a start date and a
//! [`PaymentSchedule`]. Each call to [`Simulator::run`] steps a virtual
//! calendar one payment cycle at a time until the balance is cleared.
//! Progress against the schedule (which one-time payments have been
//! applied, how many cycles since each recurring payment) is kept in a
//! ledger local to the run, so a simulator can be run repeatedly, or from
//! several threads, and always gives the same answer.

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, warn};

use crate::amortization::{self, LoanTerms};
use crate::error::LoanPayoffError;
use crate::schedule::{
    parse_date, OneTimePayment, PaymentEvent, PaymentSchedule, RecurringPayment,
};
use crate::types::{with_metadata, ComputationOutput, Money};
use crate::LoanPayoffResult;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Average calendar year length used to space payment cycles.
const DAYS_PER_YEAR: Decimal = dec!(365.25);

/// Balance below which the loan is considered fully paid.
const BALANCE_EPSILON: Decimal = dec!(0.01);

/// Hard stop for the payoff loop.
const MAX_PERIODS: u32 = 100_000;

const MICROS_PER_DAY: Decimal = dec!(86_400_000_000);

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Tunables for the payoff loop. Defaults reproduce standard statement behaviour.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationOptions {
    /// Days in an average year; one cycle is `days_per_year / frequency` days.
    pub days_per_year: Decimal,
    /// The loop stops once the balance falls below this.
    pub balance_epsilon: Money,
    /// Periods simulated before giving up with `NonConvergent`.
    pub max_periods: u32,
}

impl Default for SimulationOptions {
    fn default() -> Self {
        SimulationOptions {
            days_per_year: DAYS_PER_YEAR,
            balance_epsilon: BALANCE_EPSILON,
            max_periods: MAX_PERIODS,
        }
    }
}

impl SimulationOptions {
    pub fn validate(&self) -> LoanPayoffResult<()> {
        if self.days_per_year <= Decimal::ZERO || self.days_per_year > dec!(366) {
            return Err(LoanPayoffError::invalid(
                "days_per_year",
                "Days per year must be in (0, 366]",
            ));
        }
        if self.balance_epsilon <= Decimal::ZERO {
            return Err(LoanPayoffError::invalid(
                "balance_epsilon",
                "Balance epsilon must be positive",
            ));
        }
        if self.max_periods == 0 {
            return Err(LoanPayoffError::invalid(
                "max_periods",
                "Max periods must be greater than zero",
            ));
        }
        Ok(())
    }

    /// Length of one payment cycle, to the microsecond.
    fn cycle(&self, frequency: u32) -> LoanPayoffResult<Duration> {
        let micros = (self.days_per_year * MICROS_PER_DAY / Decimal::from(frequency))
            .round()
            .to_i64()
            .ok_or_else(|| LoanPayoffError::invalid("frequency", "Payment cycle out of range"))?;
        if micros <= 0 {
            return Err(LoanPayoffError::invalid(
                "frequency",
                "Payment cycle is shorter than a microsecond",
            ));
        }
        Ok(Duration::microseconds(micros))
    }
}

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

/// Trajectory of a payoff simulation. Entry 0 is the state at the start date;
/// entry `k` is the state after payment cycle `k`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationResult {
    pub dates: Vec<NaiveDate>,
    pub remaining_principal: Vec<Money>,
    pub cumulative_interest: Vec<Money>,
    pub cumulative_payments: Vec<Money>,
    pub total_interest: Money,
    pub total_payment: Money,
    /// Number of payment cycles simulated.
    pub total_length: u32,
}

impl SimulationResult {
    fn starting(date: NaiveDate, principal: Money) -> Self {
        SimulationResult {
            dates: vec![date],
            remaining_principal: vec![principal],
            cumulative_interest: vec![Decimal::ZERO],
            cumulative_payments: vec![Decimal::ZERO],
            total_interest: Decimal::ZERO,
            total_payment: Decimal::ZERO,
            total_length: 0,
        }
    }

    fn record(
        &mut self,
        date: NaiveDate,
        interest: Money,
        paid: Money,
        remaining: Money,
    ) -> LoanPayoffResult<()> {
        let periods = self.total_length + 1;
        self.total_interest = self
            .total_interest
            .checked_add(interest)
            .ok_or_else(|| non_convergent(periods, remaining))?;
        self.total_payment = self
            .total_payment
            .checked_add(paid)
            .ok_or_else(|| non_convergent(periods, remaining))?;
        self.dates.push(date);
        self.cumulative_interest.push(self.total_interest);
        self.cumulative_payments.push(self.total_payment);
        self.remaining_principal.push(remaining);
        self.total_length = periods;
        Ok(())
    }

    /// Date of the final simulated payment (the start date if nothing was owed).
    pub fn payoff_date(&self) -> Option<NaiveDate> {
        self.dates.last().copied()
    }
}

// ---------------------------------------------------------------------------
// Run-local ledger
// ---------------------------------------------------------------------------

struct OneTimeProgress<'a> {
    payment: &'a OneTimePayment,
    due: NaiveDateTime,
    applied: bool,
}

struct RecurringProgress<'a> {
    payment: &'a RecurringPayment,
    start: NaiveDateTime,
    end: NaiveDateTime,
    cycles_since_applied: u32,
}

impl RecurringProgress<'_> {
    fn is_active(&self, at: NaiveDateTime) -> bool {
        self.start <= at && at <= self.end
    }
}

/// Per-run progress against the schedule, in insertion order.
struct Ledger<'a> {
    one_time: Vec<OneTimeProgress<'a>>,
    recurring: Vec<RecurringProgress<'a>>,
    clamped: u32,
}

impl<'a> Ledger<'a> {
    fn new(schedule: &'a PaymentSchedule, maturity: NaiveDateTime) -> Self {
        let one_time = schedule
            .one_time()
            .map(|payment| OneTimeProgress {
                payment,
                due: midnight(payment.date),
                applied: false,
            })
            .collect();
        let recurring = schedule
            .recurring()
            .map(|payment| RecurringProgress {
                payment,
                start: midnight(payment.start),
                end: payment.end.map(midnight).unwrap_or(maturity),
                // Due on the first eligible cycle.
                cycles_since_applied: payment.period,
            })
            .collect();
        Ledger {
            one_time,
            recurring,
            clamped: 0,
        }
    }

    /// Subtract an extra payment from `remaining`, capped at the balance.
    /// Returns the amount actually applied.
    fn apply(&mut self, remaining: &mut Money, amount: Money) -> Money {
        let applied = amount.min(*remaining);
        if applied < amount {
            self.clamped += 1;
            warn!(
                %amount,
                %applied,
                "extra payment exceeds outstanding balance; capped"
            );
        }
        *remaining -= applied;
        applied
    }

    fn apply_one_time(&mut self, remaining: &mut Money, at: NaiveDateTime) -> Money {
        let mut extra = Decimal::ZERO;
        for i in 0..self.one_time.len() {
            let entry = &self.one_time[i];
            if entry.applied || entry.due >= at {
                continue;
            }
            let amount = entry.payment.amount;
            self.one_time[i].applied = true;
            extra += self.apply(remaining, amount);
        }
        extra
    }

    fn apply_recurring(&mut self, remaining: &mut Money, at: NaiveDateTime) -> Money {
        let mut extra = Decimal::ZERO;
        for i in 0..self.recurring.len() {
            let entry = &mut self.recurring[i];
            if !entry.is_active(at) {
                continue;
            }
            if entry.cycles_since_applied >= entry.payment.period {
                entry.cycles_since_applied = 1;
                let amount = entry.payment.amount;
                extra += self.apply(remaining, amount);
            } else {
                entry.cycles_since_applied += 1;
            }
        }
        extra
    }

    /// Whether any non-zero extra payment can still land after `at`.
    fn has_pending(&self, at: NaiveDateTime) -> bool {
        self.one_time
            .iter()
            .any(|e| !e.applied && !e.payment.amount.is_zero())
            || self
                .recurring
                .iter()
                .any(|e| e.end > at && !e.payment.amount.is_zero())
    }

    fn unapplied_one_time(&self) -> usize {
        self.one_time.iter().filter(|e| !e.applied).count()
    }
}

fn non_convergent(periods: u32, remaining_principal: Money) -> LoanPayoffError {
    LoanPayoffError::NonConvergent {
        periods,
        remaining_principal,
    }
}

fn midnight(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::MIN)
}

// ---------------------------------------------------------------------------
// Simulator
// ---------------------------------------------------------------------------

/// A loan, its start date and its extra payments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Simulator {
    terms: LoanTerms,
    start_date: Option<NaiveDate>,
    schedule: PaymentSchedule,
    options: SimulationOptions,
}

struct RunOutcome {
    result: SimulationResult,
    unapplied_one_time: usize,
    clamped: u32,
}

impl Simulator {
    pub fn new(terms: LoanTerms) -> Self {
        Simulator {
            terms,
            start_date: None,
            schedule: PaymentSchedule::new(),
            options: SimulationOptions::default(),
        }
    }

    /// Build a simulator from a scenario document, deriving whichever of
    /// principal or payment is missing.
    pub fn from_input(input: &ScenarioInput) -> LoanPayoffResult<Self> {
        let terms = match (input.loan.principal(), input.loan.payment()) {
            (Some(_), None) => input.loan.clone().solve_payment()?,
            (None, Some(_)) => input.loan.clone().solve_principal()?,
            _ => input.loan.clone(),
        };

        let mut sim = Simulator::new(terms).with_options(input.options.clone())?;
        sim.start_date = Some(input.start_date);
        for p in &input.one_time_payments {
            let p = OneTimePayment::new(p.amount, p.date)?;
            sim.schedule.push(PaymentEvent::OneTime(p));
        }
        for p in &input.recurring_payments {
            p.validate()?;
            sim.schedule.push(PaymentEvent::Recurring(p.clone()));
        }
        Ok(sim)
    }

    pub fn with_start_date(mut self, date: &str) -> LoanPayoffResult<Self> {
        self.set_start_date(date)?;
        Ok(self)
    }

    pub fn set_start_date(&mut self, date: &str) -> LoanPayoffResult<()> {
        self.start_date = Some(parse_date("start_date", date)?);
        Ok(())
    }

    pub fn with_options(mut self, options: SimulationOptions) -> LoanPayoffResult<Self> {
        options.validate()?;
        self.options = options;
        Ok(self)
    }

    pub fn add_one_time_payment(&mut self, amount: Money, date: &str) -> LoanPayoffResult<()> {
        self.schedule.add_one_time(amount, date)
    }

    /// Add a payment made every `period` cycles from `start`. Without `end`
    /// it runs to [`maturity`](Self::maturity).
    pub fn add_recurring_payment(
        &mut self,
        amount: Money,
        start: &str,
        end: Option<&str>,
        period: u32,
    ) -> LoanPayoffResult<()> {
        self.schedule.add_recurring(amount, start, end, period)
    }

    pub fn terms(&self) -> &LoanTerms {
        &self.terms
    }

    pub fn start_date(&self) -> Option<NaiveDate> {
        self.start_date
    }

    pub fn schedule(&self) -> &PaymentSchedule {
        &self.schedule
    }

    pub fn options(&self) -> &SimulationOptions {
        &self.options
    }

    /// End of the full term on the simulated calendar.
    pub fn maturity(&self) -> LoanPayoffResult<NaiveDateTime> {
        let start = self.start_date.ok_or_else(|| {
            LoanPayoffError::PreconditionFailed("start date must be set".into())
        })?;
        let cycle = self.options.cycle(self.terms.frequency())?;
        maturity_from(midnight(start), cycle, self.terms.n_periods())
    }

    /// Simulate repayment until the balance is cleared.
    pub fn run(&self) -> LoanPayoffResult<SimulationResult> {
        self.run_with_ledger().map(|outcome| outcome.result)
    }

    fn run_with_ledger(&self) -> LoanPayoffResult<RunOutcome> {
        let start_date = self.start_date.ok_or_else(|| {
            LoanPayoffError::PreconditionFailed("start date must be set before running".into())
        })?;
        let principal = self.terms.principal().ok_or_else(|| {
            LoanPayoffError::PreconditionFailed("principal must be set before running".into())
        })?;
        let payment = self.terms.payment().ok_or_else(|| {
            LoanPayoffError::PreconditionFailed("payment must be set before running".into())
        })?;
        self.options.validate()?;

        let frequency = self.terms.frequency();
        let rate = self.terms.rate();
        let epsilon = self.options.balance_epsilon;
        let cycle = self.options.cycle(frequency)?;
        let start = midnight(start_date);
        let maturity = maturity_from(start, cycle, self.terms.n_periods())?;

        debug!(
            %principal,
            %payment,
            %rate,
            frequency,
            extra_payments = self.schedule.len(),
            "starting payoff simulation"
        );

        let mut ledger = Ledger::new(&self.schedule, maturity);
        let mut result = SimulationResult::starting(start_date, principal);
        let mut current = start;
        let mut remaining = principal;

        while remaining >= epsilon {
            if result.total_length >= self.options.max_periods {
                warn!(periods = result.total_length, %remaining, "payoff period cap reached");
                return Err(non_convergent(result.total_length, remaining));
            }

            current = current.checked_add_signed(cycle).ok_or_else(|| {
                LoanPayoffError::invalid("start_date", "Simulated calendar overflowed")
            })?;
            let previous = remaining;

            let mut extra = ledger.apply_one_time(&mut remaining, current);

            let period = result.total_length + 1;
            let interest = amortization::interest(remaining, rate, frequency)?;
            let principal_payment = payment
                .checked_sub(interest)
                .ok_or_else(|| non_convergent(period, remaining))?
                .min(remaining);
            remaining = remaining
                .checked_sub(principal_payment)
                .ok_or_else(|| non_convergent(period, previous))?;

            if remaining >= epsilon {
                extra += ledger.apply_recurring(&mut remaining, current);
            }

            if remaining > principal {
                warn!(
                    periods = period,
                    %remaining,
                    %interest,
                    "payment is below the period's interest; balance is growing past the principal"
                );
                return Err(non_convergent(period, remaining));
            }

            let paid = payment
                .checked_add(extra)
                .ok_or_else(|| non_convergent(period, remaining))?;
            result.record(current.date(), interest, paid, remaining)?;

            if remaining >= epsilon && remaining >= previous && !ledger.has_pending(current) {
                warn!(
                    periods = result.total_length,
                    %remaining,
                    %interest,
                    "payment does not reduce the balance"
                );
                return Err(non_convergent(result.total_length, remaining));
            }
        }

        debug!(
            periods = result.total_length,
            total_interest = %result.total_interest,
            total_payment = %result.total_payment,
            "payoff simulation finished"
        );

        Ok(RunOutcome {
            unapplied_one_time: ledger.unapplied_one_time(),
            clamped: ledger.clamped,
            result,
        })
    }
}

fn maturity_from(start: NaiveDateTime, cycle: Duration, periods: u32) -> LoanPayoffResult<NaiveDateTime> {
    cycle
        .num_microseconds()
        .and_then(|us| us.checked_mul(i64::from(periods)))
        .and_then(|us| start.checked_add_signed(Duration::microseconds(us)))
        .ok_or_else(|| LoanPayoffError::invalid("length", "Loan maturity is out of range"))
}

// ---------------------------------------------------------------------------
// Scenario document
// ---------------------------------------------------------------------------

/// A complete repayment scenario as a typed document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioInput {
    pub loan: LoanTerms,
    pub start_date: NaiveDate,
    #[serde(default)]
    pub one_time_payments: Vec<OneTimePayment>,
    #[serde(default)]
    pub recurring_payments: Vec<RecurringPayment>,
    #[serde(default)]
    pub options: SimulationOptions,
}

/// Run a scenario and wrap the trajectory in the standard output envelope.
pub fn simulate_repayment(
    input: &ScenarioInput,
) -> LoanPayoffResult<ComputationOutput<SimulationResult>> {
    let start = Instant::now();
    let sim = Simulator::from_input(input)?;
    let outcome = sim.run_with_ledger()?;

    let mut warnings: Vec<String> = Vec::new();
    let term = sim.terms().n_periods();
    if outcome.result.total_length > term {
        warnings.push(format!(
            "Payoff took {} periods, beyond the {}-period term; payment is below the level payment",
            outcome.result.total_length, term
        ));
    }
    if outcome.unapplied_one_time > 0 {
        warnings.push(format!(
            "{} one-time payment(s) dated after payoff were never applied",
            outcome.unapplied_one_time
        ));
    }
    if outcome.clamped > 0 {
        warnings.push(format!(
            "{} extra payment(s) exceeded the outstanding balance and were capped",
            outcome.clamped
        ));
    }

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Level-payment amortization with scheduled extra payments",
        input,
        warnings,
        elapsed,
        outcome.result,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn interest_free(principal: Money, payment: Money, length: u32) -> Simulator {
        let terms = LoanTerms::new(1, length, Decimal::ZERO)
            .unwrap()
            .with_principal(principal)
            .unwrap()
            .with_payment(payment)
            .unwrap();
        Simulator::new(terms).with_start_date("2020-01-01").unwrap()
    }

    #[test]
    fn test_interest_free_straight_line() {
        let result = interest_free(dec!(1000), dec!(500), 2).run().unwrap();
        assert_eq!(result.total_length, 2);
        assert_eq!(result.remaining_principal, vec![dec!(1000), dec!(500), dec!(0)]);
        assert_eq!(result.cumulative_payments, vec![dec!(0), dec!(500), dec!(1000)]);
        assert_eq!(result.total_interest, Decimal::ZERO);
    }

    #[test]
    fn test_cycle_spacing_uses_average_year() {
        let result = interest_free(dec!(1000), dec!(500), 2).run().unwrap();
        // 2020 is a leap year: +365.25 days lands on Dec 31, +730.5 on Dec 31 2021
        assert_eq!(
            result.dates,
            vec![
                NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
                NaiveDate::from_ymd_opt(2020, 12, 31).unwrap(),
                NaiveDate::from_ymd_opt(2021, 12, 31).unwrap(),
            ]
        );
    }

    #[test]
    fn test_annual_rate_two_periods() {
        let terms = LoanTerms::new(1, 2, dec!(0.1))
            .unwrap()
            .with_principal(dec!(1000))
            .unwrap()
            .solve_payment()
            .unwrap();
        assert_eq!(terms.payment(), Some(dec!(576.19)));
        let result = Simulator::new(terms)
            .with_start_date("2020-01-01")
            .unwrap()
            .run()
            .unwrap();
        assert_eq!(result.remaining_principal, vec![dec!(1000), dec!(523.81), dec!(0)]);
        assert_eq!(result.cumulative_interest, vec![dec!(0), dec!(100), dec!(152.38)]);
        assert_eq!(result.total_payment, dec!(1152.38));
    }

    #[test]
    fn test_one_time_applied_once_before_interest() {
        let mut sim = interest_free(dec!(1000), dec!(500), 2);
        sim.add_one_time_payment(dec!(300), "2020-06-01").unwrap();
        let result = sim.run().unwrap();
        assert_eq!(result.remaining_principal, vec![dec!(1000), dec!(200), dec!(0)]);
        assert_eq!(result.cumulative_payments, vec![dec!(0), dec!(800), dec!(1300)]);
    }

    #[test]
    fn test_one_time_on_cycle_date_waits() {
        let mut sim = interest_free(dec!(1000), dec!(250), 4);
        // First cycle lands at 2020-12-31 06:00, which is after midnight of this date
        sim.add_one_time_payment(dec!(100), "2020-12-31").unwrap();
        // Dated after the first cycle: applies on the second
        sim.add_one_time_payment(dec!(50), "2021-01-01").unwrap();
        let result = sim.run().unwrap();
        assert_eq!(result.remaining_principal[1], dec!(650));
        assert_eq!(result.remaining_principal[2], dec!(350));
    }

    #[test]
    fn test_recurring_skipped_on_terminal_period() {
        let mut sim = interest_free(dec!(1000), dec!(500), 2);
        sim.add_recurring_payment(dec!(100), "2020-01-01", None, 1)
            .unwrap();
        let result = sim.run().unwrap();
        assert_eq!(result.remaining_principal, vec![dec!(1000), dec!(400), dec!(0)]);
        assert_eq!(result.cumulative_payments, vec![dec!(0), dec!(600), dec!(1100)]);
    }

    #[test]
    fn test_extra_payment_capped_at_balance() {
        let mut sim = interest_free(dec!(900), dec!(300), 3);
        sim.add_recurring_payment(dec!(1000), "2020-01-01", None, 1)
            .unwrap();
        let result = sim.run().unwrap();
        assert_eq!(result.total_length, 1);
        assert_eq!(result.remaining_principal, vec![dec!(900), dec!(0)]);
        assert_eq!(result.total_payment, dec!(900));
    }

    #[test]
    fn test_zero_principal_has_no_periods() {
        let result = interest_free(dec!(0), dec!(0), 1).run().unwrap();
        assert_eq!(result.total_length, 0);
        assert_eq!(result.remaining_principal, vec![dec!(0)]);
        assert_eq!(result.payoff_date(), NaiveDate::from_ymd_opt(2020, 1, 1));
    }

    #[test]
    fn test_run_requires_start_date() {
        let terms = LoanTerms::new(12, 1, dec!(0))
            .unwrap()
            .with_principal(dec!(1200))
            .unwrap()
            .with_payment(dec!(100))
            .unwrap();
        let err = Simulator::new(terms).run().unwrap_err();
        assert!(matches!(err, LoanPayoffError::PreconditionFailed(_)));
    }

    #[test]
    fn test_run_requires_payment() {
        let terms = LoanTerms::new(12, 1, dec!(0))
            .unwrap()
            .with_principal(dec!(1200))
            .unwrap();
        let sim = Simulator::new(terms).with_start_date("2024-01-01").unwrap();
        assert!(matches!(
            sim.run(),
            Err(LoanPayoffError::PreconditionFailed(_))
        ));
    }

    #[test]
    fn test_payment_equal_to_interest_is_non_convergent() {
        let terms = LoanTerms::new(12, 10, dec!(0.12))
            .unwrap()
            .with_principal(dec!(1000))
            .unwrap()
            .with_payment(dec!(10))
            .unwrap();
        let sim = Simulator::new(terms).with_start_date("2024-01-01").unwrap();
        match sim.run() {
            Err(LoanPayoffError::NonConvergent {
                periods,
                remaining_principal,
            }) => {
                assert_eq!(periods, 1);
                assert_eq!(remaining_principal, dec!(1000));
            }
            other => panic!("expected NonConvergent, got {other:?}"),
        }
    }

    #[test]
    fn test_pending_extra_payment_rescues_stalled_loan() {
        let terms = LoanTerms::new(12, 10, dec!(0.12))
            .unwrap()
            .with_principal(dec!(1000))
            .unwrap()
            .with_payment(dec!(10))
            .unwrap();
        let mut sim = Simulator::new(terms).with_start_date("2024-01-01").unwrap();
        sim.add_one_time_payment(dec!(1000), "2024-12-15").unwrap();
        let result = sim.run().unwrap();
        // Stalls at 1000 for 11 cycles, the lump sum clears it on the 12th
        assert_eq!(result.total_length, 12);
        assert_eq!(result.remaining_principal[11], dec!(1000));
        assert_eq!(result.total_interest, dec!(110));
    }

    #[test]
    fn test_period_cap() {
        let terms = LoanTerms::new(12, 30, dec!(0.05))
            .unwrap()
            .with_principal(dec!(300_000))
            .unwrap()
            .solve_payment()
            .unwrap();
        let options = SimulationOptions {
            max_periods: 5,
            ..SimulationOptions::default()
        };
        let sim = Simulator::new(terms)
            .with_start_date("2024-01-01")
            .unwrap()
            .with_options(options)
            .unwrap();
        assert!(matches!(
            sim.run(),
            Err(LoanPayoffError::NonConvergent { periods: 5, .. })
        ));
    }

    #[test]
    fn test_options_validation() {
        let bad = SimulationOptions {
            days_per_year: Decimal::ZERO,
            ..SimulationOptions::default()
        };
        assert!(bad.validate().is_err());
        let bad = SimulationOptions {
            balance_epsilon: Decimal::ZERO,
            ..SimulationOptions::default()
        };
        assert!(bad.validate().is_err());
        assert!(SimulationOptions::default().validate().is_ok());
    }

    #[test]
    fn test_maturity_on_simulated_calendar() {
        let sim = interest_free(dec!(1000), dec!(500), 2);
        let maturity = sim.maturity().unwrap();
        assert_eq!(maturity.date(), NaiveDate::from_ymd_opt(2021, 12, 31).unwrap());
    }

    #[test]
    fn test_simulator_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Simulator>();
        assert_send_sync::<SimulationResult>();
    }
}
