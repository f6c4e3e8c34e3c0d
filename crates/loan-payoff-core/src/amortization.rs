//! Level-payment amortization math.
//!
//! Per-period interest, the level-payment form factor, and the validated
//! [`LoanTerms`] value used to derive a payment from a principal or a
//! principal from a payment. Every monetary result is rounded to 2 dp at
//! the point it is produced.

use rust_decimal::Decimal;
use rust_decimal::MathematicalOps;
use serde::{Deserialize, Serialize};

use crate::error::LoanPayoffError;
use crate::types::{round_money, Money, Rate};
use crate::LoanPayoffResult;

// ---------------------------------------------------------------------------
// Pure functions
// ---------------------------------------------------------------------------

/// Interest charged for one payment cycle on `principal`.
pub fn interest(principal: Money, rate: Rate, frequency: u32) -> LoanPayoffResult<Money> {
    if frequency == 0 {
        return Err(LoanPayoffError::invalid(
            "frequency",
            "Frequency must be greater than zero",
        ));
    }
    if principal < Decimal::ZERO {
        return Err(LoanPayoffError::invalid(
            "principal",
            "Principal must be greater than or equal to zero",
        ));
    }
    if rate < Decimal::ZERO {
        return Err(LoanPayoffError::invalid(
            "rate",
            "Rate must be greater than or equal to zero",
        ));
    }

    principal
        .checked_mul(rate / Decimal::from(frequency))
        .map(round_money)
        .ok_or_else(|| LoanPayoffError::invalid("rate", "Interest is out of range"))
}

/// Ratio converting a principal into the level payment that retires it over
/// `length * frequency` cycles.
///
/// A zero rate is straight-line payoff (`1/n`).
pub fn form_factor(frequency: u32, length: u32, rate: Rate) -> LoanPayoffResult<Decimal> {
    if frequency == 0 {
        return Err(LoanPayoffError::invalid(
            "frequency",
            "Frequency must be greater than zero",
        ));
    }
    if length == 0 {
        return Err(LoanPayoffError::invalid(
            "length",
            "Length must be greater than zero",
        ));
    }
    if rate < Decimal::ZERO {
        return Err(LoanPayoffError::invalid(
            "rate",
            "Rate must be greater than or equal to zero",
        ));
    }

    let n = u64::from(length) * u64::from(frequency);

    if rate.is_zero() {
        return Ok(Decimal::ONE / Decimal::from(n));
    }

    let r = rate / Decimal::from(frequency);
    match Decimal::ONE.checked_add(r).and_then(|base| base.checked_powu(n)) {
        // r below working precision: indistinguishable from interest free
        Some(f) if f == Decimal::ONE => Ok(Decimal::ONE / Decimal::from(n)),
        Some(f) => Ok(f
            .checked_mul(r)
            .map(|fr| fr / (f - Decimal::ONE))
            .unwrap_or(r)),
        // (1+r)^n beyond Decimal range: f/(f-1) is 1 to working precision
        None => Ok(r),
    }
}

/// Level payment for `terms`, from its principal.
pub fn derive_payment(terms: &LoanTerms) -> LoanPayoffResult<Money> {
    let principal = terms.principal.ok_or_else(|| {
        LoanPayoffError::PreconditionFailed(
            "principal must be set before deriving the payment".into(),
        )
    })?;

    let factor = form_factor(terms.frequency, terms.length, terms.rate)?;
    principal
        .checked_mul(factor)
        .map(round_money)
        .ok_or_else(|| LoanPayoffError::invalid("principal", "Payment is out of range"))
}

/// Principal a level payment of `terms.payment` retires over the term.
pub fn derive_principal(terms: &LoanTerms) -> LoanPayoffResult<Money> {
    let payment = terms.payment.ok_or_else(|| {
        LoanPayoffError::PreconditionFailed(
            "payment must be set before deriving the principal".into(),
        )
    })?;

    let factor = form_factor(terms.frequency, terms.length, terms.rate)?;
    if factor.is_zero() {
        return Err(LoanPayoffError::PreconditionFailed(
            "form factor is zero; principal is undefined".into(),
        ));
    }
    Ok(round_money(payment / factor))
}

// ---------------------------------------------------------------------------
// Loan terms
// ---------------------------------------------------------------------------

/// Validated loan parameters.
///
/// `frequency`, `length` and `rate` are checked on construction. Either of
/// `principal` / `payment` may be left unset and derived from the other.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "LoanTermsInput")]
pub struct LoanTerms {
    frequency: u32,
    length: u32,
    rate: Rate,
    #[serde(skip_serializing_if = "Option::is_none")]
    principal: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    payment: Option<Money>,
}

/// Unvalidated loan terms as they arrive from a caller or a document.
#[derive(Debug, Clone, Deserialize)]
pub struct LoanTermsInput {
    /// Payments per year.
    pub frequency: u32,
    /// Term in years.
    pub length: u32,
    /// Nominal annual rate as a ratio (0.05 = 5%).
    pub rate: Rate,
    #[serde(default)]
    pub principal: Option<Money>,
    #[serde(default)]
    pub payment: Option<Money>,
}

impl TryFrom<LoanTermsInput> for LoanTerms {
    type Error = LoanPayoffError;

    fn try_from(input: LoanTermsInput) -> LoanPayoffResult<Self> {
        let mut terms = LoanTerms::new(input.frequency, input.length, input.rate)?;
        if let Some(p) = input.principal {
            terms = terms.with_principal(p)?;
        }
        if let Some(p) = input.payment {
            terms = terms.with_payment(p)?;
        }
        Ok(terms)
    }
}

impl LoanTerms {
    pub fn new(frequency: u32, length: u32, rate: Rate) -> LoanPayoffResult<Self> {
        if frequency == 0 {
            return Err(LoanPayoffError::invalid(
                "frequency",
                "Frequency must be greater than zero",
            ));
        }
        if length == 0 {
            return Err(LoanPayoffError::invalid(
                "length",
                "Length must be greater than zero",
            ));
        }
        if rate < Decimal::ZERO {
            return Err(LoanPayoffError::invalid(
                "rate",
                "Rate must be greater than or equal to zero",
            ));
        }

        Ok(LoanTerms {
            frequency,
            length,
            rate,
            principal: None,
            payment: None,
        })
    }

    pub fn with_principal(mut self, principal: Money) -> LoanPayoffResult<Self> {
        if principal < Decimal::ZERO {
            return Err(LoanPayoffError::invalid(
                "principal",
                "Principal must be greater than or equal to zero",
            ));
        }
        self.principal = Some(principal);
        Ok(self)
    }

    pub fn with_payment(mut self, payment: Money) -> LoanPayoffResult<Self> {
        if payment < Decimal::ZERO {
            return Err(LoanPayoffError::invalid(
                "payment",
                "Payment must be greater than or equal to zero",
            ));
        }
        self.payment = Some(payment);
        Ok(self)
    }

    /// Derive the level payment from the principal and store it.
    pub fn solve_payment(self) -> LoanPayoffResult<Self> {
        let payment = derive_payment(&self)?;
        self.with_payment(payment)
    }

    /// Derive the affordable principal from the payment and store it.
    pub fn solve_principal(self) -> LoanPayoffResult<Self> {
        let principal = derive_principal(&self)?;
        self.with_principal(principal)
    }

    pub fn frequency(&self) -> u32 {
        self.frequency
    }

    pub fn length(&self) -> u32 {
        self.length
    }

    pub fn rate(&self) -> Rate {
        self.rate
    }

    pub fn principal(&self) -> Option<Money> {
        self.principal
    }

    pub fn payment(&self) -> Option<Money> {
        self.payment
    }

    /// Number of payment cycles in the full term.
    pub fn n_periods(&self) -> u32 {
        self.length.saturating_mul(self.frequency)
    }
}
