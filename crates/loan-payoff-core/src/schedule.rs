//! Extra-payment schedule: one-time and recurring payments on top of the
//! standard level payment.
//!
//! Events are immutable once added. Whatever progress a simulation tracks
//! against them lives in the simulation, not here.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::LoanPayoffError;
use crate::types::Money;
use crate::LoanPayoffResult;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Parse a calendar date in `YYYY-MM-DD` form (no time component).
pub fn parse_date(field: &str, value: &str) -> LoanPayoffResult<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).map_err(|_| {
        LoanPayoffError::invalid(field, format!("'{value}' is not a date of the form YYYY-MM-DD"))
    })
}

fn validate_amount(amount: Money) -> LoanPayoffResult<()> {
    if amount < Decimal::ZERO {
        return Err(LoanPayoffError::invalid(
            "amount",
            "Payment must be greater than or equal to zero",
        ));
    }
    Ok(())
}

/// An extra payment made once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OneTimePayment {
    pub amount: Money,
    /// Applied on the first payment cycle falling after this date.
    pub date: NaiveDate,
}

impl OneTimePayment {
    pub fn new(amount: Money, date: NaiveDate) -> LoanPayoffResult<Self> {
        validate_amount(amount)?;
        Ok(OneTimePayment { amount, date })
    }
}

/// An extra payment made every `period` payment cycles between `start` and `end`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurringPayment {
    pub amount: Money,
    pub start: NaiveDate,
    /// `None` runs to loan maturity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<NaiveDate>,
    /// Payment cycles between applications; 1 is every cycle.
    #[serde(default = "default_period")]
    pub period: u32,
}

fn default_period() -> u32 {
    1
}

impl RecurringPayment {
    pub fn new(
        amount: Money,
        start: NaiveDate,
        end: Option<NaiveDate>,
        period: u32,
    ) -> LoanPayoffResult<Self> {
        validate_amount(amount)?;
        if period == 0 {
            return Err(LoanPayoffError::invalid(
                "period",
                "Period must be greater than zero",
            ));
        }
        if let Some(end) = end {
            if end < start {
                return Err(LoanPayoffError::invalid(
                    "end",
                    format!("End date {end} is before start date {start}"),
                ));
            }
        }
        Ok(RecurringPayment {
            amount,
            start,
            end,
            period,
        })
    }

    /// Re-run constructor checks; used for values that arrived through serde.
    pub fn validate(&self) -> LoanPayoffResult<()> {
        RecurringPayment::new(self.amount, self.start, self.end, self.period).map(|_| ())
    }
}

/// A scheduled extra payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PaymentEvent {
    OneTime(OneTimePayment),
    Recurring(RecurringPayment),
}

/// Extra payments in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentSchedule {
    events: Vec<PaymentEvent>,
}

impl PaymentSchedule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_one_time(&mut self, amount: Money, date: &str) -> LoanPayoffResult<()> {
        let date = parse_date("date", date)?;
        self.push(PaymentEvent::OneTime(OneTimePayment::new(amount, date)?));
        Ok(())
    }

    pub fn add_recurring(
        &mut self,
        amount: Money,
        start: &str,
        end: Option<&str>,
        period: u32,
    ) -> LoanPayoffResult<()> {
        let start = parse_date("start", start)?;
        let end = end.map(|e| parse_date("end", e)).transpose()?;
        self.push(PaymentEvent::Recurring(RecurringPayment::new(
            amount, start, end, period,
        )?));
        Ok(())
    }

    pub fn push(&mut self, event: PaymentEvent) {
        self.events.push(event);
    }

    pub fn one_time(&self) -> impl Iterator<Item = &OneTimePayment> {
        self.events.iter().filter_map(|e| match e {
            PaymentEvent::OneTime(p) => Some(p),
            PaymentEvent::Recurring(_) => None,
        })
    }

    pub fn recurring(&self) -> impl Iterator<Item = &RecurringPayment> {
        self.events.iter().filter_map(|e| match e {
            PaymentEvent::Recurring(p) => Some(p),
            PaymentEvent::OneTime(_) => None,
        })
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_parse_date() {
        let d = parse_date("date", "2024-02-29").unwrap();
        assert_eq!(d, NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
    }

    #[test]
    fn test_parse_date_rejects_malformed() {
        for bad in ["2023-02-29", "2024/01/01", "2024-01-01T00:00:00", "soon", ""] {
            let err = parse_date("start", bad).unwrap_err();
            assert!(
                matches!(err, LoanPayoffError::InvalidArgument { ref field, .. } if field == "start"),
                "{bad} should be rejected, got {err:?}"
            );
        }
    }

    #[test]
    fn test_add_one_time_keeps_order() {
        let mut s = PaymentSchedule::new();
        s.add_one_time(dec!(100), "2025-03-01").unwrap();
        s.add_one_time(dec!(50), "2025-01-01").unwrap();
        let amounts: Vec<_> = s.one_time().map(|p| p.amount).collect();
        assert_eq!(amounts, vec![dec!(100), dec!(50)]);
    }

    #[test]
    fn test_add_one_time_rejects_negative() {
        let mut s = PaymentSchedule::new();
        assert!(s.add_one_time(dec!(-1), "2025-03-01").is_err());
        assert!(s.is_empty());
    }

    #[test]
    fn test_add_recurring_validation() {
        let mut s = PaymentSchedule::new();
        assert!(s.add_recurring(dec!(100), "2025-01-01", None, 0).is_err());
        assert!(s.add_recurring(dec!(-5), "2025-01-01", None, 1).is_err());
        assert!(s
            .add_recurring(dec!(100), "2025-01-01", Some("2024-01-01"), 1)
            .is_err());
        assert!(s.add_recurring(dec!(100), "2025-13-01", None, 1).is_err());
        assert!(s.is_empty());

        s.add_recurring(dec!(100), "2025-01-01", Some("2026-01-01"), 3)
            .unwrap();
        let r = s.recurring().next().unwrap();
        assert_eq!(r.period, 3);
        assert_eq!(r.end, NaiveDate::from_ymd_opt(2026, 1, 1));
    }

    #[test]
    fn test_event_deserializes_with_default_period() {
        let e: PaymentEvent = serde_json::from_str(
            r#"{"kind": "recurring", "amount": "250", "start": "2025-06-01"}"#,
        )
        .unwrap();
        match e {
            PaymentEvent::Recurring(r) => {
                assert_eq!(r.period, 1);
                assert_eq!(r.end, None);
                assert!(r.validate().is_ok());
            }
            other => panic!("expected recurring, got {other:?}"),
        }
    }
}
