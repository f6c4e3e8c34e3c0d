use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoanPayoffError {
    #[error("Invalid argument: {field} — {reason}")]
    InvalidArgument { field: String, reason: String },

    #[error("Precondition failed: {0}")]
    PreconditionFailed(String),

    #[error("Non-convergent payoff: balance {remaining_principal} still outstanding after {periods} periods")]
    NonConvergent {
        periods: u32,
        remaining_principal: Decimal,
    },
}

impl LoanPayoffError {
    pub(crate) fn invalid(field: &str, reason: impl Into<String>) -> Self {
        LoanPayoffError::InvalidArgument {
            field: field.into(),
            reason: reason.into(),
        }
    }
}
