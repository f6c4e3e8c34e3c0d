pub mod amortization;
pub mod error;
pub mod schedule;
pub mod simulation;
pub mod types;

pub use amortization::LoanTerms;
pub use error::LoanPayoffError;
pub use schedule::{PaymentEvent, PaymentSchedule};
pub use simulation::{
    simulate_repayment, ScenarioInput, SimulationOptions, SimulationResult, Simulator,
};
pub use types::*;

/// Standard result type for all loan-payoff operations
pub type LoanPayoffResult<T> = Result<T, LoanPayoffError>;
