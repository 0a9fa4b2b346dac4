pub mod assumptions;
pub mod cashflows;
pub mod debt_schedule;
pub mod engine;
pub mod metrics;
pub mod stamp_duty;
