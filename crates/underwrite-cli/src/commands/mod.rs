pub mod monte_carlo;
pub mod scenarios;
pub mod stamp_duty;
pub mod underwrite;
