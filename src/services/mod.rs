pub mod enhanced;
pub mod genetic;
pub mod head_to_head;
pub mod odds_analyzer;
pub mod poisson;
pub mod predictor;
pub mod result_checker;
pub mod team_profiles;

pub use enhanced::*;
pub use odds_analyzer::*;
pub use predictor::*;
pub use result_checker::*;
pub use team_profiles::*;
