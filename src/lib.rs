pub mod error;
pub mod record;
pub mod normalize;
pub mod aggregate;
pub mod rank;
pub mod titles;
pub mod compare;
pub mod report;

pub use error::AnalysisError;
