//! Probability engine for pending FDA PDUFA decisions.
//!
//! Facts gathered about an event are admitted through the
//! [`analysis::ContextBuilder`], then a registry of layered factors turns the
//! resulting [`analysis::AnalysisContext`] into an approval probability with a
//! full audit trace.

pub mod analysis;
pub mod config;
pub mod error;
pub mod facts;
pub mod telemetry;

pub use analysis::{
    AnalysisContext, AnalysisResult, ContextBuilder, FactorRegistry, ProbabilityCalculator,
};
pub use config::constants::CalculatorConfig;
