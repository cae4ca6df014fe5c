//! gradeforge-core: comparison and reporting engine.
//!
//! Runs instructor-written test functions against a master implementation
//! and a student submission, reconciles the two streams of checks, carries
//! confirmed errors forward, and writes feedback through an injected sink.

pub mod capture;
pub mod check;
pub mod context;
pub mod ecf;
pub mod engine;
pub mod error;
pub mod fault;
pub mod feedback;
pub mod implementation;
pub mod input;
pub mod interpolate;
pub mod reconcile;
pub mod report;
pub mod tester;
pub mod traits;
pub mod trial;
pub mod value;

pub use check::Check;
pub use context::CallContext;
pub use error::{GradingError, LoadError};
pub use fault::Fault;
pub use implementation::Implementation;
pub use tester::{TestFunction, Tester};
pub use trial::{Manual, Trial};
pub use value::Value;
