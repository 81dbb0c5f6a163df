//! # fairlens - dataset profiling for fairness analysis
//!
//! fairlens reads a tabular dataset, classifies its columns, flags the ones
//! that look like protected attributes (gender, age, race, ...) and hands the
//! dataset to an external fairness analysis backend.
//!
//! ## Quick Start
//!
//! ```rust
//! use fairlens::prelude::*;
//!
//! let csv = "name,Gender,Years\nAnn,Female,34\nBob,Male,51\nCid,Male,22\n";
//! let summary = DatasetProcessor::new().process(csv)?;
//!
//! assert_eq!(summary.row_count, 3);
//! let gender = summary.profile("Gender").unwrap();
//! assert!(gender.is_protected);
//! assert_eq!(gender.risk_level, RiskLevel::High);
//! # Ok::<(), fairlens::error::FairlensError>(())
//! ```
//!
//! ## Running an analysis
//!
//! ```rust,no_run
//! use std::path::Path;
//! use fairlens::prelude::*;
//!
//! # async fn example() -> fairlens::error::Result<()> {
//! let client = BackendClient::new(BackendConfig::from_env())?;
//! let workflow = Workflow::new(DatasetProcessor::new(), client);
//!
//! let state = workflow.load_file(&AppState::new(), Path::new("loans.csv")).await;
//! let state = state.select_protected_attributes(["Gender"]);
//! let state = workflow
//!     .analyze(&state, FairnessSelection::with_defaults(FairnessDimension::Group))
//!     .await;
//!
//! if let Some(error) = state.last_error() {
//!     eprintln!("{error}");
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`dataset`]: CSV parsing, column type detection, protected-attribute
//!   heuristics and summary building
//! - [`intake`]: upload size and format checks
//! - [`backend`]: HTTP client for `/upload` and `/fairness-check`
//! - [`state`] and [`workflow`]: immutable application state and the flow
//!   that drives it
//! - [`formatters`]: JSON, console and Markdown reports
//! - [`logging`]: tracing subscriber setup

pub mod backend;
pub mod catalog;
pub mod dataset;
pub mod error;
pub mod formatters;
pub mod intake;
pub mod logging;
pub mod prelude;
pub mod state;
pub mod workflow;
