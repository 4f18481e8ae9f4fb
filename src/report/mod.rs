//! Report module for hydrocal

mod result;

pub use result::{FileOutcome, FileReport, MissionReport};
