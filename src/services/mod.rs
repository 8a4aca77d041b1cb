// src/services/mod.rs

pub mod generation;
pub mod grader;
pub mod locks;
pub mod remediation;
pub mod reports;
pub mod resolver;
