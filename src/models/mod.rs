// src/models/mod.rs

pub mod attempt;
pub mod code;
pub mod lesson;
pub mod progress;
pub mod quiz;
pub mod report;
pub mod subject;
