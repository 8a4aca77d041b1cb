// src/handlers/mod.rs

pub mod attempt;
pub mod code;
pub mod module;
pub mod progress;
pub mod quiz;
pub mod report;
pub mod subject;
pub mod teacher;
