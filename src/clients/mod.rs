// src/clients/mod.rs

pub mod generator;
pub mod sandbox;
