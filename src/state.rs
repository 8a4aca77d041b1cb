// src/state.rs

use std::sync::Arc;

use axum::extract::FromRef;
use sqlx::SqlitePool;

use crate::{
    clients::{generator::ContentGenerator, sandbox::CodeRunner},
    config::Config,
    services::{
        generation::Generation, grader::MasteryGrader, locks::GenerationLocks,
        remediation::RemediationOrchestrator, reports::ReportService,
        resolver::ModuleContentResolver,
    },
    store::progress::ProgressStore,
};

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub config: Config,
    pub generator: Arc<dyn ContentGenerator>,
    pub runner: Arc<dyn CodeRunner>,
    /// Shared by every resolver built from this state.
    pub locks: Arc<GenerationLocks>,
}

impl AppState {
    pub fn new(
        pool: SqlitePool,
        config: Config,
        generator: Arc<dyn ContentGenerator>,
        runner: Arc<dyn CodeRunner>,
    ) -> Self {
        Self {
            pool,
            config,
            generator,
            runner,
            locks: Arc::new(GenerationLocks::new()),
        }
    }

    pub fn generation(&self) -> Generation {
        Generation::new(self.generator.clone(), self.config.generator_timeout)
    }

    pub fn grader(&self) -> MasteryGrader {
        MasteryGrader::new(
            self.runner.clone(),
            self.generation(),
            self.config.sandbox_timeout,
        )
    }
}

impl FromRef<AppState> for SqlitePool {
    fn from_ref(state: &AppState) -> Self {
        state.pool.clone()
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}

impl FromRef<AppState> for ProgressStore {
    fn from_ref(state: &AppState) -> Self {
        ProgressStore::new(state.pool.clone())
    }
}

impl FromRef<AppState> for ModuleContentResolver {
    fn from_ref(state: &AppState) -> Self {
        ModuleContentResolver::new(state.pool.clone(), state.generation(), state.locks.clone())
    }
}

impl FromRef<AppState> for RemediationOrchestrator {
    fn from_ref(state: &AppState) -> Self {
        RemediationOrchestrator::new(state.pool.clone(), state.grader(), state.generation())
    }
}

impl FromRef<AppState> for ReportService {
    fn from_ref(state: &AppState) -> Self {
        ReportService::new(state.pool.clone(), state.generation())
    }
}
