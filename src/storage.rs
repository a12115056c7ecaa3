// ABOUTME: Opaque persistence interface for completed analyses and user context
// ABOUTME: The pipeline's caller persists results; the core never touches a database
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.

//! # Storage
//!
//! The pipeline itself is persistence-free: the orchestrator returns
//! `(AnalysisResult, AnalysisMetadata)` and ownership passes to the caller.
//! This module defines the contract that caller-side persistence implements,
//! plus an in-memory implementation for tests and embedded use.

use async_trait::async_trait;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::{AnalysisMetadata, AnalysisResult, UserNutritionContext};

/// Persistence for completed analyses and user profile/goal data
#[async_trait]
pub trait Storage: Send + Sync {
    /// Persist one completed analysis
    async fn save_analysis(
        &self,
        result: &AnalysisResult,
        metadata: &AnalysisMetadata,
    ) -> Result<(), AppError>;

    /// Retrieve a previously saved analysis by request ID
    async fn load_analysis(&self, request_id: Uuid) -> Result<Option<AnalysisResult>, AppError>;

    /// Retrieve the user's nutrition context (goal, daily targets)
    async fn load_user_context(&self) -> Result<Option<UserNutritionContext>, AppError>;
}

/// In-memory [`Storage`] for tests and single-process embedding
#[derive(Default)]
pub struct MemoryStorage {
    analyses: Mutex<Vec<(Uuid, AnalysisResult)>>,
    user_context: Mutex<Option<UserNutritionContext>>,
}

impl MemoryStorage {
    /// Create empty storage
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the stored user context
    pub async fn set_user_context(&self, context: UserNutritionContext) {
        *self.user_context.lock().await = Some(context);
    }

    /// Number of stored analyses
    pub async fn analysis_count(&self) -> usize {
        self.analyses.lock().await.len()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn save_analysis(
        &self,
        result: &AnalysisResult,
        metadata: &AnalysisMetadata,
    ) -> Result<(), AppError> {
        self.analyses
            .lock()
            .await
            .push((metadata.request_id, result.clone()));
        Ok(())
    }

    async fn load_analysis(&self, request_id: Uuid) -> Result<Option<AnalysisResult>, AppError> {
        Ok(self
            .analyses
            .lock()
            .await
            .iter()
            .rev()
            .find(|(id, _)| *id == request_id)
            .map(|(_, result)| result.clone()))
    }

    async fn load_user_context(&self) -> Result<Option<UserNutritionContext>, AppError> {
        Ok(self.user_context.lock().await.clone())
    }
}
