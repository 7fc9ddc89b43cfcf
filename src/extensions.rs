use async_trait::async_trait;

use crate::{context::QueryEnv, validation::ValidationResult};

/// Lifecycle hooks around one execution.
///
/// Listeners run in installation order; every hook is awaited before the
/// next listener's runs. All hooks default to no-ops so implementors only
/// override the points they care about.
#[async_trait]
pub trait ExecutionListener: Send + Sync {
    /// After the external validator ran, before its outcome is acted on.
    async fn after_validation(&self, result: &ValidationResult) {
        let _ = result;
    }

    /// Before the root execution is launched.
    async fn before_execution(&self, env: &QueryEnv) {
        let _ = env;
    }

    /// After the root execution has been launched, before it is awaited.
    async fn before_execution_awaited(&self, env: &QueryEnv) {
        let _ = env;
    }

    /// After the root execution completed, errors included.
    async fn after_execution(&self, env: &QueryEnv) {
        let _ = env;
    }
}
