use crate::domain::models::{ActionId, ActionOutcome, AuthContext, Params};
use anyhow::Result;
use async_trait::async_trait;

/// Outcome of the business-rule check that runs before dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Valid,
    Invalid(String),
}

/// Executes concrete actions (create project, start timer, ...).
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ActionDispatcher: Send + Sync {
    // Entity existence, uniqueness and other store-backed rules.
    // An Err here means the check itself could not run.
    async fn validate(&self, action: &ActionId, params: &Params) -> Result<Verdict>;

    async fn invoke(
        &self,
        action: &ActionId,
        params: &Params,
        auth: &AuthContext,
    ) -> Result<ActionOutcome>;
}

/// External capability check.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Authorizer: Send + Sync {
    async fn can_perform(&self, action: &ActionId, params: &Params, auth: &AuthContext) -> bool;
}
