use crate::app::config::{ConfigError, EngineConfig, Messages};
use crate::app::error::CommandError;
use crate::app::executor::Executor;
use crate::app::grammar::{CommandPattern, CommandRegistry};
use crate::app::recovery;
use crate::app::resolver;
use crate::domain::actions::{ActionDispatcher, Authorizer};
use crate::domain::models::{ActionResult, AuthContext, Params};
use std::sync::Arc;
use std::time::Duration;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Resolver and executor wired together. Shared by every user session;
/// holds no per-user state.
#[derive(Clone)]
pub struct Palette {
    registry: Arc<CommandRegistry>,
    executor: Executor,
    messages: Messages,
    timeout: Duration,
}

impl Palette {
    pub fn new(
        registry: CommandRegistry,
        dispatcher: Arc<dyn ActionDispatcher>,
        authorizer: Arc<dyn Authorizer>,
    ) -> Self {
        Self::with_messages(registry, dispatcher, authorizer, Messages::default())
    }

    pub fn with_messages(
        registry: CommandRegistry,
        dispatcher: Arc<dyn ActionDispatcher>,
        authorizer: Arc<dyn Authorizer>,
        messages: Messages,
    ) -> Self {
        Self {
            registry: Arc::new(registry),
            executor: Executor::new(dispatcher, authorizer, messages.clone()),
            messages,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// A grammar defect in the configured commands is a startup error.
    pub fn from_config(
        config: &EngineConfig,
        dispatcher: Arc<dyn ActionDispatcher>,
        authorizer: Arc<dyn Authorizer>,
    ) -> Result<Self, ConfigError> {
        Ok(Self::with_messages(
            config.build_registry()?,
            dispatcher,
            authorizer,
            config.messages.clone(),
        )
        .timeout(config.execute_timeout()))
    }

    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    #[must_use]
    pub fn messages(&self) -> &Messages {
        &self.messages
    }

    pub fn resolve(&self, input: &str) -> Result<(&CommandPattern, Params), CommandError> {
        resolver::resolve(&self.registry, input)?.into_match()
    }

    pub async fn execute(
        &self,
        pattern: &CommandPattern,
        params: &Params,
        auth: &AuthContext,
    ) -> ActionResult {
        match self
            .executor
            .execute_with_timeout(pattern, params, auth, self.timeout)
            .await
        {
            Ok(outcome) => ActionResult::success(outcome),
            Err(err) => self.failure("", &err),
        }
    }

    /// Converts any error into the result shown to the user.
    #[must_use]
    pub fn failure(&self, input: &str, err: &CommandError) -> ActionResult {
        if err.is_rejection() {
            tracing::debug!(kind = err.kind(), "input rejected");
        }
        ActionResult::failure(recovery::user_message(&self.messages, err))
            .with_suggestions(recovery::get_suggestions(&self.registry, input, err))
    }

    /// Resolve and execute in one go, for callers without a session.
    pub async fn run(&self, input: &str, auth: &AuthContext) -> ActionResult {
        match self.resolve(input) {
            Ok((pattern, params)) => self.execute(pattern, &params, auth).await,
            Err(err) => self.failure(input, &err),
        }
    }
}
