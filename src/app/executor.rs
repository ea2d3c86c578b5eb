use crate::app::config::Messages;
use crate::app::error::CommandError;
use crate::app::grammar::CommandPattern;
use crate::domain::actions::{ActionDispatcher, Authorizer, Verdict};
use crate::domain::models::{ActionId, ActionOutcome, AuthContext, Params};
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

/// Validates, authorizes and dispatches resolved commands.
#[derive(Clone)]
pub struct Executor {
    dispatcher: Arc<dyn ActionDispatcher>,
    authorizer: Arc<dyn Authorizer>,
    messages: Messages,
}

impl Executor {
    pub fn new(
        dispatcher: Arc<dyn ActionDispatcher>,
        authorizer: Arc<dyn Authorizer>,
        messages: Messages,
    ) -> Self {
        Self {
            dispatcher,
            authorizer,
            messages,
        }
    }

    /// Runs one matched command.
    ///
    /// Order matters: the schema check only looks at the values themselves,
    /// authorization comes before any store-backed validation so a denied
    /// caller learns nothing about which entities exist. A panic in any
    /// collaborator becomes an `ActionFault`.
    pub async fn execute(
        &self,
        pattern: &CommandPattern,
        params: &Params,
        auth: &AuthContext,
    ) -> Result<ActionOutcome, CommandError> {
        self.check_schema(pattern, params)?;

        let action = &pattern.action;
        match AssertUnwindSafe(self.dispatch(action, params, auth))
            .catch_unwind()
            .await
        {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(%action, "action panicked");
                Err(CommandError::ActionFault("action panicked".to_string()))
            }
        }
    }

    async fn dispatch(
        &self,
        action: &ActionId,
        params: &Params,
        auth: &AuthContext,
    ) -> Result<ActionOutcome, CommandError> {
        if !self.authorizer.can_perform(action, params, auth).await {
            tracing::info!(%action, user = %auth.user_id, "action not permitted");
            return Err(CommandError::Unauthorized);
        }

        match self.dispatcher.validate(action, params).await {
            Ok(Verdict::Valid) => {}
            Ok(Verdict::Invalid(reason)) => {
                tracing::debug!(%action, %reason, "validation failed");
                return Err(CommandError::ValidationFailure(reason));
            }
            Err(e) => {
                tracing::warn!(%action, error = %format!("{e:#}"), "validation could not run");
                return Err(CommandError::ActionFault(e.to_string()));
            }
        }

        match self.dispatcher.invoke(action, params, auth).await {
            Ok(outcome) => {
                tracing::info!(%action, user = %auth.user_id, "action completed");
                Ok(outcome)
            }
            Err(e) => {
                tracing::warn!(%action, error = %format!("{e:#}"), "action failed");
                Err(CommandError::ActionFault(e.to_string()))
            }
        }
    }

    /// Same as [`Executor::execute`], bounded by `timeout`.
    pub async fn execute_with_timeout(
        &self,
        pattern: &CommandPattern,
        params: &Params,
        auth: &AuthContext,
        timeout: Duration,
    ) -> Result<ActionOutcome, CommandError> {
        match tokio::time::timeout(timeout, self.execute(pattern, params, auth)).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(action = %pattern.action, ?timeout, "action timed out");
                Err(CommandError::Timeout)
            }
        }
    }

    // Re-checks what the resolver produced, for callers that build params by hand.
    fn check_schema(&self, pattern: &CommandPattern, params: &Params) -> Result<(), CommandError> {
        for (name, spec) in &pattern.params {
            match params.get(name) {
                None if spec.required => {
                    return Err(CommandError::ValidationFailure(Messages::for_param(
                        &self.messages.missing_param,
                        name,
                    )));
                }
                None => {}
                Some(value) => {
                    if spec.accept(value.trim()).is_none() {
                        return Err(CommandError::ValidationFailure(Messages::for_param(
                            &self.messages.invalid_param,
                            name,
                        )));
                    }
                }
            }
        }
        if let Some(unknown) = params.keys().find(|k| !pattern.params.contains_key(*k)) {
            return Err(CommandError::ValidationFailure(Messages::for_param(
                &self.messages.invalid_param,
                unknown,
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::grammar::{CommandRegistry, ParamSpec};
    use crate::domain::actions::{MockActionDispatcher, MockAuthorizer};
    use std::collections::BTreeMap;

    fn create_project() -> CommandPattern {
        CommandPattern::parse(
            "createProject",
            "lege projekt {title} an",
            BTreeMap::from([("title".to_string(), ParamSpec::string())]),
        )
        .unwrap()
    }

    fn title(value: &str) -> Params {
        Params::from([("title".to_string(), value.to_string())])
    }

    fn allow_all() -> MockAuthorizer {
        let mut auth = MockAuthorizer::new();
        auth.expect_can_perform().returning(|_, _, _| true);
        auth
    }

    fn executor(dispatcher: MockActionDispatcher, authorizer: MockAuthorizer) -> Executor {
        Executor::new(Arc::new(dispatcher), Arc::new(authorizer), Messages::default())
    }

    #[tokio::test]
    async fn test_successful_dispatch() {
        let mut dispatcher = MockActionDispatcher::new();
        dispatcher
            .expect_validate()
            .returning(|_, _| Ok(Verdict::Valid));
        dispatcher
            .expect_invoke()
            .withf(|action, params, _| {
                action.as_str() == "createProject"
                    && params.get("title").map(String::as_str) == Some("Alpha")
            })
            .times(1)
            .returning(|_, _, _| {
                Ok(ActionOutcome::new("Projekt 'Alpha' wurde angelegt.").navigate("/projects/alpha"))
            });

        let outcome = executor(dispatcher, allow_all())
            .execute(&create_project(), &title("Alpha"), &AuthContext::default())
            .await
            .unwrap();
        assert_eq!(outcome.message, "Projekt 'Alpha' wurde angelegt.");
        assert_eq!(outcome.navigate_to.as_deref(), Some("/projects/alpha"));
    }

    #[tokio::test]
    async fn test_unauthorized_skips_validation_and_dispatch() {
        let mut dispatcher = MockActionDispatcher::new();
        dispatcher.expect_validate().never();
        dispatcher.expect_invoke().never();
        let mut authorizer = MockAuthorizer::new();
        authorizer.expect_can_perform().returning(|_, _, _| false);

        let err = executor(dispatcher, authorizer)
            .execute(&create_project(), &title("Alpha"), &AuthContext::default())
            .await
            .unwrap_err();
        assert_eq!(err, CommandError::Unauthorized);
    }

    #[tokio::test]
    async fn test_invalid_verdict_is_validation_failure() {
        let mut dispatcher = MockActionDispatcher::new();
        dispatcher
            .expect_validate()
            .returning(|_, _| Ok(Verdict::Invalid("Projekt existiert bereits.".to_string())));
        dispatcher.expect_invoke().never();

        let err = executor(dispatcher, allow_all())
            .execute(&create_project(), &title("Alpha"), &AuthContext::default())
            .await
            .unwrap_err();
        assert_eq!(
            err,
            CommandError::ValidationFailure("Projekt existiert bereits.".to_string())
        );
    }

    #[tokio::test]
    async fn test_dispatch_error_becomes_action_fault() {
        let mut dispatcher = MockActionDispatcher::new();
        dispatcher
            .expect_validate()
            .returning(|_, _| Ok(Verdict::Valid));
        dispatcher
            .expect_invoke()
            .returning(|_, _, _| Err(anyhow::anyhow!("store unavailable")));

        let err = executor(dispatcher, allow_all())
            .execute(&create_project(), &title("Alpha"), &AuthContext::default())
            .await
            .unwrap_err();
        assert_eq!(err, CommandError::ActionFault("store unavailable".to_string()));
    }

    #[tokio::test]
    async fn test_dispatch_panic_becomes_action_fault() {
        struct Panicking;

        #[async_trait::async_trait]
        impl ActionDispatcher for Panicking {
            async fn validate(&self, _: &ActionId, _: &Params) -> anyhow::Result<Verdict> {
                Ok(Verdict::Valid)
            }

            async fn invoke(
                &self,
                _: &ActionId,
                _: &Params,
                _: &AuthContext,
            ) -> anyhow::Result<ActionOutcome> {
                panic!("boom")
            }
        }

        let exec = Executor::new(Arc::new(Panicking), Arc::new(allow_all()), Messages::default());
        let err = exec
            .execute(&create_project(), &title("Alpha"), &AuthContext::default())
            .await
            .unwrap_err();
        assert!(matches!(err, CommandError::ActionFault(_)));
    }

    #[tokio::test]
    async fn test_validation_panic_becomes_action_fault() {
        struct PanickingValidate;

        #[async_trait::async_trait]
        impl ActionDispatcher for PanickingValidate {
            async fn validate(&self, _: &ActionId, _: &Params) -> anyhow::Result<Verdict> {
                panic!("store index corrupt")
            }

            async fn invoke(
                &self,
                _: &ActionId,
                _: &Params,
                _: &AuthContext,
            ) -> anyhow::Result<ActionOutcome> {
                Ok(ActionOutcome::new("unreachable"))
            }
        }

        let exec = Executor::new(
            Arc::new(PanickingValidate),
            Arc::new(allow_all()),
            Messages::default(),
        );
        let err = exec
            .execute(&create_project(), &title("Alpha"), &AuthContext::default())
            .await
            .unwrap_err();
        assert_eq!(err, CommandError::ActionFault("action panicked".to_string()));
    }

    #[tokio::test]
    async fn test_authorizer_panic_becomes_action_fault() {
        struct PanickingAuthorizer;

        #[async_trait::async_trait]
        impl Authorizer for PanickingAuthorizer {
            async fn can_perform(&self, _: &ActionId, _: &Params, _: &AuthContext) -> bool {
                panic!("role service unreachable")
            }
        }

        let mut dispatcher = MockActionDispatcher::new();
        dispatcher.expect_validate().never();
        dispatcher.expect_invoke().never();
        let exec = Executor::new(
            Arc::new(dispatcher),
            Arc::new(PanickingAuthorizer),
            Messages::default(),
        );
        let err = exec
            .execute(&create_project(), &title("Alpha"), &AuthContext::default())
            .await
            .unwrap_err();
        assert!(matches!(err, CommandError::ActionFault(_)));
    }

    #[tokio::test]
    async fn test_schema_check_runs_before_authorization() {
        let dispatcher = MockActionDispatcher::new();
        let mut authorizer = MockAuthorizer::new();
        authorizer.expect_can_perform().never();

        let exec = executor(dispatcher, authorizer);
        let err = exec
            .execute(&create_project(), &Params::new(), &AuthContext::default())
            .await
            .unwrap_err();
        assert_eq!(
            err,
            CommandError::ValidationFailure("Angabe 'title' fehlt".to_string())
        );

        let mut extra = title("Alpha");
        extra.insert("owner".to_string(), "me".to_string());
        let err = exec
            .execute(&create_project(), &extra, &AuthContext::default())
            .await
            .unwrap_err();
        assert_eq!(
            err,
            CommandError::ValidationFailure("Ungültiger Wert für 'owner'".to_string())
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout() {
        struct Slow;

        #[async_trait::async_trait]
        impl ActionDispatcher for Slow {
            async fn validate(&self, _: &ActionId, _: &Params) -> anyhow::Result<Verdict> {
                Ok(Verdict::Valid)
            }

            async fn invoke(
                &self,
                _: &ActionId,
                _: &Params,
                _: &AuthContext,
            ) -> anyhow::Result<ActionOutcome> {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(ActionOutcome::new("late"))
            }
        }

        let exec = Executor::new(Arc::new(Slow), Arc::new(allow_all()), Messages::default());
        let registry = CommandRegistry::builtin().unwrap();
        let stop = registry.get(&ActionId::new("stopTimer")).unwrap();
        let err = exec
            .execute_with_timeout(stop, &Params::new(), &AuthContext::default(), Duration::from_secs(1))
            .await
            .unwrap_err();
        assert_eq!(err, CommandError::Timeout);
    }
}
