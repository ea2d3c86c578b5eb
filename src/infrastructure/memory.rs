use crate::domain::{
    actions::{ActionDispatcher, Authorizer, Verdict},
    models::{ActionId, ActionOutcome, AuthContext, Params, TimerSession},
    session::{SessionEvent, SessionProvider},
};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Local, Utc};
use futures::channel::mpsc::{unbounded, UnboundedSender};
use futures::stream::BoxStream;
use futures::StreamExt;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Clone, PartialEq)]
pub struct Project {
    pub slug: String,
    pub title: String,
    pub owner: String,
    pub created_at: DateTime<Local>,
}

#[derive(Default)]
struct Inner {
    projects: BTreeMap<String, Project>,
    timer_ends_at: Option<DateTime<Utc>>,
    subscribers: Vec<UnboundedSender<SessionEvent>>,
}

/// Process-local store backing the palette actions and the timer session.
#[derive(Default)]
pub struct InMemoryWorkspace {
    inner: Mutex<Inner>,
}

/// Lowercase ASCII slug that an identifier slot can address again.
/// German umlauts are transliterated, other non-ASCII letters are dropped
/// and every other run of characters becomes a single dash.
#[must_use]
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    for c in title.chars().flat_map(char::to_lowercase) {
        match c {
            'ä' => slug.push_str("ae"),
            'ö' => slug.push_str("oe"),
            'ü' => slug.push_str("ue"),
            'ß' => slug.push_str("ss"),
            c if c.is_ascii_alphanumeric() => slug.push(c),
            c if c.is_alphanumeric() => {}
            _ => {
                if !slug.is_empty() && !slug.ends_with('-') {
                    slug.push('-');
                }
            }
        }
    }
    slug.trim_end_matches('-').to_string()
}

fn param<'a>(params: &'a Params, name: &str) -> Result<&'a str> {
    params
        .get(name)
        .map(String::as_str)
        .with_context(|| format!("missing parameter `{name}`"))
}

fn page_route(page: &str) -> Option<&'static str> {
    match page {
        "dashboard" => Some("/dashboard"),
        "projekte" => Some("/projects"),
        "einstellungen" => Some("/settings"),
        _ => None,
    }
}

impl InMemoryWorkspace {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>> {
        self.inner
            .lock()
            .map_err(|_| anyhow!("workspace lock poisoned"))
    }

    pub fn project(&self, slug: &str) -> Result<Option<Project>> {
        Ok(self.lock()?.projects.get(slug).cloned())
    }

    pub fn project_count(&self) -> Result<usize> {
        Ok(self.lock()?.projects.len())
    }

    /// Open `events()` subscriptions whose receiver is still alive.
    pub fn subscriber_count(&self) -> Result<usize> {
        let mut inner = self.lock()?;
        inner.subscribers.retain(|tx| !tx.is_closed());
        Ok(inner.subscribers.len())
    }

    fn remaining(inner: &Inner, now: DateTime<Utc>) -> TimerSession {
        match inner.timer_ends_at {
            Some(ends_at) if ends_at > now => {
                let millis = (ends_at - now).num_milliseconds();
                TimerSession::running(millis as f64 / 60_000.0)
            }
            _ => TimerSession::stopped(),
        }
    }

    fn publish(inner: &mut Inner, event: &SessionEvent) {
        inner
            .subscribers
            .retain(|tx| tx.unbounded_send(event.clone()).is_ok());
    }
}

#[async_trait]
impl ActionDispatcher for InMemoryWorkspace {
    async fn validate(&self, action: &ActionId, params: &Params) -> Result<Verdict> {
        let inner = self.lock()?;
        let verdict = match action.as_str() {
            "createProject" => {
                let title = param(params, "title")?;
                let slug = slugify(title);
                if slug.is_empty() {
                    Verdict::Invalid("Der Projektname braucht Buchstaben oder Ziffern.".to_string())
                } else if inner.projects.contains_key(&slug) {
                    Verdict::Invalid(format!("Projekt '{title}' existiert bereits."))
                } else {
                    Verdict::Valid
                }
            }
            "openProject" | "deleteProject" => {
                let slug = param(params, "slug")?;
                if inner.projects.contains_key(slug) {
                    Verdict::Valid
                } else {
                    Verdict::Invalid(format!("Projekt '{slug}' nicht gefunden."))
                }
            }
            "renameProject" => {
                let slug = param(params, "slug")?;
                let new_slug = slugify(param(params, "title")?);
                if !inner.projects.contains_key(slug) {
                    Verdict::Invalid(format!("Projekt '{slug}' nicht gefunden."))
                } else if new_slug.is_empty() {
                    Verdict::Invalid("Der Projektname braucht Buchstaben oder Ziffern.".to_string())
                } else if new_slug != slug && inner.projects.contains_key(&new_slug) {
                    Verdict::Invalid(format!("Projekt '{new_slug}' existiert bereits."))
                } else {
                    Verdict::Valid
                }
            }
            "startTimer" => {
                if Self::remaining(&inner, Utc::now()).is_active {
                    Verdict::Invalid("Es läuft bereits ein Timer.".to_string())
                } else {
                    Verdict::Valid
                }
            }
            "stopTimer" => {
                if Self::remaining(&inner, Utc::now()).is_active {
                    Verdict::Valid
                } else {
                    Verdict::Invalid("Es läuft kein Timer.".to_string())
                }
            }
            "navigate" => match page_route(param(params, "page")?) {
                Some(_) => Verdict::Valid,
                None => Verdict::Invalid("Diese Seite gibt es nicht.".to_string()),
            },
            other => return Err(anyhow!("no handler for action `{other}`")),
        };
        Ok(verdict)
    }

    async fn invoke(
        &self,
        action: &ActionId,
        params: &Params,
        auth: &AuthContext,
    ) -> Result<ActionOutcome> {
        let mut inner = self.lock()?;
        match action.as_str() {
            "createProject" => {
                let title = param(params, "title")?;
                let slug = slugify(title);
                // Validation ran without holding the lock.
                if inner.projects.contains_key(&slug) {
                    return Err(anyhow!("project `{slug}` was created concurrently"));
                }
                inner.projects.insert(
                    slug.clone(),
                    Project {
                        slug: slug.clone(),
                        title: title.to_string(),
                        owner: auth.user_id.clone(),
                        created_at: Local::now(),
                    },
                );
                Ok(ActionOutcome::new(format!("Projekt '{title}' wurde angelegt."))
                    .navigate(format!("/projects/{slug}")))
            }
            "openProject" => {
                let slug = param(params, "slug")?;
                let project = inner
                    .projects
                    .get(slug)
                    .with_context(|| format!("project `{slug}` disappeared"))?;
                Ok(ActionOutcome::new(format!("Projekt '{}' geöffnet.", project.title))
                    .navigate(format!("/projects/{slug}")))
            }
            "deleteProject" => {
                let slug = param(params, "slug")?;
                let project = inner
                    .projects
                    .remove(slug)
                    .with_context(|| format!("project `{slug}` disappeared"))?;
                Ok(ActionOutcome::new(format!("Projekt '{}' wurde gelöscht.", project.title))
                    .navigate("/projects"))
            }
            "renameProject" => {
                let slug = param(params, "slug")?;
                let title = param(params, "title")?;
                let new_slug = slugify(title);
                if !inner.projects.contains_key(slug) {
                    return Err(anyhow!("project `{slug}` disappeared"));
                }
                if new_slug.is_empty() {
                    return Err(anyhow!("title `{title}` has no usable characters"));
                }
                if new_slug != slug && inner.projects.contains_key(&new_slug) {
                    return Err(anyhow!("project `{new_slug}` was created concurrently"));
                }
                let mut project = inner
                    .projects
                    .remove(slug)
                    .with_context(|| format!("project `{slug}` disappeared"))?;
                project.slug = new_slug.clone();
                project.title = title.to_string();
                inner.projects.insert(new_slug.clone(), project);
                Ok(ActionOutcome::new(format!("Projekt heißt jetzt '{title}'."))
                    .navigate(format!("/projects/{new_slug}")))
            }
            "startTimer" => {
                let minutes: i64 = param(params, "minutes")?
                    .parse()
                    .context("minutes is not a number")?;
                let now = Utc::now();
                inner.timer_ends_at = Some(now + chrono::Duration::minutes(minutes));
                let session = Self::remaining(&inner, now);
                Self::publish(&mut inner, &SessionEvent::Started(session));
                Ok(ActionOutcome::new(format!("Timer für {minutes} Minuten gestartet.")))
            }
            "stopTimer" => {
                inner.timer_ends_at = None;
                Self::publish(&mut inner, &SessionEvent::Stopped);
                Ok(ActionOutcome::new("Timer gestoppt."))
            }
            "navigate" => {
                let page = param(params, "page")?;
                let route = page_route(page).with_context(|| format!("unknown page `{page}`"))?;
                Ok(ActionOutcome::new(format!("Wechsle zu {page}.")).navigate(route))
            }
            other => Err(anyhow!("no handler for action `{other}`")),
        }
    }
}

#[async_trait]
impl SessionProvider for InMemoryWorkspace {
    async fn fetch(&self) -> Result<TimerSession> {
        let mut inner = self.lock()?;
        let now = Utc::now();
        let session = Self::remaining(&inner, now);
        if !session.is_active {
            inner.timer_ends_at = None;
        }
        Ok(session)
    }

    fn events(&self) -> BoxStream<'static, SessionEvent> {
        let (tx, rx) = unbounded();
        if let Ok(mut inner) = self.inner.lock() {
            inner.subscribers.push(tx);
        }
        rx.boxed()
    }
}

/// Role-based authorizer: each action needs one role, `member` by default.
#[derive(Debug, Clone)]
pub struct RoleAuthorizer {
    rules: BTreeMap<ActionId, String>,
    default_role: String,
}

impl Default for RoleAuthorizer {
    fn default() -> Self {
        Self {
            rules: BTreeMap::from([(ActionId::new("deleteProject"), "admin".to_string())]),
            default_role: "member".to_string(),
        }
    }
}

impl RoleAuthorizer {
    #[must_use]
    pub fn require(mut self, action: &str, role: &str) -> Self {
        self.rules.insert(ActionId::new(action), role.to_string());
        self
    }
}

#[async_trait]
impl Authorizer for RoleAuthorizer {
    async fn can_perform(&self, action: &ActionId, _params: &Params, auth: &AuthContext) -> bool {
        let role = self.rules.get(action).unwrap_or(&self.default_role);
        auth.has_role(role) || auth.has_role("admin")
    }
}
