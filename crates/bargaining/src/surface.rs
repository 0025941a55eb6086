use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use crate::model::Price;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Success,
    Info,
    Warning,
    Error,
}

impl Severity {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

/// Where to go after an accepted offer, with the agreed terms when the server sends them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationTarget {
    pub url: String,
    pub agreed_price: Option<Price>,
    pub quantity: Option<u32>,
}

impl NavigationTarget {
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            agreed_price: None,
            quantity: None,
        }
    }

    /// Absolute URL; relative targets are joined onto `base_url`.
    #[must_use]
    pub fn resolve(&self, base_url: &str) -> String {
        if self.url.starts_with("http://") || self.url.starts_with("https://") {
            return self.url.clone();
        }
        let base = base_url.trim_end_matches('/');
        if self.url.starts_with('/') {
            format!("{base}{}", self.url)
        } else {
            format!("{base}/{}", self.url)
        }
    }
}

/// Confirm dialogs and transient notices.
#[async_trait]
pub trait DialogSurface: Send + Sync {
    /// Blocks the flow until the user decides.
    async fn confirm(&self, message: &str) -> bool;

    fn notify(&self, message: &str, severity: Severity);
}

/// Scheduled page changes. Once scheduled they are not cancellable.
pub trait Navigator: Send + Sync {
    fn schedule_redirect(&self, target: &NavigationTarget, delay: Duration);

    fn schedule_reload(&self, delay: Duration);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceEvent {
    Confirm(String),
    Notify { message: String, severity: Severity },
    Redirect { target: NavigationTarget, delay: Duration },
    Reload { delay: Duration },
}

/// In-memory surface and navigator with scripted confirm answers.
#[derive(Debug)]
pub struct RecordingSurface {
    default_answer: bool,
    answers: Mutex<VecDeque<bool>>,
    events: Mutex<Vec<SurfaceEvent>>,
}

impl RecordingSurface {
    #[must_use]
    pub fn new(default_answer: bool) -> Self {
        Self {
            default_answer,
            answers: Mutex::new(VecDeque::new()),
            events: Mutex::new(Vec::new()),
        }
    }

    #[must_use]
    pub fn confirming() -> Self {
        Self::new(true)
    }

    #[must_use]
    pub fn declining() -> Self {
        Self::new(false)
    }

    /// Answers consumed in order before falling back to the default.
    #[must_use]
    pub fn with_answers(self, answers: impl IntoIterator<Item = bool>) -> Self {
        lock(&self.answers).extend(answers);
        self
    }

    #[must_use]
    pub fn events(&self) -> Vec<SurfaceEvent> {
        lock(&self.events).clone()
    }

    #[must_use]
    pub fn notifications(&self) -> Vec<(String, Severity)> {
        lock(&self.events)
            .iter()
            .filter_map(|event| match event {
                SurfaceEvent::Notify { message, severity } => Some((message.clone(), *severity)),
                _ => None,
            })
            .collect()
    }

    #[must_use]
    pub fn redirects(&self) -> Vec<(NavigationTarget, Duration)> {
        lock(&self.events)
            .iter()
            .filter_map(|event| match event {
                SurfaceEvent::Redirect { target, delay } => Some((target.clone(), *delay)),
                _ => None,
            })
            .collect()
    }

    #[must_use]
    pub fn reloads(&self) -> Vec<Duration> {
        lock(&self.events)
            .iter()
            .filter_map(|event| match event {
                SurfaceEvent::Reload { delay } => Some(*delay),
                _ => None,
            })
            .collect()
    }

    fn record(&self, event: SurfaceEvent) {
        lock(&self.events).push(event);
    }
}

impl Default for RecordingSurface {
    fn default() -> Self {
        Self::confirming()
    }
}

#[async_trait]
impl DialogSurface for RecordingSurface {
    async fn confirm(&self, message: &str) -> bool {
        self.record(SurfaceEvent::Confirm(message.to_string()));
        lock(&self.answers)
            .pop_front()
            .unwrap_or(self.default_answer)
    }

    fn notify(&self, message: &str, severity: Severity) {
        self.record(SurfaceEvent::Notify {
            message: message.to_string(),
            severity,
        });
    }
}

impl Navigator for RecordingSurface {
    fn schedule_redirect(&self, target: &NavigationTarget, delay: Duration) {
        self.record(SurfaceEvent::Redirect {
            target: target.clone(),
            delay,
        });
    }

    fn schedule_reload(&self, delay: Duration) {
        self.record(SurfaceEvent::Reload { delay });
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
