use std::io::{self, BufRead, Write};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use bargaining::{DialogSurface, NavigationTarget, Navigator, Severity};
use tokio::task::JoinHandle;

/// Prompts on stdin and prints notices to stdout.
pub struct ConsoleSurface {
    assume_yes: bool,
}

impl ConsoleSurface {
    #[must_use]
    pub fn new(assume_yes: bool) -> Self {
        Self { assume_yes }
    }
}

#[async_trait]
impl DialogSurface for ConsoleSurface {
    async fn confirm(&self, message: &str) -> bool {
        if self.assume_yes {
            println!("{message} [y/N] y");
            return true;
        }

        let prompt = format!("{message} [y/N] ");
        let answer = tokio::task::spawn_blocking(move || {
            let mut stdout = io::stdout();
            write!(stdout, "{prompt}")?;
            stdout.flush()?;
            let mut line = String::new();
            io::stdin().lock().read_line(&mut line)?;
            Ok::<_, io::Error>(line)
        })
        .await;

        match answer {
            Ok(Ok(line)) => is_yes(&line),
            Ok(Err(error)) => {
                tracing::warn!(error = %error, "failed to read confirmation");
                false
            }
            Err(error) => {
                tracing::warn!(error = %error, "confirmation task failed");
                false
            }
        }
    }

    fn notify(&self, message: &str, severity: Severity) {
        println!("[{}] {message}", severity.as_str());
    }
}

#[must_use]
pub fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

/// Prints scheduled navigation once its delay has elapsed.
pub struct ConsoleNavigator {
    base_url: String,
    pending: Mutex<Vec<JoinHandle<()>>>,
}

impl ConsoleNavigator {
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            pending: Mutex::new(Vec::new()),
        }
    }

    /// Waits for every scheduled navigation to fire.
    pub async fn settle(&self) {
        let handles = std::mem::take(
            &mut *self
                .pending
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        );
        for handle in handles {
            if let Err(error) = handle.await {
                tracing::warn!(error = %error, "navigation task failed");
            }
        }
    }

    fn schedule(&self, delay: Duration, line: String) {
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            println!("{line}");
        });
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(handle);
    }
}

impl Navigator for ConsoleNavigator {
    fn schedule_redirect(&self, target: &NavigationTarget, delay: Duration) {
        self.schedule(delay, describe_redirect(target, &self.base_url));
    }

    fn schedule_reload(&self, delay: Duration) {
        self.schedule(delay, "-> reload".to_string());
    }
}

fn describe_redirect(target: &NavigationTarget, base_url: &str) -> String {
    let mut line = format!("-> {}", target.resolve(base_url));
    if let Some(price) = target.agreed_price {
        line.push_str(&format!(" (agreed price {}", price.formatted()));
        if let Some(quantity) = target.quantity {
            line.push_str(&format!(", quantity {quantity}"));
        }
        line.push(')');
    }
    line
}
