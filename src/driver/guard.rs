//! Scoped ownership of a browser session
//!
//! A [`SessionGuard`] is the only way the core holds a session. Callers close
//! it with [`SessionGuard::release`]; if a guard is dropped without being
//! released (early return, panic unwinding, a cancelled future) the close is
//! spawned on the current tokio runtime instead.

use crate::driver::{BrowserSession, Driver, SessionOptions};
use crate::Result;

/// Owns one open browser session until it is released
pub struct SessionGuard {
    session: Option<Box<dyn BrowserSession>>,
    label: String,
}

impl SessionGuard {
    /// Opens a session through the driver and wraps it
    pub async fn acquire(
        driver: &dyn Driver,
        options: &SessionOptions,
        label: impl Into<String>,
    ) -> Result<Self> {
        let label = label.into();
        let session = driver.open_session(options).await?;
        tracing::debug!("Opened {} session for {}", driver.name(), label);
        Ok(Self::new(session, label))
    }

    /// Wraps an already open session
    pub fn new(session: Box<dyn BrowserSession>, label: impl Into<String>) -> Self {
        Self {
            session: Some(session),
            label: label.into(),
        }
    }

    /// Borrows the session
    pub fn session(&mut self) -> &mut dyn BrowserSession {
        self.session
            .as_deref_mut()
            .expect("session is present until release consumes the guard")
    }

    /// What this session is being used for
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Closes the session
    pub async fn release(mut self) -> Result<()> {
        match self.session.take() {
            Some(mut session) => {
                tracing::debug!("Closing session for {}", self.label);
                session.close().await
            }
            None => Ok(()),
        }
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        let Some(mut session) = self.session.take() else {
            return;
        };

        tracing::warn!("Session for {} dropped without release, closing", self.label);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let label = std::mem::take(&mut self.label);
                handle.spawn(async move {
                    if let Err(e) = session.close().await {
                        tracing::warn!("Failed to close session for {}: {}", label, e);
                    }
                });
            }
            Err(_) => {
                tracing::error!(
                    "No async runtime available; session for {} leaked",
                    self.label
                );
            }
        }
    }
}

impl std::fmt::Debug for SessionGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionGuard")
            .field("label", &self.label)
            .field("open", &self.session.is_some())
            .finish()
    }
}
