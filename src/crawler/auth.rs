//! Authentication flow
//!
//! Two states: a session is either already good (the start URL loads without
//! a redirect) or a login is needed. Login is attempted once per run; a
//! failed login is fatal rather than retried against a live credential form.

use crate::config::SourceConfig;
use crate::crawler::navigate_paced;
use crate::driver::{DriverError, PageDriver};
use crate::storage::SessionStore;
use crate::ComicerError;
use std::time::Duration;

/// Whether the driver's session can see the start page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    Unauthenticated,
    Authenticated,
}

impl AuthState {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated)
    }
}

/// Brings a driver into the `Authenticated` state for one source
pub struct AuthenticationFlow<'a> {
    source: &'a SourceConfig,
    host: &'a str,
    sessions: &'a SessionStore,
    delay: Duration,
}

impl<'a> AuthenticationFlow<'a> {
    pub fn new(
        source: &'a SourceConfig,
        host: &'a str,
        sessions: &'a SessionStore,
        delay: Duration,
    ) -> Self {
        Self {
            source,
            host,
            sessions,
            delay,
        }
    }

    /// Navigates to the start URL and reports whether it stayed there
    ///
    /// Being redirected anywhere else (typically the login page) means the
    /// session is not authenticated.
    pub async fn check<D: PageDriver>(&self, driver: &mut D) -> Result<AuthState, ComicerError> {
        let navigation = navigate_paced(driver, &self.source.start_url, self.delay).await?;

        if navigation.url == self.source.start_url {
            Ok(AuthState::Authenticated)
        } else {
            tracing::debug!(
                "Start URL {} landed on {}",
                self.source.start_url,
                navigation.url
            );
            Ok(AuthState::Unauthenticated)
        }
    }

    /// Submits the login form once and verifies the result
    ///
    /// # Errors
    ///
    /// * `MissingCredentials` - username or password not configured
    /// * `LoginFailed` - still unauthenticated after submitting
    pub async fn login<D: PageDriver>(&self, driver: &mut D) -> Result<(), ComicerError> {
        let (username, password) =
            self.source
                .credentials()
                .ok_or_else(|| ComicerError::MissingCredentials {
                    source_name: self.source.name.clone(),
                })?;

        tracing::info!("Logging in to {} as {}", self.host, username);
        navigate_paced(driver, &self.source.login_url, self.delay).await?;
        driver.fill(&self.source.username_selector, username).await?;
        driver.fill(&self.source.password_selector, password).await?;
        driver.click(&self.source.login_submit_selector).await?;

        if !self.check(driver).await?.is_authenticated() {
            return Err(ComicerError::LoginFailed {
                url: self.source.start_url.to_string(),
            });
        }

        Ok(())
    }

    /// Restores any saved session, logs in if it is not good, and saves the
    /// fresh session after a successful login
    pub async fn ensure<D: PageDriver>(&self, driver: &mut D) -> Result<(), ComicerError> {
        if let Some(state) = self.sessions.load(self.host)? {
            match driver.restore_session(&state).await {
                Ok(()) => {}
                Err(DriverError::Session(e)) => {
                    tracing::warn!("Ignoring unusable saved session for {}: {}", self.host, e);
                }
                Err(e) => return Err(e.into()),
            }
        }

        if self.check(driver).await?.is_authenticated() {
            tracing::info!("Reusing saved session for {}", self.host);
            return Ok(());
        }

        self.login(driver).await?;

        let state = driver.persist_session().await?;
        self.sessions.save(self.host, &state)?;
        tracing::info!(
            "Logged in to {}; session saved to {}",
            self.host,
            self.sessions.path_for(self.host).display()
        );

        Ok(())
    }
}
