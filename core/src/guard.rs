//! Page-level session utilities: `logout` and `check_auth`.
//!
//! These are navigation guards for the UI, not a security boundary. The
//! backend still has to reject requests carrying the wrong token or role.

use tracing::info;
use url::form_urlencoded;

use crate::error::StorageError;
use crate::session::SessionStore;

/// Landing page shown after logout.
pub const INDEX_PAGE: &str = "/index.html";

/// Login page; takes the role being signed into as `?role=`.
pub const LOGIN_PAGE: &str = "/login.html";

/// Message shown when the stored role does not match the page's role.
pub const UNAUTHORIZED_MESSAGE: &str = "Unauthorized";

/// Page side effects the guards trigger.
pub trait Navigator {
    fn navigate(&self, location: &str);
    fn alert(&self, message: &str);
}

impl<N: Navigator + ?Sized> Navigator for &N {
    fn navigate(&self, location: &str) {
        (**self).navigate(location)
    }

    fn alert(&self, message: &str) {
        (**self).alert(message)
    }
}

/// Result of `check_auth`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    /// A token is stored and the role matches (or no role was required).
    Granted,
    /// No token; the user was sent to the login page.
    Unauthenticated,
    /// Signed in under another role; alerted and sent to the login page.
    RoleMismatch { stored: Option<String> },
}

impl AuthOutcome {
    pub fn is_granted(&self) -> bool {
        matches!(self, AuthOutcome::Granted)
    }
}

/// Login page URL for `role`. Without a role the query string is omitted.
pub fn login_url(role: Option<&str>) -> String {
    match role {
        Some(role) => {
            let query: String = form_urlencoded::Serializer::new(String::new())
                .append_pair("role", role)
                .finish();
            format!("{LOGIN_PAGE}?{query}")
        }
        None => LOGIN_PAGE.to_string(),
    }
}

/// Clear all stored session data, then go to the landing page.
///
/// If clearing fails the user stays on the page, so a half-cleared session
/// is never mistaken for a logged-out one.
pub fn logout<S, N>(store: &S, navigator: &N) -> Result<(), StorageError>
where
    S: SessionStore + ?Sized,
    N: Navigator + ?Sized,
{
    store.clear()?;
    info!("session cleared, returning to landing page");
    navigator.navigate(INDEX_PAGE);
    Ok(())
}

/// Send the user to the login page unless they hold a token and, when
/// `required_role` is given, the matching role.
pub fn check_auth<S, N>(store: &S, navigator: &N, required_role: Option<&str>) -> AuthOutcome
where
    S: SessionStore + ?Sized,
    N: Navigator + ?Sized,
{
    if store.token().is_none() {
        info!(required_role = ?required_role, "no session token, redirecting to login");
        navigator.navigate(&login_url(required_role));
        return AuthOutcome::Unauthenticated;
    }

    let Some(required) = required_role else {
        return AuthOutcome::Granted;
    };

    let stored = store.role();
    if stored.as_deref() == Some(required) {
        return AuthOutcome::Granted;
    }

    info!(required_role = required, stored_role = ?stored, "role mismatch, redirecting to login");
    navigator.alert(UNAUTHORIZED_MESSAGE);
    navigator.navigate(&login_url(Some(required)));
    AuthOutcome::RoleMismatch { stored }
}
