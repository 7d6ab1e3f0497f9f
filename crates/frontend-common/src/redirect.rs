//! Navigation to the login page when a session ends

use gloo::timers::callback::Timeout;
use kolabo_http::{SessionEndHook, SessionEnded};

/// Replaces the window location with the login route after the event's delay
///
/// The delay lets a toast render before the page unloads. `replace` keeps the
/// rejected page out of the history.
#[derive(Debug, Default, Clone, Copy)]
pub struct BrowserRedirect;

impl SessionEndHook for BrowserRedirect {
    fn session_ended(&self, event: &SessionEnded) {
        let route = event.login_route.clone();
        let delay = u32::try_from(event.delay.as_millis()).unwrap_or(u32::MAX);

        tracing::debug!(%route, delay, "Scheduling redirect to login");
        Timeout::new(delay, move || navigate(&route)).forget();
    }
}

fn navigate(route: &str) {
    let Some(window) = web_sys::window() else {
        tracing::warn!(route, "No window to redirect");
        return;
    };

    if let Err(e) = window.location().replace(route) {
        tracing::error!(error = ?e, route, "Redirect to login failed");
    }
}
