//! One-shot handling of unrecoverable authorization failures

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Why a session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEndReason {
    /// A refresh was attempted and failed, or the refresh endpoint itself rejected us
    SessionExpired,
    /// There was nothing to refresh with, or the replayed request was rejected again
    NotAuthenticated,
}

impl SessionEndReason {
    /// User-facing message
    pub const fn message(self) -> &'static str {
        match self {
            Self::SessionExpired => "Session expired, please login again",
            Self::NotAuthenticated => "Please login to continue",
        }
    }

    /// User-facing title
    pub const fn title(self) -> &'static str {
        match self {
            Self::SessionExpired => "Session Ended",
            Self::NotAuthenticated => "Not Authenticated",
        }
    }
}

/// Event handed to the [`SessionEndHook`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionEnded {
    pub message: String,
    pub title: String,
    /// Route of the login entry point
    pub login_route: String,
    /// How long to wait before navigating, so a notification can render
    pub delay: Duration,
}

/// Surfaces an error to the user (a toast, a status line, ...)
pub trait Notifier: Send + Sync {
    fn notify_error(&self, message: &str, title: &str);
}

impl<F> Notifier for F
where
    F: Fn(&str, &str) + Send + Sync,
{
    fn notify_error(&self, message: &str, title: &str) {
        self(message, title);
    }
}

/// Reacts to the end of a session; in a browser this navigates to the login page
pub trait SessionEndHook: Send + Sync {
    fn session_ended(&self, event: &SessionEnded);
}

impl<F> SessionEndHook for F
where
    F: Fn(&SessionEnded) + Send + Sync,
{
    fn session_ended(&self, event: &SessionEnded) {
        self(event);
    }
}

/// Fires the notifier and the session-end hook at most once
pub struct SessionTerminator {
    fired: AtomicBool,
    notifier: Option<Arc<dyn Notifier>>,
    hook: Option<Arc<dyn SessionEndHook>>,
    login_route: String,
    delay: Duration,
}

impl SessionTerminator {
    pub fn new(login_route: impl Into<String>, delay: Duration) -> Self {
        Self {
            fired: AtomicBool::new(false),
            notifier: None,
            hook: None,
            login_route: login_route.into(),
            delay,
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn with_hook(mut self, hook: Arc<dyn SessionEndHook>) -> Self {
        self.hook = Some(hook);
        self
    }

    /// End the session for `reason`; see [`handle_terminal_failure`](Self::handle_terminal_failure)
    pub fn terminate(&self, reason: SessionEndReason) -> bool {
        self.handle_terminal_failure(reason.message(), reason.title())
    }

    /// Notify the user and signal the end of the session, once
    ///
    /// Later calls are no-ops, so any number of concurrently failing requests
    /// produce a single notification and a single navigation. Returns whether
    /// this call was the one that fired.
    pub fn handle_terminal_failure(&self, message: &str, title: &str) -> bool {
        if self.fired.swap(true, Ordering::SeqCst) {
            tracing::debug!(title, "Session already ended");
            return false;
        }

        tracing::info!(title, message, login_route = %self.login_route, "Session ended");

        if let Some(notifier) = &self.notifier {
            notifier.notify_error(message, title);
        }

        if let Some(hook) = &self.hook {
            hook.session_ended(&SessionEnded {
                message: message.to_string(),
                title: title.to_string(),
                login_route: self.login_route.clone(),
                delay: self.delay,
            });
        }

        true
    }

    /// Whether the session-ended signal has fired
    pub fn has_fired(&self) -> bool {
        self.fired.load(Ordering::SeqCst)
    }
}

impl std::fmt::Debug for SessionTerminator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionTerminator")
            .field("fired", &self.has_fired())
            .field("has_notifier", &self.notifier.is_some())
            .field("has_hook", &self.hook.is_some())
            .field("login_route", &self.login_route)
            .field("delay", &self.delay)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::mock;
    use mockall::predicate::eq;

    mock! {
        pub Toasts {}

        impl Notifier for Toasts {
            fn notify_error(&self, message: &str, title: &str);
        }
    }

    mock! {
        pub Navigator {}

        impl SessionEndHook for Navigator {
            fn session_ended(&self, event: &SessionEnded);
        }
    }

    #[test]
    fn concurrent_failures_fire_once() {
        let mut toasts = MockToasts::new();
        toasts
            .expect_notify_error()
            .with(eq("Session expired, please login again"), eq("Session Ended"))
            .times(1)
            .return_const(());

        let mut navigator = MockNavigator::new();
        navigator
            .expect_session_ended()
            .withf(|event| {
                event.login_route == "/login-register" && event.delay == Duration::from_millis(40)
            })
            .times(1)
            .return_const(());

        let terminator = SessionTerminator::new("/login-register", Duration::from_millis(40))
            .with_notifier(Arc::new(toasts))
            .with_hook(Arc::new(navigator));

        let fired: usize = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| scope.spawn(|| terminator.terminate(SessionEndReason::SessionExpired)))
                .collect();
            handles
                .into_iter()
                .map(|h| usize::from(h.join().unwrap()))
                .sum()
        });

        assert_eq!(fired, 1);
        assert!(terminator.has_fired());
    }

    #[test]
    fn works_without_collaborators() {
        let terminator = SessionTerminator::new("/login", Duration::ZERO);
        assert!(terminator.handle_terminal_failure("Please login to continue", "Not Authenticated"));
        assert!(!terminator.handle_terminal_failure("again", "again"));
    }

    #[test]
    fn closures_are_collaborators() {
        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
        let notifier = {
            let seen = seen.clone();
            move |message: &str, title: &str| {
                seen.lock().unwrap().push(format!("{title}: {message}"));
            }
        };

        let terminator =
            SessionTerminator::new("/login", Duration::ZERO).with_notifier(Arc::new(notifier));
        terminator.terminate(SessionEndReason::NotAuthenticated);
        terminator.terminate(SessionEndReason::SessionExpired);

        assert_eq!(
            *seen.lock().unwrap(),
            vec!["Not Authenticated: Please login to continue".to_string()]
        );
    }
}
