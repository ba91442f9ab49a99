//! Where the user is sent once the session cannot be recovered.

use tracing::warn;

/// A sink capable of moving the user to another screen.
pub trait Navigator: Send + Sync {
    fn redirect(&self, location: &str);
}

/// Logs the redirect. Used by the CLI, which has no screens to switch.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNavigator;

impl Navigator for TracingNavigator {
    fn redirect(&self, location: &str) {
        warn!(
            event_name = "navigation.redirect",
            event_domain = "navigation",
            location,
            "session expired; sign in again"
        );
    }
}

/// Forwards redirects to an arbitrary closure, e.g. a UI router handle.
pub struct CallbackNavigator<F>
where
    F: Fn(&str) + Send + Sync,
{
    callback: F,
}

impl<F> CallbackNavigator<F>
where
    F: Fn(&str) + Send + Sync,
{
    pub fn new(callback: F) -> Self {
        CallbackNavigator { callback }
    }
}

impl<F> Navigator for CallbackNavigator<F>
where
    F: Fn(&str) + Send + Sync,
{
    fn redirect(&self, location: &str) {
        (self.callback)(location)
    }
}
