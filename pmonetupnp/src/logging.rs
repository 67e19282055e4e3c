//! Port de journalisation injecté dans les composants du moteur.
//!
//! Chaque composant à longue durée de vie ([`ControlPoint`](crate::ControlPoint),
//! [`DeviceServer`](crate::DeviceServer), listes de serveurs SSDP) reçoit un
//! [`Logger`] à sa construction. Les threads d'écoute l'installent comme
//! dispatcher par défaut, si bien que les macros `tracing` émises par le
//! moteur aboutissent dans le sink choisi par l'appelant.
//!
//! Le logger par défaut est muet.

use std::fmt;

use tracing::{Dispatch, dispatcher};
use tracing_subscriber::EnvFilter;

/// Handle clonable vers un sink `tracing`.
#[derive(Clone)]
pub struct Logger {
    dispatch: Dispatch,
}

impl Logger {
    /// Logger muet.
    pub fn none() -> Self {
        Self {
            dispatch: Dispatch::none(),
        }
    }

    /// Capture le dispatcher par défaut du thread appelant.
    pub fn current() -> Self {
        Self {
            dispatch: dispatcher::get_default(|d| d.clone()),
        }
    }

    pub fn from_dispatch(dispatch: Dispatch) -> Self {
        Self { dispatch }
    }

    /// Logger écrivant sur stderr, filtré par une directive `EnvFilter`
    /// (`"info"`, `"pmonetupnp=debug"`, ...).
    ///
    /// Une directive invalide retombe sur `info`.
    pub fn stderr(filter: &str) -> Self {
        let filter = EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new("info"));
        let subscriber = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(true)
            .finish();
        Self {
            dispatch: Dispatch::new(subscriber),
        }
    }

    /// Exécute `f` avec ce logger comme dispatcher par défaut.
    pub fn scope<T>(&self, f: impl FnOnce() -> T) -> T {
        dispatcher::with_default(&self.dispatch, f)
    }

    /// Installe ce logger comme dispatcher par défaut du thread courant
    /// jusqu'à la destruction du guard.
    pub fn enter(&self) -> dispatcher::DefaultGuard {
        dispatcher::set_default(&self.dispatch)
    }

    pub fn dispatch(&self) -> &Dispatch {
        &self.dispatch
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::none()
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_logger_is_silent() {
        let logger = Logger::default();
        let enabled = logger.scope(|| tracing::enabled!(tracing::Level::ERROR));
        assert!(!enabled);
    }

    #[test]
    fn test_stderr_logger_respects_filter() {
        let logger = Logger::stderr("warn");
        logger.scope(|| {
            assert!(tracing::enabled!(tracing::Level::WARN));
            assert!(!tracing::enabled!(tracing::Level::DEBUG));
        });
    }

    #[test]
    fn test_enter_guard_installs_dispatcher() {
        let logger = Logger::stderr("info");
        let _guard = logger.enter();
        assert!(tracing::enabled!(tracing::Level::INFO));
    }
}
