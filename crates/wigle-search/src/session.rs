//! One background worker per logical session

use std::fmt;
use std::thread::{self, JoinHandle};

use wigle_core::CancellationToken;

#[derive(Debug)]
pub enum SessionError {
    /// A run is still active on this session
    Busy(String),
    Spawn(std::io::Error),
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Busy(name) => write!(f, "session '{name}' already has an active run"),
            Self::Spawn(e) => write!(f, "failed to spawn worker: {e}"),
        }
    }
}

impl std::error::Error for SessionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Spawn(e) => Some(e),
            Self::Busy(_) => None,
        }
    }
}

/// Handle to at most one running worker.
///
/// Every start gets a fresh cancellation token, so cancelling one run never
/// leaks into the next. Starting while a run is active is rejected, not
/// queued.
pub struct Session<T> {
    name: String,
    cancel: CancellationToken,
    worker: Option<JoinHandle<T>>,
}

impl<T: Send + 'static> Session<T> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cancel: CancellationToken::new(),
            worker: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_active(&self) -> bool {
        self.worker.as_ref().is_some_and(|w| !w.is_finished())
    }

    /// Spawn `work` on a dedicated thread, handing it this run's token.
    pub fn start<F>(&mut self, work: F) -> Result<(), SessionError>
    where
        F: FnOnce(CancellationToken) -> T + Send + 'static,
    {
        if self.is_active() {
            log::warn!("{}: a run is already in progress", self.name);
            return Err(SessionError::Busy(self.name.clone()));
        }
        // Reap a finished worker nobody waited for
        if let Some(done) = self.worker.take() {
            let _ = done.join();
        }

        self.cancel = CancellationToken::new();
        let token = self.cancel.clone();
        let worker = thread::Builder::new()
            .name(format!("session-{}", self.name))
            .spawn(move || work(token))
            .map_err(SessionError::Spawn)?;
        self.worker = Some(worker);
        Ok(())
    }

    /// Ask the active run to stop at its next iteration boundary.
    pub fn cancel(&self) {
        if self.is_active() {
            log::info!("{}: stop requested", self.name);
        }
        self.cancel.cancel();
    }

    /// Block until the worker ends. A panicking worker is logged and
    /// yields `None`.
    pub fn wait(&mut self) -> Option<T> {
        let worker = self.worker.take()?;
        match worker.join() {
            Ok(value) => Some(value),
            Err(_) => {
                log::error!("{}: worker panicked", self.name);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::time::Duration;

    #[test]
    fn second_start_while_active_is_rejected() {
        let mut session = Session::new("wifi");
        let (release, gate) = mpsc::channel::<()>();
        session
            .start(move |_| {
                let _ = gate.recv();
                1
            })
            .unwrap();

        assert!(session.is_active());
        assert!(matches!(session.start(|_| 2), Err(SessionError::Busy(_))));

        release.send(()).unwrap();
        assert_eq!(session.wait(), Some(1));
        assert!(!session.is_active());
    }

    #[test]
    fn cancel_reaches_worker_and_next_run_gets_fresh_token() {
        let mut session = Session::new("bt");
        session
            .start(|token| {
                while !token.is_cancelled() {
                    thread::sleep(Duration::from_millis(5));
                }
                "stopped"
            })
            .unwrap();
        session.cancel();
        assert_eq!(session.wait(), Some("stopped"));

        session.start(|token| if token.is_cancelled() { "stale" } else { "fresh" }).unwrap();
        assert_eq!(session.wait(), Some("fresh"));
    }

    #[test]
    fn panicking_worker_yields_none_and_session_recovers() {
        let mut session: Session<u8> = Session::new("cell");
        session.start(|_| panic!("boom")).unwrap();
        assert_eq!(session.wait(), None);
        assert!(!session.is_active());

        session.start(|_| 7).unwrap();
        assert_eq!(session.wait(), Some(7));
    }

    #[test]
    fn release_profile_unwinds_so_worker_panics_are_caught() {
        let manifest = include_str!("../../../Cargo.toml");
        let release = manifest
            .split("[profile.release]")
            .nth(1)
            .and_then(|rest| rest.split("\n[").next())
            .unwrap_or_default();
        assert!(!release.contains("panic"), "release profile must keep panic = unwind");
    }
}
