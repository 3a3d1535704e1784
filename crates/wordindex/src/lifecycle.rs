//! Running/terminated state shared by the manager and its background threads.

use std::sync::atomic::{AtomicU8, Ordering};

use crate::error::{IndexError, Result};

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
#[repr(u8)]
pub enum LifecycleState {
    Running = 0,
    Terminated = 1,
}

impl LifecycleState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Running,
            _ => Self::Terminated,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Terminated => "terminated",
        }
    }
}

/// Lifecycle flag. Starts `Running` and moves to `Terminated` exactly once.
#[derive(Debug, Default)]
pub struct Lifecycle {
    state: AtomicU8,
}

impl Lifecycle {
    pub fn new() -> Self {
        Self {
            state: AtomicU8::new(LifecycleState::Running as u8),
        }
    }

    pub fn state(&self) -> LifecycleState {
        LifecycleState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn is_running(&self) -> bool {
        self.state() == LifecycleState::Running
    }

    /// Fails with [`IndexError::Terminated`] once shutdown has begun.
    pub fn ensure_running(&self) -> Result<()> {
        if self.is_running() {
            Ok(())
        } else {
            Err(IndexError::Terminated)
        }
    }

    /// Transitions to `Terminated`. Returns true only for the call that
    /// performed the transition.
    pub fn terminate(&self) -> bool {
        self.state
            .compare_exchange(
                LifecycleState::Running as u8,
                LifecycleState::Terminated as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn starts_running() {
        let lifecycle = Lifecycle::new();
        assert_eq!(lifecycle.state(), LifecycleState::Running);
        assert!(lifecycle.ensure_running().is_ok());
    }

    #[test]
    fn terminate_transitions_once() {
        let lifecycle = Lifecycle::new();
        assert!(lifecycle.terminate());
        assert!(!lifecycle.terminate());
        assert_eq!(lifecycle.state().as_str(), "terminated");
        assert!(matches!(
            lifecycle.ensure_running(),
            Err(IndexError::Terminated)
        ));
    }

    #[test]
    fn concurrent_terminate_has_single_winner() {
        let lifecycle = Arc::new(Lifecycle::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let lifecycle = lifecycle.clone();
                thread::spawn(move || lifecycle.terminate())
            })
            .collect();
        let winners = handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .filter(|won| *won)
            .count();
        assert_eq!(winners, 1);
    }
}
