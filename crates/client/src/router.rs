//! Router boundary.

use std::sync::{Mutex, MutexGuard};

use serde::Serialize;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct NavigateOptions {
    /// Replace the current history entry instead of pushing a new one.
    pub replace: bool,
}

impl NavigateOptions {
    pub fn replace() -> Self {
        Self { replace: true }
    }

    pub fn push() -> Self {
        Self { replace: false }
    }
}

pub trait Router: Send + Sync {
    fn current_path(&self) -> String;

    fn navigate(&self, path: &str, options: NavigateOptions);
}

/// A navigation performed through [`MemoryRouter`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Navigation {
    pub path: String,
    pub replace: bool,
}

#[derive(Debug)]
struct History {
    entries: Vec<String>,
    log: Vec<Navigation>,
}

/// In-memory router with a history stack; records every navigation.
#[derive(Debug)]
pub struct MemoryRouter {
    history: Mutex<History>,
}

impl MemoryRouter {
    pub fn new(initial_path: impl Into<String>) -> Self {
        Self {
            history: Mutex::new(History {
                entries: vec![initial_path.into()],
                log: Vec::new(),
            }),
        }
    }

    /// Simulate user-driven navigation (a link click), without logging it as
    /// a guard navigation.
    pub fn visit(&self, path: impl Into<String>) {
        self.history().entries.push(path.into());
    }

    pub fn navigations(&self) -> Vec<Navigation> {
        self.history().log.clone()
    }

    fn history(&self) -> MutexGuard<'_, History> {
        self.history.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Router for MemoryRouter {
    fn current_path(&self) -> String {
        self.history().entries.last().cloned().unwrap_or_else(|| "/".to_string())
    }

    fn navigate(&self, path: &str, options: NavigateOptions) {
        let mut history = self.history();
        if options.replace {
            history.entries.pop();
        }
        history.entries.push(path.to_string());
        history.log.push(Navigation {
            path: path.to_string(),
            replace: options.replace,
        });
    }
}
