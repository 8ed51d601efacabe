//! Navigation seam between auth logic and whatever hosts the client.

use parking_lot::Mutex;

/// How a redirect was requested
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationKind {
    /// Client-side route transition
    Push,
    /// Full document load; goes back through the edge gate
    Reload,
}

pub trait Navigator: Send + Sync {
    fn current_path(&self) -> String;
    fn navigate(&self, path: &str, kind: NavigationKind);
}

/// Navigator that only records where it was sent
pub struct HistoryNavigator {
    inner: Mutex<History>,
}

struct History {
    current: String,
    visits: Vec<(String, NavigationKind)>,
}

impl HistoryNavigator {
    pub fn new(start: impl Into<String>) -> Self {
        Self {
            inner: Mutex::new(History {
                current: start.into(),
                visits: Vec::new(),
            }),
        }
    }

    pub fn visits(&self) -> Vec<(String, NavigationKind)> {
        self.inner.lock().visits.clone()
    }

    pub fn last_visit(&self) -> Option<(String, NavigationKind)> {
        self.inner.lock().visits.last().cloned()
    }
}

impl Navigator for HistoryNavigator {
    fn current_path(&self) -> String {
        self.inner.lock().current.clone()
    }

    fn navigate(&self, path: &str, kind: NavigationKind) {
        let mut history = self.inner.lock();
        history.current = path.to_string();
        history.visits.push((path.to_string(), kind));
    }
}
