// Progress reporting for the IPDraft PDF engine
// A capability injected into the orchestrator. Reporter misbehavior never
// aborts an export; the null reporter is the library default.

use tracing::{error, info};

/// Sink for human-readable progress notifications during an export.
pub trait ProgressReporter: Send + Sync {
    fn start(&self, task_name: &str);
    fn report(&self, step: &str, detail: Option<&str>);
    fn complete(&self);
    fn fail(&self, error: &str);
}

/// Logs progress through the tracing subscriber, for CLI-style hosts.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleProgressReporter;

impl ConsoleProgressReporter {
    pub fn new() -> Self {
        Self
    }
}

impl ProgressReporter for ConsoleProgressReporter {
    fn start(&self, task_name: &str) {
        info!("Starting: {}", task_name);
    }

    fn report(&self, step: &str, detail: Option<&str>) {
        match detail {
            Some(detail) => info!("{} ({})", step, detail),
            None => info!("{}", step),
        }
    }

    fn complete(&self) {
        info!("Done");
    }

    fn fail(&self, err: &str) {
        error!("Failed: {}", err);
    }
}

/// Forwards each step to a host-provided closure, for GUI hosts that
/// surface progress in their own widgets.
pub struct CallbackProgressReporter {
    callback: Box<dyn Fn(&str, Option<&str>) + Send + Sync>,
}

impl CallbackProgressReporter {
    pub fn new(callback: impl Fn(&str, Option<&str>) + Send + Sync + 'static) -> Self {
        Self {
            callback: Box::new(callback),
        }
    }
}

impl ProgressReporter for CallbackProgressReporter {
    fn start(&self, task_name: &str) {
        (self.callback)("start", Some(task_name));
    }

    fn report(&self, step: &str, detail: Option<&str>) {
        (self.callback)(step, detail);
    }

    fn complete(&self) {
        (self.callback)("complete", None);
    }

    fn fail(&self, err: &str) {
        (self.callback)("fail", Some(err));
    }
}

/// Satisfies the interface with no-ops.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullProgressReporter;

impl NullProgressReporter {
    pub fn new() -> Self {
        Self
    }
}

impl ProgressReporter for NullProgressReporter {
    fn start(&self, _task_name: &str) {}
    fn report(&self, _step: &str, _detail: Option<&str>) {}
    fn complete(&self) {}
    fn fail(&self, _error: &str) {}
}
