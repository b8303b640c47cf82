//! Progress reporting
//!
//! The harvester reports coarse milestones as free-form status text. Sinks
//! only observe; nothing is ever read back from them.

use tracing::{debug, info};

/// Receives the current status text
pub trait StatusSink: Send + Sync {
    fn set_status(&self, text: &str);
}

impl<F> StatusSink for F
where
    F: Fn(&str) + Send + Sync,
{
    fn set_status(&self, text: &str) {
        self(text)
    }
}

/// Discards all status updates
#[derive(Debug, Clone, Copy, Default)]
pub struct NoStatus;

impl StatusSink for NoStatus {
    fn set_status(&self, _text: &str) {}
}

/// Forwards status updates to the log
#[derive(Debug, Clone, Copy, Default)]
pub struct LogStatus {
    pub verbose: bool,
}

impl StatusSink for LogStatus {
    fn set_status(&self, text: &str) {
        if self.verbose {
            info!(status = text);
        } else {
            debug!(status = text);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn closures_are_sinks() {
        let seen = Mutex::new(Vec::new());
        let sink = |text: &str| seen.lock().unwrap().push(text.to_string());
        sink.set_status("Checking cache...");
        sink.set_status("Done");
        assert_eq!(*seen.lock().unwrap(), vec!["Checking cache...", "Done"]);
    }
}
