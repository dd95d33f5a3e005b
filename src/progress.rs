use log::{debug, info};

/// Status of one load phase, mirrored into whatever status widget the
/// caller owns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Running,
    Complete,
    Alert,
    Error,
}

/// Reporting surface handed to every load phase. The UI layer implements
/// this; the engine only ever calls it and never blocks on it.
pub trait ProgressSink {
    /// Updates the phase progress bar. `maximum` resizes the bar when
    /// present; `None` keeps the previous maximum.
    fn set_progress(&mut self, value: usize, maximum: Option<usize>);
    fn set_status(&mut self, state: TaskState);
    fn log(&mut self, message: &str);
}

/// Sink that forwards everything to the `log` crate. Used by the console
/// front-end and anywhere no widget exists.
#[derive(Debug, Default)]
pub struct LogSink;

impl ProgressSink for LogSink {
    fn set_progress(&mut self, _value: usize, _maximum: Option<usize>) {}

    fn set_status(&mut self, state: TaskState) {
        debug!("task status: {:?}", state);
    }

    fn log(&mut self, message: &str) {
        info!("{}", message);
    }
}

// --- Test support ---

/// Sink that records every call so tests can assert on warnings and
/// terminal states.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub messages: Vec<String>,
    pub states: Vec<TaskState>,
    pub bars: Vec<(usize, Option<usize>)>,
}

#[cfg(test)]
impl RecordingSink {
    pub fn new() -> Self {
        RecordingSink::default()
    }

    pub fn warnings(&self) -> Vec<&String> {
        self.messages.iter().filter(|m| m.starts_with("WARNING")).collect()
    }

    pub fn final_state(&self) -> Option<TaskState> {
        self.states.last().copied()
    }
}

#[cfg(test)]
impl ProgressSink for RecordingSink {
    fn set_progress(&mut self, value: usize, maximum: Option<usize>) {
        self.bars.push((value, maximum));
    }

    fn set_status(&mut self, state: TaskState) {
        self.states.push(state);
    }

    fn log(&mut self, message: &str) {
        self.messages.push(message.to_string());
    }
}
