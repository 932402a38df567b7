//! Cross-thread command dispatch
//!
//! Callers on any thread submit commands; a single worker thread executes
//! them in arrival order against the executor it owns. Results travel back
//! through the correlation map with a bounded wait on the caller side.

pub mod command;
pub mod correlation;

pub use command::{canonical_method, Command, CommandClass};
pub use correlation::CorrelationMap;

use crate::constants;
use crate::error::EngineError;
use log::{error, info};
use serde_json::Value;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;
use uuid::Uuid;

/// Something that can execute commands on the worker thread
pub trait CommandExecutor: Send + 'static {
    fn execute(&mut self, command: Command) -> Result<Value, EngineError>;
}

impl<F> CommandExecutor for F
where
    F: FnMut(Command) -> Result<Value, EngineError> + Send + 'static,
{
    fn execute(&mut self, command: Command) -> Result<Value, EngineError> {
        self(command)
    }
}

/// Wait budgets for the caller side
#[derive(Debug, Clone, Copy)]
pub struct DispatchConfig {
    pub read_timeout: Duration,
    pub mutate_timeout: Duration,
    /// Extra wait when the worker claimed the entry right at the deadline
    pub reclaim_grace: Duration,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            read_timeout: Duration::from_secs(constants::dispatch::READ_TIMEOUT_SECS),
            mutate_timeout: Duration::from_secs(constants::dispatch::MUTATE_TIMEOUT_SECS),
            reclaim_grace: Duration::from_millis(constants::dispatch::RECLAIM_GRACE_MS),
        }
    }
}

struct Job {
    id: Uuid,
    command: Command,
}

/// Handle for submitting commands to the worker thread.
///
/// Cheap to clone; every connection handler gets its own.
pub struct Dispatcher {
    sender: mpsc::Sender<Job>,
    pending: CorrelationMap,
    config: DispatchConfig,
}

impl Clone for Dispatcher {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
            pending: self.pending.clone(),
            config: self.config,
        }
    }
}

impl Dispatcher {
    /// Spawn the worker thread around `executor` and return the handle.
    ///
    /// The worker runs until every handle is dropped. A panicking command
    /// is reported to its caller and does not take the worker down.
    pub fn spawn<E: CommandExecutor>(mut executor: E, config: DispatchConfig) -> Self {
        let (sender, receiver) = mpsc::channel::<Job>();
        let pending = CorrelationMap::new();
        let worker_pending = pending.clone();
        thread::Builder::new()
            .name("mutation-worker".to_string())
            .spawn(move || {
                info!("mutation worker started");
                while let Ok(job) = receiver.recv() {
                    let outcome =
                        match catch_unwind(AssertUnwindSafe(|| executor.execute(job.command))) {
                            Ok(result) => result,
                            Err(_) => {
                                error!("command {} panicked in the executor", job.id);
                                Err(EngineError::DispatchUnavailable)
                            }
                        };
                    worker_pending.deliver(job.id, outcome);
                }
                info!("mutation worker stopped");
            })
            .ok();
        Self {
            sender,
            pending,
            config,
        }
    }

    /// Execute one command on the worker thread and wait for its result.
    ///
    /// The wait budget follows the command's class; an elapsed budget
    /// returns `Timeout` and any later result is discarded.
    pub fn submit(&self, command: Command) -> Result<Value, EngineError> {
        let timeout = match command.class() {
            CommandClass::Read => self.config.read_timeout,
            CommandClass::Mutate => self.config.mutate_timeout,
        };
        let (id, entry) = self.pending.register();
        if self.sender.send(Job { id, command }).is_err() {
            self.pending.forget(id);
            return Err(EngineError::DispatchUnavailable);
        }
        self.pending
            .wait(id, &entry, timeout, self.config.reclaim_grace)
    }

    /// Requests currently in flight
    pub fn pending_len(&self) -> usize {
        self.pending.pending_len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    fn get_command(path: &str) -> Command {
        Command::Get {
            path: path.to_string(),
            property: None,
        }
    }

    fn fast_config() -> DispatchConfig {
        DispatchConfig {
            read_timeout: Duration::from_millis(60),
            mutate_timeout: Duration::from_millis(60),
            reclaim_grace: Duration::from_millis(40),
        }
    }

    #[test]
    fn test_submit_round_trip() {
        let dispatcher = Dispatcher::spawn(
            |command: Command| match command {
                Command::Get { path, .. } => Ok(json!({"path": path})),
                _ => Err(EngineError::InvalidArguments("unexpected".to_string())),
            },
            DispatchConfig::default(),
        );
        let result = dispatcher.submit(get_command("/a")).unwrap();
        assert_eq!(result["path"], "/a");
        assert_eq!(dispatcher.pending_len(), 0);
    }

    #[test]
    fn test_concurrent_callers_get_their_own_results() {
        let dispatcher = Dispatcher::spawn(
            |command: Command| match command {
                Command::Get { path, .. } => {
                    // Uneven execution times shuffle delivery timing
                    let millis = path.len() as u64 % 5;
                    thread::sleep(Duration::from_millis(millis));
                    Ok(json!(path))
                }
                _ => unreachable!(),
            },
            DispatchConfig::default(),
        );
        let mut handles = Vec::new();
        for caller in 0..8 {
            let dispatcher = dispatcher.clone();
            handles.push(thread::spawn(move || {
                for round in 0..10 {
                    let path = format!("/caller{caller}/round{round}");
                    let result = dispatcher.submit(get_command(&path)).unwrap();
                    assert_eq!(result, json!(path));
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(dispatcher.pending_len(), 0);
    }

    #[test]
    fn test_commands_execute_in_submission_order() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let recorder = seen.clone();
        let dispatcher = Dispatcher::spawn(
            move |command: Command| {
                if let Command::Get { path, .. } = command {
                    recorder.lock().unwrap().push(path);
                }
                Ok(Value::Null)
            },
            DispatchConfig::default(),
        );
        for i in 0..5 {
            dispatcher.submit(get_command(&format!("/{i}"))).unwrap();
        }
        let order = seen.lock().unwrap().clone();
        assert_eq!(order, vec!["/0", "/1", "/2", "/3", "/4"]);
    }

    #[test]
    fn test_slow_command_times_out_and_late_result_is_discarded() {
        let dispatcher = Dispatcher::spawn(
            |_: Command| {
                thread::sleep(Duration::from_millis(250));
                Ok(json!("late"))
            },
            fast_config(),
        );
        let started = std::time::Instant::now();
        let outcome = dispatcher.submit(get_command("/slow"));
        assert!(matches!(outcome, Err(EngineError::Timeout(_))));
        assert!(started.elapsed() < Duration::from_millis(600));

        // Worker finishes after the reclaim; its write lands nowhere
        thread::sleep(Duration::from_millis(300));
        assert_eq!(dispatcher.pending_len(), 0);
    }

    #[test]
    fn test_panicking_command_does_not_kill_the_worker() {
        let dispatcher = Dispatcher::spawn(
            |command: Command| match command {
                Command::Get { path, .. } if path == "/boom" => panic!("executor bug"),
                Command::Get { path, .. } => Ok(json!(path)),
                _ => unreachable!(),
            },
            DispatchConfig::default(),
        );
        let outcome = dispatcher.submit(get_command("/boom"));
        assert_eq!(outcome, Err(EngineError::DispatchUnavailable));
        let result = dispatcher.submit(get_command("/after")).unwrap();
        assert_eq!(result, json!("/after"));
    }

    #[test]
    fn test_worker_survives_dropped_sibling_handles() {
        let dispatcher = Dispatcher::spawn(
            |_: Command| Ok(Value::Null),
            DispatchConfig::default(),
        );
        let clone = dispatcher.clone();
        drop(dispatcher);
        assert!(clone.submit(get_command("/a")).is_ok());
    }
}
