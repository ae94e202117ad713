//! Trigger actions
//!
//! The daemon ships one action, [`ProcessKiller`], which forcefully
//! terminates every process in a configured name list. Each name is handled
//! on its own: a name that cannot be killed is logged and the remaining names
//! are still attempted.

use std::ffi::OsStr;
use std::fmt;

use sysinfo::{Pid, Process, ProcessRefreshKind, ProcessesToUpdate, System};
use thiserror::Error;

use crate::trigger::TriggerEvent;

/// Invoked once per [`TriggerEvent`].
///
/// Implementations may block; the monitor loop waits for them within the
/// tick. Failures must be handled (logged) inside the call.
pub trait ActionInvoker {
    fn on_trigger(&mut self, event: &TriggerEvent);
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KillError {
    #[error("failed to terminate {} of {matched} process(es) named '{name}' (pids: {})", .failed.len(), format_pids(.failed))]
    Refused {
        name: String,
        matched: usize,
        failed: Vec<u32>,
    },
}

fn format_pids(pids: &[u32]) -> String {
    pids.iter()
        .map(|pid| pid.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Process lookup and termination by name.
///
/// "Not found" is a normal outcome for both operations, never an error.
pub trait ProcessTable {
    fn is_running(&mut self, name: &str) -> bool;

    /// Forcefully terminate every process called `name`.
    ///
    /// Returns how many processes were signalled.
    fn terminate(&mut self, name: &str) -> Result<usize, KillError>;
}

/// [`ProcessTable`] over the live system process list.
pub struct SystemProcessTable {
    system: System,
    own_pid: Pid,
}

impl SystemProcessTable {
    pub fn new() -> Self {
        Self {
            system: System::new(),
            own_pid: Pid::from_u32(std::process::id()),
        }
    }

    fn refresh(&mut self) {
        self.system.refresh_processes_specifics(
            ProcessesToUpdate::All,
            true,
            ProcessRefreshKind::nothing().with_exe(sysinfo::UpdateKind::OnlyIfNotSet),
        );
    }

    /// Processes called `name`, excluding our own.
    ///
    /// On Linux every thread shows up as its own entry carrying the parent's
    /// name; only thread group leaders are kept, so a process counts once.
    fn matching<'a>(&'a self, name: &'a str) -> impl Iterator<Item = (&'a Pid, &'a Process)> + 'a {
        self.system.processes().iter().filter(move |(pid, process)| {
            **pid != self.own_pid && process.thread_kind().is_none() && process_matches(process, name)
        })
    }
}

impl Default for SystemProcessTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Case-insensitive exact match on the process name or executable file name.
///
/// Linux truncates process names to 15 bytes, so long names such as
/// `TeknoParrotUi.exe` are only found through the executable path.
fn process_matches(process: &Process, name: &str) -> bool {
    let name_matches = |candidate: &OsStr| candidate.to_string_lossy().eq_ignore_ascii_case(name);

    name_matches(process.name())
        || process
            .exe()
            .and_then(|exe| exe.file_name())
            .map(name_matches)
            .unwrap_or(false)
}

impl ProcessTable for SystemProcessTable {
    fn is_running(&mut self, name: &str) -> bool {
        self.refresh();
        self.matching(name).next().is_some()
    }

    fn terminate(&mut self, name: &str) -> Result<usize, KillError> {
        self.refresh();

        let mut matched = 0;
        let mut failed = Vec::new();

        for (pid, process) in self.matching(name) {
            matched += 1;
            if process.kill() {
                tracing::debug!("Sent kill to '{}' (pid {})", name, pid);
            } else {
                failed.push(pid.as_u32());
            }
        }

        if failed.is_empty() {
            Ok(matched)
        } else {
            Err(KillError::Refused {
                name: name.to_string(),
                matched,
                failed,
            })
        }
    }
}

/// Result of handling one configured process name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KillOutcome {
    NotRunning,
    Killed(usize),
    Failed(KillError),
}

/// Per-name outcomes of one action run, in configuration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KillReport {
    pub outcomes: Vec<(String, KillOutcome)>,
}

impl KillReport {
    fn count(&self, predicate: impl Fn(&KillOutcome) -> bool) -> usize {
        self.outcomes.iter().filter(|(_, outcome)| predicate(outcome)).count()
    }

    pub fn killed(&self) -> usize {
        self.count(|o| matches!(o, KillOutcome::Killed(_)))
    }

    pub fn not_running(&self) -> usize {
        self.count(|o| matches!(o, KillOutcome::NotRunning))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, KillOutcome::Failed(_)))
    }
}

impl fmt::Display for KillReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} killed, {} not running, {} failed",
            self.killed(),
            self.not_running(),
            self.failed()
        )
    }
}

/// Terminates a list of processes by name when a trigger fires.
pub struct ProcessKiller<T: ProcessTable = SystemProcessTable> {
    names: Vec<String>,
    table: T,
}

impl ProcessKiller<SystemProcessTable> {
    pub fn new(names: Vec<String>) -> Self {
        Self::with_table(names, SystemProcessTable::new())
    }
}

impl<T: ProcessTable> ProcessKiller<T> {
    pub fn with_table(names: Vec<String>, table: T) -> Self {
        if names.is_empty() {
            tracing::warn!("No processes configured to kill; triggers will only be logged");
        }
        Self { names, table }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Attempt every configured name, in order.
    pub fn kill_all(&mut self) -> KillReport {
        let mut report = KillReport::default();

        for name in &self.names {
            let outcome = if !self.table.is_running(name) {
                tracing::info!("Not running: {}", name);
                KillOutcome::NotRunning
            } else {
                tracing::info!("Attempting to kill: {}", name);
                match self.table.terminate(name) {
                    Ok(count) => {
                        tracing::info!("Killed: {} ({} process(es))", name, count);
                        KillOutcome::Killed(count)
                    }
                    Err(e) => {
                        tracing::error!("Kill failed for {}: {}", name, e);
                        KillOutcome::Failed(e)
                    }
                }
            };
            report.outcomes.push((name.clone(), outcome));
        }

        report
    }
}

impl<T: ProcessTable> ActionInvoker for ProcessKiller<T> {
    fn on_trigger(&mut self, event: &TriggerEvent) {
        tracing::info!(
            "{} held for {:.2}s, killing configured processes if found",
            event.trigger,
            event.held.as_secs_f64()
        );
        let report = self.kill_all();
        tracing::info!("Action done: {}", report);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::time::Duration;

    use padkill_config::ButtonInput;

    use crate::trigger::Trigger;

    /// In-memory process table: name -> (instance count, refuses kill)
    #[derive(Default)]
    struct FakeTable {
        processes: HashMap<String, (usize, bool)>,
        calls: Vec<String>,
    }

    impl FakeTable {
        fn with(mut self, name: &str, count: usize, refuses: bool) -> Self {
            self.processes.insert(name.to_lowercase(), (count, refuses));
            self
        }
    }

    impl ProcessTable for FakeTable {
        fn is_running(&mut self, name: &str) -> bool {
            self.calls.push(format!("is_running {}", name));
            self.processes.contains_key(&name.to_lowercase())
        }

        fn terminate(&mut self, name: &str) -> Result<usize, KillError> {
            self.calls.push(format!("terminate {}", name));
            match self.processes.remove(&name.to_lowercase()) {
                Some((count, false)) => Ok(count),
                Some((count, true)) => Err(KillError::Refused {
                    name: name.to_string(),
                    matched: count,
                    failed: (1..=count as u32).collect(),
                }),
                None => Ok(0),
            }
        }
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_kills_running_and_skips_missing() {
        let table = FakeTable::default().with("retroarch.exe", 1, false);
        let mut killer = ProcessKiller::with_table(names(&["TeknoParrotUi.exe", "retroarch.exe"]), table);

        let report = killer.kill_all();
        assert_eq!(
            report.outcomes,
            vec![
                ("TeknoParrotUi.exe".to_string(), KillOutcome::NotRunning),
                ("retroarch.exe".to_string(), KillOutcome::Killed(1)),
            ]
        );
        // Missing processes are never sent a terminate request
        assert_eq!(
            killer.table.calls,
            vec!["is_running TeknoParrotUi.exe", "is_running retroarch.exe", "terminate retroarch.exe"]
        );
    }

    #[test]
    fn test_failure_does_not_stop_remaining_names() {
        let table = FakeTable::default()
            .with("first.exe", 2, true)
            .with("second.exe", 1, false);
        let mut killer = ProcessKiller::with_table(names(&["first.exe", "second.exe"]), table);

        let report = killer.kill_all();
        assert_eq!(report.failed(), 1);
        assert_eq!(report.killed(), 1);
        assert_eq!(report.outcomes[1], ("second.exe".to_string(), KillOutcome::Killed(1)));
        assert_eq!(report.to_string(), "1 killed, 0 not running, 1 failed");
    }

    #[test]
    fn test_action_runs_every_trigger() {
        let table = FakeTable::default().with("fbneo64.exe", 1, false);
        let mut killer = ProcessKiller::with_table(names(&["fbneo64.exe"]), table);
        let event = TriggerEvent {
            trigger: Trigger::Button(ButtonInput::new(0, 1)),
            held: Duration::from_secs(3),
        };

        killer.on_trigger(&event);
        // Second trigger finds nothing left to kill
        killer.on_trigger(&event);

        assert_eq!(
            killer.table.calls,
            vec!["is_running fbneo64.exe", "terminate fbneo64.exe", "is_running fbneo64.exe"]
        );
    }

    #[test]
    fn test_empty_name_list_is_a_no_op() {
        let mut killer = ProcessKiller::with_table(Vec::new(), FakeTable::default());
        let report = killer.kill_all();
        assert!(report.outcomes.is_empty());
        assert!(killer.names().is_empty());
    }

    /// Run a copy of `sleep` under `name`, so nothing else on the system
    /// matches it. argv[0] stays `sleep` for multi-call coreutils builds.
    #[cfg(target_os = "linux")]
    fn spawn_renamed_sleep(dir: &std::path::Path, name: &str) -> std::process::Child {
        use std::os::unix::process::CommandExt;

        let sleep = ["/bin/sleep", "/usr/bin/sleep"]
            .into_iter()
            .find(|path| std::path::Path::new(path).exists())
            .expect("no sleep binary");
        let exe = dir.join(name);
        std::fs::copy(sleep, &exe).unwrap();

        std::process::Command::new(&exe)
            .arg0("sleep")
            .arg("30")
            .spawn()
            .unwrap()
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_system_table_kills_real_process() {
        use std::os::unix::process::ExitStatusExt;

        let dir = tempfile::TempDir::new().unwrap();
        // Longer than the 15 byte comm limit, so only the exe name matches
        let name = "padkill-test-sleeper";
        let mut child = spawn_renamed_sleep(dir.path(), name);

        let mut table = SystemProcessTable::new();
        assert!(table.is_running("PADKILL-TEST-SLEEPER"));
        assert_eq!(table.terminate(name), Ok(1));

        let status = child.wait().unwrap();
        assert_eq!(status.signal(), Some(9));
        assert!(!table.is_running(name));
        assert_eq!(table.terminate(name), Ok(0));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_system_table_skips_own_process_and_threads() {
        let exe = std::env::current_exe().unwrap();
        let own_name = exe.file_name().unwrap().to_string_lossy().into_owned();

        // Extra threads show up as separate tasks sharing our exe
        let (tx, rx) = std::sync::mpsc::channel::<()>();
        let worker = std::thread::spawn(move || {
            let _ = rx.recv();
        });

        let mut table = SystemProcessTable::new();
        assert!(!table.is_running(&own_name));

        drop(tx);
        worker.join().unwrap();
    }

    #[test]
    fn test_kill_error_message() {
        let err = KillError::Refused {
            name: "retroarch".to_string(),
            matched: 3,
            failed: vec![100, 200],
        };
        assert_eq!(
            err.to_string(),
            "failed to terminate 2 of 3 process(es) named 'retroarch' (pids: 100, 200)"
        );
    }
}
