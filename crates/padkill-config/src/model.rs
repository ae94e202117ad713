//! Configuration data model

use std::collections::BTreeSet;
use std::fmt;
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Config {
    pub global: GlobalConfig,
    pub monitor: MonitorConfig,
    pub kill: KillConfig,
    /// Buttons to watch. `None` means the daemon asks for them interactively.
    pub triggers: Option<BTreeSet<ButtonInput>>,
}

/// Global settings
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GlobalConfig {
    pub log_level: LogLevel,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Directive string understood by `tracing_subscriber::EnvFilter`
    pub fn as_filter(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_filter())
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "trace" => Ok(Self::Trace),
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            _ => Err(format!("Unknown log level: {}", s)),
        }
    }
}

/// How the selected buttons combine into triggers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TriggerMode {
    /// Every button is its own trigger; holding any one is enough
    #[default]
    Any,
    /// All buttons form a single combo that must be held together
    All,
}

impl fmt::Display for TriggerMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => f.write_str("any"),
            Self::All => f.write_str("all"),
        }
    }
}

impl std::str::FromStr for TriggerMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "any" | "or" => Ok(Self::Any),
            "all" | "and" | "combo" => Ok(Self::All),
            _ => Err(format!("Unknown trigger mode: {} (expected \"any\" or \"all\")", s)),
        }
    }
}

/// Hold detection timing
#[derive(Debug, Clone, PartialEq)]
pub struct MonitorConfig {
    /// How long a trigger must be held before the action fires
    pub hold: Duration,
    /// Device sampling rate
    pub poll_hz: u32,
    /// Minimum time between two firings of the same trigger
    pub cooldown: Duration,
    pub mode: TriggerMode,
}

impl MonitorConfig {
    /// Time between two device samples
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.poll_hz.max(1)))
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            hold: Duration::from_secs(3),
            poll_hz: 60,
            cooldown: Duration::from_secs(5),
            mode: TriggerMode::Any,
        }
    }
}

/// Processes terminated when a trigger fires
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KillConfig {
    /// Process names, attempted in order
    pub processes: Vec<String>,
}

impl Default for KillConfig {
    fn default() -> Self {
        Self {
            processes: vec![
                "TeknoParrotUi.exe".to_string(),
                "retroarch.exe".to_string(),
                "fbneo64.exe".to_string(),
            ],
        }
    }
}

/// A physical button, identified by controller index and button index.
///
/// Ordering is by device first, then button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ButtonInput {
    pub device: usize,
    pub button: usize,
}

impl ButtonInput {
    pub const fn new(device: usize, button: usize) -> Self {
        Self { device, button }
    }
}

impl fmt::Display for ButtonInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Joy{}:Btn{}", self.device, self.button)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_button_input_ordering() {
        let mut buttons = vec![
            ButtonInput::new(1, 0),
            ButtonInput::new(0, 5),
            ButtonInput::new(0, 1),
        ];
        buttons.sort();
        assert_eq!(
            buttons,
            vec![
                ButtonInput::new(0, 1),
                ButtonInput::new(0, 5),
                ButtonInput::new(1, 0),
            ]
        );
    }

    #[test]
    fn test_button_input_display() {
        assert_eq!(ButtonInput::new(0, 1).to_string(), "Joy0:Btn1");
    }

    #[test]
    fn test_poll_interval() {
        let monitor = MonitorConfig {
            poll_hz: 50,
            ..Default::default()
        };
        assert_eq!(monitor.poll_interval(), Duration::from_millis(20));
    }

    #[test]
    fn test_trigger_mode_parse() {
        assert_eq!("any".parse::<TriggerMode>(), Ok(TriggerMode::Any));
        assert_eq!("ALL".parse::<TriggerMode>(), Ok(TriggerMode::All));
        assert!("both".parse::<TriggerMode>().is_err());
    }
}
