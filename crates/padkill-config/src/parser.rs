//! KDL configuration parser

use std::collections::BTreeSet;
use std::path::Path;
use std::time::Duration;

use crate::error::ConfigError;
use crate::model::*;

/// Parse a configuration file from the given path
pub fn parse_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    parse_config_str(&content)
}

/// Parse a configuration file, falling back to defaults when it does not exist
pub fn parse_config_or_default(path: &Path) -> Result<Config, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => parse_config_str(&content),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::info!(
                "No configuration at {}, using defaults",
                path.display()
            );
            Ok(Config::default())
        }
        Err(e) => Err(e.into()),
    }
}

/// Parse configuration from a string
pub fn parse_config_str(content: &str) -> Result<Config, ConfigError> {
    let doc: kdl::KdlDocument = content.parse().map_err(|e: kdl::KdlError| {
        // kdl uses an older miette version, so we need to extract offset/len manually
        let offset = e.span.offset();
        let len = e.span.len();
        let span = miette::SourceSpan::from((offset, len));
        ConfigError::ParseError {
            src: content.to_string(),
            span,
            source: e,
        }
    })?;

    let mut config = Config::default();

    for node in doc.nodes() {
        match node.name().value() {
            "global" => {
                config.global = parse_global(node)?;
            }
            "monitor" => {
                config.monitor = parse_monitor(node)?;
            }
            "kill" => {
                config.kill = parse_kill(node)?;
            }
            "trigger" => {
                let buttons = parse_trigger(node)?;
                // Several trigger blocks accumulate
                config
                    .triggers
                    .get_or_insert_with(BTreeSet::new)
                    .extend(buttons);
            }
            name => {
                tracing::warn!("Unknown top-level node: {}", name);
            }
        }
    }

    Ok(config)
}

/// Positional (unnamed) arguments of a node
fn positional(node: &kdl::KdlNode) -> impl Iterator<Item = &kdl::KdlValue> {
    node.entries()
        .iter()
        .filter(|e| e.name().is_none())
        .map(|e| e.value())
}

/// Named property of a node, e.g. `device=0`
fn property<'a>(node: &'a kdl::KdlNode, key: &str) -> Option<&'a kdl::KdlValue> {
    node.entries()
        .iter()
        .find(|e| e.name().map(|n| n.value() == key).unwrap_or(false))
        .map(|e| e.value())
}

fn as_number(value: &kdl::KdlValue) -> Option<f64> {
    value
        .as_f64()
        .or_else(|| value.as_i64().map(|v| v as f64))
}

fn number_arg(node: &kdl::KdlNode) -> Result<f64, ConfigError> {
    let name = node.name().value();
    let value = positional(node).next().ok_or_else(|| ConfigError::MissingField {
        field: format!("value for `{}`", name),
    })?;
    let number = as_number(value)
        .ok_or_else(|| ConfigError::invalid_value(name, format!("expected a number, got {}", value)))?;
    if !number.is_finite() {
        return Err(ConfigError::invalid_value(name, "must be a finite number"));
    }
    Ok(number)
}

fn string_arg<'a>(node: &'a kdl::KdlNode) -> Result<&'a str, ConfigError> {
    let name = node.name().value();
    let value = positional(node).next().ok_or_else(|| ConfigError::MissingField {
        field: format!("value for `{}`", name),
    })?;
    value
        .as_string()
        .ok_or_else(|| ConfigError::invalid_value(name, format!("expected a string, got {}", value)))
}

fn index_value(node_name: &str, key: &str, value: &kdl::KdlValue) -> Result<usize, ConfigError> {
    let raw = value.as_i64().ok_or_else(|| {
        ConfigError::invalid_value(node_name, format!("`{}` must be an integer, got {}", key, value))
    })?;
    usize::try_from(raw).map_err(|_| {
        ConfigError::invalid_value(node_name, format!("`{}` must not be negative, got {}", key, raw))
    })
}

fn seconds(node: &kdl::KdlNode, secs: f64) -> Result<Duration, ConfigError> {
    Duration::try_from_secs_f64(secs)
        .map_err(|e| ConfigError::invalid_value(node.name().value(), e.to_string()))
}

fn parse_global(node: &kdl::KdlNode) -> Result<GlobalConfig, ConfigError> {
    let mut global = GlobalConfig::default();

    if let Some(children) = node.children() {
        for child in children.nodes() {
            match child.name().value() {
                "log-level" => {
                    global.log_level = string_arg(child)?
                        .parse()
                        .map_err(|e| ConfigError::Invalid { message: e })?;
                }
                name => {
                    tracing::warn!("Unknown global config option: {}", name);
                }
            }
        }
    }

    Ok(global)
}

fn parse_monitor(node: &kdl::KdlNode) -> Result<MonitorConfig, ConfigError> {
    let mut monitor = MonitorConfig::default();

    if let Some(children) = node.children() {
        for child in children.nodes() {
            match child.name().value() {
                "hold-seconds" => {
                    let secs = number_arg(child)?;
                    monitor.hold = if secs <= 0.0 {
                        tracing::debug!("hold-seconds {} clamped to zero", secs);
                        Duration::ZERO
                    } else {
                        seconds(child, secs)?
                    };
                }
                "poll-hz" => {
                    let hz = positional(child)
                        .next()
                        .and_then(|v| v.as_i64())
                        .ok_or_else(|| ConfigError::invalid_value("poll-hz", "expected an integer"))?;
                    monitor.poll_hz = u32::try_from(hz)
                        .ok()
                        .filter(|hz| *hz > 0)
                        .ok_or_else(|| {
                            ConfigError::invalid_value("poll-hz", format!("must be greater than zero, got {}", hz))
                        })?;
                }
                "cooldown-seconds" => {
                    let secs = number_arg(child)?;
                    if secs < 0.0 {
                        return Err(ConfigError::invalid_value(
                            "cooldown-seconds",
                            format!("must not be negative, got {}", secs),
                        ));
                    }
                    monitor.cooldown = seconds(child, secs)?;
                }
                "mode" => {
                    monitor.mode = string_arg(child)?
                        .parse()
                        .map_err(|e| ConfigError::invalid_value("mode", e))?;
                }
                name => {
                    tracing::warn!("Unknown monitor config option: {}", name);
                }
            }
        }
    }

    Ok(monitor)
}

fn parse_kill(node: &kdl::KdlNode) -> Result<KillConfig, ConfigError> {
    let mut processes = Vec::new();

    if let Some(children) = node.children() {
        for child in children.nodes() {
            match child.name().value() {
                "process" => {
                    let mut found = false;
                    for value in positional(child) {
                        let name = value.as_string().ok_or_else(|| {
                            ConfigError::invalid_value("process", format!("expected a string, got {}", value))
                        })?;
                        let name = name.trim();
                        if name.is_empty() {
                            return Err(ConfigError::invalid_value(
                                "process",
                                "process name must not be empty",
                            ));
                        }
                        processes.push(name.to_string());
                        found = true;
                    }
                    if !found {
                        return Err(ConfigError::MissingField {
                            field: "process name (e.g., `process \"retroarch.exe\"`)".to_string(),
                        });
                    }
                }
                name => {
                    tracing::warn!("Unknown kill config option: {}", name);
                }
            }
        }
    }

    Ok(KillConfig { processes })
}

fn parse_trigger(node: &kdl::KdlNode) -> Result<BTreeSet<ButtonInput>, ConfigError> {
    let mut buttons = BTreeSet::new();

    if let Some(children) = node.children() {
        for child in children.nodes() {
            match child.name().value() {
                "button" => {
                    let button = parse_button(child)?;
                    if !buttons.insert(button) {
                        tracing::warn!("Duplicate trigger button: {}", button);
                    }
                }
                name => {
                    tracing::warn!("Unknown trigger option: {}", name);
                }
            }
        }
    }

    Ok(buttons)
}

/// `button device=0 index=1`, or the short form `button 0 1`
fn parse_button(node: &kdl::KdlNode) -> Result<ButtonInput, ConfigError> {
    let mut args = positional(node);
    let device = property(node, "device").or_else(|| args.next());
    let index = property(node, "index").or_else(|| args.next());

    match (device, index) {
        (Some(device), Some(index)) => Ok(ButtonInput::new(
            index_value("button", "device", device)?,
            index_value("button", "index", index)?,
        )),
        (None, _) => Err(ConfigError::MissingField {
            field: "button device (e.g., `button device=0 index=1`)".to_string(),
        }),
        (Some(_), None) => Err(ConfigError::MissingField {
            field: "button index (e.g., `button device=0 index=1`)".to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_full_config() {
        let config = r#"
            global {
                log-level "debug"
            }

            monitor {
                hold-seconds 2.5
                poll-hz 120
                cooldown-seconds 10
                mode "all"
            }

            kill {
                process "retroarch"
                process "fbneo64.exe" "mame"
            }

            trigger {
                button device=0 index=6
                button device=0 index=7
            }
        "#;

        let result = parse_config_str(config).unwrap();
        assert_eq!(result.global.log_level, LogLevel::Debug);
        assert_eq!(result.monitor.hold, Duration::from_millis(2500));
        assert_eq!(result.monitor.poll_hz, 120);
        assert_eq!(result.monitor.cooldown, Duration::from_secs(10));
        assert_eq!(result.monitor.mode, TriggerMode::All);
        assert_eq!(result.kill.processes, vec!["retroarch", "fbneo64.exe", "mame"]);
        assert_eq!(
            result.triggers,
            Some(BTreeSet::from([ButtonInput::new(0, 6), ButtonInput::new(0, 7)]))
        );
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let result = parse_config_str("").unwrap();
        assert_eq!(result, Config::default());
        assert_eq!(result.monitor.hold, Duration::from_secs(3));
        assert_eq!(result.monitor.poll_hz, 60);
        assert_eq!(result.monitor.cooldown, Duration::from_secs(5));
        assert_eq!(result.kill.processes.len(), 3);
        assert!(result.triggers.is_none());
    }

    #[test]
    fn test_empty_trigger_block_is_empty_set() {
        let result = parse_config_str("trigger {\n}\n").unwrap();
        assert_eq!(result.triggers, Some(BTreeSet::new()));
    }

    #[test]
    fn test_button_short_form() {
        let config = r#"
            trigger {
                button 1 3
            }
        "#;

        let result = parse_config_str(config).unwrap();
        assert_eq!(result.triggers, Some(BTreeSet::from([ButtonInput::new(1, 3)])));
    }

    #[test]
    fn test_button_missing_index_error() {
        let config = r#"
            trigger {
                button device=0
            }
        "#;

        let err = parse_config_str(config).unwrap_err();
        match err {
            ConfigError::MissingField { field } => {
                assert!(field.contains("button index"));
            }
            _ => panic!("Expected MissingField error, got: {:?}", err),
        }
    }

    #[test]
    fn test_button_negative_index_error() {
        let config = r#"
            trigger {
                button device=0 index=-1
            }
        "#;

        let err = parse_config_str(config).unwrap_err();
        match err {
            ConfigError::InvalidValue { node, message } => {
                assert_eq!(node, "button");
                assert!(message.contains("negative"));
            }
            _ => panic!("Expected InvalidValue error, got: {:?}", err),
        }
    }

    #[test]
    fn test_zero_poll_hz_error() {
        let config = r#"
            monitor {
                poll-hz 0
            }
        "#;

        let err = parse_config_str(config).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref node, .. } if node == "poll-hz"));
    }

    #[test]
    fn test_negative_cooldown_error() {
        let config = r#"
            monitor {
                cooldown-seconds -1.0
            }
        "#;

        let err = parse_config_str(config).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref node, .. } if node == "cooldown-seconds"));
    }

    #[test]
    fn test_negative_hold_clamps_to_zero() {
        let config = r#"
            monitor {
                hold-seconds -2.0
            }
        "#;

        let result = parse_config_str(config).unwrap();
        assert_eq!(result.monitor.hold, Duration::ZERO);
    }

    #[test]
    fn test_non_numeric_hold_error() {
        let config = r#"
            monitor {
                hold-seconds "three"
            }
        "#;

        let err = parse_config_str(config).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref node, .. } if node == "hold-seconds"));
    }

    #[test]
    fn test_unknown_mode_error() {
        let config = r#"
            monitor {
                mode "sometimes"
            }
        "#;

        assert!(parse_config_str(config).is_err());
    }

    #[test]
    fn test_empty_process_name_error() {
        let config = r#"
            kill {
                process ""
            }
        "#;

        let err = parse_config_str(config).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref node, .. } if node == "process"));
    }

    #[test]
    fn test_empty_kill_block_clears_defaults() {
        let result = parse_config_str("kill {\n}\n").unwrap();
        assert!(result.kill.processes.is_empty());
    }

    #[test]
    fn test_syntax_error_reports_parse_error() {
        let err = parse_config_str("monitor {").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }

    #[test]
    fn test_unknown_nodes_are_ignored() {
        let config = r#"
            shortcuts {
                foo "bar"
            }
            monitor {
                sensitivity 3
                poll-hz 30
            }
        "#;

        let result = parse_config_str(config).unwrap();
        assert_eq!(result.monitor.poll_hz, 30);
    }

    #[test]
    fn test_parse_config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "monitor {{\n    hold-seconds 1.5\n}}").unwrap();

        let result = parse_config(file.path()).unwrap();
        assert_eq!(result.monitor.hold, Duration::from_millis(1500));
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.kdl");

        let result = parse_config_or_default(&path).unwrap();
        assert_eq!(result, Config::default());

        // The strict variant still reports the missing file
        assert!(matches!(parse_config(&path), Err(ConfigError::Io(_))));
    }
}
