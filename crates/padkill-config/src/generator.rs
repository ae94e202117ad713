//! Generate padkill KDL configuration files

use std::fmt::Write;
use std::time::Duration;

use crate::model::{ButtonInput, Config};

/// Quote a string as a KDL string literal.
fn quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for ch in value.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            other => out.push(other),
        }
    }
    out.push('"');
    out
}

/// Render seconds so KDL reads them back as a float (`3.0`, not `3`).
fn format_seconds(duration: Duration) -> String {
    format!("{:?}", duration.as_secs_f64())
}

/// Render the `trigger { ... }` block for a set of buttons.
///
/// The daemon prints this after interactive setup so the selection can be
/// pasted into the config file.
pub fn generate_trigger_block<'a>(buttons: impl IntoIterator<Item = &'a ButtonInput>) -> String {
    let mut output = String::from("trigger {\n");
    for button in buttons {
        let _ = writeln!(
            output,
            "    button device={} index={}",
            button.device, button.button
        );
    }
    output.push_str("}\n");
    output
}

/// Render a complete configuration document.
pub fn generate_config(config: &Config) -> String {
    let mut output = String::new();

    output.push_str("// padkill configuration\n");
    output.push_str("// Hold a trigger button on any controller to terminate the listed processes.\n\n");

    output.push_str("global {\n");
    let _ = writeln!(output, "    log-level {}", quote(config.global.log_level.as_filter()));
    output.push_str("}\n\n");

    output.push_str("monitor {\n");
    let _ = writeln!(output, "    hold-seconds {}", format_seconds(config.monitor.hold));
    let _ = writeln!(output, "    poll-hz {}", config.monitor.poll_hz);
    let _ = writeln!(
        output,
        "    cooldown-seconds {}",
        format_seconds(config.monitor.cooldown)
    );
    let _ = writeln!(output, "    mode {}", quote(&config.monitor.mode.to_string()));
    output.push_str("}\n\n");

    output.push_str("kill {\n");
    for process in &config.kill.processes {
        let _ = writeln!(output, "    process {}", quote(process));
    }
    output.push_str("}\n");

    match &config.triggers {
        Some(buttons) => {
            output.push('\n');
            output.push_str(&generate_trigger_block(buttons));
        }
        None => {
            output.push_str("\n// Without a trigger block the daemon asks for buttons on startup.\n");
            output.push_str("// Run `padkill devices` to see button indices.\n");
            output.push_str("// trigger {\n");
            output.push_str("//     button device=0 index=1\n");
            output.push_str("// }\n");
        }
    }

    output
}
