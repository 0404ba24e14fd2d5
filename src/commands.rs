//! Operator commands for controlling a sweep.
//!
//! Text commands parse into [`SweepCommand`] and execute against a
//! host-provided [`CommandContext`]; output comes back as plain lines for
//! whatever console or chat surface the host exposes.

use std::fmt;

use crate::config::{ReloadError, SweepProfile};
use crate::policy::CategoryRule;
use crate::sweep::SweepStats;

/// Parse failure with an operator-facing message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandError {
    message: String,
}

impl CommandError {
    /// Wrap a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CommandError {}

/// Operator commands accepted by the sweep surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepCommand {
    /// Print usage.
    Help,
    /// Turn the sweep on, starting its task if needed.
    Enable,
    /// Turn the sweep off, cancelling its task.
    Disable,
    /// Report the master switch, active settings, and per-category rules.
    Status,
    /// Re-read the profile from its source and apply it.
    Reload,
}

/// Lines produced by executing a command.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// Human-readable output lines, in order.
    pub lines: Vec<String>,
}

/// Host-side operations the command surface needs.
pub trait CommandContext {
    /// Whether the sweep is currently enabled.
    fn is_enabled(&self) -> bool;

    /// Enable or disable the sweep, (re)starting or cancelling its task.
    fn set_enabled(&mut self, enabled: bool) -> anyhow::Result<()>;

    /// The active profile.
    fn profile(&self) -> &SweepProfile;

    /// Counters for the running sweep, if one is running.
    fn stats(&self) -> Option<SweepStats>;

    /// Re-read the profile and apply it. On error the previous profile
    /// must stay active.
    fn reload(&mut self) -> Result<(), ReloadError>;
}

/// Parse an operator command line. A bare `/sweep` (or empty input) shows
/// usage.
pub fn parse_command(input: &str) -> Result<SweepCommand, CommandError> {
    let input = input.trim();
    let input = input.strip_prefix('/').unwrap_or(input).trim();
    if input.is_empty() {
        return Ok(SweepCommand::Help);
    }

    let mut parts = input.split_whitespace();
    let cmd = parts
        .next()
        .ok_or_else(|| CommandError::new("Missing command"))?
        .to_ascii_lowercase();
    let args: Vec<&str> = parts.collect();

    match cmd.as_str() {
        "help" | "?" => Ok(SweepCommand::Help),
        "sweep" => parse_sweep_subcommand(&args),
        _ => Err(CommandError::new(format!(
            "Unknown command: {cmd}. Try /sweep"
        ))),
    }
}

fn parse_sweep_subcommand(args: &[&str]) -> Result<SweepCommand, CommandError> {
    if args.is_empty() {
        return Ok(SweepCommand::Help);
    }
    if args.len() > 1 {
        return Err(CommandError::new(
            "Usage: /sweep <enable|disable|status|reload>",
        ));
    }
    match args[0].to_ascii_lowercase().as_str() {
        "enable" | "on" => Ok(SweepCommand::Enable),
        "disable" | "off" => Ok(SweepCommand::Disable),
        "status" => Ok(SweepCommand::Status),
        "reload" => Ok(SweepCommand::Reload),
        other => Err(CommandError::new(format!(
            "Unknown subcommand: {other}. Usage: /sweep <enable|disable|status|reload>"
        ))),
    }
}

/// Execute a parsed command against the host context.
pub fn execute_command(ctx: &mut impl CommandContext, cmd: SweepCommand) -> CommandOutput {
    let mut out = CommandOutput::default();
    match cmd {
        SweepCommand::Help => {
            out.lines.extend(help_lines());
            out.lines.push(format!(
                "Current state: {}",
                enabled_word(ctx.is_enabled())
            ));
        }
        SweepCommand::Enable => match ctx.set_enabled(true) {
            Ok(()) => out.lines.push("Sweep enabled".to_string()),
            Err(err) => out.lines.push(format!("Error: {err:#}")),
        },
        SweepCommand::Disable => match ctx.set_enabled(false) {
            Ok(()) => out.lines.push("Sweep disabled".to_string()),
            Err(err) => out.lines.push(format!("Error: {err:#}")),
        },
        SweepCommand::Status => {
            status_lines(ctx, &mut out.lines);
        }
        SweepCommand::Reload => match ctx.reload() {
            Ok(()) => {
                let sweep = ctx.profile().sweep;
                out.lines.push("Profile reloaded".to_string());
                out.lines.push(format!(
                    "Active settings: period={} ticks, budget={}, {}",
                    sweep.period_ticks,
                    budget_word(sweep.max_visits_per_firing),
                    enabled_word(sweep.enabled)
                ));
            }
            Err(err) => out
                .lines
                .push(format!("Reload failed, keeping previous profile: {err}")),
        },
    }
    out
}

fn help_lines() -> Vec<String> {
    vec![
        "=== Sweep scheduler ===".to_string(),
        "/sweep enable  - start the periodic sweep".to_string(),
        "/sweep disable - stop the periodic sweep".to_string(),
        "/sweep status  - show settings and counters".to_string(),
        "/sweep reload  - re-read the profile".to_string(),
    ]
}

fn status_lines(ctx: &impl CommandContext, lines: &mut Vec<String>) {
    let enabled = ctx.is_enabled();
    let profile = ctx.profile();
    lines.push("=== Sweep status ===".to_string());
    lines.push(format!("Master switch: {}", enabled_word(enabled)));
    if !enabled {
        return;
    }
    lines.push(format!(
        "Period: {} ticks, budget: {}",
        profile.sweep.period_ticks,
        budget_word(profile.sweep.max_visits_per_firing)
    ));
    if let Some(stats) = ctx.stats() {
        lines.push(format!(
            "Firings: {}, objects visited: {}",
            stats.firings, stats.visited_total
        ));
    }
    for (category, rule) in &profile.categories {
        lines.push(format!("- {category}: {}", rule_word(rule)));
    }
    lines.push(format!("- (default): {}", rule_word(&profile.default_rule)));
}

fn enabled_word(enabled: bool) -> &'static str {
    if enabled {
        "enabled"
    } else {
        "disabled"
    }
}

fn budget_word(budget: usize) -> String {
    if budget == 0 {
        "unlimited".to_string()
    } else {
        format!("{budget} per firing")
    }
}

fn rule_word(rule: &CategoryRule) -> String {
    if !rule.enabled {
        return "disabled".to_string();
    }
    if rule.interval_multiplier == 1 {
        "enabled, every firing".to_string()
    } else {
        format!("enabled, every {} firings", rule.interval_multiplier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SweepConfig;

    struct StubContext {
        enabled: bool,
        profile: SweepProfile,
        stats: Option<SweepStats>,
        reload_result: Result<SweepProfile, &'static str>,
    }

    impl StubContext {
        fn new() -> Self {
            Self {
                enabled: true,
                profile: SweepProfile::default(),
                stats: None,
                reload_result: Ok(SweepProfile::default()),
            }
        }
    }

    impl CommandContext for StubContext {
        fn is_enabled(&self) -> bool {
            self.enabled
        }

        fn set_enabled(&mut self, enabled: bool) -> anyhow::Result<()> {
            self.enabled = enabled;
            Ok(())
        }

        fn profile(&self) -> &SweepProfile {
            &self.profile
        }

        fn stats(&self) -> Option<SweepStats> {
            self.stats
        }

        fn reload(&mut self) -> Result<(), ReloadError> {
            match &self.reload_result {
                Ok(profile) => {
                    self.profile = profile.clone();
                    Ok(())
                }
                Err(message) => Err(ReloadError::Read {
                    path: std::path::PathBuf::from("sweep.toml"),
                    source: std::io::Error::other(*message),
                }),
            }
        }
    }

    #[test]
    fn bare_and_prefixed_inputs_parse_to_help() {
        assert_eq!(parse_command(""), Ok(SweepCommand::Help));
        assert_eq!(parse_command("/sweep"), Ok(SweepCommand::Help));
        assert_eq!(parse_command("help"), Ok(SweepCommand::Help));
    }

    #[test]
    fn subcommands_parse_case_insensitively() {
        assert_eq!(parse_command("/sweep Enable"), Ok(SweepCommand::Enable));
        assert_eq!(parse_command("sweep OFF"), Ok(SweepCommand::Disable));
        assert_eq!(parse_command("/sweep status"), Ok(SweepCommand::Status));
        assert_eq!(parse_command("/sweep reload"), Ok(SweepCommand::Reload));
    }

    #[test]
    fn unknown_inputs_produce_usage_errors() {
        assert!(parse_command("/sweep bogus").is_err());
        assert!(parse_command("/sweep status extra").is_err());
        assert!(parse_command("/frobnicate").is_err());
    }

    #[test]
    fn enable_and_disable_toggle_the_context() {
        let mut ctx = StubContext::new();
        ctx.enabled = false;

        let out = execute_command(&mut ctx, SweepCommand::Enable);
        assert!(ctx.enabled);
        assert_eq!(out.lines, vec!["Sweep enabled".to_string()]);

        let out = execute_command(&mut ctx, SweepCommand::Disable);
        assert!(!ctx.enabled);
        assert_eq!(out.lines, vec!["Sweep disabled".to_string()]);
    }

    #[test]
    fn status_reports_settings_and_categories() {
        let mut ctx = StubContext::new();
        ctx.profile.categories.insert(
            "piglin".to_string(),
            CategoryRule {
                enabled: true,
                interval_multiplier: 2,
            },
        );
        ctx.stats = Some(SweepStats {
            firings: 7,
            visited_total: 63,
            ..SweepStats::default()
        });

        let out = execute_command(&mut ctx, SweepCommand::Status);
        let text = out.lines.join("\n");
        assert!(text.contains("Master switch: enabled"));
        assert!(text.contains("Period: 2 ticks, budget: 10 per firing"));
        assert!(text.contains("Firings: 7, objects visited: 63"));
        assert!(text.contains("- piglin: enabled, every 2 firings"));
        assert!(text.contains("- (default): enabled, every firing"));
    }

    #[test]
    fn status_of_disabled_sweep_omits_details() {
        let mut ctx = StubContext::new();
        ctx.enabled = false;

        let out = execute_command(&mut ctx, SweepCommand::Status);
        assert_eq!(out.lines.len(), 2);
        assert!(out.lines[1].contains("disabled"));
    }

    #[test]
    fn reload_reports_new_settings() {
        let mut ctx = StubContext::new();
        let mut reloaded = SweepProfile::default();
        reloaded.sweep = SweepConfig {
            period_ticks: 8,
            max_visits_per_firing: 0,
            enabled: true,
        };
        ctx.reload_result = Ok(reloaded);

        let out = execute_command(&mut ctx, SweepCommand::Reload);
        let text = out.lines.join("\n");
        assert!(text.contains("Profile reloaded"));
        assert!(text.contains("period=8 ticks, budget=unlimited, enabled"));
        assert_eq!(ctx.profile.sweep.period_ticks, 8);
    }

    #[test]
    fn failed_reload_keeps_previous_profile() {
        let mut ctx = StubContext::new();
        ctx.reload_result = Err("disk on fire");

        let out = execute_command(&mut ctx, SweepCommand::Reload);
        assert!(out.lines[0].contains("keeping previous profile"));
        assert_eq!(ctx.profile, SweepProfile::default());
    }
}
