//! KDL configuration parser

use std::path::Path;

use flowkeys::Step;

use crate::error::{ConfigError, InvalidStepInfo, SourceLocation};
use crate::model::*;

/// Extract source location from a KDL entry
fn get_entry_location(entry: &kdl::KdlEntry, source: &str) -> SourceLocation {
    let span = entry.span();
    let offset = span.offset();
    let len = span.len();

    let (line, column) = offset_to_line_col(source, offset);

    SourceLocation::new(line, column, offset, len)
}

/// Convert byte offset to line and column (1-indexed)
fn offset_to_line_col(source: &str, offset: usize) -> (usize, usize) {
    let mut line = 1;
    let mut col = 1;

    for (i, ch) in source.char_indices() {
        if i >= offset {
            break;
        }
        if ch == '\n' {
            line += 1;
            col = 1;
        } else {
            col += 1;
        }
    }

    (line, col)
}

/// Positional arguments of a node (properties are skipped).
fn arguments(node: &kdl::KdlNode) -> impl Iterator<Item = &kdl::KdlEntry> {
    node.entries().iter().filter(|e| e.name().is_none())
}

/// Text of a string or integer argument. Bare integers let `bind 1 2` work.
fn argument_text(entry: &kdl::KdlEntry) -> Option<String> {
    let value = entry.value();
    value
        .as_string()
        .map(str::to_string)
        .or_else(|| value.as_i64().map(|n| n.to_string()))
}

/// Parse a configuration file from the given path
pub fn parse_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    parse_config_str(&content)
}

/// Parse configuration from a string
pub fn parse_config_str(content: &str) -> Result<Config, ConfigError> {
    let doc: kdl::KdlDocument = content.parse().map_err(|e: kdl::KdlError| {
        // kdl depends on an older miette, so rebuild the span from offset/len
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
    let mut invalid_steps = Vec::new();

    for node in doc.nodes() {
        match node.name().value() {
            "global" => {
                config.global = parse_global(node)?;
            }
            "alias" => {
                config.aliases.push(parse_alias(node)?);
            }
            "device" => {
                config.devices.push(parse_device(node)?);
            }
            "bind" => {
                if let Some(binding) = parse_bind(node, content, &mut invalid_steps)? {
                    config.bindings.push(binding);
                }
            }
            name => {
                tracing::warn!("Unknown top-level node: {}", name);
            }
        }
    }

    // Report every bad step at once rather than one per run
    if !invalid_steps.is_empty() {
        return Err(ConfigError::InvalidSteps { invalid_steps });
    }

    Ok(config)
}

fn parse_global(node: &kdl::KdlNode) -> Result<GlobalConfig, ConfigError> {
    let mut global = GlobalConfig::default();

    if let Some(children) = node.children() {
        for child in children.nodes() {
            match child.name().value() {
                "log-level" => {
                    if let Some(val) = arguments(child).next().and_then(|e| e.value().as_string()) {
                        global.log_level = val
                            .parse()
                            .map_err(|message| ConfigError::Invalid { message })?;
                    }
                }
                "policy" => {
                    if let Some(val) = arguments(child).next().and_then(|e| e.value().as_string()) {
                        global.policy = val
                            .parse()
                            .map_err(|message| ConfigError::Invalid { message })?;
                    }
                }
                "debounce-ms" => {
                    let value = arguments(child).next().and_then(|e| e.value().as_i64());
                    match value {
                        Some(ms) if ms >= 0 => global.debounce_ms = ms as u64,
                        _ => {
                            return Err(ConfigError::Invalid {
                                message: "debounce-ms must be a non-negative integer".to_string(),
                            });
                        }
                    }
                }
                name => {
                    tracing::warn!("Unknown global config option: {}", name);
                }
            }
        }
    }

    Ok(global)
}

fn parse_alias(node: &kdl::KdlNode) -> Result<AliasConfig, ConfigError> {
    let mut args = arguments(node).filter_map(argument_text);

    let canonical = args.next().ok_or_else(|| ConfigError::MissingField {
        field: "alias canonical key (e.g., `alias \"control\" \"strg\"`)".to_string(),
    })?;
    let alternates: Vec<String> = args.collect();

    if alternates.is_empty() {
        return Err(ConfigError::Invalid {
            message: format!("Alias '{}' has no alternate keys", canonical),
        });
    }

    Ok(AliasConfig {
        canonical,
        alternates,
    })
}

fn parse_device(node: &kdl::KdlNode) -> Result<String, ConfigError> {
    arguments(node)
        .next()
        .and_then(|e| e.value().as_string())
        .map(str::to_string)
        .ok_or_else(|| ConfigError::MissingField {
            field: "device name (e.g., `device \"My Keyboard\"`)".to_string(),
        })
}

/// Parse a `bind` node. Unparseable steps are appended to `invalid_steps`
/// and the binding is dropped.
fn parse_bind(
    node: &kdl::KdlNode,
    source: &str,
    invalid_steps: &mut Vec<InvalidStepInfo>,
) -> Result<Option<Binding>, ConfigError> {
    let mut sequence = Vec::new();
    let mut valid = true;

    for entry in arguments(node) {
        let Some(text) = argument_text(entry) else {
            continue;
        };
        match text.parse::<Step>() {
            Ok(step) => sequence.push(step),
            Err(e) => {
                valid = false;
                invalid_steps.push(InvalidStepInfo {
                    step: text,
                    reason: e.reason,
                    location: get_entry_location(entry, source),
                });
            }
        }
    }

    if sequence.is_empty() && valid {
        return Err(ConfigError::MissingField {
            field: "bind sequence (e.g., `bind \"Control+k\" { ... }`)".to_string(),
        });
    }

    let actions = node.children().map(parse_actions).transpose()?.unwrap_or_default();

    // Bad steps are reported together with the rest of the file's
    if !valid {
        return Ok(None);
    }

    if actions.is_empty() {
        return Err(ConfigError::MissingField {
            field: format!(
                "bind action for `{}` (e.g., `spawn \"program\"` or `log \"message\"`)",
                sequence
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(" ")
            ),
        });
    }

    Ok(Some(Binding { sequence, actions }))
}

fn parse_actions(children: &kdl::KdlDocument) -> Result<Vec<Action>, ConfigError> {
    let mut actions = Vec::new();

    for child in children.nodes() {
        match child.name().value() {
            "spawn" => {
                let mut args = arguments(child).filter_map(argument_text);
                let command = args.next().ok_or_else(|| ConfigError::MissingField {
                    field: "spawn command (e.g., `spawn \"notify-send\" \"hello\"`)".to_string(),
                })?;
                actions.push(Action::Spawn {
                    command,
                    args: args.collect(),
                });
            }
            "log" => {
                let message = arguments(child)
                    .filter_map(argument_text)
                    .collect::<Vec<_>>()
                    .join(" ");
                actions.push(Action::Log(message));
            }
            name => {
                tracing::warn!("Unknown bind action: {}", name);
            }
        }
    }

    Ok(actions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::time::Duration;

    use flowkeys::FinalizePolicy;

    #[test]
    fn test_parse_basic_config() {
        let config = r#"
            global {
                log-level "debug"
                policy "debounce"
                debounce-ms 50
            }

            alias "control" "ctrl" "strg"
            device "Keychron K3 Pro"

            bind "Control+k" {
                log "command palette"
            }
            bind "g" "g" {
                spawn "notify-send" "top"
            }
        "#;

        let config = parse_config_str(config).unwrap();

        assert_eq!(config.global.log_level, LogLevel::Debug);
        assert_eq!(config.global.policy, PolicyKind::Debounce);
        assert_eq!(config.global.debounce_ms, 50);
        assert_eq!(
            config.settings().policy,
            FinalizePolicy::Debounce {
                delay: Duration::from_millis(50)
            }
        );

        assert_eq!(
            config.aliases,
            vec![AliasConfig {
                canonical: "control".to_string(),
                alternates: vec!["ctrl".to_string(), "strg".to_string()],
            }]
        );
        assert_eq!(config.devices, vec!["Keychron K3 Pro".to_string()]);

        assert_eq!(config.bindings.len(), 2);
        assert_eq!(config.bindings[0].sequence, vec![Step::combo(["Control", "k"])]);
        assert_eq!(
            config.bindings[0].actions,
            vec![Action::Log("command palette".to_string())]
        );
        assert_eq!(config.bindings[1].sequence, vec![Step::key("g"), Step::key("g")]);
        assert_eq!(
            config.bindings[1].actions,
            vec![Action::Spawn {
                command: "notify-send".to_string(),
                args: vec!["top".to_string()],
            }]
        );
    }

    #[test]
    fn test_defaults() {
        let config = parse_config_str("").unwrap();
        assert_eq!(config.global.log_level, LogLevel::Info);
        assert_eq!(config.global.policy, PolicyKind::ReleaseEdge);
        assert_eq!(config.global.debounce_ms, 30);
        assert_eq!(config.settings().policy, FinalizePolicy::ReleaseEdge);
        assert!(config.aliases.is_empty());
        assert!(config.devices.is_empty());
        assert!(config.bindings.is_empty());
    }

    #[test]
    fn test_unknown_policy_fails() {
        let config = r#"
            global {
                policy "sometimes"
            }
        "#;
        let result = parse_config_str(config);
        assert!(matches!(result, Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn test_negative_debounce_fails() {
        let config = r#"
            global {
                debounce-ms -5
            }
        "#;
        let result = parse_config_str(config);
        assert!(matches!(result, Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn test_alias_without_alternates_fails() {
        let result = parse_config_str(r#"alias "control""#);
        assert!(matches!(result, Err(ConfigError::Invalid { .. })));

        let result = parse_config_str("alias");
        assert!(matches!(result, Err(ConfigError::MissingField { .. })));
    }

    #[test]
    fn test_device_missing_name_error() {
        let result = parse_config_str("device");
        assert!(
            matches!(result, Err(ConfigError::MissingField { ref field }) if field.contains("device name")),
            "Expected MissingField error for device name, got: {:?}",
            result
        );
    }

    #[test]
    fn test_bind_without_sequence_fails() {
        let config = r#"
            bind {
                log "nothing"
            }
        "#;
        let result = parse_config_str(config);
        assert!(
            matches!(result, Err(ConfigError::MissingField { ref field }) if field.contains("bind sequence")),
            "got: {:?}",
            result
        );
    }

    #[test]
    fn test_bind_without_action_fails() {
        let result = parse_config_str(r#"bind "a""#);
        assert!(
            matches!(result, Err(ConfigError::MissingField { ref field }) if field.contains("bind action")),
            "got: {:?}",
            result
        );
    }

    #[test]
    fn test_spawn_without_command_fails() {
        let config = r#"
            bind "a" {
                spawn
            }
        "#;
        let result = parse_config_str(config);
        assert!(matches!(result, Err(ConfigError::MissingField { .. })));
    }

    #[test]
    fn test_invalid_steps_all_reported() {
        let config = r#"bind "Control+" { log "x"; }
bind "ok" "a++b" { log "y"; }
"#;
        let result = parse_config_str(config);

        match result {
            Err(ConfigError::InvalidSteps { invalid_steps }) => {
                assert_eq!(invalid_steps.len(), 2, "Both bad steps should be reported");
                assert_eq!(invalid_steps[0].step, "Control+");
                assert_eq!(invalid_steps[0].location.line, 1);
                assert_eq!(invalid_steps[1].step, "a++b");
                assert_eq!(invalid_steps[1].location.line, 2);
            }
            other => panic!("Expected InvalidSteps, got: {:?}", other),
        }
    }

    #[test]
    fn test_invalid_step_without_actions_reported_as_invalid() {
        let config = r#"bind "Control+"
bind "a++b" { log "y"; }
"#;
        let result = parse_config_str(config);

        match result {
            Err(ConfigError::InvalidSteps { invalid_steps }) => {
                assert_eq!(
                    invalid_steps.len(),
                    2,
                    "A bad step must be reported even when its bind has no actions"
                );
                assert_eq!(invalid_steps[0].step, "Control+");
                assert_eq!(invalid_steps[1].step, "a++b");
            }
            other => panic!("Expected InvalidSteps, got: {:?}", other),
        }
    }

    #[test]
    fn test_integer_steps() {
        let config = r#"
            bind 1 2 {
                log "one two"
            }
        "#;
        let config = parse_config_str(config).unwrap();
        assert_eq!(config.bindings[0].sequence, vec![Step::key("1"), Step::key("2")]);
        assert_eq!(config.bindings[0].describe(), "1 2");
    }

    #[test]
    fn test_multiple_actions() {
        let config = r#"
            bind "Control+s" {
                log "saving"
                spawn "sync"
            }
        "#;
        let config = parse_config_str(config).unwrap();
        assert_eq!(config.bindings[0].actions.len(), 2);
    }

    #[test]
    fn test_unknown_nodes_are_ignored() {
        let config = r#"
            profile "gaming"
            bind "a" {
                log "a"
                teleport "home"
            }
        "#;
        let config = parse_config_str(config).unwrap();
        assert_eq!(config.bindings.len(), 1);
        assert_eq!(config.bindings[0].actions, vec![Action::Log("a".to_string())]);
    }

    #[test]
    fn test_kdl_syntax_error() {
        let result = parse_config_str(r#"bind "a" {"#);
        assert!(matches!(result, Err(ConfigError::ParseError { .. })));
    }

    #[test]
    fn test_parse_config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, r#"bind "Escape" {{ log "escape"; }}"#).unwrap();

        let config = parse_config(file.path()).unwrap();
        assert_eq!(config.bindings.len(), 1);
        assert_eq!(config.bindings[0].sequence, vec![Step::key("Escape")]);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let result = parse_config(Path::new("/nonexistent/flowkeys/config.kdl"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }
}
