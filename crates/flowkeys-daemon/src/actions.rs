//! Running bound actions
//!
//! Callbacks run synchronously inside the listener that matched them, so
//! actions must not block: programs are spawned and left to run.

use std::process::Stdio;

use flowkeys_config::{Action, Binding};

/// Build the callback registered for `binding`.
pub fn callback_for(binding: &Binding) -> impl Fn() + Send + Sync + 'static {
    let name = binding.describe();
    let actions = binding.actions.clone();

    move || {
        tracing::debug!("Binding fired: {}", name);
        for action in &actions {
            run_action(&name, action);
        }
    }
}

/// Run a single action. Failures are logged, never propagated.
///
/// Returns whether the action was started.
pub fn run_action(binding: &str, action: &Action) -> bool {
    match action {
        Action::Spawn { command, args } => {
            let result = tokio::process::Command::new(command)
                .args(args)
                .stdin(Stdio::null())
                .spawn();

            match result {
                Ok(child) => {
                    tracing::debug!(
                        "Spawned {} (pid {:?}) for {}",
                        command,
                        child.id(),
                        binding
                    );
                    true
                }
                Err(e) => {
                    tracing::warn!("Failed to spawn {} for {}: {}", command, binding, e);
                    false
                }
            }
        }
        Action::Log(message) => {
            tracing::info!(binding = %binding, "{}", message);
            true
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowkeys::Step;
    use std::path::Path;
    use std::time::Duration;

    fn touch(path: &Path) -> Action {
        Action::Spawn {
            command: "touch".to_string(),
            args: vec![path.display().to_string()],
        }
    }

    /// Wait for a spawned program to create `path`.
    async fn wait_for(path: &Path) -> bool {
        for _ in 0..200 {
            if path.exists() {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        path.exists()
    }

    #[tokio::test]
    async fn test_spawn_missing_program_is_reported() {
        let started = run_action(
            "a",
            &Action::Spawn {
                command: "/nonexistent/flowkeys-test-program".to_string(),
                args: Vec::new(),
            },
        );
        assert!(!started, "A missing program must not count as started");
    }

    #[tokio::test]
    async fn test_spawn_program_with_args() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("marker");

        assert!(run_action("a", &touch(&marker)));
        assert!(wait_for(&marker).await, "Spawned program should create the marker");
    }

    #[tokio::test]
    async fn test_log_action_runs() {
        assert!(run_action("a", &Action::Log("hello".to_string())));
    }

    #[tokio::test]
    async fn test_callback_runs_all_actions() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("first");
        let second = dir.path().join("second");

        let binding = Binding {
            sequence: vec![Step::key("g"), Step::key("g")],
            actions: vec![
                touch(&first),
                Action::Log("between".to_string()),
                touch(&second),
            ],
        };
        let callback = callback_for(&binding);
        callback();

        assert!(wait_for(&first).await, "First action should have run");
        assert!(wait_for(&second).await, "Actions after the first should run too");
    }
}
