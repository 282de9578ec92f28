use crate::command::{CommandRunner, Invocation};
use crate::RuntimeError;
use std::sync::Mutex;

type Hook = Box<dyn Fn(&Invocation) -> i32 + Send + Sync>;

/// Recording runner for tests: nothing is executed.
///
/// Responses are matched on the program's final path component, the most
/// recently added rule first; unmatched invocations succeed with status 0.
#[derive(Default)]
pub struct MockRunner {
    calls: Mutex<Vec<Invocation>>,
    rules: Vec<(String, Hook)>,
}

impl MockRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer invocations of `program` with a fixed exit status.
    #[must_use]
    pub fn with_exit(self, program: &str, status: i32) -> Self {
        self.with_hook(program, move |_| status)
    }

    /// Answer invocations of `program` by calling `hook`, which can fake the
    /// tool's side effects and returns its exit status.
    #[must_use]
    pub fn with_hook<F>(mut self, program: &str, hook: F) -> Self
    where
        F: Fn(&Invocation) -> i32 + Send + Sync + 'static,
    {
        self.rules.push((program.to_owned(), Box::new(hook)));
        self
    }

    pub fn calls(&self) -> Vec<Invocation> {
        self.calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }

    /// Names of the programs invoked so far, in order.
    pub fn programs(&self) -> Vec<String> {
        self.calls().iter().map(Invocation::program_name).collect()
    }

    pub fn invoked(&self, program: &str) -> bool {
        self.programs().iter().any(|p| p == program)
    }
}

impl CommandRunner for MockRunner {
    fn status(&self, invocation: &Invocation) -> Result<i32, RuntimeError> {
        self.calls
            .lock()
            .map_err(|e| RuntimeError::CommandFailed {
                command: invocation.to_string(),
                reason: format!("mutex poisoned: {e}"),
            })?
            .push(invocation.clone());

        let name = invocation.program_name();
        let status = self
            .rules
            .iter()
            .rev()
            .find(|(program, _)| *program == name)
            .map_or(0, |(_, hook)| hook(invocation));
        Ok(status)
    }
}
