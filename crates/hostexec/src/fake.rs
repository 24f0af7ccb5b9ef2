//! Scripted [`CommandExecutor`] for tests.
//!
//! Responses are keyed by the full command line (`"crm maintenance on"`).
//! Several responses for the same command are returned in order; the last
//! one repeats, which keeps polling loops simple to script.

use crate::context::Context;
use crate::error::{Error, Result};
use crate::executor::{CommandExecutor, command_line};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, PoisonError};

/// A scripted command outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// Exit 0 with the given output
    Ok(String),
    /// Exit non-zero with the given code and output
    Fail { code: i32, output: String },
}

impl Response {
    /// Successful response.
    pub fn ok(output: &str) -> Self {
        Self::Ok(output.to_string())
    }

    /// Failed response.
    pub fn fail(code: i32, output: &str) -> Self {
        Self::Fail {
            code,
            output: output.to_string(),
        }
    }
}

/// Executor returning scripted responses and recording every call.
#[derive(Debug, Default)]
pub struct ScriptedExecutor {
    responses: Mutex<HashMap<String, VecDeque<Response>>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedExecutor {
    /// Create an executor with no scripted responses.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response for `command`.
    pub fn on(&self, command: &str, response: Response) -> &Self {
        self.responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(command.to_string())
            .or_default()
            .push_back(response);
        self
    }

    /// Every command line executed so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of times `command` was executed.
    pub fn count(&self, command: &str) -> usize {
        self.calls().iter().filter(|c| *c == command).count()
    }

    /// Whether `command` was executed at least once.
    pub fn called(&self, command: &str) -> bool {
        self.count(command) > 0
    }

    fn respond(&self, name: &str, args: &[&str]) -> Result<Vec<u8>> {
        let command = command_line(name, args);
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(command.clone());

        let response = {
            let mut responses = self
                .responses
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            match responses.get_mut(&command) {
                Some(queue) if queue.len() > 1 => queue.pop_front(),
                Some(queue) => queue.front().cloned(),
                None => None,
            }
        };

        match response {
            Some(Response::Ok(output)) => Ok(output.into_bytes()),
            Some(Response::Fail { code, output }) => Err(Error::Failed {
                command,
                code: Some(code),
                status: format!("exit status {code}"),
                output,
            }),
            None => Err(Error::Spawn {
                source: std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("no scripted response for `{command}`"),
                ),
                command,
            }),
        }
    }
}

#[async_trait]
impl CommandExecutor for ScriptedExecutor {
    async fn exec(&self, name: &str, args: &[&str]) -> Result<Vec<u8>> {
        self.respond(name, args)
    }

    async fn exec_ctx(&self, ctx: &Context, name: &str, args: &[&str]) -> Result<Vec<u8>> {
        if let Some(err) = ctx.err() {
            return Err(err);
        }
        self.respond(name, args)
    }
}
