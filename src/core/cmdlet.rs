// src/core/cmdlet.rs

use crate::constants::{CALLABLE_COMMAND_TYPES, GET_COMMAND, SELECT_OBJECT};
use crate::core::session::Session;
use crate::error::{Error, Result};
use crate::models::{CallArgs, Record};
use serde_json::{Value, json};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

/// Maps a method-style name onto PowerShell's Verb-Noun convention: `Get_Process` -> `Get-Process`.
pub fn normalize_command_name(name: &str) -> String {
    name.replace('_', "-")
}

/// A fluent cmdlet builder over the environment's shared session.
///
/// ```no_run
/// # fn demo(env: &psenv::Environment) -> psenv::Result<()> {
/// let records = env
///     .cmdlet()
///     .call("Get_Process", psenv::CallArgs::named([("Name", "explorer")]))?
///     .run()?;
/// # Ok(())
/// # }
/// ```
///
/// Each call checks that the cmdlet exists and stages it; nothing runs until [`run`](Self::run).
#[derive(Debug)]
pub struct Cmdlet {
    session: Rc<RefCell<Session>>,
    command: Option<String>,
    parameters: BTreeMap<String, Value>,
}

impl Cmdlet {
    /// A builder with nothing staged, bound to the given session.
    pub fn new(session: Rc<RefCell<Session>>) -> Self {
        Self {
            session,
            command: None,
            parameters: BTreeMap::new(),
        }
    }

    /// Stages a cmdlet call.
    ///
    /// The name is normalized (`_` -> `-`) and checked against the live session; a missing
    /// cmdlet fails with [`Error::CommandNotFound`] and leaves nothing staged. Arguments are
    /// staged only when every one of them is named. Positional arguments are dropped.
    pub fn call(&mut self, name: &str, args: CallArgs) -> Result<&mut Self> {
        let command_name = normalize_command_name(name);
        self.command = None;
        self.parameters.clear();

        if !self.command_exists(&command_name)? {
            return Err(Error::CommandNotFound(command_name));
        }
        self.command = Some(command_name);

        if !args.is_empty() {
            let count = args.len();
            match args.into_named() {
                Some(pairs) => self.parameters.extend(pairs),
                None => log::warn!(
                    "Dropping {} argument(s) for '{}': only named arguments are staged.",
                    count,
                    self.command.as_deref().unwrap_or_default()
                ),
            }
        }

        Ok(self)
    }

    /// Stages a cmdlet with no arguments. Same as `call(name, CallArgs::none())`.
    pub fn command(&mut self, name: &str) -> Result<&mut Self> {
        self.call(name, CallArgs::none())
    }

    /// Adds or replaces one named parameter on the staged cmdlet.
    pub fn param(&mut self, name: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.parameters.insert(name.into(), value.into());
        self
    }

    /// The cmdlet `run` would execute, if any.
    pub fn staged_command(&self) -> Option<&str> {
        self.command.as_deref()
    }

    /// The named parameters `run` would pass.
    pub fn staged_parameters(&self) -> &BTreeMap<String, Value> {
        &self.parameters
    }

    /// Runs the staged cmdlet and returns its output records. The staged state is consumed.
    pub fn run(&mut self) -> Result<Vec<Record>> {
        let command = self.command.take().ok_or(Error::NoCommandStaged)?;
        let parameters = std::mem::take(&mut self.parameters);

        let mut session = self.session.borrow_mut();
        session.clear();
        let staged = session.add_command(command);
        for (name, value) in parameters {
            staged.parameter(name, value);
        }
        session.invoke()
    }

    fn command_exists(&self, command_name: &str) -> Result<bool> {
        let mut session = self.session.borrow_mut();
        session.clear();
        session
            .add_command(GET_COMMAND)
            .parameter("Name", command_name)
            .parameter("CommandType", Value::from(CALLABLE_COMMAND_TYPES.to_vec()));
        // Command metadata is large; only the count matters here.
        session
            .add_command(SELECT_OBJECT)
            .parameter("Property", json!(["Name", "Source"]));
        Ok(!session.invoke()?.is_empty())
    }
}
