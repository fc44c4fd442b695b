// src/core/testing.rs
//
// Scripted engine used by the unit tests. Every invocation is recorded so tests can
// assert on exactly what was staged.

use crate::constants::GET_COMMAND;
use crate::models::{Invocation, Record, StagedCommand};
use crate::system::engine::{Engine, EngineError, HostFactory};
use serde_json::{Value, json};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub(crate) type Responder =
    Arc<dyn Fn(&[StagedCommand]) -> Result<Invocation, EngineError> + Send + Sync>;

struct FakeState {
    responder: Responder,
    log: Mutex<Vec<Vec<StagedCommand>>>,
    spawned: AtomicUsize,
    closed: AtomicUsize,
    fail_spawns: AtomicBool,
}

#[derive(Clone)]
pub(crate) struct FakeFactory {
    state: Arc<FakeState>,
}

impl FakeFactory {
    /// Every command exists; everything else succeeds with no output.
    pub(crate) fn new() -> Self {
        Self::with_responder(|pipeline| {
            if pipeline[0].name == GET_COMMAND {
                let name = name_param(pipeline).unwrap_or_default();
                return Ok(records(vec![json!({ "Name": name })]));
            }
            Ok(Invocation::default())
        })
    }

    pub(crate) fn with_responder<F>(responder: F) -> Self
    where
        F: Fn(&[StagedCommand]) -> Result<Invocation, EngineError> + Send + Sync + 'static,
    {
        Self {
            state: Arc::new(FakeState {
                responder: Arc::new(responder),
                log: Mutex::new(Vec::new()),
                spawned: AtomicUsize::new(0),
                closed: AtomicUsize::new(0),
                fail_spawns: AtomicBool::new(false),
            }),
        }
    }

    /// Every pipeline invoked so far, across all hosts, in order.
    pub(crate) fn invocations(&self) -> Vec<Vec<StagedCommand>> {
        self.state.log.lock().unwrap().clone()
    }

    /// Name of the first command of every invocation.
    pub(crate) fn command_names(&self) -> Vec<String> {
        self.invocations()
            .iter()
            .map(|pipeline| pipeline[0].name.clone())
            .collect()
    }

    pub(crate) fn spawned(&self) -> usize {
        self.state.spawned.load(Ordering::SeqCst)
    }

    pub(crate) fn closed(&self) -> usize {
        self.state.closed.load(Ordering::SeqCst)
    }

    pub(crate) fn fail_spawns(&self, fail: bool) {
        self.state.fail_spawns.store(fail, Ordering::SeqCst);
    }
}

impl HostFactory for FakeFactory {
    fn spawn(&self) -> Result<Box<dyn Engine>, EngineError> {
        if self.state.fail_spawns.load(Ordering::SeqCst) {
            return Err(EngineError::Spawn {
                program: "fake".to_string(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "fake spawn failure"),
            });
        }
        self.state.spawned.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeEngine {
            state: Arc::clone(&self.state),
        }))
    }
}

struct FakeEngine {
    state: Arc<FakeState>,
}

impl Engine for FakeEngine {
    fn invoke(&mut self, pipeline: &[StagedCommand]) -> Result<Invocation, EngineError> {
        if pipeline.is_empty() {
            return Err(EngineError::EmptyPipeline);
        }
        self.state.log.lock().unwrap().push(pipeline.to_vec());
        (self.state.responder)(pipeline)
    }

    fn close(&mut self) -> Result<(), EngineError> {
        self.state.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub(crate) fn records(values: Vec<Value>) -> Invocation {
    Invocation {
        records: values.into_iter().map(Record::from).collect(),
        had_errors: false,
        errors: Vec::new(),
    }
}

pub(crate) fn failed(message: &str) -> Invocation {
    Invocation {
        records: Vec::new(),
        had_errors: true,
        errors: vec![message.to_string()],
    }
}

/// The `-Name` parameter of the first command, as a string.
pub(crate) fn name_param(pipeline: &[StagedCommand]) -> Option<String> {
    pipeline[0]
        .get_parameter("Name")
        .and_then(Value::as_str)
        .map(str::to_string)
}
