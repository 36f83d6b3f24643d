//! Un manager para correrlos a todos: muchos flows, cada uno en su schedule.

use std::fs;
use std::io;
use std::path::Path;
use std::thread;

use chrono::{Local, NaiveDateTime, Timelike};
use parking_lot::Mutex;
use thiserror::Error;

use aflow_core::{Flow, FlowConfigMap, FlowError, RunReport};

use crate::schedule::Schedule;

#[derive(Debug, Error)]
pub enum ManagerError {
    #[error("flow '{0}' already added")]
    Duplicate(String),
    #[error("flow '{0}' isn't already configured")]
    NotConfigured(String),
    #[error("flow '{0}' is already configured")]
    AlreadyConfigured(String),
    #[error("io: {0}")]
    Io(#[from] io::Error),
    #[error("couldn't parse configuration: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error(transparent)]
    Flow(#[from] FlowError),
}

/// La superficie de un flow que el manager necesita, independiente del tipo
/// de record. Cualquier `Flow<R>` la implementa.
pub trait ManagedFlow: Send + Sync {
    fn name(&self) -> &str;
    fn is_configured(&self) -> bool;
    fn config(&mut self, configs: &FlowConfigMap) -> Result<(), FlowError>;
    fn logfile(&self, path: &Path) -> io::Result<()>;
    fn run(&self) -> Result<RunReport, FlowError>;
}

impl<R: Send + 'static> ManagedFlow for Flow<R> {
    fn name(&self) -> &str {
        Flow::name(self)
    }

    fn is_configured(&self) -> bool {
        Flow::is_configured(self)
    }

    fn config(&mut self, configs: &FlowConfigMap) -> Result<(), FlowError> {
        Flow::config(self, configs)
    }

    fn logfile(&self, path: &Path) -> io::Result<()> {
        Flow::logfile(self, path)
    }

    fn run(&self) -> Result<RunReport, FlowError> {
        Flow::run(self)
    }
}

/// El resultado de una corrida disparada por el manager.
pub struct FlowOutcome {
    pub flow: String,
    pub result: Result<RunReport, FlowError>,
}

/// Corre muchos flows sobre schedules predeterminados.
///
/// Cada chequeo (`run_due`) evalúa todos los schedules contra el reloj y
/// corre los flows que correspondan, hasta `num_threads` a la vez.
pub struct FlowManager {
    flows: Vec<(Box<dyn ManagedFlow>, Schedule)>,
    num_threads: usize,
}

impl FlowManager {
    pub fn new(num_threads: usize) -> Self {
        Self { flows: Vec::new(),
               num_threads: num_threads.max(1) }
    }

    pub fn flow_names(&self) -> Vec<&str> {
        self.flows.iter().map(|(f, _)| f.name()).collect()
    }

    fn check_if_added(&self, name: &str) -> Result<(), ManagerError> {
        if self.flows.iter().any(|(f, _)| f.name() == name) {
            return Err(ManagerError::Duplicate(name.to_string()));
        }
        Ok(())
    }

    /// Agrega un flow ya configurado para correr en un schedule.
    pub fn add_configured(&mut self,
                          flow: Box<dyn ManagedFlow>,
                          schedule: Schedule)
                          -> Result<(), ManagerError> {
        self.check_if_added(flow.name())?;
        if !flow.is_configured() {
            return Err(ManagerError::NotConfigured(flow.name().to_string()));
        }
        self.flows.push((flow, schedule));
        Ok(())
    }

    /// Agrega un flow sin configurar: lee su configuración YAML del path
    /// dado, lo configura, le agrega los logfiles y lo deja en el schedule.
    pub fn add_unconfigured(&mut self,
                            mut flow: Box<dyn ManagedFlow>,
                            schedule: Schedule,
                            config_path: &Path,
                            logfiles: &[&Path])
                            -> Result<(), ManagerError> {
        self.check_if_added(flow.name())?;
        if flow.is_configured() {
            return Err(ManagerError::AlreadyConfigured(flow.name().to_string()));
        }
        let contents = fs::read_to_string(config_path)?;
        let configs: FlowConfigMap = serde_yaml::from_str(&contents)?;
        flow.config(&configs)?;
        for logfile in logfiles {
            flow.logfile(logfile)?;
        }
        self.flows.push((flow, schedule));
        Ok(())
    }

    /// Chequea todos los schedules contra el reloj local (redondeado hacia
    /// abajo al minuto) y corre los flows que correspondan.
    pub fn run_due(&self) -> Vec<FlowOutcome> {
        let now = Local::now().naive_local();
        let now = now.with_second(0)
                     .and_then(|n| n.with_nanosecond(0))
                     .unwrap_or(now);
        self.run_due_at(now)
    }

    /// Como `run_due`, pero contra un instante dado.
    pub fn run_due_at(&self, at: NaiveDateTime) -> Vec<FlowOutcome> {
        let due: Vec<&dyn ManagedFlow> = self.flows
                                             .iter()
                                             .filter(|(_, schedule)| schedule.matches(at))
                                             .map(|(flow, _)| flow.as_ref())
                                             .collect();

        if self.num_threads == 1 || due.len() <= 1 {
            return due.into_iter().map(run_one).collect();
        }

        let outcomes = Mutex::new(Vec::with_capacity(due.len()));
        for chunk in due.chunks(self.num_threads) {
            thread::scope(|scope| {
                for flow in chunk {
                    let outcomes = &outcomes;
                    scope.spawn(move || {
                        let outcome = run_one(*flow);
                        outcomes.lock().push(outcome);
                    });
                }
            });
        }
        outcomes.into_inner()
    }
}

fn run_one(flow: &dyn ManagedFlow) -> FlowOutcome {
    tracing::info!(target: "aflow::manager", "Running {}...", flow.name());
    let result = flow.run();
    if let Err(e) = &result {
        tracing::error!(target: "aflow::manager", "{} failed: {e}", flow.name());
    }
    FlowOutcome { flow: flow.name().to_string(),
                  result }
}
