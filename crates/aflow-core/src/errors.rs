//! Errores del core, separados por la etapa en la que pueden aparecer.
//!
//! `ConfigError` y `DependencyError` son siempre fatales y ocurren antes de
//! tocar cualquier record. `StepError` aparece en tiempo de ejecución desde
//! el cuerpo de un step.

use std::fmt;

use thiserror::Error;

/// Configuración inválida, detectada al hacer el binding o en `validate()`.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ConfigError {
    #[error("option '{option}' not present in configuration for '{step}'")]
    MissingOption { step: String, option: String },
    #[error("option '{option}' for '{step}' expects {expected}, got {found}")]
    WrongType { step: String, option: String, expected: &'static str, found: &'static str },
    #[error("unknown option '{option}' in configuration for '{step}'")]
    UnknownOption { step: String, option: String },
    #[error("configuration for '{0}' isn't present")]
    MissingSection(String),
    #[error("configuration for '{0}' isn't a mapping")]
    NotAMapping(String),
    #[error("'{step}' failed validation: {reason}")]
    FailedValidation { step: String, reason: String },
    #[error("invalid mode '{mode}' for '{step}'")]
    InvalidMode { step: String, mode: String },
    #[error("can't exclude a record storer")]
    ExcludedStorer,
    #[error("configuration 'num_threads' doesn't use any threads")]
    NoThreads,
}

/// Registro de dependencias inválido. Como toda dependencia debe existir ya
/// en la misma fase, los ciclos son imposibles por construcción.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum DependencyError {
    #[error("'{0}' already exists as a step")]
    DuplicateName(String),
    #[error("dependency '{dependency}' of '{step}' doesn't exist as a step")]
    UnknownDependency { step: String, dependency: String },
    #[error("dependency '{dependency}' of '{step}' isn't in the same phase")]
    WrongPhase { step: String, dependency: String },
}

/// Fallo en tiempo de ejecución dentro de un step (cualquier fase).
#[derive(Debug, Error)]
pub enum StepError {
    #[error("{0}")]
    Failed(String),
    #[error("metadata '{0}' was never set")]
    MetadataMissing(String),
    #[error("metadata '{name}' holds a {found}, expected {expected}")]
    MetadataType { name: String, expected: &'static str, found: &'static str },
    #[error("metadata '{0}' was already set by another step")]
    MetadataConflict(String),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Un step que falló dentro de una fase DAG, junto a su error.
#[derive(Debug)]
pub struct StepFailure {
    pub step: String,
    pub error: StepError,
}

impl fmt::Display for StepFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.step, self.error)
    }
}

/// Error a nivel de flow. Las fallas parciales de una fase DAG no pasan por
/// aquí: se acumulan en el `RunReport` y la corrida continúa.
#[derive(Debug, Error)]
pub enum FlowError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Dependency(#[from] DependencyError),
    #[error("record storer '{step}' failed: {source}")]
    Storer { step: String, source: StepError },
    #[error("record step '{step}' failed: {source}")]
    RecordStep { step: String, source: StepError },
    #[error("flow '{0}' isn't configured")]
    NotConfigured(String),
}
