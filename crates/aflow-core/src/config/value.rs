use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Los kinds escalares admitidos en configuraciones de steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigKind {
    Integer,
    String,
    Boolean,
    Timestamp,
}

impl ConfigKind {
    /// Nombre corto del kind, usado en los hints de `describe_config`.
    pub fn name(self) -> &'static str {
        match self {
            ConfigKind::Integer => "int",
            ConfigKind::String => "str",
            ConfigKind::Boolean => "bool",
            ConfigKind::Timestamp => "timestamp",
        }
    }
}

/// Un valor escalar de configuración.
///
/// Se deserializa sin tag: los enteros y booleanos mapean directo, y un
/// string con formato RFC 3339 se interpreta como `Timestamp` antes de caer
/// en `String`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConfigValue {
    Integer(i64),
    Boolean(bool),
    Timestamp(DateTime<Utc>),
    String(String),
}

impl ConfigValue {
    pub fn kind(&self) -> ConfigKind {
        match self {
            ConfigValue::Integer(_) => ConfigKind::Integer,
            ConfigValue::Boolean(_) => ConfigKind::Boolean,
            ConfigValue::Timestamp(_) => ConfigKind::Timestamp,
            ConfigValue::String(_) => ConfigKind::String,
        }
    }
}

/// Una entrada de la configuración del flow: o un escalar a nivel de flow
/// (`num_threads`, `<step>-mode`) o la sección de un step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConfigEntry {
    Scalar(ConfigValue),
    Section(IndexMap<String, ConfigValue>),
}

/// La configuración completa de un flow, con el mismo shape que produce
/// `Flow::describe_config` una vez reemplazados los hints por valores.
pub type FlowConfigMap = IndexMap<String, ConfigEntry>;

/// Una entrada del template que produce `describe_config`: cada hoja es un
/// hint textual `"(kind) descripción"`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ConfigTemplate {
    Hint(String),
    Section(IndexMap<String, String>),
}
