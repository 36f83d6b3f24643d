//! Side-channel de metadata entre steps dentro de una misma corrida.
//!
//! El store es seguro para acceso concurrente desde todos los workers de una
//! fase. Los valores son una unión etiquetada con accessors que devuelven
//! `Result`, en lugar de un `object` implícito que obligue a castear.

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde_json::Value;

use crate::errors::StepError;

/// Un valor de metadata etiquetado por tipo.
#[derive(Debug, Clone, PartialEq)]
pub enum MetadataValue {
    Integer(i64),
    String(String),
    Boolean(bool),
    Timestamp(DateTime<Utc>),
    Json(Value),
}

impl MetadataValue {
    pub fn kind(&self) -> &'static str {
        match self {
            MetadataValue::Integer(_) => "int",
            MetadataValue::String(_) => "str",
            MetadataValue::Boolean(_) => "bool",
            MetadataValue::Timestamp(_) => "timestamp",
            MetadataValue::Json(_) => "json",
        }
    }
}

/// Store de metadata keyed por nombre, creado por corrida y descartado al
/// final. Cada nombre tiene un único escritor: un segundo `set` sobre el
/// mismo nombre es un error duro, no un last-writer-wins silencioso.
#[derive(Debug, Default)]
pub struct MetadataStore {
    entries: DashMap<String, MetadataValue>,
}

impl MetadataStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registra un valor bajo `name`. Falla con `MetadataConflict` si el
    /// nombre ya fue escrito, sin importar por quién.
    pub fn set(&self, name: &str, value: MetadataValue) -> Result<(), StepError> {
        match self.entries.entry(name.to_string()) {
            Entry::Occupied(_) => Err(StepError::MetadataConflict(name.to_string())),
            Entry::Vacant(slot) => {
                slot.insert(value);
                Ok(())
            }
        }
    }

    /// Último valor escrito bajo `name`, o `None` si nunca se escribió.
    pub fn get(&self, name: &str) -> Option<MetadataValue> {
        self.entries.get(name).map(|v| v.clone())
    }

    pub fn integer(&self, name: &str) -> Result<i64, StepError> {
        match self.require(name)? {
            MetadataValue::Integer(v) => Ok(v),
            other => Err(self.type_error(name, "int", &other)),
        }
    }

    pub fn string(&self, name: &str) -> Result<String, StepError> {
        match self.require(name)? {
            MetadataValue::String(v) => Ok(v),
            other => Err(self.type_error(name, "str", &other)),
        }
    }

    pub fn boolean(&self, name: &str) -> Result<bool, StepError> {
        match self.require(name)? {
            MetadataValue::Boolean(v) => Ok(v),
            other => Err(self.type_error(name, "bool", &other)),
        }
    }

    pub fn timestamp(&self, name: &str) -> Result<DateTime<Utc>, StepError> {
        match self.require(name)? {
            MetadataValue::Timestamp(v) => Ok(v),
            other => Err(self.type_error(name, "timestamp", &other)),
        }
    }

    pub fn json(&self, name: &str) -> Result<Value, StepError> {
        match self.require(name)? {
            MetadataValue::Json(v) => Ok(v),
            other => Err(self.type_error(name, "json", &other)),
        }
    }

    fn require(&self, name: &str) -> Result<MetadataValue, StepError> {
        self.get(name).ok_or_else(|| StepError::MetadataMissing(name.to_string()))
    }

    fn type_error(&self, name: &str, expected: &'static str, found: &MetadataValue) -> StepError {
        StepError::MetadataType { name: name.to_string(),
                                  expected,
                                  found: found.kind() }
    }
}
