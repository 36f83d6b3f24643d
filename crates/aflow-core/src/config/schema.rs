use chrono::{DateTime, Utc};
use indexmap::IndexMap;

use super::{ConfigKind, ConfigValue};
use crate::errors::ConfigError;

/// Una opción declarada por un tipo de step: nombre, kind y descripción.
#[derive(Debug, Clone, Copy)]
pub struct ConfigOption {
    pub name: &'static str,
    pub kind: ConfigKind,
    pub description: &'static str,
}

/// Schema estático de configuración de un tipo de step.
///
/// Es data de clase, no de instancia: se puede consultar sin construir el
/// step, lo que habilita `describe_config` y el dump de templates.
#[derive(Debug, Clone, Copy)]
pub struct ConfigSchema {
    pub description: &'static str,
    pub options: &'static [ConfigOption],
}

impl ConfigSchema {
    /// Mapa de opción -> hint textual, más la entrada `_description`.
    pub fn describe(&self) -> IndexMap<String, String> {
        let mut out = IndexMap::new();
        out.insert("_description".to_string(), self.description.to_string());
        for opt in self.options {
            out.insert(opt.name.to_string(),
                       format!("({}) {}", opt.kind.name(), opt.description));
        }
        out
    }

    /// Chequea la sección cruda de un step contra el schema y construye el
    /// `ConfigMap` ya tipado.
    ///
    /// Toda opción del schema debe estar presente con el kind declarado; las
    /// opciones desconocidas son error, salvo las que empiezan con `_`
    /// (reservadas para documentación, como `_description`).
    pub fn bind(&self,
                step: &str,
                raw: &IndexMap<String, ConfigValue>)
                -> Result<ConfigMap, ConfigError> {
        for key in raw.keys() {
            if !key.starts_with('_') && !self.options.iter().any(|o| o.name == key) {
                return Err(ConfigError::UnknownOption { step: step.to_string(),
                                                        option: key.clone() });
            }
        }

        let mut values = IndexMap::new();
        for opt in self.options {
            let value = raw.get(opt.name)
                           .ok_or_else(|| ConfigError::MissingOption { step: step.to_string(),
                                                                       option: opt.name.to_string() })?;
            let value = coerce(value, opt.kind).ok_or_else(|| ConfigError::WrongType {
                step: step.to_string(),
                option: opt.name.to_string(),
                expected: opt.kind.name(),
                found: value.kind().name(),
            })?;
            values.insert(opt.name.to_string(), value);
        }
        Ok(ConfigMap { step: step.to_string(),
                       values })
    }
}

/// Acepta el valor si ya tiene el kind esperado; como única coerción, un
/// string RFC 3339 puede promoverse a timestamp.
fn coerce(value: &ConfigValue, kind: ConfigKind) -> Option<ConfigValue> {
    if value.kind() == kind {
        return Some(value.clone());
    }
    if let (ConfigKind::Timestamp, ConfigValue::String(s)) = (kind, value) {
        if let Ok(ts) = s.parse::<DateTime<Utc>>() {
            return Some(ConfigValue::Timestamp(ts));
        }
    }
    None
}

/// Configuración ya ligada de un step, inmutable tras la construcción.
///
/// Los getters devuelven `Result` para que `from_config` pueda propagar con
/// `?`; tras un `bind` exitoso las opciones del schema siempre resuelven.
#[derive(Debug, Clone)]
pub struct ConfigMap {
    step: String,
    values: IndexMap<String, ConfigValue>,
}

impl ConfigMap {
    pub fn get(&self, name: &str) -> Option<&ConfigValue> {
        self.values.get(name)
    }

    pub fn integer(&self, name: &str) -> Result<i64, ConfigError> {
        match self.get(name) {
            Some(ConfigValue::Integer(v)) => Ok(*v),
            other => Err(self.type_error(name, ConfigKind::Integer, other)),
        }
    }

    pub fn string(&self, name: &str) -> Result<&str, ConfigError> {
        match self.get(name) {
            Some(ConfigValue::String(v)) => Ok(v),
            other => Err(self.type_error(name, ConfigKind::String, other)),
        }
    }

    pub fn boolean(&self, name: &str) -> Result<bool, ConfigError> {
        match self.get(name) {
            Some(ConfigValue::Boolean(v)) => Ok(*v),
            other => Err(self.type_error(name, ConfigKind::Boolean, other)),
        }
    }

    pub fn timestamp(&self, name: &str) -> Result<DateTime<Utc>, ConfigError> {
        match self.get(name) {
            Some(ConfigValue::Timestamp(v)) => Ok(*v),
            other => Err(self.type_error(name, ConfigKind::Timestamp, other)),
        }
    }

    fn type_error(&self,
                  name: &str,
                  expected: ConfigKind,
                  found: Option<&ConfigValue>)
                  -> ConfigError {
        match found {
            Some(v) => ConfigError::WrongType { step: self.step.clone(),
                                                option: name.to_string(),
                                                expected: expected.name(),
                                                found: v.kind().name() },
            None => ConfigError::MissingOption { step: self.step.clone(),
                                                 option: name.to_string() },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::indexmap;

    static SCHEMA: ConfigSchema = ConfigSchema {
        description: "A schema for testing",
        options: &[ConfigOption { name: "count",
                                  kind: ConfigKind::Integer,
                                  description: "How many" },
                   ConfigOption { name: "deadline",
                                  kind: ConfigKind::Timestamp,
                                  description: "When it's due" }],
    };

    #[test]
    fn bind_checks_presence_and_kind() {
        let raw = indexmap! {
            "count".to_string() => ConfigValue::Integer(3),
            "deadline".to_string() => ConfigValue::String("2025-09-14T00:00:00Z".to_string()),
        };
        let bound = SCHEMA.bind("test", &raw).expect("bind should succeed");
        assert_eq!(bound.integer("count").unwrap(), 3);
        // El string RFC 3339 se promueve a timestamp
        assert!(bound.timestamp("deadline").is_ok());
    }

    #[test]
    fn bind_rejects_missing_and_mistyped_options() {
        let missing = indexmap! {
            "count".to_string() => ConfigValue::Integer(3),
        };
        assert!(matches!(SCHEMA.bind("test", &missing),
                         Err(ConfigError::MissingOption { .. })));

        let mistyped = indexmap! {
            "count".to_string() => ConfigValue::String("three".to_string()),
            "deadline".to_string() => ConfigValue::Timestamp(chrono::Utc::now()),
        };
        assert!(matches!(SCHEMA.bind("test", &mistyped),
                         Err(ConfigError::WrongType { .. })));
    }

    #[test]
    fn bind_rejects_unknown_options_but_ignores_underscored() {
        let raw = indexmap! {
            "count".to_string() => ConfigValue::Integer(1),
            "deadline".to_string() => ConfigValue::Timestamp(chrono::Utc::now()),
            "_description".to_string() => ConfigValue::String("doc".to_string()),
        };
        assert!(SCHEMA.bind("test", &raw).is_ok());

        let raw = indexmap! {
            "count".to_string() => ConfigValue::Integer(1),
            "deadline".to_string() => ConfigValue::Timestamp(chrono::Utc::now()),
            "typo".to_string() => ConfigValue::Integer(0),
        };
        assert!(matches!(SCHEMA.bind("test", &raw),
                         Err(ConfigError::UnknownOption { .. })));
    }

    #[test]
    fn describe_lists_every_option_with_kind_hint() {
        let described = SCHEMA.describe();
        assert_eq!(described.get("_description").unwrap(), "A schema for testing");
        assert_eq!(described.get("count").unwrap(), "(int) How many");
        assert_eq!(described.get("deadline").unwrap(), "(timestamp) When it's due");
    }
}
