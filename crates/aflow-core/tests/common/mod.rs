//! Steps y storer de juguete para los tests de integración del core.
//!
//! Las instancias las construye el flow vía fábricas, así que el estado
//! observable (records persistidos, orden de ejecución, hooks externos) vive
//! en registros globales keyed por test.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Mutex, OnceLock};

use aflow_core::{ConfigError, ConfigKind, ConfigMap, ConfigOption, ConfigSchema, FlowStep,
                 MetadataValue, PropagateStep, RecordSlot, RecordStep, RecordStorer,
                 StepContext, StepError, UpdateStep};

fn records_by_key() -> &'static Mutex<HashMap<String, Vec<i64>>> {
    static STORE: OnceLock<Mutex<HashMap<String, Vec<i64>>>> = OnceLock::new();
    STORE.get_or_init(Default::default)
}

fn order_by_key() -> &'static Mutex<HashMap<String, Vec<String>>> {
    static ORDER: OnceLock<Mutex<HashMap<String, Vec<String>>>> = OnceLock::new();
    ORDER.get_or_init(Default::default)
}

fn hook_by_key() -> &'static Mutex<HashMap<String, usize>> {
    static HOOK: OnceLock<Mutex<HashMap<String, usize>>> = OnceLock::new();
    HOOK.get_or_init(Default::default)
}

/// Precarga los records que verá `get_records` para un bucket de test.
pub fn seed_records(key: &str, records: Vec<i64>) {
    records_by_key().lock().unwrap().insert(key.to_string(), records);
}

/// Lo que persistió `set_records` para un bucket de test.
pub fn stored_records(key: &str) -> Vec<i64> {
    records_by_key().lock().unwrap().get(key).cloned().unwrap_or_default()
}

/// Marcas de inicio/fin registradas por los steps, en orden de aparición.
pub fn execution_order(key: &str) -> Vec<String> {
    order_by_key().lock().unwrap().get(key).cloned().unwrap_or_default()
}

fn push_order(key: &str, mark: String) {
    order_by_key().lock().unwrap().entry(key.to_string()).or_default().push(mark);
}

/// Cuántas veces se invocó el efecto externo de `NotifyStep`.
pub fn hook_calls(key: &str) -> usize {
    hook_by_key().lock().unwrap().get(key).copied().unwrap_or(0)
}

// -----------------------------------------------------------------------
// MemoryStorer
// -----------------------------------------------------------------------

/// Storer en memoria sobre un bucket global identificado por `key`.
pub struct MemoryStorer {
    key: String,
}

impl FlowStep for MemoryStorer {
    fn schema() -> &'static ConfigSchema {
        static SCHEMA: ConfigSchema = ConfigSchema {
            description: "Stores records in a process-global bucket",
            options: &[ConfigOption { name: "key",
                                      kind: ConfigKind::String,
                                      description: "The bucket to read and write" }],
        };
        &SCHEMA
    }

    fn from_config(configs: &ConfigMap) -> Result<Self, ConfigError> {
        Ok(Self { key: configs.string("key")?.to_string() })
    }
}

impl RecordStorer<i64> for MemoryStorer {
    fn get_records(&self, ctx: &StepContext<'_>) -> Result<Vec<i64>, StepError> {
        let records = stored_records(&self.key);
        ctx.log(&format!("loaded {} records", records.len()));
        Ok(records)
    }

    fn set_records(&self, records: &[i64], ctx: &StepContext<'_>) -> Result<(), StepError> {
        ctx.log(&format!("storing {} records", records.len()));
        records_by_key().lock().unwrap().insert(self.key.clone(), records.to_vec());
        Ok(())
    }
}

// -----------------------------------------------------------------------
// AppendStep (record step)
// -----------------------------------------------------------------------

/// Record step que agrega un único record con el valor configurado.
pub struct AppendStep {
    value: i64,
}

impl FlowStep for AppendStep {
    fn schema() -> &'static ConfigSchema {
        static SCHEMA: ConfigSchema = ConfigSchema {
            description: "Appends one record with a fixed value",
            options: &[ConfigOption { name: "value",
                                      kind: ConfigKind::Integer,
                                      description: "The value to append" }],
        };
        &SCHEMA
    }

    fn from_config(configs: &ConfigMap) -> Result<Self, ConfigError> {
        Ok(Self { value: configs.integer("value")? })
    }
}

impl RecordStep<i64> for AppendStep {
    fn new_records(&self,
                   mut curr_records: Vec<i64>,
                   ctx: &StepContext<'_>)
                   -> Result<Vec<i64>, StepError> {
        ctx.log(&format!("appending {}", self.value));
        curr_records.push(self.value);
        Ok(curr_records)
    }
}

/// Record step que falla siempre; aborta la corrida entera.
pub struct FailingRecordStep {
    message: String,
}

impl FlowStep for FailingRecordStep {
    fn schema() -> &'static ConfigSchema {
        static SCHEMA: ConfigSchema = ConfigSchema {
            description: "A record step that always fails",
            options: &[ConfigOption { name: "message",
                                      kind: ConfigKind::String,
                                      description: "The failure message" }],
        };
        &SCHEMA
    }

    fn from_config(configs: &ConfigMap) -> Result<Self, ConfigError> {
        Ok(Self { message: configs.string("message")?.to_string() })
    }
}

impl RecordStep<i64> for FailingRecordStep {
    fn new_records(&self,
                   _curr_records: Vec<i64>,
                   _ctx: &StepContext<'_>)
                   -> Result<Vec<i64>, StepError> {
        Err(StepError::Failed(self.message.clone()))
    }
}

// -----------------------------------------------------------------------
// AddStep (update step)
// -----------------------------------------------------------------------

/// Update step que suma `amount` a cada record bajo su lock, dejando marcas
/// `tag:start` / `tag:end` en el log de orden del test.
pub struct AddStep {
    amount: i64,
    tag: String,
    order_key: String,
}

impl FlowStep for AddStep {
    fn schema() -> &'static ConfigSchema {
        static SCHEMA: ConfigSchema = ConfigSchema {
            description: "Adds an amount to every record",
            options: &[ConfigOption { name: "amount",
                                      kind: ConfigKind::Integer,
                                      description: "How much to add to each record" },
                       ConfigOption { name: "tag",
                                      kind: ConfigKind::String,
                                      description: "Mark to leave in the order log" },
                       ConfigOption { name: "order_key",
                                      kind: ConfigKind::String,
                                      description: "The order log to mark" }],
        };
        &SCHEMA
    }

    fn from_config(configs: &ConfigMap) -> Result<Self, ConfigError> {
        Ok(Self { amount: configs.integer("amount")?,
                  tag: configs.string("tag")?.to_string(),
                  order_key: configs.string("order_key")?.to_string() })
    }

    fn validate(&self) -> Result<(), String> {
        if self.amount < 0 {
            return Err(format!("amount must be non-negative, got {}", self.amount));
        }
        Ok(())
    }
}

impl UpdateStep<i64> for AddStep {
    fn update_records(&self,
                      records: &[RecordSlot<i64>],
                      _ctx: &StepContext<'_>)
                      -> Result<(), StepError> {
        push_order(&self.order_key, format!("{}:start", self.tag));
        for slot in records {
            let mut record = slot.lock();
            *record += self.amount;
        }
        push_order(&self.order_key, format!("{}:end", self.tag));
        Ok(())
    }
}

/// Update step que falla siempre, para probar el aislamiento de fallas.
pub struct FailingUpdateStep {
    message: String,
}

impl FlowStep for FailingUpdateStep {
    fn schema() -> &'static ConfigSchema {
        static SCHEMA: ConfigSchema = ConfigSchema {
            description: "An update step that always fails",
            options: &[ConfigOption { name: "message",
                                      kind: ConfigKind::String,
                                      description: "The failure message" }],
        };
        &SCHEMA
    }

    fn from_config(configs: &ConfigMap) -> Result<Self, ConfigError> {
        Ok(Self { message: configs.string("message")?.to_string() })
    }
}

impl UpdateStep<i64> for FailingUpdateStep {
    fn update_records(&self,
                      _records: &[RecordSlot<i64>],
                      _ctx: &StepContext<'_>)
                      -> Result<(), StepError> {
        Err(StepError::Failed(self.message.clone()))
    }
}

// -----------------------------------------------------------------------
// Metadata steps
// -----------------------------------------------------------------------

/// Update step que publica un entero como metadata de la corrida.
pub struct MetaWriterStep {
    name: String,
    value: i64,
}

impl FlowStep for MetaWriterStep {
    fn schema() -> &'static ConfigSchema {
        static SCHEMA: ConfigSchema = ConfigSchema {
            description: "Publishes an integer as run metadata",
            options: &[ConfigOption { name: "name",
                                      kind: ConfigKind::String,
                                      description: "The metadata name to write" },
                       ConfigOption { name: "value",
                                      kind: ConfigKind::Integer,
                                      description: "The value to publish" }],
        };
        &SCHEMA
    }

    fn from_config(configs: &ConfigMap) -> Result<Self, ConfigError> {
        Ok(Self { name: configs.string("name")?.to_string(),
                  value: configs.integer("value")? })
    }
}

impl UpdateStep<i64> for MetaWriterStep {
    fn update_records(&self,
                      _records: &[RecordSlot<i64>],
                      ctx: &StepContext<'_>)
                      -> Result<(), StepError> {
        ctx.set_metadata(&self.name, MetadataValue::Integer(self.value))
    }
}

/// Update step que lee metadata previa y la suma a cada record.
pub struct MetaReaderStep {
    name: String,
}

impl FlowStep for MetaReaderStep {
    fn schema() -> &'static ConfigSchema {
        static SCHEMA: ConfigSchema = ConfigSchema {
            description: "Adds previously published metadata to every record",
            options: &[ConfigOption { name: "name",
                                      kind: ConfigKind::String,
                                      description: "The metadata name to read" }],
        };
        &SCHEMA
    }

    fn from_config(configs: &ConfigMap) -> Result<Self, ConfigError> {
        Ok(Self { name: configs.string("name")?.to_string() })
    }
}

impl UpdateStep<i64> for MetaReaderStep {
    fn update_records(&self,
                      records: &[RecordSlot<i64>],
                      ctx: &StepContext<'_>)
                      -> Result<(), StepError> {
        let value = ctx.metadata().integer(&self.name)?;
        for slot in records {
            *slot.lock() += value;
        }
        Ok(())
    }
}

// -----------------------------------------------------------------------
// NotifyStep (propagate step)
// -----------------------------------------------------------------------

/// Propagate step con un efecto externo de referencia (el hook global).
///
/// Bajo debug no toca el hook: sólo reporta la acción que hubiera tomado.
pub struct NotifyStep {
    target: String,
    order_key: String,
}

impl FlowStep for NotifyStep {
    fn schema() -> &'static ConfigSchema {
        static SCHEMA: ConfigSchema = ConfigSchema {
            description: "Notifies an external target about every record",
            options: &[ConfigOption { name: "target",
                                      kind: ConfigKind::String,
                                      description: "Who to notify" },
                       ConfigOption { name: "order_key",
                                      kind: ConfigKind::String,
                                      description: "The order log to mark" }],
        };
        &SCHEMA
    }

    fn from_config(configs: &ConfigMap) -> Result<Self, ConfigError> {
        Ok(Self { target: configs.string("target")?.to_string(),
                  order_key: configs.string("order_key")?.to_string() })
    }
}

impl PropagateStep<i64> for NotifyStep {
    fn propagate_records(&self,
                         records: &[RecordSlot<i64>],
                         ctx: &StepContext<'_>)
                         -> Result<(), StepError> {
        push_order(&self.order_key, format!("{}:propagate", self.target));
        for slot in records {
            let record = slot.lock();
            if ctx.debug() {
                ctx.log(&format!("would notify {} about record {}", self.target, *record));
            } else {
                *hook_by_key().lock().unwrap().entry(self.target.clone()).or_insert(0) += 1;
            }
        }
        Ok(())
    }
}
