//! aflow-core: motor de orquestación de flows administrativos.
//!
//! Un `Flow` corre un conjunto nombrado de steps sobre una colección
//! compartida de records opacos, en tres fases ordenadas:
//!
//! 1. **Record steps**: cadena serial que produce records nuevos.
//! 2. **Update steps**: DAG concurrente que deriva/valida datos sobre los
//!    records, sin efectos externos.
//! 3. **Propagate steps**: DAG concurrente que propaga los records hacia
//!    entidades externas.
//!
//! La garantía central: ninguna mutación externa se intenta hasta que toda
//! la derivación/validación interna terminó o falló definitivamente.

pub mod config;
pub mod errors;
pub mod flow;
pub mod logger;
pub mod metadata;
pub mod record;
mod scheduler;
pub mod step;

pub use config::{ConfigEntry, ConfigKind, ConfigMap, ConfigOption, ConfigSchema, ConfigTemplate,
                 ConfigValue, FlowConfigMap};
pub use errors::{ConfigError, DependencyError, FlowError, StepError, StepFailure};
pub use flow::{Flow, RunReport};
pub use logger::FlowLogger;
pub use metadata::{MetadataStore, MetadataValue};
pub use record::RecordSlot;
pub use step::{FlowStep, PropagateStep, RecordStep, RecordStorer, StepContext, StepMode,
               UpdateStep};
