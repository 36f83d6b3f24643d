//! Sistema de configuración tipado y auto-descriptivo.
//!
//! Cada tipo de step declara un `ConfigSchema` estático (sin necesidad de
//! instancia) con opciones `(nombre, kind, descripción)`. El binding valida
//! tipos contra el schema antes de construir el step, por lo que ninguna
//! configuración inválida llega a ejecutarse.

mod schema;
mod value;

pub use schema::{ConfigMap, ConfigOption, ConfigSchema};
pub use value::{ConfigEntry, ConfigKind, ConfigTemplate, ConfigValue, FlowConfigMap};
