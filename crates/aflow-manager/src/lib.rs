//! aflow-manager: corre muchos flows sobre schedules predeterminados.
//!
//! Un `Schedule` es un predicado componible sobre el tiempo (redondeado al
//! minuto); el `FlowManager` evalúa todos los schedules en cada chequeo y
//! corre los flows que correspondan, en paralelo hasta su límite de threads.

pub mod manager;
pub mod schedule;

pub use manager::{FlowManager, FlowOutcome, ManagedFlow, ManagerError};
pub use schedule::{Schedule, ScheduleError};
