//! Definiciones relacionadas a steps.
//!
//! Un step es una unidad de trabajo nombrada, con configuración propia, que
//! pertenece a exactamente una de tres fases:
//! - `RecordStep`: produce records nuevos, en cadena serial.
//! - `UpdateStep`: deriva/valida datos sobre los records, sin efectos externos.
//! - `PropagateStep`: propaga los records hacia afuera; bajo Debug sólo
//!   reporta la acción que hubiera tomado.
//!
//! El `RecordStorer` es el colaborador que trae y persiste la colección.

mod context;
mod definition;
mod mode;

pub use context::StepContext;
pub use definition::{FlowStep, PropagateStep, RecordStep, RecordStorer, UpdateStep};
pub use mode::StepMode;
