use crate::config::{ConfigMap, ConfigSchema};
use crate::errors::{ConfigError, StepError};
use crate::record::RecordSlot;
use crate::step::StepContext;

/// Capacidad base de todo step: schema de clase, construcción desde la
/// configuración ya ligada, y validación.
///
/// `schema` y `from_config` son data/operaciones del tipo (no requieren
/// instancia), lo que permite describir la configuración esperada sin
/// construir nada.
pub trait FlowStep: Send + Sync {
    /// Schema estático: descripción del step más sus opciones tipadas.
    fn schema() -> &'static ConfigSchema
        where Self: Sized;

    /// Construye el step desde una configuración que ya pasó el chequeo de
    /// tipos del schema.
    fn from_config(configs: &ConfigMap) -> Result<Self, ConfigError>
        where Self: Sized;

    /// Valida la configuración ligada. Se invoca inmediatamente después de
    /// construir, antes de que cualquier step ejecute. El `Err` lleva la
    /// razón; el flow le agrega el nombre del step.
    fn validate(&self) -> Result<(), String> {
        Ok(())
    }
}

/// Step de la fase serial: agrega records a la colección.
pub trait RecordStep<R>: FlowStep {
    /// Devuelve la lista de records posiblemente aumentada. Cada record step
    /// ve la salida acumulada de todos los anteriores en la misma corrida,
    /// para poder observar inserciones ajenas y no duplicarlas.
    fn new_records(&self, curr_records: Vec<R>, ctx: &StepContext<'_>) -> Result<Vec<R>, StepError>;
}

/// Step de la fase de update: deriva y valida datos sobre los records.
///
/// No debe causar ningún efecto observable externamente; sólo escribir
/// sobre records (bajo su lock) y metadata.
pub trait UpdateStep<R>: FlowStep {
    fn update_records(&self,
                      records: &[RecordSlot<R>],
                      ctx: &StepContext<'_>)
                      -> Result<(), StepError>;
}

/// Step de la fase de propagate: actualiza entidades externas en base a los
/// records.
///
/// Contrato de debug (a cargo del autor del step, no del scheduler): con
/// `ctx.debug()` no se muta nada externo y la acción que se hubiera tomado
/// se reporta por `ctx.log`.
pub trait PropagateStep<R>: FlowStep {
    fn propagate_records(&self,
                         records: &[RecordSlot<R>],
                         ctx: &StepContext<'_>)
                         -> Result<(), StepError>;
}

/// Colaborador que trae y persiste la colección de records.
///
/// Siempre corre (no admite Exclude). Puede honrar Debug sustituyendo datos
/// de muestra; eso es asunto interno del storer.
pub trait RecordStorer<R>: FlowStep {
    fn get_records(&self, ctx: &StepContext<'_>) -> Result<Vec<R>, StepError>;

    fn set_records(&self, records: &[R], ctx: &StepContext<'_>) -> Result<(), StepError>;
}
