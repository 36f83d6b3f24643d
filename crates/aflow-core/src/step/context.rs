use crate::errors::StepError;
use crate::logger::FlowLogger;
use crate::metadata::{MetadataStore, MetadataValue};

/// Contexto entregado a cada invocación de step.
///
/// Agrupa lo que en la firma conceptual son `logger`, `get_metadata`,
/// `set_metadata` y `debug`. Vive lo que dura la invocación; el store de
/// metadata que referencia vive lo que dura la corrida.
pub struct StepContext<'run> {
    step_name: &'run str,
    logger: &'run FlowLogger,
    metadata: &'run MetadataStore,
    debug: bool,
}

impl<'run> StepContext<'run> {
    pub(crate) fn new(step_name: &'run str,
                      logger: &'run FlowLogger,
                      metadata: &'run MetadataStore,
                      debug: bool)
                      -> Self {
        Self { step_name,
               logger,
               metadata,
               debug }
    }

    /// Loggea un evento notable, prefijado con el nombre del step.
    pub fn log(&self, msg: &str) {
        self.logger.step(self.step_name, msg);
    }

    /// Si la corrida está en modo debug para este step. Bajo debug un
    /// propagate step no debe mutar estado externo; sólo reportar intención.
    pub fn debug(&self) -> bool {
        self.debug
    }

    /// Metadata previamente seteada en la corrida, o `None`.
    pub fn get_metadata(&self, name: &str) -> Option<MetadataValue> {
        self.metadata.get(name)
    }

    /// Registra metadata global de la corrida. Cada nombre admite un único
    /// escritor; un segundo `set` es `StepError::MetadataConflict`.
    pub fn set_metadata(&self, name: &str, value: MetadataValue) -> Result<(), StepError> {
        self.metadata.set(name, value)
    }

    /// Acceso directo al store, para los accessors tipados.
    pub fn metadata(&self) -> &MetadataStore {
        self.metadata
    }
}
