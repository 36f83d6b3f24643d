use std::fmt;
use std::str::FromStr;

use crate::errors::ConfigError;

/// Modo de ejecución de un step, ligado por corrida vía `<nombre>-mode`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepMode {
    /// Corre normalmente.
    Include,
    /// Se quita del grafo antes de schedulear; sus dependientes lo tratan
    /// como ya completado.
    Exclude,
    /// Corre bajo el contrato de debug: sin mutación externa, sólo intención
    /// por el logger.
    Debug,
}

impl StepMode {
    pub fn as_str(self) -> &'static str {
        match self {
            StepMode::Include => "include",
            StepMode::Exclude => "exclude",
            StepMode::Debug => "debug",
        }
    }

    /// Parsea el modo para un step dado, con el nombre sólo para el error.
    pub(crate) fn parse(step: &str, raw: &str) -> Result<Self, ConfigError> {
        raw.parse().map_err(|_| ConfigError::InvalidMode { step: step.to_string(),
                                                           mode: raw.to_string() })
    }
}

impl fmt::Display for StepMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StepMode {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "include" => Ok(StepMode::Include),
            "exclude" => Ok(StepMode::Exclude),
            "debug" => Ok(StepMode::Debug),
            _ => Err(()),
        }
    }
}
