use std::fmt;

use crate::errors::StepFailure;

/// Resultado de una corrida que llegó al final.
///
/// Las fallas de steps DAG no abortan la corrida: las ramas independientes
/// completan, los records se persisten igual, y las fallas quedan
/// registradas acá, todas juntas por fase.
#[derive(Debug, Default)]
pub struct RunReport {
    pub update_failures: Vec<StepFailure>,
    pub propagate_failures: Vec<StepFailure>,
}

impl RunReport {
    /// Si ningún step falló en ninguna fase.
    pub fn is_clean(&self) -> bool {
        self.update_failures.is_empty() && self.propagate_failures.is_empty()
    }

    pub fn total_failures(&self) -> usize {
        self.update_failures.len() + self.propagate_failures.len()
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_clean() {
            return write!(f, "all steps completed");
        }
        write!(f, "{} step(s) failed:", self.total_failures())?;
        for failure in &self.update_failures {
            write!(f, "\n  update {failure}")?;
        }
        for failure in &self.propagate_failures {
            write!(f, "\n  propagate {failure}")?;
        }
        Ok(())
    }
}
