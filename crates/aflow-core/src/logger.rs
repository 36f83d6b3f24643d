//! Logging del flow y de sus steps.
//!
//! Los mensajes salen como eventos de `tracing` (el subscriber decide el
//! destino y la verbosidad) y, además, se replican con timestamp en los
//! logfiles registrados vía `add_logfile`.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;

use chrono::Local;
use parking_lot::Mutex;

const TIMESTAMP_FMT: &str = "%m/%d/%Y %H:%M:%S";

/// Logger compartido por el flow y todos los workers de una corrida.
#[derive(Debug)]
pub struct FlowLogger {
    flow_name: String,
    files: Mutex<Vec<File>>,
}

impl FlowLogger {
    pub fn new(flow_name: &str) -> Self {
        Self { flow_name: flow_name.to_string(),
               files: Mutex::new(Vec::new()) }
    }

    pub fn flow_name(&self) -> &str {
        &self.flow_name
    }

    /// Agrega un logfile al que replicar todos los mensajes.
    pub fn add_logfile(&self, path: &Path) -> io::Result<()> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        self.files.lock().push(file);
        Ok(())
    }

    /// Mensaje a nivel de flow (banners, progreso de fases, scheduling).
    pub fn flow(&self, msg: &str) {
        tracing::info!(target: "aflow::flow", flow = %self.flow_name, "{msg}");
        self.to_files("FLOW", msg);
    }

    /// Mensaje de éxito al cierre de la corrida.
    pub fn success(&self, msg: &str) {
        tracing::info!(target: "aflow::flow", flow = %self.flow_name, "{msg}");
        self.to_files("SUCCESS", msg);
    }

    /// Mensaje emitido por un step, prefijado con su nombre.
    pub fn step(&self, step_name: &str, msg: &str) {
        tracing::info!(target: "aflow::step", flow = %self.flow_name, step = %step_name, "{msg}");
        self.to_files("STEP", &format!("[{step_name}] {msg}"));
    }

    /// Falla de un step o de una fase.
    pub fn error(&self, msg: &str) {
        tracing::error!(target: "aflow::flow", flow = %self.flow_name, "{msg}");
        self.to_files("ERROR", msg);
    }

    fn to_files(&self, level: &str, msg: &str) {
        let mut files = self.files.lock();
        if files.is_empty() {
            return;
        }
        let stamp = Local::now().format(TIMESTAMP_FMT);
        for file in files.iter_mut() {
            // Un logfile lleno no debe voltear la corrida
            let _ = writeln!(file, "{stamp} [{level}]: {msg}");
        }
    }
}
