use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use aflow_core::{ConfigError, ConfigKind, ConfigMap, ConfigOption, ConfigSchema, FlowStep,
                 RecordStorer, StepContext, StepError};

use crate::records::MemberRecord;

/// Storer que persiste los records como un array JSON en un archivo.
///
/// Con `allow_missing`, un archivo inexistente equivale a cero records; sin
/// él, es un error del storer y la corrida no arranca. En modo debug la
/// lectura es real pero la escritura sólo se reporta.
pub struct JsonFileStorer {
    path: PathBuf,
    allow_missing: bool,
}

impl FlowStep for JsonFileStorer {
    fn schema() -> &'static ConfigSchema {
        static SCHEMA: ConfigSchema = ConfigSchema {
            description: "Reads and writes records as a JSON array in a file",
            options: &[ConfigOption { name: "path",
                                      kind: ConfigKind::String,
                                      description: "The file holding the records" },
                       ConfigOption { name: "allow_missing",
                                      kind: ConfigKind::Boolean,
                                      description: "Whether a missing file counts as zero \
                                                    records" }],
        };
        &SCHEMA
    }

    fn from_config(configs: &ConfigMap) -> Result<Self, ConfigError> {
        Ok(Self { path: PathBuf::from(configs.string("path")?),
                  allow_missing: configs.boolean("allow_missing")? })
    }
}

impl RecordStorer<MemberRecord> for JsonFileStorer {
    fn get_records(&self, ctx: &StepContext<'_>) -> Result<Vec<MemberRecord>, StepError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound && self.allow_missing => {
                ctx.log(&format!("{} doesn't exist yet, starting empty",
                                 self.path.display()));
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };
        let records: Vec<MemberRecord> = serde_json::from_str(&contents)?;
        ctx.log(&format!("loaded {} records from {}", records.len(), self.path.display()));
        Ok(records)
    }

    fn set_records(&self,
                   records: &[MemberRecord],
                   ctx: &StepContext<'_>)
                   -> Result<(), StepError> {
        if ctx.debug() {
            ctx.log(&format!("would store {} records to {}",
                             records.len(),
                             self.path.display()));
            return Ok(());
        }
        let contents = serde_json::to_string_pretty(records)?;
        fs::write(&self.path, contents)?;
        ctx.log(&format!("stored {} records to {}", records.len(), self.path.display()));
        Ok(())
    }
}
