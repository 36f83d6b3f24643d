//! Implementación del orquestador `Flow`.

use std::collections::{HashMap, HashSet};
use std::io;
use std::path::Path;

use chrono::Local;
use indexmap::IndexMap;

use crate::config::{ConfigEntry, ConfigMap, ConfigSchema, ConfigTemplate, ConfigValue,
                    FlowConfigMap};
use crate::errors::{ConfigError, DependencyError, FlowError};
use crate::flow::RunReport;
use crate::logger::FlowLogger;
use crate::metadata::MetadataStore;
use crate::record;
use crate::scheduler::{run_pool, DagJob};
use crate::step::{FlowStep, PropagateStep, RecordStep, RecordStorer, StepContext, StepMode,
                  UpdateStep};

/// Construye y valida una instancia de step a partir de su nombre y su
/// configuración ya ligada.
type Factory<T> = Box<dyn Fn(&str, &ConfigMap) -> Result<Box<T>, ConfigError> + Send + Sync>;

/// Fábrica por defecto para un tipo de step: construye desde la
/// configuración y corre `validate` inmediatamente.
fn make_step<S: FlowStep>(name: &str, cfg: &ConfigMap) -> Result<S, ConfigError> {
    let step = S::from_config(cfg)?;
    step.validate().map_err(|reason| ConfigError::FailedValidation { step: name.to_string(),
                                                                     reason })?;
    Ok(step)
}

/// Un step registrado pero aún sin configurar: nombre, schema del tipo y la
/// fábrica que lo construye. Los steps de las fases DAG llevan además sus
/// dependencias (nombres ya registrados en la misma fase).
struct Registered<T: ?Sized> {
    name: String,
    schema: &'static ConfigSchema,
    build: Factory<T>,
    depends_on: Vec<String>,
}

/// Los steps ya construidos y validados por `config`, listos para correr.
struct Bound<R> {
    storer: Box<dyn RecordStorer<R>>,
    record_steps: Vec<(String, Box<dyn RecordStep<R>>)>,
    update_steps: Vec<(String, Box<dyn UpdateStep<R>>, Vec<String>)>,
    propagate_steps: Vec<(String, Box<dyn PropagateStep<R>>, Vec<String>)>,
    modes: HashMap<String, StepMode>,
    num_threads: usize,
}

impl<R> Bound<R> {
    fn mode(&self, name: &str) -> StepMode {
        self.modes.get(name).copied().unwrap_or(StepMode::Include)
    }
}

/// Un flow administrativo: una cadena serial de record steps, dos DAGs
/// concurrentes (update y propagate) y un record storer en los bordes.
///
/// El ciclo de vida tiene dos etapas: registro de tipos de step
/// (`add_*_step`), y binding de configuración (`config`), que construye y
/// valida todos los steps antes de que cualquiera ejecute. Recién entonces
/// se puede llamar a `run`.
pub struct Flow<R: Send + 'static> {
    name: String,
    description: String,
    storer_name: String,
    storer_schema: &'static ConfigSchema,
    storer_build: Factory<dyn RecordStorer<R>>,
    record_steps: Vec<Registered<dyn RecordStep<R>>>,
    update_steps: Vec<Registered<dyn UpdateStep<R>>>,
    propagate_steps: Vec<Registered<dyn PropagateStep<R>>>,
    logger: FlowLogger,
    bound: Option<Bound<R>>,
}

impl<R: Send + 'static> Flow<R> {
    /// Crea el flow ligando el tipo del record storer, que siempre corre.
    pub fn new<S>(name: &str, description: &str, storer_name: &str) -> Self
        where S: RecordStorer<R> + 'static
    {
        Self { name: name.to_string(),
               description: description.to_string(),
               storer_name: storer_name.to_string(),
               storer_schema: S::schema(),
               storer_build: Box::new(|name, cfg| {
                   make_step::<S>(name, cfg).map(|s| Box::new(s) as Box<dyn RecordStorer<R>>)
               }),
               record_steps: Vec::new(),
               update_steps: Vec::new(),
               propagate_steps: Vec::new(),
               logger: FlowLogger::new(name),
               bound: None }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Si `config` ya construyó y validó todos los steps.
    pub fn is_configured(&self) -> bool {
        self.bound.is_some()
    }

    /// Agrega un logfile donde replicar la salida del flow.
    pub fn logfile(&self, path: &Path) -> io::Result<()> {
        self.logger.add_logfile(path)
    }

    // - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - -
    // Registro de steps
    // - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - -

    /// Nombres de todos los steps registrados, en las tres fases.
    pub fn step_names(&self) -> Vec<&str> {
        self.record_steps
            .iter()
            .map(|e| e.name.as_str())
            .chain(self.update_steps.iter().map(|e| e.name.as_str()))
            .chain(self.propagate_steps.iter().map(|e| e.name.as_str()))
            .collect()
    }

    fn step_exists(&self, name: &str) -> bool {
        name == self.storer_name || self.step_names().contains(&name)
    }

    fn check_new_name(&self, name: &str) -> Result<(), DependencyError> {
        if self.step_exists(name) {
            return Err(DependencyError::DuplicateName(name.to_string()));
        }
        Ok(())
    }

    /// Chequea que cada dependencia exista y pertenezca a la misma fase.
    /// Como sólo se puede depender de steps ya registrados, ningún grafo
    /// construido por esta API puede contener un ciclo.
    fn check_deps(&self,
                  name: &str,
                  depends_on: &[&str],
                  same_phase: &[&str])
                  -> Result<(), DependencyError> {
        for dep in depends_on {
            if !self.step_exists(dep) {
                return Err(DependencyError::UnknownDependency { step: name.to_string(),
                                                                dependency: dep.to_string() });
            }
            if !same_phase.contains(dep) {
                return Err(DependencyError::WrongPhase { step: name.to_string(),
                                                         dependency: dep.to_string() });
            }
        }
        Ok(())
    }

    /// Agrega un record step al final de la cadena serial. Los record steps
    /// no tienen grafo de dependencias; corren en orden de registro.
    pub fn add_record_step<S>(&mut self, name: &str) -> Result<(), DependencyError>
        where S: RecordStep<R> + 'static
    {
        self.check_new_name(name)?;
        self.record_steps.push(Registered {
            name: name.to_string(),
            schema: S::schema(),
            build: Box::new(|name, cfg| {
                make_step::<S>(name, cfg).map(|s| Box::new(s) as Box<dyn RecordStep<R>>)
            }),
            depends_on: Vec::new(),
        });
        Ok(())
    }

    /// Agrega un update step al DAG de la fase de update.
    pub fn add_update_step<S>(&mut self,
                              name: &str,
                              depends_on: &[&str])
                              -> Result<(), DependencyError>
        where S: UpdateStep<R> + 'static
    {
        self.check_new_name(name)?;
        let phase: Vec<&str> = self.update_steps.iter().map(|e| e.name.as_str()).collect();
        self.check_deps(name, depends_on, &phase)?;
        self.update_steps.push(Registered {
            name: name.to_string(),
            schema: S::schema(),
            build: Box::new(|name, cfg| {
                make_step::<S>(name, cfg).map(|s| Box::new(s) as Box<dyn UpdateStep<R>>)
            }),
            depends_on: depends_on.iter().map(|d| d.to_string()).collect(),
        });
        Ok(())
    }

    /// Agrega un propagate step al DAG de la fase de propagate.
    pub fn add_propagate_step<S>(&mut self,
                                 name: &str,
                                 depends_on: &[&str])
                                 -> Result<(), DependencyError>
        where S: PropagateStep<R> + 'static
    {
        self.check_new_name(name)?;
        let phase: Vec<&str> = self.propagate_steps.iter().map(|e| e.name.as_str()).collect();
        self.check_deps(name, depends_on, &phase)?;
        self.propagate_steps.push(Registered {
            name: name.to_string(),
            schema: S::schema(),
            build: Box::new(|name, cfg| {
                make_step::<S>(name, cfg).map(|s| Box::new(s) as Box<dyn PropagateStep<R>>)
            }),
            depends_on: depends_on.iter().map(|d| d.to_string()).collect(),
        });
        Ok(())
    }

    // - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - -
    // Configuración
    // - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - -

    /// Template de configuración: el mismo shape que espera `config`, con
    /// cada hoja reemplazada por un hint `"(kind) descripción"`. Una vez
    /// completado con valores concretos, `config` lo acepta sin cambios.
    pub fn describe_config(&self) -> IndexMap<String, ConfigTemplate> {
        let mut out = IndexMap::new();
        out.insert("_description".to_string(),
                   ConfigTemplate::Hint(self.description.clone()));
        out.insert("num_threads".to_string(),
                   ConfigTemplate::Hint("(int) The number of threads to use when running \
                                         update and propagate steps"
                                                                    .to_string()));

        out.insert(format!("{}-mode", self.storer_name),
                   ConfigTemplate::Hint(format!("(str) The mode to run {} in (either \
                                                 'include' or 'debug')",
                                                self.storer_name)));
        for name in self.step_names() {
            out.insert(format!("{name}-mode"),
                       ConfigTemplate::Hint(format!("(str) The mode to run {name} in \
                                                     (either 'include', 'exclude', or \
                                                     'debug')")));
        }

        out.insert(self.storer_name.clone(),
                   ConfigTemplate::Section(self.storer_schema.describe()));
        for entry in &self.record_steps {
            out.insert(entry.name.clone(), ConfigTemplate::Section(entry.schema.describe()));
        }
        for entry in &self.update_steps {
            out.insert(entry.name.clone(), ConfigTemplate::Section(entry.schema.describe()));
        }
        for entry in &self.propagate_steps {
            out.insert(entry.name.clone(), ConfigTemplate::Section(entry.schema.describe()));
        }
        out
    }

    /// Liga la configuración: chequea tipos contra cada schema, construye
    /// cada step (storer incluido) y lo valida. Un solo valor malo en
    /// cualquier parte impide todo el trabajo, incluso el acceso a records.
    ///
    /// También es el modo validate-only: configurar sin correr.
    pub fn config(&mut self, configs: &FlowConfigMap) -> Result<(), FlowError> {
        let num_threads = match configs.get("num_threads") {
            Some(ConfigEntry::Scalar(ConfigValue::Integer(n))) => {
                if *n < 1 {
                    return Err(ConfigError::NoThreads.into());
                }
                *n as usize
            }
            Some(other) => {
                return Err(ConfigError::WrongType { step: self.name.clone(),
                                                    option: "num_threads".to_string(),
                                                    expected: "int",
                                                    found: entry_kind(other) }.into())
            }
            None => {
                return Err(ConfigError::MissingOption { step: self.name.clone(),
                                                        option: "num_threads".to_string() }.into())
            }
        };

        // Modos: uno por step, más el del storer (que no admite Exclude)
        let mut modes = HashMap::new();
        let storer_mode = self.mode_for(configs, &self.storer_name)?;
        if storer_mode == StepMode::Exclude {
            return Err(ConfigError::ExcludedStorer.into());
        }
        modes.insert(self.storer_name.clone(), storer_mode);
        for name in self.step_names() {
            let mode = self.mode_for(configs, name)?;
            modes.insert(name.to_string(), mode);
        }

        // Construye y valida el storer y todos los steps, en orden de
        // registro, antes de que nada ejecute
        let storer = bind_step(configs, &self.storer_name, self.storer_schema,
                               &self.storer_build)?;
        let mut record_steps = Vec::with_capacity(self.record_steps.len());
        for entry in &self.record_steps {
            let step = bind_step(configs, &entry.name, entry.schema, &entry.build)?;
            record_steps.push((entry.name.clone(), step));
        }
        let mut update_steps = Vec::with_capacity(self.update_steps.len());
        for entry in &self.update_steps {
            let step = bind_step(configs, &entry.name, entry.schema, &entry.build)?;
            update_steps.push((entry.name.clone(), step, entry.depends_on.clone()));
        }
        let mut propagate_steps = Vec::with_capacity(self.propagate_steps.len());
        for entry in &self.propagate_steps {
            let step = bind_step(configs, &entry.name, entry.schema, &entry.build)?;
            propagate_steps.push((entry.name.clone(), step, entry.depends_on.clone()));
        }

        self.bound = Some(Bound { storer,
                                  record_steps,
                                  update_steps,
                                  propagate_steps,
                                  modes,
                                  num_threads });
        Ok(())
    }

    fn mode_for(&self, configs: &FlowConfigMap, name: &str) -> Result<StepMode, ConfigError> {
        let key = format!("{name}-mode");
        match configs.get(&key) {
            Some(ConfigEntry::Scalar(ConfigValue::String(raw))) => StepMode::parse(name, raw),
            Some(other) => Err(ConfigError::WrongType { step: name.to_string(),
                                                        option: key,
                                                        expected: "str",
                                                        found: entry_kind(other) }),
            None => Err(ConfigError::MissingOption { step: name.to_string(),
                                                     option: key }),
        }
    }

    // - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - -
    // Ejecución
    // - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - -

    /// Corre el flow completo: get_records, la cadena de record steps, los
    /// dos DAGs (con barrera total entre update y propagate) y set_records.
    ///
    /// Una falla del storer o de un record step aborta la corrida sin
    /// persistir nada. Las fallas dentro de los DAGs no abortan: quedan en
    /// el `RunReport` y los records se persisten igual.
    pub fn run(&self) -> Result<RunReport, FlowError> {
        let bound = self.bound
                        .as_ref()
                        .ok_or_else(|| FlowError::NotConfigured(self.name.clone()))?;
        let logger = &self.logger;
        let metadata = MetadataStore::new();

        logger.flow("==================================================");
        logger.flow(&self.name);
        logger.flow("==================================================");
        logger.flow(&format!("Date: {}", Local::now().format("%Y-%m-%d %H:%M")));
        logger.flow(&format!("Number of threads: {}", bound.num_threads));

        logger.flow(&format!("Getting records from {}", self.storer_name));
        let storer_debug = bound.mode(&self.storer_name) == StepMode::Debug;
        let ctx = StepContext::new(&self.storer_name, logger, &metadata, storer_debug);
        let mut records =
            bound.storer
                 .get_records(&ctx)
                 .map_err(|e| FlowError::Storer { step: self.storer_name.clone(), source: e })?;

        logger.flow("--------------------------------------------------");
        logger.flow("Running record steps...");
        logger.flow("--------------------------------------------------");
        for (name, step) in &bound.record_steps {
            match bound.mode(name) {
                StepMode::Exclude => continue,
                mode => {
                    let ctx = StepContext::new(name, logger, &metadata,
                                               mode == StepMode::Debug);
                    records = step.new_records(records, &ctx)
                                  .map_err(|e| FlowError::RecordStep { step: name.clone(),
                                                                       source: e })?;
                }
            }
        }

        let slots = record::stripe(records);
        let mut report = RunReport::default();

        logger.flow("--------------------------------------------------");
        logger.flow("Running update steps...");
        logger.flow("--------------------------------------------------");
        let update_jobs = dag_jobs(&bound.update_steps, bound, logger, &metadata,
                                   |step, slots, ctx| step.update_records(slots, ctx),
                                   &slots);
        report.update_failures = run_pool(&update_jobs, bound.num_threads, logger);
        drop(update_jobs);

        // Barrera entre fases: ningún propagate step arranca hasta que cada
        // update step terminó o quedó definitivamente salteado
        logger.flow("--------------------------------------------------");
        logger.flow("Running propagate steps...");
        logger.flow("--------------------------------------------------");
        let propagate_jobs = dag_jobs(&bound.propagate_steps, bound, logger, &metadata,
                                      |step, slots, ctx| step.propagate_records(slots, ctx),
                                      &slots);
        report.propagate_failures = run_pool(&propagate_jobs, bound.num_threads, logger);
        drop(propagate_jobs);

        let records = record::unstripe(slots);
        logger.flow(&format!("Storing records in {}", self.storer_name));
        let ctx = StepContext::new(&self.storer_name, logger, &metadata, storer_debug);
        bound.storer
             .set_records(&records, &ctx)
             .map_err(|e| FlowError::Storer { step: self.storer_name.clone(), source: e })?;

        if report.is_clean() {
            logger.success(&format!("Flow finished successfully at {}",
                                    Local::now().format("%Y-%m-%d %H:%M")));
        } else {
            logger.error(&format!("Flow finished with failures: {report}"));
        }
        Ok(report)
    }
}

/// Kind textual de una entrada de configuración, para mensajes de error.
fn entry_kind(entry: &ConfigEntry) -> &'static str {
    match entry {
        ConfigEntry::Scalar(v) => v.kind().name(),
        ConfigEntry::Section(_) => "mapping",
    }
}

/// Binding de un step: sección presente y mapeada, tipos chequeados contra
/// el schema, instancia construida y validada.
fn bind_step<T: ?Sized>(configs: &FlowConfigMap,
                        name: &str,
                        schema: &'static ConfigSchema,
                        build: &Factory<T>)
                        -> Result<Box<T>, FlowError> {
    let section = match configs.get(name) {
        Some(ConfigEntry::Section(map)) => map,
        Some(ConfigEntry::Scalar(_)) => {
            return Err(ConfigError::NotAMapping(name.to_string()).into())
        }
        None => return Err(ConfigError::MissingSection(name.to_string()).into()),
    };
    let bound = schema.bind(name, section)?;
    let step = build(name, &bound)?;
    Ok(step)
}

/// Arma los jobs de una fase DAG: filtra los steps excluidos, recorta las
/// dependencias a los steps habilitados (un dependiente de un excluido lo
/// trata como ya completado) y encapsula la invocación con su contexto.
fn dag_jobs<'run, R, T: ?Sized>(steps: &'run [(String, Box<T>, Vec<String>)],
                                bound: &'run Bound<R>,
                                logger: &'run FlowLogger,
                                metadata: &'run MetadataStore,
                                invoke: fn(&T, &[crate::record::RecordSlot<R>], &StepContext<'_>)
                                           -> Result<(), crate::errors::StepError>,
                                slots: &'run [crate::record::RecordSlot<R>])
                                -> Vec<DagJob<'run>>
    where R: Send + 'static,
          T: Send + Sync
{
    let enabled: HashSet<&str> = steps.iter()
                                      .map(|(name, _, _)| name.as_str())
                                      .filter(|name| bound.mode(name) != StepMode::Exclude)
                                      .collect();

    steps.iter()
         .filter(|(name, _, _)| enabled.contains(name.as_str()))
         .map(|(name, step, deps)| {
             let depends_on = deps.iter()
                                  .filter(|d| enabled.contains(d.as_str()))
                                  .cloned()
                                  .collect();
             let debug = bound.mode(name) == StepMode::Debug;
             DagJob { name: name.clone(),
                      depends_on,
                      run: Box::new(move || {
                          let ctx = StepContext::new(name, logger, metadata, debug);
                          invoke(step, slots, &ctx)
                      }) }
         })
         .collect()
}
