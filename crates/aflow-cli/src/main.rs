//! Envoltorio de línea de comandos sobre el flow de membresías: dump del
//! template de configuración, validación y corrida.

use std::fs;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use aflow_core::{Flow, FlowConfigMap};

const GREEN: &str = "\x1b[1;32m";
const RESET: &str = "\x1b[0m";

#[derive(Parser)]
#[command(name = "aflow",
          about = "membership: Enrolls members, awards points and notifies everyone")]
struct Args {
    /// Dump a YAML file with documentation for the expected configurations
    #[arg(short, long, value_name = "YAML_FILE")]
    dump: Option<PathBuf>,

    /// Run the flow with the specified YAML file as configurations
    #[arg(short, long, value_name = "YAML_FILE")]
    run: Option<PathBuf>,

    /// Validate the flow (populate configurations, but don't run)
    #[arg(short, long, value_name = "YAML_FILE")]
    validate: Option<PathBuf>,

    /// A logfile to log results to
    #[arg(short, long, value_name = "LOGFILE")]
    logfile: Vec<PathBuf>,

    /// Disable logging on the command line
    #[arg(short, long)]
    silent: bool,
}

fn load_configs(path: &PathBuf) -> anyhow::Result<FlowConfigMap> {
    let contents = fs::read_to_string(path).with_context(|| {
                       format!("couldn't read configurations from {}", path.display())
                   })?;
    let configs = serde_yaml::from_str(&contents).with_context(|| {
                      format!("{} isn't a valid configuration file", path.display())
                  })?;
    Ok(configs)
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let filter = if args.silent {
        EnvFilter::new("error")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt().with_env_filter(filter)
                             .with_target(false)
                             .init();

    let mut flow: Flow<_> = aflow_adapters::membership_flow()?;
    for logfile in &args.logfile {
        flow.logfile(logfile)
            .with_context(|| format!("couldn't open logfile {}", logfile.display()))?;
    }

    if let Some(path) = args.dump {
        let template = serde_yaml::to_string(&flow.describe_config())?;
        fs::write(&path, template).with_context(|| {
                                      format!("couldn't dump the template to {}",
                                              path.display())
                                  })?;
    } else if let Some(path) = args.validate {
        let configs = load_configs(&path)?;
        flow.config(&configs)?;
        println!("{GREEN}Validated, ready to deploy!{RESET}");
    } else if let Some(path) = args.run {
        let configs = load_configs(&path)?;
        flow.config(&configs)?;
        let report = flow.run()?;
        if !report.is_clean() {
            anyhow::bail!("{report}");
        }
    } else {
        println!("No jobs to run!");
    }
    Ok(())
}
