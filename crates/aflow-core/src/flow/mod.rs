//! El orquestador de tres fases sobre una colección de records.

mod core;
mod report;

pub use self::core::Flow;
pub use report::RunReport;
