//! aflow-adapters: records, storers y steps concretos sobre `aflow-core`.
//!
//! Incluye el flow de membresías de referencia: alta de miembros, otorgado
//! de puntos y notificación, persistiendo en un archivo JSON.

pub mod records;
pub mod steps;
pub mod storer;

pub use records::MemberRecord;
pub use steps::{AwardPointsStep, EnrollStep, NotifyMembersStep};
pub use storer::JsonFileStorer;

use aflow_core::{DependencyError, Flow};

/// Arma el flow de membresías con sus steps registrados, listo para
/// `describe_config` / `config`.
pub fn membership_flow() -> Result<Flow<MemberRecord>, DependencyError> {
    membership_flow_named("membership")
}

/// Como `membership_flow`, con un nombre propio (p. ej. para registrar
/// varias instancias en un mismo manager).
pub fn membership_flow_named(name: &str) -> Result<Flow<MemberRecord>, DependencyError> {
    let mut flow = Flow::new::<JsonFileStorer>(
        name,
        "Enrolls members, awards points and notifies everyone",
        "member-file",
    );
    flow.add_record_step::<EnrollStep>("enroll")?;
    flow.add_update_step::<AwardPointsStep>("base-points", &[])?;
    flow.add_update_step::<AwardPointsStep>("bonus-points", &["base-points"])?;
    flow.add_propagate_step::<NotifyMembersStep>("notify", &[])?;
    Ok(flow)
}
