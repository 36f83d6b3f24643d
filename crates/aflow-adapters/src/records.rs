use serde::{Deserialize, Serialize};

/// El record del flow de membresías: un miembro con su puntaje acumulado.
///
/// Es el tipo opaco que atraviesa las tres fases; sólo los steps del flow
/// conocen su estructura.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberRecord {
    pub email: String,
    pub points: i64,
    #[serde(default)]
    pub notified: bool,
}

impl MemberRecord {
    pub fn new(email: &str) -> Self {
        Self { email: email.to_string(),
               points: 0,
               notified: false }
    }
}
