//! Los steps del flow de membresías, uno por fase.

use aflow_core::{ConfigError, ConfigKind, ConfigMap, ConfigOption, ConfigSchema, FlowStep,
                 MetadataValue, PropagateStep, RecordSlot, RecordStep, StepContext, StepError,
                 UpdateStep};

use crate::records::MemberRecord;

/// Record step: da de alta los miembros listados que todavía no existen.
pub struct EnrollStep {
    emails: Vec<String>,
}

impl FlowStep for EnrollStep {
    fn schema() -> &'static ConfigSchema {
        static SCHEMA: ConfigSchema = ConfigSchema {
            description: "Enrolls the listed members if they aren't enrolled yet",
            options: &[ConfigOption { name: "emails",
                                      kind: ConfigKind::String,
                                      description: "Comma-separated emails to enroll" }],
        };
        &SCHEMA
    }

    fn from_config(configs: &ConfigMap) -> Result<Self, ConfigError> {
        let emails = configs.string("emails")?
                            .split(',')
                            .map(|e| e.trim().to_string())
                            .filter(|e| !e.is_empty())
                            .collect();
        Ok(Self { emails })
    }
}

impl RecordStep<MemberRecord> for EnrollStep {
    fn new_records(&self,
                   mut curr_records: Vec<MemberRecord>,
                   ctx: &StepContext<'_>)
                   -> Result<Vec<MemberRecord>, StepError> {
        for email in &self.emails {
            if curr_records.iter().any(|r| &r.email == email) {
                ctx.log(&format!("{email} is already enrolled"));
                continue;
            }
            ctx.log(&format!("enrolling {email}"));
            curr_records.push(MemberRecord::new(email));
        }
        Ok(curr_records)
    }
}

/// Update step: suma un monto fijo de puntos a cada miembro.
///
/// Publica el total repartido como metadata bajo `awarded:<reason>`, para
/// que steps dependientes puedan consultarlo.
pub struct AwardPointsStep {
    amount: i64,
    reason: String,
}

impl FlowStep for AwardPointsStep {
    fn schema() -> &'static ConfigSchema {
        static SCHEMA: ConfigSchema = ConfigSchema {
            description: "Awards a fixed amount of points to every member",
            options: &[ConfigOption { name: "amount",
                                      kind: ConfigKind::Integer,
                                      description: "How many points to award" },
                       ConfigOption { name: "reason",
                                      kind: ConfigKind::String,
                                      description: "Why the points are awarded" }],
        };
        &SCHEMA
    }

    fn from_config(configs: &ConfigMap) -> Result<Self, ConfigError> {
        Ok(Self { amount: configs.integer("amount")?,
                  reason: configs.string("reason")?.to_string() })
    }

    fn validate(&self) -> Result<(), String> {
        if self.amount < 0 {
            return Err(format!("can't award a negative amount ({})", self.amount));
        }
        Ok(())
    }
}

impl UpdateStep<MemberRecord> for AwardPointsStep {
    fn update_records(&self,
                      records: &[RecordSlot<MemberRecord>],
                      ctx: &StepContext<'_>)
                      -> Result<(), StepError> {
        let mut total = 0;
        for slot in records {
            let mut member = slot.lock();
            member.points += self.amount;
            total += self.amount;
        }
        ctx.set_metadata(&format!("awarded:{}", self.reason),
                         MetadataValue::Integer(total))
    }
}

/// Propagate step: notifica a cada miembro su puntaje y lo marca notificado.
///
/// La notificación es el efecto externo del flow; en modo debug sólo se
/// reporta lo que se hubiera enviado y nadie queda marcado.
pub struct NotifyMembersStep {
    sender: String,
}

impl FlowStep for NotifyMembersStep {
    fn schema() -> &'static ConfigSchema {
        static SCHEMA: ConfigSchema = ConfigSchema {
            description: "Notifies every member of their current points",
            options: &[ConfigOption { name: "sender",
                                      kind: ConfigKind::String,
                                      description: "The address notifications come from" }],
        };
        &SCHEMA
    }

    fn from_config(configs: &ConfigMap) -> Result<Self, ConfigError> {
        Ok(Self { sender: configs.string("sender")?.to_string() })
    }
}

impl PropagateStep<MemberRecord> for NotifyMembersStep {
    fn propagate_records(&self,
                         records: &[RecordSlot<MemberRecord>],
                         ctx: &StepContext<'_>)
                         -> Result<(), StepError> {
        for slot in records {
            let mut member = slot.lock();
            if ctx.debug() {
                ctx.log(&format!("would notify {} from {} ({} points)",
                                 member.email, self.sender, member.points));
                continue;
            }
            ctx.log(&format!("notifying {} from {} ({} points)",
                             member.email, self.sender, member.points));
            member.notified = true;
        }
        Ok(())
    }
}
