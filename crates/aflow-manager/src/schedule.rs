//! Schedules: cuándo debe correr cada flow.

use std::fmt;
use std::ops::{Add, Sub};
use std::sync::Arc;

use chrono::{Datelike, Local, NaiveDateTime, Timelike};
use thiserror::Error;

/// Parámetros fuera de rango al construir un schedule.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("invalid hour: {0}")]
    InvalidHour(u32),
    #[error("invalid day of the week: {0}")]
    InvalidDay(String),
}

const WEEKDAYS: [&str; 7] =
    ["monday", "tuesday", "wednesday", "thursday", "friday", "saturday", "sunday"];

/// Un predicado sobre el tiempo que decide si el flow asociado debe correr.
///
/// El predicado asume que recibe el tiempo redondeado hacia abajo al minuto.
/// Los schedules se componen: `a + b` es la unión, `a - b` la diferencia.
#[derive(Clone)]
pub struct Schedule {
    check_time: Arc<dyn Fn(NaiveDateTime) -> bool + Send + Sync>,
}

// El predicado no es representable; con el nombre del tipo alcanza
impl fmt::Debug for Schedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Schedule")
    }
}

impl Schedule {
    pub fn new<F>(check_time: F) -> Self
        where F: Fn(NaiveDateTime) -> bool + Send + Sync + 'static
    {
        Self { check_time: Arc::new(check_time) }
    }

    /// Corre en cada chequeo.
    pub fn always() -> Self {
        Self::new(|_| true)
    }

    /// Corre al comienzo de cada hora.
    pub fn hourly() -> Self {
        Self::new(|t| t.minute() == 0)
    }

    /// Corre una vez por día, al comienzo de la hora dada (0-23).
    pub fn daily(hour: u32) -> Result<Self, ScheduleError> {
        if hour > 23 {
            return Err(ScheduleError::InvalidHour(hour));
        }
        Ok(Self::new(move |t| t.minute() == 0 && t.hour() == hour))
    }

    /// Corre una vez por semana, el día nombrado a la hora dada (0-23).
    pub fn weekly(day: &str, hour: u32) -> Result<Self, ScheduleError> {
        if hour > 23 {
            return Err(ScheduleError::InvalidHour(hour));
        }
        let day_lower = day.to_lowercase();
        let day_of_week = WEEKDAYS.iter()
                                  .position(|d| *d == day_lower)
                                  .ok_or_else(|| ScheduleError::InvalidDay(day.to_string()))?
                          as u32;
        Ok(Self::new(move |t| {
            t.minute() == 0 && t.hour() == hour && t.weekday().num_days_from_monday() == day_of_week
        }))
    }

    /// Evalúa el predicado en un instante ya redondeado al minuto.
    pub fn matches(&self, at: NaiveDateTime) -> bool {
        (self.check_time)(at)
    }

    /// Si el flow debe correr ahora, según el reloj local redondeado hacia
    /// abajo al minuto.
    pub fn should_run(&self) -> bool {
        let now = Local::now().naive_local();
        let now = now.with_second(0)
                     .and_then(|n| n.with_nanosecond(0))
                     .unwrap_or(now);
        self.matches(now)
    }
}

/// Unión: corre cuando cualquiera de los dos correría.
impl Add for Schedule {
    type Output = Schedule;

    fn add(self, other: Schedule) -> Schedule {
        Schedule::new(move |t| self.matches(t) || other.matches(t))
    }
}

/// Diferencia: corre cuando el primero correría y el segundo no.
impl Sub for Schedule {
    type Output = Schedule;

    fn sub(self, other: Schedule) -> Schedule {
        Schedule::new(move |t| self.matches(t) && !other.matches(t))
    }
}
