//! Lock striping sobre la colección de records.

use parking_lot::{Mutex, MutexGuard};

/// Un record con su mutex dedicado.
///
/// Los slots se crean al inicio de la corrida a partir de lo que devuelve el
/// record storer y se descartan al final. Dos steps que tocan records
/// disjuntos nunca contienden; la contención sólo es posible sobre records
/// compartidos.
#[derive(Debug)]
pub struct RecordSlot<R> {
    record: Mutex<R>,
}

impl<R> RecordSlot<R> {
    pub fn new(record: R) -> Self {
        Self { record: Mutex::new(record) }
    }

    /// Toma el lock del record. Todo acceso (lectura o escritura) dentro de
    /// un step de update/propagate debe pasar por aquí.
    pub fn lock(&self) -> MutexGuard<'_, R> {
        self.record.lock()
    }

    pub fn into_inner(self) -> R {
        self.record.into_inner()
    }
}

/// Envuelve los records en slots con lock propio.
pub(crate) fn stripe<R>(records: Vec<R>) -> Vec<RecordSlot<R>> {
    records.into_iter().map(RecordSlot::new).collect()
}

/// Desarma los slots y recupera los records, en el mismo orden.
pub(crate) fn unstripe<R>(slots: Vec<RecordSlot<R>>) -> Vec<R> {
    slots.into_iter().map(RecordSlot::into_inner).collect()
}
