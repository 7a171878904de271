//! Tables de verrous par clé (créneau, membre du personnel).
//!
//! Ordre d'acquisition imposé : verrous de personnel d'abord, triés par id, puis au
//! plus un verrou de créneau.

use super::SchedError;
use anyhow::anyhow;
use std::collections::{BTreeSet, HashMap};
use std::hash::Hash;
use std::sync::{Arc, Condvar, Mutex};

#[derive(Debug, Default)]
struct Slot {
    busy: Mutex<bool>,
    freed: Condvar,
}

fn poisoned() -> SchedError {
    SchedError::Other(anyhow!("lock table poisoned"))
}

/// Verrou tenu sur une clé ; relâché au drop. L'entrée de la table disparaît avec
/// le dernier détenteur ou attendant.
#[derive(Debug)]
pub(super) struct SlotGuard<'a, K: Eq + Hash> {
    table: &'a LockTable<K>,
    key: K,
    slot: Arc<Slot>,
    held: bool,
}

impl<K: Eq + Hash> Drop for SlotGuard<'_, K> {
    fn drop(&mut self) {
        // la table d'abord : personne ne peut cloner le slot pendant qu'on compte
        let slots = self.table.slots.lock();
        if self.held {
            if let Ok(mut busy) = self.slot.busy.lock() {
                *busy = false;
            }
            self.slot.freed.notify_one();
        }
        if let Ok(mut slots) = slots {
            // une référence dans la table, une ici
            if Arc::strong_count(&self.slot) == 2 {
                slots.remove(&self.key);
            }
        }
    }
}

#[derive(Debug)]
pub(super) struct LockTable<K> {
    slots: Mutex<HashMap<K, Arc<Slot>>>,
}

impl<K> Default for LockTable<K> {
    fn default() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
        }
    }
}

impl<K: Eq + Hash + Ord + Clone> LockTable<K> {
    fn slot(&self, key: &K) -> Result<Arc<Slot>, SchedError> {
        let mut slots = self.slots.lock().map_err(|_| poisoned())?;
        Ok(Arc::clone(slots.entry(key.clone()).or_default()))
    }

    pub(super) fn lock(&self, key: &K) -> Result<SlotGuard<'_, K>, SchedError> {
        let slot = self.slot(key)?;
        // garde posée avant l'attente : une erreur rend aussi la référence
        let mut guard = SlotGuard {
            table: self,
            key: key.clone(),
            slot,
            held: false,
        };
        {
            let mut busy = guard.slot.busy.lock().map_err(|_| poisoned())?;
            while *busy {
                busy = guard.slot.freed.wait(busy).map_err(|_| poisoned())?;
            }
            *busy = true;
        }
        guard.held = true;
        Ok(guard)
    }

    /// Verrouille un ensemble de clés dans l'ordre trié, sans doublon.
    pub(super) fn lock_all<'a, I>(&self, keys: I) -> Result<Vec<SlotGuard<'_, K>>, SchedError>
    where
        I: IntoIterator<Item = &'a K>,
        K: 'a,
    {
        let ordered: BTreeSet<&K> = keys.into_iter().collect();
        ordered.into_iter().map(|k| self.lock(k)).collect()
    }

    #[cfg(test)]
    fn tracked(&self) -> usize {
        self.slots.lock().map(|s| s.len()).unwrap_or(0)
    }
}
