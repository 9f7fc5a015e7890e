// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Volatile backend.
use super::{FactLog, StoreError, StoredFact};
use crate::ident::Partition;

#[derive(Debug, Default)]
pub(crate) struct MemoryLog {
    facts: Vec<StoredFact>,
}

impl FactLog for MemoryLog {
    fn append(&mut self, fact: &StoredFact) -> Result<(), StoreError> {
        self.facts.push(fact.clone());
        Ok(())
    }

    fn scan(
        &mut self,
        partitions: &[Partition],
        visit: &mut dyn FnMut(StoredFact),
    ) -> Result<(), StoreError> {
        self.facts
            .iter()
            .filter(|f| partitions.contains(&f.partition))
            .for_each(|f| visit(f.clone()));
        Ok(())
    }

    fn close(&mut self) -> Result<(), StoreError> {
        self.facts = Vec::new();
        Ok(())
    }
}
