// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Partitioned fact store with volatile and persistent backends.
//!
//! A store owns facts grouped into named partitions. The backend decides where
//! facts live; everything above the [`FactLog`] seam is backend-agnostic.
use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use thiserror::Error;
use tracing::debug;

use crate::database::Database;
use crate::ident::{EntityId, Partition, PredicateId, MAX_ARITY};

mod disk;
mod memory;

/// Storage backend selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Backend {
    /// Facts are kept in process memory and vanish on close.
    Memory,
    /// Facts are appended to a binary log file under the store directory.
    Disk,
}

impl Backend {
    /// Every backend, in display order.
    pub const ALL: [Self; 2] = [Self::Disk, Self::Memory];

    /// Parses the command-line literal (`disk` or `memory`).
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "disk" => Some(Self::Disk),
            "memory" => Some(Self::Memory),
            _ => None,
        }
    }

    /// Command-line literal for this backend.
    pub fn name(self) -> &'static str {
        match self {
            Self::Disk => "disk",
            Self::Memory => "memory",
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Errors emitted by the store and by database construction.
#[derive(Debug, Error)]
pub enum StoreError {
    /// I/O error from the disk backend.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// Disk record failed validation.
    #[error("corrupt fact log at byte {offset}: {reason}")]
    Corrupt {
        /// Byte offset of the offending record.
        offset: u64,
        /// What was wrong with it.
        reason: &'static str,
    },
    /// Fact arity disagrees with earlier facts of the same predicate.
    #[error("predicate {predicate:?} stored with {expected} arguments, got {found}")]
    ArityMismatch {
        /// Predicate of the rejected fact.
        predicate: PredicateId,
        /// Arity of previously stored facts.
        expected: usize,
        /// Arity of the rejected fact.
        found: usize,
    },
    /// Fact has no arguments or more than [`MAX_ARITY`].
    #[error("fact arity {0} outside 1..={MAX_ARITY}")]
    UnsupportedArity(usize),
    /// Truth value outside `[0, 1]` or not finite.
    #[error("truth value {0} outside [0, 1]")]
    ValueOutOfRange(f64),
    /// Partition handle was not issued by this store.
    #[error("unknown partition {0:?}")]
    UnknownPartition(Partition),
    /// Partition namespace exhausted.
    #[error("too many partitions")]
    TooManyPartitions,
    /// Handle used after `close`.
    #[error("store is closed")]
    Closed,
}

/// One stored fact.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredFact {
    /// Owning partition.
    pub partition: Partition,
    /// Predicate of the fact.
    pub predicate: PredicateId,
    /// Argument tuple.
    pub args: Vec<EntityId>,
    /// Truth value; `None` for target facts awaiting inference.
    pub value: Option<f64>,
}

/// Backend seam: an append-only log of facts that can be scanned by partition.
pub(crate) trait FactLog {
    /// Appends one validated fact.
    fn append(&mut self, fact: &StoredFact) -> Result<(), StoreError>;
    /// Visits every fact whose partition is in `partitions`, in insertion order.
    fn scan(
        &mut self,
        partitions: &[Partition],
        visit: &mut dyn FnMut(StoredFact),
    ) -> Result<(), StoreError>;
    /// Releases backend resources. Must tolerate repeated calls.
    fn close(&mut self) -> Result<(), StoreError>;
}

/// Partitioned fact store handle.
pub struct DataStore {
    backend: Backend,
    log: Box<dyn FactLog>,
    partitions: HashMap<String, Partition>,
    arities: HashMap<PredicateId, usize>,
    facts: u64,
    closed: bool,
}

impl fmt::Debug for DataStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataStore")
            .field("backend", &self.backend)
            .field("partitions", &self.partitions.len())
            .field("facts", &self.facts)
            .field("closed", &self.closed)
            .finish_non_exhaustive()
    }
}

impl DataStore {
    /// Opens a store.
    ///
    /// `dir` is only used by [`Backend::Disk`]; it is created if missing and,
    /// with `truncate`, any previous fact log inside it is discarded.
    ///
    /// # Errors
    /// [`StoreError::Io`] if the disk backend cannot create or open its log.
    pub fn open(backend: Backend, dir: &Path, truncate: bool) -> Result<Self, StoreError> {
        let log: Box<dyn FactLog> = match backend {
            Backend::Memory => Box::new(memory::MemoryLog::default()),
            Backend::Disk => Box::new(disk::DiskLog::open(dir, truncate)?),
        };
        debug!(%backend, dir = %dir.display(), truncate, "store opened");
        Ok(Self::with_log(backend, log))
    }

    fn with_log(backend: Backend, log: Box<dyn FactLog>) -> Self {
        Self {
            backend,
            log,
            partitions: HashMap::new(),
            arities: HashMap::new(),
            facts: 0,
            closed: false,
        }
    }

    /// Backend this store was opened with.
    pub fn backend(&self) -> Backend {
        self.backend
    }

    /// Number of facts inserted through this handle.
    pub fn fact_count(&self) -> u64 {
        self.facts
    }

    /// Returns the handle for a named partition, creating it on first use.
    ///
    /// # Errors
    /// [`StoreError::Closed`] after close, [`StoreError::TooManyPartitions`]
    /// when the namespace is exhausted.
    pub fn partition(&mut self, name: &str) -> Result<Partition, StoreError> {
        self.ensure_open()?;
        if let Some(&p) = self.partitions.get(name) {
            return Ok(p);
        }
        let raw = u16::try_from(self.partitions.len()).map_err(|_| StoreError::TooManyPartitions)?;
        let partition = Partition(raw);
        self.partitions.insert(name.to_owned(), partition);
        Ok(partition)
    }

    /// Inserts a fact carrying a truth value (evidence).
    ///
    /// # Errors
    /// See [`StoreError`]; nothing is stored on error.
    pub fn insert_valued(
        &mut self,
        partition: Partition,
        predicate: PredicateId,
        value: f64,
        args: &[EntityId],
    ) -> Result<(), StoreError> {
        if !(0.0..=1.0).contains(&value) {
            return Err(StoreError::ValueOutOfRange(value));
        }
        self.append(partition, predicate, Some(value), args)
    }

    /// Inserts a fact without a value (an inference target).
    ///
    /// # Errors
    /// See [`StoreError`]; nothing is stored on error.
    pub fn insert(
        &mut self,
        partition: Partition,
        predicate: PredicateId,
        args: &[EntityId],
    ) -> Result<(), StoreError> {
        self.append(partition, predicate, None, args)
    }

    fn append(
        &mut self,
        partition: Partition,
        predicate: PredicateId,
        value: Option<f64>,
        args: &[EntityId],
    ) -> Result<(), StoreError> {
        self.ensure_open()?;
        if usize::from(partition.0) >= self.partitions.len() {
            return Err(StoreError::UnknownPartition(partition));
        }
        if args.is_empty() || args.len() > MAX_ARITY {
            return Err(StoreError::UnsupportedArity(args.len()));
        }
        if let Some(&expected) = self.arities.get(&predicate) {
            if expected != args.len() {
                return Err(StoreError::ArityMismatch {
                    predicate,
                    expected,
                    found: args.len(),
                });
            }
        }
        self.log.append(&StoredFact {
            partition,
            predicate,
            args: args.to_vec(),
            value,
        })?;
        self.arities.entry(predicate).or_insert(args.len());
        self.facts += 1;
        Ok(())
    }

    /// Visits the facts of the given partitions in insertion order.
    ///
    /// # Errors
    /// [`StoreError::Closed`], or backend read failures.
    pub fn scan(
        &mut self,
        partitions: &[Partition],
        visit: &mut dyn FnMut(StoredFact),
    ) -> Result<(), StoreError> {
        self.ensure_open()?;
        self.log.scan(partitions, visit)
    }

    /// Builds a query database: facts in `target` become inference variables
    /// unless their predicate is listed in `closed`; facts in `observed` are
    /// fixed evidence.
    ///
    /// # Errors
    /// [`StoreError::Closed`], or backend read failures.
    pub fn open_database(
        &mut self,
        target: Partition,
        closed: &[PredicateId],
        observed: &[Partition],
    ) -> Result<Database, StoreError> {
        self.ensure_open()?;
        let mut db = Database::empty();
        self.log.scan(observed, &mut |fact| db.add_observed(&fact))?;
        self.log.scan(&[target], &mut |fact| {
            if closed.contains(&fact.predicate) {
                db.add_observed(&fact);
            } else {
                db.add_variable(&fact);
            }
        })?;
        debug!(
            atoms = db.atom_count(),
            variables = db.variable_count(),
            "database opened"
        );
        Ok(db)
    }

    /// Closes the store. Repeated calls are no-ops.
    ///
    /// # Errors
    /// [`StoreError::Io`] if the disk backend fails to flush.
    pub fn close(&mut self) -> Result<(), StoreError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.log.close()
    }

    /// Whether [`Self::close`] has been called.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn ensure_open(&self) -> Result<(), StoreError> {
        if self.closed {
            Err(StoreError::Closed)
        } else {
            Ok(())
        }
    }
}

impl Drop for DataStore {
    fn drop(&mut self) {
        if let Err(err) = self.close() {
            tracing::warn!(%err, "store close failed during drop");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mem() -> DataStore {
        DataStore::open(Backend::Memory, Path::new("."), true).unwrap()
    }

    /// Log whose first append fails.
    struct FlakyLog {
        failed: bool,
        inner: memory::MemoryLog,
    }

    impl FactLog for FlakyLog {
        fn append(&mut self, fact: &StoredFact) -> Result<(), StoreError> {
            if !self.failed {
                self.failed = true;
                return Err(StoreError::Io(std::io::Error::other("disk full")));
            }
            self.inner.append(fact)
        }

        fn scan(
            &mut self,
            partitions: &[Partition],
            visit: &mut dyn FnMut(StoredFact),
        ) -> Result<(), StoreError> {
            self.inner.scan(partitions, visit)
        }

        fn close(&mut self) -> Result<(), StoreError> {
            self.inner.close()
        }
    }

    #[test]
    fn backend_names_round_trip() {
        for backend in Backend::ALL {
            assert_eq!(Backend::from_name(backend.name()), Some(backend));
            let dir = std::env::temp_dir().join("wlogic-core-unit");
            let store = DataStore::open(backend, &dir, true).unwrap();
            assert_eq!(store.backend(), backend);
        }
        assert_eq!(Backend::from_name("tape"), None);
    }

    #[test]
    fn partition_handles_are_stable() {
        let mut store = mem();
        let a = store.partition("obs").unwrap();
        let b = store.partition("target").unwrap();
        assert_ne!(a, b);
        assert_eq!(store.partition("obs").unwrap(), a);
    }

    #[test]
    fn arity_is_fixed_by_first_insert() {
        let mut store = mem();
        let p = store.partition("obs").unwrap();
        let pred = PredicateId(0);
        store.insert(p, pred, &[EntityId(0), EntityId(1)]).unwrap();
        let err = store.insert(p, pred, &[EntityId(0)]).unwrap_err();
        assert!(matches!(err, StoreError::ArityMismatch { expected: 2, found: 1, .. }));
        assert_eq!(store.fact_count(), 1);
    }

    #[test]
    fn failed_append_records_nothing() {
        let log = FlakyLog {
            failed: false,
            inner: memory::MemoryLog::default(),
        };
        let mut store = DataStore::with_log(Backend::Memory, Box::new(log));
        let p = store.partition("obs").unwrap();
        let pred = PredicateId(0);
        let err = store.insert(p, pred, &[EntityId(0)]).unwrap_err();
        assert!(matches!(err, StoreError::Io(_)));
        assert_eq!(store.fact_count(), 0);

        // The failed insert must not pin arity 1 for the predicate.
        store.insert(p, pred, &[EntityId(0), EntityId(1)]).unwrap();
        assert_eq!(store.fact_count(), 1);
        let mut seen = Vec::new();
        store.scan(&[p], &mut |f| seen.push(f.args)).unwrap();
        assert_eq!(seen, vec![vec![EntityId(0), EntityId(1)]]);
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        let mut store = mem();
        let p = store.partition("obs").unwrap();
        let err = store
            .insert_valued(p, PredicateId(0), 1.5, &[EntityId(0)])
            .unwrap_err();
        assert!(matches!(err, StoreError::ValueOutOfRange(_)));
        let err = store
            .insert_valued(p, PredicateId(0), f64::NAN, &[EntityId(0)])
            .unwrap_err();
        assert!(matches!(err, StoreError::ValueOutOfRange(_)));
    }

    #[test]
    fn foreign_partition_is_rejected() {
        let mut store = mem();
        let err = store
            .insert(Partition(3), PredicateId(0), &[EntityId(0)])
            .unwrap_err();
        assert!(matches!(err, StoreError::UnknownPartition(_)));
    }

    #[test]
    fn close_is_idempotent_and_blocks_use() {
        let mut store = mem();
        store.close().unwrap();
        store.close().unwrap();
        assert!(store.is_closed());
        assert!(matches!(store.partition("obs"), Err(StoreError::Closed)));
    }
}
