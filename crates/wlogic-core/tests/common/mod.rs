// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
#![allow(dead_code)]

use std::path::Path;

use wlogic_core::{
    ArgType, Atom, Backend, DataStore, Database, EntityId, LossKind, Model, PredicateId, Prng,
    RuleTemplate, Var,
};

pub struct Closure {
    pub model: Model,
    pub similar: PredicateId,
    pub same: PredicateId,
}

pub fn closure_model() -> Closure {
    let mut model = Model::new();
    let ids = [ArgType::UniqueId, ArgType::UniqueId];
    let similar = model.add_predicate("Similar", &ids).unwrap();
    let same = model.add_predicate("Same", &ids).unwrap();
    let (a, b, c) = (Var(0), Var(1), Var(2));
    model
        .add_rule(RuleTemplate::implication(
            "direct",
            vec![Atom::new(similar, [a, b])],
            Atom::new(same, [a, b]),
        ))
        .unwrap();
    model
        .add_rule(
            RuleTemplate::implication(
                "transitive",
                vec![Atom::new(same, [a, b]), Atom::new(same, [b, c])],
                Atom::new(same, [a, c]),
            )
            .with_distinct(a, c),
        )
        .unwrap();
    model
        .add_rule(
            RuleTemplate::negative_prior("prior", Atom::new(same, [a, b]))
                .weighted(0.01, LossKind::Squared),
        )
        .unwrap();
    Closure {
        model,
        similar,
        same,
    }
}

/// Populates all ordered pairs and opens the query database.
pub fn populated(closure: &Closure, backend: Backend, dir: &Path, users: u32) -> (DataStore, Database) {
    let mut store = DataStore::open(backend, dir, true).unwrap();
    let obs = store.partition("observations").unwrap();
    let target = store.partition("targets").unwrap();
    let mut prng = Prng::from_seed_u64(42);
    for a in 0..users {
        for b in 0..users {
            if a == b {
                continue;
            }
            let args = [EntityId(a), EntityId(b)];
            store
                .insert_valued(obs, closure.similar, prng.next_f64(), &args)
                .unwrap();
            store.insert(target, closure.same, &args).unwrap();
        }
    }
    let db = store
        .open_database(target, &[closure.similar], &[obs])
        .unwrap();
    (store, db)
}
