//! Dispatch Benchmarks
//!
//! Hot paths of command and inquiry dispatch through a small composite.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use mediator_core::binding::{Binding, BindingIndex, HandlerDescriptor, IndexKey, Parameter};
use mediator_core::callback::Reply;
use mediator_core::handler::{CompositeHandler, Handler, HandlerExt, HandlerRef};
use mediator_core::policy::{handles, looksup, provides};
use mediator_core::types::TypeKey;
use std::sync::Arc;

struct Deposit(u64);
struct Ledger(u64);

struct Accounts;
impl Handler for Accounts {}

struct Books;
impl Handler for Books {}

fn register() {
    HandlerDescriptor::for_type::<Accounts>()
        .add_binding(
            handles(),
            Binding::builder(TypeKey::of::<Deposit>())
                .parameter(Parameter::of::<Deposit>())
                .parameter(Parameter::of::<Ledger>())
                .function(|arguments, _| {
                    let deposit = arguments.require::<Deposit>(0)?;
                    let ledger = arguments.require::<Ledger>(1)?;
                    Ok(Reply::value(deposit.0 + ledger.0))
                })
                .build()
                .expect("deposit binding"),
        )
        .expect("register deposit");
    HandlerDescriptor::for_type::<Books>()
        .add_binding(
            provides(),
            Binding::builder(TypeKey::of::<Ledger>())
                .function(|_, _| Ok(Reply::value(Ledger(100))))
                .build()
                .expect("ledger binding"),
        )
        .expect("register ledger");
}

fn benchmark_send(c: &mut Criterion) {
    register();
    let root: HandlerRef = Arc::new(CompositeHandler::with_handlers(vec![
        Arc::new(Accounts),
        Arc::new(Books),
    ]));

    c.bench_function("send_with_dependency", |b| {
        b.iter(|| root.send(black_box(Deposit(5))).expect("handled"))
    });
    c.bench_function("resolve_provided", |b| {
        b.iter(|| root.resolve(TypeKey::of::<Ledger>()).expect("resolved"))
    });
}

fn benchmark_index_lookup(c: &mut Criterion) {
    let mut group = c.benchmark_group("index_snapshot_from");
    for size in [8_i64, 64, 512] {
        let mut index = BindingIndex::new(looksup());
        for key in 0..size {
            let binding = Binding::builder(key)
                .function(|_, _| Ok(Reply::Nothing))
                .build()
                .expect("literal binding");
            index.insert(Arc::new(binding));
        }
        let probe = IndexKey::Literal((size / 2).into());
        group.bench_with_input(BenchmarkId::from_parameter(size), &probe, |b, probe| {
            b.iter(|| index.snapshot_from(black_box(probe)))
        });
    }
    group.finish();
}

criterion_group!(benches, benchmark_send, benchmark_index_lookup);
criterion_main!(benches);
