//! Performance benchmarks for rowqueue-engine

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rowqueue_engine::{
    replay, resolve_delete, resolve_edit, upsert, Cells, NewOperation, Operation, OperationQueue,
    QueueConfig, Row, RowIdentifiers, TableRef,
};
use serde_json::{json, Value};

fn users() -> TableRef {
    TableRef::new(1, "public", "users").with_primary_keys(["id"])
}

fn id(n: u64) -> RowIdentifiers {
    [("id", json!(n))].into_iter().collect()
}

fn cells(value: Value) -> Cells {
    match value {
        Value::Object(map) => map,
        _ => unreachable!(),
    }
}

fn edit(row_id: u64, value: u64) -> NewOperation {
    NewOperation::edit_cell(users(), id(row_id), "name", json!("old"), json!(value))
}

/// Queue of `size` edits on distinct rows plus one pending add.
fn filled_queue(size: u64) -> Vec<Operation> {
    let mut ops: Vec<Operation> = (0..size).map(|i| edit(i, i).stamp(i)).collect();
    ops.push(NewOperation::add_row(users(), "-1", cells(json!({"name": "new"}))).stamp(size));
    ops
}

fn server_rows(size: u64) -> Vec<Row> {
    (0..size)
        .map(|i| {
            Row::from_value(json!({"idx": i, "id": i, "name": format!("user {i}")}))
                .unwrap()
        })
        .collect()
}

fn bench_upsert(c: &mut Criterion) {
    let mut group = c.benchmark_group("upsert");

    for size in [10u64, 100, 1000] {
        let queue = filled_queue(size);

        group.bench_with_input(BenchmarkId::new("append", size), &queue, |b, queue| {
            b.iter(|| upsert(black_box(queue), edit(size + 1, 0), black_box(5000)))
        });

        group.bench_with_input(BenchmarkId::new("replace", size), &queue, |b, queue| {
            b.iter(|| upsert(black_box(queue), edit(size / 2, 7), black_box(5000)))
        });
    }

    group.finish();
}

fn bench_resolve(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolve");

    for size in [10u64, 100, 1000] {
        let queue = filled_queue(size);

        let NewOperation::DeleteRow(delete) = NewOperation::delete_row(
            users(),
            Row::from_value(json!({"idx": 0, "id": size / 2})).unwrap(),
        ) else {
            unreachable!()
        };
        group.bench_with_input(BenchmarkId::new("delete", size), &queue, |b, queue| {
            b.iter(|| resolve_delete(black_box(queue), black_box(&delete)))
        });

        let NewOperation::EditCellContent(merge) = NewOperation::edit_cell(
            users(),
            RowIdentifiers::for_temp_id("-1"),
            "name",
            json!("new"),
            json!("edited"),
        ) else {
            unreachable!()
        };
        group.bench_with_input(BenchmarkId::new("edit_merge", size), &queue, |b, queue| {
            b.iter(|| resolve_edit(black_box(queue), black_box(&merge), 5000))
        });
    }

    group.finish();
}

fn bench_replay(c: &mut Criterion) {
    let mut group = c.benchmark_group("replay");
    let config = QueueConfig::default();

    for size in [10u64, 100, 1000] {
        let queue = filled_queue(size);
        let rows = server_rows(size);

        group.bench_with_input(BenchmarkId::new("full_queue", size), &rows, |b, rows| {
            b.iter(|| replay(black_box(rows), black_box(&queue), &config))
        });
    }

    group.finish();
}

fn bench_enqueue(c: &mut Criterion) {
    c.bench_function("enqueue_1000_events", |b| {
        b.iter(|| {
            let mut queue = OperationQueue::default();
            for i in 0..1000u64 {
                queue.enqueue(edit(i % 100, i), i);
            }
            queue
        })
    });
}

criterion_group!(benches, bench_upsert, bench_resolve, bench_replay, bench_enqueue);
criterion_main!(benches);
