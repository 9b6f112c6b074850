//! Shared proptest strategies for rule-set properties.

use confront::{var, DataSet, Expr, Value};
use proptest::prelude::*;

pub const COLUMNS: [&str; 3] = ["a", "b", "c"];

/// An integer cell with occasional missing values.
pub fn arb_cell() -> impl Strategy<Value = Value> {
    prop_oneof![
        4 => (-100_i64..100).prop_map(Value::Int),
        1 => Just(Value::Na),
    ]
}

/// A dataset with columns `a`, `b`, `c` and 1..20 records.
pub fn arb_dataset() -> impl Strategy<Value = DataSet> {
    (1_usize..20).prop_flat_map(|n| {
        (
            prop::collection::vec(arb_cell(), n),
            prop::collection::vec(arb_cell(), n),
            prop::collection::vec(arb_cell(), n),
        )
            .prop_map(|(a, b, c)| {
                DataSet::new()
                    .column("a", a)
                    .column("b", b)
                    .column("c", c)
            })
    })
}

/// A single comparison of one column against an integer constant.
pub fn arb_comparison() -> impl Strategy<Value = Expr> {
    (
        prop::sample::select(&COLUMNS[..]),
        -50_i64..50,
        0_usize..6,
    )
        .prop_map(|(column, constant, op)| {
            let lhs = var(column);
            match op {
                0 => lhs.eq(constant),
                1 => lhs.neq(constant),
                2 => lhs.gt(constant),
                3 => lhs.gte(constant),
                4 => lhs.lt(constant),
                _ => lhs.lte(constant),
            }
        })
}

/// A truth-valued expression built from comparisons and connectives.
pub fn arb_condition() -> impl Strategy<Value = Expr> {
    let leaf = arb_comparison();
    leaf.prop_recursive(3, 16, 2, |inner| {
        prop_oneof![
            (inner.clone(), inner.clone()).prop_map(|(a, b)| a.and(b)),
            (inner.clone(), inner.clone()).prop_map(|(a, b)| a.or(b)),
            (inner.clone(), inner.clone()).prop_map(|(a, b)| a.implies(b)),
            inner.prop_map(|a| !a),
        ]
    })
}
