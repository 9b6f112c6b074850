use confront::{
    var, DataEnv, DataSet, DependencyGraph, Outcome, OptionsLayer, RuleKind, RuleSet,
    RuleSetBuilder, Value,
};

fn retailers() -> DataSet {
    DataSet::new()
        .column(
            "turnover",
            [Value::Int(950), Value::Na, Value::Int(430), Value::Int(-10)],
        )
        .column(
            "staff",
            [Value::Int(8), Value::Int(2), Value::Na, Value::Int(3)],
        )
        .column(
            "total_costs",
            [Value::Int(800), Value::Int(50), Value::Int(400), Value::Int(5)],
        )
}

#[test]
fn dsl_to_outcomes_end_to_end() {
    let set = RuleSet::from_dsl(
        r#"
        rule turnover_pos: turnover >= 0
        rule profitable: turnover - total_costs >= 0
        "#,
    )
    .unwrap();
    let out = set.confront(retailers()).unwrap();

    assert_eq!(
        out.get("turnover_pos").unwrap().outcomes(),
        [Outcome::Pass, Outcome::Unknown, Outcome::Pass, Outcome::Fail]
    );
    assert_eq!(
        out.get("profitable").unwrap().outcomes(),
        [Outcome::Pass, Outcome::Unknown, Outcome::Fail, Outcome::Fail]
    );
    assert!(!out.all_passed());

    let summary = out.summary();
    assert_eq!(summary.len(), 2);
    assert_eq!(summary[0].name, "turnover_pos");
    assert_eq!(summary[0].items, 4);
    assert_eq!(summary[0].passes, 2);
    assert_eq!(summary[0].fails, 1);
    assert_eq!(summary[0].unknown, 1);
}

#[test]
fn group_expansion_product_order() {
    let set = RuleSet::from_dsl(
        "group g = (a, b)\ngroup f = (c, d)\nrule cmp: $g > $f",
    )
    .unwrap();
    let texts: Vec<&str> = set.rules().iter().map(|r| r.origin().text.as_str()).collect();
    assert_eq!(texts, ["a > c", "a > d", "b > c", "b > d"]);
    let names: Vec<&str> = set.names().collect();
    assert_eq!(names, ["cmp.1", "cmp.2", "cmp.3", "cmp.4"]);

    let ds = DataSet::new()
        .column("a", [5_i64])
        .column("b", [1_i64])
        .column("c", [0_i64])
        .column("d", [3_i64]);
    let out = set.confront(ds).unwrap();
    assert_eq!(out.get("cmp.1").unwrap().outcomes(), [Outcome::Pass]); // a > c
    assert_eq!(out.get("cmp.2").unwrap().outcomes(), [Outcome::Pass]); // a > d
    assert_eq!(out.get("cmp.3").unwrap().outcomes(), [Outcome::Pass]); // b > c
    assert_eq!(out.get("cmp.4").unwrap().outcomes(), [Outcome::Fail]); // b > d
}

#[test]
fn linked_rules_form_one_block() {
    let set = RuleSet::from_dsl(
        "rule pa: a > 0\nrule pb: b > 0\nrule sum: a + b < 10",
    )
    .unwrap();
    let graph = DependencyGraph::build(&set);
    assert_eq!(graph.blocks().len(), 1);
    assert_eq!(graph.blocks()[0].rules, ["pa", "pb", "sum"]);
    assert_eq!(graph.blocks()[0].variables, ["a", "b"]);
}

#[test]
fn funcdep_from_dsl() {
    let set = RuleSet::from_dsl("rule geo: postcode -> city").unwrap();
    let ds = DataSet::new()
        .column("postcode", ["1011", "1011", "2022"])
        .column("city", ["Amsterdam", "Rotterdam", "Delft"]);
    let out = set.confront(ds).unwrap();
    assert_eq!(
        out.get("geo").unwrap().outcomes(),
        [Outcome::Fail, Outcome::Fail, Outcome::Pass]
    );
}

#[test]
fn membership_na_vectors() {
    let set = RuleSet::from_dsl(
        r#"
        rule definite: code in ("A", "B")
        rule hazy: code in ("A", NA)
        "#,
    )
    .unwrap();
    let ds = DataSet::new().column(
        "code",
        [Value::Str("A".into()), Value::Str("Z".into()), Value::Na],
    );
    let out = set.confront(ds).unwrap();
    assert_eq!(
        out.get("definite").unwrap().outcomes(),
        [Outcome::Pass, Outcome::Fail, Outcome::Unknown]
    );
    assert_eq!(
        out.get("hazy").unwrap().outcomes(),
        [Outcome::Pass, Outcome::Unknown, Outcome::Unknown]
    );
}

#[test]
fn cross_dataset_membership_and_shadowing() {
    let set = RuleSet::from_dsl("rule valid: code in iso\nrule pos: rate >= 0.0").unwrap();
    let env = DataEnv::new(
        DataSet::new()
            .column("code", ["NL", "XX"])
            .column("rate", [0.2_f64, 0.1]),
    )
    .reference(
        "codes",
        DataSet::new()
            .column("iso", ["NL", "BE", "DE"])
            .column("rate", [9.0_f64]),
    );
    let out = set.confront(env).unwrap();
    assert_eq!(
        out.get("valid").unwrap().outcomes(),
        [Outcome::Pass, Outcome::Fail]
    );
    // "rate" exists in both datasets: primary wins, with a warning
    let pos = out.get("pos").unwrap();
    assert_eq!(pos.outcomes(), [Outcome::Pass, Outcome::Pass]);
    assert_eq!(pos.warnings().len(), 1);
}

#[test]
fn options_precedence_defaults_set_rule_run() {
    let set = RuleSet::from_dsl(
        "option na.value = false\nrule a: turnover >= 0\nrule b (na.value = true): turnover >= 0",
    )
    .unwrap();
    let out = set.confront(retailers()).unwrap();
    // set-level na.value counts the unknown as a fail
    assert_eq!(out.get("a").unwrap().counts(), (2, 2, 0));
    // rule override counts it as a pass
    assert_eq!(out.get("b").unwrap().counts(), (3, 1, 0));

    // a run-time layer sits between set options and rule overrides
    let out = set
        .confront_with(retailers(), &OptionsLayer::new().na_value(None))
        .unwrap();
    assert_eq!(out.get("a").unwrap().counts(), (2, 1, 1));
    assert_eq!(out.get("b").unwrap().counts(), (3, 1, 0));
}

#[test]
fn error_isolation_keeps_other_rules_alive() {
    let set = RuleSet::from_dsl("rule broken: nosuch > 0\nrule fine: turnover >= -100").unwrap();
    let out = set.confront(retailers()).unwrap();
    assert!(out.get("broken").unwrap().error().is_some());
    assert!(out.get("broken").unwrap().outcomes().is_empty());
    assert_eq!(out.get("fine").unwrap().outcomes().len(), 4);

    let summary = out.summary();
    assert!(summary[0].errored);
    assert!(!summary[1].errored);
}

#[test]
fn sequential_blocks_in_results() {
    let set = RuleSet::from_dsl(
        "option sequential = true\nrule pa: a > 0\nrule pb: b > 0\nrule sum: a + b < 10\nrule other: z > 0",
    )
    .unwrap();
    let ds = DataSet::new()
        .column("a", [1_i64])
        .column("b", [2_i64])
        .column("z", [3_i64]);
    let out = set.confront(ds).unwrap();
    assert_eq!(out.get("pa").unwrap().block(), Some(0));
    assert_eq!(out.get("sum").unwrap().block(), Some(0));
    assert_eq!(out.get("other").unwrap().block(), Some(1));
}

#[test]
fn severity_scoring_from_extracted_coefficients() {
    let set = RuleSet::from_dsl("rule balance: net + tax == gross").unwrap();
    let RuleKind::LinearEquality(coefs) = set.get("balance").unwrap().kind() else {
        panic!("expected a linear equality");
    };
    // coefficients 1, 1, -1: euclidean dual norm is sqrt(3)
    assert!((coefs.norm(2.0) - 3.0_f64.sqrt()).abs() < 1e-12);
    let impact = coefs.impact(6.0, 2.0);
    assert!((impact - 6.0 / 3.0_f64.sqrt()).abs() < 1e-12);
}

#[test]
fn mutated_rule_set_confronts_like_rebuilt_one() {
    let base = RuleSet::from_dsl("rule a: turnover >= 0\nrule b: staff >= 0").unwrap();
    let mutated = base.remove("b");
    let rebuilt = RuleSet::from_dsl("rule a: turnover >= 0").unwrap();

    let from_mutated = mutated.confront(retailers()).unwrap();
    let from_rebuilt = rebuilt.confront(retailers()).unwrap();
    assert_eq!(
        from_mutated.get("a").unwrap().outcomes(),
        from_rebuilt.get("a").unwrap().outcomes()
    );
}

#[test]
fn record_rows_export() {
    let set = RuleSetBuilder::new()
        .rule("pos", |r| r.when(var("turnover").gte(0_i64)))
        .compile()
        .unwrap();
    let rows = set.confront(retailers()).unwrap().record_rows();
    assert_eq!(rows.len(), 4);
    assert_eq!(rows[3].rule, "pos");
    assert_eq!(rows[3].record, 3);
    assert_eq!(rows[3].outcome, Outcome::Fail);
}

#[test]
fn empty_rule_set_and_empty_dataset() {
    let empty = RuleSetBuilder::new().compile().unwrap();
    let out = empty.confront(retailers()).unwrap();
    assert!(out.is_empty());
    assert!(out.all_passed());

    let set = RuleSet::from_dsl("rule r: x > 0").unwrap();
    let out = set.confront(DataSet::new().column("x", Vec::<Value>::new())).unwrap();
    assert_eq!(out.get("r").unwrap().outcomes().len(), 0);
    assert!(out.all_passed());
}
