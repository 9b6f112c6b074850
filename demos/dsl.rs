//! Parse rules from DSL text, including groups and assignments, then
//! confront them with data.
//!
//! Run with: `cargo run --example dsl`

use confront::{DataSet, RuleSet, Value};

const RULES: &str = r#"
# Retail survey checks
option lin.ineq.eps = 1.0e-6

group amounts = (turnover, total_costs)

profit := turnover - total_costs

rule positive: $amounts >= 0
rule balanced "books must balance": profit == turnover - total_costs
rule status_known: status in ("active", "dormant")
rule small_or_audited: if (turnover > 1000) audited == true
"#;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let rules = RuleSet::from_dsl(RULES)?;
    for rule in rules.iter() {
        println!("{} [{}]", rule, rule.kind());
    }

    let data = DataSet::new()
        .column(
            "turnover",
            [Value::Int(950), Value::Int(1500), Value::Na],
        )
        .column(
            "total_costs",
            [Value::Int(800), Value::Int(1200), Value::Int(-40)],
        )
        .column(
            "status",
            [Value::Str("active".into()), Value::Str("gone".into()), Value::Na],
        )
        .column(
            "audited",
            [Value::Bool(false), Value::Bool(true), Value::Bool(false)],
        );

    let result = rules.confront(data)?;
    print!("{result}");
    Ok(())
}
