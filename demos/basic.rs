//! Build a rule set programmatically and confront it with a small dataset.
//!
//! Run with: `cargo run --example basic`

use confront::{funcdep, var, DataSet, RuleSetBuilder, Value};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let rules = RuleSetBuilder::new()
        .rule("turnover_pos", |r| r.when(var("turnover").gte(0_i64)))
        .rule("profit_bound", |r| {
            r.when(var("profit").lte(var("turnover")))
                .label("profit cannot exceed turnover")
        })
        .rule("geo_consistent", |r| r.when(funcdep(["postcode"], ["city"])))
        .compile()?;

    let data = DataSet::new()
        .column(
            "turnover",
            [Value::Int(950), Value::Na, Value::Int(430)],
        )
        .column(
            "profit",
            [Value::Int(120), Value::Int(30), Value::Int(500)],
        )
        .column("postcode", ["1011", "1011", "2022"])
        .column("city", ["Amsterdam", "Amsterdam", "Delft"]);

    let result = rules.confront(data)?;
    print!("{result}");

    for row in result.record_rows() {
        println!("{} / record {}: {}", row.rule, row.record, row.outcome);
    }
    Ok(())
}
