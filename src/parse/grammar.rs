use winnow::ascii::{dec_int, till_line_ending};
use winnow::combinator::{alt, cut_err, delimited, not, opt, preceded, repeat, separated};
use winnow::error::{ErrMode, ModalResult, StrContext, StrContextValue};
use winnow::prelude::*;
use winnow::token::{any, one_of, take_while};

use crate::expand::{Entry, RuleDecl};
use crate::types::{ArithOp, CompareOp, Expr, SetExpr, Value};

// -- Whitespace & comments --------------------------------------------------

fn ws(input: &mut &str) -> ModalResult<()> {
    let _: () = repeat(
        0..,
        alt((
            take_while(1.., |c: char| c.is_ascii_whitespace()).void(),
            ('#', till_line_ending).void(),
        )),
    )
    .parse_next(input)?;
    Ok(())
}

// -- Identifiers & keywords -------------------------------------------------

fn ident<'i>(input: &mut &'i str) -> ModalResult<&'i str> {
    (
        take_while(1.., |c: char| c.is_ascii_alphabetic() || c == '_'),
        take_while(0.., |c: char| {
            c.is_ascii_alphanumeric() || c == '_' || c == '.'
        }),
    )
        .take()
        .parse_next(input)
}

/// A reserved word that must not run into a longer identifier.
fn keyword<'i>(word: &'static str) -> impl FnMut(&mut &'i str) -> ModalResult<()> {
    move |input: &mut &'i str| {
        (
            word,
            not(one_of(('a'..='z', 'A'..='Z', '0'..='9', '_', '.'))),
        )
            .void()
            .parse_next(input)
    }
}

// -- Values -----------------------------------------------------------------

fn string_literal(input: &mut &str) -> ModalResult<String> {
    '"'.parse_next(input)?;
    let mut s = String::new();
    loop {
        let ch = any.parse_next(input)?;
        match ch {
            '"' => return Ok(s),
            '\\' => {
                let esc = any.parse_next(input)?;
                match esc {
                    '"' => s.push('"'),
                    '\\' => s.push('\\'),
                    'n' => s.push('\n'),
                    't' => s.push('\t'),
                    other => {
                        s.push('\\');
                        s.push(other);
                    }
                }
            }
            c => s.push(c),
        }
    }
}

fn negative_number(input: &mut &str) -> ModalResult<Value> {
    let neg_str = (
        '-',
        take_while(1.., |c: char| c.is_ascii_digit()),
        opt((
            '.',
            take_while(1.., |c: char| c.is_ascii_digit()),
            opt(('e', opt(one_of(('+', '-'))), take_while(1.., |c: char| c.is_ascii_digit()))),
        )),
    )
        .take()
        .parse_next(input)?;
    if neg_str.contains('.') {
        let f: f64 = neg_str
            .parse()
            .map_err(|_| ErrMode::from_input(input).cut())?;
        Ok(Value::Float(f))
    } else {
        let i: i64 = neg_str
            .parse()
            .map_err(|_| ErrMode::from_input(input).cut())?;
        Ok(Value::Int(i))
    }
}

fn float_literal(input: &mut &str) -> ModalResult<f64> {
    // only match floats that contain a decimal point
    (
        take_while(1.., |c: char| c.is_ascii_digit()),
        '.',
        take_while(1.., |c: char| c.is_ascii_digit()),
        opt(('e', opt(one_of(('+', '-'))), take_while(1.., |c: char| c.is_ascii_digit()))),
    )
        .take()
        .try_map(|s: &str| s.parse::<f64>())
        .parse_next(input)
}

fn value(input: &mut &str) -> ModalResult<Value> {
    ws.parse_next(input)?;
    alt((
        string_literal.map(Value::Str),
        keyword("true").value(Value::Bool(true)),
        keyword("false").value(Value::Bool(false)),
        keyword("NA").value(Value::Na),
        negative_number,
        float_literal.map(Value::Float),
        dec_int::<_, i64, _>.map(Value::Int),
    ))
    .context(StrContext::Expected(StrContextValue::Description("value")))
    .parse_next(input)
}

// -- Operators --------------------------------------------------------------

fn compare_op(input: &mut &str) -> ModalResult<CompareOp> {
    ws.parse_next(input)?;
    alt((
        ">=".value(CompareOp::Gte),
        ">".value(CompareOp::Gt),
        "<=".value(CompareOp::Lte),
        "<".value(CompareOp::Lt),
        "==".value(CompareOp::Eq),
        "!=".value(CompareOp::Neq),
    ))
    .parse_next(input)
}

// -- Expressions ------------------------------------------------------------
// precedence: if < | < & < ! < comparison/in < + - < * / < unary - < primary

fn primary(input: &mut &str) -> ModalResult<Expr> {
    ws.parse_next(input)?;
    alt((
        delimited('(', expr, (ws, ')')),
        string_literal.map(|s| Expr::Lit(Value::Str(s))),
        float_literal.map(|f| Expr::Lit(Value::Float(f))),
        dec_int::<_, i64, _>.map(|i| Expr::Lit(Value::Int(i))),
        preceded('$', cut_err(ident)).map(|name| Expr::Group(name.to_owned())),
        call_or_var,
    ))
    .context(StrContext::Expected(StrContextValue::Description(
        "expression",
    )))
    .parse_next(input)
}

fn call_or_var(input: &mut &str) -> ModalResult<Expr> {
    let name = ident.parse_next(input)?;
    match name {
        "true" => return Ok(Expr::Lit(Value::Bool(true))),
        "false" => return Ok(Expr::Lit(Value::Bool(false))),
        "NA" => return Ok(Expr::Lit(Value::Na)),
        _ => {}
    }
    // a call requires the parenthesis right after the name
    if opt('(').parse_next(input)?.is_some() {
        let arg = cut_err(alt((
            delimited(ws, '.'.value(Expr::Dataset), ws),
            expr,
        )))
        .parse_next(input)?;
        cut_err((ws, ')')).parse_next(input)?;
        Ok(Expr::Call {
            function: name.to_owned(),
            arg: Box::new(arg),
        })
    } else {
        Ok(Expr::Var(name.to_owned()))
    }
}

fn factor(input: &mut &str) -> ModalResult<Expr> {
    ws.parse_next(input)?;
    if opt('-').parse_next(input)?.is_some() {
        let inner = cut_err(factor).parse_next(input)?;
        Ok(Expr::Neg(Box::new(inner)))
    } else {
        primary(input)
    }
}

fn term(input: &mut &str) -> ModalResult<Expr> {
    let first = factor(input)?;
    let rest: Vec<(ArithOp, Expr)> = repeat(
        0..,
        (
            preceded(ws, alt(('*'.value(ArithOp::Mul), '/'.value(ArithOp::Div)))),
            cut_err(factor),
        ),
    )
    .parse_next(input)?;
    Ok(rest.into_iter().fold(first, |acc, (op, r)| {
        Expr::Arith(op, Box::new(acc), Box::new(r))
    }))
}

fn additive(input: &mut &str) -> ModalResult<Expr> {
    let first = term(input)?;
    let rest: Vec<(ArithOp, Expr)> = repeat(
        0..,
        (
            preceded(ws, alt(('+'.value(ArithOp::Add), '-'.value(ArithOp::Sub)))),
            cut_err(term),
        ),
    )
    .parse_next(input)?;
    Ok(rest.into_iter().fold(first, |acc, (op, r)| {
        Expr::Arith(op, Box::new(acc), Box::new(r))
    }))
}

fn set_expr(input: &mut &str) -> ModalResult<SetExpr> {
    ws.parse_next(input)?;
    alt((
        delimited(
            '(',
            separated(1.., value, (ws, ',')),
            (ws, ')'),
        )
        .map(SetExpr::Values),
        ident.map(|name: &str| SetExpr::Var(name.to_owned())),
    ))
    .context(StrContext::Expected(StrContextValue::Description(
        "membership table",
    )))
    .parse_next(input)
}

fn comparison(input: &mut &str) -> ModalResult<Expr> {
    let lhs = additive(input)?;
    let checkpoint = input.checkpoint();
    if let Ok(op) = compare_op.parse_next(input) {
        let rhs = cut_err(additive).parse_next(input)?;
        return Ok(Expr::Compare {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        });
    }
    input.reset(&checkpoint);
    ws.parse_next(input)?;
    if opt(keyword("in")).parse_next(input)?.is_some() {
        let set = cut_err(set_expr).parse_next(input)?;
        return Ok(Expr::In {
            needle: Box::new(lhs),
            set,
        });
    }
    input.reset(&checkpoint);
    Ok(lhs)
}

fn not_expr(input: &mut &str) -> ModalResult<Expr> {
    ws.parse_next(input)?;
    if opt('!').parse_next(input)?.is_some() {
        // avoid swallowing the '=' of '!='
        not('=').parse_next(input)?;
        let inner = cut_err(not_expr).parse_next(input)?;
        Ok(Expr::Not(Box::new(inner)))
    } else {
        comparison(input)
    }
}

fn and_expr(input: &mut &str) -> ModalResult<Expr> {
    let first = not_expr(input)?;
    let rest: Vec<Expr> =
        repeat(0.., preceded((ws, '&'), cut_err(not_expr))).parse_next(input)?;
    Ok(rest
        .into_iter()
        .fold(first, |acc, r| Expr::And(Box::new(acc), Box::new(r))))
}

fn or_expr(input: &mut &str) -> ModalResult<Expr> {
    let first = and_expr(input)?;
    let rest: Vec<Expr> =
        repeat(0.., preceded((ws, '|'), cut_err(and_expr))).parse_next(input)?;
    Ok(rest
        .into_iter()
        .fold(first, |acc, r| Expr::Or(Box::new(acc), Box::new(r))))
}

fn expr(input: &mut &str) -> ModalResult<Expr> {
    ws.parse_next(input)?;
    if opt(keyword("if")).parse_next(input)?.is_some() {
        cut_err((ws, '(')).parse_next(input)?;
        let condition = cut_err(expr)
            .context(StrContext::Expected(StrContextValue::Description(
                "implication condition",
            )))
            .parse_next(input)?;
        cut_err((ws, ')')).parse_next(input)?;
        let consequence = cut_err(expr)
            .context(StrContext::Expected(StrContextValue::Description(
                "implication consequence",
            )))
            .parse_next(input)?;
        return Ok(Expr::If(Box::new(condition), Box::new(consequence)));
    }
    or_expr(input)
}

// -- Rule bodies ------------------------------------------------------------

fn variable_list(input: &mut &str) -> ModalResult<Vec<String>> {
    ws.parse_next(input)?;
    alt((
        delimited(
            '(',
            separated(1.., preceded(ws, ident.map(str::to_owned)), (ws, ',')),
            (ws, ')'),
        ),
        ident.map(|s: &str| vec![s.to_owned()]),
    ))
    .parse_next(input)
}

fn funcdep_body(input: &mut &str) -> ModalResult<Expr> {
    let determinants = variable_list.parse_next(input)?;
    (ws, "->").parse_next(input)?;
    let dependents = cut_err(variable_list)
        .context(StrContext::Expected(StrContextValue::Description(
            "dependent variables",
        )))
        .parse_next(input)?;
    Ok(Expr::FuncDep {
        determinants,
        dependents,
    })
}

fn rule_body(input: &mut &str) -> ModalResult<Expr> {
    alt((funcdep_body, expr)).parse_next(input)
}

// -- Declarations -----------------------------------------------------------

fn option_pair(input: &mut &str) -> ModalResult<(String, Value)> {
    ws.parse_next(input)?;
    let key = ident.parse_next(input)?;
    (ws, '=').parse_next(input)?;
    let v = cut_err(value).parse_next(input)?;
    Ok((key.to_owned(), v))
}

fn rule_decl(input: &mut &str) -> ModalResult<Entry> {
    ws.parse_next(input)?;
    keyword("rule").parse_next(input)?;
    ws.parse_next(input)?;

    let name = cut_err(ident)
        .context(StrContext::Expected(StrContextValue::Description(
            "rule name",
        )))
        .parse_next(input)?;

    let options: Vec<(String, Value)> = opt(delimited(
        (ws, '('),
        separated(1.., option_pair, (ws, ',')),
        (ws, ')'),
    ))
    .parse_next(input)?
    .unwrap_or_default();

    ws.parse_next(input)?;
    let label = opt(string_literal).parse_next(input)?;

    ws.parse_next(input)?;
    cut_err(':').parse_next(input)?;

    let body = cut_err(rule_body)
        .context(StrContext::Expected(StrContextValue::Description(
            "rule body",
        )))
        .parse_next(input)?;

    Ok(Entry::Rule(RuleDecl {
        name: Some(name.to_owned()),
        label,
        expr: body,
        options,
    }))
}

fn group_decl(input: &mut &str) -> ModalResult<Entry> {
    ws.parse_next(input)?;
    keyword("group").parse_next(input)?;
    ws.parse_next(input)?;
    let name = cut_err(ident)
        .context(StrContext::Expected(StrContextValue::Description(
            "group name",
        )))
        .parse_next(input)?;
    cut_err((ws, '=')).parse_next(input)?;
    let members = cut_err(delimited(
        (ws, '('),
        separated(1.., preceded(ws, ident.map(str::to_owned)), (ws, ',')),
        (ws, ')'),
    ))
    .context(StrContext::Expected(StrContextValue::Description(
        "group members",
    )))
    .parse_next(input)?;
    Ok(Entry::Group {
        name: name.to_owned(),
        members,
    })
}

fn option_decl(input: &mut &str) -> ModalResult<Entry> {
    ws.parse_next(input)?;
    keyword("option").parse_next(input)?;
    ws.parse_next(input)?;
    let key = cut_err(ident)
        .context(StrContext::Expected(StrContextValue::Description(
            "option key",
        )))
        .parse_next(input)?;
    cut_err((ws, '=')).parse_next(input)?;
    let v = cut_err(value).parse_next(input)?;
    Ok(Entry::Option {
        key: key.to_owned(),
        value: v,
    })
}

fn assign_decl(input: &mut &str) -> ModalResult<Entry> {
    ws.parse_next(input)?;
    let name = ident.parse_next(input)?;
    (ws, ":=").parse_next(input)?;
    let body = cut_err(expr)
        .context(StrContext::Expected(StrContextValue::Description(
            "assigned expression",
        )))
        .parse_next(input)?;
    Ok(Entry::Assign {
        name: name.to_owned(),
        expr: body,
    })
}

// -- Top-level parser -------------------------------------------------------

pub fn parse_entries(input: &mut &str) -> ModalResult<Vec<Entry>> {
    let entries: Vec<Entry> =
        repeat(0.., alt((rule_decl, group_decl, option_decl, assign_decl))).parse_next(input)?;
    ws.parse_next(input)?;
    Ok(entries)
}
