//! Parser for the model text format consumed by the CLI.
//!
//! ```text
//! # a small model
//! var x in [0, 10] = 3.5;
//! var y = 2 fixed;
//! con c1: x + 2 * y <= 12;
//! con c2 inactive: x == 5;
//! block sub { var w in [0, inf]; con c3: 1 <= w + x <= 4; }
//! ```
//!
//! `inf` and `-inf` in a `var ... in [lo, hi]` declaration leave the corresponding
//! bound unset. Variable references resolve against the enclosing blocks, innermost
//! first.

use std::io::Read;

use nom::{
    branch::alt,
    bytes::complete::tag,
    character::complete::{alpha1, alphanumeric1, char, digit1, one_of},
    combinator::{cut, eof, fail, map, not, opt, peek, recognize, value},
    error::{context, convert_error},
    multi::many0_count,
    number::complete::double,
    sequence::{delimited, pair, preceded, terminated},
    Finish,
};

use crate::{
    expr::Expr,
    model::{BlockId, Model, VarId},
};

type IResult<I, O> = Result<(I, O), nom::Err<nom::error::VerboseError<I>>>;

fn ws(mut input: &str) -> IResult<&str, ()> {
    loop {
        input = input.trim_start();
        if input.starts_with('#') {
            input = input.trim_start_matches(|c| c != '\n' && c != '\r');
        } else {
            break Ok((input, ()));
        }
    }
}

fn identifier_start(input: &str) -> IResult<&str, &str> {
    alt((alpha1, tag("_")))(input)
}

// The dot admits references to variables of sibling blocks by qualified name.
fn identifier_rest(input: &str) -> IResult<&str, &str> {
    alt((alphanumeric1, tag("_"), tag(".")))(input)
}

fn keyword<'a>(expected: &'static str) -> impl FnMut(&'a str) -> IResult<&'a str, &'a str> {
    terminated(tag(expected), not(peek(identifier_rest)))
}

fn identifier(input: &str) -> IResult<&str, &str> {
    delimited(
        ws,
        context(
            "identifier",
            recognize(pair(identifier_start, cut(many0_count(identifier_rest)))),
        ),
        ws,
    )(input)
}

fn number(input: &str) -> IResult<&str, f64> {
    delimited(ws, context("number", double), ws)(input)
}

fn integer(input: &str) -> IResult<&str, i32> {
    map(
        delimited(
            ws,
            context("integer", recognize(pair(opt(char('-')), digit1))),
            ws,
        ),
        |s: &str| s.parse().unwrap(),
    )(input)
}

fn expect_var(model: &Model, block: BlockId, id: &str) -> VarId {
    model
        .resolve_variable(block, id)
        .unwrap_or_else(|| panic!("Unknown variable {id}"))
}

fn atom<'a>(model: &Model, block: BlockId, input: &'a str) -> IResult<&'a str, Expr> {
    alt((
        delimited(
            preceded(ws, char('(')),
            |i| expression(model, block, i),
            cut(preceded(ws, char(')'))),
        ),
        map(identifier, |id| Expr::var(expect_var(model, block, id))),
        map(number, Expr::constant),
    ))(input)
}

fn power<'a>(model: &Model, block: BlockId, input: &'a str) -> IResult<&'a str, Expr> {
    let (input, base) = atom(model, block, input)?;
    let (input, exp) = opt(preceded(preceded(ws, char('^')), cut(integer)))(input)?;
    let expr = match exp {
        Some(exp) => base.pow(exp),
        None => base,
    };
    Ok((input, expr))
}

fn factor<'a>(model: &Model, block: BlockId, input: &'a str) -> IResult<&'a str, Expr> {
    let minus: IResult<&str, char> = preceded(ws, char('-'))(input);
    if let Ok((input, _)) = minus {
        let (input, inner) = factor(model, block, input)?;
        Ok((input, -inner))
    } else {
        power(model, block, input)
    }
}

fn term<'a>(model: &Model, block: BlockId, input: &'a str) -> IResult<&'a str, Expr> {
    let (mut input, mut acc) = factor(model, block, input)?;
    loop {
        let op: IResult<&str, char> = delimited(ws, one_of("*/"), ws)(input);
        let Ok((rest, op)) = op else {
            break Ok((input, acc));
        };
        let (rest, rhs) = cut(|i| factor(model, block, i))(rest)?;
        acc = if op == '*' { acc * rhs } else { acc / rhs };
        input = rest;
    }
}

fn expression<'a>(model: &Model, block: BlockId, input: &'a str) -> IResult<&'a str, Expr> {
    let (mut input, mut acc) = term(model, block, input)?;
    loop {
        let op: IResult<&str, char> = delimited(ws, one_of("+-"), ws)(input);
        let Ok((rest, op)) = op else {
            break Ok((input, acc));
        };
        let (rest, rhs) = cut(|i| term(model, block, i))(rest)?;
        acc = if op == '+' { acc + rhs } else { acc - rhs };
        input = rest;
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum RelOp {
    Le,
    Ge,
    Eq,
}

fn relop(input: &str) -> IResult<&str, RelOp> {
    delimited(
        ws,
        context(
            "relation",
            alt((
                value(RelOp::Le, tag("<=")),
                value(RelOp::Ge, tag(">=")),
                value(RelOp::Eq, tag("==")),
            )),
        ),
        ws,
    )(input)
}

fn var_decl<'a>(model: &mut Model, block: BlockId, input: &'a str) -> IResult<&'a str, ()> {
    let (input, _) = preceded(ws, keyword("var"))(input)?;
    let (input, name) = cut(identifier)(input)?;
    let v = model.add_variable(block, name);
    let (input, bounds) = opt(preceded(preceded(ws, keyword("in")), cut(var_bounds)))(input)?;
    if let Some((lower, upper)) = bounds {
        model.set_bounds(v, lower, upper);
    }
    let (input, val) = opt(preceded(preceded(ws, char('=')), cut(number)))(input)?;
    if let Some(val) = val {
        model.set_value(v, val);
    }
    let (input, fixed) = opt(preceded(ws, keyword("fixed")))(input)?;
    if fixed.is_some() {
        model.fix(v);
    }
    let (input, _) = cut(preceded(ws, char(';')))(input)?;
    Ok((input, ()))
}

fn var_bounds(input: &str) -> IResult<&str, (Option<f64>, Option<f64>)> {
    let (input, _) = cut(preceded(ws, char('[')))(input)?;
    let (input, lower) = cut(number)(input)?;
    let (input, _) = cut(preceded(ws, char(',')))(input)?;
    let (input, upper) = cut(number)(input)?;
    let (input, _) = cut(preceded(ws, char(']')))(input)?;
    Ok((input, (finite(lower), finite(upper))))
}

fn finite(x: f64) -> Option<f64> {
    x.is_finite().then_some(x)
}

fn con_decl<'a>(model: &mut Model, block: BlockId, input: &'a str) -> IResult<&'a str, ()> {
    let (input, _) = preceded(ws, keyword("con"))(input)?;
    let (input, name) = cut(identifier)(input)?;
    let (input, inactive) = opt(preceded(ws, keyword("inactive")))(input)?;
    let (input, _) = cut(preceded(ws, char(':')))(input)?;
    let (input, first) = cut(|i| expression(model, block, i))(input)?;
    let (input, rel) = cut(relop)(input)?;
    let (input, second) = cut(|i| expression(model, block, i))(input)?;
    let (input, range_end) = opt(pair(relop, cut(|i| expression(model, block, i))))(input)?;
    let (input, _) = cut(preceded(ws, char(';')))(input)?;
    let (body, lower, upper) = if let Some((rel2, third)) = range_end {
        if rel != RelOp::Le || rel2 != RelOp::Le {
            panic!("Range constraint {name} must use <= on both sides");
        }
        let lower = first
            .extract_constant()
            .unwrap_or_else(|| panic!("Range constraint {name} requires constant bounds"));
        let upper = third
            .extract_constant()
            .unwrap_or_else(|| panic!("Range constraint {name} requires constant bounds"));
        (second, Some(lower), Some(upper))
    } else {
        match rel {
            RelOp::Eq => match (first.extract_constant(), second.extract_constant()) {
                (_, Some(target)) => (first, Some(target), Some(target)),
                (Some(target), None) => (second, Some(target), Some(target)),
                (None, None) => (first - second, Some(0.0), Some(0.0)),
            },
            RelOp::Le => match (first.extract_constant(), second.extract_constant()) {
                (_, Some(upper)) => (first, None, Some(upper)),
                (Some(lower), None) => (second, Some(lower), None),
                (None, None) => (first - second, None, Some(0.0)),
            },
            RelOp::Ge => match (first.extract_constant(), second.extract_constant()) {
                (_, Some(lower)) => (first, Some(lower), None),
                (Some(upper), None) => (second, None, Some(upper)),
                (None, None) => (first - second, Some(0.0), None),
            },
        }
    };
    let c = model.add_constraint(block, name, body, lower, upper);
    if inactive.is_some() {
        model.deactivate(c);
    }
    Ok((input, ()))
}

fn block_decl<'a>(model: &mut Model, block: BlockId, input: &'a str) -> IResult<&'a str, ()> {
    let (input, _) = preceded(ws, keyword("block"))(input)?;
    let (input, name) = cut(identifier)(input)?;
    let child = model.add_block(block, name);
    let (input, _) = cut(preceded(ws, char('{')))(input)?;
    let (input, ()) = {
        let mut input = input;
        loop {
            match item(model, child, input) {
                Ok((rest, ())) => input = rest,
                Err(nom::Err::Error(_)) => break Ok((input, ())),
                Err(e) => break Err(e),
            }
        }
    }?;
    let (input, _) = cut(preceded(ws, char('}')))(input)?;
    Ok((input, ()))
}

fn item<'a>(model: &mut Model, block: BlockId, input: &'a str) -> IResult<&'a str, ()> {
    let (input, ()) = ws(input)?;
    if keyword("var")(input).is_ok() {
        var_decl(model, block, input)
    } else if keyword("con")(input).is_ok() {
        con_decl(model, block, input)
    } else if keyword("block")(input).is_ok() {
        block_decl(model, block, input)
    } else {
        context("declaration", fail)(input)
    }
}

pub fn model(input: &str) -> IResult<&str, Model> {
    let mut m = Model::new();
    let root = m.root();
    let (input, ()) = {
        let mut input = input;
        loop {
            match item(&mut m, root, input) {
                Ok((rest, ())) => input = rest,
                Err(nom::Err::Error(_)) => break Ok((input, ())),
                Err(e) => break Err(e),
            }
        }
    }?;
    let (input, _) = preceded(ws, eof)(input)?;
    Ok((input, m))
}

pub fn parse_model(input: &str) -> Model {
    match model(input).finish() {
        Ok((_, m)) => m,
        Err(e) => {
            panic!("Parse error:\n{}", convert_error(input, e));
        }
    }
}

pub fn parse_file(path: &std::path::Path) -> std::io::Result<Model> {
    let mut file = std::fs::File::open(path)?;
    let mut contents = String::new();
    file.read_to_string(&mut contents)?;
    Ok(parse_model(&contents))
}
