// nom grammar for field visibility conditionals
//
//   expr    := or
//   or      := and ("or" and)*
//   and     := not ("and" not)*
//   not     := "not" not | compare
//   compare := operand (("=="|"!="|"<="|">="|"<"|">") operand)?
//   operand := number | 'str' | "str" | True | False | identifier | "(" expr ")"

use super::ConditionError;
use nom::{
    branch::alt,
    bytes::complete::{tag, take_till},
    character::complete::{alpha1, alphanumeric1, char, multispace0, one_of},
    combinator::{all_consuming, map, opt, peek, recognize, verify},
    multi::{many0, many0_count},
    number::complete::double,
    sequence::{delimited, pair, preceded},
    IResult, Parser,
};

const KEYWORDS: [&str; 5] = ["and", "or", "not", "True", "False"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Le,
    Ge,
    Lt,
    Gt,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    Str(String),
    Bool(bool),
    Name(String),
    Not(Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Compare(Box<Expr>, CompareOp, Box<Expr>),
}

impl Expr {
    /// Field names the expression refers to, in source order
    pub fn names(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_names(&mut out);
        out
    }

    fn collect_names<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Expr::Name(n) => out.push(n),
            Expr::Not(e) => e.collect_names(out),
            Expr::And(a, b) | Expr::Or(a, b) | Expr::Compare(a, _, b) => {
                a.collect_names(out);
                b.collect_names(out);
            }
            Expr::Number(_) | Expr::Str(_) | Expr::Bool(_) => {}
        }
    }
}

/// Parse a whole conditional; trailing input is an error
pub fn parse_expr(input: &str) -> Result<Expr, ConditionError> {
    match all_consuming(delimited(multispace0, or_expr, multispace0)).parse(input) {
        Ok((_, expr)) => Ok(expr),
        Err(e) => Err(ConditionError::Parse {
            expr: input.to_string(),
            reason: e.to_string(),
        }),
    }
}

fn identifier(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        alt((alpha1, tag("_"))),
        many0_count(alt((alphanumeric1, tag("_")))),
    ))
    .parse(input)
}

fn keyword<'a>(word: &'static str, input: &'a str) -> IResult<&'a str, &'a str> {
    delimited(
        multispace0,
        verify(identifier, move |s: &str| s == word),
        multispace0,
    )
    .parse(input)
}

fn or_expr(input: &str) -> IResult<&str, Expr> {
    let (input, first) = and_expr(input)?;
    let (input, rest) = many0(preceded(|i| keyword("or", i), and_expr)).parse(input)?;
    let expr = rest
        .into_iter()
        .fold(first, |acc, e| Expr::Or(Box::new(acc), Box::new(e)));
    Ok((input, expr))
}

fn and_expr(input: &str) -> IResult<&str, Expr> {
    let (input, first) = not_expr(input)?;
    let (input, rest) = many0(preceded(|i| keyword("and", i), not_expr)).parse(input)?;
    let expr = rest
        .into_iter()
        .fold(first, |acc, e| Expr::And(Box::new(acc), Box::new(e)));
    Ok((input, expr))
}

fn not_expr(input: &str) -> IResult<&str, Expr> {
    alt((
        map(preceded(|i| keyword("not", i), not_expr), |e| {
            Expr::Not(Box::new(e))
        }),
        compare_expr,
    ))
    .parse(input)
}

fn compare_op(input: &str) -> IResult<&str, CompareOp> {
    delimited(
        multispace0,
        alt((
            map(tag("=="), |_| CompareOp::Eq),
            map(tag("!="), |_| CompareOp::Ne),
            map(tag("<="), |_| CompareOp::Le),
            map(tag(">="), |_| CompareOp::Ge),
            map(tag("<"), |_| CompareOp::Lt),
            map(tag(">"), |_| CompareOp::Gt),
        )),
        multispace0,
    )
    .parse(input)
}

fn compare_expr(input: &str) -> IResult<&str, Expr> {
    let (input, left) = operand(input)?;
    let (input, rhs) = opt(pair(compare_op, operand)).parse(input)?;
    let expr = match rhs {
        Some((op, right)) => Expr::Compare(Box::new(left), op, Box::new(right)),
        None => left,
    };
    Ok((input, expr))
}

fn number(input: &str) -> IResult<&str, Expr> {
    // `double` also accepts words like "inf"; only try it on numeric input
    map(preceded(peek(one_of("0123456789.-+")), double), Expr::Number).parse(input)
}

fn string(input: &str) -> IResult<&str, Expr> {
    map(
        alt((
            delimited(char('\''), take_till(|c: char| c == '\''), char('\'')),
            delimited(char('"'), take_till(|c: char| c == '"'), char('"')),
        )),
        |s: &str| Expr::Str(s.to_string()),
    )
    .parse(input)
}

fn name_or_bool(input: &str) -> IResult<&str, Expr> {
    let (input, word) = verify(identifier, |s: &str| !matches!(s, "and" | "or" | "not")).parse(input)?;
    let expr = match word {
        "True" => Expr::Bool(true),
        "False" => Expr::Bool(false),
        _ => Expr::Name(word.to_string()),
    };
    Ok((input, expr))
}

fn parens(input: &str) -> IResult<&str, Expr> {
    delimited(char('('), delimited(multispace0, or_expr, multispace0), char(')')).parse(input)
}

fn operand(input: &str) -> IResult<&str, Expr> {
    delimited(
        multispace0,
        alt((number, string, name_or_bool, parens)),
        multispace0,
    )
    .parse(input)
}

/// Whether @name would be read as a keyword rather than a field
pub fn is_keyword(name: &str) -> bool {
    KEYWORDS.contains(&name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(n: &str) -> Box<Expr> {
        Box::new(Expr::Name(n.to_string()))
    }

    #[test]
    fn test_precedence() {
        let e = parse_expr("a or b and not c").unwrap();
        assert_eq!(
            e,
            Expr::Or(
                name("a"),
                Box::new(Expr::And(name("b"), Box::new(Expr::Not(name("c")))))
            )
        );

        let e = parse_expr("(a or b) and c").unwrap();
        assert_eq!(
            e,
            Expr::And(Box::new(Expr::Or(name("a"), name("b"))), name("c"))
        );
    }

    #[test]
    fn test_comparisons() {
        assert_eq!(
            parse_expr("rpm_limit >= 6000").unwrap(),
            Expr::Compare(name("rpm_limit"), CompareOp::Ge, Box::new(Expr::Number(6000.0)))
        );
        assert_eq!(
            parse_expr("mode=='seq'").unwrap(),
            Expr::Compare(name("mode"), CompareOp::Eq, Box::new(Expr::Str("seq".into())))
        );
        assert_eq!(
            parse_expr(" \"a b\" != x ").unwrap(),
            Expr::Compare(Box::new(Expr::Str("a b".into())), CompareOp::Ne, name("x"))
        );
        assert_eq!(
            parse_expr("x < -1.5").unwrap(),
            Expr::Compare(name("x"), CompareOp::Lt, Box::new(Expr::Number(-1.5)))
        );
    }

    #[test]
    fn test_names() {
        let e = parse_expr("not a or (b == 'x' and c > 1)").unwrap();
        assert_eq!(e.names(), vec!["a", "b", "c"]);
        assert!(parse_expr("True").unwrap().names().is_empty());
    }

    #[test]
    fn test_literals_and_names() {
        assert_eq!(parse_expr("True").unwrap(), Expr::Bool(true));
        assert_eq!(parse_expr("not False").unwrap(), Expr::Not(Box::new(Expr::Bool(false))));
        // Keywords only match whole words
        assert_eq!(parse_expr("notify").unwrap(), Expr::Name("notify".into()));
        assert_eq!(parse_expr("order").unwrap(), Expr::Name("order".into()));
        assert_eq!(parse_expr("inf").unwrap(), Expr::Name("inf".into()));
    }

    #[test]
    fn test_rejects_everything_else() {
        for bad in [
            "",
            "a +",
            "a + b",
            "f(x)",
            "a.b",
            "__import__('os')",
            "a ==",
            "(a",
            "'open",
            "a b",
            "and",
            "a < b < c",
        ] {
            assert!(
                matches!(parse_expr(bad), Err(ConditionError::Parse { .. })),
                "{:?} parsed",
                bad
            );
        }
        assert!(is_keyword("and"));
        assert!(!is_keyword("rpm"));
    }
}
