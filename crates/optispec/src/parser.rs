//! Arithmetic formula language.
//!
//! Formulas are numeric literals, identifiers, `+ - * /`, unary minus and
//! parentheses. Parsing is two-staged like any chumsky pipeline here: a
//! character lexer produces spanned tokens, a pratt parser folds them into an
//! [`Expression`] tree.

use chumsky::{input::ValueInput, pratt::*, prelude::*};
use std::ops::Range;

mod lexer;
pub use lexer::{Token, lexer};

mod report;
pub use report::render_formula_errors;

pub use chumsky::prelude::{Input, Parser};

pub type Span = SimpleSpan;
pub type ParseError<'code, T> = Rich<'code, T, Span>;

#[derive(Debug, Clone)]
pub struct Spanned<T> {
    pub span: Span,
    pub node: T,
}

pub fn span_at(offset: usize) -> Span {
    Span::from(offset..offset)
}

/// Why a formula could not produce a number.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FormulaError {
    #[error("formula is empty")]
    Empty,
    #[error("{message}")]
    Syntax {
        message: String,
        reason: String,
        span: Range<usize>,
    },
    #[error("unknown variable '{name}'")]
    UnknownVariable { name: String, span: Range<usize> },
    #[error("formula result is not a finite number")]
    NonFinite,
}

impl FormulaError {
    fn from_parse_error<T: std::fmt::Display>(error: ParseError<'_, T>) -> Self {
        Self::Syntax {
            message: error.to_string(),
            reason: error.reason().to_string(),
            span: error.span().into_range(),
        }
    }

    pub fn span(&self) -> Option<Range<usize>> {
        match self {
            Self::Syntax { span, .. } | Self::UnknownVariable { span, .. } => Some(span.clone()),
            Self::Empty | Self::NonFinite => None,
        }
    }
}

pub fn parser<'code, I>() -> impl Parser<'code, I, Spanned<Expression>, extra::Err<ParseError<'code, Token<'code>>>>
where
    I: ValueInput<'code, Token = Token<'code>, Span = Span>,
{
    recursive(|expression| {
        let number = select! { Token::Number(number) => Expression::Number(number) };
        let variable = select! { Token::Identifier(identifier) => identifier }
            .map(|identifier| Expression::Variable(identifier.to_string()));

        let nested = expression.delimited_by(
            just(Token::BracketRoundOpen),
            just(Token::BracketRoundClose),
        );

        let atom = number
            .or(variable)
            .map_with(|expression, extra| Spanned {
                node: expression,
                span: extra.span(),
            })
            .or(nested);

        atom.pratt((
            // Precedence 9 (highest): Negation
            prefix(9, just(Token::Minus), |_, operand, extra| Spanned {
                span: extra.span(),
                node: Expression::ArithmeticOperator(ArithmeticOperator::Negate {
                    operand: Box::new(operand),
                }),
            }),
            // Precedence 5: Additive operators
            infix(left(5), just(Token::Plus), |l, _, r, extra| Spanned {
                span: extra.span(),
                node: Expression::ArithmeticOperator(ArithmeticOperator::Add {
                    operand_a: Box::new(l),
                    operand_b: Box::new(r),
                }),
            }),
            infix(left(5), just(Token::Minus), |l, _, r, extra| Spanned {
                span: extra.span(),
                node: Expression::ArithmeticOperator(ArithmeticOperator::Subtract {
                    operand_a: Box::new(l),
                    operand_b: Box::new(r),
                }),
            }),
            // Precedence 7: Multiplicative operators
            infix(left(7), just(Token::Asterisk), |l, _, r, extra| Spanned {
                span: extra.span(),
                node: Expression::ArithmeticOperator(ArithmeticOperator::Multiply {
                    operand_a: Box::new(l),
                    operand_b: Box::new(r),
                }),
            }),
            infix(left(7), just(Token::Slash), |l, _, r, extra| Spanned {
                span: extra.span(),
                node: Expression::ArithmeticOperator(ArithmeticOperator::Divide {
                    operand_a: Box::new(l),
                    operand_b: Box::new(r),
                }),
            }),
        ))
    })
}

#[derive(Debug, Clone)]
pub enum Expression {
    Number(f64),
    Variable(String),
    ArithmeticOperator(ArithmeticOperator),
}

#[derive(Debug, Clone)]
pub enum ArithmeticOperator {
    Negate {
        operand: Box<Spanned<Expression>>,
    },
    Add {
        operand_a: Box<Spanned<Expression>>,
        operand_b: Box<Spanned<Expression>>,
    },
    Subtract {
        operand_a: Box<Spanned<Expression>>,
        operand_b: Box<Spanned<Expression>>,
    },
    Multiply {
        operand_a: Box<Spanned<Expression>>,
        operand_b: Box<Spanned<Expression>>,
    },
    Divide {
        operand_a: Box<Spanned<Expression>>,
        operand_b: Box<Spanned<Expression>>,
    },
}

/// A parsed formula together with the text it was parsed from.
#[derive(Debug, Clone)]
pub struct Formula {
    source: String,
    expression: Spanned<Expression>,
}

impl Formula {
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn expression(&self) -> &Spanned<Expression> {
        &self.expression
    }

    /// Identifiers used by the formula, in order of first appearance.
    pub fn referenced_names(&self) -> Vec<&str> {
        let mut names = Vec::new();
        collect_names(&self.expression, &mut names);
        names
    }

    /// Evaluate with `lookup` resolving identifiers.
    ///
    /// An identifier `lookup` does not know fails the whole formula; it is
    /// never read as zero.
    pub fn evaluate(&self, lookup: impl Fn(&str) -> Option<f64>) -> Result<f64, FormulaError> {
        let result = evaluate_expression(&self.expression, &lookup)?;
        if result.is_finite() {
            Ok(result)
        } else {
            Err(FormulaError::NonFinite)
        }
    }
}

fn collect_names<'a>(expression: &'a Spanned<Expression>, names: &mut Vec<&'a str>) {
    match &expression.node {
        Expression::Number(_) => {}
        Expression::Variable(name) => {
            if !names.contains(&name.as_str()) {
                names.push(name.as_str());
            }
        }
        Expression::ArithmeticOperator(ArithmeticOperator::Negate { operand }) => {
            collect_names(operand, names);
        }
        Expression::ArithmeticOperator(
            ArithmeticOperator::Add { operand_a, operand_b }
            | ArithmeticOperator::Subtract { operand_a, operand_b }
            | ArithmeticOperator::Multiply { operand_a, operand_b }
            | ArithmeticOperator::Divide { operand_a, operand_b },
        ) => {
            collect_names(operand_a, names);
            collect_names(operand_b, names);
        }
    }
}

fn evaluate_expression(
    expression: &Spanned<Expression>,
    lookup: &impl Fn(&str) -> Option<f64>,
) -> Result<f64, FormulaError> {
    let operator = match &expression.node {
        Expression::Number(number) => return Ok(*number),
        Expression::Variable(name) => {
            return lookup(name.as_str()).ok_or_else(|| FormulaError::UnknownVariable {
                name: name.clone(),
                span: expression.span.into_range(),
            });
        }
        Expression::ArithmeticOperator(operator) => operator,
    };
    Ok(match operator {
        ArithmeticOperator::Negate { operand } => -evaluate_expression(operand, lookup)?,
        ArithmeticOperator::Add { operand_a, operand_b } => {
            evaluate_expression(operand_a, lookup)? + evaluate_expression(operand_b, lookup)?
        }
        ArithmeticOperator::Subtract { operand_a, operand_b } => {
            evaluate_expression(operand_a, lookup)? - evaluate_expression(operand_b, lookup)?
        }
        ArithmeticOperator::Multiply { operand_a, operand_b } => {
            evaluate_expression(operand_a, lookup)? * evaluate_expression(operand_b, lookup)?
        }
        ArithmeticOperator::Divide { operand_a, operand_b } => {
            evaluate_expression(operand_a, lookup)? / evaluate_expression(operand_b, lookup)?
        }
    })
}

/// Lex and parse `formula`, collecting every error found.
pub fn parse_formula(formula: &str) -> Result<Formula, Vec<FormulaError>> {
    let expression = parse_source(formula)?;
    Ok(Formula {
        source: formula.to_owned(),
        expression,
    })
}

fn parse_source(code: &str) -> Result<Spanned<Expression>, Vec<FormulaError>> {
    if code.trim().is_empty() {
        return Err(vec![FormulaError::Empty]);
    }

    let (tokens, lex_errors) = lexer().parse(code).into_output_errors();
    if !lex_errors.is_empty() {
        return Err(lex_errors
            .into_iter()
            .map(FormulaError::from_parse_error)
            .collect());
    }
    let tokens = tokens.unwrap_or_default();
    if tokens.is_empty() {
        return Err(vec![FormulaError::Empty]);
    }

    let input = tokens.map(span_at(code.len()), |Spanned { node, span }| (node, span));
    let (expression, parse_errors) = parser().parse(input).into_output_errors();
    match expression {
        Some(expression) if parse_errors.is_empty() => Ok(expression),
        _ => Err(parse_errors
            .into_iter()
            .map(FormulaError::from_parse_error)
            .collect()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn eval(code: &str, variables: &[(&str, f64)]) -> Result<f64, FormulaError> {
        let variables: HashMap<&str, f64> = variables.iter().copied().collect();
        let formula = parse_formula(code).map_err(|mut errors| errors.remove(0))?;
        formula.evaluate(|name| variables.get(name).copied())
    }

    #[test]
    fn test_arithmetic_precedence() {
        assert_eq!(eval("2 + 3 * 4", &[]), Ok(14.0));
        assert_eq!(eval("(2 + 3) * 4", &[]), Ok(20.0));
        assert_eq!(eval("10 - 4 - 3", &[]), Ok(3.0));
        assert_eq!(eval("12 / 3 / 2", &[]), Ok(2.0));
    }

    #[test]
    fn test_number_literal_forms() {
        assert_eq!(eval("05 + 1", &[]), Ok(6.0));
        assert_eq!(eval(".5 * 2", &[]), Ok(1.0));
        assert_eq!(eval("1.", &[]), Ok(1.0));
        assert_eq!(eval("0.05 * 100", &[]), Ok(5.0));
    }

    #[test]
    fn test_negation() {
        assert_eq!(eval("-3 + 5", &[]), Ok(2.0));
        assert_eq!(eval("6--3", &[]), Ok(9.0));
        assert_eq!(eval("2 * -(1 + 1)", &[]), Ok(-4.0));
    }

    #[test]
    fn test_variables() {
        assert_eq!(eval("length * width", &[("length", 5.0), ("width", 4.0)]), Ok(20.0));
    }

    #[test]
    fn test_unknown_variable_fails() {
        assert_eq!(
            eval("length * missing", &[("length", 5.0)]),
            Err(FormulaError::UnknownVariable {
                name: "missing".to_string(),
                span: 9..16,
            })
        );
    }

    #[test]
    fn test_division_by_zero_is_not_finite() {
        assert_eq!(eval("1 / 0", &[]), Err(FormulaError::NonFinite));
    }

    #[test]
    fn test_empty_formula() {
        assert_eq!(parse_formula("   ").unwrap_err(), vec![FormulaError::Empty]);
    }

    #[test]
    fn test_malformed_formulas() {
        for code in ["1 +", "(1 + 2", "length width", "* 2", "1 + 2)"] {
            let errors = parse_formula(code).unwrap_err();
            assert!(
                errors.iter().all(|error| matches!(error, FormulaError::Syntax { .. })),
                "{code}: {errors:?}"
            );
        }
    }

    #[test]
    fn test_referenced_names() {
        let formula = parse_formula("a * (b + a) - optionType_Net_Wt").unwrap();
        assert_eq!(formula.referenced_names(), vec!["a", "b", "optionType_Net_Wt"]);
    }
}
