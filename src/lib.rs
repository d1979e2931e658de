use pest::Parser;
use pest_derive::Parser;
use thiserror::Error;

pub mod config;
pub mod explain;
pub mod functions;
pub mod handlers;
pub mod operations;
pub mod server;
pub mod syntax;
pub mod validate;

use syntax::Expr;

#[derive(Parser)]
#[grammar = "expression.pest"]
pub struct ExprParser;

#[derive(Error, Debug)]
pub enum CalcError {
  #[error("Parse error: {0}")]
  ParseError(#[from] Box<pest::error::Error<Rule>>),
  #[error("Empty input")]
  EmptyInput,
  #[error("Evaluation error: {0}")]
  EvaluationError(String),
  #[error("Integration error: {0}")]
  IntegrationError(String),
  #[error("{0}")]
  NoSolution(String),
}

impl ExprParser {
  pub fn parse_program(
    input: &str,
  ) -> Result<pest::iterators::Pairs<'_, Rule>, Box<pest::error::Error<Rule>>>
  {
    Self::parse(Rule::Program, input).map_err(Box::new)
  }
}

pub fn parse(
  input: &str,
) -> Result<pest::iterators::Pairs<'_, Rule>, Box<pest::error::Error<Rule>>> {
  ExprParser::parse_program(input)
}

/// Parse and canonicalize an expression.
pub fn parse_expression(input: &str) -> Result<Expr, CalcError> {
  let program = parse(input)?.next().ok_or(CalcError::EmptyInput)?;
  syntax::pair_to_expr(program)
}

/// Parse a constraint. `lhs = rhs` becomes `lhs - rhs`; anything else is
/// read as `g(x, y)` in `g(x, y) = 0`.
pub fn parse_constraint(input: &str) -> Result<Expr, CalcError> {
  if !input.contains('=') {
    return parse_expression(input);
  }
  let equation = ExprParser::parse(Rule::Equation, input)
    .map_err(Box::new)?
    .next()
    .ok_or(CalcError::EmptyInput)?;
  let mut sides = equation.into_inner();
  let lhs = syntax::pair_to_expr(sides.next().ok_or(CalcError::EmptyInput)?)?;
  let rhs = syntax::pair_to_expr(sides.next().ok_or(CalcError::EmptyInput)?)?;
  Ok(functions::solve::equation_to_zero_form(lhs, rhs))
}
