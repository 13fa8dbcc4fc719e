// SPDX-License-Identifier: MIT

//! Declarative query language ("machine questions")
//!
//! A small SET/SELECT statement language for operators that want
//! structured knowledge-graph questions rather than ad-hoc path
//! expressions. A parsed SELECT compiles into one abstract question
//! graph per combination of its constraint values.

mod ast;
mod parser;

pub use ast::{
    CompareOp, OutputBinding, Predicate, SelectStatement, SetStatement, Statement,
};
pub use parser::parse;
