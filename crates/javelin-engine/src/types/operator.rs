//! Operators understood by the type lattice

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unary and binary operators
///
/// Unary operators look up the `"none"` operand in the operation tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    /// `+`
    Plus,
    /// `-` (binary, or unary negation with no right operand)
    Minus,
    /// `*`
    Multiply,
    /// `/`
    Divide,
    /// `%`
    Modulo,
    /// `++`
    Increment,
    /// `--`
    Decrement,
    /// Unary negation
    Negation,
    /// `~`
    Tilde,
    /// `<`
    Lower,
    /// `>`
    Greater,
    /// `<=`
    LowerOrEqual,
    /// `>=`
    GreaterOrEqual,
    /// `==`
    Equal,
    /// `!=`
    NotEqual,
    /// `&&`
    And,
    /// `||`
    Or,
    /// `!`
    Not,
    /// `|`
    BitOr,
    /// `^`
    BitXor,
    /// `&`
    BitAnd,
    /// `<<`
    ShiftLeft,
    /// `>>`
    ShiftRight,
    /// `>>>`
    ShiftRightUnsigned,
}

impl Operator {
    /// Source symbol
    pub fn symbol(&self) -> &'static str {
        match self {
            Operator::Plus => "+",
            Operator::Minus | Operator::Negation => "-",
            Operator::Multiply => "*",
            Operator::Divide => "/",
            Operator::Modulo => "%",
            Operator::Increment => "++",
            Operator::Decrement => "--",
            Operator::Tilde => "~",
            Operator::Lower => "<",
            Operator::Greater => ">",
            Operator::LowerOrEqual => "<=",
            Operator::GreaterOrEqual => ">=",
            Operator::Equal => "==",
            Operator::NotEqual => "!=",
            Operator::And => "&&",
            Operator::Or => "||",
            Operator::Not => "!",
            Operator::BitOr => "|",
            Operator::BitXor => "^",
            Operator::BitAnd => "&",
            Operator::ShiftLeft => "<<",
            Operator::ShiftRight => ">>",
            Operator::ShiftRightUnsigned => ">>>",
        }
    }

    /// Comparison operators always yield `boolean`
    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            Operator::Lower
                | Operator::Greater
                | Operator::LowerOrEqual
                | Operator::GreaterOrEqual
                | Operator::Equal
                | Operator::NotEqual
        )
    }

    /// `&&` and `||` evaluate their right operand lazily
    pub fn is_short_circuit(&self) -> bool {
        matches!(self, Operator::And | Operator::Or)
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}
