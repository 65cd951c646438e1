//! Built-in function names with special meaning to the generators and rewrite passes.

use crate::ast::ArithmeticOp;

const AGGREGATES: [&str; 5] = ["count", "sum", "avg", "min", "max"];

/// `count`, `sum`, `avg`, `min` and `max`, case-insensitively.
pub fn is_aggregate(name: &str) -> bool {
    AGGREGATES.iter().any(|a| a.eq_ignore_ascii_case(name))
}

/// Functions that stand for an infix arithmetic operator.
pub fn arithmetic(name: &str) -> Option<ArithmeticOp> {
    match name.to_ascii_lowercase().as_str() {
        "add" => Some(ArithmeticOp::Add),
        "minus" => Some(ArithmeticOp::Sub),
        "multiply" => Some(ArithmeticOp::Mul),
        "divide" => Some(ArithmeticOp::Div),
        _ => None,
    }
}

/// Function name used for an arithmetic operator.
pub fn arithmetic_name(op: ArithmeticOp) -> &'static str {
    match op {
        ArithmeticOp::Add => "add",
        ArithmeticOp::Sub => "minus",
        ArithmeticOp::Mul => "multiply",
        ArithmeticOp::Div => "divide",
    }
}
