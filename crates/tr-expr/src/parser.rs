use crate::ExprError;
use crate::ast::Expr;
use crate::lexer::{TokenKind, Tokenizer};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operator {
    Sum,
    Subtraction,
    Product,
    Division,
    Modulo,
    Factorial,
}

impl Operator {
    fn from_symbol(symbol: char) -> Option<Self> {
        let op = match symbol {
            '+' => Self::Sum,
            '-' => Self::Subtraction,
            '*' => Self::Product,
            '/' => Self::Division,
            '%' => Self::Modulo,
            '!' => Self::Factorial,
            _ => return None,
        };
        Some(op)
    }

    fn precedence(self) -> u8 {
        match self {
            Self::Sum | Self::Subtraction => 1,
            Self::Product | Self::Division | Self::Modulo => 2,
            Self::Factorial => 3,
        }
    }

    fn symbol(self) -> char {
        match self {
            Self::Sum => '+',
            Self::Subtraction => '-',
            Self::Product => '*',
            Self::Division => '/',
            Self::Modulo => '%',
            Self::Factorial => '!',
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Pending {
    Operator { op: Operator, offset: usize },
    /// `depth` is the output stack height when the bracket opened.
    Open { offset: usize, depth: usize },
}

/// Deepest expression tree a formula may build. Evaluation, display and drop
/// all walk the tree recursively.
pub const MAX_EXPR_DEPTH: usize = 256;

/// A finished subtree together with its height.
struct Node {
    expr: Expr,
    height: usize,
}

impl Node {
    fn leaf(expr: Expr) -> Self {
        Self { expr, height: 1 }
    }

    fn parent(expr: Expr, child_height: usize, offset: usize) -> Result<Self, ExprError> {
        let height = child_height + 1;
        if height > MAX_EXPR_DEPTH {
            return Err(ExprError::Parse {
                offset,
                message: format!("expression nests deeper than {MAX_EXPR_DEPTH} levels"),
            });
        }
        Ok(Self { expr, height })
    }
}

/// Operator-precedence parse of a formula into an [`Expr`].
///
/// Grammar: numbers, identifiers, infix `+ - * / %`, postfix `!`, grouping
/// parentheses and `name(expr)` function calls. Binary operators are
/// left-associative. Trees deeper than [`MAX_EXPR_DEPTH`] are rejected.
pub fn parse_expr(input: &str) -> Result<Expr, ExprError> {
    let mut output: Vec<Node> = Vec::new();
    let mut pending: Vec<Pending> = Vec::new();
    let mut functions: Vec<Option<String>> = Vec::new();
    let mut previous_was_identifier = false;
    // true when the last token closed an operand: a number, a name, `)` or `!`
    let mut after_operand = false;

    for token in Tokenizer::new(input) {
        let is_identifier = matches!(token.kind, TokenKind::Identifier(_));
        let misplaced = |message: &str| ExprError::Parse {
            offset: token.offset,
            message: message.to_owned(),
        };
        match token.kind {
            TokenKind::Number(_) | TokenKind::Identifier(_) if after_operand => {
                return Err(misplaced("expected an operator between operands"));
            }
            TokenKind::Number(value) => {
                output.push(Node::leaf(Expr::Constant { value }));
                after_operand = true;
            }
            TokenKind::Identifier(name) => {
                output.push(Node::leaf(Expr::Variable { name }));
                after_operand = true;
            }
            TokenKind::Operator(symbol) => {
                let op = Operator::from_symbol(symbol).ok_or(ExprError::UnknownOperator {
                    symbol,
                    offset: token.offset,
                })?;
                if !after_operand {
                    return Err(ExprError::Parse {
                        offset: token.offset,
                        message: format!("operator '{symbol}' is missing its left operand"),
                    });
                }
                while let Some(&Pending::Operator {
                    op: top,
                    offset: top_offset,
                }) = pending.last()
                {
                    // Equal precedence pops too, so `A - B - C` is `(A - B) - C`.
                    // Popping only on strictly lower precedence would group right.
                    if top.precedence() < op.precedence() {
                        break;
                    }
                    pending.pop();
                    reduce(top, top_offset, &mut output)?;
                }
                pending.push(Pending::Operator {
                    op,
                    offset: token.offset,
                });
                after_operand = op == Operator::Factorial;
            }
            TokenKind::BraceOpen => {
                let function = if previous_was_identifier {
                    match output.pop().map(|node| node.expr) {
                        Some(Expr::Variable { name }) => Some(name),
                        _ => return Err(misplaced("function call without a name")),
                    }
                } else if after_operand {
                    return Err(misplaced("expected an operator before '('"));
                } else {
                    None
                };
                functions.push(function);
                pending.push(Pending::Open {
                    offset: token.offset,
                    depth: output.len(),
                });
                after_operand = false;
            }
            TokenKind::BraceClose => {
                if !after_operand && pending.iter().any(|p| matches!(p, Pending::Open { .. })) {
                    return Err(misplaced("expected an expression before ')'"));
                }
                let depth = loop {
                    match pending.pop() {
                        Some(Pending::Operator { op, offset }) => reduce(op, offset, &mut output)?,
                        Some(Pending::Open { depth, .. }) => break depth,
                        None => {
                            return Err(ExprError::UnbalancedParenthesis {
                                offset: token.offset,
                            });
                        }
                    }
                };
                if output.len() != depth + 1 {
                    return Err(misplaced("expected exactly one expression inside parentheses"));
                }
                if let Some(name) = functions.pop().flatten() {
                    let operand = output.pop().ok_or(ExprError::Parse {
                        offset: token.offset,
                        message: format!("function {name} has no argument"),
                    })?;
                    output.push(Node::parent(
                        Expr::Function {
                            name,
                            operand: Box::new(operand.expr),
                        },
                        operand.height,
                        token.offset,
                    )?);
                }
                after_operand = true;
            }
        }
        previous_was_identifier = is_identifier;
    }

    while let Some(entry) = pending.pop() {
        match entry {
            Pending::Operator { op, offset } => reduce(op, offset, &mut output)?,
            Pending::Open { offset, .. } => return Err(ExprError::UnbalancedParenthesis { offset }),
        }
    }

    let root = output.pop().ok_or(ExprError::Parse {
        offset: input.len(),
        message: "empty expression".to_owned(),
    })?;
    if !output.is_empty() {
        return Err(ExprError::Parse {
            offset: 0,
            message: format!("{} operands are missing an operator", output.len() + 1),
        });
    }
    Ok(root.expr)
}

fn reduce(op: Operator, offset: usize, output: &mut Vec<Node>) -> Result<(), ExprError> {
    let missing = || ExprError::Parse {
        offset,
        message: format!("operator '{}' is missing an operand", op.symbol()),
    };

    let right = output.pop().ok_or_else(missing)?;
    if op == Operator::Factorial {
        let node = Node::parent(
            Expr::Factorial {
                operand: Box::new(right.expr),
            },
            right.height,
            offset,
        )?;
        output.push(node);
        return Ok(());
    }

    let left = output.pop().ok_or_else(missing)?;
    let height = left.height.max(right.height);
    let (left, right) = (Box::new(left.expr), Box::new(right.expr));
    let expr = match op {
        Operator::Sum => Expr::Sum { left, right },
        Operator::Subtraction => Expr::Subtraction { left, right },
        Operator::Product => Expr::Product { left, right },
        Operator::Division => Expr::Division { left, right },
        Operator::Modulo => Expr::Modulo { left, right },
        Operator::Factorial => Expr::Factorial { operand: right },
    };
    output.push(Node::parent(expr, height, offset)?);
    Ok(())
}
