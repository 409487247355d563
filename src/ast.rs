//! Syntax tree for Jam programs.
//!
//! Nodes are closed sum types, immutable after parsing, and carry no parent
//! links; the lowering pass tracks scope with an explicit environment instead.

pub use crate::runtime::AssignOp;

#[derive(Debug, PartialEq, Clone)]
pub enum Expression {
    Literal(String),
    /// `$(...)`: evaluate the inner expression to variable names and read
    /// them.
    VariableDereference(Box<Dereference>),
    /// `@(...)`: evaluate the inner expression and use its value directly,
    /// applying the indexer/modifiers to it rather than to a looked-up
    /// variable.
    LiteralExpansion(Box<Dereference>),
    /// Adjacent tokens with no whitespace between them; evaluates to the
    /// cross-product concatenation of the parts.
    Combine(Vec<Expression>),
    /// `[ Rule arg… : arg… ]`
    Invocation {
        rule: Box<Expression>,
        arguments: Vec<Vec<Expression>>,
    },
    /// Condition comparison/chain; only valid in condition position.
    BinaryOperator {
        left: Box<Expression>,
        op: BinaryOp,
        right: Vec<Expression>,
    },
    /// `! cond`
    Not(Box<Expression>),
    /// `name on targets`, the left side of an on-target assignment.
    VariableOnTarget {
        variable: Box<Expression>,
        targets: Vec<Expression>,
    },
}

/// Shared payload of `$(...)` and `@(...)`: the subject expression, an
/// optional `[ ... ]` indexer and the colon-led modifier chain.
#[derive(Debug, PartialEq, Clone)]
pub struct Dereference {
    pub variable: Expression,
    pub indexer: Option<Expression>,
    pub modifiers: Vec<Modifier>,
}

/// One `:X` or `:X=value` element of a modifier chain. `argument` is `None`
/// for the bare form and `Some(Literal(""))` when `=` is present with an
/// empty value; the two behave differently for `:S`/`:G`/`:D`/`:B`.
#[derive(Debug, PartialEq, Clone)]
pub struct Modifier {
    pub command: char,
    pub argument: Option<Expression>,
}

#[derive(Debug, PartialEq, Clone, Copy)]
pub enum BinaryOp {
    Equal,
    NotEqual,
    In,
    LessThan,
    GreaterThan,
    And,
    Or,
}

#[derive(Debug, PartialEq, Clone)]
pub struct SwitchCase {
    pub value: String,
    pub statements: Vec<Statement>,
}

#[derive(Debug, PartialEq, Clone)]
pub enum Statement {
    Block(Vec<Statement>),
    If {
        condition: Expression,
        body: Vec<Statement>,
        else_branch: Option<Box<Statement>>,
    },
    While {
        condition: Expression,
        body: Vec<Statement>,
    },
    For {
        variable: String,
        list: Vec<Expression>,
        body: Vec<Statement>,
    },
    Switch {
        subject: Expression,
        cases: Vec<SwitchCase>,
    },
    RuleDeclaration {
        name: String,
        parameters: Vec<String>,
        body: Vec<Statement>,
    },
    /// Raw body lines are kept verbatim; they are shell text, not Jam.
    ActionsDeclaration {
        name: String,
        modifiers: Vec<Expression>,
        lines: Vec<String>,
    },
    Local {
        variable: String,
        value: Vec<Expression>,
    },
    Assignment {
        left: Expression,
        op: AssignOp,
        right: Vec<Expression>,
    },
    /// `Rule arg… : arg… ;` in statement position. The rule expression may be
    /// dynamic (`$(rules) x ;`).
    Invocation {
        rule: Expression,
        arguments: Vec<Vec<Expression>>,
    },
    Return(Vec<Expression>),
    Break,
    Continue,
    On {
        target: Expression,
        body: Box<Statement>,
    },
    Include(Expression),
}

#[derive(Debug, PartialEq, Clone)]
pub struct Program {
    pub statements: Vec<Statement>,
}
