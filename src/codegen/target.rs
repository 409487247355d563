//! The lowered program form shared by the Rust renderer and the in-process
//! evaluator.
//!
//! Lowering resolves everything name-shaped: every variable reference is
//! classified as a local slot, a named global or a dynamic read, every
//! invocation as a converted rule, an actions declaration, a builtin or a
//! dynamic dispatch. The renderer and the evaluator only execute; they never
//! look names up again.

pub use crate::runtime::AssignOp;

/// A whole converted program: every source unit plus the rules, actions and
/// globals collected across all of them.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetProgram {
    /// In input order; the first unit is the entry point.
    pub units: Vec<UnitDef>,
    pub rules: Vec<RuleDef>,
    pub actions: Vec<ActionsDef>,
    /// Every global read or written anywhere, in first-encounter order.
    pub globals: Vec<GlobalDef>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlobalDef {
    pub name: String,
    /// Name of the generated accessor function.
    pub accessor: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnitDef {
    pub name: String,
    /// Name of the generated unit function.
    pub ident: String,
    pub body: Vec<TargetStatement>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RuleDef {
    pub jam_name: String,
    /// Name of the generated rule function.
    pub ident: String,
    /// Local slots the positional arguments bind to, in order. Includes
    /// slots synthesized for `$(n)` references past the declared parameters.
    pub parameters: Vec<String>,
    pub body: Vec<TargetStatement>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionsDef {
    pub name: String,
    pub modifiers: Vec<String>,
    pub lines: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TargetStatement {
    /// Assignment to a rule parameter or loop variable slot.
    AssignLocal {
        ident: String,
        op: AssignOp,
        value: TargetExpression,
    },
    AssignGlobal {
        name: String,
        op: AssignOp,
        value: TargetExpression,
    },
    /// Assignment through a computed name list, `$(names) = …`.
    AssignIndirect {
        names: TargetExpression,
        op: AssignOp,
        value: TargetExpression,
    },
    /// `names on targets = …` writes the per-target overlay.
    AssignOnTarget {
        names: TargetExpression,
        targets: TargetExpression,
        op: AssignOp,
        value: TargetExpression,
    },
    Block(Vec<TargetStatement>),
    If {
        condition: TargetCondition,
        body: Vec<TargetStatement>,
        else_branch: Vec<TargetStatement>,
    },
    While {
        condition: TargetCondition,
        body: Vec<TargetStatement>,
    },
    ForEach {
        ident: String,
        list: TargetExpression,
        body: Vec<TargetStatement>,
    },
    Switch {
        subject: TargetExpression,
        /// (case token, body); `*` matches anything.
        cases: Vec<(String, Vec<TargetStatement>)>,
    },
    /// `on target { … }` activates a target group for the body.
    OnBlock {
        targets: TargetExpression,
        body: Vec<TargetStatement>,
    },
    Return(TargetExpression),
    Break,
    Continue,
    /// `include unit ;` runs converted units and logs unconverted ones.
    Include(TargetExpression),
    /// An invocation in statement position; the result is discarded.
    Evaluate(TargetExpression),
}

#[derive(Debug, Clone, PartialEq)]
pub enum TargetExpression {
    Const(Vec<String>),
    /// Concatenation of a whitespace-separated expression list.
    List(Vec<TargetExpression>),
    ReadLocal(String),
    ReadGlobal(String),
    /// `$(expr)` whose subject is itself computed: read and concatenate
    /// every variable the subject names.
    ReadDynamic(Box<TargetExpression>),
    /// Cross-product of glued expression parts.
    Combine(Vec<TargetExpression>),
    Modifier {
        receiver: Box<TargetExpression>,
        op: ModifierOp,
        /// `None` for the bare extracting form; `Some` carries the `=value`
        /// list, which may be empty-valued.
        argument: Option<Box<TargetExpression>>,
    },
    IndexedBy {
        receiver: Box<TargetExpression>,
        indices: Box<TargetExpression>,
    },
    CallRule {
        jam_name: String,
        ident: String,
        arguments: Vec<TargetExpression>,
    },
    /// Invocation through a computed or unresolved name list.
    CallDynamic {
        names: Box<TargetExpression>,
        arguments: Vec<TargetExpression>,
    },
    CallActions {
        name: String,
        arguments: Vec<TargetExpression>,
    },
    CallBuiltin {
        builtin: Builtin,
        arguments: Vec<TargetExpression>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModifierOp {
    Suffix,
    Grist,
    Directory,
    Basename,
    Join,
    EmptyDefault,
    IncludeMatching,
    ExcludeMatching,
    Upper,
    Lower,
    /// `:A` expands `$(name)` spans inside the value itself.
    Reexpand,
    /// `:W`; a pass-through outside cygwin.
    WindowsPath,
    /// The four-backslash modifier; rewrites `/` to `\`.
    Backslashes,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    Echo,
    Md5,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TargetCondition {
    Truthy(TargetExpression),
    Equal(TargetExpression, TargetExpression),
    NotEqual(TargetExpression, TargetExpression),
    In(TargetExpression, TargetExpression),
    GreaterThan(TargetExpression, TargetExpression),
    LessThan(TargetExpression, TargetExpression),
    And(Box<TargetCondition>, Box<TargetCondition>),
    Or(Box<TargetCondition>, Box<TargetCondition>),
    Not(Box<TargetCondition>),
}
