//! Conversion from parsed Jam units to the lowered target program.
//!
//! Lowering runs in two passes. The first pass collects every rule and
//! actions declaration across all units, wherever it is nested, so that
//! invocations can be resolved by name before any body is lowered. The
//! second pass lowers unit and rule bodies, classifying each variable
//! reference against the lexical scope (rule parameters and loop variables)
//! and falling back to the global store.

use rustc_hash::{FxHashMap, FxHashSet};
use thiserror::Error;

use crate::ast::{BinaryOp, Dereference, Expression, Statement};
use crate::parser::{self, ParseError};

pub mod rust;
pub mod target;

use target::{
    ActionsDef, AssignOp, Builtin, GlobalDef, ModifierOp, RuleDef, TargetCondition,
    TargetExpression, TargetProgram, TargetStatement, UnitDef,
};

#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("no source units to convert")]
    NoUnits,
    #[error("duplicate source unit {name:?}")]
    DuplicateUnit { name: String },
    #[error("failed to parse unit {unit:?}")]
    Parse {
        unit: String,
        #[source]
        source: ParseError,
    },
    #[error("unit {unit:?} uses the unsupported expansion modifier :{command}")]
    UnsupportedModifier { unit: String, command: char },
    #[error("unit {unit:?} includes {name:?}, which is neither converted nor declared legacy")]
    UnknownUnit { unit: String, name: String },
    #[error("operator in value position in unit {unit:?}")]
    MisplacedOperator { unit: String },
}

/// One Jam file handed to the converter.
#[derive(Debug, Clone)]
pub struct SourceUnit {
    pub name: String,
    pub source: String,
}

impl SourceUnit {
    pub fn new(name: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ConvertOptions {
    /// Unit names that stay on the legacy interpreter. A constant `include`
    /// of one of these is accepted and routed to the legacy-include log at
    /// runtime; any other unknown constant include is a conversion error.
    pub legacy_units: Vec<String>,
}

#[derive(Debug, Default)]
pub struct Converter {
    options: ConvertOptions,
}

impl Converter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: ConvertOptions) -> Self {
        Self { options }
    }

    /// Lowers all units into one target program. The first unit becomes the
    /// entry point.
    pub fn convert(&self, units: &[SourceUnit]) -> Result<TargetProgram, ConvertError> {
        if units.is_empty() {
            return Err(ConvertError::NoUnits);
        }

        let mut seen = FxHashSet::default();
        let mut parsed = Vec::with_capacity(units.len());
        for unit in units {
            if !seen.insert(unit.name.as_str()) {
                return Err(ConvertError::DuplicateUnit {
                    name: unit.name.clone(),
                });
            }
            let program = parser::parse(&unit.source).map_err(|source| ConvertError::Parse {
                unit: unit.name.clone(),
                source,
            })?;
            parsed.push((unit.name.as_str(), program));
        }

        let mut rule_decls: Vec<RuleDecl> = Vec::new();
        let mut rule_slots: FxHashMap<String, usize> = FxHashMap::default();
        let mut actions: Vec<ActionsDef> = Vec::new();
        let mut actions_slots: FxHashMap<String, usize> = FxHashMap::default();
        for (unit, program) in &parsed {
            collect_declarations(
                unit,
                &program.statements,
                &mut rule_decls,
                &mut rule_slots,
                &mut actions,
                &mut actions_slots,
            );
        }

        let mut module_idents = IdentAllocator::default();
        let mut rule_idents = FxHashMap::default();
        for decl in &rule_decls {
            let ident = module_idents.allocate("rule_", &decl.name);
            rule_idents.insert(decl.name.clone(), ident);
        }
        let unit_idents: Vec<String> = parsed
            .iter()
            .map(|(name, _)| module_idents.allocate("unit_", name))
            .collect();

        let mut known_units: FxHashSet<String> =
            parsed.iter().map(|(name, _)| name.to_string()).collect();
        known_units.extend(self.options.legacy_units.iter().cloned());

        let action_names: FxHashSet<String> = actions.iter().map(|a| a.name.clone()).collect();
        let mut globals = GlobalRegistry::default();

        let mut lowered_units = Vec::with_capacity(parsed.len());
        for ((name, program), ident) in parsed.iter().zip(unit_idents) {
            let mut lowerer = Lowerer::new(name, &rule_idents, &action_names, &known_units, &mut globals);
            let body = lowerer.lower_statements(&program.statements)?;
            lowered_units.push(UnitDef {
                name: name.to_string(),
                ident,
                body,
            });
        }

        let mut lowered_rules = Vec::with_capacity(rule_decls.len());
        for decl in &rule_decls {
            let ident = rule_idents[&decl.name].clone();
            let mut lowerer = Lowerer::new(
                &decl.unit,
                &rule_idents,
                &action_names,
                &known_units,
                &mut globals,
            );

            // Extend the declared parameters with slots for any `$(n)`
            // reference past the end, so positional arguments always have a
            // binding.
            let mut names = decl.parameters.clone();
            let highest = highest_positional(&decl.body);
            while names.len() < highest {
                names.push(format!("implicit_argument_{}", names.len() + 1));
            }

            let mut frame = FxHashMap::default();
            let mut parameters = Vec::with_capacity(names.len());
            for (index, name) in names.iter().enumerate() {
                let slot = lowerer.locals.allocate("v_", name);
                frame.insert(name.clone(), slot.clone());
                frame.insert((index + 1).to_string(), slot.clone());
                if index == 0 {
                    frame.insert("<".to_string(), slot.clone());
                }
                if index == 1 {
                    frame.insert(">".to_string(), slot.clone());
                }
                parameters.push(slot);
            }
            lowerer.scope.push(frame);

            let body = lowerer.lower_statements(&decl.body)?;
            lowered_rules.push(RuleDef {
                jam_name: decl.name.clone(),
                ident,
                parameters,
                body,
            });
        }

        Ok(TargetProgram {
            units: lowered_units,
            rules: lowered_rules,
            actions,
            globals: globals.order,
        })
    }

    /// Full pipeline: lower and render one Rust source file.
    pub fn convert_to_rust(&self, units: &[SourceUnit]) -> Result<String, ConvertError> {
        Ok(rust::render(&self.convert(units)?))
    }
}

// --- declaration collection -------------------------------------------------

struct RuleDecl {
    name: String,
    unit: String,
    parameters: Vec<String>,
    body: Vec<Statement>,
}

/// Walks every statement body, hoisting rule and actions declarations. A
/// redeclared name keeps its original position but takes the newest body.
fn collect_declarations(
    unit: &str,
    statements: &[Statement],
    rules: &mut Vec<RuleDecl>,
    rule_slots: &mut FxHashMap<String, usize>,
    actions: &mut Vec<ActionsDef>,
    actions_slots: &mut FxHashMap<String, usize>,
) {
    for statement in statements {
        match statement {
            Statement::RuleDeclaration {
                name,
                parameters,
                body,
            } => {
                let decl = RuleDecl {
                    name: name.clone(),
                    unit: unit.to_string(),
                    parameters: parameters.clone(),
                    body: body.clone(),
                };
                match rule_slots.get(name) {
                    Some(&slot) => rules[slot] = decl,
                    None => {
                        rule_slots.insert(name.clone(), rules.len());
                        rules.push(decl);
                    }
                }
                collect_declarations(unit, body, rules, rule_slots, actions, actions_slots);
            }
            Statement::ActionsDeclaration {
                name,
                modifiers,
                lines,
            } => {
                let def = ActionsDef {
                    name: name.clone(),
                    modifiers: modifiers
                        .iter()
                        .filter_map(|m| match m {
                            Expression::Literal(value) => Some(value.clone()),
                            _ => None,
                        })
                        .collect(),
                    lines: lines.clone(),
                };
                match actions_slots.get(name) {
                    Some(&slot) => actions[slot] = def,
                    None => {
                        actions_slots.insert(name.clone(), actions.len());
                        actions.push(def);
                    }
                }
            }
            Statement::Block(body) => {
                collect_declarations(unit, body, rules, rule_slots, actions, actions_slots);
            }
            Statement::If {
                body, else_branch, ..
            } => {
                collect_declarations(unit, body, rules, rule_slots, actions, actions_slots);
                if let Some(else_branch) = else_branch {
                    collect_declarations(
                        unit,
                        std::slice::from_ref(else_branch),
                        rules,
                        rule_slots,
                        actions,
                        actions_slots,
                    );
                }
            }
            Statement::While { body, .. } | Statement::For { body, .. } => {
                collect_declarations(unit, body, rules, rule_slots, actions, actions_slots);
            }
            Statement::Switch { cases, .. } => {
                for case in cases {
                    collect_declarations(
                        unit,
                        &case.statements,
                        rules,
                        rule_slots,
                        actions,
                        actions_slots,
                    );
                }
            }
            Statement::On { body, .. } => {
                collect_declarations(
                    unit,
                    std::slice::from_ref(body),
                    rules,
                    rule_slots,
                    actions,
                    actions_slots,
                );
            }
            _ => {}
        }
    }
}

// --- positional parameter scan ----------------------------------------------

/// The highest `$(n)` (or `$(<)`/`$(>)`) a rule body refers to.
fn highest_positional(statements: &[Statement]) -> usize {
    let mut highest = 0;
    scan_statements(statements, &mut highest);
    highest
}

fn scan_statements(statements: &[Statement], highest: &mut usize) {
    for statement in statements {
        match statement {
            Statement::Block(body) => scan_statements(body, highest),
            Statement::If {
                condition,
                body,
                else_branch,
            } => {
                scan_expression(condition, highest);
                scan_statements(body, highest);
                if let Some(else_branch) = else_branch {
                    scan_statements(std::slice::from_ref(else_branch), highest);
                }
            }
            Statement::While { condition, body } => {
                scan_expression(condition, highest);
                scan_statements(body, highest);
            }
            Statement::For { list, body, .. } => {
                scan_expressions(list, highest);
                scan_statements(body, highest);
            }
            Statement::Switch { subject, cases } => {
                scan_expression(subject, highest);
                for case in cases {
                    scan_statements(&case.statements, highest);
                }
            }
            Statement::Local { value, .. } => scan_expressions(value, highest),
            Statement::Assignment { left, right, .. } => {
                scan_expression(left, highest);
                scan_expressions(right, highest);
            }
            Statement::Invocation { rule, arguments } => {
                scan_expression(rule, highest);
                for list in arguments {
                    scan_expressions(list, highest);
                }
            }
            Statement::Return(values) => scan_expressions(values, highest),
            Statement::On { target, body } => {
                scan_expression(target, highest);
                scan_statements(std::slice::from_ref(body), highest);
            }
            Statement::Include(unit) => scan_expression(unit, highest),
            // Nested rules bind their own positional arguments.
            Statement::RuleDeclaration { .. }
            | Statement::ActionsDeclaration { .. }
            | Statement::Break
            | Statement::Continue => {}
        }
    }
}

fn scan_expressions(expressions: &[Expression], highest: &mut usize) {
    for expression in expressions {
        scan_expression(expression, highest);
    }
}

fn scan_expression(expression: &Expression, highest: &mut usize) {
    match expression {
        Expression::Literal(_) => {}
        Expression::VariableDereference(d) | Expression::LiteralExpansion(d) => {
            if let Expression::Literal(name) = &d.variable {
                let position = match name.as_str() {
                    "<" => Some(1),
                    ">" => Some(2),
                    other => other.parse::<usize>().ok().filter(|n| (1..=9).contains(n)),
                };
                if let Some(position) = position {
                    *highest = (*highest).max(position);
                }
            }
            scan_expression(&d.variable, highest);
            if let Some(indexer) = &d.indexer {
                scan_expression(indexer, highest);
            }
            for modifier in &d.modifiers {
                if let Some(argument) = &modifier.argument {
                    scan_expression(argument, highest);
                }
            }
        }
        Expression::Combine(parts) => scan_expressions(parts, highest),
        Expression::Invocation { rule, arguments } => {
            scan_expression(rule, highest);
            for list in arguments {
                scan_expressions(list, highest);
            }
        }
        Expression::BinaryOperator { left, right, .. } => {
            scan_expression(left, highest);
            scan_expressions(right, highest);
        }
        Expression::Not(inner) => scan_expression(inner, highest),
        Expression::VariableOnTarget { variable, targets } => {
            scan_expression(variable, highest);
            scan_expressions(targets, highest);
        }
    }
}

// --- identifier allocation ---------------------------------------------------

#[derive(Default)]
struct IdentAllocator {
    used: FxHashSet<String>,
}

impl IdentAllocator {
    fn allocate(&mut self, prefix: &str, name: &str) -> String {
        let base = format!("{prefix}{}", sanitize(name));
        if self.used.insert(base.clone()) {
            return base;
        }
        let mut counter = 2;
        loop {
            let candidate = format!("{base}_{counter}");
            if self.used.insert(candidate.clone()) {
                return candidate;
            }
            counter += 1;
        }
    }
}

fn sanitize(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() || ch == '_' {
            out.push(ch);
        } else {
            out.push('_');
        }
    }
    if out.is_empty() || out.starts_with(|c: char| c.is_ascii_digit()) {
        out.insert(0, '_');
    }
    out
}

#[derive(Default)]
struct GlobalRegistry {
    idents: IdentAllocator,
    accessors: FxHashMap<String, String>,
    order: Vec<GlobalDef>,
}

impl GlobalRegistry {
    /// Records a global read and returns its accessor name.
    fn accessor(&mut self, name: &str) -> String {
        if let Some(accessor) = self.accessors.get(name) {
            return accessor.clone();
        }
        let accessor = self.idents.allocate("var_", name);
        self.accessors.insert(name.to_string(), accessor.clone());
        self.order.push(GlobalDef {
            name: name.to_string(),
            accessor: accessor.clone(),
        });
        accessor
    }
}

// --- body lowering -----------------------------------------------------------

struct Lowerer<'a> {
    unit: &'a str,
    rules: &'a FxHashMap<String, String>,
    actions: &'a FxHashSet<String>,
    known_units: &'a FxHashSet<String>,
    globals: &'a mut GlobalRegistry,
    /// Lexical frames, innermost last; each maps a Jam name to its slot.
    scope: Vec<FxHashMap<String, String>>,
    locals: IdentAllocator,
}

impl<'a> Lowerer<'a> {
    fn new(
        unit: &'a str,
        rules: &'a FxHashMap<String, String>,
        actions: &'a FxHashSet<String>,
        known_units: &'a FxHashSet<String>,
        globals: &'a mut GlobalRegistry,
    ) -> Self {
        Self {
            unit,
            rules,
            actions,
            known_units,
            globals,
            scope: Vec::new(),
            locals: IdentAllocator::default(),
        }
    }

    fn lookup(&self, name: &str) -> Option<String> {
        self.scope
            .iter()
            .rev()
            .find_map(|frame| frame.get(name).cloned())
    }

    fn lower_statements(
        &mut self,
        statements: &[Statement],
    ) -> Result<Vec<TargetStatement>, ConvertError> {
        let mut lowered = Vec::with_capacity(statements.len());
        for statement in statements {
            if let Some(statement) = self.lower_statement(statement)? {
                lowered.push(statement);
            }
        }
        Ok(lowered)
    }

    fn lower_branch(
        &mut self,
        statement: &Statement,
    ) -> Result<Vec<TargetStatement>, ConvertError> {
        match statement {
            Statement::Block(body) => self.lower_statements(body),
            other => self.lower_statements(std::slice::from_ref(other)),
        }
    }

    fn lower_statement(
        &mut self,
        statement: &Statement,
    ) -> Result<Option<TargetStatement>, ConvertError> {
        let lowered = match statement {
            // Declarations were hoisted during collection.
            Statement::RuleDeclaration { .. } | Statement::ActionsDeclaration { .. } => {
                return Ok(None);
            }
            Statement::Block(body) => TargetStatement::Block(self.lower_statements(body)?),
            Statement::If {
                condition,
                body,
                else_branch,
            } => {
                let condition = self.lower_condition(condition)?;
                let body = self.lower_statements(body)?;
                let else_branch = match else_branch {
                    Some(branch) => self.lower_branch(branch)?,
                    None => Vec::new(),
                };
                TargetStatement::If {
                    condition,
                    body,
                    else_branch,
                }
            }
            Statement::While { condition, body } => TargetStatement::While {
                condition: self.lower_condition(condition)?,
                body: self.lower_statements(body)?,
            },
            Statement::For {
                variable,
                list,
                body,
            } => {
                let list = self.lower_list(list)?;
                let ident = self.locals.allocate("v_", variable);
                self.scope.push(FxHashMap::default());
                self.scope
                    .last_mut()
                    .expect("frame just pushed")
                    .insert(variable.clone(), ident.clone());
                let body = self.lower_statements(body);
                self.scope.pop();
                TargetStatement::ForEach {
                    ident,
                    list,
                    body: body?,
                }
            }
            Statement::Switch { subject, cases } => {
                let subject = self.lower_expression(subject)?;
                let mut lowered_cases = Vec::with_capacity(cases.len());
                for case in cases {
                    lowered_cases.push((case.value.clone(), self.lower_statements(&case.statements)?));
                }
                TargetStatement::Switch {
                    subject,
                    cases: lowered_cases,
                }
            }
            // Name resolution knows only rule parameters, loop variables
            // and globals; `local` assigns whatever the name resolves to,
            // normally the global store.
            Statement::Local { variable, value } => {
                let value = self.lower_list(value)?;
                match self.lookup(variable) {
                    Some(ident) => TargetStatement::AssignLocal {
                        ident,
                        op: AssignOp::Assign,
                        value,
                    },
                    None => TargetStatement::AssignGlobal {
                        name: variable.clone(),
                        op: AssignOp::Assign,
                        value,
                    },
                }
            }
            Statement::Assignment { left, op, right } => {
                let value = self.lower_list(right)?;
                match left {
                    Expression::Literal(name) => match self.lookup(name) {
                        Some(ident) => TargetStatement::AssignLocal {
                            ident,
                            op: *op,
                            value,
                        },
                        None => TargetStatement::AssignGlobal {
                            name: name.clone(),
                            op: *op,
                            value,
                        },
                    },
                    Expression::VariableOnTarget { variable, targets } => {
                        TargetStatement::AssignOnTarget {
                            names: self.lower_name_list(variable)?,
                            targets: self.lower_list(targets)?,
                            op: *op,
                            value,
                        }
                    }
                    other => TargetStatement::AssignIndirect {
                        names: self.lower_expression(other)?,
                        op: *op,
                        value,
                    },
                }
            }
            Statement::Invocation { rule, arguments } => {
                TargetStatement::Evaluate(self.lower_invocation(rule, arguments)?)
            }
            Statement::Return(values) => TargetStatement::Return(self.lower_list(values)?),
            Statement::Break => TargetStatement::Break,
            Statement::Continue => TargetStatement::Continue,
            Statement::On { target, body } => TargetStatement::OnBlock {
                targets: self.lower_expression(target)?,
                body: self.lower_branch(body)?,
            },
            Statement::Include(unit) => {
                if let Expression::Literal(name) = unit {
                    if !self.known_units.contains(name) {
                        return Err(ConvertError::UnknownUnit {
                            unit: self.unit.to_string(),
                            name: name.clone(),
                        });
                    }
                }
                TargetStatement::Include(self.lower_expression(unit)?)
            }
        };
        Ok(Some(lowered))
    }

    fn lower_list(&mut self, expressions: &[Expression]) -> Result<TargetExpression, ConvertError> {
        let mut lowered = Vec::with_capacity(expressions.len());
        for expression in expressions {
            lowered.push(self.lower_expression(expression)?);
        }
        if lowered.len() == 1 {
            return Ok(lowered.remove(0));
        }
        // An all-constant list folds into one constant.
        if lowered
            .iter()
            .all(|e| matches!(e, TargetExpression::Const(_)))
        {
            let mut values = Vec::new();
            for element in lowered {
                if let TargetExpression::Const(mut constants) = element {
                    values.append(&mut constants);
                }
            }
            return Ok(TargetExpression::Const(values));
        }
        Ok(TargetExpression::List(lowered))
    }

    /// The left side of an on-target assignment names variables literally;
    /// `myvar on t = …` writes `myvar`, it does not read it.
    fn lower_name_list(&mut self, expression: &Expression) -> Result<TargetExpression, ConvertError> {
        self.lower_expression(expression)
    }

    fn lower_expression(
        &mut self,
        expression: &Expression,
    ) -> Result<TargetExpression, ConvertError> {
        match expression {
            Expression::Literal(value) => Ok(TargetExpression::Const(vec![value.clone()])),
            Expression::VariableDereference(d) => self.lower_dereference(d, false),
            Expression::LiteralExpansion(d) => self.lower_dereference(d, true),
            Expression::Combine(parts) => {
                let mut lowered = Vec::with_capacity(parts.len());
                for part in parts {
                    lowered.push(self.lower_expression(part)?);
                }
                Ok(TargetExpression::Combine(lowered))
            }
            Expression::Invocation { rule, arguments } => self.lower_invocation(rule, arguments),
            Expression::BinaryOperator { .. }
            | Expression::Not(_)
            | Expression::VariableOnTarget { .. } => Err(ConvertError::MisplacedOperator {
                unit: self.unit.to_string(),
            }),
        }
    }

    fn lower_dereference(
        &mut self,
        dereference: &Dereference,
        literal_expansion: bool,
    ) -> Result<TargetExpression, ConvertError> {
        let mut value = if literal_expansion {
            // `@(…)` applies the indexer and modifiers to the subject value
            // itself instead of reading a variable.
            self.lower_expression(&dereference.variable)?
        } else {
            match &dereference.variable {
                Expression::Literal(name) => match self.lookup(name) {
                    Some(ident) => TargetExpression::ReadLocal(ident),
                    None => {
                        self.globals.accessor(name);
                        TargetExpression::ReadGlobal(name.clone())
                    }
                },
                other => TargetExpression::ReadDynamic(Box::new(self.lower_expression(other)?)),
            }
        };

        if let Some(indexer) = &dereference.indexer {
            value = TargetExpression::IndexedBy {
                receiver: Box::new(value),
                indices: Box::new(self.lower_expression(indexer)?),
            };
        }

        for modifier in &dereference.modifiers {
            let op = modifier_op(modifier.command).ok_or(ConvertError::UnsupportedModifier {
                unit: self.unit.to_string(),
                command: modifier.command,
            })?;
            let argument = match &modifier.argument {
                Some(expression) => Some(Box::new(self.lower_expression(expression)?)),
                None => None,
            };
            value = TargetExpression::Modifier {
                receiver: Box::new(value),
                op,
                argument,
            };
        }
        Ok(value)
    }

    fn lower_invocation(
        &mut self,
        rule: &Expression,
        arguments: &[Vec<Expression>],
    ) -> Result<TargetExpression, ConvertError> {
        let mut lowered_arguments = Vec::with_capacity(arguments.len());
        for list in arguments {
            lowered_arguments.push(self.lower_list(list)?);
        }

        match rule {
            Expression::Literal(name) => {
                if matches!(name.as_str(), "Echo" | "echo" | "ECHO") {
                    return Ok(TargetExpression::CallBuiltin {
                        builtin: Builtin::Echo,
                        arguments: lowered_arguments,
                    });
                }
                if name == "MD5" {
                    return Ok(TargetExpression::CallBuiltin {
                        builtin: Builtin::Md5,
                        arguments: lowered_arguments,
                    });
                }
                // A name bound to both a rule and an actions declaration
                // dispatches to the rule.
                if let Some(ident) = self.rules.get(name) {
                    return Ok(TargetExpression::CallRule {
                        jam_name: name.clone(),
                        ident: ident.clone(),
                        arguments: lowered_arguments,
                    });
                }
                if self.actions.contains(name) {
                    return Ok(TargetExpression::CallActions {
                        name: name.clone(),
                        arguments: lowered_arguments,
                    });
                }
                // Unknown names go through dynamic dispatch, which skips
                // them at runtime the way Jam does.
                Ok(TargetExpression::CallDynamic {
                    names: Box::new(TargetExpression::Const(vec![name.clone()])),
                    arguments: lowered_arguments,
                })
            }
            other => Ok(TargetExpression::CallDynamic {
                names: Box::new(self.lower_expression(other)?),
                arguments: lowered_arguments,
            }),
        }
    }

    fn lower_condition(
        &mut self,
        expression: &Expression,
    ) -> Result<TargetCondition, ConvertError> {
        match expression {
            Expression::BinaryOperator { left, op, right } => match op {
                BinaryOp::And | BinaryOp::Or => {
                    let chained = right.first().ok_or(ConvertError::MisplacedOperator {
                        unit: self.unit.to_string(),
                    })?;
                    let lowered_left = Box::new(self.lower_condition(left)?);
                    let lowered_right = Box::new(self.lower_condition(chained)?);
                    Ok(match op {
                        BinaryOp::And => TargetCondition::And(lowered_left, lowered_right),
                        _ => TargetCondition::Or(lowered_left, lowered_right),
                    })
                }
                comparison => {
                    let lowered_left = self.lower_expression(left)?;
                    let lowered_right = self.lower_list(right)?;
                    Ok(match comparison {
                        BinaryOp::Equal => TargetCondition::Equal(lowered_left, lowered_right),
                        BinaryOp::NotEqual => TargetCondition::NotEqual(lowered_left, lowered_right),
                        BinaryOp::In => TargetCondition::In(lowered_left, lowered_right),
                        BinaryOp::GreaterThan => {
                            TargetCondition::GreaterThan(lowered_left, lowered_right)
                        }
                        _ => TargetCondition::LessThan(lowered_left, lowered_right),
                    })
                }
            },
            Expression::Not(inner) => Ok(TargetCondition::Not(Box::new(
                self.lower_condition(inner)?,
            ))),
            other => Ok(TargetCondition::Truthy(self.lower_expression(other)?)),
        }
    }
}

fn modifier_op(command: char) -> Option<ModifierOp> {
    Some(match command {
        'S' => ModifierOp::Suffix,
        'G' => ModifierOp::Grist,
        'D' => ModifierOp::Directory,
        'B' => ModifierOp::Basename,
        'J' => ModifierOp::Join,
        'E' => ModifierOp::EmptyDefault,
        'I' => ModifierOp::IncludeMatching,
        'X' => ModifierOp::ExcludeMatching,
        'U' => ModifierOp::Upper,
        'L' => ModifierOp::Lower,
        'A' => ModifierOp::Reexpand,
        'W' => ModifierOp::WindowsPath,
        '\\' => ModifierOp::Backslashes,
        _ => return None,
    })
}
