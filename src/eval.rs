//! In-process evaluation of a lowered program.
//!
//! The evaluator walks the same target form the Rust renderer prints,
//! against the same `JamContext`, so a converted build can be checked
//! without compiling the generated source. Control flow is threaded as an
//! explicit signal; locals live in one frame per rule or unit activation.

use anyhow::{bail, Result};
use rustc_hash::FxHashMap;

use crate::codegen::target::{
    Builtin, ModifierOp, RuleDef, TargetCondition, TargetExpression, TargetProgram,
    TargetStatement, UnitDef,
};
use crate::runtime::{JamContext, JamList};

const MAX_CALL_DEPTH: usize = 256;

/// Runs the program's entry unit and returns its result value.
pub fn execute(program: &TargetProgram, ctx: &mut JamContext) -> Result<JamList> {
    for actions in &program.actions {
        let modifiers: Vec<&str> = actions.modifiers.iter().map(String::as_str).collect();
        let lines: Vec<&str> = actions.lines.iter().map(String::as_str).collect();
        ctx.register_actions(&actions.name, &modifiers, &lines);
    }

    let Some(entry) = program.units.first() else {
        return Ok(JamList::new());
    };
    Evaluator::new(program).run_unit(ctx, entry)
}

enum Signal {
    Normal,
    Break,
    Continue,
    Return(JamList),
}

struct Evaluator<'p> {
    rules: FxHashMap<&'p str, &'p RuleDef>,
    units: FxHashMap<&'p str, &'p UnitDef>,
    /// Call stack; only the top frame is a visible scope.
    frames: Vec<FxHashMap<String, JamList>>,
}

impl<'p> Evaluator<'p> {
    fn new(program: &'p TargetProgram) -> Self {
        Self {
            rules: program
                .rules
                .iter()
                .map(|rule| (rule.jam_name.as_str(), rule))
                .collect(),
            units: program
                .units
                .iter()
                .map(|unit| (unit.name.as_str(), unit))
                .collect(),
            frames: Vec::new(),
        }
    }

    fn run_unit(&mut self, ctx: &mut JamContext, unit: &'p UnitDef) -> Result<JamList> {
        self.frames.push(FxHashMap::default());
        let signal = self.run_block(ctx, &unit.body);
        self.frames.pop();
        Ok(match signal? {
            Signal::Return(value) => value,
            _ => JamList::new(),
        })
    }

    fn call_rule(
        &mut self,
        ctx: &mut JamContext,
        rule: &'p RuleDef,
        arguments: &[JamList],
    ) -> Result<JamList> {
        if self.frames.len() >= MAX_CALL_DEPTH {
            bail!(
                "rule {:?} exceeded the call depth limit of {MAX_CALL_DEPTH}",
                rule.jam_name
            );
        }
        let mut frame = FxHashMap::default();
        for (index, parameter) in rule.parameters.iter().enumerate() {
            frame.insert(
                parameter.clone(),
                arguments.get(index).cloned().unwrap_or_default(),
            );
        }
        self.frames.push(frame);
        let signal = self.run_block(ctx, &rule.body);
        self.frames.pop();
        Ok(match signal? {
            Signal::Return(value) => value,
            _ => JamList::new(),
        })
    }

    fn run_block(&mut self, ctx: &mut JamContext, body: &'p [TargetStatement]) -> Result<Signal> {
        for statement in body {
            match self.run_statement(ctx, statement)? {
                Signal::Normal => {}
                other => return Ok(other),
            }
        }
        Ok(Signal::Normal)
    }

    fn run_statement(
        &mut self,
        ctx: &mut JamContext,
        statement: &'p TargetStatement,
    ) -> Result<Signal> {
        match statement {
            TargetStatement::AssignLocal { ident, op, value } => {
                let value = self.eval(ctx, value)?;
                self.frame().entry(ident.clone()).or_default().apply(*op, &value);
            }
            TargetStatement::AssignGlobal { name, op, value } => {
                let value = self.eval(ctx, value)?;
                ctx.assign_global(name, *op, &value);
            }
            TargetStatement::AssignIndirect { names, op, value } => {
                let names = self.eval(ctx, names)?;
                let value = self.eval(ctx, value)?;
                ctx.assign_indirect(&names, *op, &value);
            }
            TargetStatement::AssignOnTarget {
                names,
                targets,
                op,
                value,
            } => {
                let names = self.eval(ctx, names)?;
                let targets = self.eval(ctx, targets)?;
                let value = self.eval(ctx, value)?;
                ctx.assign_on_target(&names, &targets, *op, &value);
            }
            TargetStatement::Block(body) => return self.run_block(ctx, body),
            TargetStatement::If {
                condition,
                body,
                else_branch,
            } => {
                return if self.eval_condition(ctx, condition)? {
                    self.run_block(ctx, body)
                } else {
                    self.run_block(ctx, else_branch)
                };
            }
            TargetStatement::While { condition, body } => {
                while self.eval_condition(ctx, condition)? {
                    match self.run_block(ctx, body)? {
                        Signal::Normal | Signal::Continue => {}
                        Signal::Break => break,
                        value @ Signal::Return(_) => return Ok(value),
                    }
                }
            }
            TargetStatement::ForEach { ident, list, body } => {
                let list = self.eval(ctx, list)?;
                let saved = self.frame().get(ident).cloned();
                for element in list.into_elements() {
                    self.frame().insert(ident.clone(), JamList::single(element));
                    match self.run_block(ctx, body)? {
                        Signal::Normal | Signal::Continue => {}
                        Signal::Break => break,
                        value @ Signal::Return(_) => return Ok(value),
                    }
                }
                match saved {
                    Some(saved) => self.frame().insert(ident.clone(), saved),
                    None => self.frame().remove(ident),
                };
            }
            TargetStatement::Switch { subject, cases } => {
                let token = self.eval(ctx, subject)?.switch_token();
                for (value, body) in cases {
                    if value == "*" || *value == token {
                        return self.run_block(ctx, body);
                    }
                }
            }
            TargetStatement::OnBlock { targets, body } => {
                let targets = self.eval(ctx, targets)?;
                let _scope = ctx.enter_targets(&targets);
                return self.run_block(ctx, body);
            }
            TargetStatement::Return(value) => {
                let value = self.eval(ctx, value)?;
                return Ok(Signal::Return(value));
            }
            TargetStatement::Break => return Ok(Signal::Break),
            TargetStatement::Continue => return Ok(Signal::Continue),
            TargetStatement::Include(names) => {
                let names = self.eval(ctx, names)?;
                for name in names.elements() {
                    match self.units.get(name.as_str()).copied() {
                        Some(unit) => {
                            self.run_unit(ctx, unit)?;
                        }
                        None => ctx.record_legacy_include(name),
                    }
                }
            }
            TargetStatement::Evaluate(expression) => {
                self.eval(ctx, expression)?;
            }
        }
        Ok(Signal::Normal)
    }

    fn eval(&mut self, ctx: &mut JamContext, expression: &'p TargetExpression) -> Result<JamList> {
        Ok(match expression {
            TargetExpression::Const(values) => JamList::from_vec(values.clone()),
            TargetExpression::List(elements) => {
                let mut result = JamList::new();
                for element in elements {
                    let value = self.eval(ctx, element)?;
                    result.append(&value);
                }
                result
            }
            TargetExpression::ReadLocal(ident) => self
                .frames
                .last()
                .and_then(|frame| frame.get(ident))
                .cloned()
                .unwrap_or_default(),
            TargetExpression::ReadGlobal(name) => ctx.value_of(name),
            TargetExpression::ReadDynamic(names) => {
                let names = self.eval(ctx, names)?;
                ctx.values_of(&names)
            }
            TargetExpression::Combine(parts) => {
                let mut evaluated = Vec::with_capacity(parts.len());
                for part in parts {
                    evaluated.push(self.eval(ctx, part)?);
                }
                JamList::combine(&evaluated)
            }
            TargetExpression::Modifier {
                receiver,
                op,
                argument,
            } => {
                let receiver = self.eval(ctx, receiver)?;
                let argument = match argument {
                    Some(argument) => Some(self.eval(ctx, argument)?),
                    None => None,
                };
                let argument = argument.as_ref();
                match op {
                    ModifierOp::Suffix => receiver.with_suffix(argument),
                    ModifierOp::Grist => receiver.with_grist(argument),
                    ModifierOp::Directory => receiver.with_directory(argument),
                    ModifierOp::Basename => receiver.with_basename(argument),
                    ModifierOp::Join => receiver.join_with(argument),
                    ModifierOp::EmptyDefault => receiver.if_empty_use(argument),
                    ModifierOp::IncludeMatching => receiver.include_matching(argument),
                    ModifierOp::ExcludeMatching => receiver.exclude_matching(argument),
                    ModifierOp::Upper => receiver.to_upper(),
                    ModifierOp::Lower => receiver.to_lower(),
                    ModifierOp::Reexpand => ctx.reexpand(&receiver),
                    ModifierOp::WindowsPath => receiver.with_windows_path(argument),
                    ModifierOp::Backslashes => receiver.to_backslashes(),
                }
            }
            TargetExpression::IndexedBy { receiver, indices } => {
                let receiver = self.eval(ctx, receiver)?;
                let indices = self.eval(ctx, indices)?;
                receiver.indexed_by(&indices)
            }
            TargetExpression::CallRule {
                jam_name,
                arguments,
                ..
            } => {
                let Some(rule) = self.rules.get(jam_name.as_str()).copied() else {
                    bail!("call to unlowered rule {jam_name:?}");
                };
                let arguments = self.eval_arguments(ctx, arguments)?;
                self.call_rule(ctx, rule, &arguments)?
            }
            TargetExpression::CallDynamic { names, arguments } => {
                let names = self.eval(ctx, names)?;
                let arguments = self.eval_arguments(ctx, arguments)?;
                let mut result = JamList::new();
                for name in names.elements() {
                    if let Some(rule) = self.rules.get(name.as_str()).copied() {
                        let value = self.call_rule(ctx, rule, &arguments)?;
                        result.append(&value);
                    } else if ctx.actions_entry(name).is_some() {
                        ctx.invoke_actions(name, &arguments);
                    }
                }
                result
            }
            TargetExpression::CallActions { name, arguments } => {
                let arguments = self.eval_arguments(ctx, arguments)?;
                ctx.invoke_actions(name, &arguments)
            }
            TargetExpression::CallBuiltin { builtin, arguments } => {
                let mut line = JamList::new();
                for argument in arguments {
                    let value = self.eval(ctx, argument)?;
                    line.append(&value);
                }
                match builtin {
                    Builtin::Echo => {
                        ctx.echo(&line);
                        JamList::new()
                    }
                    Builtin::Md5 => line.md5(),
                }
            }
        })
    }

    fn eval_arguments(
        &mut self,
        ctx: &mut JamContext,
        arguments: &'p [TargetExpression],
    ) -> Result<Vec<JamList>> {
        let mut evaluated = Vec::with_capacity(arguments.len());
        for argument in arguments {
            evaluated.push(self.eval(ctx, argument)?);
        }
        Ok(evaluated)
    }

    fn eval_condition(
        &mut self,
        ctx: &mut JamContext,
        condition: &'p TargetCondition,
    ) -> Result<bool> {
        Ok(match condition {
            TargetCondition::Truthy(value) => self.eval(ctx, value)?.as_bool(),
            TargetCondition::Equal(left, right) => {
                let left = self.eval(ctx, left)?;
                left.jam_equals(&self.eval(ctx, right)?)
            }
            TargetCondition::NotEqual(left, right) => {
                let left = self.eval(ctx, left)?;
                !left.jam_equals(&self.eval(ctx, right)?)
            }
            TargetCondition::In(left, right) => {
                let left = self.eval(ctx, left)?;
                left.is_in(&self.eval(ctx, right)?)
            }
            TargetCondition::GreaterThan(left, right) => {
                let left = self.eval(ctx, left)?;
                left.greater_than(&self.eval(ctx, right)?)
            }
            TargetCondition::LessThan(left, right) => {
                let left = self.eval(ctx, left)?;
                left.less_than(&self.eval(ctx, right)?)
            }
            TargetCondition::And(left, right) => {
                self.eval_condition(ctx, left)? && self.eval_condition(ctx, right)?
            }
            TargetCondition::Or(left, right) => {
                self.eval_condition(ctx, left)? || self.eval_condition(ctx, right)?
            }
            TargetCondition::Not(inner) => !self.eval_condition(ctx, inner)?,
        })
    }

    fn frame(&mut self) -> &mut FxHashMap<String, JamList> {
        self.frames.last_mut().expect("an active frame")
    }
}
