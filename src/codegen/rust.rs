//! Renders a lowered program as one standalone Rust source file.
//!
//! The generated file depends only on the `runtime` module of this crate:
//! rules become free functions over `&mut JamContext`, globals become
//! accessor functions, and `main` wires the dispatch tables before running
//! the entry unit. Expressions that need the context mid-computation are
//! wrapped in block temporaries so each borrow ends before the next begins.

use rustc_hash::FxHashMap;

use super::target::{
    AssignOp, Builtin, ModifierOp, TargetCondition, TargetExpression, TargetProgram,
    TargetStatement,
};

const HEADER: &str = "#![allow(\n    non_snake_case,\n    unused_variables,\n    unused_mut,\n    unused_imports,\n    dead_code,\n    unreachable_patterns\n)]\n\nuse jam2rs::runtime::{AssignOp, JamContext, JamList};\n\n";

pub fn render(program: &TargetProgram) -> String {
    Renderer::new(program).render(program)
}

struct Renderer {
    accessors: FxHashMap<String, String>,
}

impl Renderer {
    fn new(program: &TargetProgram) -> Self {
        let accessors = program
            .globals
            .iter()
            .map(|global| (global.name.clone(), global.accessor.clone()))
            .collect();
        Self { accessors }
    }

    fn render(&self, program: &TargetProgram) -> String {
        let mut output = String::from(HEADER);

        for global in &program.globals {
            output.push_str(&format!(
                "fn {}(ctx: &mut JamContext) -> JamList {{\n    ctx.value_of(\"{}\")\n}}\n\n",
                global.accessor,
                escape(&global.name)
            ));
        }

        for rule in &program.rules {
            output.push_str(&format!(
                "fn {}(ctx: &mut JamContext, args: &[JamList]) -> JamList {{\n",
                rule.ident
            ));
            for (index, parameter) in rule.parameters.iter().enumerate() {
                self.push_line(
                    &mut output,
                    1,
                    &format!("let mut {parameter} = args.get({index}).cloned().unwrap_or_default();"),
                );
            }
            for statement in &rule.body {
                self.emit_statement(statement, 1, &mut output);
            }
            output.push_str("    JamList::new()\n}\n\n");
        }

        for unit in &program.units {
            output.push_str(&format!(
                "fn {}(ctx: &mut JamContext) -> JamList {{\n",
                unit.ident
            ));
            for statement in &unit.body {
                self.emit_statement(statement, 1, &mut output);
            }
            output.push_str("    JamList::new()\n}\n\n");
        }

        output.push_str("fn main() {\n    let mut ctx = JamContext::new();\n");
        for rule in &program.rules {
            self.push_line(
                &mut output,
                1,
                &format!(
                    "ctx.register_rule(\"{}\", {});",
                    escape(&rule.jam_name),
                    rule.ident
                ),
            );
        }
        for actions in &program.actions {
            let modifiers = string_slice(&actions.modifiers);
            let lines = string_slice(&actions.lines);
            self.push_line(
                &mut output,
                1,
                &format!(
                    "ctx.register_actions(\"{}\", {modifiers}, {lines});",
                    escape(&actions.name)
                ),
            );
        }
        for unit in &program.units {
            self.push_line(
                &mut output,
                1,
                &format!(
                    "ctx.register_unit(\"{}\", {});",
                    escape(&unit.name),
                    unit.ident
                ),
            );
        }
        if let Some(entry) = program.units.first() {
            self.push_line(&mut output, 1, &format!("{}(&mut ctx);", entry.ident));
        }
        output.push_str("}\n");
        output
    }

    fn emit_statement(&self, statement: &TargetStatement, indent: usize, output: &mut String) {
        match statement {
            TargetStatement::AssignLocal { ident, op, value } => {
                let value = self.emit_expression(value);
                self.push_line(
                    output,
                    indent,
                    &format!("{ident}.{}(&{value});", assign_method(*op)),
                );
            }
            TargetStatement::AssignGlobal { name, op, value } => {
                let value = self.emit_expression(value);
                self.push_line(output, indent, "{");
                self.push_line(output, indent + 1, &format!("let __value = {value};"));
                self.push_line(
                    output,
                    indent + 1,
                    &format!(
                        "ctx.assign_global(\"{}\", {}, &__value);",
                        escape(name),
                        assign_variant(*op)
                    ),
                );
                self.push_line(output, indent, "}");
            }
            TargetStatement::AssignIndirect { names, op, value } => {
                let names = self.emit_expression(names);
                let value = self.emit_expression(value);
                self.push_line(output, indent, "{");
                self.push_line(output, indent + 1, &format!("let __names = {names};"));
                self.push_line(output, indent + 1, &format!("let __value = {value};"));
                self.push_line(
                    output,
                    indent + 1,
                    &format!(
                        "ctx.assign_indirect(&__names, {}, &__value);",
                        assign_variant(*op)
                    ),
                );
                self.push_line(output, indent, "}");
            }
            TargetStatement::AssignOnTarget {
                names,
                targets,
                op,
                value,
            } => {
                let names = self.emit_expression(names);
                let targets = self.emit_expression(targets);
                let value = self.emit_expression(value);
                self.push_line(output, indent, "{");
                self.push_line(output, indent + 1, &format!("let __names = {names};"));
                self.push_line(output, indent + 1, &format!("let __targets = {targets};"));
                self.push_line(output, indent + 1, &format!("let __value = {value};"));
                self.push_line(
                    output,
                    indent + 1,
                    &format!(
                        "ctx.assign_on_target(&__names, &__targets, {}, &__value);",
                        assign_variant(*op)
                    ),
                );
                self.push_line(output, indent, "}");
            }
            TargetStatement::Block(body) => {
                self.push_line(output, indent, "{");
                for statement in body {
                    self.emit_statement(statement, indent + 1, output);
                }
                self.push_line(output, indent, "}");
            }
            TargetStatement::If {
                condition,
                body,
                else_branch,
            } => {
                let condition = self.emit_condition(condition);
                self.push_line(output, indent, &format!("if {condition} {{"));
                for statement in body {
                    self.emit_statement(statement, indent + 1, output);
                }
                if else_branch.is_empty() {
                    self.push_line(output, indent, "}");
                } else {
                    self.push_line(output, indent, "} else {");
                    for statement in else_branch {
                        self.emit_statement(statement, indent + 1, output);
                    }
                    self.push_line(output, indent, "}");
                }
            }
            TargetStatement::While { condition, body } => {
                let condition = self.emit_condition(condition);
                self.push_line(output, indent, &format!("while {condition} {{"));
                for statement in body {
                    self.emit_statement(statement, indent + 1, output);
                }
                self.push_line(output, indent, "}");
            }
            TargetStatement::ForEach { ident, list, body } => {
                let list = receiver(self.emit_expression(list));
                self.push_line(
                    output,
                    indent,
                    &format!("for __element in {list}.into_elements() {{"),
                );
                self.push_line(
                    output,
                    indent + 1,
                    &format!("let mut {ident} = JamList::single(__element);"),
                );
                for statement in body {
                    self.emit_statement(statement, indent + 1, output);
                }
                self.push_line(output, indent, "}");
            }
            TargetStatement::Switch { subject, cases } => {
                let subject = receiver(self.emit_expression(subject));
                self.push_line(
                    output,
                    indent,
                    &format!("match {subject}.switch_token().as_str() {{"),
                );
                let mut covered = false;
                for (value, body) in cases {
                    let arm = if value == "*" {
                        covered = true;
                        "_".to_string()
                    } else {
                        format!("\"{}\"", escape(value))
                    };
                    self.push_line(output, indent + 1, &format!("{arm} => {{"));
                    for statement in body {
                        self.emit_statement(statement, indent + 2, output);
                    }
                    self.push_line(output, indent + 1, "}");
                }
                if !covered {
                    self.push_line(output, indent + 1, "_ => {}");
                }
                self.push_line(output, indent, "}");
            }
            TargetStatement::OnBlock { targets, body } => {
                let targets = self.emit_expression(targets);
                self.push_line(output, indent, "{");
                self.push_line(output, indent + 1, &format!("let __targets = {targets};"));
                self.push_line(
                    output,
                    indent + 1,
                    "let __scope = ctx.enter_targets(&__targets);",
                );
                for statement in body {
                    self.emit_statement(statement, indent + 1, output);
                }
                self.push_line(output, indent, "}");
            }
            TargetStatement::Return(value) => {
                let value = self.emit_expression(value);
                self.push_line(output, indent, &format!("return {value};"));
            }
            TargetStatement::Break => self.push_line(output, indent, "break;"),
            TargetStatement::Continue => self.push_line(output, indent, "continue;"),
            TargetStatement::Include(names) => {
                let names = self.emit_expression(names);
                self.push_line(output, indent, "{");
                self.push_line(output, indent + 1, &format!("let __names = {names};"));
                self.push_line(output, indent + 1, "ctx.run_unit(&__names);");
                self.push_line(output, indent, "}");
            }
            TargetStatement::Evaluate(expression) => {
                let expression = self.emit_expression(expression);
                self.push_line(output, indent, &format!("let _ = {expression};"));
            }
        }
    }

    fn emit_expression(&self, expression: &TargetExpression) -> String {
        match expression {
            TargetExpression::Const(values) => match values.as_slice() {
                [] => "JamList::new()".to_string(),
                [value] => format!("JamList::single(\"{}\")", escape(value)),
                values => {
                    let escaped: Vec<String> =
                        values.iter().map(|v| format!("\"{}\"", escape(v))).collect();
                    format!("JamList::from_slice(&[{}])", escaped.join(", "))
                }
            },
            TargetExpression::List(elements) => self.emit_list(elements),
            TargetExpression::ReadLocal(ident) => format!("{ident}.clone()"),
            TargetExpression::ReadGlobal(name) => {
                // Lowering registered every read global, so the accessor
                // always exists.
                match self.accessors.get(name) {
                    Some(accessor) => format!("{accessor}(ctx)"),
                    None => format!("ctx.value_of(\"{}\")", escape(name)),
                }
            }
            TargetExpression::ReadDynamic(names) => {
                let names = self.emit_expression(names);
                format!("{{ let __names = {names}; ctx.values_of(&__names) }}")
            }
            TargetExpression::Combine(parts) => {
                let parts: Vec<String> = parts.iter().map(|p| self.emit_expression(p)).collect();
                format!("JamList::combine(&[{}])", parts.join(", "))
            }
            TargetExpression::Modifier {
                receiver: inner,
                op,
                argument,
            } => {
                let rendered = self.emit_expression(inner);
                match op {
                    ModifierOp::Upper => format!("{}.to_upper()", receiver(rendered)),
                    ModifierOp::Lower => format!("{}.to_lower()", receiver(rendered)),
                    ModifierOp::Backslashes => {
                        format!("{}.to_backslashes()", receiver(rendered))
                    }
                    // Re-expansion reads the variable stores mid-chain.
                    ModifierOp::Reexpand => {
                        format!("{{ let __value = {rendered}; ctx.reexpand(&__value) }}")
                    }
                    other => {
                        let inner = receiver(rendered);
                        let method = match other {
                            ModifierOp::Suffix => "with_suffix",
                            ModifierOp::Grist => "with_grist",
                            ModifierOp::Directory => "with_directory",
                            ModifierOp::Basename => "with_basename",
                            ModifierOp::Join => "join_with",
                            ModifierOp::EmptyDefault => "if_empty_use",
                            ModifierOp::IncludeMatching => "include_matching",
                            ModifierOp::WindowsPath => "with_windows_path",
                            _ => "exclude_matching",
                        };
                        match argument {
                            Some(argument) => {
                                let argument = self.emit_expression(argument);
                                format!("{inner}.{method}(Some(&{argument}))")
                            }
                            None => format!("{inner}.{method}(None)"),
                        }
                    }
                }
            }
            TargetExpression::IndexedBy {
                receiver: inner,
                indices,
            } => {
                let inner = receiver(self.emit_expression(inner));
                let indices = self.emit_expression(indices);
                format!("{inner}.indexed_by(&{indices})")
            }
            TargetExpression::CallRule {
                ident, arguments, ..
            } => {
                if arguments.is_empty() {
                    format!("{ident}(ctx, &[])")
                } else {
                    let arguments = self.emit_arguments(arguments);
                    format!("{{ let __args = [{arguments}]; {ident}(ctx, &__args) }}")
                }
            }
            TargetExpression::CallDynamic { names, arguments } => {
                let names = self.emit_expression(names);
                if arguments.is_empty() {
                    format!("{{ let __names = {names}; ctx.invoke_dynamic(&__names, &[]) }}")
                } else {
                    let arguments = self.emit_arguments(arguments);
                    format!(
                        "{{ let __names = {names}; let __args = [{arguments}]; ctx.invoke_dynamic(&__names, &__args) }}"
                    )
                }
            }
            TargetExpression::CallActions { name, arguments } => {
                let name = escape(name);
                if arguments.is_empty() {
                    format!("ctx.invoke_actions(\"{name}\", &[])")
                } else {
                    let arguments = self.emit_arguments(arguments);
                    format!("{{ let __args = [{arguments}]; ctx.invoke_actions(\"{name}\", &__args) }}")
                }
            }
            TargetExpression::CallBuiltin { builtin, arguments } => {
                let line = self.emit_list(arguments);
                match builtin {
                    Builtin::Echo => {
                        format!("{{ let __line = {line}; ctx.echo(&__line); JamList::new() }}")
                    }
                    Builtin::Md5 => format!("{{ let __line = {line}; __line.md5() }}"),
                }
            }
        }
    }

    fn emit_list(&self, elements: &[TargetExpression]) -> String {
        match elements {
            [] => "JamList::new()".to_string(),
            [single] => self.emit_expression(single),
            elements => {
                let rendered: Vec<String> =
                    elements.iter().map(|e| self.emit_expression(e)).collect();
                format!("JamList::concat(&[{}])", rendered.join(", "))
            }
        }
    }

    fn emit_arguments(&self, arguments: &[TargetExpression]) -> String {
        arguments
            .iter()
            .map(|a| self.emit_expression(a))
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn emit_condition(&self, condition: &TargetCondition) -> String {
        match condition {
            TargetCondition::Truthy(value) => {
                format!("{}.as_bool()", receiver(self.emit_expression(value)))
            }
            TargetCondition::Equal(left, right) => format!(
                "{}.jam_equals(&{})",
                receiver(self.emit_expression(left)),
                self.emit_expression(right)
            ),
            TargetCondition::NotEqual(left, right) => format!(
                "!{}.jam_equals(&{})",
                receiver(self.emit_expression(left)),
                self.emit_expression(right)
            ),
            TargetCondition::In(left, right) => format!(
                "{}.is_in(&{})",
                receiver(self.emit_expression(left)),
                self.emit_expression(right)
            ),
            TargetCondition::GreaterThan(left, right) => format!(
                "{}.greater_than(&{})",
                receiver(self.emit_expression(left)),
                self.emit_expression(right)
            ),
            TargetCondition::LessThan(left, right) => format!(
                "{}.less_than(&{})",
                receiver(self.emit_expression(left)),
                self.emit_expression(right)
            ),
            TargetCondition::And(left, right) => format!(
                "({} && {})",
                self.emit_condition(left),
                self.emit_condition(right)
            ),
            TargetCondition::Or(left, right) => format!(
                "({} || {})",
                self.emit_condition(left),
                self.emit_condition(right)
            ),
            TargetCondition::Not(inner) => format!("!({})", self.emit_condition(inner)),
        }
    }

    fn push_line(&self, output: &mut String, indent: usize, line: &str) {
        for _ in 0..indent {
            output.push_str("    ");
        }
        output.push_str(line);
        output.push('\n');
    }
}

fn assign_method(op: AssignOp) -> &'static str {
    match op {
        AssignOp::Assign => "assign",
        AssignOp::Append => "append",
        AssignOp::Subtract => "subtract",
        AssignOp::AssignIfEmpty => "assign_if_empty",
    }
}

fn assign_variant(op: AssignOp) -> &'static str {
    match op {
        AssignOp::Assign => "AssignOp::Assign",
        AssignOp::Append => "AssignOp::Append",
        AssignOp::Subtract => "AssignOp::Subtract",
        AssignOp::AssignIfEmpty => "AssignOp::AssignIfEmpty",
    }
}

/// A block expression cannot take a method call or start a statement
/// unparenthesized.
fn receiver(rendered: String) -> String {
    if rendered.starts_with('{') {
        format!("({rendered})")
    } else {
        rendered
    }
}

fn string_slice(values: &[String]) -> String {
    if values.is_empty() {
        return "&[]".to_string();
    }
    let escaped: Vec<String> = values.iter().map(|v| format!("\"{}\"", escape(v))).collect();
    format!("&[{}]", escaped.join(", "))
}

fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            ch if ch.is_control() => out.push_str(&format!("\\u{{{:x}}}", ch as u32)),
            ch => out.push(ch),
        }
    }
    out
}
