//! Execution context for converted Jam programs.
//!
//! The context owns the two variable stores (the global store and the
//! on-target overlay), the active-target stack, the rule/actions/unit
//! dispatch tables and the output sink. Generated programs receive a
//! `&mut JamContext` everywhere; the in-process evaluator drives the same
//! type.

use std::cell::RefCell;
use std::rc::Rc;

use rustc_hash::FxHashMap;

use super::list::{AssignOp, JamList};

pub type RuleFn = fn(&mut JamContext, &[JamList]) -> JamList;
pub type UnitFn = fn(&mut JamContext) -> JamList;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionsEntry {
    pub modifiers: Vec<String>,
    pub lines: Vec<String>,
}

/// One recorded `actions` invocation. Executing shell actions is not this
/// crate's job; the invocation log is the observable effect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionsInvocation {
    pub name: String,
    pub targets: JamList,
}

enum OutputSink {
    Stdout,
    Buffer(String),
}

pub struct JamContext {
    globals: FxHashMap<String, JamList>,
    /// Overlay keyed by target name, then variable name. Only populated by
    /// explicit `name on target = …` assignments.
    target_vars: FxHashMap<String, FxHashMap<String, JamList>>,
    /// Stack of active target groups; shared with the RAII scope guards so a
    /// guard outlives any particular borrow of the context.
    active_targets: Rc<RefCell<Vec<Vec<String>>>>,
    rules: FxHashMap<String, RuleFn>,
    units: FxHashMap<String, UnitFn>,
    actions: FxHashMap<String, ActionsEntry>,
    invoked_actions: Vec<ActionsInvocation>,
    legacy_includes: Vec<String>,
    output: OutputSink,
}

impl JamContext {
    pub fn new() -> Self {
        Self::with_sink(OutputSink::Stdout)
    }

    /// A context that collects `Echo` output into a buffer instead of
    /// writing to stdout. Used by tests and harnesses.
    pub fn captured() -> Self {
        Self::with_sink(OutputSink::Buffer(String::new()))
    }

    fn with_sink(output: OutputSink) -> Self {
        Self {
            globals: FxHashMap::default(),
            target_vars: FxHashMap::default(),
            active_targets: Rc::new(RefCell::new(Vec::new())),
            rules: FxHashMap::default(),
            units: FxHashMap::default(),
            actions: FxHashMap::default(),
            invoked_actions: Vec::new(),
            legacy_includes: Vec::new(),
            output,
        }
    }

    /// Takes the captured output, leaving an empty buffer. Returns the empty
    /// string for a stdout-backed context.
    pub fn take_output(&mut self) -> String {
        match &mut self.output {
            OutputSink::Stdout => String::new(),
            OutputSink::Buffer(buffer) => std::mem::take(buffer),
        }
    }

    // --- variable stores ----------------------------------------------------

    /// Reads a variable by bare name: the active target groups' overlay
    /// entries are consulted innermost first, then the global store. Reading
    /// an unknown global vivifies it as an empty list.
    pub fn value_of(&mut self, name: &str) -> JamList {
        let stack = self.active_targets.borrow();
        for group in stack.iter().rev() {
            for target in group {
                if let Some(value) = self
                    .target_vars
                    .get(target)
                    .and_then(|vars| vars.get(name))
                {
                    return value.clone();
                }
            }
        }
        drop(stack);
        self.globals.entry(name.to_string()).or_default().clone()
    }

    /// Reads and concatenates several variables, for `$(expr)` subjects that
    /// evaluate to more than one name.
    pub fn values_of(&mut self, names: &JamList) -> JamList {
        let mut result = JamList::new();
        for name in names.elements() {
            let value = self.value_of(name);
            result.append(&value);
        }
        result
    }

    /// `:A`: expands `$(name)` spans inside each element against the current
    /// stores, cross-producting the pieces the way adjacent expression parts
    /// combine.
    pub fn reexpand(&mut self, value: &JamList) -> JamList {
        let mut result = JamList::new();
        for element in value.elements() {
            let expanded = self.reexpand_element(element);
            result.append(&expanded);
        }
        result
    }

    fn reexpand_element(&mut self, element: &str) -> JamList {
        let chars: Vec<char> = element.chars().collect();
        let mut parts: Vec<JamList> = Vec::new();
        let mut literal = String::new();
        let mut i = 0;
        while i < chars.len() {
            if chars[i] == '$' && chars.get(i + 1) == Some(&'(') {
                if let Some(close) = matching_parenthesis(&chars, i + 2) {
                    if !literal.is_empty() {
                        parts.push(JamList::single(std::mem::take(&mut literal)));
                    }
                    let name: String = chars[i + 2..close].iter().collect();
                    parts.push(self.value_of(&name));
                    i = close + 1;
                    continue;
                }
            }
            literal.push(chars[i]);
            i += 1;
        }
        if parts.is_empty() {
            return JamList::single(literal);
        }
        if !literal.is_empty() {
            parts.push(JamList::single(literal));
        }
        JamList::combine(&parts)
    }

    /// Writes a variable by bare name. Deliberately ignores the active
    /// target stack: bare-name writes always land in the global store, even
    /// inside an `on` block. Overlay writes require the explicit
    /// `name on target = …` form.
    pub fn assign_global(&mut self, name: &str, op: AssignOp, value: &JamList) {
        self.globals
            .entry(name.to_string())
            .or_default()
            .apply(op, value);
    }

    /// `$(names) = value`: assigns to every variable the name list denotes.
    pub fn assign_indirect(&mut self, names: &JamList, op: AssignOp, value: &JamList) {
        for name in names.elements() {
            self.assign_global(name, op, value);
        }
    }

    /// `names on targets = value`: writes the overlay for every
    /// (target, name) pair.
    pub fn assign_on_target(
        &mut self,
        names: &JamList,
        targets: &JamList,
        op: AssignOp,
        value: &JamList,
    ) {
        for target in targets.elements() {
            let vars = self.target_vars.entry(target.clone()).or_default();
            for name in names.elements() {
                vars.entry(name.clone()).or_default().apply(op, value);
            }
        }
    }

    /// Activates a target group for the duration of the returned guard.
    /// Dropping the guard pops the group, so every exit path of an `on`
    /// block (fallthrough, `return`, `break`) releases it.
    pub fn enter_targets(&self, targets: &JamList) -> TargetScope {
        self.active_targets
            .borrow_mut()
            .push(targets.elements().to_vec());
        TargetScope {
            stack: Rc::clone(&self.active_targets),
        }
    }

    // --- dispatch tables ----------------------------------------------------

    pub fn register_rule(&mut self, name: &str, rule: RuleFn) {
        self.rules.insert(name.to_string(), rule);
    }

    pub fn register_unit(&mut self, name: &str, unit: UnitFn) {
        self.units.insert(name.to_string(), unit);
    }

    pub fn register_actions(&mut self, name: &str, modifiers: &[&str], lines: &[&str]) {
        self.actions.insert(
            name.to_string(),
            ActionsEntry {
                modifiers: modifiers.iter().map(|m| m.to_string()).collect(),
                lines: lines.iter().map(|l| l.to_string()).collect(),
            },
        );
    }

    pub fn actions_entry(&self, name: &str) -> Option<&ActionsEntry> {
        self.actions.get(name)
    }

    /// Invokes every rule the name list denotes, concatenating the results.
    /// Names bound to an actions declaration record an invocation; unknown
    /// names contribute nothing.
    pub fn invoke_dynamic(&mut self, names: &JamList, arguments: &[JamList]) -> JamList {
        let mut result = JamList::new();
        for name in names.elements() {
            if let Some(rule) = self.rules.get(name).copied() {
                let value = rule(self, arguments);
                result.append(&value);
            } else if self.actions.contains_key(name) {
                self.invoke_actions(name, arguments);
            }
        }
        result
    }

    /// Records an actions invocation; the first argument list is the target
    /// list. Always yields the empty list.
    pub fn invoke_actions(&mut self, name: &str, arguments: &[JamList]) -> JamList {
        self.invoked_actions.push(ActionsInvocation {
            name: name.to_string(),
            targets: arguments.first().cloned().unwrap_or_default(),
        });
        JamList::new()
    }

    pub fn invoked_actions(&self) -> &[ActionsInvocation] {
        &self.invoked_actions
    }

    /// `include $(unit)`: runs every named unit that was converted and
    /// registered; unconverted names go to the legacy-include log, the hook
    /// for mixed-mode operation where part of the build stays on the old
    /// interpreter.
    pub fn run_unit(&mut self, names: &JamList) -> JamList {
        let mut last = JamList::new();
        for name in names.elements() {
            if let Some(unit) = self.units.get(name).copied() {
                last = unit(self);
            } else {
                self.legacy_includes.push(name.clone());
            }
        }
        last
    }

    pub fn record_legacy_include(&mut self, name: &str) {
        self.legacy_includes.push(name.to_string());
    }

    pub fn legacy_includes(&self) -> &[String] {
        &self.legacy_includes
    }

    // --- output -------------------------------------------------------------

    /// `Echo`: the space-joined list followed by a newline.
    pub fn echo(&mut self, line: &JamList) {
        match &mut self.output {
            OutputSink::Stdout => println!("{line}"),
            OutputSink::Buffer(buffer) => {
                buffer.push_str(&line.to_string());
                buffer.push('\n');
            }
        }
    }
}

/// Index of the `)` closing an expansion whose name starts at `from`,
/// skipping balanced inner parentheses.
fn matching_parenthesis(chars: &[char], from: usize) -> Option<usize> {
    let mut depth = 0;
    for (index, ch) in chars.iter().enumerate().skip(from) {
        match ch {
            '(' => depth += 1,
            ')' if depth == 0 => return Some(index),
            ')' => depth -= 1,
            _ => {}
        }
    }
    None
}

impl Default for JamContext {
    fn default() -> Self {
        Self::new()
    }
}

/// RAII guard for an active target group. Holds the shared stack, not a
/// borrow of the context, so the context stays freely usable while the guard
/// is alive.
pub struct TargetScope {
    stack: Rc<RefCell<Vec<Vec<String>>>>,
}

impl Drop for TargetScope {
    fn drop(&mut self) {
        self.stack.borrow_mut().pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_vivify_empty_globals() {
        let mut ctx = JamContext::captured();
        assert!(ctx.value_of("never_written").is_empty());
    }

    #[test]
    fn assign_and_read_back() {
        let mut ctx = JamContext::captured();
        ctx.assign_global("v", AssignOp::Assign, &JamList::from_slice(&["a"]));
        ctx.assign_global("v", AssignOp::Append, &JamList::from_slice(&["b"]));
        assert_eq!(ctx.value_of("v"), JamList::from_slice(&["a", "b"]));
    }

    #[test]
    fn indirect_assignment_targets_every_name() {
        let mut ctx = JamContext::captured();
        let names = JamList::from_slice(&["x", "y"]);
        ctx.assign_indirect(&names, AssignOp::Assign, &JamList::single("v"));
        assert_eq!(ctx.value_of("x"), JamList::single("v"));
        assert_eq!(ctx.value_of("y"), JamList::single("v"));
    }

    #[test]
    fn overlay_read_inside_active_target() {
        let mut ctx = JamContext::captured();
        ctx.assign_global("v", AssignOp::Assign, &JamList::single("global"));
        ctx.assign_on_target(
            &JamList::single("v"),
            &JamList::single("t1"),
            AssignOp::Assign,
            &JamList::single("scoped"),
        );

        assert_eq!(ctx.value_of("v"), JamList::single("global"));
        {
            let _scope = ctx.enter_targets(&JamList::single("t1"));
            assert_eq!(ctx.value_of("v"), JamList::single("scoped"));
        }
        assert_eq!(ctx.value_of("v"), JamList::single("global"));
    }

    #[test]
    fn overlay_misses_fall_through_to_globals() {
        let mut ctx = JamContext::captured();
        ctx.assign_global("v", AssignOp::Assign, &JamList::single("global"));
        let _scope = ctx.enter_targets(&JamList::single("t1"));
        assert_eq!(ctx.value_of("v"), JamList::single("global"));
    }

    #[test]
    fn bare_writes_inside_on_block_hit_the_global_store() {
        let mut ctx = JamContext::captured();
        ctx.assign_on_target(
            &JamList::single("v"),
            &JamList::single("t1"),
            AssignOp::Assign,
            &JamList::single("scoped"),
        );
        {
            let _scope = ctx.enter_targets(&JamList::single("t1"));
            // A bare-name write bypasses the overlay entirely.
            ctx.assign_global("v", AssignOp::Assign, &JamList::single("written"));
            assert_eq!(ctx.value_of("v"), JamList::single("scoped"));
        }
        assert_eq!(ctx.value_of("v"), JamList::single("written"));
    }

    #[test]
    fn target_groups_nest() {
        let mut ctx = JamContext::captured();
        ctx.assign_on_target(
            &JamList::single("v"),
            &JamList::single("outer"),
            AssignOp::Assign,
            &JamList::single("o"),
        );
        ctx.assign_on_target(
            &JamList::single("v"),
            &JamList::single("inner"),
            AssignOp::Assign,
            &JamList::single("i"),
        );
        let _outer = ctx.enter_targets(&JamList::single("outer"));
        {
            let _inner = ctx.enter_targets(&JamList::single("inner"));
            assert_eq!(ctx.value_of("v"), JamList::single("i"));
        }
        assert_eq!(ctx.value_of("v"), JamList::single("o"));
    }

    #[test]
    fn reexpansion_substitutes_named_variables() {
        let mut ctx = JamContext::captured();
        ctx.assign_global("name", AssignOp::Assign, &JamList::single("harry"));
        assert_eq!(
            ctx.reexpand(&JamList::single("$(name)")),
            JamList::single("harry")
        );
        assert_eq!(
            ctx.reexpand(&JamList::single("pre_$(name)_post")),
            JamList::single("pre_harry_post")
        );
        // Plain elements pass through; unknown names absorb the element.
        assert_eq!(
            ctx.reexpand(&JamList::from_slice(&["plain", "$(missing)"])),
            JamList::single("plain")
        );
    }

    #[test]
    fn reexpansion_cross_products_multi_element_values() {
        let mut ctx = JamContext::captured();
        ctx.assign_global("v", AssignOp::Assign, &JamList::from_slice(&["a", "b"]));
        assert_eq!(
            ctx.reexpand(&JamList::single("x$(v)")),
            JamList::from_slice(&["xa", "xb"])
        );
    }

    #[test]
    fn dynamic_dispatch_skips_unknown_names() {
        fn yes(_: &mut JamContext, _: &[JamList]) -> JamList {
            JamList::single("yes")
        }
        let mut ctx = JamContext::captured();
        ctx.register_rule("Yes", yes);
        let result = ctx.invoke_dynamic(&JamList::from_slice(&["Yes", "Nope"]), &[]);
        assert_eq!(result, JamList::single("yes"));
    }

    #[test]
    fn actions_invocations_are_recorded() {
        let mut ctx = JamContext::captured();
        ctx.register_actions("clean", &[], &["rm -rf $(1)"]);
        let result = ctx.invoke_dynamic(&JamList::single("clean"), &[JamList::single("tgt")]);
        assert!(result.is_empty());
        assert_eq!(ctx.invoked_actions().len(), 1);
        assert_eq!(ctx.invoked_actions()[0].name, "clean");
        assert_eq!(ctx.invoked_actions()[0].targets, JamList::single("tgt"));
    }

    #[test]
    fn unknown_units_go_to_the_legacy_log() {
        let mut ctx = JamContext::captured();
        ctx.run_unit(&JamList::single("legacy.jam"));
        assert_eq!(ctx.legacy_includes(), ["legacy.jam"]);
    }

    #[test]
    fn echo_is_captured_with_a_newline() {
        let mut ctx = JamContext::captured();
        ctx.echo(&JamList::from_slice(&["a", "b"]));
        ctx.echo(&JamList::new());
        assert_eq!(ctx.take_output(), "a b\n\n");
    }
}
