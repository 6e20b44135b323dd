//! The task transformation
//!
//! A `task`-qualified function is compiled into ordinary void step
//! functions plus promoted globals. The work happens in two passes over
//! each task body:
//!
//! - Pass 1 walks the body once, renaming every local to a fresh global
//!   `<task>_var<k>_<orig>`, collecting the promoted declarations, and
//!   registering a step record at every suspension point: after a call to
//!   another task, at the entry of `queue for` and `poll`, and at an
//!   `at most` clause. Each step captures the trace of statements from the
//!   boundary out to the body, so continuations can be reassembled.
//! - Pass 2 rewrites statement lists: a promoted declaration with an
//!   initializer becomes an assignment at its original position, and one
//!   whose initializer is a task call becomes
//!   `os_call_task(<callee>, <caller>, <step>)`, which also terminates the
//!   current step. Statement-level task calls are lowered the same way.
//!   Statement forms the rewriting does not cover are reported and
//!   skipped; compilation continues.
//!
//! Task ids are assigned in declaration order starting at 1; id 0 belongs
//! to the runtime's main queue.

use crate::arena::Arena;
use crate::ast::{
    Node, NodeId, Value, ARG_LIST, ASSIGNMENT, ASSIGN_OP, BODY, CALL, DECL, DECLARATION,
    DECL_INIT, SEMI, STMT_LIST, TreeTag,
};
use crate::intern::{Interner, Name};
use crate::sink::Sink;
use crate::text::TextPos;
use crate::unparse::Unparser;

/// The `return` statement tag, matching the grammar's.
const RET: TreeTag = TreeTag::new("ret", "return%*;");

/// One cooperative slice of a task between two suspension points.
#[derive(Debug)]
pub struct Step {
    /// The generated function name, `<task>_step<k>`
    pub name: Name,
    /// Statements from the body down to the boundary, outermost first;
    /// the last entry is the boundary statement itself
    pub trace: Vec<Value>,
}

/// A registered task.
#[derive(Debug)]
pub struct Task {
    /// The original function name
    pub name: Name,
    /// Scheduler id; 0 is reserved for the main queue
    pub id: u32,
    /// The `<task>_result` global, absent for `void` tasks
    pub result_var: Option<Name>,
    /// Locals promoted so far
    pub n_locals: u32,
    /// Steps in source order
    pub steps: Vec<Step>,
    /// The parsed declaration this task came from
    decl: Value,
}

/// The transformation state.
pub struct Compiler<'a> {
    arena: &'a mut Arena,
    interner: &'a mut Interner,
    tasks: Vec<Task>,
    new_globals: Vec<Value>,
    diagnostics: Vec<String>,
}

/// Compile a parsed program: transform every task and write the resulting
/// C program to `out`. Returns the diagnostics that were emitted.
pub fn compile(
    arena: &mut Arena,
    interner: &mut Interner,
    root: Value,
    out: &mut dyn Sink,
) -> Vec<String> {
    let mut compiler = Compiler {
        arena,
        interner,
        tasks: Vec::new(),
        new_globals: Vec::new(),
        diagnostics: Vec::new(),
    };
    compiler.register_tasks(root);
    for t in 0..compiler.tasks.len() {
        compiler.pass1_task(t);
    }
    compiler.emit(root, out);
    compiler.diagnostics
}

impl<'a> Compiler<'a> {
    fn diag(&mut self, message: String) {
        log::warn!("{message}");
        self.diagnostics.push(message);
    }

    // ------------------------------------------------------------------
    // Synthesized nodes
    // ------------------------------------------------------------------

    fn new_ident(&mut self, name: Name) -> Value {
        Value::Node(self.arena.alloc(Node::Ident {
            name,
            keyword: false,
            pos: TextPos::default(),
        }))
    }

    fn new_int(&mut self, value: i64) -> Value {
        Value::Node(self.arena.alloc(Node::Int {
            value,
            pos: TextPos::default(),
        }))
    }

    fn make(&mut self, tag: TreeTag, children: Vec<Value>) -> Value {
        Value::Node(self.arena.make_tree_with(tag, children))
    }

    /// `os_call_task(<callee>, <caller>, <step>);`
    fn make_scheduler_call(&mut self, callee_id: u32, caller_id: u32, step: Name) -> Value {
        let os_call = self.interner.intern("os_call_task");
        let fn_ident = self.new_ident(os_call);
        let callee = self.new_int(i64::from(callee_id));
        let caller = self.new_int(i64::from(caller_id));
        let step = self.new_ident(step);
        let args = self.make(ARG_LIST, vec![callee, caller, step]);
        let call = self.make(CALL, vec![fn_ident, args]);
        self.make(SEMI, vec![call])
    }

    // ------------------------------------------------------------------
    // Task registry
    // ------------------------------------------------------------------

    /// Whether the declaration's specifier list starts with `task`.
    fn is_task_decl(&self, decl: Value) -> bool {
        match self.arena.tree_child(decl, 1) {
            Some(types) if self.arena.list_tree_of(types).is_some() => {
                matches!(self.arena.tree_child(types, 1), Some(first) if self.arena.tree_is(first, "task"))
            }
            _ => false,
        }
    }

    fn ident_name(&self, v: Value) -> Option<Name> {
        let id = self.arena.node_of(v)?;
        match self.arena.node(id) {
            Node::Ident { name, .. } => Some(*name),
            _ => None,
        }
    }

    /// First pass over the top-level declarations: assign ids to every
    /// task and create the result globals for non-void tasks.
    fn register_tasks(&mut self, root: Value) {
        let decls = self.arena.tree_children(root);
        for decl in decls {
            if !self.arena.tree_is(decl, "declaration") || !self.is_task_decl(decl) {
                continue;
            }
            let Some(def) = self.arena.tree_child(decl, 2) else {
                continue;
            };
            if !self.arena.tree_is(def, "new_style") {
                self.diag("task qualifier on something that is not a function definition".into());
                continue;
            }
            let Some(name) = self.arena.tree_child(def, 1).and_then(|v| self.ident_name(v))
            else {
                self.diag("task function has no plain name".into());
                continue;
            };

            let types = self.arena.tree_child(decl, 1).expect("checked by is_task_decl");
            let result_type = self.arena.tree_child(types, 2);
            let returns_void = match result_type {
                None | Some(Value::None) => true,
                Some(ty) => self.arena.tree_is(ty, "void"),
            };

            let id = self.tasks.len() as u32 + 1;
            let result_var = if returns_void {
                None
            } else {
                let base = self.interner.resolve(name).to_owned();
                let var = self.interner.intern(&format!("{base}_result"));
                let ty = result_type.expect("non-void implies a type");
                let ty_list = self.make(crate::ast::LIST, vec![ty]);
                let var_ident = self.new_ident(var);
                let decl_init = self.make(DECL_INIT, vec![var_ident, Value::None]);
                let var_decl = self.make(DECL, vec![decl_init]);
                let global = self.make(DECLARATION, vec![ty_list, var_decl]);
                self.new_globals.push(global);
                Some(var)
            };

            log::debug!(
                "task {} gets id {id}",
                self.interner.resolve(name)
            );
            self.tasks.push(Task {
                name,
                id,
                result_var,
                n_locals: 0,
                steps: Vec::new(),
                decl,
            });
        }
    }

    fn find_task(&self, name: Name) -> Option<usize> {
        self.tasks.iter().position(|t| t.name == name)
    }

    /// The task a call expression targets, when the callee is a plain
    /// identifier naming a registered task.
    fn task_of_call(&self, v: Value) -> Option<usize> {
        if !self.arena.tree_is(v, "call") {
            return None;
        }
        let callee = self.arena.tree_child(v, 1)?;
        self.find_task(self.ident_name(callee)?)
    }

    /// Whether an expression statement is a suspension point: a direct
    /// task call, or an assignment whose right side is one.
    fn boundary_of_expr(&self, v: Value) -> Option<usize> {
        if let Some(t) = self.task_of_call(v) {
            return Some(t);
        }
        if self.arena.tree_is(v, "assignment") {
            if let Some(rhs) = self.arena.tree_child(v, 3) {
                return self.task_of_call(rhs);
            }
        }
        None
    }

    // ------------------------------------------------------------------
    // Pass 1: discovery and local promotion
    // ------------------------------------------------------------------

    fn add_step(&mut self, t: usize, trace: &[Value]) {
        let base = self.interner.resolve(self.tasks[t].name).to_owned();
        let nr = self.tasks[t].steps.len() + 1;
        let name = self.interner.intern(&format!("{base}_step{nr}"));
        self.tasks[t].steps.push(Step {
            name,
            trace: trace.to_vec(),
        });
    }

    fn pass1_task(&mut self, t: usize) {
        let decl = self.tasks[t].decl;
        let Some(body) = self
            .arena
            .tree_child(decl, 2)
            .and_then(|def| self.arena.tree_child(def, 3))
        else {
            return;
        };
        if !self.arena.tree_is(body, "body") {
            // A forward declaration has no body to transform.
            return;
        }
        let Some(stmts) = self.arena.tree_child(body, 1) else {
            return;
        };
        let mut trace = Vec::new();
        let mut vars = Vec::new();
        self.pass1_stmt(t, stmts, &mut trace, &mut vars);
    }

    /// Rewrite identifiers inside an expression through the rename context.
    fn pass1_expr(&mut self, v: Value, vars: &[(Name, Name)]) {
        let Some(id) = self.arena.node_of(v) else { return };
        match self.arena.node(id) {
            Node::Ident { name, .. } => {
                let name = *name;
                if let Some(&(_, global)) = vars.iter().rev().find(|(orig, _)| *orig == name) {
                    log::trace!(
                        "renaming {} to {}",
                        self.interner.resolve(name),
                        self.interner.resolve(global)
                    );
                    if let Node::Ident { name: slot, .. } = self.arena.node_mut(id) {
                        *slot = global;
                    }
                }
            }
            Node::Tree { children, .. } => {
                let children = children.clone();
                for child in children {
                    self.pass1_expr(child, vars);
                }
            }
            _ => {}
        }
    }

    fn pass1_stmt(
        &mut self,
        t: usize,
        stmt: Value,
        trace: &mut Vec<Value>,
        vars: &mut Vec<(Name, Name)>,
    ) {
        let Some(tree) = self.arena.tree_of(stmt) else {
            return;
        };
        trace.push(stmt);
        let tag = self.tree_name(tree);
        match tag {
            "list" | "statements" => {
                let scope_base = vars.len();
                let n = self.arena.tree_arity(stmt);
                for i in 1..=n {
                    let Some(child) = self.arena.tree_child(stmt, i) else {
                        continue;
                    };
                    if self.arena.tree_is(child, "declaration") {
                        self.pass1_decl(t, child, trace, vars);
                    } else {
                        self.pass1_stmt(t, child, trace, vars);
                    }
                }
                vars.truncate(scope_base);
            }
            "if" => {
                if let Some(cond) = self.arena.tree_child(stmt, 1) {
                    self.pass1_expr(cond, vars);
                }
                if let Some(then) = self.arena.tree_child(stmt, 2) {
                    self.pass1_stmt(t, then, trace, vars);
                }
                if let Some(else_part) = self.arena.tree_child(stmt, 3) {
                    if let Some(else_stmt) = self.arena.tree_child(else_part, 1) {
                        self.pass1_stmt(t, else_stmt, trace, vars);
                    }
                }
            }
            "queuefor" => {
                self.add_step(t, trace);
                if let Some(body) = self.arena.tree_child(stmt, 2) {
                    self.pass1_stmt(t, body, trace, vars);
                }
            }
            "poll" => {
                self.add_step(t, trace);
                if let Some(body) = self.arena.tree_child(stmt, 1) {
                    self.pass1_stmt(t, body, trace, vars);
                }
                if let Some(atmost) = self.arena.tree_child(stmt, 2) {
                    if self.arena.tree_is(atmost, "atmost") {
                        trace.push(atmost);
                        self.add_step(t, trace);
                        if let Some(limit) = self.arena.tree_child(atmost, 1) {
                            self.pass1_expr(limit, vars);
                        }
                        if let Some(handler) = self.arena.tree_child(atmost, 2) {
                            self.pass1_stmt(t, handler, trace, vars);
                        }
                        trace.pop();
                    }
                }
            }
            "semi" => {
                if let Some(expr) = self.arena.tree_child(stmt, 1) {
                    self.pass1_expr(expr, vars);
                    if self.boundary_of_expr(expr).is_some() {
                        self.add_step(t, trace);
                    }
                }
            }
            "ret" => {
                if let Some(expr) = self.arena.tree_child(stmt, 1) {
                    self.pass1_expr(expr, vars);
                }
            }
            other => {
                let task = self.interner.resolve(self.tasks[t].name).to_owned();
                self.diag(format!(
                    "task {task}: statement form {other:?} is not analyzed"
                ));
            }
        }
        trace.pop();
    }

    /// Promote one local declaration: rename the variable, move the typed
    /// declaration to the globals list, and register a step when the
    /// initializer is a task call.
    fn pass1_decl(
        &mut self,
        t: usize,
        decl_stmt: Value,
        trace: &mut Vec<Value>,
        vars: &mut Vec<(Name, Name)>,
    ) {
        let types = self.arena.tree_child(decl_stmt, 1).unwrap_or(Value::None);
        let Some(decl) = self.arena.tree_child(decl_stmt, 2) else {
            return;
        };
        let Some(decl_init) = self.arena.tree_child(decl, 1) else {
            return;
        };
        let init_tree = self
            .arena
            .tree_child(decl_init, 2)
            .filter(|v| self.arena.tree_is(*v, "init"));
        if let Some(init) = init_tree {
            self.pass1_expr(init, vars);
        }
        let init_expr = init_tree.and_then(|init| self.arena.tree_child(init, 1));
        let callee = init_expr.and_then(|e| self.task_of_call(e));

        let var = self.arena.tree_child(decl_init, 1).unwrap_or(Value::None);
        match self.ident_name(var) {
            Some(orig) => {
                let base = self.interner.resolve(self.tasks[t].name).to_owned();
                let orig_text = self.interner.resolve(orig).to_owned();
                self.tasks[t].n_locals += 1;
                let k = self.tasks[t].n_locals;
                let global = self.interner.intern(&format!("{base}_var{k}_{orig_text}"));
                vars.push((orig, global));
                if let Some(id) = self.arena.node_of(var) {
                    if let Node::Ident { name, .. } = self.arena.node_mut(id) {
                        *name = global;
                    }
                }

                // The promoted declaration keeps its initializer unless it
                // is a task call; the call stays at the original site as a
                // scheduler call.
                let kept_init = match (init_tree, callee) {
                    (Some(init), None) => init,
                    _ => Value::None,
                };
                let g_ident = self.new_ident(global);
                let g_init = self.make(DECL_INIT, vec![g_ident, kept_init]);
                let g_decl = self.make(DECL, vec![g_init]);
                let global_decl = self.make(DECLARATION, vec![types, g_decl]);
                self.new_globals.push(global_decl);
            }
            None => {
                let task = self.interner.resolve(self.tasks[t].name).to_owned();
                self.diag(format!(
                    "task {task}: declarator is not a plain variable; not promoted"
                ));
            }
        }

        if callee.is_some() {
            trace.push(decl_stmt);
            self.add_step(t, trace);
            trace.pop();
        }
    }

    fn tree_name(&self, id: NodeId) -> &'static str {
        match self.arena.node(id) {
            Node::Tree { tag, .. } => tag.name,
            _ => "",
        }
    }

    // ------------------------------------------------------------------
    // Pass 2: body rewriting
    // ------------------------------------------------------------------

    /// The step whose boundary is exactly this statement.
    fn step_at(&self, t: usize, stmt: Value) -> Option<Name> {
        self.tasks[t]
            .steps
            .iter()
            .find(|s| s.trace.last() == Some(&stmt))
            .map(|s| s.name)
    }

    /// Whether any registered step boundary lies inside this statement.
    fn contains_boundary(&self, t: usize, stmt: Value) -> bool {
        self.tasks[t]
            .steps
            .iter()
            .any(|s| s.trace.contains(&stmt))
    }

    /// Rewrite one statement into `out`. Returns true when the statement
    /// was a suspension point terminating the current step.
    fn pass2_one(&mut self, t: usize, stmt: Value, out: &mut Vec<Value>) -> bool {
        let Some(tree) = self.arena.tree_of(stmt) else {
            return false;
        };
        match self.tree_name(tree) {
            "list" | "statements" => {
                let n = self.arena.tree_arity(stmt);
                for i in 1..=n {
                    let Some(child) = self.arena.tree_child(stmt, i) else {
                        continue;
                    };
                    if self.pass2_one(t, child, out) {
                        return true;
                    }
                }
                false
            }
            "declaration" => self.pass2_decl(t, stmt, out),
            "semi" => {
                let expr = self.arena.tree_child(stmt, 1);
                if let Some(callee) = expr.and_then(|e| self.boundary_of_expr(e)) {
                    let caller_id = self.tasks[t].id;
                    let callee_id = self.tasks[callee].id;
                    match self.step_at(t, stmt) {
                        Some(step) => {
                            let call = self.make_scheduler_call(callee_id, caller_id, step);
                            out.push(call);
                        }
                        None => {
                            let task = self.interner.resolve(self.tasks[t].name).to_owned();
                            self.diag(format!("task {task}: no step registered for a task call"));
                        }
                    }
                    true
                } else {
                    out.push(stmt);
                    false
                }
            }
            "if" => {
                if self.contains_boundary(t, stmt) {
                    let task = self.interner.resolve(self.tasks[t].name).to_owned();
                    self.diag(format!(
                        "task {task}: conditional with a suspension point inside is not rewritten; skipped"
                    ));
                    false
                } else {
                    out.push(stmt);
                    false
                }
            }
            "queuefor" | "poll" => {
                let task = self.interner.resolve(self.tasks[t].name).to_owned();
                let form = self.tree_name(tree);
                self.diag(format!(
                    "task {task}: {form:?} body is not rewritten; skipped"
                ));
                true
            }
            "ret" => {
                // A task returns through its result variable; the step
                // functions themselves are void.
                let expr = self.arena.tree_child(stmt, 1).filter(|v| *v != Value::None);
                match (expr, self.tasks[t].result_var) {
                    (Some(expr), Some(result_var)) => {
                        let var = self.new_ident(result_var);
                        let op = self.make(ASSIGN_OP, vec![]);
                        let assign = self.make(ASSIGNMENT, vec![var, op, expr]);
                        let semi = self.make(SEMI, vec![assign]);
                        out.push(semi);
                        let bare = self.make(RET, vec![Value::None]);
                        out.push(bare);
                    }
                    _ => out.push(stmt),
                }
                false
            }
            _ => {
                out.push(stmt);
                false
            }
        }
    }

    /// The defined declaration rewrites: an initializer becomes an
    /// assignment, a task-call initializer becomes the scheduler call and
    /// ends the step.
    fn pass2_decl(&mut self, t: usize, stmt: Value, out: &mut Vec<Value>) -> bool {
        let Some(decl_init) = self
            .arena
            .tree_child(stmt, 2)
            .and_then(|decl| self.arena.tree_child(decl, 1))
        else {
            return false;
        };
        let init_expr = self
            .arena
            .tree_child(decl_init, 2)
            .filter(|v| self.arena.tree_is(*v, "init"))
            .and_then(|init| self.arena.tree_child(init, 1));
        let Some(init_expr) = init_expr else {
            return false;
        };

        if let Some(callee) = self.task_of_call(init_expr) {
            let caller_id = self.tasks[t].id;
            let callee_id = self.tasks[callee].id;
            match self.step_at(t, stmt) {
                Some(step) => {
                    let call = self.make_scheduler_call(callee_id, caller_id, step);
                    out.push(call);
                }
                None => {
                    let task = self.interner.resolve(self.tasks[t].name).to_owned();
                    self.diag(format!("task {task}: no step registered for a call initializer"));
                }
            }
            return true;
        }

        let var = self.arena.tree_child(decl_init, 1).unwrap_or(Value::None);
        let op = self.make(ASSIGN_OP, vec![]);
        let assign = self.make(ASSIGNMENT, vec![var, op, init_expr]);
        let semi = self.make(SEMI, vec![assign]);
        out.push(semi);
        false
    }

    /// The statements a step continues with: at every enclosing statement
    /// list on the boundary's trace, the statements after the trace child.
    fn continuation_of(&self, t: usize, step_idx: usize) -> Vec<Value> {
        let trace = &self.tasks[t].steps[step_idx].trace;
        let mut out = Vec::new();
        for pair in trace.windows(2).rev() {
            let (parent, child) = (pair[0], pair[1]);
            let Some(parent_tree) = self.arena.tree_of(parent) else {
                continue;
            };
            if !matches!(self.tree_name(parent_tree), "list" | "statements") {
                continue;
            }
            let n = self.arena.tree_arity(parent);
            let mut seen = false;
            for i in 1..=n {
                let Some(c) = self.arena.tree_child(parent, i) else {
                    continue;
                };
                if seen {
                    out.push(c);
                } else if c == child {
                    seen = true;
                }
            }
        }
        out
    }

    // ------------------------------------------------------------------
    // Emission
    // ------------------------------------------------------------------

    /// The rewritten entry body of a task.
    fn entry_statements(&mut self, t: usize) -> Vec<Value> {
        let decl = self.tasks[t].decl;
        let mut out = Vec::new();
        if let Some(stmts) = self
            .arena
            .tree_child(decl, 2)
            .and_then(|def| self.arena.tree_child(def, 3))
            .and_then(|body| self.arena.tree_child(body, 1))
        {
            self.pass2_one(t, stmts, &mut out);
        }
        out
    }

    /// The rewritten body of one step.
    fn step_statements(&mut self, t: usize, step_idx: usize) -> Vec<Value> {
        let mut out = Vec::new();
        for stmt in self.continuation_of(t, step_idx) {
            if self.pass2_one(t, stmt, &mut out) {
                break;
            }
        }
        out
    }

    fn emit_function(
        &mut self,
        name: Name,
        statements: Vec<Value>,
        up: &mut Unparser,
        out: &mut dyn Sink,
    ) {
        let list = self.make(STMT_LIST, statements);
        let body = self.make(BODY, vec![list]);
        up.text(&format!("void {}(void)\n", self.interner.resolve(name)), out);
        up.unparse(self.arena, self.interner, body, out);
    }

    fn emit(&mut self, root: Value, out: &mut dyn Sink) {
        let mut up = Unparser::new();

        // Promoted globals come before any task code.
        let globals = self.new_globals.clone();
        for global in globals {
            up.unparse(self.arena, self.interner, global, out);
        }

        // Prototypes for every entry and step function.
        if !self.tasks.is_empty() {
            for t in 0..self.tasks.len() {
                let entry = self.tasks[t].name;
                up.text(
                    &format!("void {}(void);\n", self.interner.resolve(entry)),
                    out,
                );
                let steps: Vec<Name> = self.tasks[t].steps.iter().map(|s| s.name).collect();
                for step in steps {
                    up.text(
                        &format!("void {}(void);\n", self.interner.resolve(step)),
                        out,
                    );
                }
            }
            up.text("\n", out);
        }

        // Top-level items in source order; a task declaration is replaced
        // by its entry function and its steps.
        let decls = self.arena.tree_children(root);
        for decl in decls {
            match self.tasks.iter().position(|t| t.decl == decl) {
                Some(t) => {
                    let entry_stmts = self.entry_statements(t);
                    let entry_name = self.tasks[t].name;
                    self.emit_function(entry_name, entry_stmts, &mut up, out);
                    for s in 0..self.tasks[t].steps.len() {
                        let stmts = self.step_statements(t, s);
                        let name = self.tasks[t].steps[s].name;
                        self.emit_function(name, stmts, &mut up, out);
                    }
                }
                None => up.unparse(self.arena, self.interner, decl, out),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::c_grammar::c_grammar;
    use crate::parser::Parser;

    fn compile_source(source: &str) -> (String, Vec<String>) {
        let mut interner = Interner::new();
        let grammar = c_grammar(&mut interner);
        let mut arena = Arena::new();
        let root = {
            let mut parser = Parser::new(&grammar, source.as_bytes(), &mut arena, &mut interner);
            parser.parse("root").unwrap_or_else(|e| panic!("source should parse: {e}"))
        };
        let mut out = Vec::new();
        let diagnostics = compile(&mut arena, &mut interner, root, &mut out);
        (String::from_utf8(out).unwrap(), diagnostics)
    }

    #[test]
    fn test_task_call_promotion() {
        let source = "task int g(void) { return 1; }\n\ntask int f(void) { int x = g(); }\n";
        let (output, _) = compile_source(source);
        // Result globals for both non-void tasks.
        assert!(output.contains("int g_result;"), "output:\n{output}");
        assert!(output.contains("int f_result;"), "output:\n{output}");
        // The promoted local, with no initializer.
        assert!(output.contains("int f_var1_x;"), "output:\n{output}");
        // The continuation step exists and is declared.
        assert!(output.contains("void f_step1(void);"), "output:\n{output}");
        assert!(output.contains("void f_step1(void)\n"), "output:\n{output}");
        // The original declaration site became a scheduler call: g is task
        // 1, f is task 2.
        assert!(
            output.contains("os_call_task(1, 2, f_step1);"),
            "output:\n{output}"
        );
    }

    #[test]
    fn test_local_promotion_and_rename() {
        let source = "task void h(void) { int y = 1; y = y + 2; }\n";
        let (output, _) = compile_source(source);
        assert!(output.contains("int h_var1_y = 1;"), "output:\n{output}");
        // The declaration site became an assignment to the global name,
        // and the later use was renamed.
        assert!(output.contains("h_var1_y = 1;"), "output:\n{output}");
        assert!(output.contains("h_var1_y = h_var1_y + 2;"), "output:\n{output}");
        // A void task gets no result variable.
        assert!(!output.contains("h_result"), "output:\n{output}");
    }

    #[test]
    fn test_statement_level_task_call() {
        let source = "task void g(void) { ; }\n\ntask void m(void) { g(); x = 1; }\n";
        let (output, _) = compile_source(source);
        assert!(output.contains("os_call_task(1, 2, m_step1);"), "output:\n{output}");
        // The statement after the boundary belongs to the continuation.
        let step_pos = output.find("void m_step1(void)\n").expect("step body emitted");
        let assign_pos = output.rfind("x = 1;").expect("continuation statement emitted");
        assert!(assign_pos > step_pos, "output:\n{output}");
    }

    #[test]
    fn test_step_numbering_in_source_order() {
        let source =
            "task void g(void) { ; }\n\ntask void f(void) { g(); g(); queue for q ; }\n";
        let (output, _) = compile_source(source);
        assert!(output.contains("void f_step1(void);"), "output:\n{output}");
        assert!(output.contains("void f_step2(void);"), "output:\n{output}");
        assert!(output.contains("void f_step3(void);"), "output:\n{output}");
        assert!(!output.contains("f_step4"), "output:\n{output}");
    }

    #[test]
    fn test_poll_and_atmost_register_steps() {
        let source = "task void f(void) { poll { ; } at most (10) { ; } }\n";
        let (output, diagnostics) = compile_source(source);
        // One step for the poll entry, one for the timeout handler.
        assert!(output.contains("void f_step1(void);"), "output:\n{output}");
        assert!(output.contains("void f_step2(void);"), "output:\n{output}");
        // The poll body itself is not lowered yet; that is reported.
        assert!(
            diagnostics.iter().any(|d| d.contains("poll")),
            "diagnostics: {diagnostics:?}"
        );
    }

    #[test]
    fn test_unhandled_statement_form_is_reported() {
        let source = "task void f(void) { while (1) ; }\n";
        let (_, diagnostics) = compile_source(source);
        assert!(
            diagnostics.iter().any(|d| d.contains("while")),
            "diagnostics: {diagnostics:?}"
        );
    }

    #[test]
    fn test_non_task_declarations_pass_through() {
        let source = "int counter;\n\nint twice(int n) { return n + n; }\n";
        let (output, diagnostics) = compile_source(source);
        assert!(diagnostics.is_empty(), "diagnostics: {diagnostics:?}");
        assert!(output.contains("int counter;"), "output:\n{output}");
        assert!(output.contains("twice"), "output:\n{output}");
        assert!(!output.contains("os_call_task"), "output:\n{output}");
    }

    #[test]
    fn test_task_ids_start_at_one() {
        let source = "task void a(void) { ; }\n\ntask void b(void) { a(); }\n";
        let (output, _) = compile_source(source);
        // a is task 1, b is task 2; queue 0 stays free for the runtime.
        assert!(output.contains("os_call_task(1, 2, b_step1);"), "output:\n{output}");
    }
}
