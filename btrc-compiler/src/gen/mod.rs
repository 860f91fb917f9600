// IR Generator: main struct and module-level orchestration.
//
// Walks an AnalyzedProgram → IrModule. All lowering happens here and
// in the sub-modules.

use btrc_ast::*;
use btrc_resolver::AnalyzedProgram;
use indexmap::{IndexMap, IndexSet};
use std::collections::HashMap;

use crate::ir::*;

pub mod arc;
pub mod calls;
pub mod class_members;
pub mod classes;
pub mod collections;
pub mod control_flow;
pub mod enums;
pub mod expressions;
pub mod fields;
pub mod fstrings;
pub mod functions;
pub mod generics;
pub mod helpers;
pub mod iterations;
pub mod lambdas;
pub mod methods;
pub mod operators;
pub mod statements;
pub mod threads;
pub mod types;

use types::{is_concrete_instance, mangle_generic_type, mangle_tuple_type, resolve_type};

const STANDARD_INCLUDES: &[&str] = &[
    "stdio.h", "stdlib.h", "string.h", "stdbool.h", "stdint.h", "ctype.h", "math.h", "assert.h",
];

/// Capture environment produced by lowering a lambda initializer;
/// consumed by the enclosing var-decl lowering.
pub(crate) struct PendingLambda {
    pub fn_name: String,
    pub env_struct: Option<String>,
    pub captures: Vec<(String, String)>, // (name, c_type)
}

pub struct IrGenerator<'a> {
    pub analyzed: &'a AnalyzedProgram,
    pub module: IrModule,
    pub(crate) debug: bool,
    pub(crate) source_file: String,
    temp_counter: u32,
    lambda_counter: u32,
    pub(crate) used_helpers: IndexSet<String>,
    /// ARC: stack of managed scopes; each holds (var_name, class_name)
    /// for locals that own a reference to a class instance.
    pub(crate) managed_stack: Vec<Vec<(String, String)>>,
    /// Current class context (for method lowering).
    pub(crate) current_class: Option<String>,
    /// Active generic substitution (T → concrete) during
    /// monomorphized method lowering.
    pub(crate) type_map: IndexMap<String, TypeExpr>,
    pub(crate) fn_ptr_typedefs: IndexMap<String, String>,
    /// Captured-lambda locals: var name → (impl fn, env var). Calls
    /// through these bypass the function pointer and pass the env.
    pub(crate) fn_ptr_envs: HashMap<String, (String, String)>,
    pub(crate) pending_lambda: Option<PendingLambda>,
    pub(crate) in_try_depth: usize,
    /// Working copy of the resolver's instances — the monomorphizer
    /// appends transitive discoveries here.
    pub(crate) generic_instances: IndexMap<String, Vec<Vec<TypeExpr>>>,
    pub(crate) current_fn_keep_return: bool,
}

impl<'a> IrGenerator<'a> {
    pub fn new(analyzed: &'a AnalyzedProgram, debug: bool, source_file: &str) -> Self {
        Self {
            analyzed,
            module: IrModule::default(),
            debug,
            source_file: source_file.to_string(),
            temp_counter: 0,
            lambda_counter: 0,
            used_helpers: IndexSet::new(),
            managed_stack: Vec::new(),
            current_class: None,
            type_map: IndexMap::new(),
            fn_ptr_typedefs: IndexMap::new(),
            fn_ptr_envs: HashMap::new(),
            pending_lambda: None,
            in_try_depth: 0,
            generic_instances: analyzed.generic_instances.clone(),
            current_fn_keep_return: false,
        }
    }

    /// Generate the complete IR module from the analyzed program.
    pub fn generate(mut self) -> IrModule {
        log::debug!("generating IR for {} (debug={})", self.source_file, self.debug);
        self.emit_includes();
        self.emit_forward_decls();
        self.emit_structs();
        generics::emit_generic_instances(&mut self);
        enums::emit_enum_decls(&mut self);
        self.emit_declarations();
        self.emit_fn_ptr_typedefs();
        helpers::collect_helpers(&mut self);
        self.module
    }

    pub(crate) fn fresh_temp(&mut self, prefix: &str) -> String {
        self.temp_counter += 1;
        format!("{}_{}", prefix, self.temp_counter)
    }

    pub(crate) fn fresh_lambda_id(&mut self) -> u32 {
        self.lambda_counter += 1;
        self.lambda_counter
    }

    /// Mark a runtime helper as used.
    pub(crate) fn use_helper(&mut self, name: &str) {
        self.used_helpers.insert(name.to_string());
    }

    /// Inferred type of an AST expression, with the active generic
    /// substitution applied.
    pub(crate) fn node_type(&self, id: NodeId) -> Option<TypeExpr> {
        let t = self.analyzed.node_types.get(&id)?;
        if self.type_map.is_empty() {
            Some(t.clone())
        } else {
            Some(resolve_type(t, &self.type_map))
        }
    }

    /// C type string for a surface type, substitutions applied and
    /// user classes pointered.
    pub(crate) fn ctype(&mut self, t: Option<&TypeExpr>) -> String {
        let resolved = t.map(|t| {
            if self.type_map.is_empty() {
                t.clone()
            } else {
                resolve_type(t, &self.type_map)
            }
        });
        // Opaque handle typedefs must precede any signature that
        // names them.
        if let Some(t) = resolved.as_ref() {
            match t.base.as_str() {
                "Thread" => self.ensure_forward_decl("typedef struct __btrc_thread __btrc_thread_t;"),
                "Mutex" => self.ensure_forward_decl("typedef struct __btrc_mutex __btrc_mutex_t;"),
                _ => {}
            }
        }
        types::type_to_c_with_classes(
            resolved.as_ref(),
            &self.analyzed.class_table,
            &mut self.fn_ptr_typedefs,
        )
    }

    pub(crate) fn ensure_forward_decl(&mut self, line: &str) {
        if !self.module.forward_decls.iter().any(|d| d == line) {
            self.module.forward_decls.push(line.to_string());
        }
    }

    // ==================== ARC managed variable tracking ====================

    pub(crate) fn push_managed_scope(&mut self) {
        self.managed_stack.push(Vec::new());
    }

    pub(crate) fn pop_managed_scope(&mut self) -> Vec<(String, String)> {
        self.managed_stack.pop().unwrap_or_default()
    }

    /// Register a variable as auto-managed in the current scope.
    pub(crate) fn register_managed_var(&mut self, var_name: &str, class_name: &str) {
        if let Some(scope) = self.managed_stack.last_mut() {
            if !scope.iter().any(|(v, _)| v == var_name) {
                scope.push((var_name.to_string(), class_name.to_string()));
            }
        }
    }

    /// All managed vars across all active scopes (for return paths).
    pub(crate) fn get_all_managed_vars(&self) -> Vec<(String, String)> {
        self.managed_stack.iter().flatten().cloned().collect()
    }

    /// Register a generic instantiation discovered during lowering.
    pub(crate) fn register_instance(&mut self, base: &str, args: &[TypeExpr]) -> bool {
        let entry = self.generic_instances.entry(base.to_string()).or_default();
        if entry.iter().any(|a| a == args) {
            false
        } else {
            entry.push(args.to_vec());
            true
        }
    }

    // ==================== Module setup ====================

    fn emit_includes(&mut self) {
        for inc in STANDARD_INCLUDES {
            self.module.includes.push((*inc).to_string());
        }
        if program_uses_trycatch(&self.analyzed.program) {
            self.module.includes.push("setjmp.h".to_string());
        }
    }

    fn emit_forward_decls(&mut self) {
        // Phase 1: type forward declarations.
        let mut func_fwd_decls = Vec::new();
        let decls = &self.analyzed.program.declarations;
        let mut typedef_lines = Vec::new();
        for decl in decls {
            match decl {
                Decl::Class(c) if c.generic_params.is_empty() => {
                    self.module
                        .forward_decls
                        .push(format!("typedef struct {} {};", c.name, c.name));
                }
                Decl::Struct(s) => {
                    self.module
                        .forward_decls
                        .push(format!("typedef struct {} {};", s.name, s.name));
                }
                Decl::Typedef(t) => {
                    typedef_lines.push(t.clone());
                }
                Decl::Function(f) if f.body.is_some() && f.name != "main" => {
                    func_fwd_decls.push(f.clone());
                }
                _ => {}
            }
        }
        for td in typedef_lines {
            let c = self.ctype(Some(&td.ty));
            self.module
                .forward_decls
                .push(format!("typedef {} {};", c, td.name));
        }

        // Forward declarations for concrete generic instances.
        // Thread<T> maps to __btrc_thread_t*, not a struct — skip.
        let mut seen = IndexSet::new();
        for (base_name, instances) in self.generic_instances.clone() {
            if base_name == "Thread" || base_name == "Mutex" {
                continue;
            }
            for args in &instances {
                if !is_concrete_instance(args) {
                    continue;
                }
                let mangled = mangle_generic_type(&base_name, args);
                if seen.insert(mangled.clone()) {
                    self.module
                        .forward_decls
                        .push(format!("typedef struct {} {};", mangled, mangled));
                }
            }
        }

        self.emit_tuple_structs();

        // Phase 2: function prototypes (after all types are known).
        for f in func_fwd_decls {
            let ret = self.ctype(f.return_type.as_ref());
            let params: Vec<String> = f
                .params
                .iter()
                .map(|p| format!("{} {}", self.ctype(Some(&p.ty)), p.name))
                .collect();
            let params = if params.is_empty() {
                "void".to_string()
            } else {
                params.join(", ")
            };
            self.module
                .forward_decls
                .push(format!("{} {}({});", ret, f.name, params));
        }
    }

    fn emit_structs(&mut self) {
        let decls = self.analyzed.program.declarations.clone();
        for decl in &decls {
            if let Decl::Struct(s) = decl {
                classes::emit_struct_decl(self, s);
            }
        }
    }

    fn emit_declarations(&mut self) {
        let decls = self.analyzed.program.declarations.clone();
        for decl in &decls {
            match decl {
                Decl::Class(c) => {
                    if c.generic_params.is_empty() {
                        classes::emit_class_decl(self, c);
                    }
                }
                Decl::Function(f) => functions::emit_function_decl(self, f),
                Decl::Var(v) => {
                    let c_type = match &v.ty {
                        Some(t) => self.ctype(Some(t)),
                        None => "int".to_string(),
                    };
                    match &v.initializer {
                        Some(init) => {
                            let ir = expressions::lower_expr(self, init);
                            let text = statements::quick_text(&ir);
                            self.module
                                .global_vars
                                .push(format!("static {} {} = {};", c_type, v.name, text));
                        }
                        None => {
                            self.module
                                .global_vars
                                .push(format!("static {} {};", c_type, v.name));
                        }
                    }
                }
                Decl::Preprocessor { text } => {
                    let text = text.trim();
                    if let Some(rest) = text.strip_prefix("#include") {
                        let name = rest
                            .trim()
                            .trim_matches(|c| c == '<' || c == '>' || c == '"');
                        if !name.is_empty() {
                            self.module.includes.push(name.to_string());
                        } else {
                            self.module.includes.push(text.to_string());
                        }
                    } else {
                        self.module.raw_sections.push(text.to_string());
                    }
                }
                _ => {}
            }
        }
    }

    fn emit_fn_ptr_typedefs(&mut self) {
        for (_, td) in std::mem::take(&mut self.fn_ptr_typedefs) {
            self.module.forward_decls.push(td);
        }
    }

    /// Scan declaration signatures and the node-type table for tuple
    /// types; emit one struct per distinct mangled tuple name.
    fn emit_tuple_structs(&mut self) {
        let mut seen: IndexMap<String, Vec<TypeExpr>> = IndexMap::new();

        for decl in &self.analyzed.program.declarations {
            match decl {
                Decl::Function(f) => {
                    collect_tuple_types(f.return_type.as_ref(), &mut seen);
                    for p in &f.params {
                        collect_tuple_types(Some(&p.ty), &mut seen);
                    }
                }
                Decl::Class(c) => {
                    for member in &c.members {
                        if let ClassMember::Method(m) = member {
                            collect_tuple_types(m.return_type.as_ref(), &mut seen);
                        }
                    }
                }
                _ => {}
            }
        }
        // HashMap iteration is unordered; sort scanned node types so
        // emitted structs are deterministic.
        let mut node_tuples: Vec<&TypeExpr> = self.analyzed.node_types.values().collect();
        node_tuples.sort_by_key(|t| mangle_tuple_type(t));
        for t in node_tuples {
            collect_tuple_types(Some(t), &mut seen);
        }

        for (mangled, args) in seen {
            let fields = args
                .iter()
                .enumerate()
                .map(|(i, arg)| IrStructField {
                    c_type: CType::new(self.ctype(Some(arg))),
                    name: format!("_{}", i),
                })
                .collect();
            self.module.struct_defs.push(IrStructDef {
                name: mangled.clone(),
                fields,
            });
            self.module
                .forward_decls
                .push(format!("typedef struct {} {};", mangled, mangled));
        }
    }
}

fn collect_tuple_types(t: Option<&TypeExpr>, seen: &mut IndexMap<String, Vec<TypeExpr>>) {
    let Some(t) = t else {
        return;
    };
    if t.base == "Tuple" && !t.generic_args.is_empty() {
        let mangled = mangle_tuple_type(t);
        seen.entry(mangled).or_insert_with(|| t.generic_args.clone());
    }
    for arg in &t.generic_args {
        collect_tuple_types(Some(arg), seen);
    }
}

/// Deep scan for try/catch or throw anywhere in the program.
fn program_uses_trycatch(program: &Program) -> bool {
    fn block_uses(block: &Block) -> bool {
        block.statements.iter().any(stmt_uses)
    }
    fn stmt_uses(stmt: &Stmt) -> bool {
        match stmt {
            Stmt::TryCatch(_) | Stmt::Throw { .. } => true,
            Stmt::If(i) => {
                fn if_uses(i: &IfStmt) -> bool {
                    block_uses(&i.then_block)
                        || match &i.else_branch {
                            Some(ElseBranch::Else(b)) => block_uses(b),
                            Some(ElseBranch::ElseIf(inner)) => if_uses(inner),
                            None => false,
                        }
                }
                if_uses(i)
            }
            Stmt::While { body, .. } | Stmt::DoWhile { body, .. } => block_uses(body),
            Stmt::CFor(f) => block_uses(&f.body),
            Stmt::ForIn(f) => block_uses(&f.body),
            Stmt::Switch(s) => s.cases.iter().any(|c| c.body.iter().any(stmt_uses)),
            _ => false,
        }
    }

    program.declarations.iter().any(|decl| match decl {
        Decl::Function(f) => f.body.as_ref().is_some_and(block_uses),
        Decl::Class(c) => c.members.iter().any(|m| match m {
            ClassMember::Method(m) => m.body.as_ref().is_some_and(block_uses),
            ClassMember::Property(p) => {
                p.getter_body.as_ref().is_some_and(block_uses)
                    || p.setter_body.as_ref().is_some_and(block_uses)
            }
            ClassMember::Field(_) => false,
        }),
        _ => false,
    })
}

/// Generate an IR module from an analyzed program — the main entry
/// point for the IR generation pipeline.
pub fn generate_ir(analyzed: &AnalyzedProgram, debug: bool, source_file: &str) -> IrModule {
    IrGenerator::new(analyzed, debug, source_file).generate()
}
