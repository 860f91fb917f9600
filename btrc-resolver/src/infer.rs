// Pass 2: body walking and expression type inference.
//
// Populates `node_types`, `generic_instances`, and `lambda_captures`;
// reports undeclared names, arity mismatches, and abstract
// instantiations.

use crate::{AnalyzedProgram, Analyzer, Capture, ClassInfo, FunctionInfo};
use btrc_ast::*;
use btrc_diagnostics::{closest_match, Diagnostic};
use indexmap::IndexMap;
use std::collections::HashMap;

const BUILTIN_FUNCTIONS: &[&str] = &[
    "print", "printf", "range", "len", "sizeof", "Mutex", "exit", "malloc", "free",
];

/// String methods returning fresh strings.
const STRING_RET_STRING: &[&str] = &[
    "trim", "toUpper", "toLower", "substring", "replace", "repeat", "reverse", "removePrefix",
    "removeSuffix", "capitalize", "title", "swapCase", "padLeft", "padRight", "center", "lstrip",
    "rstrip", "zfill", "join", "toString",
];
const STRING_RET_BOOL: &[&str] = &[
    "isEmpty", "startsWith", "endsWith", "contains", "isDigit", "isAlpha", "isBlank", "isUpper",
    "isLower", "isAlnum", "equals",
];
const STRING_RET_INT: &[&str] = &[
    "indexOf", "lastIndexOf", "count", "find", "byteLen", "len", "length", "charLen",
];

pub(crate) fn run(analyzer: &Analyzer, analyzed: &mut AnalyzedProgram) {
    let mut walker = Walker {
        an: analyzer,
        class_table: analyzed.class_table.clone(),
        function_table: analyzed.function_table.clone(),
        enum_table: analyzed.enum_table.clone(),
        rich_enum_table: analyzed.rich_enum_table.clone(),
        globals: HashMap::new(),
        scopes: Vec::new(),
        current_class: None,
        node_types: HashMap::new(),
        instances: IndexMap::new(),
        captures: HashMap::new(),
        errors: Vec::new(),
    };

    walker.collect_globals(&analyzed.program);
    walker.register_declared_types(analyzed);
    let decls = analyzed.program.declarations.clone();
    for decl in &decls {
        walker.walk_decl(decl);
    }

    analyzed.node_types.extend(walker.node_types);
    analyzed.lambda_captures.extend(walker.captures);
    analyzed.errors.append(&mut walker.errors);
    for (base, tuples) in walker.instances {
        for args in tuples {
            analyzed.register_instance(&base, &args);
        }
    }
}

struct Walker<'a> {
    an: &'a Analyzer,
    class_table: IndexMap<String, ClassInfo>,
    function_table: IndexMap<String, FunctionInfo>,
    enum_table: IndexMap<String, Vec<String>>,
    rich_enum_table: IndexMap<String, Vec<String>>,
    globals: HashMap<String, TypeExpr>,
    scopes: Vec<HashMap<String, TypeExpr>>,
    current_class: Option<String>,
    node_types: HashMap<NodeId, TypeExpr>,
    instances: IndexMap<String, Vec<Vec<TypeExpr>>>,
    captures: HashMap<NodeId, Vec<Capture>>,
    errors: Vec<Diagnostic>,
}

impl<'a> Walker<'a> {
    // ==================== Setup ====================

    fn collect_globals(&mut self, program: &Program) {
        for decl in &program.declarations {
            if let Decl::Var(v) = decl {
                if let Some(ty) = &v.ty {
                    self.globals
                        .insert(v.name.clone(), self.an.expand_typedefs(ty));
                }
            }
        }
    }

    /// Register every generic type mentioned in a declaration
    /// signature, so instances exist even when never touched in a body.
    fn register_declared_types(&mut self, analyzed: &AnalyzedProgram) {
        for decl in &analyzed.program.declarations {
            match decl {
                Decl::Function(f) => {
                    if let Some(rt) = &f.return_type {
                        self.register_type(rt);
                    }
                    for p in &f.params {
                        self.register_type(&p.ty);
                    }
                }
                Decl::Class(c) => {
                    if c.generic_params.is_empty() {
                        for member in &c.members {
                            match member {
                                ClassMember::Field(fd) => self.register_type(&fd.ty),
                                ClassMember::Method(m) => {
                                    if let Some(rt) = &m.return_type {
                                        self.register_type(rt);
                                    }
                                    for p in &m.params {
                                        self.register_type(&p.ty);
                                    }
                                }
                                ClassMember::Property(p) => self.register_type(&p.ty),
                            }
                        }
                    }
                }
                Decl::Var(v) => {
                    if let Some(ty) = &v.ty {
                        self.register_type(ty);
                    }
                }
                _ => {}
            }
        }
    }

    fn register_type(&mut self, t: &TypeExpr) {
        let t = self.an.expand_typedefs(t);
        if !t.generic_args.is_empty() && t.base != "Tuple" && t.base != "__fn_ptr" {
            let is_generic_base = matches!(t.base.as_str(), "List" | "Map" | "Set" | "Thread")
                || self
                    .class_table
                    .get(&t.base)
                    .is_some_and(|c| !c.generic_params.is_empty());
            if is_generic_base {
                let entry = self.instances.entry(t.base.clone()).or_default();
                if !entry.iter().any(|a| a == &t.generic_args) {
                    entry.push(t.generic_args.clone());
                }
            }
        }
        for arg in &t.generic_args {
            self.register_type(arg);
        }
    }

    // ==================== Declaration walking ====================

    fn walk_decl(&mut self, decl: &Decl) {
        match decl {
            Decl::Function(f) => {
                if let Some(body) = &f.body {
                    self.scopes.clear();
                    self.current_class = None;
                    self.push_param_scope(&f.params);
                    self.walk_block(body);
                    self.scopes.pop();
                }
            }
            Decl::Class(c) => self.walk_class(c),
            Decl::Var(v) => {
                if let Some(init) = &v.initializer {
                    self.infer_expr(init);
                }
            }
            Decl::Enum(e) => {
                for value in &e.values {
                    if let Some(expr) = &value.value {
                        self.infer_expr(expr);
                    }
                }
            }
            _ => {}
        }
    }

    fn walk_class(&mut self, c: &ClassDecl) {
        // Generic class bodies are walked with type parameters as
        // opaque named types (T, K, ...); the monomorphizer
        // substitutes concrete arguments into the recorded types.
        self.current_class = Some(c.name.clone());
        for member in &c.members {
            match member {
                ClassMember::Field(fd) => {
                    if let Some(init) = &fd.initializer {
                        self.scopes.clear();
                        if let Some(t) = self.declared_collection_type(&fd.ty) {
                            self.node_types.insert(init.id, t);
                        }
                        self.infer_expr(init);
                    }
                }
                ClassMember::Method(m) => {
                    if let Some(body) = &m.body {
                        self.scopes.clear();
                        self.push_param_scope(&m.params);
                        self.walk_block(body);
                        self.scopes.pop();
                    }
                }
                ClassMember::Property(p) => {
                    if let Some(body) = &p.getter_body {
                        self.scopes.clear();
                        self.scopes.push(HashMap::new());
                        self.walk_block(body);
                        self.scopes.pop();
                    }
                    if let Some(body) = &p.setter_body {
                        self.scopes.clear();
                        let mut scope = HashMap::new();
                        scope.insert("value".to_string(), p.ty.clone());
                        self.scopes.push(scope);
                        self.walk_block(body);
                        self.scopes.pop();
                    }
                }
            }
        }
        self.current_class = None;
    }

    fn push_param_scope(&mut self, params: &[Param]) {
        let mut scope = HashMap::new();
        for p in params {
            let ty = self.an.expand_typedefs(&p.ty);
            self.register_type(&ty);
            scope.insert(p.name.clone(), ty);
        }
        self.scopes.push(scope);
    }

    // ==================== Statement walking ====================

    fn walk_block(&mut self, block: &Block) {
        self.scopes.push(HashMap::new());
        for stmt in &block.statements {
            self.walk_stmt(stmt);
        }
        self.scopes.pop();
    }

    fn walk_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::VarDecl(v) => self.walk_var_decl(v),
            Stmt::Expr(e) => {
                self.infer_expr(e);
            }
            Stmt::Return { value } => {
                if let Some(e) = value {
                    self.infer_expr(e);
                }
            }
            Stmt::If(if_stmt) => self.walk_if(if_stmt),
            Stmt::While { condition, body } => {
                self.infer_expr(condition);
                self.walk_block(body);
            }
            Stmt::DoWhile { body, condition } => {
                self.walk_block(body);
                self.infer_expr(condition);
            }
            Stmt::CFor(f) => {
                self.scopes.push(HashMap::new());
                match &f.init {
                    Some(ForInit::Var(v)) => self.walk_var_decl(v),
                    Some(ForInit::Expr(e)) => {
                        self.infer_expr(e);
                    }
                    None => {}
                }
                if let Some(c) = &f.condition {
                    self.infer_expr(c);
                }
                if let Some(u) = &f.update {
                    self.infer_expr(u);
                }
                self.walk_block(&f.body);
                self.scopes.pop();
            }
            Stmt::ForIn(f) => self.walk_for_in(f),
            Stmt::Switch(s) => {
                self.infer_expr(&s.value);
                for case in &s.cases {
                    if let Some(v) = &case.value {
                        self.infer_expr(v);
                    }
                    self.scopes.push(HashMap::new());
                    for st in &case.body {
                        self.walk_stmt(st);
                    }
                    self.scopes.pop();
                }
            }
            Stmt::Delete { expr } | Stmt::Release { expr } | Stmt::Throw { expr } => {
                self.infer_expr(expr);
            }
            Stmt::TryCatch(t) => {
                self.walk_block(&t.try_block);
                self.scopes.push(HashMap::new());
                if let Some(var) = &t.catch_var {
                    let ty = t
                        .catch_type
                        .clone()
                        .unwrap_or_else(|| TypeExpr::named("string"));
                    if let Some(scope) = self.scopes.last_mut() {
                        scope.insert(var.clone(), ty);
                    }
                }
                for st in &t.catch_block.statements {
                    self.walk_stmt(st);
                }
                self.scopes.pop();
                if let Some(fin) = &t.finally_block {
                    self.walk_block(fin);
                }
            }
            Stmt::Break | Stmt::Continue => {}
        }
    }

    fn walk_var_decl(&mut self, v: &VarDecl) {
        let declared = v.ty.as_ref().map(|t| self.an.expand_typedefs(t));
        if let Some(ty) = &declared {
            self.register_type(ty);
        }
        if let Some(init) = &v.initializer {
            // Empty collection literals take the declared type.
            if let Some(ty) = &declared {
                if let Some(t) = self.declared_collection_type(ty) {
                    if matches!(
                        &init.kind,
                        ExprKind::ListLiteral { .. }
                            | ExprKind::MapLiteral { .. }
                            | ExprKind::BraceInit { .. }
                    ) {
                        self.node_types.insert(init.id, t);
                    }
                }
            }
            self.infer_expr(init);
        }
        if let (Some(scope), Some(ty)) = (self.scopes.last_mut(), declared) {
            scope.insert(v.name.clone(), ty);
        }
    }

    fn declared_collection_type(&self, ty: &TypeExpr) -> Option<TypeExpr> {
        if matches!(ty.base.as_str(), "List" | "Map" | "Set") && !ty.generic_args.is_empty() {
            return Some(ty.clone());
        }
        None
    }

    fn walk_if(&mut self, if_stmt: &IfStmt) {
        self.infer_expr(&if_stmt.condition);
        self.walk_block(&if_stmt.then_block);
        match &if_stmt.else_branch {
            Some(ElseBranch::Else(b)) => self.walk_block(b),
            Some(ElseBranch::ElseIf(inner)) => self.walk_if(inner),
            None => {}
        }
    }

    fn walk_for_in(&mut self, f: &ForInStmt) {
        let iter_type = self.infer_expr(&f.iterable);
        self.scopes.push(HashMap::new());

        let (var_ty, var2_ty) = match iter_type.as_ref().map(|t| t.base.as_str()) {
            Some("List") | Some("Set") => (
                iter_type
                    .as_ref()
                    .and_then(|t| t.generic_args.first())
                    .cloned()
                    .unwrap_or_else(|| TypeExpr::named("int")),
                None,
            ),
            Some("Map") => {
                let t = iter_type.as_ref().map(|t| t.generic_args.clone());
                let k = t
                    .as_ref()
                    .and_then(|a| a.first())
                    .cloned()
                    .unwrap_or_else(|| TypeExpr::named("int"));
                let v = t
                    .as_ref()
                    .and_then(|a| a.get(1))
                    .cloned()
                    .unwrap_or_else(|| TypeExpr::named("int"));
                (k, Some(v))
            }
            Some("string") => (TypeExpr::named("char"), None),
            _ => (TypeExpr::named("int"), None),
        };

        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(f.var_name.clone(), var_ty);
            if let (Some(name2), Some(t2)) = (&f.var_name2, var2_ty) {
                scope.insert(name2.clone(), t2);
            }
        }
        for stmt in &f.body.statements {
            self.walk_stmt(stmt);
        }
        self.scopes.pop();
    }

    // ==================== Expression inference ====================

    fn record(&mut self, id: NodeId, ty: TypeExpr) -> Option<TypeExpr> {
        self.register_type(&ty);
        self.node_types.insert(id, ty.clone());
        Some(ty)
    }

    fn infer_expr(&mut self, expr: &Expr) -> Option<TypeExpr> {
        match &expr.kind {
            ExprKind::IntLiteral { .. } => self.record(expr.id, TypeExpr::named("int")),
            ExprKind::FloatLiteral { .. } => self.record(expr.id, TypeExpr::named("float")),
            ExprKind::StringLiteral { .. } => self.record(expr.id, TypeExpr::named("string")),
            ExprKind::CharLiteral { .. } => self.record(expr.id, TypeExpr::named("char")),
            ExprKind::BoolLiteral { .. } => self.record(expr.id, TypeExpr::named("bool")),
            ExprKind::NullLiteral => None,
            ExprKind::Identifier { name } => self.infer_identifier(expr, name),
            ExprKind::SelfExpr | ExprKind::SuperExpr => {
                let class = self.current_class.clone()?;
                let generic_params = self
                    .class_table
                    .get(&class)
                    .map(|i| i.generic_params.clone())
                    .unwrap_or_default();
                let ty = if generic_params.is_empty() {
                    TypeExpr::named(class)
                } else {
                    TypeExpr::generic(
                        class,
                        generic_params.into_iter().map(TypeExpr::named).collect(),
                    )
                };
                self.record(expr.id, ty)
            }
            ExprKind::Binary { op, left, right } => {
                let lt = self.infer_expr(left);
                self.infer_expr(right);
                let ty = match op.as_str() {
                    "==" | "!=" | "<" | ">" | "<=" | ">=" | "&&" | "||" => {
                        Some(TypeExpr::named("bool"))
                    }
                    "??" => lt.clone(),
                    "+" if lt.as_ref().is_some_and(|t| t.base == "string") => {
                        Some(TypeExpr::named("string"))
                    }
                    _ => lt.clone(),
                };
                ty.and_then(|t| self.record(expr.id, t))
            }
            ExprKind::Unary { op, operand, .. } => {
                let ot = self.infer_expr(operand);
                let ty = match op.as_str() {
                    "!" => Some(TypeExpr::named("bool")),
                    "&" => ot.clone().map(|mut t| {
                        t.pointer_depth += 1;
                        t
                    }),
                    "*" => ot.clone().map(|mut t| {
                        t.pointer_depth = t.pointer_depth.saturating_sub(1);
                        t
                    }),
                    _ => ot.clone(),
                };
                ty.and_then(|t| self.record(expr.id, t))
            }
            ExprKind::Call { callee, args } => self.infer_call(expr, callee, args),
            ExprKind::FieldAccess {
                obj,
                field,
                ..
            } => self.infer_field_access(expr, obj, field),
            ExprKind::Index { obj, index } => {
                let ot = self.infer_expr(obj);
                self.infer_expr(index);
                let ty = match ot {
                    Some(t) if t.base == "List" || t.base == "Set" => {
                        t.generic_args.first().cloned()
                    }
                    Some(t) if t.base == "Map" => t.generic_args.get(1).cloned(),
                    Some(t) if t.pointer_depth > 0 || t.is_array => {
                        let mut e = t.clone();
                        if e.is_array {
                            e.is_array = false;
                            e.array_size = None;
                        } else {
                            e.pointer_depth -= 1;
                        }
                        Some(e)
                    }
                    Some(t) if t.base == "string" => Some(TypeExpr::named("char")),
                    _ => None,
                };
                ty.and_then(|t| self.record(expr.id, t))
            }
            ExprKind::Assign { target, value, .. } => {
                let tt = self.infer_expr(target);
                self.infer_expr(value);
                tt.and_then(|t| self.record(expr.id, t))
            }
            ExprKind::Cast { target_type, expr: inner } => {
                self.infer_expr(inner);
                self.record(expr.id, self.an.expand_typedefs(target_type))
            }
            ExprKind::Sizeof(op) => {
                if let SizeofOperand::Expr(e) = op {
                    self.infer_expr(e);
                }
                self.record(expr.id, TypeExpr::named("size_t"))
            }
            ExprKind::Ternary {
                condition,
                true_expr,
                false_expr,
            } => {
                self.infer_expr(condition);
                let tt = self.infer_expr(true_expr);
                self.infer_expr(false_expr);
                tt.and_then(|t| self.record(expr.id, t))
            }
            ExprKind::New { ty, args } => {
                for a in args {
                    self.infer_expr(a);
                }
                let ty = self.an.expand_typedefs(ty);
                if let Some(info) = self.class_table.get(&ty.base) {
                    if info.is_abstract {
                        self.errors.push(Diagnostic::error(
                            format!("cannot instantiate abstract class '{}'", ty.base),
                            self.an.span(expr.line, expr.col),
                        ));
                    }
                }
                self.record(expr.id, ty)
            }
            ExprKind::ListLiteral { elements } => {
                let elem_types: Vec<_> = elements.iter().map(|e| self.infer_expr(e)).collect();
                if let Some(declared) = self.node_types.get(&expr.id).cloned() {
                    self.register_type(&declared);
                    return Some(declared);
                }
                let elem = elem_types.into_iter().flatten().next()?;
                self.record(expr.id, TypeExpr::generic("List", vec![elem]))
            }
            ExprKind::MapLiteral { entries } => {
                let mut first: Option<(TypeExpr, TypeExpr)> = None;
                for entry in entries {
                    let k = self.infer_expr(&entry.key);
                    let v = self.infer_expr(&entry.value);
                    if first.is_none() {
                        if let (Some(k), Some(v)) = (k, v) {
                            first = Some((k, v));
                        }
                    }
                }
                if let Some(declared) = self.node_types.get(&expr.id).cloned() {
                    self.register_type(&declared);
                    return Some(declared);
                }
                let (k, v) = first?;
                self.record(expr.id, TypeExpr::generic("Map", vec![k, v]))
            }
            ExprKind::TupleLiteral { elements } => {
                let types: Vec<_> = elements
                    .iter()
                    .map(|e| self.infer_expr(e).unwrap_or_else(|| TypeExpr::named("int")))
                    .collect();
                self.record(expr.id, TypeExpr::generic("Tuple", types))
            }
            ExprKind::BraceInit { elements } => {
                for e in elements {
                    self.infer_expr(e);
                }
                self.node_types.get(&expr.id).cloned()
            }
            ExprKind::FString { parts } => {
                for part in parts {
                    if let FStringPart::Expr(e) = part {
                        self.infer_expr(e);
                    }
                }
                self.record(expr.id, TypeExpr::named("string"))
            }
            ExprKind::Lambda(lambda) => self.infer_lambda(expr, lambda),
            ExprKind::Spawn { func } => {
                let fn_type = self.infer_expr(func);
                let ret = fn_type
                    .and_then(|t| {
                        if t.base == "__fn_ptr" {
                            t.generic_args.first().cloned()
                        } else {
                            None
                        }
                    })
                    .unwrap_or_else(TypeExpr::void);
                self.record(expr.id, TypeExpr::generic("Thread", vec![ret]))
            }
        }
    }

    fn infer_identifier(&mut self, expr: &Expr, name: &str) -> Option<TypeExpr> {
        for scope in self.scopes.iter().rev() {
            if let Some(ty) = scope.get(name) {
                let ty = ty.clone();
                return self.record(expr.id, ty);
            }
        }
        if let Some(ty) = self.globals.get(name) {
            let ty = ty.clone();
            return self.record(expr.id, ty);
        }
        // Enum value: RED → type Color
        let enum_owner = self
            .enum_table
            .iter()
            .find(|(_, values)| values.iter().any(|v| v == name))
            .map(|(ename, _)| ename.clone());
        if let Some(ename) = enum_owner {
            return self.record(expr.id, TypeExpr::named(ename));
        }
        // Function used as a value → function pointer type
        if let Some(f) = self.function_table.get(name) {
            let mut args = vec![f
                .return_type
                .clone()
                .unwrap_or_else(TypeExpr::void)];
            args.extend(f.params.iter().map(|p| p.ty.clone()));
            let ty = TypeExpr::generic("__fn_ptr", args);
            return self.record(expr.id, ty);
        }
        // Class / enum / struct names appear as receivers; those are
        // consumed by call/field lowering and carry no expression type.
        if self.class_table.contains_key(name)
            || self.rich_enum_table.contains_key(name)
            || self.enum_table.contains_key(name)
            || BUILTIN_FUNCTIONS.contains(&name)
        {
            return None;
        }

        let mut candidates: Vec<&str> = Vec::new();
        for scope in &self.scopes {
            candidates.extend(scope.keys().map(|s| s.as_str()));
        }
        candidates.extend(self.globals.keys().map(|s| s.as_str()));
        candidates.extend(self.function_table.keys().map(|s| s.as_str()));
        let mut diag = Diagnostic::error(
            format!("undeclared identifier '{}'", name),
            self.an.span(expr.line, expr.col),
        );
        if let Some(suggestion) = closest_match(name, candidates) {
            diag = diag.with_help(format!("did you mean '{}'?", suggestion));
        }
        self.errors.push(diag);
        None
    }

    fn infer_call(&mut self, expr: &Expr, callee: &Expr, args: &[Expr]) -> Option<TypeExpr> {
        if let ExprKind::FieldAccess { obj, field, .. } = &callee.kind {
            return self.infer_method_call(expr, obj, field, args);
        }

        if let ExprKind::Identifier { name } = &callee.kind {
            // Constructor call
            if let Some(info) = self.class_table.get(name).cloned() {
                for a in args {
                    self.infer_expr(a);
                }
                if info.is_abstract {
                    self.errors.push(Diagnostic::error(
                        format!("cannot instantiate abstract class '{}'", name),
                        self.an.span(expr.line, expr.col),
                    ));
                }
                if let Some(ctor) = &info.constructor {
                    self.check_arity(expr, name, &ctor.params, args.len());
                }
                return self.record(expr.id, TypeExpr::named(name.clone()));
            }

            match name.as_str() {
                "print" | "printf" => {
                    for a in args {
                        self.infer_expr(a);
                    }
                    return None;
                }
                "range" => {
                    for a in args {
                        self.infer_expr(a);
                    }
                    return None;
                }
                "len" => {
                    for a in args {
                        self.infer_expr(a);
                    }
                    return self.record(expr.id, TypeExpr::named("int"));
                }
                "sizeof" => {
                    for a in args {
                        self.infer_expr(a);
                    }
                    return self.record(expr.id, TypeExpr::named("size_t"));
                }
                "Mutex" => {
                    for a in args {
                        self.infer_expr(a);
                    }
                    return self.record(expr.id, TypeExpr::named("Mutex"));
                }
                "exit" | "malloc" | "free" => {
                    for a in args {
                        self.infer_expr(a);
                    }
                    return None;
                }
                _ => {}
            }

            // Lambda stored in a local → its function-pointer type
            let local = self
                .scopes
                .iter()
                .rev()
                .find_map(|s| s.get(name.as_str()))
                .cloned();
            if let Some(t) = local {
                for a in args {
                    self.infer_expr(a);
                }
                if t.base == "__fn_ptr" {
                    let ret = t.generic_args.first().cloned();
                    return ret.and_then(|r| self.record(expr.id, r));
                }
                return None;
            }

            if let Some(f) = self.function_table.get(name).cloned() {
                for a in args {
                    self.infer_expr(a);
                }
                self.check_arity(expr, name, &f.params, args.len());
                let ret = f.return_type.clone()?;
                return self.record(expr.id, self.an.expand_typedefs(&ret));
            }

            // Unknown callee
            for a in args {
                self.infer_expr(a);
            }
            let candidates: Vec<&str> = self
                .function_table
                .keys()
                .map(|s| s.as_str())
                .chain(self.class_table.keys().map(|s| s.as_str()))
                .chain(BUILTIN_FUNCTIONS.iter().copied())
                .collect();
            let mut diag = Diagnostic::error(
                format!("call to undeclared function '{}'", name),
                self.an.span(expr.line, expr.col),
            );
            if let Some(s) = closest_match(name, candidates) {
                diag = diag.with_help(format!("did you mean '{}'?", s));
            }
            self.errors.push(diag);
            return None;
        }

        // Complex callee (function pointer expression)
        let callee_type = self.infer_expr(callee);
        for a in args {
            self.infer_expr(a);
        }
        if let Some(t) = callee_type {
            if t.base == "__fn_ptr" {
                let ret = t.generic_args.first().cloned();
                return ret.and_then(|r| self.record(expr.id, r));
            }
        }
        None
    }

    fn check_arity(&mut self, expr: &Expr, name: &str, params: &[Param], given: usize) {
        if given > params.len() {
            self.errors.push(Diagnostic::error(
                format!(
                    "too many arguments to '{}': expected {}, got {}",
                    name,
                    params.len(),
                    given
                ),
                self.an.span(expr.line, expr.col),
            ));
            return;
        }
        for p in params.iter().skip(given) {
            if p.default.is_none() {
                self.errors.push(Diagnostic::error(
                    format!("missing argument '{}' in call to '{}'", p.name, name),
                    self.an.span(expr.line, expr.col),
                ));
                return;
            }
        }
    }

    fn infer_method_call(
        &mut self,
        expr: &Expr,
        obj: &Expr,
        method: &str,
        args: &[Expr],
    ) -> Option<TypeExpr> {
        // Rich enum variant constructor: Shape.Circle(2.0)
        if let ExprKind::Identifier { name } = &obj.kind {
            if self.rich_enum_table.contains_key(name) {
                for a in args {
                    self.infer_expr(a);
                }
                let ty = TypeExpr::named(name.clone());
                return self.record(expr.id, ty);
            }
            // Static method call: ClassName.method(args)
            if let Some(info) = self.class_table.get(name).cloned() {
                for a in args {
                    self.infer_expr(a);
                }
                let m = info.methods.get(method)?;
                let ret = m.return_type.clone()?;
                return self.record(expr.id, self.an.expand_typedefs(&ret));
            }
        }

        let obj_type = self.infer_expr(obj);
        for a in args {
            self.infer_expr(a);
        }
        let obj_type = obj_type?;

        if obj_type.base == "string" && obj_type.generic_args.is_empty() {
            if STRING_RET_STRING.contains(&method) {
                return self.record(expr.id, TypeExpr::named("string"));
            }
            if STRING_RET_BOOL.contains(&method) {
                return self.record(expr.id, TypeExpr::named("bool"));
            }
            if STRING_RET_INT.contains(&method) {
                return self.record(expr.id, TypeExpr::named("int"));
            }
            match method {
                "charAt" => return self.record(expr.id, TypeExpr::named("char")),
                "toInt" => return self.record(expr.id, TypeExpr::named("int")),
                "toFloat" => return self.record(expr.id, TypeExpr::named("float")),
                "toDouble" => return self.record(expr.id, TypeExpr::named("double")),
                "toLong" => return self.record(expr.id, TypeExpr::named("long")),
                "split" => {
                    return self.record(
                        expr.id,
                        TypeExpr::generic("List", vec![TypeExpr::named("string")]),
                    )
                }
                _ => return None,
            }
        }

        if method == "toString" {
            return self.record(expr.id, TypeExpr::named("string"));
        }

        match obj_type.base.as_str() {
            "List" => {
                let elem = obj_type.generic_args.first().cloned()?;
                let list_ty = obj_type.clone();
                match method {
                    "get" | "pop" | "first" | "last" | "min" | "max" | "sum" | "reduce" => {
                        self.record(expr.id, elem)
                    }
                    "size" | "length" | "len" | "indexOf" | "lastIndexOf" | "count"
                    | "findIndex" => self.record(expr.id, TypeExpr::named("int")),
                    "contains" | "isEmpty" | "any" | "all" => {
                        self.record(expr.id, TypeExpr::named("bool"))
                    }
                    "slice" | "reversed" | "sorted" | "copy" | "take" | "drop" | "distinct"
                    | "filter" | "map" => self.record(expr.id, list_ty),
                    "join" => self.record(expr.id, TypeExpr::named("string")),
                    _ => None,
                }
            }
            "Map" => {
                let k = obj_type.generic_args.first().cloned()?;
                let v = obj_type.generic_args.get(1).cloned()?;
                match method {
                    "get" | "getOrDefault" => self.record(expr.id, v),
                    "has" | "contains" | "isEmpty" | "containsValue" => {
                        self.record(expr.id, TypeExpr::named("bool"))
                    }
                    "size" | "length" | "len" => self.record(expr.id, TypeExpr::named("int")),
                    "keys" => self.record(expr.id, TypeExpr::generic("List", vec![k])),
                    "values" => self.record(expr.id, TypeExpr::generic("List", vec![v])),
                    _ => None,
                }
            }
            "Set" => {
                let elem = obj_type.generic_args.first().cloned()?;
                match method {
                    "contains" | "has" | "isEmpty" | "any" | "all" => {
                        self.record(expr.id, TypeExpr::named("bool"))
                    }
                    "size" | "length" | "len" => self.record(expr.id, TypeExpr::named("int")),
                    "toList" => self.record(expr.id, TypeExpr::generic("List", vec![elem])),
                    "intersect" | "unite" | "subtract" | "filter" => {
                        self.record(expr.id, obj_type.clone())
                    }
                    _ => None,
                }
            }
            "Thread" => {
                if method == "join" {
                    let ret = obj_type.generic_args.first().cloned()?;
                    return self.record(expr.id, ret);
                }
                None
            }
            "Mutex" => None,
            base => {
                let info = self.class_table.get(base).cloned()?;
                // Property read via call syntax: p.area()
                if let Some(prop) = info.properties.get(method) {
                    let ty = prop.ty.clone();
                    return self.record(expr.id, ty);
                }
                let m = self.find_method(&info, method)?;
                let ret = m.return_type.clone()?;
                let ret = if !info.generic_params.is_empty() {
                    substitute(&ret, &info.generic_params, &obj_type.generic_args)
                } else {
                    ret
                };
                self.record(expr.id, self.an.expand_typedefs(&ret))
            }
        }
    }

    /// Look up a method on a class or any ancestor.
    fn find_method(&self, info: &ClassInfo, name: &str) -> Option<crate::MethodInfo> {
        if let Some(m) = info.methods.get(name) {
            return Some(m.clone());
        }
        let parent = info.parent.as_ref()?;
        let parent_info = self.class_table.get(parent)?;
        self.find_method(parent_info, name)
    }

    fn infer_field_access(&mut self, expr: &Expr, obj: &Expr, field: &str) -> Option<TypeExpr> {
        // Rich enum tag reference: Shape.Circle
        if let ExprKind::Identifier { name } = &obj.kind {
            if self.rich_enum_table.contains_key(name) {
                let ty = TypeExpr::named(name.clone());
                return self.record(expr.id, ty);
            }
            if self.class_table.contains_key(name) {
                return None; // static reference, typed at the call site
            }
        }

        let obj_type = self.infer_expr(obj)?;

        if obj_type.base == "string" && matches!(field, "len" | "length") {
            return self.record(expr.id, TypeExpr::named("int"));
        }
        if matches!(obj_type.base.as_str(), "List" | "Map" | "Set")
            && matches!(field, "len" | "length" | "size")
        {
            return self.record(expr.id, TypeExpr::named("int"));
        }

        // Tuple element access: t._0
        if obj_type.base == "Tuple" {
            if let Some(rest) = field.strip_prefix('_') {
                if let Ok(idx) = rest.parse::<usize>() {
                    let ty = obj_type.generic_args.get(idx).cloned()?;
                    return self.record(expr.id, ty);
                }
            }
        }

        if let Some(info) = self.class_table.get(&obj_type.base).cloned() {
            if let Some(prop) = info.properties.get(field) {
                let ty = prop.ty.clone();
                return self.record(expr.id, ty);
            }
            if let Some(fd) = self.find_field(&info, field) {
                let ty = if !info.generic_params.is_empty() {
                    substitute(&fd, &info.generic_params, &obj_type.generic_args)
                } else {
                    fd
                };
                return self.record(expr.id, self.an.expand_typedefs(&ty));
            }
            return None;
        }

        if let Some(fields) = self.an.struct_table.get(&obj_type.base) {
            let ty = fields
                .iter()
                .find(|(n, _)| n == field)
                .map(|(_, t)| t.clone())?;
            return self.record(expr.id, ty);
        }

        None
    }

    /// Look up a field on a class or any ancestor.
    fn find_field(&self, info: &ClassInfo, name: &str) -> Option<TypeExpr> {
        if let Some(fd) = info.fields.get(name) {
            return Some(fd.ty.clone());
        }
        let parent = info.parent.as_ref()?;
        let parent_info = self.class_table.get(parent)?;
        self.find_field(parent_info, name)
    }

    // ==================== Lambdas ====================

    fn infer_lambda(&mut self, expr: &Expr, lambda: &LambdaExpr) -> Option<TypeExpr> {
        // Free variables of the body that resolve in enclosing scopes
        // become captures.
        let mut bound: Vec<String> = lambda.params.iter().map(|p| p.name.clone()).collect();
        let mut free = Vec::new();
        match &lambda.body {
            LambdaBody::Block(b) => collect_free_block(b, &mut bound, &mut free),
            LambdaBody::Expr(e) => collect_free_expr(e, &bound, &mut free),
        }
        let mut captures = Vec::new();
        for name in free {
            let found = self
                .scopes
                .iter()
                .rev()
                .find_map(|s| s.get(name.as_str()))
                .cloned();
            if let Some(ty) = found {
                if !captures.iter().any(|c: &Capture| c.name == name) {
                    captures.push(Capture { name, ty });
                }
            }
        }
        self.captures.insert(expr.id, captures.clone());

        // Infer the body with params + captures in scope.
        let mut scope = HashMap::new();
        for p in &lambda.params {
            scope.insert(p.name.clone(), self.an.expand_typedefs(&p.ty));
        }
        for c in &captures {
            scope.insert(c.name.clone(), c.ty.clone());
        }
        self.scopes.push(scope);
        let body_ret = match &lambda.body {
            LambdaBody::Block(b) => {
                for stmt in &b.statements {
                    self.walk_stmt(stmt);
                }
                None
            }
            LambdaBody::Expr(e) => self.infer_expr(e),
        };
        self.scopes.pop();

        let ret = lambda
            .return_type
            .clone()
            .or(body_ret)
            .unwrap_or_else(TypeExpr::void);
        let mut fn_args = vec![ret];
        fn_args.extend(lambda.params.iter().map(|p| p.ty.clone()));
        self.record(expr.id, TypeExpr::generic("__fn_ptr", fn_args))
    }
}

/// Substitute generic parameter names for concrete argument types.
fn substitute(t: &TypeExpr, params: &[String], args: &[TypeExpr]) -> TypeExpr {
    if t.generic_args.is_empty() {
        if let Some(idx) = params.iter().position(|p| p == &t.base) {
            if let Some(replacement) = args.get(idx) {
                let mut r = replacement.clone();
                r.pointer_depth += t.pointer_depth;
                return r;
            }
        }
        return t.clone();
    }
    let mut r = t.clone();
    r.generic_args = t
        .generic_args
        .iter()
        .map(|a| substitute(a, params, args))
        .collect();
    r
}

// ==================== Free variable collection ====================

fn collect_free_block(block: &Block, bound: &mut Vec<String>, free: &mut Vec<String>) {
    let depth = bound.len();
    for stmt in &block.statements {
        collect_free_stmt(stmt, bound, free);
    }
    bound.truncate(depth);
}

fn collect_free_stmt(stmt: &Stmt, bound: &mut Vec<String>, free: &mut Vec<String>) {
    match stmt {
        Stmt::VarDecl(v) => {
            if let Some(init) = &v.initializer {
                collect_free_expr(init, bound, free);
            }
            bound.push(v.name.clone());
        }
        Stmt::Expr(e) | Stmt::Delete { expr: e } | Stmt::Release { expr: e } | Stmt::Throw { expr: e } => {
            collect_free_expr(e, bound, free)
        }
        Stmt::Return { value } => {
            if let Some(e) = value {
                collect_free_expr(e, bound, free);
            }
        }
        Stmt::If(if_stmt) => collect_free_if(if_stmt, bound, free),
        Stmt::While { condition, body } => {
            collect_free_expr(condition, bound, free);
            collect_free_block(body, bound, free);
        }
        Stmt::DoWhile { body, condition } => {
            collect_free_block(body, bound, free);
            collect_free_expr(condition, bound, free);
        }
        Stmt::CFor(f) => {
            let depth = bound.len();
            match &f.init {
                Some(ForInit::Var(v)) => {
                    if let Some(init) = &v.initializer {
                        collect_free_expr(init, bound, free);
                    }
                    bound.push(v.name.clone());
                }
                Some(ForInit::Expr(e)) => collect_free_expr(e, bound, free),
                None => {}
            }
            if let Some(c) = &f.condition {
                collect_free_expr(c, bound, free);
            }
            if let Some(u) = &f.update {
                collect_free_expr(u, bound, free);
            }
            collect_free_block(&f.body, bound, free);
            bound.truncate(depth);
        }
        Stmt::ForIn(f) => {
            collect_free_expr(&f.iterable, bound, free);
            let depth = bound.len();
            bound.push(f.var_name.clone());
            if let Some(n2) = &f.var_name2 {
                bound.push(n2.clone());
            }
            collect_free_block(&f.body, bound, free);
            bound.truncate(depth);
        }
        Stmt::Switch(s) => {
            collect_free_expr(&s.value, bound, free);
            for case in &s.cases {
                if let Some(v) = &case.value {
                    collect_free_expr(v, bound, free);
                }
                for st in &case.body {
                    collect_free_stmt(st, bound, free);
                }
            }
        }
        Stmt::TryCatch(t) => {
            collect_free_block(&t.try_block, bound, free);
            let depth = bound.len();
            if let Some(v) = &t.catch_var {
                bound.push(v.clone());
            }
            collect_free_block(&t.catch_block, bound, free);
            bound.truncate(depth);
            if let Some(fin) = &t.finally_block {
                collect_free_block(fin, bound, free);
            }
        }
        Stmt::Break | Stmt::Continue => {}
    }
}

fn collect_free_if(if_stmt: &IfStmt, bound: &mut Vec<String>, free: &mut Vec<String>) {
    collect_free_expr(&if_stmt.condition, bound, free);
    collect_free_block(&if_stmt.then_block, bound, free);
    match &if_stmt.else_branch {
        Some(ElseBranch::Else(b)) => collect_free_block(b, bound, free),
        Some(ElseBranch::ElseIf(inner)) => collect_free_if(inner, bound, free),
        None => {}
    }
}

fn collect_free_expr(expr: &Expr, bound: &[String], free: &mut Vec<String>) {
    match &expr.kind {
        ExprKind::Identifier { name } => {
            if !bound.iter().any(|b| b == name) && !free.iter().any(|f| f == name) {
                free.push(name.clone());
            }
        }
        ExprKind::Binary { left, right, .. } => {
            collect_free_expr(left, bound, free);
            collect_free_expr(right, bound, free);
        }
        ExprKind::Unary { operand, .. } => collect_free_expr(operand, bound, free),
        ExprKind::Call { callee, args } => {
            // Skip bare function-name callees; calls to captured
            // function pointers still show up via Identifier args.
            if !matches!(&callee.kind, ExprKind::Identifier { .. }) {
                collect_free_expr(callee, bound, free);
            }
            for a in args {
                collect_free_expr(a, bound, free);
            }
        }
        ExprKind::FieldAccess { obj, .. } => collect_free_expr(obj, bound, free),
        ExprKind::Index { obj, index } => {
            collect_free_expr(obj, bound, free);
            collect_free_expr(index, bound, free);
        }
        ExprKind::Assign { target, value, .. } => {
            collect_free_expr(target, bound, free);
            collect_free_expr(value, bound, free);
        }
        ExprKind::Cast { expr: inner, .. } => collect_free_expr(inner, bound, free),
        ExprKind::Sizeof(SizeofOperand::Expr(e)) => collect_free_expr(e, bound, free),
        ExprKind::Ternary {
            condition,
            true_expr,
            false_expr,
        } => {
            collect_free_expr(condition, bound, free);
            collect_free_expr(true_expr, bound, free);
            collect_free_expr(false_expr, bound, free);
        }
        ExprKind::New { args, .. } => {
            for a in args {
                collect_free_expr(a, bound, free);
            }
        }
        ExprKind::ListLiteral { elements }
        | ExprKind::TupleLiteral { elements }
        | ExprKind::BraceInit { elements } => {
            for e in elements {
                collect_free_expr(e, bound, free);
            }
        }
        ExprKind::MapLiteral { entries } => {
            for entry in entries {
                collect_free_expr(&entry.key, bound, free);
                collect_free_expr(&entry.value, bound, free);
            }
        }
        ExprKind::FString { parts } => {
            for part in parts {
                if let FStringPart::Expr(e) = part {
                    collect_free_expr(e, bound, free);
                }
            }
        }
        ExprKind::Spawn { func } => collect_free_expr(func, bound, free),
        ExprKind::Lambda(inner) => {
            // Nested lambda: its params shadow.
            let mut inner_bound: Vec<String> = bound.to_vec();
            inner_bound.extend(inner.params.iter().map(|p| p.name.clone()));
            match &inner.body {
                LambdaBody::Block(b) => collect_free_block(b, &mut inner_bound, free),
                LambdaBody::Expr(e) => collect_free_expr(e, &inner_bound, free),
            }
        }
        _ => {}
    }
}
