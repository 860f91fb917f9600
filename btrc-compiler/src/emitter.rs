// C emitter: stringify the IR tree to portable C text.
//
// A straightforward tree walker. F-string and thread-spawn lowerings
// use GCC statement expressions, so the output requires GCC or Clang
// rather than a strict C11 compiler.

use crate::ir::*;

pub struct CEmitter {
    debug: bool,
    source_file: String,
    no_runtime: bool,
}

impl Default for CEmitter {
    fn default() -> Self {
        Self::new()
    }
}

impl CEmitter {
    pub fn new() -> Self {
        Self {
            debug: false,
            source_file: String::new(),
            no_runtime: false,
        }
    }

    /// Enable `#line` directives pointing back at the btrc source.
    pub fn with_debug(mut self, source_file: &str) -> Self {
        self.debug = true;
        self.source_file = source_file.to_string();
        self
    }

    /// Suppress the runtime helper section (--no-runtime).
    pub fn without_runtime(mut self) -> Self {
        self.no_runtime = true;
        self
    }

    /// Serialize a module. Layout: includes, forward declarations,
    /// function prototypes, runtime helpers, struct definitions, enum
    /// definitions, raw sections, function definitions.
    pub fn emit(&self, module: &IrModule) -> String {
        let mut out = String::new();

        for inc in &module.includes {
            if inc.starts_with('#') {
                out.push_str(inc);
                out.push('\n');
            } else {
                out.push_str(&format!("#include <{}>\n", inc));
            }
        }
        out.push('\n');

        for fwd in &module.forward_decls {
            out.push_str(fwd);
            out.push('\n');
        }
        if !module.forward_decls.is_empty() {
            out.push('\n');
        }

        // Prototypes for every non-static definition so order never
        // matters (statics — lambdas, wrappers, enum constructors —
        // are appended before their first use during lowering).
        let mut protos = Vec::new();
        for f in &module.function_defs {
            if f.name == "main" || f.is_static {
                continue;
            }
            protos.push(function_prototype(f));
        }
        if !protos.is_empty() {
            for p in protos {
                out.push_str(&p);
                out.push('\n');
            }
            out.push('\n');
        }

        if !self.no_runtime {
            for helper in &module.helper_decls {
                out.push_str(&helper.c_source);
                if !helper.c_source.ends_with('\n') {
                    out.push('\n');
                }
            }
            if !module.helper_decls.is_empty() {
                out.push('\n');
            }
        }

        for s in &module.struct_defs {
            out.push_str(&render_struct_def(s));
            out.push('\n');
        }

        for e in &module.enum_defs {
            out.push_str(&render_enum_def(e));
            out.push('\n');
        }

        for g in &module.global_vars {
            out.push_str(g);
            out.push('\n');
        }
        if !module.global_vars.is_empty() {
            out.push('\n');
        }

        for raw in &module.raw_sections {
            out.push_str(raw);
            out.push_str("\n\n");
        }

        for f in &module.function_defs {
            if self.debug {
                if let Some(line) = f.source_line {
                    out.push_str(&format!("#line {} \"{}\"\n", line, self.source_file));
                }
            }
            out.push_str(&render_function_def(f));
            out.push('\n');
        }

        out
    }
}

fn render_struct_def(s: &IrStructDef) -> String {
    let mut out = format!("struct {} {{\n", s.name);
    for f in &s.fields {
        out.push_str(&format!("    {} {};\n", f.c_type, f.name));
    }
    out.push_str("};\n");
    out
}

fn render_enum_def(e: &IrEnumDef) -> String {
    let mut out = "typedef enum {\n".to_string();
    for (i, v) in e.values.iter().enumerate() {
        let sep = if i + 1 == e.values.len() { "" } else { "," };
        match &v.value {
            Some(val) => out.push_str(&format!("    {} = {}{}\n", v.name, val, sep)),
            None => out.push_str(&format!("    {}{}\n", v.name, sep)),
        }
    }
    out.push_str(&format!("}} {};\n", e.name));
    out
}

fn function_signature(f: &IrFunctionDef) -> String {
    let params = if f.params.is_empty() {
        "void".to_string()
    } else {
        f.params
            .iter()
            .map(|p| format!("{} {}", p.c_type, p.name))
            .collect::<Vec<_>>()
            .join(", ")
    };
    let prefix = if f.is_static { "static " } else { "" };
    format!("{}{} {}({})", prefix, f.return_type, f.name, params)
}

fn function_prototype(f: &IrFunctionDef) -> String {
    format!("{};", function_signature(f))
}

/// Render a full function definition (shared with the monomorphizer,
/// which pre-renders generic method bodies into raw sections).
pub fn render_function_def(f: &IrFunctionDef) -> String {
    let mut out = function_signature(f);
    out.push_str(" {\n");
    for stmt in &f.body.stmts {
        out.push_str(&render_stmt(stmt, 1));
    }
    out.push_str("}\n");
    out
}

fn indent(level: usize) -> String {
    "    ".repeat(level)
}

fn render_block(block: &IrBlock, level: usize) -> String {
    block.stmts.iter().map(|s| render_stmt(s, level)).collect()
}

pub fn render_stmt(stmt: &IrStmt, level: usize) -> String {
    let pad = indent(level);
    match stmt {
        IrStmt::VarDecl { c_type, name, init } => match init {
            Some(e) => format!("{}{} {} = {};\n", pad, c_type, name, render_expr(e)),
            None => format!("{}{} {};\n", pad, c_type, name),
        },
        IrStmt::Assign { target, value } => {
            format!("{}{} = {};\n", pad, render_expr(target), render_expr(value))
        }
        IrStmt::Return { value } => match value {
            Some(e) => format!("{}return {};\n", pad, render_expr(e)),
            None => format!("{}return;\n", pad),
        },
        IrStmt::If {
            condition,
            then_block,
            else_block,
        } => {
            let mut out = format!("{}if ({}) {{\n", pad, cond_expr(condition));
            out.push_str(&render_block(then_block, level + 1));
            match else_block {
                Some(e) => {
                    out.push_str(&format!("{}}} else {{\n", pad));
                    out.push_str(&render_block(e, level + 1));
                    out.push_str(&format!("{}}}\n", pad));
                }
                None => out.push_str(&format!("{}}}\n", pad)),
            }
            out
        }
        IrStmt::While { condition, body } => {
            let mut out = format!("{}while ({}) {{\n", pad, cond_expr(condition));
            out.push_str(&render_block(body, level + 1));
            out.push_str(&format!("{}}}\n", pad));
            out
        }
        IrStmt::DoWhile { body, condition } => {
            let mut out = format!("{}do {{\n", pad);
            out.push_str(&render_block(body, level + 1));
            out.push_str(&format!("{}}} while ({});\n", pad, cond_expr(condition)));
            out
        }
        IrStmt::For {
            init,
            condition,
            update,
            body,
        } => {
            let mut out = format!("{}for ({}; {}; {}) {{\n", pad, init, condition, update);
            out.push_str(&render_block(body, level + 1));
            out.push_str(&format!("{}}}\n", pad));
            out
        }
        IrStmt::Switch { value, cases } => {
            let mut out = format!("{}switch ({}) {{\n", pad, cond_expr(value));
            for case in cases {
                match &case.value {
                    Some(v) => out.push_str(&format!("{}case {}: {{\n", indent(level + 1), render_expr(v))),
                    None => out.push_str(&format!("{}default: {{\n", indent(level + 1))),
                }
                for s in &case.body {
                    out.push_str(&render_stmt(s, level + 2));
                }
                out.push_str(&format!("{}break;\n", indent(level + 2)));
                out.push_str(&format!("{}}}\n", indent(level + 1)));
            }
            out.push_str(&format!("{}}}\n", pad));
            out
        }
        IrStmt::ExprStmt { expr } => format!("{}{};\n", pad, render_expr(expr)),
        IrStmt::RawC { text, .. } => {
            let mut out = String::new();
            for line in text.lines() {
                out.push_str(&format!("{}{}\n", pad, line));
            }
            out
        }
        IrStmt::Break => format!("{}break;\n", pad),
        IrStmt::Continue => format!("{}continue;\n", pad),
    }
}

/// Emit a condition expression, stripping redundant outer parentheses
/// (the caller wraps in parens already; `if ((x == 0))` would trip
/// -Wparentheses-equality).
fn cond_expr(expr: &IrExpr) -> String {
    let result = render_expr(expr);
    if result.starts_with('(') && result.ends_with(')') {
        let mut depth = 0i32;
        for (i, ch) in result.char_indices() {
            match ch {
                '(' => depth += 1,
                ')' => depth -= 1,
                _ => {}
            }
            if depth == 0 && i < result.len() - 1 {
                return result;
            }
        }
        return result[1..result.len() - 1].to_string();
    }
    result
}

pub fn render_expr(expr: &IrExpr) -> String {
    match expr {
        IrExpr::Literal(text) => text.clone(),
        IrExpr::Var(name) => name.clone(),
        IrExpr::BinOp { left, op, right } => {
            format!("({} {} {})", render_expr(left), op, render_expr(right))
        }
        IrExpr::UnaryOp {
            op,
            operand,
            prefix,
        } => {
            if *prefix {
                format!("({}{})", op, render_expr(operand))
            } else {
                format!("({}{})", render_expr(operand), op)
            }
        }
        IrExpr::Call { callee, args, .. } => {
            let args: Vec<String> = args.iter().map(render_expr).collect();
            format!("{}({})", callee, args.join(", "))
        }
        IrExpr::FieldAccess { obj, field, arrow } => {
            let sep = if *arrow { "->" } else { "." };
            format!("{}{}{}", render_expr(obj), sep, field)
        }
        IrExpr::Cast { target_type, expr } => {
            format!("(({}){})", target_type, render_expr(expr))
        }
        IrExpr::Ternary {
            condition,
            true_expr,
            false_expr,
        } => format!(
            "({} ? {} : {})",
            render_expr(condition),
            render_expr(true_expr),
            render_expr(false_expr)
        ),
        IrExpr::Sizeof(operand) => format!("sizeof({})", operand),
        IrExpr::Index { obj, index } => {
            format!("{}[{}]", render_expr(obj), render_expr(index))
        }
        IrExpr::AddressOf(e) => format!("(&{})", render_expr(e)),
        IrExpr::Deref(e) => format!("(*{})", render_expr(e)),
        IrExpr::RawExpr(text) => text.clone(),
        IrExpr::StmtExpr { stmts, result } => {
            let mut parts: Vec<String> = stmts
                .iter()
                .map(|s| render_stmt(s, 0).trim_end().to_string())
                .collect();
            parts.push(format!("{};", render_expr(result)));
            format!("({{ {} }})", parts.join(" "))
        }
        IrExpr::SpawnThread {
            fn_ptr,
            capture_arg,
        } => {
            let arg = capture_arg
                .as_ref()
                .map(|a| render_expr(a))
                .unwrap_or_else(|| "NULL".to_string());
            format!("__btrc_thread_spawn((void*(*)(void*)){}, {})", fn_ptr, arg)
        }
    }
}
