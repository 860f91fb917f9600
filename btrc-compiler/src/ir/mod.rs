// IR node definitions for the btrc compiler.
//
// Tree-structured IR between the analyzed AST and C text emission.
// C is structured, so a tree IR produces readable output. All AST
// lowering (class layout, generics, method-to-function, new/delete
// expansion, for-in expansion, f-string expansion, lambda lifting)
// happens during IR generation; the C emitter is a simple tree walk.

/// Fully-resolved C type string (e.g., `int`, `btrc_List_int*`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CType(pub String);

impl CType {
    pub fn new(text: impl Into<String>) -> Self {
        CType(text.into())
    }
}

impl std::fmt::Display for CType {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Root of the IR tree — one translation unit (.c file).
#[derive(Debug, Default)]
pub struct IrModule {
    pub includes: Vec<String>,
    /// Verbatim C strings: typedefs, struct forwards, prototypes.
    pub forward_decls: Vec<String>,
    pub helper_decls: Vec<IrHelperDecl>,
    pub struct_defs: Vec<IrStructDef>,
    pub enum_defs: Vec<IrEnumDef>,
    pub global_vars: Vec<String>,
    pub function_defs: Vec<IrFunctionDef>,
    /// Pre-rendered C text: tagged-union typedefs, monomorphized
    /// generic method bodies.
    pub raw_sections: Vec<String>,
}

/// A runtime helper with its pre-rendered C source text.
///
/// `category` groups helpers (`alloc`, `string`, `trycatch`, ...);
/// `depends_on` lists categories this helper requires. Emission is
/// conditional on reachability (see optimizer).
#[derive(Debug, Clone)]
pub struct IrHelperDecl {
    pub category: String,
    pub name: String,
    pub c_source: String,
    pub depends_on: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct IrStructField {
    pub c_type: CType,
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct IrStructDef {
    pub name: String,
    pub fields: Vec<IrStructField>,
}

#[derive(Debug, Clone)]
pub struct IrEnumValue {
    pub name: String,
    pub value: Option<String>,
}

#[derive(Debug, Clone)]
pub struct IrEnumDef {
    pub name: String,
    pub values: Vec<IrEnumValue>,
}

#[derive(Debug, Clone)]
pub struct IrParam {
    pub c_type: CType,
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct IrFunctionDef {
    pub name: String,
    pub return_type: CType,
    pub params: Vec<IrParam>,
    pub body: IrBlock,
    pub is_static: bool,
    /// Source line for `#line` directives under --debug.
    pub source_line: Option<usize>,
}

#[derive(Debug, Clone, Default)]
pub struct IrBlock {
    pub stmts: Vec<IrStmt>,
}

impl IrBlock {
    pub fn new(stmts: Vec<IrStmt>) -> Self {
        IrBlock { stmts }
    }
}

#[derive(Debug, Clone)]
pub enum IrStmt {
    VarDecl {
        c_type: CType,
        name: String,
        init: Option<IrExpr>,
    },
    Assign {
        target: IrExpr,
        value: IrExpr,
    },
    Return {
        value: Option<IrExpr>,
    },
    If {
        condition: IrExpr,
        then_block: IrBlock,
        else_block: Option<IrBlock>,
    },
    While {
        condition: IrExpr,
        body: IrBlock,
    },
    DoWhile {
        body: IrBlock,
        condition: IrExpr,
    },
    /// C-style for; header parts are pre-rendered text to keep the
    /// emitter trivial.
    For {
        init: String,
        condition: String,
        update: String,
        body: IrBlock,
    },
    Switch {
        value: IrExpr,
        cases: Vec<IrCase>,
    },
    ExprStmt {
        expr: IrExpr,
    },
    /// Escape hatch: pre-rendered C text (setjmp boilerplate, etc.).
    /// `helper_refs` keeps the referenced helpers visible to DCE.
    RawC {
        text: String,
        helper_refs: Vec<String>,
    },
    Break,
    Continue,
}

impl IrStmt {
    pub fn raw(text: impl Into<String>) -> Self {
        IrStmt::RawC {
            text: text.into(),
            helper_refs: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct IrCase {
    /// None = default clause.
    pub value: Option<IrExpr>,
    pub body: Vec<IrStmt>,
}

#[derive(Debug, Clone)]
pub enum IrExpr {
    /// C literal text (`42`, `"hello"`, `NULL`).
    Literal(String),
    Var(String),
    BinOp {
        left: Box<IrExpr>,
        op: String,
        right: Box<IrExpr>,
    },
    UnaryOp {
        op: String,
        operand: Box<IrExpr>,
        prefix: bool,
    },
    /// `helper_ref`, when non-empty, names the runtime helper this
    /// call depends on — the optimizer's reachability seed.
    Call {
        callee: String,
        args: Vec<IrExpr>,
        helper_ref: String,
    },
    FieldAccess {
        obj: Box<IrExpr>,
        field: String,
        arrow: bool,
    },
    Cast {
        target_type: String,
        expr: Box<IrExpr>,
    },
    Ternary {
        condition: Box<IrExpr>,
        true_expr: Box<IrExpr>,
        false_expr: Box<IrExpr>,
    },
    /// Operand is C type or expression text.
    Sizeof(String),
    Index {
        obj: Box<IrExpr>,
        index: Box<IrExpr>,
    },
    AddressOf(Box<IrExpr>),
    Deref(Box<IrExpr>),
    /// Escape hatch: pre-rendered C expression text.
    RawExpr(String),
    /// GCC statement expression: `({ stmt; stmt; result; })`.
    StmtExpr {
        stmts: Vec<IrStmt>,
        result: Box<IrExpr>,
    },
    /// `__btrc_thread_spawn(fn_ptr, capture_arg)`.
    SpawnThread {
        fn_ptr: String,
        capture_arg: Option<Box<IrExpr>>,
    },
}

impl IrExpr {
    pub fn lit(text: impl Into<String>) -> Self {
        IrExpr::Literal(text.into())
    }

    pub fn var(name: impl Into<String>) -> Self {
        IrExpr::Var(name.into())
    }

    pub fn raw(text: impl Into<String>) -> Self {
        IrExpr::RawExpr(text.into())
    }

    pub fn call(callee: impl Into<String>, args: Vec<IrExpr>) -> Self {
        IrExpr::Call {
            callee: callee.into(),
            args,
            helper_ref: String::new(),
        }
    }

    /// A call that depends on the named runtime helper.
    pub fn call_helper(callee: impl Into<String>, args: Vec<IrExpr>) -> Self {
        let callee = callee.into();
        IrExpr::Call {
            helper_ref: callee.clone(),
            callee,
            args,
        }
    }

    pub fn binop(left: IrExpr, op: impl Into<String>, right: IrExpr) -> Self {
        IrExpr::BinOp {
            left: Box::new(left),
            op: op.into(),
            right: Box::new(right),
        }
    }

    pub fn field(obj: IrExpr, field: impl Into<String>, arrow: bool) -> Self {
        IrExpr::FieldAccess {
            obj: Box::new(obj),
            field: field.into(),
            arrow,
        }
    }

    pub fn cast(target_type: impl Into<String>, expr: IrExpr) -> Self {
        IrExpr::Cast {
            target_type: target_type.into(),
            expr: Box::new(expr),
        }
    }
}
