use serde::{Deserialize, Serialize};

/// Root of the Abstract Syntax Tree — one btrc translation unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Program {
    pub declarations: Vec<Decl>,
}

/// Identity of an expression node, assigned by the parser.
///
/// The resolver keys its inferred-type table on this, so identity must
/// survive cloning (back-references go through ids, never pointers).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId(pub u32);

/// A btrc surface type.
///
/// `base` is a primitive name (`int`, `string`, ...), a built-in
/// generic (`List`, `Map`, `Set`, `Thread`), a user class/struct name,
/// the tuple marker `Tuple`, or the synthetic `__fn_ptr`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeExpr {
    pub base: String,
    pub generic_args: Vec<TypeExpr>,
    pub pointer_depth: usize,
    pub is_array: bool,
    pub array_size: Option<Box<Expr>>,
    pub is_const: bool,
}

impl TypeExpr {
    pub fn named(base: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            generic_args: Vec::new(),
            pointer_depth: 0,
            is_array: false,
            array_size: None,
            is_const: false,
        }
    }

    pub fn generic(base: impl Into<String>, args: Vec<TypeExpr>) -> Self {
        Self {
            generic_args: args,
            ..Self::named(base)
        }
    }

    pub fn void() -> Self {
        Self::named("void")
    }
}

// ==================== Declarations ====================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Decl {
    Class(ClassDecl),
    Function(FunctionDecl),
    Enum(EnumDecl),
    RichEnum(RichEnumDecl),
    Struct(StructDecl),
    Typedef(TypedefDecl),
    Interface(InterfaceDecl),
    /// Top-level variable → static C global.
    Var(VarDecl),
    /// `#include`/`#define`/... passed through verbatim.
    Preprocessor { text: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassDecl {
    pub name: String,
    pub parent: Option<String>,
    pub interfaces: Vec<String>,
    /// Single-uppercase-letter type parameters: T, K, V.
    pub generic_params: Vec<String>,
    pub is_abstract: bool,
    pub members: Vec<ClassMember>,
    pub line: usize,
    pub col: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ClassMember {
    Field(FieldDecl),
    Method(MethodDecl),
    Property(PropertyDecl),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDecl {
    pub ty: TypeExpr,
    pub name: String,
    pub initializer: Option<Expr>,
}

/// Methods double as constructors (name == class name) and the
/// destructor hook (`__del__`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodDecl {
    pub is_static: bool,
    pub is_abstract: bool,
    pub keep_return: bool,
    pub return_type: Option<TypeExpr>,
    pub name: String,
    pub params: Vec<Param>,
    pub body: Option<Block>,
    pub line: usize,
    pub col: usize,
}

/// `property int area { get {...} set {...} }` or `property int count;`
/// (the latter gets auto accessors over a `_prop_count` backing field).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyDecl {
    pub ty: TypeExpr,
    pub name: String,
    pub has_getter: bool,
    pub getter_body: Option<Block>,
    pub has_setter: bool,
    pub setter_body: Option<Block>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Param {
    pub name: String,
    pub ty: TypeExpr,
    pub default: Option<Expr>,
    /// `keep` annotation: caller increments the referent's refcount.
    pub keep: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDecl {
    pub keep_return: bool,
    pub return_type: Option<TypeExpr>,
    pub name: String,
    pub generic_params: Vec<String>,
    pub params: Vec<Param>,
    /// None = forward declaration only.
    pub body: Option<Block>,
    pub line: usize,
    pub col: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnumDecl {
    pub name: String,
    pub values: Vec<EnumValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnumValue {
    pub name: String,
    pub value: Option<Expr>,
}

/// Tagged-union enum: any variant carrying parameters makes the whole
/// enum "rich".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RichEnumDecl {
    pub name: String,
    pub variants: Vec<RichVariant>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RichVariant {
    pub name: String,
    pub params: Vec<Param>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructDecl {
    pub name: String,
    pub fields: Vec<StructField>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructField {
    pub ty: TypeExpr,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypedefDecl {
    pub name: String,
    pub ty: TypeExpr,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterfaceDecl {
    pub name: String,
    pub extends: Vec<String>,
    pub methods: Vec<MethodDecl>,
}

// ==================== Statements ====================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub statements: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Stmt {
    VarDecl(VarDecl),
    Expr(Expr),
    Return { value: Option<Expr> },
    If(IfStmt),
    While { condition: Expr, body: Block },
    DoWhile { body: Block, condition: Expr },
    CFor(CForStmt),
    ForIn(ForInStmt),
    Switch(SwitchStmt),
    Break,
    Continue,
    Delete { expr: Expr },
    Release { expr: Expr },
    Throw { expr: Expr },
    TryCatch(TryCatchStmt),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VarDecl {
    pub ty: Option<TypeExpr>,
    pub name: String,
    pub initializer: Option<Expr>,
    pub line: usize,
    pub col: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IfStmt {
    pub condition: Expr,
    pub then_block: Block,
    pub else_branch: Option<ElseBranch>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ElseBranch {
    Else(Block),
    ElseIf(Box<IfStmt>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CForStmt {
    pub init: Option<ForInit>,
    pub condition: Option<Expr>,
    pub update: Option<Expr>,
    pub body: Block,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ForInit {
    Var(VarDecl),
    Expr(Expr),
}

/// `for x in xs`, `for k, v in map`, `parallel for x in xs`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForInStmt {
    pub var_name: String,
    pub var_name2: Option<String>,
    pub iterable: Expr,
    pub body: Block,
    pub is_parallel: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwitchStmt {
    pub value: Expr,
    pub cases: Vec<SwitchCase>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwitchCase {
    /// None = default clause.
    pub value: Option<Expr>,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TryCatchStmt {
    pub try_block: Block,
    pub catch_type: Option<TypeExpr>,
    pub catch_var: Option<String>,
    pub catch_block: Block,
    pub finally_block: Option<Block>,
}

// ==================== Expressions ====================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expr {
    pub id: NodeId,
    pub line: usize,
    pub col: usize,
    pub kind: ExprKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExprKind {
    /// Raw text preserved so octal/hex spellings survive to C.
    IntLiteral { raw: String },
    FloatLiteral { raw: String },
    /// Raw text including the surrounding quotes.
    StringLiteral { raw: String },
    CharLiteral { raw: String },
    BoolLiteral { value: bool },
    NullLiteral,
    Identifier { name: String },
    SelfExpr,
    SuperExpr,
    Binary {
        op: String,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Unary {
        op: String,
        operand: Box<Expr>,
        prefix: bool,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
    },
    FieldAccess {
        obj: Box<Expr>,
        field: String,
        /// `a?.b` optional chaining.
        optional: bool,
        /// Written as `a->b` in the source. The generator still
        /// overrides this from the receiver's inferred type.
        arrow: bool,
    },
    Index {
        obj: Box<Expr>,
        index: Box<Expr>,
    },
    Assign {
        op: String,
        target: Box<Expr>,
        value: Box<Expr>,
    },
    Cast {
        target_type: TypeExpr,
        expr: Box<Expr>,
    },
    Sizeof(SizeofOperand),
    Ternary {
        condition: Box<Expr>,
        true_expr: Box<Expr>,
        false_expr: Box<Expr>,
    },
    New {
        ty: TypeExpr,
        args: Vec<Expr>,
    },
    ListLiteral { elements: Vec<Expr> },
    MapLiteral { entries: Vec<MapEntry> },
    TupleLiteral { elements: Vec<Expr> },
    /// `{}` / `{a, b}` brace initializer (context decides meaning).
    BraceInit { elements: Vec<Expr> },
    FString { parts: Vec<FStringPart> },
    Lambda(Box<LambdaExpr>),
    Spawn { func: Box<Expr> },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SizeofOperand {
    Type(TypeExpr),
    Expr(Box<Expr>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapEntry {
    pub key: Expr,
    pub value: Expr,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FStringPart {
    Text(String),
    Expr(Expr),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LambdaExpr {
    pub params: Vec<Param>,
    pub return_type: Option<TypeExpr>,
    pub body: LambdaBody,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LambdaBody {
    Block(Block),
    Expr(Expr),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_expr_constructors() {
        let t = TypeExpr::generic("List", vec![TypeExpr::named("int")]);
        assert_eq!(t.base, "List");
        assert_eq!(t.generic_args.len(), 1);
        assert!(!t.is_const);
        assert_eq!(TypeExpr::void().base, "void");
    }

    #[test]
    fn test_ast_serializes() {
        let prog = Program {
            declarations: vec![Decl::Preprocessor {
                text: "#include <math.h>".to_string(),
            }],
        };
        let json = serde_json::to_string(&prog).unwrap();
        let back: Program = serde_json::from_str(&json).unwrap();
        assert_eq!(prog, back);
    }
}
