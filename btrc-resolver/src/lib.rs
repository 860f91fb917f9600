// Name and type resolution for btrc.
//
// The resolver walks the parsed program twice: pass 1 collects the
// symbol tables (classes, functions, enums, typedefs), pass 2 walks
// every body inferring expression types into `node_types` and
// collecting concrete generic instantiations. All diagnostics are
// accumulated — the driver prints them in one batch and refuses to run
// the IR generator if any exist.

use btrc_ast::*;
use btrc_diagnostics::{Diagnostic, Span};
use indexmap::IndexMap;
use std::collections::HashMap;

mod infer;

/// A class field as the IR generator sees it.
#[derive(Debug, Clone)]
pub struct FieldInfo {
    pub ty: TypeExpr,
    pub initializer: Option<Expr>,
}

/// A method signature plus body, flattened out of the class AST.
#[derive(Debug, Clone)]
pub struct MethodInfo {
    pub name: String,
    pub params: Vec<Param>,
    pub return_type: Option<TypeExpr>,
    pub body: Option<Block>,
    pub is_static: bool,
    pub keep_return: bool,
}

#[derive(Debug, Clone)]
pub struct PropertyInfo {
    pub ty: TypeExpr,
    pub has_getter: bool,
    pub getter_body: Option<Block>,
    pub has_setter: bool,
    pub setter_body: Option<Block>,
}

#[derive(Debug, Clone)]
pub struct ClassInfo {
    pub name: String,
    pub parent: Option<String>,
    pub generic_params: Vec<String>,
    pub fields: IndexMap<String, FieldInfo>,
    pub methods: IndexMap<String, MethodInfo>,
    pub constructor: Option<MethodInfo>,
    pub properties: IndexMap<String, PropertyInfo>,
    pub is_abstract: bool,
    /// Whether this class's static field graph can reach itself —
    /// such instances need the phased release path.
    pub is_cyclable: bool,
}

#[derive(Debug, Clone)]
pub struct FunctionInfo {
    pub name: String,
    pub params: Vec<Param>,
    pub return_type: Option<TypeExpr>,
    pub has_body: bool,
    pub keep_return: bool,
}

/// A variable captured by a lambda from its enclosing scope.
#[derive(Debug, Clone)]
pub struct Capture {
    pub name: String,
    pub ty: TypeExpr,
}

/// The resolver's output — everything the IR generator consumes.
pub struct AnalyzedProgram {
    pub program: Program,
    pub class_table: IndexMap<String, ClassInfo>,
    pub function_table: IndexMap<String, FunctionInfo>,
    pub enum_table: IndexMap<String, Vec<String>>,
    pub rich_enum_table: IndexMap<String, Vec<String>>,
    pub node_types: HashMap<NodeId, TypeExpr>,
    /// base class name → list of type-argument tuples instantiated
    /// anywhere in the program.
    pub generic_instances: IndexMap<String, Vec<Vec<TypeExpr>>>,
    pub lambda_captures: HashMap<NodeId, Vec<Capture>>,
    pub errors: Vec<Diagnostic>,
}

impl AnalyzedProgram {
    /// Register one generic instantiation, de-duplicated by argument
    /// tuple. Also used by the monomorphizer for transitive instances.
    pub fn register_instance(&mut self, base: &str, args: &[TypeExpr]) {
        if args.is_empty() {
            return;
        }
        let entry = self.generic_instances.entry(base.to_string()).or_default();
        if !entry.iter().any(|a| a == args) {
            entry.push(args.to_vec());
        }
    }
}

pub struct Analyzer {
    file: String,
    pub(crate) typedefs: IndexMap<String, TypeExpr>,
    pub(crate) struct_table: IndexMap<String, Vec<(String, TypeExpr)>>,
    pub(crate) interface_table: IndexMap<String, Vec<String>>,
}

impl Analyzer {
    pub fn new(file: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            typedefs: IndexMap::new(),
            struct_table: IndexMap::new(),
            interface_table: IndexMap::new(),
        }
    }

    pub fn analyze(mut self, program: Program) -> AnalyzedProgram {
        log::debug!("resolving {} declarations", program.declarations.len());
        let mut analyzed = AnalyzedProgram {
            program,
            class_table: IndexMap::new(),
            function_table: IndexMap::new(),
            enum_table: IndexMap::new(),
            rich_enum_table: IndexMap::new(),
            node_types: HashMap::new(),
            generic_instances: IndexMap::new(),
            lambda_captures: HashMap::new(),
            errors: Vec::new(),
        };

        self.collect_tables(&mut analyzed);
        self.compute_cyclable(&mut analyzed);
        infer::run(&self, &mut analyzed);

        log::debug!(
            "resolved: {} classes, {} functions, {} generic bases, {} errors",
            analyzed.class_table.len(),
            analyzed.function_table.len(),
            analyzed.generic_instances.len(),
            analyzed.errors.len()
        );
        analyzed
    }

    pub(crate) fn span(&self, line: usize, col: usize) -> Span {
        Span::new(self.file.clone(), line, col)
    }

    // ==================== Pass 1: tables ====================

    fn collect_tables(&mut self, analyzed: &mut AnalyzedProgram) {
        let decls = analyzed.program.declarations.clone();
        for decl in &decls {
            match decl {
                Decl::Class(c) => self.collect_class(c, analyzed),
                Decl::Function(f) => {
                    analyzed.function_table.insert(
                        f.name.clone(),
                        FunctionInfo {
                            name: f.name.clone(),
                            params: f.params.clone(),
                            return_type: f.return_type.clone(),
                            has_body: f.body.is_some(),
                            keep_return: f.keep_return,
                        },
                    );
                }
                Decl::Enum(e) => {
                    analyzed
                        .enum_table
                        .insert(e.name.clone(), e.values.iter().map(|v| v.name.clone()).collect());
                }
                Decl::RichEnum(e) => {
                    analyzed.rich_enum_table.insert(
                        e.name.clone(),
                        e.variants.iter().map(|v| v.name.clone()).collect(),
                    );
                }
                Decl::Struct(s) => {
                    self.struct_table.insert(
                        s.name.clone(),
                        s.fields
                            .iter()
                            .map(|f| (f.name.clone(), f.ty.clone()))
                            .collect(),
                    );
                }
                Decl::Typedef(t) => {
                    self.typedefs.insert(t.name.clone(), t.ty.clone());
                }
                Decl::Interface(i) => {
                    self.interface_table
                        .insert(i.name.clone(), i.methods.iter().map(|m| m.name.clone()).collect());
                }
                Decl::Var(_) | Decl::Preprocessor { .. } => {}
            }
        }
    }

    fn collect_class(&mut self, c: &ClassDecl, analyzed: &mut AnalyzedProgram) {
        let mut info = ClassInfo {
            name: c.name.clone(),
            parent: c.parent.clone(),
            generic_params: c.generic_params.clone(),
            fields: IndexMap::new(),
            methods: IndexMap::new(),
            constructor: None,
            properties: IndexMap::new(),
            is_abstract: c.is_abstract,
            is_cyclable: false,
        };

        for member in &c.members {
            match member {
                ClassMember::Field(f) => {
                    info.fields.insert(
                        f.name.clone(),
                        FieldInfo {
                            ty: self.expand_typedefs(&f.ty),
                            initializer: f.initializer.clone(),
                        },
                    );
                }
                ClassMember::Method(m) => {
                    let mi = MethodInfo {
                        name: m.name.clone(),
                        params: m.params.clone(),
                        return_type: m.return_type.clone(),
                        body: m.body.clone(),
                        is_static: m.is_static,
                        keep_return: m.keep_return,
                    };
                    if m.name == c.name {
                        info.constructor = Some(mi);
                    } else {
                        info.methods.insert(m.name.clone(), mi);
                    }
                }
                ClassMember::Property(p) => {
                    info.properties.insert(
                        p.name.clone(),
                        PropertyInfo {
                            ty: p.ty.clone(),
                            has_getter: p.has_getter,
                            getter_body: p.getter_body.clone(),
                            has_setter: p.has_setter,
                            setter_body: p.setter_body.clone(),
                        },
                    );
                }
            }
        }

        analyzed.class_table.insert(c.name.clone(), info);
    }

    /// Expand typedef base names (one level is enough in practice;
    /// loop to be safe against chains, bail on cycles).
    pub(crate) fn expand_typedefs(&self, t: &TypeExpr) -> TypeExpr {
        let mut result = t.clone();
        let mut hops = 0;
        while let Some(target) = self.typedefs.get(&result.base) {
            if hops > 8 {
                break;
            }
            let mut expanded = target.clone();
            expanded.pointer_depth += result.pointer_depth;
            expanded.is_const |= result.is_const;
            if expanded.generic_args.is_empty() {
                expanded.generic_args = result.generic_args.clone();
            }
            result = expanded;
            hops += 1;
        }
        result.generic_args = result
            .generic_args
            .iter()
            .map(|a| self.expand_typedefs(a))
            .collect();
        result
    }

    // ==================== Cyclability ====================

    /// A class is cyclable when its static field graph can reach
    /// itself. Those instances need trial deletion at scope exit.
    fn compute_cyclable(&self, analyzed: &mut AnalyzedProgram) {
        let names: Vec<String> = analyzed.class_table.keys().cloned().collect();
        let mut edges: HashMap<String, Vec<String>> = HashMap::new();
        for (name, info) in &analyzed.class_table {
            let mut targets = Vec::new();
            for fd in info.fields.values() {
                if analyzed.class_table.contains_key(&fd.ty.base) {
                    targets.push(fd.ty.base.clone());
                }
            }
            edges.insert(name.clone(), targets);
        }

        for name in &names {
            if Self::reaches(name, name, &edges, &mut Vec::new()) {
                if let Some(info) = analyzed.class_table.get_mut(name) {
                    info.is_cyclable = true;
                }
            }
        }
    }

    fn reaches(
        from: &str,
        target: &str,
        edges: &HashMap<String, Vec<String>>,
        visiting: &mut Vec<String>,
    ) -> bool {
        let Some(nexts) = edges.get(from) else {
            return false;
        };
        for next in nexts {
            if next == target {
                return true;
            }
            if visiting.iter().any(|v| v == next) {
                continue;
            }
            visiting.push(next.clone());
            if Self::reaches(next, target, edges, visiting) {
                return true;
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use btrc_parser::Parser;

    fn analyze(source: &str) -> AnalyzedProgram {
        let mut parser = Parser::new(source).unwrap();
        let program = parser.parse().unwrap();
        Analyzer::new("test.btrc").analyze(program)
    }

    #[test]
    fn test_class_table_collection() {
        let a = analyze(
            "class Point {\n  public int x = 0;\n  public int y = 0;\n  Point(int x, int y) { self.x = x; self.y = y; }\n  public int getX() { return self.x; }\n}\nint main() { return 0; }",
        );
        assert!(a.errors.is_empty(), "errors: {:?}", a.errors);
        let info = a.class_table.get("Point").unwrap();
        assert_eq!(info.fields.len(), 2);
        assert!(info.constructor.is_some());
        assert!(info.methods.contains_key("getX"));
        assert!(!info.is_cyclable);
    }

    #[test]
    fn test_cyclable_detection() {
        let a = analyze(
            "class Node {\n  public Node next = null;\n  Node() {}\n}\nclass Leaf {\n  public int v = 0;\n  Leaf() {}\n}\nint main() { return 0; }",
        );
        assert!(a.class_table.get("Node").unwrap().is_cyclable);
        assert!(!a.class_table.get("Leaf").unwrap().is_cyclable);
    }

    #[test]
    fn test_mutual_cycle_detection() {
        let a = analyze(
            "class A {\n  public B other = null;\n  A() {}\n}\nclass B {\n  public A other = null;\n  B() {}\n}\nint main() { return 0; }",
        );
        assert!(a.class_table.get("A").unwrap().is_cyclable);
        assert!(a.class_table.get("B").unwrap().is_cyclable);
    }

    #[test]
    fn test_generic_instance_collection() {
        let a = analyze("int main() {\n  List<int> xs = [1, 2, 3];\n  Map<string, int> m = {};\n  return 0;\n}");
        assert!(a.errors.is_empty(), "errors: {:?}", a.errors);
        assert!(a.generic_instances.contains_key("List"));
        assert!(a.generic_instances.contains_key("Map"));
    }

    #[test]
    fn test_undeclared_identifier_error() {
        let a = analyze("int main() { return missing_var; }");
        assert_eq!(a.errors.len(), 1);
        assert!(a.errors[0].message.contains("missing_var"));
    }

    #[test]
    fn test_abstract_instantiation_error() {
        let a = analyze(
            "abstract class Shape {\n  Shape() {}\n  abstract double area();\n}\nint main() {\n  Shape s = Shape();\n  return 0;\n}",
        );
        assert!(a
            .errors
            .iter()
            .any(|e| e.message.contains("abstract")), "errors: {:?}", a.errors);
    }
}
