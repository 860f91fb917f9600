use btrc_ast::*;
use btrc_parser::Parser;

fn parse(source: &str) -> Program {
    let mut parser = Parser::new(source).unwrap();
    parser.parse().unwrap()
}

#[test]
fn test_parse_function() {
    let program = parse("int add(int a, int b) { return a + b; }");
    assert_eq!(program.declarations.len(), 1);
    let Decl::Function(f) = &program.declarations[0] else {
        panic!("expected function");
    };
    assert_eq!(f.name, "add");
    assert_eq!(f.params.len(), 2);
    assert_eq!(f.return_type.as_ref().unwrap().base, "int");
}

#[test]
fn test_parse_class_with_members() {
    let program = parse(
        "class Point {\n\
         \x20   public int x = 0;\n\
         \x20   public int y = 0;\n\
         \x20   Point(int x, int y) { self.x = x; self.y = y; }\n\
         \x20   public int getX() { return self.x; }\n\
         \x20   static Point origin() { return Point(0, 0); }\n\
         }",
    );
    let Decl::Class(c) = &program.declarations[0] else {
        panic!("expected class");
    };
    assert_eq!(c.name, "Point");
    let fields: Vec<_> = c
        .members
        .iter()
        .filter(|m| matches!(m, ClassMember::Field(_)))
        .collect();
    assert_eq!(fields.len(), 2);
    let methods: Vec<_> = c
        .members
        .iter()
        .filter_map(|m| match m {
            ClassMember::Method(m) => Some(m),
            _ => None,
        })
        .collect();
    // Constructor + getX + origin
    assert_eq!(methods.len(), 3);
    assert!(methods.iter().any(|m| m.name == "Point"));
    assert!(methods.iter().any(|m| m.is_static && m.name == "origin"));
}

#[test]
fn test_parse_inheritance_and_generics() {
    let program = parse(
        "class Box<T> {\n    public T value = 0;\n    Box(T v) { self.value = v; }\n}\n\
         class Child extends Parent { Child() {} }",
    );
    let Decl::Class(b) = &program.declarations[0] else {
        panic!("expected class");
    };
    assert_eq!(b.generic_params, vec!["T".to_string()]);
    let Decl::Class(c) = &program.declarations[1] else {
        panic!("expected class");
    };
    assert_eq!(c.parent.as_deref(), Some("Parent"));
}

#[test]
fn test_parse_simple_enum() {
    let program = parse("enum Color { RED, GREEN = 5, BLUE }");
    let Decl::Enum(e) = &program.declarations[0] else {
        panic!("expected simple enum");
    };
    assert_eq!(e.values.len(), 3);
    assert!(e.values[1].value.is_some());
}

#[test]
fn test_parse_rich_enum() {
    let program = parse("enum Shape { Circle(double r), Rect(double w, double h), Dot }");
    let Decl::RichEnum(e) = &program.declarations[0] else {
        panic!("expected rich enum");
    };
    assert_eq!(e.variants.len(), 3);
    assert_eq!(e.variants[0].params.len(), 1);
    assert!(e.variants[2].params.is_empty());
}

#[test]
fn test_parse_property() {
    let program = parse(
        "class Rect {\n\
         \x20   public int w = 0;\n\
         \x20   Rect() {}\n\
         \x20   property int area { get { return self.w; } }\n\
         \x20   property int count;\n\
         }",
    );
    let Decl::Class(c) = &program.declarations[0] else {
        panic!("expected class");
    };
    let props: Vec<_> = c
        .members
        .iter()
        .filter_map(|m| match m {
            ClassMember::Property(p) => Some(p),
            _ => None,
        })
        .collect();
    assert_eq!(props.len(), 2);
    assert!(props[0].getter_body.is_some());
    assert!(!props[0].has_setter);
    // Auto property gets both accessors.
    assert!(props[1].has_getter && props[1].has_setter);
}

#[test]
fn test_parse_keep_annotations() {
    let program = parse("keep Point make(keep Point p) { return p; }");
    let Decl::Function(f) = &program.declarations[0] else {
        panic!("expected function");
    };
    assert!(f.keep_return);
    assert!(f.params[0].keep);
}

#[test]
fn test_parse_interface() {
    let program = parse("interface Shape extends Base { double area(); }");
    let Decl::Interface(i) = &program.declarations[0] else {
        panic!("expected interface");
    };
    assert_eq!(i.extends, vec!["Base".to_string()]);
    assert_eq!(i.methods.len(), 1);
    assert!(i.methods[0].body.is_none());
}

#[test]
fn test_parse_error_has_location() {
    let mut parser = Parser::new("int main() { int x = ; }").unwrap();
    let err = parser.parse().unwrap_err();
    let (line, col) = err.location();
    assert_eq!(line, 1);
    assert!(col > 1);
}
