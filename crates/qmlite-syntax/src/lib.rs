//! Tokenizer, parser and syntax tree for **qmlite** documents: a script
//! grammar extended with declarative element blocks.
//!
//! This crate is intentionally dependency-free so it can be consumed by
//! editor tooling and linters without pulling in the runtime.
//!
//! # Structure
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`ast`] | `Stmt`, `Expr`, `Document`, `QmlElement`, `QmlStatement` |
//! | [`error`] | `ParseError` |
//! | [`lexer`] | `Lexer`, `Token`, `TokenWithPos` |
//! | [`parser`] | `Parser`, `parse_program`, `parse_function_body`, `parse_expression_only` |
//! | [`document`] | `parse_document` |
//!
//! # Quick start
//!
//! ```rust
//! use qmlite_syntax::{parse_document, ast::QmlStatement};
//!
//! let src = r#"
//!     import QtQuick 2.0
//!     Rectangle {
//!         width: 100
//!         height: width / 2
//!     }
//! "#;
//!
//! let doc = parse_document(src).unwrap();
//! assert!(matches!(&doc.statements[0], QmlStatement::Element(e) if e.class_name == "Rectangle"));
//! ```

pub mod ast;
pub mod document;
pub mod error;
pub mod lexer;
pub mod parser;

pub use ast::Document;
pub use document::parse_document;
pub use error::{ErrorKind, ParseError};
pub use parser::{parse_expression_only, parse_function_body, parse_program, Parser};

#[cfg(test)]
mod parse_tests {
    use super::ast::*;
    use super::*;

    fn ok(src: &str) { parse_document(src).unwrap(); }
    fn err(src: &str) { parse_document(src).unwrap_err(); }
    fn script_ok(src: &str) { parse_program(src).unwrap(); }
    fn script_err(src: &str) -> ParseError { parse_program(src).unwrap_err() }

    fn root(src: &str) -> std::rc::Rc<QmlElement> {
        match parse_document(src).unwrap().statements.into_iter().next() {
            Some(QmlStatement::Element(e)) => e,
            other => panic!("expected element, got {:?}", other),
        }
    }

    // ── Script grammar ────────────────────────────────────────────────────

    #[test] fn asi_on_newline() { script_ok("var a = 1\nvar b = 2"); }
    #[test] fn asi_before_brace() { script_ok("function f() { return 1 }"); }
    #[test] fn missing_semicolon_same_line() { script_err("var a = 1 var b = 2"); }
    #[test]
    fn increment_after_newline_is_prefix() {
        let stmts = parse_program("var a = 1, b = 2\na\n++b").unwrap();
        assert_eq!(stmts.len(), 3);
        assert!(matches!(&stmts[1], Stmt::Expr(Expr::Name(n)) if n == "a"));
        assert!(matches!(&stmts[2], Stmt::Expr(Expr::UnaryPrefix(UnaryOp::Increment, _))));
        assert!(matches!(parse_expression_only("a++").unwrap(), Expr::UnaryPostfix(UnaryOp::Increment, _)));
    }
    #[test] fn return_outside_function() {
        assert!(script_err("return 5").message.contains("outside of function"));
    }
    #[test] fn break_outside_loop() {
        assert!(script_err("break;").message.contains("not inside a loop"));
    }
    #[test] fn continue_inside_switch_only() { script_err("switch (x) { case 1: continue; }"); }
    #[test] fn break_inside_switch() { script_ok("switch (x) { case 1: break; default: y = 2 }"); }
    #[test] fn labelled_break() { script_ok("outer: for (;;) { for (;;) { break outer; } }"); }
    #[test] fn unknown_label() {
        assert!(script_err("for (;;) { break nowhere; }").message.contains("Label nowhere"));
    }
    #[test] fn loop_depth_resets_in_function() {
        script_err("while (true) { (function () { break; })(); }");
    }
    #[test] fn try_requires_handler() { script_err("try { x() }"); }
    #[test] fn try_catch_finally() { script_ok("try { x() } catch (e) { y(e) } finally { z() }"); }
    #[test] fn for_in_with_var() { script_ok("for (var k in obj) { n++ }"); }
    #[test] fn do_while() { script_ok("do { i++ } while (i < 10);"); }
    #[test] fn getters_and_setters() { script_ok("var o = { get x() { return 1 }, set x(v) {} }"); }
    #[test] fn regex_at_statement_start() { script_ok("/ab+c/.test(s)"); }
    #[test] fn with_and_debugger() { script_ok("with (o) { a = b } debugger;"); }
    #[test] fn new_with_and_without_args() { script_ok("var a = new Foo; var b = new Bar(1, 2).baz"); }
    #[test] fn trailing_comma_and_elision() { script_ok("var a = [1,,2,]; var o = {a: 1,}"); }

    #[test]
    fn exigent_mode_rejects_bad_assignment() {
        let mut p = Parser::new("1 = 2").unwrap().exigent(true);
        assert!(p.parse_program().is_err());
        let mut p = Parser::new("1 = 2").unwrap();
        assert!(p.parse_program().is_ok());
    }

    #[test]
    fn precedence_climbing() {
        let expr = parse_expression_only("1 + 2 * 3 == 7 && !x").unwrap();
        let Expr::Binary(BinaryOp::And, left, right) = expr else { panic!("expected &&") };
        assert!(matches!(*right, Expr::UnaryPrefix(UnaryOp::Not, _)));
        let Expr::Binary(BinaryOp::Eq, sum, _) = *left else { panic!("expected ==") };
        let Expr::Binary(BinaryOp::Add, _, product) = *sum else { panic!("expected +") };
        assert!(matches!(*product, Expr::Binary(BinaryOp::Mul, _, _)));
    }

    #[test]
    fn left_associative_division() {
        let expr = parse_expression_only("a / b / c").unwrap();
        let Expr::Binary(BinaryOp::Div, left, right) = expr else { panic!("expected /") };
        assert_eq!(*right, Expr::Name("c".into()));
        assert!(matches!(*left, Expr::Binary(BinaryOp::Div, _, _)));
    }

    #[test]
    fn expression_only_rejects_trailing_input() {
        assert!(parse_expression_only("a b").is_err());
        assert!(parse_expression_only("{ a: 1, b: [2] }").is_ok());
    }

    #[test]
    fn compound_assignment() {
        let expr = parse_expression_only("x += 2").unwrap();
        assert!(matches!(expr, Expr::Assign(Some(BinaryOp::Add), _, _)));
    }

    #[test]
    fn error_position_is_one_based() {
        let e = script_err("var a = 1;\nvar b = );");
        assert_eq!((e.line, e.col), (2, 9));
        assert_eq!(e.kind, ErrorKind::Syntax);
    }

    // ── Document grammar ──────────────────────────────────────────────────

    #[test] fn empty_element() { ok("Item { }"); }
    #[test] fn imports_are_kept() {
        let doc = parse_document("import QtQuick 2.0\nimport \"lib\" as L\nItem {}").unwrap();
        assert_eq!(doc.imports.len(), 2);
        assert_eq!(doc.imports[0].target, "QtQuick");
        assert_eq!(doc.imports[0].version.as_deref(), Some("2.0"));
        assert!(doc.imports[1].is_path);
        assert_eq!(doc.imports[1].qualifier.as_deref(), Some("L"));
    }
    #[test] fn nested_elements() { ok("Item { Rectangle { Text { text: 'hi' } } }"); }
    #[test] fn semicolons_between_properties() { ok("Item { width: 5; height: 3 }"); }
    #[test] fn two_properties_same_line() { err("Item { width: 5 height: 3 }"); }
    #[test] fn unclosed_element() { err("Item { width: 5"); }
    #[test] fn element_list() { ok("Item { states: [ State { name: 'a' }, State { name: 'b' } ] }"); }
    #[test] fn handler_block_with_return() { ok("Item { onWidthChanged: { if (width > 3) return; x = 1 } }"); }
    #[test] fn object_literal_binding() { ok("Item { property var cfg: { a: 1, b: 2 } }"); }
    #[test] fn signal_without_params() { ok("Item { signal clicked }"); }
    #[test] fn list_property() { ok("Item { property list<Item> extras }"); }

    #[test]
    fn statement_forms() {
        let elem = root(
            "Item {
                id: root
                property int count: 3
                property alias label: txt.text
                default property var content
                signal moved(real dx, real dy)
                function reset(n) { count = n }
                anchors.left: parent.left
                font { bold: true }
                Behavior on x { NumberAnimation { duration: 100 } }
                Text { id: txt }
            }",
        );
        let kinds: Vec<&str> = elem.body.iter().map(|s| s.kind()).collect();
        assert_eq!(
            kinds,
            vec![
                "qmlprop", "qmlpropdef", "qmlaliasdef", "qmldefaultprop", "qmlsignaldef",
                "qmlmethod", "qmlobjdef", "qmlobj", "qmlelem", "qmlelem",
            ]
        );
        let QmlStatement::SignalDef { params, .. } = &elem.body[4] else { unreachable!() };
        assert_eq!(params.len(), 2);
        assert_eq!(params[1].name, "dy");
        let QmlStatement::Element(behavior) = &elem.body[8] else { unreachable!() };
        assert_eq!(behavior.on_property.as_deref(), Some("x"));
        let QmlStatement::AliasDef { object, property, .. } = &elem.body[2] else { unreachable!() };
        assert_eq!((object.as_str(), property.as_deref()), ("txt", Some("text")));
    }

    #[test]
    fn uppercase_with_dot_is_a_property() {
        let elem = root("Item { Component.onCompleted: go() }");
        assert!(matches!(
            &elem.body[0],
            QmlStatement::ObjectDef { object, property, .. } if object == "Component" && property == "onCompleted"
        ));
    }

    #[test]
    fn bound_statement_keeps_source() {
        let elem = root("Item {\n    width: parent.width * 2\n    height: 4 }");
        let QmlStatement::Property { value, .. } = &elem.body[0] else { unreachable!() };
        assert_eq!(value.source.trim_end(), "parent.width * 2");
        assert_eq!(value.line, 2);
    }

    #[test]
    fn method_source_is_the_whole_declaration() {
        let elem = root("Item { function twice(v) { return v * 2 } }");
        let QmlStatement::Method { name, source, function } = &elem.body[0] else { unreachable!() };
        assert_eq!(name, "twice");
        assert_eq!(source.trim_end(), "function twice(v) { return v * 2 }");
        assert_eq!(function.params, vec!["v".to_string()]);
    }

    #[test]
    fn inline_element_in_expression() {
        let elem = root("Item { delegate: Rectangle { color: 'red' } }");
        let QmlStatement::Property { value, .. } = &elem.body[0] else { unreachable!() };
        assert!(matches!(&*value.stmt, Stmt::Expr(Expr::QmlElem(e)) if e.class_name == "Rectangle"));
    }
}
