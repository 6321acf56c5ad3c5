//! Syntax tree → element templates.
//!
//! Each qml statement kind has one handler. Right-hand sides are folded to
//! plain values when they are bare literals, arrays of foldable items or
//! nested elements; everything else keeps its source and becomes a binding.

use std::rc::Rc;

use indexmap::IndexMap;
use qmlite_syntax::ast::{Atom, BoundStatement, Document, Expr, QmlElement, QmlStatement, Stmt};
use qmlite_syntax::parse_document;

use crate::binding::Binding;
use crate::error::CompileError;

use super::{MetaElement, MetaValue};

/// Compile a parsed document. It must consist of exactly one element.
pub fn compile(doc: &Document) -> Result<MetaElement, CompileError> {
    match doc.statements.as_slice() {
        [] => Err(CompileError::NoRootElement),
        [QmlStatement::Element(root)] => compile_element(root),
        [other] => Err(CompileError::Unexpected { kind: other.kind(), line: statement_line(other) }),
        many => Err(CompileError::MultipleRoots(many.len())),
    }
}

/// Parse and compile a document source.
pub fn parse_and_compile(source: &str) -> Result<MetaElement, CompileError> {
    let doc = parse_document(source)?;
    compile(&doc)
}

pub fn compile_element(elem: &QmlElement) -> Result<MetaElement, CompileError> {
    let mut meta = MetaElement::new(elem.class_name.as_str());
    meta.on_property = elem.on_property.clone();
    meta.line = elem.line;
    meta.col = elem.col;
    for stmt in &elem.body {
        compile_statement(&mut meta, stmt)?;
    }
    Ok(meta)
}

fn compile_statement(meta: &mut MetaElement, stmt: &QmlStatement) -> Result<(), CompileError> {
    match stmt {
        QmlStatement::Element(child) => meta.children.push(Rc::new(compile_element(child)?)),
        QmlStatement::Property { name, value } if name == "id" => match id_name(value) {
            Some(id) => meta.id = Some(id),
            None => log::warn!("line {}: ignoring invalid id \"{}\"", value.line, value.source.trim()),
        },
        QmlStatement::Property { name, value } => {
            let value = fold(value)?;
            meta.properties.insert(name.clone(), value);
        }
        QmlStatement::ObjectDef { object, property, value } => {
            let value = fold(value)?;
            group_insert(meta, object, property, value);
        }
        QmlStatement::Object { object, body } => {
            for inner in body {
                match inner {
                    QmlStatement::Property { name, value } => {
                        let value = fold(value)?;
                        group_insert(meta, object, name, value);
                    }
                    other => log::warn!(
                        "line {}: {} is not allowed in property group \"{object}\", skipped",
                        statement_line(other),
                        other.kind()
                    ),
                }
            }
        }
        QmlStatement::PropertyDef(decl) => {
            let value = decl.value.as_ref().map(fold).transpose()?.map(Box::new);
            meta.properties.insert(
                decl.name.clone(),
                MetaValue::PropertyDef { type_name: decl.type_name.clone(), value },
            );
        }
        QmlStatement::AliasDef { name, object, property } => {
            meta.properties.insert(
                name.clone(),
                MetaValue::Alias { object: object.clone(), property: property.clone() },
            );
        }
        QmlStatement::DefaultProperty(inner) => {
            let name = match &**inner {
                QmlStatement::PropertyDef(decl) => decl.name.clone(),
                QmlStatement::AliasDef { name, .. } => name.clone(),
                other => {
                    return Err(CompileError::Unexpected { kind: other.kind(), line: statement_line(other) });
                }
            };
            meta.default_property = Some(name);
            compile_statement(meta, inner)?;
        }
        QmlStatement::SignalDef { name, params } => {
            let params = params.iter().map(|p| p.name.clone()).collect();
            meta.properties.insert(name.clone(), MetaValue::Signal(params));
        }
        QmlStatement::Method { name, function, .. } => {
            meta.properties.insert(name.clone(), MetaValue::Method(function.clone()));
        }
    }
    Ok(())
}

/// Add `key: value` to the property group `group`, creating it on first use.
fn group_insert(meta: &mut MetaElement, group: &str, key: &str, value: MetaValue) {
    match meta.properties.get_mut(group) {
        Some(MetaValue::Group(map)) => {
            map.insert(key.to_string(), value);
            return;
        }
        Some(_) => log::warn!("\"{group}\" is assigned both a value and a property group; the group wins"),
        None => {}
    }
    let mut map = IndexMap::new();
    map.insert(key.to_string(), value);
    meta.properties.insert(group.to_string(), MetaValue::Group(map));
}

fn id_name(value: &BoundStatement) -> Option<String> {
    match &*value.stmt {
        Stmt::Expr(Expr::Name(name)) => Some(name.clone()),
        _ => None,
    }
}

/// Fold a bound statement to a plain value, or keep it as a binding.
fn fold(value: &BoundStatement) -> Result<MetaValue, CompileError> {
    if let Stmt::Expr(expr) = &*value.stmt {
        if let Some(folded) = fold_expr(expr)? {
            return Ok(folded);
        }
    }
    Ok(MetaValue::Binding(Rc::new(Binding::new(value.source.clone(), value.stmt.clone()))))
}

fn fold_expr(expr: &Expr) -> Result<Option<MetaValue>, CompileError> {
    Ok(match expr {
        Expr::Atom(Atom::True) => Some(MetaValue::Bool(true)),
        Expr::Atom(Atom::False) => Some(MetaValue::Bool(false)),
        Expr::Num(n) => Some(MetaValue::Number(*n)),
        Expr::Str(s) => Some(MetaValue::String(s.clone())),
        Expr::QmlElem(elem) => Some(MetaValue::Element(Rc::new(compile_element(elem)?))),
        Expr::Array(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                match item.as_ref().map(fold_expr).transpose()?.flatten() {
                    Some(v) => out.push(v),
                    None => return Ok(None),
                }
            }
            Some(MetaValue::List(out))
        }
        _ => None,
    })
}

fn statement_line(stmt: &QmlStatement) -> usize {
    match stmt {
        QmlStatement::Element(e) => e.line,
        QmlStatement::Property { value, .. } | QmlStatement::ObjectDef { value, .. } => value.line,
        QmlStatement::PropertyDef(decl) => decl.value.as_ref().map_or(0, |v| v.line),
        QmlStatement::DefaultProperty(inner) => statement_line(inner),
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compiled(src: &str) -> MetaElement {
        parse_and_compile(src).unwrap()
    }

    #[test]
    fn literals_fold_and_expressions_bind() {
        let meta = compiled("Item { a: 1; b: 'x'; c: true; d: [1, 'two']; e: a + 1; f: -1 }");
        assert!(matches!(meta.properties["a"], MetaValue::Number(n) if n == 1.0));
        assert!(matches!(&meta.properties["b"], MetaValue::String(s) if s == "x"));
        assert!(matches!(meta.properties["c"], MetaValue::Bool(true)));
        assert!(matches!(&meta.properties["d"], MetaValue::List(items) if items.len() == 2));
        assert!(meta.properties["e"].is_binding());
        assert!(meta.properties["f"].is_binding());
    }

    #[test]
    fn id_children_and_default_property() {
        let meta = compiled(
            "Item { id: root
                    default property list<QtObject> things
                    Item { }
                    Item { id: second } }",
        );
        assert_eq!(meta.id.as_deref(), Some("root"));
        assert_eq!(meta.default_property.as_deref(), Some("things"));
        assert_eq!(meta.children.len(), 2);
        assert_eq!(meta.children[1].id.as_deref(), Some("second"));
        assert!(!meta.properties.contains_key("id"));
    }

    #[test]
    fn group_statements_merge() {
        let meta = compiled("Item { font.bold: true; font { pixelSize: 12 } }");
        let MetaValue::Group(group) = &meta.properties["font"] else { panic!("not a group") };
        assert_eq!(group.keys().collect::<Vec<_>>(), ["bold", "pixelSize"]);
    }

    #[test]
    fn definitions() {
        let meta = compiled(
            "Item {
                property int count: 3
                property alias label: inner.text
                signal moved(int dx, int dy)
                function double(x) { return x * 2 }
            }",
        );
        assert!(matches!(&meta.properties["count"], MetaValue::PropertyDef { type_name, value: Some(_) } if type_name == "int"));
        assert!(matches!(&meta.properties["label"], MetaValue::Alias { object, property: Some(p) } if object == "inner" && p == "text"));
        assert!(matches!(&meta.properties["moved"], MetaValue::Signal(p) if p == &["dx", "dy"]));
        assert!(matches!(&meta.properties["double"], MetaValue::Method(_)));
    }

    #[test]
    fn nested_element_value_folds() {
        let meta = compiled("Item { delegate: Rectangle { width: 2 } }");
        assert!(matches!(&meta.properties["delegate"], MetaValue::Element(e) if e.class_name == "Rectangle"));
    }

    #[test]
    fn root_must_be_a_single_element() {
        assert!(matches!(parse_and_compile(""), Err(CompileError::NoRootElement)));
        assert!(matches!(parse_and_compile("Item {} Item {}"), Err(CompileError::MultipleRoots(2))));
    }
}
