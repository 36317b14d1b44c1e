use cellgraph_parse::{ASTNodeType, CellValue, FieldId, parse};

#[test]
fn concatenation_binds_looser_than_arithmetic() {
    let ast = parse("{fldA} + 1 & {fldB}").unwrap();
    match &ast.node_type {
        ASTNodeType::BinaryOp { op, left, .. } => {
            assert_eq!(op, "&");
            assert!(matches!(
                &left.node_type,
                ASTNodeType::BinaryOp { op, .. } if op == "+"
            ));
        }
        other => panic!("expected '&' at the root, got {other:?}"),
    }
}

#[test]
fn references_are_deduplicated_in_order() {
    let ast = parse("IF({b} > 0, {a} * {b}, {c})").unwrap();
    assert_eq!(
        ast.references(),
        vec![FieldId::from("b"), FieldId::from("a"), FieldId::from("c")]
    );
}

#[test]
fn rollup_expression_reads_values_slot() {
    let ast = parse("sum({values})").unwrap();
    match &ast.node_type {
        ASTNodeType::Function { name, args } => {
            assert_eq!(name, "SUM");
            assert_eq!(args.len(), 1);
        }
        other => panic!("expected a function call, got {other:?}"),
    }
    assert_eq!(ast.references(), vec![FieldId::from("values")]);
}

#[test]
fn unary_minus_and_parentheses() {
    let ast = parse("-(1 + 2) * 3").unwrap();
    assert_eq!(ast.to_string(), "(-(1 + 2) * 3)");
}

#[test]
fn literals_parse_to_cell_values() {
    let ast = parse("\"x\"").unwrap();
    assert_eq!(ast.node_type, ASTNodeType::Literal(CellValue::Text("x".into())));
    let ast = parse("true").unwrap();
    assert_eq!(ast.node_type, ASTNodeType::Literal(CellValue::Boolean(true)));
    let ast = parse("1.5e2").unwrap();
    assert_eq!(ast.node_type, ASTNodeType::Literal(CellValue::Number(150.0)));
}

#[test]
fn malformed_formulas_are_rejected() {
    for bad in ["", "1 +", "sum(1,", "(1", "1 2", "{a} {b}", "unknown"] {
        assert!(parse(bad).is_err(), "expected error for {bad:?}");
    }
}

#[test]
fn empty_argument_list() {
    let ast = parse("COUNT()").unwrap();
    assert!(matches!(ast.node_type, ASTNodeType::Function { ref args, .. } if args.is_empty()));
}
