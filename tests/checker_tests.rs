//! Static checking: the programs here never start executing.

use prescribe::{compile, ErrorKind};

fn check_err(source: &str) -> prescribe::Diagnostic {
    compile(source).expect_err("expected the checker to reject this program")
}

fn check_ok(source: &str) {
    if let Err(error) = compile(source) {
        panic!("checker rejected a valid program: {error}");
    }
}

#[test]
fn no_implicit_numeric_conversions() {
    let error = check_err("PROGRAM P\n OUTPUT 1 + 2.5\nENDPROGRAM");
    assert_eq!(error.kind, ErrorKind::Type);
    assert_eq!(error.line, 2);

    let error = check_err(
        "PROGRAM P\n DECLARE R : REAL\n R <- 1\nENDPROGRAM",
    );
    assert_eq!(error.kind, ErrorKind::Type);
}

#[test]
fn explicit_conversions_accepted() {
    check_ok("PROGRAM P\n OUTPUT REAL(1) + 2.5\n OUTPUT INT(2.5) + 1\nENDPROGRAM");
}

#[test]
fn undeclared_names_are_name_errors() {
    let error = check_err("PROGRAM P\n OUTPUT Missing\nENDPROGRAM");
    assert_eq!(error.kind, ErrorKind::Name);
}

#[test]
fn assignment_to_constant_is_access_error() {
    let error = check_err("PROGRAM P\n CONSTANT K = 3\n K <- 4\nENDPROGRAM");
    assert_eq!(error.kind, ErrorKind::Access);
    assert_eq!(error.line, 3);
}

#[test]
fn assignment_to_loop_counter_is_access_error() {
    let source = r#"
PROGRAM P
  DECLARE i : INTEGER
  FOR i <- 1 TO 3
    i <- 5
  NEXT i
ENDPROGRAM
"#;
    let error = check_err(source);
    assert_eq!(error.kind, ErrorKind::Access);
    assert_eq!(error.line, 5);
}

#[test]
fn next_must_name_the_counter() {
    let source = "PROGRAM P\n FOR i <- 1 TO 3\n OUTPUT i\n NEXT j\nENDPROGRAM";
    let error = check_err(source);
    assert_eq!(error.kind, ErrorKind::Syntax);
}

#[test]
fn for_bounds_must_be_integers() {
    let error = check_err("PROGRAM P\n FOR i <- 1.0 TO 3.0\n NEXT i\nENDPROGRAM");
    assert_eq!(error.kind, ErrorKind::Type);
}

#[test]
fn conditions_must_be_boolean() {
    assert_eq!(
        check_err("PROGRAM P\n IF 1 THEN\n OUTPUT 1\n ENDIF\nENDPROGRAM").kind,
        ErrorKind::Type
    );
    assert_eq!(
        check_err("PROGRAM P\n WHILE 1\n OUTPUT 1\n ENDWHILE\nENDPROGRAM").kind,
        ErrorKind::Type
    );
}

#[test]
fn boolean_operators_require_booleans() {
    let error = check_err("PROGRAM P\n OUTPUT 1 AND 2\nENDPROGRAM");
    assert_eq!(error.kind, ErrorKind::Type);
}

#[test]
fn ordering_rejects_booleans_but_equality_accepts_them() {
    assert_eq!(
        check_err("PROGRAM P\n OUTPUT TRUE < FALSE\nENDPROGRAM").kind,
        ErrorKind::Type
    );
    check_ok("PROGRAM P\n OUTPUT TRUE = FALSE\nENDPROGRAM");
}

#[test]
fn pointers_are_not_comparable() {
    let source = r#"
PROGRAM P
  DECLARE A : POINTER TO INTEGER
  DECLARE B : POINTER TO INTEGER
  OUTPUT A = B
ENDPROGRAM
"#;
    assert_eq!(check_err(source).kind, ErrorKind::Type);
}

#[test]
fn duplicate_case_labels_are_syntax_errors() {
    let source = r#"
PROGRAM P
  DECLARE X : INTEGER
  CASE OF X
    1 : OUTPUT "a"
    2, 1 : OUTPUT "b"
  ENDCASE
ENDPROGRAM
"#;
    let error = check_err(source);
    assert_eq!(error.kind, ErrorKind::Syntax);
    assert_eq!(error.line, 6);
}

#[test]
fn case_labels_must_match_subject_type() {
    let source = r#"
PROGRAM P
  DECLARE X : INTEGER
  CASE OF X
    'a' : OUTPUT 1
  ENDCASE
ENDPROGRAM
"#;
    assert_eq!(check_err(source).kind, ErrorKind::Type);
}

#[test]
fn case_subject_types_are_restricted() {
    let source = r#"
PROGRAM P
  DECLARE X : REAL
  CASE OF X
    OTHERWISE OUTPUT 1
  ENDCASE
ENDPROGRAM
"#;
    assert_eq!(check_err(source).kind, ErrorKind::Type);
}

#[test]
fn call_arity_and_types_are_checked() {
    let source = r#"
PROGRAM P
  PROCEDURE Show(BYVAL N : INTEGER)
    OUTPUT N
  ENDPROCEDURE
  CALL Show(1, 2)
ENDPROGRAM
"#;
    assert_eq!(check_err(source).kind, ErrorKind::Type);

    let source = r#"
PROGRAM P
  PROCEDURE Show(BYVAL N : INTEGER)
    OUTPUT N
  ENDPROCEDURE
  CALL Show("text")
ENDPROGRAM
"#;
    assert_eq!(check_err(source).kind, ErrorKind::Type);
}

#[test]
fn byref_arguments_must_be_lvalues() {
    let source = r#"
PROGRAM P
  PROCEDURE Bump(BYREF N : INTEGER)
    N <- N + 1
  ENDPROCEDURE
  CALL Bump(1 + 2)
ENDPROGRAM
"#;
    assert_eq!(check_err(source).kind, ErrorKind::Type);
}

#[test]
fn functions_cannot_be_called_as_procedures() {
    let source = r#"
PROGRAM P
  FUNCTION F RETURNS INTEGER
    RETURN 1
  ENDFUNCTION
  CALL F
ENDPROGRAM
"#;
    assert_eq!(check_err(source).kind, ErrorKind::Type);
}

#[test]
fn procedures_cannot_appear_in_expressions() {
    let source = r#"
PROGRAM P
  PROCEDURE Noop
  ENDPROCEDURE
  OUTPUT Noop()
ENDPROGRAM
"#;
    assert_eq!(check_err(source).kind, ErrorKind::Type);
}

#[test]
fn return_type_must_match() {
    let source = r#"
PROGRAM P
  FUNCTION F RETURNS INTEGER
    RETURN "text"
  ENDFUNCTION
  OUTPUT F()
ENDPROGRAM
"#;
    assert_eq!(check_err(source).kind, ErrorKind::Type);
}

#[test]
fn return_outside_routines_is_rejected() {
    assert_eq!(
        check_err("PROGRAM P\n RETURN 1\nENDPROGRAM").kind,
        ErrorKind::Syntax
    );
}

#[test]
fn address_of_requires_an_lvalue() {
    assert_eq!(
        check_err("PROGRAM P\n OUTPUT ^(@(1 + 2))\nENDPROGRAM").kind,
        ErrorKind::Type
    );
}

#[test]
fn deref_requires_a_pointer() {
    let source = "PROGRAM P\n DECLARE N : INTEGER\n OUTPUT ^N\nENDPROGRAM";
    assert_eq!(check_err(source).kind, ErrorKind::Type);
}

#[test]
fn indexing_checks_dimension_count_and_type() {
    let source = r#"
PROGRAM P
  DECLARE A : ARRAY[1:2, 1:2] OF INTEGER
  OUTPUT A[1]
ENDPROGRAM
"#;
    assert_eq!(check_err(source).kind, ErrorKind::Type);

    let source = r#"
PROGRAM P
  DECLARE A : ARRAY[1:2] OF INTEGER
  OUTPUT A[TRUE]
ENDPROGRAM
"#;
    assert_eq!(check_err(source).kind, ErrorKind::Type);
}

#[test]
fn unknown_fields_are_name_errors() {
    let source = r#"
PROGRAM P
  TYPE Point = RECORD
    X : INTEGER
  ENDRECORD
  DECLARE A : Point
  OUTPUT A.Y
ENDPROGRAM
"#;
    assert_eq!(check_err(source).kind, ErrorKind::Name);
}

#[test]
fn composite_values_cannot_be_output() {
    let source = r#"
PROGRAM P
  DECLARE A : ARRAY[1:2] OF INTEGER
  OUTPUT A
ENDPROGRAM
"#;
    assert_eq!(check_err(source).kind, ErrorKind::Type);
}

#[test]
fn set_operators_require_matching_bases() {
    let source = r#"
PROGRAM P
  TYPE A = (A1, A2)
  TYPE B = (B1, B2)
  TYPE SA = SET OF A
  TYPE SB = SET OF B
  DEFINE X (A1) : SA
  DEFINE Y (B1) : SB
  OUTPUT SIZE(X UNION Y)
ENDPROGRAM
"#;
    assert_eq!(check_err(source).kind, ErrorKind::Type);
}

#[test]
fn in_requires_member_of_the_base_enum() {
    let source = r#"
PROGRAM P
  TYPE A = (A1, A2)
  TYPE B = (B1, B2)
  TYPE SA = SET OF A
  DEFINE X (A1) : SA
  OUTPUT B1 IN X
ENDPROGRAM
"#;
    assert_eq!(check_err(source).kind, ErrorKind::Type);
}

#[test]
fn duplicate_declarations_in_one_scope_are_rejected() {
    let source = "PROGRAM P\n DECLARE X : INTEGER\n DECLARE X : REAL\nENDPROGRAM";
    assert_eq!(check_err(source).kind, ErrorKind::Syntax);
}

#[test]
fn inverted_array_bounds_are_rejected() {
    let source = "PROGRAM P\n DECLARE A : ARRAY[5:1] OF INTEGER\nENDPROGRAM";
    assert_eq!(check_err(source).kind, ErrorKind::Range);
}

#[test]
fn null_assigns_only_to_pointers_and_classes() {
    check_ok(
        "PROGRAM P\n DECLARE A : POINTER TO INTEGER\n A <- NULL\nENDPROGRAM",
    );
    let error = check_err("PROGRAM P\n DECLARE N : INTEGER\n N <- NULL\nENDPROGRAM");
    assert_eq!(error.kind, ErrorKind::Type);
}

#[test]
fn forward_references_between_routines_are_legal() {
    check_ok(
        r#"
PROGRAM P
  PROCEDURE First
    CALL Second
  ENDPROCEDURE
  PROCEDURE Second
  ENDPROCEDURE
  CALL First
ENDPROGRAM
"#,
    );
}

#[test]
fn routine_bodies_do_not_capture_enclosing_locals() {
    let source = r#"
PROGRAM P
  PROCEDURE Outer
    DECLARE Hidden : INTEGER
    PROCEDURE Inner
      OUTPUT Hidden
    ENDPROCEDURE
    CALL Inner
  ENDPROCEDURE
  CALL Outer
ENDPROGRAM
"#;
    assert_eq!(check_err(source).kind, ErrorKind::Name);
}

#[test]
fn super_is_restricted_to_derived_constructors() {
    let source = r#"
PROGRAM P
  CLASS Solo
    PUBLIC
    CONSTRUCTOR()
      SUPER()
    ENDCONSTRUCTOR
  ENDCLASS
ENDPROGRAM
"#;
    assert_eq!(check_err(source).kind, ErrorKind::Type);

    let source = "PROGRAM P\n SUPER(1)\nENDPROGRAM";
    assert_eq!(check_err(source).kind, ErrorKind::Syntax);
}
