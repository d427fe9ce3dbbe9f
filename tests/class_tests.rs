//! Classes: construction, inheritance, dynamic dispatch, SUPER, and
//! access control.

use prescribe::{run_source, ErrorKind};

fn run_ok(source: &str) -> String {
    let outcome = run_source(source, "");
    assert!(
        outcome.error.is_none(),
        "unexpected diagnostic: {:?}",
        outcome.error
    );
    outcome.output
}

fn run_err(source: &str) -> prescribe::Diagnostic {
    run_source(source, "").error.expect("expected a diagnostic")
}

#[test]
fn dynamic_dispatch_uses_runtime_class() {
    let source = r#"
PROGRAM P
  CLASS Animal
    PUBLIC
    FUNCTION Speak RETURNS STRING
      RETURN "base"
    ENDFUNCTION
  ENDCLASS

  CLASS Dog EXTENDS Animal
    PUBLIC
    FUNCTION Speak RETURNS STRING
      RETURN "woof"
    ENDFUNCTION
  ENDCLASS

  DECLARE A : Animal
  A <- NEW Dog()
  OUTPUT A.Speak()
ENDPROGRAM
"#;
    assert_eq!(run_ok(source), "woof\n");
}

#[test]
fn constructor_initializes_fields() {
    let source = r#"
PROGRAM P
  CLASS Counter
    PRIVATE
    DECLARE Count : INTEGER
    PUBLIC
    CONSTRUCTOR(BYVAL Start : INTEGER)
      Count <- Start
    ENDCONSTRUCTOR
    PROCEDURE Bump
      Count <- Count + 1
    ENDPROCEDURE
    FUNCTION Current RETURNS INTEGER
      RETURN Count
    ENDFUNCTION
  ENDCLASS

  DECLARE C : Counter
  C <- NEW Counter(10)
  CALL C.Bump
  CALL C.Bump
  OUTPUT C.Current()
ENDPROGRAM
"#;
    assert_eq!(run_ok(source), "12\n");
}

#[test]
fn fields_default_before_any_constructor_runs() {
    let source = r#"
PROGRAM P
  CLASS Box
    PUBLIC
    DECLARE N : INTEGER
    DECLARE S : STRING
  ENDCLASS

  DECLARE B : Box
  B <- NEW Box()
  OUTPUT B.N
  OUTPUT LENGTH(B.S)
ENDPROGRAM
"#;
    assert_eq!(run_ok(source), "0\n0\n");
}

#[test]
fn super_invokes_base_constructor_and_methods() {
    let source = r#"
PROGRAM P
  CLASS Animal
    PRIVATE
    DECLARE Name : STRING
    PUBLIC
    CONSTRUCTOR(BYVAL N : STRING)
      Name <- N
    ENDCONSTRUCTOR
    FUNCTION Describe RETURNS STRING
      RETURN Name
    ENDFUNCTION
  ENDCLASS

  CLASS Dog EXTENDS Animal
    PUBLIC
    CONSTRUCTOR(BYVAL N : STRING)
      SUPER(N)
    ENDCONSTRUCTOR
    FUNCTION Describe RETURNS STRING
      RETURN SUPER.Describe() & " the dog"
    ENDFUNCTION
  ENDCLASS

  DECLARE D : Dog
  D <- NEW Dog("Rex")
  OUTPUT D.Describe()
ENDPROGRAM
"#;
    assert_eq!(run_ok(source), "Rex the dog\n");
}

#[test]
fn class_references_share_the_object() {
    let source = r#"
PROGRAM P
  CLASS Cell
    PUBLIC
    DECLARE V : INTEGER
  ENDCLASS

  DECLARE A : Cell
  DECLARE B : Cell
  A <- NEW Cell()
  B <- A
  A.V <- 7
  OUTPUT B.V
ENDPROGRAM
"#;
    assert_eq!(run_ok(source), "7\n");
}

#[test]
fn arrays_of_class_references_alias() {
    let source = r#"
PROGRAM P
  CLASS Cell
    PUBLIC
    DECLARE V : INTEGER
  ENDCLASS

  DECLARE Grid : ARRAY[1:2] OF Cell
  DECLARE Copy : ARRAY[1:2] OF Cell
  Grid[1] <- NEW Cell()
  Copy <- Grid
  Grid[1].V <- 42
  OUTPUT Copy[1].V
ENDPROGRAM
"#;
    assert_eq!(run_ok(source), "42\n");
}

#[test]
fn method_on_null_reference_fails_before_side_effects() {
    let source = r#"
PROGRAM P
  CLASS Animal
    PUBLIC
    FUNCTION Speak RETURNS STRING
      RETURN "hi"
    ENDFUNCTION
  ENDCLASS

  DECLARE A : Animal
  OUTPUT A.Speak()
ENDPROGRAM
"#;
    let error = run_err(source);
    assert_eq!(error.kind, ErrorKind::Runtime);
    assert_eq!(error.line, 11);
}

#[test]
fn private_field_access_outside_owner_is_access_error() {
    let source = r#"
PROGRAM P
  CLASS Vault
    PRIVATE
    DECLARE Secret : INTEGER
  ENDCLASS

  DECLARE V : Vault
  V <- NEW Vault()
  OUTPUT V.Secret
ENDPROGRAM
"#;
    let error = run_err(source);
    assert_eq!(error.kind, ErrorKind::Access);
}

#[test]
fn inherited_private_field_is_blocked_in_derived_methods() {
    let source = r#"
PROGRAM P
  CLASS Base
    PRIVATE
    DECLARE Hidden : INTEGER
  ENDCLASS

  CLASS Derived EXTENDS Base
    PUBLIC
    FUNCTION Peek RETURNS INTEGER
      RETURN Hidden
    ENDFUNCTION
  ENDCLASS

  DECLARE D : Derived
  D <- NEW Derived()
  OUTPUT D.Peek()
ENDPROGRAM
"#;
    let error = run_err(source);
    assert_eq!(error.kind, ErrorKind::Access);
}

#[test]
fn private_method_callable_from_own_class() {
    let source = r#"
PROGRAM P
  CLASS Greeter
    PRIVATE
    FUNCTION Prefix RETURNS STRING
      RETURN "hello "
    ENDFUNCTION
    PUBLIC
    FUNCTION Greet(BYVAL Who : STRING) RETURNS STRING
      RETURN Prefix() & Who
    ENDFUNCTION
  ENDCLASS

  DECLARE G : Greeter
  G <- NEW Greeter()
  OUTPUT G.Greet("world")
ENDPROGRAM
"#;
    assert_eq!(run_ok(source), "hello world\n");
}

#[test]
fn base_class_variable_rejects_unrelated_assignment() {
    let source = r#"
PROGRAM P
  CLASS Animal
  ENDCLASS

  CLASS Rock
  ENDCLASS

  DECLARE A : Animal
  A <- NEW Rock()
ENDPROGRAM
"#;
    let error = run_err(source);
    assert_eq!(error.kind, ErrorKind::Type);
}

#[test]
fn derived_methods_see_inherited_public_fields() {
    let source = r#"
PROGRAM P
  CLASS Base
    PUBLIC
    DECLARE N : INTEGER
    PROCEDURE SetUp
      N <- 5
    ENDPROCEDURE
  ENDCLASS

  CLASS Derived EXTENDS Base
    PUBLIC
    FUNCTION Doubled RETURNS INTEGER
      RETURN N * 2
    ENDFUNCTION
  ENDCLASS

  DECLARE D : Derived
  D <- NEW Derived()
  CALL D.SetUp
  OUTPUT D.Doubled()
ENDPROGRAM
"#;
    assert_eq!(run_ok(source), "10\n");
}
