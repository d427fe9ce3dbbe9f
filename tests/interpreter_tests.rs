//! End-to-end interpreter behavior: arithmetic, control flow, the
//! value model, and determinism.

use prescribe::{run_source, ErrorKind};

fn run_ok(source: &str, stdin: &str) -> String {
    let outcome = run_source(source, stdin);
    assert!(
        outcome.error.is_none(),
        "unexpected diagnostic: {:?}",
        outcome.error
    );
    outcome.output
}

fn run_err(source: &str, stdin: &str) -> (String, prescribe::Diagnostic) {
    let outcome = run_source(source, stdin);
    let error = outcome.error.expect("expected a diagnostic");
    (outcome.output, error)
}

#[test]
fn average_of_scores() {
    let source = r#"
PROGRAM AverageScores
  DECLARE Count : INTEGER
  DECLARE Sum   : INTEGER
  DECLARE Score : INTEGER
  DECLARE Avg   : REAL
  Sum <- 0
  INPUT Count
  FOR i <- 1 TO Count
    INPUT Score
    Sum <- Sum + Score
  NEXT i
  Avg <- REAL(Sum) / REAL(Count)
  OUTPUT "Average = " & STRING(Avg)
ENDPROGRAM
"#;
    assert_eq!(run_ok(source, "3 10 20 30"), "Average = 20\n");
}

#[test]
fn euclidean_mod_and_div() {
    let source = "PROGRAM P\n OUTPUT -7 MOD 3\n OUTPUT -7 DIV 3\nENDPROGRAM";
    assert_eq!(run_ok(source, ""), "2\n-3\n");
}

#[test]
fn boolean_operators_do_not_short_circuit() {
    let source = r#"
PROGRAM NoShortCircuit
  DECLARE Count : INTEGER
  DECLARE R : BOOLEAN

  FUNCTION Tick RETURNS BOOLEAN
    Count <- Count + 1
    RETURN FALSE
  ENDFUNCTION

  Count <- 0
  R <- Tick() AND Tick()
  OUTPUT Count
  R <- Tick() OR Tick()
  OUTPUT Count
ENDPROGRAM
"#;
    assert_eq!(run_ok(source, ""), "2\n4\n");
}

#[test]
fn null_dereference_diagnostic() {
    let source = "PROGRAM P\n  DECLARE P : POINTER TO INTEGER\n  P <- NULL\n  OUTPUT ^P\nENDPROGRAM";
    let (_, error) = run_err(source, "");
    assert_eq!(error.kind, ErrorKind::Runtime);
    assert_eq!(error.to_string(), "RuntimeError at line 4: Null dereference.");
}

#[test]
fn integer_overflow_traps() {
    let source = "PROGRAM P\n  DECLARE X : INTEGER\n  X <- 2147483647\n  X <- X + 1\nENDPROGRAM";
    let (_, error) = run_err(source, "");
    assert_eq!(error.kind, ErrorKind::Range);
    assert_eq!(error.line, 4);
}

#[test]
fn division_by_zero_is_runtime_error() {
    let (_, error) = run_err("PROGRAM P\n OUTPUT 1 DIV 0\nENDPROGRAM", "");
    assert_eq!(error.kind, ErrorKind::Runtime);
}

#[test]
fn integer_division_widens_to_real() {
    assert_eq!(run_ok("PROGRAM P\n OUTPUT 1 / 2\nENDPROGRAM", ""), "0.5\n");
}

#[test]
fn real_formatting_rules() {
    let source = r#"
PROGRAM P
  OUTPUT 20.0
  OUTPUT 2.5
  OUTPUT 1.0 / 3.0
  OUTPUT 0.0000001
ENDPROGRAM
"#;
    assert_eq!(run_ok(source, ""), "20\n2.5\n0.333333\n0\n");
}

#[test]
fn for_loop_zero_trip_and_step() {
    let source = r#"
PROGRAM P
  DECLARE Total : INTEGER
  Total <- 0
  FOR i <- 5 TO 1
    Total <- Total + 1
  NEXT i
  OUTPUT Total
  FOR i <- 10 TO 1 STEP -3
    Total <- Total + 1
  NEXT i
  OUTPUT Total
ENDPROGRAM
"#;
    assert_eq!(run_ok(source, ""), "0\n4\n");
}

#[test]
fn for_step_zero_is_runtime_error() {
    let source = "PROGRAM P\n FOR i <- 1 TO 3 STEP 0\n OUTPUT i\n NEXT i\nENDPROGRAM";
    let (_, error) = run_err(source, "");
    assert_eq!(error.kind, ErrorKind::Runtime);
}

#[test]
fn while_and_repeat_loops() {
    let source = r#"
PROGRAM P
  DECLARE N : INTEGER
  N <- 3
  WHILE N > 0
    OUTPUT N
    N <- N - 1
  ENDWHILE
  REPEAT
    N <- N + 10
  UNTIL N >= 10
  OUTPUT N
ENDPROGRAM
"#;
    assert_eq!(run_ok(source, ""), "3\n2\n1\n10\n");
}

#[test]
fn case_first_match_wins() {
    let source = r#"
PROGRAM P
  DECLARE X : INTEGER
  INPUT X
  CASE OF X
    1 : OUTPUT "one"
    2, 3 : OUTPUT "few"
    1 TO 9 : OUTPUT "digit"
    OTHERWISE OUTPUT "other"
  ENDCASE
ENDPROGRAM
"#;
    assert_eq!(run_ok(source, "1"), "one\n");
    assert_eq!(run_ok(source, "3"), "few\n");
    assert_eq!(run_ok(source, "7"), "digit\n");
    assert_eq!(run_ok(source, "42"), "other\n");
}

#[test]
fn case_without_match_is_noop() {
    let source = r#"
PROGRAM P
  DECLARE X : INTEGER
  X <- 99
  CASE OF X
    1 : OUTPUT "one"
  ENDCASE
  OUTPUT "done"
ENDPROGRAM
"#;
    assert_eq!(run_ok(source, ""), "done\n");
}

#[test]
fn array_assignment_is_deep_copy() {
    let source = r#"
PROGRAM P
  DECLARE A : ARRAY[1:3] OF INTEGER
  DECLARE B : ARRAY[1:3] OF INTEGER
  A[1] <- 10
  B <- A
  A[1] <- 99
  OUTPUT B[1]
ENDPROGRAM
"#;
    assert_eq!(run_ok(source, ""), "10\n");
}

#[test]
fn array_bounds_are_inclusive_and_checked() {
    let source = r#"
PROGRAM P
  DECLARE A : ARRAY[2:4] OF INTEGER
  A[2] <- 1
  A[4] <- 2
  OUTPUT A[2] + A[4]
  A[5] <- 3
ENDPROGRAM
"#;
    let (output, error) = run_err(source, "");
    assert_eq!(output, "3\n");
    assert_eq!(error.kind, ErrorKind::Range);
    assert_eq!(error.line, 7);
}

#[test]
fn multi_dimensional_arrays() {
    let source = r#"
PROGRAM P
  DECLARE Grid : ARRAY[1:2, 1:3] OF INTEGER
  DECLARE R : INTEGER
  FOR i <- 1 TO 2
    FOR j <- 1 TO 3
      Grid[i, j] <- i * 10 + j
    NEXT j
  NEXT i
  R <- Grid[2, 3]
  OUTPUT R
ENDPROGRAM
"#;
    assert_eq!(run_ok(source, ""), "23\n");
}

#[test]
fn records_copy_by_value() {
    let source = r#"
PROGRAM P
  TYPE Point = RECORD
    X : INTEGER
    Y : INTEGER
  ENDRECORD
  DECLARE A : Point
  DECLARE B : Point
  A.X <- 1
  B <- A
  A.X <- 7
  OUTPUT B.X
ENDPROGRAM
"#;
    assert_eq!(run_ok(source, ""), "1\n");
}

#[test]
fn byref_parameters_alias_the_caller() {
    let source = r#"
PROGRAM P
  DECLARE N : INTEGER
  DECLARE A : ARRAY[1:2] OF INTEGER

  PROCEDURE Bump(BYREF X : INTEGER)
    X <- X + 1
  ENDPROCEDURE

  N <- 5
  CALL Bump(N)
  OUTPUT N
  A[2] <- 10
  CALL Bump(A[2])
  OUTPUT A[2]
ENDPROGRAM
"#;
    assert_eq!(run_ok(source, ""), "6\n11\n");
}

#[test]
fn byval_parameters_copy() {
    let source = r#"
PROGRAM P
  DECLARE N : INTEGER

  PROCEDURE Bump(BYVAL X : INTEGER)
    X <- X + 1
  ENDPROCEDURE

  N <- 5
  CALL Bump(N)
  OUTPUT N
ENDPROGRAM
"#;
    assert_eq!(run_ok(source, ""), "5\n");
}

#[test]
fn mutual_recursion_across_declaration_order() {
    let source = r#"
PROGRAM P
  FUNCTION IsEven(BYVAL N : INTEGER) RETURNS BOOLEAN
    IF N = 0 THEN
      RETURN TRUE
    ENDIF
    RETURN IsOdd(N - 1)
  ENDFUNCTION

  FUNCTION IsOdd(BYVAL N : INTEGER) RETURNS BOOLEAN
    IF N = 0 THEN
      RETURN FALSE
    ENDIF
    RETURN IsEven(N - 1)
  ENDFUNCTION

  OUTPUT IsEven(10)
  OUTPUT IsOdd(10)
ENDPROGRAM
"#;
    assert_eq!(run_ok(source, ""), "TRUE\nFALSE\n");
}

#[test]
fn function_without_return_is_runtime_error() {
    let source = r#"
PROGRAM P
  FUNCTION Broken RETURNS INTEGER
    DECLARE X : INTEGER
    X <- 1
  ENDFUNCTION
  OUTPUT Broken()
ENDPROGRAM
"#;
    let (_, error) = run_err(source, "");
    assert_eq!(error.kind, ErrorKind::Runtime);
}

#[test]
fn pointers_alias_through_address_of() {
    let source = r#"
PROGRAM P
  DECLARE N : INTEGER
  DECLARE P : POINTER TO INTEGER
  N <- 1
  P <- @N
  ^P <- 42
  OUTPUT N
ENDPROGRAM
"#;
    assert_eq!(run_ok(source, ""), "42\n");
}

#[test]
fn new_allocates_pointer_targets() {
    let source = r#"
PROGRAM P
  DECLARE P : POINTER TO INTEGER
  DECLARE Q : POINTER TO INTEGER
  P <- NEW INTEGER
  ^P <- 7
  Q <- P
  ^Q <- ^Q + 1
  OUTPUT ^P
ENDPROGRAM
"#;
    assert_eq!(run_ok(source, ""), "8\n");
}

#[test]
fn deterministic_rand_sequence() {
    // state: 1 -> 1103527590 -> 377401575 (mod 2^31)
    let source = r#"
PROGRAM P
  DECLARE A : REAL
  DECLARE B : REAL
  A <- RAND()
  B <- RAND()
  OUTPUT A > 0.0 AND A < 1.0
  OUTPUT B > 0.0 AND B < 1.0
  OUTPUT A = B
ENDPROGRAM
"#;
    assert_eq!(run_ok(source, ""), "TRUE\nTRUE\nFALSE\n");

    // Bit-identical across runs.
    let probe = "PROGRAM P\n OUTPUT STRING(RAND())\nENDPROGRAM";
    assert_eq!(run_ok(probe, ""), run_ok(probe, ""));
}

#[test]
fn rand_matches_the_lcg() {
    // First draw: 1103527590 / 2^31 = 0.513870...
    let source = "PROGRAM P\n OUTPUT RAND()\nENDPROGRAM";
    assert_eq!(run_ok(source, ""), "0.51387\n");
}

#[test]
fn input_exhausted_is_runtime_error() {
    let source = "PROGRAM P\n DECLARE X : INTEGER\n INPUT X\n INPUT X\nENDPROGRAM";
    let (_, error) = run_err(source, "5");
    assert_eq!(error.kind, ErrorKind::Runtime);
    assert_eq!(error.line, 4);
}

#[test]
fn input_parses_per_target_type() {
    let source = r#"
PROGRAM P
  DECLARE I : INTEGER
  DECLARE R : REAL
  DECLARE B : BOOLEAN
  DECLARE C : CHAR
  DECLARE S : STRING
  DECLARE D : DATE
  INPUT I
  INPUT R
  INPUT B
  INPUT C
  INPUT S
  INPUT D
  OUTPUT I
  OUTPUT R
  OUTPUT B
  OUTPUT C
  OUTPUT S
  OUTPUT D
ENDPROGRAM
"#;
    assert_eq!(
        run_ok(source, "-12 3.5 true x hello 2024-02-29"),
        "-12\n3.5\nTRUE\nx\nhello\n2024-02-29\n"
    );
}

#[test]
fn output_concatenates_without_separator() {
    let source = "PROGRAM P\n OUTPUT \"a\", 1, TRUE\nENDPROGRAM";
    assert_eq!(run_ok(source, ""), "a1TRUE\n");
}

#[test]
fn output_precedes_diagnostic() {
    let source = "PROGRAM P\n OUTPUT \"before\"\n OUTPUT 1 DIV 0\nENDPROGRAM";
    let (output, error) = run_err(source, "");
    assert_eq!(output, "before\n");
    assert_eq!(error.line, 3);
}

#[test]
fn enums_and_sets() {
    let source = r#"
PROGRAM P
  TYPE Season = (Spring, Summer, Autumn, Winter)
  TYPE Seasons = SET OF Season
  DEFINE Warm (Summer, Spring) : Seasons
  DEFINE Cold (Winter) : Seasons
  DECLARE S : Seasons
  OUTPUT ORD(Autumn)
  OUTPUT Summer IN Warm
  OUTPUT Winter IN Warm
  S <- Warm UNION Cold
  OUTPUT SIZE(S)
  S <- S DIFF Cold
  OUTPUT SIZE(S)
  OUTPUT SIZE(Warm INTERSECT Cold)
ENDPROGRAM
"#;
    assert_eq!(run_ok(source, ""), "2\nTRUE\nFALSE\n3\n2\n0\n");
}

#[test]
fn enum_output_and_input_use_member_names() {
    let source = r#"
PROGRAM P
  TYPE Color = (Red, Green, Blue)
  DECLARE C : Color
  INPUT C
  OUTPUT C
  OUTPUT STRING(ENUMVALUE(Color, 2))
ENDPROGRAM
"#;
    assert_eq!(run_ok(source, "Green"), "Green\nBlue\n");
}

#[test]
fn date_comparisons_and_literals() {
    let source = r#"
PROGRAM P
  DECLARE A : DATE
  DECLARE B : DATE
  A <- DATE "2024-02-28"
  B <- DATE "2024-02-29"
  OUTPUT A < B
  OUTPUT B
ENDPROGRAM
"#;
    assert_eq!(run_ok(source, ""), "TRUE\n2024-02-29\n");
}

#[test]
fn constants_fold_and_size_arrays() {
    let source = r#"
PROGRAM P
  CONSTANT Size = 3
  DECLARE A : ARRAY[1:Size] OF INTEGER
  DECLARE Total : INTEGER
  Total <- 0
  FOR i <- 1 TO Size
    A[i] <- i
    Total <- Total + A[i]
  NEXT i
  OUTPUT Total
ENDPROGRAM
"#;
    assert_eq!(run_ok(source, ""), "6\n");
}

#[test]
fn nested_blocks_scope_locals() {
    let source = r#"
PROGRAM P
  DECLARE X : INTEGER
  X <- 1
  IF TRUE THEN
    DECLARE X : INTEGER
    X <- 99
    OUTPUT X
  ENDIF
  OUTPUT X
ENDPROGRAM
"#;
    assert_eq!(run_ok(source, ""), "99\n1\n");
}

#[test]
fn linked_records_through_pointers() {
    // A record may point at its own type; the chain is followed with
    // explicit dereferences.
    let source = r#"
PROGRAM P
  TYPE Node = RECORD
    Value : INTEGER
    Next : POINTER TO Node
  ENDRECORD
  DECLARE Head : POINTER TO Node
  DECLARE Second : POINTER TO Node

  Second <- NEW Node
  (^Second).Value <- 2
  Head <- NEW Node
  (^Head).Value <- 1
  (^Head).Next <- Second

  OUTPUT (^Head).Value + (^((^Head).Next)).Value
ENDPROGRAM
"#;
    assert_eq!(run_ok(source, ""), "3\n");
}
