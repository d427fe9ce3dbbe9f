//! Text and random file handling against a real (scratch) file system.

use std::fs;

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

#[test]
fn text_file_write_then_read() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("lines.txt").display().to_string();
    let source = format!(
        r#"
PROGRAM P
  DECLARE F : TEXTFILE
  DECLARE S : STRING
  OPENFILE(F, "{path}", "WRITE")
  WRITEFILE(F, "alpha")
  WRITEFILE(F, "beta")
  CLOSEFILE(F)
  OPENFILE(F, "{path}", "READ")
  WHILE NOT EOF(F)
    READFILE(F, S)
    OUTPUT S
  ENDWHILE
  CLOSEFILE(F)
ENDPROGRAM
"#
    );
    assert_eq!(run_ok(&source), "alpha\nbeta\n");
    assert_eq!(fs::read_to_string(dir.path().join("lines.txt")).unwrap(), "alpha\nbeta\n");
}

#[test]
fn append_extends_existing_content() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("log.txt");
    fs::write(&file, "first\n").unwrap();
    let path = file.display().to_string();
    let source = format!(
        r#"
PROGRAM P
  DECLARE F : TEXTFILE
  OPENFILE(F, "{path}", "APPEND")
  WRITEFILE(F, "second")
  CLOSEFILE(F)
ENDPROGRAM
"#
    );
    run_ok(&source);
    assert_eq!(fs::read_to_string(&file).unwrap(), "first\nsecond\n");
}

#[test]
fn readfile_trims_and_parses_by_target_type() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("data.txt");
    fs::write(&file, "  42  \n3.5\nTRUE\n").unwrap();
    let path = file.display().to_string();
    let source = format!(
        r#"
PROGRAM P
  DECLARE F : TEXTFILE
  DECLARE I : INTEGER
  DECLARE R : REAL
  DECLARE B : BOOLEAN
  OPENFILE(F, "{path}", "READ")
  READFILE(F, I)
  READFILE(F, R)
  READFILE(F, B)
  CLOSEFILE(F)
  OUTPUT I + 1
  OUTPUT R
  OUTPUT B
ENDPROGRAM
"#
    );
    assert_eq!(run_ok(&source), "43\n3.5\nTRUE\n");
}

#[test]
fn reading_a_missing_file_is_a_file_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.txt").display().to_string();
    let source = format!(
        "PROGRAM P\n DECLARE F : TEXTFILE\n OPENFILE(F, \"{path}\", \"READ\")\nENDPROGRAM"
    );
    let error = run_source(&source, "").error.expect("expected a diagnostic");
    assert_eq!(error.kind, ErrorKind::File);
    assert_eq!(error.line, 3);
}

#[test]
fn invalid_mode_and_closed_handle_errors() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("f.txt").display().to_string();

    let source = format!(
        "PROGRAM P\n DECLARE F : TEXTFILE\n OPENFILE(F, \"{path}\", \"SIDEWAYS\")\nENDPROGRAM"
    );
    let error = run_source(&source, "").error.expect("expected a diagnostic");
    assert_eq!(error.kind, ErrorKind::File);

    let source = "PROGRAM P\n DECLARE F : TEXTFILE\n DECLARE S : STRING\n READFILE(F, S)\nENDPROGRAM";
    let error = run_source(source, "").error.expect("expected a diagnostic");
    assert_eq!(error.kind, ErrorKind::File);
}

#[test]
fn read_past_end_is_a_file_error() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("one.txt");
    fs::write(&file, "only\n").unwrap();
    let path = file.display().to_string();
    let source = format!(
        r#"
PROGRAM P
  DECLARE F : TEXTFILE
  DECLARE S : STRING
  OPENFILE(F, "{path}", "READ")
  READFILE(F, S)
  READFILE(F, S)
ENDPROGRAM
"#
    );
    let error = run_source(&source, "").error.expect("expected a diagnostic");
    assert_eq!(error.kind, ErrorKind::File);
    assert_eq!(error.line, 7);
}

#[test]
fn eof_is_true_for_closed_handles() {
    let source = "PROGRAM P\n DECLARE F : TEXTFILE\n OUTPUT EOF(F)\nENDPROGRAM";
    assert_eq!(run_ok(source), "TRUE\n");
}

#[test]
fn random_file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("records.dat").display().to_string();
    let source = format!(
        r#"
PROGRAM P
  TYPE Rec = RECORD
    N : INTEGER
    D : DATE
  ENDRECORD
  DECLARE RF : RANDOMFILE OF Rec
  DECLARE W : Rec
  DECLARE R : Rec

  W.N <- 7
  W.D <- DATE "2024-02-29"
  OPENFILE(RF, "{path}", "RANDOM")
  SEEK(RF, 1)
  PUTRECORD(RF, W)
  CLOSEFILE(RF)

  OPENFILE(RF, "{path}", "RANDOM")
  SEEK(RF, 1)
  GETRECORD(RF, R)
  CLOSEFILE(RF)
  OUTPUT STRING(R.N) & " " & STRING(R.D)
ENDPROGRAM
"#
    );
    assert_eq!(run_ok(&source), "7 2024-02-29\n");
    // 4 bytes INTEGER + 4 bytes day-number
    assert_eq!(fs::read(dir.path().join("records.dat")).unwrap().len(), 8);
}

#[test]
fn random_file_positions_are_independent_slots() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("slots.dat").display().to_string();
    let source = format!(
        r#"
PROGRAM P
  TYPE Rec = RECORD
    N : INTEGER
  ENDRECORD
  DECLARE RF : RANDOMFILE OF Rec
  DECLARE R : Rec

  OPENFILE(RF, "{path}", "RANDOM")
  R.N <- 11
  SEEK(RF, 1)
  PUTRECORD(RF, R)
  R.N <- 33
  SEEK(RF, 3)
  PUTRECORD(RF, R)
  SEEK(RF, 1)
  GETRECORD(RF, R)
  OUTPUT R.N
  SEEK(RF, 3)
  GETRECORD(RF, R)
  OUTPUT R.N
  SEEK(RF, 2)
  GETRECORD(RF, R)
  OUTPUT R.N
  CLOSEFILE(RF)
ENDPROGRAM
"#
    );
    // the gap record decodes as zero-filled
    assert_eq!(run_ok(&source), "11\n33\n0\n");
}

#[test]
fn random_file_eof_tracks_position_and_length() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("eof.dat").display().to_string();
    let source = format!(
        r#"
PROGRAM P
  TYPE Rec = RECORD
    N : INTEGER
  ENDRECORD
  DECLARE RF : RANDOMFILE OF Rec
  DECLARE R : Rec
  OPENFILE(RF, "{path}", "RANDOM")
  OUTPUT EOF(RF)
  R.N <- 1
  SEEK(RF, 1)
  PUTRECORD(RF, R)
  SEEK(RF, 1)
  OUTPUT EOF(RF)
  SEEK(RF, 2)
  OUTPUT EOF(RF)
  CLOSEFILE(RF)
ENDPROGRAM
"#
    );
    assert_eq!(run_ok(&source), "TRUE\nFALSE\nTRUE\n");
}

#[test]
fn seek_below_one_is_a_file_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("s.dat").display().to_string();
    let source = format!(
        r#"
PROGRAM P
  TYPE Rec = RECORD
    N : INTEGER
  ENDRECORD
  DECLARE RF : RANDOMFILE OF Rec
  OPENFILE(RF, "{path}", "RANDOM")
  SEEK(RF, 0)
ENDPROGRAM
"#
    );
    let error = run_source(&source, "").error.expect("expected a diagnostic");
    assert_eq!(error.kind, ErrorKind::File);
}

#[test]
fn records_with_dynamic_fields_are_rejected_for_random_files() {
    let source = r#"
PROGRAM P
  TYPE Rec = RECORD
    Name : STRING
  ENDRECORD
  DECLARE RF : RANDOMFILE OF Rec
ENDPROGRAM
"#;
    let error = run_source(source, "").error.expect("expected a diagnostic");
    assert_eq!(error.kind, ErrorKind::Type);
}
