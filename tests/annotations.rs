use dsm85::annot::AnnotationMap;
use dsm85::error::AnnotationErrorKind;
use dsm85::parse::parse_str;
use std::fs;
use std::path::PathBuf;

//===========================================================================//

/// Writes an annotation file into the system temp directory and returns
/// its path.  Include targets are opened relative to the working
/// directory, so the files reference each other by absolute path.
fn temp_file(name: &str, content: &str) -> PathBuf {
    let path = std::env::temp_dir()
        .join(format!("dsm85_{}_{}", std::process::id(), name));
    fs::write(&path, content).unwrap();
    path
}

fn include_line(path: &PathBuf) -> String {
    format!("include:\n\"{}\"\n", path.display())
}

//===========================================================================//

#[test]
fn overlapping_segments_abort_the_parse() {
    let mut info = AnnotationMap::new();
    let error = parse_str(
        "segments:\n 0..10 code a\n 5..15 code b\n",
        "segs.txt",
        &mut info,
    )
    .unwrap_err();
    assert_eq!(error.file, "segs.txt");
    assert_eq!(error.line, 3);
    assert_eq!(
        error.kind,
        AnnotationErrorKind::OverlappingSegment("b".to_string())
    );
}

#[test]
fn recursive_inclusion_is_rejected() {
    let a_path = temp_file("cycle_a.txt", "");
    let b_path = temp_file("cycle_b.txt", &include_line(&a_path));
    fs::write(&a_path, include_line(&b_path)).unwrap();

    let mut info = AnnotationMap::new();
    let text = fs::read_to_string(&a_path).unwrap();
    let error =
        parse_str(&text, &a_path.display().to_string(), &mut info)
            .unwrap_err();
    assert_eq!(error.file, b_path.display().to_string());
    assert_eq!(
        error.kind,
        AnnotationErrorKind::RecursiveInclusion(
            a_path.display().to_string()
        )
    );

    fs::remove_file(&a_path).unwrap();
    fs::remove_file(&b_path).unwrap();
}

#[test]
fn diamond_inclusion_is_allowed() {
    let shared = temp_file("diamond_shared.txt", "labels:\n$1000 common\n");
    let left =
        temp_file("diamond_left.txt", &include_line(&shared));
    let right =
        temp_file("diamond_right.txt", &include_line(&shared));
    let top = format!(
        "{}{}labels:\ncommon+1 derived\n",
        include_line(&left),
        include_line(&right)
    );

    let mut info = AnnotationMap::new();
    parse_str(&top, "top.txt", &mut info).unwrap();
    assert!(info.label_at(0x1000));
    assert!(info.label_at(0x1001));

    fs::remove_file(&shared).unwrap();
    fs::remove_file(&left).unwrap();
    fs::remove_file(&right).unwrap();
}

#[test]
fn included_symbols_are_visible_afterwards() {
    let symbols =
        temp_file("symbols.txt", "segments:\n$4000..$40ff vram\n");
    let top = format!(
        "{}labels:\nvram+2 cursor_pos\n",
        include_line(&symbols)
    );

    let mut info = AnnotationMap::new();
    parse_str(&top, "top.txt", &mut info).unwrap();
    assert!(info.label_at(0x4002));
    assert!(info.segment_starts_at(0x4000));

    fs::remove_file(&symbols).unwrap();
}

#[test]
fn missing_include_is_an_error() {
    let mut info = AnnotationMap::new();
    let error = parse_str(
        "include:\n\"/nonexistent/dsm85/include.txt\"\n",
        "top.txt",
        &mut info,
    )
    .unwrap_err();
    assert_eq!(error.file, "top.txt");
    assert!(matches!(error.kind, AnnotationErrorKind::Parse(_)));
}

#[test]
fn error_message_format() {
    let mut info = AnnotationMap::new();
    let error = parse_str("labels:\n$10 $20\n", "bad.txt", &mut info)
        .unwrap_err();
    let message = error.to_string();
    assert!(
        message.starts_with("Error in file bad.txt, at line 2:"),
        "unexpected message: {}",
        message
    );
}
