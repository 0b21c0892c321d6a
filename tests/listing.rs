use assert_matches::assert_matches;

use refdb_sync::error::SyncError;
use refdb_sync::listing::{EntryKind, parse_line, parse_listing};

#[test]
fn parses_a_full_server_listing() {
    let lines = [
        "modify=20240130183106;perm=fle;size=4096;type=dir;unique=28UFC8F9;UNIX.group=562;UNIX.mode=0444;UNIX.owner=14; 2024-01-30.1",
        "modify=20240410155844;perm=adfr;size=12;type=OS.unix=symlink;unique=28UFC8FE;UNIX.group=562;UNIX.mode=0444;UNIX.owner=14; latest",
        "modify=20240409170726;perm=fle;size=4096;type=dir;unique=28UFC8FE;UNIX.group=562;UNIX.mode=0444;UNIX.owner=14; 2024-04-09.1",
        "modify=20240409170726;perm=fle;size=128;type=file;unique=28UFC900; README",
        "modify=20240409170726;perm=fle;size=4096;type=cdir;unique=28UFC8F0; .",
    ];

    let entries = parse_listing(lines).unwrap();
    assert_eq!(entries.len(), 5);

    assert_eq!(entries[0].name, "2024-01-30.1");
    assert_matches!(entries[0].kind, EntryKind::Directory { ref unique } if unique.as_str() == "28UFC8F9");
    assert_eq!(entries[1].name, "latest");
    assert_matches!(
        entries[1].kind,
        EntryKind::SymbolicPointer { ref unique, target: None } if unique.as_str() == "28UFC8FE"
    );
    assert_matches!(entries[3].kind, EntryKind::Other);
    assert_matches!(entries[4].kind, EntryKind::Other);
}

#[test]
fn blank_lines_are_skipped() {
    let entries = parse_listing(["", "type=dir;unique=U1; v1", "   "]).unwrap();
    assert_eq!(entries.len(), 1);
}

#[test]
fn missing_type_fact_is_an_error_not_a_drop() {
    let err = parse_listing(["modify=20240130183106;unique=28UFC8F9; 2024-01-30.1"]).unwrap_err();
    assert_matches!(err, SyncError::MalformedListingEntry { ref reason, .. }
        if reason.contains("type"));
}

#[test]
fn missing_name_field_is_rejected() {
    let err = parse_line("type=dir;unique=U1;").unwrap_err();
    assert_matches!(err, SyncError::MalformedListingEntry { .. });
}

#[test]
fn unparseable_fact_names_the_offending_line() {
    let line = "garbage;type=dir;unique=U1; v1";
    let err = parse_line(line).unwrap_err();
    assert_matches!(err, SyncError::MalformedListingEntry { line: ref l, .. } if l.as_str() == line);
}

#[test]
fn symlink_without_unique_is_rejected() {
    let err = parse_line("modify=20240410155844;type=OS.unix=symlink; latest").unwrap_err();
    assert_matches!(err, SyncError::MalformedListingEntry { .. });
}
