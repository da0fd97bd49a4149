//! Integration tests for file and folder copies

mod common;

use ::common::vfs::{EntryKind, FsError};

#[test]
fn test_cp_file_into_parent() {
    let (_fs, mut cursor) = common::setup_fs();

    cursor.create_path("/a/b", true).unwrap();
    cursor.touch("c.txt").unwrap();
    let original = cursor.file_info("c.txt").unwrap();

    cursor
        .copy_entry(EntryKind::File, "c.txt", "../c.txt")
        .unwrap();

    let copy = cursor.file_info("/a/c.txt").unwrap();
    assert_ne!(copy.serial, original.serial);
    assert_eq!(cursor.file_info("/a/b/c.txt").unwrap(), original);
    assert_eq!(cursor.list("/a").unwrap().to_string(), "folders:\n  b/\nfiles:\n  c.txt");
}

#[test]
fn test_cp_file_is_independent() {
    let (_fs, cursor) = common::setup_fs();
    common::put(&cursor, "/a", b"original");

    cursor.copy_entry(EntryKind::File, "/a", "/b").unwrap();
    cursor.write_file("/b", b"changed".to_vec()).unwrap();

    assert_eq!(cursor.read_file("/a").unwrap(), b"original");
    assert_eq!(cursor.read_file("/b").unwrap(), b"changed");
}

#[test]
fn test_cp_file_destination_occupied() {
    let (fs, cursor) = common::setup_fs();
    common::put(&cursor, "/a", b"1");
    common::put(&cursor, "/b", b"2");
    let before = fs.manifest().unwrap();

    assert!(matches!(
        cursor.copy_entry(EntryKind::File, "/a", "/b"),
        Err(FsError::AlreadyExists(_))
    ));
    assert_eq!(fs.manifest().unwrap(), before);
}

#[test]
fn test_cp_directory_fresh_identities() {
    let (fs, cursor) = common::setup_fs();
    common::put(&cursor, "/src/one", b"1");
    common::put(&cursor, "/src/sub/two", b"2");
    cursor
        .link(EntryKind::File, "/src/one", "/src/sub/alias", false)
        .unwrap();

    cursor
        .copy_entry(EntryKind::Folder, "/src", "/dst")
        .unwrap();

    assert_eq!(cursor.read_file("/dst/sub/two").unwrap(), b"2");
    assert_eq!(
        cursor.list("/dst/sub").unwrap().file_links,
        vec![("alias".to_string(), "/src/one".to_string())]
    );

    let serials = fs.lock().tree().serials().unwrap();
    assert_eq!(serials.len(), 4);

    cursor.write_file("/dst/sub/two", b"edited".to_vec()).unwrap();
    assert_eq!(cursor.read_file("/src/sub/two").unwrap(), b"2");
}

#[test]
fn test_cp_directory_merges_into_existing() {
    let (_fs, cursor) = common::setup_fs();
    common::put(&cursor, "/src/shared", b"from src");
    common::put(&cursor, "/dst/src/shared", b"from dst");
    common::put(&cursor, "/dst/src/kept", b"kept");

    cursor
        .copy_entry(EntryKind::Folder, "/src", "/dst/src")
        .unwrap();

    assert_eq!(
        common::names(&cursor, "/dst/src"),
        vec!["shared", "kept", "shared 2"]
    );
    assert_eq!(cursor.read_file("/dst/src/shared 2").unwrap(), b"from src");
    // source untouched
    assert_eq!(common::names(&cursor, "/src"), vec!["shared"]);
}

#[test]
fn test_cp_directory_into_own_subfolder() {
    let (_fs, cursor) = common::setup_fs();
    common::put(&cursor, "/tree/leaf", b"leaf");
    cursor.make_folder("/tree/inner", false).unwrap();

    cursor
        .copy_entry(EntryKind::Folder, "/tree", "/tree/inner/tree")
        .unwrap();

    assert_eq!(cursor.read_file("/tree/inner/tree/leaf").unwrap(), b"leaf");
    // the copy was taken before it was attached, so it does not contain itself
    assert!(cursor.list("/tree/inner/tree/inner").unwrap().is_empty());
}

#[test]
fn test_cp_missing_source() {
    let (_fs, cursor) = common::setup_fs();

    assert!(matches!(
        cursor.copy_entry(EntryKind::Folder, "/nothing", "/copy"),
        Err(FsError::NotFound(_))
    ));
    assert!(matches!(
        cursor.copy_entry(EntryKind::File, "/nothing", "/copy"),
        Err(FsError::NotFound(_))
    ));
}

#[test]
fn test_cp_directory_merge_failure_changes_nothing() {
    let (fs, cursor) = common::setup_fs();
    let long = "b".repeat(::common::vfs::MAX_NAME_LEN);
    common::put(&cursor, "/src/early", b"early");
    common::put(&cursor, &format!("/src/{}", long), b"source");
    common::put(&cursor, &format!("/dst/src/{}", long), b"destination");
    let before = fs.manifest().unwrap();

    let result = cursor.copy_entry(EntryKind::Folder, "/src", "/dst/src");
    assert!(matches!(result, Err(FsError::InvalidName(_))));

    assert_eq!(fs.manifest().unwrap(), before);
    assert_eq!(common::names(&cursor, "/dst/src"), vec![long.clone()]);
    assert_eq!(
        cursor.read_file(&format!("/dst/src/{}", long)).unwrap(),
        b"destination"
    );
}
