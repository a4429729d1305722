/// Both aggregation strategies against the same real trees.
///
/// The parallel fan-out and the explicit-stack post-order walk must record
/// the same total for every directory, and the root total must equal the
/// sum of all regular files below it.
use foldersize_core::aggregate::{ParallelAggregator, PostOrderAggregator, SizeAggregator};
use foldersize_core::model::AggregateSizeMap;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tempfile::TempDir;

/// Irregular tree: nested dirs, empty dirs, zero-byte files.
///
/// Returns the sum of all file sizes written.
fn build_irregular_tree(root: &Path) -> u64 {
    let mut total = 0u64;
    let mut write = |rel: &str, n: usize| {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, vec![7u8; n]).unwrap();
        total += n as u64;
    };

    write("top.bin", 1_000);
    write("a/one.bin", 10);
    write("a/b/two.bin", 20);
    write("a/b/c/three.bin", 30);
    write("a/b/c/d/four.bin", 40);
    write("zero/empty.bin", 0);
    write("x/y/z/deep.bin", 12_345);
    for i in 0..25 {
        write(&format!("wide/f{i:02}.bin"), i * 3);
    }
    fs::create_dir_all(root.join("empty/nested/again")).unwrap();

    total
}

fn snapshot(sizes: &AggregateSizeMap) -> HashMap<PathBuf, u64> {
    sizes.snapshot()
}

#[test]
fn strategies_produce_identical_maps() {
    let tmp = TempDir::new().expect("failed to create temp dir");
    let expected = build_irregular_tree(tmp.path());

    let parallel = ParallelAggregator::new().build_map(tmp.path());
    let post_order = PostOrderAggregator::default().build_map(tmp.path());

    assert_eq!(snapshot(&parallel), snapshot(&post_order));
    assert_eq!(parallel.get(tmp.path()), Some(expected));
    assert_eq!(post_order.get(tmp.path()), Some(expected));
}

#[test]
fn every_directory_is_files_plus_subdirectories() {
    let tmp = TempDir::new().expect("failed to create temp dir");
    build_irregular_tree(tmp.path());

    let sizes = PostOrderAggregator { read_threads: 4 }.build_map(tmp.path());
    for (dir, total) in sizes.snapshot() {
        let mut sum = 0;
        for dent in fs::read_dir(&dir).unwrap() {
            let path = dent.unwrap().path();
            let meta = fs::symlink_metadata(&path).unwrap();
            if meta.is_dir() {
                sum += sizes.get(&path).expect("subdirectory must be recorded");
            } else if meta.is_file() {
                sum += meta.len();
            }
        }
        assert_eq!(total, sum, "{}", dir.display());
    }
}

#[test]
fn empty_and_zero_byte_directories_total_zero() {
    let tmp = TempDir::new().expect("failed to create temp dir");
    build_irregular_tree(tmp.path());

    let sizes = ParallelAggregator::new().build_map(tmp.path());
    assert_eq!(sizes.get(&tmp.path().join("zero")), Some(0));
    assert_eq!(sizes.get(&tmp.path().join("empty/nested/again")), Some(0));
    assert_eq!(sizes.get(&tmp.path().join("a/b")), Some(90));
}

#[cfg(unix)]
#[test]
fn symlinks_contribute_nothing() {
    let tmp = TempDir::new().expect("failed to create temp dir");
    fs::create_dir(tmp.path().join("real")).unwrap();
    fs::write(tmp.path().join("real/data.bin"), vec![0u8; 500]).unwrap();
    std::os::unix::fs::symlink(tmp.path().join("real"), tmp.path().join("dir-link")).unwrap();
    std::os::unix::fs::symlink(
        tmp.path().join("real/data.bin"),
        tmp.path().join("file-link"),
    )
    .unwrap();
    std::os::unix::fs::symlink(tmp.path().join("missing"), tmp.path().join("broken")).unwrap();

    for sizes in [
        ParallelAggregator::new().build_map(tmp.path()),
        PostOrderAggregator::default().build_map(tmp.path()),
    ] {
        assert_eq!(sizes.get(tmp.path()), Some(500));
        assert!(!sizes.contains(&tmp.path().join("dir-link")));
    }
}

#[test]
fn cancelled_aggregation_records_no_root_total() {
    let tmp = TempDir::new().expect("failed to create temp dir");
    build_irregular_tree(tmp.path());
    let cancel = Arc::new(AtomicBool::new(true));

    let sizes = AggregateSizeMap::new();
    ParallelAggregator::new().aggregate(tmp.path(), &sizes, &cancel);
    assert!(sizes.is_empty());

    let sizes = AggregateSizeMap::new();
    PostOrderAggregator::default().aggregate(tmp.path(), &sizes, &cancel);
    assert!(!sizes.contains(tmp.path()));
}
