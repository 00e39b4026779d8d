use std::cell::RefCell;
use std::fs;
use std::path::Path;

use image::{GrayImage, RgbImage};
use tile_import_core::prelude::*;

fn flags<W: std::io::Write>(diag: &Diagnostics<W>) -> Vec<Flag> {
    diag.lines().iter().map(|l| l.flag.clone()).collect()
}

fn texture_tree(root: &Path) {
    RgbImage::new(16, 16).save(root.join("diffuse_1001.tif")).unwrap();
    RgbImage::new(16, 16).save(root.join("diffuse_1002.tif")).unwrap();
    fs::create_dir_all(root.join("masks")).unwrap();
    GrayImage::new(8, 8).save(root.join("masks/opacity.1001.tif")).unwrap();
    fs::write(root.join("notes.md"), "unrelated").unwrap();
}

#[test]
fn discovers_catalog_and_reports_progress() {
    let tmp = tempfile::tempdir().unwrap();
    texture_tree(tmp.path());
    let out = tempfile::tempdir().unwrap();
    let cfg = DiscoveryConfig::builder().out_dir(out.path()).build();

    let seen = RefCell::new(Vec::new());
    let mut diag = Diagnostics::new(Vec::new());
    let catalog = Discovery::new(&cfg, &ImageCrateProvider)
        .with_progress(|done, total| seen.borrow_mut().push((done, total)))
        .discover(tmp.path(), &mut diag)
        .unwrap();

    assert_eq!(catalog.group_count(), 2);
    assert_eq!(catalog.group("diffuse", "tif").unwrap().len(), 2);
    let opacity = &catalog.group("opacity", "tif").unwrap()[0];
    assert_eq!(opacity.res, Resolution::new(8, 8));
    assert_eq!(opacity.channels, Some(1));

    assert_eq!(seen.into_inner(), vec![(1, 3), (2, 3), (3, 3)]);
    assert_eq!(
        flags(&diag),
        vec![Flag::FileCount, Flag::ValidPath, Flag::Debug]
    );
    assert_eq!(diag.lines()[0].message, "4");
}

#[test]
fn run_writes_the_artifact_and_reports_its_path() {
    let tmp = tempfile::tempdir().unwrap();
    texture_tree(tmp.path());
    let out = tempfile::tempdir().unwrap();
    let cfg = DiscoveryConfig::builder().out_dir(out.path()).build();

    let mut diag = Diagnostics::new(Vec::new());
    let path = Discovery::new(&cfg, &ImageCrateProvider)
        .run(tmp.path(), &mut diag)
        .unwrap();
    assert!(path.starts_with(out.path()));
    let name = path.file_name().unwrap().to_string_lossy().to_string();
    assert!(name.starts_with("img_search_") && name.ends_with(".json"), "{name}");

    let text = String::from_utf8(diag.into_inner()).unwrap();
    let report = DiagnosticReport::parse(&text);
    assert!(report.terminal_failure().is_none());
    assert_eq!(report.data_path(), Some(path.clone()));
    assert_eq!(report.file_count(), Some(4));

    let catalog = consume_catalog(&path).unwrap();
    assert_eq!(catalog.tile_count(), 3);
    assert!(!path.exists());
}

#[test]
fn broken_tiles_are_skipped_with_their_flag() {
    let tmp = tempfile::tempdir().unwrap();
    texture_tree(tmp.path());
    fs::write(tmp.path().join("broken_1001.tif"), b"definitely not a tiff").unwrap();
    let cfg = DiscoveryConfig::builder().out_dir(tmp.path()).build();

    let mut diag = Diagnostics::new(Vec::new());
    let catalog = Discovery::new(&cfg, &ImageCrateProvider)
        .discover(tmp.path(), &mut diag)
        .unwrap();
    assert!(catalog.group("broken", "tif").is_none());
    assert_eq!(catalog.tile_count(), 3);
    assert!(flags(&diag).contains(&Flag::MetadataError));
}

#[test]
fn filter_excludes_paths() {
    let tmp = tempfile::tempdir().unwrap();
    texture_tree(tmp.path());
    let cfg = DiscoveryConfig::builder().out_dir(tmp.path()).build();

    let mut diag = Diagnostics::new(Vec::new());
    let catalog = Discovery::new(&cfg, &ImageCrateProvider)
        .with_filter(|p| !p.to_string_lossy().contains("masks"))
        .discover(tmp.path(), &mut diag)
        .unwrap();
    assert_eq!(catalog.names().collect::<Vec<_>>(), vec!["diffuse"]);
}

#[test]
fn invalid_root_is_reported_first_and_only() {
    let tmp = tempfile::tempdir().unwrap();
    let cfg = DiscoveryConfig::builder().out_dir(tmp.path()).build();
    let mut diag = Diagnostics::new(Vec::new());
    let err = Discovery::new(&cfg, &ImageCrateProvider)
        .discover(&tmp.path().join("missing"), &mut diag)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Path);
    assert_eq!(flags(&diag), vec![Flag::InvalidPathError]);
}

#[test]
fn too_many_files_reports_count_then_aborts() {
    let tmp = tempfile::tempdir().unwrap();
    for i in 0..5 {
        fs::write(tmp.path().join(format!("f{i}.txt")), "").unwrap();
    }
    let cfg = DiscoveryConfig::builder()
        .out_dir(tmp.path())
        .max_files(3)
        .build();
    let mut diag = Diagnostics::new(Vec::new());
    let err = Discovery::new(&cfg, &ImageCrateProvider)
        .discover(tmp.path(), &mut diag)
        .unwrap_err();
    assert!(matches!(err, ImportError::TooManyFiles { count: 3 }));

    let text = String::from_utf8(diag.into_inner()).unwrap();
    assert_eq!(
        text,
        "[FileCount] 3\n[MaxFileError] '3' files found, aborting image search\n"
    );
}

#[test]
fn empty_folder_and_folder_without_tiles() {
    let tmp = tempfile::tempdir().unwrap();
    let cfg = DiscoveryConfig::builder().out_dir(tmp.path()).build();

    let empty = tmp.path().join("empty");
    fs::create_dir_all(&empty).unwrap();
    let mut diag = Diagnostics::new(Vec::new());
    let err = Discovery::new(&cfg, &ImageCrateProvider)
        .discover(&empty, &mut diag)
        .unwrap_err();
    assert!(matches!(err, ImportError::ZeroFiles { .. }));
    assert_eq!(flags(&diag), vec![Flag::ZeroFileError]);

    let docs = tmp.path().join("docs");
    fs::create_dir_all(&docs).unwrap();
    fs::write(docs.join("readme.txt"), "hi").unwrap();
    let mut diag = Diagnostics::new(Vec::new());
    let err = Discovery::new(&cfg, &ImageCrateProvider)
        .discover(&docs, &mut diag)
        .unwrap_err();
    assert!(matches!(err, ImportError::NoTargetFiles { .. }));
    assert_eq!(
        flags(&diag),
        vec![
            Flag::FileCount,
            Flag::ValidPath,
            Flag::Debug,
            Flag::NoTargetFiles
        ]
    );
}

#[test]
fn invalid_config_is_reported_before_touching_disk() {
    let cfg = DiscoveryConfig::builder().max_files(0).build();
    let mut diag = Diagnostics::new(Vec::new());
    let err = Discovery::new(&cfg, &ImageCrateProvider)
        .discover(Path::new("/definitely/not/here"), &mut diag)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Config);
    assert_eq!(diag.lines().len(), 1);
}
