use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use image::{GrayImage, ImageBuffer, Rgb, RgbImage};
use tile_import_core::metadata::{ImageAttribute, read_tile, read_tiles};
use tile_import_core::model::Candidate;
use tile_import_core::prelude::*;

/// Provider whose handles report a fixed spec (or fail) and count closes.
#[derive(Default)]
struct FakeProvider {
    fail_spec_for: Vec<PathBuf>,
    fail_open_for: Vec<PathBuf>,
    opened: Rc<RefCell<usize>>,
    closed: Rc<RefCell<usize>>,
}

struct FakeHandle {
    fail: bool,
    closed: Rc<RefCell<usize>>,
}

impl ImageHandle for FakeHandle {
    fn spec(&mut self) -> tile_import_core::Result<ImageSpec> {
        if self.fail {
            return Err(ImportError::Io(std::io::Error::other("corrupt header")));
        }
        Ok(ImageSpec {
            width: 2048,
            height: 1024,
            channel_count: Some(1),
            extra_attributes: vec![
                ImageAttribute {
                    name: "bitdepth".into(),
                    value: 16,
                },
                ImageAttribute {
                    name: "other".into(),
                    value: 99,
                },
            ],
        })
    }

    fn close(&mut self) {
        *self.closed.borrow_mut() += 1;
    }
}

impl ImageProvider for FakeProvider {
    type Handle = FakeHandle;

    fn open(&self, path: &Path) -> tile_import_core::Result<FakeHandle> {
        if self.fail_open_for.iter().any(|p| p == path) {
            return Err(ImportError::Metadata {
                path: path.to_path_buf(),
                reason: "unreadable".into(),
            });
        }
        *self.opened.borrow_mut() += 1;
        Ok(FakeHandle {
            fail: self.fail_spec_for.iter().any(|p| p == path),
            closed: Rc::clone(&self.closed),
        })
    }
}

fn candidate(path: &Path) -> Candidate {
    let tile = TileName::from_path(path).expect("tile name");
    Candidate {
        base_name: tile.name.clone(),
        separator: tile.separator,
        tile_index: tile.udim.clone(),
        extension: tile.extension_lowercase(),
        path: path.to_path_buf(),
    }
}

#[test]
fn record_takes_first_attribute_as_bit_depth() {
    let tmp = tempfile::tempdir().unwrap();
    let p = tmp.path().join("mask_1001.tif");
    fs::write(&p, b"").unwrap();

    let provider = FakeProvider::default();
    let rec = read_tile(&provider, candidate(&p)).unwrap();
    assert_eq!(rec.base_name, "mask");
    assert_eq!(rec.resolution, Resolution::new(2048, 1024));
    assert_eq!(rec.bit_depth, Some(16));
    assert_eq!(rec.channel_count, Some(1));
    assert_eq!(*provider.closed.borrow(), 1);
}

#[test]
fn handles_are_closed_on_success_and_failure() {
    let tmp = tempfile::tempdir().unwrap();
    let good = tmp.path().join("a_1001.tif");
    let bad = tmp.path().join("a_1002.tif");
    let unopenable = tmp.path().join("a_1003.tif");
    for p in [&good, &bad, &unopenable] {
        fs::write(p, b"").unwrap();
    }
    let provider = FakeProvider {
        fail_spec_for: vec![bad.clone()],
        fail_open_for: vec![unopenable.clone()],
        ..Default::default()
    };

    let mut skipped = Vec::new();
    let records = read_tiles(
        &provider,
        vec![candidate(&good), candidate(&bad), candidate(&unopenable)],
        |path, err| {
            if let Some(e) = err {
                skipped.push((path.to_path_buf(), e.flag()));
            }
        },
    );

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].tile_index, "1001");
    assert_eq!(
        skipped,
        vec![
            (bad.clone(), Flag::MetadataError),
            (unopenable.clone(), Flag::MetadataError)
        ]
    );
    // Every handle that was opened was also closed.
    assert_eq!(*provider.opened.borrow(), 2);
    assert_eq!(*provider.closed.borrow(), 2);
}

#[test]
fn missing_file_is_reported_without_opening() {
    let tmp = tempfile::tempdir().unwrap();
    let gone = tmp.path().join("ghost_1001.exr");
    let provider = FakeProvider::default();

    let err = read_tile(&provider, candidate(&gone)).unwrap_err();
    assert!(matches!(err, ImportError::ImageNotFound { .. }));
    assert_eq!(err.flag(), Flag::ImageFileNotFoundError);
    assert!(!err.is_terminal());
    assert_eq!(*provider.opened.borrow(), 0);
}

#[test]
fn image_crate_reads_real_headers() {
    let tmp = tempfile::tempdir().unwrap();
    let rgb = tmp.path().join("diffuse_1001.tif");
    RgbImage::new(8, 4).save(&rgb).unwrap();
    let gray = tmp.path().join("rough_1001.tif");
    GrayImage::new(3, 5).save(&gray).unwrap();
    let deep = tmp.path().join("height_1001.tif");
    ImageBuffer::<Rgb<u16>, Vec<u16>>::new(2, 2)
        .save(&deep)
        .unwrap();

    let provider = ImageCrateProvider;

    let rec = read_tile(&provider, candidate(&rgb)).unwrap();
    assert_eq!(rec.resolution, Resolution::new(8, 4));
    assert_eq!(rec.bit_depth, Some(8));
    assert_eq!(rec.channel_count, Some(3));

    let rec = read_tile(&provider, candidate(&gray)).unwrap();
    assert_eq!(rec.resolution, Resolution::new(3, 5));
    assert_eq!(rec.channel_count, Some(1));
    assert_eq!(Colourspace::for_channels(rec.channel_count), Colourspace::Scalar);

    let rec = read_tile(&provider, candidate(&deep)).unwrap();
    assert_eq!(rec.bit_depth, Some(16));
}

#[test]
fn image_crate_rejects_non_images() {
    let tmp = tempfile::tempdir().unwrap();
    let txt = tmp.path().join("notes_1001.txt");
    fs::write(&txt, "not an image").unwrap();

    let err = read_tile(&ImageCrateProvider, candidate(&txt)).unwrap_err();
    assert!(matches!(err, ImportError::Metadata { .. }));
    assert_eq!(err.kind(), ErrorKind::Metadata);
}
