use std::path::PathBuf;

use chrono::NaiveDate;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use tile_import_core::catalog::{artifact_file_name, read_catalog, write_catalog_at};
use tile_import_core::prelude::*;

fn rec(name: &str, udim: &str, ext: &str, w: u32, bits: u32, channels: u32) -> TileRecord {
    TileRecord {
        base_name: name.into(),
        tile_index: udim.into(),
        extension: ext.into(),
        path: PathBuf::from(format!("/tex/{name}_{udim}.{ext}")),
        resolution: Resolution::new(w, w),
        bit_depth: Some(bits),
        channel_count: Some(channels),
    }
}

fn sample() -> Vec<TileRecord> {
    vec![
        rec("diffuse", "1002", "tif", 4096, 8, 3),
        rec("opacity", "1001", "tif", 2048, 8, 1),
        rec("diffuse", "1001", "tif", 4096, 8, 3),
        rec("diffuse", "1001", "exr", 4096, 32, 4),
    ]
}

#[test]
fn groups_by_name_then_extension_sorted_by_tile() {
    let catalog = Catalog::build(sample());
    assert_eq!(catalog.names().collect::<Vec<_>>(), vec!["diffuse", "opacity"]);
    assert_eq!(catalog.group_count(), 3);
    assert_eq!(catalog.tile_count(), 4);

    let tif = catalog.group("diffuse", "tif").unwrap();
    let udims: Vec<&str> = tif.iter().map(|t| t.udim.as_str()).collect();
    assert_eq!(udims, vec!["1001", "1002"]);
    assert_eq!(catalog.group("diffuse", "TIF").unwrap().len(), 2);
    assert_eq!(catalog.group("diffuse", "exr").unwrap().len(), 1);
    assert!(catalog.group("diffuse", "jpg").is_none());
    assert!(catalog.group("albedo", "tif").is_none());

    let keys: Vec<(&str, &str)> = catalog.groups().map(|(n, e, _)| (n, e)).collect();
    assert_eq!(
        keys,
        vec![("diffuse", "exr"), ("diffuse", "tif"), ("opacity", "tif")]
    );
}

#[test]
fn build_is_independent_of_discovery_order() {
    let expected = Catalog::build(sample());
    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..16 {
        let mut shuffled = sample();
        shuffled.shuffle(&mut rng);
        assert_eq!(Catalog::build(shuffled), expected);
    }
}

#[test]
fn repeated_tile_keeps_the_last_record() {
    let mut first = rec("diffuse", "1001", "tif", 1024, 8, 3);
    first.path = PathBuf::from("/a/diffuse_1001.tif");
    let mut second = rec("diffuse", "1001", "tif", 2048, 8, 3);
    second.path = PathBuf::from("/b/diffuse.1001.tif");

    let catalog = Catalog::build([first, second]);
    let tiles = catalog.group("diffuse", "tif").unwrap();
    assert_eq!(tiles.len(), 1);
    assert_eq!(tiles[0].path, PathBuf::from("/b/diffuse.1001.tif"));
    assert_eq!(tiles[0].res, Resolution::new(2048, 2048));
}

#[test]
fn rows_describe_each_group_from_its_first_tile() {
    let catalog = Catalog::build(sample());
    let rows = catalog.rows();
    assert_eq!(rows.len(), 3);

    let exr = &rows[0];
    assert_eq!(exr.name, "diffuse");
    assert_eq!(exr.file_type, "EXR");
    assert_eq!(exr.udim_count, 1);
    assert_eq!(exr.depth, "32-bit");
    assert_eq!(exr.colourspace, Colourspace::Color);

    let opacity = &rows[2];
    assert_eq!(opacity.file_type, "TIF");
    assert_eq!(opacity.size, Resolution::new(2048, 2048));
    assert_eq!(opacity.colourspace, Colourspace::Scalar);

    let json = serde_json::to_value(&rows[1]).unwrap();
    assert_eq!(json["Name"], "diffuse");
    assert_eq!(json["File Type"], "TIF");
    assert_eq!(json["Udim Count"], 2);
    assert_eq!(json["Size"], "4096x4096");
    assert_eq!(json["Depth"], "8-bit");
    assert_eq!(json["Colourspace"], "color");
}

#[test]
fn unknown_depth_row_and_null_fields() {
    let mut r = rec("mask", "1001", "jpg", 512, 8, 3);
    r.bit_depth = None;
    r.channel_count = None;
    let catalog = Catalog::build([r]);
    assert_eq!(catalog.rows()[0].depth, "unknown");

    let json: serde_json::Value = serde_json::from_str(&catalog.to_json_pretty().unwrap()).unwrap();
    let tile = &json["mask"]["jpg"][0];
    assert!(tile["bitdepth"].is_null());
    assert!(tile["channels"].is_null());
}

#[test]
fn json_document_shape() {
    let catalog = Catalog::build(sample());
    let json: serde_json::Value = serde_json::from_str(&catalog.to_json_pretty().unwrap()).unwrap();
    let first = &json["diffuse"]["tif"][0];
    assert_eq!(first["udim"], "1001");
    assert_eq!(first["path"], "/tex/diffuse_1001.tif");
    assert_eq!(first["res"], "4096x4096");
    assert_eq!(first["bitdepth"], 8);
    assert_eq!(first["channels"], 3);
    assert_eq!(json["opacity"]["tif"].as_array().unwrap().len(), 1);
}

#[test]
fn loading_restores_order_and_uniqueness() {
    let raw = r#"{
        "diffuse": {
            "tif": [
                {"udim": "1003", "path": "/t/diffuse_1003.tif", "res": "16x16", "bitdepth": 8, "channels": 3},
                {"udim": "1001", "path": "/old/diffuse_1001.tif", "res": "16x16", "bitdepth": 8, "channels": 3},
                {"udim": "1001", "path": "/new/diffuse_1001.tif", "res": "16x16", "bitdepth": 8, "channels": 3}
            ],
            "exr": []
        }
    }"#;
    let catalog = Catalog::from_json_str(raw).unwrap();
    let tiles = catalog.group("diffuse", "tif").unwrap();
    let udims: Vec<&str> = tiles.iter().map(|t| t.udim.as_str()).collect();
    assert_eq!(udims, vec!["1001", "1003"]);
    assert_eq!(tiles[0].path, PathBuf::from("/new/diffuse_1001.tif"));
    assert!(catalog.group("diffuse", "exr").is_none());

    assert!(Catalog::from_json_str(r#"{"a": {"tif": [{"udim": "1001", "path": "p", "res": "wide", "bitdepth": 8, "channels": 3}]}}"#).is_err());
}

#[test]
fn artifact_is_timestamped_and_consumed_once() {
    let tmp = tempfile::tempdir().unwrap();
    let at = NaiveDate::from_ymd_opt(2024, 3, 9)
        .unwrap()
        .and_hms_opt(14, 5, 7)
        .unwrap();
    assert_eq!(artifact_file_name(at), "img_search_20240309_140507.json");

    let catalog = Catalog::build(sample());
    let path = write_catalog_at(tmp.path(), &catalog, at).unwrap();
    assert_eq!(path, tmp.path().join("img_search_20240309_140507.json"));
    assert_eq!(read_catalog(&path).unwrap(), catalog);

    let loaded = consume_catalog(&path).unwrap();
    assert_eq!(loaded, catalog);
    assert!(!path.exists());
    assert!(matches!(
        consume_catalog(&path),
        Err(ImportError::Write(_))
    ));
}

#[test]
fn empty_catalog_is_not_written() {
    let tmp = tempfile::tempdir().unwrap();
    let err = write_catalog(tmp.path(), &Catalog::default()).unwrap_err();
    assert_eq!(err.flag(), Flag::WriteDataError);
    assert_eq!(std::fs::read_dir(tmp.path()).unwrap().count(), 0);
}
