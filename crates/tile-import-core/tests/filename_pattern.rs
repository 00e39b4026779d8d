use std::path::Path;

use tile_import_core::pattern::{TileName, UDIM_TOKEN, image_template};

#[test]
fn underscore_and_dot_separators() {
    let t = TileName::parse("diffuse_1001.tif").expect("match");
    assert_eq!(t.name, "diffuse");
    assert_eq!(t.separator, '_');
    assert_eq!(t.udim, "1001");
    assert_eq!(t.ext, "tif");

    let t = TileName::parse("opacity.1001.tif").expect("match");
    assert_eq!(t.name, "opacity");
    assert_eq!(t.separator, '.');
    assert_eq!(t.udim, "1001");
}

#[test]
fn name_is_non_greedy_but_keeps_inner_separators() {
    let t = TileName::parse("wood_planks_v2_1012.exr").expect("match");
    assert_eq!(t.name, "wood_planks_v2");
    assert_eq!(t.separator, '_');
    assert_eq!(t.udim, "1012");
}

#[test]
fn extension_case_is_preserved_but_lowercase_available() {
    let t = TileName::parse("Mask_1001.TIF").expect("match");
    assert_eq!(t.ext, "TIF");
    assert_eq!(t.extension_lowercase(), "tif");
}

#[test]
fn rejects_names_without_tile_index() {
    for name in [
        "diffuse.tif",
        "diffuse_101.tif",
        "diffuse_1001",
        "diffuse_1001.tar.gz",
        "1001.tif",
        "diffuse_1001.",
    ] {
        assert!(TileName::parse(name).is_none(), "{name} should not match");
    }
}

// The separator must be a non-digit, so a fifth leading digit cannot be folded into
// the name: the whole file is rejected instead.
#[test]
fn five_digit_run_is_rejected() {
    assert!(TileName::parse("diffuse_10011.tif").is_none());
    assert!(TileName::parse("diffuse.12345.exr").is_none());
}

#[test]
fn name_may_be_empty() {
    let t = TileName::parse("x1001.tif").expect("match");
    assert_eq!(t.name, "");
    assert_eq!(t.separator, 'x');
    assert_eq!(t.udim, "1001");
    assert_eq!(t.template(), "x$UDIM.tif");
    assert_eq!(t.with_udim("1001"), "x1001.tif");

    let t = TileName::parse("_1001.tif").expect("match");
    assert_eq!(t.name, "");
    assert_eq!(t.separator, '_');
    assert_eq!(t.with_udim("1002"), "_1002.tif");
}

#[test]
fn digits_inside_name_are_fine() {
    let t = TileName::parse("layer2.1003.jpg").expect("match");
    assert_eq!(t.name, "layer2");
    assert_eq!(t.udim, "1003");
}

#[test]
fn template_round_trips_to_original_filename() {
    for name in [
        "diffuse_1001.tif",
        "opacity.1002.TIF",
        "a-b-c-1099.exr",
        "rough x 1010.jpeg",
        "Albedo_v003_1001.txt",
    ] {
        let t = TileName::parse(name).expect("match");
        let template = t.template();
        assert!(template.contains(UDIM_TOKEN));
        assert_eq!(template.replace(UDIM_TOKEN, &t.udim), name);
        assert_eq!(t.with_udim(&t.udim), name);
    }
}

#[test]
fn image_template_uses_parent_directory() {
    let tpl = image_template(Path::new("/textures/set/diffuse_1001.tif")).expect("template");
    assert_eq!(tpl, "/textures/set/diffuse_$UDIM.tif");
    assert!(image_template(Path::new("/textures/readme.txt")).is_none());
}
