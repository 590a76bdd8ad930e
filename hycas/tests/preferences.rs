use std::path::PathBuf;

use hycas::preferences::{ConfigError, Preferences};
use hycas::prelude::*;

fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("hycas-{}-{name}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    dir
}

#[test]
fn saved_preferences_load_back() {
    let dir = scratch_dir("roundtrip");
    let path = dir.join("nested").join("preferences.toml");
    let preferences = Preferences {
        angle_unit: AngleUnit::Degree,
        complex_format: ComplexFormat::Polar,
        significant_digits: 12,
        pool_capacity: 4096,
        ..Default::default()
    };
    preferences.save(&path).unwrap();
    assert_eq!(Preferences::load(&path).unwrap(), preferences);
    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn invalid_files_are_reported() {
    let dir = scratch_dir("invalid");
    std::fs::create_dir_all(&dir).unwrap();

    let unknown_key = dir.join("unknown.toml");
    std::fs::write(&unknown_key, "angle-unit = \"degree\"\ncolour = true\n").unwrap();
    assert!(matches!(Preferences::load(&unknown_key), Err(ConfigError::Parse { .. })));

    let out_of_range = dir.join("range.toml");
    std::fs::write(&out_of_range, "significant-digits = 0\n").unwrap();
    assert!(matches!(Preferences::load(&out_of_range), Err(ConfigError::InvalidValue { .. })));

    assert!(matches!(Preferences::load(&dir.join("missing.toml")), Err(ConfigError::Io(_))));
    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn preferences_drive_the_engine() {
    let preferences =
        Preferences::from_toml_str("angle-unit = \"degree\"\ncomplex-format = \"cartesian\"\npool-capacity = 8192").unwrap();
    let pool = preferences.create_pool();
    assert_eq!(pool.capacity(), 8192);

    let ctx = preferences.approximation_context(&EmptyContext);
    let value = pool.parse("sin(30)+√(-4)").unwrap().approximate::<f64>(&ctx);
    assert!((value.re - 0.5).abs() < 1e-12);
    assert!((value.im - 2.0).abs() < 1e-12);

    let reduction = preferences.reduction_context(&EmptyContext, Target::User);
    assert_eq!(reduction.angle_unit, AngleUnit::Degree);
    let reduced = pool.parse("sin(30)").unwrap().reduce(reduction).unwrap();
    assert_eq!(reduced.to_string(), "1/2");
}
