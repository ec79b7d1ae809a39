//! Configuration and trace loading from the bundled data files

use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

use keeperbot::core::config::BotConfig;
use keeperbot::core::error::BotError;
use keeperbot::core::types::{ShieldType, Vocation};
use keeperbot::status::{StatusReader, TraceStatusReader};

fn data_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("data").join(name)
}

#[test]
fn test_load_mage_sample() {
    let config = BotConfig::load(data_path("sample_config.toml")).unwrap();

    assert_eq!(config.character.vocation, Vocation::Mage);
    assert_eq!(config.character.magic_shield_type, ShieldType::Permanent);
    assert!(config.knight.is_none());
    assert!(config.equipment.is_enabled());
    assert!(config.equipment.eat_food);
    assert_eq!(config.throttle.mana.critical_ms, 300);
    assert_eq!(config.hotkeys.haste, "F8");
    // Keys not named in the file keep their defaults
    assert_eq!(config.hotkeys.eat_food, "shift+F5");
}

#[test]
fn test_load_knight_sample() {
    let config = BotConfig::load(data_path("sample_knight_config.toml")).unwrap();

    assert_eq!(config.character.vocation, Vocation::Knight);
    assert_eq!(config.character.magic_shield_type, ShieldType::Protector);
    assert!(!config.equipment.is_enabled());

    let knight = config.knight.expect("knight section");
    assert_eq!(knight.rng_seed, Some(7));
    assert_eq!(knight.hp.lo(), 1000);
    assert_eq!(knight.mana.critical(), 60);
    assert_eq!(config.throttle.potion.high_priority_ms, 800);
}

#[test]
fn test_missing_file_is_an_io_error() {
    assert!(matches!(
        BotConfig::load(data_path("does_not_exist.toml")),
        Err(BotError::IoError(_))
    ));
}

#[test]
fn test_out_of_range_probability_is_rejected() {
    let contents = std::fs::read_to_string(data_path("sample_knight_config.toml")).unwrap();
    let broken = contents.replace("0.6]", "1.5]");
    assert_ne!(contents, broken);

    assert!(matches!(
        BotConfig::from_toml_str(&broken),
        Err(BotError::Config(_))
    ));
}

#[test]
fn test_sample_trace_reads_cleanly() {
    let file = File::open(data_path("sample_trace.jsonl")).unwrap();
    let mut reader = TraceStatusReader::new(BufReader::new(file));

    let mut snapshots = 0;
    while let Some(status) = reader.read_status() {
        let status = status.unwrap();
        assert!(status.hp > 0);
        snapshots += 1;
    }
    assert!(snapshots >= 5);
}
