//! Char keeper integration tests
//!
//! Every keeper is built from the bundled sample configurations and driven
//! one snapshot at a time on a manual clock.

use std::sync::Arc;

use keeperbot::command::ClientAction;
use keeperbot::core::config::BotConfig;
use keeperbot::core::types::ManualClock;
use keeperbot::keeper::CharKeeper;
use keeperbot::runtime::build_char_keeper;
use keeperbot::status::{CharStatus, ItemName, ItemSlot, MagicShieldStatus};
use keeperbot::test_support::{RecordingClient, SAMPLE_CONFIG};

const KNIGHT_CONFIG: &str = include_str!("../data/sample_knight_config.toml");

struct Harness {
    keeper: CharKeeper,
    client: Arc<RecordingClient>,
    clock: Arc<ManualClock>,
}

impl Harness {
    fn new(config: &str) -> Self {
        let config = BotConfig::from_toml_str(config).unwrap();
        let client = Arc::new(RecordingClient::new());
        let clock = Arc::new(ManualClock::new());
        let keeper = build_char_keeper(&config, client.clone(), clock.clone()).unwrap();
        Self {
            keeper,
            client,
            clock,
        }
    }

    fn tick(&mut self, status: &CharStatus) -> Vec<ClientAction> {
        self.keeper.handle_status_change(status).unwrap();
        self.client.take_actions()
    }
}

/// Sorcerer snapshot with the emergency ring and tank amulet on the action bar
fn mage_status(
    hp: i32,
    mana: i32,
    speed: i32,
    charge: i32,
    shield: MagicShieldStatus,
    ring: ItemName,
    amulet: ItemName,
) -> CharStatus {
    CharStatus::new(hp, mana, speed, charge)
        .with_magic_shield_status(shield)
        .with_item(ItemSlot::EquippedRing, ring)
        .with_item(ItemSlot::EquippedAmulet, amulet)
        .with_item(ItemSlot::EmergencyActionRing, ItemName::LifeRing)
        .with_item(ItemSlot::TankActionAmulet, ItemName::StoneSkinAmulet)
}

fn healthy(speed: i32) -> CharStatus {
    mage_status(
        600,
        2400,
        speed,
        900,
        MagicShieldStatus::OnCooldown,
        ItemName::MightRing,
        ItemName::PlatinumAmulet,
    )
}

#[test]
fn test_healthy_character_only_eats() {
    let mut harness = Harness::new(SAMPLE_CONFIG);

    assert_eq!(harness.tick(&healthy(290)), vec![ClientAction::EatFood]);
    assert!(harness.keeper.is_downtime(&healthy(290)));

    harness.clock.advance_ms(100);
    assert!(harness.tick(&healthy(290)).is_empty());
}

#[test]
fn test_haste_waits_for_magic_shield() {
    let mut harness = Harness::new(SAMPLE_CONFIG);
    let needs_shield = mage_status(
        600,
        2400,
        220,
        100,
        MagicShieldStatus::OffCooldown,
        ItemName::MightRing,
        ItemName::PlatinumAmulet,
    );

    assert!(harness.keeper.should_skip_haste(&needs_shield));
    assert_eq!(
        harness.tick(&needs_shield),
        vec![ClientAction::MagicShield, ClientAction::EatFood]
    );

    harness.clock.advance_ms(100);
    let shielded = mage_status(
        600,
        2400,
        220,
        1500,
        MagicShieldStatus::RecentlyCast,
        ItemName::MightRing,
        ItemName::PlatinumAmulet,
    );
    assert_eq!(harness.tick(&shielded), vec![ClientAction::Haste]);
}

#[test]
fn test_critical_mana_skips_haste_unless_paralyzed() {
    let mut harness = Harness::new(SAMPLE_CONFIG);
    let slowed = mage_status(
        600,
        300,
        250,
        100,
        MagicShieldStatus::OnCooldown,
        ItemName::MightRing,
        ItemName::PlatinumAmulet,
    );
    assert_eq!(
        harness.tick(&slowed),
        vec![ClientAction::DrinkMana, ClientAction::EatFood]
    );

    harness.clock.advance_ms(100);
    let paralyzed = mage_status(
        600,
        300,
        150,
        100,
        MagicShieldStatus::OnCooldown,
        ItemName::MightRing,
        ItemName::PlatinumAmulet,
    );
    harness.keeper.handle_status_change(&paralyzed).unwrap();
    assert_eq!(
        harness.client.take(),
        vec![(ClientAction::DrinkMana, 300), (ClientAction::Haste, 500)]
    );
}

#[test]
fn test_downtime_top_off_heal() {
    let mut harness = Harness::new(SAMPLE_CONFIG);
    harness.tick(&healthy(290));

    harness.clock.advance_ms(100);
    let scratched = mage_status(
        570,
        2400,
        290,
        900,
        MagicShieldStatus::OnCooldown,
        ItemName::MightRing,
        ItemName::PlatinumAmulet,
    );
    assert!(harness.keeper.is_downtime(&scratched));
    harness.keeper.handle_status_change(&scratched).unwrap();
    assert_eq!(harness.client.take(), vec![(ClientAction::MinorHeal, 1500)]);

    // Without haste the same scratch is left alone
    harness.clock.advance_ms(100);
    let slow_scratch = mage_status(
        570,
        2400,
        240,
        900,
        MagicShieldStatus::OnCooldown,
        ItemName::MightRing,
        ItemName::PlatinumAmulet,
    );
    assert!(!harness.keeper.is_downtime(&slow_scratch));
    assert_eq!(harness.tick(&slow_scratch), vec![ClientAction::Haste]);
}

#[test]
fn test_emergency_swaps_gear_and_restores_it() {
    let mut harness = Harness::new(SAMPLE_CONFIG);

    let hit = mage_status(
        200,
        2400,
        290,
        900,
        MagicShieldStatus::OnCooldown,
        ItemName::MightRing,
        ItemName::PlatinumAmulet,
    );
    harness.keeper.handle_status_change(&hit).unwrap();
    assert!(harness.keeper.modes().emergency.is_mode_on());
    assert_eq!(
        harness.client.take(),
        vec![
            (ClientAction::GreaterHeal, 200),
            (ClientAction::EatFood, 500),
            (ClientAction::ToggleEmergencyRing, 250),
            (ClientAction::ToggleTankAmulet, 250),
        ]
    );

    // Healed but not settled yet: emergency gear stays on
    harness.clock.advance_ms(1000);
    let recovered = |ring, amulet| {
        mage_status(600, 2400, 290, 900, MagicShieldStatus::OnCooldown, ring, amulet)
    };
    assert!(harness
        .tick(&recovered(ItemName::LifeRing, ItemName::StoneSkinAmulet))
        .is_empty());
    assert!(harness.keeper.modes().emergency.is_mode_on());

    harness.clock.advance_ms(6000);
    assert_eq!(
        harness.tick(&recovered(ItemName::LifeRing, ItemName::StoneSkinAmulet)),
        vec![ClientAction::ToggleEmergencyRing, ClientAction::ToggleTankAmulet]
    );
    assert!(!harness.keeper.modes().emergency.is_mode_on());

    harness.clock.advance_ms(300);
    assert_eq!(
        harness.tick(&recovered(ItemName::Empty, ItemName::Empty)),
        vec![ClientAction::EquipRing, ClientAction::EquipAmulet]
    );
}

#[test]
fn test_manual_emergency_override() {
    let mut harness = Harness::new(SAMPLE_CONFIG);
    let override_switch = harness.keeper.emergency_override();

    override_switch.start_mode();
    harness.tick(&healthy(290));
    assert!(harness.keeper.modes().emergency.is_mode_on());
    assert!(!harness.keeper.is_downtime(&healthy(290)));

    override_switch.stop_mode();
    harness.clock.advance_ms(100);
    harness.tick(&healthy(290));
    assert!(!harness.keeper.modes().emergency.is_mode_on());
}

#[test]
fn test_tank_mode_wears_tank_amulet() {
    let mut harness = Harness::new(SAMPLE_CONFIG);
    harness.keeper.tank_mode().start_mode();

    assert_eq!(
        harness.tick(&healthy(290)),
        vec![ClientAction::EatFood, ClientAction::ToggleTankAmulet]
    );
}

#[test]
fn test_knight_protector_without_potions_at_full_stats() {
    let mut harness = Harness::new(KNIGHT_CONFIG);
    let full = CharStatus::new(1800, 600, 300, 0);

    assert_eq!(harness.tick(&full), vec![ClientAction::MagicShield]);

    harness.clock.advance_ms(100);
    assert!(harness.tick(&full).is_empty());
}
