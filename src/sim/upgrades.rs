//! Level-up rewards: offers drawn on each hero level and their effects

use rand::Rng;
use rand::seq::SliceRandom;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::combat::{Arsenal, Weapon, WeaponKind};
use super::hero::Hero;
use crate::tuning::WeaponsConfig;

/// Offers presented per level-up
pub const OFFERS_PER_LEVEL: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Upgrade {
    /// +20% max health, healing the same amount
    HealthUp,
    /// Movement speed x1.15
    SpeedUp,
    /// +1 health per regeneration interval
    Regeneration,
    /// Every weapon's cooldown x0.9
    WeaponMastery,
    /// Projectile radius and beam width x1.2
    ProjectileSize,
    NewWeapon(WeaponKind),
}

const STAT_UPGRADES: [Upgrade; 5] = [
    Upgrade::HealthUp,
    Upgrade::SpeedUp,
    Upgrade::Regeneration,
    Upgrade::WeaponMastery,
    Upgrade::ProjectileSize,
];

/// Up to three distinct offers: one unowned weapon when there is one, the
/// rest stat upgrades
pub fn offer_upgrades(arsenal: &Arsenal, rng: &mut Pcg32) -> Vec<Upgrade> {
    let mut offers = Vec::with_capacity(OFFERS_PER_LEVEL);
    let unowned: Vec<WeaponKind> = WeaponKind::ALL
        .into_iter()
        .filter(|kind| !arsenal.has(*kind))
        .collect();
    if !unowned.is_empty() {
        offers.push(Upgrade::NewWeapon(unowned[rng.random_range(0..unowned.len())]));
    }

    let mut stats = STAT_UPGRADES;
    stats.shuffle(rng);
    let room = OFFERS_PER_LEVEL - offers.len();
    offers.extend(stats.into_iter().take(room));
    offers
}

/// Apply one upgrade to the hero and arsenal
pub fn apply_upgrade(upgrade: Upgrade, hero: &mut Hero, arsenal: &mut Arsenal, weapons: &WeaponsConfig) {
    match upgrade {
        Upgrade::HealthUp => {
            let bonus = hero.body.max_health() * 0.2;
            hero.body.raise_max_health(bonus);
            hero.body.heal(bonus);
        }
        Upgrade::SpeedUp => hero.body.speed *= 1.15,
        Upgrade::Regeneration => hero.regeneration += 1.0,
        Upgrade::WeaponMastery => {
            for weapon in &mut arsenal.weapons {
                weapon.scale_cooldown(0.9);
            }
        }
        Upgrade::ProjectileSize => {
            for weapon in &mut arsenal.weapons {
                weapon.scale_projectile_size(1.2);
            }
        }
        Upgrade::NewWeapon(kind) => {
            // Owning it already turns the offer into a level for that weapon
            match arsenal.get_mut(kind) {
                Some(weapon) => weapon.level_up(),
                None => {
                    arsenal.add(Weapon::from_kind(kind, weapons));
                }
            }
        }
    }
    log::info!("Applied upgrade {:?}", upgrade);
}
