//! Wound factory and penalties
//!
//! Heavy hits leave wounds. Severity follows the damage-to-hp_max
//! ratio; the struck body part comes from a fixed weighted distribution
//! rolled on the same stream as the damage itself.

use rand::Rng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::core::types::Weight;

/// Severity ladder, ordered from scratch to deathblow
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum WoundSeverity {
    Minor,    // Heals on its own
    Moderate, // Noticeable penalties
    Severe,   // Serious penalties, bleeding
    Critical, // Crippling, likely permanent
    Mortal,   // The unit is dying
}

/// Body parts that can be struck
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BodyPart {
    Head,
    Torso,
    LeftArm,
    RightArm,
    LeftLeg,
    RightLeg,
}

impl BodyPart {
    pub fn is_arm(&self) -> bool {
        matches!(self, BodyPart::LeftArm | BodyPart::RightArm)
    }

    pub fn is_leg(&self) -> bool {
        matches!(self, BodyPart::LeftLeg | BodyPart::RightLeg)
    }
}

/// A wound carried on a unit's Wound component
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Wound {
    pub severity: WoundSeverity,
    pub body_part: BodyPart,
    pub attack_penalty: i32,
    pub defense_penalty: i32,
    /// Added to the weight of every action the wounded unit takes
    pub speed_penalty: Weight,
    pub bleeding: bool,
    pub permanent: bool,
}

impl Wound {
    pub fn new(severity: WoundSeverity, body_part: BodyPart) -> Self {
        let (attack_penalty, defense_penalty, speed_penalty) = penalties_for(severity);
        let mut wound = Self {
            severity,
            body_part,
            attack_penalty,
            defense_penalty,
            speed_penalty,
            bleeding: severity >= WoundSeverity::Severe,
            permanent: severity >= WoundSeverity::Critical,
        };
        // Arm hits degrade offense more, leg hits slow more
        if body_part.is_arm() {
            wound.attack_penalty -= 1;
        }
        if body_part.is_leg() {
            wound.speed_penalty += 10;
        }
        wound
    }
}

/// Stat penalties per severity: (attack, defense, speed)
fn penalties_for(severity: WoundSeverity) -> (i32, i32, Weight) {
    match severity {
        WoundSeverity::Minor => (0, 0, 5),
        WoundSeverity::Moderate => (-1, 0, 10),
        WoundSeverity::Severe => (-2, -1, 20),
        WoundSeverity::Critical => (-3, -2, 35),
        WoundSeverity::Mortal => (-5, -3, 50),
    }
}

/// Severity for a damage/hp_max percentage, or None below the wound floor
pub fn severity_for_ratio(ratio_pct: u32) -> Option<WoundSeverity> {
    match ratio_pct {
        0..=29 => None,
        30..=44 => Some(WoundSeverity::Minor),
        45..=59 => Some(WoundSeverity::Moderate),
        60..=74 => Some(WoundSeverity::Severe),
        75..=89 => Some(WoundSeverity::Critical),
        _ => Some(WoundSeverity::Mortal),
    }
}

/// Fixed body part distribution: torso 40, head 10, each arm 15, each leg 10
pub fn roll_body_part(rng: &mut ChaCha8Rng) -> BodyPart {
    match rng.gen_range(0..100u32) {
        0..=39 => BodyPart::Torso,
        40..=49 => BodyPart::Head,
        50..=64 => BodyPart::LeftArm,
        65..=79 => BodyPart::RightArm,
        80..=89 => BodyPart::LeftLeg,
        _ => BodyPart::RightLeg,
    }
}

/// Produce a wound for a resolved hit, if it crossed the wound floor.
///
/// `wound_floor_pct` is the configured damage ratio threshold times 100.
pub fn wound_from_damage(
    damage: i32,
    hp_max: i32,
    wound_floor_pct: u32,
    rng: &mut ChaCha8Rng,
) -> Option<Wound> {
    if hp_max <= 0 || damage <= 0 {
        return None;
    }
    let ratio_pct = (damage as u64 * 100 / hp_max as u64) as u32;
    if ratio_pct < wound_floor_pct {
        return None;
    }
    let severity = severity_for_ratio(ratio_pct)?;
    let body_part = roll_body_part(rng);
    Some(Wound::new(severity, body_part))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::rng::damage_stream;
    use crate::core::types::EntityId;

    fn test_rng() -> ChaCha8Rng {
        damage_stream(1, EntityId(1), EntityId(2), 0, 0)
    }

    #[test]
    fn test_light_hit_leaves_no_wound() {
        let mut rng = test_rng();
        assert!(wound_from_damage(2, 20, 30, &mut rng).is_none());
    }

    #[test]
    fn test_threshold_hit_wounds() {
        let mut rng = test_rng();
        let wound = wound_from_damage(6, 20, 30, &mut rng).unwrap();
        assert_eq!(wound.severity, WoundSeverity::Minor);
    }

    #[test]
    fn test_severity_scales_with_ratio() {
        assert_eq!(severity_for_ratio(29), None);
        assert_eq!(severity_for_ratio(30), Some(WoundSeverity::Minor));
        assert_eq!(severity_for_ratio(50), Some(WoundSeverity::Moderate));
        assert_eq!(severity_for_ratio(70), Some(WoundSeverity::Severe));
        assert_eq!(severity_for_ratio(80), Some(WoundSeverity::Critical));
        assert_eq!(severity_for_ratio(95), Some(WoundSeverity::Mortal));
    }

    #[test]
    fn test_severe_wounds_bleed() {
        let wound = Wound::new(WoundSeverity::Severe, BodyPart::Torso);
        assert!(wound.bleeding);
        let scratch = Wound::new(WoundSeverity::Minor, BodyPart::Torso);
        assert!(!scratch.bleeding);
    }

    #[test]
    fn test_critical_wounds_are_permanent() {
        assert!(Wound::new(WoundSeverity::Critical, BodyPart::Head).permanent);
        assert!(!Wound::new(WoundSeverity::Moderate, BodyPart::Head).permanent);
    }

    #[test]
    fn test_leg_wound_slows_more() {
        let torso = Wound::new(WoundSeverity::Moderate, BodyPart::Torso);
        let leg = Wound::new(WoundSeverity::Moderate, BodyPart::LeftLeg);
        assert!(leg.speed_penalty > torso.speed_penalty);
    }

    #[test]
    fn test_arm_wound_weakens_attack() {
        let torso = Wound::new(WoundSeverity::Moderate, BodyPart::Torso);
        let arm = Wound::new(WoundSeverity::Moderate, BodyPart::RightArm);
        assert!(arm.attack_penalty < torso.attack_penalty);
    }

    #[test]
    fn test_body_part_distribution_is_deterministic() {
        let mut a = test_rng();
        let mut b = test_rng();
        for _ in 0..20 {
            assert_eq!(roll_body_part(&mut a), roll_body_part(&mut b));
        }
    }
}
