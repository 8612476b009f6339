use super::ProgressionResolver;
use crate::gym::Gym;
use crate::player::Trainer;
use crate::pokemon::PokemonInst;

pub const GYM_VICTORY_EXP: u32 = 100;
pub const TRAINER_VICTORY_EXP: u32 = 50;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelUpNotice {
    pub roster_index: usize,
    pub name: String,
    pub new_level: u8,
}

impl LevelUpNotice {
    pub fn message(&self) -> String {
        format!("{} leveled up to Lv. {}!", self.name, self.new_level)
    }
}

/// What a victory changed, for the messages sent back to the player.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgressionReport {
    /// Set only when the badge was not already owned.
    pub badge_awarded: Option<String>,
    pub level_ups: Vec<LevelUpNotice>,
}

impl ProgressionResolver {
    /// Gives `amount` experience to every creature still standing.
    pub fn award_experience(&self, team: &mut [PokemonInst], amount: u32) -> Vec<LevelUpNotice> {
        let mut notices = Vec::new();
        for (roster_index, pokemon) in team.iter_mut().enumerate() {
            if pokemon.is_fainted() {
                continue;
            }
            for level_up in pokemon.add_experience(amount) {
                notices.push(LevelUpNotice {
                    roster_index,
                    name: pokemon.name.clone(),
                    new_level: level_up.new_level,
                });
            }
        }
        notices
    }

    /// Marks the gym defeated, awards its badge once and gives survivors gym experience.
    pub fn resolve_gym_victory(&self, trainer: &mut Trainer, gym: &mut Gym) -> ProgressionReport {
        gym.defeated = true;
        let badge_awarded = trainer.award_badge(&gym.name).then(|| gym.name.clone());
        let level_ups = self.award_experience(&mut trainer.team, GYM_VICTORY_EXP);
        log::info!(
            "{} defeated {} ({} level-ups)",
            trainer.id,
            gym.name,
            level_ups.len()
        );
        ProgressionReport {
            badge_awarded,
            level_ups,
        }
    }

    pub fn resolve_trainer_victory(&self, trainer: &mut Trainer) -> ProgressionReport {
        ProgressionReport {
            badge_awarded: None,
            level_ups: self.award_experience(&mut trainer.team, TRAINER_VICTORY_EXP),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battle::tests::common::TestPokemonBuilder;
    use pretty_assertions::assert_eq;
    use schema::PokemonType;
    use std::collections::BTreeMap;

    fn trainer() -> Trainer {
        let mut trainer = Trainer::new("ash", "Ash", BTreeMap::new());
        trainer.team.push(TestPokemonBuilder::new("pikachu", 5).with_experience(450).build());
        trainer.team.push(TestPokemonBuilder::new("pidgey", 3).with_hp(0).build());
        trainer.team.push(TestPokemonBuilder::new("caterpie", 2).build());
        trainer
    }

    #[test]
    fn test_gym_victory_awards_badge_and_experience() {
        let mut trainer = trainer();
        let mut gym = Gym::new("Pewter City", "Brock", PokemonType::Rock);
        assert!(trainer.badges.is_empty());

        let report = ProgressionResolver::new().resolve_gym_victory(&mut trainer, &mut gym);

        assert!(gym.defeated);
        assert!(trainer.has_badge("Pewter City"));
        assert_eq!(report.badge_awarded.as_deref(), Some("Pewter City"));
        // 450 + 100 crosses 500: level 6, experience reset.
        assert_eq!(trainer.team[0].level, 6);
        assert_eq!(trainer.team[0].experience, 0);
        // Fainted creatures gain nothing.
        assert_eq!(trainer.team[1].experience, 0);
        assert_eq!(trainer.team[1].level, 3);
        // 100 < 200 so no level-up, experience kept.
        assert_eq!(trainer.team[2].experience, 100);
        assert_eq!(
            report.level_ups,
            vec![LevelUpNotice {
                roster_index: 0,
                name: "pikachu".to_string(),
                new_level: 6,
            }]
        );
        assert_eq!(report.level_ups[0].message(), "pikachu leveled up to Lv. 6!");
    }

    #[test]
    fn test_badge_is_idempotent() {
        let mut trainer = trainer();
        let mut gym = Gym::new("Pewter City", "Brock", PokemonType::Rock);
        let resolver = ProgressionResolver::new();
        resolver.resolve_gym_victory(&mut trainer, &mut gym);
        let second = resolver.resolve_gym_victory(&mut trainer, &mut gym);

        assert_eq!(second.badge_awarded, None);
        assert_eq!(trainer.badges.len(), 1);
    }

    #[test]
    fn test_trainer_victory_gives_fifty() {
        let mut trainer = trainer();
        let report = ProgressionResolver::new().resolve_trainer_victory(&mut trainer);
        assert_eq!(trainer.team[2].experience, 50);
        assert_eq!(report.level_ups.len(), 1);
        assert!(trainer.badges.is_empty());
    }
}
