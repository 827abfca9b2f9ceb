//! Stock routines plus user routines from configuration.

use super::exercise::{Exercise, ExerciseCategory};
use super::sequence::Routine;

const DEFAULT_REST_SECS: u64 = 15;

#[derive(Debug, Clone)]
pub struct RoutineLibrary {
    routines: Vec<Routine>,
}

impl RoutineLibrary {
    /// The routines shipped with the app.
    pub fn builtin() -> Self {
        Self {
            routines: vec![morning_energy(), balance_builder(), strength_stability()],
        }
    }

    /// Built-in routines followed by `custom`.
    ///
    /// A custom routine whose id matches a built-in one replaces it.
    pub fn with_custom(custom: &[Routine]) -> Self {
        let mut lib = Self::builtin();
        for routine in custom {
            match lib.routines.iter_mut().find(|r| r.id == routine.id) {
                Some(slot) => *slot = routine.clone(),
                None => lib.routines.push(routine.clone()),
            }
        }
        lib
    }

    pub fn routines(&self) -> &[Routine] {
        &self.routines
    }

    /// Look up by exact id, then by case-insensitive name.
    pub fn find(&self, key: &str) -> Option<&Routine> {
        self.routines
            .iter()
            .find(|r| r.id == key)
            .or_else(|| self.routines.iter().find(|r| r.name.eq_ignore_ascii_case(key)))
    }
}

impl Default for RoutineLibrary {
    fn default() -> Self {
        Self::builtin()
    }
}

fn single_leg_stand() -> Exercise {
    Exercise::new("Single Leg Stand", 30, ExerciseCategory::Balance).with_instructions([
        "Stand behind a sturdy chair, holding the back for support",
        "Lift your right foot off the ground",
        "Hold for 10-15 seconds",
        "Lower your foot and repeat with the left leg",
    ])
}

fn heel_to_toe_walk() -> Exercise {
    Exercise::new("Heel-to-Toe Walk", 60, ExerciseCategory::Balance).with_instructions([
        "Stand near a wall for support if needed",
        "Place your right foot directly in front of your left",
        "Take 15-20 steps forward",
    ])
}

fn weight_shifts() -> Exercise {
    Exercise::new("Weight Shifts", 45, ExerciseCategory::Balance).with_instructions([
        "Stand with feet hip-width apart",
        "Shift your weight slowly onto your right leg",
        "Return to center and shift to the left",
    ])
}

fn chair_stand() -> Exercise {
    Exercise::new("Chair Stand", 45, ExerciseCategory::Strength).with_instructions([
        "Sit in a sturdy chair with feet flat on the floor",
        "Cross your arms over your chest",
        "Stand up slowly without using your hands",
    ])
}

fn wall_push_ups() -> Exercise {
    Exercise::new("Wall Push-Ups", 60, ExerciseCategory::Strength).with_instructions([
        "Stand facing a wall, about arm's length away",
        "Place your palms flat on the wall at shoulder height",
        "Bend your elbows and lean toward the wall",
    ])
}

fn calf_raises() -> Exercise {
    Exercise::new("Calf Raises", 45, ExerciseCategory::Strength).with_instructions([
        "Stand behind a chair, holding the back for balance",
        "Rise up onto your toes",
        "Lower back down slowly",
    ])
}

fn neck_stretches() -> Exercise {
    Exercise::new("Neck Stretches", 30, ExerciseCategory::Flexibility).with_instructions([
        "Sit or stand with good posture",
        "Slowly tilt your head toward your right shoulder",
    ])
}

fn shoulder_rolls() -> Exercise {
    Exercise::new("Shoulder Rolls", 30, ExerciseCategory::Flexibility).with_instructions([
        "Sit or stand with arms relaxed at your sides",
        "Roll your shoulders up, back, and down",
    ])
}

fn deep_breathing() -> Exercise {
    Exercise::new("Deep Breathing", 60, ExerciseCategory::Breathing).with_instructions([
        "Sit comfortably with your back supported",
        "Breathe in slowly through your nose for four counts",
        "Breathe out through your mouth for six counts",
    ])
}

fn morning_energy() -> Routine {
    let mut r = Routine::new(
        "morning-energy",
        "Morning Energy Boost",
        DEFAULT_REST_SECS,
        vec![
            neck_stretches(),
            shoulder_rolls(),
            single_leg_stand(),
            calf_raises(),
            deep_breathing(),
        ],
    );
    r.description = "A gentle routine to start your day with energy and focus.".into();
    r
}

fn balance_builder() -> Routine {
    let mut r = Routine::new(
        "balance-builder",
        "Balance Builder",
        DEFAULT_REST_SECS,
        vec![
            single_leg_stand(),
            heel_to_toe_walk(),
            weight_shifts(),
            heel_to_toe_walk(),
            single_leg_stand(),
        ],
    );
    r.description = "Focused exercises to improve your balance and stability.".into();
    r
}

fn strength_stability() -> Routine {
    let mut r = Routine::new(
        "strength-stability",
        "Strength & Stability",
        20,
        vec![chair_stand(), wall_push_ups(), calf_raises(), chair_stand()],
    );
    r.description = "Build functional strength for everyday activities.".into();
    r
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_routines_are_startable() {
        let lib = RoutineLibrary::builtin();
        assert_eq!(lib.routines().len(), 3);
        for routine in lib.routines() {
            assert!(routine.validate().is_ok(), "{} should validate", routine.id);
        }
    }

    #[test]
    fn find_by_id_or_name() {
        let lib = RoutineLibrary::builtin();
        assert_eq!(lib.find("balance-builder").unwrap().name, "Balance Builder");
        assert_eq!(lib.find("balance builder").unwrap().id, "balance-builder");
        assert!(lib.find("nope").is_none());
    }

    #[test]
    fn custom_routine_overrides_builtin_with_same_id() {
        let custom = Routine::new(
            "balance-builder",
            "My Balance",
            10,
            vec![Exercise::new("Sway", 20, ExerciseCategory::Balance)],
        );
        let extra = Routine::new(
            "evening",
            "Evening Wind Down",
            10,
            vec![Exercise::new("Breathe", 60, ExerciseCategory::Breathing)],
        );
        let lib = RoutineLibrary::with_custom(&[custom, extra]);
        assert_eq!(lib.routines().len(), 4);
        assert_eq!(lib.find("balance-builder").unwrap().name, "My Balance");
        assert!(lib.find("evening").is_some());
    }
}
