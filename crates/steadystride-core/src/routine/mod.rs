mod exercise;
mod library;
mod sequence;

pub use exercise::{Exercise, ExerciseCategory};
pub use library::RoutineLibrary;
pub use sequence::Routine;
