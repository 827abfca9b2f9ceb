use clap::Subcommand;
use serde::Serialize;
use steadystride_core::{Config, Routine};

#[derive(Subcommand)]
pub enum RoutineAction {
    /// List available routines
    List,
    /// Show one routine with its exercises
    Show {
        /// Routine id or name
        routine: String,
    },
}

#[derive(Serialize)]
struct RoutineSummary<'a> {
    id: &'a str,
    name: &'a str,
    exercises: usize,
    rest_secs: u64,
    total_duration_secs: u64,
}

impl<'a> From<&'a Routine> for RoutineSummary<'a> {
    fn from(r: &'a Routine) -> Self {
        Self {
            id: &r.id,
            name: &r.name,
            exercises: r.len(),
            rest_secs: r.rest_secs,
            total_duration_secs: r.total_duration_secs(),
        }
    }
}

pub fn run(action: RoutineAction) -> Result<(), Box<dyn std::error::Error>> {
    let library = Config::load()?.routine_library();

    match action {
        RoutineAction::List => {
            let summaries: Vec<RoutineSummary> =
                library.routines().iter().map(RoutineSummary::from).collect();
            println!("{}", serde_json::to_string_pretty(&summaries)?);
        }
        RoutineAction::Show { routine } => {
            let found = library
                .find(&routine)
                .ok_or_else(|| format!("unknown routine: {routine}"))?;
            println!("{}", serde_json::to_string_pretty(found)?);
        }
    }
    Ok(())
}
