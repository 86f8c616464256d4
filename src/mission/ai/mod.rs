//! Squad autonomy
//!
//! Architecture: a fixed pipeline of behaviors run once per tick, in order.
//! Each behavior reads the shared state and issues autonomous commands
//! through the same executor manual commands use.
//!
//! - VIP: flee, head for extraction, or tag along
//! - Escort: formation slots around an escortee
//! - Claims: nearest-unit arbitration for loot and objectives
//! - Exploration: frontier targets for idle units
//!
//! Interaction (starting channels on arrival) runs after movement instead,
//! so a unit can arrive and start channeling in the same tick.

pub mod claims;
pub mod escort;
pub mod exploration;
pub mod interaction;
pub mod vip;

pub use claims::ClaimBehavior;
pub use escort::EscortBehavior;
pub use exploration::ExplorationBehavior;
pub use interaction::update_interaction;
pub use vip::VipBehavior;

use crate::core::config::EngineConfig;
use crate::mission::commands::CommandLabel;
use crate::mission::graph::Graph;
use crate::mission::state::GameState;
use crate::mission::units::{Unit, UnitState};

/// What a behavior gets to work with
pub struct AiContext<'a> {
    pub state: &'a mut GameState,
    pub graph: &'a Graph,
    pub config: &'a EngineConfig,
}

/// One stage of the squad AI pipeline
pub trait SquadBehavior {
    fn name(&self) -> &'static str;

    fn run(&self, ctx: &mut AiContext<'_>);
}

/// Ordered behavior pipeline
pub struct SquadAi {
    behaviors: Vec<Box<dyn SquadBehavior>>,
}

impl Default for SquadAi {
    fn default() -> Self {
        Self {
            behaviors: vec![
                Box::new(VipBehavior),
                Box::new(EscortBehavior),
                Box::new(ClaimBehavior),
                Box::new(ExplorationBehavior),
            ],
        }
    }
}

impl SquadAi {
    pub fn behavior_names(&self) -> Vec<&'static str> {
        self.behaviors.iter().map(|b| b.name()).collect()
    }

    pub fn update(&self, state: &mut GameState, graph: &Graph, config: &EngineConfig) {
        let mut ctx = AiContext { state, graph, config };
        for behavior in &self.behaviors {
            behavior.run(&mut ctx);
        }
    }
}

/// Whether the squad AI may hand this unit new work
///
/// Idle units qualify, as do units on an autonomous errand that a better
/// one can replace.
pub fn is_available(unit: &Unit) -> bool {
    unit.is_active()
        && unit.ai_enabled
        && !unit.is_vip()
        && unit.command_queue.is_empty()
        && unit.state != UnitState::Channeling
        && unit.active_command.as_ref().map_or(true, |c| {
            c.has_label(CommandLabel::Exploring) || c.has_label(CommandLabel::Extracting)
        })
}
