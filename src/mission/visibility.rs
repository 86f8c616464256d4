//! Squad fog of war
//!
//! Visible cells are recomputed from every active soldier each tick.
//! Discovered cells only ever grow.

use std::collections::BTreeSet;

use crate::core::config::EngineConfig;
use crate::core::types::CellCoord;
use crate::mission::graph::Graph;
use crate::mission::line_of_sight::LineOfSight;
use crate::mission::state::GameState;

/// Cells any active soldier can currently see
pub fn squad_visible_cells(state: &GameState, graph: &Graph, config: &EngineConfig) -> BTreeSet<CellCoord> {
    let los = LineOfSight::new(graph, &state.doors);
    let mut visible = BTreeSet::new();
    for unit in state.units.iter().filter(|u| u.is_active()) {
        visible.extend(los.compute_visible_cells(unit.pos, config.vision_range));
    }
    visible
}

/// Refresh `visible_cells` and fold them into `discovered_cells`
pub fn update_visibility(state: &mut GameState, graph: &Graph, config: &EngineConfig) {
    let visible = squad_visible_cells(state, graph, config);
    state.discovered_cells.extend(visible.iter().copied());
    state.visible_cells = visible;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mission::map::MapDefinition;
    use crate::mission::state::tests::{empty_state, with_unit};
    use crate::mission::units::UnitState;

    #[test]
    fn test_discovered_cells_persist() {
        let graph = Graph::new(&MapDefinition::filled(10, 10)).unwrap();
        let config = EngineConfig {
            vision_range: 2.0,
            ..Default::default()
        };
        let mut state = with_unit(empty_state(), "scout", CellCoord::new(1, 1));
        update_visibility(&mut state, &graph, &config);
        assert!(state.visible_cells.contains(&CellCoord::new(1, 1)));
        assert!(!state.visible_cells.contains(&CellCoord::new(8, 8)));

        state.units[0].pos = CellCoord::new(8, 8).center();
        update_visibility(&mut state, &graph, &config);
        assert!(!state.visible_cells.contains(&CellCoord::new(1, 1)));
        assert!(state.discovered_cells.contains(&CellCoord::new(1, 1)));
        assert!(state.discovered_cells.contains(&CellCoord::new(8, 8)));
    }

    #[test]
    fn test_dead_units_see_nothing() {
        let graph = Graph::new(&MapDefinition::filled(10, 10)).unwrap();
        let mut state = with_unit(empty_state(), "scout", CellCoord::new(1, 1));
        state.units[0].state = UnitState::Dead;
        update_visibility(&mut state, &graph, &EngineConfig::default());
        assert!(state.visible_cells.is_empty());
    }
}
