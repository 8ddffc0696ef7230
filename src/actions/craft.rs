//! Craft items, using a nearby crafting table when one exists

use crate::actions::goal::{approach, RepathTimer, StallTracker, TickBudget};
use crate::actions::{ActionEnv, ActionResult, ActionState, Behavior};
use crate::core::types::BlockPos;
use crate::task::Task;
use crate::world::blocks;
use tracing::info;

const TIMEOUT: TickBudget = TickBudget::new(1_200);
const TABLE_SEARCH_RADIUS: i32 = 16;
const TABLE_REACH: f64 = 3.0;

pub struct CraftItem {
    item: String,
    quantity: u32,
    table: Option<BlockPos>,
    stall: StallTracker,
    repath: RepathTimer,
}

impl CraftItem {
    pub fn new(item: &str, quantity: u32) -> Self {
        Self {
            item: blocks::normalize(item),
            quantity: quantity.max(1),
            table: None,
            stall: StallTracker::new(),
            repath: RepathTimer::default(),
        }
    }

    pub fn from_task(task: &Task) -> Self {
        Self::new(
            task.get_str_or("item", ""),
            task.get_count("quantity"),
        )
    }

    fn finish(&self, env: &mut ActionEnv<'_>, state: &mut ActionState) {
        env.world.stop_navigation(env.agent.id);
        if env.world.craft(env.agent.id, &self.item, self.quantity) {
            info!("{} crafted {} {}", env.agent.name, self.quantity, self.item);
            state.mark_complete(true, format!("Crafted {} {}", self.quantity, self.item));
        } else {
            state.mark_complete(false, format!("Could not craft {}", self.item));
        }
    }
}

impl Behavior for CraftItem {
    fn on_start(&mut self, env: &mut ActionEnv<'_>, state: &mut ActionState) {
        if self.item.is_empty() {
            state.complete(ActionResult::failure_replan("No item to craft"));
            return;
        }
        let Some(pos) = env.position() else {
            return;
        };
        let from = pos.block_pos();
        self.table = env
            .world
            .blocks_within(from, TABLE_SEARCH_RADIUS, &|name| name == "crafting_table")
            .into_iter()
            .min_by(|a, b| a.dist_sqr(&from).total_cmp(&b.dist_sqr(&from)));
    }

    fn on_tick(&mut self, env: &mut ActionEnv<'_>, state: &mut ActionState) {
        if TIMEOUT.exceeded(state.ticks_run()) {
            env.world.stop_navigation(env.agent.id);
            state.mark_complete(false, "Could not reach the crafting table");
            return;
        }
        let Some(table) = self.table else {
            self.finish(env, state);
            return;
        };
        let Some(dist_sqr) = approach(
            env,
            table.bottom_center(),
            &mut self.stall,
            &mut self.repath,
            false,
        ) else {
            state.mark_complete(false, "Agent is no longer in the world");
            return;
        };
        if dist_sqr <= TABLE_REACH * TABLE_REACH {
            self.finish(env, state);
        }
    }

    fn on_cancel(&mut self, env: &mut ActionEnv<'_>) {
        env.world.stop_navigation(env.agent.id);
    }

    fn description(&self) -> String {
        format!("Craft {} {}", self.quantity, self.item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::catalog::ActionKind;
    use crate::actions::{Action, AgentInfo};
    use crate::core::types::Vec3;
    use crate::ui::ChatLog;
    use crate::world::grid::GROUND_LEVEL;
    use crate::world::{GridWorld, WorldAccess};

    #[test]
    fn test_walks_to_table_then_crafts() {
        let mut world = GridWorld::flat(16, 5);
        let table = BlockPos::new(6, GROUND_LEVEL, 0);
        world.set_block(table, "crafting_table");
        let id = world.spawn_agent("Steve", Vec3::new(0.5, GROUND_LEVEL as f64, 0.5));
        let agent = AgentInfo { id, name: "Steve".into() };
        let chat = ChatLog::new();
        let mut action = Action::new(ActionKind::Craft, CraftItem::new("Wooden Pickaxe", 1));

        for _ in 0..200 {
            {
                let mut env = ActionEnv::new(&mut world, &agent, &chat);
                action.start(&mut env);
                action.tick(&mut env);
            }
            world.step();
            if action.is_complete() {
                break;
            }
        }

        assert!(action.result().unwrap().success);
        assert_eq!(world.inventory_count(id, "wooden_pickaxe"), 1);
        assert!(world.position(id).unwrap().distance(&table.bottom_center()) <= 3.0);
    }
}
