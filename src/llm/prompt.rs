//! Prompt construction for the planner

use crate::llm::context::PromptContext;

const SYSTEM_PROMPT: &str = r#"You are an AI agent living in a voxel world. Respond ONLY with valid JSON, no extra text.

FORMAT (strict JSON):
{"reasoning": "brief thought", "plan": "action description", "tasks": [{"action": "type", "parameters": {...}}]}

ACTIONS:
- attack: {"target": "hostile"} (for any mob/monster, or a type such as "zombie")
- build: {"blocks": [{"x": 0, "y": 0, "z": 0, "name": "minecraft:stone"}, ...]} or {"structure": "house"} (house, tower, wall, platform)
- mine: {"block": "oak_log", "quantity": 8} (use specific block names: oak_log, stone, iron_ore, ...)
- gather: {"resource": "wood", "quantity": 16}
- craft: {"item": "crafting_table", "quantity": 1}
- place: {"block": "torch", "x": 0, "y": 64, "z": 0}
- follow: {"player": "NAME"}
- interact: {"target": "cow", "type": "feed"} (feed, milk, shear, open)
- pathfind: {"x": 0, "y": 64, "z": 0}

GROUP COMMANDS ("everyone", "all", "we"):
A group command applies to YOU. Never answer that you cannot control others; execute the command yourself.

STOPPING:
If the user says "stop", return an empty "tasks" array: []

BUILDING RULES:
1. When asked to build anything, either name a structure or give a non-empty "blocks" array.
2. Never return "blocks": [] (an empty blueprint fails).
3. Coordinates are relative to the build site (0,0,0 is the first corner).
4. Use the minecraft: prefix for block names.
5. Keep builds small (at most 50 blocks) unless asked for more.

EXAMPLE:
Input: "build a small stone pillar"
Output:
{"reasoning": "A 1x1 pillar three blocks high", "plan": "Build stone pillar", "tasks": [{"action": "build", "parameters": {"blocks": [{"x":0,"y":0,"z":0,"name":"minecraft:stone"},{"x":0,"y":1,"z":0,"name":"minecraft:stone"},{"x":0,"y":2,"z":0,"name":"minecraft:stone"}]}}]}

Output ONLY valid JSON. No markdown, no code blocks, no explanations."#;

/// Fixed instruction text sent with every request
pub fn system_prompt() -> &'static str {
    SYSTEM_PROMPT
}

/// Per-call prompt: the agent's situation followed by the command in quotes
pub fn user_prompt(context: &PromptContext, command: &str) -> String {
    let pos = context.position;
    format!(
        "=== YOUR SITUATION ===\n\
         Name: {}\n\
         Position: [{}, {}, {}]\n\
         Nearby Players: {}\n\
         Nearby Entities: {}\n\
         Nearby Blocks: {}\n\
         \n=== PLAYER COMMAND ===\n\
         \"{}\"\n\
         \n=== YOUR RESPONSE (with reasoning) ===\n",
        context.agent_name,
        pos.x,
        pos.y,
        pos.z,
        context.players_summary(),
        context.entities_summary(),
        context.blocks_summary(),
        command.trim()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::catalog::ActionKind;
    use crate::core::types::BlockPos;

    #[test]
    fn test_system_prompt_lists_every_action() {
        for kind in ActionKind::ALL {
            if kind == ActionKind::Blueprint {
                continue;
            }
            assert!(
                system_prompt().contains(&format!("- {}:", kind.tag())),
                "missing {}",
                kind
            );
        }
    }

    #[test]
    fn test_user_prompt_embeds_context_and_command() {
        let context = PromptContext {
            agent_name: "Steve".into(),
            position: BlockPos::new(4, 64, -2),
            nearby_players: vec!["Alex".into()],
            ..PromptContext::default()
        };
        let prompt = user_prompt(&context, "  mine some iron ");
        assert!(prompt.contains("Name: Steve"));
        assert!(prompt.contains("Position: [4, 64, -2]"));
        assert!(prompt.contains("Nearby Players: Alex"));
        assert!(prompt.contains("Nearby Entities: none"));
        assert!(prompt.contains("\"mine some iron\""));
    }
}
