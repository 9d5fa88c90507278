//! Blocks 图结构单元测试

use crate::runtime::graph::*;
use crate::runtime::value::Value;

/// Create `keys` as a top-level chain linked through `next`
fn chain(
    blocks: &mut Blocks,
    keys: &[&str],
) -> Vec<BlockId> {
    let ids: Vec<BlockId> = keys
        .iter()
        .map(|key| blocks.create_block(Block::new(*key, "looks_show")))
        .collect();
    for pair in ids.windows(2) {
        blocks.get_mut(pair[0]).unwrap().next = Some(pair[1]);
        blocks.get_mut(pair[1]).unwrap().parent = Some(pair[0]);
    }
    blocks.get_mut(ids[0]).unwrap().top_level = true;
    ids
}

fn procedure(
    blocks: &mut Blocks,
    key: &str,
    proccode: &str,
    warp: bool,
) -> BlockId {
    let prototype_key = format!("{}_prototype", key);
    let mut prototype = Block::new(prototype_key.as_str(), Opcode::ProceduresPrototype);
    prototype.mutation = Some(Mutation {
        proccode: proccode.to_string(),
        argument_ids: vec!["arg0".to_string()],
        argument_names: vec!["n".to_string()],
        argument_defaults: vec!["1".to_string()],
        warp,
    });
    let prototype = blocks.create_block(prototype);
    let mut definition = Block::new(key, Opcode::ProceduresDefinition);
    definition
        .inputs
        .insert(CUSTOM_BLOCK_INPUT.to_string(), Input::Reporter(prototype));
    definition.top_level = true;
    let definition = blocks.create_block(definition);
    blocks.get_mut(prototype).unwrap().parent = Some(definition);
    definition
}

#[cfg(test)]
mod arena_tests {
    use super::*;

    #[test]
    fn test_create_and_lookup() {
        let mut blocks = Blocks::new();
        let id = blocks.create_block(Block::new("a", "motion_gotoxy"));
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks.id_of("a"), Some(id));
        assert_eq!(blocks.key_of(id), Some("a"));
        assert_eq!(blocks.opcode(id), Some(&Opcode::MotionGotoXY));
        assert_eq!(blocks.get(id).unwrap().id, id);
    }

    #[test]
    fn test_duplicate_key_keeps_first_block() {
        let mut blocks = Blocks::new();
        let first = blocks.create_block(Block::new("a", "looks_show"));
        let second = blocks.create_block(Block::new("a", "looks_hide"));
        assert_eq!(first, second);
        assert_eq!(blocks.opcode(first), Some(&Opcode::LooksShow));
        assert_eq!(blocks.len(), 1);
    }

    #[test]
    fn test_reserved_key_is_filled_by_create() {
        let mut blocks = Blocks::new();
        let reserved = blocks.reserve("later");
        assert!(!blocks.contains(reserved));
        assert_eq!(blocks.key_of(reserved), Some("later"));
        let created = blocks.create_block(Block::new("later", "looks_hide"));
        assert_eq!(reserved, created);
        assert!(blocks.contains(created));
    }

    #[test]
    fn test_unknown_opcode_is_kept() {
        let mut blocks = Blocks::new();
        let id = blocks.create_block(Block::new("x", "pen_clear"));
        assert_eq!(
            blocks.opcode(id),
            Some(&Opcode::Unknown("pen_clear".to_string()))
        );
        assert_eq!(blocks.opcode(id).unwrap().as_str(), "pen_clear");
    }

    #[test]
    fn test_branch_lookup() {
        let mut blocks = Blocks::new();
        let body = blocks.create_block(Block::new("body", "looks_show"));
        let mut if_else = Block::new("if", Opcode::ControlIfElse);
        if_else
            .inputs
            .insert(branch_input_name(2), Input::Branch(body));
        if_else
            .inputs
            .insert("CONDITION".to_string(), Input::Literal(Value::from(true)));
        let if_else = blocks.create_block(if_else);
        assert_eq!(blocks.branch(if_else, 1), None);
        assert_eq!(blocks.branch(if_else, 2), Some(body));
        assert_eq!(branch_input_name(1), "SUBSTACK");
        assert_eq!(branch_input_name(3), "SUBSTACK3");
    }

    #[test]
    fn test_scripts_and_top_block() {
        let mut blocks = Blocks::new();
        let ids = chain(&mut blocks, &["a", "b", "c"]);
        let other = chain(&mut blocks, &["x"]);
        assert_eq!(blocks.scripts(), vec![ids[0], other[0]]);
        assert_eq!(blocks.top_block_of(ids[2]), Some(ids[0]));
    }
}

#[cfg(test)]
mod delete_tests {
    use super::*;

    #[test]
    fn test_delete_makes_handles_stale() {
        let mut blocks = Blocks::new();
        let ids = chain(&mut blocks, &["a", "b", "c"]);
        assert!(blocks.delete_block(ids[1]));
        assert!(blocks.contains(ids[0]));
        assert!(!blocks.contains(ids[1]));
        // The rest of the chain goes with it
        assert!(!blocks.contains(ids[2]));
        assert_eq!(blocks.next(ids[0]), None);
        assert_eq!(blocks.len(), 1);
        assert!(!blocks.delete_block(ids[1]));
    }

    #[test]
    fn test_reused_slot_does_not_revive_old_handle() {
        let mut blocks = Blocks::new();
        let old = blocks.create_block(Block::new("a", "looks_show"));
        blocks.delete_block(old);
        let new = blocks.create_block(Block::new("b", "looks_hide"));
        assert_eq!(old.index(), new.index());
        assert_ne!(old, new);
        assert!(blocks.get(old).is_none());
        assert_eq!(blocks.id_of("a"), None);
    }

    #[test]
    fn test_delete_removes_input_subtrees() {
        let mut blocks = Blocks::new();
        let reporter = blocks.create_block(Block::new("r", "operator_add"));
        let mut say = Block::new("say", "looks_say");
        say.inputs
            .insert("MESSAGE".to_string(), Input::Reporter(reporter));
        let say = blocks.create_block(say);
        blocks.get_mut(reporter).unwrap().parent = Some(say);

        blocks.delete_block(reporter);
        assert!(blocks.inputs(say).unwrap().is_empty());

        blocks.delete_block(say);
        assert!(blocks.is_empty());
    }
}

#[cfg(test)]
mod move_tests {
    use super::*;

    #[test]
    fn test_move_inserts_after_parent() {
        let mut blocks = Blocks::new();
        let main = chain(&mut blocks, &["a", "b"]);
        let moved = chain(&mut blocks, &["x", "y"]);
        assert!(blocks.move_block(moved[0], Attach::Next(main[0])));
        // a → x → y → b
        assert_eq!(blocks.next(main[0]), Some(moved[0]));
        assert_eq!(blocks.next(moved[1]), Some(main[1]));
        assert_eq!(blocks.get(main[1]).unwrap().parent, Some(moved[1]));
        assert!(!blocks.get(moved[0]).unwrap().top_level);
        assert_eq!(blocks.scripts(), vec![main[0]]);
    }

    #[test]
    fn test_move_into_branch_displaces_old_body() {
        let mut blocks = Blocks::new();
        let forever = blocks.create_block(Block::new("loop", Opcode::ControlForever));
        let first = chain(&mut blocks, &["a"]);
        let second = chain(&mut blocks, &["b"]);
        let into_body = || Attach::Input {
            parent: forever,
            name: "SUBSTACK".to_string(),
            branch: true,
        };
        assert!(blocks.move_block(first[0], into_body()));
        assert_eq!(blocks.branch(forever, 1), Some(first[0]));
        assert!(blocks.move_block(second[0], into_body()));
        assert_eq!(blocks.branch(forever, 1), Some(second[0]));
        assert!(blocks.get(first[0]).unwrap().top_level);
        assert_eq!(blocks.get(first[0]).unwrap().parent, None);
    }

    #[test]
    fn test_move_refuses_cycles() {
        let mut blocks = Blocks::new();
        let ids = chain(&mut blocks, &["a", "b", "c"]);
        assert!(!blocks.move_block(ids[0], Attach::Next(ids[2])));
        assert!(!blocks.move_block(ids[0], Attach::Next(ids[0])));
        assert_eq!(blocks.next(ids[0]), Some(ids[1]));
    }

    #[test]
    fn test_move_to_top_level() {
        let mut blocks = Blocks::new();
        let ids = chain(&mut blocks, &["a", "b"]);
        assert!(blocks.move_block(ids[1], Attach::TopLevel { x: 10.0, y: 20.0 }));
        assert_eq!(blocks.next(ids[0]), None);
        let moved = blocks.get(ids[1]).unwrap();
        assert!(moved.top_level);
        assert_eq!((moved.x, moved.y), (10.0, 20.0));
    }
}

#[cfg(test)]
mod procedure_tests {
    use super::*;

    #[test]
    fn test_definition_and_params() {
        let mut blocks = Blocks::new();
        let definition = procedure(&mut blocks, "def", "jump %s", true);
        assert_eq!(blocks.procedure_definition("jump %s"), Some(definition));
        assert_eq!(blocks.procedure_definition("fly %s"), None);

        let params = blocks.procedure_params("jump %s").unwrap();
        assert_eq!(params.names, ["n".to_string()]);
        assert_eq!(params.ids, ["arg0".to_string()]);
        assert_eq!(params.defaults, ["1".to_string()]);
        assert!(params.warp);
    }

    #[test]
    fn test_cache_follows_edits() {
        let mut blocks = Blocks::new();
        let definition = procedure(&mut blocks, "def", "jump %s", false);
        assert!(blocks.procedure_definition("jump %s").is_some());
        blocks.delete_block(definition);
        assert_eq!(blocks.procedure_definition("jump %s"), None);

        let again = procedure(&mut blocks, "def2", "jump %s", false);
        assert_eq!(blocks.procedure_definition("jump %s"), Some(again));
    }
}
