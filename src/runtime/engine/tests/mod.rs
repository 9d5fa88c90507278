//! Runtime 单元测试
//!
//! 测试角色与变量、克隆、帽子事件分发和停止语义

use crate::io::{IoEvent, KeyEvent};
use crate::runtime::engine::*;
use crate::runtime::graph::{BlockId, Opcode, ScriptBuilder};
use crate::runtime::value::Value;
use crate::util::config::EngineConfig;
use crate::util::timer::{ManualClock, SharedClock};
use std::time::Duration;

fn runtime() -> Runtime {
    Runtime::new(EngineConfig::default())
}

/// Sprite with a single hat script whose body loops forever
fn looping_sprite(
    rt: &mut Runtime,
    name: &str,
    hat: Opcode,
    field: Option<(&str, &str)>,
) -> (TargetId, BlockId) {
    let mut builder = ScriptBuilder::new();
    let forever = builder.block("control_forever");
    let step = builder.command("motion_changexby", &[("DX", Value::Number(1.0))]);
    builder.branch(forever, 1, &[step]);
    let top = match field {
        Some(field) => builder.script_with_field(hat, field, &[forever]),
        None => builder.script(hat, &[forever]),
    };
    (rt.add_sprite(name, builder.build()), top)
}

#[cfg(test)]
mod actor_tests {
    use super::*;

    #[test]
    fn test_add_targets() {
        let mut rt = runtime();
        let stage = rt.add_stage("Stage", Default::default());
        let cat = rt.add_sprite("Cat", Default::default());

        assert_eq!(rt.stage_id(), Some(stage));
        assert!(rt.stage().unwrap().is_stage);
        assert_eq!(rt.target_by_name("Cat").map(Target::id), Some(cat));
        assert!(rt.target_by_name("Dog").is_none());
        assert_eq!(rt.targets().count(), 2);
        assert_ne!(rt.target(cat).unwrap().sprite, rt.target(stage).unwrap().sprite);
    }

    #[test]
    fn test_blocks_mut_is_seen_by_next_lookup() {
        let mut rt = runtime();
        let cat = rt.add_sprite("Cat", Default::default());
        let before = rt.blocks(cat).unwrap();

        let mut builder = ScriptBuilder::from_blocks(std::mem::take(rt.blocks_mut(cat).unwrap()));
        builder.script("event_whenflagclicked", &[]);
        *rt.blocks_mut(cat).unwrap() = builder.build();

        assert!(before.is_empty());
        assert_eq!(rt.blocks(cat).unwrap().scripts().len(), 1);
    }
}

#[cfg(test)]
mod variable_tests {
    use super::*;

    fn setup() -> (Runtime, TargetId) {
        let mut rt = runtime();
        let stage = rt.add_stage("Stage", Default::default());
        let cat = rt.add_sprite("Cat", Default::default());
        let stage_target = rt.target_mut(stage).unwrap();
        stage_target.insert_variable(Variable::scalar("g1", "score"));
        stage_target.insert_variable(Variable::scalar("g2", "shared"));
        rt.target_mut(cat)
            .unwrap()
            .insert_variable(Variable::scalar("l1", "score"));
        (rt, cat)
    }

    #[test]
    fn test_id_beats_name() {
        let (mut rt, cat) = setup();
        let variable = rt
            .lookup_or_create_variable(cat, Some("g1"), "score", VariableKind::Scalar)
            .unwrap();
        assert_eq!(variable.id, "g1");
    }

    #[test]
    fn test_local_name_shadows_stage() {
        let (mut rt, cat) = setup();
        let variable = rt
            .lookup_or_create_variable(cat, Some("stale"), "score", VariableKind::Scalar)
            .unwrap();
        assert_eq!(variable.id, "l1");
    }

    #[test]
    fn test_stage_fallback_by_name() {
        let (mut rt, cat) = setup();
        let variable = rt
            .lookup_or_create_variable(cat, None, "shared", VariableKind::Scalar)
            .unwrap();
        assert_eq!(variable.id, "g2");
    }

    #[test]
    fn test_missing_variable_created_on_target() {
        let (mut rt, cat) = setup();
        let variable = rt
            .lookup_or_create_variable(cat, Some("new"), "fresh", VariableKind::List)
            .unwrap();
        assert_eq!(variable.kind(), VariableKind::List);
        assert!(rt.target(cat).unwrap().variables.contains_key("new"));
        assert!(rt
            .lookup_or_create_variable(TargetId(99), None, "x", VariableKind::Scalar)
            .is_none());
    }

    #[test]
    fn test_kind_must_match() {
        let (mut rt, cat) = setup();
        let list = rt
            .lookup_or_create_variable(cat, Some("g1"), "score", VariableKind::List)
            .unwrap();
        assert_eq!(list.kind(), VariableKind::List);
        assert_eq!(list.id, "g1");
        // the scalar with that id on the stage is left alone
        let stage = rt.stage().unwrap();
        assert_eq!(stage.variables["g1"].kind(), VariableKind::Scalar);
    }

    #[test]
    fn test_join_list() {
        let letters = vec![Value::from("a"), Value::from("b"), Value::from(1.0)];
        assert_eq!(join_list(&letters), "ab1");
        let words = vec![Value::from("hello"), Value::from("world")];
        assert_eq!(join_list(&words), "hello world");
    }
}

#[cfg(test)]
mod clone_tests {
    use super::*;

    #[test]
    fn test_clone_copies_state_and_starts_clone_hats() {
        let mut rt = runtime();
        let (cat, _) = looping_sprite(&mut rt, "Cat", Opcode::ControlStartAsClone, None);
        {
            let target = rt.target_mut(cat).unwrap();
            target.set_xy(12.0, 34.0);
            target.insert_variable(Variable::scalar("v", "lives"));
        }

        let clone = rt.create_clone(cat).unwrap();
        let copy = rt.target(clone).unwrap();
        assert!(!copy.is_original);
        assert_eq!((copy.x, copy.y), (12.0, 34.0));
        assert!(copy.variables.contains_key("v"));
        assert_eq!(copy.sprite, rt.target(cat).unwrap().sprite);
        assert_eq!(rt.clone_count(), 1);

        // only the clone runs its start-as-clone script
        assert_eq!(rt.threads().len(), 1);
        assert_eq!(rt.threads()[0].target, clone);
        assert_eq!(rt.sprite(copy.sprite).unwrap().clones, vec![clone]);
    }

    #[test]
    fn test_clone_cap_and_stage() {
        let config = EngineConfig {
            max_clones: 2,
            ..EngineConfig::default()
        };
        let mut rt = Runtime::new(config);
        let stage = rt.add_stage("Stage", Default::default());
        let cat = rt.add_sprite("Cat", Default::default());

        assert!(rt.create_clone(stage).is_none());
        assert!(rt.create_clone(cat).is_some());
        assert!(rt.create_clone(cat).is_some());
        assert!(rt.create_clone(cat).is_none());
        assert_eq!(rt.clone_count(), 2);
    }

    #[test]
    fn test_delete_clone_stops_its_threads() {
        let mut rt = runtime();
        let (cat, _) = looping_sprite(&mut rt, "Cat", Opcode::ControlStartAsClone, None);
        let clone = rt.create_clone(cat).unwrap();
        rt.step();
        assert_eq!(rt.threads().len(), 1);

        assert!(!rt.delete_clone(cat));
        assert!(rt.delete_clone(clone));
        assert!(rt.target(clone).is_none());
        assert!(rt.threads().is_empty());
        assert_eq!(rt.clone_count(), 0);
        assert!(!rt.delete_clone(clone));
    }
}

#[cfg(test)]
mod hat_tests {
    use super::*;

    #[test]
    fn test_broadcast_matches_case_insensitively() {
        let mut rt = runtime();
        let field = Some(("BROADCAST_OPTION", "Go"));
        let (cat, _) = looping_sprite(&mut rt, "Cat", Opcode::EventWhenBroadcastReceived, field);
        let field = Some(("BROADCAST_OPTION", "stop"));
        looping_sprite(&mut rt, "Dog", Opcode::EventWhenBroadcastReceived, field);

        let started = rt.broadcast("GO");
        assert_eq!(started.len(), 1);
        assert_eq!(rt.thread(started[0]).unwrap().target, cat);
    }

    #[test]
    fn test_broadcast_restarts_running_script() {
        let mut rt = runtime();
        let field = Some(("BROADCAST_OPTION", "go"));
        let (cat, _) = looping_sprite(&mut rt, "Cat", Opcode::EventWhenBroadcastReceived, field);

        let first = rt.broadcast("go");
        rt.step();
        rt.step();
        assert_eq!(rt.target(cat).unwrap().x, 2.0);

        let again = rt.broadcast("go");
        assert_eq!(again, first);
        assert_eq!(rt.threads().len(), 1);
        assert_eq!(rt.threads()[0].stack_len(), 1);
    }

    #[test]
    fn test_key_hat_leaves_running_script_alone() {
        let mut rt = runtime();
        let field = Some(("KEY_OPTION", "space"));
        looping_sprite(&mut rt, "Cat", Opcode::EventWhenKeyPressed, field);

        let hat = Opcode::EventWhenKeyPressed;
        let fields = vec![("KEY_OPTION".to_string(), "space".to_string())];
        assert_eq!(rt.start_hats(&hat, &fields, None).len(), 1);
        assert!(rt.start_hats(&hat, &fields, None).is_empty());
        assert_eq!(rt.threads().len(), 1);
    }

    #[test]
    fn test_non_hat_opcode_starts_nothing() {
        let mut rt = runtime();
        looping_sprite(&mut rt, "Cat", Opcode::EventWhenFlagClicked, None);
        assert!(rt.start_hats(&Opcode::LooksShow, &[], None).is_empty());
    }

    #[test]
    fn test_click_targets_one_actor() {
        let mut rt = runtime();
        let (cat, _) = looping_sprite(&mut rt, "Cat", Opcode::EventWhenThisSpriteClicked, None);
        looping_sprite(&mut rt, "Dog", Opcode::EventWhenThisSpriteClicked, None);

        let started = rt.click_target(cat);
        assert_eq!(started.len(), 1);
        assert_eq!(rt.thread(started[0]).unwrap().target, cat);
    }

    #[test]
    fn test_key_press_dispatched_after_pass() {
        let mut rt = runtime();
        let field = Some(("KEY_OPTION", "a"));
        looping_sprite(&mut rt, "Cat", Opcode::EventWhenKeyPressed, field);
        let field = Some(("KEY_OPTION", "any"));
        looping_sprite(&mut rt, "Dog", Opcode::EventWhenKeyPressed, field);

        rt.post_io_data(IoEvent::Keyboard(KeyEvent::down("a")));
        assert_eq!(rt.queued_events().len(), 2);
        assert!(rt.threads().is_empty());

        rt.step();
        assert!(rt.queued_events().is_empty());
        assert_eq!(rt.threads().len(), 2);
        assert!(rt.io.keyboard.key_is_down(&Value::from("A")));
    }

    #[test]
    fn test_queued_event_for_target() {
        let mut rt = runtime();
        let (cat, _) = looping_sprite(&mut rt, "Cat", Opcode::EventWhenThisSpriteClicked, None);
        let (dog, _) = looping_sprite(&mut rt, "Dog", Opcode::EventWhenThisSpriteClicked, None);

        rt.queue_event(Event::clicked(dog));
        rt.step();
        assert_eq!(rt.threads().len(), 1);
        assert_eq!(rt.threads()[0].target, dog);
        assert_ne!(rt.threads()[0].target, cat);
    }
}

#[cfg(test)]
mod lifecycle_tests {
    use super::*;

    #[test]
    fn test_green_flag_restarts_and_resets_timer() {
        let clock = ManualClock::shared();
        let shared: SharedClock = clock.clone();
        let mut rt = Runtime::with_clock(EngineConfig::default(), shared);
        let (cat, _) = looping_sprite(&mut rt, "Cat", Opcode::EventWhenFlagClicked, None);

        let first = rt.green_flag();
        assert_eq!(first.len(), 1);
        rt.step();
        clock.advance(Duration::from_secs(3));
        assert_eq!(rt.io.clock.project_timer(), 3.0);

        let second = rt.green_flag();
        assert_eq!(second.len(), 1);
        assert_ne!(second, first);
        assert_eq!(rt.io.clock.project_timer(), 0.0);
        assert_eq!(rt.target(cat).unwrap().x, 1.0);
    }

    #[test]
    fn test_stop_all_clears_everything() {
        let mut rt = runtime();
        let (cat, _) = looping_sprite(&mut rt, "Cat", Opcode::EventWhenFlagClicked, None);
        rt.green_flag();
        rt.create_clone(cat).unwrap();
        rt.queue_event(Event::broadcast("later"));
        let _answer = rt.ask("name?");
        rt.target_mut(cat).unwrap().say = Some("hi".to_string());

        rt.stop_all();
        assert!(rt.threads().is_empty());
        assert_eq!(rt.clone_count(), 0);
        assert!(rt.queued_events().is_empty());
        assert!(rt.pending_question().is_none());
        assert!(rt.target(cat).unwrap().say.is_none());
    }

    #[test]
    fn test_toggle_script() {
        let mut rt = runtime();
        let (cat, top) = looping_sprite(&mut rt, "Cat", Opcode::EventWhenFlagClicked, None);

        let started = rt.toggle_script(cat, top).unwrap();
        assert!(rt.thread(started).unwrap().stack_click);
        assert!(rt.toggle_script(cat, top).is_none());
        assert!(rt.threads().is_empty());
    }

    #[test]
    fn test_stop_for_target_keeps_one() {
        let mut rt = runtime();
        let (cat, top) = looping_sprite(&mut rt, "Cat", Opcode::EventWhenFlagClicked, None);
        let a = rt.push_thread(cat, top);
        let b = rt.push_thread(cat, top);

        rt.stop_for_target(cat, Some(b));
        assert!(!rt.is_active_thread(a));
        assert!(rt.is_active_thread(b));
        assert_eq!(rt.threads().len(), 1);
    }

    #[test]
    fn test_ask_and_answer() {
        let mut rt = runtime();
        assert!(!rt.answer_question("nobody asked"));

        let first = rt.ask("first?");
        let _second = rt.ask("second?");
        assert_eq!(rt.pending_question(), Some("first?"));
        assert!(rt.answer_question("yes"));
        assert_eq!(rt.answer(), "yes");
        assert_eq!(
            first.poll(),
            crate::runtime::deferred::DeferredState::Resolved(Value::from("yes"))
        );
        assert_eq!(rt.pending_question(), Some("second?"));
    }

    #[test]
    fn test_turbo_mode_toggle() {
        let mut rt = runtime();
        assert!(!rt.config().turbo_mode);
        rt.set_turbo_mode(true);
        assert!(rt.config().turbo_mode);
    }
}
