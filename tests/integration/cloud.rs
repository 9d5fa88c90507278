//! 云变量集成测试：限速出队、远端更新写回、无提供者时的降级

use crate::common::{binary, change_by, manual_runtime, read, set_to, var};
use blockvm::io::VarUpdate;
use blockvm::{CloudProvider, EngineConfig, IoEvent, Runtime, ScriptBuilder, TargetId, Value, Variable};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

const CLOUD_NAME: &str = "☁ score";

/// Provider that records every update it is sent
#[derive(Clone, Default)]
struct Remote {
    updates: Arc<Mutex<Vec<Value>>>,
    created: Arc<Mutex<Vec<String>>>,
}

impl CloudProvider for Remote {
    fn update_variable(
        &mut self,
        _name: &str,
        value: &Value,
    ) {
        self.updates.lock().push(value.clone());
    }

    fn create_variable(
        &mut self,
        name: &str,
        _value: &Value,
    ) {
        self.created.lock().push(name.to_string());
    }

    fn rename_variable(
        &mut self,
        _old_name: &str,
        _new_name: &str,
    ) {
    }

    fn delete_variable(
        &mut self,
        _name: &str,
    ) {
    }
}

/// Stage owning one cloud variable and one plain variable
fn cloud_stage(rt: &mut Runtime) -> TargetId {
    let stage = rt.add_stage("Stage", Default::default());
    let target = rt.target_mut(stage).unwrap();
    let mut shared = Variable::scalar("c1", CLOUD_NAME);
    shared.is_cloud = true;
    target.insert_variable(shared);
    target.insert_variable(Variable::scalar("p1", "plain"));
    stage
}

#[test]
fn test_burst_is_throttled_not_dropped() {
    let (mut rt, clock) = manual_runtime(EngineConfig::default());
    let stage = cloud_stage(&mut rt);
    let remote = Remote::default();
    rt.set_cloud_provider(Box::new(remote.clone()));

    let mut b = ScriptBuilder::new();
    let atomic = b.block("control_all_at_once");
    let repeat = b.command("control_repeat", &[("TIMES", Value::Number(25.0))]);
    let bump = change_by(&mut b, CLOUD_NAME, Some("c1"), 1.0);
    b.branch(repeat, 1, &[bump]);
    b.branch(atomic, 1, &[repeat]);
    b.script("event_whenflagclicked", &[atomic]);
    rt.add_sprite("Player", b.build());

    rt.green_flag();
    rt.step();
    assert_eq!(var(&rt, stage, CLOUD_NAME), Value::Number(25.0));
    assert_eq!(remote.updates.lock().len(), 10);
    assert_eq!(rt.io.cloud.queued(), 15);

    rt.step();
    assert_eq!(remote.updates.lock().len(), 10);

    clock.advance(Duration::from_secs(1));
    rt.step();
    assert_eq!(remote.updates.lock().len(), 20);

    clock.advance(Duration::from_secs(1));
    rt.step();
    let expected: Vec<Value> = (1..=25).map(|n| Value::Number(f64::from(n))).collect();
    assert_eq!(*remote.updates.lock(), expected);
    assert_eq!(rt.io.cloud.queued(), 0);
    assert!(remote.created.lock().is_empty());
}

#[test]
fn test_remote_update_is_seen_by_scripts() {
    let mut rt = Runtime::new(EngineConfig::default());
    let stage = cloud_stage(&mut rt);

    let mut b = ScriptBuilder::new();
    let current = read(&mut b, CLOUD_NAME, Some("c1"));
    let arrived = binary(
        &mut b,
        "operator_equals",
        ("OPERAND1", current.into()),
        ("OPERAND2", 42.0.into()),
    );
    let wait = b.block("control_wait_until");
    b.reporter(wait, "CONDITION", arrived);
    let seen = set_to(&mut b, "seen", 1.0);
    b.script("event_whenflagclicked", &[wait, seen]);
    let player = rt.add_sprite("Player", b.build());

    rt.green_flag();
    rt.step();
    assert_eq!(var(&rt, player, "seen"), Value::default());

    rt.post_io_data(IoEvent::Cloud(VarUpdate {
        name: CLOUD_NAME.to_string(),
        value: Value::from("42"),
    }));
    assert_eq!(var(&rt, stage, CLOUD_NAME), Value::from("42"));

    rt.step();
    assert_eq!(var(&rt, player, "seen"), Value::Number(1.0));
}

#[test]
fn test_remote_update_ignores_plain_variables() {
    let mut rt = Runtime::new(EngineConfig::default());
    let stage = cloud_stage(&mut rt);
    rt.post_io_data(IoEvent::Cloud(VarUpdate {
        name: "plain".to_string(),
        value: Value::Number(5.0),
    }));
    assert_eq!(var(&rt, stage, "plain"), Value::Number(0.0));
}

#[test]
fn test_cloud_writes_without_provider() {
    let mut rt = Runtime::new(EngineConfig::default());
    let stage = cloud_stage(&mut rt);
    let mut b = ScriptBuilder::new();
    let bump = change_by(&mut b, CLOUD_NAME, Some("c1"), 3.0);
    b.script("event_whenflagclicked", &[bump]);
    rt.add_sprite("Player", b.build());

    rt.green_flag();
    rt.step();
    assert_eq!(var(&rt, stage, CLOUD_NAME), Value::Number(3.0));
    assert_eq!(rt.io.cloud.queued(), 0);
    assert!(rt.take_faults().is_empty());
}
