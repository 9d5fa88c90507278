//! 项目加载/导出测试

use crate::project::*;
use crate::runtime::engine::{EngineError, Runtime, VariableKind};
use crate::runtime::graph::{Input, Opcode};
use crate::runtime::value::Value;
use crate::util::config::EngineConfig;

const PROJECT: &str = r#"{
  "targets": [
    {
      "name": "Stage",
      "isStage": true,
      "variables": { "v1": { "name": "score", "value": 0 } },
      "lists": { "l1": { "name": "log", "items": ["a", 2] } }
    },
    {
      "name": "Cat",
      "x": 10,
      "y": -5,
      "variables": { "v2": { "name": "speed", "value": "fast" } },
      "blocks": {
        "flag": {
          "opcode": "event_whenflagclicked",
          "next": "set",
          "topLevel": true,
          "x": 40,
          "y": 60
        },
        "set": {
          "opcode": "data_setvariableto",
          "parent": "flag",
          "next": "change",
          "inputs": { "VALUE": { "literal": 5 } },
          "fields": { "VARIABLE": { "value": "score", "id": "v1" } }
        },
        "change": {
          "opcode": "data_changevariableby",
          "parent": "set",
          "inputs": { "VALUE": { "reporter": "sum" } },
          "fields": { "VARIABLE": { "value": "score", "id": "v1" } }
        },
        "sum": {
          "opcode": "operator_add",
          "parent": "change",
          "inputs": { "NUM1": { "literal": 1 }, "NUM2": { "literal": "2" } }
        },
        "ext": {
          "opcode": "pen_clear",
          "topLevel": true
        }
      }
    }
  ]
}"#;

fn runtime() -> Runtime {
    Runtime::new(EngineConfig::default())
}

#[cfg(test)]
mod parse_tests {
    use super::*;

    #[test]
    fn test_parse_camel_case_model() {
        let project = Project::from_json_str(PROJECT).unwrap();
        assert_eq!(project.targets.len(), 2);

        let stage = &project.targets[0];
        assert!(stage.is_stage);
        assert!(stage.visible);
        assert_eq!(stage.lists["l1"].items, vec![Value::from("a"), Value::from(2.0)]);

        let cat = &project.targets[1];
        assert_eq!(cat.x, 10.0);
        assert!(cat.blocks["flag"].top_level);
        assert_eq!(
            cat.blocks["set"].inputs["VALUE"],
            InputSpec::Literal(Value::Number(5.0))
        );
        assert_eq!(
            cat.blocks["change"].inputs["VALUE"],
            InputSpec::Reporter("sum".to_string())
        );
        assert_eq!(cat.blocks["set"].fields["VARIABLE"].id.as_deref(), Some("v1"));
    }

    #[test]
    fn test_bad_json_is_a_parse_error() {
        let err = Project::from_json_str("{ \"targets\": 3 }").unwrap_err();
        assert!(matches!(err, EngineError::Parse(_)));
    }

    #[test]
    fn test_script_counts() {
        let project = Project::from_json_str(PROJECT).unwrap();
        assert_eq!(project.script_counts(), vec![("Stage", 0), ("Cat", 2)]);
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("project.json");
        std::fs::write(&path, PROJECT).unwrap();
        let project = Project::from_file(&path).unwrap();
        assert_eq!(project.targets[1].name, "Cat");

        let missing = Project::from_file(&dir.path().join("nope.json")).unwrap_err();
        assert!(matches!(missing, EngineError::Io(_)));
    }
}

#[cfg(test)]
mod validate_tests {
    use super::*;

    #[test]
    fn test_valid_project() {
        let project = Project::from_json_str(PROJECT).unwrap();
        assert!(project.validate().is_ok());
    }

    #[test]
    fn test_dangling_reference_reported() {
        let mut project = Project::from_json_str(PROJECT).unwrap();
        project.targets[1]
            .blocks
            .get_mut("change")
            .unwrap()
            .next = Some("ghost".to_string());

        match project.validate() {
            Err(EngineError::Project(message)) => {
                assert!(message.contains("ghost"), "{}", message);
                assert!(message.contains("change"), "{}", message);
            }
            other => panic!("expected project error, got {:?}", other),
        }
    }

    #[test]
    fn test_two_stages_rejected() {
        let mut project = Project::from_json_str(PROJECT).unwrap();
        project.targets[1].is_stage = true;
        assert!(project.validate().is_err());
    }
}

#[cfg(test)]
mod load_tests {
    use super::*;

    #[test]
    fn test_load_builds_targets_and_graph() {
        let project = Project::from_json_str(PROJECT).unwrap();
        let mut rt = runtime();
        let ids = rt.load_project(&project).unwrap();
        assert_eq!(ids.len(), 2);
        assert_eq!(rt.stage_id(), Some(ids[0]));

        let cat = rt.target(ids[1]).unwrap();
        assert_eq!((cat.x, cat.y), (10.0, -5.0));
        assert_eq!(
            cat.variable_by_name("speed", VariableKind::Scalar)
                .map(|variable| variable.get()),
            Some(Value::from("fast"))
        );

        let blocks = rt.blocks(ids[1]).unwrap();
        let set = blocks.id_of("set").unwrap();
        let change = blocks.id_of("change").unwrap();
        assert_eq!(blocks.next(set), Some(change));
        assert!(matches!(
            blocks.get(change).unwrap().inputs["VALUE"],
            Input::Reporter(_)
        ));
        assert_eq!(
            blocks.opcode(blocks.id_of("ext").unwrap()),
            Some(&Opcode::Unknown("pen_clear".to_string()))
        );
    }

    #[test]
    fn test_loaded_project_runs() {
        let project = Project::from_json_str(PROJECT).unwrap();
        let mut rt = runtime();
        let ids = rt.load_project(&project).unwrap();

        rt.green_flag();
        rt.step();

        let score = rt
            .stage()
            .and_then(|stage| stage.variable_by_name("score", VariableKind::Scalar))
            .map(|variable| variable.get());
        assert_eq!(score, Some(Value::Number(8.0)));
        assert!(rt.target(ids[1]).is_some());
        assert!(rt.take_faults().is_empty());
    }

    #[test]
    fn test_strict_load_refuses_dangling_reference() {
        let mut project = Project::from_json_str(PROJECT).unwrap();
        project.targets[1]
            .blocks
            .get_mut("sum")
            .unwrap()
            .inputs
            .insert("NUM1".to_string(), InputSpec::Reporter("gone".to_string()));

        let mut rt = runtime();
        assert!(rt.load_project_strict(&project).is_err());
        assert_eq!(rt.targets().count(), 0);

        // lenient loading keeps going and the missing reporter reads as empty
        let ids = rt.load_project(&project).unwrap();
        let blocks = rt.blocks(ids[1]).unwrap();
        let gone = blocks.id_of("gone").unwrap();
        assert!(!blocks.contains(gone));
    }
}

#[cfg(test)]
mod export_tests {
    use super::*;

    #[test]
    fn test_round_trip_preserves_project() {
        let project = Project::from_json_str(PROJECT).unwrap();
        let mut rt = runtime();
        rt.load_project(&project).unwrap();

        let exported = rt.to_project();
        assert_eq!(exported, project);

        let json = exported.to_json_pretty().unwrap();
        assert!(json.contains("\"isStage\": true"));
        assert!(json.contains("\"topLevel\": true"));
        assert_eq!(Project::from_json_str(&json).unwrap(), project);
    }

    #[test]
    fn test_export_reflects_runtime_state_and_skips_clones() {
        let project = Project::from_json_str(PROJECT).unwrap();
        let mut rt = runtime();
        let ids = rt.load_project(&project).unwrap();
        rt.green_flag();
        rt.step();
        rt.create_clone(ids[1]).unwrap();

        let exported = rt.to_project();
        assert_eq!(exported.targets.len(), 2);
        assert_eq!(exported.targets[0].variables["v1"].value, Value::Number(8.0));
    }

    #[test]
    fn test_dangling_reference_survives_round_trip() {
        let mut project = Project::from_json_str(PROJECT).unwrap();
        project.targets[1]
            .blocks
            .get_mut("change")
            .unwrap()
            .next = Some("ghost".to_string());

        let mut rt = runtime();
        rt.load_project(&project).unwrap();
        let exported = rt.to_project();
        assert_eq!(
            exported.targets[1].blocks["change"].next.as_deref(),
            Some("ghost")
        );
        assert!(!exported.targets[1].blocks.contains_key("ghost"));
    }
}
