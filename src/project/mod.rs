//! Project persistence
//!
//! The on-disk model keys blocks by string ids, the way an editor saves them. Loading
//! turns those ids into arena handles; exporting turns handles back into the same ids,
//! so a load/export round trip loses nothing: not the opcodes, inputs and branches,
//! fields, mutations, next/parent pointers, nor the shadow, top-level and position data.

use crate::runtime::engine::{
    EngineError, EngineResult, Runtime, TargetId, Variable, VariableValue,
};
use crate::runtime::graph::{Block, Blocks, Field, Input, Mutation, Opcode};
use crate::runtime::value::Value;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, warn};

/// A saved project: the stage and its sprites
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub targets: Vec<TargetSpec>,
}

/// A saved actor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetSpec {
    pub name: String,
    #[serde(default)]
    pub is_stage: bool,
    /// Scalar variables by id
    #[serde(default)]
    pub variables: IndexMap<String, VariableSpec>,
    /// Lists by id
    #[serde(default)]
    pub lists: IndexMap<String, ListSpec>,
    /// Blocks by id
    #[serde(default)]
    pub blocks: IndexMap<String, BlockSpec>,
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    #[serde(default = "visible_by_default")]
    pub visible: bool,
}

fn visible_by_default() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariableSpec {
    pub name: String,
    #[serde(default)]
    pub value: Value,
    #[serde(default)]
    pub is_cloud: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListSpec {
    pub name: String,
    #[serde(default)]
    pub items: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockSpec {
    pub opcode: String,
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default)]
    pub inputs: IndexMap<String, InputSpec>,
    #[serde(default)]
    pub fields: IndexMap<String, FieldSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mutation: Option<MutationSpec>,
    #[serde(default)]
    pub shadow: bool,
    #[serde(default)]
    pub top_level: bool,
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
}

/// Input slot content: `{"literal": 10}`, `{"reporter": "id"}` or `{"branch": "id"}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputSpec {
    Literal(Value),
    Reporter(String),
    Branch(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldSpec {
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MutationSpec {
    pub proccode: String,
    #[serde(default)]
    pub argument_ids: Vec<String>,
    #[serde(default)]
    pub argument_names: Vec<String>,
    #[serde(default)]
    pub argument_defaults: Vec<String>,
    #[serde(default)]
    pub warp: bool,
}

impl Project {
    pub fn from_json_str(source: &str) -> EngineResult<Self> {
        Ok(serde_json::from_str(source)?)
    }

    pub fn from_file(path: &Path) -> EngineResult<Self> {
        let source = std::fs::read_to_string(path)?;
        Self::from_json_str(&source)
    }

    pub fn to_json_pretty(&self) -> EngineResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check references between blocks and the stage count.
    ///
    /// Every problem found is listed in the error.
    pub fn validate(&self) -> EngineResult<()> {
        let mut problems = Vec::new();
        let stages = self.targets.iter().filter(|target| target.is_stage).count();
        if stages > 1 {
            problems.push(format!("{} stages, expected at most one", stages));
        }
        for target in &self.targets {
            for (key, block) in &target.blocks {
                let references = block
                    .next
                    .iter()
                    .map(|next| ("next", next))
                    .chain(block.parent.iter().map(|parent| ("parent", parent)))
                    .chain(block.inputs.values().filter_map(|input| match input {
                        InputSpec::Literal(_) => None,
                        InputSpec::Reporter(id) | InputSpec::Branch(id) => Some(("input", id)),
                    }));
                for (kind, reference) in references {
                    if !target.blocks.contains_key(reference) {
                        problems.push(format!(
                            "{}: block '{}' has dangling {} '{}'",
                            target.name, key, kind, reference
                        ));
                    }
                }
            }
        }
        if problems.is_empty() {
            Ok(())
        } else {
            Err(EngineError::Project(problems.join("; ")))
        }
    }

    /// Number of top-level scripts per actor
    pub fn script_counts(&self) -> Vec<(&str, usize)> {
        self.targets
            .iter()
            .map(|target| {
                let scripts = target
                    .blocks
                    .values()
                    .filter(|block| block.top_level)
                    .count();
                (target.name.as_str(), scripts)
            })
            .collect()
    }
}

impl TargetSpec {
    /// Build the actor's program graph.
    ///
    /// Keys are reserved up front in file order, so handles follow file order and a
    /// reference to a missing block loads as an absent reference.
    pub fn to_blocks(&self) -> Blocks {
        let mut blocks = Blocks::new();
        for key in self.blocks.keys() {
            blocks.reserve(key);
        }
        for (key, spec) in &self.blocks {
            let mut block = Block::new(key.as_str(), Opcode::parse(&spec.opcode));
            block.next = spec.next.as_deref().map(|next| blocks.reserve(next));
            block.parent = spec.parent.as_deref().map(|parent| blocks.reserve(parent));
            for (name, input) in &spec.inputs {
                let input = match input {
                    InputSpec::Literal(value) => Input::Literal(value.clone()),
                    InputSpec::Reporter(id) => Input::Reporter(blocks.reserve(id)),
                    InputSpec::Branch(id) => Input::Branch(blocks.reserve(id)),
                };
                block.inputs.insert(name.clone(), input);
            }
            for (name, field) in &spec.fields {
                block.fields.insert(
                    name.clone(),
                    Field {
                        value: field.value.clone(),
                        id: field.id.clone(),
                    },
                );
            }
            block.mutation = spec.mutation.as_ref().map(|mutation| Mutation {
                proccode: mutation.proccode.clone(),
                argument_ids: mutation.argument_ids.clone(),
                argument_names: mutation.argument_names.clone(),
                argument_defaults: mutation.argument_defaults.clone(),
                warp: mutation.warp,
            });
            block.shadow = spec.shadow;
            block.top_level = spec.top_level;
            block.x = spec.x;
            block.y = spec.y;
            blocks.create_block(block);
        }
        blocks
    }
}

/// Serialized form of a program graph
fn blocks_to_specs(blocks: &Blocks) -> IndexMap<String, BlockSpec> {
    let key = |id| blocks.key_of(id).map(str::to_owned);
    blocks
        .iter()
        .map(|block| {
            let inputs = block
                .inputs
                .iter()
                .filter_map(|(name, input)| {
                    let spec = match input {
                        Input::Literal(value) => InputSpec::Literal(value.clone()),
                        Input::Reporter(id) => InputSpec::Reporter(key(*id)?),
                        Input::Branch(id) => InputSpec::Branch(key(*id)?),
                    };
                    Some((name.clone(), spec))
                })
                .collect();
            let fields = block
                .fields
                .iter()
                .map(|(name, field)| {
                    let spec = FieldSpec {
                        value: field.value.clone(),
                        id: field.id.clone(),
                    };
                    (name.clone(), spec)
                })
                .collect();
            let spec = BlockSpec {
                opcode: block.opcode.as_str().to_string(),
                next: block.next.and_then(key),
                parent: block.parent.and_then(key),
                inputs,
                fields,
                mutation: block.mutation.as_ref().map(|mutation| MutationSpec {
                    proccode: mutation.proccode.clone(),
                    argument_ids: mutation.argument_ids.clone(),
                    argument_names: mutation.argument_names.clone(),
                    argument_defaults: mutation.argument_defaults.clone(),
                    warp: mutation.warp,
                }),
                shadow: block.shadow,
                top_level: block.top_level,
                x: block.x,
                y: block.y,
            };
            (block.key.to_string(), spec)
        })
        .collect()
}

impl Runtime {
    /// Load every actor of a project. Dangling references are logged and load as
    /// absent blocks.
    pub fn load_project(
        &mut self,
        project: &Project,
    ) -> EngineResult<Vec<TargetId>> {
        if let Err(error) = project.validate() {
            warn!("{}", error);
        }
        Ok(self.add_project_targets(project))
    }

    /// Load a project, refusing it when validation finds a problem.
    pub fn load_project_strict(
        &mut self,
        project: &Project,
    ) -> EngineResult<Vec<TargetId>> {
        project.validate()?;
        Ok(self.add_project_targets(project))
    }

    fn add_project_targets(
        &mut self,
        project: &Project,
    ) -> Vec<TargetId> {
        let mut ids = Vec::with_capacity(project.targets.len());
        for spec in &project.targets {
            let blocks = spec.to_blocks();
            let id = if spec.is_stage {
                self.add_stage(spec.name.clone(), blocks)
            } else {
                self.add_sprite(spec.name.clone(), blocks)
            };
            if let Some(target) = self.target_mut(id) {
                for (key, variable) in &spec.variables {
                    target.insert_variable(Variable {
                        id: key.clone(),
                        name: variable.name.clone(),
                        value: VariableValue::Scalar(variable.value.clone()),
                        is_cloud: variable.is_cloud,
                    });
                }
                for (key, list) in &spec.lists {
                    target.insert_variable(Variable {
                        id: key.clone(),
                        name: list.name.clone(),
                        value: VariableValue::List(list.items.clone()),
                        is_cloud: false,
                    });
                }
                target.x = spec.x;
                target.y = spec.y;
                target.visible = spec.visible;
            }
            ids.push(id);
        }
        info!(targets = ids.len(), "project loaded");
        ids
    }

    /// Export the original actors with their current variable values
    pub fn to_project(&self) -> Project {
        let targets = self
            .targets()
            .filter(|target| target.is_original)
            .map(|target| {
                let mut variables = IndexMap::new();
                let mut lists = IndexMap::new();
                for (key, variable) in &target.variables {
                    match &variable.value {
                        VariableValue::Scalar(value) => {
                            variables.insert(
                                key.clone(),
                                VariableSpec {
                                    name: variable.name.clone(),
                                    value: value.clone(),
                                    is_cloud: variable.is_cloud,
                                },
                            );
                        }
                        VariableValue::List(items) => {
                            lists.insert(
                                key.clone(),
                                ListSpec {
                                    name: variable.name.clone(),
                                    items: items.clone(),
                                },
                            );
                        }
                    }
                }
                let blocks = self
                    .blocks(target.id())
                    .map(|blocks| blocks_to_specs(&blocks))
                    .unwrap_or_default();
                TargetSpec {
                    name: target.name.clone(),
                    is_stage: target.is_stage,
                    variables,
                    lists,
                    blocks,
                    x: target.x,
                    y: target.y,
                    visible: target.visible,
                }
            })
            .collect();
        Project { targets }
    }
}

#[cfg(test)]
mod tests;
