//! Program graph
//!
//! Each sprite owns one [`Blocks`] arena mapping block handles to block nodes. Threads
//! refer to blocks by [`BlockId`] only. When a block is deleted its handle goes stale,
//! and every lookup through a stale handle reports the block as absent. The graph can be
//! edited while threads are running; they simply stop seeing deleted blocks.
//!
//! Serialized block identifiers (`key`) map to handles through a side table. A key can be
//! reserved before its block exists so forward references (a `next` pointing at a block
//! created later) resolve to the right handle.

pub mod block;
pub mod builder;
pub mod opcode;

pub use block::{Block, BlockId, Field, Input, Mutation};
pub use builder::ScriptBuilder;
pub use opcode::{HatInfo, Opcode};

use indexmap::IndexMap;
use once_cell::sync::OnceCell;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Input name of a procedure definition's prototype block
pub const CUSTOM_BLOCK_INPUT: &str = "custom_block";

/// Where [`Blocks::move_block`] should attach a block
#[derive(Debug, Clone, PartialEq)]
pub enum Attach {
    /// Detach and make it the top of a script
    TopLevel { x: f64, y: f64 },
    /// Insert right after another block
    Next(BlockId),
    /// Plug into an input slot of another block
    Input {
        parent: BlockId,
        name: String,
        branch: bool,
    },
}

/// Argument lists of a procedure prototype
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProcedureParams<'a> {
    pub ids: &'a [String],
    pub names: &'a [String],
    pub defaults: &'a [String],
    pub warp: bool,
}

#[derive(Debug, Clone, Default)]
struct Slot {
    generation: u32,
    key: Option<Arc<str>>,
    block: Option<Block>,
}

/// Arena of blocks for one sprite
#[derive(Debug, Clone, Default)]
pub struct Blocks {
    slots: Vec<Slot>,
    /// Free list for slot reuse
    free_list: Vec<u32>,
    by_key: HashMap<Arc<str>, BlockId>,
    /// proccode → definition block, rebuilt lazily after edits
    procedures: OnceCell<HashMap<String, BlockId>>,
    len: usize,
}

impl Blocks {
    /// Create an empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a block and return its handle.
    ///
    /// A block whose key is already in use is not inserted twice; the existing handle is
    /// returned instead.
    pub fn create_block(
        &mut self,
        mut block: Block,
    ) -> BlockId {
        let existing = self.by_key.get(&block.key).copied();
        let id = match existing {
            Some(id) if self.contains(id) => {
                debug!(key = %block.key, "block already exists, ignoring create");
                return id;
            }
            Some(id) => id,
            None => self.allocate(block.key.clone()),
        };

        block.id = id;
        self.slots[id.index as usize].block = Some(block);
        self.len += 1;
        self.procedures.take();
        id
    }

    /// Handle for a key, allocating an empty slot if the key is new.
    pub fn reserve(
        &mut self,
        key: &str,
    ) -> BlockId {
        if let Some(&id) = self.by_key.get(key) {
            return id;
        }
        self.allocate(Arc::from(key))
    }

    fn allocate(
        &mut self,
        key: Arc<str>,
    ) -> BlockId {
        let id = if let Some(index) = self.free_list.pop() {
            let slot = &mut self.slots[index as usize];
            slot.key = Some(key.clone());
            BlockId {
                index,
                generation: slot.generation,
            }
        } else {
            let index = self.slots.len() as u32;
            self.slots.push(Slot {
                generation: 0,
                key: Some(key.clone()),
                block: None,
            });
            BlockId {
                index,
                generation: 0,
            }
        };
        self.by_key.insert(key, id);
        id
    }

    fn slot(
        &self,
        id: BlockId,
    ) -> Option<&Slot> {
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
    }

    /// Block by handle; `None` for stale or never-filled handles
    pub fn get(
        &self,
        id: BlockId,
    ) -> Option<&Block> {
        self.slot(id).and_then(|slot| slot.block.as_ref())
    }

    /// Mutable block by handle
    pub fn get_mut(
        &mut self,
        id: BlockId,
    ) -> Option<&mut Block> {
        self.procedures.take();
        self.slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.block.as_mut())
    }

    /// Whether the handle refers to a live block
    pub fn contains(
        &self,
        id: BlockId,
    ) -> bool {
        self.get(id).is_some()
    }

    /// Handle for a serialized key (reserved keys included)
    pub fn id_of(
        &self,
        key: &str,
    ) -> Option<BlockId> {
        self.by_key.get(key).copied()
    }

    /// Serialized key of a handle (reserved keys included)
    pub fn key_of(
        &self,
        id: BlockId,
    ) -> Option<&str> {
        self.slot(id).and_then(|slot| slot.key.as_deref())
    }

    /// Block to run after `id`
    pub fn next(
        &self,
        id: BlockId,
    ) -> Option<BlockId> {
        self.get(id).and_then(|block| block.next)
    }

    pub fn opcode(
        &self,
        id: BlockId,
    ) -> Option<&Opcode> {
        self.get(id).map(|block| &block.opcode)
    }

    pub fn inputs(
        &self,
        id: BlockId,
    ) -> Option<&IndexMap<String, Input>> {
        self.get(id).map(|block| &block.inputs)
    }

    pub fn mutation(
        &self,
        id: BlockId,
    ) -> Option<&Mutation> {
        self.get(id).and_then(|block| block.mutation.as_ref())
    }

    /// First block of the `branch`-th sub-stack (1-based), if it exists.
    pub fn branch(
        &self,
        id: BlockId,
        branch: usize,
    ) -> Option<BlockId> {
        let name = branch_input_name(branch);
        self.get(id)
            .and_then(|block| block.inputs.get(name.as_str()))
            .and_then(Input::block)
            .filter(|branch_id| self.contains(*branch_id))
    }

    /// Walk parent pointers up to the top of the script
    pub fn top_block_of(
        &self,
        id: BlockId,
    ) -> Option<BlockId> {
        let mut current = self.get(id)?;
        for _ in 0..=self.len {
            match current.parent.and_then(|parent| self.get(parent)) {
                Some(parent) => current = parent,
                None => return Some(current.id),
            }
        }
        None
    }

    /// Top blocks of every script, in arena order
    pub fn scripts(&self) -> Vec<BlockId> {
        self.iter()
            .filter(|block| block.top_level)
            .map(|block| block.id)
            .collect()
    }

    /// Live blocks in arena order
    pub fn iter(&self) -> impl Iterator<Item = &Block> + '_ {
        self.slots.iter().filter_map(|slot| slot.block.as_ref())
    }

    /// Number of live blocks
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Definition hat of a procedure
    pub fn procedure_definition(
        &self,
        proccode: &str,
    ) -> Option<BlockId> {
        self.procedures
            .get_or_init(|| self.index_procedures())
            .get(proccode)
            .copied()
    }

    /// Argument lists of a procedure, read from its prototype
    pub fn procedure_params(
        &self,
        proccode: &str,
    ) -> Option<ProcedureParams<'_>> {
        let definition = self.procedure_definition(proccode)?;
        let prototype = self.prototype_of(definition)?;
        let mutation = prototype.mutation.as_ref()?;
        Some(ProcedureParams {
            ids: &mutation.argument_ids,
            names: &mutation.argument_names,
            defaults: &mutation.argument_defaults,
            warp: mutation.warp,
        })
    }

    /// Prototype block plugged into a definition hat
    pub fn prototype_of(
        &self,
        definition: BlockId,
    ) -> Option<&Block> {
        self.get(definition)?
            .inputs
            .get(CUSTOM_BLOCK_INPUT)
            .and_then(Input::block)
            .and_then(|id| self.get(id))
    }

    fn index_procedures(&self) -> HashMap<String, BlockId> {
        let mut table = HashMap::new();
        for block in self.iter() {
            if block.opcode != Opcode::ProceduresDefinition {
                continue;
            }
            if let Some(mutation) = self
                .prototype_of(block.id)
                .and_then(|prototype| prototype.mutation.as_ref())
            {
                table.entry(mutation.proccode.clone()).or_insert(block.id);
            }
        }
        table
    }

    /// Delete a block together with the blocks after it and everything plugged into it.
    ///
    /// The block is first detached from its parent. Returns `false` when the handle is
    /// already stale.
    pub fn delete_block(
        &mut self,
        id: BlockId,
    ) -> bool {
        let Some(parent) = self.get(id).map(|block| block.parent) else {
            return false;
        };
        if let Some(parent) = parent {
            self.detach_child(parent, id);
        }

        let mut pending = vec![id];
        while let Some(id) = pending.pop() {
            let Some(block) = self.free_slot(id) else {
                continue;
            };
            pending.extend(block.next);
            pending.extend(block.input_blocks());
        }
        self.procedures.take();
        true
    }

    fn free_slot(
        &mut self,
        id: BlockId,
    ) -> Option<Block> {
        let slot = self
            .slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)?;
        let block = slot.block.take()?;
        if let Some(key) = slot.key.take() {
            self.by_key.remove(&key);
        }
        slot.generation = slot.generation.wrapping_add(1);
        self.free_list.push(id.index);
        self.len -= 1;
        Some(block)
    }

    fn detach_child(
        &mut self,
        parent: BlockId,
        child: BlockId,
    ) {
        if let Some(parent) = self.get_mut(parent) {
            if parent.next == Some(child) {
                parent.next = None;
            } else {
                parent.inputs.retain(|_, input| input.block() != Some(child));
            }
        }
        if let Some(child) = self.get_mut(child) {
            child.parent = None;
        }
    }

    /// Re-attach a block (and the blocks after it) somewhere else.
    ///
    /// Refused, returning `false`, when either block is missing or the move would make a
    /// block its own ancestor.
    pub fn move_block(
        &mut self,
        id: BlockId,
        to: Attach,
    ) -> bool {
        if !self.contains(id) {
            return false;
        }
        let new_parent = match &to {
            Attach::TopLevel { .. } => None,
            Attach::Next(parent) | Attach::Input { parent, .. } => Some(*parent),
        };
        if let Some(parent) = new_parent {
            if !self.contains(parent) || self.is_ancestor_or_self(id, parent) {
                debug!(block = %id, parent = %parent, "refusing block move");
                return false;
            }
        }

        if let Some(old_parent) = self.get(id).and_then(|block| block.parent) {
            self.detach_child(old_parent, id);
        }

        match to {
            Attach::TopLevel { x, y } => {
                if let Some(block) = self.get_mut(id) {
                    block.top_level = true;
                    block.x = x;
                    block.y = y;
                }
            }
            Attach::Next(parent) => {
                let old_next = self.get(parent).and_then(|block| block.next);
                self.link(parent, id, |parent| parent.next = Some(id));
                if let Some(old_next) = old_next.filter(|next| *next != id) {
                    let last = self.last_in_chain(id);
                    self.link(last, old_next, |last| last.next = Some(old_next));
                }
            }
            Attach::Input {
                parent,
                name,
                branch,
            } => {
                let displaced = self
                    .get(parent)
                    .and_then(|block| block.inputs.get(&name))
                    .and_then(Input::block)
                    .filter(|old| *old != id);
                if let Some(old) = displaced {
                    self.detach_child(parent, old);
                    if let Some(old) = self.get_mut(old) {
                        old.top_level = true;
                    }
                }
                let input = if branch {
                    Input::Branch(id)
                } else {
                    Input::Reporter(id)
                };
                self.link(parent, id, |parent| {
                    parent.inputs.insert(name, input);
                });
            }
        }
        true
    }

    fn link(
        &mut self,
        parent: BlockId,
        child: BlockId,
        attach: impl FnOnce(&mut Block),
    ) {
        if let Some(parent) = self.get_mut(parent) {
            attach(parent);
        }
        if let Some(child) = self.get_mut(child) {
            child.parent = Some(parent);
            child.top_level = false;
        }
    }

    fn last_in_chain(
        &self,
        id: BlockId,
    ) -> BlockId {
        let mut last = id;
        for _ in 0..self.len {
            match self.next(last) {
                Some(next) => last = next,
                None => break,
            }
        }
        last
    }

    /// Whether `ancestor` is `id` or appears on `id`'s parent chain
    fn is_ancestor_or_self(
        &self,
        ancestor: BlockId,
        id: BlockId,
    ) -> bool {
        let mut current = Some(id);
        for _ in 0..=self.len {
            match current {
                Some(block) if block == ancestor => return true,
                Some(block) => current = self.get(block).and_then(|b| b.parent),
                None => return false,
            }
        }
        false
    }
}

/// Input name of the `branch`-th sub-stack: `SUBSTACK`, `SUBSTACK2`, ...
pub fn branch_input_name(branch: usize) -> String {
    if branch <= 1 {
        "SUBSTACK".to_string()
    } else {
        format!("SUBSTACK{}", branch)
    }
}

#[cfg(test)]
mod tests;
