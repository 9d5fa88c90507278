//! Runtime
//!
//! The [`Runtime`] is the explicit engine context: it owns the actors, the thread list,
//! the event queue, the IO devices and the sequencer, and the host drives it by calling
//! [`Runtime::step`] once per frame. Nothing here is global; a host may run several
//! runtimes side by side.

pub mod error;
pub mod events;
pub mod faults;
pub mod target;

pub use error::{EngineError, EngineResult};
pub use events::{Event, EventQueue};
pub use faults::{FaultLog, ThreadFault};
pub use target::{
    join_list, Sprite, SpriteId, Target, TargetId, Variable, VariableKind, VariableValue,
};

use crate::io::{CloudProvider, IoContext, IoDevices, IoEvent};
use crate::primitives::{Args, Flow, PrimitiveError};
use crate::runtime::deferred::{deferred, Deferred, Resolver};
use crate::runtime::graph::{BlockId, Blocks, Opcode};
use crate::runtime::scheduler::{BlockUtility, Sequencer, SequencerStats};
use crate::runtime::thread::{Thread, ThreadId};
use crate::runtime::value::Value;
use crate::util::config::EngineConfig;
use crate::util::timer::{SharedClock, SystemClock};
use indexmap::IndexMap;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Host primitive for an opcode the engine does not know.
///
/// Handlers may report a value, park the thread on a [`Deferred`], or fail; a panic
/// inside a handler is caught and treated as a failure.
pub type ExtensionHandler =
    Arc<dyn Fn(&mut BlockUtility<'_>, &Args<'_>) -> Result<Flow, PrimitiveError> + Send + Sync>;

/// A prompt from `ask and wait`
struct Question {
    text: String,
    resolver: Resolver,
}

/// The thread the sequencer is running right now, and what the runtime asked of it.
///
/// That thread is out of the thread list while it runs, so requests aimed at it are
/// parked here and applied once its block finishes.
#[derive(Debug, Clone, Copy)]
pub(crate) struct CurrentThread {
    pub id: ThreadId,
    pub target: TargetId,
    pub top_block: Option<BlockId>,
    pub restart: bool,
    pub retire: bool,
}

/// The engine context
pub struct Runtime {
    config: EngineConfig,
    clock: SharedClock,
    sprites: IndexMap<SpriteId, Sprite>,
    targets: IndexMap<TargetId, Target>,
    stage: Option<TargetId>,
    pub(crate) threads: Vec<Thread>,
    /// Threads started during a pass, appended when it ends
    pub(crate) spawned: Vec<Thread>,
    sequencer: Option<Sequencer>,
    events: EventQueue,
    pub io: IoDevices,
    extensions: HashMap<String, ExtensionHandler>,
    faults: FaultLog,
    questions: VecDeque<Question>,
    answer: String,
    reports: Vec<(ThreadId, Value)>,
    pub(crate) redraw_requested: bool,
    pub(crate) in_pass: bool,
    pub(crate) current: Option<CurrentThread>,
    next_thread_id: u64,
    next_target_id: u32,
    next_sprite_id: u32,
    clone_count: usize,
}

impl Runtime {
    /// Create a runtime on the wall clock
    pub fn new(config: EngineConfig) -> Self {
        Self::with_clock(config, SystemClock::shared())
    }

    /// Create a runtime reading time from `clock`
    pub fn with_clock(
        config: EngineConfig,
        clock: SharedClock,
    ) -> Self {
        let io = IoDevices::new(&config, clock.clone());
        let sequencer = Sequencer::new(&config, clock.clone());
        Self {
            config,
            clock,
            sprites: IndexMap::new(),
            targets: IndexMap::new(),
            stage: None,
            threads: Vec::new(),
            spawned: Vec::new(),
            sequencer: Some(sequencer),
            events: EventQueue::new(),
            io,
            extensions: HashMap::new(),
            faults: FaultLog::new(),
            questions: VecDeque::new(),
            answer: String::new(),
            reports: Vec::new(),
            redraw_requested: false,
            in_pass: false,
            current: None,
            next_thread_id: 1,
            next_target_id: 0,
            next_sprite_id: 0,
            clone_count: 0,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn clock(&self) -> &SharedClock {
        &self.clock
    }

    pub fn set_turbo_mode(
        &mut self,
        turbo: bool,
    ) {
        self.config.turbo_mode = turbo;
    }

    // ---- actors ----

    /// Add the stage. A second stage replaces the first as the variable fallback.
    pub fn add_stage(
        &mut self,
        name: impl Into<String>,
        blocks: Blocks,
    ) -> TargetId {
        let id = self.add_target(name.into(), blocks, true);
        if let Some(old) = self.stage.replace(id) {
            warn!(old = %old, new = %id, "replacing stage");
        }
        id
    }

    /// Add an original sprite with its program graph
    pub fn add_sprite(
        &mut self,
        name: impl Into<String>,
        blocks: Blocks,
    ) -> TargetId {
        self.add_target(name.into(), blocks, false)
    }

    fn add_target(
        &mut self,
        name: String,
        blocks: Blocks,
        is_stage: bool,
    ) -> TargetId {
        let id = self.allocate_target_id();
        let sprite = SpriteId(self.next_sprite_id);
        self.next_sprite_id += 1;
        self.sprites.insert(
            sprite,
            Sprite {
                name: name.clone(),
                blocks: Arc::new(blocks),
                original: id,
                clones: Vec::new(),
            },
        );
        self.targets
            .insert(id, Target::new(id, sprite, name, is_stage));
        debug!(target = %id, "added target");
        id
    }

    fn allocate_target_id(&mut self) -> TargetId {
        let id = TargetId(self.next_target_id);
        self.next_target_id += 1;
        id
    }

    pub fn target(
        &self,
        id: TargetId,
    ) -> Option<&Target> {
        self.targets.get(&id)
    }

    pub fn target_mut(
        &mut self,
        id: TargetId,
    ) -> Option<&mut Target> {
        self.targets.get_mut(&id)
    }

    /// Every actor, originals and clones, in creation order
    pub fn targets(&self) -> impl Iterator<Item = &Target> + '_ {
        self.targets.values()
    }

    /// Original actor with this name
    pub fn target_by_name(
        &self,
        name: &str,
    ) -> Option<&Target> {
        self.targets
            .values()
            .find(|target| target.is_original && target.name == name)
    }

    pub fn stage(&self) -> Option<&Target> {
        self.stage.and_then(|id| self.targets.get(&id))
    }

    pub fn stage_id(&self) -> Option<TargetId> {
        self.stage
    }

    pub fn sprite(
        &self,
        id: SpriteId,
    ) -> Option<&Sprite> {
        self.sprites.get(&id)
    }

    /// Program graph of an actor (shared with its clones)
    pub fn blocks(
        &self,
        target: TargetId,
    ) -> Option<Arc<Blocks>> {
        let sprite = self.targets.get(&target)?.sprite;
        self.sprites.get(&sprite).map(|sprite| sprite.blocks.clone())
    }

    /// Editable program graph of an actor.
    ///
    /// A thread in the middle of its turn keeps the graph it started the turn with and
    /// sees the edit from its next turn on.
    pub fn blocks_mut(
        &mut self,
        target: TargetId,
    ) -> Option<&mut Blocks> {
        let sprite = self.targets.get(&target)?.sprite;
        self.sprites
            .get_mut(&sprite)
            .map(|sprite| Arc::make_mut(&mut sprite.blocks))
    }

    /// Find a variable, creating a scalar on the target when it is missing.
    ///
    /// Lookup order: target by id, stage by id, target by name, stage by name.
    pub fn lookup_or_create_variable(
        &mut self,
        target: TargetId,
        id: Option<&str>,
        name: &str,
        kind: VariableKind,
    ) -> Option<&mut Variable> {
        let (owner, key) = match self.locate_variable(target, id, name, kind) {
            Some(found) => found,
            None => {
                let owner = self.targets.get_mut(&target)?;
                let id = id.unwrap_or(name);
                let variable = match kind {
                    VariableKind::Scalar => Variable::scalar(id, name),
                    VariableKind::List => Variable::list(id, name),
                };
                debug!(target = %target, name, "creating missing variable");
                owner.insert_variable(variable);
                (target, id.to_string())
            }
        };
        self.targets.get_mut(&owner)?.variables.get_mut(&key)
    }

    fn locate_variable(
        &self,
        target: TargetId,
        id: Option<&str>,
        name: &str,
        kind: VariableKind,
    ) -> Option<(TargetId, String)> {
        let scopes: Vec<&Target> = [Some(target), self.stage]
            .into_iter()
            .flatten()
            .filter_map(|owner| self.targets.get(&owner))
            .collect();
        if let Some(id) = id {
            for owner in &scopes {
                if let Some(key) = owner.find_variable_by_id(id, kind) {
                    return Some((owner.id(), key.to_string()));
                }
            }
        }
        scopes.iter().find_map(|owner| {
            owner
                .find_variable_by_name(name, kind)
                .map(|key| (owner.id(), key.to_string()))
        })
    }

    // ---- clones ----

    /// Clone an actor and start its "when I start as a clone" scripts.
    ///
    /// Returns `None` for the stage, a missing actor, or when the clone cap is reached.
    pub fn create_clone(
        &mut self,
        source: TargetId,
    ) -> Option<TargetId> {
        if self.clone_count >= self.config.max_clones {
            warn!(max = self.config.max_clones, "clone limit reached");
            return None;
        }
        let original = self.targets.get(&source).filter(|target| !target.is_stage)?;
        let id = TargetId(self.next_target_id);
        let clone = original.make_clone(id);
        let sprite = clone.sprite;
        self.next_target_id += 1;
        self.targets.insert(id, clone);
        if let Some(sprite) = self.sprites.get_mut(&sprite) {
            sprite.clones.push(id);
        }
        self.clone_count += 1;
        debug!(source = %source, clone = %id, "created clone");
        self.start_hats(&Opcode::ControlStartAsClone, &[], Some(id));
        Some(id)
    }

    /// Remove a clone and stop its threads. Originals cannot be deleted.
    pub fn delete_clone(
        &mut self,
        id: TargetId,
    ) -> bool {
        if !self.targets.get(&id).is_some_and(|target| !target.is_original) {
            return false;
        }
        self.stop_for_target(id, None);
        if let Some(target) = self.targets.shift_remove(&id) {
            if let Some(sprite) = self.sprites.get_mut(&target.sprite) {
                sprite.clones.retain(|clone| *clone != id);
            }
            self.clone_count = self.clone_count.saturating_sub(1);
            debug!(clone = %id, "deleted clone");
        }
        true
    }

    pub fn clone_count(&self) -> usize {
        self.clone_count
    }

    // ---- threads ----

    /// Threads in scheduling order
    pub fn threads(&self) -> &[Thread] {
        &self.threads
    }

    pub fn thread(
        &self,
        id: ThreadId,
    ) -> Option<&Thread> {
        self.threads
            .iter()
            .chain(self.spawned.iter())
            .find(|thread| thread.id() == id)
    }

    /// Whether a thread exists and has not finished
    pub fn is_active_thread(
        &self,
        id: ThreadId,
    ) -> bool {
        if self.current.is_some_and(|current| current.id == id && !current.retire) {
            return true;
        }
        self.thread(id).is_some_and(|thread| !thread.is_done())
    }

    /// Start a thread at `top_block`. Threads started during a pass first run next pass.
    pub fn push_thread(
        &mut self,
        target: TargetId,
        top_block: BlockId,
    ) -> ThreadId {
        let id = ThreadId(self.next_thread_id);
        self.next_thread_id += 1;
        let thread = Thread::new(id, target, top_block);
        debug!(thread = %id, target = %target, block = %top_block, "thread started");
        if self.in_pass {
            self.spawned.push(thread);
        } else {
            self.threads.push(thread);
        }
        id
    }

    /// Start a script, or stop it when it is already running (an editor click).
    ///
    /// Returns the new thread, if one was started.
    pub fn toggle_script(
        &mut self,
        target: TargetId,
        top_block: BlockId,
    ) -> Option<ThreadId> {
        let running = self.all_threads_mut().find(|thread| {
            thread.target == target && thread.top_block == Some(top_block) && !thread.is_done()
        });
        if let Some(thread) = running {
            thread.retire();
            self.drop_finished();
            return None;
        }
        let id = self.push_thread(target, top_block);
        if let Some(thread) = self.all_threads_mut().find(|thread| thread.id() == id) {
            thread.stack_click = true;
        }
        Some(id)
    }

    fn all_threads_mut(&mut self) -> impl Iterator<Item = &mut Thread> + '_ {
        self.threads.iter_mut().chain(self.spawned.iter_mut())
    }

    /// Outside a pass, finished threads leave the list right away.
    fn drop_finished(&mut self) {
        if !self.in_pass {
            self.threads.retain(|thread| !thread.is_done());
            self.spawned.retain(|thread| !thread.is_done());
        }
    }

    /// Stop every thread of an actor, except `keep`
    pub fn stop_for_target(
        &mut self,
        target: TargetId,
        keep: Option<ThreadId>,
    ) {
        for thread in self.all_threads_mut() {
            if thread.target == target && Some(thread.id()) != keep {
                thread.retire();
            }
        }
        if let Some(current) = self.current.as_mut() {
            if current.target == target && Some(current.id) != keep {
                current.retire = true;
            }
        }
        self.drop_finished();
    }

    // ---- events ----

    /// Start every script under a matching hat and return the threads started.
    ///
    /// Fields match case-insensitively. A script that is already running is restarted
    /// (and counted as started) when the hat says so, and left alone otherwise.
    pub fn start_hats(
        &mut self,
        hat: &Opcode,
        fields: &[(String, String)],
        only_target: Option<TargetId>,
    ) -> Vec<ThreadId> {
        let Some(info) = hat.hat() else {
            warn!(opcode = %hat, "not a hat opcode");
            return Vec::new();
        };

        let mut scripts = Vec::new();
        for target in self.targets.values() {
            if only_target.is_some_and(|only| only != target.id()) {
                continue;
            }
            let Some(sprite) = self.sprites.get(&target.sprite) else {
                continue;
            };
            for top in sprite.blocks.scripts() {
                let Some(block) = sprite.blocks.get(top) else {
                    continue;
                };
                let matches = block.opcode == *hat
                    && fields.iter().all(|(name, value)| {
                        block
                            .field(name)
                            .is_some_and(|field| field.to_lowercase() == value.to_lowercase())
                    });
                if matches {
                    scripts.push((target.id(), top));
                }
            }
        }

        let mut started = Vec::new();
        for (target, top) in scripts {
            if let Some(current) = self.current.as_mut() {
                if current.target == target && current.top_block == Some(top) && !current.retire
                {
                    if info.restart_existing {
                        current.restart = true;
                    }
                    continue;
                }
            }
            let existing = self.all_threads_mut().find(|thread| {
                thread.target == target && thread.top_block == Some(top) && !thread.is_done()
            });
            if let Some(thread) = existing {
                if info.restart_existing {
                    debug!(thread = %thread.id(), "restarting thread");
                    thread.restart();
                    started.push(thread.id());
                }
                continue;
            }
            started.push(self.push_thread(target, top));
        }
        started
    }

    /// Queue an event for dispatch after the next pass
    pub fn queue_event(
        &mut self,
        event: Event,
    ) {
        self.events.push(event);
    }

    /// Events waiting for dispatch
    pub fn queued_events(&self) -> &EventQueue {
        &self.events
    }

    /// Start `when I receive` scripts for a message
    pub fn broadcast(
        &mut self,
        message: &str,
    ) -> Vec<ThreadId> {
        let event = Event::broadcast(message);
        self.start_hats(&event.hat, &event.fields, None)
    }

    /// Start `when this sprite clicked` scripts of one actor
    pub fn click_target(
        &mut self,
        target: TargetId,
    ) -> Vec<ThreadId> {
        self.start_hats(&Opcode::EventWhenThisSpriteClicked, &[], Some(target))
    }

    fn dispatch_events(&mut self) {
        for event in self.events.drain() {
            self.start_hats(&event.hat, &event.fields, event.target);
        }
    }

    /// Stop everything, reset the project timer and start the green flag scripts.
    pub fn green_flag(&mut self) -> Vec<ThreadId> {
        self.stop_all();
        self.io.clock.reset();
        info!("green flag");
        self.start_hats(&Opcode::EventWhenFlagClicked, &[], None)
    }

    /// Stop every thread, delete every clone and drop queued events and prompts.
    pub fn stop_all(&mut self) {
        for thread in self.all_threads_mut() {
            thread.retire();
        }
        if let Some(current) = self.current.as_mut() {
            current.retire = true;
        }
        self.drop_finished();

        let clones: Vec<TargetId> = self
            .targets
            .values()
            .filter(|target| !target.is_original)
            .map(Target::id)
            .collect();
        for clone in clones {
            self.delete_clone(clone);
        }
        for target in self.targets.values_mut() {
            target.say = None;
        }
        self.events.clear();
        self.questions.clear();
        debug!("stopped all threads");
    }

    // ---- tick ----

    /// Run one scheduling pass, then dispatch queued events and flush cloud requests.
    ///
    /// Returns the threads that finished and were removed during the pass.
    pub fn step(&mut self) -> Vec<ThreadId> {
        let Some(mut sequencer) = self.sequencer.take() else {
            return Vec::new();
        };
        sequencer.configure(&self.config);
        let done = sequencer.step_threads(self);
        self.sequencer = Some(sequencer);
        self.dispatch_events();
        self.io.cloud.flush();
        done
    }

    /// Counters of the last pass
    pub fn stats(&self) -> Option<&SequencerStats> {
        self.sequencer.as_ref().map(Sequencer::stats)
    }

    /// Ask the renderer for a redraw before the next pass
    pub fn request_redraw(&mut self) {
        self.redraw_requested = true;
    }

    pub fn redraw_requested(&self) -> bool {
        self.redraw_requested
    }

    // ---- io ----

    /// Feed a host event to its device
    pub fn post_io_data(
        &mut self,
        event: IoEvent,
    ) {
        let stage = self.stage.and_then(|id| self.targets.get_mut(&id));
        let mut cx = IoContext {
            events: &mut self.events,
            stage,
        };
        self.io.post(event, &mut cx);
    }

    pub fn set_cloud_provider(
        &mut self,
        provider: Box<dyn CloudProvider>,
    ) {
        self.io.cloud.set_provider(provider);
    }

    /// Register a host primitive for an opcode
    pub fn register_extension(
        &mut self,
        opcode: impl Into<String>,
        handler: ExtensionHandler,
    ) {
        let opcode = opcode.into();
        debug!(%opcode, "registered extension primitive");
        self.extensions.insert(opcode, handler);
    }

    pub(crate) fn extension(
        &self,
        opcode: &str,
    ) -> Option<ExtensionHandler> {
        self.extensions.get(opcode).cloned()
    }

    /// Queue a prompt and get the deferred answer
    pub fn ask(
        &mut self,
        text: impl Into<String>,
    ) -> Deferred {
        let (deferred, resolver) = deferred();
        self.questions.push_back(Question {
            text: text.into(),
            resolver,
        });
        deferred
    }

    /// The prompt on screen, if any
    pub fn pending_question(&self) -> Option<&str> {
        self.questions.front().map(|question| question.text.as_str())
    }

    /// Answer the prompt on screen. Returns `false` when nothing was asked.
    pub fn answer_question(
        &mut self,
        answer: impl Into<String>,
    ) -> bool {
        let Some(question) = self.questions.pop_front() else {
            return false;
        };
        self.answer = answer.into();
        question.resolver.resolve(Value::String(self.answer.clone()));
        true
    }

    /// The last answer given
    pub fn answer(&self) -> &str {
        &self.answer
    }

    // ---- results ----

    /// Shared handle to the fault log
    pub fn faults(&self) -> &FaultLog {
        &self.faults
    }

    pub fn take_faults(&self) -> Vec<ThreadFault> {
        self.faults.take()
    }

    /// Values reported by finished reporter scripts
    pub fn take_reports(&mut self) -> Vec<(ThreadId, Value)> {
        std::mem::take(&mut self.reports)
    }

    pub(crate) fn push_report(
        &mut self,
        thread: ThreadId,
        value: Value,
    ) {
        self.reports.push((thread, value));
    }
}

impl std::fmt::Debug for Runtime {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("Runtime")
            .field("targets", &self.targets.len())
            .field("threads", &self.threads.len())
            .field("spawned", &self.spawned.len())
            .field("events", &self.events.len())
            .finish()
    }
}

#[cfg(test)]
mod tests;
