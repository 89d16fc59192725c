/// Detector trait and per-tick scene plumbing
///
/// A `Detector` classifies one phenomenon per tick. `Scene` wraps it with a
/// per-tick result cache, and `SceneRegistry` exposes the results of scenes
/// that already ran this tick to the ones that run after them.
use std::collections::HashMap;

use crate::context::Context;
use crate::messaging::Event;

/// Identifier of every detector the engine knows about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SceneId {
    Lobby,
    Timer,
    Beginning,
    GoSign,
    Objective,
    TeamColors,
    Finish,
    PaintTracker,
}

impl SceneId {
    pub fn name(&self) -> &'static str {
        match self {
            SceneId::Lobby => "lobby",
            SceneId::Timer => "timer",
            SceneId::Beginning => "beginning",
            SceneId::GoSign => "go_sign",
            SceneId::Objective => "objective",
            SceneId::TeamColors => "team_colors",
            SceneId::Finish => "finish",
            SceneId::PaintTracker => "paint_tracker",
        }
    }
}

/// Collects events raised during one detector call
#[derive(Debug, Default)]
pub struct Emitter {
    queue: Vec<Event>,
}

impl Emitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emit(&mut self, event: Event) {
        tracing::debug!("emit {}", event.name());
        self.queue.push(event);
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn events(&self) -> &[Event] {
        &self.queue
    }

    /// Take everything emitted so far, oldest first
    pub fn drain(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.queue)
    }
}

/// Results of the scenes that already ran in the current tick
#[derive(Debug, Default)]
pub struct SceneRegistry {
    tick: u64,
    results: HashMap<SceneId, bool>,
}

impl SceneRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget the previous tick's results
    pub fn begin_tick(&mut self, tick: u64) {
        self.tick = tick;
        self.results.clear();
    }

    pub fn record(&mut self, id: SceneId, matched: bool) {
        self.results.insert(id, matched);
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// `None` when `id` has not run yet this tick (or is not registered)
    pub fn is_another_scene_matched(&self, id: SceneId) -> Option<bool> {
        self.results.get(&id).copied()
    }
}

/// Detector interface
///
/// Implementors classify one phenomenon. They must treat a missing or
/// malformed frame as "no match" and mutate the context only after a
/// complete decision.
pub trait Detector: Send {
    fn id(&self) -> SceneId;

    /// Scenes whose result this detector reads; they must run before it
    fn dependencies(&self) -> &'static [SceneId] {
        &[]
    }

    /// Classify the current tick
    fn detect(&mut self, ctx: &mut Context, scenes: &SceneRegistry, events: &mut Emitter) -> bool;

    /// React to an event raised by any scene (including this one)
    fn on_event(&mut self, _ctx: &mut Context, _event: &Event, _events: &mut Emitter) {}

    /// Back to the initial state, timers cleared
    fn reset(&mut self);
}

/// A detector with its per-tick result cache
pub struct Scene {
    detector: Box<dyn Detector>,
    /// (tick, result) of the last evaluation
    cache: Option<(u64, bool)>,
}

impl Scene {
    pub fn new(detector: Box<dyn Detector>) -> Self {
        Self {
            detector,
            cache: None,
        }
    }

    pub fn id(&self) -> SceneId {
        self.detector.id()
    }

    pub fn dependencies(&self) -> &'static [SceneId] {
        self.detector.dependencies()
    }

    /// Result for the current tick, computed at most once per tick
    pub fn matches(&mut self, ctx: &mut Context, scenes: &SceneRegistry, events: &mut Emitter) -> bool {
        let tick = ctx.tick();
        if let Some((cached_tick, result)) = self.cache {
            if cached_tick == tick {
                return result;
            }
        }

        let result = self.detector.detect(ctx, scenes, events);
        self.cache = Some((tick, result));
        result
    }

    /// Cached result, if this scene already ran in `tick`
    pub fn cached(&self, tick: u64) -> Option<bool> {
        self.cache
            .filter(|(cached_tick, _)| *cached_tick == tick)
            .map(|(_, result)| result)
    }

    pub fn on_event(&mut self, ctx: &mut Context, event: &Event, events: &mut Emitter) {
        self.detector.on_event(ctx, event, events);
    }

    pub fn reset(&mut self) {
        self.detector.reset();
        self.cache = None;
    }
}

impl std::fmt::Debug for Scene {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scene")
            .field("id", &self.id())
            .field("cache", &self.cache)
            .finish()
    }
}
