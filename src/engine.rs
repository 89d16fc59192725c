/// Tick driver
///
/// One call to `tick` processes one frame:
/// 1. advance the tick counter and logical time
/// 2. run every scene once, in registration order
/// 3. deliver the emitted events FIFO: lifecycle bookkeeping, then the
///    listeners, then every detector's event hook. Events raised by hooks
///    are appended to the same queue.
use std::collections::{HashSet, VecDeque};
use std::time::Instant;

use image::RgbImage;

use crate::context::{Context, Frame, TimerState};
use crate::detection::{Detector, Emitter, Scene, SceneId, SceneRegistry};
use crate::error::EngineError;
use crate::messaging::{Event, EventListener};

/// Upper bound on events delivered in one tick; hooks feeding each other
/// would otherwise never terminate
const MAX_EVENTS_PER_TICK: usize = 256;

pub struct Engine {
    scenes: Vec<Scene>,
    registry: SceneRegistry,
    listeners: Vec<Box<dyn EventListener>>,
    ctx: Context,
    frame_interval_ms: u64,
    preview: bool,
    /// Microseconds spent detecting and dispatching in the last tick
    last_timing: (f64, f64),
}

impl Engine {
    pub fn new(frame_interval_ms: u64) -> Self {
        Self {
            scenes: Vec::new(),
            registry: SceneRegistry::new(),
            listeners: Vec::new(),
            ctx: Context::new(),
            frame_interval_ms,
            preview: false,
            last_timing: (0.0, 0.0),
        }
    }

    /// Seed a debug canvas with each frame for detectors to draw on
    pub fn with_preview(mut self, enabled: bool) -> Self {
        self.preview = enabled;
        self
    }

    /// Register a detector after every scene it depends on
    pub fn register(&mut self, detector: Box<dyn Detector>) -> Result<(), EngineError> {
        let scene = Scene::new(detector);
        let id = scene.id();
        let registered: HashSet<SceneId> = self.scenes.iter().map(Scene::id).collect();

        if registered.contains(&id) {
            return Err(EngineError::DuplicateScene { scene: id });
        }
        if let Some(&dependency) = scene.dependencies().iter().find(|dep| !registered.contains(*dep)) {
            return Err(EngineError::DependencyOrder { scene: id, dependency });
        }

        tracing::debug!("Registered scene {}", id.name());
        self.scenes.push(scene);
        Ok(())
    }

    pub fn register_all(&mut self, detectors: Vec<Box<dyn Detector>>) -> Result<(), EngineError> {
        detectors.into_iter().try_for_each(|detector| self.register(detector))
    }

    pub fn add_listener(&mut self, listener: Box<dyn EventListener>) {
        self.listeners.push(listener);
    }

    pub fn scene_ids(&self) -> Vec<SceneId> {
        self.scenes.iter().map(Scene::id).collect()
    }

    pub fn context(&self) -> &Context {
        &self.ctx
    }

    /// (detect, dispatch) duration of the last tick in microseconds
    pub fn last_timing(&self) -> (f64, f64) {
        self.last_timing
    }

    /// Debug canvas of the last tick, if preview is enabled
    pub fn preview(&self) -> Option<&RgbImage> {
        self.ctx.engine.preview.as_ref()
    }

    /// Process one frame, one frame interval after the previous tick.
    ///
    /// The first tick is at 0 ms. Mixed with `tick_at`, time continues from
    /// the last explicit timestamp. Returns the events delivered during this
    /// tick, in delivery order.
    pub fn tick(&mut self, frame: Frame, frame_hd: Option<Frame>) -> Vec<Event> {
        let msec = if self.ctx.engine.tick == 0 {
            0
        } else {
            self.ctx.engine.msec.saturating_add(self.frame_interval_ms)
        };
        self.tick_at(frame, frame_hd, msec)
    }

    /// Process one frame captured at `msec` of stream time
    pub fn tick_at(&mut self, frame: Frame, frame_hd: Option<Frame>, msec: u64) -> Vec<Event> {
        self.ctx.engine.tick += 1;
        self.ctx.engine.msec = msec;
        self.ctx.engine.preview = self.preview.then(|| frame.as_ref().clone());
        self.ctx.engine.frame = Some(frame);
        self.ctx.engine.frame_hd = frame_hd;

        let tick = self.ctx.engine.tick;
        self.registry.begin_tick(tick);

        let detect_start = Instant::now();
        let mut emitter = Emitter::new();
        for scene in &mut self.scenes {
            let matched = scene.matches(&mut self.ctx, &self.registry, &mut emitter);
            self.registry.record(scene.id(), matched);
        }
        let detect_us = detect_start.elapsed().as_secs_f64() * 1_000_000.0;

        let dispatch_start = Instant::now();
        let delivered = self.dispatch(emitter.drain());
        let dispatch_us = dispatch_start.elapsed().as_secs_f64() * 1_000_000.0;

        self.last_timing = (detect_us, dispatch_us);
        delivered
    }

    fn dispatch(&mut self, events: Vec<Event>) -> Vec<Event> {
        let mut queue: VecDeque<Event> = events.into();
        let mut delivered = Vec::with_capacity(queue.len());

        while let Some(event) = queue.pop_front() {
            if delivered.len() >= MAX_EVENTS_PER_TICK {
                tracing::warn!(
                    "Dropping {} events at tick {}: per-tick limit reached",
                    queue.len() + 1,
                    self.ctx.tick()
                );
                break;
            }

            self.apply_lifecycle(&event);

            for listener in &mut self.listeners {
                listener.on_event(&self.ctx, &event);
            }

            let mut follow_up = Emitter::new();
            for scene in &mut self.scenes {
                scene.on_event(&mut self.ctx, &event, &mut follow_up);
            }
            queue.extend(follow_up.drain());

            delivered.push(event);
        }

        delivered
    }

    /// Match-level bookkeeping the detectors rely on
    fn apply_lifecycle(&mut self, event: &Event) {
        if let Event::TimerDetected {
            kind,
            remaining,
            first_seen_msec,
        } = event
        {
            tracing::info!("New match detected, clearing game state");
            self.ctx.game.clear();
            self.ctx.game.rule = self.ctx.lobby.rule;
            self.ctx.game.timer = Some(TimerState {
                kind: *kind,
                remaining: remaining.clone(),
                detected_at_msec: *first_seen_msec,
            });
        }
    }

    /// Every detector back to its initial state and an empty context
    pub fn reset(&mut self) {
        for scene in &mut self.scenes {
            scene.reset();
        }
        self.registry = SceneRegistry::new();
        self.ctx = Context::new();
    }
}
