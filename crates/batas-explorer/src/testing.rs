//! In-memory doubles for tests.
//!
//! [`RecordingEngine`] stands in for a real map engine: it keeps a viewport,
//! answers hit queries from features placed at pixels and records every call.
//! [`ScriptedBackend`] answers searches and detail lookups from canned JSON,
//! optionally after a delay.

use crate::backend::VillageBackend;
use crate::style::StyleRule;
use crate::view::{
    HitOptions, LayerId, MapEngine, MapEvent, MapEventKind, MapHandle, MapSpec, SubscriptionId,
    ViewAnimation,
};
use anyhow::{anyhow, Result};
use async_channel::Sender;
use async_trait::async_trait;
use batas_core::feature::FeatureProperties;
use batas_core::types::{MapCoordinate, Pixel, ViewState, EARTH_RADIUS_M};
use parking_lot::{Mutex, MutexGuard};
use serde_json::Value;
use std::collections::HashMap;
use std::f64::consts::PI;
use std::sync::Arc;
use std::time::Duration;

const TILE_SIZE_PX: f64 = 256.0;

/// Viewport size of maps created by [`RecordingEngine`].
pub const VIEWPORT: (f64, f64) = (800.0, 600.0);

#[derive(Debug, Default)]
struct EngineLog {
    specs: Vec<MapSpec>,
    view: Option<ViewState>,
    animations: Vec<ViewAnimation>,
    styles: Vec<StyleRule>,
    features: Vec<(Pixel, FeatureProperties)>,
    hit_queries: Vec<HitOptions>,
    subscriptions: HashMap<SubscriptionId, (MapEventKind, Sender<MapEvent>)>,
    next_subscription: u64,
    detached: usize,
}

/// Map engine that records what the explorer asks of it.
///
/// Clones share the same log, so a test keeps one clone to inspect while the
/// explorer owns another.
#[derive(Debug, Clone, Default)]
pub struct RecordingEngine {
    log: Arc<Mutex<EngineLog>>,
}

impl RecordingEngine {
    pub fn new() -> Self {
        Self::default()
    }

    fn log(&self) -> MutexGuard<'_, EngineLog> {
        self.log.lock()
    }

    pub fn maps_created(&self) -> usize {
        self.log().specs.len()
    }

    pub fn last_spec(&self) -> Option<MapSpec> {
        self.log().specs.last().cloned()
    }

    pub fn active_subscriptions(&self) -> usize {
        self.log().subscriptions.len()
    }

    pub fn detached(&self) -> usize {
        self.log().detached
    }

    pub fn animations(&self) -> Vec<ViewAnimation> {
        self.log().animations.clone()
    }

    /// Every overlay style applied, oldest first.
    pub fn styles(&self) -> Vec<StyleRule> {
        self.log().styles.clone()
    }

    pub fn current_style(&self) -> Option<StyleRule> {
        self.log().styles.last().copied()
    }

    pub fn hit_queries(&self) -> Vec<HitOptions> {
        self.log().hit_queries.clone()
    }

    pub fn view(&self) -> Option<ViewState> {
        self.log().view
    }

    /// Puts an overlay feature at `pixel`. Earlier features win ties.
    pub fn place_feature(&self, pixel: Pixel, properties: Value) {
        self.log()
            .features
            .push((pixel, FeatureProperties::from_value(properties)));
    }

    pub fn clear_features(&self) {
        self.log().features.clear();
    }

    /// Moves the view without animation. Does not emit `MoveEnd`.
    pub fn set_view(&self, view: ViewState) {
        self.log().view = Some(view);
    }

    /// Delivers `event` to every matching subscriber, as the engine would.
    pub fn emit(&self, event: MapEvent) {
        let sinks: Vec<Sender<MapEvent>> = self
            .log()
            .subscriptions
            .values()
            .filter(|(kind, _)| *kind == event.kind())
            .map(|(_, sink)| sink.clone())
            .collect();
        for sink in sinks {
            let _ = sink.try_send(event);
        }
    }
}

impl MapEngine for RecordingEngine {
    type Handle = RecordingMap;

    fn create(&mut self, spec: MapSpec) -> Result<RecordingMap> {
        let mut log = self.log();
        log.view = Some(spec.view);
        log.styles.push(spec.overlay.style);
        log.specs.push(spec);
        Ok(RecordingMap {
            log: self.log.clone(),
        })
    }
}

/// Map created by [`RecordingEngine`].
#[derive(Debug)]
pub struct RecordingMap {
    log: Arc<Mutex<EngineLog>>,
}

fn resolution(zoom: f64) -> f64 {
    2.0 * PI * EARTH_RADIUS_M / (TILE_SIZE_PX * 2f64.powf(zoom))
}

impl MapHandle for RecordingMap {
    fn view(&self) -> ViewState {
        self.log
            .lock()
            .view
            .unwrap_or(ViewState {
                center: MapCoordinate::new(0.0, 0.0),
                zoom: 0.0,
            })
    }

    fn pixel_from_coordinate(&self, coordinate: MapCoordinate) -> Option<Pixel> {
        let view = self.view();
        let res = resolution(view.zoom);
        let pixel = Pixel::new(
            VIEWPORT.0 / 2.0 + (coordinate.x - view.center.x) / res,
            VIEWPORT.1 / 2.0 - (coordinate.y - view.center.y) / res,
        );
        (pixel.x.is_finite() && pixel.y.is_finite()).then_some(pixel)
    }

    fn feature_at_pixel(&self, pixel: Pixel, options: &HitOptions) -> Option<FeatureProperties> {
        let mut log = self.log.lock();
        log.hit_queries.push(options.clone());
        if !options.includes(LayerId::Overlay) {
            return None;
        }
        log.features
            .iter()
            .find(|(at, _)| {
                (at.x - pixel.x).hypot(at.y - pixel.y) <= options.hit_tolerance_px
            })
            .map(|(_, properties)| properties.clone())
    }

    fn animate(&mut self, animation: ViewAnimation) {
        let sinks: Vec<Sender<MapEvent>> = {
            let mut log = self.log.lock();
            log.animations.push(animation);
            log.view = Some(ViewState {
                center: animation.center,
                zoom: animation.zoom,
            });
            log.subscriptions
                .values()
                .filter(|(kind, _)| *kind == MapEventKind::MoveEnd)
                .map(|(_, sink)| sink.clone())
                .collect()
        };
        for sink in sinks {
            let _ = sink.try_send(MapEvent::MoveEnd);
        }
    }

    fn set_overlay_style(&mut self, rule: StyleRule) {
        self.log.lock().styles.push(rule);
    }

    fn subscribe(&mut self, kind: MapEventKind, sink: Sender<MapEvent>) -> SubscriptionId {
        let mut log = self.log.lock();
        log.next_subscription += 1;
        let id = SubscriptionId(log.next_subscription);
        log.subscriptions.insert(id, (kind, sink));
        id
    }

    fn unsubscribe(&mut self, id: SubscriptionId) {
        self.log.lock().subscriptions.remove(&id);
    }

    fn detach(&mut self) {
        self.log.lock().detached += 1;
    }
}

#[derive(Debug, Clone)]
enum Reply {
    Json(Value),
    Fail(String),
}

#[derive(Debug, Clone)]
struct Scripted {
    reply: Reply,
    delay: Duration,
}

impl Scripted {
    async fn play(self) -> Result<Value> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        match self.reply {
            Reply::Json(body) => Ok(body),
            Reply::Fail(reason) => Err(anyhow!(reason)),
        }
    }
}

/// A request seen by [`ScriptedBackend`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendCall {
    Search(String),
    Detail(String),
}

/// Backend answering from canned responses. Unscripted requests fail.
#[derive(Debug, Default)]
pub struct ScriptedBackend {
    searches: Mutex<HashMap<String, Scripted>>,
    details: Mutex<HashMap<String, Scripted>>,
    calls: Mutex<Vec<BackendCall>>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_search(self, query: &str, body: Value) -> Self {
        self.script_search(query, Reply::Json(body), Duration::ZERO)
    }

    pub fn with_search_delayed(self, query: &str, body: Value, delay: Duration) -> Self {
        self.script_search(query, Reply::Json(body), delay)
    }

    pub fn with_search_failure(self, query: &str, reason: &str) -> Self {
        self.script_search(query, Reply::Fail(reason.to_string()), Duration::ZERO)
    }

    pub fn with_detail(self, code: &str, body: Value) -> Self {
        self.script_detail(code, Reply::Json(body), Duration::ZERO)
    }

    pub fn with_detail_delayed(self, code: &str, body: Value, delay: Duration) -> Self {
        self.script_detail(code, Reply::Json(body), delay)
    }

    pub fn with_detail_failure(self, code: &str, reason: &str) -> Self {
        self.script_detail(code, Reply::Fail(reason.to_string()), Duration::ZERO)
    }

    fn script_search(self, query: &str, reply: Reply, delay: Duration) -> Self {
        self.searches
            .lock()
            .insert(query.to_string(), Scripted { reply, delay });
        self
    }

    fn script_detail(self, code: &str, reply: Reply, delay: Duration) -> Self {
        self.details
            .lock()
            .insert(code.to_string(), Scripted { reply, delay });
        self
    }

    pub fn calls(&self) -> Vec<BackendCall> {
        self.calls.lock().clone()
    }

    pub fn search_calls(&self) -> Vec<String> {
        self.calls
            .lock()
            .iter()
            .filter_map(|call| match call {
                BackendCall::Search(query) => Some(query.clone()),
                BackendCall::Detail(_) => None,
            })
            .collect()
    }

    pub fn detail_calls(&self) -> Vec<String> {
        self.calls
            .lock()
            .iter()
            .filter_map(|call| match call {
                BackendCall::Detail(code) => Some(code.clone()),
                BackendCall::Search(_) => None,
            })
            .collect()
    }
}

#[async_trait]
impl VillageBackend for ScriptedBackend {
    async fn search(&self, query: &str) -> Result<Value> {
        self.calls.lock().push(BackendCall::Search(query.to_string()));
        let scripted = self.searches.lock().get(query).cloned();
        match scripted {
            Some(scripted) => scripted.play().await,
            None => Err(anyhow!("no scripted search for {:?}", query)),
        }
    }

    async fn detail(&self, code: &str) -> Result<Value> {
        self.calls.lock().push(BackendCall::Detail(code.to_string()));
        let scripted = self.details.lock().get(code).cloned();
        match scripted {
            Some(scripted) => scripted.play().await,
            None => Err(anyhow!("no scripted detail for {:?}", code)),
        }
    }
}
