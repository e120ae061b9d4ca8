//! View controller and the map engine seam.
//!
//! Rendering, tile decoding, hit-testing and animation belong to an external
//! map engine. The explorer reaches it only through [`MapEngine`] and
//! [`MapHandle`]; [`ViewController`] owns the one map handle, its event
//! subscriptions and its teardown.

use crate::style::StyleRule;
use anyhow::Result;
use async_channel::{Receiver, Sender};
use batas_core::config::MapConfig;
use batas_core::feature::FeatureProperties;
use batas_core::types::{LonLat, MapCoordinate, Pixel, ViewState};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Reference layer drawn under the boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BaseLayer {
    OpenStreetMap,
}

/// Layers a hit query may be restricted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LayerId {
    Base,
    Overlay,
}

/// Vector-tile overlay of village boundaries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlayLayer {
    /// Tile URL with `{z}`, `{x}` and `{y}` placeholders
    pub tile_url_template: String,
    pub opacity: f64,
    pub style: StyleRule,
}

/// Everything an engine needs to create the map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapSpec {
    /// Identifies the surface the map is attached to
    pub container: String,
    pub base: BaseLayer,
    pub overlay: OverlayLayer,
    pub view: ViewState,
}

/// Restricts a feature lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HitOptions {
    /// Only features of these layers are reported
    pub layers: Vec<LayerId>,
    pub hit_tolerance_px: f64,
}

impl HitOptions {
    pub fn overlay_only(hit_tolerance_px: f64) -> Self {
        Self {
            layers: vec![LayerId::Overlay],
            hit_tolerance_px,
        }
    }

    pub fn includes(&self, layer: LayerId) -> bool {
        self.layers.contains(&layer)
    }
}

/// Animated view change.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewAnimation {
    pub center: MapCoordinate,
    pub zoom: f64,
    pub duration: Duration,
}

/// Events the explorer reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum MapEvent {
    /// The view stopped moving.
    MoveEnd,
    Click { pixel: Pixel },
}

impl MapEvent {
    pub fn kind(&self) -> MapEventKind {
        match self {
            MapEvent::MoveEnd => MapEventKind::MoveEnd,
            MapEvent::Click { .. } => MapEventKind::Click,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MapEventKind {
    MoveEnd,
    Click,
}

/// Handle returned by [`MapHandle::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubscriptionId(pub u64);

/// Creates maps.
pub trait MapEngine: Send {
    type Handle: MapHandle;

    fn create(&mut self, spec: MapSpec) -> Result<Self::Handle>;
}

/// One live map.
pub trait MapHandle: Send {
    fn view(&self) -> ViewState;

    /// Screen position of a map coordinate, if it can be projected.
    fn pixel_from_coordinate(&self, coordinate: MapCoordinate) -> Option<Pixel>;

    /// Properties of the first feature at `pixel`, in the engine's visiting order.
    fn feature_at_pixel(&self, pixel: Pixel, options: &HitOptions) -> Option<FeatureProperties>;

    /// Starts an animation. Replacing a running one is up to the engine.
    fn animate(&mut self, animation: ViewAnimation);

    fn set_overlay_style(&mut self, rule: StyleRule);

    /// Delivers events of `kind` into `sink` until unsubscribed.
    fn subscribe(&mut self, kind: MapEventKind, sink: Sender<MapEvent>) -> SubscriptionId;

    fn unsubscribe(&mut self, id: SubscriptionId);

    /// Detaches the map from its container.
    fn detach(&mut self);
}

struct MapInstance<H> {
    handle: H,
    container: String,
    subscriptions: Vec<SubscriptionId>,
    /// Fed only by the engine's subscriptions; dropped with the map
    events: Receiver<MapEvent>,
}

pub struct ViewController<E: MapEngine> {
    engine: E,
    config: MapConfig,
    tile_url_template: String,
    map: Option<MapInstance<E::Handle>>,
}

impl<E: MapEngine> ViewController<E> {
    pub fn new(engine: E, config: MapConfig, tile_url_template: impl Into<String>) -> Self {
        Self {
            engine,
            config,
            tile_url_template: tile_url_template.into(),
            map: None,
        }
    }

    pub fn config(&self) -> &MapConfig {
        &self.config
    }

    pub fn is_initialized(&self) -> bool {
        self.map.is_some()
    }

    pub fn container(&self) -> Option<&str> {
        self.map.as_ref().map(|map| map.container.as_str())
    }

    /// Creates the map and subscribes to its events.
    ///
    /// Does nothing and returns `false` if a map already exists.
    pub fn initialize(&mut self, container: &str, style: StyleRule) -> Result<bool> {
        if let Some(map) = &self.map {
            tracing::debug!(
                "Map already initialized in {}, ignoring {}",
                map.container,
                container
            );
            return Ok(false);
        }

        let spec = MapSpec {
            container: container.to_string(),
            base: BaseLayer::OpenStreetMap,
            overlay: OverlayLayer {
                tile_url_template: self.tile_url_template.clone(),
                opacity: self.config.overlay_opacity,
                style,
            },
            view: ViewState::new(self.config.initial_center, self.config.initial_zoom),
        };

        let mut handle = self.engine.create(spec)?;
        let (events_tx, events) = async_channel::unbounded();
        let subscriptions = [MapEventKind::MoveEnd, MapEventKind::Click]
            .into_iter()
            .map(|kind| handle.subscribe(kind, events_tx.clone()))
            .collect();

        tracing::info!("Map initialized in {}", container);
        self.map = Some(MapInstance {
            handle,
            container: container.to_string(),
            subscriptions,
            events,
        });
        Ok(true)
    }

    /// Animates the view to `position` at the fly-to zoom. Returns `false` without a map.
    pub fn fly_to(&mut self, position: LonLat) -> bool {
        let Some(map) = self.map.as_mut() else {
            return false;
        };
        map.handle.animate(ViewAnimation {
            center: position.to_map_coordinate(),
            zoom: self.config.fly_to_zoom,
            duration: self.config.fly_to_duration(),
        });
        true
    }

    /// Properties of the first overlay feature near `pixel`.
    pub fn pick_feature_at_pixel(&self, pixel: Pixel) -> Option<FeatureProperties> {
        let map = self.map.as_ref()?;
        let options = HitOptions::overlay_only(self.config.hit_tolerance_px);
        map.handle.feature_at_pixel(pixel, &options)
    }

    /// Screen position of the current view center.
    pub fn center_pixel(&self) -> Option<Pixel> {
        let map = self.map.as_ref()?;
        map.handle.pixel_from_coordinate(map.handle.view().center)
    }

    pub fn view(&self) -> Option<ViewState> {
        self.map.as_ref().map(|map| map.handle.view())
    }

    pub fn apply_style(&mut self, rule: StyleRule) {
        if let Some(map) = self.map.as_mut() {
            map.handle.set_overlay_style(rule);
        }
    }

    /// Next queued event without waiting.
    pub fn try_next_event(&self) -> Option<MapEvent> {
        self.map.as_ref()?.events.try_recv().ok()
    }

    /// Waits for the next event.
    ///
    /// Returns `None` at once when there is no map, and once the engine has
    /// dropped every subscription.
    pub async fn next_event(&self) -> Option<MapEvent> {
        let map = self.map.as_ref()?;
        map.events.recv().await.ok()
    }

    /// Releases subscriptions, detaches and drops the map. Safe to call repeatedly.
    pub fn teardown(&mut self) {
        let Some(mut map) = self.map.take() else {
            return;
        };
        for id in map.subscriptions.drain(..) {
            map.handle.unsubscribe(id);
        }
        map.handle.detach();
        map.events.close();
        tracing::info!("Map in {} torn down", map.container);
    }
}

impl<E: MapEngine> Drop for ViewController<E> {
    fn drop(&mut self) {
        self.teardown();
    }
}
