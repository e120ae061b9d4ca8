//! The map explorer.
//!
//! Ties the view controller, the selection and the two coordinators together
//! and turns user input and map events into state changes:
//!
//! - a click on a village flies to it, selects it and loads its detail;
//! - a finished move updates the caption naming the village under the center;
//! - a submitted query runs a search; activating a result flies to it.
//!
//! Fetches run as tasks on the current tokio runtime, so the methods that
//! start them must be called from within one. Their results land in the
//! coordinators; [`MapExplorer::settle`] waits for all of them.

use crate::api_client::ApiClient;
use crate::backend::VillageBackend;
use crate::detail::{DetailCoordinator, DetailRecord};
use crate::presentation::{self, Caption, DetailRow};
use crate::search::SearchCoordinator;
use crate::selection::Selection;
use crate::style::StyleRule;
use crate::view::{MapEngine, MapEvent, ViewController};
use anyhow::Result;
use batas_core::config::AppConfig;
use batas_core::feature::{FeatureProperties, FlyTarget, VillageCaption};
use batas_core::types::{Entity, EntityId, LonLat, Pixel, ViewState};
use std::sync::Arc;
use tokio::task::JoinSet;

pub struct MapExplorer<E: MapEngine> {
    view: ViewController<E>,
    selection: Selection,
    search: Arc<SearchCoordinator>,
    detail: Arc<DetailCoordinator>,
    query: String,
    caption: Caption,
    tasks: JoinSet<()>,
}

impl<E: MapEngine> MapExplorer<E> {
    pub fn new(
        engine: E,
        backend: Arc<dyn VillageBackend>,
        config: &AppConfig,
        tile_url_template: impl Into<String>,
    ) -> Self {
        Self {
            view: ViewController::new(engine, config.map.clone(), tile_url_template),
            selection: Selection::new(),
            search: Arc::new(SearchCoordinator::with_min_query_chars(
                backend.clone(),
                config.search.min_query_chars,
            )),
            detail: Arc::new(DetailCoordinator::new(backend)),
            query: String::new(),
            caption: Caption::default(),
            tasks: JoinSet::new(),
        }
    }

    /// Explorer backed by the REST API, with overlay tiles from the same server.
    pub fn with_api_client(engine: E, client: ApiClient, config: &AppConfig) -> Self {
        let tile_url_template = client.tile_url_template();
        Self::new(engine, Arc::new(client), config, tile_url_template)
    }

    /// Creates the map in `container`. Later calls do nothing and return `false`.
    pub fn initialize(&mut self, container: &str) -> Result<bool> {
        self.view
            .initialize(container, StyleRule::for_selection(&self.selection))
    }

    pub fn is_initialized(&self) -> bool {
        self.view.is_initialized()
    }

    pub fn view_state(&self) -> Option<ViewState> {
        self.view.view()
    }

    pub fn selection(&self) -> Option<EntityId> {
        self.selection.current()
    }

    /// Flies to a village, selects it and loads its detail.
    pub fn fly_to(&mut self, lon: f64, lat: f64, id: EntityId, code: &str) {
        self.fly_to_target(FlyTarget::new(LonLat::new(lon, lat), id, code));
    }

    pub fn fly_to_target(&mut self, target: FlyTarget) {
        if !self.view.fly_to(target.position) {
            tracing::debug!("Ignoring fly-to {} before the map exists", target.position);
            return;
        }

        if self.selection.select(target.id) {
            self.view.apply_style(StyleRule::for_selection(&self.selection));
        }
        self.spawn_detail(target.code);
    }

    fn spawn_detail(&mut self, code: String) {
        self.reap_finished();
        // drawn here so fetches are ordered by request, not by task start
        let ticket = self.detail.issue_ticket();
        let detail = self.detail.clone();
        self.tasks.spawn(async move {
            detail.fetch_detail_with(ticket, &code).await;
        });
    }

    fn reap_finished(&mut self) {
        while let Some(result) = self.tasks.try_join_next() {
            log_join_error(result);
        }
    }

    /// Reacts to one map event.
    pub fn handle_event(&mut self, event: MapEvent) {
        if !self.view.is_initialized() {
            tracing::debug!("Ignoring {:?} without a map", event);
            return;
        }
        match event {
            MapEvent::MoveEnd => self.on_move_end(),
            MapEvent::Click { pixel } => self.on_click(pixel),
        }
    }

    fn on_move_end(&mut self) {
        let feature = self
            .view
            .center_pixel()
            .and_then(|pixel| self.view.pick_feature_at_pixel(pixel));

        self.caption = match feature {
            Some(props) => Caption::Village(VillageCaption::from_properties(&props)),
            None => Caption::NoVillage,
        };
    }

    fn on_click(&mut self, pixel: Pixel) {
        let Some(props) = self.view.pick_feature_at_pixel(pixel) else {
            return;
        };
        self.fly_to_feature(&props);
    }

    fn fly_to_feature(&mut self, props: &FeatureProperties) {
        if props.id().is_none() {
            tracing::debug!("Clicked feature has no id");
            return;
        }
        match FlyTarget::try_from(props) {
            Ok(target) => self.fly_to_target(target),
            Err(e) => tracing::warn!("Ignoring clicked feature: {}", e),
        }
    }

    /// Handles every queued map event. Returns how many were handled.
    pub fn pump_events(&mut self) -> usize {
        let mut handled = 0;
        while let Some(event) = self.view.try_next_event() {
            self.handle_event(event);
            handled += 1;
        }
        handled
    }

    /// Waits for the next map event and handles it. Returns `false` once no
    /// more events can arrive, and at once when there is no map.
    pub async fn process_next_event(&mut self) -> bool {
        let next = self.view.next_event().await;
        match next {
            Some(event) => {
                self.handle_event(event);
                true
            }
            None => false,
        }
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn set_query(&mut self, query: impl Into<String>) {
        self.query = query.into();
    }

    /// Starts a search for the current query. Returns `false` if the query is too short.
    pub fn submit_search(&mut self) -> bool {
        if !self.search.accepts(&self.query) {
            tracing::debug!("Query {:?} too short to search", self.query);
            return false;
        }
        self.reap_finished();
        let ticket = self.search.issue_ticket();
        let search = self.search.clone();
        let query = self.query.clone();
        self.tasks.spawn(async move {
            search.search_with(ticket, &query).await;
        });
        true
    }

    pub fn search_results(&self) -> Vec<Entity> {
        self.search.results()
    }

    /// Row labels of the current results, in order.
    pub fn result_labels(&self) -> Vec<String> {
        self.search
            .results()
            .iter()
            .map(presentation::result_label)
            .collect()
    }

    /// Activates a search result.
    ///
    /// Clears the list, restates the query and flies to the village.
    pub fn activate_result(&mut self, index: usize) -> bool {
        let Some(entity) = self.search.take(index) else {
            tracing::debug!("No search result at {}", index);
            return false;
        };

        self.query = entity.namobj.clone().unwrap_or_default();
        match FlyTarget::try_from(&entity) {
            Ok(target) => self.fly_to_target(target),
            Err(e) => tracing::warn!("Cannot fly to search result {}: {}", entity.id, e),
        }
        true
    }

    pub fn caption(&self) -> &Caption {
        &self.caption
    }

    pub fn caption_text(&self) -> String {
        self.caption.to_string()
    }

    pub fn detail_visible(&self) -> bool {
        self.detail.is_visible()
    }

    pub fn detail_record(&self) -> Option<DetailRecord> {
        self.detail.record()
    }

    /// Title and rows of the detail panel, if it is open.
    pub fn detail_panel(&self) -> Option<(String, Vec<DetailRow>)> {
        let record = self.detail.visible_record()?;
        Some((
            presentation::detail_title(&record).to_string(),
            presentation::detail_rows(&record.attributes),
        ))
    }

    pub fn close_detail_panel(&mut self) {
        self.detail.close_panel();
    }

    /// Waits for every fetch started so far.
    pub async fn settle(&mut self) {
        while let Some(result) = self.tasks.join_next().await {
            log_join_error(result);
        }
    }

    /// Tears down the map and aborts pending fetches.
    pub fn teardown(&mut self) {
        self.tasks.abort_all();
        self.view.teardown();
    }
}

fn log_join_error(result: std::result::Result<(), tokio::task::JoinError>) {
    if let Err(e) = result {
        if e.is_panic() {
            tracing::error!("Fetch task panicked: {}", e);
        }
    }
}
