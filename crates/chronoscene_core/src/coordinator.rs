// SPDX-License-Identifier: MIT OR Apache-2.0
//! Scene composition against a single global timeline.
//!
//! The [`SceneCoordinator`] owns the set of active [`TemporalObject`]s,
//! propagates every timeline change to all of them in sequence, rebroadcasts
//! stacking order, tracks an optional camera lock, and notifies registered
//! time listeners. It is an explicit context object: the host creates one,
//! drives it, and tears it down.

use crate::error::{SceneError, SceneResult};
use crate::object::{ModelFactory, TemporalObject};
use chrono::{DateTime, Duration, Utc};
use chronoscene_render::{
    LoadingIndicator, RenderableHandle, ResolutionLookup, SceneBackend, SourceId,
};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Identifier of a scene entry.
///
/// Allocated from a strictly increasing counter; never reused while the
/// coordinator lives, even after the entry is removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntryId(pub u64);

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Callback invoked with the global time on every timeline change.
pub type TimeListener = Box<dyn Fn(DateTime<Utc>) + Send + Sync>;

/// One registered object with its composition parameters.
pub struct SceneEntry {
    /// Originating data source
    pub source: SourceId,
    /// Start of the covered time range
    pub start: DateTime<Utc>,
    /// End of the covered time range
    pub end: DateTime<Utc>,
    /// Sampling cadence the series was built with
    pub cadence: Duration,
    /// Caller-assigned stacking order
    pub order: usize,
    /// The object itself
    pub object: TemporalObject,
}

/// Coordinates temporal objects, the global timeline, stacking order, and
/// camera-lock state.
pub struct SceneCoordinator {
    backend: Arc<dyn SceneBackend>,
    models: Arc<dyn ModelFactory>,
    resolutions: Arc<dyn ResolutionLookup>,
    loading: Arc<dyn LoadingIndicator>,
    entries: IndexMap<EntryId, SceneEntry>,
    next_id: u64,
    global_time: DateTime<Utc>,
    camera_lock: Option<EntryId>,
    listeners: Vec<TimeListener>,
}

impl SceneCoordinator {
    /// Create a coordinator over the given collaborators.
    ///
    /// The global time starts at the wall clock and is re-seated to the
    /// first added entry's start time.
    pub fn new(
        backend: Arc<dyn SceneBackend>,
        models: Arc<dyn ModelFactory>,
        resolutions: Arc<dyn ResolutionLookup>,
        loading: Arc<dyn LoadingIndicator>,
    ) -> Self {
        Self {
            backend,
            models,
            resolutions,
            loading,
            entries: IndexMap::new(),
            next_id: 0,
            global_time: Utc::now(),
            camera_lock: None,
            listeners: Vec::new(),
        }
    }

    /// Compose a new object into the scene.
    ///
    /// Builds a [`TemporalObject`] for `source` over `[start, end]` at
    /// `cadence` and `scale`, attaches its renderable, synchronizes it to
    /// the current global time, and rebroadcasts stacking order. The very
    /// first entry ever added also seats the camera on the object and sets
    /// the global time to `start`.
    ///
    /// The loading indicator is started before and stopped after the
    /// attempt, on failure included; creation errors propagate unchanged.
    pub async fn add_to_scene(
        &mut self,
        source: SourceId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        cadence: Duration,
        scale: f32,
        layer_order: usize,
    ) -> SceneResult<EntryId> {
        self.loading.start();
        let result = self
            .add_inner(source, start, end, cadence, scale, layer_order)
            .await;
        self.loading.stop();
        result
    }

    async fn add_inner(
        &mut self,
        source: SourceId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        cadence: Duration,
        scale: f32,
        layer_order: usize,
    ) -> SceneResult<EntryId> {
        let mut object = self
            .models
            .create_object(source, start, end, cadence, scale)
            .await?;
        let renderable = object.renderable().await?;
        self.backend.add_model(renderable.clone());

        if self.next_id == 0 {
            // Seat the viewpoint and timeline on the very first object.
            self.backend.move_camera(object.observer_position());
            self.backend.point_camera(renderable.position());
            self.global_time = start;
        }
        object.set_time(self.global_time).await?;

        let id = EntryId(self.next_id);
        self.next_id += 1;
        self.entries.insert(
            id,
            SceneEntry {
                source,
                start,
                end,
                cadence,
                order: layer_order,
                object,
            },
        );
        self.broadcast_stacking().await?;

        tracing::info!("Added {} as entry {} covering {} to {}", source, id, start, end);
        Ok(id)
    }

    /// Remove an entry and detach its renderable.
    ///
    /// Suspends until the handle is resolved; a camera lock pointing at the
    /// removed entry is cleared.
    pub async fn remove_from_scene(&mut self, id: EntryId) -> SceneResult<()> {
        let entry = self
            .entries
            .shift_remove(&id)
            .ok_or(SceneError::UnknownEntry(id))?;
        let renderable = entry.object.renderable().await?;
        self.backend.remove_model(&renderable);

        if self.camera_lock == Some(id) {
            self.camera_lock = None;
            tracing::debug!("Camera lock cleared with entry {}", id);
        }
        tracing::info!("Removed entry {} ({})", id, entry.source);
        Ok(())
    }

    /// Rebuild every entry at a new resolution, atomically.
    ///
    /// All replacement objects are staged first: created at the looked-up
    /// scale, synchronized to the current global time, handles resolved.
    /// Only when every stage succeeded are handles swapped in the backend
    /// and the entry table rewritten in place, preserving ids and stacking
    /// orders. A staging failure drops the staged objects and leaves the
    /// scene untouched.
    pub async fn set_resolution(&mut self, resolution: u32) -> SceneResult<()> {
        if self.entries.is_empty() {
            return Ok(());
        }
        self.loading.start();
        let result = self.swap_resolution(resolution).await;
        self.loading.stop();
        result
    }

    async fn swap_resolution(&mut self, resolution: u32) -> SceneResult<()> {
        let mut staged: Vec<(EntryId, TemporalObject, RenderableHandle)> = Vec::new();
        for (&id, entry) in &self.entries {
            let scale = self.resolutions.scale_for(resolution, entry.source);
            let mut object = self
                .models
                .create_object(entry.source, entry.start, entry.end, entry.cadence, scale)
                .await?;
            object.set_time(self.global_time).await?;
            let renderable = object.renderable().await?;
            staged.push((id, object, renderable));
        }

        for (id, object, renderable) in staged {
            self.backend.add_model(renderable);
            if let Some(entry) = self.entries.get_mut(&id) {
                let old = entry.object.renderable().await?;
                self.backend.remove_model(&old);
                entry.object = object;
            }
        }
        self.broadcast_stacking().await?;

        tracing::info!(
            "Rebuilt {} entries at resolution {}",
            self.entries.len(),
            resolution
        );
        Ok(())
    }

    /// Move the global timeline.
    ///
    /// Every entry is synchronized in sequence; only after the last one
    /// completes is a locked camera repositioned, and only then are time
    /// listeners notified. Exclusive borrowing serializes competing time
    /// updates on one coordinator.
    pub async fn set_time(&mut self, time: DateTime<Utc>) -> SceneResult<()> {
        self.global_time = time;
        for entry in self.entries.values_mut() {
            entry.object.set_time(time).await?;
        }

        // The camera must reflect the freshly resolved positions.
        if let Some(id) = self.camera_lock {
            if let Some(entry) = self.entries.get(&id) {
                self.backend.move_camera(entry.object.observer_position());
                self.backend.point_camera(entry.object.position().await?);
            }
        }

        for listener in &self.listeners {
            listener(time);
        }
        Ok(())
    }

    /// Re-synchronize everything against the current global time.
    pub async fn refresh(&mut self) -> SceneResult<()> {
        self.set_time(self.global_time).await
    }

    /// Current global time.
    pub fn get_time(&self) -> DateTime<Utc> {
        self.global_time
    }

    /// `[min(start), max(end)]` across all entries.
    ///
    /// Errors with [`SceneError::EmptyScene`] when nothing is registered.
    pub fn get_time_range(&self) -> SceneResult<(DateTime<Utc>, DateTime<Utc>)> {
        let mut entries = self.entries.values();
        let first = entries.next().ok_or(SceneError::EmptyScene)?;
        let mut range = (first.start, first.end);
        for entry in entries {
            range.0 = range.0.min(entry.start);
            range.1 = range.1.max(entry.end);
        }
        Ok(range)
    }

    /// Track an entry with the camera on every timeline change.
    pub fn lock_camera(&mut self, id: EntryId) -> SceneResult<()> {
        if !self.entries.contains_key(&id) {
            return Err(SceneError::UnknownEntry(id));
        }
        self.camera_lock = Some(id);
        tracing::debug!("Camera locked to entry {}", id);
        Ok(())
    }

    /// Stop tracking; the camera stays where it is.
    pub fn unlock_camera(&mut self) {
        self.camera_lock = None;
    }

    /// Entry the camera is locked to, if any.
    pub fn camera_lock(&self) -> Option<EntryId> {
        self.camera_lock
    }

    /// Register a timeline listener.
    ///
    /// Replay-on-subscribe: the listener is invoked synchronously once with
    /// the current global time before this returns, so late subscribers see
    /// current state without polling.
    pub fn register_time_listener(
        &mut self,
        listener: impl Fn(DateTime<Utc>) + Send + Sync + 'static,
    ) {
        listener(self.global_time);
        self.listeners.push(Box::new(listener));
    }

    /// Set opacity on an entry's object.
    ///
    /// Validates the id and the `[0, 1]` range before forwarding.
    pub async fn set_opacity(&self, id: EntryId, value: f32) -> SceneResult<()> {
        let entry = self.entries.get(&id).ok_or(SceneError::UnknownEntry(id))?;
        entry.object.set_opacity(value).await
    }

    /// Number of registered entries.
    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    /// Whether an entry id is registered.
    pub fn contains(&self, id: EntryId) -> bool {
        self.entries.contains_key(&id)
    }

    /// Get an entry.
    pub fn entry(&self, id: EntryId) -> Option<&SceneEntry> {
        self.entries.get(&id)
    }

    /// All entries in registration order.
    pub fn entries(&self) -> impl Iterator<Item = (EntryId, &SceneEntry)> {
        self.entries.iter().map(|(&id, entry)| (id, entry))
    }

    /// Push `(order, total)` to every entry's renderable.
    ///
    /// Pure broadcast in entry iteration order; the caller-assigned orders
    /// determine visual stacking downstream, nothing is sorted here.
    async fn broadcast_stacking(&self) -> SceneResult<()> {
        let total = self.entries.len();
        for entry in self.entries.values() {
            entry.object.set_layer_order(entry.order, total).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{
        t0, CountingIndicator, FixedResolutionLookup, RecordingBackend, ScriptedModelFactory,
    };
    use glam::Vec3;
    use parking_lot::Mutex;

    struct Fixture {
        backend: Arc<RecordingBackend>,
        models: Arc<ScriptedModelFactory>,
        loading: Arc<CountingIndicator>,
        coordinator: SceneCoordinator,
    }

    fn fixture() -> Fixture {
        let backend = Arc::new(RecordingBackend::default());
        let models = Arc::new(ScriptedModelFactory::new());
        let loading = Arc::new(CountingIndicator::default());
        let coordinator = SceneCoordinator::new(
            backend.clone(),
            models.clone(),
            Arc::new(FixedResolutionLookup),
            loading.clone(),
        );
        Fixture {
            backend,
            models,
            loading,
            coordinator,
        }
    }

    fn secs(value: i64) -> Duration {
        Duration::seconds(value)
    }

    /// Add a source covering `[t0 + start, t0 + end]` at a 5 s cadence.
    async fn add(fixture: &mut Fixture, source: u32, start: i64, end: i64, order: usize) -> EntryId {
        fixture
            .coordinator
            .add_to_scene(
                SourceId(source),
                t0() + secs(start),
                t0() + secs(end),
                secs(5),
                1.0,
                order,
            )
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_first_add_seats_camera_and_timeline() {
        let mut fixture = fixture();
        let id = add(&mut fixture, 1, 0, 10, 0).await;

        assert_eq!(id, EntryId(0));
        assert_eq!(fixture.backend.model_count(), 1);
        assert_eq!(fixture.coordinator.get_time(), t0());
        assert_eq!(fixture.loading.counts(), (1, 1));
        // Camera seated on the first sample's facing position and the
        // renderable's world position.
        assert_eq!(fixture.backend.last_camera_move(), Some(Vec3::new(0.0, 1.0, 0.0)));
        assert_eq!(
            fixture.backend.last_camera_point(),
            Some(Vec3::new(10.0, 0.0, 0.0))
        );
    }

    #[tokio::test]
    async fn test_second_add_keeps_timeline() {
        let mut fixture = fixture();
        add(&mut fixture, 1, 0, 10, 0).await;
        let moves_before = fixture.backend.camera_moves.lock().len();
        add(&mut fixture, 2, 5, 20, 1).await;

        assert_eq!(fixture.coordinator.get_time(), t0());
        assert_eq!(fixture.backend.camera_moves.lock().len(), moves_before);
    }

    #[tokio::test]
    async fn test_identifier_monotonicity() {
        let mut fixture = fixture();
        let first = add(&mut fixture, 1, 0, 10, 0).await;
        let second = add(&mut fixture, 2, 0, 10, 1).await;
        fixture.coordinator.remove_from_scene(first).await.unwrap();
        let third = add(&mut fixture, 3, 0, 10, 2).await;

        assert_eq!(first, EntryId(0));
        assert_eq!(second, EntryId(1));
        assert_eq!(third, EntryId(2));
    }

    #[tokio::test]
    async fn test_time_range() {
        let mut fixture = fixture();
        add(&mut fixture, 1, 2, 5, 0).await;
        add(&mut fixture, 2, 1, 9, 1).await;
        add(&mut fixture, 3, 3, 4, 2).await;

        let (start, end) = fixture.coordinator.get_time_range().unwrap();
        assert_eq!(start, t0() + secs(1));
        assert_eq!(end, t0() + secs(9));
    }

    #[tokio::test]
    async fn test_time_range_empty_errors() {
        let fixture = fixture();
        assert!(matches!(
            fixture.coordinator.get_time_range(),
            Err(SceneError::EmptyScene)
        ));
    }

    #[tokio::test]
    async fn test_listener_replay() {
        let mut fixture = fixture();
        add(&mut fixture, 1, 0, 10, 0).await;
        fixture.coordinator.set_time(t0() + secs(7)).await.unwrap();

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        fixture
            .coordinator
            .register_time_listener(move |time| sink.lock().push(time));

        assert_eq!(*seen.lock(), vec![t0() + secs(7)]);
    }

    #[tokio::test]
    async fn test_set_time_notifies_listeners_in_order() {
        let mut fixture = fixture();
        add(&mut fixture, 1, 0, 10, 0).await;

        let seen = Arc::new(Mutex::new(Vec::new()));
        for tag in ["a", "b"] {
            let sink = seen.clone();
            fixture
                .coordinator
                .register_time_listener(move |time| sink.lock().push((tag, time)));
        }
        seen.lock().clear();

        fixture.coordinator.set_time(t0() + secs(5)).await.unwrap();
        assert_eq!(
            *seen.lock(),
            vec![("a", t0() + secs(5)), ("b", t0() + secs(5))]
        );
    }

    #[tokio::test]
    async fn test_locked_camera_tracks_resolved_position() {
        let mut fixture = fixture();
        add(&mut fixture, 1, 0, 10, 0).await;
        let id = add(&mut fixture, 2, 0, 20, 1).await;
        fixture.coordinator.lock_camera(id).unwrap();

        fixture.coordinator.set_time(t0() + secs(7)).await.unwrap();

        // Nearest sample for the locked entry is at +5 s; the camera must
        // reflect the freshly resolved facing position, not a stale one.
        assert_eq!(
            fixture.backend.last_camera_move(),
            Some(Vec3::new(5.0, 2.0, 0.0))
        );
        assert_eq!(
            fixture.backend.last_camera_point(),
            Some(Vec3::new(20.0, 0.0, 0.0))
        );
    }

    #[tokio::test]
    async fn test_refresh_idempotent() {
        let mut fixture = fixture();
        add(&mut fixture, 1, 0, 10, 0).await;
        let id = add(&mut fixture, 2, 0, 20, 1).await;
        fixture.coordinator.lock_camera(id).unwrap();
        fixture.coordinator.set_time(t0() + secs(12)).await.unwrap();

        fixture.coordinator.refresh().await.unwrap();
        let resolved_first: Vec<_> = fixture
            .coordinator
            .entries()
            .map(|(_, entry)| entry.object.resolved_sample().timestamp)
            .collect();
        let camera_first = fixture.backend.last_camera_move();

        fixture.coordinator.refresh().await.unwrap();
        let resolved_second: Vec<_> = fixture
            .coordinator
            .entries()
            .map(|(_, entry)| entry.object.resolved_sample().timestamp)
            .collect();

        assert_eq!(resolved_first, resolved_second);
        assert_eq!(fixture.backend.last_camera_move(), camera_first);
        assert_eq!(fixture.coordinator.get_time(), t0() + secs(12));
    }

    #[tokio::test]
    async fn test_add_failure_stops_loading_and_propagates() {
        let mut fixture = fixture();
        fixture.models.fail_from(0);
        let result = fixture
            .coordinator
            .add_to_scene(SourceId(1), t0(), t0() + secs(10), secs(5), 1.0, 0)
            .await;

        assert!(matches!(result, Err(SceneError::Source { .. })));
        assert_eq!(fixture.loading.counts(), (1, 1));
        assert_eq!(fixture.coordinator.entry_count(), 0);
        assert_eq!(fixture.backend.model_count(), 0);
    }

    #[tokio::test]
    async fn test_remove_unknown_errors() {
        let mut fixture = fixture();
        assert!(matches!(
            fixture.coordinator.remove_from_scene(EntryId(3)).await,
            Err(SceneError::UnknownEntry(EntryId(3)))
        ));
    }

    #[tokio::test]
    async fn test_remove_detaches_and_clears_lock() {
        let mut fixture = fixture();
        let id = add(&mut fixture, 1, 0, 10, 0).await;
        fixture.coordinator.lock_camera(id).unwrap();

        fixture.coordinator.remove_from_scene(id).await.unwrap();
        assert_eq!(fixture.backend.model_count(), 0);
        assert_eq!(fixture.coordinator.camera_lock(), None);
        assert_eq!(fixture.coordinator.entry_count(), 0);
    }

    #[tokio::test]
    async fn test_lock_camera_validates_id() {
        let mut fixture = fixture();
        assert!(matches!(
            fixture.coordinator.lock_camera(EntryId(9)),
            Err(SceneError::UnknownEntry(EntryId(9)))
        ));
    }

    #[tokio::test]
    async fn test_set_resolution_swaps_preserving_ids() {
        let mut fixture = fixture();
        let first = add(&mut fixture, 1, 0, 10, 0).await;
        let second = add(&mut fixture, 2, 0, 20, 1).await;
        fixture.coordinator.set_time(t0() + secs(6)).await.unwrap();

        fixture.coordinator.set_resolution(2048).await.unwrap();

        // Looked-up scale applied to every rebuilt entry.
        let scales = fixture.models.requested_scales.lock().clone();
        assert_eq!(&scales[2..], &[2.0, 2.0]);
        // Same ids, same orders, new objects synchronized to the timeline.
        assert!(fixture.coordinator.contains(first));
        assert!(fixture.coordinator.contains(second));
        assert_eq!(fixture.backend.model_count(), 2);
        let entry = fixture.coordinator.entry(first).unwrap();
        assert_eq!(entry.order, 0);
        assert_eq!(
            entry.object.resolved_sample().timestamp,
            t0() + secs(5),
        );
        // Old handles were detached.
        let old: RenderableHandle = fixture.models.renderables.created()[0].clone();
        assert!(!fixture
            .backend
            .models
            .lock()
            .iter()
            .any(|held| Arc::ptr_eq(held, &old)));
    }

    #[tokio::test]
    async fn test_set_resolution_failure_leaves_scene_untouched() {
        let mut fixture = fixture();
        let first = add(&mut fixture, 1, 0, 10, 0).await;
        add(&mut fixture, 2, 0, 20, 1).await;
        // First staged rebuild succeeds, the second fails.
        fixture.models.fail_from(3);

        let result = fixture.coordinator.set_resolution(2048).await;
        assert!(matches!(result, Err(SceneError::Source { .. })));

        // Original handles still attached, originals still in the table.
        assert_eq!(fixture.backend.model_count(), 2);
        let original: RenderableHandle = fixture.models.renderables.created()[0].clone();
        assert!(fixture
            .backend
            .models
            .lock()
            .iter()
            .any(|held| Arc::ptr_eq(held, &original)));
        let entry = fixture.coordinator.entry(first).unwrap();
        let held = entry.object.renderable().await.unwrap();
        assert!(Arc::ptr_eq(&held, &original));
        // Loading indicator still paired.
        assert_eq!(fixture.loading.counts(), (3, 3));
    }

    #[tokio::test]
    async fn test_stacking_broadcast_sends_order_and_total() {
        let mut fixture = fixture();
        add(&mut fixture, 1, 0, 10, 3).await;
        add(&mut fixture, 2, 0, 10, 1).await;

        let renderables = fixture.models.renderables.created();
        assert_eq!(
            renderables[0].state.lock().layer_orders.last().copied(),
            Some((3, 2))
        );
        assert_eq!(
            renderables[1].state.lock().layer_orders.last().copied(),
            Some((1, 2))
        );
    }

    #[tokio::test]
    async fn test_set_opacity_validates_id_and_range() {
        let mut fixture = fixture();
        let id = add(&mut fixture, 1, 0, 10, 0).await;

        assert!(matches!(
            fixture.coordinator.set_opacity(EntryId(9), 0.5).await,
            Err(SceneError::UnknownEntry(EntryId(9)))
        ));
        assert!(matches!(
            fixture.coordinator.set_opacity(id, -0.1).await,
            Err(SceneError::InvalidOpacity(_))
        ));
        fixture.coordinator.set_opacity(id, 0.5).await.unwrap();
    }
}
