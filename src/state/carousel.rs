/// Carousel navigation and retrieval controller
///
/// The controller owns the three-slot state. Every load cycle is split in
/// two halves so the UI can run the network part as a background task:
///
/// 1. `begin_*` (sync) picks the dates, clears the slots and bumps the
///    generation counter, returning a `PendingLoad` future.
/// 2. `commit` (sync) maps the fetched records onto slots, but only if no
///    newer cycle started in the meantime and the controller is still bound.
///
/// Generations are drawn from one process-wide counter, so a cycle issued by
/// a torn-down instance can never match a fresh instance's latest cycle.

use chrono::{NaiveDate, Utc};
use futures::future::{BoxFuture, FutureExt};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::fallback::FallbackPool;
use super::slot::{self, SlotPosition, SlotValue};
use crate::archive::{ImageRecord, ImageService};
use crate::dates::{self, DateWindow};
use crate::error::{MissingRecordError, RetrievalError};

/// Title shown while a cycle is in flight
pub const LOADING_TITLE: &str = "Loading…";

/// Shared by every controller instance
static GENERATIONS: AtomicU64 = AtomicU64::new(0);

fn fresh_generation() -> u64 {
    GENERATIONS.fetch_add(1, Ordering::Relaxed) + 1
}

/// Source of the "today" upper bound
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

/// Archive days follow UTC
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Utc::now().date_naive()
    }
}

/// Clock pinned to one day
#[cfg(test)]
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDate);

#[cfg(test)]
impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}

/// Sampling windows for the random dates
#[derive(Debug, Clone, Copy)]
pub struct CarouselOptions {
    /// Startup neighbors come from `[today - years, today]`
    pub startup_window_years: u32,
    /// Substitute neighbors come from `[archive_launch, today]`
    pub archive_launch: NaiveDate,
}

impl Default for CarouselOptions {
    fn default() -> Self {
        Self {
            startup_window_years: 5,
            archive_launch: dates::archive_launch(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadPhase {
    Loading,
    Ready,
    Failed,
}

/// Everything the presentation shows
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CarouselState {
    /// Date bound to the date picker
    pub center_date: NaiveDate,
    pub before: SlotValue,
    pub current: SlotValue,
    pub next: SlotValue,
    /// Upper bound for this cycle, also the picker maximum
    pub today: NaiveDate,
    pub title: String,
    pub body: String,
    pub phase: LoadPhase,
    /// The next slot shows a random date instead of the following day
    pub next_is_substitute: bool,
    /// Full-resolution link for the current record, when the archive has one
    pub hd_url: Option<String>,
}

impl CarouselState {
    fn loading(center_date: NaiveDate, today: NaiveDate) -> Self {
        Self {
            center_date,
            before: SlotValue::Empty,
            current: SlotValue::Empty,
            next: SlotValue::Empty,
            today,
            title: LOADING_TITLE.to_string(),
            body: String::new(),
            phase: LoadPhase::Loading,
            next_is_substitute: false,
            hd_url: None,
        }
    }

    pub fn slot(&self, position: SlotPosition) -> &SlotValue {
        match position {
            SlotPosition::Before => &self.before,
            SlotPosition::Current => &self.current,
            SlotPosition::Next => &self.next,
        }
    }
}

/// Raw outcome of a cycle's network half
#[derive(Debug, Clone)]
pub enum Fetched {
    Startup {
        current: Result<ImageRecord, RetrievalError>,
        /// `None` when no date could be sampled
        before: Option<Result<ImageRecord, RetrievalError>>,
        next: Option<Result<ImageRecord, RetrievalError>>,
    },
    Update {
        prev: NaiveDate,
        center: NaiveDate,
        next_raw: NaiveDate,
        outcome: Result<UpdateRecords, RetrievalError>,
    },
}

/// Records gathered by a successful update
#[derive(Debug, Clone)]
pub struct UpdateRecords {
    pub range: Vec<ImageRecord>,
    /// Fetched only when the range had nothing for the following day
    pub substitute: Option<ImageRecord>,
}

/// Network half of a load cycle
pub struct PendingLoad {
    pub generation: u64,
    pub future: BoxFuture<'static, Fetched>,
}

impl std::fmt::Debug for PendingLoad {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingLoad")
            .field("generation", &self.generation)
            .finish()
    }
}

/// One carousel instance
pub struct CarouselController {
    service: Arc<dyn ImageService>,
    pool: FallbackPool,
    clock: Arc<dyn Clock>,
    options: CarouselOptions,
    rng: StdRng,
    state: CarouselState,
    generation: u64,
    bound: bool,
}

impl CarouselController {
    pub fn new(
        service: Arc<dyn ImageService>,
        pool: FallbackPool,
        clock: Arc<dyn Clock>,
        options: CarouselOptions,
    ) -> Self {
        let today = clock.today();
        Self {
            service,
            pool,
            clock,
            options,
            rng: StdRng::from_os_rng(),
            state: CarouselState::loading(today, today),
            generation: fresh_generation(),
            bound: true,
        }
    }

    pub fn state(&self) -> &CarouselState {
        &self.state
    }

    /// Show today, flanked by two unrelated random dates
    pub fn begin_startup(&mut self) -> PendingLoad {
        let today = self.clock.today();
        let generation = self.next_generation();
        self.state = CarouselState::loading(today, today);

        let window = DateWindow::trailing_years(today, self.options.startup_window_years);
        let mut excluding: HashSet<NaiveDate> = [today].into_iter().collect();
        let before_date = dates::sample_uniform(&mut self.rng, window, &excluding);
        excluding.extend(before_date);
        let next_date = dates::sample_uniform(&mut self.rng, window, &excluding);

        log::debug!(
            "Startup #{}: today {}, neighbors {:?} / {:?}",
            generation,
            dates::format(today),
            before_date.map(dates::format),
            next_date.map(dates::format)
        );

        let service = Arc::clone(&self.service);
        let future = async move {
            let current = service.fetch_single(today).await;
            let (before, next) = futures::future::join(
                fetch_optional(service.as_ref(), before_date),
                fetch_optional(service.as_ref(), next_date),
            )
            .await;
            Fetched::Startup { current, before, next }
        }
        .boxed();

        PendingLoad { generation, future }
    }

    /// Show `center` with its chronological neighbors
    ///
    /// Dates after today are clamped to today.
    pub fn begin_update(&mut self, center: NaiveDate) -> PendingLoad {
        let today = self.clock.today();
        let center = dates::clamp_to_upper_bound(center, today);
        let prev = dates::add_days(center, -1);
        let next_raw = dates::add_days(center, 1);
        let next_clamped = dates::clamp_to_upper_bound(next_raw, today);

        let generation = self.next_generation();
        self.state = CarouselState::loading(center, today);

        // Drawn up front so the future needs no RNG; only used on a gap
        let excluding: HashSet<NaiveDate> = [prev, center, next_raw, today].into_iter().collect();
        let substitute_date = dates::sample_uniform(
            &mut self.rng,
            DateWindow::since(self.options.archive_launch, today),
            &excluding,
        );

        log::debug!(
            "Update #{}: range {}..={} around {}",
            generation,
            dates::format(prev),
            dates::format(next_clamped),
            dates::format(center)
        );

        let service = Arc::clone(&self.service);
        let future = async move {
            let outcome = fetch_neighborhood(service.as_ref(), prev, next_clamped, next_raw, substitute_date).await;
            Fetched::Update {
                prev,
                center,
                next_raw,
                outcome,
            }
        }
        .boxed();

        PendingLoad { generation, future }
    }

    /// React to a click on a slot
    ///
    /// Only populated before/next slots navigate; everything else is inert.
    pub fn click(&mut self, position: SlotPosition) -> Option<PendingLoad> {
        if !self.bound {
            return None;
        }
        let target = match position {
            SlotPosition::Before | SlotPosition::Next => self.state.slot(position).navigable_date()?,
            SlotPosition::Current => return None,
        };
        Some(self.begin_update(target))
    }

    /// Apply a finished cycle
    ///
    /// Returns `false` when the result was stale and discarded.
    pub fn commit(&mut self, generation: u64, fetched: Fetched) -> bool {
        if !self.bound {
            log::info!("Discarding cycle #{} for an unbound carousel", generation);
            return false;
        }
        if generation != self.generation {
            log::info!(
                "Discarding stale cycle #{} (latest is #{})",
                generation,
                self.generation
            );
            return false;
        }

        if let Fetched::Update { center, .. } = &fetched {
            if *center != self.state.center_date {
                log::info!(
                    "Discarding cycle #{} for {} while showing {}",
                    generation,
                    dates::format(*center),
                    dates::format(self.state.center_date)
                );
                return false;
            }
        }

        match fetched {
            Fetched::Startup { current, before, next } => self.apply_startup(current, before, next),
            Fetched::Update {
                prev,
                center,
                next_raw,
                outcome,
            } => match outcome {
                Ok(records) => self.apply_update(prev, center, next_raw, records),
                Err(err) => self.apply_failure(&err),
            },
        }
        true
    }

    /// Unbind navigation and drop any cycle still in flight
    pub fn teardown(&mut self) {
        self.bound = false;
        self.generation = fresh_generation();
        log::debug!("Carousel torn down at generation #{}", self.generation);
    }

    fn next_generation(&mut self) -> u64 {
        self.generation = fresh_generation();
        self.generation
    }

    fn apply_startup(
        &mut self,
        current: Result<ImageRecord, RetrievalError>,
        before: Option<Result<ImageRecord, RetrievalError>>,
        next: Option<Result<ImageRecord, RetrievalError>>,
    ) {
        match current {
            Ok(record) => self.show_current(&record),
            Err(err) => {
                log::warn!("Today's record unavailable: {}", err);
                self.state.current = slot::from_absence(&self.pool, &mut self.rng);
                self.state.title = err.to_string();
                self.state.body.clear();
                self.state.phase = LoadPhase::Failed;
            }
        }

        let before = settle(before, "before");
        let next = settle(next, "next");
        self.state.before = slot::from_option(before.as_ref(), &self.pool, &mut self.rng);
        self.state.next = slot::from_option(next.as_ref(), &self.pool, &mut self.rng);
    }

    fn apply_update(&mut self, prev: NaiveDate, center: NaiveDate, next_raw: NaiveDate, records: UpdateRecords) {
        let find = |date: NaiveDate| records.range.iter().find(|r| r.date == date);

        let before = find(prev);
        if before.is_none() {
            log::info!("{}", MissingRecordError { date: prev });
        }
        self.state.before = slot::from_option(before, &self.pool, &mut self.rng);

        match find(center) {
            Some(record) => self.show_current(record),
            None => {
                let missing = MissingRecordError { date: center };
                log::warn!("{}", missing);
                self.state.current = slot::from_absence(&self.pool, &mut self.rng);
                self.state.title = missing.to_string();
                self.state.body.clear();
                self.state.phase = LoadPhase::Failed;
            }
        }

        let (next, is_substitute) = match find(next_raw).filter(|r| r.display_ref().is_some()) {
            Some(record) => (Some(record), false),
            None => (records.substitute.as_ref(), records.substitute.is_some()),
        };
        if next.is_none() {
            log::info!("{}", MissingRecordError { date: next_raw });
        }
        self.state.next = slot::from_option(next, &self.pool, &mut self.rng);
        self.state.next_is_substitute = is_substitute && !self.state.next.is_fallback();
    }

    /// Abandon the cycle: every slot becomes a placeholder
    fn apply_failure(&mut self, err: &RetrievalError) {
        log::warn!("Update failed: {}", err);
        self.state.before = slot::from_absence(&self.pool, &mut self.rng);
        self.state.current = slot::from_absence(&self.pool, &mut self.rng);
        self.state.next = slot::from_absence(&self.pool, &mut self.rng);
        self.state.title = err.to_string();
        self.state.body.clear();
        self.state.phase = LoadPhase::Failed;
        self.state.next_is_substitute = false;
        self.state.hd_url = None;
    }

    fn show_current(&mut self, record: &ImageRecord) {
        self.state.current = slot::from_record(record, &self.pool, &mut self.rng);
        self.state.title = record.title.clone();
        self.state.body = record.body_text();
        self.state.hd_url = record.hdurl.clone().filter(|url| !url.trim().is_empty());
        self.state.phase = LoadPhase::Ready;
    }
}

#[cfg(test)]
impl CarouselController {
    /// Replace the RNG, e.g. with a seeded one
    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = rng;
        self
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_bound(&self) -> bool {
        self.bound
    }

    /// Await a pending cycle and commit it
    pub async fn run(&mut self, pending: PendingLoad) -> bool {
        let PendingLoad { generation, future } = pending;
        let fetched = future.await;
        self.commit(generation, fetched)
    }

    pub async fn startup(&mut self) -> bool {
        let pending = self.begin_startup();
        self.run(pending).await
    }

    pub async fn update(&mut self, center: NaiveDate) -> bool {
        let pending = self.begin_update(center);
        self.run(pending).await
    }
}

impl std::fmt::Debug for CarouselController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CarouselController")
            .field("state", &self.state)
            .field("generation", &self.generation)
            .field("bound", &self.bound)
            .finish()
    }
}

/// Range fetch plus, on a trailing gap, one substitute fetch
///
/// Any failure aborts the whole cycle.
async fn fetch_neighborhood(
    service: &dyn ImageService,
    prev: NaiveDate,
    next_clamped: NaiveDate,
    next_raw: NaiveDate,
    substitute_date: Option<NaiveDate>,
) -> Result<UpdateRecords, RetrievalError> {
    let range = service.fetch_range(prev, next_clamped).await?;

    // A record without a display reference counts as a gap
    let substitute = if range.iter().any(|r| r.date == next_raw && r.display_ref().is_some()) {
        None
    } else if let Some(date) = substitute_date {
        log::debug!("No record for {}, substituting {}", dates::format(next_raw), dates::format(date));
        Some(service.fetch_single(date).await?)
    } else {
        None
    };

    Ok(UpdateRecords { range, substitute })
}

async fn fetch_optional(
    service: &dyn ImageService,
    date: Option<NaiveDate>,
) -> Option<Result<ImageRecord, RetrievalError>> {
    match date {
        Some(date) => Some(service.fetch_single(date).await),
        None => None,
    }
}

/// Collapse a side fetch to the record it produced, logging failures
fn settle(result: Option<Result<ImageRecord, RetrievalError>>, label: &str) -> Option<ImageRecord> {
    match result? {
        Ok(record) => Some(record),
        Err(err) => {
            log::warn!("Startup {} fetch failed: {}", label, err);
            None
        }
    }
}
