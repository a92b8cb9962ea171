//! The observe loop: fetch, diff against the last known record, persist,
//! write artifacts, and report changes.

mod report;

use std::{sync::Arc, time::Duration};

use anyhow::Result;
use chrono::{DateTime, Local};
use tokio_util::sync::CancellationToken;

use crate::artifacts::{ArtifactStore, Downloader, RunContext};
use crate::db::Database;
use crate::detector;
use crate::error::{ArtifactKind, WatchError};
use crate::models::{format_timestamp, now_timestamp, timestamp_after, ChangeEvent, StateRecord};
use crate::run_log::RunLog;
use crate::scheduler::{PollCycle, PollScheduler, SchedulerStats};
use crate::session::{ProfileFetcher, Session};
use crate::settings::WatcherConfig;
use crate::{run_error, run_info, run_warn};

pub use report::CycleReport;

pub type Clock = Arc<dyn Fn() -> DateTime<Local> + Send + Sync>;

const TIMESTAMP_RETRY: Duration = Duration::from_millis(250);
const TIMESTAMP_ATTEMPTS: u32 = 8;

pub struct ProfileWatcher<F, D> {
    config: WatcherConfig,
    log: RunLog,
    db: Database,
    artifacts: ArtifactStore,
    session: Session<F>,
    downloader: D,
    /// Last record a change was measured against. Seeded from the store at
    /// startup and moved forward only when a change is detected.
    previous: Option<StateRecord>,
    last_timestamp: Option<String>,
    clock: Clock,
}

impl<F: ProfileFetcher, D: Downloader> ProfileWatcher<F, D> {
    /// Creates the run directory, opens the store, loads the last known
    /// record and logs in. A login failure ends the run here.
    pub async fn start(config: WatcherConfig, fetcher: F, downloader: D) -> Result<Self> {
        config.validate()?;

        let ctx = RunContext::create(&config.base_dir, now_timestamp())?;
        let log = RunLog::open(ctx.log_path())?;
        run_info!(log, "Run {} started, watching {}", ctx.run_id(), config.target);

        let db = match Database::new(config.database_path()) {
            Ok(db) => db,
            Err(err) => {
                let err = WatchError::Persistence(err);
                run_error!(log, "{err}");
                return Err(err.into());
            }
        };

        let previous = match db.latest_state().await {
            Ok(previous) => previous,
            Err(err) => {
                let err = WatchError::Persistence(err);
                run_error!(log, "{err}");
                return Err(err.into());
            }
        };
        match &previous {
            Some(record) => run_info!(log, "Loaded previous details from {}", record.timestamp),
            None => run_info!(log, "No previous details stored; the first observation sets the baseline"),
        }

        let session = match Session::establish(fetcher, config.fetch_timeout()).await {
            Ok(session) => session,
            Err(err) => {
                run_error!(log, "Failed to log in. Error: {err}");
                return Err(err.into());
            }
        };
        run_info!(log, "Logged in successfully.");

        let last_timestamp = previous.as_ref().map(|record| record.timestamp.clone());
        Ok(Self {
            config,
            artifacts: ArtifactStore::new(ctx, log.clone()),
            log,
            db,
            session,
            downloader,
            previous,
            last_timestamp,
            clock: Arc::new(Local::now),
        })
    }

    pub fn set_clock(&mut self, clock: Clock) {
        self.clock = clock;
    }

    pub fn run_context(&self) -> &RunContext {
        self.artifacts.context()
    }

    pub fn artifacts(&self) -> &ArtifactStore {
        &self.artifacts
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn previous(&self) -> Option<&StateRecord> {
        self.previous.as_ref()
    }

    pub fn session(&self) -> &Session<F> {
        &self.session
    }

    pub fn scheduler(&self) -> PollScheduler {
        PollScheduler::new(self.config.interval(), self.log.clone())
    }

    /// One fetch, diff, commit pass.
    ///
    /// A fetch or store failure aborts the cycle before anything is written
    /// or any change is reported. Artifact failures are logged and collected
    /// in the report; they never abort the cycle.
    pub async fn observe(&mut self) -> Result<CycleReport, WatchError> {
        let target = self.config.target.clone();
        let details = self.session.fetch(&target).await?;

        let timestamp = self.next_timestamp().await;
        let record = StateRecord::new(timestamp.clone(), details);
        let change = detector::diff(self.previous.as_ref(), &record);

        self.db
            .upsert_state(&record)
            .await
            .map_err(WatchError::Persistence)?;
        self.last_timestamp = Some(timestamp.clone());

        let mut report = CycleReport::new(record.clone(), change.clone());

        match self.session.fetch_raw_page(&target).await {
            Ok(html) => match self.artifacts.save_page(&timestamp, &html) {
                Ok(path) => report.page = Some(path),
                Err(err) => self.artifact_failed(&mut report, WatchError::artifact(ArtifactKind::Page, err)),
            },
            Err(err) => self.artifact_failed(&mut report, err),
        }

        match self
            .artifacts
            .commit_photo(&record.details, &timestamp, &self.downloader)
            .await
        {
            Ok(path) => report.photo = path,
            Err(err) => self.artifact_failed(&mut report, WatchError::artifact(ArtifactKind::Photo, err)),
        }

        match &change {
            Some(event) => {
                self.commit_change(event, &mut report).await;
                self.previous = Some(record.clone());
            }
            None if self.previous.is_none() => {
                self.previous = Some(record.clone());
            }
            None => {}
        }

        let details = &record.details;
        run_info!(
            self.log,
            "{} has {} followers, {} followings.",
            target,
            details.followers,
            details.followings
        );
        run_info!(self.log, "Bio: {}", details.bio);
        run_info!(self.log, "Profile Photo URL: {}", details.profile_photo_url);

        Ok(report)
    }

    /// Runs cycles until `cancel` fires, then closes the session.
    pub async fn run(
        mut self,
        scheduler: PollScheduler,
        cancel: CancellationToken,
    ) -> Result<SchedulerStats> {
        let stats = scheduler.run(&mut self, cancel).await;

        run_info!(
            self.log,
            "Stopping after {} cycles ({} failed)",
            stats.cycles,
            stats.failed
        );
        let log = self.log.clone();
        if let Err(err) = self.session.close().await {
            run_warn!(log, "Failed to close session cleanly: {err:#}");
        }
        Ok(stats)
    }

    async fn commit_change(&mut self, event: &ChangeEvent, report: &mut CycleReport) {
        let timestamp = event.timestamp.clone();
        run_info!(
            self.log,
            "Profile changed: {}",
            event.changed_fields().join(", ")
        );

        if event.avatar_changed() {
            match report.photo.clone() {
                Some(photo) => match self.artifacts.rotate_photo_slot(true, &photo, &timestamp) {
                    Ok(rotation) => {
                        if let Some(rotation) = rotation {
                            report.photo = Some(rotation.slot.clone());
                            report.rotation = Some(rotation);
                        }
                        run_info!(self.log, "Profile photo has changed.");
                    }
                    Err(err) => self.artifact_failed(report, WatchError::artifact(ArtifactKind::PhotoSlot, err)),
                },
                None => run_warn!(
                    self.log,
                    "Profile photo has changed but no new photo was saved; keeping the previous one"
                ),
            }
        }

        match self.session.fetch_screenshot().await {
            Ok(png) => match self.artifacts.save_screenshot(&timestamp, &png) {
                Ok(path) => report.screenshot = Some(path),
                Err(err) => self.artifact_failed(report, WatchError::artifact(ArtifactKind::Screenshot, err)),
            },
            Err(err) => self.artifact_failed(report, err),
        }

        match self.artifacts.write_change_record(event) {
            Ok(path) => report.change_record = Some(path),
            Err(err) => self.artifact_failed(report, WatchError::artifact(ArtifactKind::ChangeRecord, err)),
        }

        let record_path = report
            .change_record
            .as_ref()
            .map(|path| path.display().to_string());
        if let Err(err) = self.db.insert_change(event, record_path).await {
            run_error!(self.log, "{}", WatchError::Persistence(err));
        }
    }

    fn artifact_failed(&self, report: &mut CycleReport, err: WatchError) {
        run_error!(self.log, "{err}");
        report.artifact_errors.push(err);
    }

    /// A timestamp strictly after the last persisted one. Waits briefly for
    /// the clock to advance; if it does not, the key is bumped one second past
    /// the last so no history row or artifact is ever reused.
    async fn next_timestamp(&self) -> String {
        let Some(last) = self.last_timestamp.as_deref() else {
            return format_timestamp((self.clock)());
        };

        for _ in 0..TIMESTAMP_ATTEMPTS {
            let candidate = format_timestamp((self.clock)());
            if candidate.as_str() > last {
                return candidate;
            }
            tokio::time::sleep(TIMESTAMP_RETRY).await;
        }

        let candidate = format_timestamp((self.clock)());
        if candidate.as_str() > last {
            return candidate;
        }
        // Stored keys are validated on write, so `last` always parses.
        let bumped = timestamp_after(last).unwrap_or(candidate);
        run_warn!(
            self.log,
            "Clock has not advanced past {}; stamping this cycle {}",
            last,
            bumped
        );
        bumped
    }
}

impl<F: ProfileFetcher, D: Downloader> PollCycle for ProfileWatcher<F, D> {
    async fn run_cycle(&mut self) -> Result<(), WatchError> {
        self.observe().await.map(|_| ())
    }
}
