use std::sync::Arc;

use storage::repository::{ProfileRepository, Storage};

use crate::Clock;
use crate::audio::AudioPlayer;
use crate::config::{RemoteConfig, SessionConfig};
use crate::error::AppServicesError;
use crate::remote::RemoteBackend;
use crate::report::{CompletedLessons, CompletionReporter};
use crate::sessions::LessonLoopService;

/// Assembles app-facing services over one storage backend.
#[derive(Clone)]
pub struct AppServices {
    lesson_loop: Arc<LessonLoopService>,
    profiles: Arc<dyn ProfileRepository>,
    completed: CompletedLessons,
}

impl AppServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError::Sqlite` if the database cannot be opened or migrated.
    pub async fn new_sqlite(
        db_url: &str,
        clock: Clock,
        config: SessionConfig,
    ) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        Ok(Self::from_storage(&storage, clock, config))
    }

    /// Build services backed by the REST API.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError::Remote` if the HTTP client cannot be built.
    pub fn new_remote(
        remote: RemoteConfig,
        clock: Clock,
        config: SessionConfig,
    ) -> Result<Self, AppServicesError> {
        let backend = RemoteBackend::new(remote)?;
        Ok(Self::from_storage(&Storage::from_repo(backend), clock, config))
    }

    #[must_use]
    pub fn from_storage(storage: &Storage, clock: Clock, config: SessionConfig) -> Self {
        let completed = CompletedLessons::new();
        let reporter = CompletionReporter::new(
            clock,
            Arc::clone(&storage.progress),
            Arc::clone(&storage.profiles),
        )
        .with_completed(completed.clone());
        let lesson_loop = Arc::new(LessonLoopService::new(
            clock,
            config,
            Arc::clone(&storage.lessons),
            Arc::clone(&storage.profiles),
            reporter,
        ));

        Self {
            lesson_loop,
            profiles: Arc::clone(&storage.profiles),
            completed,
        }
    }

    /// Route feedback sounds to `audio`.
    #[must_use]
    pub fn with_audio(mut self, audio: Arc<dyn AudioPlayer>) -> Self {
        let lesson_loop = (*self.lesson_loop).clone().with_audio(audio);
        self.lesson_loop = Arc::new(lesson_loop);
        self
    }

    #[must_use]
    pub fn lesson_loop(&self) -> Arc<LessonLoopService> {
        Arc::clone(&self.lesson_loop)
    }

    #[must_use]
    pub fn profiles(&self) -> Arc<dyn ProfileRepository> {
        Arc::clone(&self.profiles)
    }

    /// Lessons completed through these services since start-up.
    #[must_use]
    pub fn completed(&self) -> &CompletedLessons {
        &self.completed
    }
}
