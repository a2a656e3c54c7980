//! HTTP backend speaking the product's REST API.
//!
//! Implements the three repository contracts so sessions can run against the
//! hosted service instead of a local database. Writes that the API does not
//! expose (`upsert_*`) fail with `StorageError::ReadOnly`.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use lesson_core::model::{
    ChallengeId, LearnerProfile, LessonCompletion, LessonId, LessonProgress, OptionId, Streak,
    UserId,
};
use storage::repository::{
    ChallengeOptionRecord, ChallengeRecord, LessonRecord, LessonRepository, ProfileRepository,
    ProgressRepository, StorageError,
};

use crate::config::RemoteConfig;
use crate::error::RemoteError;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Repository adapter over the REST API.
#[derive(Clone, Debug)]
pub struct RemoteBackend {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl RemoteBackend {
    /// # Errors
    ///
    /// Returns `RemoteError::Http` if the HTTP client cannot be built.
    pub fn new(config: RemoteConfig) -> Result<Self, RemoteError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_owned(),
            token: config.token,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, RemoteError> {
        let response = self
            .authorized(self.client.get(self.url(path)))
            .send()
            .await?;
        decode(response).await
    }

    async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: Option<&B>,
    ) -> Result<T, RemoteError> {
        let mut request = self.authorized(self.client.post(self.url(path)));
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = request.send().await?;
        decode(response).await
    }

    /// The learner behind the token; `user_id` arguments are ignored by the API.
    async fn me(&self) -> Result<LearnerProfile, StorageError> {
        let user: UserDto = self.get_json("/users/me").await?;
        Ok(user.into_profile())
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, RemoteError> {
    let status = response.status();
    if !status.is_success() {
        return Err(RemoteError::HttpStatus(status));
    }
    Ok(response.json().await?)
}

//
// ─── WIRE SHAPES ───────────────────────────────────────────────────────────────
//

#[derive(Debug, Deserialize)]
struct LessonDto {
    id: u64,
    title: String,
    #[serde(default)]
    challenges: Vec<ChallengeDto>,
}

#[derive(Debug, Deserialize)]
struct ChallengeDto {
    id: u64,
    #[serde(rename = "type")]
    kind: String,
    question: String,
    #[serde(default)]
    correct_text: Option<String>,
    #[serde(default)]
    audio_src: Option<String>,
    #[serde(default)]
    order_index: u32,
    #[serde(default)]
    options: Vec<OptionDto>,
    #[serde(default)]
    completed: bool,
}

#[derive(Debug, Deserialize)]
struct OptionDto {
    id: u64,
    text: String,
    correct: bool,
    #[serde(default)]
    image_src: Option<String>,
    #[serde(default)]
    audio_src: Option<String>,
}

impl LessonDto {
    fn into_record(self) -> LessonRecord {
        LessonRecord {
            id: LessonId::new(self.id),
            title: self.title,
            challenges: self
                .challenges
                .into_iter()
                .map(|c| ChallengeRecord {
                    id: ChallengeId::new(c.id),
                    kind: c.kind,
                    question: c.question,
                    correct_text: c.correct_text,
                    audio_ref: c.audio_src,
                    position: c.order_index,
                    options: c
                        .options
                        .into_iter()
                        .map(|o| ChallengeOptionRecord {
                            id: OptionId::new(o.id),
                            text: o.text,
                            correct: o.correct,
                            image_ref: o.image_src,
                            audio_ref: o.audio_src,
                        })
                        .collect(),
                    completed: c.completed,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Serialize)]
struct CompletionBody {
    hearts_used: u32,
    points_earned: u32,
}

#[derive(Debug, Deserialize)]
struct ProgressDto {
    user_id: u64,
    lesson_id: u64,
    completed: bool,
    #[serde(default)]
    hearts_used: i64,
    #[serde(default)]
    points_earned: i64,
}

impl ProgressDto {
    fn into_progress(self) -> Result<LessonProgress, StorageError> {
        LessonProgress::from_persisted(
            UserId::new(self.user_id),
            LessonId::new(self.lesson_id),
            self.completed,
            self.hearts_used,
            self.points_earned,
        )
        .map_err(|e| StorageError::Serialization(e.to_string()))
    }
}

#[derive(Debug, Deserialize)]
struct UserDto {
    id: u64,
    hearts: u32,
    points: u32,
    xp: u32,
    #[serde(default)]
    streak_count: u32,
    #[serde(default)]
    longest_streak: u32,
    #[serde(default)]
    streak_frozen: bool,
    #[serde(default)]
    last_activity_date: Option<NaiveDate>,
    #[serde(default)]
    subscription_active: bool,
}

impl UserDto {
    fn into_profile(self) -> LearnerProfile {
        LearnerProfile {
            user_id: UserId::new(self.id),
            hearts: self.hearts,
            points: self.points,
            xp: self.xp,
            streak: Streak {
                count: self.streak_count,
                longest: self.longest_streak,
                frozen: self.streak_frozen,
                last_activity: self.last_activity_date,
            },
            subscription_active: self.subscription_active,
        }
    }
}

//
// ─── CONTRACTS ─────────────────────────────────────────────────────────────────
//

#[async_trait]
impl LessonRepository for RemoteBackend {
    #[instrument(skip(self))]
    async fn get_lesson(
        &self,
        _user_id: UserId,
        lesson_id: LessonId,
    ) -> Result<LessonRecord, StorageError> {
        let lesson: LessonDto = self.get_json(&format!("/lessons/{lesson_id}")).await?;
        Ok(lesson.into_record())
    }

    async fn upsert_lesson(&self, _lesson: &LessonRecord) -> Result<(), StorageError> {
        Err(StorageError::ReadOnly)
    }
}

#[async_trait]
impl ProgressRepository for RemoteBackend {
    #[instrument(skip(self, completion, _completed_at), fields(lesson_id = %completion.lesson_id))]
    async fn complete_lesson(
        &self,
        _user_id: UserId,
        completion: &LessonCompletion,
        _completed_at: DateTime<Utc>,
    ) -> Result<LessonProgress, StorageError> {
        let body = CompletionBody {
            hearts_used: completion.hearts_used,
            points_earned: completion.points_earned,
        };
        let progress: ProgressDto = self
            .post_json(
                &format!("/progress/lesson/{}/complete", completion.lesson_id),
                Some(&body),
            )
            .await?;
        progress.into_progress()
    }

    async fn lesson_progress(
        &self,
        user_id: UserId,
        lesson_id: LessonId,
    ) -> Result<Option<LessonProgress>, StorageError> {
        let rows: Vec<ProgressDto> = self.get_json("/progress").await?;
        rows.into_iter()
            .find(|row| row.lesson_id == lesson_id.value() && row.user_id == user_id.value())
            .map(ProgressDto::into_progress)
            .transpose()
    }
}

#[async_trait]
impl ProfileRepository for RemoteBackend {
    async fn get_profile(&self, _user_id: UserId) -> Result<LearnerProfile, StorageError> {
        self.me().await
    }

    async fn upsert_profile(&self, _profile: &LearnerProfile) -> Result<(), StorageError> {
        Err(StorageError::ReadOnly)
    }

    #[instrument(skip(self))]
    async fn refill_hearts(&self, _user_id: UserId) -> Result<LearnerProfile, StorageError> {
        let user: UserDto = self
            .post_json::<(), _>("/users/me/hearts/refill", None)
            .await?;
        Ok(user.into_profile())
    }
}
