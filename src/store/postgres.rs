use anyhow::Context;
use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, types::Json, FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use super::types::{
    Application, ApplicationFilter, ApplicationStatus, Job, JobFilter, JobPatch, NewApplication,
    NewJob, NewProfile, Profile, ProfilePatch, UserRecord,
};
use super::{Store, StoreResult};
use crate::error::StoreError;
use crate::session::Role;

const USER_COLUMNS: &str = "id, email, password_hash, created_at";
const PROFILE_COLUMNS: &str =
    "id, email, role, full_name, company, bio, is_active, cv_key, created_at";
const JOB_COLUMNS: &str = "id, employer_id, title, description, location, salary, type, company, \
     apply_url, expires_at, additional_questions, status, featured, created_at";
const APPLICATION_COLUMNS: &str =
    "id, job_id, applicant_id, original_resume, attachment_key, answers, status, created_at";

#[derive(Clone)]
pub struct PgStore {
    db: PgPool,
}

impl PgStore {
    pub async fn connect(database_url: &str) -> anyhow::Result<Self> {
        let db = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .context("connect to database")?;
        Ok(Self { db })
    }

    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.db)
            .await
            .context("run migrations")?;
        Ok(())
    }
}

#[derive(FromRow)]
struct UserRow {
    id: Uuid,
    email: String,
    password_hash: String,
    created_at: OffsetDateTime,
}

impl From<UserRow> for UserRecord {
    fn from(r: UserRow) -> Self {
        Self {
            id: r.id,
            email: r.email,
            password_hash: r.password_hash,
            created_at: r.created_at,
        }
    }
}

#[derive(FromRow)]
struct ProfileRow {
    id: Uuid,
    email: String,
    role: String,
    full_name: String,
    company: String,
    bio: String,
    is_active: bool,
    cv_key: Option<String>,
    created_at: OffsetDateTime,
}

impl TryFrom<ProfileRow> for Profile {
    type Error = StoreError;

    fn try_from(r: ProfileRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: r.id,
            email: r.email,
            role: r
                .role
                .parse::<Role>()
                .map_err(|e| StoreError::new(e.to_string()))?,
            full_name: r.full_name,
            company: r.company,
            bio: r.bio,
            is_active: r.is_active,
            cv_key: r.cv_key,
            created_at: r.created_at,
        })
    }
}

#[derive(FromRow)]
struct JobRow {
    id: Uuid,
    employer_id: Uuid,
    title: String,
    description: String,
    location: String,
    salary: String,
    #[sqlx(rename = "type")]
    job_type: String,
    company: String,
    apply_url: Option<String>,
    expires_at: Option<OffsetDateTime>,
    additional_questions: Json<Vec<String>>,
    status: String,
    featured: bool,
    created_at: OffsetDateTime,
}

impl TryFrom<JobRow> for Job {
    type Error = StoreError;

    fn try_from(r: JobRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: r.id,
            employer_id: r.employer_id,
            title: r.title,
            description: r.description,
            location: r.location,
            salary: r.salary,
            job_type: r.job_type,
            company: r.company,
            apply_url: r.apply_url,
            expires_at: r.expires_at,
            additional_questions: r.additional_questions.0,
            status: r.status.parse()?,
            featured: r.featured,
            created_at: r.created_at,
        })
    }
}

#[derive(FromRow)]
struct ApplicationRow {
    id: Uuid,
    job_id: Uuid,
    applicant_id: Uuid,
    original_resume: String,
    attachment_key: Option<String>,
    answers: Json<Vec<String>>,
    status: String,
    created_at: OffsetDateTime,
}

impl TryFrom<ApplicationRow> for Application {
    type Error = StoreError;

    fn try_from(r: ApplicationRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: r.id,
            job_id: r.job_id,
            applicant_id: r.applicant_id,
            resume_text: r.original_resume,
            attachment_key: r.attachment_key,
            answers: r.answers.0,
            status: r.status.parse()?,
            created_at: r.created_at,
        })
    }
}

fn convert_all<R, T>(rows: Vec<R>) -> StoreResult<Vec<T>>
where
    T: TryFrom<R, Error = StoreError>,
{
    rows.into_iter().map(T::try_from).collect()
}

#[async_trait]
impl Store for PgStore {
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<UserRecord>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.db)
        .await?;
        Ok(row.map(Into::into))
    }

    async fn find_user(&self, id: Uuid) -> StoreResult<Option<UserRecord>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(row.map(Into::into))
    }

    async fn insert_user(&self, email: &str, password_hash: &str) -> StoreResult<UserRecord> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            INSERT INTO users (email, password_hash)
            VALUES ($1, $2)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(email)
        .bind(password_hash)
        .fetch_one(&self.db)
        .await?;
        Ok(row.into())
    }

    async fn find_profile(&self, id: Uuid) -> StoreResult<Option<Profile>> {
        let row = sqlx::query_as::<_, ProfileRow>(&format!(
            "SELECT {PROFILE_COLUMNS} FROM profiles WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        row.map(Profile::try_from).transpose()
    }

    async fn insert_profile(&self, profile: NewProfile) -> StoreResult<Profile> {
        // DO UPDATE instead of DO NOTHING so the existing row is returned
        let row = sqlx::query_as::<_, ProfileRow>(&format!(
            r#"
            INSERT INTO profiles (id, email, role, company)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (id) DO UPDATE SET email = profiles.email
            RETURNING {PROFILE_COLUMNS}
            "#
        ))
        .bind(profile.id)
        .bind(&profile.email)
        .bind(profile.role.as_str())
        .bind(&profile.company)
        .fetch_one(&self.db)
        .await?;
        row.try_into()
    }

    async fn list_profiles(&self, ids: Option<&[Uuid]>) -> StoreResult<Vec<Profile>> {
        let rows = sqlx::query_as::<_, ProfileRow>(&format!(
            r#"
            SELECT {PROFILE_COLUMNS}
              FROM profiles
             WHERE ($1::uuid[] IS NULL OR id = ANY($1))
             ORDER BY created_at DESC
            "#
        ))
        .bind(ids.map(<[Uuid]>::to_vec))
        .fetch_all(&self.db)
        .await?;
        convert_all(rows)
    }

    async fn update_profile(&self, id: Uuid, patch: ProfilePatch) -> StoreResult<Option<Profile>> {
        let row = sqlx::query_as::<_, ProfileRow>(&format!(
            r#"
            UPDATE profiles SET
                full_name = COALESCE($2, full_name),
                company   = COALESCE($3, company),
                bio       = COALESCE($4, bio),
                is_active = COALESCE($5, is_active),
                role      = COALESCE($6, role),
                cv_key    = COALESCE($7, cv_key)
             WHERE id = $1
            RETURNING {PROFILE_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(patch.full_name)
        .bind(patch.company)
        .bind(patch.bio)
        .bind(patch.is_active)
        .bind(patch.role.map(|r| r.as_str()))
        .bind(patch.cv_key)
        .fetch_optional(&self.db)
        .await?;
        row.map(Profile::try_from).transpose()
    }

    async fn list_jobs(&self, filter: &JobFilter) -> StoreResult<Vec<Job>> {
        let rows = sqlx::query_as::<_, JobRow>(&format!(
            r#"
            SELECT {JOB_COLUMNS}
              FROM jobs
             WHERE ($1::uuid IS NULL OR employer_id = $1)
               AND ($2::text IS NULL OR status = $2)
             ORDER BY CASE WHEN $3 THEN featured ELSE FALSE END DESC, created_at DESC
             LIMIT $4
            "#
        ))
        .bind(filter.employer_id)
        .bind(filter.status.map(|s| s.as_str()))
        .bind(filter.featured_first)
        .bind(filter.limit)
        .fetch_all(&self.db)
        .await?;
        convert_all(rows)
    }

    async fn find_job(&self, id: Uuid) -> StoreResult<Option<Job>> {
        let row = sqlx::query_as::<_, JobRow>(&format!(
            "SELECT {JOB_COLUMNS} FROM jobs WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        row.map(Job::try_from).transpose()
    }

    async fn insert_job(&self, job: NewJob) -> StoreResult<Job> {
        let row = sqlx::query_as::<_, JobRow>(&format!(
            r#"
            INSERT INTO jobs (employer_id, title, description, location, salary, type, company,
                              apply_url, expires_at, additional_questions, featured)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING {JOB_COLUMNS}
            "#
        ))
        .bind(job.employer_id)
        .bind(&job.title)
        .bind(&job.description)
        .bind(&job.location)
        .bind(&job.salary)
        .bind(&job.job_type)
        .bind(&job.company)
        .bind(&job.apply_url)
        .bind(job.expires_at)
        .bind(Json(&job.additional_questions))
        .bind(job.featured)
        .fetch_one(&self.db)
        .await?;
        row.try_into()
    }

    async fn update_job(&self, id: Uuid, patch: JobPatch) -> StoreResult<Option<Job>> {
        let row = sqlx::query_as::<_, JobRow>(&format!(
            r#"
            UPDATE jobs SET
                title                = COALESCE($2, title),
                description          = COALESCE($3, description),
                location             = COALESCE($4, location),
                salary               = COALESCE($5, salary),
                type                 = COALESCE($6, type),
                company              = COALESCE($7, company),
                apply_url            = CASE WHEN $13::bool THEN $8::text ELSE apply_url END,
                expires_at           = CASE WHEN $14::bool THEN $9::timestamptz ELSE expires_at END,
                additional_questions = COALESCE($10, additional_questions),
                status               = COALESCE($11, status),
                featured             = COALESCE($12, featured)
             WHERE id = $1
            RETURNING {JOB_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(patch.title)
        .bind(patch.description)
        .bind(patch.location)
        .bind(patch.salary)
        .bind(patch.job_type)
        .bind(patch.company)
        .bind(patch.apply_url.clone().flatten())
        .bind(patch.expires_at.flatten())
        .bind(patch.additional_questions.map(Json))
        .bind(patch.status.map(|s| s.as_str()))
        .bind(patch.featured)
        .bind(patch.apply_url.is_some())
        .bind(patch.expires_at.is_some())
        .fetch_optional(&self.db)
        .await?;
        row.map(Job::try_from).transpose()
    }

    async fn list_applications(
        &self,
        filter: &ApplicationFilter,
    ) -> StoreResult<Vec<Application>> {
        let rows = sqlx::query_as::<_, ApplicationRow>(&format!(
            r#"
            SELECT {APPLICATION_COLUMNS}
              FROM applications
             WHERE ($1::uuid IS NULL OR applicant_id = $1)
               AND ($2::uuid[] IS NULL OR job_id = ANY($2))
             ORDER BY created_at DESC
            "#
        ))
        .bind(filter.applicant_id)
        .bind(filter.job_ids.clone())
        .fetch_all(&self.db)
        .await?;
        convert_all(rows)
    }

    async fn find_application(&self, id: Uuid) -> StoreResult<Option<Application>> {
        let row = sqlx::query_as::<_, ApplicationRow>(&format!(
            "SELECT {APPLICATION_COLUMNS} FROM applications WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        row.map(Application::try_from).transpose()
    }

    async fn insert_application(&self, application: NewApplication) -> StoreResult<Application> {
        let row = sqlx::query_as::<_, ApplicationRow>(&format!(
            r#"
            INSERT INTO applications (job_id, applicant_id, original_resume, attachment_key, answers)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {APPLICATION_COLUMNS}
            "#
        ))
        .bind(application.job_id)
        .bind(application.applicant_id)
        .bind(&application.resume_text)
        .bind(&application.attachment_key)
        .bind(Json(&application.answers))
        .fetch_one(&self.db)
        .await?;
        row.try_into()
    }

    async fn update_application_status(
        &self,
        id: Uuid,
        status: ApplicationStatus,
    ) -> StoreResult<Option<Application>> {
        let row = sqlx::query_as::<_, ApplicationRow>(&format!(
            r#"
            UPDATE applications SET status = $2
             WHERE id = $1
               AND (status = 'Submitted' OR status = $2)
            RETURNING {APPLICATION_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(status.as_str())
        .fetch_optional(&self.db)
        .await?;
        row.map(Application::try_from).transpose()
    }
}
