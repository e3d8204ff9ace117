//! External content generation
//!
//! Questions and rosters can be produced by a document-understanding service
//! instead of being typed in. The service itself lives outside this crate
//! behind [`ContentService`]; this module builds requests, retries calls that
//! hit a quota limit with exponential backoff, and turns the loosely formatted
//! responses into challenges and names.
//!
//! Failures here never touch a running session: they only decide whether a
//! configuration gets new content.

use std::{future::Future, time::Duration};

use async_trait::async_trait;
use itertools::Itertools;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use thiserror::Error;

use crate::{
    challenge::Challenge,
    config::Grade,
    constants::{
        challenge::OPTION_COUNT,
        generation::{INITIAL_BACKOFF, MAX_RETRIES},
    },
    reveal::keyword_letters,
    roster::clean_names,
};

/// Instruction sent along with a roster image
pub const ROSTER_PROMPT: &str = "List of student names (JSON array of strings):";

/// An uploaded file passed to the service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    /// Raw file contents
    pub data: Vec<u8>,
    /// MIME type of `data`, such as `image/jpeg`
    pub mime_type: String,
}

/// Request for one question per keyword letter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    /// The keyword as typed
    pub keyword: String,
    /// Grade the questions are pitched at
    pub grade: Grade,
    /// Optional teaching material to base the questions on
    pub attachment: Option<Attachment>,
}

impl GenerationRequest {
    /// Renders the instruction text for the service
    pub fn prompt(&self) -> String {
        let letters = keyword_letters(&self.keyword);
        let count = letters.len();
        let grade = self.grade;

        let task = if self.attachment.is_some() {
            format!(
                "Write {count} multiple choice informatics questions for grade {grade}, one per letter: {}.",
                letters.iter().join(", ")
            )
        } else {
            format!(
                "Write {count} multiple choice informatics questions for grade {grade} about: {}.",
                letters.iter().collect::<String>()
            )
        };

        format!(
            "{task}\nJSON format: [{{\"text\": \"...\", \"options\": [\"A\", \"B\", \"C\", \"D\"], \"correctAnswer\": 0}}]."
        )
    }
}

/// One question as returned by the service
///
/// Every field is optional on the wire; gaps are filled when the question is
/// turned into a [`Challenge`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedQuestion {
    /// The question text
    #[serde(default)]
    pub text: String,
    /// The answer options
    #[serde(default)]
    pub options: Vec<String>,
    /// Index of the correct option
    #[serde(default, rename = "correctAnswer")]
    pub correct_answer: Option<usize>,
}

impl GeneratedQuestion {
    /// Builds the challenge for keyword letter `letter` at `position`
    pub fn to_challenge(&self, letter: char, position: usize) -> Challenge {
        let prompt = match self.text.trim() {
            "" => format!("Question about the letter \"{letter}\"..."),
            text => text.to_owned(),
        };

        let options = <[String; OPTION_COUNT]>::try_from(self.options.clone())
            .unwrap_or_else(|_| ["Option A", "Option B", "Option C", "Option D"].map(String::from));

        let correct_option = self
            .correct_answer
            .filter(|&index| index < OPTION_COUNT)
            .unwrap_or(0);

        Challenge::new(prompt, options, correct_option, position)
    }
}

/// Failure reported by a [`ContentService`] call
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    /// The call was refused because of a quota or rate limit
    #[error("quota exceeded")]
    QuotaExceeded,
    /// The credentials in use were not accepted
    #[error("credentials rejected")]
    CredentialsRejected,
    /// Any other failure
    #[error("{0}")]
    Other(String),
}

/// Errors surfaced to the teacher when content could not be produced
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Quota is still exhausted after every retry
    #[error("content service quota exceeded")]
    QuotaExceeded,
    /// The service did not accept the credentials
    #[error("content service rejected the credentials")]
    CredentialsRejected,
    /// The service failed or produced nothing usable
    #[error("content generation failed: {0}")]
    GenerationFailed(String),
    /// The response could not be read at all
    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

impl From<ServiceError> for Error {
    fn from(error: ServiceError) -> Self {
        match error {
            ServiceError::QuotaExceeded => Self::QuotaExceeded,
            ServiceError::CredentialsRejected => Self::CredentialsRejected,
            ServiceError::Other(message) => Self::GenerationFailed(message),
        }
    }
}

/// A document-understanding service
#[async_trait]
pub trait ContentService: Send + Sync {
    /// Asks for questions matching `request`, returning the raw response text
    async fn generate_questions(&self, request: &GenerationRequest)
    -> Result<String, ServiceError>;

    /// Asks for the names visible on `image`, returning the raw response text
    async fn extract_roster(&self, image: &Attachment) -> Result<String, ServiceError>;
}

/// How quota failures are retried
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Delay before the first retry, doubled for every following one
    pub initial_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: MAX_RETRIES,
            initial_backoff: INITIAL_BACKOFF,
        }
    }
}

/// Runs `operation`, retrying quota failures with exponential backoff
///
/// Only [`ServiceError::QuotaExceeded`] is retried; any other outcome is
/// returned as is.
pub async fn with_retry<T, F, Fut>(policy: RetryPolicy, mut operation: F) -> Result<T, ServiceError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ServiceError>>,
{
    let mut retries_left = policy.max_retries;
    let mut delay = policy.initial_backoff;

    loop {
        match operation().await {
            Err(ServiceError::QuotaExceeded) if retries_left > 0 => {
                tracing::warn!(?delay, retries_left, "content service quota exceeded, backing off");
                tokio::time::sleep(delay).await;
                delay = delay.saturating_mul(2);
                retries_left -= 1;
            }
            result => return result,
        }
    }
}

fn strip_code_fences(text: &str) -> String {
    text.replace("```json", "").replace("```", "").trim().to_owned()
}

/// The widest `[...]` span in `text`
fn bracketed(text: &str) -> Option<&str> {
    let start = text.find('[')?;
    let end = text.rfind(']')?;
    (start < end).then(|| &text[start..=end])
}

/// Parses a JSON array, tolerating code fences and surrounding chatter
fn parse_lenient<T: DeserializeOwned>(text: &str) -> Result<T, serde_json::Error> {
    serde_json::from_str(&strip_code_fences(text)).or_else(|error| match bracketed(text) {
        Some(span) => serde_json::from_str(span),
        None => Err(error),
    })
}

/// Reads the questions out of a service response
///
/// Anything that cannot be read yields an empty list.
pub fn parse_questions(text: &str) -> Vec<GeneratedQuestion> {
    if text.trim().is_empty() {
        return Vec::new();
    }

    parse_lenient(text).unwrap_or_else(|error| {
        tracing::debug!(%error, "discarding unreadable question response");
        Vec::new()
    })
}

/// Reads the names out of a service response
///
/// Non-string entries are kept in their JSON text form; names are trimmed and
/// blanks dropped. A response that is JSON but not an array yields no names.
///
/// # Errors
///
/// Returns [`Error::MalformedResponse`] if the response is not JSON at all.
pub fn parse_roster(text: &str) -> Result<Vec<String>, Error> {
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }

    let value: serde_json::Value =
        parse_lenient(text).map_err(|error| Error::MalformedResponse(error.to_string()))?;

    let serde_json::Value::Array(items) = value else {
        return Ok(Vec::new());
    };

    Ok(clean_names(items.into_iter().map(|item| match item {
        serde_json::Value::String(name) => name,
        other => other.to_string(),
    })))
}

/// Generates questions for `request`
///
/// # Errors
///
/// Returns [`Error::QuotaExceeded`] once retries are used up,
/// [`Error::CredentialsRejected`] if the service refused the credentials,
/// and [`Error::GenerationFailed`] if the call failed or no question could be
/// read from the response.
pub async fn generate_questions(
    service: &dyn ContentService,
    request: &GenerationRequest,
    policy: RetryPolicy,
) -> Result<Vec<GeneratedQuestion>, Error> {
    let text = with_retry(policy, || service.generate_questions(request)).await?;
    let questions = parse_questions(&text);

    if questions.is_empty() {
        return Err(Error::GenerationFailed(
            "the response contained no questions".to_owned(),
        ));
    }

    tracing::info!(count = questions.len(), "questions generated");

    Ok(questions)
}

/// Generates questions, switching to `fallback` credentials once if the
/// primary ones run out of quota or are rejected
///
/// # Errors
///
/// Returns the error of the fallback attempt, or the primary error if it was
/// not credential related.
pub async fn generate_with_fallback(
    primary: &dyn ContentService,
    fallback: &dyn ContentService,
    request: &GenerationRequest,
    policy: RetryPolicy,
) -> Result<Vec<GeneratedQuestion>, Error> {
    match generate_questions(primary, request, policy).await {
        Err(error @ (Error::QuotaExceeded | Error::CredentialsRejected)) => {
            tracing::info!(%error, "switching to fallback credentials");
            generate_questions(fallback, request, policy).await
        }
        result => result,
    }
}

/// Reads a class roster from an image
///
/// # Errors
///
/// Returns [`Error::QuotaExceeded`] once retries are used up,
/// [`Error::CredentialsRejected`] if the service refused the credentials,
/// [`Error::MalformedResponse`] if the response is not JSON, and
/// [`Error::GenerationFailed`] if the call failed or no name was found.
pub async fn extract_roster(
    service: &dyn ContentService,
    image: &Attachment,
    policy: RetryPolicy,
) -> Result<Vec<String>, Error> {
    let text = with_retry(policy, || service.extract_roster(image)).await?;
    let names = parse_roster(&text)?;

    if names.is_empty() {
        return Err(Error::GenerationFailed(
            "no names found on the roster".to_owned(),
        ));
    }

    tracing::info!(count = names.len(), "roster extracted");

    Ok(names)
}
