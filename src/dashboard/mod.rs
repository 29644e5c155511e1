//! Per-role dashboards. Each one issues its fetches concurrently, joins the
//! results through local lookup tables and patches its own state after a
//! mutation instead of re-reading everything.

use std::collections::HashMap;
use std::hash::Hash;

use serde::Serialize;
use tracing::warn;

use crate::error::AppResult;

pub mod admin;
pub mod apply;
pub mod employer;
pub mod seeker;

pub const MISSING_JOB: &str = "Job no longer available";
pub const UNKNOWN_APPLICANT: &str = "Unknown applicant";

/// One independently fetched list. A failed fetch leaves `items` empty and
/// records the message; the rest of the dashboard still renders.
#[derive(Debug, Clone, Serialize)]
pub struct Section<T> {
    pub items: Vec<T>,
    pub error: Option<String>,
}

impl<T> Section<T> {
    pub fn ok(items: Vec<T>) -> Self {
        Self { items, error: None }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            items: Vec::new(),
            error: Some(message.into()),
        }
    }

    pub fn from_result(section: &'static str, result: AppResult<Vec<T>>) -> Self {
        match result {
            Ok(items) => Self::ok(items),
            Err(e) => {
                warn!(section, error = %e, "dashboard fetch failed");
                Self::failed(e.to_string())
            }
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// A single fetched value with the same partial-failure handling as [`Section`].
#[derive(Debug, Clone, Serialize)]
pub struct Fetched<T> {
    pub value: Option<T>,
    pub error: Option<String>,
}

impl<T> Fetched<T> {
    pub fn from_result(section: &'static str, result: AppResult<T>) -> Self {
        match result {
            Ok(value) => Self {
                value: Some(value),
                error: None,
            },
            Err(e) => {
                warn!(section, error = %e, "dashboard fetch failed");
                Self {
                    value: None,
                    error: Some(e.to_string()),
                }
            }
        }
    }
}

/// Indexes `items` by `key` for reference resolution.
pub(crate) fn lookup<T, K, F>(items: &[T], key: F) -> HashMap<K, &T>
where
    K: Eq + Hash,
    F: Fn(&T) -> K,
{
    items.iter().map(|item| (key(item), item)).collect()
}
