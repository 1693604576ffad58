//! Utility functions for Group Orchestrator
//!
//! This module provides utility functions used throughout the orchestrator.

use std::future::Future;
use std::time::Duration;
use tokio::time::timeout;

use crate::error::{Error, Result};

/// Formats a duration into a human-readable string
///
/// # Examples
///
/// ```
/// use common::utils::format_duration;
/// use std::time::Duration;
///
/// assert_eq!(format_duration(Duration::from_secs(65)), "1m 5s");
/// ```
pub fn format_duration(duration: Duration) -> String {
    let total_secs = duration.as_secs();

    if total_secs == 0 {
        return format!("{}ms", duration.subsec_millis());
    }

    let days = total_secs / (24 * 60 * 60);
    let hours = (total_secs % (24 * 60 * 60)) / (60 * 60);
    let minutes = (total_secs % (60 * 60)) / 60;
    let seconds = total_secs % 60;

    let mut result = String::new();

    if days > 0 {
        result.push_str(&format!("{}d ", days));
    }

    if hours > 0 || !result.is_empty() {
        result.push_str(&format!("{}h ", hours));
    }

    if minutes > 0 || !result.is_empty() {
        result.push_str(&format!("{}m ", minutes));
    }

    result.push_str(&format!("{}s", seconds));

    result
}

/// Executes a future with a timeout
///
/// The returned error names the operation so the caller can log it as is.
pub async fn execute_with_timeout<T, F>(
    future: F,
    duration: Duration,
    operation_name: &str,
) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match timeout(duration, future).await {
        Ok(result) => result,
        Err(_) => Err(Error::Timeout(format!(
            "Operation '{}' timed out after {}",
            operation_name,
            format_duration(duration)
        ))),
    }
}

/// Splits a comma-separated parameter. An empty input yields an empty list.
///
/// # Examples
///
/// ```
/// use common::utils::split_csv;
///
/// assert_eq!(split_csv("a,b"), vec!["a".to_string(), "b".to_string()]);
/// assert!(split_csv("").is_empty());
/// ```
pub fn split_csv(value: &str) -> Vec<String> {
    if value.is_empty() {
        return Vec::new();
    }

    value.split(',').map(str::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_millis(250)), "250ms");
        assert_eq!(format_duration(Duration::from_secs(30)), "30s");
        assert_eq!(format_duration(Duration::from_secs(3600)), "1h 0m 0s");
        assert_eq!(format_duration(Duration::from_secs(90061)), "1d 1h 1m 1s");
    }

    #[test]
    fn test_split_csv() {
        assert_eq!(split_csv("bar"), vec!["bar"]);
        assert_eq!(split_csv("a,,b"), vec!["a", "", "b"]);
        assert!(split_csv("").is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_execute_with_timeout() {
        let value = execute_with_timeout(async { Ok(42) }, Duration::from_secs(1), "answer")
            .await
            .unwrap();
        assert_eq!(value, 42);

        let err = execute_with_timeout(
            async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(())
            },
            Duration::from_secs(1),
            "zk session",
        )
        .await
        .unwrap_err();
        assert!(err.is_timeout());
        assert!(err.to_string().contains("zk session"));
    }
}
