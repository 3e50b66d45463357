//! Tests for path-based route selection.

use crate::webhook::domain::{WebhookError, WebhookRoute};
use rstest::rstest;

#[rstest]
#[case("/task", WebhookRoute::Task)]
#[case("/hooks/task_webhook/", WebhookRoute::Task)]
#[case("/version", WebhookRoute::Version)]
#[case("/api/Status", WebhookRoute::Version)]
#[case("/version_webhook", WebhookRoute::Version)]
#[case("/version_created", WebhookRoute::VersionCreated)]
#[case("/hooks/version-created", WebhookRoute::VersionCreated)]
#[case("version_created_webhook", WebhookRoute::VersionCreated)]
fn last_segment_selects_route(#[case] path: &str, #[case] expected: WebhookRoute) {
    assert_eq!(
        WebhookRoute::from_path(path).map_err(|err| err.to_string()),
        Ok(expected)
    );
}

#[rstest]
#[case("/")]
#[case("/shot")]
#[case("/task/extra")]
fn unknown_segments_are_rejected(#[case] path: &str) {
    assert!(matches!(
        WebhookRoute::from_path(path),
        Err(WebhookError::UnknownRoute(_))
    ));
}

#[rstest]
fn only_status_routes_require_status_attribute() {
    assert!(WebhookRoute::Task.requires_status_attribute());
    assert!(WebhookRoute::Version.requires_status_attribute());
    assert!(!WebhookRoute::VersionCreated.requires_status_attribute());
}
