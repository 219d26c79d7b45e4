// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Incoming push messages become OS notifications.

use tracing::warn;

use portico_core::types::{LocalNotification, PushMessage};

/// Bodies longer than this use the expanded notification style.
pub const EXPANDED_BODY_THRESHOLD: usize = 40;

/// Work out what to show for `message`.
///
/// Title and body come from the notification block. If either is missing,
/// both are taken from the data map instead. Returns `None` when there is
/// still nothing to show.
pub fn resolve_display(message: &PushMessage) -> Option<LocalNotification> {
    let from_block = message
        .notification
        .as_ref()
        .and_then(|block| Some((block.title.clone()?, block.body.clone()?)));
    let from_data = || {
        let title = message.data.get("title")?;
        let body = message.data.get("body")?;
        Some((title.to_string(), body.to_string()))
    };

    let Some((title, body)) = from_block.or_else(from_data) else {
        warn!(data_keys = message.data.len(), "push message has no title/body; dropped");
        return None;
    };

    Some(LocalNotification {
        expanded: body.chars().count() > EXPANDED_BODY_THRESHOLD,
        title,
        body,
        data: message.data.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use portico_core::types::{NotificationContent, NotificationPayload};

    #[test]
    fn notification_block_wins() {
        let message = PushMessage {
            notification: Some(NotificationContent {
                title: Some("Bill due".into()),
                body: Some("Electricity".into()),
            }),
            data: [("title", "ignored"), ("body", "ignored")].into_iter().collect(),
        };
        let shown = resolve_display(&message).expect("shown");
        assert_eq!(shown.title, "Bill due");
        assert_eq!(shown.body, "Electricity");
        assert!(!shown.expanded);
        assert_eq!(shown.data.get("title"), Some("ignored"));
    }

    #[test]
    fn incomplete_block_falls_back_to_data() {
        let message = PushMessage {
            notification: Some(NotificationContent {
                title: Some("only a title".into()),
                body: None,
            }),
            data: [
                ("title", "Reminder"),
                ("body", "Your subscription renews tomorrow, tap to review it"),
            ]
            .into_iter()
            .collect(),
        };
        let shown = resolve_display(&message).expect("shown");
        assert_eq!(shown.title, "Reminder");
        assert!(shown.expanded);
    }

    #[test]
    fn nothing_to_show_is_dropped() {
        let message = PushMessage {
            notification: None,
            data: NotificationPayload::from_iter([("title", "no body")]),
        };
        assert!(resolve_display(&message).is_none());
    }
}
