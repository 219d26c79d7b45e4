// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Camera, gallery and file chooser capabilities.
//
// A picker that returns nothing resolves as `Cancelled`, never silence.

use tracing::{info, instrument};

use portico_bridge::traits::{CapturedImage, NativeCamera, NativeFilePicker, NativeGallery};
use portico_core::types::{CapabilityOutcome, Payload};

use crate::codec::DEFAULT_MIME_TYPE;

/// Filter used when script code passes an empty one.
pub const ANY_MIME_FILTER: &str = "*/*";

/// Name reported when the provider does not expose one.
pub const UNKNOWN_FILE_NAME: &str = "unknown";

fn image_outcome(source: &str, image: Option<CapturedImage>) -> CapabilityOutcome {
    match image {
        Some(image) => {
            info!(source, image_len = image.bytes.len(), "image received");
            CapabilityOutcome::Success(Payload::Image {
                bytes: image.bytes,
                mime: image.mime_type,
            })
        }
        None => {
            info!(source, "image picker cancelled");
            CapabilityOutcome::Cancelled
        }
    }
}

#[instrument(skip_all)]
pub fn capture_image<C: NativeCamera + ?Sized>(camera: &C) -> CapabilityOutcome {
    match camera.capture_image() {
        Ok(image) => image_outcome("camera", image),
        Err(e) => e.into(),
    }
}

#[instrument(skip_all)]
pub fn pick_image<G: NativeGallery + ?Sized>(gallery: &G) -> CapabilityOutcome {
    match gallery.pick_image() {
        Ok(image) => image_outcome("gallery", image),
        Err(e) => e.into(),
    }
}

#[instrument(skip(picker))]
pub fn pick_file<F: NativeFilePicker + ?Sized>(picker: &F, mime_filter: &str) -> CapabilityOutcome {
    let filter = if mime_filter.trim().is_empty() {
        ANY_MIME_FILTER
    } else {
        mime_filter.trim()
    };

    match picker.pick_file(filter) {
        Ok(Some(file)) => {
            let file_name = file
                .file_name
                .filter(|name| !name.is_empty())
                .unwrap_or_else(|| UNKNOWN_FILE_NAME.to_string());
            let mime = file
                .mime_type
                .filter(|mime| !mime.is_empty())
                .unwrap_or_else(|| DEFAULT_MIME_TYPE.to_string());
            info!(file_len = file.bytes.len(), %mime, "file picked");
            CapabilityOutcome::Success(Payload::File {
                bytes: file.bytes,
                file_name,
                mime,
            })
        }
        Ok(None) => {
            info!("file chooser cancelled");
            CapabilityOutcome::Cancelled
        }
        Err(e) => e.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakePlatform;
    use portico_bridge::traits::PickedFile;

    #[test]
    fn cancelled_camera_is_cancelled() {
        let fake = FakePlatform::new();
        assert_eq!(capture_image(&fake), CapabilityOutcome::Cancelled);
    }

    #[test]
    fn missing_file_metadata_gets_defaults() {
        let fake = FakePlatform::new();
        fake.configure(|s| {
            s.picked_file = Some(PickedFile {
                bytes: vec![1, 2, 3],
                file_name: None,
                mime_type: Some(String::new()),
            })
        });
        assert_eq!(
            pick_file(&fake, ""),
            CapabilityOutcome::Success(Payload::File {
                bytes: vec![1, 2, 3],
                file_name: "unknown".into(),
                mime: "application/octet-stream".into(),
            })
        );
        assert_eq!(fake.calls(), vec!["pick_file:*/*".to_string()]);
    }

    #[test]
    fn gallery_failure_is_unavailable() {
        let fake = FakePlatform::new();
        fake.configure(|s| s.gallery_missing = true);
        assert!(matches!(pick_image(&fake), CapabilityOutcome::Unavailable(_)));
    }
}
