//! Device classification and the session's device catalog

use serde::{Deserialize, Serialize};

/// Kind discriminant of a raw platform device record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeviceKind {
    #[serde(rename = "audio-input")]
    AudioInput,
    #[serde(rename = "audio-output")]
    AudioOutput,
    #[serde(rename = "video-input")]
    VideoInput,
}

/// Immutable snapshot of a platform input/output device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    /// Platform-unique device ID
    pub id: String,

    /// Device kind
    pub kind: DeviceKind,

    /// Human-readable label
    pub label: String,
}

impl Device {
    pub fn new(id: impl Into<String>, kind: DeviceKind, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind,
            label: label.into(),
        }
    }
}

/// Classified devices plus the user's current selections.
///
/// Rebuilt from scratch on every successful enumeration; only the selection
/// fields are ever patched in place.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceCatalog {
    pub audio_devices: Vec<Device>,
    pub video_devices: Vec<Device>,
    pub selected_audio_id: Option<String>,
    pub selected_video_id: Option<String>,
}

impl DeviceCatalog {
    /// Partition a raw device list into audio and video inputs.
    ///
    /// Relative order is preserved within each list. Every other kind
    /// (outputs included) is dropped without error. Selections start unset.
    pub fn from_devices(raw: impl IntoIterator<Item = Device>) -> Self {
        let mut catalog = Self::default();
        for device in raw {
            match device.kind {
                DeviceKind::AudioInput => catalog.audio_devices.push(device),
                DeviceKind::VideoInput => catalog.video_devices.push(device),
                _ => {}
            }
        }
        catalog
    }

    /// Rebuild from a fresh enumeration, keeping a selection only if its
    /// device is still present.
    pub fn rebuilt(&self, raw: impl IntoIterator<Item = Device>) -> Self {
        let mut next = Self::from_devices(raw);
        if let Some(id) = &self.selected_audio_id {
            next.select_audio(id);
        }
        if let Some(id) = &self.selected_video_id {
            next.select_video(id);
        }
        next
    }

    /// Select an audio input. Unknown ids are treated as unset.
    pub fn select_audio(&mut self, id: &str) {
        self.selected_audio_id = self
            .audio_devices
            .iter()
            .any(|d| d.id == id)
            .then(|| id.to_string());
    }

    /// Select a video input. Unknown ids are treated as unset.
    pub fn select_video(&mut self, id: &str) {
        self.selected_video_id = self
            .video_devices
            .iter()
            .any(|d| d.id == id)
            .then(|| id.to_string());
    }

    pub fn selected_audio(&self) -> Option<&Device> {
        let id = self.selected_audio_id.as_deref()?;
        self.audio_devices.iter().find(|d| d.id == id)
    }

    pub fn selected_video(&self) -> Option<&Device> {
        let id = self.selected_video_id.as_deref()?;
        self.video_devices.iter().find(|d| d.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_list() -> Vec<Device> {
        vec![
            Device::new("mic-1", DeviceKind::AudioInput, "Built-in Microphone"),
            Device::new("spk-1", DeviceKind::AudioOutput, "Speakers"),
            Device::new("cam-1", DeviceKind::VideoInput, "FaceTime HD"),
            Device::new("mic-2", DeviceKind::AudioInput, "USB Microphone"),
            Device::new("cam-2", DeviceKind::VideoInput, "Capture Card"),
        ]
    }

    #[test]
    fn test_classification_preserves_order_and_drops_outputs() {
        let catalog = DeviceCatalog::from_devices(raw_list());

        let audio_ids: Vec<_> = catalog.audio_devices.iter().map(|d| d.id.as_str()).collect();
        let video_ids: Vec<_> = catalog.video_devices.iter().map(|d| d.id.as_str()).collect();

        assert_eq!(audio_ids, ["mic-1", "mic-2"]);
        assert_eq!(video_ids, ["cam-1", "cam-2"]);
        assert!(catalog.selected_audio_id.is_none());
        assert!(catalog.selected_video_id.is_none());
    }

    #[test]
    fn test_empty_input_produces_empty_catalog() {
        let catalog = DeviceCatalog::from_devices(vec![]);
        assert!(catalog.audio_devices.is_empty());
        assert!(catalog.video_devices.is_empty());
    }

    #[test]
    fn test_selection_requires_present_device() {
        let mut catalog = DeviceCatalog::from_devices(raw_list());

        catalog.select_audio("mic-2");
        assert_eq!(catalog.selected_audio_id.as_deref(), Some("mic-2"));

        // Unknown id resets to unset
        catalog.select_audio("mic-99");
        assert!(catalog.selected_audio_id.is_none());

        // Output ids never match the audio-input list
        catalog.select_audio("spk-1");
        assert!(catalog.selected_audio_id.is_none());
    }

    #[test]
    fn test_rebuild_keeps_surviving_selection_only() {
        let mut catalog = DeviceCatalog::from_devices(raw_list());
        catalog.select_audio("mic-2");
        catalog.select_video("cam-1");

        // cam-1 unplugged between enumerations
        let next = catalog.rebuilt(vec![
            Device::new("mic-2", DeviceKind::AudioInput, "USB Microphone"),
            Device::new("cam-2", DeviceKind::VideoInput, "Capture Card"),
        ]);

        assert_eq!(next.selected_audio_id.as_deref(), Some("mic-2"));
        assert!(next.selected_video_id.is_none());
    }
}
