//! Video capture device enumeration (V4L2)

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::PathBuf;

/// Attached capture devices: device node paths and their display names, index-aligned
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VideoDevices {
    pub devices: Vec<String>,
    pub names: Vec<String>,
}

/// Lists attached capture devices
#[async_trait]
pub trait DeviceEnumerator: Send + Sync {
    async fn list(&self) -> Result<VideoDevices>;
}

/// Scans `/dev/videoN` and reads names from `/sys/class/video4linux`
#[derive(Debug, Clone)]
pub struct V4lEnumerator {
    dev_dir: PathBuf,
    sysfs_dir: PathBuf,
}

impl Default for V4lEnumerator {
    fn default() -> Self {
        Self::new("/dev", "/sys/class/video4linux")
    }
}

impl V4lEnumerator {
    pub fn new(dev_dir: impl Into<PathBuf>, sysfs_dir: impl Into<PathBuf>) -> Self {
        Self {
            dev_dir: dev_dir.into(),
            sysfs_dir: sysfs_dir.into(),
        }
    }

    async fn device_name(&self, node: &str) -> String {
        let path = self.sysfs_dir.join(node).join("name");
        match tokio::fs::read_to_string(&path).await {
            Ok(name) if !name.trim().is_empty() => name.trim().to_string(),
            _ => node.to_string(),
        }
    }
}

#[async_trait]
impl DeviceEnumerator for V4lEnumerator {
    async fn list(&self) -> Result<VideoDevices> {
        let mut entries = tokio::fs::read_dir(&self.dev_dir)
            .await
            .with_context(|| format!("listing {}", self.dev_dir.display()))?;

        let mut nodes: Vec<(u32, String)> = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().into_owned();
            if let Some(index) = name.strip_prefix("video").and_then(|n| n.parse().ok()) {
                nodes.push((index, name));
            }
        }
        nodes.sort();

        let mut found = VideoDevices::default();
        for (_, node) in nodes {
            found.names.push(self.device_name(&node).await);
            found
                .devices
                .push(self.dev_dir.join(&node).to_string_lossy().into_owned());
        }
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn scratch_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("autonomia-{}-{}", tag, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[tokio::test]
    async fn test_lists_video_nodes_in_order() {
        let root = scratch_dir("v4l");
        let dev = root.join("dev");
        let sys = root.join("sys");
        fs::create_dir_all(&dev).unwrap();
        for node in ["video10", "video0", "video1", "videofoo", "ttyUSB0"] {
            fs::write(dev.join(node), b"").unwrap();
        }
        fs::create_dir_all(sys.join("video0")).unwrap();
        fs::write(sys.join("video0").join("name"), "USB Camera\n").unwrap();

        let found = V4lEnumerator::new(&dev, &sys).list().await.unwrap();

        assert_eq!(found.names, vec!["USB Camera", "video1", "video10"]);
        assert_eq!(found.devices.len(), 3);
        assert!(found.devices[0].ends_with("video0"));
        assert!(found.devices[2].ends_with("video10"));

        fs::remove_dir_all(&root).unwrap();
    }

    #[tokio::test]
    async fn test_missing_dev_dir_is_error() {
        let enumerator = V4lEnumerator::new("/nonexistent/dev", "/nonexistent/sys");
        assert!(enumerator.list().await.is_err());
    }
}
