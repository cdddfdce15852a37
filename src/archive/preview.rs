/// Slot preview loading
///
/// Display references are downloaded (or read from disk for placeholders),
/// decoded once and downscaled to the slot's tier before reaching the UI.
use image::imageops::FilterType;
use reqwest::Client;
use std::path::PathBuf;

/// Preview tier sizes
pub const TIER_NEIGHBOR: u32 = 256; // Before/next slots
pub const TIER_CURRENT: u32 = 1280; // Center slot

/// Decoded RGBA preview ready for an image handle
#[derive(Clone, PartialEq, Eq)]
pub struct Preview {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl std::fmt::Debug for Preview {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Preview")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish()
    }
}

/// Download a remote display reference and downscale it
pub async fn load_remote(client: Client, url: String, max_width: u32) -> Result<Preview, String> {
    let response = client
        .get(&url)
        .send()
        .await
        .map_err(|e| format!("Failed to download {}: {}", url, e))?;

    if !response.status().is_success() {
        return Err(format!("Failed to download {}: HTTP {}", url, response.status()));
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| format!("Failed to read {}: {}", url, e))?;

    log::debug!("Downloaded {}KB preview from {}", bytes.len() / 1024, url);

    decode(bytes.to_vec(), max_width).await
}

/// Read a local placeholder and downscale it
pub async fn load_local(path: PathBuf, max_width: u32) -> Result<Preview, String> {
    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|e| format!("Failed to read placeholder {}: {}", path.display(), e))?;

    decode(bytes, max_width).await
}

/// Decode on the blocking pool
async fn decode(bytes: Vec<u8>, max_width: u32) -> Result<Preview, String> {
    tokio::task::spawn_blocking(move || decode_blocking(&bytes, max_width))
        .await
        .map_err(|e| format!("Task join error: {}", e))?
}

fn decode_blocking(bytes: &[u8], max_width: u32) -> Result<Preview, String> {
    let img = image::load_from_memory(bytes).map_err(|e| format!("Failed to decode image: {}", e))?;

    // Width-constrained, aspect ratio preserved
    let img = if img.width() > max_width {
        img.resize(max_width, max_width.saturating_mul(10), FilterType::Lanczos3)
    } else {
        img
    };

    let rgba = img.to_rgba8();
    Ok(Preview {
        width: rgba.width(),
        height: rgba.height(),
        pixels: rgba.into_raw(),
    })
}
