//! Headless scene configuration

use synavis_core::{AssetCatalogEntry, AssetKind};

/// Configuration for [`HeadlessScene`](crate::HeadlessScene)
#[derive(Debug, Clone)]
pub struct HeadlessConfig {
    /// Populate `Sun` and `Camera1` (default: true)
    pub demo_scene: bool,
    /// Ticks before an asset load completes (default: 2)
    pub load_latency: u32,
    /// Object path receiving settings blobs; `None` targets the world settings
    pub settings_target: Option<String>,
    /// Spawnable assets by name
    pub assets: Vec<(String, AssetCatalogEntry)>,
}

impl Default for HeadlessConfig {
    fn default() -> Self {
        Self {
            demo_scene: true,
            load_latency: 2,
            settings_target: None,
            assets: vec![
                mesh("Maize", "/Game/Plants/Maize/SM_Maize"),
                mesh("Soybean", "/Game/Plants/Soybean/SM_Soybean"),
                mesh("Wheat", "/Game/Plants/Wheat/SM_Wheat"),
                (
                    "Soil".to_string(),
                    AssetCatalogEntry {
                        source_path: "/Game/Materials/M_Soil".into(),
                        kind: AssetKind::Material,
                    },
                ),
            ],
        }
    }
}

fn mesh(name: &str, path: &str) -> (String, AssetCatalogEntry) {
    (
        name.to_string(),
        AssetCatalogEntry {
            source_path: path.to_string(),
            kind: AssetKind::Mesh,
        },
    )
}
