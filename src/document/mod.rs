//! Document filling
//!
//! Flattens the collected slots into the value map the form overlay
//! expects, and computes where each value is drawn on the page.
//! Rendering the final PDF is left to the overlay collaborator, which
//! consumes the manifest written by `ManifestFiller`.

use crate::error::IntakeError;
use crate::schema::{MERCHANT_INITIALS, MERCHANT_SIGNATURE_NAME};
use crate::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Number of initials boxes on the form
pub const INITIALS_COPIES: usize = 7;
const SIGNATURE_FIELDS: &[&str] = &["signer1signature1", "signer1signature2"];

const MAX_FONT_SIZE: f32 = 11.0;
const MIN_FONT_SIZE: f32 = 4.0;

/// Flat field-name → text mapping handed to the overlay
pub type FormValues = BTreeMap<String, String>;

/// Normalise raw slot values and fan out initials and signature name.
///
/// `None` and the literal string "null" become empty strings.
pub fn flatten_form_data<I, K>(values: I) -> FormValues
where
    I: IntoIterator<Item = (K, Option<String>)>,
    K: Into<String>,
{
    let mut flat: FormValues = values
        .into_iter()
        .map(|(k, v)| {
            let v = v.filter(|s| s != "null").unwrap_or_default();
            (k.into(), v)
        })
        .collect();

    if let Some(initials) = flat.get(MERCHANT_INITIALS).filter(|v| !v.is_empty()).cloned() {
        for i in 1..=INITIALS_COPIES {
            flat.insert(format!("{}{}", MERCHANT_INITIALS, i), initials.clone());
        }
    }

    if let Some(name) = flat.get(MERCHANT_SIGNATURE_NAME).filter(|v| !v.is_empty()).cloned() {
        for field in SIGNATURE_FIELDS {
            flat.insert(field.to_string(), name.clone());
        }
    }

    flat
}

/// Page position of a form field, in PDF points
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FieldPosition {
    pub page: u32,
    pub rect: [f32; 4],
}

/// Field layout of the blank form
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FormLayout {
    pub fields: BTreeMap<String, FieldPosition>,
}

impl FormLayout {
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = tokio::fs::read_to_string(path).await.map_err(|e| {
            IntakeError::DocumentError(format!("cannot read form layout {}: {}", path.display(), e))
        })?;
        let fields: BTreeMap<String, FieldPosition> = serde_json::from_str(&raw)?;
        info!(fields = fields.len(), path = %path.display(), "Loaded form layout");
        Ok(Self { fields })
    }
}

/// One value drawn onto the page
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TextPlacement {
    pub field: String,
    pub page: u32,
    pub x: f32,
    pub y: f32,
    pub font_size: f32,
    pub text: String,
}

/// Placement for every layout field that has a non-empty value
pub fn plan_overlay(layout: &FormLayout, values: &FormValues) -> Vec<TextPlacement> {
    layout
        .fields
        .iter()
        .filter_map(|(field, position)| {
            let text = values.get(field).filter(|v| !v.is_empty())?;
            let [x0, y0, _x1, y1] = position.rect;
            let height = y1 - y0;

            Some(TextPlacement {
                field: field.clone(),
                page: position.page,
                x: x0 + 2.0,
                y: y0 + height * 0.75,
                font_size: (height - 2.0).clamp(MIN_FONT_SIZE, MAX_FONT_SIZE),
                text: text.clone(),
            })
        })
        .collect()
}

/// SHA-256 over the sorted `field=value` lines
pub fn form_digest(values: &FormValues) -> String {
    let mut hasher = Sha256::new();
    for (field, value) in values {
        hasher.update(field.as_bytes());
        hasher.update(b"=");
        hasher.update(value.as_bytes());
        hasher.update(b"\n");
    }
    hex::encode(hasher.finalize())
}

/// Everything the renderer needs to produce the filled form
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FillManifest {
    pub created_at: DateTime<Utc>,
    pub form_digest: String,
    pub signature_image: Option<PathBuf>,
    pub placements: Vec<TextPlacement>,
}

/// Trait for document producers
#[async_trait]
pub trait DocumentFiller: Send + Sync {
    async fn fill(&self, values: &FormValues, signature_image: Option<&Path>) -> Result<PathBuf>;
}

/// Writes the overlay plan as a JSON manifest
pub struct ManifestFiller {
    layout: FormLayout,
    output_path: PathBuf,
}

impl ManifestFiller {
    pub fn new(layout: FormLayout, output_path: impl Into<PathBuf>) -> Self {
        Self {
            layout,
            output_path: output_path.into(),
        }
    }
}

#[async_trait]
impl DocumentFiller for ManifestFiller {
    async fn fill(&self, values: &FormValues, signature_image: Option<&Path>) -> Result<PathBuf> {
        let placements = plan_overlay(&self.layout, values);
        for p in &placements {
            debug!(field = %p.field, page = p.page, "Placing value");
        }

        let manifest = FillManifest {
            created_at: Utc::now(),
            form_digest: form_digest(values),
            signature_image: signature_image.map(Path::to_path_buf),
            placements,
        };

        if let Some(parent) = self.output_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let body = serde_json::to_vec_pretty(&manifest)?;
        tokio::fs::write(&self.output_path, body).await?;

        info!(
            placements = manifest.placements.len(),
            path = %self.output_path.display(),
            "Filled form manifest written"
        );
        Ok(self.output_path.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout() -> FormLayout {
        let mut fields = BTreeMap::new();
        fields.insert(
            "SiteCompanyName1".to_string(),
            FieldPosition { page: 0, rect: [100.0, 200.0, 300.0, 220.0] },
        );
        fields.insert(
            "MerchantInitials3".to_string(),
            FieldPosition { page: 2, rect: [50.0, 700.0, 80.0, 708.0] },
        );
        fields.insert(
            "SiteFax".to_string(),
            FieldPosition { page: 0, rect: [0.0, 0.0, 10.0, 10.0] },
        );
        FormLayout { fields }
    }

    #[test]
    fn test_flatten_fans_out_initials_and_signature() {
        let flat = flatten_form_data(vec![
            ("MerchantInitials", Some("JD".to_string())),
            ("MerchantSignatureName", Some("Jane Doe".to_string())),
            ("SiteFax", None),
            ("SiteVoice", Some("null".to_string())),
        ]);

        for i in 1..=7 {
            assert_eq!(flat[&format!("MerchantInitials{}", i)], "JD");
        }
        assert!(!flat.contains_key("MerchantInitials8"));
        assert_eq!(flat["signer1signature1"], "Jane Doe");
        assert_eq!(flat["signer1signature2"], "Jane Doe");
        assert_eq!(flat["SiteFax"], "");
        assert_eq!(flat["SiteVoice"], "");
    }

    #[test]
    fn test_flatten_without_initials() {
        let flat = flatten_form_data(vec![("MerchantInitials", None::<String>)]);
        assert_eq!(flat.len(), 1);
        assert!(!flat.contains_key("MerchantInitials1"));
    }

    #[test]
    fn test_overlay_placement_heuristics() {
        let values = flatten_form_data(vec![
            ("SiteCompanyName1", Some("Jane's Burgers".to_string())),
            ("MerchantInitials", Some("JD".to_string())),
            ("SiteFax", None),
        ]);

        let placements = plan_overlay(&layout(), &values);
        assert_eq!(placements.len(), 2);

        let initials = placements.iter().find(|p| p.field == "MerchantInitials3").unwrap();
        assert_eq!(initials.page, 2);
        assert_eq!(initials.x, 52.0);
        assert_eq!(initials.y, 706.0);
        assert_eq!(initials.font_size, 6.0);

        let name = placements.iter().find(|p| p.field == "SiteCompanyName1").unwrap();
        assert_eq!(name.font_size, 11.0);
        assert_eq!(name.y, 215.0);
    }

    #[test]
    fn test_tiny_rect_keeps_positive_font() {
        let mut fields = BTreeMap::new();
        fields.insert(
            "SiteCity".to_string(),
            FieldPosition { page: 0, rect: [10.0, 10.0, 60.0, 11.5] },
        );
        let values = flatten_form_data(vec![("SiteCity", Some("Austin".to_string()))]);

        let placements = plan_overlay(&FormLayout { fields }, &values);
        assert_eq!(placements[0].font_size, MIN_FONT_SIZE);
    }

    #[test]
    fn test_digest_is_stable() {
        let a = flatten_form_data(vec![("SiteCity", Some("Austin".to_string()))]);
        let b = flatten_form_data(vec![("SiteCity", Some("Austin".to_string()))]);
        let c = flatten_form_data(vec![("SiteCity", Some("Dallas".to_string()))]);

        assert_eq!(form_digest(&a), form_digest(&b));
        assert_ne!(form_digest(&a), form_digest(&c));
        assert_eq!(form_digest(&a).len(), 64);
    }

    #[tokio::test]
    async fn test_manifest_filler_writes_json() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out").join("filled_form.json");
        let filler = ManifestFiller::new(layout(), &output);
        let values = flatten_form_data(vec![("SiteCompanyName1", Some("Jane's Burgers".to_string()))]);

        let written = filler.fill(&values, None).await.unwrap();
        assert_eq!(written, output);

        let raw = tokio::fs::read_to_string(&output).await.unwrap();
        let manifest: FillManifest = serde_json::from_str(&raw).unwrap();
        assert_eq!(manifest.placements.len(), 1);
        assert_eq!(manifest.form_digest, form_digest(&values));
    }

    #[tokio::test]
    async fn test_layout_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("layout.json");
        tokio::fs::write(&path, r#"{"SiteCity": {"page": 0, "rect": [1, 2, 3, 14]}}"#)
            .await
            .unwrap();

        let layout = FormLayout::load(&path).await.unwrap();
        assert_eq!(layout.fields["SiteCity"].rect, [1.0, 2.0, 3.0, 14.0]);

        assert!(FormLayout::load(dir.path().join("missing.json")).await.is_err());
    }
}
