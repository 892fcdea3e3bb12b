//! Data model for persisted analyses.
//!
//! An [`AnalysisRecord`] is one compliance analysis of a product photo as it
//! is written to `analyses.json`. The seven core fields are always present;
//! the extended fields are optional because records written by earlier app
//! versions do not carry them.

use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use crate::store_error::StoreError;

/// Review state of an analysis.
///
/// Serialized by variant name (`"Pending"`, `"Reviewed"`, `"Completed"`).
/// Any other string fails deserialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnalysisStatus {
    Pending,
    Reviewed,
    Completed,
}

/// Named nutrition quantities, e.g. `calories`, `protein`, `sodium`.
pub type NutritionFacts = BTreeMap<String, f64>;

/// Regulatory verdict together with the issues that produced it.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegulatoryCompliance {
    pub is_compliant: bool,
    #[serde(default)]
    pub issues: Vec<String>,
}

/// One analysis entry in the store.
///
/// # Examples
///
/// ```rust
/// use analysis_store::analysis_record::{AnalysisRecord, AnalysisStatus};
///
/// let record = AnalysisRecord::new(
///     "1",
///     "2024-02-15",
///     "Protein Shake",
///     "file://a.jpg",
///     "Non-Compliant",
///     AnalysisStatus::Reviewed,
///     false,
/// )
/// .with_quality_score("4/10");
///
/// let json = serde_json::to_string(&record)?;
/// assert!(json.contains(r#""productName":"Protein Shake""#));
/// assert!(!json.contains("nutritionFacts"));
/// # Ok::<(), serde_json::Error>(())
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRecord {
    /// Unique key within the store. Saving another record with the same id
    /// replaces this one.
    pub id: String,

    /// Calendar date of the analysis, `YYYY-MM-DD`. Not validated.
    pub date: String,

    pub product_name: String,

    /// Locator of the source image. Never opened by the store.
    pub image_uri: String,

    /// Free-text summary, e.g. `"Non-Compliant - High Sodium"`.
    pub result: String,

    pub status: AnalysisStatus,

    pub compliant: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nutrition_facts: Option<NutritionFacts>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regulatory_compliance: Option<RegulatoryCompliance>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality_score: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommended_actions: Option<Vec<String>>,

    /// Fields this version does not know about. Kept so that a newer app's
    /// data survives being rewritten by an older one.
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

impl AnalysisRecord {
    pub fn new(
        id: impl Into<String>,
        date: impl Into<String>,
        product_name: impl Into<String>,
        image_uri: impl Into<String>,
        result: impl Into<String>,
        status: AnalysisStatus,
        compliant: bool,
    ) -> Self {
        Self {
            id: id.into(),
            date: date.into(),
            product_name: product_name.into(),
            image_uri: image_uri.into(),
            result: result.into(),
            status,
            compliant,
            nutrition_facts: None,
            regulatory_compliance: None,
            quality_score: None,
            recommended_actions: None,
            extra: Map::new(),
        }
    }

    pub fn with_nutrition_facts(mut self, facts: NutritionFacts) -> Self {
        self.nutrition_facts = Some(facts);
        self
    }

    pub fn with_regulatory_compliance(mut self, compliance: RegulatoryCompliance) -> Self {
        self.regulatory_compliance = Some(compliance);
        self
    }

    pub fn with_quality_score(mut self, score: impl Into<String>) -> Self {
        self.quality_score = Some(score.into());
        self
    }

    pub fn with_recommended_actions(mut self, actions: Vec<String>) -> Self {
        self.recommended_actions = Some(actions);
        self
    }

    /// Id derived from the current time in milliseconds since the Unix epoch.
    ///
    /// Two calls within the same millisecond return the same id, and the
    /// later save replaces the earlier one.
    pub fn timestamp_id() -> String {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default();
        millis.to_string()
    }

    /// Checks the invariants the store needs before accepting a write.
    pub fn validate(&self) -> Result<(), StoreError> {
        if self.id.trim().is_empty() {
            return Err(StoreError::InvalidRecord(
                "analysis id must not be empty".to_string(),
            ));
        }

        // JSON has no NaN or infinity; serde_json would write them as null
        // and the document would no longer parse.
        if let Some(facts) = &self.nutrition_facts {
            if let Some((name, value)) = facts.iter().find(|(_, value)| !value.is_finite()) {
                return Err(StoreError::InvalidRecord(format!(
                    "nutrition fact '{name}' must be a finite number, got {value}"
                )));
            }
        }
        Ok(())
    }
}
