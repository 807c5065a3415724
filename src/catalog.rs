use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ClaimError, ClaimResult};
use crate::money::Money;

/// Billing category of a procedure code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcedureCategory {
    EvaluationAndManagement,
    Laboratory,
    Radiology,
    Surgical,
    Cardiology,
    Emergency,
    PhysicalTherapy,
    Pharmacy,
}

/// One entry of the procedure reference table: a billing code with its list
/// price and optional diagnosis/DRG cross-references.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcedureCode {
    pub code: String,
    pub name: String,
    pub category: ProcedureCategory,
    pub price: Money,
    pub diagnosis_code: Option<String>,
    pub grouping_code: Option<String>,
}

/// Read-only lookup table of procedure codes, loaded once at startup.
#[derive(Debug, Default)]
pub struct ProcedureCatalog {
    codes: HashMap<String, ProcedureCode>,
}

impl ProcedureCatalog {
    pub fn from_codes(codes: impl IntoIterator<Item = ProcedureCode>) -> ClaimResult<Self> {
        let mut map = HashMap::new();
        for entry in codes {
            if map.contains_key(&entry.code) {
                return Err(ClaimError::DuplicateProcedureCode(entry.code));
            }
            map.insert(entry.code.clone(), entry);
        }
        Ok(Self { codes: map })
    }

    /// Load a catalog from a JSON array file.
    pub fn load_json(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let codes: Vec<ProcedureCode> = serde_json::from_str(&raw)?;
        Ok(Self::from_codes(codes)?)
    }

    pub fn get(&self, code: &str) -> Option<&ProcedureCode> {
        self.codes.get(code)
    }

    pub fn codes(&self) -> impl Iterator<Item = &ProcedureCode> {
        self.codes.values()
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    /// Built-in reference set used by the simulation binary and tests.
    pub fn standard() -> Self {
        let entry = |code: &str,
                     name: &str,
                     category: ProcedureCategory,
                     price: f64,
                     diagnosis: Option<&str>,
                     grouping: Option<&str>| ProcedureCode {
            code: code.to_string(),
            name: name.to_string(),
            category,
            price: Money::from_dollars(price),
            diagnosis_code: diagnosis.map(str::to_string),
            grouping_code: grouping.map(str::to_string),
        };

        let codes = vec![
            entry(
                "99213",
                "Office visit, established patient, low complexity",
                ProcedureCategory::EvaluationAndManagement,
                135.00,
                None,
                None,
            ),
            entry(
                "99214",
                "Office visit, established patient, moderate complexity",
                ProcedureCategory::EvaluationAndManagement,
                185.00,
                None,
                None,
            ),
            entry(
                "80053",
                "Comprehensive metabolic panel",
                ProcedureCategory::Laboratory,
                48.00,
                Some("E11.9"),
                None,
            ),
            entry(
                "85025",
                "Complete blood count with differential",
                ProcedureCategory::Laboratory,
                32.00,
                None,
                None,
            ),
            entry(
                "71046",
                "Chest x-ray, 2 views",
                ProcedureCategory::Radiology,
                210.00,
                Some("J18.9"),
                None,
            ),
            entry(
                "70553",
                "MRI brain without and with contrast",
                ProcedureCategory::Radiology,
                1450.00,
                None,
                None,
            ),
            entry(
                "93000",
                "Electrocardiogram with interpretation",
                ProcedureCategory::Cardiology,
                95.00,
                Some("I48.91"),
                None,
            ),
            entry(
                "93452",
                "Left heart catheterization",
                ProcedureCategory::Cardiology,
                8372.50,
                Some("I25.10"),
                Some("DRG-287"),
            ),
            entry(
                "29881",
                "Knee arthroscopy with meniscectomy",
                ProcedureCategory::Surgical,
                4200.00,
                Some("M23.205"),
                Some("DRG-470"),
            ),
            entry(
                "99283",
                "Emergency department visit, moderate severity",
                ProcedureCategory::Emergency,
                620.00,
                None,
                None,
            ),
            entry(
                "99285",
                "Emergency department visit, high severity",
                ProcedureCategory::Emergency,
                1380.00,
                None,
                None,
            ),
            entry(
                "97110",
                "Therapeutic exercise, 15 minutes",
                ProcedureCategory::PhysicalTherapy,
                75.00,
                None,
                None,
            ),
        ];

        Self::from_codes(codes).expect("built-in catalog has no duplicate codes")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_catalog_lookup() {
        let catalog = ProcedureCatalog::standard();
        assert!(!catalog.is_empty());

        let visit = catalog.get("99213").expect("99213 should be present");
        assert_eq!(visit.price, Money::from_dollars(135.00));
        assert_eq!(visit.category, ProcedureCategory::EvaluationAndManagement);

        assert!(catalog.get("00000").is_none());
    }

    #[test]
    fn test_duplicate_code_rejected() {
        let dup = ProcedureCode {
            code: "99213".to_string(),
            name: "Office visit".to_string(),
            category: ProcedureCategory::EvaluationAndManagement,
            price: Money::from_dollars(135.00),
            diagnosis_code: None,
            grouping_code: None,
        };
        let err = ProcedureCatalog::from_codes(vec![dup.clone(), dup]).unwrap_err();
        assert_eq!(err, ClaimError::DuplicateProcedureCode("99213".to_string()));
    }

    #[test]
    fn test_catalog_json_round_trip() {
        let catalog = ProcedureCatalog::standard();
        let codes: Vec<&ProcedureCode> = catalog.codes().collect();
        let json = serde_json::to_string(&codes).expect("serialize catalog");

        let parsed: Vec<ProcedureCode> = serde_json::from_str(&json).expect("parse catalog");
        let reloaded = ProcedureCatalog::from_codes(parsed).expect("rebuild catalog");
        assert_eq!(reloaded.len(), catalog.len());
        assert_eq!(
            reloaded.get("93452").unwrap().price,
            Money::from_dollars(8372.50)
        );
    }
}
