//! TFDA Import
//!
//! Loads the Taiwan FDA food composition export into the ingredients table.
//! The export has one row per (food, analysis item); rows are pivoted into one
//! record per food, averaging repeated items, and upserted by `tfda_id`.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::api::ClientError;
use crate::db::Database;
use crate::models::{Ingredient, NutrientKey, Nutrients, TfdaUpsert};

/// Open data export of the food composition table (dataset 20)
pub const TFDA_OPEN_DATA_URL: &str =
    "https://data.fda.gov.tw/opendata/exportDataList.do?method=openData&InfoId=20";

const FIELD_TFDA_ID: &str = "整合編號";
const FIELD_FOOD_NAME: &str = "樣品名稱";
const FIELD_ANALYSIS_ITEM: &str = "分析項";
const FIELD_PER_100G: &str = "每100克含量";

/// Analysis items kept from the export, in label order
const ANALYSIS_ITEMS: [(&str, NutrientKey); 8] = [
    ("熱量", NutrientKey::CaloriesKcal),
    ("粗蛋白", NutrientKey::ProteinG),
    ("粗脂肪", NutrientKey::FatG),
    ("飽和脂肪", NutrientKey::SaturatedFatG),
    ("反式脂肪", NutrientKey::TransFatG),
    ("總碳水化合物", NutrientKey::CarbohydrateG),
    ("糖質總量", NutrientKey::SugarG),
    ("鈉", NutrientKey::SodiumMg),
];

/// One food after pivoting
#[derive(Debug, Clone, PartialEq)]
pub struct TfdaRecord {
    pub tfda_id: String,
    pub food_name: String,
    pub nutrients: Nutrients,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub records: usize,
    pub inserted: usize,
    pub updated: usize,
}

fn analysis_key(item: &str) -> Option<NutrientKey> {
    ANALYSIS_ITEMS
        .iter()
        .find(|(name, _)| *name == item)
        .map(|(_, key)| *key)
}

/// Column names in the export sometimes carry stray whitespace
fn field<'a>(row: &'a Map<String, Value>, name: &str) -> Option<&'a Value> {
    row.iter().find(|(k, _)| k.trim() == name).map(|(_, v)| v)
}

fn text(value: Option<&Value>) -> Option<String> {
    let s = match value? {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    (!s.is_empty()).then_some(s)
}

/// Non-numeric amounts ("-", "", "trace") count as 0
fn amount(value: Option<&Value>) -> f64 {
    let parsed = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|v| v.is_finite()).unwrap_or(0.0)
}

#[derive(Default)]
struct Accumulator {
    sums: [f64; 8],
    counts: [u32; 8],
}

/// Parse the JSON export into one record per `(tfda_id, food_name)`
///
/// Items missing for a food are 0. Records come back ordered by id.
pub fn parse_records(raw: &str) -> Result<Vec<TfdaRecord>, serde_json::Error> {
    let rows: Vec<Map<String, Value>> = serde_json::from_str(raw)?;

    let mut foods: BTreeMap<(String, String), Accumulator> = BTreeMap::new();
    for row in &rows {
        let (Some(tfda_id), Some(food_name)) = (
            text(field(row, FIELD_TFDA_ID)),
            text(field(row, FIELD_FOOD_NAME)),
        ) else {
            continue;
        };
        let Some(key) = text(field(row, FIELD_ANALYSIS_ITEM)).and_then(|item| analysis_key(&item)) else {
            continue;
        };

        let slot = NutrientKey::ALL
            .iter()
            .position(|k| *k == key)
            .unwrap_or_default();
        let acc = foods.entry((tfda_id, food_name)).or_default();
        acc.sums[slot] += amount(field(row, FIELD_PER_100G));
        acc.counts[slot] += 1;
    }

    Ok(foods
        .into_iter()
        .map(|((tfda_id, food_name), acc)| {
            let mut nutrients = Nutrients::zero();
            for (slot, key) in NutrientKey::ALL.into_iter().enumerate() {
                if acc.counts[slot] > 0 {
                    nutrients.set(key, acc.sums[slot] / f64::from(acc.counts[slot]));
                }
            }
            TfdaRecord {
                tfda_id,
                food_name,
                nutrients,
            }
        })
        .collect())
}

/// Upsert every record in one transaction
pub fn import_records(db: &Database, records: &[TfdaRecord]) -> Result<ImportSummary, String> {
    let summary = db
        .with_transaction(|tx| {
            let mut summary = ImportSummary {
                records: records.len(),
                ..Default::default()
            };
            for record in records {
                match Ingredient::upsert_tfda(tx, &record.tfda_id, &record.food_name, &record.nutrients)? {
                    TfdaUpsert::Inserted(_) => summary.inserted += 1,
                    TfdaUpsert::Updated(_) => summary.updated += 1,
                }
            }
            Ok(summary)
        })
        .map_err(|e| format!("TFDA import failed: {}", e))?;

    tracing::info!(
        records = summary.records,
        inserted = summary.inserted,
        updated = summary.updated,
        "TFDA import finished"
    );
    Ok(summary)
}

/// Download and parse the export
pub async fn fetch_records(client: &reqwest::Client, url: &str) -> Result<Vec<TfdaRecord>, ClientError> {
    tracing::info!(url, "downloading TFDA export");
    let body = client
        .get(url)
        .header(reqwest::header::USER_AGENT, "Mozilla/5.0")
        .send()
        .await?
        .error_for_status()?
        .text()
        .await?;
    Ok(parse_records(&body)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::temp_db;
    use crate::models::SourceFilter;
    use crate::tools::ingredients::{self, IngredientForm};

    const EXPORT: &str = r#"[
        {"整合編號": "A0100101", "樣品名稱": "低筋麵粉", "分析項": "熱量", "每100克含量": "364"},
        {"整合編號": "A0100101", "樣品名稱": "低筋麵粉", "分析項": "粗蛋白", "每100克含量": " 8.2 "},
        {"整合編號": "A0100101", "樣品名稱": "低筋麵粉", "分析項 ": "鈉", "每100克含量": "-"},
        {"整合編號": "A0100101", "樣品名稱": "低筋麵粉", "分析項": "膳食纖維", "每100克含量": "2.1"},
        {"整合編號": "B0200202", "樣品名稱": "無鹽奶油", "分析項": "熱量", "每100克含量": 730},
        {"整合編號": "B0200202", "樣品名稱": "無鹽奶油", "分析項": "熱量", "每100克含量": "740"},
        {"整合編號": "B0200202", "樣品名稱": "無鹽奶油", "分析項": "粗脂肪", "每100克含量": "81.0"},
        {"整合編號": "", "樣品名稱": "無編號", "分析項": "熱量", "每100克含量": "100"}
    ]"#;

    #[test]
    fn test_parse_pivots_and_averages() {
        let records = parse_records(EXPORT).unwrap();
        assert_eq!(records.len(), 2);

        let flour = &records[0];
        assert_eq!(flour.tfda_id, "A0100101");
        assert_eq!(flour.food_name, "低筋麵粉");
        assert_eq!(flour.nutrients.calories_kcal, 364.0);
        assert_eq!(flour.nutrients.protein_g, 8.2);
        assert_eq!(flour.nutrients.sodium_mg, 0.0);
        assert_eq!(flour.nutrients.sugar_g, 0.0);

        let butter = &records[1];
        assert_eq!(butter.nutrients.calories_kcal, 735.0);
        assert_eq!(butter.nutrients.fat_g, 81.0);
        assert_eq!(butter.nutrients.protein_g, 0.0);
    }

    #[test]
    fn test_parse_rejects_non_array_body() {
        assert!(parse_records("<html>maintenance</html>").is_err());
        assert!(parse_records("[]").unwrap().is_empty());
    }

    #[test]
    fn test_reimport_updates_instead_of_inserting() {
        let (_dir, db) = temp_db();
        let first = import_records(&db, &parse_records(EXPORT).unwrap()).unwrap();
        assert_eq!(first, ImportSummary { records: 2, inserted: 2, updated: 0 });

        let changed = EXPORT.replace("\"364\"", "\"360\"");
        let second = import_records(&db, &parse_records(&changed).unwrap()).unwrap();
        assert_eq!(second, ImportSummary { records: 2, inserted: 0, updated: 2 });

        let rows = ingredients::search_ingredients(&db, "", SourceFilter::Tfda).unwrap();
        assert_eq!(rows.len(), 2);
        let flour = rows.iter().find(|r| r.name == "低筋麵粉").unwrap();
        assert_eq!(flour.details.nutrients.calories_kcal, 360.0);
        assert_eq!(flour.details.cost_per_unit, 0.0);
    }

    #[test]
    fn test_imported_rows_are_read_only() {
        let (_dir, db) = temp_db();
        import_records(&db, &parse_records(EXPORT).unwrap()).unwrap();

        let user_rows = ingredients::search_ingredients(&db, "", SourceFilter::User).unwrap();
        assert!(user_rows.is_empty());

        let flour = ingredients::search_ingredients(&db, "麵粉", SourceFilter::Tfda).unwrap();
        let mut form = IngredientForm {
            food_name: "Renamed".to_string(),
            cost_per_unit: Some(1.0),
            ..Default::default()
        };
        for key in NutrientKey::ALL {
            form.set_nutrient(key, Some(0.0));
        }
        let reply = ingredients::update_ingredient(&db, flour[0].id, form).unwrap();
        assert!(!reply.is_success());
    }
}
