//! Purchase units
//!
//! Weight conversion for price observations so a price can be expressed as
//! cost per 100 g.

/// Grams per milligram
pub const G_PER_MG: f64 = 0.001;
/// Grams per kilogram
pub const G_PER_KG: f64 = 1000.0;
/// Grams per ounce
pub const G_PER_OZ: f64 = 28.3495;
/// Grams per pound
pub const G_PER_LB: f64 = 453.592;
/// Grams per catty (jin), as sold in Taiwanese markets
pub const G_PER_CATTY: f64 = 600.0;
/// Grams per tael (liang)
pub const G_PER_TAEL: f64 = 37.5;

/// Conversion factor to grams for a weight unit
pub fn grams_per_unit(unit: &str) -> Option<f64> {
    let lower = unit.to_lowercase();
    let trimmed = lower.trim();

    match trimmed {
        "g" | "gram" | "grams" | "公克" | "克" => Some(1.0),
        "mg" | "milligram" | "milligrams" | "毫克" => Some(G_PER_MG),
        "kg" | "kilogram" | "kilograms" | "公斤" => Some(G_PER_KG),
        "oz" | "ounce" | "ounces" => Some(G_PER_OZ),
        "lb" | "lbs" | "pound" | "pounds" => Some(G_PER_LB),
        "jin" | "catty" | "斤" | "台斤" => Some(G_PER_CATTY),
        "liang" | "tael" | "兩" => Some(G_PER_TAEL),
        _ => None,
    }
}

/// Cost per 100 g for a purchase, when the unit is a weight unit
pub fn cost_per_100g(price: f64, quantity: f64, unit: &str) -> Option<f64> {
    let grams = quantity * grams_per_unit(unit)?;
    if grams <= 0.0 {
        return None;
    }
    Some(price * 100.0 / grams)
}
