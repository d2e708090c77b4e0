//! Label Tools
//!
//! Printable nutrition label PDF for a stored recipe.

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use printpdf::*;
use serde::Serialize;

use crate::costing::{recompute, LabelData};
use crate::db::Database;
use crate::models::Recipe;

// Label stock: 100 x 150 mm
const PAGE_WIDTH_MM: f32 = 100.0;
const PAGE_HEIGHT_MM: f32 = 150.0;
const MARGIN_MM: f32 = 6.0;

const COLOR_BLACK: (u8, u8, u8) = (0, 0, 0);
const COLOR_GRAY: (u8, u8, u8) = (128, 128, 128);

// Characters per line at 8 pt Helvetica across the printable width
const WRAP_CHARS: usize = 52;

#[derive(Debug, Serialize)]
pub struct ExportLabelResponse {
    pub success: bool,
    pub file_path: String,
    pub recipe_id: i64,
    pub message: String,
}

/// Output path of a recipe's label inside the label directory
pub fn label_path(label_dir: &Path, recipe_id: i64) -> PathBuf {
    label_dir.join(format!("recipe-{}.pdf", recipe_id))
}

fn rgb_to_printpdf(r: u8, g: u8, b: u8) -> Color {
    Color::Rgb(Rgb::new(
        r as f32 / 255.0,
        g as f32 / 255.0,
        b as f32 / 255.0,
        None,
    ))
}

fn add_text(
    layer: &PdfLayerReference,
    font: &IndirectFontRef,
    text: &str,
    x: Mm,
    y: Mm,
    size: f32,
    color: (u8, u8, u8),
) {
    layer.set_fill_color(rgb_to_printpdf(color.0, color.1, color.2));
    layer.use_text(text, size, x, y, font);
}

fn add_line(
    layer: &PdfLayerReference,
    x1: Mm,
    y1: Mm,
    x2: Mm,
    y2: Mm,
    color: (u8, u8, u8),
    width: f32,
) {
    layer.set_outline_color(rgb_to_printpdf(color.0, color.1, color.2));
    layer.set_outline_thickness(width);

    let line = Line {
        points: vec![
            (Point::new(x1, y1), false),
            (Point::new(x2, y2), false),
        ],
        is_closed: false,
    };
    layer.add_line(line);
}

/// Greedy word wrap on character count
fn wrap(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        let needed = if current.is_empty() {
            word.chars().count()
        } else {
            current.chars().count() + 1 + word.chars().count()
        };
        if needed > width && !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// Render label data into a PDF at `output_path`
pub fn write_label_pdf(label: &LabelData, output_path: &Path) -> Result<(), String> {
    let (doc, page, layer) = PdfDocument::new(
        format!("Label - {}", label.product_name),
        Mm(PAGE_WIDTH_MM),
        Mm(PAGE_HEIGHT_MM),
        "Layer 1",
    );

    let font = doc.add_builtin_font(BuiltinFont::Helvetica)
        .map_err(|e| e.to_string())?;
    let font_bold = doc.add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(|e| e.to_string())?;
    let font_mono = doc.add_builtin_font(BuiltinFont::Courier)
        .map_err(|e| e.to_string())?;

    let layer = doc.get_page(page).get_layer(layer);
    let right = PAGE_WIDTH_MM - MARGIN_MM;
    let mut y = PAGE_HEIGHT_MM - 12.0;

    add_text(&layer, &font_bold, &label.product_name, Mm(MARGIN_MM), Mm(y), 14.0, COLOR_BLACK);
    y -= 4.0;
    add_line(&layer, Mm(MARGIN_MM), Mm(y), Mm(right), Mm(y), COLOR_BLACK, 1.0);
    y -= 6.0;

    for line in wrap(&format!("Ingredients: {}", label.ingredients), WRAP_CHARS) {
        add_text(&layer, &font, &line, Mm(MARGIN_MM), Mm(y), 8.0, COLOR_BLACK);
        y -= 4.0;
    }
    y -= 1.0;
    add_text(&layer, &font, &format!("Net weight: {}", label.net_weight), Mm(MARGIN_MM), Mm(y), 8.0, COLOR_BLACK);
    y -= 5.0;

    add_line(&layer, Mm(MARGIN_MM), Mm(y), Mm(right), Mm(y), COLOR_GRAY, 0.5);
    y -= 5.0;
    add_text(&layer, &font_bold, "Nutrition Facts", Mm(MARGIN_MM), Mm(y), 10.0, COLOR_BLACK);
    y -= 5.0;

    // Monospaced so the table columns line up
    for line in label.nutrition.lines() {
        add_text(&layer, &font_mono, line, Mm(MARGIN_MM), Mm(y), 6.5, COLOR_BLACK);
        y -= 3.5;
    }

    if !label.allergens.is_empty() {
        y -= 2.0;
        add_line(&layer, Mm(MARGIN_MM), Mm(y), Mm(right), Mm(y), COLOR_GRAY, 0.5);
        y -= 5.0;
        for line in wrap(&label.allergens, WRAP_CHARS) {
            add_text(&layer, &font_bold, &line, Mm(MARGIN_MM), Mm(y), 8.0, COLOR_BLACK);
            y -= 4.0;
        }
    }

    if let Some(parent) = output_path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| e.to_string())?;
    }

    let file = File::create(output_path).map_err(|e| e.to_string())?;
    let mut writer = BufWriter::new(file);
    doc.save(&mut writer).map_err(|e| e.to_string())?;
    Ok(())
}

/// Export the label of a stored recipe as `recipe-{id}.pdf`
pub fn export_label_pdf(db: &Database, label_dir: &Path, recipe_id: i64) -> Result<ExportLabelResponse, String> {
    let conn = db.get_conn().map_err(|e| e.to_string())?;
    let state = Recipe::load_state(&conn, recipe_id)
        .map_err(|e| e.to_string())?
        .ok_or_else(|| format!("Recipe {} not found", recipe_id))?;

    if !recompute(&state).can_print {
        return Err("The recipe has no weight yet; add ingredient quantities or a final weight first.".to_string());
    }

    let label = crate::costing::generate_label(&state);
    let path = label_path(label_dir, recipe_id);
    write_label_pdf(&label, &path)?;
    tracing::info!(recipe_id, path = %path.display(), "label exported");

    Ok(ExportLabelResponse {
        success: true,
        file_path: path.display().to_string(),
        recipe_id,
        message: format!("Label for \"{}\" written", label.product_name),
    })
}
