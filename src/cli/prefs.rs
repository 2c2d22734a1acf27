use super::ui;
use crate::core::prefs::{PreferenceStore, PreferenceUpdate, UserPreferences};
use crate::core::source::SourceKind;
use anyhow::{Context, Result, bail};
use comfy_table::Cell;
use std::collections::{BTreeSet, HashMap};

pub async fn show(store: &dyn PreferenceStore, user_id: &str) -> Result<()> {
    let prefs = store.get(user_id).await?;
    print_preferences(&prefs);
    Ok(())
}

pub async fn set(
    store: &dyn PreferenceStore,
    user_id: &str,
    update: PreferenceUpdate,
) -> Result<()> {
    if update.is_empty() {
        bail!("Nothing to update; pass at least one preference flag");
    }
    let prefs = store.set(user_id, update).await?;
    println!(
        "{}",
        ui::style_text("Preferences updated.", ui::StyleType::Label)
    );
    print_preferences(&prefs);
    Ok(())
}

fn print_preferences(prefs: &UserPreferences) {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Setting"),
        ui::header_cell(&format!("Value (user: {})", prefs.user_id)),
    ]);

    let order = prefs
        .fallback_order
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ");
    let enabled = prefs
        .enabled_sources
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ");

    table.add_row(vec![Cell::new("Fallback order"), Cell::new(order)]);
    table.add_row(vec![Cell::new("Enabled sources"), Cell::new(enabled)]);
    table.add_row(vec![
        Cell::new("Default currency"),
        Cell::new(prefs.default_currency.as_deref().unwrap_or("(app default)")),
    ]);

    if prefs.custom_rates.is_empty() {
        table.add_row(vec![Cell::new("Custom rates"), Cell::new("(none)")]);
    } else {
        let mut rates: Vec<_> = prefs.custom_rates.iter().collect();
        rates.sort_by(|a, b| a.0.cmp(b.0));
        for (code, rate) in rates {
            table.add_row(vec![
                Cell::new(format!("Custom rate -> {code}")),
                Cell::new(format!("{rate}")),
            ]);
        }
    }

    println!("{table}");
}

/// Parses `--fallback-order api,llm` style lists.
pub fn parse_source_list(raw: &str) -> Result<Vec<SourceKind>> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse())
        .collect()
}

pub fn parse_source_set(raw: &str) -> Result<BTreeSet<SourceKind>> {
    Ok(parse_source_list(raw)?.into_iter().collect())
}

/// Parses a `CODE=RATE` override argument.
pub fn parse_rate_arg(raw: &str) -> Result<(String, f64)> {
    let (code, rate) = raw
        .split_once('=')
        .with_context(|| format!("Expected CODE=RATE, got {raw:?}"))?;
    let rate: f64 = rate
        .trim()
        .parse()
        .with_context(|| format!("Invalid rate in {raw:?}"))?;
    Ok((code.trim().to_string(), rate))
}

pub fn parse_rate_args(raw: &[String]) -> Result<HashMap<String, f64>> {
    raw.iter().map(|arg| parse_rate_arg(arg)).collect()
}
