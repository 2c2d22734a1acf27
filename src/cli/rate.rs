use super::ui;
use crate::core::resolver::{Provenance, RateResolver};
use anyhow::Result;

pub async fn run(resolver: &RateResolver, user_id: &str, base: &str, target: &str) -> Result<()> {
    let spinner = ui::fetch_spinner(&format!("Resolving {base}/{target}..."));
    let result = resolver.resolve(user_id, base, target).await;
    spinner.finish_and_clear();

    let resolved = result?;
    println!(
        "1 {} = {} {} {}",
        base.to_uppercase(),
        ui::style_text(&format!("{:.6}", resolved.rate), ui::StyleType::Value),
        target.to_uppercase(),
        ui::style_text(&format!("({})", resolved.provenance), ui::StyleType::Subtle),
    );
    print_staleness_note(resolved.provenance);
    Ok(())
}

pub fn print_staleness_note(provenance: Provenance) {
    if provenance.is_stale() {
        println!(
            "{}",
            ui::style_text(
                "Approximate default rate; live sources were unavailable.",
                ui::StyleType::Warning,
            )
        );
    }
}
