use super::{rate, ui};
use crate::core::resolver::RateResolver;
use anyhow::Result;

pub async fn run(
    resolver: &RateResolver,
    user_id: &str,
    amount: f64,
    base: &str,
    target: &str,
) -> Result<()> {
    let spinner = ui::fetch_spinner(&format!("Converting {amount} {base} to {target}..."));
    let result = resolver.convert(user_id, amount, base, target).await;
    spinner.finish_and_clear();

    let conversion = result?;
    println!(
        "{} {} = {} {} {}",
        conversion.amount,
        base.to_uppercase(),
        ui::style_text(
            &format!("{:.2}", conversion.converted),
            ui::StyleType::Value
        ),
        target.to_uppercase(),
        ui::style_text(
            &format!("(rate {:.6}, {})", conversion.rate, conversion.provenance),
            ui::StyleType::Subtle
        ),
    );
    rate::print_staleness_note(conversion.provenance);
    Ok(())
}
