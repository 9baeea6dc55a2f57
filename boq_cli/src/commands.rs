//! Command handlers.
//!
//! Every command that changes a quote takes the file lock, applies its
//! actions through the reducer and writes the final snapshot once.

use std::path::Path;

use anyhow::{bail, Context, Result};
use serde_json::Value;
use tracing::{info, warn};

use boq_core::boq::{consolidate, BoqSection};
use boq_core::file_io::{load_quote, load_quote_with_lock_check, read_json, save_quote, FileSink};
use boq_core::persist::{WriteCoalescer, DEFAULT_DELAY};
use boq_core::quote::ComputedOutputs;
use boq_core::{
    recompute, reduce, resolve_settings, CalculationItem, FileLock, PriceInputs, QuoteAction,
    QuoteSnapshot,
};

use crate::cli::{AddArgs, BillArgs, GlobalArgs, NewArgs, RecomputeArgs, SettingsArgs, SummaryArgs};

const RULE: &str = "═══════════════════════════════════════════════════════════════════════════";

fn banner(title: &str) {
    println!("{RULE}");
    println!("  {title}");
    println!("{RULE}");
}

fn load(path: &Path) -> Result<QuoteSnapshot> {
    let (quote, lock) = load_quote_with_lock_check(path)
        .with_context(|| format!("cannot open quote {}", path.display()))?;
    if let Some(lock) = lock {
        warn!(
            user = %lock.user_id,
            machine = %lock.machine,
            "quote is open elsewhere; treat it as read-only"
        );
    }
    Ok(quote)
}

/// Load a quote whose lock this process already holds.
fn load_held(path: &Path) -> Result<QuoteSnapshot> {
    load_quote(path).with_context(|| format!("cannot open quote {}", path.display()))
}

/// Load, apply `actions`, and write the result under the file lock.
fn edit(path: &Path, global: &GlobalArgs, actions: Vec<QuoteAction>) -> Result<QuoteSnapshot> {
    let _lock = FileLock::acquire(path, global.user_id())?;
    let mut quote = load_held(path)?;

    let mut writer = WriteCoalescer::new(FileSink::new(path), DEFAULT_DELAY);
    for action in actions {
        quote = reduce(&quote, action);
        writer.submit(quote.clone(), std::time::Instant::now());
    }
    writer.flush()?;
    Ok(quote)
}

pub fn new(args: &NewArgs, global: &GlobalArgs) -> Result<()> {
    if args.path.exists() && !args.force {
        bail!("{} already exists (use --force to overwrite)", args.path.display());
    }
    let mut quote = QuoteSnapshot::new(&args.title, &args.client, &args.region);
    quote.meta.user_id = global.user_id();
    save_quote(&quote, &args.path)?;
    println!("Created {} ({}, {})", args.path.display(), quote.meta.title, quote.region);
    Ok(())
}

fn parse_rows(value: Value) -> Result<Vec<CalculationItem>> {
    let rows = match value {
        Value::Array(_) => serde_json::from_value(value)?,
        other => vec![serde_json::from_value(other)?],
    };
    Ok(rows)
}

pub fn add(args: &AddArgs, global: &GlobalArgs) -> Result<()> {
    let raw: Value = read_json(&args.rows)?;
    let rows = parse_rows(raw).with_context(|| format!("invalid rows in {}", args.rows.display()))?;
    let count = rows.len();
    let quote = edit(
        &args.path,
        global,
        rows.into_iter().map(QuoteAction::AddRow).collect(),
    )?;
    info!(added = count, "rows added");
    println!("Added {} row(s); quote now has {}", count, quote.row_count());
    Ok(())
}

pub fn settings(args: &SettingsArgs, global: &GlobalArgs) -> Result<()> {
    let raw: Value = read_json(&args.settings)?;
    let resolved = resolve_settings(&raw);
    for issue in &resolved.issues {
        warn!("{issue}");
    }
    edit(&args.path, global, vec![QuoteAction::SetSettings(resolved.value)])?;
    println!(
        "Settings updated ({} issue(s) while resolving)",
        resolved.issues.len()
    );
    Ok(())
}

pub fn recompute_quote(args: &RecomputeArgs, global: &GlobalArgs) -> Result<()> {
    let prices = match &args.prices {
        Some(path) => read_json::<PriceInputs>(path)
            .with_context(|| format!("cannot read prices from {}", path.display()))?,
        None => {
            warn!("no price file given; every material will be unpriced");
            PriceInputs::default()
        }
    };

    let _lock = FileLock::acquire(&args.path, global.user_id())?;
    let quote = load_held(&args.path)?;
    let quote = recompute(&quote, &prices)?;
    save_quote(&quote, &args.path)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&quote.computed)?);
    } else {
        print_totals(&quote);
    }
    Ok(())
}

fn print_totals(quote: &QuoteSnapshot) {
    let computed = &quote.computed;
    let totals = &computed.totals;

    banner(&format!("{} - {}", quote.meta.title, quote.region));
    println!();
    println!("Quantities:");
    println!("  Concrete:       {:>12.2} m³", totals.quantities.concrete_m3);
    println!("  Walling:        {:>12.2} m²", totals.quantities.wall_area_m2);
    println!("  Reinforcement:  {:>12.2} kg", totals.quantities.reinforcement_kg);
    println!("  Cable:          {:>12.2} m", totals.quantities.cable_m);
    println!("  Finishes:       {:>12.2} m²", totals.quantities.finishes_m2);
    println!("  Roofing:        {:>12.2} m²", totals.quantities.roof_area_m2);
    println!("  Pipework:       {:>12.2} m", totals.quantities.pipe_m);
    println!();
    println!("By trade:");
    for (trade, cost) in &totals.by_trade {
        println!("  {:<16}{:>14.2}", trade.display_name(), cost);
    }
    println!();
    println!("By category:");
    for (category, cost) in &totals.by_category {
        println!("  {:<16}{:>14.2}", category.display_name(), cost);
    }
    println!();
    banner(&format!("GRAND TOTAL: {:.2} ({} rows)", totals.grand_total, totals.row_count));
    print_warnings(quote, computed);
}

fn print_warnings(quote: &QuoteSnapshot, computed: &ComputedOutputs) {
    if !computed.missing_prices.is_empty() {
        println!();
        println!("Unpriced materials:");
        for material in &computed.missing_prices {
            println!("  [MISSING] {}", material.label());
        }
    }
    if !computed.issues.is_empty() {
        println!();
        println!("Row issues:");
        for (id, issues) in &computed.issues {
            let name = quote.row(id).map(|r| r.label()).unwrap_or("(removed row)");
            for issue in issues {
                println!("  [WARN] {name}: {issue}");
            }
        }
    }
}

pub fn bill(args: &BillArgs) -> Result<()> {
    let quote = load(&args.path)?;
    let sections = &quote.computed.boq;
    if sections.is_empty() {
        warn!("quote has no bill; run `boq recompute` first");
    }

    if args.consolidated {
        let items = consolidate(sections);
        if args.json {
            println!("{}", serde_json::to_string_pretty(&items)?);
            return Ok(());
        }
        banner("CONSOLIDATED MATERIALS");
        for item in &items {
            println!(
                "{:<5}{:<44}{:>6}{:>12.2}{:>12.2}{:>14.2}",
                item.item_no, item.description, item.unit, item.quantity, item.rate, item.amount
            );
        }
        return Ok(());
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(sections)?);
        return Ok(());
    }
    for section in sections {
        print_section(section);
    }
    let total: f64 = sections.iter().map(|s| s.total()).sum();
    banner(&format!("BILL TOTAL: {total:.2}"));
    Ok(())
}

fn print_section(section: &BoqSection) {
    banner(&section.title);
    println!(
        "{:<9}{:<40}{:>6}{:>12}{:>12}{:>14}",
        "Item", "Description", "Unit", "Qty", "Rate", "Amount"
    );
    for item in section.priced_items() {
        println!(
            "{:<9}{:<40}{:>6}{:>12.2}{:>12.2}{:>14.2}",
            item.item_no, item.description, item.unit, item.quantity, item.rate, item.amount
        );
    }
    println!("{:>79}", format!("Section total: {:.2}", section.total()));
    println!();
}

pub fn summary(args: &SummaryArgs) -> Result<()> {
    let quote = load(&args.path)?;
    let s = &quote.computed.summary;
    if args.json {
        println!("{}", serde_json::to_string_pretty(s)?);
        return Ok(());
    }

    banner(&format!("QUOTE SUMMARY - {}", s.contract_type.display_name()));
    let rows = [
        ("Materials", s.materials),
        ("Preliminaries", s.preliminaries),
        ("Subcontractors", s.subcontractors),
        ("Labour", s.labour),
        ("Subtotal", s.subtotal),
        ("Overhead", s.overhead),
        ("Contingency", s.contingency),
        ("Profit", s.profit),
    ];
    for (label, value) in rows {
        println!("  {label:<18}{value:>16.2}");
    }
    println!("  {:<18}{:>16.2}  (in preliminaries)", "Permit", s.permit);
    banner(&format!("TOTAL: {:.2}", s.total));
    Ok(())
}
