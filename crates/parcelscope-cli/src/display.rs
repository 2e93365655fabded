//! Terminal rendering: category catalog, batch summary table and parcel
//! detail cards.

use parcelscope_core::category::grouped;
use parcelscope_core::record::value_text;
use parcelscope_core::{CategoryId, NormalizedRecord, ParcelResult};
use parcelscope_export::ExportLayout;
use serde_json::Value;

const MAX_LIST_ITEMS: usize = 10;
const MAX_ROW_FIELDS: usize = 4;

// ── Card section groupings ──

const LOCATION: &[&str] = &["platPlc", "newPlatPlc", "bldNm", "dongNm"];

const USE_AND_STRUCTURE: &[&str] = &[
    "mainPurpsCdNm",
    "etcPurps",
    "strctCdNm",
    "etcStrct",
    "roofCdNm",
];

const AREAS: &[&str] = &["platArea", "archArea", "totArea", "bcRat", "vlRat"];

const FLOORS_AND_UNITS: &[&str] = &["grndFlrCnt", "ugrndFlrCnt", "hhldCnt", "fmlyCnt", "hoCnt"];

const DATES: &[&str] = &["pmsDay", "stcnsDay", "useAprDay"];

const ZONING: &[&str] = &["jijiguCdNm", "jiyukCdNm", "guyukCdNm"];

const SUMMARY_FIELDS: &[&str] = &["bldNm", "mainPurpsCdNm", "totArea"];

// ── Public API ──

pub fn print_categories() {
    for (group, ids) in grouped() {
        println!("{}", group.as_str());
        for id in ids {
            let info = id.info();
            let mark = if info.default_checked { "*" } else { " " };
            println!("  {mark} {:>2}  {}", u8::from(*id), info.label);
        }
    }
}

/// Print one row per export row as an Arrow pretty table.
pub fn print_summary(results: &[ParcelResult]) -> anyhow::Result<()> {
    let batch = ExportLayout::new(SUMMARY_FIELDS.iter().copied()).to_record_batch(results)?;
    let schema = batch.schema();
    let keep: Vec<usize> = ["no", "identifier", "status", "reason"]
        .iter()
        .chain(SUMMARY_FIELDS)
        .chain(&["owner_no", "owner_name"])
        .filter_map(|name| schema.index_of(name).ok())
        .collect();
    let view = batch.project(&keep)?;
    println!("{}", arrow::util::pretty::pretty_format_batches(&[view])?);
    Ok(())
}

/// Print a finished parcel as a vertical card grouped by section.
pub fn print_parcel_card(result: &ParcelResult) {
    println!("=== {} ===", result.parcel.identifier);
    println!("{}", result.parcel.address);
    println!();

    let Some(record) = result.detail.as_deref() else {
        println!("  ({}: {})", result.status.as_str(), result.reason);
        println!();
        return;
    };

    print_section(record, "Location", LOCATION);
    print_section(record, "Use & Structure", USE_AND_STRUCTURE);
    print_section(record, "Areas", AREAS);
    print_section(record, "Floors & Units", FLOORS_AND_UNITS);
    print_section(record, "Dates", DATES);
    print_section(record, "Zoning", ZONING);
    print_lists(record);
    print_owners(record);
}

// ── Section rendering ──

fn print_section(record: &NormalizedRecord, header: &str, keys: &[&str]) {
    let values: Vec<(&str, String)> = keys
        .iter()
        .filter_map(|&key| record.text(key).map(|v| (key, v)))
        .collect();
    if values.is_empty() {
        return;
    }

    println!("{header}");
    for (key, value) in values {
        println!("  {:<26} {}", key, value);
    }
    println!();
}

fn print_lists(record: &NormalizedRecord) {
    let lists: Vec<(&str, &[Value])> = CategoryId::ALL
        .iter()
        .filter(|id| !id.is_owner())
        .filter_map(|id| id.info().list_key)
        .map(|key| (key, record.rows(key)))
        .filter(|(_, rows)| !rows.is_empty())
        .collect();
    if lists.is_empty() {
        return;
    }

    println!("Detail Lists");
    for (key, rows) in lists {
        println!("  {} ({}):", key, rows.len());
        for row in rows.iter().take(MAX_LIST_ITEMS) {
            println!("    {}", row_summary(row));
        }
        if rows.len() > MAX_LIST_ITEMS {
            println!("    ... and {} more", rows.len() - MAX_LIST_ITEMS);
        }
    }
    println!();
}

fn print_owners(record: &NormalizedRecord) {
    let owners = record.owners();
    if owners.is_empty() {
        return;
    }

    println!("Owners ({})", owners.len());
    for (i, owner) in owners.iter().take(MAX_LIST_ITEMS).enumerate() {
        print!("  {:>2}. {:<20}", i + 1, owner.name);
        if !owner.share.is_empty() {
            print!("  share: {}", owner.share);
        }
        if !owner.date.is_empty() {
            print!("  date: {}", owner.date);
        }
        if !owner.reason.is_empty() {
            print!("  reason: {}", owner.reason);
        }
        println!();
    }
    if owners.len() > MAX_LIST_ITEMS {
        println!("    ... and {} more", owners.len() - MAX_LIST_ITEMS);
    }
    println!();
}

// ── Helpers ──

/// First few non-blank fields of a list row as `key=value` pairs.
fn row_summary(row: &Value) -> String {
    let Some(fields) = row.as_object() else {
        return value_text(row).unwrap_or_else(|| "-".into());
    };
    let parts: Vec<String> = fields
        .iter()
        .filter_map(|(k, v)| value_text(v).map(|text| format!("{k}={text}")))
        .take(MAX_ROW_FIELDS)
        .collect();
    if parts.is_empty() {
        "-".into()
    } else {
        parts.join("  ")
    }
}
