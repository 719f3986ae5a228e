//! # Greece
//!
//! Greek VAT (ΦΠΑ). The regime's canonical code is `EL`, the prefix used
//! by VIES; `GR` resolves to the same regime.
//!
//! Every VAT combo carries the myDATA VAT category in
//! `gr-iapr-vat-cat`. It is derived from the rate key when absent, and
//! the island categories (4 to 6) select the reduced island percentages.
//!
//! Sources: Law 2859/2000 (VAT Code), AADE myDATA technical
//! specifications.

use docket_core::Extensions;
use docket_doc::tax::Combo;

use super::*;

pub const COUNTRY: &str = "EL";

/// myDATA VAT category extension.
pub const EXT_VAT_CAT: &str = "gr-iapr-vat-cat";

// -- Definition --------------------------------------------------------------

pub fn regime() -> RegimeDef {
    RegimeDef {
        country: Code::from(COUNTRY),
        alt_country_codes: vec![Code::from("GR")],
        name: "Greece".into(),
        currency: CurrencyCode::new("EUR"),
        time_zone: "Europe/Athens".into(),
        tax_scheme: Some(Code::from("VAT")),
        calculator_rounding_rule: RoundingRule::Currency,
        extensions: vec![ExtensionDef {
            key: Key::from(EXT_VAT_CAT),
            name: "VAT category".into(),
            values: ext_values(&[
                ("1", "Standard rate"),
                ("2", "Reduced rate"),
                ("3", "Super-reduced rate"),
                ("4", "Standard rate (Island)"),
                ("5", "Reduced rate (Island)"),
                ("6", "Super-reduced rate (Island)"),
                ("7", "Without VAT"),
                ("8", "Records without VAT"),
            ]),
            ..Default::default()
        }],
        categories: vec![CategoryDef {
            code: Code::from("VAT"),
            name: "ΦΠΑ".into(),
            title: Some("Φόρος Προστιθέμενης Αξίας".into()),
            keys: vat_keys(),
            rates: vec![
                rate(
                    rates::GENERAL,
                    "General Rate",
                    vec![island(since(2016, 6, 1, pct(17, 0)), "4"), since(2016, 6, 1, pct(24, 0))],
                ),
                rate(
                    rates::REDUCED,
                    "Reduced Rate",
                    vec![island(since(2016, 6, 1, pct(9, 0)), "5"), since(2016, 6, 1, pct(13, 0))],
                ),
                rate(
                    rates::SUPER_REDUCED,
                    "Super-Reduced Rate",
                    vec![island(since(2016, 6, 1, pct(4, 0)), "6"), since(2016, 6, 1, pct(6, 0))],
                ),
            ],
            extensions: vec![Key::from(EXT_VAT_CAT)],
            ..Default::default()
        }],
        corrections: vec![CorrectionDefinition {
            types: vec![Key::from(types::CREDIT_NOTE)],
            ..CorrectionDefinition::new(SHORT_INVOICE)
        }],
        hooks: Some(Arc::new(GreeceHooks)),
        ..Default::default()
    }
}

fn island(value: RateValueDef, cat: &str) -> RateValueDef {
    RateValueDef {
        ext: [(EXT_VAT_CAT, cat)].into_iter().collect::<Extensions>(),
        ..value
    }
}

// -- Hooks -------------------------------------------------------------------

#[derive(Debug)]
struct GreeceHooks;

impl RuleHooks for GreeceHooks {
    fn normalize(&self, node: Node<'_>) {
        if let Node::Combo(c) = node {
            normalize_combo(c);
        }
    }

    fn validate(&self, node: NodeRef<'_>) -> FieldErrors {
        match node {
            NodeRef::Invoice(inv) => validate_invoice(inv),
            NodeRef::Combo(c) if c.cat == "VAT" && c.ext.get(EXT_VAT_CAT).is_none() => {
                FieldErrors::single(EXT_VAT_CAT, "required").prefixed("ext")
            }
            NodeRef::TaxIdentity(tid) => match local_code(tid, COUNTRY) {
                Some(code) => match check_tax_code(code) {
                    Ok(()) => FieldErrors::new(),
                    Err(msg) => FieldErrors::single("code", msg),
                },
                None => FieldErrors::new(),
            },
            _ => FieldErrors::new(),
        }
    }
}

fn normalize_combo(c: &mut Combo) {
    if c.cat != "VAT" || c.ext.get(EXT_VAT_CAT).is_some() {
        return;
    }
    let by_rate = c.rate.as_ref().and_then(|r| match r.as_str() {
        rates::GENERAL => Some("1"),
        rates::REDUCED => Some("2"),
        rates::SUPER_REDUCED => Some("3"),
        _ => None,
    });
    let by_key = c.key.as_ref().and_then(|k| match k.as_str() {
        keys::ZERO | keys::EXEMPT | keys::EXPORT | keys::INTRA_COMMUNITY | keys::OUTSIDE_SCOPE => {
            Some("7")
        }
        _ => None,
    });
    if let Some(cat) = by_rate.or(by_key) {
        c.ext.set(EXT_VAT_CAT, cat);
    }
}

fn validate_invoice(inv: &Invoice) -> FieldErrors {
    let mut errs = FieldErrors::new();
    if inv.series.is_none() {
        errs.add("series", "cannot be blank");
    }
    if let Some(supplier) = &inv.supplier {
        errs.nest("supplier", require_tax_code(supplier));
    }
    if let Some(customer) = &inv.customer {
        if !inv.has_tags(&["simplified"]) {
            let mut cerrs = require_tax_code(customer);
            if customer.addresses.is_empty() {
                cerrs.add("addresses", "cannot be blank");
            }
            errs.nest("customer", cerrs);
        }
    }
    errs
}

/// Check a nine-digit Greek VAT number (ΑΦΜ).
pub fn check_tax_code(code: &str) -> Result<(), &'static str> {
    if code.len() != 9 || !code.chars().all(|c| c.is_ascii_digit()) {
        return Err("invalid format");
    }
    let digits: Vec<u32> = code.chars().filter_map(|c| c.to_digit(10)).collect();
    let sum: u32 = digits[..8]
        .iter()
        .enumerate()
        .map(|(i, d)| d << (8 - i))
        .sum();
    if sum % 11 % 10 != digits[8] {
        return Err("invalid check digit");
    }
    Ok(())
}
