//! # Calculator Pipeline
//!
//! The fixed sequence every invoice goes through before it is stored or
//! signed:
//!
//! 1. resolve the regime and addons from the registry;
//! 2. normalize;
//! 3. apply scenarios;
//! 4. calculate totals;
//! 5. normalize again, so values produced by steps 3 and 4 are cleaned;
//! 6. validate.
//!
//! Only steps 4 and 6 can fail. A calculation failure stops the pipeline
//! before validation. The invoice is left as far as the pipeline got; the
//! caller discards it on error.

use chrono::NaiveDate;
use docket_core::{Code, DocketError};
use tracing::debug;

use crate::bill::{calculate, Invoice};
use crate::normalize::normalize_invoice;
use crate::registry::Registry;
use crate::scenarios::apply_scenarios;
use crate::validate::validate_invoice;

/// The current date in UTC.
pub fn today() -> NaiveDate {
    chrono::Utc::now().date_naive()
}

/// Run the full pipeline on `inv`.
pub fn calculate(inv: &mut Invoice, registry: &Registry) -> Result<(), DocketError> {
    calculate_on(inv, registry, today())
}

/// Run the full pipeline with an explicit "today" for missing issue dates.
pub fn calculate_on(inv: &mut Invoice, registry: &Registry, today: NaiveDate) -> Result<(), DocketError> {
    let code = inv.regime_code().map(str::to_string);
    let ctx = registry.context(code.as_deref(), &inv.addons);
    if inv.regime.is_none() {
        if let Some(r) = ctx.regime {
            inv.regime = Some(r.country.clone());
        } else if let Some(c) = &code {
            inv.regime = Some(Code::from(c.as_str()));
        }
    }
    debug!(
        regime = code.as_deref().unwrap_or("-"),
        addons = ctx.addons.len(),
        "resolved rules"
    );

    normalize_invoice(inv, &ctx);
    debug!("normalized");

    apply_scenarios(inv, &ctx);
    debug!(ext = inv.ext().map_or(0, |e| e.len()), notes = inv.notes.len(), "applied scenarios");

    calculate::calculate(inv, ctx.regime, today).map_err(|e| DocketError::Calculation(e.to_string()))?;
    if inv.uuid.is_none() {
        inv.uuid = Some(docket_core::new_document_uuid());
    }
    debug!("calculated totals");

    normalize_invoice(inv, &ctx);

    let errs = validate_invoice(inv, &ctx);
    if !errs.is_empty() {
        debug!(errors = errs.len(), "validation failed");
        return Err(DocketError::Validation(errs));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bill::Line;
    use crate::defs::category::{rates, vat_keys};
    use crate::defs::{AddonDef, CategoryDef, ExtensionDef, RateDef, RateValueDef, RegimeDef, Scenario, ScenarioExt, ScenarioSet};
    use crate::org::{Item, Note, Party};
    use crate::schema;
    use crate::tax::{Combo, TaxIdentity};
    use docket_core::{CurrencyCode, Key};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn registry() -> Registry {
        let mut reg = Registry::new();
        reg.register_regime(RegimeDef {
            country: Code::from("ES"),
            name: "Spain".into(),
            currency: CurrencyCode::new("EUR"),
            categories: vec![CategoryDef {
                code: Code::from("VAT"),
                name: "VAT".into(),
                keys: vat_keys(),
                rates: vec![RateDef {
                    key: Key::from(rates::GENERAL),
                    name: "General".into(),
                    values: vec![RateValueDef::since(date(2012, 9, 1), "21%".parse().unwrap())],
                    ..Default::default()
                }],
                ..Default::default()
            }],
            ..Default::default()
        })
        .unwrap();
        reg.register_addon(AddonDef {
            key: Key::from("demo-v1"),
            name: "Demo".into(),
            extensions: vec![ExtensionDef {
                key: Key::from("demo-doc-type"),
                name: "Doc Type".into(),
                ..Default::default()
            }],
            scenarios: vec![ScenarioSet {
                schema: schema::SHORT_INVOICE.into(),
                list: vec![Scenario {
                    types: vec![Key::from("standard")],
                    note: Some(Note::legal("demo", "Issued under the demo standard.")),
                    ext: vec![ScenarioExt::new("demo-doc-type", "001")],
                    ..Default::default()
                }],
            }],
            ..Default::default()
        })
        .unwrap();
        reg
    }

    fn invoice() -> Invoice {
        Invoice {
            addons: vec![Key::from("demo-v1")],
            series: Some(" SAMPLE ".into()),
            code: Some("001".into()),
            supplier: Some(Party {
                tax_id: Some(TaxIdentity::new("es", "b98602642")),
                ..Party::named("Provide One S.L.")
            }),
            lines: vec![Line {
                quantity: Some("20".parse().unwrap()),
                item: Some(Item {
                    name: "Development services".into(),
                    price: Some("90.00".parse().unwrap()),
                    ..Default::default()
                }),
                taxes: vec![Combo::with_rate("VAT", "standard")],
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    #[test]
    fn full_pipeline() {
        let reg = registry();
        let mut inv = invoice();
        calculate_on(&mut inv, &reg, date(2024, 6, 1)).unwrap();

        assert_eq!(inv.regime, Some(Code::from("ES")));
        assert!(inv.uuid.is_some());
        assert_eq!(inv.series.as_deref(), Some("SAMPLE"));
        assert_eq!(inv.currency.as_ref().map(|c| c.as_str()), Some("EUR"));
        assert_eq!(inv.issue_date, Some(date(2024, 6, 1)));
        assert_eq!(inv.ext().unwrap().get("demo-doc-type"), Some("001"));
        assert_eq!(inv.notes.len(), 1);

        let totals = inv.totals.as_ref().unwrap();
        assert_eq!(totals.sum.to_string(), "1800.00");
        assert_eq!(totals.tax.map(|t| t.to_string()), Some("378.00".into()));
        assert_eq!(totals.payable.to_string(), "2178.00");
    }

    #[test]
    fn pipeline_is_deterministic() {
        let reg = registry();
        let mut a = invoice();
        calculate_on(&mut a, &reg, date(2024, 6, 1)).unwrap();
        let mut b = a.clone();
        calculate_on(&mut b, &reg, date(2030, 1, 1)).unwrap();
        assert_eq!(serde_json::to_string(&a).unwrap(), serde_json::to_string(&b).unwrap());
    }

    #[test]
    fn calculation_error_skips_validation() {
        let reg = registry();
        let mut inv = invoice();
        inv.supplier = None;
        let err = calculate_on(&mut inv, &reg, date(2024, 6, 1)).unwrap_err();
        assert_eq!(err.key(), "calculation");
        assert!(err.to_string().contains("currency"));
    }

    #[test]
    fn validation_errors_are_returned() {
        let reg = registry();
        let mut inv = invoice();
        inv.supplier.as_mut().unwrap().name.clear();
        let err = calculate_on(&mut inv, &reg, date(2024, 6, 1)).unwrap_err();
        assert_eq!(err.key(), "validation");
        assert_eq!(err.fields().unwrap().message_at("supplier.name"), Some("cannot be blank"));
    }
}
