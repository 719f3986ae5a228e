//! # FacturaE v3
//!
//! Spanish structured invoice format used for invoices to the public
//! administration through FACe. The addon derives the FacturaE document
//! type and invoice class from the invoice type and tags, and requires a
//! coded correction reason on corrective documents.

use super::*;

pub const KEY: &str = "es-facturae-v3";

pub const EXT_DOC_TYPE: &str = "es-facturae-doc-type";
pub const EXT_INVOICE_CLASS: &str = "es-facturae-invoice-class";
pub const EXT_CORRECTION: &str = "es-facturae-correction";

pub fn addon() -> AddonDef {
    AddonDef {
        key: Key::from(KEY),
        name: "FacturaE".into(),
        description: Some("Spanish electronic invoice format, version 3.2.x.".into()),
        sources: vec![Source {
            title: "FacturaE formato 3.2.2".into(),
            url: "https://www.facturae.gob.es/formato/Paginas/version-3-2.aspx".into(),
        }],
        extensions: extensions(),
        scenarios: vec![ScenarioSet {
            schema: SHORT_INVOICE.into(),
            list: scenarios(),
        }],
        corrections: vec![CorrectionDefinition {
            extensions: vec![Key::from(EXT_CORRECTION)],
            copy_tax: true,
            ..CorrectionDefinition::new(SHORT_INVOICE)
        }],
        hooks: Some(Arc::new(FacturaeHooks)),
        ..Default::default()
    }
}

fn extensions() -> Vec<ExtensionDef> {
    vec![
        extension(
            EXT_DOC_TYPE,
            "Document Type",
            &[("FC", "Commercial Invoice"), ("FA", "Simplified Invoice"), ("AF", "Self-billed Invoice")],
        ),
        extension(
            EXT_INVOICE_CLASS,
            "Invoice Class",
            &[
                ("OO", "Original"),
                ("OR", "Corrective Original"),
                ("OC", "Summary Original"),
                ("CO", "Copy of the Original"),
                ("CR", "Copy of the Corrective"),
                ("CC", "Copy of the Summary"),
            ],
        ),
        extension(
            EXT_CORRECTION,
            "Correction Reason",
            &[
                ("01", "Invoice code"),
                ("02", "Invoice series"),
                ("03", "Issue date"),
                ("04", "Name and surnames/Corporate name - Issuer (Sender)"),
                ("05", "Name and surnames/Corporate name - Receiver"),
                ("06", "Issuer's Tax Identification Number"),
                ("07", "Receiver's Tax Identification Number"),
                ("08", "Issuer's address"),
                ("09", "Receiver's address"),
                ("10", "Item line"),
                ("11", "Applicable Tax Rate"),
                ("12", "Applicable Tax Amount"),
                ("13", "Applicable Date/Period"),
                ("14", "Invoice Class"),
                ("15", "Legal literals"),
                ("16", "Taxable Base"),
                ("80", "Calculation of tax outputs"),
                ("81", "Calculation of tax inputs"),
                ("82", "Taxable Base modified due to return of packages and packaging materials"),
                ("83", "Taxable Base modified due to discounts and rebates"),
                ("84", "Taxable Base modified due to firm court ruling or administrative decision"),
                ("85", "Taxable Base modified due to unpaid outputs where there is a judgement opening insolvency proceedings"),
            ],
        ),
    ]
}

/// Tagged scenarios come first; the untagged fallbacks only land when no
/// earlier scenario set the key.
fn scenarios() -> Vec<Scenario> {
    let corrections = types::CORRECTIONS;
    vec![
        // Document type
        ext_scenario(&[], &["simplified"], EXT_DOC_TYPE, "FA"),
        ext_scenario(&[], &["self-billed"], EXT_DOC_TYPE, "AF"),
        ext_scenario(&[], &[], EXT_DOC_TYPE, "FC"),
        // Invoice class
        ext_scenario(&[], &["copy", "summary"], EXT_INVOICE_CLASS, "CC"),
        ext_scenario(corrections, &["copy"], EXT_INVOICE_CLASS, "CR"),
        ext_scenario(&[types::STANDARD], &["copy"], EXT_INVOICE_CLASS, "CO"),
        ext_scenario(&[], &["summary"], EXT_INVOICE_CLASS, "OC"),
        ext_scenario(corrections, &[], EXT_INVOICE_CLASS, "OR"),
        ext_scenario(&[types::STANDARD], &[], EXT_INVOICE_CLASS, "OO"),
    ]
}

// -- Hooks -------------------------------------------------------------------

#[derive(Debug)]
struct FacturaeHooks;

impl RuleHooks for FacturaeHooks {
    fn validate(&self, node: NodeRef<'_>) -> FieldErrors {
        match node {
            NodeRef::Invoice(inv) => validate_invoice(inv),
            _ => FieldErrors::new(),
        }
    }
}

fn validate_invoice(inv: &Invoice) -> FieldErrors {
    let mut errs = FieldErrors::new();
    let mut xerrs = FieldErrors::new();
    let ext = inv.ext();
    for key in [EXT_DOC_TYPE, EXT_INVOICE_CLASS] {
        if ext.and_then(|e| e.get(key)).is_none() {
            xerrs.add(key, "required");
        }
    }
    if inv.is_correction() {
        for (i, pre) in inv.preceding.iter().enumerate() {
            if pre.ext.get(EXT_CORRECTION).is_none() {
                errs.nest(
                    "preceding",
                    FieldErrors::single(EXT_CORRECTION, "required")
                        .prefixed("ext")
                        .prefixed(i.to_string()),
                );
            }
        }
    }
    errs.nest("tax", xerrs.prefixed("ext"));
    errs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::regimes::es;
    use chrono::NaiveDate;
    use docket_core::Code;
    use docket_doc::bill::Line;
    use docket_doc::org::{DocumentRef, Item, Party};
    use docket_doc::tax::{Combo, TaxIdentity};
    use docket_doc::{calculator, Registry};

    fn registry() -> Registry {
        let mut reg = Registry::new();
        reg.register_regime(es::regime()).unwrap();
        reg.register_addon(addon()).unwrap();
        reg
    }

    fn invoice() -> Invoice {
        Invoice {
            regime: Some(Code::from("ES")),
            addons: vec![Key::from(KEY)],
            series: Some("FAC".into()),
            code: Some("0001".into()),
            issue_date: NaiveDate::from_ymd_opt(2024, 3, 1),
            supplier: Some(Party {
                tax_id: Some(TaxIdentity::new("ES", "B98602642")),
                ..Party::named("Provide One S.L.")
            }),
            customer: Some(Party {
                tax_id: Some(TaxIdentity::new("ES", "54387763P")),
                ..Party::named("Sample Consumer")
            }),
            lines: vec![Line {
                quantity: Some("1".parse().unwrap()),
                item: Some(Item {
                    name: "Development services".into(),
                    price: Some("90.00".parse().unwrap()),
                    ..Default::default()
                }),
                taxes: vec![Combo::with_rate("VAT", "general")],
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    #[test]
    fn standard_invoice_gets_commercial_original() {
        let reg = registry();
        let mut inv = invoice();
        calculator::calculate(&mut inv, &reg).unwrap();
        let ext = inv.ext().unwrap();
        assert_eq!(ext.get(EXT_DOC_TYPE), Some("FC"));
        assert_eq!(ext.get(EXT_INVOICE_CLASS), Some("OO"));
    }

    #[test]
    fn simplified_tag_selects_simplified_type() {
        let reg = registry();
        let mut inv = invoice();
        inv.tags = vec![Key::from("simplified")];
        inv.customer = None;
        calculator::calculate(&mut inv, &reg).unwrap();
        assert_eq!(inv.ext().unwrap().get(EXT_DOC_TYPE), Some("FA"));
    }

    #[test]
    fn explicit_value_wins_over_scenario() {
        let reg = registry();
        let mut inv = invoice();
        inv.ext_mut().set(EXT_DOC_TYPE, "AF");
        calculator::calculate(&mut inv, &reg).unwrap();
        assert_eq!(inv.ext().unwrap().get(EXT_DOC_TYPE), Some("AF"));
    }

    #[test]
    fn copy_of_credit_note() {
        let reg = registry();
        let mut inv = invoice();
        inv.kind = Key::from(types::CREDIT_NOTE);
        inv.tags = vec![Key::from("copy")];
        inv.preceding = vec![DocumentRef {
            code: "0000".into(),
            ext: [(EXT_CORRECTION, "01")].into_iter().collect(),
            ..Default::default()
        }];
        calculator::calculate(&mut inv, &reg).unwrap();
        assert_eq!(inv.ext().unwrap().get(EXT_INVOICE_CLASS), Some("CR"));
    }

    #[test]
    fn correction_needs_reason_code() {
        let reg = registry();
        let mut inv = invoice();
        inv.kind = Key::from(types::CREDIT_NOTE);
        inv.preceding = vec![DocumentRef {
            code: "0000".into(),
            ..Default::default()
        }];
        let err = calculator::calculate(&mut inv, &reg).unwrap_err();
        assert_eq!(
            err.fields().unwrap().message_at("preceding.0.ext.es-facturae-correction"),
            Some("required")
        );
    }

    #[test]
    fn bad_code_is_reported() {
        let reg = registry();
        let mut inv = invoice();
        inv.ext_mut().set(EXT_DOC_TYPE, "XX");
        let err = calculator::calculate(&mut inv, &reg).unwrap_err();
        assert!(err
            .fields()
            .unwrap()
            .message_at("tax.ext.es-facturae-doc-type")
            .is_some());
    }
}
