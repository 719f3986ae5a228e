//! # Argentina
//!
//! Argentine VAT (IVA) with the general, reduced and increased rates, the
//! invoice-type tags (A, B, C, E) and CUIT validation.
//!
//! Sources: Ley 23.349 de IVA (art. 28), AFIP RG 4540/2019.

use super::*;

pub const COUNTRY: &str = "AR";

/// Rate key for the 27% rate on metered utilities.
pub const RATE_INCREASED: &str = "increased";

pub mod tags {
    pub const TYPE_A: &str = "invoice-type-a";
    pub const TYPE_B: &str = "invoice-type-b";
    pub const TYPE_C: &str = "invoice-type-c";
    pub const TYPE_E: &str = "invoice-type-e";
    pub const EXPORT_SERVICES: &str = "export-services";
    pub const EXPORT_GOODS: &str = "export-goods";
}

const CUIT_WEIGHTS: [u32; 10] = [5, 4, 3, 2, 7, 6, 5, 4, 3, 2];

const EXPORT_NOTE: &str = "Operación de exportación. IVA tasa cero conforme al Artículo 43 de la Ley 23.349.";

// -- Definition --------------------------------------------------------------

pub fn regime() -> RegimeDef {
    RegimeDef {
        country: Code::from(COUNTRY),
        name: "Argentina".into(),
        currency: CurrencyCode::new("ARS"),
        time_zone: "America/Argentina/Buenos_Aires".into(),
        tax_scheme: Some(Code::from("VAT")),
        calculator_rounding_rule: RoundingRule::Currency,
        tags: vec![TagSet {
            schema: SHORT_INVOICE.into(),
            list: vec![
                KeyDefinition::new(tags::TYPE_A, "Invoice Type A").with_desc(
                    "Issued by a registered VAT payer to another registered VAT payer.",
                ),
                KeyDefinition::new(tags::TYPE_B, "Invoice Type B")
                    .with_desc("Issued by a registered VAT payer to final consumers."),
                KeyDefinition::new(tags::TYPE_C, "Invoice Type C")
                    .with_desc("Issued by monotributistas or VAT-exempt entities."),
                KeyDefinition::new(tags::TYPE_E, "Invoice Type E").with_desc("Export invoice."),
                KeyDefinition::new(tags::EXPORT_SERVICES, "Export of services"),
                KeyDefinition::new(tags::EXPORT_GOODS, "Export of goods"),
            ],
        }],
        identities: vec![
            KeyDefinition::new("ar-dni", "DNI"),
            KeyDefinition::new("ar-cuil", "CUIL"),
        ],
        categories: vec![CategoryDef {
            code: Code::from("VAT"),
            name: "IVA".into(),
            title: Some("Impuesto al Valor Agregado".into()),
            keys: vat_keys(),
            rates: vec![
                rate(RATE_INCREASED, "Increased Rate", vec![since(1995, 4, 1, pct(270, 1))]),
                rate(rates::GENERAL, "General Rate", vec![since(1995, 4, 1, pct(210, 1))]),
                rate(rates::REDUCED, "Reduced Rate", vec![since(1995, 4, 1, pct(105, 1))]),
            ],
            ..Default::default()
        }],
        scenarios: vec![ScenarioSet {
            schema: SHORT_INVOICE.into(),
            list: vec![
                legal_scenario(tags::EXPORT_SERVICES, EXPORT_NOTE),
                legal_scenario(tags::EXPORT_GOODS, EXPORT_NOTE),
            ],
        }],
        corrections: vec![CorrectionDefinition {
            types: vec![Key::from(types::CREDIT_NOTE), Key::from(types::DEBIT_NOTE)],
            ..CorrectionDefinition::new(SHORT_INVOICE)
        }],
        hooks: Some(Arc::new(ArgentinaHooks)),
        ..Default::default()
    }
}

// -- Hooks -------------------------------------------------------------------

#[derive(Debug)]
struct ArgentinaHooks;

impl RuleHooks for ArgentinaHooks {
    fn validate(&self, node: NodeRef<'_>) -> FieldErrors {
        match node {
            NodeRef::Invoice(inv) => validate_invoice(inv),
            NodeRef::TaxIdentity(tid) => match local_code(tid, COUNTRY) {
                Some(code) => match check_cuit(code) {
                    Ok(()) => FieldErrors::new(),
                    Err(msg) => FieldErrors::single("code", msg),
                },
                None => FieldErrors::new(),
            },
            _ => FieldErrors::new(),
        }
    }
}

fn validate_invoice(inv: &Invoice) -> FieldErrors {
    let mut errs = FieldErrors::new();
    if let Some(supplier) = &inv.supplier {
        errs.nest("supplier", require_tax_code(supplier));
    }
    let export = [tags::TYPE_E, tags::EXPORT_SERVICES, tags::EXPORT_GOODS]
        .iter()
        .any(|t| inv.has_tags(&[*t]));
    match &inv.customer {
        None if inv.has_tags(&[tags::TYPE_A]) => errs.add("customer", "cannot be blank"),
        None => {}
        Some(customer) if inv.has_tags(&[tags::TYPE_A]) => match &customer.tax_id {
            None => errs.nest(
                "customer",
                FieldErrors::single("tax_id", "customer tax ID required for Type A invoices"),
            ),
            Some(_) => errs.nest("customer", require_tax_code(customer)),
        },
        Some(customer) if export => {
            if customer.tax_id.as_ref().is_some_and(|t| t.country.as_str() == COUNTRY) {
                errs.add("customer", "export invoices should not have Argentine customers");
            }
        }
        Some(_) => {}
    }
    errs
}

/// Check an eleven-digit CUIT/CUIL with its modulo-11 check digit.
pub fn check_cuit(code: &str) -> Result<(), &'static str> {
    if code.len() != 11 || !code.chars().all(|c| c.is_ascii_digit()) {
        return Err("invalid format");
    }
    let digits: Vec<u32> = code.chars().filter_map(|c| c.to_digit(10)).collect();
    let sum: u32 = digits[..10].iter().zip(CUIT_WEIGHTS).map(|(d, w)| d * w).sum();
    let check = match 11 - sum % 11 {
        11 => 0,
        10 => return Err("invalid check digit"),
        n => n,
    };
    if check != digits[10] {
        return Err("invalid check digit");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use docket_doc::bill::Line;
    use docket_doc::org::{Item, Party};
    use docket_doc::tax::Combo;
    use docket_doc::{calculator, Registry};

    fn registry() -> Registry {
        let mut reg = Registry::new();
        reg.register_regime(regime()).unwrap();
        reg
    }

    fn invoice() -> Invoice {
        Invoice {
            code: Some("0001-00000001".into()),
            issue_date: Some(date(2024, 8, 1)),
            supplier: Some(Party {
                tax_id: Some(TaxIdentity::new("AR", "30-50001091-2")),
                ..Party::named("Proveedor S.A.")
            }),
            lines: vec![Line {
                quantity: Some("3".parse().unwrap()),
                item: Some(Item {
                    name: "Servicio".into(),
                    price: Some("1000.00".parse().unwrap()),
                    ..Default::default()
                }),
                taxes: vec![Combo::with_rate("VAT", rates::REDUCED)],
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    #[test]
    fn cuit_check_digit() {
        assert_eq!(check_cuit("30500010912"), Ok(()));
        assert_eq!(check_cuit("20123456786"), Ok(()));
        assert_eq!(check_cuit("27293847563"), Ok(()));
        assert_eq!(check_cuit("20123456787"), Err("invalid check digit"));
        assert_eq!(check_cuit("2012345678"), Err("invalid format"));
    }

    #[test]
    fn reduced_rate_in_pesos() {
        let reg = registry();
        let mut inv = invoice();
        calculator::calculate(&mut inv, &reg).unwrap();
        assert_eq!(inv.currency.as_ref().unwrap().as_str(), "ARS");
        let totals = inv.totals.as_ref().unwrap();
        assert_eq!(totals.tax.map(|t| t.to_string()), Some("315.00".into()));
        assert_eq!(totals.payable.to_string(), "3315.00");
    }

    #[test]
    fn type_a_requires_identified_customer() {
        let reg = registry();
        let mut inv = invoice();
        inv.tags = vec![Key::from(tags::TYPE_A)];
        inv.customer = Some(Party::named("Cliente"));
        let err = calculator::calculate(&mut inv, &reg).unwrap_err();
        assert_eq!(
            err.fields().unwrap().message_at("customer.tax_id"),
            Some("customer tax ID required for Type A invoices")
        );
    }

    #[test]
    fn export_adds_note_and_rejects_local_customer() {
        let reg = registry();
        let mut inv = invoice();
        inv.tags = vec![Key::from(tags::EXPORT_GOODS)];
        calculator::calculate(&mut inv, &reg).unwrap();
        assert_eq!(inv.notes.len(), 1);
        assert_eq!(inv.notes[0].text, EXPORT_NOTE);

        let mut inv = invoice();
        inv.tags = vec![Key::from(tags::EXPORT_GOODS)];
        inv.customer = Some(Party {
            tax_id: Some(TaxIdentity::new("AR", "20123456786")),
            ..Party::named("Cliente")
        });
        let err = calculator::calculate(&mut inv, &reg).unwrap_err();
        assert_eq!(
            err.fields().unwrap().message_at("customer"),
            Some("export invoices should not have Argentine customers")
        );
    }
}
