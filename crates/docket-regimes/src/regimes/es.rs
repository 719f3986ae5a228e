//! # Spain
//!
//! Spanish tax regime: VAT (IVA) with equivalence surcharges, the Canary
//! Islands IGIC, the Ceuta and Melilla IPSI, and IRPF income-tax
//! withholding.
//!
//! Sources: Ley 37/1992 del IVA, Real Decreto-ley 20/2012 (rates from
//! 2012-09-01), Ley 35/2006 del IRPF, Real Decreto 1619/2012 (invoicing
//! obligations).

use super::*;

pub const COUNTRY: &str = "ES";

pub mod tags {
    pub const COPY: &str = "copy";
    pub const SUMMARY: &str = "summary";
    pub const SIMPLIFIED_SCHEME: &str = "simplified-scheme";
    pub const TRAVEL_AGENCY: &str = "travel-agency";
    pub const SECOND_HAND_GOODS: &str = "second-hand-goods";
    pub const ART: &str = "art";
    pub const ANTIQUES: &str = "antiques";
    pub const CASH_BASIS: &str = "cash-basis";
}

/// IRPF rate keys.
pub mod irpf {
    pub const PRO: &str = "pro";
    pub const PRO_START: &str = "pro-start";
    pub const CAPITAL: &str = "capital";
}

const CHECK_LETTERS: &[u8] = b"TRWAGMYFPDXBNJZSQVHLCKE";
const FOREIGNER_LETTERS: &str = "XYZ";
const OTHER_LETTERS: &str = "KLM";
const ORG_LETTERS: &str = "ABCDEFGHJNPQRSUVW";
const ORG_CHECK_LETTERS: &str = "JABCDEFGHI";

// -- Definition --------------------------------------------------------------

pub fn regime() -> RegimeDef {
    RegimeDef {
        country: Code::from(COUNTRY),
        name: "Spain".into(),
        description: Some(
            "Spain uses VAT (IVA) on the mainland and Balearic Islands, IGIC in the Canary \
             Islands and IPSI in Ceuta and Melilla. Professionals invoicing businesses \
             withhold IRPF on their invoices."
                .into(),
        ),
        currency: CurrencyCode::new("EUR"),
        time_zone: "Europe/Madrid".into(),
        tax_scheme: Some(Code::from("VAT")),
        calculator_rounding_rule: RoundingRule::Precise,
        tags: vec![invoice_tags()],
        identities: vec![
            KeyDefinition::new("es-nif", "NIF"),
            KeyDefinition::new("es-passport", "Passport"),
        ],
        categories: vec![vat(), igic(), ipsi(), irpf()],
        scenarios: vec![invoice_scenarios()],
        corrections: vec![CorrectionDefinition {
            types: [types::CREDIT_NOTE, types::CORRECTIVE, types::DEBIT_NOTE]
                .iter()
                .map(|t| Key::from(*t))
                .collect(),
            ..CorrectionDefinition::new(SHORT_INVOICE)
        }],
        hooks: Some(Arc::new(SpainHooks)),
        ..Default::default()
    }
}

fn invoice_tags() -> TagSet {
    TagSet {
        schema: SHORT_INVOICE.into(),
        list: vec![
            KeyDefinition::new(tags::COPY, "Copy"),
            KeyDefinition::new(tags::SUMMARY, "Summary"),
            KeyDefinition::new(tags::SIMPLIFIED_SCHEME, "Simplified tax scheme")
                .with_desc("Supplier operates under the simplified (módulos) scheme."),
            KeyDefinition::new(tags::TRAVEL_AGENCY, "Special scheme for travel agencies"),
            KeyDefinition::new(tags::SECOND_HAND_GOODS, "Special scheme for second-hand goods"),
            KeyDefinition::new(tags::ART, "Special scheme of works of art"),
            KeyDefinition::new(tags::ANTIQUES, "Special scheme of antiques and collectables"),
            KeyDefinition::new(tags::CASH_BASIS, "Special scheme on cash basis"),
        ],
    }
}

fn invoice_scenarios() -> ScenarioSet {
    ScenarioSet {
        schema: SHORT_INVOICE.into(),
        list: vec![
            legal_scenario("reverse-charge", "Reverse Charge / Inversión del sujeto pasivo."),
            legal_scenario(
                tags::SIMPLIFIED_SCHEME,
                "Factura expedida por contibuyente en régimen simplificado.",
            ),
            legal_scenario("self-billed", "Facturación por el destinatario."),
            legal_scenario(tags::TRAVEL_AGENCY, "Régimen especial de las agencias de viajes."),
            legal_scenario(tags::SECOND_HAND_GOODS, "Régimen especial de los bienes usados."),
            legal_scenario(tags::ART, "Régimen especial de los objetos de arte."),
            legal_scenario(
                tags::ANTIQUES,
                "Régimen especial de las antigüedades y objetos de colección.",
            ),
            legal_scenario(tags::CASH_BASIS, "Régimen especial del criterio de caja."),
        ],
    }
}

// -- Categories --------------------------------------------------------------

fn with_surcharge(value: RateValueDef, surcharge: Percentage) -> RateValueDef {
    RateValueDef {
        surcharge: Some(surcharge),
        ..value
    }
}

/// Rate keys carrying the equivalence surcharge.
pub mod eqs {
    pub const GENERAL: &str = "general+eqs";
    pub const REDUCED: &str = "reduced+eqs";
    pub const SUPER_REDUCED: &str = "super-reduced+eqs";
}

fn vat() -> CategoryDef {
    CategoryDef {
        code: Code::from("VAT"),
        name: "IVA".into(),
        title: Some("Impuesto sobre el Valor Añadido".into()),
        keys: vat_keys(),
        rates: vec![
            rate(
                rates::GENERAL,
                "General Rate",
                vec![
                    since(2012, 9, 1, pct(21, 0)),
                    since(2010, 7, 1, pct(18, 0)),
                    since(1995, 1, 1, pct(16, 0)),
                    since(1993, 1, 1, pct(15, 0)),
                ],
            ),
            rate(
                eqs::GENERAL,
                "General Rate with Equivalence Surcharge",
                vec![
                    with_surcharge(since(2012, 9, 1, pct(21, 0)), pct(52, 1)),
                    with_surcharge(since(2010, 7, 1, pct(18, 0)), pct(40, 1)),
                    with_surcharge(since(1995, 1, 1, pct(16, 0)), pct(40, 1)),
                ],
            ),
            rate(
                rates::REDUCED,
                "Reduced Rate",
                vec![
                    since(2012, 9, 1, pct(10, 0)),
                    since(2010, 7, 1, pct(8, 0)),
                    since(1995, 1, 1, pct(7, 0)),
                    since(1993, 1, 1, pct(6, 0)),
                ],
            ),
            rate(
                eqs::REDUCED,
                "Reduced Rate with Equivalence Surcharge",
                vec![
                    with_surcharge(since(2012, 9, 1, pct(10, 0)), pct(14, 1)),
                    with_surcharge(since(2010, 7, 1, pct(8, 0)), pct(10, 1)),
                    with_surcharge(since(1995, 1, 1, pct(7, 0)), pct(10, 1)),
                ],
            ),
            rate(
                rates::SUPER_REDUCED,
                "Super-Reduced Rate",
                vec![since(1995, 1, 1, pct(4, 0)), since(1993, 1, 1, pct(3, 0))],
            ),
            rate(
                eqs::SUPER_REDUCED,
                "Super-Reduced Rate with Equivalence Surcharge",
                vec![with_surcharge(since(1995, 1, 1, pct(4, 0)), pct(5, 1))],
            ),
        ],
        ..Default::default()
    }
}

fn igic() -> CategoryDef {
    CategoryDef {
        code: Code::from("IGIC"),
        name: "IGIC".into(),
        title: Some("Impuesto General Indirecto Canario".into()),
        keys: vec![
            KeyDefinition::new(keys::STANDARD, "Standard"),
            KeyDefinition::new(keys::ZERO, "Zero"),
            KeyDefinition::new(keys::EXEMPT, "Exempt"),
        ],
        rates: vec![
            rate(rates::GENERAL, "General Rate", vec![since(2020, 1, 1, pct(7, 0))]),
            rate(rates::REDUCED, "Reduced Rate", vec![since(2020, 1, 1, pct(3, 0))]),
        ],
        ..Default::default()
    }
}

fn ipsi() -> CategoryDef {
    CategoryDef {
        code: Code::from("IPSI"),
        name: "IPSI".into(),
        title: Some("Impuesto sobre la Producción, los Servicios y la Importación".into()),
        keys: vec![KeyDefinition::new(keys::STANDARD, "Standard")],
        ..Default::default()
    }
}

fn irpf() -> CategoryDef {
    let retained = |key: &str, name: &str, values: Vec<RateValueDef>| RateDef {
        keys: Vec::new(),
        ..rate(key, name, values)
    };
    CategoryDef {
        code: Code::from("IRPF"),
        name: "IRPF".into(),
        title: Some("Impuesto sobre la Renta de las Personas Físicas".into()),
        retained: true,
        rates: vec![
            retained(
                irpf::PRO,
                "Professional Rate",
                vec![
                    since(2015, 7, 12, pct(15, 0)),
                    since(2015, 1, 1, pct(19, 0)),
                    since(2012, 9, 1, pct(21, 0)),
                    since(2007, 1, 1, pct(15, 0)),
                ],
            ),
            retained(
                irpf::PRO_START,
                "Professional Starting Rate",
                vec![since(2007, 1, 1, pct(7, 0))],
            ),
            retained(irpf::CAPITAL, "Rental or Interest", vec![since(2007, 1, 1, pct(19, 0))]),
        ],
        ..Default::default()
    }
}

// -- Hooks -------------------------------------------------------------------

#[derive(Debug)]
struct SpainHooks;

impl RuleHooks for SpainHooks {
    fn normalize(&self, node: Node<'_>) {
        if let Node::TaxIdentity(tid) = node {
            normalize_tax_identity(tid);
        }
    }

    fn validate(&self, node: NodeRef<'_>) -> FieldErrors {
        match node {
            NodeRef::Invoice(inv) => validate_invoice(inv),
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

/// Numeric codes are left-padded with zeros to nine characters.
fn normalize_tax_identity(tid: &mut TaxIdentity) {
    if tid.country.as_str() != COUNTRY {
        return;
    }
    if let Some(code) = &tid.code {
        let c = code.as_str();
        if c.len() < 9 && c.starts_with(|ch: char| ch.is_ascii_digit()) {
            tid.code = Some(Code::from(format!("{c:0>9}")));
        }
    }
}

fn validate_invoice(inv: &Invoice) -> FieldErrors {
    let mut errs = FieldErrors::new();
    if let Some(c) = &inv.currency {
        if c.as_str() != "EUR" {
            errs.add("currency", "must be a valid value");
        }
    }
    if let Some(supplier) = &inv.supplier {
        errs.nest("supplier", require_tax_code(supplier));
    }
    // Spanish business customers must be identified by code.
    if let Some(tid) = inv.customer.as_ref().and_then(|c| c.tax_id.as_ref()) {
        if tid.country.as_str() == COUNTRY && tid.code.is_none() {
            errs.nest(
                "customer",
                FieldErrors::single("code", "cannot be blank").prefixed("tax_id"),
            );
        }
    }
    errs
}

/// Check a normalized Spanish tax code: national (DNI), foreigner (NIE),
/// organisation (CIF) or the K/L/M personal codes.
pub fn check_tax_code(code: &str) -> Result<(), &'static str> {
    const FORMAT: &str = "invalid format";
    const CHECK: &str = "invalid check digit";

    let chars: Vec<char> = code.chars().collect();
    if chars.len() != 9 || !chars.iter().all(|c| c.is_ascii_alphanumeric()) {
        return Err(FORMAT);
    }
    let first = chars[0];
    let check = chars[8];
    let middle: String = chars[1..8].iter().collect();
    let middle_digits = middle.chars().all(|c| c.is_ascii_digit());

    if first.is_ascii_digit() {
        let number: String = chars[..8].iter().collect();
        if !number.chars().all(|c| c.is_ascii_digit()) || !check.is_ascii_uppercase() {
            return Err(FORMAT);
        }
        if number == "00000000" {
            return Err(FORMAT);
        }
        return letter_check(&number, check).then_some(()).ok_or(CHECK);
    }
    if !middle_digits {
        return Err(FORMAT);
    }
    if let Some(idx) = FOREIGNER_LETTERS.find(first) {
        if !check.is_ascii_uppercase() {
            return Err(FORMAT);
        }
        let number = format!("{idx}{middle}");
        return letter_check(&number, check).then_some(()).ok_or(CHECK);
    }
    if ORG_LETTERS.contains(first) || OTHER_LETTERS.contains(first) {
        let expected = org_check_digit(&middle);
        let given = match ORG_CHECK_LETTERS.find(check) {
            Some(i) => i as u32,
            None => check.to_digit(10).ok_or(FORMAT)?,
        };
        return (given == expected).then_some(()).ok_or(CHECK);
    }
    Err(FORMAT)
}

fn letter_check(number: &str, check: char) -> bool {
    number
        .parse::<u64>()
        .ok()
        .and_then(|n| CHECK_LETTERS.get((n % 23) as usize))
        .is_some_and(|&l| l as char == check)
}

fn org_check_digit(digits: &str) -> u32 {
    let sum: u32 = digits
        .chars()
        .filter_map(|c| c.to_digit(10))
        .enumerate()
        .map(|(i, d)| {
            if i % 2 == 0 {
                let doubled = d * 2;
                if doubled > 9 {
                    doubled - 9
                } else {
                    doubled
                }
            } else {
                d
            }
        })
        .sum();
    (10 - sum % 10) % 10
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
            series: Some("SAMPLE".into()),
            code: Some("001".into()),
            supplier: Some(Party {
                tax_id: Some(TaxIdentity::new("ES", "B98602642")),
                ..Party::named("Provide One S.L.")
            }),
            customer: Some(Party {
                tax_id: Some(TaxIdentity::new("ES", "54387763P")),
                ..Party::named("Sample Consumer")
            }),
            lines: vec![Line {
                quantity: Some("20".parse().unwrap()),
                item: Some(Item {
                    name: "Development services".into(),
                    price: Some("90.00".parse().unwrap()),
                    ..Default::default()
                }),
                taxes: vec![Combo::with_rate("VAT", rates::GENERAL), Combo::with_rate("IRPF", irpf::PRO)],
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    #[test]
    fn national_codes() {
        assert_eq!(check_tax_code("93471790C"), Ok(()));
        assert_eq!(check_tax_code("43596386R"), Ok(()));
        assert_eq!(check_tax_code("93471790A"), Err("invalid check digit"));
        assert_eq!(check_tax_code("00000000A"), Err("invalid format"));
    }

    #[test]
    fn foreigner_and_organisation_codes() {
        assert_eq!(check_tax_code("X5102754C"), Ok(()));
        assert_eq!(check_tax_code("Z8327649K"), Ok(()));
        assert_eq!(check_tax_code("X5102755C"), Err("invalid check digit"));
        assert_eq!(check_tax_code("A58818501"), Ok(()));
        assert_eq!(check_tax_code("B98602642"), Ok(()));
        assert_eq!(check_tax_code("K9514336H"), Ok(()));
        assert_eq!(check_tax_code("I1234567A"), Err("invalid format"));
        assert_eq!(check_tax_code("B9860264"), Err("invalid format"));
    }

    #[test]
    fn numeric_codes_are_padded() {
        let mut tid = TaxIdentity::new("ES", "15S");
        normalize_tax_identity(&mut tid);
        assert_eq!(tid.code.as_ref().unwrap().as_str(), "00000015S");
        normalize_tax_identity(&mut tid);
        assert_eq!(tid.code.as_ref().unwrap().as_str(), "00000015S");

        let mut other = TaxIdentity::new("PT", "15S");
        normalize_tax_identity(&mut other);
        assert_eq!(other.code.as_ref().unwrap().as_str(), "15S");
    }

    #[test]
    fn professional_invoice_withholds_irpf() {
        let reg = registry();
        let mut inv = invoice();
        inv.issue_date = Some(date(2024, 3, 1));
        calculator::calculate(&mut inv, &reg).unwrap();
        let totals = inv.totals.as_ref().unwrap();
        assert_eq!(totals.sum.to_string(), "1800.00");
        assert_eq!(totals.tax.map(|t| t.to_string()), Some("378.00".into()));
        assert_eq!(totals.retained_tax.map(|t| t.to_string()), Some("270.00".into()));
        assert_eq!(totals.payable.to_string(), "1908.00");
    }

    #[test]
    fn historic_rates_follow_issue_date() {
        let reg = registry();
        let mut inv = invoice();
        inv.issue_date = Some(date(2011, 3, 1));
        inv.lines[0].taxes.truncate(1);
        calculator::calculate(&mut inv, &reg).unwrap();
        let totals = inv.totals.as_ref().unwrap();
        assert_eq!(totals.tax.map(|t| t.to_string()), Some("324.00".into()));
    }

    #[test]
    fn equivalence_surcharge_is_opt_in() {
        let reg = registry();
        let mut inv = invoice();
        inv.issue_date = Some(date(2024, 3, 1));
        inv.lines[0].taxes = vec![Combo::with_rate("VAT", eqs::GENERAL)];
        calculator::calculate(&mut inv, &reg).unwrap();
        assert_eq!(inv.lines[0].taxes[0].surcharge.map(|s| s.to_string()), Some("5.2%".into()));
        let totals = inv.totals.as_ref().unwrap();
        let vat = totals.taxes.as_ref().unwrap().category("VAT").unwrap();
        assert_eq!(vat.amount.to_string(), "378.00");
        assert_eq!(vat.surcharge.map(|s| s.to_string()), Some("93.60".into()));
        assert_eq!(totals.tax.map(|t| t.to_string()), Some("471.60".into()));
    }

    #[test]
    fn supplier_tax_code_is_checked() {
        let reg = registry();
        let mut inv = invoice();
        inv.supplier.as_mut().unwrap().tax_id = Some(TaxIdentity::new("ES", "B98602643"));
        let err = calculator::calculate(&mut inv, &reg).unwrap_err();
        assert_eq!(
            err.fields().unwrap().message_at("supplier.tax_id.code"),
            Some("invalid check digit")
        );
    }

    #[test]
    fn supplier_requires_tax_code() {
        let reg = registry();
        let mut inv = invoice();
        inv.regime = Some(Code::from(COUNTRY));
        inv.supplier.as_mut().unwrap().tax_id = None;
        let err = calculator::calculate(&mut inv, &reg).unwrap_err();
        assert_eq!(err.fields().unwrap().message_at("supplier.tax_id"), Some("cannot be blank"));
    }

    #[test]
    fn currency_must_be_euro() {
        let reg = registry();
        let mut inv = invoice();
        inv.currency = Some(CurrencyCode::new("USD"));
        let err = calculator::calculate(&mut inv, &reg).unwrap_err();
        assert_eq!(err.fields().unwrap().message_at("currency"), Some("must be a valid value"));
    }

    #[test]
    fn tag_scenarios_add_legal_notes() {
        let reg = registry();
        let mut inv = invoice();
        inv.tags = vec![Key::from(tags::CASH_BASIS)];
        calculator::calculate(&mut inv, &reg).unwrap();
        assert_eq!(inv.notes.len(), 1);
        assert_eq!(inv.notes[0].text, "Régimen especial del criterio de caja.");
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn only_the_control_letter_passes(n in 1u32..100_000_000, other in 0usize..23) {
            let letter = CHECK_LETTERS[(n % 23) as usize] as char;
            prop_assert_eq!(check_tax_code(&format!("{n:08}{letter}")), Ok(()));

            let wrong = CHECK_LETTERS[other] as char;
            prop_assume!(wrong != letter);
            prop_assert_eq!(check_tax_code(&format!("{n:08}{wrong}")), Err("invalid check digit"));
        }

        #[test]
        fn organisation_check_digit_and_letter_agree(digits in "[0-9]{7}") {
            let d = org_check_digit(&digits);
            let letter = ORG_CHECK_LETTERS.as_bytes()[d as usize] as char;
            prop_assert_eq!(check_tax_code(&format!("A{digits}{d}")), Ok(()));
            prop_assert_eq!(check_tax_code(&format!("P{digits}{letter}")), Ok(()));
        }
    }
}
