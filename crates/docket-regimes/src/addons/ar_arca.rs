//! # ARCA v4
//!
//! Electronic invoicing through Argentina's ARCA (formerly AFIP) web
//! services. Every voucher carries a `CbteTipo` document type, a concept
//! (goods, services or both) and, for the customer, a VAT status.
//!
//! Document types follow the A/B/C letter system. Standard documents
//! default to the A letter; a customer whose VAT status is not one of the
//! registered statuses moves the document to B, and the
//! `simplified-regime` tag (Monotributo suppliers) selects C.

use docket_doc::bill::Line;
use docket_doc::org::Party;
use docket_doc::tax::Combo;

use super::*;
use crate::regimes::ar;

pub const KEY: &str = "ar-arca-v4";

pub const EXT_DOC_TYPE: &str = "ar-arca-doc-type";
pub const EXT_CONCEPT: &str = "ar-arca-concept";
pub const EXT_IDENTITY_TYPE: &str = "ar-arca-identity-type";
pub const EXT_TAX_TYPE: &str = "ar-arca-tax-type";
pub const EXT_VAT_RATE: &str = "ar-arca-vat-rate";
pub const EXT_VAT_STATUS: &str = "ar-arca-vat-status";

/// Tag for suppliers under the Monotributo simplified regime.
pub const TAG_SIMPLIFIED_REGIME: &str = "simplified-regime";

/// VAT statuses of customers that receive A documents.
const STATUS_TYPE_A: &[&str] = &["1", "6", "13", "16"];

const NOTE_TYPE_A: &str = "Comprobante tipo A emitido a responsable inscripto en IVA.";

const CREDIT_NOTES: &[&str] = &["003", "008", "013"];
const DEBIT_NOTES: &[&str] = &["002", "007", "012"];

// -- Definition --------------------------------------------------------------

pub fn addon() -> AddonDef {
    AddonDef {
        key: Key::from(KEY),
        name: "Argentina ARCA v4".into(),
        description: Some("Electronic vouchers for the ARCA WSFEv1 web service.".into()),
        sources: vec![Source {
            title: "Manual para el desarrollador WSFEv1".into(),
            url: "https://www.afip.gob.ar/ws/documentacion/ws-factura-electronica.asp".into(),
        }],
        extensions: extensions(),
        tags: vec![TagSet {
            schema: SHORT_INVOICE.into(),
            list: vec![KeyDefinition::new(TAG_SIMPLIFIED_REGIME, "Simplified Tax Regime")
                .with_desc("Invoice C: supplier is under the simplified tax regime (Monotributo).")],
        }],
        scenarios: vec![ScenarioSet {
            schema: SHORT_INVOICE.into(),
            list: scenarios(),
        }],
        corrections: vec![CorrectionDefinition {
            types: keys(&[types::CREDIT_NOTE, types::DEBIT_NOTE]),
            ..CorrectionDefinition::new(SHORT_INVOICE)
        }],
        hooks: Some(Arc::new(ArcaHooks)),
        ..Default::default()
    }
}

fn extensions() -> Vec<ExtensionDef> {
    vec![
        extension(
            EXT_DOC_TYPE,
            "Document Type",
            &[
                ("001", "Invoice A"),
                ("002", "Debit Note A"),
                ("003", "Credit Note A"),
                ("006", "Invoice B"),
                ("007", "Debit Note B"),
                ("008", "Credit Note B"),
                ("011", "Invoice C"),
                ("012", "Debit Note C"),
                ("013", "Credit Note C"),
            ],
        ),
        extension(EXT_CONCEPT, "Concept", &[("1", "Goods"), ("2", "Services"), ("3", "Goods and services")]),
        extension(
            EXT_IDENTITY_TYPE,
            "Customer Identity Type",
            &[
                ("80", "CUIT"),
                ("86", "CUIL"),
                ("87", "CDI"),
                ("91", "Foreign CI"),
                ("94", "Passport"),
                ("96", "DNI"),
                ("99", "Final Consumer"),
            ],
        ),
        extension(
            EXT_TAX_TYPE,
            "Tax Type",
            &[
                ("1", "National Taxes"),
                ("2", "Provincial Taxes"),
                ("3", "Municipal Taxes"),
                ("4", "Internal Taxes"),
                ("5", "Gross Income Tax"),
                ("6", "VAT Prepayment"),
                ("7", "Gross Income Tax Prepayment"),
                ("8", "Municipal Taxes Prepayment"),
                ("9", "Other Prepayments"),
                ("13", "VAT Not Categorized Prepayment"),
                ("99", "Other"),
            ],
        ),
        extension(
            EXT_VAT_RATE,
            "VAT Rate",
            &[("3", "0%"), ("4", "10.5%"), ("5", "21%"), ("6", "27%"), ("8", "5%"), ("9", "2.5%")],
        ),
        extension(
            EXT_VAT_STATUS,
            "Customer VAT Status",
            &[
                ("1", "Registered VAT Company"),
                ("4", "VAT Exempt Subject"),
                ("5", "Final Consumer"),
                ("6", "Monotributo Responsible"),
                ("7", "Uncategorized Subject"),
                ("8", "Foreign Supplier"),
                ("9", "Foreign Customer"),
                ("10", "VAT Exempt - Law N° 19.640"),
                ("13", "Social Monotributista"),
                ("15", "VAT Not Applicable"),
                ("16", "Promoted Independent Worker Monotributista"),
            ],
        ),
    ]
}

fn scenarios() -> Vec<Scenario> {
    let simplified = &[TAG_SIMPLIFIED_REGIME][..];
    vec![
        ext_scenario(&[types::STANDARD], simplified, EXT_DOC_TYPE, "011"),
        ext_scenario(&[types::DEBIT_NOTE], simplified, EXT_DOC_TYPE, "012"),
        ext_scenario(&[types::CREDIT_NOTE], simplified, EXT_DOC_TYPE, "013"),
        ext_scenario(&[types::STANDARD], &[], EXT_DOC_TYPE, "001"),
        ext_scenario(&[types::DEBIT_NOTE], &[], EXT_DOC_TYPE, "002"),
        ext_scenario(&[types::CREDIT_NOTE], &[], EXT_DOC_TYPE, "003"),
        // Runs after the fallbacks so it sees the final document type.
        Scenario {
            name: Some("Invoice A".into()),
            ext_key: Some(Key::from(EXT_DOC_TYPE)),
            ext_value: Some("001".into()),
            note: Some(Note::legal(EXT_DOC_TYPE, NOTE_TYPE_A)),
            ..Default::default()
        },
    ]
}

// -- Hooks -------------------------------------------------------------------

#[derive(Debug)]
struct ArcaHooks;

impl RuleHooks for ArcaHooks {
    fn normalize(&self, node: Node<'_>) {
        match node {
            Node::Invoice(inv) => normalize_invoice(inv),
            Node::Combo(c) => normalize_combo(c),
            _ => {}
        }
    }

    fn validate(&self, node: NodeRef<'_>) -> FieldErrors {
        match node {
            NodeRef::Invoice(inv) => validate_invoice(inv),
            _ => FieldErrors::new(),
        }
    }
}

fn normalize_invoice(inv: &mut Invoice) {
    if let Some(customer) = &mut inv.customer {
        normalize_vat_status(customer);
    }
    let letter_b = !inv.has_tags(&[TAG_SIMPLIFIED_REGIME])
        && inv
            .customer
            .as_ref()
            .and_then(|c| c.ext.get(EXT_VAT_STATUS))
            .is_some_and(|s| !STATUS_TYPE_A.contains(&s));
    if letter_b && inv.ext().and_then(|e| e.get(EXT_DOC_TYPE)).is_none() {
        let code = match inv.kind.as_str() {
            types::STANDARD => Some("006"),
            types::DEBIT_NOTE => Some("007"),
            types::CREDIT_NOTE => Some("008"),
            _ => None,
        };
        if let Some(code) = code {
            inv.ext_mut().set(EXT_DOC_TYPE, code);
        }
    }
    if let Some(concept) = concept(&inv.lines) {
        if inv.ext().and_then(|e| e.get(EXT_CONCEPT)).is_none() {
            inv.ext_mut().set(EXT_CONCEPT, concept);
        }
    }
}

/// Registered status for Argentine identities, foreign customer for
/// others and final consumer without any.
fn normalize_vat_status(customer: &mut Party) {
    if customer.ext.get(EXT_VAT_STATUS).is_some() {
        return;
    }
    let status = match &customer.tax_id {
        None => "5",
        Some(tid) if tid.country.as_str() == ar::COUNTRY => "1",
        Some(_) => "9",
    };
    customer.ext.set(EXT_VAT_STATUS, status);
}

/// Goods lines are keyed `goods`; anything else counts as a service.
fn concept(lines: &[Line]) -> Option<&'static str> {
    let goods = |l: &Line| {
        l.item
            .as_ref()
            .and_then(|i| i.key.as_ref())
            .is_some_and(|k| k.as_str() == "goods")
    };
    let has_goods = lines.iter().any(goods);
    let has_services = lines.iter().any(|l| !goods(l));
    match (has_goods, has_services) {
        (true, true) => Some("3"),
        (true, false) => Some("1"),
        (false, true) => Some("2"),
        (false, false) => None,
    }
}

fn normalize_combo(c: &mut Combo) {
    if c.cat != "VAT" || c.ext.get(EXT_VAT_RATE).is_some() {
        return;
    }
    let code = match (c.rate.as_ref().map(|r| r.as_str()), c.key.as_ref().map(|k| k.as_str())) {
        (Some(ar::RATE_INCREASED), _) => Some("6"),
        (Some("general"), _) => Some("5"),
        (Some("reduced"), _) => Some("4"),
        (None, Some("zero")) => Some("3"),
        _ => None,
    };
    if let Some(code) = code {
        c.ext.set(EXT_VAT_RATE, code);
    }
}

fn validate_invoice(inv: &Invoice) -> FieldErrors {
    let mut errs = FieldErrors::new();
    let doc_type = inv.ext().and_then(|e| e.get(EXT_DOC_TYPE));

    let mut xerrs = FieldErrors::new();
    match doc_type {
        None => xerrs.add(EXT_DOC_TYPE, "required"),
        Some(code) => {
            if let Some(msg) = doc_type_mismatch(inv.kind.as_str(), code) {
                xerrs.add(EXT_DOC_TYPE, msg);
            }
        }
    }
    if inv.ext().and_then(|e| e.get(EXT_CONCEPT)).is_none() {
        xerrs.add(EXT_CONCEPT, "required");
    }
    errs.nest("tax", xerrs.prefixed("ext"));

    let letter_a = doc_type.is_some_and(|c| ["001", "002", "003"].contains(&c));
    if let Some(customer) = inv.customer.as_ref().filter(|_| letter_a) {
        if customer.tax_id.is_none() {
            errs.nest("customer", FieldErrors::single("tax_id", "cannot be blank"));
        }
    }
    if let Some(customer) = &inv.customer {
        if customer.ext.get(EXT_VAT_STATUS).is_none() {
            errs.nest(
                "customer",
                FieldErrors::single(EXT_VAT_STATUS, "required").prefixed("ext"),
            );
        }
    }
    errs
}

fn doc_type_mismatch(kind: &str, code: &str) -> Option<&'static str> {
    let credit = CREDIT_NOTES.contains(&code);
    let debit = DEBIT_NOTES.contains(&code);
    match kind {
        types::CREDIT_NOTE if !credit => Some("must be a credit note document type"),
        types::DEBIT_NOTE if !debit => Some("must be a debit note document type"),
        types::CREDIT_NOTE | types::DEBIT_NOTE => None,
        _ if credit || debit => Some("not valid for the invoice type"),
        _ => None,
    }
}
