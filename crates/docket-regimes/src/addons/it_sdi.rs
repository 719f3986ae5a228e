//! # FatturaPA / SDI v1
//!
//! Rules for invoices exchanged through Italy's Sistema di Interscambio.
//!
//! The addon picks the transmission format (`FPR12` private, `FPA12`
//! public administration) and the `TipoDocumento` from the invoice type and
//! tags, defaults the supplier's fiscal regime to `RF01`, and requires a
//! `CausalePagamento` code on every withholding combo. Free text sent to
//! SDI must fit in Latin-1.

use docket_doc::bill::Line;
use docket_doc::org::{Address, Party};
use docket_doc::tax::Combo;

use super::*;
use crate::regimes::{it, require_tax_code};

pub const KEY: &str = "it-sdi-v1";

pub const EXT_FORMAT: &str = "it-sdi-format";
pub const EXT_DOC_TYPE: &str = "it-sdi-document-type";
pub const EXT_FISCAL_REGIME: &str = "it-sdi-fiscal-regime";
pub const EXT_EXEMPT: &str = "it-sdi-exempt";
pub const EXT_RETAINED: &str = "it-sdi-retained";

/// Key used for the withholding reason before it was renamed.
const LEGACY_EXT_RETAINED: &str = "it-sdi-retained-tax";

const LATIN1: &str = "contains characters outside of Latin and Latin-1 range";
const STREET_OR_BOX: &str = "either street or post office box must be set";

pub mod tags {
    pub const B2G: &str = "b2g";
    pub const FREELANCE: &str = "freelance";
    pub const CEILING_EXCEEDED: &str = "ceiling-exceeded";
    pub const SAN_MARINO_PAPER: &str = "san-marino-paper";
    pub const IMPORT: &str = "import";
    pub const GOODS: &str = "goods";
    pub const GOODS_EU: &str = "goods-eu";
    pub const GOODS_WITH_TAX: &str = "goods-with-tax";
    pub const GOODS_EXTRACTED: &str = "goods-extracted";
    pub const REGULARIZATION: &str = "regularization";
    pub const DEFERRED: &str = "deferred";
    pub const THIRD_PERIOD: &str = "third-period";
    pub const DEPRECIABLE_ASSETS: &str = "depreciable-assets";
}

// -- Definition --------------------------------------------------------------

pub fn addon() -> AddonDef {
    AddonDef {
        key: Key::from(KEY),
        name: "Italy SDI FatturaPA v1.x".into(),
        description: Some("Extensions for the FatturaPA format sent through SDI.".into()),
        sources: vec![Source {
            title: "FatturaPA Specifiche tecniche 1.2.2".into(),
            url: "https://www.fatturapa.gov.it/it/norme-e-regole/documentazione-fattura-elettronica/formato-fatturapa/".into(),
        }],
        extensions: extensions(),
        tags: vec![TagSet {
            schema: SHORT_INVOICE.into(),
            list: vec![
                KeyDefinition::new(tags::B2G, "Business to Government"),
                KeyDefinition::new(tags::FREELANCE, "Freelancer"),
                KeyDefinition::new(tags::CEILING_EXCEEDED, "Ceiling exceeded"),
                KeyDefinition::new(tags::SAN_MARINO_PAPER, "Purchases from San Marino with VAT and paper invoice"),
                KeyDefinition::new(tags::IMPORT, "Import"),
                KeyDefinition::new(tags::GOODS, "Goods"),
                KeyDefinition::new(tags::GOODS_EU, "Goods from EU"),
                KeyDefinition::new(tags::GOODS_WITH_TAX, "Goods with tax"),
                KeyDefinition::new(tags::GOODS_EXTRACTED, "Goods extracted"),
                KeyDefinition::new(tags::REGULARIZATION, "Regularization"),
                KeyDefinition::new(tags::DEFERRED, "Deferred"),
                KeyDefinition::new(tags::THIRD_PERIOD, "Third period"),
                KeyDefinition::new(tags::DEPRECIABLE_ASSETS, "Depreciable assets"),
            ],
        }],
        scenarios: vec![ScenarioSet {
            schema: SHORT_INVOICE.into(),
            list: scenarios(),
        }],
        corrections: vec![CorrectionDefinition {
            types: keys(&[types::CREDIT_NOTE, types::DEBIT_NOTE]),
            ..CorrectionDefinition::new(SHORT_INVOICE)
        }],
        hooks: Some(Arc::new(SdiHooks)),
        ..Default::default()
    }
}

fn extensions() -> Vec<ExtensionDef> {
    vec![
        extension(
            EXT_FORMAT,
            "Transmission Format",
            &[("FPA12", "FatturaPA 1.2 towards Public Administration"), ("FPR12", "FatturaPA 1.2 towards Privates")],
        ),
        extension(
            EXT_DOC_TYPE,
            "Document Type",
            &[
                ("TD01", "Invoice"),
                ("TD02", "Advance or down payment on invoice"),
                ("TD03", "Advance or down payment on freelance invoice"),
                ("TD04", "Credit Note"),
                ("TD05", "Debit Note"),
                ("TD06", "Freelancer invoice with retained taxes"),
                ("TD07", "Simplified invoice"),
                ("TD08", "Simplified credit note"),
                ("TD09", "Simplified debit note"),
                ("TD16", "Reverse charge internal invoice integration"),
                ("TD17", "Integration/self invoicing for purchase services from abroad"),
                ("TD18", "Integration for purchase of intra UE goods"),
                ("TD19", "Integration/self invoicing for purchase of goods ex art.17 c.2 DPR 633/72"),
                ("TD20", "Self invoicing for regularisation and integration of invoices"),
                ("TD21", "Self invoicing for splaphoning"),
                ("TD22", "Extraction of goods from VAT Warehouse"),
                ("TD23", "Extraction of goods from VAT Warehouse with payment of VAT"),
                ("TD24", "Deferred invoice ex art.21, c.4, lett. a) DPR 633/72"),
                ("TD25", "Deferred invoice ex art.21, c.4, third period lett. b) DPR 633/72"),
                ("TD26", "Sale of depreciable assets and for internal transfers"),
                ("TD27", "Self invoicing for self consumption or for free transfer without recourse"),
                ("TD28", "Purchases from San Marino with VAT (paper invoice)"),
            ],
        ),
        extension(
            EXT_FISCAL_REGIME,
            "Fiscal Regime",
            &[
                ("RF01", "Ordinary"),
                ("RF02", "Minimum taxpayers"),
                ("RF04", "Agriculture and connected activities and fishing"),
                ("RF05", "Sale of salts and tobaccos"),
                ("RF06", "Match sales"),
                ("RF07", "Publishing"),
                ("RF08", "Management of public telephone services"),
                ("RF09", "Resale of public transport and parking documents"),
                ("RF10", "Entertainment, gaming and other activities"),
                ("RF11", "Travel and tourism agencies"),
                ("RF12", "Farmhouse accommodation/restaurants"),
                ("RF13", "Door-to-door sales"),
                ("RF14", "Resale of used goods, artworks, antiques or collector's items"),
                ("RF15", "Artwork, antiques or collector's items auction agencies"),
                ("RF16", "VAT paid in cash by P.A."),
                ("RF17", "VAT paid in cash by subjects with business turnover below Euro 200,000"),
                ("RF18", "Other"),
                ("RF19", "Flat rate"),
            ],
        ),
        extension(
            EXT_EXEMPT,
            "Exemption Code",
            &[
                ("N1", "Excluded pursuant to Art. 15, DPR 633/72"),
                ("N2.1", "Not subject pursuant to Art. 7, DPR 633/72"),
                ("N2.2", "Not subject (other)"),
                ("N3.1", "Not taxable (exports)"),
                ("N3.2", "Not taxable (intra-EU)"),
                ("N3.3", "Not taxable (to San Marino)"),
                ("N3.4", "Not taxable (export similar)"),
                ("N3.5", "Not taxable (with declaration of intent)"),
                ("N3.6", "Not taxable (other)"),
                ("N4", "Exempt"),
                ("N5", "Margin regime / VAT not exposed"),
                ("N6.1", "Reverse charge (scrap and other recovered materials)"),
                ("N6.2", "Reverse charge (gold and pure silver)"),
                ("N6.3", "Reverse charge (construction subcontracting)"),
                ("N6.4", "Reverse charge (buildings)"),
                ("N6.5", "Reverse charge (mobile phones)"),
                ("N6.6", "Reverse charge (electronic products)"),
                ("N6.7", "Reverse charge (construction related)"),
                ("N6.8", "Reverse charge (energy sector)"),
                ("N6.9", "Reverse charge (other)"),
                ("N7", "VAT paid in other EU countries"),
            ],
        ),
        extension(
            EXT_RETAINED,
            "Retained Tax Reason",
            &[
                ("A", "Autonomous work in the field of art or regular professional practice"),
                ("B", "Use of intellectual works by the author or inventor"),
                ("C", "Profits from participation in partnerships"),
                ("D", "Profits paid to founders of a company"),
                ("E", "Protest of bills by town secretaries"),
                ("F", "Fees paid to the court clerk"),
                ("G", "Severance pay for the termination of professional sports activity"),
                ("H", "Severance pay for the termination of agency relationships"),
                ("I", "Severance pay for the termination of notarial functions"),
                ("J", "Fees for the collection of truffles"),
                ("K", "Universal civil service vouchers"),
                ("L", "Use of intellectual works by a non-author"),
                ("L1", "Use of intellectual works by a purchaser for value"),
                ("M", "Occasional self-employment"),
                ("M1", "Income from obligations to do, not to do or to allow"),
                ("M2", "Occasional self-employment subject to INPS separate management"),
                ("N", "Amateur sports allowances and prizes"),
                ("O", "Occasional self-employment without INPS contribution"),
                ("O1", "Obligations to do, not to do or to allow without INPS contribution"),
                ("P", "Use of equipment by non-resident parties"),
                ("Q", "Commissions to a single-firm agent"),
                ("R", "Commissions to a multi-firm agent"),
                ("S", "Commissions to a commission agent"),
                ("T", "Commissions to a sales promoter"),
                ("U", "Business brokering"),
                ("V", "Door-to-door sales and newspaper kiosks"),
                ("V1", "Occasional commercial activities"),
                ("V2", "Occasional door-to-door sales"),
                ("W", "Contract payments subject to withholding"),
                ("X", "Payments to EU companies under directive 2003/49"),
                ("Y", "Payments to EU companies under directive 2003/49 (later periods)"),
                ("ZO", "Other reasons"),
            ],
        ),
    ]
}

/// Most specific first; each key keeps the first value written.
fn scenarios() -> Vec<Scenario> {
    let std = &[types::STANDARD][..];
    vec![
        // Format
        ext_scenario(&[], &[tags::B2G], EXT_FORMAT, "FPA12"),
        ext_scenario(&[], &[], EXT_FORMAT, "FPR12"),
        // Document type, self-billed variants
        ext_scenario(std, &["self-billed", tags::IMPORT, tags::GOODS_EU], EXT_DOC_TYPE, "TD18"),
        ext_scenario(std, &["self-billed", tags::IMPORT, tags::GOODS], EXT_DOC_TYPE, "TD19"),
        ext_scenario(std, &["self-billed", tags::IMPORT], EXT_DOC_TYPE, "TD17"),
        ext_scenario(std, &["self-billed", "reverse-charge"], EXT_DOC_TYPE, "TD16"),
        ext_scenario(std, &["self-billed", tags::REGULARIZATION], EXT_DOC_TYPE, "TD20"),
        ext_scenario(std, &["self-billed", tags::CEILING_EXCEEDED], EXT_DOC_TYPE, "TD21"),
        ext_scenario(std, &["self-billed", tags::GOODS_EXTRACTED], EXT_DOC_TYPE, "TD22"),
        ext_scenario(std, &["self-billed", tags::GOODS_WITH_TAX], EXT_DOC_TYPE, "TD23"),
        ext_scenario(std, &["self-billed"], EXT_DOC_TYPE, "TD27"),
        // Document type, other tagged variants
        ext_scenario(std, &[tags::DEFERRED, tags::THIRD_PERIOD], EXT_DOC_TYPE, "TD25"),
        ext_scenario(std, &[tags::DEFERRED], EXT_DOC_TYPE, "TD24"),
        ext_scenario(std, &[tags::DEPRECIABLE_ASSETS], EXT_DOC_TYPE, "TD26"),
        ext_scenario(std, &[tags::SAN_MARINO_PAPER], EXT_DOC_TYPE, "TD28"),
        ext_scenario(std, &["partial", tags::FREELANCE], EXT_DOC_TYPE, "TD03"),
        ext_scenario(std, &[tags::FREELANCE], EXT_DOC_TYPE, "TD06"),
        ext_scenario(std, &["partial"], EXT_DOC_TYPE, "TD02"),
        ext_scenario(std, &["simplified"], EXT_DOC_TYPE, "TD07"),
        ext_scenario(&[types::CREDIT_NOTE], &["simplified"], EXT_DOC_TYPE, "TD08"),
        ext_scenario(&[types::DEBIT_NOTE], &["simplified"], EXT_DOC_TYPE, "TD09"),
        // Document type, plain
        ext_scenario(std, &[], EXT_DOC_TYPE, "TD01"),
        ext_scenario(&[types::CREDIT_NOTE], &[], EXT_DOC_TYPE, "TD04"),
        ext_scenario(&[types::DEBIT_NOTE], &[], EXT_DOC_TYPE, "TD05"),
    ]
}

// -- Hooks -------------------------------------------------------------------

#[derive(Debug)]
struct SdiHooks;

impl RuleHooks for SdiHooks {
    fn normalize(&self, node: Node<'_>) {
        match node {
            Node::Invoice(inv) => {
                if let Some(supplier) = &mut inv.supplier {
                    normalize_supplier(supplier);
                }
            }
            Node::Combo(c) => c.ext.rename(LEGACY_EXT_RETAINED, EXT_RETAINED),
            _ => {}
        }
    }

    fn validate(&self, node: NodeRef<'_>) -> FieldErrors {
        match node {
            NodeRef::Invoice(inv) => validate_invoice(inv),
            NodeRef::Combo(c) => validate_combo(c),
            NodeRef::Line(line) => validate_line(line),
            NodeRef::Address(a) => validate_address(a),
            NodeRef::Item(item) => latin1("name", &item.name),
            _ => FieldErrors::new(),
        }
    }
}

fn normalize_supplier(party: &mut Party) {
    if party.ext.get(EXT_FISCAL_REGIME).is_none() {
        party.ext.set(EXT_FISCAL_REGIME, "RF01");
    }
    let italian = party.tax_id.as_ref().is_some_and(|t| t.country.as_str() == it::COUNTRY);
    if italian {
        for tel in &mut party.telephones {
            if let Some(rest) = tel.num.strip_prefix("+39") {
                tel.num = rest.to_string();
            }
        }
    }
}

fn validate_invoice(inv: &Invoice) -> FieldErrors {
    let mut errs = FieldErrors::new();

    let mut xerrs = FieldErrors::new();
    for key in [EXT_FORMAT, EXT_DOC_TYPE] {
        if inv.ext().and_then(|e| e.get(key)).is_none() {
            xerrs.add(key, "required");
        }
    }
    errs.nest("tax", xerrs.prefixed("ext"));

    if let Some(supplier) = &inv.supplier {
        let mut serrs = require_tax_code(supplier);
        serrs.merge(latin1("name", &supplier.name));
        if supplier.addresses.is_empty() {
            serrs.add("addresses", "cannot be blank");
        }
        if let Some(reg) = &supplier.registration {
            let mut rerrs = FieldErrors::new();
            if reg.entry.as_deref().map_or(true, str::is_empty) {
                rerrs.add("entry", "cannot be blank");
            }
            if reg.office.as_deref().map_or(true, str::is_empty) {
                rerrs.add("office", "cannot be blank");
            }
            serrs.nest("registration", rerrs);
        }
        errs.nest("supplier", serrs);
    }

    match &inv.customer {
        None => errs.add("customer", "cannot be blank"),
        Some(customer) => errs.nest("customer", validate_customer(customer)),
    }
    errs
}

/// A customer needs a tax identity; an Italian one also needs either the
/// code or a Codice Fiscale identity.
fn validate_customer(customer: &Party) -> FieldErrors {
    let mut errs = latin1("name", &customer.name);
    match &customer.tax_id {
        None => errs.add("tax_id", "cannot be blank"),
        Some(tid) if tid.country.as_str() == it::COUNTRY => {
            let has_code = tid.code.as_ref().is_some_and(|c| !c.is_empty());
            if !has_code && customer.identity("it-fiscal-code").is_none() {
                errs.nest("tax_id", FieldErrors::single("code", "cannot be blank"));
            }
        }
        Some(_) => {}
    }
    if customer.addresses.is_empty() {
        errs.add("addresses", "cannot be blank");
    }
    errs
}

fn validate_combo(c: &Combo) -> FieldErrors {
    if it::is_retained(c.cat.as_str()) && c.ext.get(EXT_RETAINED).is_none() {
        return FieldErrors::single(EXT_RETAINED, "required").prefixed("ext");
    }
    FieldErrors::new()
}

fn validate_line(line: &Line) -> FieldErrors {
    if line.taxes.iter().any(|c| c.cat == "VAT") {
        return FieldErrors::new();
    }
    FieldErrors::single("taxes", "missing category VAT")
}

fn validate_address(a: &Address) -> FieldErrors {
    let mut errs = FieldErrors::new();
    let blank = |v: &Option<String>| v.as_deref().map_or(true, |s| s.trim().is_empty());
    if blank(&a.street) && blank(&a.po_box) {
        errs.add("street", STREET_OR_BOX);
        errs.add("po_box", STREET_OR_BOX);
    }
    for (field, value) in [("street", &a.street), ("po_box", &a.po_box), ("locality", &a.locality)] {
        if let Some(v) = value {
            errs.merge(latin1(field, v));
        }
    }
    if a.country.is_none() {
        errs.add("country", "cannot be blank");
    }
    if blank(&a.locality) {
        errs.add("locality", "cannot be blank");
    }
    if a.country.as_ref().is_some_and(|c| c.as_str() == it::COUNTRY) {
        match a.code.as_deref() {
            None | Some("") => errs.add("code", "cannot be blank"),
            Some(code) if code.len() != 5 || !code.chars().all(|c| c.is_ascii_digit()) => {
                errs.add("code", "must be in a valid format")
            }
            Some(_) => {}
        }
    }
    errs
}

fn latin1(field: &str, value: &str) -> FieldErrors {
    if value.chars().any(|c| u32::from(c) > 0xFF) {
        return FieldErrors::single(field, LATIN1);
    }
    FieldErrors::new()
}
