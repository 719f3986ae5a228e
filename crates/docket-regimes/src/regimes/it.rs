//! # Italy
//!
//! Italian tax regime: IVA with four rate levels and the withholding
//! categories applied to professional and agency invoices.
//!
//! Tax identities are either a Partita IVA (eleven digits with a Luhn
//! check digit) or, for natural persons, a Codice Fiscale (sixteen
//! characters with a check letter).
//!
//! Sources: DPR 633/1972 (IVA), DPR 600/1973 art. 25 (ritenute d'acconto).

use super::*;

pub const COUNTRY: &str = "IT";

/// Withholding category codes.
pub mod retained {
    pub const IRPEF: &str = "IRPEF";
    pub const IRES: &str = "IRES";
    pub const INPS: &str = "INPS";
    pub const ENASARCO: &str = "ENASARCO";
    pub const ENPAM: &str = "ENPAM";
    pub const ALL: &[&str] = &[IRPEF, IRES, INPS, ENASARCO, ENPAM];
}

/// Check values of odd-position characters in a Codice Fiscale, indexed
/// by digit then letter.
const FISCAL_ODD: [u32; 36] = [
    1, 0, 5, 7, 9, 13, 15, 17, 19, 21, // 0-9
    1, 0, 5, 7, 9, 13, 15, 17, 19, 21, 2, 4, 18, 20, 11, 3, 6, 8, 12, 14, 16, 10, 22, 25, 24, 23,
];

// -- Definition --------------------------------------------------------------

pub fn regime() -> RegimeDef {
    RegimeDef {
        country: Code::from(COUNTRY),
        name: "Italy".into(),
        currency: CurrencyCode::new("EUR"),
        time_zone: "Europe/Rome".into(),
        tax_scheme: Some(Code::from("VAT")),
        calculator_rounding_rule: RoundingRule::Precise,
        identities: vec![
            KeyDefinition::new("it-fiscal-code", "Codice Fiscale"),
            KeyDefinition::new("it-rea", "REA number"),
        ],
        categories: categories(),
        corrections: vec![CorrectionDefinition {
            types: vec![Key::from(types::CREDIT_NOTE), Key::from(types::DEBIT_NOTE)],
            ..CorrectionDefinition::new(SHORT_INVOICE)
        }],
        hooks: Some(Arc::new(ItalyHooks)),
        ..Default::default()
    }
}

fn categories() -> Vec<CategoryDef> {
    let mut list = vec![CategoryDef {
        code: Code::from("VAT"),
        name: "IVA".into(),
        title: Some("Imposta sul Valore Aggiunto".into()),
        keys: vat_keys(),
        rates: vec![
            rate(rates::SUPER_REDUCED, "Minimum Rate", vec![since(1989, 1, 1, pct(40, 1))]),
            rate(rates::REDUCED, "Reduced Rate", vec![since(2016, 1, 1, pct(50, 1))]),
            rate(rates::INTERMEDIATE, "Intermediate Rate", vec![since(1995, 2, 24, pct(100, 1))]),
            rate(rates::GENERAL, "General Rate", vec![since(2013, 10, 1, pct(220, 1))]),
        ],
        ..Default::default()
    }];
    let withholding = [
        (retained::IRPEF, "Imposta sul Reddito delle Persone Fisiche"),
        (retained::IRES, "Imposta sul Reddito delle Società"),
        (retained::INPS, "Contributo Previdenziale INPS"),
        (retained::ENASARCO, "Ente Nazionale di Assistenza per gli Agenti e i Rappresentanti di Commercio"),
        (retained::ENPAM, "Ente Nazionale di Previdenza e Assistenza dei Medici"),
    ];
    list.extend(withholding.iter().map(|(code, title)| CategoryDef {
        code: Code::from(*code),
        name: code.to_string(),
        title: Some(title.to_string()),
        retained: true,
        ..Default::default()
    }));
    list
}

/// True for the withholding categories.
pub fn is_retained(cat: &str) -> bool {
    retained::ALL.contains(&cat)
}

// -- Hooks -------------------------------------------------------------------

#[derive(Debug)]
struct ItalyHooks;

impl RuleHooks for ItalyHooks {
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
    if let Some(customer) = &inv.customer {
        match &customer.tax_id {
            None => errs.nest("customer", FieldErrors::single("tax_id", "cannot be blank")),
            Some(tid) if tid.country.as_str() == COUNTRY => {
                errs.nest("customer", require_tax_code(customer));
            }
            Some(_) => {}
        }
    }
    errs
}

/// Check a normalized Italian tax code: a Partita IVA, or a Codice
/// Fiscale when sixteen characters long.
pub fn check_tax_code(code: &str) -> Result<(), &'static str> {
    if code.len() == 16 {
        return check_fiscal_code(code);
    }
    if !code.chars().all(|c| c.is_ascii_digit()) {
        return Err("contains invalid characters");
    }
    if code.len() != 11 {
        return Err("invalid length");
    }
    let digits: Vec<u32> = code.chars().filter_map(|c| c.to_digit(10)).collect();
    let sum: u32 = digits[..10]
        .iter()
        .enumerate()
        .map(|(i, &d)| {
            if i % 2 == 1 {
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
    if (10 - sum % 10) % 10 != digits[10] {
        return Err("invalid check digit");
    }
    Ok(())
}

fn check_fiscal_code(code: &str) -> Result<(), &'static str> {
    let chars: Vec<char> = code.chars().collect();
    if !chars.iter().all(|c| c.is_ascii_digit() || c.is_ascii_uppercase())
        || !chars[..6].iter().all(|c| c.is_ascii_uppercase())
        || !chars[15].is_ascii_uppercase()
    {
        return Err("invalid format");
    }
    let index = |c: char| -> usize {
        match c.to_digit(10) {
            Some(d) => d as usize,
            None => 10 + (c as usize - 'A' as usize),
        }
    };
    let sum: u32 = chars[..15]
        .iter()
        .enumerate()
        .map(|(i, &c)| {
            if i % 2 == 0 {
                FISCAL_ODD[index(c)]
            } else {
                let v = index(c);
                (if v >= 10 { v - 10 } else { v }) as u32
            }
        })
        .sum();
    let expected = (b'A' + (sum % 26) as u8) as char;
    if expected != chars[15] {
        return Err("invalid check digit");
    }
    Ok(())
}
