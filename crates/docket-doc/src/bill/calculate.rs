//! # Invoice Calculation
//!
//! Derives line sums, charge amounts, tax totals and payable figures from
//! the quantities, prices and tax combos the invoice carries.
//!
//! ## Rounding
//!
//! Work happens at a working scale and every stored figure is rounded to
//! the currency's scale at the end.
//!
//! - [`RoundingRule::Precise`]: the working scale is the currency scale
//!   plus two. Per-line tax is summed at that precision and each category
//!   is rounded once.
//! - [`RoundingRule::Currency`]: the working scale is the currency scale,
//!   so each line's tax is rounded before it is summed.
//!
//! Rounding is half away from zero.

use chrono::NaiveDate;
use docket_core::{Amount, ArithmeticError, Code, CurrencyCode, FieldErrors, Key};
use rust_decimal::Decimal;

use super::{Invoice, Totals};
use crate::defs::category::keys;
use crate::defs::{RegimeDef, RoundingRule};
use crate::tax::{CategoryTotal, Combo, RateTotal, RateTotalSurcharge, TaxTotal};

/// Digits kept beyond the currency scale under the precise rule.
const EXTRA_PRECISION: u32 = 2;

/// A taxable base and the combos that apply to it.
struct Taxable {
    /// Where the base came from: `lines.0`, `charges.1`.
    path: String,
    base: Amount,
    combos: Vec<Combo>,
}

/// Report an arithmetic failure at a dotted field path.
fn failed(path: String) -> impl FnOnce(ArithmeticError) -> FieldErrors {
    move |e| {
        let mut parts = path.rsplit('.');
        let leaf = parts.next().unwrap_or_default();
        parts.fold(FieldErrors::single(leaf, e.to_string()), |errs, p| errs.prefixed(p))
    }
}

/// Calculate the invoice in place. `today` fills a missing issue date.
///
/// Errors are keyed by field path and abort the calculation; the invoice
/// is left partially updated. Figures outside the decimal range fail at
/// the field that produced them (`lines.0.sum: overflow`).
pub fn calculate(
    inv: &mut Invoice,
    regime: Option<&RegimeDef>,
    today: NaiveDate,
) -> Result<(), FieldErrors> {
    let date = *inv.issue_date.get_or_insert(today);
    let currency = resolve_currency(inv, regime)?;
    let scale = currency
        .scale()
        .ok_or_else(|| FieldErrors::single("currency", format!("'{currency}' not supported")))?;
    let rule = inv
        .tax
        .as_ref()
        .and_then(|t| t.rounding)
        .or(regime.map(|r| r.calculator_rounding_rule))
        .unwrap_or_default();
    let work = match rule {
        RoundingRule::Precise => scale + EXTRA_PRECISION,
        RoundingRule::Currency => scale,
    };

    let mut errs = FieldErrors::new();
    let mut taxable = Vec::with_capacity(inv.lines.len() + inv.charges.len());

    // -- Lines -------------------------------------------------------------

    let mut sum = Amount::zero(work);
    for (idx, line) in inv.lines.iter_mut().enumerate() {
        line.i = idx + 1;
        let qty = line.quantity.unwrap_or(Amount::ZERO);
        let price = line
            .item
            .as_ref()
            .and_then(|i| i.price)
            .unwrap_or(Amount::ZERO);
        let exact = qty.multiply(price).map_err(failed(format!("lines.{idx}.sum")))?;
        let rounded = exact.rescale(scale);
        line.sum = Some(rounded);
        line.total = Some(rounded);

        let combo_errs = prepare_combos(&mut line.taxes, regime, date);
        if !combo_errs.is_empty() {
            errs.nest("lines", combo_errs.prefixed("taxes").prefixed(idx.to_string()));
        }

        let base = exact.rescale(work);
        sum = sum.add(base).map_err(failed("totals.sum".into()))?;
        taxable.push(Taxable {
            path: format!("lines.{idx}"),
            base,
            combos: line.taxes.clone(),
        });
    }

    // -- Charges -----------------------------------------------------------

    let mut charge: Option<Amount> = None;
    for (idx, ch) in inv.charges.iter_mut().enumerate() {
        ch.i = idx + 1;
        let exact = match ch.percent {
            Some(p) => p
                .of(ch.base.unwrap_or(sum))
                .map_err(failed(format!("charges.{idx}.amount")))?,
            None => ch.amount,
        };
        ch.amount = exact.rescale(scale);

        let combo_errs = prepare_combos(&mut ch.taxes, regime, date);
        if !combo_errs.is_empty() {
            errs.nest("charges", combo_errs.prefixed("taxes").prefixed(idx.to_string()));
        }

        let base = exact.rescale(work);
        let running = charge.unwrap_or(Amount::zero(work));
        charge = Some(running.add(base).map_err(failed("totals.charge".into()))?);
        taxable.push(Taxable {
            path: format!("charges.{idx}"),
            base,
            combos: ch.taxes.clone(),
        });
    }

    errs.into_result()?;

    // -- Taxes -------------------------------------------------------------

    let included = inv.tax.as_ref().and_then(|t| t.prices_include.clone());
    if let Some(code) = &included {
        if regime
            .and_then(|r| r.category(code.as_str()))
            .is_some_and(|c| c.retained)
        {
            return Err(FieldErrors::single(
                "prices_include",
                format!("cannot include retained category '{code}'"),
            )
            .prefixed("tax"));
        }
    }

    let categories = tax_categories(&taxable, regime, included.as_ref(), work, scale)?;

    let mut tax = Amount::zero(scale);
    let mut retained: Option<Amount> = None;
    for ct in &categories {
        let value = ct
            .amount
            .add(ct.surcharge.unwrap_or(Amount::ZERO))
            .map_err(failed("totals.taxes".into()))?;
        if ct.retained {
            let running = retained.unwrap_or(Amount::zero(scale));
            retained = Some(running.add(value).map_err(failed("totals.retained_tax".into()))?);
        } else {
            tax = tax.add(value).map_err(failed("totals.tax".into()))?;
        }
    }
    let tax_included = included
        .as_ref()
        .and_then(|code| categories.iter().find(|c| c.code == *code))
        .map(|c| c.amount);

    // -- Totals ------------------------------------------------------------

    let sum = sum.rescale(scale);
    let charge = charge.map(|c| c.rescale(scale));
    let mut total = sum
        .add(charge.unwrap_or(Amount::ZERO))
        .map_err(failed("totals.total".into()))?;
    if let Some(ti) = tax_included {
        total = total.subtract(ti).map_err(failed("totals.total".into()))?;
    }
    let total = total.rescale(scale);
    let total_with_tax = total
        .add(tax)
        .map_err(failed("totals.total_with_tax".into()))?
        .rescale(scale);
    let payable = total_with_tax
        .subtract(retained.unwrap_or(Amount::ZERO))
        .map_err(failed("totals.payable".into()))?
        .rescale(scale);

    let mut advance = None;
    if let Some(payment) = &mut inv.payment {
        if !payment.advances.is_empty() {
            let mut paid = Amount::zero(scale);
            for (idx, a) in payment.advances.iter_mut().enumerate() {
                a.calculate(payable, scale)
                    .map_err(failed(format!("payment.advances.{idx}.amount")))?;
                paid = paid.add(a.amount).map_err(failed("totals.advance".into()))?;
            }
            advance = Some(paid.rescale(scale));
        }
    }
    let due = match advance {
        Some(a) => Some(
            payable
                .subtract(a)
                .map_err(failed("totals.due".into()))?
                .rescale(scale),
        ),
        None => None,
    };

    inv.totals = Some(Totals {
        sum,
        charge,
        tax_included,
        total,
        taxes: (!categories.is_empty()).then(|| TaxTotal {
            categories,
            sum: tax,
            retained,
        }),
        tax: Some(tax),
        total_with_tax,
        retained_tax: retained,
        payable,
        advance,
        due,
    });
    Ok(())
}

fn resolve_currency(inv: &mut Invoice, regime: Option<&RegimeDef>) -> Result<CurrencyCode, FieldErrors> {
    if let Some(c) = inv.currency.as_ref().filter(|c| !c.is_empty()) {
        return Ok(c.clone());
    }
    match regime {
        Some(r) if !r.currency.is_empty() => {
            inv.currency = Some(r.currency.clone());
            Ok(r.currency.clone())
        }
        _ => Err(FieldErrors::single("currency", "missing")),
    }
}

/// Resolve rate keys into percentages for the date of issue. Combos of
/// categories the regime does not know are left for validation to report.
fn prepare_combos(combos: &mut [Combo], regime: Option<&RegimeDef>, date: NaiveDate) -> FieldErrors {
    let mut errs = FieldErrors::new();
    for (idx, combo) in combos.iter_mut().enumerate() {
        if let Err(e) = prepare_combo(combo, regime, date) {
            errs.nest(idx.to_string(), e);
        }
    }
    errs
}

fn prepare_combo(combo: &mut Combo, regime: Option<&RegimeDef>, date: NaiveDate) -> Result<(), FieldErrors> {
    let Some(cat) = regime.and_then(|r| r.category(combo.cat.as_str())) else {
        return Ok(());
    };
    let priced = combo.rate.is_some() || combo.percent.is_some_and(|p| !p.is_zero());
    if combo.key.is_none() && priced && cat.has_key(keys::STANDARD) {
        combo.key = Some(Key::from(keys::STANDARD));
    }
    if let Some(rate) = &combo.rate {
        let def = cat.rate(rate.as_str()).ok_or_else(|| {
            FieldErrors::single("rate", format!("'{rate}' not defined in category '{}'", cat.code))
        })?;
        let value = def
            .value(date, &combo.ext)
            .ok_or_else(|| FieldErrors::single("rate", format!("no value for '{rate}' on {date}")))?;
        combo.percent = Some(value.percent);
        combo.surcharge = value.surcharge;
    }
    Ok(())
}

/// Group taxable bases by category then by rate, and compute the amounts.
fn tax_categories(
    taxable: &[Taxable],
    regime: Option<&RegimeDef>,
    included: Option<&Code>,
    work: u32,
    scale: u32,
) -> Result<Vec<CategoryTotal>, FieldErrors> {
    let Some(regime) = regime else {
        return Ok(Vec::new());
    };
    let mut cats: Vec<CategoryTotal> = Vec::new();
    for t in taxable {
        let base = net_base(t, included, work)?;
        for (ci, combo) in t.combos.iter().enumerate() {
            let Some(def) = regime.category(combo.cat.as_str()) else {
                continue;
            };
            let ct = match cats.iter().position(|c| c.code == def.code) {
                Some(i) => &mut cats[i],
                None => {
                    cats.push(CategoryTotal {
                        code: def.code.clone(),
                        retained: def.retained,
                        rates: Vec::new(),
                        amount: Amount::zero(work),
                        surcharge: None,
                    });
                    let last = cats.len() - 1;
                    &mut cats[last]
                }
            };
            let rt = match ct.rates.iter().position(|r| same_rate(r, combo)) {
                Some(i) => &mut ct.rates[i],
                None => {
                    ct.rates.push(RateTotal {
                        key: combo.key.clone(),
                        ext: combo.ext.clone(),
                        base: Amount::zero(work),
                        percent: combo.percent,
                        surcharge: combo.surcharge.map(|percent| RateTotalSurcharge {
                            percent,
                            amount: Amount::zero(work),
                        }),
                        amount: Amount::zero(work),
                    });
                    let last = ct.rates.len() - 1;
                    &mut ct.rates[last]
                }
            };
            let at_combo = || failed(format!("{}.taxes.{ci}.percent", t.path));
            rt.base = rt.base.add(base).map_err(failed("totals.taxes".into()))?;
            if let Some(p) = combo.percent {
                let share = p.of(base).map_err(at_combo())?.rescale(work);
                rt.amount = rt.amount.add(share).map_err(failed("totals.taxes".into()))?;
            }
            if let Some(s) = &mut rt.surcharge {
                let share = s.percent.of(base).map_err(at_combo())?.rescale(work);
                s.amount = s.amount.add(share).map_err(failed("totals.taxes".into()))?;
            }
        }
    }

    for ct in &mut cats {
        let mut amount = Amount::zero(work);
        let mut surcharge: Option<Amount> = None;
        for rt in &mut ct.rates {
            amount = amount.add(rt.amount).map_err(failed("totals.taxes".into()))?;
            rt.base = rt.base.rescale(scale);
            rt.amount = rt.amount.rescale(scale);
            if let Some(s) = &mut rt.surcharge {
                let running = surcharge.unwrap_or(Amount::zero(work));
                surcharge = Some(running.add(s.amount).map_err(failed("totals.taxes".into()))?);
                s.amount = s.amount.rescale(scale);
            }
        }
        ct.amount = amount.rescale(scale);
        ct.surcharge = surcharge.map(|s| s.rescale(scale));
    }
    Ok(cats)
}

/// The base with any tax already included in the price removed.
fn net_base(t: &Taxable, included: Option<&Code>, work: u32) -> Result<Amount, FieldErrors> {
    let Some(code) = included else {
        return Ok(t.base);
    };
    let found = t
        .combos
        .iter()
        .enumerate()
        .find_map(|(ci, c)| (c.cat == *code).then_some((ci, c.percent)));
    match found {
        Some((ci, Some(p))) => {
            let divisor = Decimal::ONE + p.factor();
            t.base
                .divide(divisor)
                .map(|b| b.rescale(work))
                .map_err(failed(format!("{}.taxes.{ci}.percent", t.path)))
        }
        _ => Ok(t.base),
    }
}

fn same_rate(rt: &RateTotal, combo: &Combo) -> bool {
    rt.key == combo.key
        && rt.percent == combo.percent
        && rt.surcharge.as_ref().map(|s| s.percent) == combo.surcharge
        && rt.ext == combo.ext
}
